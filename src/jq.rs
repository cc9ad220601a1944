//! jq filter execution for CLI input preprocessing.
//!
//! A filter runs over one JSON document at a time and yields zero or more
//! documents to feed into inference.  Outputs come back decoded, ready for
//! `fromjson`; failures surface as inference errors since this sits on the
//! untrusted-input path.

use jaq_core::{load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value as Json;

use crate::error::{Error, Result};

/// Run a jq filter over one JSON document, returning each value the
/// filter produces.
pub fn apply(filter_src: &str, input: &Json) -> Result<Vec<Json>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(|errs| {
        let lines: Vec<String> = errs
            .into_iter()
            .map(|(_, err)| format!("invalid jq filter: {err:?}"))
            .collect();
        Error::Inference(lines.join("\n"))
    })?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(|errs| {
            let lines: Vec<String> = errs
                .into_iter()
                .flat_map(|(_, list)| list)
                .map(|(name, _)| format!("undefined name in jq filter: {name}"))
                .collect();
            Error::Inference(lines.join("\n"))
        })?;

    let inputs = RcIter::new(core::iter::empty());
    let mut produced = Vec::new();
    for item in filter.run((Ctx::new([], &inputs), Val::from(input.clone()))) {
        let val = item.map_err(|e| Error::Inference(format!("jq filter failed: {e:?}")))?;
        produced.push(Json::from(val));
    }
    Ok(produced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_filter_returns_the_document() {
        let doc = json!({"a": 1});
        assert_eq!(apply(".", &doc).unwrap(), vec![doc]);
    }

    #[test]
    fn filters_select_and_split() {
        let doc = json!({"items": [{"a": 1}, {"a": 2}]});
        let out = apply(".items[]", &doc).unwrap();
        assert_eq!(out, vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[test]
    fn bad_filters_surface_as_inference_errors() {
        let doc = json!({});
        assert!(matches!(
            apply("][", &doc),
            Err(Error::Inference(_))
        ));
    }
}
