//! Minimal CLI: ts | schema | infer | merge | fmt
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use serde_json::Value;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// translate CCL schema definitions into TypeScript or JSON schemas, infer
/// CCL from JSON samples, merge and format CCL types
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// generate TypeScript declarations from CCL definitions
    Ts(TsOut),
    /// generate JSON schemas from CCL definitions
    Schema(SchemaOut),
    /// infer a CCL type from JSON samples, merging across inputs
    Infer(InferOut),
    /// merge CCL types into one that accepts all inputs
    Merge(MergeOut),
    /// re-print CCL in canonical form
    Fmt(FmtOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct CommonSettings {
    /// Debugging: print CLI invocation settings and then terminate
    #[arg(long)]
    no_op: bool,

    /// Debugging: track elapsed time and then print to stderr
    #[arg(long)]
    track_time: bool,
}

#[derive(Args, Debug, Clone)]
struct TsOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .ts file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    common_settings: CommonSettings,
}

#[derive(Args, Debug, Clone)]
struct SchemaOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    common_settings: CommonSettings,
}

#[derive(Args, Debug, Clone)]
struct InferOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items)
    #[arg(long)]
    json_pointer: Option<String>,

    /// jq pre-process filter for each document
    #[arg(long)]
    jq_expr: Option<String>,

    /// Debugging: disable parallelization
    #[arg(long)]
    no_parallel: bool,

    /// output .ccl file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    common_settings: CommonSettings,
}

#[derive(Args, Debug, Clone)]
struct MergeOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .ccl file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    common_settings: CommonSettings,
}

#[derive(Args, Debug, Clone)]
struct FmtOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    common_settings: CommonSettings,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) {
        let start = std::time::Instant::now();
        let mut print_elapsed_time = false;

        match &self.cmd {
            Command::Ts(target) => {
                if debug_no_op(&target.common_settings, &target.input_settings, self) {
                    return;
                }
                print_elapsed_time = target.common_settings.track_time;

                let sources = read_sources(&target.input_settings);
                let output = sources
                    .iter()
                    .map(|(path, src)| {
                        crate::typescript::marshal_string(src).unwrap_or_else(|e| {
                            panic!("failed to generate TypeScript ({}): {e}", path.display())
                        })
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                write_output(target.out.as_deref(), &output);
            }
            Command::Schema(target) => {
                if debug_no_op(&target.common_settings, &target.input_settings, self) {
                    return;
                }
                print_elapsed_time = target.common_settings.track_time;

                let sources = read_sources(&target.input_settings);
                let mut all = serde_json::Map::new();
                for (path, src) in &sources {
                    let schemas = crate::jsonschema::marshal_string(src).unwrap_or_else(|e| {
                        panic!("failed to generate schemas ({}): {e}", path.display())
                    });
                    for (name, schema) in schemas.all {
                        all.insert(name, Value::Object(schema));
                    }
                }
                let encoded = serde_json::to_string_pretty(&all).unwrap();
                write_output(target.out.as_deref(), &encoded);
            }
            Command::Infer(target) => {
                if debug_no_op(&target.common_settings, &target.input_settings, self) {
                    return;
                }
                print_elapsed_time = target.common_settings.track_time;

                let merged = infer_and_merge(target);
                write_output(target.out.as_deref(), &merged);
            }
            Command::Merge(target) => {
                if debug_no_op(&target.common_settings, &target.input_settings, self) {
                    return;
                }
                print_elapsed_time = target.common_settings.track_time;

                let sources = read_sources(&target.input_settings);
                let mut merged = crate::ccl::Value::bottom();
                for (path, src) in &sources {
                    let inst = crate::ccl::Runtime::new()
                        .compile(&path.to_string_lossy(), src)
                        .unwrap_or_else(|e| panic!("failed to compile ({}): {e}", path.display()));
                    merged = crate::merge::merge(&inst.value(), &merged)
                        .unwrap_or_else(|e| panic!("failed to merge ({}): {e}", path.display()));
                }
                let output = crate::canon::format_value(&merged)
                    .unwrap_or_else(|e| panic!("failed to format merged type: {e}"));
                write_output(target.out.as_deref(), &output);
            }
            Command::Fmt(target) => {
                if debug_no_op(&target.common_settings, &target.input_settings, self) {
                    return;
                }
                print_elapsed_time = target.common_settings.track_time;

                let sources = read_sources(&target.input_settings);
                let output = sources
                    .iter()
                    .map(|(path, src)| {
                        crate::canon::format_source(src).unwrap_or_else(|e| {
                            panic!("failed to format ({}): {e}", path.display())
                        })
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                write_output(target.out.as_deref(), &output);
            }
        }

        if print_elapsed_time {
            let elapsed = start.elapsed();
            eprintln!("finished in {}", format_duration(elapsed));
        }
    }
}

/// Infer a type per JSON document, then fold the results with a semantic
/// merge.  The map runs in parallel; merge order does not matter because
/// the merge is commutative.
fn infer_and_merge(target: &InferOut) -> String {
    let source_paths = resolve_inputs(&target.input_settings.input)
        .expect("failed to resolve input file paths");

    let infer_one = |path: &PathBuf| -> Vec<String> {
        let path_str = path.to_string_lossy().to_string();
        let src = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("read failed ({path_str}): {e}"));

        let mut inferred = Vec::new();
        let mut apply_one = |v: &Value| {
            let selected: Vec<Value> = match target.json_pointer.as_ref() {
                None => vec![v.clone()],
                Some(ptr) => match v.pointer(ptr) {
                    None => Vec::new(),
                    Some(Value::Array(xs)) => xs.clone(),
                    Some(other) => vec![other.clone()],
                },
            };
            for value in selected {
                let Value::Object(map) = value else {
                    panic!("cannot infer from a non-object sample ({path_str})");
                };
                let ccl = crate::fromjson::from_json(&map)
                    .unwrap_or_else(|e| panic!("inference failed ({path_str}): {e}"));
                inferred.push(ccl);
            }
        };

        let documents: Vec<Value> = if target.ndjson {
            src.lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(i, line)| {
                    serde_json::from_str(line.trim()).unwrap_or_else(|e| {
                        panic!("NDJSON parse error {path_str}:{}: {e}", i + 1)
                    })
                })
                .collect()
        } else {
            vec![serde_json::from_str(&src)
                .unwrap_or_else(|e| panic!("JSON parse error ({path_str}): {e}"))]
        };

        for document in &documents {
            match target.jq_expr.as_ref() {
                None => apply_one(document),
                Some(expr) => {
                    let produced = crate::jq::apply(expr, document)
                        .unwrap_or_else(|e| panic!("jq failed ({path_str}): {e}"));
                    for value in produced {
                        apply_one(&value);
                    }
                }
            }
        }
        inferred
    };

    let inferred: Vec<String> = if target.no_parallel {
        source_paths.iter().flat_map(infer_one).collect()
    } else {
        source_paths.par_iter().map(infer_one).flatten().collect()
    };

    let mut merged = crate::ccl::Value::bottom();
    for ccl in &inferred {
        let value = crate::ccl::parse_value(ccl)
            .unwrap_or_else(|e| panic!("inferred type failed to compile: {e}\n{ccl}"));
        merged = crate::merge::merge(&value, &merged)
            .unwrap_or_else(|e| panic!("failed to merge inferred types: {e}"));
    }
    crate::canon::format_value(&merged).unwrap_or_else(|e| panic!("failed to format: {e}"))
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn debug_no_op(
    common: &CommonSettings,
    inputs: &InputSettings,
    cli: &CommandLineInterface,
) -> bool {
    if !common.no_op {
        return false;
    }
    let sources =
        resolve_inputs(&inputs.input).expect("failed to resolve input file paths");
    eprintln!("{cli:#?}");
    eprintln!("RESOLVED SOURCES:");
    for source in sources {
        eprintln!("\t- {}", source.to_string_lossy());
    }
    true
}

fn read_sources(inputs: &InputSettings) -> Vec<(PathBuf, String)> {
    let source_paths =
        resolve_inputs(&inputs.input).expect("failed to resolve input file paths");
    source_paths
        .into_iter()
        .map(|path| {
            let src = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("failed to read source file ({}): {e}", path.display()));
            (path, src)
        })
        .collect()
}

fn write_output(out: Option<&Path>, content: &str) {
    if let Some(out) = out {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(out, content).unwrap();
    } else {
        println!("{content}");
    }
}

fn resolve_inputs(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::<PathBuf>::new();
    for pattern in patterns {
        let matched: Vec<PathBuf> = glob::glob(pattern)
            .with_context(|| format!("bad input pattern: {pattern}"))?
            .collect::<Result<_, _>>()
            .with_context(|| format!("unreadable path under pattern: {pattern}"))?;
        if matched.is_empty() {
            // A literal path; existence is checked when the file is read.
            out.push(PathBuf::from(pattern));
        } else {
            out.extend(matched);
        }
    }
    Ok(out)
}

fn format_duration(d: std::time::Duration) -> String {
    // Translations finish in well under a minute; sub-second runs are the
    // common case.
    if d.as_secs() == 0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}
