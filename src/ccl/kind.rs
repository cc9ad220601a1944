//! Kind bitmask for CCL values.
//!
//! A kind describes the shape a value would have once all constraints are
//! satisfied.  Compound values (unions, constraints) combine the kinds of
//! their operands, so a kind is a bitmask rather than a plain enum.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Kind(u16);

impl Kind {
    pub const BOTTOM: Kind = Kind(0);
    pub const NULL: Kind = Kind(1);
    pub const BOOL: Kind = Kind(1 << 1);
    pub const INT: Kind = Kind(1 << 2);
    pub const FLOAT: Kind = Kind(1 << 3);
    pub const STRING: Kind = Kind(1 << 4);
    pub const LIST: Kind = Kind(1 << 5);
    pub const STRUCT: Kind = Kind(1 << 6);
    /// The top type `_` accepts anything.  Top is its own bit: a mask that
    /// contains it is top regardless of what else was collected.
    pub const TOP: Kind = Kind(1 << 7);

    /// Int or float.
    pub const NUMBER: Kind = Kind(Self::INT.0 | Self::FLOAT.0);

    pub fn is_bottom(self) -> bool {
        self.0 == 0
    }

    pub fn is_top(self) -> bool {
        self.contains(Self::TOP)
    }

    pub fn contains(self, other: Kind) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when the mask holds exactly one primitive kind bit.
    pub fn is_single(self) -> bool {
        self.0 != 0 && self.0 & (self.0 - 1) == 0
    }

    pub fn is_scalar(self) -> bool {
        !self.is_top() && self != Self::STRUCT && self != Self::LIST && !self.is_bottom()
    }

    /// The source-text spelling of this kind, as used when a type must be
    /// rendered from a kind alone (array element inference).  Compound
    /// masks render as a parenthesised union.
    pub fn type_string(self) -> String {
        if self.is_top() {
            return "_".to_string();
        }
        if self == Self::NUMBER {
            return "number".to_string();
        }
        let mut parts = Vec::new();
        for (bit, name) in [
            (Self::NULL, "null"),
            (Self::BOOL, "bool"),
            (Self::INT, "int"),
            (Self::FLOAT, "float"),
            (Self::STRING, "string"),
            (Self::LIST, "[...]"),
            (Self::STRUCT, "{...}"),
        ] {
            if self.contains(bit) {
                parts.push(name);
            }
        }
        match parts.len() {
            0 => "_|_".to_string(),
            1 => parts[0].to_string(),
            _ => format!("({})", parts.join(" | ")),
        }
    }

    /// The kind named by a type identifier, or top for identifiers the
    /// evaluator cannot resolve.
    pub fn of_ident(name: &str) -> Kind {
        match name {
            "null" => Self::NULL,
            "bool" => Self::BOOL,
            "int" | "uint" | "int8" | "int16" | "int32" | "int64" | "uint8" | "uint16"
            | "uint32" | "uint64" => Self::INT,
            "float" | "float32" | "float64" => Self::FLOAT,
            "number" => Self::NUMBER,
            "string" | "bytes" => Self::STRING,
            "_" => Self::TOP,
            _ => Self::TOP,
        }
    }
}

impl BitOr for Kind {
    type Output = Kind;
    fn bitor(self, rhs: Kind) -> Kind {
        Kind(self.0 | rhs.0)
    }
}

impl BitOrAssign for Kind {
    fn bitor_assign(&mut self, rhs: Kind) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Kind {
    type Output = Kind;
    fn bitand(self, rhs: Kind) -> Kind {
        // Top is the identity for intersection.
        if self.is_top() {
            return rhs;
        }
        if rhs.is_top() {
            return self;
        }
        Kind(self.0 & rhs.0)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_combine() {
        let k = Kind::STRING | Kind::INT;
        assert!(k.contains(Kind::STRING));
        assert!(k.contains(Kind::INT));
        assert!(!k.contains(Kind::BOOL));
        assert!(!k.is_single());
        assert!(Kind::STRING.is_single());
    }

    #[test]
    fn intersection_with_top() {
        assert_eq!(Kind::TOP & Kind::INT, Kind::INT);
        assert_eq!(Kind::INT & Kind::NUMBER, Kind::INT);
        assert!((Kind::STRING & Kind::INT).is_bottom());
    }

    #[test]
    fn type_strings() {
        assert_eq!(Kind::STRING.type_string(), "string");
        assert_eq!(Kind::NUMBER.type_string(), "number");
        assert_eq!((Kind::STRING | Kind::INT).type_string(), "(int | string)");
        assert_eq!((Kind::NULL | Kind::TOP).type_string(), "_");
    }
}
