//! Value types and literal values.

use strum::IntoStaticStr;

use crate::intern::StrId;

/// The closed set of value types.
///
/// `Auto` is a parse-time placeholder meaning "infer"; `Unknown` is the
/// analyzer's sentinel for "no valid rule". After type analysis no live
/// expression node carries either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ValueType {
    #[strum(serialize = "<unknown>")]
    Unknown,
    Void,
    Auto,
    I64,
    F64,
    Str,
}

impl ValueType {
    /// True for the two numeric scalar types.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::I64 | Self::F64)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A literal value: the payload of a literal token or AST node, and the
/// constant-evaluation slot of a symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Void,
    I64(i64),
    F64(f64),
    Str(StrId),
}

impl Value {
    #[must_use]
    pub fn value_type(self) -> ValueType {
        match self {
            Self::Void => ValueType::Void,
            Self::I64(_) => ValueType::I64,
            Self::F64(_) => ValueType::F64,
            Self::Str(_) => ValueType::Str,
        }
    }

    /// Zero of the given numeric type. Callers guarantee `ty` is numeric.
    #[must_use]
    pub fn zero_of(ty: ValueType) -> Self {
        match ty {
            ValueType::F64 => Self::F64(0.0),
            _ => Self::I64(0),
        }
    }

    /// One of the given numeric type. Callers guarantee `ty` is numeric.
    #[must_use]
    pub fn one_of(ty: ValueType) -> Self {
        match ty {
            ValueType::F64 => Self::F64(1.0),
            _ => Self::I64(1),
        }
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        match self {
            Self::I64(v) => v == 0,
            Self::F64(v) => v == 0.0,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_one(self) -> bool {
        match self {
            Self::I64(v) => v == 1,
            Self::F64(v) => v == 1.0,
            _ => false,
        }
    }

    /// Truthiness of a numeric literal: nonzero. Non-numeric values are
    /// never asked (the analyzer rejects non-numeric conditions).
    #[must_use]
    pub fn is_truthy(self) -> bool {
        match self {
            Self::I64(v) => v != 0,
            Self::F64(v) => v != 0.0,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_types_display_their_keyword() {
        assert_eq!(ValueType::I64.as_str(), "i64");
        assert_eq!(ValueType::F64.as_str(), "f64");
        assert_eq!(ValueType::Str.as_str(), "str");
        assert_eq!(ValueType::Auto.as_str(), "auto");
        assert_eq!(ValueType::Void.as_str(), "void");
    }

    #[test]
    fn truthiness_is_nonzero_numeric() {
        assert!(Value::I64(-3).is_truthy());
        assert!(!Value::I64(0).is_truthy());
        assert!(Value::F64(0.5).is_truthy());
        assert!(!Value::F64(0.0).is_truthy());
    }
}
