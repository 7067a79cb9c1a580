//! Declared strategy parameters
//!
//! A strategy lists its tunable parameters with a kind. Overrides arrive as
//! JSON values and are converted with [`ParamKind::parse`]; a value that does
//! not fit the declared kind is refused.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Type of a declared parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Bool,
    Integer,
    Decimal,
    Text,
}

impl ParamKind {
    /// Convert a JSON value to this kind, `None` if it does not fit.
    ///
    /// Decimals accept JSON numbers and numeric strings; integers reject
    /// fractional numbers.
    pub fn parse(&self, value: &Value) -> Option<ParamValue> {
        match (self, value) {
            (ParamKind::Bool, Value::Bool(b)) => Some(ParamValue::Bool(*b)),
            (ParamKind::Integer, Value::Number(n)) => n.as_i64().map(ParamValue::Integer),
            (ParamKind::Decimal, Value::Number(n)) => {
                Decimal::from_str(&n.to_string()).ok().map(ParamValue::Decimal)
            }
            (ParamKind::Decimal, Value::String(s)) => {
                Decimal::from_str(s).ok().map(ParamValue::Decimal)
            }
            (ParamKind::Text, Value::String(s)) => Some(ParamValue::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamKind::Bool => "bool",
            ParamKind::Integer => "integer",
            ParamKind::Decimal => "decimal",
            ParamKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// A typed parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Decimal(Decimal),
    Text(String),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Integer(_) => ParamKind::Integer,
            ParamValue::Decimal(_) => ParamKind::Decimal,
            ParamValue::Text(_) => ParamKind::Text,
        }
    }
}

/// Name and kind of one tunable parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParamKind,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_matching_kinds() {
        assert_eq!(ParamKind::Bool.parse(&json!(true)), Some(ParamValue::Bool(true)));
        assert_eq!(ParamKind::Integer.parse(&json!(4)), Some(ParamValue::Integer(4)));
        assert_eq!(
            ParamKind::Decimal.parse(&json!(12.5)),
            Some(ParamValue::Decimal(dec!(12.5)))
        );
        assert_eq!(
            ParamKind::Decimal.parse(&json!("0.001")),
            Some(ParamValue::Decimal(dec!(0.001)))
        );
        assert_eq!(
            ParamKind::Text.parse(&json!("ETH/USDC")),
            Some(ParamValue::Text("ETH/USDC".into()))
        );
    }

    #[test]
    fn test_parse_rejects_incompatible() {
        assert_eq!(ParamKind::Bool.parse(&json!("yes")), None);
        assert_eq!(ParamKind::Integer.parse(&json!(1.5)), None);
        assert_eq!(ParamKind::Decimal.parse(&json!("abc")), None);
        assert_eq!(ParamKind::Text.parse(&json!(3)), None);
    }
}
