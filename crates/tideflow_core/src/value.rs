//! Native value model.
//!
//! Values stored in the data pool are one of a closed set of shapes.
//! Equality is structural, with reals compared bitwise so interning is
//! reflexive even for NaN payloads.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A native value held by a pool slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Signed integer scalar
    Integer(i64),
    /// Real scalar
    Real(f64),
    /// Boolean scalar
    Flag(bool),
    /// Text scalar
    Text(String),
    /// Integer sequence
    IntegerSeq(Vec<i64>),
    /// Real sequence
    RealSeq(Vec<f64>),
    /// Text sequence
    TextSeq(Vec<String>),
    /// Ordered record table: rows of column name to value
    Table(Vec<IndexMap<String, Value>>),
}

impl Value {
    /// Get a string naming this value's shape
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "Integer",
            Self::Real(_) => "Real",
            Self::Flag(_) => "Flag",
            Self::Text(_) => "Text",
            Self::IntegerSeq(_) => "IntegerSeq",
            Self::RealSeq(_) => "RealSeq",
            Self::TextSeq(_) => "TextSeq",
            Self::Table(_) => "Table",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => a.to_bits() == b.to_bits(),
            (Self::Flag(a), Self::Flag(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::IntegerSeq(a), Self::IntegerSeq(b)) => a == b,
            (Self::RealSeq(a), Self::RealSeq(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Self::TextSeq(a), Self::TextSeq(b)) => a == b,
            (Self::Table(a), Self::Table(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Real(v) => write!(f, "{}", v),
            Self::Flag(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{}", v),
            Self::IntegerSeq(v) => write!(f, "IntegerSeq[{}]", v.len()),
            Self::RealSeq(v) => write!(f, "RealSeq[{}]", v.len()),
            Self::TextSeq(v) => write!(f, "TextSeq[{}]", v.len()),
            Self::Table(v) => write!(f, "Table[{} rows]", v.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        assert_eq!(Value::Integer(5), Value::Integer(5));
        assert_ne!(Value::Integer(5), Value::Integer(6));
        assert_ne!(Value::Integer(5), Value::Real(5.0));
    }

    #[test]
    fn test_real_equality_is_bitwise() {
        assert_eq!(Value::Real(1.5), Value::Real(1.5));
        assert_eq!(Value::Real(f64::NAN), Value::Real(f64::NAN));
        // Negative zero and zero have different bit patterns
        assert_ne!(Value::Real(0.0), Value::Real(-0.0));
    }

    #[test]
    fn test_real_seq_equality() {
        let a = Value::RealSeq(vec![1.0, f64::NAN]);
        let b = Value::RealSeq(vec![1.0, f64::NAN]);
        assert_eq!(a, b);
        assert_ne!(a, Value::RealSeq(vec![1.0]));
    }

    #[test]
    fn test_table_equality() {
        let mut row = IndexMap::new();
        row.insert("depth".to_string(), Value::Real(40.0));
        let a = Value::Table(vec![row.clone()]);
        let b = Value::Table(vec![row]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_kind_name() {
        assert_eq!(Value::Flag(true).kind_name(), "Flag");
        assert_eq!(Value::TextSeq(vec![]).kind_name(), "TextSeq");
    }

    #[test]
    fn test_serde_round_trip() {
        let value = Value::IntegerSeq(vec![1, 2, 3]);
        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
