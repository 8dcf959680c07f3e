//! Tagged requirement-variable values.
//!
//! A [`Value`] is an owned tree: cloning it is a deep copy. Snapshots taken
//! before a call therefore never alias the argument the callee mutates, and
//! checkers cannot leak side effects back into the callee's state.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use shellac_error::{Result, ShellacError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    #[default]
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Text(String),
    List(Vec<Value>),
    Record(BTreeMap<String, Value>),
}

impl Value {
    /// Short name of the variant, used in type-mismatch errors.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Char(_) => "char",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Record(_) => "record",
        }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Self>> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_record(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Record(v) => Some(v),
            _ => None,
        }
    }

    /// Interpret a list of integers, e.g. an `int[]` argument.
    #[must_use]
    pub fn as_int_list(&self) -> Option<Vec<i64>> {
        self.as_list()?.iter().map(Self::as_int).collect()
    }

    /// Like [`Value::as_int`], but reports which variable had the wrong kind.
    pub fn expect_int(&self, name: &str) -> Result<i64> {
        self.as_int().ok_or_else(|| self.mismatch(name, "int"))
    }

    pub fn expect_float(&self, name: &str) -> Result<f64> {
        self.as_float().ok_or_else(|| self.mismatch(name, "float"))
    }

    pub fn expect_bool(&self, name: &str) -> Result<bool> {
        self.as_bool().ok_or_else(|| self.mismatch(name, "bool"))
    }

    pub fn expect_text(&self, name: &str) -> Result<&str> {
        self.as_text().ok_or_else(|| self.mismatch(name, "text"))
    }

    pub fn expect_list(&self, name: &str) -> Result<&[Self]> {
        self.as_list().ok_or_else(|| self.mismatch(name, "list"))
    }

    pub fn expect_int_list(&self, name: &str) -> Result<Vec<i64>> {
        self.as_int_list()
            .ok_or_else(|| self.mismatch(name, "list of int"))
    }

    fn mismatch(&self, name: &str, expected: &'static str) -> ShellacError {
        ShellacError::VariableTypeMismatch {
            name: name.to_owned(),
            expected,
            actual: self.kind_name(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("()"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "'{v}'"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Record(fields) => {
                f.write_str("{")?;
                for (i, (key, item)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {item}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Unit
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Self::Char(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Self>> for Value {
    fn from(fields: BTreeMap<String, Self>) -> Self {
        Self::Record(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_is_deep() {
        let original = Value::from(vec![vec![1, 2], vec![3]]);
        let mut copy = original.clone();
        if let Some(outer) = copy.as_list_mut() {
            if let Some(inner) = outer[0].as_list_mut() {
                inner[0] = Value::Int(99);
            }
        }
        assert_eq!(original, Value::from(vec![vec![1, 2], vec![3]]));
        assert_ne!(original, copy);
    }

    #[test]
    fn typed_access_reports_mismatch() {
        let value = Value::from("nine");
        let err = value.expect_int("num").unwrap_err();
        assert_eq!(
            err.to_string(),
            "requirement variable \"num\" is text, expected int"
        );
        assert_eq!(Value::Int(4).expect_int("num").unwrap(), 4);
    }

    #[test]
    fn int_list_round_trip() {
        let value = Value::from(vec![9, 8, 7]);
        assert_eq!(value.as_int_list(), Some(vec![9, 8, 7]));
        assert_eq!(value.to_string(), "[9, 8, 7]");
        assert!(Value::from(vec![Value::Int(1), Value::Bool(true)])
            .as_int_list()
            .is_none());
    }

    #[test]
    fn serde_tagging_is_stable() {
        let json = serde_json::to_string(&Value::Int(3)).unwrap();
        assert_eq!(json, r#"{"kind":"int","value":3}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::Int(3));
    }
}
