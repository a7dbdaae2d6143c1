//! Literal values and rows

use super::types::TyKind;
use crate::ordered_map;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LiteralRepr", into = "LiteralRepr")]
pub enum Literal {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
}

impl Literal {
    /// The kind of a non-null literal; `Null` has no kind of its own
    pub fn kind(&self) -> Option<TyKind> {
        match self {
            Literal::Null => None,
            Literal::Boolean(_) => Some(TyKind::Boolean),
            Literal::Int(_) => Some(TyKind::Int),
            Literal::Float(_) => Some(TyKind::Float),
            Literal::String(_) => Some(TyKind::String),
            Literal::Timestamp(_) => Some(TyKind::Timestamp),
            Literal::Date(_) => Some(TyKind::Date),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }
}

/// Canonical string conversion, used when a value is interpolated into a
/// string template.
impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Boolean(b) => write!(f, "{b}"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(x) => write!(f, "{x}"),
            Literal::String(s) => write!(f, "{s}"),
            Literal::Timestamp(ts) => {
                write!(f, "{}", ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Literal::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Boolean(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(value.into())
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<NaiveDate> for Literal {
    fn from(value: NaiveDate) -> Self {
        Literal::Date(value)
    }
}

impl From<DateTime<Utc>> for Literal {
    fn from(value: DateTime<Utc>) -> Self {
        Literal::Timestamp(value)
    }
}

impl<T: Into<Literal>> From<Option<T>> for Literal {
    fn from(value: Option<T>) -> Self {
        value.map_or(Literal::Null, Into::into)
    }
}

/// Serialized form: scalars map to YAML/JSON scalars, temporal values are
/// tagged so they do not collide with strings.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LiteralRepr {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp { timestamp: DateTime<Utc> },
    Date { date: NaiveDate },
}

impl From<LiteralRepr> for Literal {
    fn from(repr: LiteralRepr) -> Self {
        match repr {
            LiteralRepr::Null => Literal::Null,
            LiteralRepr::Boolean(b) => Literal::Boolean(b),
            LiteralRepr::Int(i) => Literal::Int(i),
            LiteralRepr::Float(x) => Literal::Float(x),
            LiteralRepr::String(s) => Literal::String(s),
            LiteralRepr::Timestamp { timestamp } => Literal::Timestamp(timestamp),
            LiteralRepr::Date { date } => Literal::Date(date),
        }
    }
}

impl From<Literal> for LiteralRepr {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Null => LiteralRepr::Null,
            Literal::Boolean(b) => LiteralRepr::Boolean(b),
            Literal::Int(i) => LiteralRepr::Int(i),
            Literal::Float(x) => LiteralRepr::Float(x),
            Literal::String(s) => LiteralRepr::String(s),
            Literal::Timestamp(timestamp) => LiteralRepr::Timestamp { timestamp },
            Literal::Date(date) => LiteralRepr::Date { date },
        }
    }
}

/// An ordered map of attribute name to value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    entries: Vec<(String, Literal)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append (or replace) a value
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert a value, replacing an existing entry of the same name in place
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Literal>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Literal> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Literal)> + '_ {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Literal)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Literal)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (name, value) in iter {
            row.insert(name, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ordered_map::serialize(&self.entries, serializer)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries: Vec<(String, Literal)> = ordered_map::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

/// Build a [`Row`] from `name => value` pairs.
///
/// ```
/// use era_ir::{row, Literal};
/// let r = row! { "n" => 1, "label" => "one" };
/// assert_eq!(r.get("n"), Some(&Literal::Int(1)));
/// ```
#[macro_export]
macro_rules! row {
    () => { $crate::Row::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {
        $crate::Row::new()$(.with($name, $crate::Literal::from($value)))+
    };
}
