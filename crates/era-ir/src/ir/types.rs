//! Core type system: attribute kinds, nullability and attribute sets

use crate::ordered_map;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of an attribute or expression value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TyKind {
    /// 64-bit signed integer
    Int,
    /// 64-bit IEEE float
    Float,
    /// UTF-8 string
    String,
    /// Boolean
    Boolean,
    /// Instant in UTC
    Timestamp,
    /// Calendar date
    Date,
}

impl TyKind {
    /// Returns true if this is a numeric kind
    pub fn is_numeric(&self) -> bool {
        matches!(self, TyKind::Int | TyKind::Float)
    }

    /// Returns true for `date` and `timestamp`
    pub fn is_temporal(&self) -> bool {
        matches!(self, TyKind::Date | TyKind::Timestamp)
    }

    /// Check if two kinds can be compared with `=`, `<` and friends.
    ///
    /// Equal kinds are comparable, any two numeric kinds are comparable, and
    /// `date` is comparable with `timestamp`.
    pub fn is_comparable_with(&self, other: &TyKind) -> bool {
        self == other
            || (self.is_numeric() && other.is_numeric())
            || (self.is_temporal() && other.is_temporal())
    }

    /// The kind two branches of a union/case/coalesce unify to, if any.
    ///
    /// `int` and `float` unify to `float`; every other kind only unifies with
    /// itself.
    pub fn unify(&self, other: &TyKind) -> Option<TyKind> {
        if self == other {
            Some(*self)
        } else if self.is_numeric() && other.is_numeric() {
            Some(TyKind::Float)
        } else {
            None
        }
    }

    /// Lowercase name used in type listings
    pub fn name(&self) -> &'static str {
        match self {
            TyKind::Int => "int",
            TyKind::Float => "float",
            TyKind::String => "string",
            TyKind::Boolean => "boolean",
            TyKind::Timestamp => "timestamp",
            TyKind::Date => "date",
        }
    }
}

impl fmt::Display for TyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Nullability of an attribute or expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Nullability {
    /// Guaranteed not null
    NotNull,
    /// May contain nulls
    #[default]
    Nullable,
}

impl Nullability {
    /// Combine two nullability states: if either is nullable, result is nullable
    pub fn combine(self, other: Nullability) -> Nullability {
        match (self, other) {
            (Nullability::NotNull, Nullability::NotNull) => Nullability::NotNull,
            _ => Nullability::Nullable,
        }
    }

    /// Returns true if nulls are possible
    pub fn is_nullable(self) -> bool {
        self == Nullability::Nullable
    }
}

/// A kind plus its nullability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ty {
    pub kind: TyKind,
    pub nullability: Nullability,
}

impl Ty {
    /// A non-nullable type of the given kind
    pub fn nn(kind: TyKind) -> Self {
        Self {
            kind,
            nullability: Nullability::NotNull,
        }
    }

    /// A nullable type of the given kind
    pub fn nullable(kind: TyKind) -> Self {
        Self {
            kind,
            nullability: Nullability::Nullable,
        }
    }

    pub fn is_nullable(&self) -> bool {
        self.nullability.is_nullable()
    }

    /// Same kind with the given nullability
    pub fn with_nullability(self, nullability: Nullability) -> Self {
        Self {
            kind: self.kind,
            nullability,
        }
    }
}

impl From<TyKind> for Ty {
    fn from(kind: TyKind) -> Self {
        Ty::nullable(kind)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.nullability {
            Nullability::NotNull => write!(f, "{} NOT NULL", self.kind),
            Nullability::Nullable => write!(f, "{}", self.kind),
        }
    }
}

impl From<Ty> for String {
    fn from(ty: Ty) -> Self {
        ty.to_string()
    }
}

impl TryFrom<String> for Ty {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        parse_ty(&s).ok_or_else(|| format!("unknown type '{s}'"))
    }
}

/// Parse a kind name (case-insensitive), accepting common SQL spellings
pub fn parse_kind(s: &str) -> Option<TyKind> {
    let upper = s.trim().to_uppercase();
    let kind = match upper.as_str() {
        "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "INT64" | "INT8" | "INT4"
        | "LONG" => TyKind::Int,
        "FLOAT" | "DOUBLE" | "DOUBLE PRECISION" | "REAL" | "FLOAT64" | "FLOAT8" | "FLOAT4"
        | "NUMERIC" | "DECIMAL" => TyKind::Float,
        "STRING" | "TEXT" | "VARCHAR" | "CHAR" | "CHARACTER VARYING" => TyKind::String,
        "BOOL" | "BOOLEAN" => TyKind::Boolean,
        "TIMESTAMP" | "DATETIME" | "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" => {
            TyKind::Timestamp
        }
        "DATE" => TyKind::Date,
        _ => return None,
    };
    Some(kind)
}

/// Parse a type such as `int`, `string` or `int NOT NULL`.
///
/// Types without a `NOT NULL` suffix are nullable.
pub fn parse_ty(s: &str) -> Option<Ty> {
    let trimmed = s.trim();
    let upper = trimmed.to_uppercase();
    if let Some(base) = upper.strip_suffix("NOT NULL") {
        if base.ends_with(char::is_whitespace) {
            return parse_kind(base).map(Ty::nn);
        }
    }
    parse_kind(trimmed).map(Ty::nullable)
}

/// A named, typed attribute of a relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub ty: Ty,
}

impl Attribute {
    pub fn new(name: impl Into<String>, ty: Ty) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Ordered attribute set produced by type checking a relation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributeSet {
    entries: Vec<(String, Ty)>,
}

impl Serialize for AttributeSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ordered_map::serialize(&self.entries, serializer)
    }
}

impl<'de> Deserialize<'de> for AttributeSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self {
            entries: ordered_map::deserialize(deserializer)?,
        })
    }
}

impl AttributeSet {
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create an attribute set from ordered attributes
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self {
            entries: attributes.into_iter().map(|a| (a.name, a.ty)).collect(),
        }
    }

    /// Find an attribute's type by name (case-sensitive)
    pub fn get(&self, name: &str) -> Option<Ty> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| *ty)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate attributes in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Ty)> + '_ {
        self.entries.iter().map(|(n, ty)| (n.as_str(), *ty))
    }

    /// Get attribute names in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Return a new set with all attributes set to the given nullability
    pub fn with_nullability(&self, nullability: Nullability) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(n, ty)| (n.clone(), ty.with_nullability(nullability)))
                .collect(),
        }
    }

    /// Concatenate two sets (used for listings of both sides of a join)
    pub fn merge(left: &AttributeSet, right: &AttributeSet) -> Self {
        let mut entries = left.entries.clone();
        entries.extend(right.entries.iter().cloned());
        Self { entries }
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no attributes
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Ty)> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = (String, Ty)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, Ty)> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = (&'a str, Ty)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(n, ty)| (n.to_string(), ty)).collect(),
        }
    }
}

/// Listing format used in type errors:
///
/// ```text
/// (
///   "id" int NOT NULL,
///   "state" string
/// )
/// ```
impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "(")?;
        let last = self.entries.len().saturating_sub(1);
        for (i, (name, ty)) in self.entries.iter().enumerate() {
            let sep = if i == last { "" } else { "," };
            writeln!(f, "  \"{name}\" {ty}{sep}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
