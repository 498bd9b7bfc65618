//! Subject normalization.
//!
//! Callers hand the gateway whatever user or account value they have. Before
//! the provider sees it, the subject is reduced to an identifier plus a map of
//! recognized attributes, each flattened to a primitive.
//!
//! Identity is an explicit capability: a subject implements [`Identity`] and
//! [`Subject`]. Loosely-shaped JSON records get an adapter on
//! [`serde_json::Value`] that looks for `_id`, then `id`, then stringifies the
//! record itself.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// Identifier used when no subject is supplied.
pub const ANONYMOUS_ID: &str = "all";

/// Subject fields that may be forwarded to the provider. Everything else is
/// dropped.
pub const RECOGNIZED_ATTRIBUTES: [&str; 10] = [
    "organization",
    "businessUnit",
    "country",
    "site",
    "isCoach",
    "isOrganizationAdmin",
    "isBusinessUnitAdmin",
    "isSiteAdmin",
    "isAcademyAdmin",
    "canDoFinancialValidation",
];

/// Anything that can name itself with a stable string.
pub trait Identity {
    fn identity(&self) -> String;
}

/// A user or account the gateway can evaluate flags for.
pub trait Subject: Identity {
    /// Value of a named attribute. `None` means the subject does not define it.
    fn attribute(&self, name: &str) -> Option<AttributeValue<'_>>;
}

/// A raw attribute as read from a subject.
#[derive(Clone)]
pub enum AttributeValue<'a> {
    Bool(bool),
    Number(Number),
    Text(Cow<'a, str>),
    /// A reference to another entity, collapsed to its identity
    Entity(&'a dyn Identity),
}

impl fmt::Debug for AttributeValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Entity(e) => f.debug_tuple("Entity").field(&e.identity()).finish(),
        }
    }
}

impl From<bool> for AttributeValue<'_> {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue<'_> {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for AttributeValue<'_> {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for AttributeValue<'_> {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u32> for AttributeValue<'_> {
    fn from(value: u32) -> Self {
        Self::Number(value.into())
    }
}

/// Non-finite floats have no JSON number form and are sent as text.
impl From<f64> for AttributeValue<'_> {
    fn from(value: f64) -> Self {
        Number::from_f64(value)
            .map(Self::Number)
            .unwrap_or_else(|| Self::Text(Cow::Owned(value.to_string())))
    }
}

impl<'a> From<&'a str> for AttributeValue<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(Cow::Borrowed(value))
    }
}

impl From<String> for AttributeValue<'_> {
    fn from(value: String) -> Self {
        Self::Text(Cow::Owned(value))
    }
}

/// An attribute in the shape the provider receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attribute {
    Bool(bool),
    Number(Number),
    String(String),
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Attribute {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Attribute {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Normalized attributes keyed by their recognized name.
pub type Attributes = HashMap<String, Attribute>;

/// Flatten a raw attribute. Primitives pass through verbatim, so `false`, `0`
/// and `""` survive; entity references collapse to their identity.
pub fn serialize_value(value: AttributeValue<'_>) -> Attribute {
    match value {
        AttributeValue::Bool(b) => Attribute::Bool(b),
        AttributeValue::Number(n) => Attribute::Number(n),
        AttributeValue::Text(s) => Attribute::String(s.into_owned()),
        AttributeValue::Entity(entity) => Attribute::String(entity.identity()),
    }
}

/// Identifier sent to the provider; [`ANONYMOUS_ID`] without a subject.
pub fn identify(subject: Option<&dyn Subject>) -> String {
    subject.map_or_else(|| ANONYMOUS_ID.to_string(), |s| s.identity())
}

/// Recognized, defined attributes of the subject. Empty without a subject.
pub fn attributes_of(subject: Option<&dyn Subject>) -> Attributes {
    let Some(subject) = subject else {
        return Attributes::new();
    };

    RECOGNIZED_ATTRIBUTES
        .iter()
        .filter_map(|&name| {
            subject
                .attribute(name)
                .map(|value| (name.to_string(), serialize_value(value)))
        })
        .collect()
}

// ============================================================================
// Adapters
// ============================================================================

/// An empty identifier is anonymous.
impl Identity for String {
    fn identity(&self) -> String {
        self.as_str().identity()
    }
}

impl Identity for &str {
    fn identity(&self) -> String {
        if self.is_empty() {
            ANONYMOUS_ID.to_string()
        } else {
            (*self).to_string()
        }
    }
}

/// A bare identifier is a subject without attributes.
impl Subject for String {
    fn attribute(&self, _name: &str) -> Option<AttributeValue<'_>> {
        None
    }
}

impl Subject for &str {
    fn attribute(&self, _name: &str) -> Option<AttributeValue<'_>> {
        None
    }
}

/// `_id`, then `id`, then the record itself. Falsy records (`null`, `false`,
/// `0`, `""`) are anonymous.
impl Identity for Value {
    fn identity(&self) -> String {
        if !is_truthy(self) {
            return ANONYMOUS_ID.to_string();
        }
        id_member(self, "_id")
            .or_else(|| id_member(self, "id"))
            .unwrap_or_else(|| text_of(self))
    }
}

impl Subject for Value {
    fn attribute(&self, name: &str) -> Option<AttributeValue<'_>> {
        match self.get(name)? {
            Value::Null => None,
            Value::Bool(b) => Some(AttributeValue::Bool(*b)),
            Value::Number(n) => Some(AttributeValue::Number(n.clone())),
            Value::String(s) => Some(AttributeValue::Text(Cow::Borrowed(s))),
            nested => Some(AttributeValue::Entity(nested)),
        }
    }
}

/// A member counts as an id only when it is truthy: `null`, `false`, `0` and
/// `""` are skipped.
fn id_member(record: &Value, field: &str) -> Option<String> {
    record.get(field).filter(|v| is_truthy(v)).map(text_of)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(map) => match map.get("$oid") {
            Some(Value::String(oid)) => oid.clone(),
            _ => value.to_string(),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                item => text_of(item),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Null => value.to_string(),
    }
}
