// src/core/value.rs
//! Attribute values as they cross the bridge
//!
//! Values come back raw: elements stay [`Element`] handles and boxed structs
//! stay [`BoxedValue`]s until the caller asks for them to be unboxed.
//! Absence is never a variant here; operations that can report "no value"
//! return `Option<AttributeValue>`.

use super::handle::{BoxedValue, Element};

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Url(String),
    Array(Vec<AttributeValue>),
    Element(Element),
    Boxed(BoxedValue),
    /// A value of a CF type the bridge does not decode, kept as its
    /// `CFCopyDescription` text.
    Other(String),
}

impl AttributeValue {
    /// Short name of the variant, used in type mismatch messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AttributeValue::Boolean(_) => "boolean",
            AttributeValue::Integer(_) => "integer",
            AttributeValue::Float(_) => "float",
            AttributeValue::String(_) => "string",
            AttributeValue::Url(_) => "url",
            AttributeValue::Array(_) => "array",
            AttributeValue::Element(_) => "element",
            AttributeValue::Boxed(_) => "boxed value",
            AttributeValue::Other(_) => "other",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) | AttributeValue::Url(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numbers of either representation as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(n) => Some(*n as f64),
            AttributeValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            AttributeValue::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_boxed(&self) -> Option<&BoxedValue> {
        match self {
            AttributeValue::Boxed(b) => Some(b),
            _ => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Integer(value.into())
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<Element> for AttributeValue {
    fn from(value: Element) -> Self {
        AttributeValue::Element(value)
    }
}

impl From<BoxedValue> for AttributeValue {
    fn from(value: BoxedValue) -> Self {
        AttributeValue::Boxed(value)
    }
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(values: Vec<T>) -> Self {
        AttributeValue::Array(values.into_iter().map(Into::into).collect())
    }
}
