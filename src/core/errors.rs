// src/core/errors.rs
//! Failure model of the bridge
//!
//! Three outcomes exist for any call: a value, the "no value" sentinel
//! (`None`), or a failure. OS-reported failures are never interpreted here;
//! they go to an [`ErrorHandler`] together with the context of the call, and
//! whatever the handler returns becomes the result of the operation. Only
//! caller/data-shape problems (unknown box tags, dead PIDs, values that
//! cannot be encoded) are raised directly.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use super::ffi_types::AxStatus;
use super::handle::Element;
use super::keyboard::KeyEvent;
use super::marshal::BoxKind;
use super::value::AttributeValue;

#[derive(Debug, Error)]
pub enum AxError {
    /// An OS failure the error handler chose to raise.
    #[error("{status} while {context}")]
    Api { status: AxStatus, context: String },

    #[error("'{0}' is not a valid box type")]
    InvalidBoxType(u32),

    #[error("the OS refused to box a {0:?} value")]
    BoxCreation(BoxKind),

    #[error("the OS could not unbox a {0:?} value")]
    Unboxing(BoxKind),

    #[error("pid {0} must belong to a running application")]
    ProcessNotRunning(i32),

    #[error("the OS returned a null {0} handle")]
    NullHandle(&'static str),

    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },

    #[error("value cannot be passed to the accessibility API: {0}")]
    Unencodable(String),
}

pub type AxResult<T> = Result<T, AxError>;

/// What a failing call was about, beyond the element itself.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    None,
    Attribute(&'a str),
    Action(&'a str),
    ParameterizedAttribute {
        attribute: &'a str,
        parameter: &'a AttributeValue,
    },
    Point {
        x: f32,
        y: f32,
    },
    Timeout(f32),
    KeyEvent(KeyEvent),
}

/// Everything the bridge knows about a failed call.
#[derive(Debug, Clone, Copy)]
pub struct ErrorContext<'a> {
    pub element: &'a Element,
    pub subject: Subject<'a>,
}

impl<'a> ErrorContext<'a> {
    pub fn new(element: &'a Element, subject: Subject<'a>) -> Self {
        Self { element, subject }
    }

    pub fn attribute(&self) -> Option<&'a str> {
        match self.subject {
            Subject::Attribute(attr) => Some(attr),
            Subject::ParameterizedAttribute { attribute, .. } => Some(attribute),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subject {
            Subject::None => write!(f, "talking to {:?}", self.element),
            Subject::Attribute(attr) => write!(f, "accessing {attr} on {:?}", self.element),
            Subject::Action(action) => write!(f, "performing {action} on {:?}", self.element),
            Subject::ParameterizedAttribute {
                attribute,
                parameter,
            } => write!(
                f,
                "accessing {attribute} with {parameter:?} on {:?}",
                self.element
            ),
            Subject::Point { x, y } => {
                write!(f, "looking up ({x}, {y}) for {:?}", self.element)
            }
            Subject::Timeout(seconds) => {
                write!(f, "setting a {seconds}s timeout on {:?}", self.element)
            }
            Subject::KeyEvent(event) => write!(f, "posting {event} to {:?}", self.element),
        }
    }
}

/// Classifies OS failures on behalf of the bridge.
///
/// Returning `Ok` substitutes a value for the failed call (`None` standing
/// for "no value"); returning `Err` raises.
pub trait ErrorHandler: Send + Sync {
    fn handle_error(
        &self,
        status: AxStatus,
        context: &ErrorContext<'_>,
    ) -> AxResult<Option<AttributeValue>>;
}

impl<F> ErrorHandler for F
where
    F: Fn(AxStatus, &ErrorContext<'_>) -> AxResult<Option<AttributeValue>> + Send + Sync,
{
    fn handle_error(
        &self,
        status: AxStatus,
        context: &ErrorContext<'_>,
    ) -> AxResult<Option<AttributeValue>> {
        self(status, context)
    }
}

/// Raises every failure as [`AxError::Api`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RaiseErrors;

impl ErrorHandler for RaiseErrors {
    fn handle_error(
        &self,
        status: AxStatus,
        context: &ErrorContext<'_>,
    ) -> AxResult<Option<AttributeValue>> {
        debug!("{} while {}", status, context);
        Err(AxError::Api {
            status,
            context: context.to_string(),
        })
    }
}

/// Conversion of a handler's substitute into an operation's result type.
pub(crate) trait Substitute: Sized {
    fn substitute(value: Option<AttributeValue>) -> AxResult<Self>;
}

fn mismatch<T>(expected: &'static str, value: Option<AttributeValue>) -> AxResult<T> {
    Err(AxError::TypeMismatch {
        expected,
        actual: value.map_or("no value", |v| v.kind_name()).to_string(),
    })
}

impl Substitute for Option<AttributeValue> {
    fn substitute(value: Option<AttributeValue>) -> AxResult<Self> {
        Ok(value)
    }
}

impl Substitute for AttributeValue {
    fn substitute(value: Option<AttributeValue>) -> AxResult<Self> {
        match value {
            Some(v) => Ok(v),
            None => mismatch("a value", None),
        }
    }
}

impl Substitute for Vec<String> {
    fn substitute(value: Option<AttributeValue>) -> AxResult<Self> {
        match value {
            None => Ok(Vec::new()),
            Some(AttributeValue::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    AttributeValue::String(s) => Ok(s),
                    other => mismatch("a list of names", Some(other)),
                })
                .collect(),
            other => mismatch("a list of names", other),
        }
    }
}

impl Substitute for bool {
    fn substitute(value: Option<AttributeValue>) -> AxResult<Self> {
        match value {
            None => Ok(false),
            Some(AttributeValue::Boolean(b)) => Ok(b),
            other => mismatch("a boolean", other),
        }
    }
}

impl Substitute for usize {
    fn substitute(value: Option<AttributeValue>) -> AxResult<Self> {
        match value {
            Some(AttributeValue::Integer(n)) if n >= 0 => Ok(n as usize),
            other => mismatch("a count", other),
        }
    }
}

impl Substitute for i32 {
    fn substitute(value: Option<AttributeValue>) -> AxResult<Self> {
        match value {
            Some(AttributeValue::Integer(n)) => {
                i32::try_from(n).or_else(|_| mismatch("a pid", Some(AttributeValue::Integer(n))))
            }
            other => mismatch("a pid", other),
        }
    }
}

impl Substitute for f32 {
    fn substitute(value: Option<AttributeValue>) -> AxResult<Self> {
        match value.as_ref().and_then(AttributeValue::as_f64) {
            Some(n) => Ok(n as f32),
            None => mismatch("seconds", value),
        }
    }
}

impl Substitute for String {
    fn substitute(value: Option<AttributeValue>) -> AxResult<Self> {
        match value {
            Some(AttributeValue::String(s)) => Ok(s),
            other => mismatch("a string", other),
        }
    }
}

impl Substitute for Option<Element> {
    fn substitute(value: Option<AttributeValue>) -> AxResult<Self> {
        match value {
            None => Ok(None),
            Some(AttributeValue::Element(e)) => Ok(Some(e)),
            other => mismatch("an element", other),
        }
    }
}

impl Substitute for () {
    fn substitute(_: Option<AttributeValue>) -> AxResult<Self> {
        Ok(())
    }
}
