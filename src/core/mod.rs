// src/core/mod.rs
//! Bridging layer between Rust and the macOS accessibility API

pub mod accessibility;
pub mod backend;
pub mod errors;
pub mod ffi_types;
pub mod handle;
pub mod keyboard;
pub mod marshal;
pub mod names;
pub mod value;

#[cfg(target_os = "macos")]
pub mod system;

#[cfg(test)]
pub(crate) mod mock;

pub use accessibility::Accessibility;
pub use backend::{Backend, OsResult};
pub use errors::{AxError, AxResult, ErrorContext, ErrorHandler, RaiseErrors, Subject};
pub use ffi_types::{AxStatus, Point, Range, Rect, Size};
pub use handle::{BoxedValue, Element, HandleOps};
pub use keyboard::{KeyEvent, KEY_RATE};
pub use marshal::{AxStruct, BoxKind};
pub use value::AttributeValue;
