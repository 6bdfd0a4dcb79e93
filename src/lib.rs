//! Accessibility bridge for macOS
//!
//! Reads and writes attributes of UI elements in other applications,
//! performs their actions, resolves elements by screen position and posts
//! keyboard events, all through the `AXUIElement` API. Every OS failure is
//! handed to a pluggable [`ErrorHandler`] instead of being interpreted here.
//!
//! ```no_run
//! # #[cfg(target_os = "macos")]
//! # fn main() -> ax_bridge::AxResult<()> {
//! use ax_bridge::prelude::*;
//!
//! let ax = Accessibility::new(SystemBackend::new());
//! let system = ax.system_wide()?;
//! if let Some(element) = ax.element_at_point(&system, 100.0, 100.0)? {
//!     println!("{}", ax.role(&element)?);
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(target_os = "macos"))]
//! # fn main() {}
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

pub mod core;

pub use crate::core::names;
pub use crate::core::{
    Accessibility, AttributeValue, AxError, AxResult, AxStatus, AxStruct, Backend, BoxKind,
    BoxedValue, Element, ErrorContext, ErrorHandler, KeyEvent, Point, RaiseErrors, Range, Rect,
    Size, Subject, KEY_RATE,
};

#[cfg(target_os = "macos")]
pub use crate::core::system::SystemBackend;

/// The bridge wired to the live OS with the default raising handler.
#[cfg(target_os = "macos")]
pub type SystemAccessibility = Accessibility<SystemBackend>;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::core::{
        Accessibility, AttributeValue, AxError, AxResult, AxStruct, Element, ErrorContext,
        ErrorHandler, KeyEvent, Point, Range, Rect, Size,
    };

    #[cfg(target_os = "macos")]
    pub use crate::core::system::SystemBackend;
}
