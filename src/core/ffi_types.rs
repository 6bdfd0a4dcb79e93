// src/core/ffi_types.rs
//! FFI-layout types shared between the bridge and the Accessibility API
//!
//! The status code and the four boxed struct layouts are defined here rather
//! than taken from objc2-core-foundation so that the bridge logic builds and
//! tests on every target; only the system backend is macOS specific.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result code of every AXUIElement call (`AXError` in the C headers).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxStatus(pub i32);

impl AxStatus {
    pub const SUCCESS: AxStatus = AxStatus(0);
    pub const FAILURE: AxStatus = AxStatus(-25200);
    pub const ILLEGAL_ARGUMENT: AxStatus = AxStatus(-25201);
    pub const INVALID_UI_ELEMENT: AxStatus = AxStatus(-25202);
    pub const INVALID_UI_ELEMENT_OBSERVER: AxStatus = AxStatus(-25203);
    pub const CANNOT_COMPLETE: AxStatus = AxStatus(-25204);
    pub const ATTRIBUTE_UNSUPPORTED: AxStatus = AxStatus(-25205);
    pub const ACTION_UNSUPPORTED: AxStatus = AxStatus(-25206);
    pub const NOTIFICATION_UNSUPPORTED: AxStatus = AxStatus(-25207);
    pub const NOT_IMPLEMENTED: AxStatus = AxStatus(-25208);
    pub const NOTIFICATION_ALREADY_REGISTERED: AxStatus = AxStatus(-25209);
    pub const NOTIFICATION_NOT_REGISTERED: AxStatus = AxStatus(-25210);
    pub const API_DISABLED: AxStatus = AxStatus(-25211);
    /// The attribute, parameterized attribute or position has no value.
    pub const NO_VALUE: AxStatus = AxStatus(-25212);
    pub const PARAMETERIZED_ATTRIBUTE_UNSUPPORTED: AxStatus = AxStatus(-25213);
    pub const NOT_ENOUGH_PRECISION: AxStatus = AxStatus(-25214);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    pub fn is_no_value(self) -> bool {
        self == Self::NO_VALUE
    }

    /// Symbolic name of the code as it appears in `AXError.h`.
    ///
    /// Only used for log lines and messages; the bridge never branches on
    /// anything other than success and no-value.
    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "kAXErrorSuccess",
            -25200 => "kAXErrorFailure",
            -25201 => "kAXErrorIllegalArgument",
            -25202 => "kAXErrorInvalidUIElement",
            -25203 => "kAXErrorInvalidUIElementObserver",
            -25204 => "kAXErrorCannotComplete",
            -25205 => "kAXErrorAttributeUnsupported",
            -25206 => "kAXErrorActionUnsupported",
            -25207 => "kAXErrorNotificationUnsupported",
            -25208 => "kAXErrorNotImplemented",
            -25209 => "kAXErrorNotificationAlreadyRegistered",
            -25210 => "kAXErrorNotificationNotRegistered",
            -25211 => "kAXErrorAPIDisabled",
            -25212 => "kAXErrorNoValue",
            -25213 => "kAXErrorParameterizedAttributeUnsupported",
            -25214 => "kAXErrorNotEnoughPrecision",
            _ => "unknown AXError",
        }
    }
}

impl fmt::Display for AxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

impl From<i32> for AxStatus {
    fn from(code: i32) -> Self {
        AxStatus(code)
    }
}

// Layouts below mirror CGPoint, CGSize, CGRect and CFRange on 64-bit macOS
// (CGFloat = f64, CFIndex = isize).

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

/// Half-open range, `location..location + length`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub location: isize,
    pub length: isize,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }
}

impl Range {
    pub fn new(location: isize, length: isize) -> Self {
        Self { location, length }
    }
}
