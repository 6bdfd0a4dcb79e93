// src/core/names.rs
//! Attribute and action names the bridge itself refers to
//!
//! These are the `kAX...` string constants from `AXAttributeConstants.h` and
//! `AXActionConstants.h`. The bridge does not validate names; any string the
//! OS understands can be passed to the attribute and action operations.

pub const ROLE: &str = "AXRole";
pub const SUBROLE: &str = "AXSubrole";
pub const TITLE: &str = "AXTitle";
pub const VALUE: &str = "AXValue";
pub const CHILDREN: &str = "AXChildren";
pub const SIZE: &str = "AXSize";
pub const FOCUSED_APPLICATION: &str = "AXFocusedApplication";

pub const STRING_FOR_RANGE: &str = "AXStringForRange";
pub const BOUNDS_FOR_RANGE: &str = "AXBoundsForRange";

pub const PRESS: &str = "AXPress";
pub const OPEN: &str = "AXOpen";
