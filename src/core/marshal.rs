// src/core/marshal.rs
//! Boxed struct marshaling
//!
//! `AXValueRef` boxes a fixed-layout struct behind a numeric tag. The tag is
//! the OS's own `AXValueType` value, so the table below is positional and must
//! stay in the OS order: index 0 is `kAXValueIllegalType` and never maps to a
//! layout, 1..=4 are point, size, rect and range. Anything else (including
//! `kAXValueAXErrorType`, 5) is rejected.

use std::mem;
use std::slice;

use serde::{Deserialize, Serialize};

use super::errors::{AxError, AxResult};
use super::ffi_types::{Point, Range, Rect, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoxKind {
    Point,
    Size,
    Rect,
    Range,
}

/// Tag-indexed layout table. Slot 0 is reserved by the OS.
pub const BOX_TYPES: [Option<BoxKind>; 5] = [
    None,
    Some(BoxKind::Point),
    Some(BoxKind::Size),
    Some(BoxKind::Rect),
    Some(BoxKind::Range),
];

impl BoxKind {
    pub fn from_raw(tag: u32) -> AxResult<Self> {
        BOX_TYPES
            .get(tag as usize)
            .copied()
            .flatten()
            .ok_or(AxError::InvalidBoxType(tag))
    }

    pub fn raw(self) -> u32 {
        match self {
            BoxKind::Point => 1,
            BoxKind::Size => 2,
            BoxKind::Rect => 3,
            BoxKind::Range => 4,
        }
    }
}

/// A decoded boxed struct.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AxStruct {
    Point(Point),
    Size(Size),
    Rect(Rect),
    Range(Range),
}

impl AxStruct {
    pub fn kind(&self) -> BoxKind {
        match self {
            AxStruct::Point(_) => BoxKind::Point,
            AxStruct::Size(_) => BoxKind::Size,
            AxStruct::Rect(_) => BoxKind::Rect,
            AxStruct::Range(_) => BoxKind::Range,
        }
    }

    /// Zero-initialised storage for `kind`, ready to be filled by the OS.
    pub(crate) fn zeroed(kind: BoxKind) -> Self {
        match kind {
            BoxKind::Point => AxStruct::Point(Point::default()),
            BoxKind::Size => AxStruct::Size(Size::default()),
            BoxKind::Rect => AxStruct::Rect(Rect::default()),
            BoxKind::Range => AxStruct::Range(Range::default()),
        }
    }

    /// Raw bytes of the inner `#[repr(C)]` struct.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        match self {
            AxStruct::Point(p) => bytes_of(p),
            AxStruct::Size(s) => bytes_of(s),
            AxStruct::Rect(r) => bytes_of(r),
            AxStruct::Range(r) => bytes_of(r),
        }
    }

    /// Mutable raw bytes of the inner struct. Every bit pattern is a valid
    /// value for these layouts (plain floats and integers).
    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            AxStruct::Point(p) => bytes_of_mut(p),
            AxStruct::Size(s) => bytes_of_mut(s),
            AxStruct::Rect(r) => bytes_of_mut(r),
            AxStruct::Range(r) => bytes_of_mut(r),
        }
    }
}

impl From<Point> for AxStruct {
    fn from(value: Point) -> Self {
        AxStruct::Point(value)
    }
}

impl From<Size> for AxStruct {
    fn from(value: Size) -> Self {
        AxStruct::Size(value)
    }
}

impl From<Rect> for AxStruct {
    fn from(value: Rect) -> Self {
        AxStruct::Rect(value)
    }
}

impl From<Range> for AxStruct {
    fn from(value: Range) -> Self {
        AxStruct::Range(value)
    }
}

fn bytes_of<T: Copy>(value: &T) -> &[u8] {
    unsafe { slice::from_raw_parts(value as *const T as *const u8, mem::size_of::<T>()) }
}

fn bytes_of_mut<T: Copy>(value: &mut T) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(value as *mut T as *mut u8, mem::size_of::<T>()) }
}
