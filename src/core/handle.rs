// src/core/handle.rs
//! Opaque handles for OS-owned accessibility objects
//!
//! An [`Element`] or [`BoxedValue`] holds exactly one reference count on the
//! underlying CF object. The OS decides when the object dies; the handle only
//! gives its count back when the last clone is dropped. Nothing outside this
//! crate can reach the raw pointer.

use std::ffi::c_void;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr::NonNull;
use std::sync::Arc;

/// Operations a handle delegates to whoever minted it.
///
/// The system backend fills this with `CFRelease`/`CFEqual`/`CFHash`; test
/// backends use plain pointer identity.
pub struct HandleOps {
    pub release: unsafe fn(*const c_void),
    pub equal: unsafe fn(*const c_void, *const c_void) -> bool,
    pub hash: unsafe fn(*const c_void) -> u64,
}

struct RawRef {
    ptr: NonNull<c_void>,
    ops: &'static HandleOps,
}

impl Drop for RawRef {
    fn drop(&mut self) {
        unsafe { (self.ops.release)(self.ptr.as_ptr()) }
    }
}

// CF objects are reference counted atomically and the AX types are
// documented as usable from any thread.
unsafe impl Send for RawRef {}
unsafe impl Sync for RawRef {}

#[derive(Clone)]
struct Handle(Arc<RawRef>);

impl Handle {
    fn from_owned(ptr: *const c_void, ops: &'static HandleOps) -> Option<Self> {
        NonNull::new(ptr as *mut c_void).map(|ptr| Handle(Arc::new(RawRef { ptr, ops })))
    }

    fn as_ptr(&self) -> *const c_void {
        self.0.ptr.as_ptr()
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        if !std::ptr::eq(self.0.ops, other.0.ops) {
            return false;
        }
        unsafe { (self.0.ops.equal)(self.as_ptr(), other.as_ptr()) }
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(unsafe { (self.0.ops.hash)(self.as_ptr()) });
    }
}

/// An accessibility element (`AXUIElementRef`): an application, a window, a
/// control, or the system-wide root.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Element(Handle);

impl Element {
    /// Take ownership of one reference count on `ptr`.
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    /// `ptr` must be a live object that `ops` knows how to release, and the
    /// caller must own the reference being transferred.
    pub unsafe fn from_owned(ptr: *const c_void, ops: &'static HandleOps) -> Option<Self> {
        Handle::from_owned(ptr, ops).map(Element)
    }

    pub(crate) fn as_ptr(&self) -> *const c_void {
        self.0.as_ptr()
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element({:p})", self.as_ptr())
    }
}

/// An OS boxed struct (`AXValueRef`). Decode it with
/// [`Accessibility::unbox`](crate::core::accessibility::Accessibility::unbox).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BoxedValue(Handle);

impl BoxedValue {
    /// Take ownership of one reference count on `ptr`.
    ///
    /// # Safety
    /// Same contract as [`Element::from_owned`].
    pub unsafe fn from_owned(ptr: *const c_void, ops: &'static HandleOps) -> Option<Self> {
        Handle::from_owned(ptr, ops).map(BoxedValue)
    }

    pub(crate) fn as_ptr(&self) -> *const c_void {
        self.0.as_ptr()
    }
}

impl fmt::Debug for BoxedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoxedValue({:p})", self.as_ptr())
    }
}
