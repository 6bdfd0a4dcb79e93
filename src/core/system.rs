// src/core/system.rs
//! macOS backend over ApplicationServices and CoreFoundation
//!
//! Each call gets its own scratch output slot, and every object copied out
//! of the OS is either decoded into a plain value or retained into a handle
//! before the slot's reference is given back.

use std::ffi::c_void;
use std::ptr;

use accessibility_sys::{
    kAXErrorSuccess, AXError, AXIsProcessTrusted, AXUIElementCopyActionNames,
    AXUIElementCopyAttributeNames, AXUIElementCopyAttributeValue,
    AXUIElementCopyElementAtPosition, AXUIElementCopyParameterizedAttributeNames,
    AXUIElementCopyParameterizedAttributeValue, AXUIElementCreateApplication,
    AXUIElementCreateSystemWide, AXUIElementGetAttributeValueCount, AXUIElementGetPid,
    AXUIElementGetTypeID, AXUIElementIsAttributeSettable, AXUIElementPerformAction,
    AXUIElementPostKeyboardEvent, AXUIElementRef, AXUIElementSetAttributeValue,
    AXUIElementSetMessagingTimeout, AXValueCreate, AXValueGetType, AXValueGetTypeID,
    AXValueGetValue, AXValueRef,
};
use core_foundation::array::CFArray;
use core_foundation::base::{CFType, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::number::CFNumber;
use core_foundation::string::CFString;
use core_foundation::url::CFURL;
use core_foundation_sys::array::{CFArrayGetCount, CFArrayGetTypeID, CFArrayGetValueAtIndex, CFArrayRef};
use core_foundation_sys::base::{
    Boolean, CFEqual, CFGetTypeID, CFHash, CFIndex, CFRelease, CFRetain, CFTypeRef,
};
use core_foundation_sys::number::{kCFBooleanTrue, CFBooleanGetTypeID, CFNumberGetTypeID, CFNumberRef};
use core_foundation_sys::string::{CFStringGetTypeID, CFStringRef};
use core_foundation_sys::url::{CFURLCreateWithString, CFURLGetTypeID, CFURLRef};
use objc2::rc::Retained;
use objc2_app_kit::NSRunningApplication;
use objc2_foundation::{NSDate, NSRunLoop};
use tracing::trace;

use super::backend::{name_list, Backend, OsResult};
use super::ffi_types::AxStatus;
use super::handle::{BoxedValue, Element, HandleOps};
use super::value::AttributeValue;

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFNumberIsFloatType(number: CFNumberRef) -> Boolean;
}

unsafe fn cf_release(cf: *const c_void) {
    unsafe { CFRelease(cf) }
}

unsafe fn cf_equal(a: *const c_void, b: *const c_void) -> bool {
    unsafe { CFEqual(a, b) != 0 }
}

unsafe fn cf_hash(cf: *const c_void) -> u64 {
    unsafe { CFHash(cf) as u64 }
}

/// Handle operations backed by the CoreFoundation reference count.
pub static CF_OPS: HandleOps = HandleOps {
    release: cf_release,
    equal: cf_equal,
    hash: cf_hash,
};

fn check(code: AXError) -> OsResult<()> {
    if code == kAXErrorSuccess {
        Ok(())
    } else {
        Err(AxStatus(code))
    }
}

/// The live accessibility API of the current macOS session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBackend;

impl SystemBackend {
    pub fn new() -> Self {
        SystemBackend
    }

    fn element_ref(element: &Element) -> AXUIElementRef {
        element.as_ptr() as AXUIElementRef
    }

    /// Copy a name-list out of a `Copy...Names` call.
    fn copy_names(
        element: &Element,
        call: unsafe extern "C" fn(AXUIElementRef, *mut CFArrayRef) -> AXError,
    ) -> OsResult<Vec<String>> {
        let mut names: CFArrayRef = ptr::null();
        check(unsafe { call(Self::element_ref(element), &mut names) })?;
        let names = unsafe { take_copied(names as CFTypeRef) };
        Ok(name_list(names.map(|list| unsafe { decode(list.as_CFTypeRef()) })))
    }
}

/// Wrap a +1 reference from a Copy/Create call so it is released on drop.
/// A null slot means the OS reported success without producing a value.
unsafe fn take_copied(value: CFTypeRef) -> Option<CFType> {
    if value.is_null() {
        None
    } else {
        Some(unsafe { CFType::wrap_under_create_rule(value) })
    }
}

/// Decode a borrowed CF object into a bridge value.
unsafe fn decode(value: CFTypeRef) -> AttributeValue {
    let type_id = unsafe { CFGetTypeID(value) };
    unsafe {
        if type_id == CFStringGetTypeID() {
            AttributeValue::String(CFString::wrap_under_get_rule(value as CFStringRef).to_string())
        } else if type_id == CFBooleanGetTypeID() {
            AttributeValue::Boolean(value == kCFBooleanTrue as CFTypeRef)
        } else if type_id == CFNumberGetTypeID() {
            let number = CFNumber::wrap_under_get_rule(value as CFNumberRef);
            if CFNumberIsFloatType(value as CFNumberRef) != 0 {
                AttributeValue::Float(number.to_f64().unwrap_or_default())
            } else {
                AttributeValue::Integer(number.to_i64().unwrap_or_default())
            }
        } else if type_id == CFArrayGetTypeID() {
            let array = value as CFArrayRef;
            let count = CFArrayGetCount(array);
            AttributeValue::Array(
                (0..count)
                    .map(|i| decode(CFArrayGetValueAtIndex(array, i) as CFTypeRef))
                    .collect(),
            )
        } else if type_id == AXUIElementGetTypeID() {
            CFRetain(value);
            match Element::from_owned(value, &CF_OPS) {
                Some(element) => AttributeValue::Element(element),
                None => AttributeValue::Other("null element".to_string()),
            }
        } else if type_id == AXValueGetTypeID() {
            CFRetain(value);
            match BoxedValue::from_owned(value, &CF_OPS) {
                Some(boxed) => AttributeValue::Boxed(boxed),
                None => AttributeValue::Other("null value".to_string()),
            }
        } else if type_id == CFURLGetTypeID() {
            let url = CFURL::wrap_under_get_rule(value as CFURLRef);
            AttributeValue::Url(url.get_string().to_string())
        } else {
            AttributeValue::Other(format!("{:?}", CFType::wrap_under_get_rule(value)))
        }
    }
}

/// Build an owned CF object for a bridge value.
fn encode(value: &AttributeValue) -> OsResult<CFType> {
    Ok(match value {
        AttributeValue::Boolean(b) => CFBoolean::from(*b).as_CFType(),
        AttributeValue::Integer(n) => CFNumber::from(*n).as_CFType(),
        AttributeValue::Float(n) => CFNumber::from(*n).as_CFType(),
        AttributeValue::String(s) => CFString::new(s).as_CFType(),
        AttributeValue::Url(s) => {
            let string = CFString::new(s);
            let url = unsafe {
                CFURLCreateWithString(ptr::null(), string.as_concrete_TypeRef(), ptr::null())
            };
            unsafe { take_copied(url as CFTypeRef) }.ok_or(AxStatus::ILLEGAL_ARGUMENT)?
        }
        AttributeValue::Array(items) => {
            let encoded = items.iter().map(encode).collect::<OsResult<Vec<CFType>>>()?;
            CFArray::from_CFTypes(&encoded).as_CFType()
        }
        AttributeValue::Element(element) => unsafe { CFType::wrap_under_get_rule(element.as_ptr()) },
        AttributeValue::Boxed(boxed) => unsafe { CFType::wrap_under_get_rule(boxed.as_ptr()) },
        AttributeValue::Other(_) => return Err(AxStatus::ILLEGAL_ARGUMENT),
    })
}

impl Backend for SystemBackend {
    fn copy_attribute_names(&self, element: &Element) -> OsResult<Vec<String>> {
        Self::copy_names(element, AXUIElementCopyAttributeNames)
    }

    fn attribute_value_count(&self, element: &Element, attribute: &str) -> OsResult<usize> {
        let attribute = CFString::new(attribute);
        let mut count: CFIndex = 0;
        check(unsafe {
            AXUIElementGetAttributeValueCount(
                Self::element_ref(element),
                attribute.as_concrete_TypeRef(),
                &mut count,
            )
        })?;
        Ok(count.max(0) as usize)
    }

    fn copy_attribute_value(&self, element: &Element, attribute: &str) -> OsResult<AttributeValue> {
        trace!("AXUIElementCopyAttributeValue({:?}, {})", element, attribute);
        let attribute = CFString::new(attribute);
        let mut value: CFTypeRef = ptr::null();
        check(unsafe {
            AXUIElementCopyAttributeValue(
                Self::element_ref(element),
                attribute.as_concrete_TypeRef(),
                &mut value,
            )
        })?;
        let value = unsafe { take_copied(value) }.ok_or(AxStatus::NO_VALUE)?;
        Ok(unsafe { decode(value.as_CFTypeRef()) })
    }

    fn is_attribute_settable(&self, element: &Element, attribute: &str) -> OsResult<bool> {
        let attribute = CFString::new(attribute);
        let mut settable: Boolean = 0;
        check(unsafe {
            AXUIElementIsAttributeSettable(
                Self::element_ref(element),
                attribute.as_concrete_TypeRef(),
                &mut settable,
            )
        })?;
        Ok(settable != 0)
    }

    fn set_attribute_value(
        &self,
        element: &Element,
        attribute: &str,
        value: &AttributeValue,
    ) -> OsResult<()> {
        let attribute = CFString::new(attribute);
        let value = encode(value)?;
        check(unsafe {
            AXUIElementSetAttributeValue(
                Self::element_ref(element),
                attribute.as_concrete_TypeRef(),
                value.as_CFTypeRef(),
            )
        })
    }

    fn copy_action_names(&self, element: &Element) -> OsResult<Vec<String>> {
        Self::copy_names(element, AXUIElementCopyActionNames)
    }

    fn perform_action(&self, element: &Element, action: &str) -> OsResult<()> {
        let action = CFString::new(action);
        check(unsafe {
            AXUIElementPerformAction(Self::element_ref(element), action.as_concrete_TypeRef())
        })
    }

    fn copy_parameterized_attribute_names(&self, element: &Element) -> OsResult<Vec<String>> {
        Self::copy_names(element, AXUIElementCopyParameterizedAttributeNames)
    }

    fn copy_parameterized_attribute_value(
        &self,
        element: &Element,
        attribute: &str,
        parameter: &AttributeValue,
    ) -> OsResult<AttributeValue> {
        let attribute = CFString::new(attribute);
        let parameter = encode(parameter)?;
        let mut value: CFTypeRef = ptr::null();
        check(unsafe {
            AXUIElementCopyParameterizedAttributeValue(
                Self::element_ref(element),
                attribute.as_concrete_TypeRef(),
                parameter.as_CFTypeRef(),
                &mut value,
            )
        })?;
        let value = unsafe { take_copied(value) }.ok_or(AxStatus::NO_VALUE)?;
        Ok(unsafe { decode(value.as_CFTypeRef()) })
    }

    fn copy_element_at_position(&self, application: &Element, x: f32, y: f32) -> OsResult<Element> {
        let mut hit: AXUIElementRef = ptr::null_mut::<c_void>() as AXUIElementRef;
        check(unsafe {
            AXUIElementCopyElementAtPosition(Self::element_ref(application), x, y, &mut hit)
        })?;
        unsafe { Element::from_owned(hit as *const c_void, &CF_OPS) }.ok_or(AxStatus::NO_VALUE)
    }

    fn create_application(&self, pid: i32) -> Option<Element> {
        unsafe {
            let app = AXUIElementCreateApplication(pid as libc::pid_t);
            Element::from_owned(app as *const c_void, &CF_OPS)
        }
    }

    fn create_system_wide(&self) -> Option<Element> {
        unsafe {
            let system = AXUIElementCreateSystemWide();
            Element::from_owned(system as *const c_void, &CF_OPS)
        }
    }

    fn pid(&self, element: &Element) -> OsResult<i32> {
        let mut pid: libc::pid_t = 0;
        check(unsafe { AXUIElementGetPid(Self::element_ref(element), &mut pid) })?;
        Ok(pid)
    }

    fn post_keyboard_event(&self, application: &Element, key_code: u16, key_down: bool) -> OsResult<()> {
        // keyChar 0 lets the OS derive the character from the virtual key
        check(unsafe {
            AXUIElementPostKeyboardEvent(Self::element_ref(application), 0, key_code, key_down)
        })
    }

    fn set_messaging_timeout(&self, element: &Element, seconds: f32) -> OsResult<()> {
        check(unsafe { AXUIElementSetMessagingTimeout(Self::element_ref(element), seconds) })
    }

    fn value_type(&self, value: &BoxedValue) -> u32 {
        unsafe { AXValueGetType(value.as_ptr() as AXValueRef) as u32 }
    }

    fn value_get(&self, value: &BoxedValue, tag: u32, out: &mut [u8]) -> bool {
        unsafe {
            AXValueGetValue(
                value.as_ptr() as AXValueRef,
                tag as _,
                out.as_mut_ptr() as *mut c_void,
            )
        }
    }

    fn value_create(&self, tag: u32, bytes: &[u8]) -> Option<BoxedValue> {
        unsafe {
            let value = AXValueCreate(tag as _, bytes.as_ptr() as *const c_void);
            BoxedValue::from_owned(value as *const c_void, &CF_OPS)
        }
    }

    fn drain_process_events(&self) {
        unsafe {
            let run_loop = NSRunLoop::currentRunLoop();
            run_loop.runUntilDate(&NSDate::now());
        }
    }

    fn is_process_running(&self, pid: i32) -> bool {
        let app: Option<Retained<NSRunningApplication>> = unsafe {
            NSRunningApplication::runningApplicationWithProcessIdentifier(pid as libc::pid_t)
        };
        app.is_some()
    }

    fn is_process_trusted(&self) -> bool {
        unsafe { AXIsProcessTrusted() }
    }
}
