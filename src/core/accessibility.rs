// src/core/accessibility.rs
//! Value-returning operations over the accessibility object model
//!
//! Every operation follows the same shape: issue one backend call, then
//! either return the decoded value, return `None` when the OS says the slot
//! has no value (only where the protocol distinguishes that case), or hand
//! the status to the [`ErrorHandler`] together with the call's context.
//! Nothing here retries, caches, or holds mutable state, so one
//! `Accessibility` can be shared freely between threads.

use tracing::{debug, trace};

use super::backend::{Backend, OsResult};
use super::errors::{AxError, AxResult, ErrorContext, ErrorHandler, RaiseErrors, Subject, Substitute};
use super::ffi_types::AxStatus;
use super::handle::{BoxedValue, Element};
use super::marshal::{AxStruct, BoxKind};
use super::names;
use super::value::AttributeValue;

pub struct Accessibility<B, H = RaiseErrors> {
    backend: B,
    handler: H,
}

impl<B: Backend> Accessibility<B, RaiseErrors> {
    /// Bridge that raises every OS failure as [`AxError::Api`].
    pub fn new(backend: B) -> Self {
        Self::with_handler(backend, RaiseErrors)
    }
}

impl<B: Backend, H: ErrorHandler> Accessibility<B, H> {
    pub fn with_handler(backend: B, handler: H) -> Self {
        Self { backend, handler }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    // ---- attributes ------------------------------------------------------

    /// Names of every attribute `element` exposes. An element without
    /// attributes yields an empty list.
    pub fn attribute_names(&self, element: &Element) -> AxResult<Vec<String>> {
        let result = self.backend.copy_attribute_names(element);
        self.settle(result, element, Subject::None)
    }

    /// Size of an array-valued attribute without copying the array.
    pub fn attribute_value_count(&self, element: &Element, attribute: &str) -> AxResult<usize> {
        let result = self.backend.attribute_value_count(element, attribute);
        self.settle(result, element, Subject::Attribute(attribute))
    }

    /// Raw value of `attribute`. Elements stay handles and boxed structs stay
    /// boxed; `None` means the attribute currently has no value.
    pub fn attribute(&self, element: &Element, attribute: &str) -> AxResult<Option<AttributeValue>> {
        let result = self.backend.copy_attribute_value(element, attribute);
        self.settle_optional(result, element, Subject::Attribute(attribute))
    }

    /// The element's role.
    ///
    /// Every valid accessibility object has a role, so a missing role is not
    /// treated as absence: it goes to the error handler like any failure.
    pub fn role(&self, element: &Element) -> AxResult<String> {
        match self.backend.copy_attribute_value(element, names::ROLE) {
            Ok(AttributeValue::String(role)) => Ok(role),
            Ok(other) => Err(AxError::TypeMismatch {
                expected: "a role string",
                actual: other.kind_name().to_string(),
            }),
            Err(status) => self.delegate(status, element, Subject::Attribute(names::ROLE)),
        }
    }

    /// `(subrole, role)`, subrole first. Many elements have no subrole.
    pub fn role_pair(&self, element: &Element) -> AxResult<(Option<String>, String)> {
        let role = self.role(element)?;
        let subrole = match self.attribute(element, names::SUBROLE)? {
            None => None,
            Some(AttributeValue::String(subrole)) => Some(subrole),
            Some(other) => {
                return Err(AxError::TypeMismatch {
                    expected: "a subrole string",
                    actual: other.kind_name().to_string(),
                })
            }
        };
        Ok((subrole, role))
    }

    pub fn children(&self, element: &Element) -> AxResult<Option<AttributeValue>> {
        self.attribute(element, names::CHILDREN)
    }

    pub fn value(&self, element: &Element) -> AxResult<Option<AttributeValue>> {
        self.attribute(element, names::VALUE)
    }

    /// Whether `attribute` can be written. "No value" reads as `false`.
    pub fn is_attribute_writable(&self, element: &Element, attribute: &str) -> AxResult<bool> {
        match self.backend.is_attribute_settable(element, attribute) {
            Ok(writable) => Ok(writable),
            Err(status) if status.is_no_value() => Ok(false),
            Err(status) => self.delegate(status, element, Subject::Attribute(attribute)),
        }
    }

    /// Write `value` and return it.
    ///
    /// Writability is not checked first, and the returned value is the one
    /// requested, not a fresh read of the attribute.
    pub fn set_attribute(
        &self,
        element: &Element,
        attribute: &str,
        value: AttributeValue,
    ) -> AxResult<AttributeValue> {
        ensure_encodable(&value)?;
        match self.backend.set_attribute_value(element, attribute, &value) {
            Ok(()) => Ok(value),
            Err(status) => self.delegate(status, element, Subject::Attribute(attribute)),
        }
    }

    // ---- actions ---------------------------------------------------------

    /// Names of the actions `element` can perform, possibly empty.
    pub fn action_names(&self, element: &Element) -> AxResult<Vec<String>> {
        let result = self.backend.copy_action_names(element);
        self.settle(result, element, Subject::None)
    }

    /// Perform `action`. Actions have no "no value" outcome: this returns
    /// `true` or whatever the error handler decides.
    pub fn perform_action(&self, element: &Element, action: &str) -> AxResult<bool> {
        trace!("performing {} on {:?}", action, element);
        match self.backend.perform_action(element, action) {
            Ok(()) => Ok(true),
            Err(status) => self.delegate(status, element, Subject::Action(action)),
        }
    }

    // ---- parameterized attributes ----------------------------------------

    pub fn parameterized_attribute_names(&self, element: &Element) -> AxResult<Vec<String>> {
        let result = self.backend.copy_parameterized_attribute_names(element);
        self.settle(result, element, Subject::None)
    }

    /// Read `attribute` for `parameter`. Struct parameters must already be
    /// boxed (see [`Accessibility::box_struct`]).
    pub fn parameterized_attribute(
        &self,
        element: &Element,
        attribute: &str,
        parameter: &AttributeValue,
    ) -> AxResult<Option<AttributeValue>> {
        ensure_encodable(parameter)?;
        let result = self
            .backend
            .copy_parameterized_attribute_value(element, attribute, parameter);
        self.settle_optional(
            result,
            element,
            Subject::ParameterizedAttribute {
                attribute,
                parameter,
            },
        )
    }

    // ---- boxed structs ---------------------------------------------------

    /// Decode the struct inside an OS box.
    pub fn unbox(&self, boxed: &BoxedValue) -> AxResult<AxStruct> {
        let tag = self.backend.value_type(boxed);
        let kind = BoxKind::from_raw(tag).map_err(|err| {
            debug!("refusing to unbox {:?}: {}", boxed, err);
            err
        })?;
        let mut decoded = AxStruct::zeroed(kind);
        if self.backend.value_get(boxed, tag, decoded.as_bytes_mut()) {
            Ok(decoded)
        } else {
            Err(AxError::Unboxing(kind))
        }
    }

    /// Box a struct so it can be written or passed as a parameter.
    pub fn box_struct(&self, value: &AxStruct) -> AxResult<BoxedValue> {
        let kind = value.kind();
        self.backend
            .value_create(kind.raw(), value.as_bytes())
            .ok_or(AxError::BoxCreation(kind))
    }

    // ---- hierarchy entry points ------------------------------------------

    /// Top-most element of `application` at `(x, y)`, in top-left-origin
    /// screen coordinates. Pass the system-wide element to search across all
    /// applications. `None` when nothing is there.
    pub fn element_at_point(&self, application: &Element, x: f32, y: f32) -> AxResult<Option<Element>> {
        let result = self.backend.copy_element_at_position(application, x, y);
        self.settle_optional(result, application, Subject::Point { x, y })
    }

    /// Application element for a running process.
    ///
    /// Pending process notifications are drained before the liveness check
    /// so that applications which just launched or quit are seen correctly.
    pub fn application_for(&self, pid: i32) -> AxResult<Element> {
        self.backend.drain_process_events();
        if !self.backend.is_process_running(pid) {
            debug!("pid {} is not a running application", pid);
            return Err(AxError::ProcessNotRunning(pid));
        }
        self.backend
            .create_application(pid)
            .ok_or(AxError::NullHandle("application"))
    }

    /// The system-wide root element.
    pub fn system_wide(&self) -> AxResult<Element> {
        self.backend
            .create_system_wide()
            .ok_or(AxError::NullHandle("system-wide"))
    }

    /// PID of the application `element` belongs to.
    pub fn pid_for(&self, element: &Element) -> AxResult<i32> {
        let result = self.backend.pid(element);
        self.settle(result, element, Subject::None)
    }

    // ---- misc ------------------------------------------------------------

    /// Messaging timeout for `element`, or for every element when given the
    /// system-wide root. Returns the timeout that was set.
    pub fn set_timeout(&self, element: &Element, seconds: f32) -> AxResult<f32> {
        match self.backend.set_messaging_timeout(element, seconds) {
            Ok(()) => Ok(seconds),
            Err(status) => self.delegate(status, element, Subject::Timeout(seconds)),
        }
    }

    /// Whether this process is allowed to use the accessibility API.
    pub fn is_trusted(&self) -> bool {
        self.backend.is_process_trusted()
    }

    // ---- status plumbing -------------------------------------------------

    pub(crate) fn delegate<T: Substitute>(
        &self,
        status: AxStatus,
        element: &Element,
        subject: Subject<'_>,
    ) -> AxResult<T> {
        let context = ErrorContext::new(element, subject);
        trace!("delegating {} while {}", status, context);
        T::substitute(self.handler.handle_error(status, &context)?)
    }

    fn settle<T: Substitute>(
        &self,
        result: OsResult<T>,
        element: &Element,
        subject: Subject<'_>,
    ) -> AxResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(status) => self.delegate(status, element, subject),
        }
    }

    fn settle_optional<T>(
        &self,
        result: OsResult<T>,
        element: &Element,
        subject: Subject<'_>,
    ) -> AxResult<Option<T>>
    where
        Option<T>: Substitute,
    {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(status) if status.is_no_value() => Ok(None),
            Err(status) => self.delegate(status, element, subject),
        }
    }
}

/// Values the bridge could not decode cannot be handed back to the OS.
fn ensure_encodable(value: &AttributeValue) -> AxResult<()> {
    match value {
        AttributeValue::Other(description) => Err(AxError::Unencodable(description.clone())),
        AttributeValue::Array(items) => items.iter().try_for_each(ensure_encodable),
        _ => Ok(()),
    }
}
