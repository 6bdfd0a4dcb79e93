// src/core/backend.rs
//! The seam between the bridge and the operating system
//!
//! One method per underlying call. Implementations own all output-slot
//! plumbing and report any non-success status as `Err(status)`; they never
//! decide what a status means.

use super::ffi_types::AxStatus;
use super::handle::{BoxedValue, Element};
use super::value::AttributeValue;

pub type OsResult<T> = Result<T, AxStatus>;

pub trait Backend: Send + Sync {
    // Attributes
    fn copy_attribute_names(&self, element: &Element) -> OsResult<Vec<String>>;
    fn attribute_value_count(&self, element: &Element, attribute: &str) -> OsResult<usize>;
    fn copy_attribute_value(&self, element: &Element, attribute: &str) -> OsResult<AttributeValue>;
    fn is_attribute_settable(&self, element: &Element, attribute: &str) -> OsResult<bool>;
    fn set_attribute_value(
        &self,
        element: &Element,
        attribute: &str,
        value: &AttributeValue,
    ) -> OsResult<()>;

    // Actions
    fn copy_action_names(&self, element: &Element) -> OsResult<Vec<String>>;
    fn perform_action(&self, element: &Element, action: &str) -> OsResult<()>;

    // Parameterized attributes
    fn copy_parameterized_attribute_names(&self, element: &Element) -> OsResult<Vec<String>>;
    fn copy_parameterized_attribute_value(
        &self,
        element: &Element,
        attribute: &str,
        parameter: &AttributeValue,
    ) -> OsResult<AttributeValue>;

    // Hierarchy entry points
    fn copy_element_at_position(&self, application: &Element, x: f32, y: f32)
        -> OsResult<Element>;
    fn create_application(&self, pid: i32) -> Option<Element>;
    fn create_system_wide(&self) -> Option<Element>;
    fn pid(&self, element: &Element) -> OsResult<i32>;

    // Input and timeouts
    fn post_keyboard_event(&self, application: &Element, key_code: u16, key_down: bool)
        -> OsResult<()>;
    fn set_messaging_timeout(&self, element: &Element, seconds: f32) -> OsResult<()>;

    // AXValue
    fn value_type(&self, value: &BoxedValue) -> u32;
    /// Copy the boxed struct into `out` if the box holds a `tag` value of
    /// exactly `out.len()` bytes.
    fn value_get(&self, value: &BoxedValue, tag: u32, out: &mut [u8]) -> bool;
    fn value_create(&self, tag: u32, bytes: &[u8]) -> Option<BoxedValue>;

    // Process bookkeeping
    /// Let the OS deliver pending launch/terminate notifications to this
    /// thread so the next liveness query sees current state.
    fn drain_process_events(&self);
    fn is_process_running(&self, pid: i32) -> bool;
    fn is_process_trusted(&self) -> bool;
}

/// Names out of a copied name list. The OS may report success without
/// producing a list; that is an empty list, not a missing value.
pub(crate) fn name_list(list: Option<AttributeValue>) -> Vec<String> {
    match list {
        Some(AttributeValue::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                AttributeValue::String(name) => Some(name),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_name_list_is_empty() {
        assert_eq!(name_list(None), Vec::<String>::new());
    }

    #[test]
    fn test_name_list_keeps_strings_in_order() {
        let list = AttributeValue::Array(vec!["AXRole".into(), 3.into(), "AXTitle".into()]);
        assert_eq!(
            name_list(Some(list)),
            vec!["AXRole".to_string(), "AXTitle".to_string()]
        );
        assert_eq!(name_list(Some("AXRole".into())), Vec::<String>::new());
    }
}
