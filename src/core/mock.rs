// src/core/mock.rs
//! In-memory backend and recording error handler for unit tests.

use std::collections::{HashMap, HashSet};
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::backend::{Backend, OsResult};
use super::errors::{AxResult, ErrorContext, ErrorHandler, Subject};
use super::ffi_types::AxStatus;
use super::handle::{BoxedValue, Element, HandleOps};
use super::keyboard::KeyEvent;
use super::value::AttributeValue;

unsafe fn no_release(_: *const c_void) {}

unsafe fn same_ptr(a: *const c_void, b: *const c_void) -> bool {
    a == b
}

unsafe fn ptr_hash(p: *const c_void) -> u64 {
    p as u64
}

static MOCK_OPS: HandleOps = HandleOps {
    release: no_release,
    equal: same_ptr,
    hash: ptr_hash,
};

fn id(ptr: *const c_void) -> usize {
    ptr as usize
}

type Key = (usize, String);

#[derive(Default)]
struct State {
    calls: Vec<&'static str>,
    attribute_names: HashMap<usize, OsResult<Vec<String>>>,
    attributes: HashMap<Key, OsResult<AttributeValue>>,
    settable: HashMap<Key, OsResult<bool>>,
    write_failures: HashMap<Key, AxStatus>,
    writes: Vec<(String, AttributeValue)>,
    action_names: HashMap<usize, OsResult<Vec<String>>>,
    performed: Vec<String>,
    parameterized_names: HashMap<usize, OsResult<Vec<String>>>,
    parameterized: HashMap<Key, OsResult<AttributeValue>>,
    last_parameter: Option<AttributeValue>,
    positions: Vec<(usize, f32, f32, OsResult<Element>)>,
    pids: HashMap<usize, i32>,
    running: HashSet<i32>,
    pending_launches: HashSet<i32>,
    post_failures: HashMap<usize, AxStatus>,
    post_count: usize,
    posted: Vec<KeyEvent>,
    timeouts: Vec<f32>,
    timeout_failure: Option<AxStatus>,
    boxes: HashMap<usize, (u32, Vec<u8>)>,
    trusted: bool,
}

/// Scriptable stand-in for the macOS accessibility API.
///
/// Anything not scripted behaves like an element that exposes nothing:
/// empty name lists, unsupported attributes and actions, and no element
/// under any point.
pub(crate) struct MockBackend {
    next_id: AtomicUsize,
    system_wide: Element,
    state: Mutex<State>,
}

impl MockBackend {
    pub fn new() -> Self {
        let next_id = AtomicUsize::new(1);
        let system_wide = Self::mint(&next_id);
        Self {
            next_id,
            system_wide,
            state: Mutex::new(State::default()),
        }
    }

    fn mint(next_id: &AtomicUsize) -> Element {
        let token = next_id.fetch_add(1, Ordering::SeqCst) << 4;
        unsafe { Element::from_owned(token as *const c_void, &MOCK_OPS) }
            .expect("mock tokens are never null")
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: &'static str) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }

    /// A fresh element with nothing scripted on it.
    pub fn element(&self) -> Element {
        Self::mint(&self.next_id)
    }

    pub fn set_attribute_names(&self, element: &Element, names: OsResult<Vec<String>>) {
        self.state().attribute_names.insert(id(element.as_ptr()), names);
    }

    pub fn put_attribute(&self, element: &Element, name: &str, value: OsResult<AttributeValue>) {
        self.state()
            .attributes
            .insert((id(element.as_ptr()), name.to_string()), value);
    }

    pub fn put_settable(&self, element: &Element, name: &str, settable: OsResult<bool>) {
        self.state()
            .settable
            .insert((id(element.as_ptr()), name.to_string()), settable);
    }

    pub fn fail_write(&self, element: &Element, name: &str, status: AxStatus) {
        self.state()
            .write_failures
            .insert((id(element.as_ptr()), name.to_string()), status);
    }

    pub fn set_action_names(&self, element: &Element, names: OsResult<Vec<String>>) {
        self.state().action_names.insert(id(element.as_ptr()), names);
    }

    pub fn set_parameterized_names(&self, element: &Element, names: OsResult<Vec<String>>) {
        self.state()
            .parameterized_names
            .insert(id(element.as_ptr()), names);
    }

    pub fn put_parameterized(&self, element: &Element, name: &str, value: OsResult<AttributeValue>) {
        self.state()
            .parameterized
            .insert((id(element.as_ptr()), name.to_string()), value);
    }

    pub fn put_position(&self, application: &Element, x: f32, y: f32, hit: OsResult<Element>) {
        self.state()
            .positions
            .push((id(application.as_ptr()), x, y, hit));
    }

    /// A process that is already running.
    pub fn launch(&self, pid: i32) {
        self.state().running.insert(pid);
    }

    /// A process whose launch notification has not been delivered yet.
    pub fn launch_pending(&self, pid: i32) {
        self.state().pending_launches.insert(pid);
    }

    /// Make the `index`th post (0-based, across the mock's lifetime) fail.
    pub fn fail_post(&self, index: usize, status: AxStatus) {
        self.state().post_failures.insert(index, status);
    }

    pub fn fail_timeouts(&self, status: AxStatus) {
        self.state().timeout_failure = Some(status);
    }

    pub fn trust(&self, trusted: bool) {
        self.state().trusted = trusted;
    }

    /// A box with an arbitrary tag, as a misbehaving OS would hand out.
    pub fn forge_box(&self, tag: u32, bytes: &[u8]) -> BoxedValue {
        self.store_box(tag, bytes)
    }

    fn store_box(&self, tag: u32, bytes: &[u8]) -> BoxedValue {
        let token = self.next_id.fetch_add(1, Ordering::SeqCst) << 4;
        self.state().boxes.insert(token, (tag, bytes.to_vec()));
        unsafe { BoxedValue::from_owned(token as *const c_void, &MOCK_OPS) }
            .expect("mock tokens are never null")
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    pub fn writes(&self) -> Vec<(String, AttributeValue)> {
        self.state().writes.clone()
    }

    pub fn performed(&self) -> Vec<String> {
        self.state().performed.clone()
    }

    pub fn last_parameter(&self) -> Option<AttributeValue> {
        self.state().last_parameter.clone()
    }

    pub fn posted(&self) -> Vec<KeyEvent> {
        self.state().posted.clone()
    }

    pub fn timeouts(&self) -> Vec<f32> {
        self.state().timeouts.clone()
    }
}

impl Backend for MockBackend {
    fn copy_attribute_names(&self, element: &Element) -> OsResult<Vec<String>> {
        let state = self.record("copy_attribute_names");
        state
            .attribute_names
            .get(&id(element.as_ptr()))
            .cloned()
            .unwrap_or(Ok(Vec::new()))
    }

    fn attribute_value_count(&self, element: &Element, attribute: &str) -> OsResult<usize> {
        let state = self.record("attribute_value_count");
        match state.attributes.get(&(id(element.as_ptr()), attribute.to_string())) {
            Some(Ok(AttributeValue::Array(items))) => Ok(items.len()),
            Some(Ok(_)) => Err(AxStatus::ILLEGAL_ARGUMENT),
            Some(Err(status)) => Err(*status),
            None => Err(AxStatus::ATTRIBUTE_UNSUPPORTED),
        }
    }

    fn copy_attribute_value(&self, element: &Element, attribute: &str) -> OsResult<AttributeValue> {
        let state = self.record("copy_attribute_value");
        state
            .attributes
            .get(&(id(element.as_ptr()), attribute.to_string()))
            .cloned()
            .unwrap_or(Err(AxStatus::ATTRIBUTE_UNSUPPORTED))
    }

    fn is_attribute_settable(&self, element: &Element, attribute: &str) -> OsResult<bool> {
        let state = self.record("is_attribute_settable");
        state
            .settable
            .get(&(id(element.as_ptr()), attribute.to_string()))
            .cloned()
            .unwrap_or(Ok(false))
    }

    fn set_attribute_value(
        &self,
        element: &Element,
        attribute: &str,
        value: &AttributeValue,
    ) -> OsResult<()> {
        let mut state = self.record("set_attribute_value");
        if let Some(status) = state
            .write_failures
            .get(&(id(element.as_ptr()), attribute.to_string()))
        {
            return Err(*status);
        }
        state.writes.push((attribute.to_string(), value.clone()));
        Ok(())
    }

    fn copy_action_names(&self, element: &Element) -> OsResult<Vec<String>> {
        let state = self.record("copy_action_names");
        state
            .action_names
            .get(&id(element.as_ptr()))
            .cloned()
            .unwrap_or(Ok(Vec::new()))
    }

    fn perform_action(&self, element: &Element, action: &str) -> OsResult<()> {
        let mut state = self.record("perform_action");
        let supported = matches!(
            state.action_names.get(&id(element.as_ptr())),
            Some(Ok(names)) if names.iter().any(|n| n == action)
        );
        if !supported {
            return Err(AxStatus::ACTION_UNSUPPORTED);
        }
        state.performed.push(action.to_string());
        Ok(())
    }

    fn copy_parameterized_attribute_names(&self, element: &Element) -> OsResult<Vec<String>> {
        let state = self.record("copy_parameterized_attribute_names");
        state
            .parameterized_names
            .get(&id(element.as_ptr()))
            .cloned()
            .unwrap_or(Ok(Vec::new()))
    }

    fn copy_parameterized_attribute_value(
        &self,
        element: &Element,
        attribute: &str,
        parameter: &AttributeValue,
    ) -> OsResult<AttributeValue> {
        let mut state = self.record("copy_parameterized_attribute_value");
        state.last_parameter = Some(parameter.clone());
        state
            .parameterized
            .get(&(id(element.as_ptr()), attribute.to_string()))
            .cloned()
            .unwrap_or(Err(AxStatus::PARAMETERIZED_ATTRIBUTE_UNSUPPORTED))
    }

    fn copy_element_at_position(&self, application: &Element, x: f32, y: f32) -> OsResult<Element> {
        let state = self.record("copy_element_at_position");
        state
            .positions
            .iter()
            .find(|(app, px, py, _)| *app == id(application.as_ptr()) && *px == x && *py == y)
            .map(|(_, _, _, hit)| hit.clone())
            .unwrap_or(Err(AxStatus::NO_VALUE))
    }

    fn create_application(&self, pid: i32) -> Option<Element> {
        let element = self.element();
        self.record("create_application")
            .pids
            .insert(id(element.as_ptr()), pid);
        Some(element)
    }

    fn create_system_wide(&self) -> Option<Element> {
        drop(self.record("create_system_wide"));
        Some(self.system_wide.clone())
    }

    fn pid(&self, element: &Element) -> OsResult<i32> {
        let state = self.record("pid");
        state
            .pids
            .get(&id(element.as_ptr()))
            .copied()
            .ok_or(AxStatus::INVALID_UI_ELEMENT)
    }

    fn post_keyboard_event(&self, _application: &Element, key_code: u16, key_down: bool) -> OsResult<()> {
        let mut state = self.record("post_keyboard_event");
        let index = state.post_count;
        state.post_count += 1;
        if let Some(status) = state.post_failures.get(&index) {
            return Err(*status);
        }
        state.posted.push(KeyEvent {
            key_code,
            pressed: key_down,
        });
        Ok(())
    }

    fn set_messaging_timeout(&self, _element: &Element, seconds: f32) -> OsResult<()> {
        let mut state = self.record("set_messaging_timeout");
        if let Some(status) = state.timeout_failure {
            return Err(status);
        }
        state.timeouts.push(seconds);
        Ok(())
    }

    fn value_type(&self, value: &BoxedValue) -> u32 {
        let state = self.record("value_type");
        state
            .boxes
            .get(&id(value.as_ptr()))
            .map_or(0, |(tag, _)| *tag)
    }

    fn value_get(&self, value: &BoxedValue, tag: u32, out: &mut [u8]) -> bool {
        let state = self.record("value_get");
        match state.boxes.get(&id(value.as_ptr())) {
            Some((stored, bytes)) if *stored == tag && bytes.len() == out.len() => {
                out.copy_from_slice(bytes);
                true
            }
            _ => false,
        }
    }

    fn value_create(&self, tag: u32, bytes: &[u8]) -> Option<BoxedValue> {
        drop(self.record("value_create"));
        Some(self.store_box(tag, bytes))
    }

    fn drain_process_events(&self) {
        let mut state = self.record("drain_process_events");
        let launched: Vec<i32> = state.pending_launches.drain().collect();
        state.running.extend(launched);
    }

    fn is_process_running(&self, pid: i32) -> bool {
        self.record("is_process_running").running.contains(&pid)
    }

    fn is_process_trusted(&self) -> bool {
        self.record("is_process_trusted").trusted
    }
}

/// One delegated failure as the handler saw it.
#[derive(Debug, Clone)]
pub(crate) struct Seen {
    pub status: AxStatus,
    pub element: Element,
    pub attribute: Option<String>,
    pub parameter: Option<AttributeValue>,
    pub action: Option<String>,
    pub point: Option<(f32, f32)>,
    pub timeout: Option<f32>,
    pub key_event: Option<KeyEvent>,
}

/// Error handler that records every call and returns a fixed substitute.
pub(crate) struct Recorder {
    substitute: Option<AttributeValue>,
    seen: Mutex<Vec<Seen>>,
}

impl Recorder {
    pub fn absent() -> Self {
        Self {
            substitute: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn substituting(value: AttributeValue) -> Self {
        Self {
            substitute: Some(value),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

impl ErrorHandler for Recorder {
    fn handle_error(
        &self,
        status: AxStatus,
        context: &ErrorContext<'_>,
    ) -> AxResult<Option<AttributeValue>> {
        let mut seen = Seen {
            status,
            element: context.element.clone(),
            attribute: context.attribute().map(str::to_string),
            parameter: None,
            action: None,
            point: None,
            timeout: None,
            key_event: None,
        };
        match context.subject {
            Subject::ParameterizedAttribute { parameter, .. } => {
                seen.parameter = Some(parameter.clone())
            }
            Subject::Action(action) => seen.action = Some(action.to_string()),
            Subject::Point { x, y } => seen.point = Some((x, y)),
            Subject::Timeout(seconds) => seen.timeout = Some(seconds),
            Subject::KeyEvent(event) => seen.key_event = Some(event),
            Subject::None | Subject::Attribute(_) => {}
        }
        self.seen.lock().unwrap().push(seen);
        Ok(self.substitute.clone())
    }
}
