#![forbid(unsafe_code)]

//! `web-sys` implementation of the engine host and the JS exports.
//!
//! Only compiled on `wasm32` targets.
//!
//! The engine lives in an `Rc<RefCell<_>>` shared by every listener. Each
//! notification borrows it, calls one `handle_*` entry point, releases it,
//! then wires whatever commands the call queued. Listeners and observers are
//! never removed, so their closures are leaked with `Closure::forget`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use aberration_core::{
    DocumentReadiness, DomHost, DomTree, Engine, FrameTask, HostCapabilities, HostCommand,
    HostError, PauseSignal, Point, Rect, Settings, Subscription, WrapperPointerKind,
};
use js_sys::{Array, Function, Object, Reflect, WeakMap};
use tracing::{Level, debug, trace, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    AddEventListenerOptions, CssStyleDeclaration, Document, Element, Event, EventTarget,
    HtmlCollection, MouseEvent, MutationObserver, MutationObserverInit, MutationRecord, NodeList,
    ResizeObserver, Window,
};

use crate::console_log;

const SETTINGS_GLOBAL: &str = "cahSettings";

type SharedEngine = Rc<RefCell<Engine<WebDom>>>;

thread_local! {
    static NODE_IDS: WeakMap = WeakMap::new();
    static NEXT_NODE_ID: Cell<u32> = const { Cell::new(1) };
    static ENGINE: RefCell<Option<SharedEngine>> = const { RefCell::new(None) };
}

// ── Console ─────────────────────────────────────────────────────────────

fn console_method(name: &str) -> Option<(JsValue, Function)> {
    let console = Reflect::get(&js_sys::global(), &"console".into()).ok()?;
    let method = Reflect::get(&console, &name.into()).ok()?;
    let method = method.dyn_into::<Function>().ok()?;
    Some((console, method))
}

fn console_line(level: Level, line: &str) {
    let name = match level {
        Level::ERROR => "error",
        Level::WARN => "warn",
        Level::INFO => "info",
        _ => "debug",
    };
    if let Some((console, method)) = console_method(name) {
        let _ = method.call1(&console, &JsValue::from_str(line));
    }
}

fn console_error(msg: &str) {
    console_line(Level::ERROR, msg);
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = if let Some(loc) = info.location() {
                format!(
                    "panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("panic: {info}")
            };
            console_error(&msg);
        }));
    });
}

// ── Host ────────────────────────────────────────────────────────────────

/// A live element with a stable identity.
///
/// `Element` has no hash, so each element is assigned a numeric id the first
/// time it is seen, remembered in a `WeakMap` keyed by the element itself.
#[derive(Clone)]
pub struct WebNode {
    id: u32,
    element: Element,
}

impl WebNode {
    #[must_use]
    pub fn new(element: Element) -> Self {
        let key: &Object = element.as_ref();
        let id = NODE_IDS.with(|ids| {
            if let Some(id) = ids.get(key).as_f64() {
                return id as u32;
            }
            let id = NEXT_NODE_ID.with(|next| {
                let id = next.get();
                next.set(id.wrapping_add(1));
                id
            });
            ids.set(key, &JsValue::from(id));
            id
        });
        Self { id, element }
    }

    #[must_use]
    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl PartialEq for WebNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WebNode {}

impl Hash for WebNode {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.id.hash(state);
    }
}

impl fmt::Debug for WebNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebNode")
            .field("id", &self.id)
            .field("tag", &self.element.tag_name())
            .finish()
    }
}

/// The live document.
pub struct WebDom {
    window: Window,
    document: Document,
}

impl WebDom {
    #[must_use]
    pub fn new(window: Window, document: Document) -> Self {
        Self { window, document }
    }
}

fn js_error(err: JsValue) -> HostError {
    HostError::Operation(format!("{err:?}"))
}

fn collection_nodes(collection: &HtmlCollection) -> Vec<WebNode> {
    (0..collection.length())
        .filter_map(|i| collection.item(i))
        .map(WebNode::new)
        .collect()
}

fn node_list_elements(list: &NodeList) -> Vec<WebNode> {
    (0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .map(WebNode::new)
        .collect()
}

// SVG elements carry `style` too, so this does not go through HtmlElement.
fn inline_style(element: &Element) -> Option<CssStyleDeclaration> {
    Reflect::get(element, &"style".into())
        .ok()?
        .dyn_into::<CssStyleDeclaration>()
        .ok()
}

impl DomTree for WebDom {
    type Node = WebNode;

    fn parent_element(&self, node: &WebNode) -> Option<WebNode> {
        node.element.parent_element().map(WebNode::new)
    }

    fn element_children(&self, node: &WebNode) -> Vec<WebNode> {
        collection_nodes(&node.element.children())
    }
}

impl DomHost for WebDom {
    fn query_selector_all(&self, selector: &str) -> Result<Vec<WebNode>, HostError> {
        self.document
            .query_selector_all(selector)
            .map(|list| node_list_elements(&list))
            .map_err(|_| HostError::InvalidSelector(selector.to_owned()))
    }

    fn has_class(&self, node: &WebNode, class: &str) -> bool {
        node.element.class_list().contains(class)
    }

    fn add_class(&mut self, node: &WebNode, class: &str) -> Result<(), HostError> {
        node.element.class_list().add_1(class).map_err(js_error)
    }

    fn computed_display(&self, node: &WebNode) -> Option<String> {
        self.window
            .get_computed_style(&node.element)
            .ok()
            .flatten()
            .and_then(|style| style.get_property_value("display").ok())
    }

    fn create_element(&mut self, tag: &str) -> Result<WebNode, HostError> {
        self.document
            .create_element(tag)
            .map(WebNode::new)
            .map_err(js_error)
    }

    fn insert_before(
        &mut self,
        parent: &WebNode,
        node: &WebNode,
        reference: &WebNode,
    ) -> Result<(), HostError> {
        let reference: &web_sys::Node = &reference.element;
        parent
            .element
            .insert_before(&node.element, Some(reference))
            .map(drop)
            .map_err(js_error)
    }

    fn append_child(&mut self, parent: &WebNode, child: &WebNode) -> Result<(), HostError> {
        parent
            .element
            .append_child(&child.element)
            .map(drop)
            .map_err(js_error)
    }

    fn deep_clone(&mut self, node: &WebNode) -> Result<WebNode, HostError> {
        node.element
            .clone_node_with_deep(true)
            .map_err(js_error)?
            .dyn_into::<Element>()
            .map(WebNode::new)
            .map_err(|_| HostError::Operation("clone is not an element".to_owned()))
    }

    fn set_attribute(&mut self, node: &WebNode, name: &str, value: &str) -> Result<(), HostError> {
        node.element.set_attribute(name, value).map_err(js_error)
    }

    fn remove_attribute(&mut self, node: &WebNode, name: &str) {
        let _ = node.element.remove_attribute(name);
    }

    fn style_property(&self, node: &WebNode, property: &str) -> String {
        inline_style(&node.element)
            .and_then(|style| style.get_property_value(property).ok())
            .unwrap_or_default()
    }

    fn set_style_property(
        &mut self,
        node: &WebNode,
        property: &str,
        value: &str,
    ) -> Result<(), HostError> {
        let style = inline_style(&node.element)
            .ok_or_else(|| HostError::Operation("element has no inline style".to_owned()))?;
        if value.is_empty() {
            style.remove_property(property).map(drop).map_err(js_error)
        } else {
            style.set_property(property, value).map_err(js_error)
        }
    }

    fn descendants(&self, node: &WebNode) -> Vec<WebNode> {
        node.element
            .query_selector_all("*")
            .map(|list| node_list_elements(&list))
            .unwrap_or_default()
    }

    fn bounding_rect(&self, node: &WebNode) -> Rect {
        let rect = node.element.get_bounding_client_rect();
        Rect::new(rect.left(), rect.top(), rect.width(), rect.height())
    }
}

// ── Command wiring ──────────────────────────────────────────────────────

/// Run `f` against the engine, then wire everything it queued.
///
/// Returns `None` when the engine is already borrowed further up the stack.
fn dispatch<R>(engine: &SharedEngine, f: impl FnOnce(&mut Engine<WebDom>) -> R) -> Option<R> {
    let result = match engine.try_borrow_mut() {
        Ok(mut engine) => f(&mut engine),
        Err(_) => {
            warn!(target: "aberration_web", "engine busy, notification dropped");
            return None;
        }
    };
    pump(engine);
    Some(result)
}

fn pump(engine: &SharedEngine) {
    loop {
        let commands = match engine.try_borrow_mut() {
            Ok(mut engine) => engine.take_commands(),
            Err(_) => return,
        };
        if commands.is_empty() {
            return;
        }
        for command in commands {
            trace!(target: "aberration_web", ?command, "wiring");
            if let Err(err) = wire(engine, command) {
                warn!(target: "aberration_web", error = ?err, "host wiring failed");
            }
        }
    }
}

fn wire(engine: &SharedEngine, command: HostCommand<WebNode>) -> Result<(), JsValue> {
    match command {
        HostCommand::RequestFrame(task) => request_frame(engine, task),
        HostCommand::Subscribe(subscription) => match subscription {
            Subscription::StyleMutations { target } => observe_style(engine, target),
            Subscription::Resize { target } => observe_resize(engine, target),
            Subscription::PauseSignals {
                target,
                pause_event,
                resume_event,
            } => {
                for (name, signal) in [
                    (pause_event, PauseSignal::Pause),
                    (resume_event, PauseSignal::Resume),
                ] {
                    let node = target.clone();
                    listen(&target.element, &name, engine, false, move |engine, _| {
                        engine.handle_pause_signal(&node, signal);
                    })?;
                }
                Ok(())
            }
            Subscription::WrapperPointer { target, wrapper } => {
                for (name, kind) in [
                    ("mouseenter", WrapperPointerKind::Enter),
                    ("mousemove", WrapperPointerKind::Move),
                    ("mouseleave", WrapperPointerKind::Leave),
                ] {
                    let node = target.clone();
                    listen(&wrapper.element, name, engine, false, move |engine, event| {
                        if let Some(client) = client_point(event) {
                            engine.handle_wrapper_pointer(&node, kind, client);
                        }
                    })?;
                }
                Ok(())
            }
            Subscription::WindowPointer => {
                let window = engine.borrow().host().window.clone();
                listen(&window, "mousemove", engine, true, |engine, event| {
                    if let Some(client) = client_point(event) {
                        engine.handle_window_pointer_move(client);
                    }
                })
            }
            Subscription::ChildListMutations => observe_child_list(engine),
            Subscription::DocumentReady => {
                let document = engine.borrow().host().document.clone();
                let shared = Rc::clone(engine);
                let callback = Closure::once_into_js(move || {
                    dispatch(&shared, |engine| engine.handle_document_ready());
                });
                document.add_event_listener_with_callback(
                    "DOMContentLoaded",
                    callback.unchecked_ref(),
                )
            }
        },
    }
}

// `MouseEvent::client_x` truncates to `i32`; read the fractional values.
fn client_point(event: &Event) -> Option<Point> {
    let event = event.dyn_ref::<MouseEvent>()?;
    let coordinate = |name: &str| Reflect::get(event, &name.into()).ok()?.as_f64();
    Some(Point::new(coordinate("clientX")?, coordinate("clientY")?))
}

fn listen<F>(
    target: &EventTarget,
    name: &str,
    engine: &SharedEngine,
    passive: bool,
    mut handler: F,
) -> Result<(), JsValue>
where
    F: FnMut(&mut Engine<WebDom>, &Event) + 'static,
{
    let shared = Rc::clone(engine);
    let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        dispatch(&shared, |engine| handler(engine, &event));
    });
    let callback: &Function = closure.as_ref().unchecked_ref();
    if passive {
        let options = AddEventListenerOptions::new();
        options.set_passive(true);
        target.add_event_listener_with_callback_and_add_event_listener_options(
            name, callback, &options,
        )?;
    } else {
        target.add_event_listener_with_callback(name, callback)?;
    }
    closure.forget();
    Ok(())
}

fn request_frame(engine: &SharedEngine, task: FrameTask) -> Result<(), JsValue> {
    let window = engine.borrow().host().window.clone();
    let shared = Rc::clone(engine);
    let callback = Closure::once_into_js(move || {
        dispatch(&shared, |engine| engine.run_frame(task));
    });
    if let Err(err) = window.request_animation_frame(callback.unchecked_ref()) {
        // Without a frame the coalescer would stay pending forever.
        warn!(target: "aberration_web", error = ?err, ?task, "running frame task inline");
        dispatch(engine, |engine| engine.run_frame(task));
    }
    Ok(())
}

fn style_mutation_targets(records: &Array) -> Vec<WebNode> {
    records
        .iter()
        .filter_map(|record| record.dyn_into::<MutationRecord>().ok())
        .filter(|record| record.attribute_name().as_deref() == Some("style"))
        .filter_map(|record| record.target())
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .map(WebNode::new)
        .collect()
}

fn observe_style(engine: &SharedEngine, target: WebNode) -> Result<(), JsValue> {
    let shared = Rc::clone(engine);
    let observed = target.clone();
    let callback = Closure::<dyn FnMut(Array, MutationObserver)>::new(
        move |records: Array, _observer: MutationObserver| {
            let changed = style_mutation_targets(&records);
            if changed.is_empty() {
                return;
            }
            dispatch(&shared, |engine| {
                for node in &changed {
                    engine.handle_style_mutation(&observed, node);
                }
            });
        },
    );
    let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
    let options = MutationObserverInit::new();
    options.set_attributes(true);
    options.set_subtree(true);
    options.set_attribute_filter(&Array::of1(&"style".into()));
    observer.observe_with_options(&target.element, &options)?;
    callback.forget();
    Ok(())
}

fn observe_child_list(engine: &SharedEngine) -> Result<(), JsValue> {
    let Some(body) = engine.borrow().host().document.body() else {
        warn!(target: "aberration_web", "document has no body, rescans disabled");
        return Ok(());
    };
    let shared = Rc::clone(engine);
    let callback = Closure::<dyn FnMut(Array, MutationObserver)>::new(
        move |_records: Array, _observer: MutationObserver| {
            dispatch(&shared, |engine| engine.handle_child_list_mutation());
        },
    );
    let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
    let options = MutationObserverInit::new();
    options.set_child_list(true);
    options.set_subtree(true);
    observer.observe_with_options(&body, &options)?;
    callback.forget();
    Ok(())
}

fn observe_resize(engine: &SharedEngine, target: WebNode) -> Result<(), JsValue> {
    let shared = Rc::clone(engine);
    let observed = target.clone();
    let callback = Closure::<dyn FnMut(Array, ResizeObserver)>::new(
        move |_entries: Array, _observer: ResizeObserver| {
            dispatch(&shared, |engine| engine.handle_resize(&observed));
        },
    );
    let observer = ResizeObserver::new(callback.as_ref().unchecked_ref())?;
    observer.observe(&target.element);
    callback.forget();
    Ok(())
}

// ── Boot ────────────────────────────────────────────────────────────────

fn read_settings(window: &Window) -> Option<Settings> {
    let raw = Reflect::get(window, &SETTINGS_GLOBAL.into()).ok()?;
    if raw.is_undefined() || raw.is_null() {
        debug!(target: "aberration_web", "no {SETTINGS_GLOBAL} payload, staying inert");
        return None;
    }
    let json = String::from(js_sys::JSON::stringify(&raw).ok()?);
    match Settings::from_json(&json) {
        Ok(settings) => Some(settings),
        Err(err) => {
            warn!(target: "aberration_web", error = %err, "unreadable settings payload");
            None
        }
    }
}

fn probe_capabilities(window: &Window) -> HostCapabilities {
    let has = |name: &str| Reflect::has(window, &name.into()).unwrap_or(false);
    HostCapabilities {
        mutation_observer: has("MutationObserver"),
        resize_observer: has("ResizeObserver"),
    }
}

fn boot() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let Some(settings) = read_settings(&window) else {
        return Ok(());
    };
    let capabilities = probe_capabilities(&window);
    let readiness = if document.ready_state() == "loading" {
        DocumentReadiness::Loading
    } else {
        DocumentReadiness::Ready
    };
    debug!(
        target: "aberration_web",
        ?capabilities,
        ?readiness,
        "starting engine"
    );

    let engine = Rc::new(RefCell::new(Engine::new(
        WebDom::new(window, document),
        settings,
        capabilities,
    )));
    ENGINE.with(|slot| *slot.borrow_mut() = Some(Rc::clone(&engine)));
    dispatch(&engine, |engine| engine.start(readiness));
    Ok(())
}

#[wasm_bindgen(start)]
pub fn start() {
    install_panic_hook();
    console_log::init(console_line, Level::INFO);
    if let Err(err) = boot() {
        console_error(&format!("aberration boot failed: {err:?}"));
    }
}

fn shared_engine() -> Option<SharedEngine> {
    ENGINE.with(|slot| slot.borrow().clone())
}

/// Number of overlays currently registered.
#[wasm_bindgen(js_name = overlayCount)]
#[must_use]
pub fn overlay_count() -> u32 {
    shared_engine()
        .and_then(|engine| dispatch(&engine, |engine| engine.overlay_count()))
        .map_or(0, |count| u32::try_from(count).unwrap_or(u32::MAX))
}

/// Scan the document now. Returns the number of overlays created.
#[wasm_bindgen]
pub fn rescan() -> u32 {
    shared_engine()
        .and_then(|engine| dispatch(&engine, Engine::scan))
        .map_or(0, |created| u32::try_from(created).unwrap_or(u32::MAX))
}
