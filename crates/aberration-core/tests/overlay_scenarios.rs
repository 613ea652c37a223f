//! End-to-end scenarios: a JSON settings payload driving an engine over an
//! in-memory document, with the host loop played by the test.

use aberration_core::mask::MaskImage;
use aberration_core::memory_dom::{MemoryDom, NodeId};
use aberration_core::{
    DocumentReadiness, DomHost, DomTree, Engine, FrameTask, HostCapabilities, HostCommand,
    PauseSignal, Point, Rect, Settings, Subscription, WRAPPER_CLASS, WrapperPointerKind,
};
use pretty_assertions::assert_eq;

fn engine_from_json(dom: MemoryDom, json: &str) -> Engine<MemoryDom> {
    let settings = Settings::from_json(json).expect("valid payload");
    Engine::new(dom, settings, HostCapabilities::full())
}

fn mask_of(engine: &Engine<MemoryDom>, target: &NodeId) -> String {
    let overlay = engine.overlay(target).expect("registered").overlay;
    engine.host().style_property(&overlay, "mask")
}

fn cleared() -> String {
    MaskImage::Cleared.to_string()
}

/// Run every requested frame, as a browser would on the next tick.
fn pump_frames(engine: &mut Engine<MemoryDom>) -> usize {
    let frames: Vec<FrameTask> = engine
        .take_commands()
        .into_iter()
        .filter_map(|command| match command {
            HostCommand::RequestFrame(task) => Some(task),
            HostCommand::Subscribe(_) => None,
        })
        .collect();
    for task in &frames {
        engine.run_frame(*task);
    }
    frames.len()
}

#[test]
fn two_color_overlay_filter() {
    let mut dom = MemoryDom::new();
    let body = dom.body();
    let title = dom.append_new(&body, "h1");
    let mut engine = engine_from_json(
        dom,
        r##"{"enabled":"1","selectors":"h1","maskRadius":300,"shadowSize":4,
            "colorsMode":"two","leftColor":"#ff0000","rightColor":"#00ffff"}"##,
    );
    engine.start(DocumentReadiness::Ready);

    let overlay = engine.overlay(&title).unwrap().overlay;
    let filter = engine.host().style_property(&overlay, "filter");
    assert_eq!(
        filter,
        "drop-shadow(4px 0 4px #ff0000) drop-shadow(-4px 0 4px #00ffff)"
    );
    assert_eq!(filter.matches("drop-shadow(").count(), 2);
}

#[test]
fn three_color_overlay_filter() {
    let mut dom = MemoryDom::new();
    let body = dom.body();
    let title = dom.append_new(&body, "h1");
    let mut engine = engine_from_json(
        dom,
        r##"{"enabled":true,"selectors":"h1","shadowSize":5,"colorsMode":"three",
            "redColor":"#f00","greenColor":"#0f0","blueColor":"#00f"}"##,
    );
    engine.start(DocumentReadiness::Ready);

    let overlay = engine.overlay(&title).unwrap().overlay;
    assert_eq!(
        engine.host().style_property(&overlay, "filter"),
        "drop-shadow(5px 0 5px #f00) drop-shadow(-5px 0 5px #0f0) drop-shadow(0 5px 5px #00f)"
    );
}

#[test]
fn global_tracking_clears_outside_and_paints_inside() {
    let mut dom = MemoryDom::new();
    let body = dom.body();
    let left = dom.append_new(&body, "img");
    let right = dom.append_new(&body, "img");
    let mut engine = engine_from_json(
        dom,
        r#"{"enabled":true,"selectors":"img","maskRadius":50,"trackingMode":"global"}"#,
    );
    engine.start(DocumentReadiness::Ready);
    let subscriptions = engine.take_commands();
    assert!(subscriptions.contains(&HostCommand::Subscribe(Subscription::WindowPointer)));
    assert!(
        !subscriptions
            .iter()
            .any(|c| matches!(c, HostCommand::Subscribe(Subscription::WrapperPointer { .. })))
    );

    let left_wrapper = engine.overlay(&left).unwrap().wrapper;
    let right_wrapper = engine.overlay(&right).unwrap().wrapper;
    engine
        .host_mut()
        .set_rect(&left_wrapper, Rect::new(0.0, 0.0, 100.0, 100.0));
    engine
        .host_mut()
        .set_rect(&right_wrapper, Rect::new(200.0, 0.0, 100.0, 100.0));

    // A burst of moves costs one frame, painted from the last position.
    engine.handle_window_pointer_move(Point::new(500.0, 500.0));
    engine.handle_window_pointer_move(Point::new(30.0, 40.0));
    assert_eq!(pump_frames(&mut engine), 1);
    assert_eq!(
        mask_of(&engine, &left),
        "radial-gradient(circle 50px at 30px 40px, #000, transparent)"
    );
    assert_eq!(mask_of(&engine, &right), cleared());

    engine.handle_window_pointer_move(Point::new(250.0, 10.0));
    assert_eq!(pump_frames(&mut engine), 1);
    assert_eq!(mask_of(&engine, &left), cleared());
    assert_eq!(
        mask_of(&engine, &right),
        "radial-gradient(circle 50px at 50px 10px, #000, transparent)"
    );
}

#[test]
fn global_bounds_are_inclusive() {
    let mut dom = MemoryDom::new();
    let body = dom.body();
    let img = dom.append_new(&body, "img");
    let mut engine = engine_from_json(
        dom,
        r#"{"enabled":true,"selectors":"img","trackingMode":"global"}"#,
    );
    engine.start(DocumentReadiness::Ready);
    let wrapper = engine.overlay(&img).unwrap().wrapper;
    engine
        .host_mut()
        .set_rect(&wrapper, Rect::new(10.0, 10.0, 20.0, 20.0));

    engine.handle_window_pointer_move(Point::new(30.0, 30.0));
    pump_frames(&mut engine);
    assert_ne!(mask_of(&engine, &img), cleared());

    engine.handle_window_pointer_move(Point::new(30.5, 30.0));
    pump_frames(&mut engine);
    assert_eq!(mask_of(&engine, &img), cleared());
}

#[test]
fn paused_overlays_are_skipped_by_global_frames() {
    let mut dom = MemoryDom::new();
    let body = dom.body();
    let img = dom.append_new(&body, "img");
    let mut engine = engine_from_json(
        dom,
        r#"{"enabled":true,"selectors":"img","trackingMode":"global"}"#,
    );
    engine.start(DocumentReadiness::Ready);
    let wrapper = engine.overlay(&img).unwrap().wrapper;
    engine
        .host_mut()
        .set_rect(&wrapper, Rect::new(0.0, 0.0, 100.0, 100.0));

    engine.handle_pause_signal(&img, PauseSignal::Pause);
    engine.handle_window_pointer_move(Point::new(10.0, 10.0));
    pump_frames(&mut engine);
    assert_eq!(mask_of(&engine, &img), cleared());
}

#[test]
fn pause_and_resume_toggle_visibility_once() {
    let mut dom = MemoryDom::new();
    let body = dom.body();
    let logo = dom.append_new(&body, "img");
    let mut engine = engine_from_json(
        dom,
        r#"{"enabled":true,"selectors":"img","pauseEvent":"  ","resumeEvent":"logo-on"}"#,
    );
    engine.start(DocumentReadiness::Ready);
    assert!(engine.take_commands().contains(&HostCommand::Subscribe(
        Subscription::PauseSignals {
            target: logo,
            pause_event: "cah-pause".to_owned(),
            resume_event: "logo-on".to_owned(),
        }
    )));
    let overlay = engine.overlay(&logo).unwrap().overlay;
    let visual = |engine: &Engine<MemoryDom>| {
        (
            engine.host().style_property(&overlay, "opacity"),
            engine.host().style_property(&overlay, "visibility"),
        )
    };

    engine.handle_wrapper_pointer(&logo, WrapperPointerKind::Move, Point::new(1.0, 1.0));
    engine.handle_pause_signal(&logo, PauseSignal::Pause);
    assert_eq!(visual(&engine), ("0".to_owned(), "hidden".to_owned()));
    assert_eq!(mask_of(&engine, &logo), cleared());

    // Already paused.
    assert!(!engine.set_paused(&logo, true));

    engine.handle_pause_signal(&logo, PauseSignal::Resume);
    assert_eq!(visual(&engine), (String::new(), String::new()));
    engine.handle_wrapper_pointer(&logo, WrapperPointerKind::Move, Point::new(1.0, 1.0));
    assert_ne!(mask_of(&engine, &logo), cleared());
    engine.handle_pause_signal(&logo, PauseSignal::Resume);
    assert_ne!(mask_of(&engine, &logo), cleared());
}

#[test]
fn empty_selectors_insert_nothing() {
    let mut dom = MemoryDom::new();
    let body = dom.body();
    dom.append_new(&body, "h1");
    let nodes = dom.node_count();
    let mut engine = engine_from_json(dom, r#"{"enabled":true,"selectors":" ,\n , "}"#);
    engine.start(DocumentReadiness::Ready);
    assert_eq!(engine.scan(), 0);
    assert_eq!(engine.overlay_count(), 0);
    assert_eq!(engine.host().node_count(), nodes);
    assert!(
        engine
            .host()
            .query_selector_all(&format!(".{WRAPPER_CLASS}"))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn missing_enabled_flag_means_inert() {
    let mut dom = MemoryDom::new();
    let body = dom.body();
    dom.append_new(&body, "h1");
    let mut engine = engine_from_json(dom, r#"{"selectors":"h1"}"#);
    engine.start(DocumentReadiness::Ready);
    assert_eq!(engine.overlay_count(), 0);
    assert!(engine.take_commands().is_empty());
}

#[test]
fn nested_matches_and_clones_are_not_rewrapped() {
    let mut dom = MemoryDom::new();
    let body = dom.body();
    let logo = dom.append_new(&body, "div");
    dom.add_class(&logo, "site-logo").unwrap();
    let img = dom.append_new(&logo, "img");
    let mut engine = engine_from_json(
        dom,
        r#"{"enabled":true,"selectors":".site-logo\nimg\n.site-logo img"}"#,
    );
    engine.start(DocumentReadiness::Ready);
    assert_eq!(engine.overlay_count(), 1);
    assert!(engine.overlay(&logo).is_some());
    assert!(engine.overlay(&img).is_none());

    // The clone's copy of the image matches `img` too, and must stay alone.
    let clone = engine.overlay(&logo).unwrap().clone;
    assert_eq!(engine.host().element_children(&clone).len(), 1);
    engine.handle_child_list_mutation();
    pump_frames(&mut engine);
    assert_eq!(engine.overlay_count(), 1);
}

#[test]
fn late_elements_are_picked_up_by_rescan() {
    let mut dom = MemoryDom::new();
    let body = dom.body();
    let mut engine = engine_from_json(dom.clone(), r#"{"enabled":true,"selectors":"img"}"#);
    engine.start(DocumentReadiness::Loading);
    assert_eq!(
        engine.take_commands(),
        vec![HostCommand::Subscribe(Subscription::DocumentReady)]
    );
    engine.handle_document_ready();
    assert_eq!(engine.overlay_count(), 0);
    assert!(engine.take_commands().contains(&HostCommand::Subscribe(
        Subscription::ChildListMutations
    )));

    let img = engine.host_mut().append_new(&body, "img");
    engine.handle_child_list_mutation();
    engine.handle_child_list_mutation();
    assert_eq!(pump_frames(&mut engine), 1);
    assert!(engine.overlay(&img).is_some());
    assert!(dom.element_children(&body).is_empty(), "engine owns its own document");
}

#[test]
fn no_mutation_observer_means_no_rescan_subscription() {
    let mut dom = MemoryDom::new();
    let body = dom.body();
    let img = dom.append_new(&body, "img");
    let settings = Settings::from_json(r#"{"enabled":true,"selectors":"img"}"#).unwrap();
    let mut engine = Engine::new(dom, settings, HostCapabilities::none());
    engine.start(DocumentReadiness::Ready);

    let commands = engine.take_commands();
    assert!(!commands.iter().any(|c| matches!(
        c,
        HostCommand::Subscribe(
            Subscription::ChildListMutations
                | Subscription::StyleMutations { .. }
                | Subscription::Resize { .. }
        )
    )));
    // Pointer masking still works.
    engine.handle_wrapper_pointer(&img, WrapperPointerKind::Enter, Point::new(2.0, 3.0));
    assert_ne!(mask_of(&engine, &img), cleared());
}
