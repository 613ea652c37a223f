#![forbid(unsafe_code)]

//! The overlay engine.
//!
//! [`Engine`] owns the host, the validated settings and the overlay registry.
//! It runs nothing by itself: the host calls [`Engine::start`], then forwards
//! notifications for every [`Subscription`] it has been asked to wire, and
//! runs [`Engine::run_frame`] whenever a [`HostCommand::RequestFrame`] comes
//! due. Pending commands are collected with [`Engine::take_commands`] after
//! each call.
//!
//! Failures on one target are logged and contained; they never abort a scan
//! or a frame.

use tracing::{debug, trace, warn};

use crate::capabilities::HostCapabilities;
use crate::clone_sync::{SyncOutcome, observe_style_changes, sync_style_change};
use crate::dom::{DomHost, FrameTask, HostCommand, HostError, PauseSignal, Subscription};
use crate::filter::build_filter;
use crate::geometry::Point;
use crate::mask::{clear_mask, paint_mask};
use crate::overlay::{OverlayRecord, OverlayRegistry, Wiring, build_overlay, inside_wrapper};
use crate::schedule::TickCoalescer;
use crate::settings::{Settings, TrackingMode};

/// Parsing state of the host document at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentReadiness {
    /// Still parsing; initialization waits for the ready notification.
    Loading,
    Ready,
}

/// Pointer event kinds delivered for a single wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperPointerKind {
    Enter,
    Move,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    AwaitingReady,
    Running,
}

/// Chromatic aberration overlay engine over a [`DomHost`].
#[derive(Debug)]
pub struct Engine<H: DomHost> {
    host: H,
    settings: Settings,
    capabilities: HostCapabilities,
    filter: String,
    registry: OverlayRegistry<H::Node>,
    pointer: Option<Point>,
    repaint: TickCoalescer,
    rescan: TickCoalescer,
    commands: Vec<HostCommand<H::Node>>,
    phase: Phase,
}

impl<H: DomHost> Engine<H> {
    /// Create an idle engine. Nothing touches the document until
    /// [`Engine::start`].
    #[must_use]
    pub fn new(host: H, settings: Settings, capabilities: HostCapabilities) -> Self {
        let filter = build_filter(settings.shadow_size, &settings.palette);
        debug!(
            target: "aberration_core::engine",
            mode = ?settings.palette.mode(),
            tracking = ?settings.tracking,
            %filter,
            "engine configured"
        );
        Self {
            host,
            settings,
            capabilities,
            filter,
            registry: OverlayRegistry::new(),
            pointer: None,
            repaint: TickCoalescer::new(),
            rescan: TickCoalescer::new(),
            commands: Vec::new(),
            phase: Phase::Idle,
        }
    }

    /// Initialize now, or defer until the document is ready.
    ///
    /// Inactive settings (disabled or no selectors) leave the engine idle
    /// for good. Repeated calls are ignored.
    pub fn start(&mut self, readiness: DocumentReadiness) {
        if self.phase != Phase::Idle {
            return;
        }
        if !self.settings.is_active() {
            debug!(
                target: "aberration_core::engine",
                enabled = self.settings.enabled,
                selectors = self.settings.selectors.len(),
                "settings inactive, not starting"
            );
            return;
        }
        match readiness {
            DocumentReadiness::Loading => {
                self.phase = Phase::AwaitingReady;
                self.subscribe(Subscription::DocumentReady);
            }
            DocumentReadiness::Ready => self.init(),
        }
    }

    /// The deferred ready notification requested by [`Engine::start`].
    pub fn handle_document_ready(&mut self) {
        if self.phase == Phase::AwaitingReady {
            self.init();
        }
    }

    fn init(&mut self) {
        self.phase = Phase::Running;
        let created = self.scan();
        debug!(
            target: "aberration_core::engine",
            created,
            tracking = ?self.settings.tracking,
            "engine initialized"
        );
        if self.capabilities.mutation_observer {
            self.subscribe(Subscription::ChildListMutations);
        }
        if self.settings.tracking == TrackingMode::Global {
            self.subscribe(Subscription::WindowPointer);
        }
    }

    /// Wrap every matching element that is not yet registered and not
    /// inside an existing wrapper. Returns the number of overlays created.
    ///
    /// Safe to call any number of times; a second scan over an unchanged
    /// document creates nothing.
    pub fn scan(&mut self) -> usize {
        if !self.settings.is_active() {
            return 0;
        }
        let mut created = 0;
        for index in 0..self.settings.selectors.len() {
            let selector = &self.settings.selectors[index];
            let elements = match self.host.query_selector_all(selector) {
                Ok(elements) => elements,
                Err(err) => {
                    warn!(
                        target: "aberration_core::engine",
                        %selector,
                        error = %err,
                        "skipping selector"
                    );
                    continue;
                }
            };
            for element in elements {
                if self.registry.contains(&element) || inside_wrapper(&self.host, &element) {
                    continue;
                }
                match self.create_overlay(&element) {
                    Ok(true) => created += 1,
                    Ok(false) => debug!(
                        target: "aberration_core::engine",
                        ?element,
                        "target has no parent, skipped"
                    ),
                    Err(err) => warn!(
                        target: "aberration_core::engine",
                        ?element,
                        error = %err,
                        "overlay creation failed"
                    ),
                }
            }
        }
        created
    }

    /// Wrap `target`, register it, and queue its subscriptions.
    ///
    /// Returns `Ok(false)` when the target is already registered, sits
    /// inside an existing wrapper (clone internals included), or has no
    /// parent.
    pub fn create_overlay(&mut self, target: &H::Node) -> Result<bool, HostError> {
        if self.registry.contains(target) || inside_wrapper(&self.host, target) {
            return Ok(false);
        }
        let Some(mut record) = build_overlay(&mut self.host, target, &self.filter)? else {
            return Ok(false);
        };

        let mut wiring = Wiring::default();
        if let Some(command) = observe_style_changes(target, self.capabilities) {
            self.commands.push(command);
            wiring.style_sync = true;
        }
        self.subscribe(Subscription::PauseSignals {
            target: target.clone(),
            pause_event: self.settings.pause_event.clone(),
            resume_event: self.settings.resume_event.clone(),
        });
        if self.capabilities.resize_observer {
            self.subscribe(Subscription::Resize {
                target: target.clone(),
            });
            wiring.resize = true;
        }
        if self.settings.tracking == TrackingMode::PerElement {
            self.subscribe(Subscription::WrapperPointer {
                target: target.clone(),
                wrapper: record.wrapper.clone(),
            });
            wiring.pointer = true;
        }
        record.set_wiring(wiring);

        debug!(
            target: "aberration_core::engine",
            ?target,
            ?wiring,
            "overlay created"
        );
        self.registry.insert(target.clone(), record);
        Ok(true)
    }

    /// A `style` attribute changed on `changed`, somewhere in `target`'s
    /// subtree.
    pub fn handle_style_mutation(&mut self, target: &H::Node, changed: &H::Node) {
        let Some(record) = self.registry.get(target) else {
            return;
        };
        match sync_style_change(&mut self.host, target, &record.clone, changed) {
            Ok(SyncOutcome::Applied) => {}
            Ok(outcome) => trace!(
                target: "aberration_core::engine",
                ?changed,
                ?outcome,
                "style change not mirrored"
            ),
            Err(err) => warn!(
                target: "aberration_core::engine",
                ?target,
                error = %err,
                "style sync failed"
            ),
        }
    }

    /// A pause or resume event was dispatched on `target`.
    pub fn handle_pause_signal(&mut self, target: &H::Node, signal: PauseSignal) {
        self.set_paused(target, signal.paused());
    }

    /// Pause or resume `target`'s overlay. Returns whether the state
    /// changed; unregistered targets and same-state calls do nothing.
    pub fn set_paused(&mut self, target: &H::Node, paused: bool) -> bool {
        let Some(record) = self.registry.get_mut(target) else {
            return false;
        };
        match record.set_paused(&mut self.host, paused) {
            Ok(changed) => {
                if changed {
                    debug!(target: "aberration_core::engine", ?target, paused, "pause state changed");
                }
                changed
            }
            // The flag has already moved; only the style write failed.
            Err(err) => {
                warn!(
                    target: "aberration_core::engine",
                    ?target,
                    error = %err,
                    "pause transition failed"
                );
                true
            }
        }
    }

    /// `target` changed size; its mask position is stale.
    pub fn handle_resize(&mut self, target: &H::Node) {
        let Some(record) = self.registry.get(target) else {
            return;
        };
        if let Err(err) = clear_mask(&mut self.host, &record.overlay) {
            warn!(target: "aberration_core::engine", ?target, error = %err, "mask clear failed");
        }
    }

    /// Per-element pointer event on `target`'s wrapper at client
    /// coordinates `client`.
    pub fn handle_wrapper_pointer(
        &mut self,
        target: &H::Node,
        kind: WrapperPointerKind,
        client: Point,
    ) {
        let Some(record) = self.registry.get(target) else {
            return;
        };
        let result = match kind {
            WrapperPointerKind::Leave => clear_mask(&mut self.host, &record.overlay),
            WrapperPointerKind::Enter | WrapperPointerKind::Move => {
                if record.is_paused() {
                    return;
                }
                let local = self.host.bounding_rect(&record.wrapper).local(client);
                paint_mask(
                    &mut self.host,
                    &record.overlay,
                    local,
                    self.settings.mask_radius,
                )
            }
        };
        if let Err(err) = result {
            warn!(target: "aberration_core::engine", ?target, error = %err, "mask update failed");
        }
    }

    /// Window-level pointer move. Stores the position and requests at most
    /// one repaint frame.
    pub fn handle_window_pointer_move(&mut self, client: Point) {
        self.pointer = Some(client);
        if self.repaint.request() {
            self.commands
                .push(HostCommand::RequestFrame(FrameTask::Repaint));
        }
    }

    /// Elements were added or removed somewhere under the body. Requests at
    /// most one rescan frame.
    pub fn handle_child_list_mutation(&mut self) {
        if self.rescan.request() {
            self.commands
                .push(HostCommand::RequestFrame(FrameTask::Rescan));
        }
    }

    /// Run a frame task previously requested through
    /// [`HostCommand::RequestFrame`]. Stray calls are ignored.
    pub fn run_frame(&mut self, task: FrameTask) {
        match task {
            FrameTask::Repaint => {
                if self.repaint.begin() {
                    self.repaint_all();
                    trace!(
                        target: "aberration_core::engine",
                        requests = self.repaint.requests(),
                        runs = self.repaint.runs(),
                        "repaint frame"
                    );
                }
            }
            FrameTask::Rescan => {
                if self.rescan.begin() {
                    let created = self.scan();
                    trace!(
                        target: "aberration_core::engine",
                        requests = self.rescan.requests(),
                        runs = self.rescan.runs(),
                        "rescan frame"
                    );
                    if created > 0 {
                        debug!(target: "aberration_core::engine", created, "rescan wrapped new targets");
                    }
                }
            }
        }
    }

    // Paint every unpaused mask from the latest window pointer, or clear it
    // when the pointer is outside the wrapper box. Bounds are inclusive.
    fn repaint_all(&mut self) {
        let Some(pointer) = self.pointer else {
            return;
        };
        for (target, record) in self.registry.iter() {
            if record.is_paused() {
                continue;
            }
            let rect = self.host.bounding_rect(&record.wrapper);
            let local = rect.local(pointer);
            let result = if rect.contains_local(local) {
                paint_mask(
                    &mut self.host,
                    &record.overlay,
                    local,
                    self.settings.mask_radius,
                )
            } else {
                clear_mask(&mut self.host, &record.overlay)
            };
            if let Err(err) = result {
                warn!(target: "aberration_core::engine", ?target, error = %err, "mask update failed");
            }
        }
    }

    fn subscribe(&mut self, subscription: Subscription<H::Node>) {
        self.commands.push(HostCommand::Subscribe(subscription));
    }

    /// Take every command queued since the last call, in order.
    pub fn take_commands(&mut self) -> Vec<HostCommand<H::Node>> {
        std::mem::take(&mut self.commands)
    }

    /// Whether initialization has run.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    #[must_use]
    pub fn overlay(&self, target: &H::Node) -> Option<&OverlayRecord<H::Node>> {
        self.registry.get(target)
    }

    #[must_use]
    pub fn overlay_count(&self) -> usize {
        self.registry.len()
    }

    /// The CSS filter applied to every overlay.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}
