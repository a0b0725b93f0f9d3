use foundation::{FeatureKind, FeatureUid, LatLng, SubId, TraceDirection};
use highlight::{HighlightStore, HoverOutcome, Target, TraceOutcome};
use layers::{FeatureLayer, StyleTable};
use runtime::{Counter, Counters, EventBus, Frame, Generation};
use serde::Serialize;
use streaming::{DetailPayload, FetchError};
use tracing::{debug, warn};

use crate::cursor::{Cursor, CursorController, Viewport};
use crate::popup::{Download, DownloadStore, PopupContent, PopupPresenter, PopupSurface};
use crate::router::{PointerRouter, RawEvent, Signal};

/// External surfaces the engine writes to. Each is written by exactly one
/// component: the layer by the store, the viewport by the cursor controller,
/// popup and downloads by the presenter.
pub struct Surfaces {
    pub layer: Box<dyn FeatureLayer>,
    pub viewport: Box<dyn Viewport>,
    pub popup: Box<dyn PopupSurface>,
    pub downloads: Box<dyn DownloadStore>,
}

/// Fetches to issue for one click, stamped with its generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub generation: Generation,
    pub uid: FeatureUid,
    pub kind: FeatureKind,
    pub subid: SubId,
}

/// What happened to one asynchronous result.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Applied,
    /// The click it was issued for has been superseded or cleared.
    Stale,
    Failed,
    Cancelled,
}

/// Point-in-time view of the engine, for hosts and logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub generation: u64,
    pub hovered: Option<String>,
    pub clicked: Option<String>,
    pub selected_subid: Option<String>,
    pub upstream: Vec<String>,
    pub downstream: Vec<String>,
    pub cursor: Cursor,
    pub popup_html: Option<String>,
    pub counters: Vec<(&'static str, u64)>,
}

/// The interactive highlighting engine.
///
/// Single-threaded: every mutation happens inside one call, either for a
/// routed event, a frame tick, or a resolved fetch.
pub struct Explorer {
    store: HighlightStore,
    router: PointerRouter,
    cursor: CursorController,
    popup: PopupPresenter,
    surfaces: Surfaces,
    bus: EventBus,
    counters: Counters,
    frame: Frame,
}

impl Explorer {
    pub fn new(styles: StyleTable, surfaces: Surfaces) -> Self {
        Self {
            store: HighlightStore::new(styles),
            router: PointerRouter::new(),
            cursor: CursorController::new(),
            popup: PopupPresenter::new(),
            surfaces,
            bus: EventBus::new(),
            counters: Counters::new(),
            frame: Frame::new(0, 0.0),
        }
    }

    pub fn store(&self) -> &HighlightStore {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    /// Cursor the viewport shows after the next frame.
    pub fn cursor(&self) -> Cursor {
        self.cursor.current()
    }

    pub fn popup(&self) -> Option<&PopupContent> {
        self.popup.content()
    }

    /// Sub-basin of the clicked feature, for the data panel.
    pub fn selected_subid(&self) -> Option<&SubId> {
        self.store.selection().map(|s| &s.subid)
    }

    pub fn counters(&self) -> Counters {
        let mut all = self.counters.clone();
        all.merge(self.store.counters());
        all.add(Counter::MalformedEvents, self.router.malformed_count());
        all.add(Counter::HoverCoalesced, self.router.superseded_hover_count());
        all.add(Counter::CursorWrites, self.cursor.write_count());
        all
    }

    /// Routes one raw event. Returns the fetches to issue when it was a click.
    pub fn handle(&mut self, event: &RawEvent) -> Option<FetchPlan> {
        let signal = self.router.route(event)?;
        self.apply(signal)
    }

    /// Advances to `frame`: applies the deferred hover, then writes the cursor.
    pub fn tick(&mut self, frame: Frame) {
        self.frame = frame;
        if let Some(signal) = self.router.on_frame() {
            self.apply(signal);
        }
        self.cursor.flush(self.surfaces.viewport.as_mut());
    }

    /// Clears the click, its traces and the popup.
    pub fn close_popup(&mut self) {
        let cleared = self.store.clear_click(self.surfaces.layer.as_mut());
        self.popup.close(
            self.surfaces.popup.as_mut(),
            self.surfaces.downloads.as_mut(),
        );
        if let Some(selection) = cleared {
            self.bus.emit_stamped(
                self.frame.index,
                selection.generation,
                "click.cleared",
                selection.target.uid.to_string(),
            );
        }
    }

    pub fn resolve_detail(
        &mut self,
        generation: Generation,
        result: Result<DetailPayload, FetchError>,
    ) -> Resolution {
        if let Err(err) = &result {
            if err.is_cancelled() {
                self.counters.inc(Counter::FetchesCancelled);
                return Resolution::Cancelled;
            }
        }
        if !self.store.is_current(generation) {
            self.discard_stale(generation, "detail");
            return Resolution::Stale;
        }

        let surfaces = &mut self.surfaces;
        let (content, resolution) = match result {
            Ok(payload) => {
                let file_name = payload.file_name();
                let download = match surfaces.downloads.create(&file_name, payload.pretty_json()) {
                    Ok(handle) => Some(Download { handle, file_name }),
                    Err(err) => {
                        warn!(error = %err, "download unavailable");
                        None
                    }
                };
                let content = PopupContent::Detail {
                    subid: payload.subid,
                    download,
                };
                (content, Resolution::Applied)
            }
            Err(err) => {
                self.counters.inc(Counter::DetailFailures);
                warn!(%generation, error = %err, "detail fetch failed");
                let content = PopupContent::Error {
                    message: PopupContent::DETAIL_FAILED.to_string(),
                };
                (content, Resolution::Failed)
            }
        };

        self.popup.update(
            generation,
            content,
            surfaces.popup.as_mut(),
            surfaces.downloads.as_mut(),
        );
        self.bus
            .emit_stamped(self.frame.index, generation, "detail", format!("{resolution:?}"));
        resolution
    }

    pub fn resolve_trace(
        &mut self,
        generation: Generation,
        direction: TraceDirection,
        result: Result<Vec<FeatureUid>, FetchError>,
    ) -> Resolution {
        let uids = match result {
            Err(err) if err.is_cancelled() => {
                self.counters.inc(Counter::FetchesCancelled);
                return Resolution::Cancelled;
            }
            _ if !self.store.is_current(generation) => {
                self.discard_stale(generation, "trace");
                return Resolution::Stale;
            }
            Err(err) => {
                // The set was emptied when the click landed; it stays empty.
                self.counters.inc(Counter::TraceFailures);
                warn!(%direction, %generation, error = %err, "trace fetch failed");
                return Resolution::Failed;
            }
            Ok(uids) => uids,
        };

        match self
            .store
            .apply_trace(direction, generation, uids, self.surfaces.layer.as_mut())
        {
            TraceOutcome::Applied { members } => {
                self.bus.emit_stamped(
                    self.frame.index,
                    generation,
                    "trace",
                    format!("{direction}: {members}"),
                );
                Resolution::Applied
            }
            TraceOutcome::Stale => {
                self.discard_stale(generation, "trace");
                Resolution::Stale
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let names = |direction: TraceDirection| -> Vec<String> {
            self.store
                .trace(direction)
                .iter()
                .map(FeatureUid::to_string)
                .collect()
        };
        Snapshot {
            generation: self.store.generation().0,
            hovered: self.store.hovered().map(|t| t.uid.to_string()),
            clicked: self.store.selection().map(|s| s.target.uid.to_string()),
            selected_subid: self.selected_subid().map(|s| s.to_string()),
            upstream: names(TraceDirection::Upstream),
            downstream: names(TraceDirection::Downstream),
            cursor: self.cursor(),
            popup_html: self.popup.content().map(PopupContent::render_html),
            counters: self.counters().snapshot(),
        }
    }

    fn apply(&mut self, signal: Signal) -> Option<FetchPlan> {
        let frame = self.frame.index;
        let mut plan = None;
        match signal {
            Signal::HoverEnter(target) => {
                let uid = target.uid.clone();
                match self.store.set_hover(target, self.surfaces.layer.as_mut()) {
                    HoverOutcome::Unchanged => self.counters.inc(Counter::HoverCoalesced),
                    HoverOutcome::Moved { .. } => {
                        self.counters.inc(Counter::HoverApplied);
                        self.bus.emit(frame, "hover.enter", uid.to_string());
                    }
                }
            }
            Signal::HoverLeave => {
                if let Some(uid) = self.store.clear_hover(self.surfaces.layer.as_mut()) {
                    self.bus.emit(frame, "hover.leave", uid.to_string());
                }
            }
            Signal::Click {
                target,
                subid,
                latlng,
            } => {
                plan = Some(self.click(target, subid, latlng));
            }
            Signal::DragStart => self.bus.emit(frame, "drag.start", ""),
            Signal::DragEnd => self.bus.emit(frame, "drag.end", ""),
            Signal::ViewChangeStart => {
                if let Some(uid) = self.store.clear_hover(self.surfaces.layer.as_mut()) {
                    self.bus.emit(frame, "hover.leave", uid.to_string());
                }
            }
            Signal::ViewChangeEnd => {
                let n = self.store.reapply(self.surfaces.layer.as_mut());
                if n > 0 {
                    self.bus.emit(frame, "style.reapply", n.to_string());
                }
            }
            Signal::PopupClosed => self.close_popup(),
        }

        self.cursor.request(Cursor::derive(
            self.router.is_dragging(),
            self.store.hovered().is_some(),
        ));
        plan
    }

    fn click(&mut self, target: Target, subid: SubId, latlng: LatLng) -> FetchPlan {
        let uid = target.uid.clone();
        let kind = target.kind;
        let generation =
            self.store.set_click(target, subid.clone(), latlng, self.surfaces.layer.as_mut());
        self.popup.open(
            generation,
            latlng,
            PopupContent::Summary {
                subid: subid.clone(),
            },
            self.surfaces.popup.as_mut(),
            self.surfaces.downloads.as_mut(),
        );
        self.bus
            .emit_stamped(self.frame.index, generation, "click", uid.to_string());
        debug!(%uid, %subid, %generation, "click");
        FetchPlan {
            generation,
            uid,
            kind,
            subid,
        }
    }

    fn discard_stale(&mut self, generation: Generation, what: &'static str) {
        self.counters.inc(Counter::StaleDiscarded);
        self.bus
            .emit_stamped(self.frame.index, generation, "stale", what);
        debug!(%generation, what, "stale response discarded");
    }
}
