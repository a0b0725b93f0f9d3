use foundation::{FeatureKind, FeatureUid, LatLng, SubId};
use highlight::Target;
use runtime::FrameSlot;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Geographic position as reported by the map.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
pub struct RawLatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Pointer and map events exactly as the tile layer and map report them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RawEvent {
    Mouseover {
        #[serde(default)]
        properties: Map<String, Value>,
    },
    Mouseout {
        #[serde(default)]
        properties: Map<String, Value>,
    },
    Click {
        #[serde(default)]
        properties: Map<String, Value>,
        #[serde(default)]
        latlng: Option<RawLatLng>,
    },
    Mousedown,
    Mouseup,
    Dragstart,
    Dragend,
    Zoomstart,
    Movestart,
    Zoomend,
    Moveend,
    Popupclose,
}

/// Feature identity decoded from tile properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRef {
    pub uid: FeatureUid,
    pub kind: FeatureKind,
    pub subid: Option<SubId>,
}

impl FeatureRef {
    /// Decodes `uid`, `subid` and `islake`.
    ///
    /// Ids may arrive as strings or numbers. `None` when `uid` is unusable.
    pub fn from_properties(properties: &Map<String, Value>) -> Option<Self> {
        let uid = properties
            .get("uid")
            .and_then(scalar)
            .and_then(|s| FeatureUid::parse(&s))?;
        let subid = properties
            .get("subid")
            .and_then(scalar)
            .and_then(|s| SubId::parse(&s));
        let is_lake = properties.get("islake").is_some_and(truthy);
        Some(Self {
            uid,
            kind: FeatureKind::from_is_lake(is_lake),
            subid,
        })
    }

    pub fn target(&self) -> Target {
        Target::new(self.uid.clone(), self.kind)
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim(), "true" | "1"),
        _ => false,
    }
}

/// Semantic signals consumed by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    HoverEnter(Target),
    HoverLeave,
    Click {
        target: Target,
        subid: SubId,
        latlng: LatLng,
    },
    DragStart,
    DragEnd,
    /// Zoom or pan started: hover is dropped, selection is kept.
    ViewChangeStart,
    /// Zoom or pan settled: tiles may have been re-rendered.
    ViewChangeEnd,
    PopupClosed,
}

/// Normalizes raw events into [`Signal`]s.
///
/// - While dragging, hover and click are suppressed.
/// - Hover-enter is deferred to the next animation frame; a later
///   mouseover in the same frame replaces it, and mouseout, drag start and
///   view changes cancel it.
/// - Malformed feature events are dropped and counted.
#[derive(Debug, Default)]
pub struct PointerRouter {
    dragging: bool,
    pending_hover: FrameSlot<Target>,
    malformed: u64,
}

impl PointerRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn pending_hover(&self) -> Option<&Target> {
        self.pending_hover.peek()
    }

    pub fn malformed_count(&self) -> u64 {
        self.malformed
    }

    /// Hover-enter events that were replaced before their frame fired.
    pub fn superseded_hover_count(&self) -> u64 {
        self.pending_hover.replaced_count()
    }

    /// Routes one raw event. Deferred hovers are released by [`Self::on_frame`].
    pub fn route(&mut self, event: &RawEvent) -> Option<Signal> {
        match event {
            RawEvent::Mouseover { properties } => {
                if self.dragging {
                    return None;
                }
                let feature = self.decode(properties)?;
                self.pending_hover.schedule(feature.target());
                None
            }
            RawEvent::Mouseout { .. } => {
                if self.dragging {
                    return None;
                }
                self.pending_hover.cancel();
                Some(Signal::HoverLeave)
            }
            RawEvent::Click { properties, latlng } => {
                if self.dragging {
                    return None;
                }
                let feature = self.decode(properties)?;
                let (Some(subid), Some(latlng)) = (feature.subid.clone(), latlng) else {
                    self.malformed += 1;
                    debug!(uid = %feature.uid, "click without subid or latlng dropped");
                    return None;
                };
                let latlng = LatLng::new(latlng.lat, latlng.lng);
                if !latlng.is_finite() {
                    self.malformed += 1;
                    return None;
                }
                Some(Signal::Click {
                    target: feature.target(),
                    subid,
                    latlng,
                })
            }
            RawEvent::Mousedown | RawEvent::Dragstart => {
                self.pending_hover.cancel();
                if self.dragging {
                    return None;
                }
                self.dragging = true;
                Some(Signal::DragStart)
            }
            RawEvent::Mouseup | RawEvent::Dragend => {
                if !self.dragging {
                    return None;
                }
                self.dragging = false;
                Some(Signal::DragEnd)
            }
            RawEvent::Zoomstart | RawEvent::Movestart => {
                self.pending_hover.cancel();
                Some(Signal::ViewChangeStart)
            }
            RawEvent::Zoomend | RawEvent::Moveend => Some(Signal::ViewChangeEnd),
            RawEvent::Popupclose => Some(Signal::PopupClosed),
        }
    }

    /// Releases the hover scheduled for this frame, if any.
    pub fn on_frame(&mut self) -> Option<Signal> {
        self.pending_hover.take().map(Signal::HoverEnter)
    }

    fn decode(&mut self, properties: &Map<String, Value>) -> Option<FeatureRef> {
        let feature = FeatureRef::from_properties(properties);
        if feature.is_none() {
            self.malformed += 1;
            debug!("feature event without uid dropped");
        }
        feature
    }
}
