use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};

use serde_json::{Map, Value};
use tracing::trace;

use crate::router::{RawEvent, RawLatLng};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct ListenerId(u64);

type Listener = Box<dyn FnMut(&RawEvent)>;

/// Pointer entering or leaving a feature, with the tile properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoverChange<'a> {
    Over(&'a Map<String, Value>),
    Out(&'a Map<String, Value>),
}

/// Fan-out point for raw map events.
///
/// Listeners may publish or unsubscribe from inside a callback: events
/// published during dispatch are queued and delivered in order once the
/// current event has reached every listener.
#[derive(Default)]
pub struct EventHub {
    listeners: RefCell<BTreeMap<ListenerId, Listener>>,
    next_id: Cell<u64>,
    queue: RefCell<VecDeque<RawEvent>>,
    dispatching: Cell<bool>,
    detached: RefCell<Vec<ListenerId>>,
}

impl EventHub {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn listener_count(&self) -> usize {
        let detached = self.detached.borrow();
        self.listeners
            .borrow()
            .keys()
            .filter(|id| !detached.contains(id))
            .count()
    }

    /// Attaches `listener` until the returned [`Subscription`] is dropped.
    pub fn subscribe(self: &Rc<Self>, listener: impl FnMut(&RawEvent) + 'static) -> Subscription {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().insert(id, Box::new(listener));
        trace!(id = id.0, "listener attached");
        Subscription {
            hub: Rc::downgrade(self),
            id,
        }
    }

    /// Listens to `mouseover` and `mouseout` only.
    pub fn on_hover(
        self: &Rc<Self>,
        mut listener: impl FnMut(HoverChange<'_>) + 'static,
    ) -> Subscription {
        self.subscribe(move |event| match event {
            RawEvent::Mouseover { properties } => listener(HoverChange::Over(properties)),
            RawEvent::Mouseout { properties } => listener(HoverChange::Out(properties)),
            _ => {}
        })
    }

    /// Listens to feature clicks only.
    pub fn on_click(
        self: &Rc<Self>,
        mut listener: impl FnMut(&Map<String, Value>, Option<RawLatLng>) + 'static,
    ) -> Subscription {
        self.subscribe(move |event| {
            if let RawEvent::Click { properties, latlng } = event {
                listener(properties, *latlng);
            }
        })
    }

    /// Called with `true` on `dragstart` and `false` on `dragend`.
    pub fn on_drag_change(
        self: &Rc<Self>,
        mut listener: impl FnMut(bool) + 'static,
    ) -> Subscription {
        self.subscribe(move |event| match event {
            RawEvent::Dragstart => listener(true),
            RawEvent::Dragend => listener(false),
            _ => {}
        })
    }

    pub fn publish(&self, event: RawEvent) {
        self.queue.borrow_mut().push_back(event);
        if self.dispatching.replace(true) {
            return;
        }
        loop {
            let Some(event) = self.queue.borrow_mut().pop_front() else {
                break;
            };
            // Listeners are moved out while they run so callbacks can
            // subscribe or publish without a double borrow.
            let mut running = std::mem::take(&mut *self.listeners.borrow_mut());
            for (id, listener) in running.iter_mut() {
                if !self.detached.borrow().contains(id) {
                    listener(&event);
                }
            }
            let mut listeners = self.listeners.borrow_mut();
            running.append(&mut *listeners);
            *listeners = running;
            for id in self.detached.borrow_mut().drain(..) {
                listeners.remove(&id);
            }
        }
        self.dispatching.set(false);
    }

    fn detach(&self, id: ListenerId) {
        if self.dispatching.get() {
            self.detached.borrow_mut().push(id);
        } else {
            self.listeners.borrow_mut().remove(&id);
        }
        trace!(id = id.0, "listener detached");
    }
}

/// Detaches its listener when dropped.
#[must_use = "dropping a Subscription detaches the listener"]
pub struct Subscription {
    hub: Weak<EventHub>,
    id: ListenerId,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.detach(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EventHub, HoverChange};
    use crate::router::{RawEvent, RawLatLng};
    use serde_json::{Map, Value, json};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<RawEvent>>>, impl FnMut(&RawEvent) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |e: &RawEvent| sink.borrow_mut().push(e.clone()))
    }

    #[test]
    fn dropping_the_subscription_detaches() {
        let hub = EventHub::new();
        let (seen, listener) = recorder();
        let sub = hub.subscribe(listener);
        hub.publish(RawEvent::Zoomstart);
        drop(sub);
        hub.publish(RawEvent::Zoomend);
        assert_eq!(*seen.borrow(), vec![RawEvent::Zoomstart]);
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn events_published_from_a_listener_are_queued_in_order() {
        let hub = EventHub::new();
        let (seen, listener) = recorder();
        let weak = Rc::downgrade(&hub);
        let _echo = hub.subscribe(move |e| {
            if *e == RawEvent::Mousedown {
                if let Some(hub) = weak.upgrade() {
                    hub.publish(RawEvent::Dragstart);
                }
            }
        });
        let _rec = hub.subscribe(listener);
        hub.publish(RawEvent::Mousedown);
        assert_eq!(
            *seen.borrow(),
            vec![RawEvent::Mousedown, RawEvent::Dragstart]
        );
    }

    #[test]
    fn unsubscribing_during_dispatch_takes_effect_immediately() {
        let hub = EventHub::new();
        let (seen, listener) = recorder();
        let target = Rc::new(RefCell::new(Some(hub.subscribe(listener))));
        let slot = target.clone();
        let _killer = hub.subscribe(move |_| {
            slot.borrow_mut().take();
        });
        hub.publish(RawEvent::Popupclose);
        hub.publish(RawEvent::Popupclose);
        // The recorder runs ahead of the listener that drops it.
        assert_eq!(*seen.borrow(), vec![RawEvent::Popupclose]);
        assert_eq!(hub.listener_count(), 1);
        assert!(target.borrow().is_none());
    }

    #[test]
    fn subscription_outliving_hub_is_harmless() {
        let hub = EventHub::new();
        let sub = hub.subscribe(|_| {});
        drop(hub);
        drop(sub);
    }

    #[test]
    fn typed_listeners_only_see_their_events() {
        let hub = EventHub::new();
        let log: Rc<RefCell<Vec<String>>> = Rc::default();

        let sink = log.clone();
        let hover = hub.on_hover(move |change| {
            let (what, props) = match change {
                HoverChange::Over(p) => ("over", p),
                HoverChange::Out(p) => ("out", p),
            };
            let uid = props.get("uid").and_then(Value::as_str).unwrap_or("-");
            sink.borrow_mut().push(format!("{what} {uid}"));
        });
        let sink = log.clone();
        let _click = hub.on_click(move |props, latlng| {
            let at = latlng.map(|l| l.lat).unwrap_or_default();
            sink.borrow_mut().push(format!("click {} {at}", props["subid"]));
        });
        let sink = log.clone();
        let _drag = hub.on_drag_change(move |dragging| {
            sink.borrow_mut().push(format!("drag {dragging}"));
        });

        let props = |v: Value| match v {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        hub.publish(RawEvent::Mouseover {
            properties: props(json!({ "uid": "R1" })),
        });
        hub.publish(RawEvent::Zoomstart);
        hub.publish(RawEvent::Dragstart);
        hub.publish(RawEvent::Dragend);
        hub.publish(RawEvent::Click {
            properties: props(json!({ "subid": 42 })),
            latlng: Some(RawLatLng {
                lat: 49.5,
                lng: -123.0,
            }),
        });
        drop(hover);
        hub.publish(RawEvent::Mouseout {
            properties: Map::new(),
        });

        assert_eq!(
            *log.borrow(),
            vec!["over R1", "drag true", "drag false", "click 42 49.5"]
        );
        assert_eq!(hub.listener_count(), 2);
    }
}
