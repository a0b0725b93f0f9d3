use std::collections::VecDeque;

use crate::generation::Generation;

/// One recorded transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub frame_index: u64,
    pub generation: Option<Generation>,
    pub kind: &'static str,
    pub message: String,
}

/// Bounded, replayable log of engine transitions.
///
/// The session is long-lived, so the oldest events are dropped once
/// `capacity` is reached.
#[derive(Debug)]
pub struct EventBus {
    events: VecDeque<Event>,
    capacity: usize,
    dropped: u64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    pub fn emit(&mut self, frame_index: u64, kind: &'static str, message: impl Into<String>) {
        self.push(Event {
            frame_index,
            generation: None,
            kind,
            message: message.into(),
        });
    }

    pub fn emit_stamped(
        &mut self,
        frame_index: u64,
        generation: Generation,
        kind: &'static str,
        message: impl Into<String>,
    ) {
        self.push(Event {
            frame_index,
            generation: Some(generation),
            kind,
            message: message.into(),
        });
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.iter().map(|e| e.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn drain(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    fn push(&mut self, event: Event) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }
}
