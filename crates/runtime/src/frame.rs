/// Animation frame metadata.
///
/// Hosts tick the engine once per display frame; everything deferred "to the
/// next frame" is applied when the tick carrying a higher index arrives.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Host timestamp at the start of the frame (milliseconds).
    pub timestamp_ms: f64,
}

impl Frame {
    pub fn new(index: u64, timestamp_ms: f64) -> Self {
        Self {
            index,
            timestamp_ms,
        }
    }

    pub fn next(self, dt_ms: f64) -> Self {
        Self::new(self.index + 1, self.timestamp_ms + dt_ms)
    }
}

/// Holds at most one value waiting for the next animation frame.
///
/// Scheduling while a value is pending replaces it, so only the latest
/// request is applied when the frame fires.
#[derive(Debug, Clone)]
pub struct FrameSlot<T> {
    pending: Option<T>,
    replaced: u64,
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self {
            pending: None,
            replaced: 0,
        }
    }
}

impl<T> FrameSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a previously pending value was displaced.
    pub fn schedule(&mut self, value: T) -> bool {
        let displaced = self.pending.replace(value).is_some();
        if displaced {
            self.replaced += 1;
        }
        displaced
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn peek(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    /// Takes the pending value when the frame fires.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }

    /// Number of scheduled values that never reached a frame.
    pub fn replaced_count(&self) -> u64 {
        self.replaced
    }
}
