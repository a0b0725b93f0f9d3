use runtime::FrameSlot;
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cursor {
    Grab,
    Grabbing,
    Pointer,
}

impl Cursor {
    /// dragging -> grabbing; hovering a feature -> pointer; otherwise grab.
    pub fn derive(dragging: bool, hovering: bool) -> Self {
        if dragging {
            Cursor::Grabbing
        } else if hovering {
            Cursor::Pointer
        } else {
            Cursor::Grab
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Cursor::Grab => "grab",
            Cursor::Grabbing => "grabbing",
            Cursor::Pointer => "pointer",
        }
    }
}

/// The map viewport element whose cursor we own.
pub trait Viewport {
    fn set_cursor(&mut self, token: &str);
}

/// Coalesces cursor changes to at most one write per animation frame.
#[derive(Debug, Default)]
pub struct CursorController {
    pending: FrameSlot<Cursor>,
    written: Option<Cursor>,
    writes: u64,
}

impl CursorController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor the viewport will show after the next flush.
    pub fn current(&self) -> Cursor {
        self.pending
            .peek()
            .copied()
            .or(self.written)
            .unwrap_or(Cursor::Grab)
    }

    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Requests `cursor` for the next frame. Returns `false` when nothing changes.
    pub fn request(&mut self, cursor: Cursor) -> bool {
        if self.written == Some(cursor) {
            // A pending change back to what is already shown is a no-op.
            return self.pending.cancel().is_some();
        }
        if self.pending.peek() == Some(&cursor) {
            return false;
        }
        self.pending.schedule(cursor);
        true
    }

    /// Applies the pending cursor. Called once per animation frame.
    pub fn flush(&mut self, viewport: &mut dyn Viewport) -> bool {
        let Some(cursor) = self.pending.take() else {
            return false;
        };
        if self.written == Some(cursor) {
            return false;
        }
        viewport.set_cursor(cursor.token());
        self.written = Some(cursor);
        self.writes += 1;
        true
    }
}
