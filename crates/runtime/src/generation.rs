/// Stamp distinguishing one click from the clicks that superseded it.
///
/// Every asynchronous result carries the generation it was issued under and
/// is applied only while that generation is still current.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Monotonic generation source. Generation 0 is never handed out.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: Generation,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Generation {
        self.current
    }

    pub fn advance(&mut self) -> Generation {
        self.current = Generation(self.current.0.wrapping_add(1).max(1));
        self.current
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.current
    }
}
