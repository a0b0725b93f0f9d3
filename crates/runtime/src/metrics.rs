use std::collections::BTreeMap;

/// Engine counters.
///
/// Ordered so snapshots are stable across runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Counter {
    MalformedEvents,
    HoverCoalesced,
    HoverApplied,
    StyleWrites,
    StyleWriteFailures,
    CursorWrites,
    StaleDiscarded,
    DetailFailures,
    TraceFailures,
    FetchesCancelled,
}

impl Counter {
    pub fn name(self) -> &'static str {
        match self {
            Counter::MalformedEvents => "events.malformed",
            Counter::HoverCoalesced => "hover.coalesced",
            Counter::HoverApplied => "hover.applied",
            Counter::StyleWrites => "style.writes",
            Counter::StyleWriteFailures => "style.write_failures",
            Counter::CursorWrites => "cursor.writes",
            Counter::StaleDiscarded => "fetch.stale_discarded",
            Counter::DetailFailures => "fetch.detail_failures",
            Counter::TraceFailures => "fetch.trace_failures",
            Counter::FetchesCancelled => "fetch.cancelled",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Counters {
    values: BTreeMap<Counter, u64>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.values.get(&counter).copied().unwrap_or(0)
    }

    pub fn inc(&mut self, counter: Counter) {
        self.add(counter, 1);
    }

    pub fn add(&mut self, counter: Counter, by: u64) {
        *self.values.entry(counter).or_insert(0) += by;
    }

    pub fn merge(&mut self, other: &Counters) {
        for (counter, value) in &other.values {
            self.add(*counter, *value);
        }
    }

    /// Non-zero counters by name, in declaration order.
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        self.values
            .iter()
            .filter(|(_, v)| **v > 0)
            .map(|(k, v)| (k.name(), *v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Counter, Counters};

    #[test]
    fn counters_accumulate() {
        let mut c = Counters::new();
        c.inc(Counter::StyleWrites);
        c.add(Counter::StyleWrites, 2);
        assert_eq!(c.get(Counter::StyleWrites), 3);
        assert_eq!(c.get(Counter::CursorWrites), 0);
    }

    #[test]
    fn merge_adds_values() {
        let mut a = Counters::new();
        a.inc(Counter::StyleWrites);
        let mut b = Counters::new();
        b.add(Counter::StyleWrites, 4);
        b.inc(Counter::TraceFailures);
        a.merge(&b);
        assert_eq!(a.get(Counter::StyleWrites), 5);
        assert_eq!(a.get(Counter::TraceFailures), 1);
    }

    #[test]
    fn snapshot_is_ordered_and_skips_zero() {
        let mut c = Counters::new();
        c.inc(Counter::StaleDiscarded);
        c.inc(Counter::MalformedEvents);
        assert_eq!(
            c.snapshot(),
            vec![("events.malformed", 1), ("fetch.stale_discarded", 1)]
        );
    }
}
