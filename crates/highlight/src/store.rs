use std::collections::{BTreeMap, BTreeSet};

use foundation::{FeatureKind, FeatureUid, LatLng, SubId, TraceDirection};
use layers::{Classification, FeatureLayer, Membership, StyleTable};
use runtime::{Counter, Counters, Generation, GenerationCounter};
use tracing::{debug, warn};

use crate::selection::TraceSet;

/// A rendered feature as seen by pointer events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub uid: FeatureUid,
    pub kind: FeatureKind,
}

impl Target {
    pub fn new(uid: FeatureUid, kind: FeatureKind) -> Self {
        Self { uid, kind }
    }
}

/// The clicked feature plus what downstream consumers need from the click.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub target: Target,
    pub subid: SubId,
    pub latlng: LatLng,
    pub generation: Generation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverOutcome {
    /// The uid was already hovered.
    Unchanged,
    Moved { previous: Option<FeatureUid> },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TraceOutcome {
    Applied { members: usize },
    /// The click that requested the trace is no longer current.
    Stale,
}

/// Single authoritative record of every feature that is not idle.
///
/// Invariants held after every public operation:
/// - at most one hovered and at most one clicked feature;
/// - trace sets are empty unless a feature is clicked, and never contain it;
/// - the style written for a uid is `styles.resolve(kind, membership.effective())`.
///
/// Style writes go through [`FeatureLayer`]. A failed write is logged and
/// counted; it never stops the remaining features from being repainted, and
/// the classification change itself is always kept.
#[derive(Debug)]
pub struct HighlightStore {
    styles: StyleTable,
    generations: GenerationCounter,
    hovered: Option<Target>,
    selection: Option<Selection>,
    upstream: TraceSet,
    downstream: TraceSet,
    // Classification last written successfully, for every non-idle uid.
    painted: BTreeMap<FeatureUid, Classification>,
    // Kinds reported by pointer events, for uids that are not idle.
    kinds: BTreeMap<FeatureUid, FeatureKind>,
    counters: Counters,
}

impl Default for HighlightStore {
    fn default() -> Self {
        Self::new(StyleTable::default())
    }
}

impl HighlightStore {
    pub fn new(styles: StyleTable) -> Self {
        Self {
            styles,
            generations: GenerationCounter::new(),
            hovered: None,
            selection: None,
            upstream: TraceSet::new(),
            downstream: TraceSet::new(),
            painted: BTreeMap::new(),
            kinds: BTreeMap::new(),
            counters: Counters::new(),
        }
    }

    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    pub fn hovered(&self) -> Option<&Target> {
        self.hovered.as_ref()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn trace(&self, direction: TraceDirection) -> &TraceSet {
        match direction {
            TraceDirection::Upstream => &self.upstream,
            TraceDirection::Downstream => &self.downstream,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generations.current()
    }

    /// `true` while `generation` belongs to the click that is still selected.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.selection
            .as_ref()
            .is_some_and(|s| s.generation == generation)
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn membership(&self, uid: &FeatureUid) -> Membership {
        Membership {
            hovered: self.hovered.as_ref().is_some_and(|t| &t.uid == uid),
            clicked: self.selection.as_ref().is_some_and(|s| &s.target.uid == uid),
            upstream: self.upstream.contains(uid),
            downstream: self.downstream.contains(uid),
        }
    }

    pub fn classification(&self, uid: &FeatureUid) -> Classification {
        self.membership(uid).effective()
    }

    /// Marks `target` as the hovered feature.
    ///
    /// A clicked or trace-member target keeps its stronger style; the slot
    /// still records it so the cursor reflects the hover.
    pub fn set_hover(&mut self, target: Target, layer: &mut dyn FeatureLayer) -> HoverOutcome {
        if self.hovered.as_ref().is_some_and(|h| h.uid == target.uid) {
            return HoverOutcome::Unchanged;
        }

        self.kinds.insert(target.uid.clone(), target.kind);
        let uid = target.uid.clone();
        let previous = self.hovered.replace(target).map(|t| t.uid);
        if let Some(prev) = &previous {
            self.repaint(prev, layer, false);
        }
        self.repaint(&uid, layer, false);
        debug!(%uid, "hover set");
        HoverOutcome::Moved { previous }
    }

    /// Restores the hovered feature to its next style down (trace, else idle).
    pub fn clear_hover(&mut self, layer: &mut dyn FeatureLayer) -> Option<FeatureUid> {
        let previous = self.hovered.take()?.uid;
        self.repaint(&previous, layer, false);
        debug!(uid = %previous, "hover cleared");
        Some(previous)
    }

    /// Selects `target`, displacing any previous click and its traces.
    ///
    /// Returns the generation stamped on the fetches issued for this click.
    pub fn set_click(
        &mut self,
        target: Target,
        subid: SubId,
        latlng: LatLng,
        layer: &mut dyn FeatureLayer,
    ) -> Generation {
        let generation = self.generations.advance();
        self.kinds.insert(target.uid.clone(), target.kind);

        let mut affected: BTreeSet<FeatureUid> = BTreeSet::new();
        affected.insert(target.uid.clone());
        affected.extend(self.upstream.take());
        affected.extend(self.downstream.take());

        let previous = self.selection.replace(Selection {
            target,
            subid,
            latlng,
            generation,
        });
        if let Some(prev) = previous {
            affected.insert(prev.target.uid);
        }

        for uid in &affected {
            self.repaint(uid, layer, false);
        }
        debug!(%generation, repainted = affected.len(), "click set");
        generation
    }

    /// Clears the click and every trace member. Calling it again is a no-op.
    pub fn clear_click(&mut self, layer: &mut dyn FeatureLayer) -> Option<Selection> {
        let previous = self.selection.take()?;
        // Outstanding fetches for the cleared click must not land.
        self.generations.advance();

        let mut affected: BTreeSet<FeatureUid> = BTreeSet::new();
        affected.insert(previous.target.uid.clone());
        affected.extend(self.upstream.take());
        affected.extend(self.downstream.take());
        for uid in &affected {
            self.repaint(uid, layer, false);
        }
        debug!(uid = %previous.target.uid, "click cleared");
        Some(previous)
    }

    /// Replaces one trace set with `uids`, if `generation` is still current.
    ///
    /// The clicked uid is never stored as its own trace member.
    pub fn apply_trace(
        &mut self,
        direction: TraceDirection,
        generation: Generation,
        uids: impl IntoIterator<Item = FeatureUid>,
        layer: &mut dyn FeatureLayer,
    ) -> TraceOutcome {
        let Some(selection) = self.selection.as_ref() else {
            return TraceOutcome::Stale;
        };
        if selection.generation != generation {
            return TraceOutcome::Stale;
        }

        let clicked = selection.target.uid.clone();
        let next: TraceSet = uids.into_iter().filter(|uid| *uid != clicked).collect();
        let members = next.len();
        let previous = match direction {
            TraceDirection::Upstream => self.upstream.replace(next),
            TraceDirection::Downstream => self.downstream.replace(next),
        };

        let mut affected: BTreeSet<FeatureUid> = previous.into_iter().collect();
        affected.extend(self.trace(direction).iter().cloned());
        for uid in &affected {
            self.repaint(uid, layer, false);
        }
        debug!(%direction, %generation, members, "trace applied");
        TraceOutcome::Applied { members }
    }

    /// Re-issues the style of every non-idle feature.
    ///
    /// Tile re-rendering drops overrides; classifications are untouched.
    pub fn reapply(&mut self, layer: &mut dyn FeatureLayer) -> usize {
        let mut active: BTreeSet<FeatureUid> = self.painted.keys().cloned().collect();
        active.extend(self.hovered.iter().map(|t| t.uid.clone()));
        active.extend(self.selection.iter().map(|s| s.target.uid.clone()));
        active.extend(self.upstream.iter().cloned());
        active.extend(self.downstream.iter().cloned());
        for uid in &active {
            self.repaint(uid, layer, true);
        }
        active.len()
    }

    fn kind_for(&self, uid: &FeatureUid, layer: &dyn FeatureLayer) -> FeatureKind {
        layer
            .kind_of(uid)
            .or_else(|| self.kinds.get(uid).copied())
            .unwrap_or(FeatureKind::River)
    }

    fn repaint(&mut self, uid: &FeatureUid, layer: &mut dyn FeatureLayer, force: bool) {
        let next = self.classification(uid);
        self.write_style(uid, next, layer, force);
        if next == Classification::Idle {
            // Kinds are only remembered while the feature is highlighted.
            self.kinds.remove(uid);
        }
    }

    fn write_style(
        &mut self,
        uid: &FeatureUid,
        next: Classification,
        layer: &mut dyn FeatureLayer,
        force: bool,
    ) {
        let prev = self
            .painted
            .get(uid)
            .copied()
            .unwrap_or(Classification::Idle);
        if next == prev && !force {
            return;
        }

        let kind = self.kind_for(uid, layer);
        let result = match self.styles.resolve(kind, next) {
            Some(style) => layer.set_feature_style(uid, style),
            None => layer.reset_feature_style(uid),
        };

        match result {
            Ok(()) => {
                self.counters.inc(Counter::StyleWrites);
                if next == Classification::Idle {
                    self.painted.remove(uid);
                } else {
                    self.painted.insert(uid.clone(), next);
                }
            }
            Err(err) => {
                self.counters.inc(Counter::StyleWriteFailures);
                warn!(%uid, ?next, error = %err, "style write failed");
            }
        }
    }
}
