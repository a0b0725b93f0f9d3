use std::collections::{BTreeMap, BTreeSet};

use foundation::{FeatureKind, FeatureUid};

use crate::layer::{FeatureLayer, LayerError};
use crate::symbology::FeatureStyle;

/// In-memory feature layer that records the overrides currently in effect.
///
/// Used by headless hosts and tests in place of a real tile renderer.
#[derive(Debug, Default, Clone)]
pub struct RecordingLayer {
    kinds: BTreeMap<FeatureUid, FeatureKind>,
    overrides: BTreeMap<FeatureUid, FeatureStyle>,
    rejecting: BTreeSet<FeatureUid>,
    writes: u64,
    resets: u64,
}

impl RecordingLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rendered feature so `kind_of` can answer for it.
    pub fn with_feature(mut self, uid: impl Into<String>, kind: FeatureKind) -> Self {
        self.add_feature(FeatureUid::new(uid), kind);
        self
    }

    pub fn add_feature(&mut self, uid: FeatureUid, kind: FeatureKind) {
        self.kinds.insert(uid, kind);
    }

    /// Makes every write for `uid` fail with `LayerError::Rejected`.
    pub fn reject_writes_for(&mut self, uid: FeatureUid) {
        self.rejecting.insert(uid);
    }

    pub fn style_of(&self, uid: &FeatureUid) -> Option<&FeatureStyle> {
        self.overrides.get(uid)
    }

    pub fn overrides(&self) -> impl Iterator<Item = (&FeatureUid, &FeatureStyle)> {
        self.overrides.iter()
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Drops every override, as a tile re-render does.
    pub fn rerender(&mut self) {
        self.overrides.clear();
    }

    pub fn write_count(&self) -> u64 {
        self.writes
    }

    pub fn reset_count(&self) -> u64 {
        self.resets
    }
}

impl FeatureLayer for RecordingLayer {
    fn set_feature_style(
        &mut self,
        uid: &FeatureUid,
        style: &FeatureStyle,
    ) -> Result<(), LayerError> {
        if self.rejecting.contains(uid) {
            return Err(LayerError::Rejected {
                uid: uid.clone(),
                reason: "rejected by test layer".to_string(),
            });
        }
        self.writes += 1;
        self.overrides.insert(uid.clone(), style.clone());
        Ok(())
    }

    fn reset_feature_style(&mut self, uid: &FeatureUid) -> Result<(), LayerError> {
        if self.rejecting.contains(uid) {
            return Err(LayerError::Rejected {
                uid: uid.clone(),
                reason: "rejected by test layer".to_string(),
            });
        }
        self.resets += 1;
        self.overrides.remove(uid);
        Ok(())
    }

    fn kind_of(&self, uid: &FeatureUid) -> Option<FeatureKind> {
        self.kinds.get(uid).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::RecordingLayer;
    use crate::layer::FeatureLayer;
    use crate::symbology::FeatureStyle;
    use foundation::{FeatureKind, FeatureUid};

    #[test]
    fn reset_of_unknown_uid_is_a_noop() {
        let mut layer = RecordingLayer::new();
        assert!(layer.reset_feature_style(&FeatureUid::new("gone")).is_ok());
        assert_eq!(layer.override_count(), 0);
    }

    #[test]
    fn records_latest_override_and_kind() {
        let mut layer = RecordingLayer::new().with_feature("r1", FeatureKind::River);
        let uid = FeatureUid::new("r1");
        layer
            .set_feature_style(&uid, &FeatureStyle::new().weight(1.0))
            .unwrap();
        layer
            .set_feature_style(&uid, &FeatureStyle::new().weight(2.0))
            .unwrap();
        assert_eq!(layer.style_of(&uid).and_then(|s| s.weight), Some(2.0));
        assert_eq!(layer.kind_of(&uid), Some(FeatureKind::River));
        assert_eq!(layer.write_count(), 2);
    }

    #[test]
    fn rejected_writes_leave_no_override() {
        let mut layer = RecordingLayer::new();
        let uid = FeatureUid::new("bad");
        layer.reject_writes_for(uid.clone());
        assert!(layer.set_feature_style(&uid, &FeatureStyle::new()).is_err());
        assert_eq!(layer.style_of(&uid), None);
    }
}
