use foundation::{FeatureKind, FeatureUid};

use crate::symbology::FeatureStyle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
    /// The layer is no longer attached to a map.
    Detached,
    Rejected { uid: FeatureUid, reason: String },
}

impl std::fmt::Display for LayerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerError::Detached => write!(f, "feature layer is detached"),
            LayerError::Rejected { uid, reason } => {
                write!(f, "style for feature {uid} rejected: {reason}")
            }
        }
    }
}

impl std::error::Error for LayerError {}

/// Tiled vector source holding the rendered features.
///
/// Both style operations must treat a uid that is not currently rendered as
/// a no-op and return `Ok(())`.
pub trait FeatureLayer {
    /// Overrides the tile default style of `uid`.
    fn set_feature_style(&mut self, uid: &FeatureUid, style: &FeatureStyle)
    -> Result<(), LayerError>;

    /// Drops any override so `uid` renders with the tile default style.
    fn reset_feature_style(&mut self, uid: &FeatureUid) -> Result<(), LayerError>;

    /// Kind of a rendered feature, when the layer knows it.
    ///
    /// Trace payloads carry bare uids, so this is how trace members get
    /// kind-specific styling.
    fn kind_of(&self, _uid: &FeatureUid) -> Option<FeatureKind> {
        None
    }
}
