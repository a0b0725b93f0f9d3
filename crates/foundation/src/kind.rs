use std::fmt;

/// Geometry family of a water feature.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureKind {
    River,
    Lake,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 2] = [FeatureKind::River, FeatureKind::Lake];

    /// Tile features flag lakes with an `islake` property; everything else is a river.
    pub fn from_is_lake(is_lake: bool) -> Self {
        if is_lake {
            FeatureKind::Lake
        } else {
            FeatureKind::River
        }
    }

    /// Collection name used by the collections API.
    pub fn collection(self) -> &'static str {
        match self {
            FeatureKind::River => "rivers",
            FeatureKind::Lake => "lakes",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::River => f.write_str("river"),
            FeatureKind::Lake => f.write_str("lake"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FeatureKind;

    #[test]
    fn is_lake_flag_selects_kind() {
        assert_eq!(FeatureKind::from_is_lake(true), FeatureKind::Lake);
        assert_eq!(FeatureKind::from_is_lake(false), FeatureKind::River);
        assert_eq!(FeatureKind::Lake.collection(), "lakes");
        assert_eq!(FeatureKind::River.collection(), "rivers");
    }
}
