use foundation::FeatureKind;
use serde::Serialize;

/// Visual intent for one feature.
///
/// Variants are declared in ascending precedence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Classification {
    Idle,
    Hovered,
    DownstreamMember,
    UpstreamMember,
    Clicked,
}

/// Every classification that currently applies to one uid.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Membership {
    pub hovered: bool,
    pub clicked: bool,
    pub upstream: bool,
    pub downstream: bool,
}

impl Membership {
    /// Picks the classification that renders:
    /// clicked > trace member > hovered > idle.
    pub fn effective(self) -> Classification {
        if self.clicked {
            Classification::Clicked
        } else if self.upstream {
            Classification::UpstreamMember
        } else if self.downstream {
            Classification::DownstreamMember
        } else if self.hovered {
            Classification::Hovered
        } else {
            Classification::Idle
        }
    }
}

/// Partial style override, serialized with the renderer's option names.
///
/// Unset fields keep the tile default.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f32>,
}

impl FeatureStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weight(mut self, weight: f32) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    /// Enables polygon fill with the given color and opacity.
    pub fn filled(mut self, fill_color: Option<&str>, fill_opacity: f32) -> Self {
        self.fill = Some(true);
        self.fill_color = fill_color.map(str::to_string);
        self.fill_opacity = Some(fill_opacity);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KindStyles {
    pub river: FeatureStyle,
    pub lake: FeatureStyle,
}

impl KindStyles {
    pub fn get(&self, kind: FeatureKind) -> &FeatureStyle {
        match kind {
            FeatureKind::River => &self.river,
            FeatureKind::Lake => &self.lake,
        }
    }
}

/// `(kind, classification) -> style` lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleTable {
    pub hovered: KindStyles,
    pub clicked: KindStyles,
    pub upstream: KindStyles,
    pub downstream: KindStyles,
}

impl StyleTable {
    /// `None` means idle: no override, the tile default applies.
    pub fn resolve(
        &self,
        kind: FeatureKind,
        classification: Classification,
    ) -> Option<&FeatureStyle> {
        let styles = match classification {
            Classification::Idle => return None,
            Classification::Hovered => &self.hovered,
            Classification::UpstreamMember => &self.upstream,
            Classification::DownstreamMember => &self.downstream,
            Classification::Clicked => &self.clicked,
        };
        Some(styles.get(kind))
    }
}

impl Default for StyleTable {
    fn default() -> Self {
        Self {
            hovered: KindStyles {
                river: FeatureStyle::new().weight(6.0).opacity(1.0),
                lake: FeatureStyle::new().weight(6.0).filled(None, 0.7),
            },
            clicked: KindStyles {
                river: FeatureStyle::new().weight(4.0).color("red").opacity(1.0),
                lake: FeatureStyle::new()
                    .weight(4.0)
                    .color("red")
                    .filled(Some("red"), 0.7),
            },
            upstream: KindStyles {
                river: FeatureStyle::new().weight(3.0).color("#ff8c00").opacity(1.0),
                lake: FeatureStyle::new()
                    .weight(3.0)
                    .color("#ff8c00")
                    .filled(Some("#ff8c00"), 0.5),
            },
            downstream: KindStyles {
                river: FeatureStyle::new().weight(3.0).color("#8e44ad").opacity(1.0),
                lake: FeatureStyle::new()
                    .weight(3.0)
                    .color("#8e44ad")
                    .filled(Some("#8e44ad"), 0.5),
            },
        }
    }
}
