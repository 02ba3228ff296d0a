//! The activity-type table: points and impact weights per activity type.
//!
//! Points feed the engagement index and may be overridden per course. Impact
//! feeds trending scores and comes only from the built-in table. The table is
//! built once at startup and handed to consumers explicitly; nothing here is
//! global or mutable.

use std::collections::BTreeMap;

use log::debug;

/// Points and impact for a single activity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActivityTypeConfig {
    /// Engagement points awarded for the activity.
    pub points: i64,
    /// Trending impact of the activity, if it has any.
    pub impact: Option<i64>,
    /// Disabled activity types award no points.
    pub enabled: bool,
}

impl ActivityTypeConfig {
    /// An enabled activity type that awards points but has no impact.
    pub const fn points(points: i64) -> Self {
        Self {
            points,
            impact: None,
            enabled: true,
        }
    }

    /// Attach an impact weight.
    #[must_use]
    pub const fn with_impact(mut self, impact: i64) -> Self {
        self.impact = Some(impact);
        self
    }
}

/// A per-course adjustment of the activity-type table.
///
/// Only `points` and `enabled` can be overridden. Impact cannot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActivityTypeOverride {
    /// Activity type key the override applies to.
    pub activity_type: String,
    /// Replacement point value.
    pub points: Option<i64>,
    /// Replacement enabled flag.
    pub enabled: Option<bool>,
}

impl ActivityTypeOverride {
    /// Override the points of an activity type.
    pub fn points(activity_type: impl Into<String>, points: i64) -> Self {
        Self {
            activity_type: activity_type.into(),
            points: Some(points),
            enabled: None,
        }
    }

    /// Enable or disable an activity type.
    pub fn enabled(activity_type: impl Into<String>, enabled: bool) -> Self {
        Self {
            activity_type: activity_type.into(),
            points: None,
            enabled: Some(enabled),
        }
    }
}

const BUILT_IN: [(&str, ActivityTypeConfig); 16] = [
    ("add_asset", ActivityTypeConfig::points(5)),
    ("add_discussion_topic", ActivityTypeConfig::points(5)),
    ("add_discussion_entry", ActivityTypeConfig::points(3)),
    ("comment", ActivityTypeConfig::points(3).with_impact(6)),
    ("get_comment", ActivityTypeConfig::points(1)),
    ("get_comment_reply", ActivityTypeConfig::points(1)),
    ("like", ActivityTypeConfig::points(1).with_impact(3)),
    ("get_like", ActivityTypeConfig::points(1)),
    ("dislike", ActivityTypeConfig::points(-1)),
    ("get_dislike", ActivityTypeConfig::points(-1)),
    ("view_asset", ActivityTypeConfig::points(0)),
    ("get_view_asset", ActivityTypeConfig::points(0)),
    ("pin_asset", ActivityTypeConfig::points(0).with_impact(3)),
    ("get_pin_asset", ActivityTypeConfig::points(0)),
    ("export_whiteboard", ActivityTypeConfig::points(10)),
    ("remix_whiteboard", ActivityTypeConfig::points(0).with_impact(5)),
];

/// Immutable lookup from activity type to its configuration.
///
/// # Examples
///
/// ```
/// use suitec_core::ActivityConfiguration;
///
/// let table = ActivityConfiguration::builtin();
/// assert_eq!(table.impact("like"), Some(3));
/// assert_eq!(table.impact("view_asset"), None);
/// assert_eq!(table.impact("no_such_type"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityConfiguration {
    types: BTreeMap<String, ActivityTypeConfig>,
}

impl ActivityConfiguration {
    /// The table shipped with the application.
    pub fn builtin() -> Self {
        Self::from_entries(
            BUILT_IN
                .iter()
                .map(|(name, config)| ((*name).to_owned(), *config)),
        )
    }

    /// Build a table from explicit entries. Later duplicates win.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, ActivityTypeConfig)>,
        S: Into<String>,
    {
        Self {
            types: entries
                .into_iter()
                .map(|(name, config)| (name.into(), config))
                .collect(),
        }
    }

    /// Configuration of an activity type, if it is known.
    pub fn get(&self, activity_type: &str) -> Option<&ActivityTypeConfig> {
        self.types.get(activity_type)
    }

    /// Impact of an activity type.
    ///
    /// Unknown types, types without an impact, and types with a zero impact
    /// all return `None`: none of them contributes to a trending score.
    pub fn impact(&self, activity_type: &str) -> Option<i64> {
        self.get(activity_type)
            .and_then(|config| config.impact)
            .filter(|impact| *impact != 0)
    }

    /// Points awarded for an activity type. Unknown and disabled types award
    /// nothing.
    pub fn points(&self, activity_type: &str) -> i64 {
        self.get(activity_type)
            .filter(|config| config.enabled)
            .map_or(0, |config| config.points)
    }

    /// Resolve the table for a course by applying its overrides.
    ///
    /// Overrides for unknown types are ignored. Impact weights are carried
    /// over untouched.
    #[must_use]
    pub fn for_course(&self, overrides: &[ActivityTypeOverride]) -> Self {
        let mut types = self.types.clone();
        for entry in overrides {
            let Some(config) = types.get_mut(&entry.activity_type) else {
                debug!(
                    "Ignoring override for unknown activity type {}",
                    entry.activity_type
                );
                continue;
            };
            if let Some(points) = entry.points {
                config.points = points;
            }
            if let Some(enabled) = entry.enabled {
                config.enabled = enabled;
            }
        }
        Self { types }
    }

    /// Iterate over all configured types in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActivityTypeConfig)> {
        self.types.iter().map(|(name, config)| (name.as_str(), config))
    }

    /// Number of configured types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Report whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for ActivityConfiguration {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn table() -> ActivityConfiguration {
        ActivityConfiguration::builtin()
    }

    #[rstest]
    #[case("like", Some(3))]
    #[case("comment", Some(6))]
    #[case("pin_asset", Some(3))]
    #[case("view_asset", None)]
    #[case("get_like", None)]
    #[case("unheard_of", None)]
    fn builtin_impacts(table: ActivityConfiguration, #[case] kind: &str, #[case] expected: Option<i64>) {
        assert_eq!(table.impact(kind), expected);
    }

    #[rstest]
    fn zero_impact_counts_as_none() {
        let table = ActivityConfiguration::from_entries([(
            "nudge",
            ActivityTypeConfig::points(1).with_impact(0),
        )]);
        assert_eq!(table.impact("nudge"), None);
    }

    #[rstest]
    fn overrides_change_points_not_impact(table: ActivityConfiguration) {
        let course = table.for_course(&[ActivityTypeOverride {
            activity_type: "like".into(),
            points: Some(10),
            enabled: Some(true),
        }]);
        assert_eq!(course.points("like"), 10);
        assert_eq!(course.impact("like"), Some(3));
        assert_eq!(table.points("like"), 1, "base table stays untouched");
    }

    #[rstest]
    fn disabled_types_award_no_points(table: ActivityConfiguration) {
        let course = table.for_course(&[ActivityTypeOverride::enabled("add_asset", false)]);
        assert_eq!(course.points("add_asset"), 0);
    }

    #[rstest]
    fn unknown_overrides_are_ignored(table: ActivityConfiguration) {
        let course = table.for_course(&[ActivityTypeOverride::points("made_up", 50)]);
        assert_eq!(course, table);
    }

    #[rstest]
    fn builtin_table_has_every_entry(table: ActivityConfiguration) {
        assert_eq!(table.len(), BUILT_IN.len());
        assert!(!table.is_empty());
    }
}
