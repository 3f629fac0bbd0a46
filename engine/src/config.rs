//! Match configuration and partial-update patches

use serde::{Deserialize, Serialize};

use crate::state::Zone;

/// Point value awarded per scoring zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZonePoints {
    pub body: u32,
    pub head: u32,
    pub tech: u32,
}

impl ZonePoints {
    pub fn get(&self, zone: Zone) -> u32 {
        match zone {
            Zone::Body => self.body,
            Zone::Head => self.head,
            Zone::Tech => self.tech,
        }
    }
}

impl Default for ZonePoints {
    fn default() -> Self {
        Self {
            body: 2,
            head: 3,
            tech: 1,
        }
    }
}

/// Rules of the match, editable by the operator between (and during) rounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchConfig {
    /// Number of regular rounds
    pub rounds: u32,
    /// Round length in seconds
    pub round_duration: u32,
    /// Play a sudden-death round when the final round ends level
    pub golden_point: bool,
    /// Require agreement from several judges before a score counts
    pub consensus_enabled: bool,
    /// Window in milliseconds within which agreeing votes must arrive
    pub consensus_window: u64,
    /// Distinct judges that must agree
    pub consensus_min_judges: u32,
    pub points: ZonePoints,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            rounds: 3,
            round_duration: 120,
            golden_point: true,
            consensus_enabled: true,
            consensus_window: 1000,
            consensus_min_judges: 2,
            points: ZonePoints::default(),
        }
    }
}

impl MatchConfig {
    /// Merge a partial update. Zone points merge key by key; every other
    /// field present in the patch overwrites.
    pub fn apply(&mut self, patch: &ConfigPatch) {
        if let Some(rounds) = patch.rounds {
            self.rounds = rounds;
        }
        if let Some(duration) = patch.round_duration {
            self.round_duration = duration;
        }
        if let Some(golden) = patch.golden_point {
            self.golden_point = golden;
        }
        if let Some(enabled) = patch.consensus_enabled {
            self.consensus_enabled = enabled;
        }
        if let Some(window) = patch.consensus_window {
            self.consensus_window = window;
        }
        if let Some(min) = patch.consensus_min_judges {
            self.consensus_min_judges = min;
        }
        if let Some(points) = &patch.points {
            if let Some(body) = points.body {
                self.points.body = body;
            }
            if let Some(head) = points.head {
                self.points.head = head;
            }
            if let Some(tech) = points.tech {
                self.points.tech = tech;
            }
        }
    }

    /// Consensus window as a chrono duration
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.consensus_window).unwrap_or(i64::MAX))
    }

    /// Names of fields holding values that make the match unplayable.
    ///
    /// They are still accepted; callers use this for diagnostics only.
    pub fn degenerate_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.rounds == 0 {
            fields.push("rounds");
        }
        if self.round_duration == 0 {
            fields.push("roundDuration");
        }
        if self.consensus_window == 0 {
            fields.push("consensusWindow");
        }
        if self.consensus_min_judges == 0 {
            fields.push("consensusMinJudges");
        }
        fields
    }
}

/// Partial zone-point override
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZonePointsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech: Option<u32>,
}

/// Partial configuration update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub golden_point: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consensus_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consensus_window: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consensus_min_judges: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<ZonePointsPatch>,
}

impl ConfigPatch {
    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Patch that sets every field to the value in `config`
    fn full_patch(config: &MatchConfig) -> ConfigPatch {
        ConfigPatch {
            rounds: Some(config.rounds),
            round_duration: Some(config.round_duration),
            golden_point: Some(config.golden_point),
            consensus_enabled: Some(config.consensus_enabled),
            consensus_window: Some(config.consensus_window),
            consensus_min_judges: Some(config.consensus_min_judges),
            points: Some(ZonePointsPatch {
                body: Some(config.points.body),
                head: Some(config.points.head),
                tech: Some(config.points.tech),
            }),
        }
    }

    #[test]
    fn test_defaults() {
        let config = MatchConfig::default();
        assert_eq!(config.rounds, 3);
        assert_eq!(config.round_duration, 120);
        assert!(config.golden_point);
        assert!(config.consensus_enabled);
        assert_eq!(config.consensus_window, 1000);
        assert_eq!(config.consensus_min_judges, 2);
        assert_eq!(config.points.get(Zone::Head), 3);
        assert!(config.degenerate_fields().is_empty());
    }

    #[test]
    fn test_points_merge_key_by_key() {
        let mut config = MatchConfig::default();
        let patch: ConfigPatch = serde_json::from_str(r#"{"points":{"head":5}}"#).unwrap();
        config.apply(&patch);

        assert_eq!(config.points.head, 5);
        assert_eq!(config.points.body, 2);
        assert_eq!(config.points.tech, 1);
        assert_eq!(config.rounds, 3);
    }

    #[test]
    fn test_top_level_fields_overwrite() {
        let mut config = MatchConfig::default();
        config.apply(&ConfigPatch {
            rounds: Some(1),
            golden_point: Some(false),
            consensus_window: Some(500),
            ..Default::default()
        });

        assert_eq!(config.rounds, 1);
        assert!(!config.golden_point);
        assert_eq!(config.window(), chrono::Duration::milliseconds(500));
        assert_eq!(config.round_duration, 120);
    }

    #[test]
    fn test_negative_values_rejected_at_decode() {
        let parsed = serde_json::from_str::<ConfigPatch>(r#"{"rounds":-1}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_zero_values_accepted_but_flagged() {
        let mut config = MatchConfig::default();
        config.apply(&ConfigPatch {
            round_duration: Some(0),
            consensus_min_judges: Some(0),
            ..Default::default()
        });
        assert_eq!(config.round_duration, 0);
        assert_eq!(
            config.degenerate_fields(),
            vec!["roundDuration", "consensusMinJudges"]
        );
    }

    #[test]
    fn test_full_patch_roundtrip_reproduces_config() {
        let source = MatchConfig {
            rounds: 2,
            points: ZonePoints {
                body: 1,
                head: 4,
                tech: 2,
            },
            ..Default::default()
        };
        let mut target = MatchConfig::default();
        target.apply(&full_patch(&source));
        assert_eq!(target, source);
        assert!(ConfigPatch::default().is_empty());
    }
}
