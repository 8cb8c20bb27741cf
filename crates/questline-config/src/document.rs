//! The reward configuration document and its pure level math.

use questline_types::Priority;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Base XP awarded per task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct XpByPriority {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

impl XpByPriority {
    /// Base reward for a priority. The MEDIUM value doubles as the fallback
    /// for anything that deserialized to the default priority.
    pub fn base_for(&self, priority: Priority) -> u64 {
        match priority {
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
        }
    }
}

/// Parameters of the early-completion bonus.
///
/// A task completed before its due time earns
/// `floor(base * (1 + early_bonus_per_minute * min(early_minutes, max_early_minutes)))`.
/// Late completion keeps the multiplier at 1 — no penalty is applied. That
/// asymmetry is intentional and must be preserved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnTimeBonus {
    pub weight: f64,
    pub early_bonus_per_minute: f64,
    pub max_early_minutes: i64,
}

/// The singleton reward-rule document.
///
/// Replaced wholesale on admin writes; the persisted row carries the version
/// and updater alongside this value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardConfig {
    pub xp_by_priority: XpByPriority,
    /// Ascending cumulative-point thresholds; index 0 is always 0.
    pub level_thresholds: Vec<i64>,
    /// Daily ceiling on points from HIGH-priority task completions.
    pub daily_high_cap: i64,
    pub on_time_bonus: OnTimeBonus,
}

/// Progress through the current level band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    /// Points earned inside the current band.
    pub current: i64,
    /// Width of the current band.
    pub required: i64,
    /// Floored percentage, capped at 100.
    pub percentage: u8,
}

impl Default for RewardConfig {
    /// The built-in defaults seeded on first read.
    fn default() -> Self {
        Self {
            xp_by_priority: XpByPriority {
                low: 10,
                medium: 25,
                high: 60,
            },
            level_thresholds: vec![0, 200, 500, 900, 1500, 2300, 3300, 4600, 6200, 8200],
            daily_high_cap: 300,
            on_time_bonus: OnTimeBonus {
                weight: 0.4,
                early_bonus_per_minute: 0.0025,
                max_early_minutes: 120,
            },
        }
    }
}

impl RewardConfig {
    /// The four top-level fields every admin write must carry.
    pub const REQUIRED_FIELDS: [&'static str; 4] = [
        "xpByPriority",
        "levelThresholds",
        "dailyHighCap",
        "onTimeBonus",
    ];

    /// Parses and validates an admin-submitted JSON document.
    ///
    /// Checks the four top-level fields by name first so a missing section
    /// produces a targeted error, then deserializes and applies the semantic
    /// checks in [`validate`](Self::validate).
    pub fn from_document(doc: &serde_json::Value) -> Result<Self, ConfigError> {
        let map = doc.as_object().ok_or_else(|| ConfigError::Validation {
            reason: "configuration document must be a JSON object".to_string(),
        })?;

        for field in Self::REQUIRED_FIELDS {
            if !map.contains_key(field) {
                return Err(ConfigError::Validation {
                    reason: format!("missing required field `{field}`"),
                });
            }
        }

        let config: RewardConfig =
            serde_json::from_value(doc.clone()).map_err(|e| ConfigError::Validation {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic validation: thresholds ascend from 0, the cap is positive,
    /// and the bonus parameters are non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = &self.level_thresholds;
        if thresholds.is_empty() {
            return Err(ConfigError::Validation {
                reason: "levelThresholds must not be empty".to_string(),
            });
        }
        if thresholds[0] != 0 {
            return Err(ConfigError::Validation {
                reason: "levelThresholds must start at 0".to_string(),
            });
        }
        if thresholds.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(ConfigError::Validation {
                reason: "levelThresholds must be non-decreasing".to_string(),
            });
        }
        if self.daily_high_cap <= 0 {
            return Err(ConfigError::Validation {
                reason: "dailyHighCap must be positive".to_string(),
            });
        }
        let bonus = &self.on_time_bonus;
        if bonus.weight < 0.0 || bonus.early_bonus_per_minute < 0.0 || bonus.max_early_minutes < 0
        {
            return Err(ConfigError::Validation {
                reason: "onTimeBonus parameters must be non-negative".to_string(),
            });
        }
        Ok(())
    }

    /// Level for a cumulative point total: one plus the count of thresholds
    /// (beyond the implicit 0 entry) at or below `points`.
    ///
    /// The scan stops at the first threshold above `points`, which keeps the
    /// result deterministic even on a malformed non-monotonic table.
    pub fn level_for(&self, points: i64) -> u32 {
        let mut level = 1u32;
        for (i, threshold) in self.level_thresholds.iter().enumerate().skip(1) {
            if points >= *threshold {
                level = i as u32 + 1;
            } else {
                break;
            }
        }
        level
    }

    /// Progress through the current level band.
    ///
    /// The band runs from the current level's threshold to the next one (or
    /// the last threshold when the user is at the top level, giving a
    /// zero-width band reported as 100%).
    pub fn level_progress(&self, points: i64) -> LevelProgress {
        let thresholds = &self.level_thresholds;
        let level = self.level_for(points) as usize;

        let band_start = thresholds.get(level - 1).copied().unwrap_or(0);
        let band_end = thresholds
            .get(level)
            .or_else(|| thresholds.last())
            .copied()
            .unwrap_or(band_start);

        let required = band_end - band_start;
        let current = points - band_start;
        let percentage = if required > 0 {
            ((current * 100) / required).clamp(0, 100) as u8
        } else {
            100
        };

        LevelProgress {
            current,
            required,
            percentage,
        }
    }
}
