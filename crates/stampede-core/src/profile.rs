//! Staged load profiles: target concurrency over time.

use crate::error::{StampedeError, StampedeResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One ramp window: over `duration`, the actor target moves linearly from the
/// previous stage's target to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Wall-clock length of the stage.
    #[serde(with = "duration_str")]
    pub duration: Duration,

    /// Desired concurrent-actor count at the end of the stage.
    pub target: u32,
}

impl Stage {
    /// Creates a stage.
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

/// Ordered, immutable sequence of stages describing how target concurrency
/// changes over a run. The implicit starting target before the first stage
/// is 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadProfile {
    stages: Vec<Stage>,
}

impl LoadProfile {
    /// Creates a validated profile. Rejects an empty stage list and stages
    /// with a zero duration.
    pub fn new(stages: Vec<Stage>) -> StampedeResult<Self> {
        if stages.is_empty() {
            return Err(StampedeError::invalid_profile("at least one stage is required"));
        }

        for (idx, stage) in stages.iter().enumerate() {
            if stage.duration.is_zero() {
                return Err(StampedeError::invalid_profile(format!(
                    "stage {} has zero duration",
                    idx
                )));
            }
        }

        Ok(Self { stages })
    }

    /// The stages in execution order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Total wall-clock length of the profile.
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// Highest target declared by any stage.
    pub fn max_target(&self) -> u32 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// Get the actor target at a given time offset from run start.
    ///
    /// Within a stage the target moves linearly from the previous stage's
    /// target toward the stage target. After the last stage ends, the final
    /// stage's target is returned.
    pub fn target_at(&self, elapsed: Duration) -> u32 {
        let mut stage_start = Duration::ZERO;
        let mut previous_target = 0u32;

        for stage in &self.stages {
            let stage_end = stage_start + stage.duration;

            if elapsed < stage_end {
                let progress =
                    (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
                let delta = (stage.target as f64 - previous_target as f64) * progress;
                return (previous_target as f64 + delta) as u32;
            }

            previous_target = stage.target;
            stage_start = stage_end;
        }

        previous_target
    }

    /// Get a short description of this profile.
    pub fn description(&self) -> String {
        self.stages
            .iter()
            .map(|s| format!("{} → {}", format_duration(s.duration), s.target))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for LoadProfile {
    /// The burst profile: ramp to 10,000 actors in 10s, hold for 60s,
    /// ramp back down to 0 in 10s.
    fn default() -> Self {
        Self {
            stages: vec![
                Stage::new(Duration::from_secs(10), 10_000),
                Stage::new(Duration::from_secs(60), 10_000),
                Stage::new(Duration::from_secs(10), 0),
            ],
        }
    }
}

/// Parse a human-readable duration string (`"500ms"`, `"10s"`, `"1m"`, `"2h"`).
pub fn parse_duration(input: &str) -> StampedeResult<Duration> {
    let s = input.trim();

    if s.is_empty() {
        return Err(StampedeError::invalid_duration(input, "empty string"));
    }

    let (value_str, multiplier_ms) = if let Some(v) = s.strip_suffix("ms") {
        (v, 1u64)
    } else if let Some(v) = s.strip_suffix('s') {
        (v, 1_000)
    } else if let Some(v) = s.strip_suffix('m') {
        (v, 60_000)
    } else if let Some(v) = s.strip_suffix('h') {
        (v, 3_600_000)
    } else {
        return Err(StampedeError::invalid_duration(
            input,
            "missing unit, expected one of `ms`, `s`, `m`, `h`",
        ));
    };

    let value: u64 = value_str
        .trim()
        .parse()
        .map_err(|_| StampedeError::invalid_duration(input, "not a whole number"))?;

    Ok(Duration::from_millis(value * multiplier_ms))
}

/// Format a duration in the most compact unit that loses no precision.
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();

    if ms == 0 || ms % 1_000 != 0 {
        return format!("{}ms", ms);
    }

    let secs = ms / 1_000;
    if secs % 3_600 == 0 {
        format!("{}h", secs / 3_600)
    } else if secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Serde adapter storing `Duration` as a `"10s"`-style string.
pub mod duration_str {
    use super::{format_duration, parse_duration};
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_profile() -> LoadProfile {
        LoadProfile::new(vec![
            Stage::new(Duration::from_secs(10), 100),
            Stage::new(Duration::from_secs(60), 100),
            Stage::new(Duration::from_secs(10), 0),
        ])
        .unwrap()
    }

    #[test]
    fn test_ramp_up_interpolation() {
        let profile = ramp_profile();

        assert_eq!(profile.target_at(Duration::from_secs(0)), 0);
        assert_eq!(profile.target_at(Duration::from_secs(5)), 50); // Midpoint
        assert_eq!(profile.target_at(Duration::from_secs(10)), 100);
    }

    #[test]
    fn test_sustain_stage_holds_target() {
        let profile = ramp_profile();

        assert_eq!(profile.target_at(Duration::from_secs(20)), 100);
        assert_eq!(profile.target_at(Duration::from_secs(69)), 100);
    }

    #[test]
    fn test_ramp_down_reaches_zero() {
        let profile = ramp_profile();

        assert_eq!(profile.target_at(Duration::from_secs(75)), 50); // Midpoint
        assert_eq!(profile.target_at(Duration::from_secs(80)), 0);
        assert_eq!(profile.target_at(Duration::from_secs(100)), 0); // After profile
    }

    #[test]
    fn test_target_never_exceeds_max() {
        let profile = LoadProfile::default();
        let max = profile.max_target();
        assert_eq!(max, 10_000);

        // Sample the whole timeline at 100ms resolution.
        let total_ms = profile.total_duration().as_millis() as u64;
        for ms in (0..=total_ms).step_by(100) {
            let target = profile.target_at(Duration::from_millis(ms));
            assert!(
                target <= max,
                "target {} exceeds declared max {} at {}ms",
                target,
                max,
                ms
            );
        }
    }

    #[test]
    fn test_default_profile_shape() {
        let profile = LoadProfile::default();

        assert_eq!(profile.stages().len(), 3);
        assert_eq!(profile.total_duration(), Duration::from_secs(80));
        assert_eq!(profile.stages()[0].target, 10_000);
        assert_eq!(profile.stages()[2].target, 0);
        assert_eq!(profile.description(), "10s → 10000, 1m → 10000, 10s → 0");
    }

    #[test]
    fn test_rejects_invalid_profiles() {
        assert!(LoadProfile::new(vec![]).is_err());
        assert!(LoadProfile::new(vec![Stage::new(Duration::ZERO, 10)]).is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7_200));

        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("tens").is_err());
    }

    #[test]
    fn test_format_duration_round_trip() {
        for input in ["250ms", "10s", "90s", "1m", "2h"] {
            let parsed = parse_duration(input).unwrap();
            assert_eq!(format_duration(parsed), input);
        }
    }

    #[test]
    fn test_stage_serde_uses_duration_strings() {
        let stage = Stage::new(Duration::from_secs(10), 10_000);
        let json = serde_json::to_string(&stage).unwrap();
        assert_eq!(json, r#"{"duration":"10s","target":10000}"#);

        let parsed: Stage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, stage);
    }
}
