use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum percentage for passing a weekly or final evaluation.
pub const PASS_THRESHOLD_PERCENT: u8 = 70;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("pass threshold must be between 1 and 100, got {0}")]
    InvalidPassThreshold(u8),

    #[error("flush interval must be at least one tick")]
    InvalidFlushInterval,

    #[error("tick interval must be > 0 ms")]
    InvalidTickInterval,

    #[error("weekly evaluation time limit must be > 0 minutes")]
    InvalidEvaluationTimeLimit,
}

/// When a lesson's successor becomes reachable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockPolicy {
    /// The next lesson unlocks once this one is completed.
    #[default]
    OnCompletion,
    /// The next lesson unlocks as soon as this one is entered.
    OnEntry,
}

/// Tunables for one course week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSettings {
    unlock_policy: UnlockPolicy,
    pass_threshold_percent: u8,
    require_evaluation: bool,
    inline_quiz_bonus: u32,
    weekly_evaluation_bonus: u32,
    weekly_evaluation_minutes: u32,
    flush_every_ticks: u32,
    tick_interval_ms: u64,
    notes_debounce_ms: u64,
}

/// Unvalidated settings as they appear in a content document.
///
/// Every field is optional; missing fields take the defaults of
/// [`CourseSettings::default`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSettingsDraft {
    pub unlock_policy: Option<UnlockPolicy>,
    pub pass_threshold_percent: Option<u8>,
    pub require_evaluation: Option<bool>,
    pub inline_quiz_bonus: Option<u32>,
    pub weekly_evaluation_bonus: Option<u32>,
    pub weekly_evaluation_minutes: Option<u32>,
    pub flush_every_ticks: Option<u32>,
    pub tick_interval_ms: Option<u64>,
    pub notes_debounce_ms: Option<u64>,
}

impl CourseSettingsDraft {
    /// Validate the draft, filling gaps with defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` when a provided value is out of range.
    pub fn validate(self) -> Result<CourseSettings, SettingsError> {
        let defaults = CourseSettings::default();
        let settings = CourseSettings {
            unlock_policy: self.unlock_policy.unwrap_or(defaults.unlock_policy),
            pass_threshold_percent: self
                .pass_threshold_percent
                .unwrap_or(defaults.pass_threshold_percent),
            require_evaluation: self.require_evaluation.unwrap_or(defaults.require_evaluation),
            inline_quiz_bonus: self.inline_quiz_bonus.unwrap_or(defaults.inline_quiz_bonus),
            weekly_evaluation_bonus: self
                .weekly_evaluation_bonus
                .unwrap_or(defaults.weekly_evaluation_bonus),
            weekly_evaluation_minutes: self
                .weekly_evaluation_minutes
                .unwrap_or(defaults.weekly_evaluation_minutes),
            flush_every_ticks: self.flush_every_ticks.unwrap_or(defaults.flush_every_ticks),
            tick_interval_ms: self.tick_interval_ms.unwrap_or(defaults.tick_interval_ms),
            notes_debounce_ms: self.notes_debounce_ms.unwrap_or(defaults.notes_debounce_ms),
        };
        settings.check()?;
        Ok(settings)
    }
}

impl Default for CourseSettings {
    fn default() -> Self {
        Self {
            unlock_policy: UnlockPolicy::OnCompletion,
            pass_threshold_percent: PASS_THRESHOLD_PERCENT,
            require_evaluation: false,
            inline_quiz_bonus: 25,
            weekly_evaluation_bonus: 200,
            weekly_evaluation_minutes: 45,
            flush_every_ticks: 60,
            tick_interval_ms: 1_000,
            notes_debounce_ms: 1_000,
        }
    }
}

impl CourseSettings {
    fn check(&self) -> Result<(), SettingsError> {
        if !(1..=100).contains(&self.pass_threshold_percent) {
            return Err(SettingsError::InvalidPassThreshold(
                self.pass_threshold_percent,
            ));
        }
        if self.flush_every_ticks == 0 {
            return Err(SettingsError::InvalidFlushInterval);
        }
        if self.tick_interval_ms == 0 {
            return Err(SettingsError::InvalidTickInterval);
        }
        if self.weekly_evaluation_minutes == 0 {
            return Err(SettingsError::InvalidEvaluationTimeLimit);
        }
        Ok(())
    }

    #[must_use]
    pub fn with_unlock_policy(mut self, policy: UnlockPolicy) -> Self {
        self.unlock_policy = policy;
        self
    }

    #[must_use]
    pub fn with_require_evaluation(mut self, require: bool) -> Self {
        self.require_evaluation = require;
        self
    }

    #[must_use]
    pub fn unlock_policy(&self) -> UnlockPolicy {
        self.unlock_policy
    }

    #[must_use]
    pub fn pass_threshold_percent(&self) -> u8 {
        self.pass_threshold_percent
    }

    #[must_use]
    pub fn require_evaluation(&self) -> bool {
        self.require_evaluation
    }

    #[must_use]
    pub fn inline_quiz_bonus(&self) -> u32 {
        self.inline_quiz_bonus
    }

    #[must_use]
    pub fn weekly_evaluation_bonus(&self) -> u32 {
        self.weekly_evaluation_bonus
    }

    #[must_use]
    pub fn weekly_evaluation_limit(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.weekly_evaluation_minutes))
    }

    #[must_use]
    pub fn flush_every_ticks(&self) -> u32 {
        self.flush_every_ticks
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    #[must_use]
    pub fn notes_debounce(&self) -> Duration {
        Duration::from_millis(self.notes_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_yields_defaults() {
        let settings = CourseSettingsDraft::default().validate().unwrap();
        assert_eq!(settings, CourseSettings::default());
        assert_eq!(settings.pass_threshold_percent(), 70);
        assert_eq!(settings.unlock_policy(), UnlockPolicy::OnCompletion);
        assert_eq!(settings.tick_interval(), Duration::from_secs(1));
        assert_eq!(settings.weekly_evaluation_limit(), chrono::Duration::minutes(45));
    }

    #[test]
    fn draft_parses_from_camel_case() {
        let draft: CourseSettingsDraft =
            serde_json::from_str(r#"{ "unlockPolicy": "on_entry", "requireEvaluation": true }"#)
                .unwrap();
        let settings = draft.validate().unwrap();
        assert_eq!(settings.unlock_policy(), UnlockPolicy::OnEntry);
        assert!(settings.require_evaluation());
        assert_eq!(settings.flush_every_ticks(), 60);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let draft = CourseSettingsDraft {
            pass_threshold_percent: Some(0),
            ..CourseSettingsDraft::default()
        };
        assert_eq!(
            draft.validate().unwrap_err(),
            SettingsError::InvalidPassThreshold(0)
        );

        let draft = CourseSettingsDraft {
            flush_every_ticks: Some(0),
            ..CourseSettingsDraft::default()
        };
        assert_eq!(draft.validate().unwrap_err(), SettingsError::InvalidFlushInterval);
    }
}
