//! Tunables of a conversation session.

use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};

/// Timing, retry and model settings shared by every session of a runtime.
///
/// ```
/// use std::time::Duration;
/// use parley::config::SessionSettings;
///
/// let settings = SessionSettings::builder()
///     .poll_interval(Duration::from_secs(1))
///     .retry_budget(2)
///     .build();
/// assert_eq!(settings.max_delegation_depth, 8);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct SessionSettings {
    /// Wait between two status polls of a pending run.
    #[builder(default = Duration::from_secs(5))]
    pub poll_interval: Duration,
    /// Wait before re-running after a failed or expired run.
    #[builder(default = Duration::from_secs(5))]
    pub retry_backoff: Duration,
    /// Failed/expired runs tolerated per turn before giving up.
    #[builder(default = 5)]
    pub retry_budget: u32,
    /// Nested SendMessage sessions allowed below a root turn.
    #[builder(default = 8)]
    pub max_delegation_depth: u32,
    #[builder(default = "gpt-4o-mini".to_string(), into)]
    pub classifier_model: String,
    #[builder(default = "gpt-4o".to_string(), into)]
    pub summarizer_model: String,
    /// Delete the remote thread of one-off contexts once their turn ends.
    #[builder(default)]
    pub delete_discarded_contexts: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The `[session]` table of a config file. Durations are milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SettingsFile {
    pub poll_interval_ms: Option<u64>,
    pub retry_backoff_ms: Option<u64>,
    pub retry_budget: Option<u32>,
    pub max_delegation_depth: Option<u32>,
    pub classifier_model: Option<String>,
    pub summarizer_model: Option<String>,
    pub delete_discarded_contexts: Option<bool>,
}

impl SettingsFile {
    /// Overlay the values present in `self` onto `settings`.
    pub fn apply(self, settings: &mut SessionSettings) {
        if let Some(ms) = self.poll_interval_ms {
            settings.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.retry_backoff_ms {
            settings.retry_backoff = Duration::from_millis(ms);
        }
        if let Some(budget) = self.retry_budget {
            settings.retry_budget = budget;
        }
        if let Some(depth) = self.max_delegation_depth {
            settings.max_delegation_depth = depth;
        }
        if let Some(model) = self.classifier_model {
            settings.classifier_model = model;
        }
        if let Some(model) = self.summarizer_model {
            settings.summarizer_model = model;
        }
        if let Some(delete) = self.delete_discarded_contexts {
            settings.delete_discarded_contexts = delete;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_run_driver_constants() {
        let settings = SessionSettings::default();
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.retry_backoff, Duration::from_secs(5));
        assert_eq!(settings.retry_budget, 5);
        assert!(!settings.delete_discarded_contexts);
    }

    #[test]
    fn file_values_override_only_present_fields() {
        let mut settings = SessionSettings::default();
        SettingsFile {
            retry_budget: Some(1),
            summarizer_model: Some("gpt-4.1".into()),
            ..Default::default()
        }
        .apply(&mut settings);
        assert_eq!(settings.retry_budget, 1);
        assert_eq!(settings.summarizer_model, "gpt-4.1");
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
    }
}
