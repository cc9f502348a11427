//! Schedule rules: who the viewer is and which events are noise.
//!
//! [`ScheduleRules`] is an immutable value handed to the normalizer. Nothing
//! in the pipeline reads process-wide settings, so tests can run with any
//! identity or threshold.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from validating [`ScheduleRules`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RulesError {
    /// No viewer address is set, so the viewer would show up as a participant.
    #[error("self_email must not be empty")]
    MissingSelfEmail,

    /// A zero threshold would treat every event as a broadcast.
    #[error("broadcast_threshold must be greater than zero")]
    ZeroBroadcastThreshold,
}

/// What to do when a single fetched record cannot be normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Log the record and keep going with the rest of the day.
    #[default]
    Skip,
    /// Fail the whole run on the first malformed record.
    Abort,
}

/// Configuration constants for normalizing one day of events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleRules {
    /// The viewer's own address. Never produces a participant tag.
    pub self_email: String,

    /// Subjects whose events are dropped entirely.
    pub noise_subjects: Vec<String>,

    /// Attendee count at which individual attendees are no longer listed.
    pub broadcast_threshold: usize,

    /// Display-name prefix identifying distribution-list pseudo-attendees.
    pub distribution_list_prefix: String,

    /// Handling for records that cannot be normalized.
    pub on_malformed: MalformedPolicy,
}

impl Default for ScheduleRules {
    fn default() -> Self {
        Self {
            self_email: String::new(),
            noise_subjects: Self::DEFAULT_NOISE_SUBJECTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            broadcast_threshold: Self::DEFAULT_BROADCAST_THRESHOLD,
            distribution_list_prefix: Self::DEFAULT_DISTRIBUTION_LIST_PREFIX.to_string(),
            on_malformed: MalformedPolicy::default(),
        }
    }
}

impl ScheduleRules {
    /// Blocked-out calendar slots that are not meetings.
    pub const DEFAULT_NOISE_SUBJECTS: &'static [&'static str] =
        &["Fokuszeit", "Block", "Mittagessen", "Date Night"];

    /// More attendees than this is a broadcast.
    pub const DEFAULT_BROADCAST_THRESHOLD: usize = 20;

    pub const DEFAULT_DISTRIBUTION_LIST_PREFIX: &'static str = "DL ";

    /// Creates default rules for the given viewer address.
    pub fn new(self_email: impl Into<String>) -> Self {
        Self {
            self_email: self_email.into(),
            ..Self::default()
        }
    }

    /// Sets the viewer address.
    #[must_use]
    pub fn with_self_email(mut self, email: impl Into<String>) -> Self {
        self.self_email = email.into();
        self
    }

    /// Replaces the noise subject list.
    #[must_use]
    pub fn with_noise_subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.noise_subjects = subjects.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_broadcast_threshold(mut self, threshold: usize) -> Self {
        self.broadcast_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_distribution_list_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.distribution_list_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_on_malformed(mut self, policy: MalformedPolicy) -> Self {
        self.on_malformed = policy;
        self
    }

    /// Returns true if events with this subject are suppressed.
    ///
    /// Matching is exact and case-sensitive.
    pub fn is_noise(&self, subject: &str) -> bool {
        self.noise_subjects.iter().any(|s| s == subject)
    }

    /// Returns true if `email` is the viewer's own address.
    pub fn is_self(&self, email: &str) -> bool {
        !self.self_email.is_empty() && email.eq_ignore_ascii_case(&self.self_email)
    }

    /// Returns true if this many attendees makes an event a broadcast.
    pub fn is_broadcast(&self, attendee_count: usize) -> bool {
        attendee_count >= self.broadcast_threshold
    }

    /// Returns true if the display name belongs to a distribution list.
    pub fn is_distribution_list(&self, display_name: &str) -> bool {
        !self.distribution_list_prefix.is_empty()
            && display_name.starts_with(&self.distribution_list_prefix)
    }

    /// Checks that the rules can be used for normalization.
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.broadcast_threshold == 0 {
            return Err(RulesError::ZeroBroadcastThreshold);
        }
        if self.self_email.trim().is_empty() {
            return Err(RulesError::MissingSelfEmail);
        }
        Ok(())
    }
}
