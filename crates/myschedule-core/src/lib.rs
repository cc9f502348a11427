//! Core types: canonical events, schedule rules, time conversion, rendering

pub mod event;
pub mod format;
pub mod rules;
pub mod time;
pub mod tracing;

pub use event::{CanonicalEvent, Participants, Tag};
pub use format::{MINUTES_TAG, render_day, render_event};
pub use rules::{MalformedPolicy, RulesError, ScheduleRules};
pub use time::{ScheduleDay, TimeError, TimeWindow, localize, parse_wall_clock, parse_zone};
pub use tracing::{LogFormat, TracingConfig, TracingError, init_tracing};
