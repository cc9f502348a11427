//! Calendar fetching and normalization.
//!
//! This crate turns what a calendar service returns into the events the
//! schedule shows:
//!
//! - [`CalendarProvider`] - The trait every calendar backend implements
//! - [`RawEvent`] - An event exactly as fetched
//! - [`normalize_events`] / [`sort_events`] - RawEvent to CanonicalEvent
//! - [`ProviderError`] / [`FormatError`] - What can go wrong on the way
//!
//! # Architecture
//!
//! ```text
//!    Microsoft Graph
//!          │
//!          ▼
//!   ┌───────────────┐
//!   │ GraphProvider │  CalendarProvider::fetch_day()
//!   └───────┬───────┘
//!           ▼
//!     Vec<RawEvent>
//!           │  normalize_events()  (noise, all-day, zones, participants)
//!           ▼
//!   Vec<CanonicalEvent>
//!           │  sort_events()
//!           ▼
//!   myschedule_core::render_day()
//! ```

pub mod error;
#[cfg(feature = "graph")]
pub mod graph;
pub mod normalize;
pub mod provider;
pub mod raw_event;

pub use error::{FormatError, ProviderError, ProviderErrorCode, ProviderResult};
pub use normalize::{normalize_event, normalize_events, sort_events};
pub use provider::{BoxFuture, CalendarProvider, ErrorProvider, FetchDay, StaticProvider};
pub use raw_event::{RawDateTimeZone, RawEmailAddress, RawEvent, RawLocation, RawRecipient};
