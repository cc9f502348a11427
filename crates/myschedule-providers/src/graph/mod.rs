//! Microsoft Graph calendar provider.
//!
//! [`GraphProvider`] reads the signed-in user's calendar through the
//! Microsoft Graph `calendarView` endpoint.
//!
//! # Authentication Flow
//!
//! 1. The user registers an app in Azure and configures its client ID
//! 2. `logon` binds a loopback listener and opens the browser on the
//!    tenant's authorization page with a PKCE challenge
//! 3. The redirect brings the authorization code back to the listener
//! 4. The code is exchanged for an access token and a refresh token
//! 5. Tokens are persisted; later runs refresh the access token silently
//!
//! # Example
//!
//! ```ignore
//! use myschedule_providers::graph::{GraphConfig, GraphProvider, OAuthCredentials};
//!
//! let config = GraphConfig::new(OAuthCredentials::public(client_id));
//! let provider = GraphProvider::new(config)?;
//!
//! if !provider.is_authenticated() {
//!     provider.authenticate().await?;
//! }
//!
//! let events = provider.fetch_day(FetchDay::new(date, &Local)?).await?;
//! ```

mod client;
mod config;
mod oauth;
mod provider;
mod tokens;

pub use client::{EVENT_FIELDS, GraphClient, UserProfile};
pub use config::{GraphConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow, RefreshedToken};
pub use provider::GraphProvider;
pub use tokens::{TokenInfo, TokenStorage};
