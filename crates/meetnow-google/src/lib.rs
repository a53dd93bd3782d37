//! Google OAuth authorization flow and instant-meeting client.
//!
//! This crate drives the OAuth 2.0 authorization-code flow for a local,
//! single-user CLI and exposes the one calendar operation built on top
//! of it: creating an instant meeting with a Meet link.
//!
//! # Flow Overview
//!
//! 1. Try the token cache; a cached token skips the interactive leg
//! 2. Print (and open) the provider consent URL
//! 3. Catch the redirect on a loopback HTTP listener (`GET /auth`)
//! 4. Hand the authorization code to the waiting coordinator over a
//!    single-slot relay
//! 5. Exchange the code for a token, bounded by the approval timeout
//! 6. Persist the token with owner-only permissions
//!
//! # Example
//!
//! ```ignore
//! use meetnow_google::{relay, Authorizer, CallbackServer, CalendarClient, GoogleConfig};
//!
//! let config = GoogleConfig::new(credentials);
//! let (tx, mut rx) = relay();
//!
//! let server = CallbackServer::bind(config.callback_port, tx).await?;
//! let handle = server.spawn();
//!
//! let authorizer = Authorizer::new(config);
//! let token = authorizer.authorize(&mut rx).await?;
//!
//! let calendar = CalendarClient::new(&token.access_token, timeout);
//! let link = calendar.create_instant_meeting("Standup", chrono::Duration::minutes(30)).await?;
//!
//! handle.stop(std::time::Duration::from_secs(5)).await;
//! ```

pub mod authorizer;
pub mod calendar;
pub mod callback;
pub mod config;
pub mod error;
pub mod oauth;
pub mod relay;
pub mod tokens;

#[cfg(test)]
pub(crate) mod testutil;

pub use authorizer::Authorizer;
pub use calendar::CalendarClient;
pub use callback::{CallbackHandle, CallbackServer};
pub use config::{Credentials, GoogleConfig};
pub use error::{AuthError, AuthResult};
pub use oauth::OAuthClient;
pub use relay::{CodeReceiver, CodeSender, relay};
pub use tokens::{TokenCache, TokenInfo};
