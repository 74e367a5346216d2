//! # Pianoman Core
//!
//! Scrobbling logic for pianoman, a Last.fm scrobbler driven by pianobar's
//! eventcmd hook.
//!
//! This crate provides:
//! - [`Track`] parsing from eventcmd payloads
//! - The [`EligibilityPolicy`] deciding which plays count as scrobbles
//! - A Last.fm API client ([`lastfm::Api`]) behind the [`lastfm::Scrobbler`]
//!   and [`lastfm::FeedbackProvider`] traits
//! - The [`RetryPolicy`] classifying delivery failures as terminal or
//!   retriable
//! - The [`EventHandler`] that ties the WAL, the policies, and the client
//!   together
//! - Configuration loading
//!
//! ## Scrobble Flow
//!
//! ```text
//! songfinish ─► eligible? ─► WAL append (fsync) ─► process backlog
//!                                                   │
//!                     ┌─────────────────────────────┘
//!                     ▼
//!   oldest segment ─► Last.fm ─► RetryPolicy ─► Drop: trim segment, next
//!                                           └─► Retry: keep, stop, report
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
mod eligibility;
mod error;
mod handler;
pub mod lastfm;
mod lazy;
mod retry;
mod track;

pub use config::Config;
pub use eligibility::EligibilityPolicy;
pub use error::{CoreError, CoreResult};
pub use handler::{scrobble_backlog, Event, EventFlags, EventHandler, Outcome};
pub use lazy::LazyValue;
pub use retry::{DeliveryFailure, Disposition, RetryPolicy};
pub use track::Track;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
