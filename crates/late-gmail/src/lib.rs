//! Gmail integration for Late.
//!
//! Provides the Gmail send client and the running-late notice composer.

pub mod client;
pub mod error;
pub mod notice;
pub mod types;

pub use client::GmailClient;
pub use error::GmailError;
pub use notice::{deliver, recipients, LateNotice, SendState};
pub use types::SentMessage;
