//! A Tower middleware that delivers application alerts to chat-bot webhooks in delayed batches.
//!
//! Alerting from a busy service tends to come in bursts: many workers hit the same error within
//! milliseconds of each other, and a chat bot that receives every one of them quickly runs into
//! its rate limit. `tower-notify` puts a short collection window in front of the webhook.
//!
//! Producers enqueue text on a [`DelayNotifier`] from any number of tasks. A single background
//! [`Worker`] wakes up once per window, drains everything queued so far, drops repeated texts
//! (keeping the first occurrence) and splits the rest into groups of at most `max_messages`
//! entries. Each group is joined with a separator and passed as one `String` to the wrapped
//! service. A group that fails to deliver is logged and dropped; the others are still sent.
//! [`close`](DelayNotifier::close) seals the inbox and waits for the worker to send what is left.
//!
//! Any `Service<String, Response = ()>` can receive the groups. The crate ships a [`Sender`] that
//! renders each message into a webhook request and rotates over several bot tokens with an
//! [`EndpointSelector`], plus ready-made senders for Lark and WeCom in [`platform`].
//!
//! ```no_run
//! use tower_notify::{platform, DelayNotifier, Settings};
//!
//! # async fn run() -> Result<(), tower_notify::BoxError> {
//! let sender = platform::lark(["token-a", "token-b"]).with_identity("billing");
//! let notifier = DelayNotifier::new(sender, Settings::default());
//!
//! notifier.enqueue("invoice run failed").await?;
//! notifier.close().await?;
//! # Ok(())
//! # }
//! ```

/// Export tower's alias for a type-erased error type.
pub use tower::BoxError;

pub use self::config::Settings;
pub use self::http::HttpTransport;
pub use self::layer::DelayLayer;
pub use self::selector::EndpointSelector;
pub use self::sender::{BodyTemplate, Outbound, Sender, TOKEN_PLACEHOLDER};
pub use self::service::DelayNotifier;
pub use self::worker::Worker;

pub mod error;
pub mod future;
pub mod platform;
mod config;
mod http;
mod layer;
mod message;
mod selector;
mod sender;
mod service;
mod worker;
