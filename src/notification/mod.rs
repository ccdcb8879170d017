//! Build notification pipeline
//!
//! gate -> renderer -> side effects -> channel
//!
//! # Example
//! ```ignore
//! use build_notifier::notification::NotifierBuilder;
//!
//! let notifier = NotifierBuilder::new(&config, &secrets).build()?;
//! notifier.send_notification(&event)?;
//! ```

pub mod builder;
pub mod channel;
pub mod dispatcher;
pub mod gate;
pub mod message;
pub mod renderer;
pub mod side_effect;
pub mod style;
pub mod webhook;

pub use builder::NotifierBuilder;
pub use channel::{NotificationChannel, SendResult};
pub use dispatcher::BuildNotifier;
pub use gate::{decide, should_notify, GateDecision};
pub use message::{Embed, NotificationMessage};
pub use renderer::{render, Rendered};
pub use side_effect::{CallbackUrl, HttpSideEffectRunner, SideEffect, SideEffectRunner};
pub use style::EmbedKind;
pub use webhook::{WebhookChannel, WebhookConfig};
