//! Build Notifier - forward CI build status events to a chat webhook

pub mod build_event;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod notification;
pub mod secrets;

pub use build_event::{BuildEvent, BuildSource, BuildStatus, RepoSource};
pub use config::NotifierConfig;
pub use error::NotifierError;
pub use filter::{compile_filter, EventFilter, FilterPredicate};
pub use notification::{
    render, should_notify, BuildNotifier, Embed, NotificationMessage, NotifierBuilder, Rendered,
    SendResult, SideEffect,
};
pub use secrets::{LocalSecretStore, SecretGetter};
