//! Notifier setup - resolves config into a ready [`BuildNotifier`]
//!
//! Setup order: compile the filter, resolve the webhook secret reference,
//! fetch the webhook URL. Any failure aborts setup.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::channel::NotificationChannel;
use super::dispatcher::BuildNotifier;
use super::side_effect::{HttpSideEffectRunner, SideEffectRunner};
use super::webhook::{WebhookChannel, WebhookConfig, DEFAULT_TIMEOUT_SECS};
use crate::config::{NotifierConfig, WEBHOOK_URL_SECRET_NAME};
use crate::error::NotifierError;
use crate::filter::{compile_filter, EventFilter};
use crate::secrets::SecretGetter;

pub struct NotifierBuilder<'a> {
    config: &'a NotifierConfig,
    secrets: &'a dyn SecretGetter,
    timeout_secs: u64,
    dry_run: bool,
    channel: Option<Arc<dyn NotificationChannel>>,
    side_effects: Option<Arc<dyn SideEffectRunner>>,
}

impl<'a> NotifierBuilder<'a> {
    pub fn new(config: &'a NotifierConfig, secrets: &'a dyn SecretGetter) -> Self {
        Self {
            config,
            secrets,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            dry_run: false,
            channel: None,
            side_effects: None,
        }
    }

    /// Timeout for the webhook POST and the callback GET
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Use this channel instead of the webhook resolved from config
    pub fn channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn side_effect_runner(mut self, runner: Arc<dyn SideEffectRunner>) -> Self {
        self.side_effects = Some(runner);
        self
    }

    /// Resolve the webhook URL through the secret store
    pub fn resolve_webhook_url(&self) -> Result<String, NotifierError> {
        let secret_ref = self.config.secret_ref(WEBHOOK_URL_SECRET_NAME)?;
        let resource = self.config.find_secret_resource_name(secret_ref)?;
        self.secrets
            .get_secret(resource)
            .map_err(|e| NotifierError::SecretFetch {
                resource: resource.to_string(),
                message: format!("{:#}", e),
            })
    }

    pub fn build(self) -> Result<BuildNotifier, NotifierError> {
        let filter: Option<Box<dyn EventFilter>> = match self.config.filter_expression() {
            Some(expression) => {
                info!(filter = %expression, "Compiled notification filter");
                Some(Box::new(compile_filter(expression)?))
            }
            None => None,
        };

        let webhook_url = self.resolve_webhook_url()?;

        let channel: Arc<dyn NotificationChannel> = match self.channel {
            Some(channel) => channel,
            None => {
                let channel = WebhookChannel::new(WebhookConfig {
                    timeout_secs: self.timeout_secs,
                    ..WebhookConfig::new(webhook_url)
                })?;
                info!(channel = "webhook", host = %channel.endpoint_host(), "Webhook channel ready");
                Arc::new(channel)
            }
        };

        let side_effects: Arc<dyn SideEffectRunner> = match self.side_effects {
            Some(runner) => runner,
            None => Arc::new(HttpSideEffectRunner::from_env(Duration::from_secs(
                self.timeout_secs,
            ))?),
        };

        Ok(BuildNotifier::new(filter, channel, side_effects).with_dry_run(self.dry_run))
    }
}
