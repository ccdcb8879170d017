//! Side-effect directives produced by rendering
//!
//! Rendering stays pure; the dispatcher hands each directive to a
//! [`SideEffectRunner`]. Runner failures are logged and never reach the
//! primary delivery result.

use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::NotifierError;

/// Environment variable holding the backend callback URL
pub const CALLBACK_URL_ENV: &str = "DOJO_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// GET the backend callback URL after a successful backend build
    BackendCallback,
}

impl SideEffect {
    pub fn name(&self) -> &'static str {
        match self {
            SideEffect::BackendCallback => "backend_callback",
        }
    }
}

/// Executes side-effect directives (fire-and-forget)
pub trait SideEffectRunner: Send + Sync {
    fn run(&self, effect: &SideEffect);
}

/// Where the callback URL comes from
#[derive(Debug, Clone)]
pub enum CallbackUrl {
    /// Read from the environment on every run
    Env(String),
    Fixed(String),
}

impl CallbackUrl {
    fn resolve(&self) -> String {
        match self {
            CallbackUrl::Env(name) => std::env::var(name).unwrap_or_default(),
            CallbackUrl::Fixed(url) => url.clone(),
        }
    }
}

/// Runs directives over HTTP
pub struct HttpSideEffectRunner {
    client: Client,
    callback_url: CallbackUrl,
}

impl HttpSideEffectRunner {
    pub fn new(callback_url: CallbackUrl, timeout: Duration) -> Result<Self, NotifierError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(NotifierError::HttpClient)?;
        Ok(Self { client, callback_url })
    }

    /// Runner reading the callback URL from `DOJO_URL` at call time
    pub fn from_env(timeout: Duration) -> Result<Self, NotifierError> {
        Self::new(CallbackUrl::Env(CALLBACK_URL_ENV.to_string()), timeout)
    }

    fn call_backend(&self) {
        let url = self.callback_url.resolve();
        if url.is_empty() {
            debug!(effect = "backend_callback", "Callback URL not configured, skipping");
            return;
        }

        match self.client.get(&url).send() {
            Ok(response) => info!(
                effect = "backend_callback",
                status = response.status().as_u16(),
                "Backend callback succeeded"
            ),
            Err(e) => error!(
                effect = "backend_callback",
                error = %e,
                "Backend callback failed"
            ),
        }
    }
}

impl SideEffectRunner for HttpSideEffectRunner {
    fn run(&self, effect: &SideEffect) {
        match effect {
            SideEffect::BackendCallback => self.call_backend(),
        }
    }
}
