//! Build notifier - runs one build event through gate, renderer and channel

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::channel::{NotificationChannel, SendResult};
use super::gate::{decide, GateDecision};
use super::renderer::render;
use super::side_effect::SideEffectRunner;
use crate::build_event::BuildEvent;
use crate::error::NotifierError;
use crate::filter::EventFilter;

/// Immutable after setup; safe to share across threads
pub struct BuildNotifier {
    filter: Option<Box<dyn EventFilter>>,
    channel: Arc<dyn NotificationChannel>,
    side_effects: Arc<dyn SideEffectRunner>,
    dry_run: bool,
}

impl BuildNotifier {
    pub fn new(
        filter: Option<Box<dyn EventFilter>>,
        channel: Arc<dyn NotificationChannel>,
        side_effects: Arc<dyn SideEffectRunner>,
    ) -> Self {
        Self {
            filter,
            channel,
            side_effects,
            dry_run: false,
        }
    }

    /// Render and log only; no delivery, no side effects
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn channel_name(&self) -> &str {
        self.channel.name()
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    /// Process one build event
    ///
    /// Side effects run after rendering and before delivery; their failures
    /// never change the returned result.
    pub fn send_notification(&self, event: &BuildEvent) -> Result<SendResult, NotifierError> {
        let decision = decide(event, self.filter.as_deref());
        if decision != GateDecision::Notify {
            debug!(build_id = %event.id, reason = decision.reason(), "Build event suppressed");
            return Ok(SendResult::Skipped(decision.reason().to_string()));
        }

        info!(
            build_id = %event.id,
            status = %event.status,
            duration_secs = ?event.duration().map(|d| d.num_seconds()),
            "Sending webhook for build"
        );

        let rendered = render(event);

        for effect in &rendered.side_effects {
            if self.dry_run {
                eprintln!("[DRY-RUN] Would run side effect: {}", effect.name());
                continue;
            }
            self.side_effects.run(effect);
        }

        let Some(message) = rendered.message else {
            return Ok(SendResult::Skipped(format!("unhandled status {}", event.status)));
        };

        if self.dry_run {
            eprintln!(
                "[DRY-RUN] Would send to channel {}: {}",
                self.channel.name(),
                serde_json::to_string(&message)?
            );
            return Ok(SendResult::Skipped("dry-run".to_string()));
        }

        match self.channel.send(&message) {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(build_id = %event.id, channel = self.channel.name(), error = %e, "Channel send failed");
                Err(e)
            }
        }
    }
}
