//! Message renderer - turns a build event into a webhook message
//!
//! Rendering performs no I/O. Side effects the event calls for are returned
//! as directives next to the message.

use tracing::{debug, info};

use super::message::{Embed, NotificationMessage};
use super::side_effect::SideEffect;
use super::style::{classify, describe, EmbedKind};
use crate::build_event::BuildEvent;

/// Service names containing this trigger the backend callback on success
pub const BACKEND_MARKER: &str = "backend";

/// Render output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rendered {
    /// `None` when the status is not announced
    pub message: Option<NotificationMessage>,
    pub side_effects: Vec<SideEffect>,
}

impl Rendered {
    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.side_effects.is_empty()
    }
}

/// Render a build event
pub fn render(event: &BuildEvent) -> Rendered {
    let mut rendered = Rendered::default();

    let Some(kind) = classify(&event.status) else {
        info!(build_id = %event.id, status = %event.status, "Unhandled status, skipping notification");
        return rendered;
    };

    debug!(build_id = %event.id, kind = %kind, "Rendering embed");
    let mut embed = Embed::new(kind.title(&event.status), kind.color(), describe(kind, event));

    if kind == EmbedKind::Success && event.app_name().contains(BACKEND_MARKER) {
        rendered.side_effects.push(SideEffect::BackendCallback);
    }

    // The repository name replaces the whole status body.
    if let Some(repo_name) = event.repo_name() {
        debug!(build_id = %event.id, repo = %repo_name, "Using repository name as description");
        embed.description = repo_name.to_string();
    }

    rendered.message = Some(NotificationMessage::new().with_embed(embed));
    rendered
}
