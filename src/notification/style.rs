//! Status classification for build notifications
//!
//! Maps a build status to the embed it should produce:
//! - BUILDING: build started (`WORKING`)
//! - SUCCESS: build finished, includes the access URL
//! - ERROR: `FAILURE`, `INTERNAL_ERROR`, `TIMEOUT`
//!
//! Every other status produces no embed.

use crate::build_event::{BuildEvent, BuildStatus};

pub const COLOR_BUILDING: u32 = 1027128;
pub const COLOR_SUCCESS: u32 = 1127128;
pub const COLOR_ERROR: u32 = 14177041;

/// Embed category for a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedKind {
    Building,
    Success,
    Error,
}

impl std::fmt::Display for EmbedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl EmbedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbedKind::Building => "BUILDING",
            EmbedKind::Success => "SUCCESS",
            EmbedKind::Error => "ERROR",
        }
    }

    pub fn color(&self) -> u32 {
        match self {
            EmbedKind::Building => COLOR_BUILDING,
            EmbedKind::Success => COLOR_SUCCESS,
            EmbedKind::Error => COLOR_ERROR,
        }
    }

    /// Description lines, in order
    pub fn lines(&self) -> &'static [DescriptionLine] {
        use DescriptionLine::*;
        match self {
            EmbedKind::Building | EmbedKind::Error => &[BuildId, Service, Environment, Logs],
            EmbedKind::Success => &[BuildId, Service, Environment, Logs, Access],
        }
    }

    /// Embed title; error titles carry the concrete status
    pub fn title(&self, status: &BuildStatus) -> String {
        match self {
            EmbedKind::Building => "🔨 BUILDING".to_string(),
            EmbedKind::Success => "✅ SUCCESS".to_string(),
            EmbedKind::Error => format!("❌ ERROR - {}", status),
        }
    }
}

/// Classify a status, `None` for statuses that are not announced
pub fn classify(status: &BuildStatus) -> Option<EmbedKind> {
    match status {
        BuildStatus::Working => Some(EmbedKind::Building),
        BuildStatus::Success => Some(EmbedKind::Success),
        BuildStatus::Failure | BuildStatus::InternalError | BuildStatus::Timeout => {
            Some(EmbedKind::Error)
        }
        _ => None,
    }
}

/// A labelled line of the embed description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionLine {
    BuildId,
    Service,
    Environment,
    Logs,
    Access,
}

impl DescriptionLine {
    pub fn label(&self) -> &'static str {
        match self {
            DescriptionLine::BuildId => "Build ID",
            DescriptionLine::Service => "Service",
            DescriptionLine::Environment => "Environment",
            DescriptionLine::Logs => "Logs",
            DescriptionLine::Access => "Access",
        }
    }

    pub fn value<'a>(&self, event: &'a BuildEvent) -> &'a str {
        match self {
            DescriptionLine::BuildId => &event.id,
            DescriptionLine::Service => event.app_name(),
            DescriptionLine::Environment => &event.project_id,
            DescriptionLine::Logs => &event.log_url,
            DescriptionLine::Access => event.access_url(),
        }
    }
}

/// Render the description for a kind, one `Label: value` per line
pub fn describe(kind: EmbedKind, event: &BuildEvent) -> String {
    kind.lines()
        .iter()
        .map(|line| format!("{}: {}", line.label(), line.value(event)))
        .collect::<Vec<_>>()
        .join("\n")
}
