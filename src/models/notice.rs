// User-visible, non-blocking notices emitted by the core.

use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Notice {
    /// Autosave failed; the next tick retries with the latest snapshot.
    SaveWarning { message: String },
    /// Back/jump refused because generation was confirmed.
    NavigationLocked { reason: String },
    /// Fields to highlight (shake) on the current step.
    ValidationFailed { failed_fields: Vec<String> },
    GenerationFailed { message: String },
    GenerationTimedOut { attempts: u32 },
    /// Input regions did not confirm the flush inside the grace period.
    FlushTimedOut { grace_ms: u64 },
}

impl Notice {
    pub fn severity(&self) -> &'static str {
        match self {
            Notice::SaveWarning { .. } | Notice::FlushTimedOut { .. } => "warn",
            Notice::NavigationLocked { .. } | Notice::ValidationFailed { .. } => "info",
            Notice::GenerationFailed { .. } | Notice::GenerationTimedOut { .. } => "error",
        }
    }
}

pub type NoticeEmitter = Arc<dyn Fn(Notice) + Send + Sync>;

/// Emitter that drops every notice (headless callers that only read state).
pub fn silent_notices() -> NoticeEmitter {
    Arc::new(|_notice: Notice| {})
}
