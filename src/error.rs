// Error taxonomy for the wizard core.
//
// Blocking errors stop the current action and must be shown to the user. Everything else is
// surfaced as a `Notice` and the flow continues.

use crate::wizard::steps::Section;

/// Transport-level failure talking to the draft store or the generation service.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("record not found: {0}")]
    NotFound(String),
}

impl BackendError {
    /// Worth retrying automatically (idempotent calls only).
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Transport(_) => true,
            BackendError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            BackendError::Status {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        BackendError::Decode(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("validation failed for {} field(s): {}", failed_fields.len(), failed_fields.join(", "))]
    ValidationFailed { failed_fields: Vec<String> },

    /// Blocking draft save (save-and-close, draft exit path).
    #[error("failed to save draft: {0}")]
    SaveFailed(#[source] BackendError),

    /// Final submit failed; the record is not marked complete.
    #[error("failed to submit final pitch: {0}")]
    SaveFatal(#[source] BackendError),

    #[error("pitch generation failed: {0}")]
    GenerationFailed(String),

    #[error("pitch generation timed out after {attempts} status checks")]
    GenerationTimedOut { attempts: u32 },

    #[error("navigation locked: {reason}")]
    NavigationLocked { reason: String },

    #[error("cannot jump ahead to {target:?}; complete the current step first")]
    ForwardJumpNotAllowed { target: Section },

    #[error("no generation confirmation is pending")]
    ConfirmationNotPending,

    #[error("pitch generation has already been started for this session")]
    GenerationAlreadyStarted,

    #[error("pitch is not ready yet")]
    PitchNotReady,

    #[error("STAR example count {requested} is outside {min}..={max}")]
    InvalidRepeatCount { requested: u32, min: u32, max: u32 },

    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("please tell us what could be improved for a rating of {rating}")]
    FeedbackReasonRequired { rating: u8 },

    #[error("no feedback prompt is open")]
    FeedbackNotPending,

    #[error("the rating prompt is open; submit or dismiss it to leave")]
    FeedbackPending,

    #[error("failed to record feedback: {0}")]
    FeedbackFailed(#[source] BackendError),

    #[error("the wizard session has been closed")]
    SessionClosed,

    #[error("configuration error: {0}")]
    Config(String),
}

impl WizardError {
    /// Blocking errors must stop the user at the current screen; the rest are local notices.
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            WizardError::SaveFailed(_)
                | WizardError::SaveFatal(_)
                | WizardError::FeedbackFailed(_)
                | WizardError::SessionClosed
                | WizardError::Config(_)
        )
    }

    /// Short user-facing wording (details stay in the logs).
    pub fn user_message(&self) -> String {
        match self {
            WizardError::ValidationFailed { .. } => {
                "Please complete the highlighted fields before continuing.".to_string()
            }
            WizardError::SaveFailed(_) => {
                "We couldn't save your progress. Check your connection and try again.".to_string()
            }
            WizardError::SaveFatal(_) => {
                "We couldn't submit your pitch. Your answers are still here; please try again."
                    .to_string()
            }
            WizardError::GenerationFailed(_) | WizardError::GenerationTimedOut { .. } => {
                "Pitch generation failed. Would you like to retry?".to_string()
            }
            WizardError::NavigationLocked { reason } => reason.clone(),
            WizardError::PitchNotReady => {
                "Your pitch is still being generated. Please wait a moment.".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type WizardResult<T> = Result<T, WizardError>;
