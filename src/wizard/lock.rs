// Generation lock.
//
// Unlocked -> Confirmed happens once, together with the generation trigger. There is no way
// back: the inputs that produced a pitch can never diverge from what was sent.

use serde::{Deserialize, Serialize};

use crate::error::WizardError;
use crate::wizard::steps::Section;

pub const BACK_LOCKED_REASON: &str =
    "Your answers are locked because pitch generation has started. You can't go back.";
pub const JUMP_LOCKED_REASON: &str =
    "Your answers are locked because pitch generation has started. Only the review page is available.";
pub const EDIT_LOCKED_REASON: &str =
    "Your answers are locked because pitch generation has started.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    #[default]
    Unlocked,
    Confirmed,
}

pub fn allowed_transitions(from: LockState) -> &'static [LockState] {
    match from {
        LockState::Unlocked => &[LockState::Confirmed],
        LockState::Confirmed => &[],
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationLock {
    state: LockState,
}

impl GenerationLock {
    /// Restore a lock from a persisted pointer.
    pub fn from_confirmed(confirmed: bool) -> Self {
        Self {
            state: if confirmed {
                LockState::Confirmed
            } else {
                LockState::Unlocked
            },
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == LockState::Confirmed
    }

    /// One-way transition to `Confirmed`.
    pub fn confirm(&mut self) -> Result<(), WizardError> {
        if !allowed_transitions(self.state).contains(&LockState::Confirmed) {
            return Err(WizardError::GenerationAlreadyStarted);
        }
        self.state = LockState::Confirmed;
        Ok(())
    }

    pub fn guard_back(&self) -> Result<(), WizardError> {
        if self.is_locked() {
            return Err(WizardError::NavigationLocked {
                reason: BACK_LOCKED_REASON.to_string(),
            });
        }
        Ok(())
    }

    pub fn guard_jump(&self, target: Section) -> Result<(), WizardError> {
        if self.is_locked() && !target.is_terminal() {
            return Err(WizardError::NavigationLocked {
                reason: JUMP_LOCKED_REASON.to_string(),
            });
        }
        Ok(())
    }

    pub fn guard_edit(&self) -> Result<(), WizardError> {
        if self.is_locked() {
            return Err(WizardError::NavigationLocked {
                reason: EDIT_LOCKED_REASON.to_string(),
            });
        }
        Ok(())
    }
}
