// Wizard session state and the resumable session pointer.

use serde::{Deserialize, Serialize};

use crate::wizard::lock::GenerationLock;
use crate::wizard::steps;

/// Mutable root of one wizard run. Owned by the navigation controller; `session_id` lives in
/// the persistence manager, which is its only writer.
#[derive(Debug, Clone)]
pub struct WizardSession {
    pub current_step: u32,
    pub repeat_count: u32,
    pub lock: GenerationLock,
    pub is_generating: bool,
    pub generation_error: Option<String>,
    /// Boundary step passed validation; waiting for the user to accept generation.
    pub confirmation_pending: bool,
}

impl WizardSession {
    pub fn new(repeat_count: u32) -> Self {
        Self {
            current_step: 1,
            repeat_count,
            lock: GenerationLock::default(),
            is_generating: false,
            generation_error: None,
            confirmation_pending: false,
        }
    }

    pub fn total_steps(&self) -> u32 {
        steps::total_steps(self.repeat_count)
    }

    pub fn is_terminal(&self) -> bool {
        self.current_step >= steps::terminal_step(self.repeat_count)
    }
}

/// Externally observable position, enough to resume after a reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPointer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub step: u32,
    pub repeat_count: u32,
    #[serde(default)]
    pub generation_confirmed: bool,
}

impl SessionPointer {
    /// `session=<id>&step=<n>&examples=<n>&locked=<0|1>`
    pub fn to_query(&self) -> String {
        let mut q = url::form_urlencoded::Serializer::new(String::new());
        if let Some(id) = &self.session_id {
            q.append_pair("session", id);
        }
        q.append_pair("step", &self.step.to_string());
        q.append_pair("examples", &self.repeat_count.to_string());
        if self.generation_confirmed {
            q.append_pair("locked", "1");
        }
        q.finish()
    }

    /// Parse a query string produced by `to_query`. Missing `step`/`examples` yields `None`.
    pub fn from_query(query: &str) -> Option<Self> {
        let query = query.trim_start_matches('?');
        let mut session_id = None;
        let mut step = None;
        let mut repeat_count = None;
        let mut generation_confirmed = false;

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "session" if !value.trim().is_empty() => session_id = Some(value.into_owned()),
                "step" => step = value.trim().parse::<u32>().ok(),
                "examples" => repeat_count = value.trim().parse::<u32>().ok(),
                "locked" => generation_confirmed = value == "1" || value == "true",
                _ => {}
            }
        }

        Some(Self {
            session_id,
            step: step?,
            repeat_count: repeat_count?,
            generation_confirmed,
        })
    }
}
