// Feedback gate.
//
// `submit_final` hands its exit continuation to `substitute`, which returns a stand-in. When
// the stand-in is called for a completed submission it parks the real continuation and opens
// the rating prompt instead; the real exit runs only once the prompt is submitted or dismissed.

use log::{info, warn};
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::api::DraftStore;
use crate::error::{WizardError, WizardResult};
use crate::utils::logging::mask_identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Left without saving anything new.
    Closed,
    /// Left with the record still a draft.
    DraftSaved,
    /// Final submit done (and feedback collected or dismissed).
    Completed,
}

pub type ExitHandler = Box<dyn FnOnce(ExitReason) + Send>;

struct PendingExit {
    record_id: String,
    on_exit: ExitHandler,
}

#[derive(Clone, Default)]
pub struct FeedbackGate {
    pending: Arc<Mutex<Option<PendingExit>>>,
}

impl FeedbackGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `on_exit` for one final-save call.
    pub fn substitute(&self, record_id: String, on_exit: ExitHandler) -> ExitHandler {
        let pending = self.pending.clone();
        Box::new(move |reason: ExitReason| {
            if reason != ExitReason::Completed {
                on_exit(reason);
                return;
            }
            info!(
                "[PHASE: feedback] [STEP: prompt] Rating prompt opened for {}",
                mask_identity(Some(&record_id))
            );
            *pending.lock().unwrap_or_else(|e| e.into_inner()) =
                Some(PendingExit { record_id, on_exit });
        })
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Record the rating, then run the real exit. On failure the prompt stays open.
    pub async fn submit(
        &self,
        store: &dyn DraftStore,
        rating: u8,
        reason: Option<&Value>,
    ) -> WizardResult<()> {
        let record_id = self
            .lock()
            .as_ref()
            .map(|p| p.record_id.clone())
            .ok_or(WizardError::FeedbackNotPending)?;

        store
            .patch_feedback(&record_id, rating, reason)
            .await
            .map_err(|e| {
                warn!(
                    "[PHASE: feedback] [STEP: submit] Feedback for {} failed: {}",
                    mask_identity(Some(&record_id)),
                    e
                );
                WizardError::FeedbackFailed(e)
            })?;

        info!(
            "[PHASE: feedback] [STEP: submit] Rating {} recorded for {}",
            rating,
            mask_identity(Some(&record_id))
        );
        self.release()
    }

    /// Close the prompt without a rating and run the real exit.
    pub fn dismiss(&self) -> WizardResult<()> {
        info!("[PHASE: feedback] [STEP: dismiss] Rating prompt dismissed");
        self.release()
    }

    fn release(&self) -> WizardResult<()> {
        let pending = self.lock().take().ok_or(WizardError::FeedbackNotPending)?;
        (pending.on_exit)(ExitReason::Completed);
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<PendingExit>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::InMemoryBackend;
    use serde_json::json;

    fn recorder() -> (Arc<Mutex<Vec<ExitReason>>>, ExitHandler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let on_exit: ExitHandler =
            Box::new(move |reason: ExitReason| sink.lock().unwrap().push(reason));
        (seen, on_exit)
    }

    async fn final_record(backend: &InMemoryBackend) -> String {
        let id = backend.save_draft(&json!({}), None, 14).await.unwrap();
        backend.submit_final(&json!({}), &id).await.unwrap();
        id
    }

    #[tokio::test]
    async fn completed_exit_is_held_until_rating() {
        let backend = InMemoryBackend::new();
        let id = final_record(&backend).await;
        let gate = FeedbackGate::new();
        let (seen, on_exit) = recorder();

        let exit = gate.substitute(id.clone(), on_exit);
        exit(ExitReason::Completed);
        assert!(gate.is_open());
        assert!(seen.lock().unwrap().is_empty());

        gate.submit(&backend, 5, None).await.unwrap();
        assert!(!gate.is_open());
        assert_eq!(*seen.lock().unwrap(), vec![ExitReason::Completed]);
        assert_eq!(backend.draft(&id).unwrap().rating, Some(5));
    }

    #[tokio::test]
    async fn failed_patch_keeps_prompt_open() {
        let backend = InMemoryBackend::new();
        let id = final_record(&backend).await;
        backend.fail_next_feedback(1);
        let gate = FeedbackGate::new();
        let (seen, on_exit) = recorder();
        gate.substitute(id, on_exit)(ExitReason::Completed);

        assert!(matches!(
            gate.submit(&backend, 1, Some(&json!({ "text": "too long" }))).await,
            Err(WizardError::FeedbackFailed(_))
        ));
        assert!(gate.is_open());
        assert!(seen.lock().unwrap().is_empty());

        gate.dismiss().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![ExitReason::Completed]);
    }

    #[test]
    fn other_exits_pass_straight_through() {
        let gate = FeedbackGate::new();
        let (seen, on_exit) = recorder();
        gate.substitute("rec".to_string(), on_exit)(ExitReason::DraftSaved);
        assert!(!gate.is_open());
        assert_eq!(*seen.lock().unwrap(), vec![ExitReason::DraftSaved]);
        assert!(matches!(gate.dismiss(), Err(WizardError::FeedbackNotPending)));
    }
}
