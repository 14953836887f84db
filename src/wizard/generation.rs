//! Generation orchestrator.
//!
//! `idle -> triggered -> polling -> {succeeded | failed | timed_out}`. One status check runs
//! right after the trigger and counts as the first attempt; the rest run on a fixed interval
//! until the job finishes, fails, or `max_attempts` checks have come back pending.

use log::{error, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::api::GenerationService;
use crate::error::{WizardError, WizardResult};
use crate::models::requests::GenerationTriggerRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Succeeded,
    Failed,
}

/// The in-flight job, alive while the orchestrator is polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub request_id: String,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub poll_interval_ms: u64,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GenerationState {
    Idle,
    Triggered,
    Polling(GenerationRequest),
    Succeeded,
    Failed { message: String },
    TimedOut { attempts: u32 },
}

impl GenerationState {
    pub fn is_active(&self) -> bool {
        matches!(self, GenerationState::Triggered | GenerationState::Polling(_))
    }

    /// States a new trigger may start from.
    fn can_trigger(&self) -> bool {
        matches!(
            self,
            GenerationState::Idle | GenerationState::Failed { .. } | GenerationState::TimedOut { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Succeeded(String),
    Failed(String),
    TimedOut { attempts: u32 },
    /// The session went away; nothing should be written back.
    Cancelled,
}

pub struct GenerationOrchestrator {
    service: Arc<dyn GenerationService>,
    poll_interval: Duration,
    max_attempts: u32,
    state: Mutex<GenerationState>,
}

impl GenerationOrchestrator {
    pub fn new(service: Arc<dyn GenerationService>, poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            service,
            poll_interval,
            max_attempts: max_attempts.max(1),
            state: Mutex::new(GenerationState::Idle),
        }
    }

    pub fn state(&self) -> GenerationState {
        self.lock_state().clone()
    }

    /// Claim the single trigger slot. Fails while a request is in flight or after success.
    pub fn begin(&self) -> WizardResult<()> {
        let mut state = self.lock_state();
        if !state.can_trigger() {
            return Err(WizardError::GenerationAlreadyStarted);
        }
        *state = GenerationState::Triggered;
        Ok(())
    }

    /// Trigger the job and poll it to completion. `begin` must have succeeded first.
    pub async fn run(
        &self,
        request: GenerationTriggerRequest,
        cancel: &CancellationToken,
    ) -> GenerationOutcome {
        if *self.lock_state() != GenerationState::Triggered {
            warn!("[PHASE: generation] [STEP: trigger] run() called without a claimed trigger");
            return GenerationOutcome::Failed("generation was not started".to_string());
        }

        let started = Instant::now();
        info!(
            "[PHASE: generation] [STEP: trigger] Triggering workflow {} (budget={:?})",
            request.workflow_label, request.word_budget
        );

        let triggered = tokio::select! {
            _ = cancel.cancelled() => return self.cancelled(),
            r = self.service.trigger(&request) => r,
        };
        let request_id = match triggered {
            Ok(id) => id,
            Err(e) => {
                error!(
                    "[PHASE: generation] [STEP: trigger_failed] Generation trigger failed: {}",
                    e
                );
                return self.finish_failed(e.to_string());
            }
        };

        self.set_state(GenerationState::Polling(GenerationRequest {
            request_id: request_id.clone(),
            attempts_made: 0,
            max_attempts: self.max_attempts,
            poll_interval_ms: self.poll_interval.as_millis() as u64,
            status: RequestStatus::Pending,
        }));

        let mut attempts = 0u32;
        loop {
            let checked = tokio::select! {
                _ = cancel.cancelled() => return self.cancelled(),
                r = self.service.check_status(&request_id) => r,
            };
            attempts += 1;
            self.record_attempt(attempts);

            match checked {
                Err(e) => {
                    error!(
                        "[PHASE: generation] [STEP: poll_failed] Status check {} for {} failed: {}",
                        attempts, request_id, e
                    );
                    return self.finish_failed(e.to_string());
                }
                Ok(status) if status.done => {
                    if let Some(message) = status.error {
                        error!(
                            "[PHASE: generation] [STEP: poll_failed] Job {} reported failure: {}",
                            request_id, message
                        );
                        return self.finish_failed(message);
                    }
                    return match status.result.filter(|r| !r.trim().is_empty()) {
                        Some(result) => {
                            info!(
                                "[PHASE: generation] [STEP: poll_succeeded] Job {} finished after {} check(s) (duration_ms={})",
                                request_id,
                                attempts,
                                started.elapsed().as_millis()
                            );
                            self.set_state(GenerationState::Succeeded);
                            GenerationOutcome::Succeeded(result)
                        }
                        None => {
                            error!(
                                "[PHASE: generation] [STEP: poll_failed] Job {} finished without a result",
                                request_id
                            );
                            self.finish_failed("generation finished without a result".to_string())
                        }
                    };
                }
                Ok(_) => {
                    if attempts >= self.max_attempts {
                        warn!(
                            "[PHASE: generation] [STEP: poll_timeout] Job {} still pending after {} checks (duration_ms={})",
                            request_id,
                            attempts,
                            started.elapsed().as_millis()
                        );
                        self.set_state(GenerationState::TimedOut { attempts });
                        return GenerationOutcome::TimedOut { attempts };
                    }
                    info!(
                        "[PHASE: generation] [STEP: poll] Check {}/{} for {} pending",
                        attempts, self.max_attempts, request_id
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return self.cancelled(),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    fn record_attempt(&self, attempts: u32) {
        if let GenerationState::Polling(request) = &mut *self.lock_state() {
            request.attempts_made = attempts;
        }
    }

    fn finish_failed(&self, message: String) -> GenerationOutcome {
        self.set_state(GenerationState::Failed {
            message: message.clone(),
        });
        GenerationOutcome::Failed(message)
    }

    fn cancelled(&self) -> GenerationOutcome {
        info!("[PHASE: generation] [STEP: cancelled] Session closed, polling stopped");
        GenerationOutcome::Cancelled
    }

    fn set_state(&self, next: GenerationState) {
        *self.lock_state() = next;
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, GenerationState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::{InMemoryBackend, StatusStep};
    use serde_json::json;

    fn orchestrator(backend: &Arc<InMemoryBackend>, max_attempts: u32) -> GenerationOrchestrator {
        GenerationOrchestrator::new(backend.clone(), Duration::from_millis(5), max_attempts)
    }

    fn request() -> GenerationTriggerRequest {
        GenerationTriggerRequest::from_snapshot(json!({ "pitchWordLimit": 500 }), 2)
    }

    #[tokio::test]
    async fn succeeds_on_call_after_n_pending() {
        let backend = Arc::new(InMemoryBackend::completes_after(3, "Dear panel"));
        let orch = orchestrator(&backend, 20);
        orch.begin().unwrap();

        let outcome = orch.run(request(), &CancellationToken::new()).await;
        assert_eq!(outcome, GenerationOutcome::Succeeded("Dear panel".to_string()));
        assert_eq!(InMemoryBackend::count(&backend.status_calls), 4);
        assert_eq!(InMemoryBackend::count(&backend.trigger_calls), 1);
        assert_eq!(orch.state(), GenerationState::Succeeded);

        // No stray polls after success.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(InMemoryBackend::count(&backend.status_calls), 4);
    }

    #[tokio::test]
    async fn immediate_check_catches_fast_jobs() {
        let backend = Arc::new(InMemoryBackend::completes_after(0, "Fast"));
        let orch = orchestrator(&backend, 20);
        orch.begin().unwrap();
        let outcome = orch.run(request(), &CancellationToken::new()).await;
        assert_eq!(outcome, GenerationOutcome::Succeeded("Fast".to_string()));
        assert_eq!(InMemoryBackend::count(&backend.status_calls), 1);
    }

    #[tokio::test]
    async fn always_pending_times_out_after_max_attempts() {
        let backend = Arc::new(InMemoryBackend::new());
        let orch = orchestrator(&backend, 6);
        orch.begin().unwrap();

        let outcome = orch.run(request(), &CancellationToken::new()).await;
        assert_eq!(outcome, GenerationOutcome::TimedOut { attempts: 6 });
        assert_eq!(InMemoryBackend::count(&backend.status_calls), 6);
        assert_eq!(orch.state(), GenerationState::TimedOut { attempts: 6 });
    }

    #[tokio::test]
    async fn hard_error_stops_polling_immediately() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.script_status([
            StatusStep::Pending,
            StatusStep::CallFailed("upstream exploded".to_string()),
            StatusStep::Done("never read".to_string()),
        ]);
        let orch = orchestrator(&backend, 20);
        orch.begin().unwrap();

        let outcome = orch.run(request(), &CancellationToken::new()).await;
        assert!(matches!(outcome, GenerationOutcome::Failed(ref m) if m.contains("upstream exploded")));
        assert_eq!(InMemoryBackend::count(&backend.status_calls), 2);
    }

    #[tokio::test]
    async fn job_failure_and_trigger_failure_are_failures() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.script_status([StatusStep::JobFailed("model refused".to_string())]);
        let orch = orchestrator(&backend, 20);
        orch.begin().unwrap();
        assert_eq!(
            orch.run(request(), &CancellationToken::new()).await,
            GenerationOutcome::Failed("model refused".to_string())
        );

        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_next_triggers(1);
        let orch = orchestrator(&backend, 20);
        orch.begin().unwrap();
        assert!(matches!(
            orch.run(request(), &CancellationToken::new()).await,
            GenerationOutcome::Failed(_)
        ));
        assert_eq!(InMemoryBackend::count(&backend.status_calls), 0);
    }

    #[tokio::test]
    async fn double_trigger_is_rejected_until_failure() {
        let backend = Arc::new(InMemoryBackend::new());
        let orch = orchestrator(&backend, 2);
        orch.begin().unwrap();
        assert!(matches!(
            orch.begin(),
            Err(WizardError::GenerationAlreadyStarted)
        ));

        let outcome = orch.run(request(), &CancellationToken::new()).await;
        assert_eq!(outcome, GenerationOutcome::TimedOut { attempts: 2 });

        // Retry: a fresh request starting from zero attempts.
        backend.script_status([StatusStep::Done("Second time lucky".to_string())]);
        orch.begin().unwrap();
        let outcome = orch.run(request(), &CancellationToken::new()).await;
        assert_eq!(outcome, GenerationOutcome::Succeeded("Second time lucky".to_string()));
        assert_eq!(InMemoryBackend::count(&backend.trigger_calls), 2);

        assert!(orch.begin().is_err());
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop() {
        let backend = Arc::new(InMemoryBackend::new());
        let orch = Arc::new(GenerationOrchestrator::new(
            backend.clone(),
            Duration::from_millis(20),
            1000,
        ));
        orch.begin().unwrap();

        let token = CancellationToken::new();
        let task = {
            let orch = orch.clone();
            let token = token.clone();
            tokio::spawn(async move { orch.run(request(), &token).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        let outcome = task.await.unwrap();
        assert_eq!(outcome, GenerationOutcome::Cancelled);

        let calls = InMemoryBackend::count(&backend.status_calls);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(InMemoryBackend::count(&backend.status_calls), calls);
    }

    #[tokio::test]
    async fn polling_state_tracks_attempts() {
        let backend = Arc::new(InMemoryBackend::new());
        let orch = Arc::new(GenerationOrchestrator::new(
            backend.clone(),
            Duration::from_millis(15),
            1000,
        ));
        orch.begin().unwrap();
        assert_eq!(orch.state(), GenerationState::Triggered);

        let token = CancellationToken::new();
        let task = {
            let orch = orch.clone();
            let token = token.clone();
            tokio::spawn(async move { orch.run(request(), &token).await })
        };
        tokio::time::sleep(Duration::from_millis(40)).await;

        match orch.state() {
            GenerationState::Polling(req) => {
                assert!(req.attempts_made >= 1);
                assert_eq!(req.max_attempts, 1000);
                assert_eq!(req.status, RequestStatus::Pending);
            }
            other => panic!("expected polling, got {:?}", other),
        }
        token.cancel();
        task.await.unwrap();
    }
}
