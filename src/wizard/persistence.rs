//! Persistence manager.
//!
//! Owns the record identity and serializes every draft save for a session. Saves queue on a
//! single async lock; whoever acquires it re-reads the snapshot first, so a queued request
//! always writes the latest data and a request that finds nothing new is skipped.

use log::{debug, info, warn};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::DraftStore;
use crate::error::{BackendError, WizardError, WizardResult};
use crate::models::notice::{Notice, NoticeEmitter};
use crate::models::snapshot::SnapshotHandle;
use crate::utils::logging::mask_identity;

/// One save about to go out.
#[derive(Debug, Clone)]
pub struct SaveTask {
    pub target_step: u32,
    pub snapshot: Value,
    pub revision: u64,
    pub attempted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { id: String, created: bool },
    /// Latest snapshot and step were already persisted.
    Clean,
}

#[derive(Debug)]
struct SaveState {
    session_id: Option<String>,
    /// `(revision, step)` of the last persisted save.
    persisted: (u64, u32),
    /// Step of the most recent save request. Read when a save starts, like the snapshot.
    requested_step: u32,
}

struct Inner {
    store: Arc<dyn DraftStore>,
    snapshot: SnapshotHandle,
    debounce: Duration,
    save_lock: tokio::sync::Mutex<()>,
    state: Mutex<SaveState>,
    /// Bumped by every schedule/cancel; a debounce timer only fires if it is still current.
    timer_epoch: AtomicU64,
    notices: NoticeEmitter,
}

#[derive(Clone)]
pub struct PersistenceManager {
    inner: Arc<Inner>,
}

impl PersistenceManager {
    pub fn new(
        store: Arc<dyn DraftStore>,
        snapshot: SnapshotHandle,
        debounce: Duration,
        notices: NoticeEmitter,
    ) -> Self {
        let baseline = (snapshot.revision(), 1);
        Self {
            inner: Arc::new(Inner {
                store,
                snapshot,
                debounce,
                save_lock: tokio::sync::Mutex::new(()),
                state: Mutex::new(SaveState {
                    session_id: None,
                    persisted: baseline,
                    requested_step: 1,
                }),
                timer_epoch: AtomicU64::new(0),
                notices,
            }),
        }
    }

    /// Resume an existing record: the current snapshot at `step` is treated as persisted.
    pub fn restore(&self, session_id: Option<String>, step: u32) {
        let revision = self.inner.snapshot.revision();
        let mut state = self.state();
        state.session_id = session_id.filter(|id| !id.trim().is_empty());
        state.persisted = (revision, step);
        state.requested_step = step;
    }

    pub fn session_id(&self) -> Option<String> {
        self.state().session_id.clone()
    }

    pub fn is_dirty(&self, step: u32) -> bool {
        let revision = self.inner.snapshot.revision();
        self.state().persisted != (revision, step)
    }

    /// Restart the debounce clock; the save fires once edits stop for the debounce delay.
    pub fn schedule_autosave(&self, step: u32) {
        self.request(step);
        let epoch = self.inner.timer_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.inner.debounce).await;
            if this.inner.timer_epoch.load(Ordering::SeqCst) != epoch {
                return;
            }
            this.autosave_requested().await;
        });
    }

    /// Fire an autosave now without waiting for it. Supersedes any pending debounce timer.
    pub fn save_in_background(&self, step: u32) -> JoinHandle<()> {
        self.cancel_pending();
        self.request(step);
        let this = self.clone();
        tokio::spawn(async move { this.autosave_requested().await })
    }

    /// Drop any debounce timer that has not fired yet.
    pub fn cancel_pending(&self) {
        self.inner.timer_epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Non-fatal save: failures become a `SaveWarning` and the next tick tries again.
    pub async fn autosave(&self, step: u32) {
        self.request(step);
        self.autosave_requested().await;
    }

    /// `autosave` for work that outlives a user action; skipped once `live` is cancelled.
    pub async fn autosave_while_live(&self, step: u32, live: &CancellationToken) {
        if live.is_cancelled() {
            debug!(
                "[PHASE: persistence] [STEP: autosave] Session closed, dropping save for step {}",
                step
            );
            return;
        }
        self.autosave(step).await;
    }

    async fn autosave_requested(&self) {
        if let Err(e) = self.save_requested().await {
            warn!(
                "[PHASE: persistence] [STEP: autosave] Autosave failed: {}",
                e
            );
            (self.inner.notices)(Notice::SaveWarning {
                message: "We couldn't save your progress. We'll try again shortly.".to_string(),
            });
        }
    }

    /// Blocking save used by save-and-close and the draft exit path.
    pub async fn save_now(&self, step: u32) -> WizardResult<SaveOutcome> {
        self.save_latest(step).await.map_err(WizardError::SaveFailed)
    }

    /// Save the latest snapshot at `step`, waiting for any in-flight save first.
    pub async fn save_latest(&self, step: u32) -> Result<SaveOutcome, BackendError> {
        self.request(step);
        self.save_requested().await
    }

    async fn save_requested(&self) -> Result<SaveOutcome, BackendError> {
        let _guard = self.inner.save_lock.lock().await;

        // Re-read after the wait so a queued request never writes stale data.
        let (snapshot, revision) = self.inner.snapshot.read();
        let (id, step, clean) = {
            let state = self.state();
            (
                state.session_id.clone(),
                state.requested_step,
                state.persisted == (revision, state.requested_step),
            )
        };
        if clean && id.is_some() {
            debug!(
                "[PHASE: persistence] [STEP: save] Skipping save, revision {} at step {} already persisted",
                revision, step
            );
            return Ok(SaveOutcome::Clean);
        }

        let mut task = SaveTask {
            target_step: step,
            snapshot,
            revision,
            attempted: false,
        };
        let created = id.is_none();
        let saved_id = self.dispatch(&mut task, id.as_deref()).await?;
        let id = self.record_save(&task, saved_id);

        Ok(SaveOutcome::Saved { id, created })
    }

    /// Final save: marks the record complete. Creates the record first if it never got one.
    pub async fn submit_final(&self, step: u32) -> WizardResult<String> {
        self.request(step);
        let _guard = self.inner.save_lock.lock().await;

        let (snapshot, revision) = self.inner.snapshot.read();
        let mut task = SaveTask {
            target_step: step,
            snapshot,
            revision,
            attempted: false,
        };

        let id = match self.session_id() {
            Some(id) => id,
            None => {
                let created = self
                    .dispatch(&mut task, None)
                    .await
                    .map_err(WizardError::SaveFatal)?;
                self.record_save(&task, created)
            }
        };

        let started = Instant::now();
        self.inner
            .store
            .submit_final(&task.snapshot, &id)
            .await
            .map_err(|e| {
                warn!(
                    "[PHASE: persistence] [STEP: final_submit] Final submit failed for {}: {}",
                    mask_identity(Some(&id)),
                    e
                );
                WizardError::SaveFatal(e)
            })?;

        self.state().persisted = (revision, step);
        info!(
            "[PHASE: persistence] [STEP: final_submit] Record {} marked final (duration_ms={})",
            mask_identity(Some(&id)),
            started.elapsed().as_millis()
        );
        Ok(id)
    }

    async fn dispatch(&self, task: &mut SaveTask, id: Option<&str>) -> Result<String, BackendError> {
        task.attempted = true;
        let started = Instant::now();
        let result = self
            .inner
            .store
            .save_draft(&task.snapshot, id, task.target_step)
            .await;
        match &result {
            Ok(saved) => info!(
                "[PHASE: persistence] [STEP: save] [SESSION: {}] Saved revision {} at step {} (duration_ms={})",
                mask_identity(Some(saved)),
                task.revision,
                task.target_step,
                started.elapsed().as_millis()
            ),
            Err(e) => warn!(
                "[PHASE: persistence] [STEP: save] [SESSION: {}] Save of step {} failed: {}",
                mask_identity(id),
                task.target_step,
                e
            ),
        }
        result
    }

    /// Record a successful save. The identity is written once; later ids never replace it.
    fn record_save(&self, task: &SaveTask, saved_id: String) -> String {
        let mut state = self.state();
        let id = match &state.session_id {
            Some(existing) => {
                if *existing != saved_id {
                    warn!(
                        "[PHASE: persistence] [STEP: identity] Backend returned {} for record {}, keeping the original",
                        mask_identity(Some(&saved_id)),
                        mask_identity(Some(existing))
                    );
                }
                existing.clone()
            }
            None => {
                info!(
                    "[PHASE: persistence] [STEP: identity] Record created: {}",
                    mask_identity(Some(&saved_id))
                );
                state.session_id = Some(saved_id.clone());
                saved_id
            }
        };
        state.persisted = (task.revision, task.target_step);
        id
    }

    fn request(&self, step: u32) {
        self.state().requested_step = step;
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SaveState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::InMemoryBackend;
    use crate::models::notice::silent_notices;
    use serde_json::json;
    use std::sync::atomic::AtomicU32;

    fn manager(backend: &Arc<InMemoryBackend>, snapshot: &SnapshotHandle, debounce_ms: u64) -> PersistenceManager {
        PersistenceManager::new(
            backend.clone(),
            snapshot.clone(),
            Duration::from_millis(debounce_ms),
            silent_notices(),
        )
    }

    #[tokio::test]
    async fn closed_session_drops_late_autosave() {
        let backend = Arc::new(InMemoryBackend::new());
        let snapshot = SnapshotHandle::new(json!({}));
        let pm = manager(&backend, &snapshot, 10);
        snapshot.set_field("pitch", json!("Generated"));

        let live = CancellationToken::new();
        live.cancel();
        pm.autosave_while_live(14, &live).await;
        assert_eq!(InMemoryBackend::count(&backend.save_calls), 0);
        assert!(pm.session_id().is_none());

        pm.autosave_while_live(14, &CancellationToken::new()).await;
        assert_eq!(InMemoryBackend::count(&backend.save_calls), 1);
        assert!(pm.session_id().is_some());
    }

    #[tokio::test]
    async fn first_save_creates_and_later_saves_update() {
        let backend = Arc::new(InMemoryBackend::new());
        let snapshot = SnapshotHandle::new(json!({}));
        let pm = manager(&backend, &snapshot, 10);

        snapshot.set_field("roleName", json!("Data Analyst"));
        let first = pm.save_latest(2).await.unwrap();
        let id = match first {
            SaveOutcome::Saved { id, created } => {
                assert!(created);
                id
            }
            other => panic!("unexpected {:?}", other),
        };

        snapshot.set_field("roleLevel", json!("APS6"));
        let second = pm.save_latest(3).await.unwrap();
        assert_eq!(
            second,
            SaveOutcome::Saved {
                id: id.clone(),
                created: false
            }
        );
        assert_eq!(InMemoryBackend::count(&backend.create_calls), 1);
        assert_eq!(backend.draft_count(), 1);
        assert_eq!(pm.session_id(), Some(id));
    }

    #[tokio::test]
    async fn concurrent_saves_run_one_at_a_time_and_persist_latest() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_save_delay(Duration::from_millis(20));
        let snapshot = SnapshotHandle::new(json!({ "n": 0 }));
        let pm = manager(&backend, &snapshot, 10);

        let mut handles = Vec::new();
        for n in 1..=5 {
            snapshot.set_field("n", json!(n));
            let pm = pm.clone();
            handles.push(tokio::spawn(async move { pm.save_latest(2).await }));
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        for result in futures::future::join_all(handles).await {
            assert!(result.unwrap().is_ok());
        }

        assert_eq!(backend.max_in_flight_saves.load(Ordering::SeqCst), 1);
        assert_eq!(InMemoryBackend::count(&backend.create_calls), 1);
        let id = pm.session_id().unwrap();
        assert_eq!(backend.draft(&id).unwrap().data["n"], 5);
        assert!(!pm.is_dirty(2));
    }

    #[tokio::test]
    async fn queued_requests_coalesce_when_nothing_changed() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_save_delay(Duration::from_millis(15));
        let snapshot = SnapshotHandle::new(json!({}));
        snapshot.set_field("roleName", json!("Analyst"));
        let pm = manager(&backend, &snapshot, 10);

        let results = futures::future::join_all((0..4).map(|_| pm.save_latest(2))).await;
        let saved = results
            .iter()
            .filter(|r| matches!(r, Ok(SaveOutcome::Saved { .. })))
            .count();
        assert_eq!(saved, 1);
        assert_eq!(InMemoryBackend::count(&backend.save_calls), 1);
    }

    #[tokio::test]
    async fn debounce_collapses_bursts_into_one_save() {
        let backend = Arc::new(InMemoryBackend::new());
        let snapshot = SnapshotHandle::new(json!({}));
        let pm = manager(&backend, &snapshot, 30);

        for i in 0..5 {
            snapshot.set_field("roleDescription", json!(format!("draft {}", i)));
            pm.schedule_autosave(2);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(InMemoryBackend::count(&backend.save_calls), 1);
        let id = pm.session_id().unwrap();
        assert_eq!(backend.draft(&id).unwrap().data["roleDescription"], "draft 4");
    }

    #[tokio::test]
    async fn cancelled_timer_never_fires() {
        let backend = Arc::new(InMemoryBackend::new());
        let snapshot = SnapshotHandle::new(json!({}));
        snapshot.set_field("roleName", json!("x"));
        let pm = manager(&backend, &snapshot, 20);

        pm.schedule_autosave(2);
        pm.cancel_pending();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(InMemoryBackend::count(&backend.save_calls), 0);
    }

    #[tokio::test]
    async fn autosave_failure_warns_and_next_tick_recovers() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_next_saves(1);
        let snapshot = SnapshotHandle::new(json!({}));
        snapshot.set_field("roleName", json!("x"));

        let warnings = Arc::new(AtomicU32::new(0));
        let counter = warnings.clone();
        let pm = PersistenceManager::new(
            backend.clone(),
            snapshot.clone(),
            Duration::from_millis(10),
            Arc::new(move |notice: Notice| {
                if matches!(notice, Notice::SaveWarning { .. }) {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }),
        );

        pm.autosave(2).await;
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
        assert!(pm.session_id().is_none());
        assert!(pm.is_dirty(2));

        pm.autosave(2).await;
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
        assert!(pm.session_id().is_some());
    }

    #[tokio::test]
    async fn blocking_save_surfaces_failure() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_next_saves(1);
        let snapshot = SnapshotHandle::new(json!({ "roleName": "x" }));
        let pm = manager(&backend, &snapshot, 10);
        assert!(matches!(
            pm.save_now(2).await,
            Err(WizardError::SaveFailed(_))
        ));
    }

    #[tokio::test]
    async fn final_submit_creates_missing_record_and_marks_final() {
        let backend = Arc::new(InMemoryBackend::new());
        let snapshot = SnapshotHandle::new(json!({ "pitch": "Dear panel" }));
        let pm = manager(&backend, &snapshot, 10);

        let id = pm.submit_final(14).await.unwrap();
        let record = backend.draft(&id).unwrap();
        assert_eq!(
            record.status,
            crate::models::requests::DraftStatus::Final
        );
        assert_eq!(pm.session_id(), Some(id));
    }

    #[tokio::test]
    async fn final_submit_failure_is_fatal() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_next_submits(1);
        let snapshot = SnapshotHandle::new(json!({}));
        let pm = manager(&backend, &snapshot, 10);
        assert!(matches!(
            pm.submit_final(14).await,
            Err(WizardError::SaveFatal(_))
        ));
    }

    #[test]
    fn restored_record_starts_clean() {
        let backend = Arc::new(InMemoryBackend::new());
        let snapshot = SnapshotHandle::new(json!({ "roleName": "x" }));
        let pm = manager(&backend, &snapshot, 10);
        pm.restore(Some("rec-1".to_string()), 7);
        assert_eq!(pm.session_id().as_deref(), Some("rec-1"));
        assert!(!pm.is_dirty(7));
        assert!(pm.is_dirty(8));
    }
}
