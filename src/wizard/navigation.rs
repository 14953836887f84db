//! Navigation controller.
//!
//! The only writer of the session's step, lock and generation flags. Every user action runs
//! under one async lock in a fixed order: flush input buffers, validate, mutate the session,
//! schedule a save. Generation runs in a spawned task that carries a child of the session's
//! liveness token, so tearing the session down stops polling and blocks any late write-back.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::{DraftStore, GenerationService};
use crate::config::WizardConfig;
use crate::error::{WizardError, WizardResult};
use crate::models::notice::{silent_notices, Notice, NoticeEmitter};
use crate::models::requests::GenerationTriggerRequest;
use crate::models::session::{SessionPointer, WizardSession};
use crate::models::snapshot::SnapshotHandle;
use crate::utils::logging::mask_identity;
use crate::utils::validation::is_answered;
use crate::wizard::feedback::FeedbackGate;
pub use crate::wizard::feedback::{ExitHandler, ExitReason};
use crate::wizard::generation::{GenerationOrchestrator, GenerationOutcome, GenerationState};
use crate::wizard::lock::GenerationLock;
use crate::wizard::persistence::PersistenceManager;
use crate::wizard::steps::{
    clamp_step, describe_step, first_step_of, is_boundary_step, terminal_step, total_steps,
    Section, StepDescriptor,
};
use crate::wizard::validation::{
    FieldValidator, RequiredFieldsValidator, StarFieldMap, StepFieldMap, ValidationGate,
};

const INTERRUPTED_GENERATION: &str =
    "Pitch generation was interrupted before it finished. Please retry.";

/// Input regions that batch edits locally. `flush` commits them into the shared snapshot.
#[async_trait]
pub trait InputBuffers: Send + Sync {
    async fn flush(&self);
}

/// For callers whose inputs write straight into the snapshot.
pub struct NoBuffers;

#[async_trait]
impl InputBuffers for NoBuffers {
    async fn flush(&self) {}
}

#[derive(Clone)]
pub struct WizardServices {
    pub drafts: Arc<dyn DraftStore>,
    pub generator: Arc<dyn GenerationService>,
    pub validator: Arc<dyn FieldValidator>,
    pub fields: Arc<dyn StepFieldMap>,
    pub buffers: Arc<dyn InputBuffers>,
    pub notices: NoticeEmitter,
}

impl WizardServices {
    pub fn new(drafts: Arc<dyn DraftStore>, generator: Arc<dyn GenerationService>) -> Self {
        Self {
            drafts,
            generator,
            validator: Arc::new(RequiredFieldsValidator),
            fields: Arc::new(StarFieldMap),
            buffers: Arc::new(NoBuffers),
            notices: silent_notices(),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn FieldValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_fields(mut self, fields: Arc<dyn StepFieldMap>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_buffers(mut self, buffers: Arc<dyn InputBuffers>) -> Self {
        self.buffers = buffers;
        self
    }

    pub fn with_notices(mut self, notices: NoticeEmitter) -> Self {
        self.notices = notices;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Moved { from: u32, to: u32 },
    /// Boundary step passed validation; the generation prompt is open.
    ConfirmationRequired,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Final save done; the rating prompt now holds the exit.
    FeedbackRequested,
    /// Generation had failed, so the record was saved as a draft and the exit ran.
    DraftSaved,
}

pub struct WizardController {
    config: WizardConfig,
    session: Arc<Mutex<WizardSession>>,
    snapshot: SnapshotHandle,
    persistence: PersistenceManager,
    generation: Arc<GenerationOrchestrator>,
    gate: ValidationGate,
    feedback: FeedbackGate,
    drafts: Arc<dyn DraftStore>,
    buffers: Arc<dyn InputBuffers>,
    notices: NoticeEmitter,
    nav_lock: tokio::sync::Mutex<()>,
    /// Serialises snapshot edits against lock confirmation. Taken before `session`, never after.
    edit_lock: Mutex<()>,
    liveness: CancellationToken,
    generation_task: Mutex<Option<JoinHandle<()>>>,
}

impl WizardController {
    /// Create the session, restoring position, identity and lock from `pointer` when given.
    pub fn mount(
        config: WizardConfig,
        services: WizardServices,
        snapshot: SnapshotHandle,
        pointer: Option<SessionPointer>,
    ) -> WizardResult<Self> {
        config.validate()?;

        let repeat_count = pointer
            .as_ref()
            .map(|p| p.repeat_count)
            .unwrap_or(config.default_repeat_count);
        check_repeat_count(&config, repeat_count)?;

        let persistence = PersistenceManager::new(
            services.drafts.clone(),
            snapshot.clone(),
            config.autosave_debounce(),
            services.notices.clone(),
        );

        let mut session = WizardSession::new(repeat_count);
        if let Some(p) = &pointer {
            session.current_step = clamp_step(p.step, repeat_count);
            session.lock = GenerationLock::from_confirmed(p.generation_confirmed);
            persistence.restore(p.session_id.clone(), session.current_step);
            // Locked without a pitch: the job was lost with the previous session.
            let has_pitch = is_answered(snapshot.field(&config.result_field).as_ref());
            if session.lock.is_locked() && !has_pitch {
                session.generation_error = Some(INTERRUPTED_GENERATION.to_string());
            }
        }

        info!(
            "[PHASE: initialization] [STEP: mount] [SESSION: {}] Wizard mounted at step {}/{} (examples={}, locked={})",
            mask_identity(persistence.session_id().as_deref()),
            session.current_step,
            session.total_steps(),
            repeat_count,
            session.lock.is_locked()
        );

        let generation = Arc::new(GenerationOrchestrator::new(
            services.generator.clone(),
            config.poll_interval(),
            config.max_poll_attempts,
        ));

        Ok(Self {
            gate: ValidationGate::new(services.fields.clone(), services.validator.clone()),
            session: Arc::new(Mutex::new(session)),
            snapshot,
            persistence,
            generation,
            feedback: FeedbackGate::new(),
            drafts: services.drafts,
            buffers: services.buffers,
            notices: services.notices,
            nav_lock: tokio::sync::Mutex::new(()),
            edit_lock: Mutex::new(()),
            liveness: CancellationToken::new(),
            generation_task: Mutex::new(None),
            config,
        })
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    pub async fn go_next(&self) -> WizardResult<NavOutcome> {
        let _nav = self.nav_lock.lock().await;
        self.ensure_live()?;
        self.flush().await;

        let (step, repeat_count, locked, prompt_open) = {
            let s = self.session();
            (
                s.current_step,
                s.repeat_count,
                s.lock.is_locked(),
                s.confirmation_pending,
            )
        };
        if prompt_open {
            return Ok(NavOutcome::ConfirmationRequired);
        }
        if step >= terminal_step(repeat_count) {
            return Ok(NavOutcome::Unchanged);
        }

        let outcome = self
            .snapshot
            .with(|value| self.gate.validate(step, repeat_count, value));
        if !outcome.passed {
            return Err(self.surface(WizardError::ValidationFailed {
                failed_fields: outcome.failed_field_paths,
            }));
        }

        if is_boundary_step(step, repeat_count) && !locked {
            self.session().confirmation_pending = true;
            info!(
                "[PHASE: navigation] [STEP: boundary] Step {} passed validation, asking for generation confirmation",
                step
            );
            return Ok(NavOutcome::ConfirmationRequired);
        }

        let to = step + 1;
        self.session().current_step = to;
        self.persistence.save_in_background(to);
        info!("[PHASE: navigation] [STEP: next] {} -> {}", step, to);
        Ok(NavOutcome::Moved { from: step, to })
    }

    pub async fn go_back(&self) -> WizardResult<NavOutcome> {
        let _nav = self.nav_lock.lock().await;
        self.ensure_live()?;

        let lock = self.session().lock;
        lock.guard_back().map_err(|e| self.surface(e))?;
        self.flush().await;

        let (from, to) = {
            let mut s = self.session();
            let from = s.current_step;
            s.current_step = from.saturating_sub(1).max(1);
            s.confirmation_pending = false;
            (from, s.current_step)
        };
        if from == to {
            return Ok(NavOutcome::Unchanged);
        }

        self.persistence.schedule_autosave(to);
        info!("[PHASE: navigation] [STEP: back] {} -> {}", from, to);
        Ok(NavOutcome::Moved { from, to })
    }

    /// Move to the first step of `target`. Only sections already reached are allowed,
    /// and only the review section once generation is confirmed.
    pub async fn jump_to_section(&self, target: Section) -> WizardResult<NavOutcome> {
        let _nav = self.nav_lock.lock().await;
        self.ensure_live()?;

        let lock = self.session().lock;
        lock.guard_jump(target).map_err(|e| self.surface(e))?;
        self.flush().await;

        let (from, repeat_count) = {
            let s = self.session();
            (s.current_step, s.repeat_count)
        };
        let to = first_step_of(target, repeat_count);
        if to > from && !lock.is_locked() {
            info!(
                "[PHASE: navigation] [STEP: jump] Refused forward jump to {} (step {} > {})",
                target.as_str(),
                to,
                from
            );
            return Err(WizardError::ForwardJumpNotAllowed { target });
        }
        if to == from {
            return Ok(NavOutcome::Unchanged);
        }

        {
            let mut s = self.session();
            s.current_step = to;
            s.confirmation_pending = false;
        }
        self.persistence.save_in_background(to);
        info!(
            "[PHASE: navigation] [STEP: jump] {} -> {} ({})",
            from,
            to,
            target.as_str()
        );
        Ok(NavOutcome::Moved { from, to })
    }

    /// Change the number of STAR examples. Returns the new total step count.
    pub async fn set_repeat_count(&self, repeat_count: u32) -> WizardResult<u32> {
        let _nav = self.nav_lock.lock().await;
        self.ensure_live()?;

        let lock = self.session().lock;
        lock.guard_edit().map_err(|e| self.surface(e))?;
        check_repeat_count(&self.config, repeat_count)?;

        let (before, step) = {
            let mut s = self.session();
            let before = s.repeat_count;
            s.repeat_count = repeat_count;
            s.current_step = clamp_step(s.current_step, repeat_count);
            s.confirmation_pending = false;
            (before, s.current_step)
        };

        self.persistence.schedule_autosave(step);
        info!(
            "[PHASE: navigation] [STEP: repeat_count] Examples {} -> {}, total steps {}",
            before,
            repeat_count,
            total_steps(repeat_count)
        );
        Ok(total_steps(repeat_count))
    }

    /// Apply a user edit to the snapshot and restart the autosave clock.
    ///
    /// `edit` runs while the snapshot is held: it may read controller state but must not
    /// touch the snapshot handle itself. Any edit closes an open generation prompt, so the
    /// boundary step is validated again before the job can start.
    pub fn edit_form(&self, edit: impl FnOnce(&mut Value)) -> WizardResult<u64> {
        self.ensure_live()?;
        let _edit = self.edit_lock.lock().unwrap_or_else(|e| e.into_inner());

        let lock = self.session().lock;
        lock.guard_edit().map_err(|e| self.surface(e))?;
        let revision = self.snapshot.update(edit);

        let step = {
            let mut s = self.session();
            if s.confirmation_pending {
                s.confirmation_pending = false;
                info!("[PHASE: navigation] [STEP: edit] Form edited, generation prompt closed");
            }
            s.current_step
        };
        self.persistence.schedule_autosave(step);
        Ok(revision)
    }

    // ---------------------------------------------------------------------
    // Generation
    // ---------------------------------------------------------------------

    /// Accept the generation prompt: lock the form, move to review, start the job.
    pub async fn confirm_generation(&self) -> WizardResult<()> {
        let _nav = self.nav_lock.lock().await;
        self.ensure_live()?;
        self.flush().await;

        let (terminal, repeat_count) = {
            let _edit = self.edit_lock.lock().unwrap_or_else(|e| e.into_inner());
            let mut s = self.session();
            if !s.confirmation_pending {
                return Err(WizardError::ConfirmationNotPending);
            }
            // The flush above may have committed more input; the job gets exactly what passed.
            let (step, repeat_count) = (s.current_step, s.repeat_count);
            let outcome = self
                .snapshot
                .with(|value| self.gate.validate(step, repeat_count, value));
            if !outcome.passed {
                s.confirmation_pending = false;
                drop(s);
                return Err(self.surface(WizardError::ValidationFailed {
                    failed_fields: outcome.failed_field_paths,
                }));
            }
            self.generation.begin()?;
            s.lock.confirm()?;
            s.confirmation_pending = false;
            s.current_step = terminal_step(s.repeat_count);
            s.is_generating = true;
            s.generation_error = None;
            (s.current_step, s.repeat_count)
        };

        info!(
            "[PHASE: generation] [STEP: confirm] [SESSION: {}] Generation confirmed, form locked",
            mask_identity(self.persistence.session_id().as_deref())
        );
        self.persistence.save_in_background(terminal);
        self.spawn_generation(repeat_count);
        Ok(())
    }

    pub async fn dismiss_confirmation(&self) -> WizardResult<()> {
        let _nav = self.nav_lock.lock().await;
        let mut s = self.session();
        if !s.confirmation_pending {
            return Err(WizardError::ConfirmationNotPending);
        }
        s.confirmation_pending = false;
        info!("[PHASE: generation] [STEP: confirm] Generation prompt dismissed");
        Ok(())
    }

    /// Re-trigger after a failure or timeout. The lock stays as it is.
    pub async fn retry_generation(&self) -> WizardResult<()> {
        let _nav = self.nav_lock.lock().await;
        self.ensure_live()?;

        let repeat_count = {
            let mut s = self.session();
            if !s.lock.is_locked() {
                return Err(WizardError::ConfirmationNotPending);
            }
            if s.is_generating || s.generation_error.is_none() {
                return Err(WizardError::GenerationAlreadyStarted);
            }
            self.generation.begin()?;
            s.generation_error = None;
            s.is_generating = true;
            s.repeat_count
        };

        info!("[PHASE: generation] [STEP: retry] Retrying pitch generation");
        self.spawn_generation(repeat_count);
        Ok(())
    }

    /// Wait for the running generation task, if any, and return where it ended.
    pub async fn wait_for_generation(&self) -> GenerationState {
        let handle = self
            .generation_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(
                    "[PHASE: generation] [STEP: task] Generation task ended abnormally: {}",
                    e
                );
            }
        }
        self.generation.state()
    }

    fn spawn_generation(&self, repeat_count: u32) {
        let request = GenerationTriggerRequest::from_snapshot(self.snapshot.read().0, repeat_count);
        let task = GenerationTask {
            generation: self.generation.clone(),
            session: self.session.clone(),
            snapshot: self.snapshot.clone(),
            persistence: self.persistence.clone(),
            notices: self.notices.clone(),
            result_field: self.config.result_field.clone(),
            token: self.liveness.child_token(),
        };
        let handle = tokio::spawn(task.run(request));
        *self
            .generation_task
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    // ---------------------------------------------------------------------
    // Exit paths
    // ---------------------------------------------------------------------

    /// Save if anything changed, then exit. A failed save keeps the user here.
    pub async fn save_and_close(&self, on_exit: ExitHandler) -> WizardResult<ExitReason> {
        let _nav = self.nav_lock.lock().await;
        self.ensure_live()?;
        // The record is final and the rating prompt holds the exit.
        if self.feedback.is_open() {
            return Err(WizardError::FeedbackPending);
        }
        self.flush().await;

        let step = self.session().current_step;
        let reason = if self.persistence.is_dirty(step) {
            self.persistence.save_now(step).await?;
            ExitReason::DraftSaved
        } else {
            ExitReason::Closed
        };

        info!(
            "[PHASE: navigation] [STEP: close] [SESSION: {}] Leaving wizard at step {} ({:?})",
            mask_identity(self.persistence.session_id().as_deref()),
            step,
            reason
        );
        self.shutdown();
        on_exit(reason);
        Ok(reason)
    }

    /// Final save. On success the exit is held by the rating prompt.
    pub async fn submit_final(&self, on_exit: ExitHandler) -> WizardResult<SubmitOutcome> {
        let _nav = self.nav_lock.lock().await;
        self.ensure_live()?;
        if self.feedback.is_open() {
            return Ok(SubmitOutcome::FeedbackRequested);
        }
        self.flush().await;

        let (step, generating, failed) = {
            let s = self.session();
            (s.current_step, s.is_generating, s.generation_error.is_some())
        };

        if failed {
            self.persistence.save_now(step).await?;
            info!(
                "[PHASE: navigation] [STEP: submit] Generation failed, leaving record as a draft"
            );
            self.shutdown();
            on_exit(ExitReason::DraftSaved);
            return Ok(SubmitOutcome::DraftSaved);
        }
        if generating || !self.has_result() {
            return Err(WizardError::PitchNotReady);
        }

        let id = self.persistence.submit_final(step).await?;
        let exit = self.feedback.substitute(id, on_exit);
        exit(ExitReason::Completed);
        Ok(SubmitOutcome::FeedbackRequested)
    }

    pub async fn submit_feedback(&self, rating: u8, reason: Option<Value>) -> WizardResult<()> {
        let _nav = self.nav_lock.lock().await;
        self.ensure_live()?;
        if !self.feedback.is_open() {
            return Err(WizardError::FeedbackNotPending);
        }
        if !(1..=5).contains(&rating) {
            return Err(WizardError::InvalidRating(rating));
        }
        if rating <= self.config.low_rating_threshold && !is_answered(reason.as_ref()) {
            return Err(WizardError::FeedbackReasonRequired { rating });
        }

        self.feedback
            .submit(self.drafts.as_ref(), rating, reason.as_ref())
            .await?;
        self.shutdown();
        Ok(())
    }

    pub async fn dismiss_feedback(&self) -> WizardResult<()> {
        let _nav = self.nav_lock.lock().await;
        self.ensure_live()?;
        self.feedback.dismiss()?;
        self.shutdown();
        Ok(())
    }

    /// Stop polling and pending autosaves. Safe to call more than once.
    pub fn teardown(&self) {
        self.shutdown();
    }

    // ---------------------------------------------------------------------
    // Read projections
    // ---------------------------------------------------------------------

    pub fn descriptor(&self) -> StepDescriptor {
        let s = self.session();
        describe_step(s.current_step, s.repeat_count)
    }

    pub fn current_step(&self) -> u32 {
        self.session().current_step
    }

    pub fn repeat_count(&self) -> u32 {
        self.session().repeat_count
    }

    pub fn total_steps(&self) -> u32 {
        self.session().total_steps()
    }

    pub fn pointer(&self) -> SessionPointer {
        let s = self.session();
        SessionPointer {
            session_id: self.persistence.session_id(),
            step: s.current_step,
            repeat_count: s.repeat_count,
            generation_confirmed: s.lock.is_locked(),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.session().lock.is_locked()
    }

    pub fn is_generating(&self) -> bool {
        self.session().is_generating
    }

    pub fn generation_error(&self) -> Option<String> {
        self.session().generation_error.clone()
    }

    pub fn confirmation_pending(&self) -> bool {
        self.session().confirmation_pending
    }

    pub fn feedback_pending(&self) -> bool {
        self.feedback.is_open()
    }

    pub fn generation_state(&self) -> GenerationState {
        self.generation.state()
    }

    pub fn session_id(&self) -> Option<String> {
        self.persistence.session_id()
    }

    pub fn snapshot(&self) -> SnapshotHandle {
        self.snapshot.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.liveness.is_cancelled()
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    async fn flush(&self) {
        let grace = self.config.flush_grace();
        if tokio::time::timeout(grace, self.buffers.flush()).await.is_err() {
            warn!(
                "[PHASE: navigation] [STEP: flush] Input buffers did not flush within {}ms, continuing",
                self.config.flush_grace_ms
            );
            self.notify(Notice::FlushTimedOut {
                grace_ms: self.config.flush_grace_ms,
            });
        }
    }

    fn has_result(&self) -> bool {
        is_answered(self.snapshot.field(&self.config.result_field).as_ref())
    }

    fn ensure_live(&self) -> WizardResult<()> {
        if self.liveness.is_cancelled() {
            return Err(WizardError::SessionClosed);
        }
        Ok(())
    }

    /// Turn a refusal into the matching notice before returning it.
    fn surface(&self, err: WizardError) -> WizardError {
        match &err {
            WizardError::NavigationLocked { reason } => {
                info!("[PHASE: navigation] [STEP: locked] {}", reason);
                self.notify(Notice::NavigationLocked {
                    reason: reason.clone(),
                });
            }
            WizardError::ValidationFailed { failed_fields } => {
                info!(
                    "[PHASE: navigation] [STEP: validate] {} field(s) failed: {}",
                    failed_fields.len(),
                    failed_fields.join(", ")
                );
                self.notify(Notice::ValidationFailed {
                    failed_fields: failed_fields.clone(),
                });
            }
            _ => {}
        }
        err
    }

    fn notify(&self, notice: Notice) {
        debug!(
            "[PHASE: navigation] [STEP: notice] {} notice: {:?}",
            notice.severity(),
            notice
        );
        (self.notices)(notice);
    }

    fn shutdown(&self) {
        if !self.liveness.is_cancelled() {
            info!("[PHASE: navigation] [STEP: teardown] Session closed");
        }
        self.liveness.cancel();
        self.persistence.cancel_pending();
    }

    fn session(&self) -> MutexGuard<'_, WizardSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for WizardController {
    fn drop(&mut self) {
        self.liveness.cancel();
        self.persistence.cancel_pending();
    }
}

fn check_repeat_count(config: &WizardConfig, repeat_count: u32) -> WizardResult<()> {
    if !(config.min_repeat_count..=config.max_repeat_count).contains(&repeat_count) {
        return Err(WizardError::InvalidRepeatCount {
            requested: repeat_count,
            min: config.min_repeat_count,
            max: config.max_repeat_count,
        });
    }
    Ok(())
}

/// Everything the spawned generation task needs, detached from the controller's lifetime.
struct GenerationTask {
    generation: Arc<GenerationOrchestrator>,
    session: Arc<Mutex<WizardSession>>,
    snapshot: SnapshotHandle,
    persistence: PersistenceManager,
    notices: NoticeEmitter,
    result_field: String,
    token: CancellationToken,
}

impl GenerationTask {
    async fn run(self, request: GenerationTriggerRequest) {
        let outcome = self.generation.run(request, &self.token).await;

        let step = {
            let mut s = self.session.lock().unwrap_or_else(|e| e.into_inner());
            // Checked under the session lock: nothing is written back once the session is gone.
            if self.token.is_cancelled() || outcome == GenerationOutcome::Cancelled {
                return;
            }
            s.is_generating = false;
            let failure = match &outcome {
                GenerationOutcome::Succeeded(text) => {
                    self.snapshot
                        .set_field(&self.result_field, Value::String(text.clone()));
                    None
                }
                GenerationOutcome::Failed(message) => {
                    Some(WizardError::GenerationFailed(message.clone()))
                }
                GenerationOutcome::TimedOut { attempts } => {
                    Some(WizardError::GenerationTimedOut {
                        attempts: *attempts,
                    })
                }
                GenerationOutcome::Cancelled => None,
            };
            // Failed and timed out read the same to the user; the log keeps them apart.
            if let Some(err) = &failure {
                error!("[PHASE: generation] [STEP: result] {}", err);
            }
            s.generation_error = failure.map(|err| err.user_message());
            s.current_step
        };

        let notice = match outcome {
            GenerationOutcome::Succeeded(_) => {
                self.persistence.autosave_while_live(step, &self.token).await;
                return;
            }
            GenerationOutcome::Failed(message) => Notice::GenerationFailed { message },
            GenerationOutcome::TimedOut { attempts } => Notice::GenerationTimedOut { attempts },
            GenerationOutcome::Cancelled => return,
        };
        debug!(
            "[PHASE: generation] [STEP: notice] {} notice: {:?}",
            notice.severity(),
            notice
        );
        (self.notices)(notice);
    }
}
