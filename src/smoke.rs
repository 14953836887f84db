// Wizard smoke
//
// Drives one complete session against the in-memory backend: fill the form, walk every step,
// confirm generation, wait out one pending poll, submit, rate. Each checkpoint is written to
// `wizard_smoke_transcript.log` so a failed run shows how far it got.

use anyhow::{bail, ensure, Context, Result};
use log::info;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::memory::InMemoryBackend;
use crate::config::WizardConfig;
use crate::models::notice::{Notice, NoticeEmitter};
use crate::models::requests::DraftStatus;
use crate::models::snapshot::SnapshotHandle;
use crate::utils::path_resolver::resolve_log_folder;
use crate::wizard::generation::GenerationState;
use crate::wizard::navigation::{
    ExitHandler, ExitReason, NavOutcome, SubmitOutcome, WizardController, WizardServices,
};
use crate::wizard::steps::total_steps;

pub const TRANSCRIPT_FILE: &str = "wizard_smoke_transcript.log";

const SMOKE_PITCH: &str = "I am applying for the Data Analyst role because I turn fragmented \
data into decisions people trust.";

/// A fully answered form with `repeat_count` STAR examples.
pub fn sample_answers(repeat_count: u32) -> Value {
    let examples: Vec<Value> = (0..repeat_count)
        .map(|i| {
            json!({
                "situation": {
                    "where-and-when-did-this-experience-occur": format!("Project {} (2023)", i + 1),
                    "briefly-describe-the-situation-or-challenge-you-faced": "Reporting took two weeks per cycle"
                },
                "task": {
                    "what-was-your-responsibility-in-addressing-this-issue": "Own the reporting pipeline",
                    "what-constraints-or-requirements-did-you-need-to-consider": "No new budget"
                },
                "action": {
                    "steps": [
                        { "what-did-you-do": "Automated the extract", "how-did-you-do-it": "Scheduled SQL jobs" }
                    ]
                },
                "result": {
                    "what-positive-outcome-did-you-achieve": "Cycle time down to two days",
                    "how-did-this-outcome-benefit-your-team-stakeholders-or-organization": "Faster decisions"
                }
            })
        })
        .collect();

    json!({
        "roleName": "Data Analyst",
        "roleLevel": "APS 6",
        "pitchWordLimit": 500,
        "roleDescription": "Analyse program data and brief executives.",
        "relevantExperience": "Six years in public sector analytics.",
        "guidance": { "acknowledged": true },
        "starExamples": examples
    })
}

/// Run the smoke flow and return the transcript path.
pub async fn wizard_smoke() -> Result<PathBuf> {
    let log_dir = resolve_log_folder()?;
    let transcript_path = log_dir.join(TRANSCRIPT_FILE);

    let mut transcript = Vec::new();
    let result = run_flow(&mut transcript).await;
    match &result {
        Ok(()) => transcript.push("RESULT: PASS".to_string()),
        Err(e) => transcript.push(format!("RESULT: FAIL ({:#})", e)),
    }

    std::fs::write(&transcript_path, transcript.join("\n") + "\n")
        .with_context(|| format!("Failed to write {:?}", transcript_path))?;
    info!(
        "[PHASE: smoke] [STEP: transcript] Wrote {} lines to {:?}",
        transcript.len(),
        transcript_path
    );

    result.map(|_| transcript_path)
}

async fn run_flow(transcript: &mut Vec<String>) -> Result<()> {
    let repeat_count = 2;
    let backend = Arc::new(InMemoryBackend::completes_after(1, SMOKE_PITCH));
    let config = WizardConfig {
        autosave_debounce_ms: 50,
        flush_grace_ms: 50,
        poll_interval_ms: 50,
        max_poll_attempts: 10,
        default_repeat_count: repeat_count,
        ..WizardConfig::default()
    };

    let notices = Arc::new(Mutex::new(Vec::<Notice>::new()));
    let sink = notices.clone();
    let emitter: NoticeEmitter = Arc::new(move |notice: Notice| {
        sink.lock().unwrap_or_else(|e| e.into_inner()).push(notice);
    });

    let services = WizardServices::new(backend.clone(), backend.clone()).with_notices(emitter);
    let wizard = WizardController::mount(config, services, SnapshotHandle::new(json!({})), None)?;
    transcript.push(format!(
        "mount: step={} total={} header={:?}",
        wizard.current_step(),
        wizard.total_steps(),
        wizard.descriptor().header
    ));
    ensure!(
        wizard.total_steps() == total_steps(repeat_count),
        "unexpected step count"
    );

    wizard.edit_form(|form| *form = sample_answers(repeat_count))?;
    transcript.push("edit: form filled".to_string());

    loop {
        match wizard.go_next().await? {
            NavOutcome::Moved { from, to } => {
                transcript.push(format!(
                    "next: {} -> {} ({})",
                    from,
                    to,
                    wizard.descriptor().header
                ));
            }
            NavOutcome::ConfirmationRequired => {
                transcript.push(format!(
                    "next: confirmation required at step {}",
                    wizard.current_step()
                ));
                break;
            }
            NavOutcome::Unchanged => bail!("wizard stopped before the boundary step"),
        }
    }

    wizard.confirm_generation().await?;
    transcript.push(format!(
        "confirm: locked={} step={} generating={}",
        wizard.is_locked(),
        wizard.current_step(),
        wizard.is_generating()
    ));
    ensure!(wizard.is_locked(), "form should be locked after confirmation");

    let back_refused = wizard.go_back().await.is_err();
    transcript.push(format!("back while locked: refused={}", back_refused));
    ensure!(back_refused, "back navigation must be refused while locked");

    let state = wizard.wait_for_generation().await;
    let status_calls = InMemoryBackend::count(&backend.status_calls);
    transcript.push(format!(
        "generation: state={:?} status_checks={}",
        state, status_calls
    ));
    ensure!(state == GenerationState::Succeeded, "generation did not succeed");
    ensure!(status_calls == 2, "expected 2 status checks, got {}", status_calls);

    let exited = Arc::new(Mutex::new(None::<ExitReason>));
    let exit_slot = exited.clone();
    let on_exit: ExitHandler = Box::new(move |reason: ExitReason| {
        *exit_slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(reason);
    });

    let outcome = wizard.submit_final(on_exit).await?;
    let exit_before_rating = *exited.lock().unwrap_or_else(|e| e.into_inner());
    transcript.push(format!(
        "submit: outcome={:?} exit_before_rating={:?}",
        outcome, exit_before_rating
    ));
    ensure!(
        outcome == SubmitOutcome::FeedbackRequested && exit_before_rating.is_none(),
        "final submit should hold the exit for the rating prompt"
    );

    wizard.submit_feedback(4, None).await?;
    let exit_after_rating = *exited.lock().unwrap_or_else(|e| e.into_inner());
    transcript.push(format!("feedback: rating=4 exit={:?}", exit_after_rating));
    ensure!(
        exit_after_rating == Some(ExitReason::Completed),
        "exit did not run after rating"
    );

    let id = wizard
        .session_id()
        .context("session never received a record id")?;
    let record = backend
        .draft(&id)
        .with_context(|| format!("record {} missing from store", id))?;
    transcript.push(format!(
        "record: status={:?} rating={:?} saves={} creates={}",
        record.status,
        record.rating,
        InMemoryBackend::count(&backend.save_calls),
        InMemoryBackend::count(&backend.create_calls)
    ));
    ensure!(record.status == DraftStatus::Final, "record not final");
    ensure!(record.rating == Some(4), "rating not stored");
    ensure!(
        InMemoryBackend::count(&backend.create_calls) == 1,
        "more than one record was created"
    );

    let notice_count = notices.lock().unwrap_or_else(|e| e.into_inner()).len();
    transcript.push(format!("notices: {}", notice_count));
    Ok(())
}
