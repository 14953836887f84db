// Pitch intake wizard core.
//
// `wizard::navigation::WizardController` is the entry point; everything else is a component
// it drives (step mapping, validation, persistence, generation, lock, feedback) or a
// collaborator it talks to (`api`).

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod smoke;
pub mod utils;
pub mod wizard;

use log::{error, info};

pub use config::WizardConfig;
pub use error::{BackendError, WizardError, WizardResult};
pub use models::session::SessionPointer;
pub use models::snapshot::SnapshotHandle;
pub use wizard::navigation::{
    ExitHandler, ExitReason, NavOutcome, SubmitOutcome, WizardController, WizardServices,
};
pub use wizard::steps::{describe_step, Section, StepDescriptor};

/// Initialize logging (JSON `.log` + human-readable `.txt` in the log folder, optional stdout).
pub fn init_logging(with_stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = utils::path_resolver::resolve_log_folder()?;
    std::fs::create_dir_all(&log_dir)?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");
    let json_log_file = log_dir.join(format!("pitch-wizard-{}.log", timestamp));
    let txt_log_file = log_dir.join(format!("pitch-wizard-{}.txt", timestamp));

    let mut dispatch = fern::Dispatch::new().level(log::LevelFilter::Debug);

    if with_stdout {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .level(log::LevelFilter::Info)
                .format(|out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let meta = utils::logging::parse_log_metadata(&message.to_string());
                    out.finish(format_args!(
                        "{}",
                        utils::logging::format_human_readable_log(
                            &timestamp_local.to_string(),
                            record.level(),
                            record.target(),
                            &meta,
                        )
                    ));
                })
                .chain(std::io::stdout()),
        );
    }

    dispatch = dispatch
        .chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    let timestamp_utc = chrono::Utc::now().to_rfc3339();
                    let meta = utils::logging::parse_log_metadata(&message.to_string());
                    out.finish(format_args!(
                        "{}\n",
                        utils::logging::format_json_log(
                            &timestamp_utc,
                            record.level(),
                            record.target(),
                            &meta,
                        )
                    ));
                })
                .chain(fern::log_file(json_log_file)?),
        )
        .chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let meta = utils::logging::parse_log_metadata(&message.to_string());
                    out.finish(format_args!(
                        "{}\n",
                        utils::logging::format_human_readable_log(
                            &timestamp_local.to_string(),
                            record.level(),
                            record.target(),
                            &meta,
                        )
                    ));
                })
                .chain(fern::log_file(txt_log_file)?),
        );

    dispatch.apply()?;

    info!(
        "[PHASE: initialization] Logging initialized, log directory: {:?}",
        log_dir
    );
    Ok(())
}

/// End-to-end wizard smoke against the in-memory backend.
/// Writes `wizard_smoke_transcript.log` under the log folder and exits 0/1.
pub fn run_wizard_smoke() {
    if let Err(e) = init_logging(true) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "[PHASE: smoke] [STEP: start] Wizard smoke starting at {}",
        chrono::Utc::now()
    );

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build();
    let result = match rt {
        Ok(rt) => rt.block_on(smoke::wizard_smoke()),
        Err(e) => Err(anyhow::anyhow!(
            "Failed to create async runtime for wizard smoke: {}",
            e
        )),
    };

    match result {
        Ok(transcript) => {
            info!(
                "[PHASE: smoke] [STEP: done] Wizard smoke passed, transcript: {:?}",
                transcript
            );
            println!("Wizard smoke passed: {}", transcript.display());
        }
        Err(e) => {
            error!(
                "[PHASE: smoke] [STEP: failed] Wizard smoke exited with error: {:?}",
                e
            );
            eprintln!("Wizard smoke failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print the effective configuration (defaults, file, environment) as TOML.
pub fn run_print_config() {
    let printed = WizardConfig::load()
        .map_err(anyhow::Error::from)
        .and_then(|cfg| toml::to_string_pretty(&cfg).map_err(anyhow::Error::from));
    match printed {
        Ok(text) => print!("{}", text),
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}
