fn main() {
    let args: Vec<String> = std::env::args().collect();

    // End-to-end wizard smoke against the in-memory backend.
    // Writes `wizard_smoke_transcript.log` under `Pitch_Wizard_Log/` and exits 0/1.
    if args.iter().any(|a| a == "--wizard-smoke") {
        pitch_wizard::run_wizard_smoke();
        return;
    }

    // Effective configuration (defaults + TOML file + PITCH_WIZARD__* env) as TOML.
    if args.iter().any(|a| a == "--print-config") {
        pitch_wizard::run_print_config();
        return;
    }

    eprintln!("Usage: pitch-wizard --wizard-smoke | --print-config");
    eprintln!();
    eprintln!("  --wizard-smoke   run one full wizard session against the in-memory backend");
    eprintln!("  --print-config   print the effective configuration");
    std::process::exit(2);
}
