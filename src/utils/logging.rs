// Logging utilities
// Structured logging with JSON and human-readable formats.
//
// Log lines carry bracketed tags, e.g.
//   [PHASE: generation] [STEP: poll] [SESSION: 3f2a...] status check 4/20 pending
// The tags are lifted out into structured fields by `parse_log_metadata`.

use log::Level;
use serde_json::json;

/// Tags recognised in log messages, lifted into their own fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogMetadata {
    pub phase: Option<String>,
    pub step: Option<String>,
    pub session: Option<String>,
    pub message: String,
}

/// Mask sensitive data in logs
pub fn mask_sensitive(input: &str) -> String {
    if input.chars().count() <= 8 {
        return "***".to_string();
    }

    let chars: Vec<char> = input.chars().collect();
    let start: String = chars[..4].iter().collect();
    let end: String = chars[chars.len() - 4..].iter().collect();

    format!("{}...{}", start, end)
}

/// Shorten a record identity for log lines (enough to correlate, not enough to look up).
pub fn mask_identity(id: Option<&str>) -> String {
    match id.map(str::trim).filter(|s| !s.is_empty()) {
        None => "<new>".to_string(),
        Some(s) if s.chars().count() <= 8 => s.to_string(),
        Some(s) => {
            let head: String = s.chars().take(8).collect();
            format!("{}…", head)
        }
    }
}

/// Remove the first `[TAG: value]` from `message`, returning the value.
fn extract_tag(message: &mut String, tag: &str) -> Option<String> {
    let open = format!("[{}:", tag);
    let start = message.find(&open)?;
    let end = start + message[start..].find(']')?;
    let value = message[start + open.len()..end].trim().to_string();
    *message = format!("{} {}", &message[..start], &message[end + 1..])
        .trim()
        .to_string();
    Some(value)
}

/// Parse phase, step and session tags from a log message.
pub fn parse_log_metadata(message: &str) -> LogMetadata {
    let mut cleaned = message.to_string();
    let phase = extract_tag(&mut cleaned, "PHASE");
    let step = extract_tag(&mut cleaned, "STEP");
    let session = extract_tag(&mut cleaned, "SESSION");
    LogMetadata {
        phase,
        step,
        session,
        message: cleaned.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Format log entry as JSON for structured logging
pub fn format_json_log(timestamp: &str, level: Level, target: &str, meta: &LogMetadata) -> String {
    let mut log_entry = json!({
        "timestamp": timestamp,
        "level": level.as_str(),
        "target": target,
        "message": meta.message,
    });

    if let Some(phase) = &meta.phase {
        log_entry["phase"] = json!(phase);
    }

    if let Some(step) = &meta.step {
        log_entry["step"] = json!(step);
    }

    if let Some(session) = &meta.session {
        log_entry["session"] = json!(session);
    }

    serde_json::to_string(&log_entry).unwrap_or_else(|_| "{}".to_string())
}

/// Format log entry as human-readable text
pub fn format_human_readable_log(
    timestamp: &str,
    level: Level,
    target: &str,
    meta: &LogMetadata,
) -> String {
    let mut log_line = format!("[{}] [{}]", timestamp, level.as_str());

    if let Some(phase) = &meta.phase {
        log_line.push_str(&format!(" [PHASE: {}]", phase));
    }

    if let Some(step) = &meta.step {
        log_line.push_str(&format!(" [STEP: {}]", step));
    }

    if let Some(session) = &meta.session {
        log_line.push_str(&format!(" [SESSION: {}]", session));
    }

    log_line.push_str(&format!(" [{}] {}", target, meta.message));
    log_line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_extracts_all_tags() {
        let meta = parse_log_metadata(
            "[PHASE: generation] [STEP: poll] [SESSION: abc123] status check 3/20 pending",
        );
        assert_eq!(meta.phase.as_deref(), Some("generation"));
        assert_eq!(meta.step.as_deref(), Some("poll"));
        assert_eq!(meta.session.as_deref(), Some("abc123"));
        assert_eq!(meta.message, "status check 3/20 pending");
    }

    #[test]
    fn parse_leaves_untagged_messages_alone() {
        let meta = parse_log_metadata("plain message");
        assert_eq!(meta.phase, None);
        assert_eq!(meta.step, None);
        assert_eq!(meta.message, "plain message");
    }

    #[test]
    fn parse_handles_tags_out_of_order() {
        let meta = parse_log_metadata("[STEP: save] draft saved [PHASE: persistence]");
        assert_eq!(meta.phase.as_deref(), Some("persistence"));
        assert_eq!(meta.step.as_deref(), Some("save"));
        assert_eq!(meta.message, "draft saved");
    }

    #[test]
    fn json_log_includes_tags_only_when_present() {
        let meta = parse_log_metadata("[PHASE: navigation] moved to step 6");
        let line = format_json_log("2026-01-01T00:00:00Z", Level::Info, "pitch_wizard", &meta);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["phase"], "navigation");
        assert_eq!(parsed["message"], "moved to step 6");
        assert!(parsed.get("step").is_none());
        assert!(parsed.get("session").is_none());
    }

    #[test]
    fn human_readable_log_keeps_tag_order() {
        let meta = parse_log_metadata("[SESSION: s1] [STEP: trigger] [PHASE: generation] started");
        let line = format_human_readable_log("12:00:00", Level::Warn, "t", &meta);
        assert_eq!(
            line,
            "[12:00:00] [WARN] [PHASE: generation] [STEP: trigger] [SESSION: s1] [t] started"
        );
    }

    #[test]
    fn mask_sensitive_short_values_fully_masked() {
        assert_eq!(mask_sensitive("abc"), "***");
        assert_eq!(mask_sensitive("12345678"), "***");
    }

    #[test]
    fn mask_sensitive_long_values_partially_masked() {
        let masked = mask_sensitive("pl_4c3ed9b8d7381ef8");
        assert!(masked.starts_with("pl_4"), "{}", masked);
        assert!(masked.ends_with("1ef8"), "{}", masked);
        assert!(!masked.contains("d9b8d7"), "{}", masked);
    }

    #[test]
    fn mask_identity_shortens_long_ids() {
        assert_eq!(mask_identity(None), "<new>");
        assert_eq!(mask_identity(Some("  ")), "<new>");
        assert_eq!(mask_identity(Some("abc")), "abc");
        assert_eq!(
            mask_identity(Some("0f6c2d8e-1a2b-4c3d-8e9f-001122334455")),
            "0f6c2d8e…"
        );
    }
}
