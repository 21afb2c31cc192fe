use colored::*;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::policy::VerdictStatus;
use crate::report::ReportLine;

static MACHINE_LOG: AtomicBool = AtomicBool::new(false);

pub fn init_logging() {
    // Internal logs are opt-in via RUST_LOG. Gate output goes through the helpers below.
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var("RUST_LOG").is_err() {
        builder.filter_level(log::LevelFilter::Warn);
    }
    let _ = builder.try_init();
}

/// Mirror every event to stderr as one JSON object per line.
pub fn set_machine_log(enabled: bool) {
    MACHINE_LOG.store(enabled, Ordering::Relaxed);
}

fn machine_log_enabled() -> bool {
    MACHINE_LOG.load(Ordering::Relaxed)
}

fn machine_event(kind: &str, data: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "kind": kind,
        "data": data,
    })
}

fn emit_machine_event(kind: &str, data: serde_json::Value) {
    if !machine_log_enabled() {
        return;
    }
    if let Ok(line) = serde_json::to_string(&machine_event(kind, data)) {
        eprintln!("{line}");
    }
}

pub fn info(msg: impl AsRef<str>) {
    let raw = msg.as_ref();
    println!("{raw}");
    emit_machine_event("info", serde_json::json!({ "message": raw }));
}

pub fn warn(msg: impl AsRef<str>) {
    let raw = msg.as_ref();
    eprintln!("{}", raw.yellow());
    emit_machine_event("warn", serde_json::json!({ "message": raw }));
}

pub fn error(msg: impl AsRef<str>) {
    let raw = msg.as_ref();
    eprintln!("{} {}", "✗".red().bold(), raw.red());
    emit_machine_event("error", serde_json::json!({ "message": raw }));
}

pub fn poll_status(status: &str) {
    println!("  {}", format!("status={status}").dimmed());
    emit_machine_event("poll", serde_json::json!({ "status": status }));
}

pub fn section_title(title: &str) {
    println!("\n{}", title.bold());
}

pub fn report_line(line: &ReportLine) {
    let text = match line.status {
        VerdictStatus::Pass => line.text.green(),
        VerdictStatus::Fail => line.text.red(),
        VerdictStatus::Info => line.text.dimmed(),
    };
    println!("{text}");
    emit_machine_event(
        "criterion",
        serde_json::json!({ "status": line.status, "line": line.text.trim() }),
    );
}

pub fn failure_list(failures: &[String]) {
    println!("\n{}", "Evaluation gate FAILED:".red().bold());
    for msg in failures {
        println!("   - {}", msg.red());
    }
    emit_machine_event("gate_failed", serde_json::json!({ "failures": failures }));
}

pub fn gate_passed() {
    println!("\n{}", "All evaluation thresholds passed.".green().bold());
    emit_machine_event("gate_passed", serde_json::json!({}));
}
