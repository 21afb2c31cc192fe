use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::aggregate::PassRateSummary;
use crate::config_file::ThresholdConfig;
use crate::policy::{CriterionVerdict, Requirement, VerdictStatus, percent, verdicts};

/// One console line of the results block.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub status: VerdictStatus,
    pub text: String,
}

fn requirement_note(requirement: Requirement) -> String {
    match requirement {
        Requirement::Safety => "safety: must be 100%".to_string(),
        Requirement::Threshold(t) => format!("threshold: {}", percent(t)),
        Requirement::Informational => "no threshold configured".to_string(),
    }
}

fn console_line(v: &CriterionVerdict) -> ReportLine {
    ReportLine {
        status: v.status,
        text: format!(
            "  [{}] {}: {}  ({})",
            v.status.tag(),
            v.name,
            percent(v.rate),
            requirement_note(v.requirement)
        ),
    }
}

pub fn console_report(summary: &PassRateSummary, config: &ThresholdConfig) -> Vec<ReportLine> {
    verdicts(summary, config).iter().map(console_line).collect()
}

fn table_row(v: &CriterionVerdict) -> String {
    let threshold = match v.requirement {
        Requirement::Safety => "100% (safety)".to_string(),
        Requirement::Threshold(t) => percent(t),
        Requirement::Informational => "n/a".to_string(),
    };
    let icon = match v.status {
        VerdictStatus::Pass => "✅",
        VerdictStatus::Fail => "❌",
        VerdictStatus::Info => "ℹ️",
    };
    format!("| {} | {} | {} | {} |", v.name, percent(v.rate), threshold, icon)
}

/// Markdown table for the CI run summary, newline-terminated.
pub fn markdown_table(summary: &PassRateSummary, config: &ThresholdConfig) -> String {
    let mut lines = vec![
        "| Metric | Pass Rate | Threshold | Status |".to_string(),
        "|--------|-----------|-----------|--------|".to_string(),
    ];
    lines.extend(verdicts(summary, config).iter().map(table_row));
    lines.join("\n") + "\n"
}

pub fn report_link(url: &str) -> String {
    format!("[View full results]({url})\n\n")
}

/// Append-only sink for the CI step summary. Disabled when no path is configured.
#[derive(Debug, Clone, Default)]
pub struct StepSummary {
    path: Option<PathBuf>,
}

impl StepSummary {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn append(&self, text: &str) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::judge::{EvaluatorResult, OutputItem};
    use tempfile::TempDir;

    fn scenario() -> (PassRateSummary, ThresholdConfig) {
        // 10 rows: violence 10/10, coherence 7/10, task_adherence 3/10, groundedness 9/10
        let items: Vec<OutputItem> = (0..10)
            .map(|i| {
                OutputItem::new(vec![
                    EvaluatorResult::new("task_adherence", i < 3),
                    EvaluatorResult::new("violence_detection", true),
                    EvaluatorResult::new("coherence", i < 7),
                    EvaluatorResult::new("groundedness", i < 9),
                ])
            })
            .collect();
        let config: ThresholdConfig = serde_json::from_str(
            r#"{
                "safety_evaluators": ["violence_detection"],
                "pass_rate_thresholds": { "coherence": 0.8, "groundedness": 0.85 }
            }"#,
        )
        .unwrap();
        (aggregate(&items), config)
    }

    #[test]
    fn console_report_lines() {
        let (summary, config) = scenario();
        let text = console_report(&summary, &config)
            .into_iter()
            .map(|l| l.text.trim_start().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        insta::assert_snapshot!(text, @r"
        [FAIL] coherence: 70%  (threshold: 80%)
        [PASS] groundedness: 90%  (threshold: 85%)
        [INFO] task_adherence: 30%  (no threshold configured)
        [PASS] violence_detection: 100%  (safety: must be 100%)
        ");
    }

    #[test]
    fn console_report_statuses_follow_verdicts() {
        let (summary, config) = scenario();
        let statuses: Vec<VerdictStatus> = console_report(&summary, &config)
            .iter()
            .map(|l| l.status)
            .collect();
        assert_eq!(
            statuses,
            [
                VerdictStatus::Fail,
                VerdictStatus::Pass,
                VerdictStatus::Info,
                VerdictStatus::Pass
            ]
        );
    }

    #[test]
    fn markdown_table_rows() {
        let (summary, config) = scenario();
        let table = markdown_table(&summary, &config);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "| Metric | Pass Rate | Threshold | Status |");
        assert_eq!(lines[1], "|--------|-----------|-----------|--------|");
        assert_eq!(lines[2], "| coherence | 70% | 80% | ❌ |");
        assert_eq!(lines[3], "| groundedness | 90% | 85% | ✅ |");
        assert_eq!(lines[4], "| task_adherence | 30% | n/a | ℹ️ |");
        assert_eq!(lines[5], "| violence_detection | 100% | 100% (safety) | ✅ |");
        assert_eq!(lines.len(), 6);
        assert!(table.ends_with('\n'));
    }

    #[test]
    fn empty_summary_renders_header_only() {
        let table = markdown_table(&PassRateSummary::default(), &ThresholdConfig::default());
        assert_eq!(table.lines().count(), 2);
        let lines = console_report(&PassRateSummary::default(), &ThresholdConfig::default());
        assert!(lines.is_empty());
    }

    #[test]
    fn step_summary_appends_and_creates_parent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/summary.md");
        let sink = StepSummary::new(Some(path.clone()));
        sink.append("first\n").unwrap();
        sink.append(&report_link("https://portal/run")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\n[View full results](https://portal/run)\n\n");
    }

    #[test]
    fn disabled_step_summary_is_a_no_op() {
        let sink = StepSummary::disabled();
        assert!(sink.path().is_none());
        sink.append("ignored").unwrap();
    }
}
