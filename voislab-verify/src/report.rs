//! Run statistics, report rendering and user confirmation

use crate::error::{VerifyError, VerifyResult};
use crate::verifier::{Finding, FindingKind};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use voislab_common::config::Environment;

/// Counters for one verification pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub verified: usize,
    /// Number of findings (a record may contribute several)
    pub errors: usize,
    pub skipped: usize,
    pub corrected: usize,
    pub backed_up: usize,
    pub by_kind: BTreeMap<FindingKind, usize>,
}

impl RunStats {
    /// Count findings against their kinds
    pub fn add_findings(&mut self, findings: &[Finding]) {
        for finding in findings {
            self.errors += 1;
            *self.by_kind.entry(finding.kind).or_insert(0) += 1;
        }
    }

    pub fn count(&self, kind: FindingKind) -> usize {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Share of checked (non-skipped) records with no findings, in percent
    pub fn success_rate(&self) -> f64 {
        let checked = self.total.saturating_sub(self.skipped);
        if checked == 0 {
            return 100.0;
        }
        self.verified as f64 * 100.0 / checked as f64
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Files persisted by a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub error_log: Option<PathBuf>,
    pub backup: Option<PathBuf>,
}

pub fn error_log_path(dir: &Path, environment: Environment, stamp: &str) -> PathBuf {
    dir.join(format!("metadata-errors-{}-{}.log", environment, stamp))
}

pub fn backup_path(dir: &Path, environment: Environment, stamp: &str) -> PathBuf {
    dir.join(format!("metadata-backup-{}-{}.jsonl", environment, stamp))
}

/// Write one line per finding; nothing is written when there are none
pub fn write_error_log(path: &Path, findings: &[Finding]) -> VerifyResult<Option<PathBuf>> {
    if findings.is_empty() {
        return Ok(None);
    }

    let mut content = String::new();
    for finding in findings {
        // Writing to a String cannot fail
        let _ = writeln!(content, "{}", finding);
    }
    std::fs::write(path, content).map_err(|e| {
        VerifyError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to write error log {}: {}", path.display(), e),
        ))
    })?;

    tracing::info!(path = %path.display(), findings = findings.len(), "Saved error log");
    Ok(Some(path.to_path_buf()))
}

/// Human-readable end-of-run report
pub fn render_summary(environment: Environment, stats: &RunStats, artifacts: &Artifacts) -> String {
    let rule = "=".repeat(50);
    let mut out = String::new();

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Metadata Verification Report ({})", environment);
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Total records:     {}", stats.total);
    let _ = writeln!(out, "Verified:          {}", stats.verified);
    let _ = writeln!(out, "Errors found:      {}", stats.errors);
    let _ = writeln!(out, "Skipped (failed):  {}", stats.skipped);
    let _ = writeln!(out, "Corrections made:  {}", stats.corrected);
    let _ = writeln!(out, "Records backed up: {}", stats.backed_up);
    let _ = writeln!(out, "Success rate:      {:.1}%", stats.success_rate());

    if stats.errors > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "Error breakdown:");
        for kind in FindingKind::ALL {
            let count = stats.count(kind);
            if count > 0 {
                let _ = writeln!(out, "  {}: {}", kind.label(), count);
            }
        }
    }

    if artifacts.error_log.is_some() || artifacts.backup.is_some() {
        let _ = writeln!(out);
    }
    if let Some(path) = &artifacts.error_log {
        let _ = writeln!(out, "Error log: {}", path.display());
    }
    if let Some(path) = &artifacts.backup {
        let _ = writeln!(out, "Backup:    {}", path.display());
    }

    out
}

/// Yes/no confirmation before bulk corrections
pub trait Confirm {
    /// Ask the question; `true` only on an explicit yes
    fn confirm(&mut self, prompt: &str) -> VerifyResult<bool>;
}

/// Only the literal answer `yes` (any case) confirms
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

/// Confirmation read from a line-oriented input
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for TerminalPrompt<R, W> {
    fn confirm(&mut self, prompt: &str) -> VerifyResult<bool> {
        write!(self.output, "{} (yes/no): ", prompt)
            .and_then(|_| self.output.flush())
            .map_err(|e| VerifyError::Prompt(e.to_string()))?;

        let mut answer = String::new();
        let read = self
            .input
            .read_line(&mut answer)
            .map_err(|e| VerifyError::Prompt(e.to_string()))?;

        // EOF counts as no
        Ok(read > 0 && is_affirmative(&answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn finding(kind: FindingKind) -> Finding {
        Finding::new(kind, "t1", "msg")
    }

    #[test]
    fn test_add_findings_tallies_by_kind() {
        let mut stats = RunStats::default();
        stats.add_findings(&[
            finding(FindingKind::TitleMismatch),
            finding(FindingKind::TitleMismatch),
            finding(FindingKind::MissingFile),
        ]);
        assert_eq!(stats.errors, 3);
        assert_eq!(stats.count(FindingKind::TitleMismatch), 2);
        assert_eq!(stats.count(FindingKind::HashMismatch), 0);
    }

    #[test]
    fn test_success_rate_ignores_skipped() {
        let stats = RunStats {
            total: 4,
            verified: 1,
            skipped: 2,
            ..Default::default()
        };
        assert!((stats.success_rate() - 50.0).abs() < f64::EPSILON);
        assert_eq!(RunStats::default().success_rate(), 100.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut stats = RunStats {
            total: 3,
            errors: 2,
            ..Default::default()
        };
        stats.add_findings(&[finding(FindingKind::MissingFile)]);
        stats.reset();
        assert_eq!(stats, RunStats::default());
    }

    #[test]
    fn test_summary_lists_only_nonzero_kinds() {
        let mut stats = RunStats {
            total: 3,
            verified: 1,
            skipped: 1,
            ..Default::default()
        };
        stats.add_findings(&[finding(FindingKind::MetadataIncomplete)]);

        let summary = render_summary(Environment::Dev, &stats, &Artifacts::default());
        assert!(summary.contains("Total records:     3"));
        assert!(summary.contains("Success rate:      50.0%"));
        assert!(summary.contains("  Incomplete Metadata: 1"));
        assert!(!summary.contains("Title Mismatch"));
    }

    #[test]
    fn test_error_log_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = error_log_path(dir.path(), Environment::Prod, "20250101-000000");
        let written = write_error_log(&path, &[finding(FindingKind::HashMismatch)]).unwrap();

        assert_eq!(written.as_deref(), Some(path.as_path()));
        assert!(path.ends_with("metadata-errors-prod-20250101-000000.log"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[hash_mismatch] Track: t1 - msg\n"
        );
    }

    #[test]
    fn test_no_error_log_without_findings() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("errors.log");
        assert_eq!(write_error_log(&path, &[]).unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_prompt_accepts_only_yes() {
        for (input, expected) in [
            ("yes\n", true),
            ("YES\n", true),
            ("  Yes  \n", true),
            ("y\n", false),
            ("no\n", false),
            ("", false),
        ] {
            let mut output = Vec::new();
            let mut prompt = TerminalPrompt::new(Cursor::new(input), &mut output);
            assert_eq!(prompt.confirm("Apply?").unwrap(), expected, "input {:?}", input);
            assert_eq!(String::from_utf8(output).unwrap(), "Apply? (yes/no): ");
        }
    }
}
