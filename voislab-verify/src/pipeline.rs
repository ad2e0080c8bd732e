//! Verification pipeline
//!
//! Stages: fetch inventory → verify → [confirm] → correct → report.
//!
//! With `auto_correct` and no `assume_yes` the run follows
//! `DryRunCount → Confirm → (Abort | ResetCounters → FullCorrectionPass) → Report`,
//! short-circuiting from the dry run straight to `Report` when it finds
//! nothing. Each pass returns its own [`RunStats`]; there are no globals.

use crate::corrector::{BackupLog, Corrector};
use crate::error::VerifyResult;
use crate::report::{backup_path, error_log_path, write_error_log, Artifacts, Confirm, RunStats};
use crate::services::{DurationProbe, FileIndex};
use crate::store::{MediaStore, MetadataStore};
use crate::verifier::{Finding, FindingKind, RecordOutcome, Verifier, VerifyMode};
use std::collections::HashSet;
use std::path::Path;
use voislab_common::config::VerifyConfig;
use voislab_common::TrackMetadataRecord;

/// Behaviour switches from the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Write corrected values back to the metadata store
    pub auto_correct: bool,
    /// Skip the confirmation prompt
    pub assume_yes: bool,
    /// Skip checks that download file content
    pub fast: bool,
    /// Report track directories with no metadata record
    pub orphans: bool,
}

/// States of a run, recorded in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    DryRunCount,
    Confirm,
    Abort,
    ResetCounters,
    FullCorrectionPass,
    Report,
}

/// Everything fetched up front
#[derive(Debug, Clone)]
pub struct Inventory {
    pub records: Vec<TrackMetadataRecord>,
    pub index: FileIndex,
}

/// Output of one verification pass
#[derive(Debug, Clone, Default)]
pub struct PassResult {
    pub stats: RunStats,
    pub findings: Vec<Finding>,
}

/// Final result of a run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub stats: RunStats,
    pub findings: Vec<Finding>,
    pub artifacts: Artifacts,
    /// User declined the corrections
    pub aborted: bool,
    pub states: Vec<RunState>,
}

impl RunOutcome {
    /// Process exit code: 1 when findings remain in a report-only run
    pub fn exit_code(&self, options: &RunOptions) -> i32 {
        if !options.auto_correct && self.stats.errors > 0 {
            1
        } else {
            0
        }
    }
}

/// Pull the full table and the full media listing
pub async fn fetch_inventory(
    metadata: &dyn MetadataStore,
    media: &dyn MediaStore,
    prefix: &str,
) -> VerifyResult<Inventory> {
    let records = metadata.scan_all().await?;
    tracing::info!(records = records.len(), "Fetched track metadata");

    let objects = media.list_objects(prefix).await?;
    let index = FileIndex::new(prefix, objects)
        .with_known_tracks(records.iter().map(|r| r.id.as_str()));
    tracing::info!(objects = index.len(), prefix, "Fetched media listing");

    Ok(Inventory { records, index })
}

/// One configured verification run
pub struct Pipeline<'a> {
    metadata: &'a dyn MetadataStore,
    media: &'a dyn MediaStore,
    probe: Option<&'a dyn DurationProbe>,
    config: &'a VerifyConfig,
    options: RunOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        metadata: &'a dyn MetadataStore,
        media: &'a dyn MediaStore,
        probe: Option<&'a dyn DurationProbe>,
        config: &'a VerifyConfig,
        options: RunOptions,
    ) -> Self {
        Self {
            metadata,
            media,
            probe,
            config,
            options,
        }
    }

    /// Run every stage; `stamp` names the persisted artifacts
    pub async fn run(&self, confirm: &mut dyn Confirm, stamp: &str) -> VerifyResult<RunOutcome> {
        let inventory = fetch_inventory(self.metadata, self.media, &self.config.media_prefix).await?;

        // Removed on drop, including early returns
        let work_dir = tempfile::Builder::new()
            .prefix("voislab-verify-")
            .tempdir()?;

        let mode = if self.options.fast {
            VerifyMode::Fast
        } else {
            VerifyMode::Full
        };
        let mut states = Vec::new();

        if !self.options.auto_correct {
            let pass = self.verify_pass(&inventory, work_dir.path(), mode, None).await?;
            states.push(RunState::Report);
            return self.finish(pass, None, states, stamp);
        }

        if !self.options.assume_yes {
            states.push(RunState::DryRunCount);
            let dry = self
                .verify_pass(&inventory, work_dir.path(), VerifyMode::Fast, None)
                .await?;

            if dry.stats.errors == 0 {
                tracing::info!("Dry run found no errors, nothing to correct");
                states.push(RunState::Report);
                return self.finish(dry, None, states, stamp);
            }

            states.push(RunState::Confirm);
            let prompt = format!(
                "Found {} metadata error(s) in {}. Apply automatic corrections?",
                dry.stats.errors, self.config.environment
            );
            if !confirm.confirm(&prompt)? {
                tracing::info!("Corrections cancelled by user");
                states.push(RunState::Abort);
                return Ok(RunOutcome {
                    stats: dry.stats,
                    findings: dry.findings,
                    artifacts: Artifacts::default(),
                    aborted: true,
                    states,
                });
            }
            states.push(RunState::ResetCounters);
        }

        states.push(RunState::FullCorrectionPass);
        let backup = BackupLog::new(backup_path(
            &self.config.output_dir,
            self.config.environment,
            stamp,
        ));
        let mut corrector = Corrector::new(self.metadata, backup);
        let pass = self
            .verify_pass(&inventory, work_dir.path(), mode, Some(&mut corrector))
            .await?;
        states.push(RunState::Report);
        self.finish(pass, Some(&corrector), states, stamp)
    }

    /// Verify every record once, correcting as we go when a corrector is given
    pub async fn verify_pass(
        &self,
        inventory: &Inventory,
        work_dir: &Path,
        mode: VerifyMode,
        mut corrector: Option<&mut Corrector<'_>>,
    ) -> VerifyResult<PassResult> {
        let mut result = PassResult::default();
        result.stats.total = inventory.records.len();

        let mut verifier = Verifier::new(
            self.media,
            &inventory.index,
            self.probe,
            work_dir,
            self.config.duration_tolerance_secs,
            mode,
        );

        let total = inventory.records.len();
        for (n, record) in inventory.records.iter().enumerate() {
            tracing::info!(track_id = %record.id, "[{}/{}] Verifying", n + 1, total);

            let findings = match verifier.verify(record).await {
                RecordOutcome::Skipped => {
                    result.stats.skipped += 1;
                    continue;
                }
                RecordOutcome::Checked(findings) => findings,
            };

            if findings.is_empty() {
                result.stats.verified += 1;
                continue;
            }

            for finding in &findings {
                tracing::warn!("{}", finding);
            }
            result.stats.add_findings(&findings);

            if let Some(corrector) = corrector.as_deref_mut() {
                for finding in &findings {
                    let Some(correction) = &finding.correction else {
                        continue;
                    };
                    match corrector
                        .correct(&finding.track_id, correction.field, &correction.value)
                        .await
                    {
                        Ok(()) => result.stats.corrected += 1,
                        Err(e) => tracing::warn!(
                            track_id = %finding.track_id,
                            field = %correction.field,
                            "Correction failed: {}",
                            e
                        ),
                    }
                }
            }

            result.findings.extend(findings);
        }

        if self.options.orphans {
            let orphans = orphan_findings(inventory);
            for finding in &orphans {
                tracing::warn!("{}", finding);
            }
            result.stats.add_findings(&orphans);
            result.findings.extend(orphans);
        }

        if let Some(corrector) = corrector {
            result.stats.backed_up = corrector.backup().entries();
        }

        Ok(result)
    }

    fn finish(
        &self,
        pass: PassResult,
        corrector: Option<&Corrector<'_>>,
        states: Vec<RunState>,
        stamp: &str,
    ) -> VerifyResult<RunOutcome> {
        let log_path = error_log_path(&self.config.output_dir, self.config.environment, stamp);
        let error_log = write_error_log(&log_path, &pass.findings)?;

        let backup = corrector
            .map(|c| c.backup())
            .filter(|b| b.entries() > 0)
            .map(|b| b.path().to_path_buf());

        Ok(RunOutcome {
            stats: pass.stats,
            findings: pass.findings,
            artifacts: Artifacts { error_log, backup },
            aborted: false,
            states,
        })
    }
}

/// `missing_db_entry` findings for track directories no record claims
fn orphan_findings(inventory: &Inventory) -> Vec<Finding> {
    let track_ids: HashSet<&str> = inventory.records.iter().map(|r| r.id.as_str()).collect();
    let claimed: HashSet<String> = inventory
        .records
        .iter()
        .filter_map(|r| {
            r.filename()
                .and_then(|f| inventory.index.locate(&r.id, f))
                .map(|o| o.key.clone())
        })
        .collect();

    inventory
        .index
        .orphans(&track_ids, &claimed)
        .into_iter()
        .map(|orphan| {
            Finding::new(
                FindingKind::MissingDbEntry,
                orphan.track_id,
                format!("No metadata record for stored files: {}", orphan.keys.join(", ")),
            )
        })
        .collect()
}
