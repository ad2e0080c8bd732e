//! voislab-verify library interface
//!
//! Reconciles the track metadata table against the media bucket:
//! fetch inventories, verify each record, optionally correct fields
//! (with backups), and report.

pub mod corrector;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod services;
pub mod store;
pub mod verifier;

pub use crate::error::{VerifyError, VerifyResult};
pub use crate::pipeline::{Pipeline, RunOptions, RunOutcome, RunState};
pub use crate::verifier::{Finding, FindingKind, VerifyMode};
