//! # VoisLab Common Library
//!
//! Shared code for the VoisLab operational tools:
//! - Track metadata record model
//! - Configuration loading and environment resolution
//! - Error types
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod model;
pub mod time;

pub use error::{Error, Result};
pub use model::{RecordKey, TrackMetadataRecord, TrackStatus};
