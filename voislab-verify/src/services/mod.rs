//! Service modules used by the verifier and corrector

pub mod duration;
pub mod file_index;
pub mod hasher;
pub mod title;

pub use duration::{DurationError, DurationProbe, LoftyDurationProbe};
pub use file_index::{FileIndex, OrphanDirectory};
pub use hasher::calculate_hash;
pub use title::expected_title;
