//! Simulated detector data: sparse per-hit records, generator-level tracks,
//! and the sequential event file they arrive in.

pub mod detector;
pub mod event;
pub mod generated;
pub mod record;
pub mod sim_file;

pub use detector::{DetectorKey, DetectorType};
pub use event::{EventData, PlaneHit, SimEvent};
pub use generated::GeneratedTrack;
pub use record::{RecordError, SparseRecord, DEFAULT_CAPACITY};
pub use sim_file::{FileState, SimFile, SimFileError, SimFileHeader, SimFileWriter};
