//! Generator-level track record
//!
//! Fixed slot layout over [`SparseRecord`]:
//!
//! | slot  | content                                   |
//! |-------|-------------------------------------------|
//! | 0     | track id                                  |
//! | 1     | particle id (PDG)                         |
//! | 2-4   | production momentum (px, py, pz)          |
//! | 5-7   | production vertex (x, y, z)               |
//! | 8     | event weight                              |
//! | 9-11  | momentum at the target reference plane    |
//! | 12-14 | vertex at the target reference plane      |
//! | 15    | origin-volume flag (optional)             |
//!
//! Slots 0-14 are required. Typed accessors return `None` until all of them
//! are written, so "not yet available" is never confused with zero-valued
//! data. `weight` is the exception and reads slot 8 unguarded.

use crate::detector::DetectorType;
use crate::record::{RecordError, SparseRecord};
use nalgebra::Vector3;

/// Slot indices of the generated-track layout
pub mod slot {
    pub const TRID: usize = 0;
    pub const PID: usize = 1;
    pub const MOMENTUM: usize = 2;
    pub const VERTEX: usize = 5;
    pub const WEIGHT: usize = 8;
    pub const MOMENTUM_AT_TARGET: usize = 9;
    pub const VERTEX_AT_TARGET: usize = 12;
    pub const ORIGIN_VOLUME_FLAG: usize = 15;
}

/// Number of slots that must be written for the record to be complete
pub const REQUIRED_SLOTS: usize = 15;

/// Total slots including the optional origin-volume flag
pub const CAPACITY: usize = 16;

/// Legacy "unfilled" marker for callers that need a plain number
pub const UNFILLED: f64 = -1e9;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTrack {
    record: SparseRecord,
}

impl Default for GeneratedTrack {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratedTrack {
    pub fn new() -> Self {
        let required: Vec<usize> = (0..REQUIRED_SLOTS).collect();
        let record = SparseRecord::with_required(DetectorType::GeneratedTrack, 0, CAPACITY, &required)
            .expect("generated-track layout fits the fill mask");
        Self { record }
    }

    /// Fill slots in order from a dense value list.
    pub fn from_slots(values: &[f64]) -> Result<Self, RecordError> {
        let mut track = Self::new();
        for (slot, &value) in values.iter().enumerate() {
            track.set_data(slot, value)?;
        }
        Ok(track)
    }

    /// Rebuild a track from `(slot, value)` pairs as stored in event files.
    pub fn from_written(slots: &[(usize, f64)]) -> Result<Self, RecordError> {
        let mut track = Self::new();
        for &(slot, value) in slots {
            track.set_data(slot, value)?;
        }
        Ok(track)
    }

    /// Written slots only, in slot order
    pub fn written_slots(&self) -> Vec<(usize, f64)> {
        self.record
            .data_slice()
            .iter()
            .enumerate()
            .filter(|&(slot, _)| self.record.is_written(slot))
            .map(|(slot, &value)| (slot, value))
            .collect()
    }

    pub fn set_data(&mut self, slot: usize, value: f64) -> Result<(), RecordError> {
        self.record.set_data(slot, value)
    }

    pub fn data(&self, slot: usize) -> Result<f64, RecordError> {
        self.record.data(slot)
    }

    pub fn is_filled(&self) -> bool {
        self.record.is_filled()
    }

    pub fn record(&self) -> &SparseRecord {
        &self.record
    }

    fn guarded_vector(&self, first: usize) -> Option<Vector3<f64>> {
        if !self.is_filled() {
            return None;
        }
        let d = self.record.data_slice();
        Some(Vector3::new(d[first], d[first + 1], d[first + 2]))
    }

    fn guarded_id(&self, slot: usize) -> Option<i32> {
        self.is_filled()
            .then(|| self.record.data_slice()[slot] as i32)
    }

    /// Track id
    pub fn trid(&self) -> Option<i32> {
        self.guarded_id(slot::TRID)
    }

    /// Particle id
    pub fn pid(&self) -> Option<i32> {
        self.guarded_id(slot::PID)
    }

    /// Production momentum
    pub fn p(&self) -> Option<Vector3<f64>> {
        self.guarded_vector(slot::MOMENTUM)
    }

    /// Production vertex
    pub fn v(&self) -> Option<Vector3<f64>> {
        self.guarded_vector(slot::VERTEX)
    }

    pub fn momentum_at_target(&self) -> Option<Vector3<f64>> {
        self.guarded_vector(slot::MOMENTUM_AT_TARGET)
    }

    pub fn vertex_at_target(&self) -> Option<Vector3<f64>> {
        self.guarded_vector(slot::VERTEX_AT_TARGET)
    }

    /// Event weight (cross section). Read without a completeness check.
    pub fn weight(&self) -> f64 {
        self.record.data_slice()[slot::WEIGHT]
    }

    /// Origin-volume flag, if the source wrote one.
    pub fn origin_volume_flag(&self) -> Option<i32> {
        self.record
            .is_written(slot::ORIGIN_VOLUME_FLAG)
            .then(|| self.record.data_slice()[slot::ORIGIN_VOLUME_FLAG] as i32)
    }

    pub fn trid_or_unfilled(&self) -> i32 {
        self.trid().unwrap_or(UNFILLED as i32)
    }

    pub fn pid_or_unfilled(&self) -> i32 {
        self.pid().unwrap_or(UNFILLED as i32)
    }

    pub fn p_or_unfilled(&self) -> Vector3<f64> {
        self.p().unwrap_or_else(unfilled_vector)
    }

    pub fn v_or_unfilled(&self) -> Vector3<f64> {
        self.v().unwrap_or_else(unfilled_vector)
    }

    pub fn momentum_at_target_or_unfilled(&self) -> Vector3<f64> {
        self.momentum_at_target().unwrap_or_else(unfilled_vector)
    }

    pub fn vertex_at_target_or_unfilled(&self) -> Vector3<f64> {
        self.vertex_at_target().unwrap_or_else(unfilled_vector)
    }
}

/// `(UNFILLED, UNFILLED, UNFILLED)`
pub fn unfilled_vector() -> Vector3<f64> {
    Vector3::repeat(UNFILLED)
}
