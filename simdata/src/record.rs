//! Sparse attribute record
//!
//! A fixed number of f64 slots filled in any order by an event source. Each
//! write sets the slot's bit in a `u64` fill mask; the record is complete once
//! every slot of its required mask has been written. Slots outside the
//! required mask are optional trailing data.

use crate::detector::{DetectorKey, DetectorType};
use thiserror::Error;

/// Slot count used when no schema says otherwise
pub const DEFAULT_CAPACITY: usize = 32;

/// Width of the fill mask
pub const MAX_TRACKED_SLOTS: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("slot {slot} out of range for record of capacity {capacity}")]
    IndexOutOfRange { slot: usize, capacity: usize },

    #[error("record capacity {0} exceeds the {MAX_TRACKED_SLOTS} trackable slots")]
    CapacityTooLarge(usize),
}

fn mask_below(n: usize) -> u64 {
    if n >= MAX_TRACKED_SLOTS {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SparseRecord {
    key: DetectorKey,
    data: Vec<f64>,
    fill_bits: u64,
    required: u64,
}

impl SparseRecord {
    /// Record with [`DEFAULT_CAPACITY`] slots, all of them required.
    pub fn new(det_type: DetectorType, det_id: i32) -> Self {
        Self {
            key: DetectorKey::new(det_type, det_id),
            data: vec![0.0; DEFAULT_CAPACITY],
            fill_bits: 0,
            required: mask_below(DEFAULT_CAPACITY),
        }
    }

    /// Record with `capacity` slots, all of them required.
    pub fn with_capacity(
        det_type: DetectorType,
        det_id: i32,
        capacity: usize,
    ) -> Result<Self, RecordError> {
        if capacity > MAX_TRACKED_SLOTS {
            return Err(RecordError::CapacityTooLarge(capacity));
        }
        Ok(Self {
            key: DetectorKey::new(det_type, det_id),
            data: vec![0.0; capacity],
            fill_bits: 0,
            required: mask_below(capacity),
        })
    }

    /// Record with `capacity` slots of which only `required` gate completeness.
    pub fn with_required(
        det_type: DetectorType,
        det_id: i32,
        capacity: usize,
        required: &[usize],
    ) -> Result<Self, RecordError> {
        let mut record = Self::with_capacity(det_type, det_id, capacity)?;
        record.required = 0;
        for &slot in required {
            record.check_slot(slot)?;
            record.required |= 1 << slot;
        }
        Ok(record)
    }

    fn check_slot(&self, slot: usize) -> Result<(), RecordError> {
        if slot >= self.data.len() {
            return Err(RecordError::IndexOutOfRange {
                slot,
                capacity: self.data.len(),
            });
        }
        Ok(())
    }

    /// Store `value` in `slot` and mark it written. Rewrites overwrite.
    pub fn set_data(&mut self, slot: usize, value: f64) -> Result<(), RecordError> {
        self.check_slot(slot)?;
        self.data[slot] = value;
        self.fill_bits |= 1 << slot;
        Ok(())
    }

    /// Last value stored in `slot`, or 0.0 if it was never written.
    ///
    /// Does not look at the fill mask; check [`is_filled`](Self::is_filled) first.
    pub fn data(&self, slot: usize) -> Result<f64, RecordError> {
        self.check_slot(slot)?;
        Ok(self.data[slot])
    }

    pub fn data_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn is_written(&self, slot: usize) -> bool {
        slot < self.data.len() && self.fill_bits & (1 << slot) != 0
    }

    pub fn written_count(&self) -> usize {
        self.fill_bits.count_ones() as usize
    }

    pub fn is_filled(&self) -> bool {
        self.fill_bits & self.required == self.required
    }

    /// Slots still needed before the record is complete
    pub fn missing_slots(&self) -> Vec<usize> {
        let missing = self.required & !self.fill_bits;
        (0..self.data.len())
            .filter(|slot| missing & (1 << slot) != 0)
            .collect()
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn key(&self) -> DetectorKey {
        self.key
    }

    pub fn det_type(&self) -> DetectorType {
        self.key.det_type
    }

    pub fn det_id(&self) -> i32 {
        self.key.det_id
    }

    pub fn det_unique_id(&self) -> i32 {
        self.key.unique_id()
    }

    /// Forget every written value, keeping the schema.
    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|v| *v = 0.0);
        self.fill_bits = 0;
    }
}
