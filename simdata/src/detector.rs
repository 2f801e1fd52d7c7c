//! Detector identification for simulated data records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Detector families that produce simulated records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum DetectorType {
    Cherenkov = 0,
    ElectromagneticCalorimeter = 1,
    HadronicCalorimeter = 2,
    Gem = 3,
    Scintillator = 4,
    /// Not a detector: the generator-level track record
    GeneratedTrack = 5,
}

impl DetectorType {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for DetectorType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Cherenkov => "cherenkov",
            Self::ElectromagneticCalorimeter => "ecal",
            Self::HadronicCalorimeter => "hcal",
            Self::Gem => "gem",
            Self::Scintillator => "scint",
            Self::GeneratedTrack => "gen",
        };
        f.write_str(name)
    }
}

/// Detector type plus instance id. Used as a routing key for records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetectorKey {
    pub det_type: DetectorType,
    pub det_id: i32,
}

impl DetectorKey {
    pub fn new(det_type: DetectorType, det_id: i32) -> Self {
        Self { det_type, det_id }
    }

    /// Legacy flat id: `type * 10 + id`.
    ///
    /// Only unique while `det_id` stays in 0..10.
    pub fn unique_id(&self) -> i32 {
        self.det_type.code() * 10 + self.det_id
    }
}

impl fmt::Display for DetectorKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}#{}", self.det_type, self.det_id)
    }
}
