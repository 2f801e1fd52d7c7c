//! The four nested reference frames

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coordinate frames, outermost first: Lab ⊇ HallCenter ⊇ Spectrometer ⊇ Box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Frame {
    /// Target-centred laboratory frame
    Lab,
    /// Frame centred on the experimental hall pivot
    HallCenter,
    /// Frame attached to the spectrometer arm, z along its optical axis
    Spectrometer,
    /// Local frame of a detector box (chamber/plane)
    Box,
}

impl Frame {
    /// All frames from outermost to innermost
    pub fn all() -> [Self; 4] {
        [Self::Lab, Self::HallCenter, Self::Spectrometer, Self::Box]
    }

    /// Nesting depth, 0 for the lab
    pub fn depth(self) -> usize {
        match self {
            Self::Lab => 0,
            Self::HallCenter => 1,
            Self::Spectrometer => 2,
            Self::Box => 3,
        }
    }

    /// True when the two frames are one hop apart in the nesting chain
    pub fn is_adjacent(self, other: Frame) -> bool {
        self.depth().abs_diff(other.depth()) == 1
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Lab => "lab",
            Self::HallCenter => "hall",
            Self::Spectrometer => "spec",
            Self::Box => "box",
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Frame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lab" => Ok(Self::Lab),
            "hall" | "hallcenter" | "hall_center" => Ok(Self::HallCenter),
            "spec" | "spectrometer" => Ok(Self::Spectrometer),
            "box" | "plane" => Ok(Self::Box),
            other => Err(format!(
                "unknown frame '{other}' (expected lab, hall, spec or box)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting_order() {
        let frames = Frame::all();
        for pair in frames.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].is_adjacent(pair[1]));
        }
        assert!(!Frame::Lab.is_adjacent(Frame::Box));
        assert!(!Frame::Box.is_adjacent(Frame::Box));
    }

    #[test]
    fn test_parse_names() {
        for frame in Frame::all() {
            assert_eq!(frame.name().parse::<Frame>().unwrap(), frame);
        }
        assert_eq!("Plane".parse::<Frame>().unwrap(), Frame::Box);
        assert!("detector".parse::<Frame>().is_err());
    }
}
