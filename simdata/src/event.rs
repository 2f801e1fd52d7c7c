//! One simulated event as delivered to the detectors

use crate::generated::GeneratedTrack;
use crate::record::RecordError;
use serde::{Deserialize, Serialize};

/// Energy deposit in one readout plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneHit {
    /// Name of the chamber that owns the plane
    pub chamber: String,
    /// Plane index within the chamber
    pub plane: usize,
    /// Hit position in the lab frame, mm
    pub position_mm: [f64; 3],
    /// Deposited energy, MeV
    pub edep: f64,
    /// Generated track that produced the hit
    pub track_id: i32,
}

/// Read access to one event, as seen by detector decoders.
pub trait EventData {
    fn event_number(&self) -> u64;

    fn hits(&self) -> &[PlaneHit];

    /// Hits addressed to one plane of one chamber
    fn hits_for<'a>(
        &'a self,
        chamber: &'a str,
        plane: usize,
    ) -> Box<dyn Iterator<Item = &'a PlaneHit> + 'a> {
        Box::new(
            self.hits()
                .iter()
                .filter(move |hit| hit.chamber == chamber && hit.plane == plane),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub event_number: u64,
    /// Written generated-track slots as `[slot, value]` pairs, one list per track
    #[serde(default)]
    pub tracks: Vec<Vec<(usize, f64)>>,
    #[serde(default)]
    pub hits: Vec<PlaneHit>,
}

impl SimEvent {
    pub fn new(event_number: u64) -> Self {
        Self {
            event_number,
            ..Self::default()
        }
    }

    /// Store the written slots of `track`. Unwritten slots stay unwritten on decode.
    pub fn push_track(&mut self, track: &GeneratedTrack) {
        self.tracks.push(track.written_slots());
    }

    /// Rebuild the typed track records.
    pub fn generated_tracks(&self) -> Result<Vec<GeneratedTrack>, RecordError> {
        self.tracks
            .iter()
            .map(|slots| GeneratedTrack::from_written(slots))
            .collect()
    }
}

impl EventData for SimEvent {
    fn event_number(&self) -> u64 {
        self.event_number
    }

    fn hits(&self) -> &[PlaneHit] {
        &self.hits
    }
}
