//! Readout plane of a GEM chamber
//!
//! A plane keeps the hits of the current event that were addressed to it,
//! relocated into its chamber's box frame. Strip digitization is not modelled.

use nalgebra::Vector3;
use sbs_geometry::BoxGeometry;
use sbs_simdata::EventData;

/// One hit as seen by the plane, in box-frame millimeters.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalHit {
    pub position_mm: Vector3<f64>,
    pub edep: f64,
    pub track_id: i32,
}

#[derive(Debug, Clone)]
pub struct Plane {
    name: String,
    description: String,
    index: usize,
    hits: Vec<LocalHit>,
}

impl Plane {
    pub fn new(index: usize, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            index,
            hits: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn hits(&self) -> &[LocalHit] {
        &self.hits
    }

    pub fn hit_count(&self) -> usize {
        self.hits.len()
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }

    /// Replace this plane's hits with those `event` addresses to it.
    pub fn decode(&mut self, chamber: &str, geometry: &BoxGeometry, event: &dyn EventData) -> usize {
        self.hits.clear();
        self.hits.extend(event.hits_for(chamber, self.index).map(|hit| {
            let lab = Vector3::from(hit.position_mm);
            LocalHit {
                position_mm: geometry.lab_to_box(lab),
                edep: hit.edep,
                track_id: hit.track_id,
            }
        }));
        self.hits.len()
    }
}
