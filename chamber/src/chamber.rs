//! GEM chamber: a detector box placed in the hall, owning its readout planes.
//!
//! Frame conversions are re-exposed from the chamber's [`BoxGeometry`] with the
//! box frame called "plane". Each comes in two forms: one on a coordinate
//! triple and a `_vec` form that rewrites a `Vector3` in place. All take and
//! return millimeters.

use crate::database::{resolve_geometry, DatabaseError, GeometrySource, ResolvedGeometry, MAX_PLANES};
use crate::plane::Plane;
use chrono::NaiveDateTime;
use log::{debug, warn};
use nalgebra::Vector3;
use sbs_geometry::{BoxGeometry, BoxGeometryConfig, GeometryError, Length, LengthExt};
use sbs_simdata::EventData;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChamberError {
    #[error("plane index {index} out of range for chamber with {count} planes")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("chamber '{0}' has no plane storage; read its geometry first")]
    PlanesNotAllocated(String),

    #[error("plane {0} has not been initialized")]
    PlaneNotInitialized(usize),

    #[error("{count} planes requested, at most {MAX_PLANES} supported")]
    TooManyPlanes { count: usize },

    #[error("required geometry block '{0}' not found")]
    MissingGeometry(String),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
}

/// Outcome of decoding one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// At least one plane received hits
    Decoded { hits: usize },
    /// The event had nothing for this chamber
    NoHits,
}

pub struct Chamber {
    name: String,
    description: String,
    geometry: BoxGeometry,
    planes: Option<Vec<Option<Plane>>>,
}

impl Chamber {
    /// Chamber with identity placement and no plane storage.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            geometry: BoxGeometry::new(BoxGeometryConfig::default())
                .expect("default geometry is valid"),
            planes: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Name of the database file holding this chamber's geometry
    pub fn db_file_name(&self) -> String {
        format!("db_{}.dat", self.name)
    }

    pub fn box_geometry(&self) -> &BoxGeometry {
        &self.geometry
    }

    /// Install resolved geometry and size the plane storage.
    ///
    /// Any previously initialized planes are dropped.
    pub fn configure(&mut self, config: BoxGeometryConfig, plane_count: usize) -> Result<(), ChamberError> {
        if plane_count > MAX_PLANES {
            return Err(ChamberError::TooManyPlanes { count: plane_count });
        }
        self.geometry = BoxGeometry::new(config)?;
        self.planes = Some((0..plane_count).map(|_| None).collect());
        debug!("chamber {}: configured with {} planes", self.name, plane_count);
        Ok(())
    }

    /// Resolve this chamber's geometry block from `source` and apply it.
    ///
    /// A missing block is an error when `required`; otherwise the chamber
    /// falls back to the default geometry with no planes.
    pub fn read_geometry(
        &mut self,
        source: &dyn GeometrySource,
        at: NaiveDateTime,
        required: bool,
    ) -> Result<(), ChamberError> {
        match resolve_geometry(source, &self.name, at)? {
            Some(ResolvedGeometry {
                box_config,
                plane_count,
            }) => self.configure(box_config, plane_count),
            None if required => Err(ChamberError::MissingGeometry(self.name.clone())),
            None => {
                warn!(
                    "chamber {}: no geometry at {}, using defaults",
                    self.name, at
                );
                self.configure(BoxGeometryConfig::default(), 0)
            }
        }
    }

    // Footprint, in the chamber's own frame

    pub fn size(&self) -> [Length; 2] {
        self.geometry.size()
    }

    pub fn lower_edge_x(&self) -> Length {
        -self.size()[0] / 2.0
    }

    pub fn lower_edge_y(&self) -> Length {
        -self.size()[1] / 2.0
    }

    pub fn upper_edge_x(&self) -> Length {
        self.size()[0] / 2.0
    }

    pub fn upper_edge_y(&self) -> Length {
        self.size()[1] / 2.0
    }

    /// True if a plane-frame point (mm) lies inside the active area
    pub fn contains(&self, x_mm: f64, y_mm: f64) -> bool {
        (self.lower_edge_x().as_millimeters()..=self.upper_edge_x().as_millimeters()).contains(&x_mm)
            && (self.lower_edge_y().as_millimeters()..=self.upper_edge_y().as_millimeters())
                .contains(&y_mm)
    }

    // Planes

    pub fn plane_count(&self) -> usize {
        self.planes.as_ref().map_or(0, Vec::len)
    }

    /// Create the plane at `index`, replacing any previous one.
    pub fn init_plane(
        &mut self,
        index: usize,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<&mut Plane, ChamberError> {
        let planes = self
            .planes
            .as_mut()
            .ok_or_else(|| ChamberError::PlanesNotAllocated(self.name.clone()))?;
        let count = planes.len();
        let slot = planes
            .get_mut(index)
            .ok_or(ChamberError::IndexOutOfRange { index, count })?;

        let plane = Plane::new(index, name, description);
        debug!("chamber {}: plane {} is {}", self.name, index, plane.name());
        Ok(slot.insert(plane))
    }

    pub fn plane(&self, index: usize) -> Result<&Plane, ChamberError> {
        let planes = self
            .planes
            .as_ref()
            .ok_or_else(|| ChamberError::PlanesNotAllocated(self.name.clone()))?;
        planes
            .get(index)
            .ok_or(ChamberError::IndexOutOfRange {
                index,
                count: planes.len(),
            })?
            .as_ref()
            .ok_or(ChamberError::PlaneNotInitialized(index))
    }

    pub fn plane_mut(&mut self, index: usize) -> Result<&mut Plane, ChamberError> {
        let planes = self
            .planes
            .as_mut()
            .ok_or_else(|| ChamberError::PlanesNotAllocated(self.name.clone()))?;
        let count = planes.len();
        planes
            .get_mut(index)
            .ok_or(ChamberError::IndexOutOfRange { index, count })?
            .as_mut()
            .ok_or(ChamberError::PlaneNotInitialized(index))
    }

    /// Initialized planes in index order
    pub fn planes(&self) -> impl Iterator<Item = &Plane> {
        self.planes.iter().flatten().flatten()
    }

    /// Hand one event to every plane.
    pub fn decode(&mut self, event: &dyn EventData) -> Result<DecodeStatus, ChamberError> {
        let planes = self
            .planes
            .as_mut()
            .ok_or_else(|| ChamberError::PlanesNotAllocated(self.name.clone()))?;

        if let Some(index) = planes.iter().position(Option::is_none) {
            return Err(ChamberError::PlaneNotInitialized(index));
        }

        let mut hits = 0;
        for plane in planes.iter_mut().flatten() {
            hits += plane.decode(&self.name, &self.geometry, event);
        }

        debug!(
            "chamber {}: event {} gave {} hits",
            self.name,
            event.event_number(),
            hits
        );
        Ok(if hits == 0 {
            DecodeStatus::NoHits
        } else {
            DecodeStatus::Decoded { hits }
        })
    }

    // Frame conversions

    pub fn hall_center_to_plane(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        triple(self.geometry.hall_center_to_box(Vector3::new(x, y, z)))
    }

    pub fn plane_to_hall_center(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        triple(self.geometry.box_to_hall_center(Vector3::new(x, y, z)))
    }

    pub fn hall_center_to_spec(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        triple(self.geometry.hall_center_to_spec(Vector3::new(x, y, z)))
    }

    pub fn spec_to_hall_center(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        triple(self.geometry.spec_to_hall_center(Vector3::new(x, y, z)))
    }

    pub fn hall_center_to_lab(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        triple(self.geometry.hall_center_to_lab(Vector3::new(x, y, z)))
    }

    pub fn lab_to_hall_center(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        triple(self.geometry.lab_to_hall_center(Vector3::new(x, y, z)))
    }

    pub fn lab_to_plane(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        triple(self.geometry.lab_to_box(Vector3::new(x, y, z)))
    }

    pub fn plane_to_lab(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        triple(self.geometry.box_to_lab(Vector3::new(x, y, z)))
    }

    pub fn lab_to_spec(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        triple(self.geometry.lab_to_spec(Vector3::new(x, y, z)))
    }

    pub fn spec_to_lab(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        triple(self.geometry.spec_to_lab(Vector3::new(x, y, z)))
    }

    /// Includes the D0 shift along z
    pub fn spec_to_plane(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        triple(self.geometry.spec_to_box(Vector3::new(x, y, z)))
    }

    /// Includes the D0 shift along z
    pub fn plane_to_spec(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        triple(self.geometry.box_to_spec(Vector3::new(x, y, z)))
    }

    pub fn hall_center_to_plane_vec(&self, v: &mut Vector3<f64>) {
        *v = self.geometry.hall_center_to_box(*v);
    }

    pub fn plane_to_hall_center_vec(&self, v: &mut Vector3<f64>) {
        *v = self.geometry.box_to_hall_center(*v);
    }

    pub fn hall_center_to_spec_vec(&self, v: &mut Vector3<f64>) {
        *v = self.geometry.hall_center_to_spec(*v);
    }

    pub fn spec_to_hall_center_vec(&self, v: &mut Vector3<f64>) {
        *v = self.geometry.spec_to_hall_center(*v);
    }

    pub fn hall_center_to_lab_vec(&self, v: &mut Vector3<f64>) {
        *v = self.geometry.hall_center_to_lab(*v);
    }

    pub fn lab_to_hall_center_vec(&self, v: &mut Vector3<f64>) {
        *v = self.geometry.lab_to_hall_center(*v);
    }

    pub fn lab_to_plane_vec(&self, v: &mut Vector3<f64>) {
        *v = self.geometry.lab_to_box(*v);
    }

    pub fn plane_to_lab_vec(&self, v: &mut Vector3<f64>) {
        *v = self.geometry.box_to_lab(*v);
    }

    pub fn lab_to_spec_vec(&self, v: &mut Vector3<f64>) {
        *v = self.geometry.lab_to_spec(*v);
    }

    pub fn spec_to_lab_vec(&self, v: &mut Vector3<f64>) {
        *v = self.geometry.spec_to_lab(*v);
    }

    pub fn spec_to_plane_vec(&self, v: &mut Vector3<f64>) {
        *v = self.geometry.spec_to_box(*v);
    }

    pub fn plane_to_spec_vec(&self, v: &mut Vector3<f64>) {
        *v = self.geometry.box_to_spec(*v);
    }
}

fn triple(p: Vector3<f64>) -> (f64, f64, f64) {
    (p.x, p.y, p.z)
}

impl fmt::Display for Chamber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Chamber {} ({})", self.name, self.description)?;
        writeln!(
            f,
            "  d0 = {:.4} m, size = {:.4} x {:.4} m",
            self.geometry.d0().as_meters(),
            self.size()[0].as_meters(),
            self.size()[1].as_meters()
        )?;
        write!(f, "  planes: {}", self.plane_count())?;
        for plane in self.planes() {
            write!(f, "\n    [{}] {} - {}", plane.index(), plane.name(), plane.description())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sbs_geometry::{Angle, AngleExt};
    use sbs_simdata::{PlaneHit, SimEvent};

    fn configured(plane_count: usize) -> Chamber {
        let mut chamber = Chamber::new("gem1", "front tracker");
        let config = BoxGeometryConfig {
            spec_angle_h: Angle::from_degrees(-16.9),
            dmag: Length::from_meters(1.63),
            rotation: Angle::from_degrees(2.0),
            ..BoxGeometryConfig::on_axis(1.5, 0.2, 0.4)
        };
        chamber.configure(config, plane_count).unwrap();
        chamber
    }

    #[test]
    fn test_edges_are_symmetric() {
        let chamber = configured(0);

        assert_relative_eq!(chamber.lower_edge_x().as_millimeters(), -100.0, epsilon = 1e-9);
        assert_relative_eq!(chamber.upper_edge_x().as_millimeters(), 100.0, epsilon = 1e-9);
        assert_relative_eq!(chamber.lower_edge_y().as_millimeters(), -200.0, epsilon = 1e-9);
        assert_relative_eq!(chamber.upper_edge_y().as_millimeters(), 200.0, epsilon = 1e-9);

        assert!(chamber.contains(99.0, -199.0));
        assert!(!chamber.contains(101.0, 0.0));
    }

    #[test]
    fn test_spec_to_plane_applies_d0_once() {
        let chamber = configured(0);

        let (_, _, z) = chamber.spec_to_plane(0.0, 0.0, 2000.0);
        assert_relative_eq!(z, 500.0, epsilon = 1e-9);

        let (_, _, z) = chamber.plane_to_spec(0.0, 0.0, 500.0);
        assert_relative_eq!(z, 2000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_vector_forms_match_triples() {
        let chamber = configured(0);
        let (x, y, z) = (12.0, -340.0, 4100.0);

        let mut v = Vector3::new(x, y, z);
        chamber.lab_to_plane_vec(&mut v);
        let (px, py, pz) = chamber.lab_to_plane(x, y, z);
        assert_eq!(v, Vector3::new(px, py, pz));

        chamber.plane_to_lab_vec(&mut v);
        assert_relative_eq!(v, Vector3::new(x, y, z), epsilon = 1e-9);

        let mut h = Vector3::new(x, y, z);
        chamber.hall_center_to_spec_vec(&mut h);
        chamber.spec_to_plane_vec(&mut h);
        let (qx, qy, qz) = chamber.hall_center_to_plane(x, y, z);
        assert_eq!(h, Vector3::new(qx, qy, qz));
    }

    #[test]
    fn test_plane_round_trips() {
        let chamber = configured(0);
        let p = (250.0, 75.0, 3000.0);

        let (a, b, c) = chamber.lab_to_hall_center(p.0, p.1, p.2);
        let back = chamber.hall_center_to_lab(a, b, c);
        assert_relative_eq!(back.0, p.0, epsilon = 1e-9);
        assert_relative_eq!(back.2, p.2, epsilon = 1e-9);

        let (a, b, c) = chamber.hall_center_to_plane(p.0, p.1, p.2);
        let back = chamber.plane_to_hall_center(a, b, c);
        assert_relative_eq!(back.0, p.0, epsilon = 1e-9);
        assert_relative_eq!(back.1, p.1, epsilon = 1e-9);
        assert_relative_eq!(back.2, p.2, epsilon = 1e-9);

        let (a, b, c) = chamber.lab_to_spec(p.0, p.1, p.2);
        let back = chamber.spec_to_lab(a, b, c);
        assert_relative_eq!(back.1, p.1, epsilon = 1e-9);

        let (a, b, c) = chamber.spec_to_hall_center(p.0, p.1, p.2);
        let back = chamber.hall_center_to_spec(a, b, c);
        assert_relative_eq!(back.2, p.2, epsilon = 1e-9);
    }

    #[test]
    fn test_init_plane_bounds() {
        let mut bare = Chamber::new("gem2", "");
        assert!(matches!(
            bare.init_plane(0, "x", ""),
            Err(ChamberError::PlanesNotAllocated(_))
        ));
        assert!(matches!(bare.plane(0), Err(ChamberError::PlanesNotAllocated(_))));

        let mut chamber = configured(2);
        assert!(matches!(
            chamber.init_plane(2, "x", ""),
            Err(ChamberError::IndexOutOfRange { index: 2, count: 2 })
        ));
        assert!(matches!(chamber.plane(1), Err(ChamberError::PlaneNotInitialized(1))));

        chamber.init_plane(1, "gem1y", "y strips").unwrap();
        assert_eq!(chamber.plane(1).unwrap().name(), "gem1y");
        assert!(matches!(
            chamber.plane(5),
            Err(ChamberError::IndexOutOfRange { index: 5, count: 2 })
        ));
    }

    #[test]
    fn test_reconfigure_drops_planes() {
        let mut chamber = configured(1);
        chamber.init_plane(0, "gem1x", "").unwrap();
        assert_eq!(chamber.planes().count(), 1);

        chamber.configure(BoxGeometryConfig::on_axis(2.0, 0.2, 0.2), 3).unwrap();
        assert_eq!(chamber.plane_count(), 3);
        assert_eq!(chamber.planes().count(), 0);
    }

    #[test]
    fn test_decode_routes_hits_to_planes() {
        let mut chamber = configured(2);
        chamber.init_plane(0, "gem1x", "").unwrap();
        chamber.init_plane(1, "gem1y", "").unwrap();

        // A point 10 mm into the box, expressed in the lab frame
        let lab = chamber.box_geometry().box_to_lab(Vector3::new(5.0, -3.0, 10.0));
        let hit = |plane| PlaneHit {
            chamber: "gem1".to_string(),
            plane,
            position_mm: [lab.x, lab.y, lab.z],
            edep: 0.003,
            track_id: 1,
        };

        let mut event = SimEvent::new(7);
        event.hits = vec![hit(0), hit(0), hit(1)];
        event.hits.push(PlaneHit {
            chamber: "gem2".to_string(),
            ..hit(1)
        });

        assert_eq!(chamber.decode(&event).unwrap(), DecodeStatus::Decoded { hits: 3 });
        assert_eq!(chamber.plane(0).unwrap().hit_count(), 2);

        let local = &chamber.plane(1).unwrap().hits()[0];
        assert_relative_eq!(local.position_mm, Vector3::new(5.0, -3.0, 10.0), epsilon = 1e-9);

        // Next event replaces the previous hits
        assert_eq!(chamber.decode(&SimEvent::new(8)).unwrap(), DecodeStatus::NoHits);
        assert_eq!(chamber.plane(0).unwrap().hit_count(), 0);
    }

    #[test]
    fn test_decode_requires_initialized_planes() {
        let mut chamber = configured(2);
        chamber.init_plane(0, "gem1x", "").unwrap();

        assert!(matches!(
            chamber.decode(&SimEvent::new(1)),
            Err(ChamberError::PlaneNotInitialized(1))
        ));
    }

    #[test]
    fn test_failed_decode_leaves_planes_untouched() {
        let mut chamber = configured(2);
        chamber.init_plane(0, "gem1x", "").unwrap();

        let mut event = SimEvent::new(1);
        event.hits.push(PlaneHit {
            chamber: "gem1".to_string(),
            plane: 0,
            position_mm: [0.0, 0.0, 1500.0],
            edep: 0.003,
            track_id: 1,
        });
        let geometry = chamber.box_geometry().clone();
        chamber.plane_mut(0).unwrap().decode("gem1", &geometry, &event);
        assert_eq!(chamber.plane(0).unwrap().hit_count(), 1);

        // Plane 1 is missing: the empty event must not clear plane 0
        assert!(matches!(
            chamber.decode(&SimEvent::new(2)),
            Err(ChamberError::PlaneNotInitialized(1))
        ));
        assert_eq!(chamber.plane(0).unwrap().hit_count(), 1);
    }

    #[test]
    fn test_plane_count_is_bounded() {
        let mut chamber = configured(1);
        let config = chamber.box_geometry().config().clone();
        assert!(matches!(
            chamber.configure(config, MAX_PLANES + 1),
            Err(ChamberError::TooManyPlanes { .. })
        ));
        assert_eq!(chamber.plane_count(), 1);
    }

    #[test]
    fn test_summary() {
        let mut chamber = configured(1);
        chamber.init_plane(0, "gem1x", "x strips").unwrap();

        let text = chamber.to_string();
        assert!(text.starts_with("Chamber gem1 (front tracker)"));
        assert!(text.contains("d0 = 1.5000 m"));
        assert!(text.contains("[0] gem1x - x strips"));
        assert_eq!(chamber.db_file_name(), "db_gem1.dat");
    }
}
