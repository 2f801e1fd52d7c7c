//! Box geometry engine: placement of one detector box in the experimental hall.
//!
//! Four frames are chained, each hop a rigid transform:
//! ```text
//! lab  --(+ lab offset)-->  hall  --(R_spec, dmag)-->  spec  --(in-plane, D0)-->  box
//! ```
//! * Lab → HallCenter: translation by the lab origin expressed in hall coordinates.
//! * HallCenter → Spectrometer: rotation by the spectrometer arm angles
//!   (horizontal about hall y, then vertical about x) around an origin placed
//!   `dmag` along the arm axis.
//! * Spectrometer → Box: `z_box = z_spec - D0`, and (x, y) through the box's
//!   in-plane rotation and transverse offset.
//!
//! Every public conversion takes and returns millimeters. Configuration values
//! are typed `uom` quantities, converted to millimeters only at the hop that
//! uses them. Non-finite inputs are not checked and propagate.

use crate::affine2::Affine2;
use crate::frame::Frame;
use crate::units::{Angle, AngleExt, Length, LengthExt};
use nalgebra::{Rotation3, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("box size along {axis} must be finite and non-negative, got {value_m} m")]
    InvalidSize { axis: char, value_m: f64 },

    #[error("geometry parameter '{0}' is not finite")]
    NonFinite(&'static str),
}

/// Resolved numeric geometry for one detector box.
///
/// Lengths are stored in meters, angles in radians (the `uom` base units).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxGeometryConfig {
    /// Lab origin (target) expressed in the hall-centre frame
    pub lab_offset: [Length; 3],
    /// Spectrometer arm angle in the horizontal plane (rotation about hall y)
    pub spec_angle_h: Angle,
    /// Spectrometer arm vertical tilt (rotation about the arm's x)
    pub spec_angle_v: Angle,
    /// Distance from the hall centre to the spectrometer origin along the arm
    pub dmag: Length,
    /// Box centre in the spectrometer transverse plane
    pub center: [Length; 2],
    /// In-plane rotation of the box about the stack axis
    pub rotation: Angle,
    /// Spectrometer origin to box origin along the stack axis
    pub d0: Length,
    /// Active width (x) and height (y) of the box
    pub size: [Length; 2],
}

impl BoxGeometryConfig {
    /// Box at `d0` meters straight down the spectrometer axis, everything else zero.
    pub fn on_axis(d0_m: f64, size_x_m: f64, size_y_m: f64) -> Self {
        Self {
            d0: Length::from_meters(d0_m),
            size: [Length::from_meters(size_x_m), Length::from_meters(size_y_m)],
            ..Self::default()
        }
    }

    /// Check that every parameter is usable for building an engine.
    pub fn validate(&self) -> Result<(), GeometryError> {
        for (axis, size) in ['x', 'y'].into_iter().zip(self.size.iter()) {
            let value_m = size.as_meters();
            if !value_m.is_finite() || value_m < 0.0 {
                return Err(GeometryError::InvalidSize { axis, value_m });
            }
        }

        let lengths = [
            ("lab_offset.x", self.lab_offset[0]),
            ("lab_offset.y", self.lab_offset[1]),
            ("lab_offset.z", self.lab_offset[2]),
            ("dmag", self.dmag),
            ("center.x", self.center[0]),
            ("center.y", self.center[1]),
            ("d0", self.d0),
        ];
        for (name, length) in lengths {
            if !length.as_meters().is_finite() {
                return Err(GeometryError::NonFinite(name));
            }
        }

        let angles = [
            ("spec_angle_h", self.spec_angle_h),
            ("spec_angle_v", self.spec_angle_v),
            ("rotation", self.rotation),
        ];
        for (name, angle) in angles {
            if !angle.as_radians().is_finite() {
                return Err(GeometryError::NonFinite(name));
            }
        }

        Ok(())
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

impl Default for BoxGeometryConfig {
    /// Box coincident with the spectrometer, spectrometer coincident with the hall
    fn default() -> Self {
        let zero = Length::from_meters(0.0);
        Self {
            lab_offset: [zero; 3],
            spec_angle_h: Angle::from_radians(0.0),
            spec_angle_v: Angle::from_radians(0.0),
            dmag: zero,
            center: [zero; 2],
            rotation: Angle::from_radians(0.0),
            d0: zero,
            size: [zero; 2],
        }
    }
}

/// Frame conversion engine for one box. Immutable once built.
#[derive(Debug, Clone)]
pub struct BoxGeometry {
    config: BoxGeometryConfig,
    lab_offset_mm: Vector3<f64>,
    spec_rotation: Rotation3<f64>,
    spec_origin_mm: Vector3<f64>,
    in_plane: Affine2,
}

impl BoxGeometry {
    pub fn new(config: BoxGeometryConfig) -> Result<Self, GeometryError> {
        config.validate()?;

        let lab_offset_mm = Vector3::new(
            config.lab_offset[0].as_millimeters(),
            config.lab_offset[1].as_millimeters(),
            config.lab_offset[2].as_millimeters(),
        );

        let spec_rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), config.spec_angle_h.as_radians())
            * Rotation3::from_axis_angle(&Vector3::x_axis(), config.spec_angle_v.as_radians());
        let spec_origin_mm = spec_rotation * Vector3::new(0.0, 0.0, config.dmag.as_millimeters());

        let in_plane = Affine2::rigid(
            config.rotation.as_radians(),
            Vector2::new(config.center[0].as_millimeters(), config.center[1].as_millimeters()),
        );

        log::debug!(
            "box geometry: d0={:.4} m, size={:.4}x{:.4} m, spec angle={:.3} deg",
            config.d0.as_meters(),
            config.size[0].as_meters(),
            config.size[1].as_meters(),
            config.spec_angle_h.as_degrees()
        );

        Ok(Self {
            config,
            lab_offset_mm,
            spec_rotation,
            spec_origin_mm,
            in_plane,
        })
    }

    pub fn config(&self) -> &BoxGeometryConfig {
        &self.config
    }

    /// Spectrometer origin to box origin, in meters
    pub fn d0(&self) -> Length {
        self.config.d0
    }

    /// Box width and height
    pub fn size(&self) -> [Length; 2] {
        self.config.size
    }

    pub fn in_plane(&self) -> &Affine2 {
        &self.in_plane
    }

    // Adjacent hops

    pub fn lab_to_hall_center(&self, p: Vector3<f64>) -> Vector3<f64> {
        p + self.lab_offset_mm
    }

    pub fn hall_center_to_lab(&self, p: Vector3<f64>) -> Vector3<f64> {
        p - self.lab_offset_mm
    }

    pub fn hall_center_to_spec(&self, p: Vector3<f64>) -> Vector3<f64> {
        self.spec_rotation
            .inverse_transform_vector(&(p - self.spec_origin_mm))
    }

    pub fn spec_to_hall_center(&self, p: Vector3<f64>) -> Vector3<f64> {
        self.spec_rotation * p + self.spec_origin_mm
    }

    pub fn spec_to_box(&self, p: Vector3<f64>) -> Vector3<f64> {
        let xy = self.in_plane.to_box(Vector2::new(p.x, p.y));
        Vector3::new(xy.x, xy.y, p.z - self.config.d0.as_millimeters())
    }

    pub fn box_to_spec(&self, p: Vector3<f64>) -> Vector3<f64> {
        let xy = self.in_plane.to_spec(Vector2::new(p.x, p.y));
        Vector3::new(xy.x, xy.y, p.z + self.config.d0.as_millimeters())
    }

    // Chained conversions, composed only from the hops above

    pub fn lab_to_spec(&self, p: Vector3<f64>) -> Vector3<f64> {
        self.hall_center_to_spec(self.lab_to_hall_center(p))
    }

    pub fn spec_to_lab(&self, p: Vector3<f64>) -> Vector3<f64> {
        self.hall_center_to_lab(self.spec_to_hall_center(p))
    }

    pub fn hall_center_to_box(&self, p: Vector3<f64>) -> Vector3<f64> {
        self.spec_to_box(self.hall_center_to_spec(p))
    }

    pub fn box_to_hall_center(&self, p: Vector3<f64>) -> Vector3<f64> {
        self.spec_to_hall_center(self.box_to_spec(p))
    }

    pub fn lab_to_box(&self, p: Vector3<f64>) -> Vector3<f64> {
        self.spec_to_box(self.lab_to_spec(p))
    }

    pub fn box_to_lab(&self, p: Vector3<f64>) -> Vector3<f64> {
        self.spec_to_lab(self.box_to_spec(p))
    }

    /// Convert a point (mm) between any two frames.
    pub fn convert(&self, from: Frame, to: Frame, p: Vector3<f64>) -> Vector3<f64> {
        use Frame::*;
        match (from, to) {
            (Lab, HallCenter) => self.lab_to_hall_center(p),
            (HallCenter, Lab) => self.hall_center_to_lab(p),
            (HallCenter, Spectrometer) => self.hall_center_to_spec(p),
            (Spectrometer, HallCenter) => self.spec_to_hall_center(p),
            (Spectrometer, Box) => self.spec_to_box(p),
            (Box, Spectrometer) => self.box_to_spec(p),
            (Lab, Spectrometer) => self.lab_to_spec(p),
            (Spectrometer, Lab) => self.spec_to_lab(p),
            (HallCenter, Box) => self.hall_center_to_box(p),
            (Box, HallCenter) => self.box_to_hall_center(p),
            (Lab, Box) => self.lab_to_box(p),
            (Box, Lab) => self.box_to_lab(p),
            (Lab, Lab) | (HallCenter, HallCenter) | (Spectrometer, Spectrometer) | (Box, Box) => p,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn tilted_config() -> BoxGeometryConfig {
        BoxGeometryConfig {
            lab_offset: [
                Length::from_meters(0.0),
                Length::from_meters(0.05),
                Length::from_meters(-0.3),
            ],
            spec_angle_h: Angle::from_degrees(-16.9),
            spec_angle_v: Angle::from_degrees(1.5),
            dmag: Length::from_meters(1.63),
            center: [Length::from_millimeters(12.5), Length::from_millimeters(-40.0)],
            rotation: Angle::from_degrees(3.0),
            d0: Length::from_meters(2.1),
            size: [Length::from_meters(0.4), Length::from_meters(1.5)],
        }
    }

    fn random_points(n: usize) -> Vec<Vector3<f64>> {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        (0..n)
            .map(|_| {
                Vector3::new(
                    rng.gen_range(-2000.0..2000.0),
                    rng.gen_range(-2000.0..2000.0),
                    rng.gen_range(-5000.0..10000.0),
                )
            })
            .collect()
    }

    #[test]
    fn test_adjacent_round_trips() {
        let geom = BoxGeometry::new(tilted_config()).unwrap();

        for p in random_points(200) {
            assert_relative_eq!(geom.hall_center_to_lab(geom.lab_to_hall_center(p)), p, epsilon = 1e-9);
            assert_relative_eq!(geom.spec_to_hall_center(geom.hall_center_to_spec(p)), p, epsilon = 1e-9);
            assert_relative_eq!(geom.box_to_spec(geom.spec_to_box(p)), p, epsilon = 1e-9);

            // and the reverse direction
            assert_relative_eq!(geom.lab_to_hall_center(geom.hall_center_to_lab(p)), p, epsilon = 1e-9);
            assert_relative_eq!(geom.hall_center_to_spec(geom.spec_to_hall_center(p)), p, epsilon = 1e-9);
            assert_relative_eq!(geom.spec_to_box(geom.box_to_spec(p)), p, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_chained_round_trips() {
        let geom = BoxGeometry::new(tilted_config()).unwrap();

        for p in random_points(100) {
            assert_relative_eq!(geom.spec_to_lab(geom.lab_to_spec(p)), p, epsilon = 1e-9);
            assert_relative_eq!(geom.box_to_lab(geom.lab_to_box(p)), p, epsilon = 1e-9);
            assert_relative_eq!(geom.box_to_hall_center(geom.hall_center_to_box(p)), p, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_chained_equals_composition() {
        let geom = BoxGeometry::new(tilted_config()).unwrap();

        for p in random_points(50) {
            let composed = geom.spec_to_box(geom.hall_center_to_spec(geom.lab_to_hall_center(p)));
            assert_eq!(geom.lab_to_box(p), composed);

            let composed_back = geom.hall_center_to_lab(geom.spec_to_hall_center(geom.box_to_spec(p)));
            assert_eq!(geom.box_to_lab(p), composed_back);
        }
    }

    #[test]
    fn test_d0_offset_along_stack_axis() {
        let geom = BoxGeometry::new(BoxGeometryConfig::on_axis(1.5, 0.2, 0.4)).unwrap();

        let in_box = geom.spec_to_box(Vector3::new(0.0, 0.0, 2000.0));
        assert_relative_eq!(in_box.z, 500.0, epsilon = 1e-9);

        let in_spec = geom.box_to_spec(Vector3::new(0.0, 0.0, 500.0));
        assert_relative_eq!(in_spec.z, 2000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_d0_does_not_touch_transverse() {
        let geom = BoxGeometry::new(BoxGeometryConfig::on_axis(1.5, 0.2, 0.4)).unwrap();
        let p = geom.spec_to_box(Vector3::new(31.0, -17.0, 0.0));

        assert_relative_eq!(p.x, 31.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, -17.0, epsilon = 1e-12);
        assert_relative_eq!(p.z, -1500.0, epsilon = 1e-9);
    }

    #[test]
    fn test_spectrometer_arm_rotation() {
        // Arm swung 90° about hall y with the origin 1 m out along it
        let config = BoxGeometryConfig {
            spec_angle_h: Angle::from_degrees(90.0),
            dmag: Length::from_meters(1.0),
            ..BoxGeometryConfig::default()
        };
        let geom = BoxGeometry::new(config).unwrap();

        // Spectrometer z axis lies along hall +x
        let origin = geom.spec_to_hall_center(Vector3::zeros());
        assert_relative_eq!(origin, Vector3::new(1000.0, 0.0, 0.0), epsilon = 1e-9);

        let on_axis = geom.hall_center_to_spec(Vector3::new(3000.0, 0.0, 0.0));
        assert_relative_eq!(on_axis, Vector3::new(0.0, 0.0, 2000.0), epsilon = 1e-9);
    }

    #[test]
    fn test_lab_offset() {
        let config = BoxGeometryConfig {
            lab_offset: [
                Length::from_meters(0.1),
                Length::from_meters(0.0),
                Length::from_meters(-0.2),
            ],
            ..BoxGeometryConfig::default()
        };
        let geom = BoxGeometry::new(config).unwrap();

        let hall = geom.lab_to_hall_center(Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(hall, Vector3::new(101.0, 2.0, -197.0), epsilon = 1e-9);
    }

    #[test]
    fn test_convert_matches_named_functions() {
        let geom = BoxGeometry::new(tilted_config()).unwrap();
        let p = Vector3::new(10.0, -20.0, 3000.0);

        assert_eq!(geom.convert(Frame::Lab, Frame::Box, p), geom.lab_to_box(p));
        assert_eq!(geom.convert(Frame::Box, Frame::HallCenter, p), geom.box_to_hall_center(p));
        assert_eq!(geom.convert(Frame::Spectrometer, Frame::Spectrometer, p), p);

        for from in Frame::all() {
            for to in Frame::all() {
                let there = geom.convert(from, to, p);
                assert_relative_eq!(geom.convert(to, from, there), p, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_non_finite_input_propagates() {
        let geom = BoxGeometry::new(tilted_config()).unwrap();

        let out = geom.lab_to_box(Vector3::new(f64::NAN, 0.0, 0.0));
        assert!(out.iter().any(|v| v.is_nan()));

        let out = geom.spec_to_box(Vector3::new(0.0, 0.0, f64::INFINITY));
        assert_eq!(out.z, f64::INFINITY);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = BoxGeometryConfig::on_axis(1.0, -0.2, 0.4);
        assert!(matches!(
            BoxGeometry::new(config.clone()),
            Err(GeometryError::InvalidSize { axis: 'x', .. })
        ));

        config.size[0] = Length::from_meters(0.2);
        config.d0 = Length::from_meters(f64::NAN);
        assert_eq!(BoxGeometry::new(config).unwrap_err(), GeometryError::NonFinite("d0"));
    }

    #[test]
    fn test_config_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("box.json");

        let config = tilted_config();
        config.save_to_file(&path).unwrap();
        let loaded = BoxGeometryConfig::load_from_file(&path).unwrap();

        assert_relative_eq!(loaded.d0.as_meters(), 2.1, epsilon = 1e-12);
        assert_relative_eq!(loaded.spec_angle_h.as_degrees(), -16.9, epsilon = 1e-9);
        assert_relative_eq!(loaded.center[1].as_millimeters(), -40.0, epsilon = 1e-9);
    }
}
