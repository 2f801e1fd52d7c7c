//! In-plane placement of a detector box
//!
//! A box sits in the spectrometer's transverse (x, y) plane, rotated about the
//! stack axis and displaced from the spectrometer axis:
//! ```text
//! spec_xy = R(angle) * box_xy + t
//! box_xy  = R(-angle) * (spec_xy - t)
//! ```

use nalgebra::{Rotation2, Vector2};

/// Rigid box-to-spectrometer transverse transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Affine2 {
    rotation: Rotation2<f64>,
    /// Box centre in the spectrometer transverse plane, mm
    translation: Vector2<f64>,
}

impl Affine2 {
    /// Rotation by `angle_rad` (counter-clockwise) then shift by `translation`.
    pub fn rigid(angle_rad: f64, translation: Vector2<f64>) -> Self {
        Self {
            rotation: Rotation2::new(angle_rad),
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::rigid(0.0, Vector2::zeros())
    }

    pub fn angle(&self) -> f64 {
        self.rotation.angle()
    }

    pub fn translation(&self) -> &Vector2<f64> {
        &self.translation
    }

    /// Spectrometer transverse coordinates to box coordinates.
    pub fn to_box(&self, spec_xy: Vector2<f64>) -> Vector2<f64> {
        self.rotation.inverse_transform_vector(&(spec_xy - self.translation))
    }

    /// Box coordinates to spectrometer transverse coordinates.
    pub fn to_spec(&self, box_xy: Vector2<f64>) -> Vector2<f64> {
        self.rotation * box_xy + self.translation
    }
}
