//! Typed lengths and angles for detector geometry
//!
//! Geometry is configured in meters and degrees but every frame conversion
//! works in millimeters. Carrying configuration values as `uom` quantities
//! keeps the meter/millimeter switch explicit at the point of use.

use uom::si::angle::{degree, radian};
use uom::si::length::{centimeter, meter, millimeter};

/// Length quantity (stored internally in meters)
pub type Length = uom::si::f64::Length;

/// Plane angle quantity (stored internally in radians)
pub type Angle = uom::si::f64::Angle;

/// Extension trait for the length units used by detector geometry
pub trait LengthExt {
    /// Create length from millimeters
    fn from_millimeters(mm: f64) -> Self;

    /// Get length in millimeters
    fn as_millimeters(&self) -> f64;

    /// Create length from centimeters
    fn from_centimeters(cm: f64) -> Self;

    /// Get length in centimeters
    fn as_centimeters(&self) -> f64;

    /// Create length from meters
    fn from_meters(m: f64) -> Self;

    /// Get length in meters
    fn as_meters(&self) -> f64;
}

/// Extension trait for angle conversions
pub trait AngleExt {
    /// Create angle from degrees
    fn from_degrees(deg: f64) -> Self;

    /// Get angle in degrees
    fn as_degrees(&self) -> f64;

    /// Create angle from radians
    fn from_radians(rad: f64) -> Self;

    /// Get angle in radians
    fn as_radians(&self) -> f64;
}

impl LengthExt for Length {
    fn from_millimeters(mm: f64) -> Self {
        Length::new::<millimeter>(mm)
    }

    fn as_millimeters(&self) -> f64 {
        self.get::<millimeter>()
    }

    fn from_centimeters(cm: f64) -> Self {
        Length::new::<centimeter>(cm)
    }

    fn as_centimeters(&self) -> f64 {
        self.get::<centimeter>()
    }

    fn from_meters(m: f64) -> Self {
        Length::new::<meter>(m)
    }

    fn as_meters(&self) -> f64 {
        self.get::<meter>()
    }
}

impl AngleExt for Angle {
    fn from_degrees(deg: f64) -> Self {
        Angle::new::<degree>(deg)
    }

    fn as_degrees(&self) -> f64 {
        self.get::<degree>()
    }

    fn from_radians(rad: f64) -> Self {
        Angle::new::<radian>(rad)
    }

    fn as_radians(&self) -> f64 {
        self.get::<radian>()
    }
}
