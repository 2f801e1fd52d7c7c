//! sbs-geometry - Reference-frame conversions for spectrometer detector boxes
//!
//! Converts 3-D points between the four nested frames of the experimental
//! hall:
//!
//! - **Lab** - target-centred laboratory frame
//! - **HallCenter** - hall pivot frame
//! - **Spectrometer** - frame attached to the spectrometer arm
//! - **Box** - local frame of one detector box (chamber)
//!
//! # Example
//!
//! ```
//! use sbs_geometry::{BoxGeometry, BoxGeometryConfig};
//! use nalgebra::Vector3;
//!
//! let geom = BoxGeometry::new(BoxGeometryConfig::on_axis(1.5, 0.2, 0.4)).unwrap();
//! let in_box = geom.spec_to_box(Vector3::new(0.0, 0.0, 2000.0));
//! assert!((in_box.z - 500.0).abs() < 1e-9);
//! ```

pub mod affine2;
pub mod box_geometry;
pub mod frame;
pub mod units;

pub use affine2::Affine2;
pub use box_geometry::{BoxGeometry, BoxGeometryConfig, GeometryError};
pub use frame::Frame;
pub use units::{Angle, AngleExt, Length, LengthExt};
