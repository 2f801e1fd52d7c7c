//! GEM chambers for the spectrometer trackers
//!
//! - **Chamber** - a detector box placed in the hall through its
//!   [`sbs_geometry::BoxGeometry`], owning a fixed set of readout planes
//! - **Plane** - one readout layer; collects the hits an event addresses to it
//! - **Database** - keyed, time-stamped text store the geometry is read from

pub mod chamber;
pub mod database;
pub mod plane;

pub use chamber::{Chamber, ChamberError, DecodeStatus};
pub use database::{resolve_geometry, DatabaseError, GeometrySource, KeyedDatabase, ResolvedGeometry};
pub use plane::{LocalHit, Plane};
