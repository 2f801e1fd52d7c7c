//! Keyed text geometry database
//!
//! Plain-text files of `key = value ...` lines. A line of the form
//! `[ 2016-10-01 00:00:00 ]` opens a section whose assignments apply from that
//! time onward; lines before the first stamp apply from the beginning.
//! `#` starts a comment.
//!
//! ```text
//! # spectrometer arm, shared by every chamber
//! spec.angle_h = -16.9
//! spec.dmag    = 1.63
//!
//! gem1.d0      = 1.5
//! gem1.size    = 0.40 1.50
//! gem1.nplanes = 2
//!
//! [ 2017-02-01 00:00:00 ]
//! gem1.d0      = 1.52
//! ```
//!
//! For a requested time the value of a key is taken from the latest section
//! that has already started; within a section the last assignment wins.

use chrono::NaiveDateTime;
use sbs_geometry::{Angle, AngleExt, BoxGeometryConfig, Length, LengthExt};
use std::path::{Path, PathBuf};
use thiserror::Error;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Largest plane count a geometry block may declare
pub const MAX_PLANES: usize = u16::MAX as usize;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("cannot read database {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: bad timestamp '{text}'")]
    BadTimestamp { line: usize, text: String },

    #[error("line {line}: expected 'key = value', got '{text}'")]
    Syntax { line: usize, text: String },

    #[error("key '{key}': cannot parse '{value}' as a number")]
    InvalidValue { key: String, value: String },

    #[error("key '{key}': expected {expected} values, found {found}")]
    WrongArity {
        key: String,
        expected: usize,
        found: usize,
    },

    #[error("key '{key}' missing from partially defined geometry block")]
    MissingKey { key: String },
}

/// Source of numeric geometry values, looked up by key at a point in time.
pub trait GeometrySource {
    /// Raw values of `key` valid at `at`, or `None` if the key is not defined.
    fn lookup(&self, key: &str, at: NaiveDateTime) -> Result<Option<Vec<f64>>, DatabaseError>;
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    key: String,
    values: Vec<String>,
    valid_from: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct KeyedDatabase {
    entries: Vec<Entry>,
}

impl KeyedDatabase {
    pub fn parse(text: &str) -> Result<Self, DatabaseError> {
        let mut entries = Vec::new();
        let mut valid_from = None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            if let Some(stamp) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let stamp = stamp.trim();
                let parsed = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).map_err(|_| {
                    DatabaseError::BadTimestamp {
                        line: line_no,
                        text: stamp.to_string(),
                    }
                })?;
                valid_from = Some(parsed);
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| DatabaseError::Syntax {
                line: line_no,
                text: line.to_string(),
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(DatabaseError::Syntax {
                    line: line_no,
                    text: line.to_string(),
                });
            }

            entries.push(Entry {
                key: key.to_string(),
                values: value.split_whitespace().map(str::to_string).collect(),
                valid_from,
            });
        }

        log::debug!("parsed geometry database with {} entries", entries.len());
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, DatabaseError> {
        let text = std::fs::read_to_string(path).map_err(|source| DatabaseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw text values of `key` valid at `at`.
    pub fn get(&self, key: &str, at: NaiveDateTime) -> Option<&[String]> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.key == key && e.valid_from.map_or(true, |t| t <= at))
            .max_by_key(|(index, e)| (e.valid_from, *index))
            .map(|(_, e)| e.values.as_slice())
    }
}

impl GeometrySource for KeyedDatabase {
    fn lookup(&self, key: &str, at: NaiveDateTime) -> Result<Option<Vec<f64>>, DatabaseError> {
        let Some(values) = self.get(key, at) else {
            return Ok(None);
        };
        values
            .iter()
            .map(|v| {
                v.parse::<f64>().map_err(|_| DatabaseError::InvalidValue {
                    key: key.to_string(),
                    value: v.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

/// Everything a chamber needs from its geometry block.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGeometry {
    pub box_config: BoxGeometryConfig,
    pub plane_count: usize,
}

fn expect_arity(key: &str, values: Vec<f64>, expected: usize) -> Result<Vec<f64>, DatabaseError> {
    if values.len() != expected {
        return Err(DatabaseError::WrongArity {
            key: key.to_string(),
            expected,
            found: values.len(),
        });
    }
    Ok(values)
}

/// `{prefix}.{name}` if defined, else the unprefixed `{name}`.
fn lookup_inherited(
    source: &dyn GeometrySource,
    prefix: &str,
    name: &str,
    at: NaiveDateTime,
    expected: usize,
) -> Result<Option<Vec<f64>>, DatabaseError> {
    let scoped = format!("{prefix}.{name}");
    let (key, found) = match source.lookup(&scoped, at)? {
        Some(values) => (scoped, Some(values)),
        None => (name.to_string(), source.lookup(name, at)?),
    };
    found.map(|v| expect_arity(&key, v, expected)).transpose()
}

/// Resolve the geometry block `prefix` at time `at`.
///
/// Returns `Ok(None)` when none of the block's required keys (`d0`, `size`,
/// `nplanes`) are defined. A block with only some of them is an error.
/// Spectrometer (`spec.angle_h`, `spec.angle_v`, `spec.dmag`) and lab
/// (`lab.offset`) keys may be given per chamber or shared; they default to zero.
pub fn resolve_geometry(
    source: &dyn GeometrySource,
    prefix: &str,
    at: NaiveDateTime,
) -> Result<Option<ResolvedGeometry>, DatabaseError> {
    let d0 = lookup_inherited(source, prefix, "d0", at, 1)?;
    let size = lookup_inherited(source, prefix, "size", at, 2)?;
    let nplanes = lookup_inherited(source, prefix, "nplanes", at, 1)?;

    let (d0, size, nplanes) = match (d0, size, nplanes) {
        (None, None, None) => return Ok(None),
        (Some(d0), Some(size), Some(nplanes)) => (d0[0], size, nplanes[0]),
        (d0, size, _) => {
            let missing = if d0.is_none() {
                "d0"
            } else if size.is_none() {
                "size"
            } else {
                "nplanes"
            };
            return Err(DatabaseError::MissingKey {
                key: format!("{prefix}.{missing}"),
            });
        }
    };

    if !(0.0..=MAX_PLANES as f64).contains(&nplanes) || nplanes.fract() != 0.0 {
        return Err(DatabaseError::InvalidValue {
            key: format!("{prefix}.nplanes"),
            value: nplanes.to_string(),
        });
    }

    let mut config = BoxGeometryConfig::on_axis(d0, size[0], size[1]);

    if let Some(position) = lookup_inherited(source, prefix, "position", at, 2)? {
        config.center = [Length::from_meters(position[0]), Length::from_meters(position[1])];
    }
    if let Some(angle) = lookup_inherited(source, prefix, "angle", at, 1)? {
        config.rotation = Angle::from_degrees(angle[0]);
    }
    if let Some(angle_h) = lookup_inherited(source, prefix, "spec.angle_h", at, 1)? {
        config.spec_angle_h = Angle::from_degrees(angle_h[0]);
    }
    if let Some(angle_v) = lookup_inherited(source, prefix, "spec.angle_v", at, 1)? {
        config.spec_angle_v = Angle::from_degrees(angle_v[0]);
    }
    if let Some(dmag) = lookup_inherited(source, prefix, "spec.dmag", at, 1)? {
        config.dmag = Length::from_meters(dmag[0]);
    }
    if let Some(offset) = lookup_inherited(source, prefix, "lab.offset", at, 3)? {
        config.lab_offset = [
            Length::from_meters(offset[0]),
            Length::from_meters(offset[1]),
            Length::from_meters(offset[2]),
        ];
    }

    Ok(Some(ResolvedGeometry {
        box_config: config,
        plane_count: nplanes as usize,
    }))
}
