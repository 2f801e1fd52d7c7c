//! Convert a point between reference frames using a chamber's geometry

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use clap::Parser;
use log::info;
use nalgebra::Vector3;
use sbs_chamber::{Chamber, KeyedDatabase};
use sbs_geometry::Frame;
use std::path::PathBuf;

/// Parse a point given as "x,y,z" in millimeters
fn parse_point(s: &str) -> Result<Vector3<f64>, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err("Point must be in format 'x,y,z'".to_string());
    }

    let mut values = [0.0; 3];
    for (value, part) in values.iter_mut().zip(parts) {
        *value = part
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("Invalid coordinate '{}'", part.trim()))?;
    }
    Ok(Vector3::from(values))
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| format!("Invalid timestamp '{s}': {e}"))
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert a point between lab, hall, spectrometer and chamber frames")]
struct Args {
    /// Geometry database file
    #[arg(long)]
    db: PathBuf,

    /// Chamber name (geometry block prefix)
    #[arg(long, default_value = "gem1")]
    chamber: String,

    /// Geometry timestamp "YYYY-MM-DD HH:MM:SS" (defaults to now)
    #[arg(long, value_parser = parse_timestamp)]
    at: Option<NaiveDateTime>,

    /// Frame of the input point (lab, hall, spec, box)
    #[arg(long, default_value_t = Frame::Lab)]
    from: Frame,

    /// Frame to convert into
    #[arg(long, default_value_t = Frame::Box)]
    to: Frame,

    /// Point in millimeters as "x,y,z"
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    point: Vector3<f64>,

    /// Print the chamber summary before converting
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let db = KeyedDatabase::load(&args.db)
        .with_context(|| format!("loading geometry database {}", args.db.display()))?;
    let at = args.at.unwrap_or_else(|| Utc::now().naive_utc());

    let mut chamber = Chamber::new(&args.chamber, "");
    chamber
        .read_geometry(&db, at, true)
        .with_context(|| format!("resolving geometry of chamber {}", args.chamber))?;
    info!("loaded geometry for {} at {}", chamber.name(), at);

    if args.verbose {
        println!("{chamber}");
    }

    let out = chamber.box_geometry().convert(args.from, args.to, args.point);
    println!(
        "{} ({:.3}, {:.3}, {:.3}) mm -> {} ({:.3}, {:.3}, {:.3}) mm",
        args.from, args.point.x, args.point.y, args.point.z, args.to, out.x, out.y, out.z
    );

    if (args.to == Frame::Box) && !chamber.contains(out.x, out.y) {
        println!("note: point lies outside the chamber's active area");
    }

    Ok(())
}
