//! A plate tectonic rotation model.
//!
//! The model is read from a plate rotation file in the format used by the
//! GPlates software: one Euler rotation per row, anchored in the present
//! day (total rotations). Rotations for an arbitrary age are produced by
//! composing the global circuit of plate rotations, interpolating between
//! stage poles with quaternions, following the procedures of Cox & Hart
//! (1986), "Plate tectonics: How it works", chapter 7.

use std::collections::{BTreeMap, HashSet};
use std::io::BufRead;

use nalgebra::Vector3;
use thiserror::Error;
use tracing::{debug, warn};

use globe::Point;

use crate::quaternion::Quaternion;

/// Used to transform rotation ages (a float in million years)
/// to an integer in years.
const MILLION_YEARS: f64 = 1_000_000.0;

/// Plate ID used as a comment marker by legacy rotation files.
const COMMENT_PLATE: u32 = 999;

/// Errors from reading a plate rotation file.
#[derive(Debug, Error)]
pub enum RotationError {
    /// The underlying reader failed.
    #[error("row {row}: {source}")]
    Io {
        /// Row at which the failure happened.
        row: usize,
        /// The wrapped I/O error.
        source: std::io::Error,
    },

    /// A column could not be parsed.
    #[error("row {row}: column {field:?}: {cause}")]
    Parse {
        /// Row of the malformed value.
        row: usize,
        /// Name of the malformed column.
        field: &'static str,
        /// Description of the failure.
        cause: String,
    },

    /// A coordinate column is out of its geographic range.
    #[error("row {row}: column {field:?}: bad value {value:.3}")]
    OutOfRange {
        /// Row of the offending value.
        row: usize,
        /// Name of the offending column.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// An Euler rotation of a moving plate relative to a fixed plate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Euler {
    /// Starting time for the rotation, in years.
    pub t: i64,
    /// Euler pole.
    pub pole: Point,
    /// Angle of the rotation, in radians.
    pub angle: f64,
    /// ID of the fixed plate.
    pub fix: u32,
}

/// A rotation model: every plate with its set of total rotations,
/// sorted by age.
#[derive(Debug, Default)]
pub struct RotationModel {
    plates: BTreeMap<u32, Vec<Euler>>,
}

impl RotationModel {
    /// Decodes a rotation file to produce a set of plates, each one with
    /// its set of rotations.
    ///
    /// In a rotation file each column is separated by one or more spaces
    /// and each row represents an Euler rotation:
    ///
    ///   - the ID of the moving plate;
    ///   - the most recent time, in million years;
    ///   - the latitude of the Euler pole;
    ///   - the longitude of the Euler pole;
    ///   - the angle of the rotation, in degrees;
    ///   - the ID of the fixed plate.
    ///
    /// Any additional columns are taken as commentary, and rows with
    /// fewer than six columns are ignored. Because old programs use plate
    /// ID 999 as comment, that plate ID is ignored. Plate ID 0 is
    /// interpreted as the Earth rotation axis.
    pub fn read(r: impl BufRead) -> Result<Self, RotationError> {
        let mut plates: BTreeMap<u32, Vec<Euler>> = BTreeMap::new();

        for (i, line) in r.lines().enumerate() {
            let row = i + 1;
            let ln = line.map_err(|source| RotationError::Io { row, source })?;

            let cols: Vec<&str> = ln.split_whitespace().collect();
            if cols.len() < 6 {
                continue;
            }

            let plate = parse_col::<u32>(cols[0], row, "moving plate")?;
            if plate == COMMENT_PLATE {
                continue;
            }

            let t = parse_col::<f64>(cols[1], row, "time")?;

            let lat = parse_col::<f64>(cols[2], row, "latitude")?;
            if !(-90.0..=90.0).contains(&lat) {
                return Err(RotationError::OutOfRange {
                    row,
                    field: "latitude",
                    value: lat,
                });
            }

            let lon = parse_col::<f64>(cols[3], row, "longitude")?;
            if !(-180.0..=180.0).contains(&lon) {
                return Err(RotationError::OutOfRange {
                    row,
                    field: "longitude",
                    value: lon,
                });
            }

            let ang = parse_col::<f64>(cols[4], row, "angle")?;
            let fix = parse_col::<u32>(cols[5], row, "fixed plate")?;

            let rot = Euler {
                t: (t * MILLION_YEARS) as i64,
                pole: Point::new(lat, lon),
                angle: ang.to_radians(),
                fix,
            };

            let list = plates.entry(plate).or_default();
            if list.iter().any(|r| r.t == rot.t && r.fix == rot.fix) {
                debug!(row, plate, "skipping repeated rotation");
                continue;
            }
            list.push(rot);
        }

        for (&plate, list) in plates.iter_mut() {
            normalize(plate, list);
        }

        Ok(Self { plates })
    }

    /// Returns a total rotation (i.e. a rotation from current time) for a
    /// plate at a particular time, in years. It returns `None` if there
    /// is no rotation defined at the indicated time.
    ///
    /// The rotation is the composition of the global circuit: the chain
    /// of rotations through each fixed plate, ending at a plate without
    /// an entry in the model (usually plate 0, the Earth rotation axis).
    ///
    /// # Panics
    ///
    /// Panics if the chain of fixed plates is cyclic.
    pub fn rotation(&self, plate: u32, t: i64) -> Option<Quaternion> {
        let mut list = self.plates.get(&plate)?.as_slice();
        if list.is_empty() {
            return None;
        }

        let mut visited = HashSet::new();
        visited.insert(plate);

        let mut qt = Quaternion::identity();
        loop {
            let x = time_pos(list, t)?;

            let mut tot = Quaternion::from_axis_angle(&list[x].pole.vector(), list[x].angle);
            if list[x].t != t {
                tot = stage(list, x, t) * tot;
            }
            qt = tot * qt;

            let fix = list[x].fix;
            match self.plates.get(&fix) {
                Some(next) => {
                    assert!(
                        visited.insert(fix),
                        "cyclic plate circuit at plate {fix} (starting from plate {plate})"
                    );
                    list = next.as_slice();
                }
                None => break,
            }
        }

        Some(qt)
    }

    /// Returns the list of Euler rotations for a given plate.
    pub fn euler(&self, plate: u32) -> Option<&[Euler]> {
        self.plates.get(&plate).map(|l| l.as_slice())
    }

    /// Returns the plates defined for the rotation model,
    /// in ascending order.
    pub fn plates(&self) -> Vec<u32> {
        self.plates.keys().copied().collect()
    }
}

/// Applies a rotation to the vector of a geographic coordinate.
pub fn rotate(r: &Quaternion, lat: f64, lon: f64) -> Vector3<f64> {
    r.rotate_vector(&Point::new(lat, lon).vector())
}

/// Returns the inverse of a rotation.
pub fn inverse(r: &Quaternion) -> Quaternion {
    r.conjugate()
}

fn parse_col<T: std::str::FromStr>(
    s: &str,
    row: usize,
    field: &'static str,
) -> Result<T, RotationError>
where
    T::Err: std::fmt::Display,
{
    s.parse().map_err(|e: T::Err| RotationError::Parse {
        row,
        field,
        cause: e.to_string(),
    })
}

/// Sorts and cleans up the rotation list of a plate.
fn normalize(plate: u32, list: &mut Vec<Euler>) {
    list.sort_by_key(|r| r.t);

    // add a zero rotation by default, if not defined
    if list[0].t > 0 {
        let r = Euler {
            t: 0,
            pole: *globe::NORTH_POLE,
            angle: 0.0,
            fix: list[0].fix,
        };
        list.insert(0, r);
    }

    // remove rows of a plate jump whose fixed plate
    // matches neither temporal neighbor
    let mut i = 0;
    while i < list.len() {
        if i == 0 || i + 1 == list.len() {
            i += 1;
            continue;
        }
        let r = list[i];
        if list[i + 1].t != r.t && list[i - 1].t != r.t {
            i += 1;
            continue;
        }

        let prev = list[..=i].iter().rev().find(|v| v.t != r.t).map(|v| v.fix);
        if prev == Some(r.fix) {
            i += 1;
            continue;
        }
        let post = list[i..].iter().find(|v| v.t != r.t).map(|v| v.fix);
        if post == Some(r.fix) {
            i += 1;
            continue;
        }

        warn!(plate, t = r.t, fix = r.fix, "removing conflicting plate jump");
        list.remove(i);
        i += 1;
    }

    // check that fixed plate jumps are well sorted, so any time stage
    // will be bounded by two rotations relative to the same fixed plate
    for i in 1..list.len().saturating_sub(1) {
        if list[i + 1].t != list[i].t {
            continue;
        }
        if list[i - 1].fix != list[i].fix {
            list.swap(i, i + 1);
        }
    }
}

/// Returns the position of the time that adjusts better
/// to the required rotation.
fn time_pos(list: &[Euler], t: i64) -> Option<usize> {
    list.iter().position(|r| r.t >= t)
}

/// Returns the stage rotation between two total rotations, scaled to the
/// time we are looking for (follows the procedure given by Cox & Hart,
/// pp. 245-246).
fn stage(list: &[Euler], x: usize, t: i64) -> Quaternion {
    let q1 = Quaternion::from_axis_angle(&list[x].pole.vector(), -list[x].angle);
    let q2 = Quaternion::from_axis_angle(&list[x - 1].pole.vector(), list[x - 1].angle);
    let s = q2 * q1;

    let delta = (list[x].t - t) as f64 / (list[x].t - list[x - 1].t) as f64;

    // in quaternions, the exponential to delta
    // gives us the fraction of the rotation
    s.pow(delta)
}
