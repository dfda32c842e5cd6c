//! Normalized weights for pixelation raster values.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use thiserror::Error;

/// Errors from handling pixel weights.
#[derive(Debug, Error)]
pub enum WeightError {
    /// A weight outside [0, 1].
    #[error("invalid weight value {0:.6}")]
    InvalidWeight(f64),

    /// A required column is missing from the header.
    #[error("expecting field {field:?}")]
    MissingField {
        /// Name of the missing column.
        field: &'static str,
    },

    /// A column of a row could not be parsed.
    #[error("on row {row}: field {field:?}: {cause}")]
    Field {
        /// Row of the malformed value.
        row: usize,
        /// Name of the malformed column.
        field: &'static str,
        /// Description of the failure.
        cause: String,
    },

    /// The underlying reader or writer failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy)]
struct Weight {
    w: f64,
    ln: f64,
}

/// A set of normalized weights (values between 0 and 1) for the raster
/// values given to a pixel. Each pixel is assumed to be independent of
/// all other pixels.
///
/// The raster value 0 is always defined, with weight 0.
#[derive(Debug, Clone)]
pub struct PixWeight(BTreeMap<i32, Weight>);

impl PixWeight {
    /// Creates a new weight store, with the default entry for the
    /// raster value 0.
    pub fn new() -> Self {
        let mut w = BTreeMap::new();
        w.insert(
            0,
            Weight {
                w: 0.0,
                ln: f64::NEG_INFINITY,
            },
        );
        Self(w)
    }

    /// Returns the normalized weight for a raster value. Undefined
    /// values weigh 0.
    pub fn weight(&self, v: i32) -> f64 {
        match self.0.get(&v) {
            Some(w) => w.w,
            None => 0.0,
        }
    }

    /// Returns the natural logarithm of the weight for a raster value.
    /// Undefined and zero weighted values report negative infinity.
    pub fn log_weight(&self, v: i32) -> f64 {
        match self.0.get(&v) {
            Some(w) => w.ln,
            None => f64::NEG_INFINITY,
        }
    }

    /// Sets the normalized weight for a raster value.
    /// The weight must be in [0, 1].
    pub fn set(&mut self, v: i32, w: f64) -> Result<(), WeightError> {
        if !(0.0..=1.0).contains(&w) {
            return Err(WeightError::InvalidWeight(w));
        }
        self.0.insert(v, Weight { w, ln: w.ln() });
        Ok(())
    }

    /// Returns the raster values that have a defined weight,
    /// in ascending order.
    pub fn values(&self) -> Vec<i32> {
        self.0.keys().copied().collect()
    }

    /// Reads the weights from a TSV table with the columns `key` and
    /// `weight`; any other column is ignored. Blank lines and `#`
    /// comments are skipped.
    pub fn read_tsv(r: impl BufRead) -> Result<Self, WeightError> {
        let mut lines = r.lines().enumerate();

        // header
        let mut key_col = None;
        let mut weight_col = None;
        for (_, ln) in lines.by_ref() {
            let ln = ln?;
            if ln.trim().is_empty() || ln.starts_with('#') {
                continue;
            }
            for (i, h) in ln.split('\t').enumerate() {
                match h.to_lowercase().as_str() {
                    "key" => key_col = Some(i),
                    "weight" => weight_col = Some(i),
                    _ => (),
                }
            }
            break;
        }
        let key_col = key_col.ok_or(WeightError::MissingField { field: "key" })?;
        let weight_col = weight_col.ok_or(WeightError::MissingField { field: "weight" })?;

        let mut pw = Self::new();
        for (i, ln) in lines {
            let row = i + 1;
            let ln = ln?;
            if ln.trim().is_empty() || ln.starts_with('#') {
                continue;
            }
            let cols: Vec<&str> = ln.split('\t').collect();

            let k: i32 = parse_field(&cols, key_col, row, "key")?;
            let w: f64 = parse_field(&cols, weight_col, row, "weight")?;
            if !(0.0..=1.0).contains(&w) {
                return Err(WeightError::Field {
                    row,
                    field: "weight",
                    cause: format!("invalid weight value {w:.6}"),
                });
            }
            pw.0.insert(k, Weight { w, ln: w.ln() });
        }
        Ok(pw)
    }

    /// Encodes the weights as a TSV table with the columns `key` and
    /// `weight`, in ascending key order.
    pub fn write_tsv(&self, mut w: impl Write) -> Result<(), WeightError> {
        writeln!(w, "# normalized pixel weights")?;
        writeln!(w, "key\tweight")?;
        for (v, wt) in &self.0 {
            writeln!(w, "{v}\t{:.6}", wt.w)?;
        }
        Ok(())
    }
}

impl Default for PixWeight {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_field<T: std::str::FromStr>(
    cols: &[&str],
    col: usize,
    row: usize,
    field: &'static str,
) -> Result<T, WeightError>
where
    T::Err: std::fmt::Display,
{
    let s = cols.get(col).ok_or_else(|| WeightError::Field {
        row,
        field,
        cause: "missing value".to_string(),
    })?;
    s.parse().map_err(|e: T::Err| WeightError::Field {
        row,
        field,
        cause: e.to_string(),
    })
}
