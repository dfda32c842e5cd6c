//! A pixelated set of values at different time stages.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::sync::Arc;

use globe::{Pixelation, AGE_OF_EARTH};

use super::total::closest_stage_age;
use super::ModelError;
use crate::tsv::TsvReader;

/// Required columns of a time pixelation table.
const HEADER: [&str; 4] = ["equator", "age", "stage-pixel", "value"];

/// A pixelated set of values (for example, an environmental variable)
/// at different time stages.
///
/// Only positions and values are stored, so the identity of a pixel
/// through time is not preserved.
pub struct TimePix {
    pix: Arc<Pixelation>,
    stages: BTreeMap<i64, BTreeMap<usize, i32>>,
}

impl TimePix {
    /// Creates a new time pixelation based on an equal area pixelation.
    pub fn new(pix: Arc<Pixelation>) -> Self {
        Self {
            pix,
            stages: BTreeMap::new(),
        }
    }

    /// Returns the value for a pixel at a time stage. A pixel that was
    /// never set reports the default value (0).
    ///
    /// If the time stage itself is not defined, `None` is returned; to
    /// resolve an arbitrary age to a defined stage use [`TimePix::at_closest`].
    pub fn at(&self, age: i64, pixel: usize) -> Option<i32> {
        let st = self.stages.get(&age)?;
        Some(st.get(&pixel).copied().unwrap_or(0))
    }

    /// Returns the value for a pixel at the closest defined time stage
    /// (i.e. the oldest stage younger than the indicated age).
    ///
    /// # Panics
    ///
    /// Panics if no stage is defined.
    pub fn at_closest(&self, age: i64, pixel: usize) -> i32 {
        let age = self.closest_stage_age(age);
        self.at(age, pixel).unwrap_or(0)
    }

    /// Returns the age bounds (old, young), in years, of the stage that
    /// contains the given age. Above the oldest stage, the old bound is
    /// the age of the Earth.
    ///
    /// # Panics
    ///
    /// Panics if no stage is defined.
    pub fn bounds(&self, age: i64) -> (i64, i64) {
        let st = self.stages();
        let i = match st.binary_search(&age) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        if i + 1 >= st.len() {
            return (AGE_OF_EARTH, st[i]);
        }
        (st[i + 1], st[i])
    }

    /// Returns the closest stage age for a time (i.e. the age of the
    /// oldest stage younger than the indicated age). Ages outside the
    /// defined range clamp to the nearest stage.
    ///
    /// # Panics
    ///
    /// Panics if no stage is defined.
    pub fn closest_stage_age(&self, age: i64) -> i64 {
        closest_stage_age(&self.stages(), age)
    }

    /// Removes a pixel value at a time stage.
    pub fn del(&mut self, age: i64, pixel: usize) {
        if pixel >= self.pix.len() {
            return;
        }
        if let Some(st) = self.stages.get_mut(&age) {
            st.remove(&pixel);
        }
    }

    /// Returns the underlying equal area pixelation.
    pub fn pixelation(&self) -> &Arc<Pixelation> {
        &self.pix
    }

    /// Sets a value for a pixel at a time stage.
    ///
    /// # Panics
    ///
    /// Panics if the pixel ID is not valid for the pixelation.
    /// Callers must validate untrusted input at the boundary.
    pub fn set(&mut self, age: i64, pixel: usize, value: i32) {
        assert!(pixel < self.pix.len(), "pixel ID {pixel} is invalid");
        self.stages.entry(age).or_default().insert(pixel, value);
    }

    /// Returns the values of all set pixels at a given age, in years.
    pub fn stage(&self, age: i64) -> Option<&BTreeMap<usize, i32>> {
        self.stages.get(&age)
    }

    /// Returns the time stages defined for the time pixelation,
    /// in ascending order.
    pub fn stages(&self) -> Vec<i64> {
        self.stages.keys().copied().collect()
    }

    /// Reads the values of a time pixelation from a TSV table with the
    /// columns `equator`, `age` (in years), `stage-pixel` and `value`.
    ///
    /// If no pixelation is given, a new pixelation is created from the
    /// equator of the table.
    pub fn read_tsv(r: impl BufRead, pix: Option<Arc<Pixelation>>) -> Result<Self, ModelError> {
        let mut tsv = TsvReader::new(r, &HEADER)?;

        let mut pix = pix;
        let mut tp: Option<TimePix> = None;
        while let Some((row, rr)) = tsv.record()? {
            let eq: usize = tsv.parse(row, &rr, "equator")?;
            let pix = crate::tsv::resolve_pixelation(&mut pix, eq, row)?;
            let tp = tp.get_or_insert_with(|| TimePix::new(Arc::clone(&pix)));

            let age: i64 = tsv.parse(row, &rr, "age")?;

            let px: usize = tsv.parse(row, &rr, "stage-pixel")?;
            if px >= pix.len() {
                return Err(ModelError::InvalidPixel {
                    row,
                    field: "stage-pixel",
                    value: px,
                });
            }

            let v: i32 = tsv.parse(row, &rr, "value")?;
            tp.stages.entry(age).or_default().insert(px, v);
        }

        tp.ok_or(ModelError::Empty)
    }

    /// Encodes the time pixelation as a TSV table,
    /// sorted by age and pixel.
    pub fn write_tsv(&self, mut w: impl Write) -> Result<(), ModelError> {
        writeln!(w, "# time pixelation values")?;
        writeln!(w, "{}", HEADER.join("\t"))?;

        let eq = self.pix.equator();
        for (age, st) in &self.stages {
            for (px, v) in st {
                writeln!(w, "{eq}\t{age}\t{px}\t{v}")?;
            }
        }
        Ok(())
    }
}
