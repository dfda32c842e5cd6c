//! Total rotations of pixels between the present and a time stage.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::sync::Arc;

use globe::Pixelation;

use super::{ModelError, Recons};
use crate::tsv::TsvReader;

/// Required columns of a reconstruction model table.
const HEADER: [&str; 5] = ["equator", "plate", "pixel", "age", "stage-pixel"];

/// A rotation of pixels from one time stage to another: every source
/// pixel maps to the sorted, unique IDs of its destinations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixRotation {
    /// Age, in years, of the source stage.
    pub from: i64,
    /// Age, in years, of the destination stage.
    pub to: i64,
    /// Pixels at the `from` stage rotated to the `to` stage.
    pub rot: BTreeMap<usize, Vec<usize>>,
}

impl PixRotation {
    pub(crate) fn remove_duplicates(&mut self) {
        for dest in self.rot.values_mut() {
            dest.sort_unstable();
            dest.dedup();
        }
    }
}

/// A collection of total rotations: pixels at present time moved to a
/// given time stage, dropping the plate identities.
///
/// In the inverse flavor the reference pixels are at the time stage, and
/// rotate to their present locations.
pub struct Total {
    inverse: bool,
    pix: Arc<Pixelation>,
    stages: BTreeMap<i64, PixRotation>,
}

impl Total {
    /// Builds the collection of total rotations of a reconstruction
    /// model.
    pub fn from_recons(rec: &Recons) -> Self {
        let mut t = Self {
            inverse: false,
            pix: Arc::clone(rec.pixelation()),
            stages: BTreeMap::new(),
        };

        for a in rec.stages() {
            let rot = t.stages.entry(a).or_insert_with(|| PixRotation {
                from: 0,
                to: a,
                ..Default::default()
            });
            for p in rec.plates() {
                for (from, to) in rec.pix_stage(p, a) {
                    rot.rot.entry(from).or_default().extend_from_slice(to);
                }
            }
        }

        for rot in t.stages.values_mut() {
            rot.remove_duplicates();
        }
        t
    }

    /// Reads a collection of total rotations from a TSV table that
    /// contains a reconstruction model (the same columns as
    /// [`Recons::read_tsv`]).
    ///
    /// If `inverse` is true, an inverse rotation is returned: the
    /// reference pixels are at the time stage, rotating to their present
    /// locations.
    pub fn read_tsv(
        r: impl BufRead,
        pix: Option<Arc<Pixelation>>,
        inverse: bool,
    ) -> Result<Self, ModelError> {
        let mut tsv = TsvReader::new(r, &HEADER)?;

        let mut pix = pix;
        let mut tot: Option<Total> = None;
        while let Some((row, rr)) = tsv.record()? {
            let eq: usize = tsv.parse(row, &rr, "equator")?;
            let pix = crate::tsv::resolve_pixelation(&mut pix, eq, row)?;
            let tot = tot.get_or_insert_with(|| Total {
                inverse,
                pix: Arc::clone(&pix),
                stages: BTreeMap::new(),
            });

            let age: i64 = tsv.parse(row, &rr, "age")?;

            let id: usize = tsv.parse(row, &rr, "pixel")?;
            if id >= pix.len() {
                return Err(ModelError::InvalidPixel {
                    row,
                    field: "pixel",
                    value: id,
                });
            }
            let s_id: usize = tsv.parse(row, &rr, "stage-pixel")?;
            if s_id >= pix.len() {
                return Err(ModelError::InvalidPixel {
                    row,
                    field: "stage-pixel",
                    value: s_id,
                });
            }

            let rot = tot.stages.entry(age).or_insert_with(|| {
                if inverse {
                    PixRotation {
                        from: age,
                        to: 0,
                        ..Default::default()
                    }
                } else {
                    PixRotation {
                        from: 0,
                        to: age,
                        ..Default::default()
                    }
                }
            });
            if inverse {
                rot.rot.entry(s_id).or_default().push(id);
            } else {
                rot.rot.entry(id).or_default().push(s_id);
            }
        }

        let mut tot = tot.ok_or(ModelError::Empty)?;
        for rot in tot.stages.values_mut() {
            rot.remove_duplicates();
        }
        Ok(tot)
    }

    /// Returns the closest stage age for a given time: the age itself if
    /// it is a defined stage, and otherwise the age of the oldest stage
    /// younger than the given age. Ages outside the defined range clamp
    /// to the nearest stage.
    ///
    /// # Panics
    ///
    /// Panics if the model has no stages.
    pub fn closest_stage_age(&self, age: i64) -> i64 {
        closest_stage_age(&self.stages(), age)
    }

    /// Returns an inverse total rotation: a collection of pixels in past
    /// time moved to the present time.
    pub fn inverse(&self) -> Total {
        let mut inv = Total {
            inverse: true,
            pix: Arc::clone(&self.pix),
            stages: BTreeMap::new(),
        };

        for (&a, tot) in &self.stages {
            let rot = inv.stages.entry(a).or_insert_with(|| PixRotation {
                from: a,
                to: 0,
                ..Default::default()
            });
            for (&id, v) in &tot.rot {
                for &px in v {
                    rot.rot.entry(px).or_default().push(id);
                }
            }
        }

        for rot in inv.stages.values_mut() {
            rot.remove_duplicates();
        }
        inv
    }

    /// Returns true if the total rotation is inverse, i.e. from past
    /// pixels to present pixels.
    pub fn is_inverse(&self) -> bool {
        self.inverse
    }

    /// Returns the underlying pixelation of the model.
    pub fn pixelation(&self) -> &Arc<Pixelation> {
        &self.pix
    }

    /// Returns the pixel locations at a given time stage. If the age is
    /// not a defined stage, the locations of the oldest stage younger
    /// than the age are returned.
    pub fn rotation(&self, age: i64) -> Option<&BTreeMap<usize, Vec<usize>>> {
        if self.stages.is_empty() {
            return None;
        }
        let age = self.closest_stage_age(age);
        self.stages.get(&age).map(|rot| &rot.rot)
    }

    /// Returns the time stages defined for the model,
    /// in ascending order.
    pub fn stages(&self) -> Vec<i64> {
        self.stages.keys().copied().collect()
    }
}

/// Returns the stage that adjusts best to an age: an exact match, or
/// the oldest stage younger than the age, clamped to the defined range.
pub(crate) fn closest_stage_age(stages: &[i64], age: i64) -> i64 {
    match stages.binary_search(&age) {
        Ok(_) => age,
        Err(0) => stages[0],
        Err(i) => stages[i - 1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL_TSV: &str = "# paleogeographic reconstruction model
equator\tplate\tpixel\tage\tstage-pixel
360\t59999\t17051\t100000000\t19051
360\t59999\t17051\t140000000\t20051
360\t59999\t17055\t100000000\t19055
360\t59999\t17055\t140000000\t20055
360\t59999\t17055\t140000000\t20056
";

    fn test_recons() -> Recons {
        Recons::read_tsv(MODEL_TSV.as_bytes(), None).expect("valid model table")
    }

    #[test]
    fn from_recons_merges_plates() {
        let rec = test_recons();
        let tot = Total::from_recons(&rec);

        assert!(!tot.is_inverse());
        assert_eq!(tot.stages(), vec![100_000_000, 140_000_000]);

        let rot = tot.rotation(140_000_000).expect("a defined stage");
        assert_eq!(rot[&17051], vec![20051]);
        assert_eq!(rot[&17055], vec![20055, 20056]);
    }

    #[test]
    fn rotation_resolves_to_the_closest_stage() {
        let tot = Total::from_recons(&test_recons());

        // between stages: the oldest stage younger than the age
        let rot = tot.rotation(120_000_000).expect("a stage");
        assert_eq!(rot[&17051], vec![19051]);

        // above the oldest stage
        let rot = tot.rotation(500_000_000).expect("a stage");
        assert_eq!(rot[&17051], vec![20051]);

        assert_eq!(tot.closest_stage_age(100_000_000), 100_000_000);
        assert_eq!(tot.closest_stage_age(139_999_999), 100_000_000);
        assert_eq!(tot.closest_stage_age(1), 100_000_000);
    }

    #[test]
    fn inverse_swaps_directions() {
        let tot = Total::from_recons(&test_recons());
        let inv = tot.inverse();

        assert!(inv.is_inverse());
        let rot = inv.rotation(140_000_000).expect("a stage");
        assert_eq!(rot[&20051], vec![17051]);
        assert_eq!(rot[&20055], vec![17055]);
        assert_eq!(rot[&20056], vec![17055]);
    }

    #[test]
    fn double_inverse_is_identity() {
        let tot = Total::from_recons(&test_recons());
        let back = tot.inverse().inverse();

        assert_eq!(tot.stages(), back.stages());
        for a in tot.stages() {
            assert_eq!(tot.rotation(a), back.rotation(a));
        }
    }

    #[test]
    fn read_inverse_tsv() {
        let inv = Total::read_tsv(MODEL_TSV.as_bytes(), None, true).expect("valid model table");
        assert!(inv.is_inverse());

        let rot = inv.rotation(140_000_000).expect("a stage");
        assert_eq!(rot[&20055], vec![17055]);
    }

    #[test]
    fn read_matches_from_recons() {
        let tot = Total::read_tsv(MODEL_TSV.as_bytes(), None, false).expect("valid model table");
        let want = Total::from_recons(&test_recons());

        assert_eq!(tot.stages(), want.stages());
        for a in tot.stages() {
            assert_eq!(tot.rotation(a), want.rotation(a));
        }
    }
}
