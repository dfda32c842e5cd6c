//! Rotations between neighboring time stages.

use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;
use std::sync::Arc;

use globe::Pixelation;

use super::total::closest_stage_age;
use super::{ModelError, PixRotation, Recons};

/// A collection of stage rotations: rotations of pixels between the
/// neighbor time stages defined by a reconstruction model.
///
/// The rotations are composed through the shared present-day pixel of
/// the model, in both temporal directions: from each stage to its
/// immediately older neighbor, and to its immediately younger one.
pub struct StageRot {
    pix: Arc<Pixelation>,

    young_to_old: BTreeMap<i64, PixRotation>,
    old_to_young: BTreeMap<i64, PixRotation>,
}

impl StageRot {
    /// Builds the stage rotations of a reconstruction model.
    pub fn from_recons(rec: &Recons) -> Self {
        let mut s = Self {
            pix: Arc::clone(rec.pixelation()),
            young_to_old: BTreeMap::new(),
            old_to_young: BTreeMap::new(),
        };

        let st = rec.stages();
        for p in rec.plates() {
            for (i, &a) in st.iter().enumerate() {
                if i == 0 {
                    continue;
                }
                let y = st[i - 1];

                let old = rec.pix_stage(p, a);
                let young = rec.pix_stage(p, y);

                // rotation from an older stage to a younger stage;
                // a stage pixel keeps its key even when the present
                // pixel has no locations at the neighbor stage
                let o2y = s.old_to_young.entry(a).or_insert_with(|| PixRotation {
                    from: a,
                    to: y,
                    ..Default::default()
                });
                for (pp, v) in &old {
                    let dest = young.get(pp).copied().unwrap_or_default();
                    for &px in *v {
                        o2y.rot.entry(px).or_default().extend_from_slice(dest);
                    }
                }

                // rotation from a younger stage to an older stage
                let y2o = s.young_to_old.entry(y).or_insert_with(|| PixRotation {
                    from: y,
                    to: a,
                    ..Default::default()
                });
                for (pp, v) in &young {
                    let dest = old.get(pp).copied().unwrap_or_default();
                    for &px in *v {
                        y2o.rot.entry(px).or_default().extend_from_slice(dest);
                    }
                }
            }
        }

        for rot in s.old_to_young.values_mut() {
            rot.remove_duplicates();
        }
        for rot in s.young_to_old.values_mut() {
            rot.remove_duplicates();
        }
        s
    }

    /// Reads the stage rotations from a TSV table that contains a
    /// reconstruction model (the same columns as [`Recons::read_tsv`]).
    pub fn read_tsv(r: impl BufRead, pix: Option<Arc<Pixelation>>) -> Result<Self, ModelError> {
        let rec = Recons::read_tsv(r, pix)?;
        Ok(Self::from_recons(&rec))
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

    /// Returns the stage rotation from an older stage to its most
    /// immediate younger stage, or `None` if there is no younger stage.
    pub fn old_to_young(&self, old_stage: i64) -> Option<&PixRotation> {
        self.old_to_young.get(&old_stage)
    }

    /// Returns the stage rotation from a younger stage to its most
    /// immediate older stage, or `None` if there is no older stage.
    pub fn young_to_old(&self, young_stage: i64) -> Option<&PixRotation> {
        self.young_to_old.get(&young_stage)
    }

    /// Returns the underlying pixelation of the model.
    pub fn pixelation(&self) -> &Arc<Pixelation> {
        &self.pix
    }

    /// Returns the time stages defined for the stage rotations,
    /// in ascending order.
    pub fn stages(&self) -> Vec<i64> {
        let mut ages = BTreeSet::new();
        ages.extend(self.old_to_young.keys().copied());
        ages.extend(self.young_to_old.keys().copied());
        ages.into_iter().collect()
    }
}
