//! An editable plate motion model.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::sync::Arc;

use globe::Pixelation;

use super::ModelError;
use crate::tsv::TsvReader;

/// Required columns of a reconstruction model table.
const HEADER: [&str; 5] = ["equator", "plate", "pixel", "age", "stage-pixel"];

/// An editable plate motion model based on an equal area pixelation and
/// discrete time stages.
///
/// The model is organized by tectonic plates, so a time pixel should be
/// retrieved by its plate: for every plate, each pixel at the present
/// time maps to its locations at every recorded time stage. Because the
/// pixelation is a discrete representation of a continuous space, a
/// reconstruction can produce multiple locations for the same pixel.
pub struct Recons {
    pix: Arc<Pixelation>,
    plates: BTreeMap<u32, BTreeMap<usize, BTreeMap<i64, Vec<usize>>>>,
}

impl Recons {
    /// Creates a new empty reconstruction model over a pixelation.
    pub fn new(pix: Arc<Pixelation>) -> Self {
        Self {
            pix,
            plates: BTreeMap::new(),
        }
    }

    /// Adds a set of pixel locations of a plate at a time stage, in
    /// years. The keys of `locations` are pixel IDs at the present time,
    /// and the values are the IDs of the locations of that pixel at the
    /// time stage. Stage pixels already stored are kept; the stored list
    /// stays sorted and without duplicates.
    ///
    /// # Panics
    ///
    /// Panics if a present pixel ID is not valid for the pixelation.
    /// Callers must validate untrusted input at the boundary.
    pub fn add(&mut self, plate: u32, locations: &BTreeMap<usize, Vec<usize>>, age: i64) {
        let p = self.plates.entry(plate).or_default();

        for (&pixel, st_pix) in locations {
            assert!(pixel < self.pix.len(), "pixel ID {pixel} is invalid");

            let stages = p.entry(pixel).or_default();
            let rot = stages.entry(age).or_default();
            rot.extend_from_slice(st_pix);
            rot.sort_unstable();
            rot.dedup();
        }
    }

    /// Returns the underlying equal area pixelation of the model.
    pub fn pixelation(&self) -> &Arc<Pixelation> {
        &self.pix
    }

    /// Returns the pixel IDs of a plate at present time,
    /// in ascending order.
    pub fn pixels(&self, plate: u32) -> Vec<usize> {
        match self.plates.get(&plate) {
            Some(p) => p.keys().copied().collect(),
            None => Vec::new(),
        }
    }

    /// Returns the pixel locations of a plate at a time stage, in years:
    /// a map of present time pixel IDs to the IDs of the locations of
    /// the pixel at the stage.
    pub fn pix_stage(&self, plate: u32, age: i64) -> BTreeMap<usize, &[usize]> {
        let mut st = BTreeMap::new();
        let Some(p) = self.plates.get(&plate) else {
            return st;
        };

        for (&pixel, stages) in p {
            if let Some(sp) = stages.get(&age) {
                if !sp.is_empty() {
                    st.insert(pixel, sp.as_slice());
                }
            }
        }
        st
    }

    /// Returns the plate IDs of the reconstruction model,
    /// in ascending order.
    pub fn plates(&self) -> Vec<u32> {
        self.plates.keys().copied().collect()
    }

    /// Returns the time stages, in years, defined for the model,
    /// in ascending order.
    pub fn stages(&self) -> Vec<i64> {
        let mut ages = std::collections::BTreeSet::new();
        for p in self.plates.values() {
            for stages in p.values() {
                ages.extend(stages.keys().copied());
            }
        }
        ages.into_iter().collect()
    }

    /// Reads a plate motion model from a TSV table with the columns
    /// `equator`, `plate`, `pixel`, `age` (in years) and `stage-pixel`.
    /// Blank lines and `#` comments are ignored.
    ///
    /// If no pixelation is given, a new pixelation is created from the
    /// equator of the table.
    pub fn read_tsv(r: impl BufRead, pix: Option<Arc<Pixelation>>) -> Result<Self, ModelError> {
        let mut tsv = TsvReader::new(r, &HEADER)?;

        let mut pix = pix;
        let mut rec: Option<Recons> = None;
        while let Some((row, rr)) = tsv.record()? {
            let eq: usize = tsv.parse(row, &rr, "equator")?;
            let pix = crate::tsv::resolve_pixelation(&mut pix, eq, row)?;
            let rec = rec.get_or_insert_with(|| Recons::new(Arc::clone(&pix)));

            let plate: u32 = tsv.parse(row, &rr, "plate")?;

            let id: usize = tsv.parse(row, &rr, "pixel")?;
            if id >= pix.len() {
                return Err(ModelError::InvalidPixel {
                    row,
                    field: "pixel",
                    value: id,
                });
            }

            let age: i64 = tsv.parse(row, &rr, "age")?;

            let s_id: usize = tsv.parse(row, &rr, "stage-pixel")?;
            if s_id >= pix.len() {
                return Err(ModelError::InvalidPixel {
                    row,
                    field: "stage-pixel",
                    value: s_id,
                });
            }

            rec.plates
                .entry(plate)
                .or_default()
                .entry(id)
                .or_default()
                .entry(age)
                .or_default()
                .push(s_id);
        }

        let mut rec = rec.ok_or(ModelError::Empty)?;

        // remove duplicated pixels, if any
        for p in rec.plates.values_mut() {
            for stages in p.values_mut() {
                for rot in stages.values_mut() {
                    rot.sort_unstable();
                    rot.dedup();
                }
            }
        }
        Ok(rec)
    }

    /// Encodes the plate motion model as a TSV table, sorted by plate,
    /// pixel, age and stage pixel.
    pub fn write_tsv(&self, mut w: impl Write) -> Result<(), ModelError> {
        writeln!(w, "# plate motion model")?;
        writeln!(w, "{}", HEADER.join("\t"))?;

        let eq = self.pix.equator();
        for (plate, pixels) in &self.plates {
            for (pixel, stages) in pixels {
                for (age, rot) in stages {
                    for sp in rot {
                        writeln!(w, "{eq}\t{plate}\t{pixel}\t{age}\t{sp}")?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locations(pairs: &[(usize, &[usize])]) -> BTreeMap<usize, Vec<usize>> {
        pairs.iter().map(|&(k, v)| (k, v.to_vec())).collect()
    }

    fn test_model() -> Recons {
        let pix = Arc::new(Pixelation::new(360));
        let mut rec = Recons::new(pix);
        rec.add(
            59999,
            &locations(&[(17051, &[19051]), (17055, &[19055])]),
            100_000_000,
        );
        rec.add(
            59999,
            &locations(&[(17051, &[20051]), (17055, &[20055, 20056])]),
            140_000_000,
        );
        rec
    }

    #[test]
    fn add_and_query() {
        let rec = test_model();

        assert_eq!(rec.plates(), vec![59999]);
        assert_eq!(rec.stages(), vec![100_000_000, 140_000_000]);
        assert_eq!(rec.pixels(59999), vec![17051, 17055]);

        let st = rec.pix_stage(59999, 140_000_000);
        assert_eq!(st[&17051], &[20051]);
        assert_eq!(st[&17055], &[20055, 20056]);

        assert!(rec.pix_stage(59999, 1).is_empty());
        assert!(rec.pix_stage(1, 100_000_000).is_empty());
    }

    #[test]
    fn add_merges_and_deduplicates() {
        let mut rec = test_model();
        rec.add(
            59999,
            &locations(&[(17055, &[20056, 20099, 20055])]),
            140_000_000,
        );

        let st = rec.pix_stage(59999, 140_000_000);
        assert_eq!(st[&17055], &[20055, 20056, 20099]);
    }

    #[test]
    fn stage_lists_are_sorted_and_unique() {
        let mut rec = test_model();
        rec.add(59999, &locations(&[(17051, &[19051, 19050])]), 100_000_000);

        for &plate in &rec.plates() {
            for age in rec.stages() {
                for (_, sp) in rec.pix_stage(plate, age) {
                    assert!(sp.windows(2).all(|w| w[0] < w[1]));
                }
            }
        }
    }

    #[test]
    #[should_panic(expected = "is invalid")]
    fn add_rejects_bad_pixels() {
        let pix = Arc::new(Pixelation::new(36));
        let mut rec = Recons::new(pix);
        rec.add(1, &locations(&[(1_000_000, &[0])]), 100);
    }

    #[test]
    fn tsv_round_trip() {
        let rec = test_model();
        let mut out = Vec::new();
        rec.write_tsv(&mut out).expect("in-memory write");

        let got =
            Recons::read_tsv(out.as_slice(), Some(Arc::clone(rec.pixelation()))).expect("read");
        assert_eq!(got.plates(), rec.plates());
        assert_eq!(got.stages(), rec.stages());
        for &plate in &rec.plates() {
            assert_eq!(got.pixels(plate), rec.pixels(plate));
            for age in rec.stages() {
                assert_eq!(got.pix_stage(plate, age), rec.pix_stage(plate, age));
            }
        }
    }

    #[test]
    fn read_tsv_removes_duplicates() {
        let data = "equator\tplate\tpixel\tage\tstage-pixel
360\t59999\t17051\t100000000\t19051
360\t59999\t17051\t100000000\t19051
360\t59999\t17051\t100000000\t19050
";
        let rec = Recons::read_tsv(data.as_bytes(), None).expect("valid table");
        let st = rec.pix_stage(59999, 100_000_000);
        assert_eq!(st[&17051], &[19050, 19051]);
    }

    #[test]
    fn read_tsv_errors() {
        let no_field = "equator\tplate\tpixel\tage\n360\t1\t0\t0\n";
        assert!(matches!(
            Recons::read_tsv(no_field.as_bytes(), None),
            Err(ModelError::MissingField {
                field: "stage-pixel"
            })
        ));

        let bad_pixel = "equator\tplate\tpixel\tage\tstage-pixel\n360\t1\t99999999\t0\t0\n";
        assert!(matches!(
            Recons::read_tsv(bad_pixel.as_bytes(), None),
            Err(ModelError::InvalidPixel { field: "pixel", .. })
        ));

        let mismatch = "equator\tplate\tpixel\tage\tstage-pixel\n120\t1\t0\t0\t0\n";
        let pix = Arc::new(Pixelation::new(360));
        assert!(matches!(
            Recons::read_tsv(mismatch.as_bytes(), Some(pix)),
            Err(ModelError::PixelationMismatch {
                got: 120,
                want: 360,
                ..
            })
        ));

        assert!(matches!(
            Recons::read_tsv("".as_bytes(), None),
            Err(ModelError::Empty)
        ));
    }
}
