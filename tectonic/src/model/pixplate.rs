//! A collection of pixels associated to tectonic plates.

use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Write};
use std::sync::{Arc, RwLock};

use globe::Pixelation;

use super::ModelError;
use crate::tsv::TsvReader;

/// Required columns of a plate pixelation table.
const HEADER: [&str; 5] = ["equator", "plate", "pixel", "begin", "end"];

/// A pixel with a defined time range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixAge {
    /// Name of the feature that contains the pixel.
    pub name: String,
    /// ID of the pixel in the isolatitude pixelation.
    pub id: usize,
    /// ID of the plate that contains the pixel.
    pub plate: u32,
    /// Oldest age of the pixel, in years.
    pub begin: i64,
    /// Youngest age of the pixel, in years.
    pub end: i64,
}

/// A collection of pixels associated to tectonic plates.
///
/// The collection supports concurrent edits: the plate registry and
/// each per-plate pixel map are behind their own read-write locks, so
/// writers on distinct plates never block each other.
pub struct PixPlate {
    pix: Arc<Pixelation>,
    plates: RwLock<BTreeMap<u32, Arc<PlatePixels>>>,
}

struct PlatePixels {
    plate: u32,
    pix: RwLock<HashMap<usize, PixAge>>,
}

impl PlatePixels {
    /// Merges a pixel into the plate. Repeated additions widen the time
    /// range (oldest begin, youngest end); the name is replaced when it
    /// was empty or when the new pixel is older than the stored one.
    fn add(&self, pix: &mut HashMap<usize, PixAge>, id: usize, name: &str, begin: i64, end: i64) {
        let px = match pix.get_mut(&id) {
            Some(px) => px,
            None => {
                pix.insert(
                    id,
                    PixAge {
                        name: name.to_string(),
                        id,
                        plate: self.plate,
                        begin,
                        end,
                    },
                );
                return;
            }
        };

        if px.name.is_empty() {
            px.name = name.to_string();
        }
        if px.end > end {
            px.end = end;
        }
        if px.begin < begin {
            px.begin = begin;
            if !name.is_empty() {
                px.name = name.to_string();
            }
        }
    }
}

impl PixPlate {
    /// Creates a new plate pixelation from an isolatitude pixelation.
    pub fn new(pix: Arc<Pixelation>) -> Self {
        Self {
            pix,
            plates: RwLock::new(BTreeMap::new()),
        }
    }

    /// Adds a geographic location to a plate in a given time frame,
    /// in years.
    pub fn add(&self, plate: u32, name: &str, lat: f64, lon: f64, begin: i64, end: i64) {
        let id = self.pix.pixel_at(lat, lon).id();
        let p = self.plate_pixels(plate);

        let mut pix = p.pix.write().expect("poisoned plate lock");
        p.add(&mut pix, id, name, begin, end);
    }

    /// Adds a set of pixel IDs to a plate in a given time frame,
    /// in years. The plate lock is taken once for the whole slice.
    ///
    /// # Panics
    ///
    /// Panics if a pixel ID is not valid for the pixelation.
    /// Callers must validate untrusted input at the boundary.
    pub fn add_pixels(&self, plate: u32, name: &str, pixels: &[usize], begin: i64, end: i64) {
        let p = self.plate_pixels(plate);

        let mut pix = p.pix.write().expect("poisoned plate lock");
        for &id in pixels {
            assert!(id < self.pix.len(), "pixel ID {id} is invalid");
            p.add(&mut pix, id, name, begin, end);
        }
    }

    /// Returns the underlying pixelation of the pixel collection.
    pub fn pixelation(&self) -> &Arc<Pixelation> {
        &self.pix
    }

    /// Returns the pixel of a plate with the indicated ID.
    pub fn pixel(&self, plate: u32, pixel: usize) -> Option<PixAge> {
        let p = {
            let plates = self.plates.read().expect("poisoned plate registry");
            Arc::clone(plates.get(&plate)?)
        };

        let pix = p.pix.read().expect("poisoned plate lock");
        pix.get(&pixel).cloned()
    }

    /// Returns a snapshot of the pixel IDs of a plate,
    /// in ascending order.
    pub fn pixels(&self, plate: u32) -> Vec<usize> {
        let p = {
            let plates = self.plates.read().expect("poisoned plate registry");
            match plates.get(&plate) {
                Some(p) => Arc::clone(p),
                None => return Vec::new(),
            }
        };

        let pix = p.pix.read().expect("poisoned plate lock");
        let mut pxs: Vec<usize> = pix.keys().copied().collect();
        pxs.sort_unstable();
        pxs
    }

    /// Returns the plate IDs of the plate pixelation,
    /// in ascending order.
    pub fn plates(&self) -> Vec<u32> {
        let plates = self.plates.read().expect("poisoned plate registry");
        plates.keys().copied().collect()
    }

    fn plate_pixels(&self, plate: u32) -> Arc<PlatePixels> {
        {
            let plates = self.plates.read().expect("poisoned plate registry");
            if let Some(p) = plates.get(&plate) {
                return Arc::clone(p);
            }
        }

        let mut plates = self.plates.write().expect("poisoned plate registry");
        let p = plates.entry(plate).or_insert_with(|| {
            Arc::new(PlatePixels {
                plate,
                pix: RwLock::new(HashMap::new()),
            })
        });
        Arc::clone(p)
    }

    /// Reads a tectonic plates pixelation from a TSV table with the
    /// columns `equator`, `plate`, `pixel`, `begin` and `end` (both in
    /// years, begin >= end), and an optional `name` column.
    ///
    /// If no pixelation is given, a new pixelation is created from the
    /// equator of the table.
    pub fn read_tsv(r: impl BufRead, pix: Option<Arc<Pixelation>>) -> Result<Self, ModelError> {
        let mut tsv = TsvReader::new(r, &HEADER)?;

        let mut pix = pix;
        let mut pp: Option<PixPlate> = None;
        while let Some((row, rr)) = tsv.record()? {
            let eq: usize = tsv.parse(row, &rr, "equator")?;
            let pix = crate::tsv::resolve_pixelation(&mut pix, eq, row)?;
            let pp = pp.get_or_insert_with(|| PixPlate::new(Arc::clone(&pix)));

            let plate: u32 = tsv.parse(row, &rr, "plate")?;

            let id: usize = tsv.parse(row, &rr, "pixel")?;
            if id >= pix.len() {
                return Err(ModelError::InvalidPixel {
                    row,
                    field: "pixel",
                    value: id,
                });
            }

            let begin: i64 = tsv.parse(row, &rr, "begin")?;
            let end: i64 = tsv.parse(row, &rr, "end")?;
            if end > begin {
                return Err(ModelError::ReversedRange {
                    row,
                    field: "end",
                    begin,
                });
            }

            let name = if tsv.has_field("name") {
                tsv.field(row, &rr, "name")?.to_string()
            } else {
                String::new()
            };

            let p = pp.plate_pixels(plate);
            let mut pixels = p.pix.write().expect("poisoned plate lock");
            p.add(&mut pixels, id, &name, begin, end);
        }

        pp.ok_or(ModelError::Empty)
    }

    /// Encodes the plate pixelation as a TSV table,
    /// sorted by plate and pixel.
    pub fn write_tsv(&self, mut w: impl Write) -> Result<(), ModelError> {
        writeln!(w, "# tectonic plates pixelation")?;
        writeln!(w, "equator\tplate\tpixel\tname\tbegin\tend")?;

        let eq = self.pix.equator();
        let plates = self.plates.read().expect("poisoned plate registry");
        for (plate, p) in plates.iter() {
            let pix = p.pix.read().expect("poisoned plate lock");
            let mut pxs: Vec<usize> = pix.keys().copied().collect();
            pxs.sort_unstable();

            for id in pxs {
                let px = &pix[&id];
                writeln!(
                    w,
                    "{eq}\t{plate}\t{id}\t{}\t{}\t{}",
                    px.name, px.begin, px.end
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PP_TSV: &str = "# tectonic plates pixelation
equator\tplate\tpixel\tname\tbegin\tend
360\t202\t29611\tParana\t600000000\t0
360\t802\t41257\tAntarctica\t600000000\t0
";

    #[test]
    fn add_by_coordinate() {
        let pix = Arc::new(Pixelation::new(360));
        let pp = PixPlate::new(Arc::clone(&pix));

        pp.add(202, "Parana", -26.0, -65.0, 600_000_000, 0);
        assert_eq!(pp.plates(), vec![202]);
        assert_eq!(pp.pixels(202), vec![29611]);

        let px = pp.pixel(202, 29611).expect("an added pixel");
        assert_eq!(
            px,
            PixAge {
                name: "Parana".to_string(),
                id: 29611,
                plate: 202,
                begin: 600_000_000,
                end: 0,
            }
        );

        assert!(pp.pixel(202, 1).is_none());
        assert!(pp.pixel(10, 29611).is_none());
    }

    #[test]
    fn merge_widens_the_time_range() {
        let pix = Arc::new(Pixelation::new(36));
        let pp = PixPlate::new(pix);

        pp.add_pixels(1, "", &[10, 11], 100, 50);
        pp.add_pixels(1, "older", &[10], 200, 80);
        pp.add_pixels(1, "younger", &[11], 90, 10);

        let px = pp.pixel(1, 10).expect("pixel 10");
        assert_eq!(px.begin, 200);
        assert_eq!(px.end, 50);
        // the name of the oldest addition wins
        assert_eq!(px.name, "older");

        let px = pp.pixel(1, 11).expect("pixel 11");
        assert_eq!(px.begin, 100);
        assert_eq!(px.end, 10);
        // an empty stored name is replaced
        assert_eq!(px.name, "younger");
    }

    #[test]
    #[should_panic(expected = "is invalid")]
    fn add_pixels_rejects_bad_ids() {
        let pix = Arc::new(Pixelation::new(36));
        let pp = PixPlate::new(pix);
        pp.add_pixels(1, "", &[1_000_000], 100, 0);
    }

    #[test]
    fn read_from_tsv() {
        let pp = PixPlate::read_tsv(PP_TSV.as_bytes(), None).expect("valid table");

        assert_eq!(pp.plates(), vec![202, 802]);
        assert_eq!(pp.pixels(202), vec![29611]);
        assert_eq!(pp.pixels(802), vec![41257]);

        let px = pp.pixel(802, 41257).expect("a read pixel");
        assert_eq!(px.name, "Antarctica");
        assert_eq!(px.begin, 600_000_000);
        assert_eq!(px.end, 0);
    }

    #[test]
    fn read_rejects_reversed_ranges() {
        let data = "equator\tplate\tpixel\tname\tbegin\tend\n360\t202\t29611\tx\t0\t600000000\n";
        assert!(matches!(
            PixPlate::read_tsv(data.as_bytes(), None),
            Err(ModelError::ReversedRange { .. })
        ));
    }

    #[test]
    fn tsv_round_trip() {
        let pp = PixPlate::read_tsv(PP_TSV.as_bytes(), None).expect("valid table");
        let mut out = Vec::new();
        pp.write_tsv(&mut out).expect("in-memory write");

        let got =
            PixPlate::read_tsv(out.as_slice(), Some(Arc::clone(pp.pixelation()))).expect("read");
        assert_eq!(got.plates(), pp.plates());
        for plate in pp.plates() {
            assert_eq!(got.pixels(plate), pp.pixels(plate));
            for id in pp.pixels(plate) {
                assert_eq!(got.pixel(plate, id), pp.pixel(plate, id));
            }
        }
    }

    #[test]
    fn concurrent_writers_on_distinct_plates() {
        let pix = Arc::new(Pixelation::new(120));
        let pp = Arc::new(PixPlate::new(pix));

        let mut handles = Vec::new();
        for plate in 0..4u32 {
            let pp = Arc::clone(&pp);
            handles.push(std::thread::spawn(move || {
                for i in 0..500 {
                    pp.add_pixels(plate, "block", &[i, i + 1], 1_000_000, 0);
                }
            }));
        }
        for h in handles {
            h.join().expect("writer thread panicked");
        }

        for plate in 0..4u32 {
            assert_eq!(pp.pixels(plate).len(), 501);
        }
    }
}
