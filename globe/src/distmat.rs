//! A quantized distance matrix between every pair of pixels.

use std::f64::consts::PI;

use rayon::prelude::*;
use thiserror::Error;

use crate::pixelation::Pixelation;
use crate::point::distance;

/// Errors from building a distance matrix.
#[derive(Debug, Error)]
pub enum DistMatError {
    /// The pixelation has too many rings for the integer scale.
    #[error("pixelation with equator {equator} is too large for a distance matrix")]
    PixelationTooLarge {
        /// Pixels at the equator of the offending pixelation.
        equator: usize,
    },
}

/// A distance matrix for the pixels in a pixelation.
///
/// It stores not the real distance, but a distance using an integer
/// scale: the stored value is `round(dist * scale / pi)`. Only the upper
/// triangle is kept, so the matrix holds `n*(n+1)/2` entries.
pub struct DistMat {
    rows: usize,
    scale: u16,
    m: Vec<u16>,
}

impl DistMat {
    /// Creates a new distance matrix from the indicated pixelation.
    ///
    /// To keep the memory usage bounded, only pixelations up to 255
    /// rings after the first (i.e. equator/2 <= 255) are accepted.
    pub fn new(pix: &Pixelation, scale: u16) -> Result<Self, DistMatError> {
        if pix.equator() / 2 > u8::MAX as usize {
            return Err(DistMatError::PixelationTooLarge {
                equator: pix.equator(),
            });
        }

        let rows = pix.len();
        let m: Vec<u16> = (0..rows)
            .into_par_iter()
            .flat_map_iter(|px1| {
                let pt1 = pix.pixel(px1).point();
                (0..=px1).map(move |px2| {
                    let d = distance(pt1, pix.pixel(px2).point());
                    (d * scale as f64 / PI).round() as u16
                })
            })
            .collect();

        Ok(Self { rows, scale, m })
    }

    /// Creates a new distance matrix scaled by the number of ring steps,
    /// so the stored distance is equal to the ring of a pixel if the
    /// reference pixel is rotated to the north pole.
    pub fn ring_scale(pix: &Pixelation) -> Result<Self, DistMatError> {
        Self::new(pix, (pix.rings() - 1) as u16)
    }

    /// Returns the scaled distance between two pixel IDs.
    pub fn at(&self, x: usize, y: usize) -> usize {
        let (x, y) = if y > x { (y, x) } else { (x, y) };
        self.m[size_matrix(x) + y] as usize
    }

    /// Returns the number of pixels covered by the matrix.
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Returns true if the matrix covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Returns the scale factor used in the distance matrix.
    pub fn scale(&self) -> u16 {
        self.scale
    }
}

/// Returns the size of a triangular matrix of `d` rows.
fn size_matrix(d: usize) -> usize {
    (d + 1) * d / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn ring_scaled_distances() {
        let pix = Pixelation::new(36);
        let m = DistMat::ring_scale(&pix).expect("matrix for a small pixelation");
        assert_eq!(m.scale() as usize, pix.rings() - 1);

        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..10_000 {
            let px1 = *pix.random(&mut rng);
            let px2 = *pix.random(&mut rng);

            let d = distance(px1.point(), px2.point());
            let rd = (d / pix.step().to_radians()).round() as usize;

            assert_eq!(
                m.at(px1.id(), px2.id()),
                rd,
                "pixels {}, {}",
                px1.id(),
                px2.id()
            );
            // symmetry
            assert_eq!(m.at(px1.id(), px2.id()), m.at(px2.id(), px1.id()));
        }
    }

    #[test]
    fn arbitrary_scale() {
        let pix = Pixelation::new(36);
        let m = DistMat::new(&pix, 1000).expect("matrix for a small pixelation");

        let mut rng = StdRng::seed_from_u64(23);
        for _ in 0..1000 {
            let px1 = rng.gen_range(0..pix.len());
            let px2 = rng.gen_range(0..pix.len());
            let d = distance(pix.pixel(px1).point(), pix.pixel(px2).point());
            let want = (d * 1000.0 / PI).round() as usize;
            assert_eq!(m.at(px1, px2), want);
        }
    }

    #[test]
    fn refuses_large_pixelations() {
        let pix = Pixelation::new(512);
        assert!(matches!(
            DistMat::ring_scale(&pix),
            Err(DistMatError::PixelationTooLarge { equator: 512 })
        ));
    }
}
