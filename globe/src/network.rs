//! A neighborhood index for the pixels of a pixelation.

use std::f64::consts::SQRT_2;
use std::ops::Index;

use rayon::prelude::*;

use crate::pixelation::Pixelation;
use crate::point::distance;

/// A network maps every pixel ID to the sorted IDs of its closest pixel
/// neighbors, including the pixel itself.
///
/// Two pixels are neighbors when their centers are closer than
/// `step * sqrt(2)` radians, which captures the 8-neighborhood of the
/// isolatitude grid.
pub struct Network(Vec<Vec<usize>>);

impl Network {
    /// Builds the neighborhood index of a pixelation.
    pub fn new(pix: &Pixelation) -> Self {
        let r = pix.step().to_radians() * SQRT_2;

        let net = (0..pix.len())
            .into_par_iter()
            .map(|px1| {
                let px = pix.pixel(px1);
                let pt1 = px.point();
                let start = px.ring().saturating_sub(1);
                let end = px.ring() + 1;

                let mut n = Vec::new();
                for px2 in pix.first_pixel(start).id()..pix.len() {
                    let op = pix.pixel(px2);
                    if op.ring() > end {
                        break;
                    }
                    if px1 == px2 {
                        n.push(px2);
                        continue;
                    }
                    if distance(pt1, op.point()) < r {
                        n.push(px2);
                    }
                }
                n
            })
            .collect();

        Self(net)
    }

    /// Returns the neighbors of a pixel, in ascending ID order.
    pub fn neighbors(&self, pixel: usize) -> &[usize] {
        &self.0[pixel]
    }

    /// Returns the number of pixels in the network.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the network is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Index<usize> for Network {
    type Output = [usize];

    fn index(&self, pixel: usize) -> &[usize] {
        &self.0[pixel]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighborhoods_match_exhaustive_search() {
        let eq = 120;
        let pix = Pixelation::new(eq);
        let r = (360.0 / eq as f64).to_radians() * SQRT_2;

        let net = Network::new(&pix);
        assert_eq!(net.len(), pix.len());

        for px1 in 0..pix.len() {
            let pt1 = pix.pixel(px1).point();
            let mut want = Vec::new();
            for px2 in 0..pix.len() {
                if px1 == px2 {
                    want.push(px2);
                    continue;
                }
                if distance(pt1, pix.pixel(px2).point()) < r {
                    want.push(px2);
                }
            }
            assert_eq!(&net[px1], want.as_slice(), "pixel {px1}");
        }
    }

    #[test]
    fn neighborhoods_are_sorted_and_contain_self() {
        let pix = Pixelation::new(36);
        let net = Network::new(&pix);
        for px in 0..net.len() {
            let n = net.neighbors(px);
            assert!(n.windows(2).all(|w| w[0] < w[1]), "pixel {px}");
            assert!(n.contains(&px), "pixel {px}");
        }
    }
}
