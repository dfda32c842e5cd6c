//! Kernel density estimation on the sphere.

use std::collections::HashMap;

use rayon::prelude::*;

use globe::distance;
use tectonic::model::TimePix;

use crate::weight::PixWeight;
use crate::{Normal, RawNormal};

/// A discrete spherical probability density function that is defined
/// only by the distance (i.e. is isotropic), usable as a KDE kernel.
pub trait Kernel {
    /// Returns the value of the probability density function for a
    /// pixel at a distance `dist` (in radians).
    fn prob(&self, dist: f64) -> f64;
}

impl Kernel for Normal {
    fn prob(&self, dist: f64) -> f64 {
        Normal::prob(self, dist)
    }
}

impl Kernel for RawNormal {
    fn prob(&self, dist: f64) -> f64 {
        RawNormal::prob(self, dist)
    }
}

/// Implements a kernel density estimation using the distribution `d` as
/// the kernel, a set of weighted source points (a map of pixel IDs to
/// the weight of the pixel), a time pixelation with the age of the
/// destination raster, and an optional set of pixel weights used as
/// priors for the raster values.
///
/// Destinations with a zero prior or a zero kernel mass are skipped.
/// The returned values are scaled to their CDF: the value of a pixel is
/// the fraction of the total density mass in pixels with a density
/// equal or greater than its own, so values lie in (0, 1] and can be
/// thresholded to draw density contours.
pub fn kde<K: Kernel + Sync>(
    d: &K,
    points: &HashMap<usize, f64>,
    tp: &TimePix,
    age: i64,
    prior: Option<&PixWeight>,
) -> HashMap<usize, f64> {
    let age = tp.closest_stage_age(age);
    let pix = tp.pixelation();

    // raw density of all pixels
    let raw: Vec<(usize, f64)> = (0..pix.len())
        .into_par_iter()
        .filter_map(|px| {
            let v = tp.at(age, px).unwrap_or(0);
            let mut pp = 1.0;
            if let Some(prior) = prior {
                pp = prior.weight(v);
                if pp == 0.0 {
                    return None;
                }
            }

            let pt1 = pix.pixel(px).point();
            let sum: f64 = points
                .iter()
                .map(|(&rp, &w)| d.prob(distance(pt1, pix.pixel(rp).point())) * w)
                .sum();
            if sum == 0.0 {
                return None;
            }
            Some((px, sum * pp))
        })
        .collect();

    // scale the values by the accumulated density mass
    let cum: f64 = raw.iter().map(|&(_, p)| p).sum();
    let mut raw = raw;
    raw.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut cdf = cum;
    let mut density = HashMap::with_capacity(raw.len());
    for (px, p) in raw {
        density.insert(px, cdf / cum);
        cdf -= p;
    }
    density
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use globe::Pixelation;

    fn flat_time_pix(pix: &Arc<Pixelation>) -> TimePix {
        let mut tp = TimePix::new(Arc::clone(pix));
        for px in 0..pix.len() {
            tp.set(0, px, 1);
        }
        tp
    }

    #[test]
    fn values_are_a_rank_cdf() {
        let pix = Arc::new(Pixelation::new(120));
        let tp = flat_time_pix(&pix);

        let n = Normal::new(100.0, Arc::clone(&pix));
        let mut points = HashMap::new();
        points.insert(pix.pixel_at(10.0, 10.0).id(), 1.0);
        points.insert(pix.pixel_at(12.0, 12.0).id(), 2.0);

        let density = kde(&n, &points, &tp, 0, None);
        assert!(!density.is_empty());

        for (&px, &v) in &density {
            assert!(v > 0.0 && v <= 1.0, "pixel {px}: value {v}");
        }
        // the highest density pixel carries the whole mass rank
        let max = density.values().cloned().fold(0.0, f64::max);
        assert_eq!(max, 1.0);
    }

    #[test]
    fn zero_priors_are_skipped() {
        let pix = Arc::new(Pixelation::new(120));

        // half the world is masked out with value 0
        let mut tp = TimePix::new(Arc::clone(&pix));
        for px in 0..pix.len() {
            if pix.pixel(px).point().longitude() < 0.0 {
                tp.set(0, px, 1);
            }
        }

        let mut prior = PixWeight::new();
        prior.set(1, 1.0).expect("valid weight");

        let n = Normal::new(100.0, Arc::clone(&pix));
        let mut points = HashMap::new();
        points.insert(pix.pixel_at(0.0, -10.0).id(), 1.0);

        let density = kde(&n, &points, &tp, 0, Some(&prior));
        assert!(!density.is_empty());
        for &px in density.keys() {
            assert!(
                pix.pixel(px).point().longitude() < 0.0,
                "masked pixel {px} must be skipped"
            );
        }
    }

    #[test]
    fn the_mode_ranks_highest() {
        let pix = Arc::new(Pixelation::new(120));
        let tp = flat_time_pix(&pix);

        let n = Normal::new(500.0, Arc::clone(&pix));
        let center = pix.pixel_at(-26.0, -65.0).id();
        let mut points = HashMap::new();
        points.insert(center, 1.0);

        let density = kde(&n, &points, &tp, 0, None);
        assert_eq!(density[&center], 1.0);
    }
}
