//! A full spherical KDE over simulated observations.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use globe::Pixelation;
use paleostat::{kde, Normal, PixWeight};
use tectonic::model::TimePix;

const EQUATOR: usize = 360;
const NUM_POINTS: usize = 1000;
const LAMBDA: f64 = 120.0;
const KDE_LAMBDA: f64 = 1000.0;

#[test]
fn kde_recovers_the_sampling_mean() {
    let pix = Arc::new(Pixelation::new(EQUATOR));

    // a single-stage raster with every pixel valid
    let mut tp = TimePix::new(Arc::clone(&pix));
    for px in 0..pix.len() {
        tp.set(0, px, 1);
    }
    let mut pw = PixWeight::new();
    pw.set(1, 1.0).expect("valid weight");

    // simulate the observations
    let n = Normal::new(LAMBDA, Arc::clone(&pix));
    let mean = *pix.pixel_at(-26.81, -65.22);

    let mut rng = StdRng::seed_from_u64(20_220_906);
    let mut points: HashMap<usize, f64> = HashMap::new();
    for _ in 0..NUM_POINTS {
        let px = n.rand(&mut rng, &mean);
        *points.entry(px.id()).or_insert(0.0) += 1.0;
    }

    let kernel = Normal::new(KDE_LAMBDA, Arc::clone(&pix));
    let density = kde(&kernel, &points, &tp, 0, Some(&pw));

    // the sampling mean must be well inside the high density region;
    // the kernel is much narrower than the sampling spread, so the rank
    // at the exact mean pixel fluctuates with the simulated clumps
    let v = density.get(&mean.id()).copied().unwrap_or_default();
    assert!(v > 0.5, "density rank at the mean: {v:.4}");

    // the density peak must sit next to the sampling mean
    let (&top, _) = density
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .expect("a non-empty density map");
    let off = globe::distance(pix.pixel(top).point(), mean.point());
    assert!(
        off < 6.0_f64.to_radians(),
        "density peak {:.2} degrees away from the mean",
        off.to_degrees()
    );

    // the rank CDF is within (0, 1] and the antipode carries no mass
    for (&px, &d) in &density {
        assert!(d > 0.0 && d <= 1.0, "pixel {px}: rank {d:.4}");
    }
    let antipode = pix.pixel_at(26.81, 114.78).id();
    let far = density.get(&antipode).copied().unwrap_or_default();
    assert!(far < 0.05, "density rank at the antipode: {far:.4}");
}
