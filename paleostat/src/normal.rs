//! An isotropic spherical normal distribution
//! discretized over a pixelation.

use std::sync::Arc;

use rand::Rng;

use globe::{chord2, destination, Pixel, Pixelation, NORTH_POLE};

/// An isotropic univariate spherical normal distribution discretized
/// over the rings of a pixelation.
///
/// It is based on equation (2) from Hauberg (2018) 2018 IEEE FUSION:
/// 704 <doi:10.23919/ICIF.2018.8455242>:
///
/// ```text
/// SN(x|u,v) ∝ exp(-λ * gcd(x,u)^2/2)
/// ```
///
/// where x and u are points on a sphere, u is the mean, λ is the
/// concentration parameter (in 1/radians^2), and gcd is the great
/// circle distance. Every density value is precomputed per ring
/// distance, so lookups are constant time.
pub struct Normal {
    pix: Arc<Pixelation>,
    step: f64,   // size of a ring, in radians
    lambda: f64, // concentration parameter
    variance: f64,

    pdf: Vec<f64>,
    cdf: Vec<f64>,
    ring: Vec<f64>,
    log_pdf: Vec<f64>,
    scaled_pdf: Vec<f64>,
}

impl Normal {
    /// Returns a discretized spherical normal, using `lambda` as the
    /// concentration parameter (in 1/radians^2) and `pix` as the
    /// underlying pixelation.
    ///
    /// # Panics
    ///
    /// Panics if lambda is not a positive number.
    pub fn new(lambda: f64, pix: Arc<Pixelation>) -> Self {
        assert!(
            lambda > 0.0 && lambda.is_finite(),
            "invalid concentration parameter: {lambda}"
        );

        let rings = pix.rings();
        let step = pix.step().to_radians();

        let mut log_pdf = Vec::with_capacity(rings);
        let mut ring = Vec::with_capacity(rings);
        let mut cdf = Vec::with_capacity(rings);

        let mut sum = 0.0;
        for i in 0..rings {
            let dist = i as f64 * step;
            let log_p = -lambda * dist * dist / 2.0;
            log_pdf.push(log_p);

            let log_r = log_p + (pix.pixels_per_ring(i) as f64).ln();
            let p_ring = log_r.exp();
            ring.push(p_ring);
            sum += p_ring;
            cdf.push(sum);
        }

        // scale the values so the distribution sums to one
        let log_sum = sum.ln();
        let mut pdf = Vec::with_capacity(rings);
        let mut scaled = Vec::with_capacity(rings);
        let mut variance = 0.0;
        for i in 0..rings {
            ring[i] /= sum;
            cdf[i] /= sum;
            log_pdf[i] -= log_sum;
            pdf.push(log_pdf[i].exp());
            scaled.push(pdf[i] / pdf[0]);

            let dist = i as f64 * step;
            variance += dist * dist * pdf[i] * pix.pixels_per_ring(i) as f64;
        }

        Self {
            pix,
            step,
            lambda,
            variance,
            pdf,
            cdf,
            ring,
            log_pdf,
            scaled_pdf: scaled,
        }
    }

    /// Returns the concentration parameter (in 1/radians^2)
    /// of the distribution.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Returns the underlying pixelation of the distribution.
    pub fn pixelation(&self) -> &Arc<Pixelation> {
        &self.pix
    }

    /// Returns the cumulative density for a pixel
    /// at a distance `dist` (in radians).
    pub fn cdf(&self, dist: f64) -> f64 {
        let r = self.ring_of(dist);
        if r >= self.cdf.len() {
            return 1.0;
        }
        self.cdf[r]
    }

    /// Returns the value of the probability density function for a
    /// pixel at a distance `dist` (in radians).
    pub fn prob(&self, dist: f64) -> f64 {
        let r = self.ring_of(dist);
        if r >= self.pdf.len() {
            return 0.0;
        }
        self.pdf[r]
    }

    /// Returns the value of the probability density function at a given
    /// ring distance, i.e. the ring of a pixel if one of the pixels is
    /// rotated to the north pole.
    pub fn prob_ring_dist(&self, r_dist: usize) -> f64 {
        self.pdf[r_dist]
    }

    /// Returns the natural logarithm of the probability density
    /// function at a distance `dist` (in radians).
    pub fn log_prob(&self, dist: f64) -> f64 {
        let r = self.ring_of(dist);
        if r >= self.log_pdf.len() {
            return self.log_pdf[self.log_pdf.len() - 1];
        }
        self.log_pdf[r]
    }

    /// Returns the natural logarithm of the probability density
    /// function at a given ring distance.
    pub fn log_prob_ring_dist(&self, r_dist: usize) -> f64 {
        self.log_pdf[r_dist]
    }

    /// Returns the value of the probability density function for the
    /// whole ring at a distance `dist` (in radians).
    pub fn ring(&self, dist: f64) -> f64 {
        let r = self.ring_of(dist);
        if r >= self.ring.len() {
            return 0.0;
        }
        self.ring[r]
    }

    /// Returns the value of the probability density function for a
    /// pixel at a distance `dist` (in radians), scaled by the maximum
    /// probability (i.e. by the zero distance).
    pub fn scaled_prob(&self, dist: f64) -> f64 {
        let r = self.ring_of(dist);
        if r >= self.scaled_pdf.len() {
            return 0.0;
        }
        self.scaled_pdf[r]
    }

    /// Returns the scaled probability density at a given ring distance.
    pub fn scaled_prob_ring_dist(&self, r_dist: usize) -> f64 {
        self.scaled_pdf[r_dist]
    }

    /// Returns the square of the Euclidean chord distance for the
    /// maximum distance that is inside the indicated cumulative
    /// density.
    ///
    /// This is useful to know cheaply if a pixel is inside or outside a
    /// critical CDF value, comparing chords instead of great circle
    /// distances.
    pub fn quantile_chord2(&self, cd: f64) -> f64 {
        let r = self
            .cdf
            .partition_point(|&c| c < cd)
            .min(self.pix.rings() - 1);
        let px = self.pix.first_pixel(r);
        chord2(px.point(), *NORTH_POLE)
    }

    /// Returns a random pixel from the underlying pixelation, drawn
    /// from the spherical normal with mean at the pixel `u`.
    ///
    /// The ring distance is drawn by inversion sampling of the ring
    /// CDF, and the direction uniformly.
    pub fn rand<R: Rng + ?Sized>(&self, rng: &mut R, u: &Pixel) -> Pixel {
        let q = rng.gen::<f64>();
        let r = self.cdf.partition_point(|&c| c < q);
        let dist = (r as f64 + 0.5) * self.step;

        let b = rng.gen::<f64>() * 2.0 * std::f64::consts::PI;
        let pt = destination(u.point(), dist, b);
        *self.pix.pixel_at(pt.latitude(), pt.longitude())
    }

    /// Returns the variance (in radians^2) of the distribution.
    pub fn variance(&self) -> f64 {
        self.variance
    }

    fn ring_of(&self, dist: f64) -> usize {
        let r = (dist / self.step).round();
        if r < 0.0 {
            return 0;
        }
        r as usize
    }
}
