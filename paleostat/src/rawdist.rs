//! Unnormalized discretized spherical distributions: they do not sum to
//! one, and it is the responsibility of the caller to make the
//! appropriate integration.

/// An unscaled discretization of a spherical normal distribution over
/// an integer distance scale (see [`crate::Normal`] for the normalized
/// flavor and the underlying reference).
pub struct RawNormal {
    lambda: f64,
    step: f64,

    pdf: Vec<f64>,
    log_pdf: Vec<f64>,
}

impl RawNormal {
    /// Returns an unscaled, discretized spherical normal distribution,
    /// using `lambda` as the concentration parameter (in 1/radians^2)
    /// and `scale` as the discretization scale for the distance.
    pub fn new(lambda: f64, scale: usize) -> Self {
        let step = std::f64::consts::PI / scale as f64;

        let mut log_pdf = Vec::with_capacity(scale + 1);
        let mut pdf = Vec::with_capacity(scale + 1);
        for i in 0..=scale {
            let dist = i as f64 * step;
            let log = -lambda * dist * dist / 2.0;
            log_pdf.push(log);
            pdf.push(log.exp());
        }

        Self {
            lambda,
            step,
            pdf,
            log_pdf,
        }
    }

    /// Returns the concentration parameter (in 1/radians^2)
    /// of the distribution.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Returns the value of the probability density function
    /// at a distance `dist` (in radians).
    pub fn prob(&self, dist: f64) -> f64 {
        let r = (dist / self.step).round() as usize;
        if r >= self.pdf.len() {
            return 0.0;
        }
        self.pdf[r]
    }

    /// Returns the value of the probability density function
    /// at a given integer scaled distance.
    pub fn prob_ring_dist(&self, dist: usize) -> f64 {
        self.pdf[dist]
    }

    /// Returns the natural logarithm of the probability density
    /// function at a distance `dist` (in radians).
    pub fn log_prob(&self, dist: f64) -> f64 {
        let r = (dist / self.step).round() as usize;
        if r >= self.log_pdf.len() {
            return self.log_pdf[self.log_pdf.len() - 1];
        }
        self.log_pdf[r]
    }

    /// Returns the natural logarithm of the probability density
    /// function at a given integer scaled distance.
    pub fn log_prob_ring_dist(&self, dist: usize) -> f64 {
        self.log_pdf[dist]
    }

    /// Returns the probability density scaled by the maximum
    /// probability. An unnormalized normal already peaks at one, so
    /// this is the density itself.
    pub fn scaled_prob(&self, dist: f64) -> f64 {
        self.prob(dist)
    }

    /// Returns the scaled probability density at a given integer scaled
    /// distance.
    pub fn scaled_prob_ring_dist(&self, dist: usize) -> f64 {
        self.prob_ring_dist(dist)
    }
}
