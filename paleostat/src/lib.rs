//! Spherical statistics over an equal area pixelation.
//!
//! This crate provides isotropic spherical distributions discretized
//! over the rings of a pixelation, a kernel density estimation that
//! aggregates weighted observations into a rank-by-mass density map,
//! and the ancillary stores that map raster values to weights, labels
//! and colors.

pub mod kde;
pub mod normal;
pub mod pixkey;
pub mod rawdist;
pub mod weight;

pub use kde::{kde, Kernel};
pub use normal::Normal;
pub use pixkey::PixKey;
pub use rawdist::RawNormal;
pub use weight::PixWeight;
