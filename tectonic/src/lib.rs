//! Plate tectonic modelling on an equal area pixelation.
//!
//! This crate implements the moving parts of a paleogeographic
//! reconstruction: an Euler rotation model read from plate rotation
//! files, a vector data model for geological features with a rasterizer
//! into the pixelation, and the reconstruction models that tie plates,
//! pixels and time stages together.

pub mod model;
pub mod quaternion;
pub mod rotation;
pub mod vector;

mod tsv;

pub use quaternion::Quaternion;
pub use rotation::{Euler, RotationModel};
