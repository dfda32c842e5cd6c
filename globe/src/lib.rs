//! Spherical model of the Earth.
//!
//! This crate provides the geometric substrate for paleogeographic
//! reconstructions: geographic points on the unit sphere with the usual
//! great-circle operations, and an equal-area isolatitude pixelation with
//! constant-time point-to-pixel lookup, a quantized pixel distance matrix,
//! and a pixel neighborhood index.

pub mod distmat;
pub mod network;
pub mod pixelation;
pub mod point;

pub use distmat::DistMat;
pub use network::Network;
pub use pixelation::{Pixel, Pixelation};
pub use point::{
    bearing, chord2, destination, distance, Point, AGE_OF_EARTH, NORTH_POLE, RADIUS, SOUTH_POLE,
};
