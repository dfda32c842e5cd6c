//! Geographic points on the surface of the unit sphere.
//!
//! A [`Point`] keeps both its geographic coordinates (in degrees) and the
//! equivalent 3D unit vector, so spherical operations can work on whichever
//! representation is cheaper.

use std::f64::consts::PI;

use nalgebra::Vector3;
use once_cell::sync::Lazy;

/// Arithmetic mean radius of the Earth in meters,
/// after Moritz (1980), Geodetic Reference System 1980.
pub const RADIUS: f64 = 6_371_008.0;

/// Age of the Earth in years.
pub const AGE_OF_EARTH: i64 = 4_540_000_000;

/// The geographic north pole.
pub static NORTH_POLE: Lazy<Point> = Lazy::new(|| Point::new(90.0, 0.0));

/// The geographic south pole.
pub static SOUTH_POLE: Lazy<Point> = Lazy::new(|| Point::new(-90.0, 0.0));

/// A geographic point on the surface of the unit length sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    lat: f64,
    lon: f64,
    vec: Vector3<f64>,
}

impl Point {
    /// Creates a point from a latitude-longitude pair, in degrees.
    ///
    /// # Panics
    ///
    /// Panics if the latitude is outside [-90, 90] or the longitude is
    /// outside [-180, 180]. Callers parsing untrusted input must validate
    /// the ranges before construction.
    pub fn new(lat: f64, lon: f64) -> Self {
        assert!(
            (-90.0..=90.0).contains(&lat),
            "invalid latitude value: {lat:.3}"
        );
        assert!(
            (-180.0..=180.0).contains(&lon),
            "invalid longitude value: {lon:.3}"
        );

        let r_lat = lat.to_radians();
        let r_lon = lon.to_radians();
        Self {
            lat,
            lon,
            vec: Vector3::new(
                r_lat.cos() * r_lon.cos(),
                r_lat.cos() * r_lon.sin(),
                r_lat.sin(),
            ),
        }
    }

    /// Returns the latitude of the point, in degrees.
    pub fn latitude(&self) -> f64 {
        self.lat
    }

    /// Returns the longitude of the point, in degrees.
    pub fn longitude(&self) -> f64 {
        self.lon
    }

    /// Returns the 3D unit vector representation of the point.
    pub fn vector(&self) -> Vector3<f64> {
        self.vec
    }
}

/// Returns the square of the Euclidean chord distance between two points.
///
/// The chord is monotonic with the great circle distance and much cheaper,
/// so it is the preferred metric for nearest-pixel searches.
pub fn chord2(p: Point, q: Point) -> f64 {
    (p.vec - q.vec).norm_squared()
}

/// Returns the great circle distance, in radians, between two points.
pub fn distance(p: Point, q: Point) -> f64 {
    p.vec.dot(&q.vec).clamp(-1.0, 1.0).acos()
}

/// Returns the direction angle between a meridian and the great circle
/// line that connects two points, measured at `p`.
///
/// The resulting angle is in radians: 0 is north, pi/2 east, pi south,
/// and 3pi/2 west.
pub fn bearing(p: Point, q: Point) -> f64 {
    let p_lat = p.lat.to_radians();
    let q_lat = q.lat.to_radians();
    let d_lon = q.lon.to_radians() - p.lon.to_radians();

    let x = q_lat.cos() * d_lon.sin();
    let y = p_lat.cos() * q_lat.sin() - p_lat.sin() * q_lat.cos() * d_lon.cos();

    let b = x.atan2(y);
    if b < 0.0 {
        2.0 * PI + b
    } else {
        b
    }
}

/// Returns the destination point of a trip starting at `p`,
/// given a distance and a bearing (both in radians).
pub fn destination(p: Point, dist: f64, bearing: f64) -> Point {
    let p_lat = p.lat.to_radians();

    let sin_lat = p_lat.sin() * dist.cos() + p_lat.cos() * dist.sin() * bearing.cos();
    let r_lat = sin_lat.asin();

    let tan_lon_x = bearing.sin() * dist.sin() * p_lat.cos();
    let tan_lon_y = dist.cos() - p_lat.sin() * r_lat.sin();
    let mut lon = p.lon + tan_lon_x.atan2(tan_lon_y).to_degrees();
    if lon > 180.0 {
        lon -= 360.0;
    }
    if lon < -180.0 {
        lon += 360.0;
    }

    Point::new(r_lat.to_degrees(), lon)
}
