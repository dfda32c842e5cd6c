//! Geological features using a vectorial data model.
//!
//! Feature types follow the definitions of the GPML format
//! (<https://www.gplates.org/docs/gpgim/>), the main format used by the
//! GPlates software. Only the data model is implemented here; XML
//! decoding is the caller's concern.

mod raster;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use globe::{Pixelation, AGE_OF_EARTH};

/// Used to transform feature ages (a float in million years)
/// to an integer in years.
const MILLION_YEARS: f64 = 1_000_000.0;

/// Time position sentinel for the oldest possible age.
const DISTANT_PAST: &str = "http://gplates.org/times/distantPast";

/// Time position sentinel for the present.
const DISTANT_FUTURE: &str = "http://gplates.org/times/distantFuture";

/// Errors from parsing vector feature data.
#[derive(Debug, Error)]
pub enum VectorError {
    /// A latitude or longitude is malformed or out of range.
    #[error("bad {field} value {value:?}")]
    BadCoordinate {
        /// Which coordinate failed.
        field: &'static str,
        /// The rejected text.
        value: String,
    },

    /// A polygon coordinate list has an odd number of values.
    #[error("invalid number of coordinates: {0}")]
    OddCoordinates(usize),

    /// A time position is not a sentinel nor a number.
    #[error("invalid time position {0:?}")]
    BadTimePosition(String),

    /// An unknown feature type name.
    #[error("unknown feature type {0:?}")]
    UnknownType(String),
}

/// The type of a tectonic element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureType {
    Basin,
    /// A boundary of a tectonic plate.
    Boundary,
    Coastline,
    /// A polygon that represents a boundary
    /// between continental and oceanic crust.
    Continent,
    /// A large portion of a continental plate
    /// that has been relatively undisturbed
    /// since the Precambrian era.
    Craton,
    Fragment,
    /// A generic or unclassified feature.
    Generic,
    /// A present day surface expression of a mantle plume.
    HotSpot,
    /// A volcanic arc that is formed from magma rising
    /// from a subducted oceanic plate.
    IslandArc,
    /// An extensive region of basalts
    /// resulting from flood basalt volcanism.
    Lip,
    /// A part of a plate boundary that no longer exists.
    PaleoBoundary,
    /// A passive continental boundary indicating the change
    /// between continental and oceanic crust.
    Passive,
    /// A large-scale structural feature
    /// associated with continental collision.
    Suture,
    /// A crust fragment formed on a tectonic plate
    /// and accreted to crust lying on another plate.
    Terrane,
}

impl FeatureType {
    /// Returns the canonical name of the feature type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Basin => "basin",
            FeatureType::Boundary => "plate boundary",
            FeatureType::Coastline => "coastline",
            FeatureType::Continent => "continental boundary",
            FeatureType::Craton => "craton",
            FeatureType::Fragment => "continental fragment",
            FeatureType::Generic => "generic",
            FeatureType::HotSpot => "hotspot",
            FeatureType::IslandArc => "island arc",
            FeatureType::Lip => "large igneous province",
            FeatureType::PaleoBoundary => "paleo-boundary",
            FeatureType::Passive => "passive continental boundary",
            FeatureType::Suture => "suture",
            FeatureType::Terrane => "terrane",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureType {
    type Err = VectorError;

    fn from_str(s: &str) -> Result<Self, VectorError> {
        let tp = match s {
            "basin" => FeatureType::Basin,
            "plate boundary" => FeatureType::Boundary,
            "coastline" => FeatureType::Coastline,
            "continental boundary" => FeatureType::Continent,
            "craton" => FeatureType::Craton,
            "continental fragment" => FeatureType::Fragment,
            "generic" => FeatureType::Generic,
            "hotspot" => FeatureType::HotSpot,
            "island arc" => FeatureType::IslandArc,
            "large igneous province" => FeatureType::Lip,
            "paleo-boundary" => FeatureType::PaleoBoundary,
            "passive continental boundary" => FeatureType::Passive,
            "suture" => FeatureType::Suture,
            "terrane" => FeatureType::Terrane,
            _ => return Err(VectorError::UnknownType(s.to_string())),
        };
        Ok(tp)
    }
}

/// A geographic coordinate of a vector feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// An ordered collection of points that encloses an area.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon(pub Vec<Coord>);

impl Polygon {
    /// Returns the north and south latitude bounds of the polygon.
    pub fn bounds(&self) -> (f64, f64) {
        let mut north = -90.0f64;
        let mut south = 90.0f64;
        for p in &self.0 {
            north = north.max(p.lat);
            south = south.min(p.lat);
        }
        (north, south)
    }

    /// Returns the number of vertices of the polygon.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the polygon has no vertices.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A tectonic feature: a geographic polygon or a point,
/// associated with a tectonic plate and a temporal range.
#[derive(Debug, Clone)]
pub struct Feature {
    /// Name of the feature.
    pub name: String,
    /// The type of the tectonic element.
    pub kind: FeatureType,
    /// ID of the plate that carries the feature.
    pub plate: u32,
    /// Oldest age of the feature, in years.
    pub begin: i64,
    /// Youngest age of the feature, in years.
    /// It must not be older than `begin`.
    pub end: i64,
    /// Geographic location, for point features.
    pub point: Option<Coord>,
    /// Geographic outline, for polygon features.
    pub polygon: Polygon,
}

impl Feature {
    /// Returns the sorted IDs of the pixels in a pixelation
    /// that are part of the feature.
    pub fn pixels(&self, pix: &Pixelation) -> Vec<usize> {
        let mut set = std::collections::BTreeSet::new();

        if let Some(pt) = self.point {
            set.insert(pix.pixel_at(pt.lat, pt.lon).id());
        }
        raster::rasterize(&self.polygon, pix, &mut set);

        set.into_iter().collect()
    }
}

/// Returns a coordinate from a string pair with the latitude and
/// longitude of a geographic point.
pub fn parse_point(s_lat: &str, s_lon: &str) -> Result<Coord, VectorError> {
    let lat: f64 = s_lat.parse().map_err(|_| VectorError::BadCoordinate {
        field: "latitude",
        value: s_lat.to_string(),
    })?;
    if !(-90.0..=90.0).contains(&lat) {
        return Err(VectorError::BadCoordinate {
            field: "latitude",
            value: s_lat.to_string(),
        });
    }

    let lon: f64 = s_lon.parse().map_err(|_| VectorError::BadCoordinate {
        field: "longitude",
        value: s_lon.to_string(),
    })?;
    if !(-180.0..=180.0).contains(&lon) {
        return Err(VectorError::BadCoordinate {
            field: "longitude",
            value: s_lon.to_string(),
        });
    }

    Ok(Coord { lat, lon })
}

/// Returns a polygon from a string that contains a list of coordinates
/// (latitude and longitude) separated by spaces.
pub fn parse_polygon(points: &str) -> Result<Polygon, VectorError> {
    let coord: Vec<&str> = points.split_whitespace().collect();
    if coord.len() % 2 != 0 {
        return Err(VectorError::OddCoordinates(coord.len()));
    }

    let mut poly = Vec::with_capacity(coord.len() / 2);
    for pair in coord.chunks_exact(2) {
        poly.push(parse_point(pair[0], pair[1])?);
    }
    Ok(Polygon(poly))
}

/// Returns the age in years of a GPML time position: the distant past
/// and distant future sentinels, or a number in million years.
pub fn parse_time_position(s: &str) -> Result<i64, VectorError> {
    match s {
        DISTANT_PAST => Ok(AGE_OF_EARTH),
        DISTANT_FUTURE => Ok(0),
        _ => {
            let age: f64 = s
                .parse()
                .map_err(|_| VectorError::BadTimePosition(s.to_string()))?;
            Ok((age * MILLION_YEARS) as i64)
        }
    }
}
