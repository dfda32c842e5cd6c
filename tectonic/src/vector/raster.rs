//! Rasterization of geographic polygons into a pixelation.
//!
//! A polygon is projected with an azimuthal equidistant projection about
//! one of the poles, filled on a canvas with the non-zero winding rule,
//! and the covered canvas cells are mapped back to pixelation pixels.

use std::collections::BTreeSet;

use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

use globe::Pixelation;

use super::Polygon;

/// Minimum side, in cells, of the projection canvas.
const MIN_CANVAS: usize = 3600;

/// Marks in `out` the pixels of the pixelation covered by a polygon.
///
/// The polygon vertices are always included, so polygons thinner than a
/// canvas cell still produce their outline.
pub(super) fn rasterize(poly: &Polygon, pix: &Pixelation, out: &mut BTreeSet<usize>) {
    if poly.len() > 1 {
        cover(poly, pix, out);
    }

    for pt in &poly.0 {
        out.insert(pix.pixel_at(pt.lat, pt.lon).id());
    }
}

fn cover(poly: &Polygon, pix: &Pixelation, out: &mut BTreeSet<usize>) {
    let mut cols = MIN_CANVAS;
    if pix.equator() * 10 > cols {
        cols = pix.equator() * 10;
    }

    let (north, south) = poly.bounds();
    let proj = Azimuthal::new(north_hemisphere(north, south), cols);

    let mut pb = PathBuilder::new();
    for (i, p) in poly.0.iter().enumerate() {
        let (x, y) = proj.xy(p.lat, p.lon);
        if i == 0 {
            pb.move_to(x as f32, y as f32);
        } else {
            pb.line_to(x as f32, y as f32);
        }
    }
    pb.close();
    let path = match pb.finish() {
        Some(p) => p,
        None => return,
    };

    let mut canvas = match Pixmap::new(cols as u32, cols as u32) {
        Some(c) => c,
        None => return,
    };
    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.anti_alias = true;
    canvas.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);

    // latitude bounds touched by the filled canvas
    let bounds = path.bounds();
    let x0 = (bounds.left().floor().max(0.0)) as usize;
    let y0 = (bounds.top().floor().max(0.0)) as usize;
    let x1 = (bounds.right().ceil() as usize + 1).min(cols);
    let y1 = (bounds.bottom().ceil() as usize + 1).min(cols);

    let mut t_north = -90.0f64;
    let mut t_south = 90.0f64;
    for y in y0..y1 {
        for x in x0..x1 {
            if !filled(&canvas, x, y) {
                continue;
            }
            let lat = proj.lat_at(x, y);
            t_north = t_north.max(lat);
            t_south = t_south.min(lat);
        }
    }

    let north = t_north + pix.step();
    let south = t_south - pix.step();
    for id in 0..pix.len() {
        let pt = pix.pixel(id).point();
        if pt.latitude() > north || pt.latitude() < south {
            continue;
        }

        let (x, y) = proj.xy(pt.latitude(), pt.longitude());
        if x < 0.0 || y < 0.0 {
            continue;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= cols || y >= cols {
            continue;
        }
        if filled(&canvas, x, y) {
            out.insert(id);
        }
    }
}

fn filled(canvas: &Pixmap, x: usize, y: usize) -> bool {
    match canvas.pixel(x as u32, y as u32) {
        Some(c) => c.alpha() > 0,
        None => false,
    }
}

/// Returns true if the polygon should be projected about the north pole.
///
/// Polygons that touch a pole center on that pole, and polygons on one
/// side of the equator center on their own hemisphere; a polygon that
/// straddles the equator projects about the north pole exactly when its
/// northern extent is smaller than its southern one.
fn north_hemisphere(north: f64, south: f64) -> bool {
    if south == -90.0 {
        return false;
    }
    if north == 90.0 {
        return true;
    }

    if north < 0.0 {
        return false;
    }
    if south > 0.0 {
        return true;
    }

    north < south.abs()
}

/// An azimuthal equidistant projection about one of the poles,
/// onto a square canvas that holds the whole sphere.
struct Azimuthal {
    north_centered: bool,
    radius: f64,
    center: f64,
}

impl Azimuthal {
    fn new(north_centered: bool, cols: usize) -> Self {
        Self {
            north_centered,
            radius: cols as f64 / (2.0 * std::f64::consts::PI),
            center: cols as f64 / 2.0,
        }
    }

    /// Projects a geographic coordinate to canvas coordinates.
    fn xy(&self, lat: f64, lon: f64) -> (f64, f64) {
        let n_lat = if self.north_centered {
            90.0 - lat
        } else {
            lat + 90.0
        };

        let rho = self.radius * n_lat.to_radians();
        let theta = lon.to_radians();

        let x = rho * theta.sin();
        let y = -rho * theta.cos();
        (x + self.center, y + self.center)
    }

    /// Returns the latitude of the center of a canvas cell.
    fn lat_at(&self, x: usize, y: usize) -> f64 {
        let dx = x as f64 + 0.5 - self.center;
        let dy = y as f64 + 0.5 - self.center;

        let rho = dx.hypot(dy);
        let n_lat = (rho / self.radius).to_degrees();
        if self.north_centered {
            90.0 - n_lat
        } else {
            n_lat - 90.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Coord, Feature, FeatureType};
    use super::*;

    fn square(points: &[(f64, f64)]) -> Feature {
        Feature {
            name: "test".to_string(),
            kind: FeatureType::Generic,
            plate: 1,
            begin: 100_000_000,
            end: 0,
            point: None,
            polygon: Polygon(
                points
                    .iter()
                    .map(|&(lat, lon)| Coord { lat, lon })
                    .collect(),
            ),
        }
    }

    #[test]
    fn vertices_are_always_included() {
        let pix = Pixelation::new(120);
        let f = square(&[
            (10.0, 10.0),
            (10.0, 20.0),
            (-10.0, 20.0),
            (-10.0, 10.0),
            (10.0, 10.0),
        ]);

        let pixels = f.pixels(&pix);
        for pt in &f.polygon.0 {
            let px = pix.pixel_at(pt.lat, pt.lon).id();
            assert!(pixels.binary_search(&px).is_ok(), "vertex pixel {px}");
        }
    }

    #[test]
    fn interior_is_covered() {
        let pix = Pixelation::new(120);
        let f = square(&[
            (10.0, 10.0),
            (10.0, 20.0),
            (-10.0, 20.0),
            (-10.0, 10.0),
            (10.0, 10.0),
        ]);

        let pixels = f.pixels(&pix);
        for (lat, lon) in [(0.0, 15.0), (5.0, 12.0), (-5.0, 18.0)] {
            let px = pix.pixel_at(lat, lon).id();
            assert!(pixels.binary_search(&px).is_ok(), "interior pixel {px}");
        }

        // far away pixels must not be covered
        for (lat, lon) in [(40.0, 15.0), (0.0, -100.0), (-80.0, 15.0)] {
            let px = pix.pixel_at(lat, lon).id();
            assert!(pixels.binary_search(&px).is_err(), "outside pixel {px}");
        }
    }

    #[test]
    fn output_is_sorted_and_unique() {
        let pix = Pixelation::new(120);
        let f = square(&[
            (30.0, -10.0),
            (30.0, 10.0),
            (20.0, 10.0),
            (20.0, -10.0),
            (30.0, -10.0),
        ]);
        let pixels = f.pixels(&pix);
        assert!(!pixels.is_empty());
        assert!(pixels.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn polar_polygon_covers_the_pole() {
        let pix = Pixelation::new(120);
        // a ring around the south pole
        let mut points = Vec::new();
        for i in 0..=36 {
            let lon = -180.0 + i as f64 * 10.0;
            points.push((-80.0, lon));
        }
        let f = square(&points);

        let pixels = f.pixels(&pix);
        let pole = pix.pixel_at(-90.0, 0.0).id();
        assert!(
            pixels.binary_search(&pole).is_ok(),
            "south pole must be covered"
        );
    }

    #[test]
    fn point_feature_is_a_single_pixel() {
        let pix = Pixelation::new(120);
        let f = Feature {
            name: String::new(),
            kind: FeatureType::HotSpot,
            plate: 2,
            begin: 1_000_000,
            end: 0,
            point: Some(Coord {
                lat: -26.0,
                lon: -65.0,
            }),
            polygon: Polygon::default(),
        };
        let pixels = f.pixels(&pix);
        assert_eq!(pixels, vec![pix.pixel_at(-26.0, -65.0).id()]);
    }

    #[test]
    fn hemisphere_rule() {
        // touches the south pole: project about the south pole
        assert!(!north_hemisphere(20.0, -90.0));
        // touches the north pole: project about the north pole
        assert!(north_hemisphere(90.0, -20.0));
        // all south
        assert!(!north_hemisphere(-10.0, -50.0));
        // all north
        assert!(north_hemisphere(50.0, 10.0));
        // straddling, deeper south
        assert!(north_hemisphere(10.0, -30.0));
        // straddling, deeper north
        assert!(!north_hemisphere(30.0, -10.0));
    }
}
