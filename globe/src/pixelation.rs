//! An equal area isolatitude pixelation of the sphere.
//!
//! The sphere is divided in rings of constant latitude, and each ring is
//! divided in pixels taking into account the diameter of the ring, so all
//! pixels have approximately the same area. To reduce the alignment of
//! pixels between rings at the 180 degree meridian, odd rings are offset
//! by half a pixel.

use std::f64::consts::PI;
use std::sync::RwLock;

use rand::Rng;

use crate::point::{chord2, Point};

/// A pixel in a pixelation.
#[derive(Debug, Clone, Copy)]
pub struct Pixel {
    id: usize,
    ring: usize,
    point: Point,
}

impl Pixel {
    /// Returns the index used to identify the pixel in a pixelation.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the ring of the pixel.
    pub fn ring(&self) -> usize {
        self.ring
    }

    /// Returns the geographic point at the center of the pixel.
    pub fn point(&self) -> Point {
        self.point
    }
}

/// An equal area isolatitude pixelation.
///
/// The pixelation is deterministic for a given equatorial resolution:
/// pixel IDs are assigned ring by ring, from the north pole (ring 0) to
/// the south pole. Lookups are memoized in a coarse equirectangular index
/// behind a read-write lock, so a `Pixelation` can be shared freely
/// between threads.
pub struct Pixelation {
    eq: usize,
    d_step: f64,
    rings: Vec<usize>,
    per_ring: Vec<usize>,
    pixels: Vec<Pixel>,

    // equirectangular lookup index,
    // ten times the resolution of the pixelation
    cols: usize,
    i_step: f64,
    index: RwLock<Vec<i32>>,
}

impl Pixelation {
    /// Creates a new pixelation with a given number of pixels at the
    /// equatorial ring. An odd number is rounded up to the next even one.
    pub fn new(eq: usize) -> Self {
        let eq = if eq % 2 != 0 { eq + 1 } else { eq };
        let rings = eq / 2 + 1;
        let d_step = 360.0 / eq as f64;

        let mut pix = Self {
            eq,
            d_step,
            rings: Vec::with_capacity(rings),
            per_ring: Vec::with_capacity(rings),
            pixels: Vec::new(),
            cols: 0,
            i_step: 0.0,
            index: RwLock::new(Vec::new()),
        };

        for r in 0..rings {
            pix.rings.push(pix.pixels.len());
            pix.add_pixels(r);
            pix.per_ring.push(pix.pixels.len() - pix.rings[r]);
        }

        pix.cols = eq * 10;
        pix.i_step = 360.0 / pix.cols as f64;
        pix.index = RwLock::new(vec![-1; pix.cols * pix.cols / 2]);

        pix
    }

    /// Returns the number of pixels at the equatorial ring.
    pub fn equator(&self) -> usize {
        self.eq
    }

    /// Returns the number of pixels in the pixelation.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Returns true if the pixelation has no pixels.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Returns the number of rings in the pixelation.
    pub fn rings(&self) -> usize {
        self.rings.len()
    }

    /// Returns the size of a pixel at the equator, in degrees,
    /// which is also the latitude span of a ring.
    pub fn step(&self) -> f64 {
        self.d_step
    }

    /// Returns a pixel by its ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is not in the pixelation.
    pub fn pixel(&self, id: usize) -> &Pixel {
        &self.pixels[id]
    }

    /// Returns the first pixel of a ring.
    pub fn first_pixel(&self, ring: usize) -> &Pixel {
        &self.pixels[self.rings[ring]]
    }

    /// Returns the number of pixels in a ring.
    pub fn pixels_per_ring(&self, ring: usize) -> usize {
        self.per_ring[ring]
    }

    /// Returns the latitude of a ring, in degrees.
    pub fn ring_lat(&self, ring: usize) -> f64 {
        self.pixels[self.rings[ring]].point.latitude()
    }

    /// Returns the pixel that contains a latitude-longitude pair.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are not valid.
    pub fn pixel_at(&self, lat: f64, lon: f64) -> &Pixel {
        assert!(
            (-90.0..=90.0).contains(&lat),
            "invalid latitude value: {lat:.3}"
        );
        assert!(
            (-180.0..=180.0).contains(&lon),
            "invalid longitude value: {lon:.3}"
        );
        self.lookup(lat, lon)
    }

    /// Returns the pixel that contains the 3D vector of a geographic
    /// point.
    ///
    /// # Panics
    ///
    /// Panics if the norm of the vector is not within 5% of unit length.
    pub fn from_vector(&self, v: nalgebra::Vector3<f64>) -> &Pixel {
        let n2 = v.norm_squared();
        assert!(
            (0.9025..=1.1025).contains(&n2),
            "invalid vector norm: {:.3}",
            n2.sqrt()
        );

        let lat = v.z.clamp(-1.0, 1.0).asin().to_degrees();
        let lon = v.y.atan2(v.x).to_degrees();
        self.lookup(lat, lon)
    }

    /// Returns a uniform random pixel from the pixelation.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> &Pixel {
        &self.pixels[rng.gen_range(0..self.pixels.len())]
    }

    /// Returns a uniform random pixel at the given ring.
    pub fn random_in_ring<R: Rng + ?Sized>(&self, rng: &mut R, ring: usize) -> &Pixel {
        let id = self.rings[ring] + rng.gen_range(0..self.per_ring[ring]);
        &self.pixels[id]
    }

    fn add_pixels(&mut self, r: usize) {
        // keep the polar rings numerically exact
        let lat = (90.0 - r as f64 * self.d_step).clamp(-90.0, 90.0);
        let r_step = self.d_step.to_radians();

        let diameter = 2.0 * PI * lat.to_radians().cos();
        let mut num = (diameter / r_step).round();
        if num == 0.0 {
            num = 1.0;
        }
        let ring_step = 360.0 / num;
        for i in 0..num as usize {
            let mut lon = i as f64 * ring_step - 180.0;
            if r % 2 == 1 {
                lon += ring_step / 2.0;
            }
            let id = self.pixels.len();
            self.pixels.push(Pixel {
                id,
                ring: r,
                point: Point::new(lat, lon),
            });
        }
    }

    /// Returns the closest pixel to a point, scanning the rings around
    /// the tentative ring.
    fn closest(&self, ring: usize, pt: Point) -> usize {
        let start = ring.saturating_sub(1);

        let mut id = self.rings[start];
        let mut min = 2.0;
        for px in &self.pixels[self.rings[start]..] {
            if px.ring > start + 2 {
                break;
            }
            let c2 = chord2(pt, px.point);
            if c2 < min {
                min = c2;
                id = px.id;
            }
        }
        id
    }

    fn lookup(&self, lat: f64, lon: f64) -> &Pixel {
        let pos = self.index_pos(lat, lon);

        {
            let index = self.index.read().expect("poisoned pixelation index");
            let id = index[pos];
            if id >= 0 {
                return &self.pixels[id as usize];
            }
        }

        let pt = Point::new(lat, lon);
        let ring = ((90.0 - lat) / self.d_step).round() as usize;
        let id = self.closest(ring.min(self.rings.len() - 1), pt);

        let mut index = self.index.write().expect("poisoned pixelation index");
        index[pos] = id as i32;
        &self.pixels[id]
    }

    /// Returns the position of a coordinate pair in the lookup index.
    fn index_pos(&self, lat: f64, lon: f64) -> usize {
        // points at 180 longitude are indexed at -180
        let mut x = ((lon + 180.0) / self.i_step) as usize;
        if x >= self.cols {
            x = 0;
        }

        // points at -90 latitude are clamped into the last row
        let mut y = ((90.0 - lat) / self.i_step) as usize;
        if y >= self.cols / 2 {
            y = self.cols / 2 - 1;
        }
        y * self.cols + x
    }
}
