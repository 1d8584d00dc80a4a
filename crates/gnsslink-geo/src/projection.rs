//! Geodetic ↔ local tangent-plane conversion.
//!
//! Local frames are robot-centred, metres, x east and y north. Two projections share the
//! [`Projection`] trait: the flat [`Equirectangular`] approximation used for steering
//! (good to a few metres over a few hundred) and the ellipsoidal [`Enu`] projection.

use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Metres per degree of latitude.
pub const METERS_PER_DEG_LAT: f64 = 111_132.954;

/// Metres per degree of longitude at the equator; scaled by `cos(lat0)`.
pub const METERS_PER_DEG_LON: f64 = 111_319.491;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

/// Latitude/longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Point in a robot-centred tangent plane, metres east (`x`) and north (`y`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalPoint {
    pub x: f64,
    pub y: f64,
}

impl LocalPoint {
    pub const ORIGIN: LocalPoint = LocalPoint { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: LocalPoint) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: LocalPoint) -> f64 {
        (self - other).norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Azimuth of this point seen from the origin, degrees clockwise from north in `[0, 360)`.
    pub fn bearing(self) -> f64 {
        enu_to_azimuth(self.y.atan2(self.x))
    }
}

impl Add for LocalPoint {
    type Output = LocalPoint;

    fn add(self, rhs: LocalPoint) -> LocalPoint {
        LocalPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for LocalPoint {
    type Output = LocalPoint;

    fn sub(self, rhs: LocalPoint) -> LocalPoint {
        LocalPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for LocalPoint {
    type Output = LocalPoint;

    fn mul(self, k: f64) -> LocalPoint {
        LocalPoint::new(self.x * k, self.y * k)
    }
}

impl Neg for LocalPoint {
    type Output = LocalPoint;

    fn neg(self) -> LocalPoint {
        LocalPoint::new(-self.x, -self.y)
    }
}

/// A mapping between geodetic coordinates and a local frame anchored at [`origin`](Projection::origin).
pub trait Projection {
    fn origin(&self) -> GeoPoint;

    fn to_local(&self, point: GeoPoint) -> LocalPoint;

    fn to_geo(&self, point: LocalPoint) -> GeoPoint;
}

/// Flat-earth projection with fixed metres-per-degree constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equirectangular {
    origin: GeoPoint,
    meters_per_deg_lon: f64,
}

impl Equirectangular {
    pub fn new(origin: GeoPoint) -> Self {
        Self {
            origin,
            meters_per_deg_lon: origin.lat.to_radians().cos() * METERS_PER_DEG_LON,
        }
    }
}

impl Projection for Equirectangular {
    fn origin(&self) -> GeoPoint {
        self.origin
    }

    fn to_local(&self, point: GeoPoint) -> LocalPoint {
        LocalPoint::new(
            (point.lon - self.origin.lon) * self.meters_per_deg_lon,
            (point.lat - self.origin.lat) * METERS_PER_DEG_LAT,
        )
    }

    fn to_geo(&self, point: LocalPoint) -> GeoPoint {
        // Longitude is undefined at the poles; stay on the origin meridian.
        let lon = if self.meters_per_deg_lon.abs() < 1e-9 {
            self.origin.lon
        } else {
            self.origin.lon + point.x / self.meters_per_deg_lon
        };
        GeoPoint::new(self.origin.lat + point.y / METERS_PER_DEG_LAT, lon)
    }
}

/// East-north tangent plane on the WGS-84 ellipsoid, via ECEF.
///
/// Points are taken at zero ellipsoidal height; the up component is dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Enu {
    origin: GeoPoint,
    origin_ecef: [f64; 3],
    sin_lat: f64,
    cos_lat: f64,
    sin_lon: f64,
    cos_lon: f64,
}

impl Enu {
    pub fn new(origin: GeoPoint) -> Self {
        let (sin_lat, cos_lat) = origin.lat.to_radians().sin_cos();
        let (sin_lon, cos_lon) = origin.lon.to_radians().sin_cos();
        Self {
            origin,
            origin_ecef: geodetic_to_ecef(origin, 0.0),
            sin_lat,
            cos_lat,
            sin_lon,
            cos_lon,
        }
    }
}

impl Projection for Enu {
    fn origin(&self) -> GeoPoint {
        self.origin
    }

    fn to_local(&self, point: GeoPoint) -> LocalPoint {
        let [x, y, z] = geodetic_to_ecef(point, 0.0);
        let [x0, y0, z0] = self.origin_ecef;
        let (dx, dy, dz) = (x - x0, y - y0, z - z0);

        let east = -self.sin_lon * dx + self.cos_lon * dy;
        let north = -self.sin_lat * self.cos_lon * dx - self.sin_lat * self.sin_lon * dy
            + self.cos_lat * dz;
        LocalPoint::new(east, north)
    }

    fn to_geo(&self, point: LocalPoint) -> GeoPoint {
        let (e, n) = (point.x, point.y);
        let [x0, y0, z0] = self.origin_ecef;
        let x = x0 - self.sin_lon * e - self.sin_lat * self.cos_lon * n;
        let y = y0 + self.cos_lon * e - self.sin_lat * self.sin_lon * n;
        let z = z0 + self.cos_lat * n;
        ecef_to_geodetic([x, y, z])
    }
}

fn geodetic_to_ecef(point: GeoPoint, height: f64) -> [f64; 3] {
    let (sin_lat, cos_lat) = point.lat.to_radians().sin_cos();
    let (sin_lon, cos_lon) = point.lon.to_radians().sin_cos();
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    [
        (n + height) * cos_lat * cos_lon,
        (n + height) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + height) * sin_lat,
    ]
}

fn ecef_to_geodetic([x, y, z]: [f64; 3]) -> GeoPoint {
    let lon = y.atan2(x);
    let p = x.hypot(y);
    let mut lat = z.atan2(p * (1.0 - WGS84_E2));
    // Converges to well below a micrometre in a handful of rounds near the surface.
    for _ in 0..6 {
        let sin_lat = lat.sin();
        let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        let height = if lat.cos().abs() > 1e-12 {
            p / lat.cos() - n
        } else {
            z.abs() - n * (1.0 - WGS84_E2)
        };
        lat = z.atan2(p * (1.0 - WGS84_E2 * n / (n + height)));
    }
    GeoPoint::new(lat.to_degrees(), lon.to_degrees())
}

/// GNSS azimuth (degrees clockwise from north) to an ENU angle (radians counter-clockwise from east).
pub fn azimuth_to_enu(azimuth_deg: f64) -> f64 {
    normalize_angle(90.0 - azimuth_deg).to_radians()
}

/// ENU angle (radians counter-clockwise from east) to a GNSS azimuth in `[0, 360)`.
pub fn enu_to_azimuth(angle_rad: f64) -> f64 {
    (90.0 - angle_rad.to_degrees()).rem_euclid(360.0)
}

/// Normalize an angle in degrees to `[-180, 180)`.
pub fn normalize_angle(angle_deg: f64) -> f64 {
    (angle_deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Signed difference `to - from` in degrees, positive clockwise, in `[-180, 180)`.
pub fn angle_difference(from_deg: f64, to_deg: f64) -> f64 {
    normalize_angle(to_deg - from_deg)
}
