//! Path-following geometry for the navigation pipeline.
//!
//! Projects geodetic coordinates into a robot-centred tangent plane and finds where a
//! look-ahead circle around the robot crosses a route segment. Pure functions, no I/O.
//!
//! ```
//! use gnsslink_geo::{near_point_local, LocalPoint, NearCase, NearPointOptions};
//!
//! let r = near_point_local(
//!     LocalPoint::new(-1.0, 0.0),
//!     LocalPoint::new(1.0, 0.0),
//!     1.0,
//!     &NearPointOptions::default(),
//! );
//! assert_eq!(r.case, NearCase::TwoIntersections);
//! assert_eq!(r.local, Some(LocalPoint::new(1.0, 0.0)));
//! ```

pub mod near_point;
pub mod projection;
pub mod route;

pub use near_point::{
    near_point, near_point_local, near_point_with, NearCase, NearPointOptions, NearPointResult,
    Selection, DEFAULT_TOLERANCE,
};
pub use projection::{
    angle_difference, azimuth_to_enu, enu_to_azimuth, normalize_angle, Enu, Equirectangular,
    GeoPoint, LocalPoint, Projection, METERS_PER_DEG_LAT, METERS_PER_DEG_LON,
};
pub use route::{Route, SteeringTarget};
