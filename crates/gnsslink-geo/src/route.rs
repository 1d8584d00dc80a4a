//! Polyline routes and steering targets.

use serde::Serialize;

use crate::near_point::{near_point_with, NearPointOptions, NearPointResult};
use crate::projection::{Equirectangular, GeoPoint, Projection};

/// Ordered waypoints, driven first to last.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Route {
    points: Vec<GeoPoint>,
}

/// A steering target found on one segment of a [`Route`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SteeringTarget {
    /// Index of the segment's start waypoint.
    pub segment: usize,
    pub result: NearPointResult,
}

impl SteeringTarget {
    pub fn point(&self) -> Option<GeoPoint> {
        self.result.near
    }

    /// Azimuth from the robot toward the target, degrees.
    pub fn bearing(&self) -> Option<f64> {
        self.result.bearing()
    }
}

impl Route {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn segments(&self) -> impl Iterator<Item = (GeoPoint, GeoPoint)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }

    pub fn goal(&self) -> Option<GeoPoint> {
        self.points.last().copied()
    }

    /// Straight-line distance in metres from `robot` to the last waypoint.
    pub fn distance_to_goal(&self, robot: GeoPoint) -> Option<f64> {
        let goal = self.goal()?;
        Some(Equirectangular::new(robot).to_local(goal).norm())
    }

    /// Furthest-along crossing of the look-ahead circle with the route, starting at
    /// segment `from`.
    ///
    /// Later segments win over earlier ones, so a circle that spans a corner steers
    /// toward the next leg. Returns `None` when no segment from `from` on is crossed.
    pub fn steering_target(
        &self,
        robot: GeoPoint,
        radius: f64,
        from: usize,
        options: &NearPointOptions,
    ) -> Option<SteeringTarget> {
        if !robot.is_finite() {
            return None;
        }
        let projection = Equirectangular::new(robot);
        self.segments()
            .enumerate()
            .skip(from)
            .filter_map(|(segment, (start, end))| {
                let result = near_point_with(&projection, start, end, radius, options);
                result
                    .case
                    .has_point()
                    .then_some(SteeringTarget { segment, result })
            })
            .last()
    }
}

impl FromIterator<GeoPoint> for Route {
    fn from_iter<I: IntoIterator<Item = GeoPoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::LocalPoint;

    const ROBOT: GeoPoint = GeoPoint::new(50.0, 14.0);

    fn route_through(local: &[(f64, f64)]) -> Route {
        let projection = Equirectangular::new(ROBOT);
        local
            .iter()
            .map(|&(x, y)| projection.to_geo(LocalPoint::new(x, y)))
            .collect()
    }

    #[test]
    fn test_segments_and_goal() {
        let route = route_through(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        assert_eq!(route.segment_count(), 2);
        assert_eq!(route.segments().count(), 2);
        assert_eq!(route.goal(), route.points().last().copied());
        let d = route.distance_to_goal(ROBOT).unwrap();
        assert!((d - 200f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_empty_route() {
        let route = Route::default();
        assert_eq!(route.segment_count(), 0);
        assert!(route.goal().is_none());
        assert!(route.distance_to_goal(ROBOT).is_none());
        assert!(route
            .steering_target(ROBOT, 1.0, 0, &NearPointOptions::default())
            .is_none());
    }

    #[test]
    fn test_target_on_straight_leg() {
        let route = route_through(&[(-5.0, 0.0), (5.0, 0.0)]);
        let target = route
            .steering_target(ROBOT, 2.0, 0, &NearPointOptions::default())
            .unwrap();
        assert_eq!(target.segment, 0);
        let local = target.result.local.unwrap();
        assert!((local.x - 2.0).abs() < 1e-6);
        assert!(local.y.abs() < 1e-6);
        assert!(target.point().is_some());
    }

    #[test]
    fn test_corner_prefers_next_leg() {
        // Robot one metre before the corner, circle reaches both legs.
        let route = route_through(&[(-10.0, 0.0), (1.0, 0.0), (1.0, 10.0)]);
        let target = route
            .steering_target(ROBOT, 2.0, 0, &NearPointOptions::default())
            .unwrap();
        assert_eq!(target.segment, 1);
        let local = target.result.local.unwrap();
        assert!((local.x - 1.0).abs() < 1e-6);
        assert!((local.y - 3f64.sqrt()).abs() < 1e-6);
        assert!(target.bearing().unwrap() < 90.0);
    }

    #[test]
    fn test_skips_segments_before_from() {
        let route = route_through(&[(-5.0, 0.0), (5.0, 0.0), (5.0, 50.0)]);
        assert!(route
            .steering_target(ROBOT, 2.0, 1, &NearPointOptions::default())
            .is_none());
    }
}
