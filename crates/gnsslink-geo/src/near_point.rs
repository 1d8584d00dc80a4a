//! Look-ahead circle against a route segment.
//!
//! The robot sits at the origin of a local frame; the look-ahead circle of radius `r`
//! is centred on it. The line through the segment S→E is intersected with the circle
//! and the result clipped to the segment itself. Every outcome is an explicit
//! [`NearCase`]; no field of a [`NearPointResult`] is ever NaN.

use serde::Serialize;
use tracing::debug;

use crate::projection::{angle_difference, Equirectangular, GeoPoint, LocalPoint, Projection};

/// Distance tolerance in metres for tangency, degeneracy, and segment clipping.
pub const DEFAULT_TOLERANCE: f64 = 2e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NearCase {
    /// The circle crosses the segment; one crossing was selected.
    TwoIntersections,
    /// The segment touches the circle at a single point.
    Tangent,
    /// No crossing on the segment, including a line that only crosses beyond its ends.
    NoIntersection,
    /// Start and end coincide, or an input is not a finite number.
    Degenerate,
}

impl NearCase {
    pub fn has_point(self) -> bool {
        matches!(self, NearCase::TwoIntersections | NearCase::Tangent)
    }
}

/// Rule for choosing between two crossings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Selection {
    /// The crossing further along the segment, toward E.
    #[default]
    TowardEnd,
    /// The crossing whose bearing from the robot is closest to this azimuth (degrees).
    AlongHeading(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearPointOptions {
    pub tolerance: f64,
    pub selection: Selection,
}

impl Default for NearPointOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            selection: Selection::TowardEnd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NearPointResult {
    pub case: NearCase,
    /// Selected point in the robot-centred frame.
    pub local: Option<LocalPoint>,
    /// Selected point in geodetic coordinates; only filled by the geodetic entry points.
    pub near: Option<GeoPoint>,
    /// Distance from the robot to the line through S and E.
    pub perpendicular_distance: f64,
    /// Position of the selected point along S→E, 0 at S and 1 at E.
    pub parameter: Option<f64>,
}

impl NearPointResult {
    fn without_point(case: NearCase, perpendicular_distance: f64) -> Self {
        Self {
            case,
            local: None,
            near: None,
            perpendicular_distance,
            parameter: None,
        }
    }

    /// Azimuth from the robot to the selected point, degrees in `[0, 360)`.
    pub fn bearing(&self) -> Option<f64> {
        self.local.map(LocalPoint::bearing)
    }
}

/// Near point for geodetic inputs, using an equirectangular frame centred on `robot`.
pub fn near_point(
    start: GeoPoint,
    end: GeoPoint,
    robot: GeoPoint,
    radius: f64,
    options: &NearPointOptions,
) -> NearPointResult {
    if !robot.is_finite() {
        return NearPointResult::without_point(NearCase::Degenerate, 0.0);
    }
    near_point_with(&Equirectangular::new(robot), start, end, radius, options)
}

/// Near point for geodetic inputs through any projection; the robot is the projection origin.
pub fn near_point_with<P: Projection>(
    projection: &P,
    start: GeoPoint,
    end: GeoPoint,
    radius: f64,
    options: &NearPointOptions,
) -> NearPointResult {
    let mut result = near_point_local(
        projection.to_local(start),
        projection.to_local(end),
        radius,
        options,
    );
    result.near = result.local.map(|p| projection.to_geo(p));
    result
}

/// Near point for a segment already expressed in the robot-centred frame.
pub fn near_point_local(
    start: LocalPoint,
    end: LocalPoint,
    radius: f64,
    options: &NearPointOptions,
) -> NearPointResult {
    let tol = if options.tolerance.is_finite() {
        options.tolerance.abs()
    } else {
        DEFAULT_TOLERANCE
    };

    if !start.is_finite() || !end.is_finite() || !radius.is_finite() || radius < 0.0 {
        debug!("non-finite near-point input");
        return NearPointResult::without_point(NearCase::Degenerate, 0.0);
    }

    let span = end - start;
    let length = span.norm();
    if length < tol {
        return NearPointResult::without_point(NearCase::Degenerate, start.norm());
    }

    // Foot of the perpendicular from the robot, as distance along S→E.
    let dir = span * (1.0 / length);
    let along_foot = -start.dot(dir);
    let foot = start + dir * along_foot;
    let d_perp = foot.norm();

    if d_perp > radius + tol {
        return NearPointResult::without_point(NearCase::NoIntersection, d_perp);
    }

    let on_segment = |along: f64| along >= -tol && along <= length + tol;
    let parameter = |along: f64| (along / length).clamp(0.0, 1.0);

    if (d_perp - radius).abs() <= tol {
        if !on_segment(along_foot) {
            return NearPointResult::without_point(NearCase::NoIntersection, d_perp);
        }
        return NearPointResult {
            case: NearCase::Tangent,
            local: Some(foot),
            near: None,
            perpendicular_distance: d_perp,
            parameter: Some(parameter(along_foot)),
        };
    }

    let half_chord = (radius * radius - d_perp * d_perp).max(0.0).sqrt();
    let candidates: Vec<f64> = [along_foot - half_chord, along_foot + half_chord]
        .into_iter()
        .filter(|&along| on_segment(along))
        .collect();

    let chosen = match options.selection {
        Selection::TowardEnd => candidates.iter().copied().reduce(f64::max),
        Selection::AlongHeading(heading) => candidates.iter().copied().min_by(|&a, &b| {
            let off = |along: f64| angle_difference(heading, (start + dir * along).bearing()).abs();
            off(a).total_cmp(&off(b))
        }),
    };

    match chosen {
        Some(along) => NearPointResult {
            case: NearCase::TwoIntersections,
            local: Some(start + dir * along),
            near: None,
            perpendicular_distance: d_perp,
            parameter: Some(parameter(along)),
        },
        None => NearPointResult::without_point(NearCase::NoIntersection, d_perp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::METERS_PER_DEG_LAT;

    fn local(x: f64, y: f64) -> LocalPoint {
        LocalPoint::new(x, y)
    }

    fn assert_near(p: LocalPoint, x: f64, y: f64, tol: f64) {
        assert!(
            (p.x - x).abs() <= tol && (p.y - y).abs() <= tol,
            "expected ({x}, {y}), got ({}, {})",
            p.x,
            p.y
        );
    }

    #[test]
    fn test_two_intersections_selects_toward_end() {
        let r = near_point_local(local(-1.0, 0.0), local(1.0, 0.0), 1.0, &Default::default());
        assert_eq!(r.case, NearCase::TwoIntersections);
        assert_near(r.local.unwrap(), 1.0, 0.0, 1e-12);
        assert_eq!(r.parameter, Some(1.0));
        assert_eq!(r.perpendicular_distance, 0.0);
    }

    #[test]
    fn test_tangent_returns_foot_of_perpendicular() {
        let r = near_point_local(local(0.0, 1.0), local(2.0, 1.0), 1.0, &Default::default());
        assert_eq!(r.case, NearCase::Tangent);
        assert_near(r.local.unwrap(), 0.0, 1.0, 1e-12);
        assert_eq!(r.parameter, Some(0.0));
    }

    #[test]
    fn test_line_beyond_radius() {
        let r = near_point_local(local(-1.0, 1.2), local(1.0, 1.2), 1.0, &Default::default());
        assert_eq!(r.case, NearCase::NoIntersection);
        assert!(r.local.is_none() && r.near.is_none() && r.parameter.is_none());
        assert!((r.perpendicular_distance - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_coincident_endpoints_are_degenerate() {
        let r = near_point_local(local(0.5, 0.5), local(0.5, 0.5), 1.0, &Default::default());
        assert_eq!(r.case, NearCase::Degenerate);
        assert!(r.local.is_none());
        assert!(!r.perpendicular_distance.is_nan());
    }

    #[test]
    fn test_single_root_on_segment_counts_as_intersection() {
        // Robot at the start of the segment: the backward crossing lies before S.
        let r = near_point_local(local(0.0, 0.0), local(5.0, 0.0), 1.0, &Default::default());
        assert_eq!(r.case, NearCase::TwoIntersections);
        assert_near(r.local.unwrap(), 1.0, 0.0, 1e-12);
        assert!((r.parameter.unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_crossings_beyond_segment_ends() {
        // The infinite line crosses the circle, the segment lies well past it.
        let r = near_point_local(local(3.0, 0.0), local(6.0, 0.0), 1.0, &Default::default());
        assert_eq!(r.case, NearCase::NoIntersection);
        assert!(r.local.is_none());
    }

    #[test]
    fn test_segment_inside_circle() {
        let r = near_point_local(local(-0.2, 0.0), local(0.2, 0.0), 1.0, &Default::default());
        assert_eq!(r.case, NearCase::NoIntersection);
    }

    #[test]
    fn test_along_heading_selection() {
        let options = NearPointOptions {
            selection: Selection::AlongHeading(270.0),
            ..Default::default()
        };
        let r = near_point_local(local(-1.0, 0.0), local(1.0, 0.0), 1.0, &options);
        assert_eq!(r.case, NearCase::TwoIntersections);
        assert_near(r.local.unwrap(), -1.0, 0.0, 1e-12);
        assert_eq!(r.parameter, Some(0.0));
        assert!((r.bearing().unwrap() - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_inputs_are_degenerate() {
        let opts = NearPointOptions::default();
        let cases = [
            near_point_local(local(f64::NAN, 0.0), local(1.0, 0.0), 1.0, &opts),
            near_point_local(local(-1.0, 0.0), local(f64::INFINITY, 0.0), 1.0, &opts),
            near_point_local(local(-1.0, 0.0), local(1.0, 0.0), f64::NAN, &opts),
            near_point_local(local(-1.0, 0.0), local(1.0, 0.0), -1.0, &opts),
        ];
        for r in cases {
            assert_eq!(r.case, NearCase::Degenerate);
            assert!(!r.perpendicular_distance.is_nan());
        }
    }

    const ROBOT: GeoPoint = GeoPoint::new(50.0, 14.0);

    #[test]
    fn test_geodetic_two_intersections() {
        let start = GeoPoint::new(50.0, 13.9998);
        let end = GeoPoint::new(50.0, 14.0002);
        let r = near_point(start, end, ROBOT, 1.0, &Default::default());

        assert_eq!(r.case, NearCase::TwoIntersections);
        assert_near(r.local.unwrap(), 1.0, 0.0, 1e-6);
        let near = r.near.unwrap();
        assert!((near.lat - 50.0).abs() < 1e-9);
        assert!(near.lon > 14.0);
        assert!((r.bearing().unwrap() - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_geodetic_tangent() {
        let dlat = 1.0 / METERS_PER_DEG_LAT;
        let start = GeoPoint::new(50.0 + dlat, 13.9998);
        let end = GeoPoint::new(50.0 + dlat, 14.0002);
        let r = near_point(start, end, ROBOT, 1.0, &Default::default());

        assert_eq!(r.case, NearCase::Tangent);
        assert_near(r.local.unwrap(), 0.0, 1.0, 2e-3);
        assert!(r.near.is_some());
    }

    #[test]
    fn test_geodetic_no_intersection() {
        let dlat = 1.2 / METERS_PER_DEG_LAT;
        let start = GeoPoint::new(50.0 + dlat, 13.9998);
        let end = GeoPoint::new(50.0 + dlat, 14.0002);
        let r = near_point(start, end, ROBOT, 1.0, &Default::default());

        assert_eq!(r.case, NearCase::NoIntersection);
        assert!(r.near.is_none());
    }

    #[test]
    fn test_result_serializes_case_name() {
        let r = near_point_local(local(-1.0, 1.2), local(1.0, 1.2), 1.0, &Default::default());
        let json = serde_json::to_value(r).unwrap();
        assert_eq!(json["case"], "NO_INTERSECTION");
        assert!(json["near"].is_null());
    }
}
