//! Turns the risk set into the avoidance constraint sent to the routing
//! provider. Pure data transformation; the escalation loop decides the floor.

use geo::{Coord, Rect};
use itertools::Itertools;

use crate::geo::RiskPoint;

/// Half-width of the box drawn around a risk point, in degrees.
pub const DEFAULT_MARGIN_DEG: f64 = 0.0001;

/// A bounding box the provider is asked to route around.
///
/// geo convention: x = longitude, y = latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvoidanceArea(Rect<f64>);

impl AvoidanceArea {
    fn around(point: &RiskPoint, margin: f64) -> Self {
        Self(Rect::new(
            Coord {
                x: point.lng - margin,
                y: point.lat - margin,
            },
            Coord {
                x: point.lng + margin,
                y: point.lat + margin,
            },
        ))
    }

    /// Provider wire order: minLng,minLat,maxLng,maxLat.
    fn to_query_fragment(self) -> String {
        let (min, max) = (self.0.min(), self.0.max());
        format!("{},{},{},{}", min.x, min.y, max.x, max.y)
    }
}

/// The avoidance constraint for one provider query: one box per risk point
/// above the current floor. Boxes are never merged, even when they overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct AvoidanceSpec {
    areas: Vec<AvoidanceArea>,
}

impl AvoidanceSpec {
    /// Builds the constraint for one attempt.
    ///
    /// Only risks strictly above `floor` are kept, so a floor of 0 keeps
    /// every positively-rated risk and raising the floor monotonically
    /// shrinks the set. An empty survivor set yields `None`: the provider is
    /// then queried without the avoidance parameter rather than with an
    /// empty list.
    pub fn build(risks: &[RiskPoint], floor: f64, margin: f64) -> Option<Self> {
        let areas: Vec<_> = risks
            .iter()
            .filter(|point| point.risk > floor)
            .map(|point| AvoidanceArea::around(point, margin))
            .collect();
        if areas.is_empty() {
            None
        } else {
            Some(Self { areas })
        }
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn to_query_value(&self) -> String {
        self.areas
            .iter()
            .map(|area| area.to_query_fragment())
            .join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn risks() -> Vec<RiskPoint> {
        vec![
            RiskPoint::new(35.005, 139.005, 3.0).unwrap(),
            RiskPoint::new(35.010, 139.010, 1.0).unwrap(),
            RiskPoint::new(35.020, 139.020, 0.0).unwrap(),
        ]
    }

    #[test]
    fn floor_filter_is_strict() {
        // Zero-rated risks never survive even at floor 0.
        let spec = AvoidanceSpec::build(&risks(), 0.0, DEFAULT_MARGIN_DEG).unwrap();
        assert_eq!(spec.len(), 2);

        // A point exactly at the floor is dropped.
        let spec = AvoidanceSpec::build(&risks(), 1.0, DEFAULT_MARGIN_DEG).unwrap();
        assert_eq!(spec.len(), 1);
    }

    #[test]
    fn raising_the_floor_only_shrinks_the_set() {
        let risks = risks();
        let mut previous: Option<AvoidanceSpec> = None;
        for floor in [0.0, 1.0, 2.0, 3.0] {
            let spec = AvoidanceSpec::build(&risks, floor, DEFAULT_MARGIN_DEG);
            let count = spec.as_ref().map_or(0, AvoidanceSpec::len);
            if let Some(prev) = &previous {
                assert!(count <= prev.len());
                // Every surviving area existed at the lower floor.
                if let Some(spec) = &spec {
                    for area in &spec.areas {
                        assert!(prev.areas.contains(area));
                    }
                }
            }
            if let Some(spec) = spec {
                previous = Some(spec);
            }
        }
    }

    #[test]
    fn empty_survivor_set_is_absent_not_empty() {
        assert_eq!(AvoidanceSpec::build(&risks(), 3.0, DEFAULT_MARGIN_DEG), None);
        assert_eq!(AvoidanceSpec::build(&[], 0.0, DEFAULT_MARGIN_DEG), None);
    }

    #[test]
    fn query_value_is_pipe_joined_lng_first() {
        let points = vec![
            RiskPoint::new(35.0, 139.0, 2.0).unwrap(),
            RiskPoint::new(-10.0, 20.0, 5.0).unwrap(),
        ];
        let spec = AvoidanceSpec::build(&points, 0.0, 0.5).unwrap();
        assert_eq!(
            spec.to_query_value(),
            "138.5,34.5,139.5,35.5|19.5,-10.5,20.5,-9.5"
        );
    }
}
