//! Route-part extraction.
//!
//! Classifies a flat element collection into route roles: shore entry,
//! start, the buoy and gate sequences, and the finish variants. Rescue zones
//! and feeding platforms are map annotations and never take a role.

use serde::Serialize;

use crate::geo_utils::{arc_around_buoy_with_config, bearing, ArcConfig};
use crate::metadata::{BuoySide, LapRestriction};
use crate::{CourseElement, ElementType, LatLng};

/// A buoy or gate post with its metadata parsed once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mark {
    pub element: CourseElement,
    pub side: BuoySide,
    pub laps: LapRestriction,
}

impl Mark {
    pub fn from_element(element: &CourseElement) -> Self {
        let meta = element.meta();
        Self {
            element: element.clone(),
            side: meta.buoy_side(),
            laps: meta.laps().clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.element.id
    }

    pub fn position(&self) -> LatLng {
        self.element.position()
    }

    /// Whether this mark is part of the route on `lap` (1-based).
    pub fn active_on(&self, lap: u32) -> bool {
        self.laps.includes(lap)
    }
}

/// Classification snapshot of a course's route elements.
///
/// Derived on every read; never cached across mutations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteParts {
    pub shore_entry: Option<CourseElement>,
    pub start: Option<CourseElement>,
    /// Legacy channel left post, or legacy single-point finish
    pub finish_left: Option<CourseElement>,
    pub finish_right: Option<CourseElement>,
    pub finish_endpoint: Option<CourseElement>,
    pub finish_funnel_left: Option<CourseElement>,
    pub finish_funnel_right: Option<CourseElement>,
    /// Buoys in route order
    pub buoys: Vec<Mark>,
    /// Gate posts in route order
    pub gates: Vec<Mark>,
}

impl RouteParts {
    /// Buoy positions in route order.
    pub fn buoy_positions(&self) -> Vec<LatLng> {
        self.buoys.iter().map(Mark::position).collect()
    }

    /// Whether any buoy or gate is restricted to specific laps.
    pub fn has_lap_variation(&self) -> bool {
        self.buoys
            .iter()
            .chain(self.gates.iter())
            .any(|m| m.laps.is_restricted())
    }
}

/// Classify `elements` into route roles.
///
/// Elements are ordered by `order` (stable, so ties keep their input order).
/// When a singleton role appears more than once, the first in route order
/// wins and the rest are ignored.
///
/// # Example
/// ```
/// use swim_course::{extract_route_parts, CourseElement, ElementType};
///
/// let parts = extract_route_parts(&[
///     CourseElement::new("b2", ElementType::Buoy, 0.0, 1.0, 2),
///     CourseElement::new("s", ElementType::Start, 0.0, 0.0, 0),
///     CourseElement::new("b1", ElementType::Buoy, 1.0, 0.0, 1),
/// ]);
/// assert_eq!(parts.start.unwrap().id, "s");
/// assert_eq!(parts.buoys[0].id(), "b1");
/// ```
pub fn extract_route_parts(elements: &[CourseElement]) -> RouteParts {
    let mut sorted: Vec<&CourseElement> = elements
        .iter()
        .filter(|el| !el.element_type.is_annotation())
        .collect();
    sorted.sort_by_key(|el| el.order);

    RouteParts {
        shore_entry: first_of(&sorted, |t| t == ElementType::ShoreEntry),
        start: first_of(&sorted, |t| t == ElementType::Start),
        finish_left: first_of(&sorted, |t| {
            matches!(t, ElementType::FinishLeft | ElementType::Finish)
        }),
        finish_right: first_of(&sorted, |t| t == ElementType::FinishRight),
        finish_endpoint: first_of(&sorted, |t| t == ElementType::FinishEndpoint),
        finish_funnel_left: first_of(&sorted, |t| t == ElementType::FinishFunnelLeft),
        finish_funnel_right: first_of(&sorted, |t| t == ElementType::FinishFunnelRight),
        buoys: sorted
            .iter()
            .filter(|el| el.element_type == ElementType::Buoy)
            .map(|el| Mark::from_element(el))
            .collect(),
        gates: sorted
            .iter()
            .filter(|el| el.element_type.is_gate())
            .map(|el| Mark::from_element(el))
            .collect(),
    }
}

fn first_of(
    sorted: &[&CourseElement],
    pred: impl Fn(ElementType) -> bool,
) -> Option<CourseElement> {
    sorted
        .iter()
        .find(|el| pred(el.element_type))
        .map(|el| (*el).clone())
}

/// Where the race ends, by finish representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FinishPoint {
    /// Current 3-point model: the endpoint itself
    Endpoint(LatLng),
    /// Legacy 2-point channel: midpoint between the posts
    ChannelMidpoint(LatLng),
    /// Legacy single-point finish
    LegacySingle(LatLng),
}

impl FinishPoint {
    pub fn position(&self) -> LatLng {
        match self {
            FinishPoint::Endpoint(p)
            | FinishPoint::ChannelMidpoint(p)
            | FinishPoint::LegacySingle(p) => *p,
        }
    }
}

/// Resolve the finish point, preferring the newest finish representation.
pub fn finish_point(parts: &RouteParts) -> Option<FinishPoint> {
    match (&parts.finish_endpoint, &parts.finish_left, &parts.finish_right) {
        (Some(endpoint), _, _) => Some(FinishPoint::Endpoint(endpoint.position())),
        (None, Some(left), Some(right)) => Some(FinishPoint::ChannelMidpoint(
            left.position().midpoint(&right.position()),
        )),
        (None, Some(single), None) => Some(FinishPoint::LegacySingle(single.position())),
        (None, None, _) => None,
    }
}

/// On-map route polyline for one lap.
///
/// Shore entry, start, then the buoys, with every sided buoy replaced by its
/// rounding arc on the passing side. Ends at the finish, or closes back to
/// the first buoy when there is no finish.
pub fn display_route(parts: &RouteParts, arc: &ArcConfig) -> Vec<LatLng> {
    let mut route: Vec<LatLng> = Vec::new();
    if let Some(shore) = &parts.shore_entry {
        route.push(shore.position());
    }
    if let Some(start) = &parts.start {
        route.push(start.position());
    }

    let buoys = parts.buoy_positions();
    for (i, mark) in parts.buoys.iter().enumerate() {
        let here = buoys[i];
        let approach_from = match route.last() {
            Some(prev) => *prev,
            None => buoys[(i + buoys.len() - 1) % buoys.len()],
        };
        match mark.side.side() {
            Some(side) => {
                let heading = bearing(&approach_from, &here);
                route.extend(arc_around_buoy_with_config(&here, heading, side, arc));
            }
            None => route.push(here),
        }
    }

    match finish_point(parts) {
        Some(finish) => route.push(finish.position()),
        None if buoys.len() >= 2 => route.push(buoys[0]),
        None => {}
    }
    route
}
