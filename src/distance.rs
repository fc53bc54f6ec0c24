//! Course distance model.
//!
//! Distances are great-circle kilometers. The swim is modelled as:
//!
//! - **entry**: shore entry to start
//! - **loop**: the closed buoy circuit B1 → ... → Bn → B1, once per lap
//! - **first-lap extra**: lap 1 swaps the closing edge Bn → B1 for
//!   Bn → start → B1, because the start is only a waypoint on lap 1
//! - **exit**: last buoy to the finish point
//!
//! Buoys may be restricted to specific laps (`mandatoryLaps`), so the race
//! total sums each lap's own loop instead of multiplying one loop by the lap
//! count.

use log::debug;
use serde::Serialize;

use crate::geo_utils::haversine_distance_km;
use crate::route_parts::{extract_route_parts, finish_point, Mark, RouteParts};
use crate::{CourseData, CourseElement, LatLng};

/// Colors for laps whose buoy path differs from the full set.
pub const DIFF_LAP_COLORS: [&str; 4] = ["#22C55E", "#7C3AED", "#EC4899", "#F97316"];

/// Per-course distances, each rounded to meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CourseDistances {
    /// One closed buoy loop
    pub loop_km: f64,
    /// Shore entry to start
    pub entry_km: f64,
    /// Last buoy to finish
    pub exit_km: f64,
    /// Lap-1 detour through the start
    pub first_lap_extra_km: f64,
}

/// Lap-aware race total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RaceTotal {
    pub total_km: f64,
    /// Mean of the per-lap loop distances
    pub avg_loop_km: f64,
}

/// A lap whose buoy path differs from the full buoy set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DifferingLap {
    pub lap: u32,
    pub color: &'static str,
}

/// Round to 3 decimals (meter precision on kilometers).
pub fn round_km(km: f64) -> f64 {
    (km * 1000.0).round() / 1000.0
}

/// Closed-circuit length through `points`, including the edge back to the first.
///
/// Zero for fewer than 2 points.
pub fn loop_distance_km(points: &[LatLng]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    (0..points.len())
        .map(|i| haversine_distance_km(&points[i], &points[(i + 1) % points.len()]))
        .sum()
}

/// Buoys active on `lap`, in route order.
pub fn buoys_for_lap(buoys: &[Mark], lap: u32) -> Vec<&Mark> {
    buoys.iter().filter(|b| b.active_on(lap)).collect()
}

/// Closed loop distance over the buoys active on `lap`.
pub fn lap_loop_km(buoys: &[Mark], lap: u32) -> f64 {
    let points: Vec<LatLng> = buoys_for_lap(buoys, lap)
        .iter()
        .map(|b| b.position())
        .collect();
    loop_distance_km(&points)
}

/// Lap-1 detour through the start: Bn → start → B1 minus Bn → B1.
fn first_lap_extra(start: &LatLng, first: &LatLng, last: &LatLng) -> f64 {
    haversine_distance_km(last, start) + haversine_distance_km(start, first)
        - haversine_distance_km(last, first)
}

fn entry_km(parts: &RouteParts) -> f64 {
    match (&parts.shore_entry, &parts.start) {
        (Some(shore), Some(start)) => haversine_distance_km(&shore.position(), &start.position()),
        _ => 0.0,
    }
}

/// Compute the per-course distances over all buoys, ignoring lap restrictions.
///
/// # Example
/// ```
/// use swim_course::{compute_distances, CourseElement, ElementType};
///
/// let d = compute_distances(&[
///     CourseElement::new("a", ElementType::Buoy, 0.0, 0.0, 0),
///     CourseElement::new("b", ElementType::Buoy, 0.0, 0.01, 1),
/// ]);
/// assert!((d.loop_km - 2.224).abs() < 0.001);
/// assert_eq!(d.entry_km, 0.0);
/// ```
pub fn compute_distances(elements: &[CourseElement]) -> CourseDistances {
    let parts = extract_route_parts(elements);
    distances_for_parts(&parts)
}

/// [`compute_distances`] over already-extracted parts.
pub fn distances_for_parts(parts: &RouteParts) -> CourseDistances {
    let buoys = parts.buoy_positions();

    let loop_km = loop_distance_km(&buoys);

    let first_lap_extra_km = match (&parts.start, buoys.first(), buoys.last()) {
        (Some(start), Some(first), Some(last)) => first_lap_extra(&start.position(), first, last),
        _ => 0.0,
    };

    let exit_km = match (finish_point(parts), buoys.last()) {
        (Some(finish), Some(last)) => haversine_distance_km(last, &finish.position()),
        _ => 0.0,
    };

    let distances = CourseDistances {
        loop_km: round_km(loop_km),
        entry_km: round_km(entry_km(parts)),
        exit_km: round_km(exit_km),
        first_lap_extra_km: round_km(first_lap_extra_km),
    };
    debug!(
        "[Distance] loop={:.3}km entry={:.3}km exit={:.3}km first_lap_extra={:.3}km ({} buoys)",
        distances.loop_km,
        distances.entry_km,
        distances.exit_km,
        distances.first_lap_extra_km,
        buoys.len()
    );
    distances
}

/// Total race distance honoring per-lap buoy restrictions.
///
/// Sums each lap's own closed loop, then adds the entry, the lap-1 detour
/// through the start (over lap 1's buoys) and the exit from the last buoy
/// of the final lap. A lap count of 0 is treated as 1.
pub fn race_total(course: &CourseData) -> RaceTotal {
    let parts = extract_route_parts(&course.elements);
    race_total_for_parts(&parts, course.laps)
}

/// [`race_total`] over already-extracted parts.
pub fn race_total_for_parts(parts: &RouteParts, laps: u32) -> RaceTotal {
    let laps = laps.max(1);
    let buoys = &parts.buoys;

    let total_loop_km: f64 = (1..=laps).map(|lap| lap_loop_km(buoys, lap)).sum();
    let avg_loop_km = total_loop_km / laps as f64;

    let first_lap_extra_km = match &parts.start {
        Some(start) => {
            let lap1 = buoys_for_lap(buoys, 1);
            match (lap1.first(), lap1.last()) {
                (Some(first), Some(last)) => {
                    first_lap_extra(&start.position(), &first.position(), &last.position())
                }
                _ => 0.0,
            }
        }
        None => 0.0,
    };

    let exit_km = match (finish_point(parts), buoys.last()) {
        (Some(finish), Some(fallback)) => {
            let last_lap = buoys_for_lap(buoys, laps);
            let last = last_lap.last().copied().unwrap_or(fallback);
            haversine_distance_km(&last.position(), &finish.position())
        }
        _ => 0.0,
    };

    RaceTotal {
        total_km: entry_km(parts) + total_loop_km + first_lap_extra_km + exit_km,
        avg_loop_km,
    }
}

/// Laps whose active buoy list differs from the full buoy list.
///
/// Each differing lap gets the next color from [`DIFF_LAP_COLORS`]. Empty
/// when there are fewer than 2 buoys, a single lap, or no restricted buoy.
pub fn differing_laps(elements: &[CourseElement], laps: u32) -> Vec<DifferingLap> {
    let parts = extract_route_parts(elements);
    differing_laps_for_parts(&parts, laps)
}

/// [`differing_laps`] over already-extracted parts.
pub fn differing_laps_for_parts(parts: &RouteParts, laps: u32) -> Vec<DifferingLap> {
    let buoys = &parts.buoys;
    if buoys.len() < 2 || laps <= 1 {
        return Vec::new();
    }
    if !buoys.iter().any(|b| b.laps.is_restricted()) {
        return Vec::new();
    }

    let mut result: Vec<DifferingLap> = Vec::new();
    for lap in 1..=laps {
        let lap_buoys = buoys_for_lap(buoys, lap);
        let same = lap_buoys.len() == buoys.len()
            && lap_buoys.iter().zip(buoys.iter()).all(|(a, b)| a.id() == b.id());
        if !same {
            result.push(DifferingLap {
                lap,
                color: DIFF_LAP_COLORS[result.len() % DIFF_LAP_COLORS.len()],
            });
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ElementType;

    fn buoy(id: &str, lat: f64, lng: f64, order: u32) -> CourseElement {
        CourseElement::new(id, ElementType::Buoy, lat, lng, order)
    }

    fn triangle() -> Vec<CourseElement> {
        vec![
            buoy("b1", 0.0, 0.0, 0),
            buoy("b2", 0.0, 1.0, 1),
            buoy("b3", 1.0, 0.0, 2),
        ]
    }

    #[test]
    fn test_triangle_loop_distance() {
        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(0.0, 1.0);
        let c = LatLng::new(1.0, 0.0);
        let reference = haversine_distance_km(&a, &b)
            + haversine_distance_km(&b, &c)
            + haversine_distance_km(&c, &a);

        let d = compute_distances(&triangle());
        assert!((d.loop_km - reference).abs() < 0.01);
        // Two legs of ~111.19 km plus the ~157 km hypotenuse
        assert!(d.loop_km > 379.0 && d.loop_km < 380.0);
    }

    #[test]
    fn test_loop_zero_for_fewer_than_two_buoys() {
        assert_eq!(loop_distance_km(&[]), 0.0);
        assert_eq!(loop_distance_km(&[LatLng::new(1.0, 1.0)]), 0.0);
        assert_eq!(compute_distances(&[buoy("b", 1.0, 1.0, 0)]).loop_km, 0.0);
    }

    #[test]
    fn test_empty_course_all_zero() {
        assert_eq!(compute_distances(&[]), CourseDistances::default());
        let total = race_total(&CourseData::default());
        assert_eq!(total.total_km, 0.0);
        assert_eq!(total.avg_loop_km, 0.0);
    }

    #[test]
    fn test_entry_is_shore_to_start() {
        let mut elements = triangle();
        elements.push(CourseElement::new("shore", ElementType::ShoreEntry, -0.01, 0.0, 3));
        elements.push(CourseElement::new("start", ElementType::Start, -0.005, 0.0, 4));
        let d = compute_distances(&elements);
        let expected = haversine_distance_km(&LatLng::new(-0.01, 0.0), &LatLng::new(-0.005, 0.0));
        assert_eq!(d.entry_km, round_km(expected));

        // Start without shore entry contributes no entry distance
        let no_shore: Vec<CourseElement> =
            elements.into_iter().filter(|e| e.id != "shore").collect();
        assert_eq!(compute_distances(&no_shore).entry_km, 0.0);
    }

    #[test]
    fn test_first_lap_extra() {
        let elements = vec![
            buoy("b1", 0.0, 0.0, 1),
            buoy("b2", 0.0, 0.01, 2),
            CourseElement::new("start", ElementType::Start, -0.01, 0.0, 0),
        ];
        let d = compute_distances(&elements);
        let start = LatLng::new(-0.01, 0.0);
        let b1 = LatLng::new(0.0, 0.0);
        let b2 = LatLng::new(0.0, 0.01);
        let expected = haversine_distance_km(&b2, &start) + haversine_distance_km(&start, &b1)
            - haversine_distance_km(&b2, &b1);
        assert_eq!(d.first_lap_extra_km, round_km(expected));
        assert!(d.first_lap_extra_km > 0.0);
    }

    #[test]
    fn test_exit_uses_finish_point() {
        let mut elements = triangle();
        elements.push(CourseElement::new("fin", ElementType::FinishEndpoint, 2.0, 0.0, 3));
        let d = compute_distances(&elements);
        let expected = haversine_distance_km(&LatLng::new(1.0, 0.0), &LatLng::new(2.0, 0.0));
        assert_eq!(d.exit_km, round_km(expected));
    }

    #[test]
    fn test_rounding_to_meters() {
        assert_eq!(round_km(1.23456), 1.235);
        assert_eq!(round_km(0.0004), 0.0);
    }

    #[test]
    fn test_buoys_for_lap_unrestricted_returns_all() {
        let parts = extract_route_parts(&triangle());
        for lap in 1..=5 {
            assert_eq!(buoys_for_lap(&parts.buoys, lap).len(), 3);
        }
    }

    #[test]
    fn test_mandatory_lap_filtering() {
        let mut elements = triangle();
        elements[1].metadata = Some(r#"{"mandatoryLaps":"1"}"#.to_string());
        let parts = extract_route_parts(&elements);

        assert_eq!(buoys_for_lap(&parts.buoys, 1).len(), 3);
        let lap2: Vec<&str> = buoys_for_lap(&parts.buoys, 2).iter().map(|b| b.id()).collect();
        assert_eq!(lap2, vec!["b1", "b3"]);

        assert_eq!(
            differing_laps(&elements, 2),
            vec![DifferingLap {
                lap: 2,
                color: DIFF_LAP_COLORS[0]
            }]
        );
    }

    #[test]
    fn test_numeric_lap_forms_keep_buoys_active() {
        let mut elements = triangle();
        elements[0].metadata = Some(r#"{"mandatoryLaps":1.0}"#.to_string());
        elements[1].metadata = Some(r#"{"mandatoryLaps":"1.0"}"#.to_string());
        elements[2].metadata = Some(r#"{"mandatoryLaps":0}"#.to_string());
        let parts = extract_route_parts(&elements);

        assert_eq!(buoys_for_lap(&parts.buoys, 1).len(), 3);
        let lap2: Vec<&str> = buoys_for_lap(&parts.buoys, 2).iter().map(|b| b.id()).collect();
        assert_eq!(lap2, vec!["b3"]);
    }

    #[test]
    fn test_differing_laps_empty_when_unrestricted() {
        for laps in [1, 2, 5, 10] {
            assert!(differing_laps(&triangle(), laps).is_empty());
        }
    }

    #[test]
    fn test_differing_laps_colors_cycle() {
        let mut elements = triangle();
        elements[0].metadata = Some(r#"{"mandatoryLaps":"1"}"#.to_string());
        let diff = differing_laps(&elements, 6);
        let laps: Vec<u32> = diff.iter().map(|d| d.lap).collect();
        assert_eq!(laps, vec![2, 3, 4, 5, 6]);
        assert_eq!(diff[4].color, DIFF_LAP_COLORS[0]);
    }

    #[test]
    fn test_race_total_sums_per_lap_loops() {
        let mut elements = triangle();
        elements[1].metadata = Some(r#"{"mandatoryLaps":"1"}"#.to_string());
        let course = CourseData {
            elements: elements.clone(),
            laps: 2,
            ..CourseData::default()
        };

        let full = loop_distance_km(&[
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 1.0),
            LatLng::new(1.0, 0.0),
        ]);
        let short = loop_distance_km(&[LatLng::new(0.0, 0.0), LatLng::new(1.0, 0.0)]);

        let total = race_total(&course);
        assert!((total.total_km - (full + short)).abs() < 1e-9);
        assert!((total.avg_loop_km - (full + short) / 2.0).abs() < 1e-9);
        // Naive loop x laps would overstate the race
        assert!(total.total_km < compute_distances(&elements).loop_km * 2.0);
    }

    #[test]
    fn test_race_total_includes_entry_extra_and_exit() {
        let elements = vec![
            CourseElement::new("shore", ElementType::ShoreEntry, -0.02, 0.0, 0),
            CourseElement::new("start", ElementType::Start, -0.01, 0.0, 1),
            buoy("b1", 0.0, 0.0, 2),
            buoy("b2", 0.0, 0.01, 3),
            CourseElement::new("fin", ElementType::Finish, -0.01, 0.01, 4),
        ];
        let course = CourseData {
            elements: elements.clone(),
            laps: 3,
            ..CourseData::default()
        };
        let total = race_total(&course);
        let d = compute_distances(&elements);
        let expected = d.entry_km + 3.0 * d.loop_km + d.first_lap_extra_km + d.exit_km;
        assert!((total.total_km - expected).abs() < 0.005);
    }
}
