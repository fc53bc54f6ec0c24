//! Geographic utilities: great-circle distance, bearing and point offsets.
//!
//! All functions work on a spherical Earth of radius [`EARTH_RADIUS_KM`].
//! They are pure and never fail; degenerate input (coincident points) gives
//! a zero distance and a bearing of 0.

use serde::{Deserialize, Serialize};

use crate::metadata::Side;
use crate::LatLng;

/// Mean Earth radius used by every distance computation.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance in kilometers.
///
/// # Example
/// ```
/// use swim_course::LatLng;
/// use swim_course::geo_utils::haversine_distance_km;
///
/// let a = LatLng::new(0.0, 0.0);
/// let b = LatLng::new(0.0, 1.0);
/// assert!((haversine_distance_km(&a, &b) - 111.195).abs() < 0.01);
/// ```
pub fn haversine_distance_km(a: &LatLng, b: &LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let x = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * x.sqrt().atan2((1.0 - x).sqrt());
    EARTH_RADIUS_KM * c
}

/// Haversine distance in meters.
pub fn haversine_distance(a: &LatLng, b: &LatLng) -> f64 {
    haversine_distance_km(a, b) * 1000.0
}

/// Total length of an open polyline in kilometers.
pub fn polyline_length_km(points: &[LatLng]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance_km(&w[0], &w[1]))
        .sum()
}

/// Initial compass bearing from `from` to `to`, in degrees within [0, 360).
///
/// Returns 0 when the points coincide.
pub fn bearing(from: &LatLng, to: &LatLng) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let y = d_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();
    normalize_degrees(y.atan2(x).to_degrees())
}

/// Destination reached travelling `distance_m` meters from `point` on `bearing_deg`.
///
/// Negative distances travel backwards along the bearing. The longitude is
/// wrapped into [-180, 180] so offsets across the antimeridian stay valid.
pub fn offset_along_bearing(point: &LatLng, bearing_deg: f64, distance_m: f64) -> LatLng {
    let d = distance_m / 1000.0 / EARTH_RADIUS_KM;
    let brng = bearing_deg.to_radians();
    let lat1 = point.lat.to_radians();
    let lng1 = point.lng.to_radians();

    let lat2 = (lat1.sin() * d.cos() + lat1.cos() * d.sin() * brng.cos()).asin();
    let lng2 = lng1
        + (brng.sin() * d.sin() * lat1.cos()).atan2(d.cos() - lat1.sin() * lat2.sin());

    LatLng::new(lat2.to_degrees(), wrap_longitude(lng2.to_degrees()))
}

/// Wrap a longitude into [-180, 180]; values already in range are unchanged.
pub fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        (lng + 540.0).rem_euclid(360.0) - 180.0
    }
}

/// Offset `point` perpendicular to `bearing_deg`: left is bearing-90, right is bearing+90.
pub fn offset_perpendicular(point: &LatLng, bearing_deg: f64, offset_m: f64, side: Side) -> LatLng {
    let perpendicular = match side {
        Side::Left => bearing_deg - 90.0,
        Side::Right => bearing_deg + 90.0,
    };
    offset_along_bearing(point, normalize_degrees(perpendicular), offset_m)
}

/// Geometry of the rounding arc drawn around a sided buoy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcConfig {
    /// Distance before and after the buoy along the approach bearing
    pub spacing_m: f64,
    /// Perpendicular distance of the arc from the buoy line
    pub offset_m: f64,
}

impl Default for ArcConfig {
    fn default() -> Self {
        Self {
            spacing_m: 15.0,
            offset_m: 15.0,
        }
    }
}

/// Three points bulging to `side` of a buoy: before, abeam and after it.
pub fn arc_around_buoy(point: &LatLng, bearing_deg: f64, side: Side) -> [LatLng; 3] {
    arc_around_buoy_with_config(point, bearing_deg, side, &ArcConfig::default())
}

/// [`arc_around_buoy`] with explicit spacing.
pub fn arc_around_buoy_with_config(
    point: &LatLng,
    bearing_deg: f64,
    side: Side,
    config: &ArcConfig,
) -> [LatLng; 3] {
    let before = offset_along_bearing(point, bearing_deg, -config.spacing_m);
    let after = offset_along_bearing(point, bearing_deg, config.spacing_m);
    [
        offset_perpendicular(&before, bearing_deg, config.offset_m, side),
        offset_perpendicular(point, bearing_deg, config.offset_m, side),
        offset_perpendicular(&after, bearing_deg, config.offset_m, side),
    ]
}

/// Wrap any angle into [0, 360).
pub fn normalize_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed shortest-arc difference from `from` to `to`, in (-180, 180].
pub fn angle_difference(from: f64, to: f64) -> f64 {
    let diff = (to - from + 540.0).rem_euclid(360.0) - 180.0;
    if diff == -180.0 {
        180.0
    } else {
        diff
    }
}

/// Interpolate between two headings along the shortest arc.
pub fn lerp_angle(from: f64, to: f64, t: f64) -> f64 {
    normalize_degrees(from + angle_difference(from, to) * t)
}
