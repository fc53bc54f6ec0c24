//! # Algorithm Toolbox
//!
//! Direct access to the pure course algorithms.
//! Use these to integrate individual computations into your own systems
//! without going through a [`CourseSession`](crate::CourseSession).
//!
//! ## Course Algorithms
//!
//! - **Route Parts**: classify placed elements into route roles
//! - **Distances**: loop, entry, exit and lap-aware race totals
//! - **Finish Groups**: endpoint plus two funnel posts from one click
//! - **Ordering**: keep finish elements after the route
//! - **Flyover**: per-lap path, pacing and chase-camera frames
//!
//! ## Geographic Utilities
//!
//! - **Haversine Distance**: great-circle distance between points
//! - **Bearing**: initial compass bearing
//! - **Offsets**: travel along or perpendicular to a bearing
//! - **Buoy Arcs**: rounding arc on the passing side
//!
//! # Example
//!
//! ```rust
//! use swim_course::algorithms::{haversine_distance_km, loop_distance_km, LatLng};
//!
//! let a = LatLng::new(0.0, 0.0);
//! let b = LatLng::new(0.0, 1.0);
//! let leg = haversine_distance_km(&a, &b);
//! assert!((loop_distance_km(&[a, b]) - 2.0 * leg).abs() < 1e-9);
//! ```

// =============================================================================
// Core Types (re-exported from lib)
// =============================================================================

pub use crate::{Bounds, CourseData, CourseElement, ElementType, LatLng, FINISH_TYPES};

// =============================================================================
// Geographic Utilities
// =============================================================================

pub use crate::geo_utils::{
    angle_difference, arc_around_buoy, arc_around_buoy_with_config, bearing, haversine_distance,
    haversine_distance_km, lerp_angle, normalize_degrees, offset_along_bearing,
    offset_perpendicular, polyline_length_km, wrap_longitude, ArcConfig, EARTH_RADIUS_KM,
};

// =============================================================================
// Metadata
// =============================================================================

pub use crate::metadata::{
    buoy_side, mandatory_laps, parse_freehand, parse_vertices, rescue_zone_contains,
    rescue_zone_polygon, set_buoy_side, set_mandatory_laps, BuoySide, ElementMeta, Freehand,
    LapRestriction, Side,
};

// =============================================================================
// Route Parts
// =============================================================================

pub use crate::route_parts::{
    display_route, extract_route_parts, finish_point, FinishPoint, Mark, RouteParts,
};

// =============================================================================
// Distances
// =============================================================================

pub use crate::distance::{
    buoys_for_lap, compute_distances, differing_laps, lap_loop_km, loop_distance_km,
    race_total, round_km, CourseDistances, DifferingLap, RaceTotal, DIFF_LAP_COLORS,
};

// =============================================================================
// Finish and Ordering
// =============================================================================

pub use crate::finish::{approach_bearing, build_finish_group, remove_finish_group, FinishConfig};
pub use crate::ordering::{enforce_finish_last, finish_is_last, normalize_order};

// =============================================================================
// Flyover
// =============================================================================

pub use crate::flyover::{
    build_camera_frames, frame_samples, materialize_path, materialize_path_with_config,
    smooth_headings, CameraFrame, CoursePath, FlyoverConfig, PathSample, PathSegment,
    SegmentKind,
};

/// Camera frames straight from an element list.
///
/// Shorthand for [`materialize_path_with_config`] followed by
/// [`build_camera_frames`]. Empty for courses with fewer than 2 buoys.
pub fn flyover_frames(
    elements: &[CourseElement],
    laps: u32,
    config: &FlyoverConfig,
) -> Vec<CameraFrame> {
    let path = materialize_path_with_config(elements, laps, config);
    build_camera_frames(&path, config)
}
