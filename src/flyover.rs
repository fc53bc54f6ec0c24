//! Per-lap path materialization and chase-camera frames.
//!
//! The abstract route (start, the buoy loop once per lap, finish) is
//! expanded into one continuous open polyline. Each lap visits its own
//! filtered buoys and closes back on its first buoy, except the final lap
//! which runs to the finish instead when one exists.
//!
//! Traversal time is not uniform. The path is split into segments (entry,
//! one per lap, exit) and each segment gets a share of the total time
//! proportional to its weight. Edge laps and the entry/exit legs are
//! weighted higher than middle laps, so the camera lingers at the start and
//! the finish and hurries through the repeats.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::distance::buoys_for_lap;
use crate::geo_utils::{bearing, haversine_distance_km, lerp_angle, offset_along_bearing};
use crate::route_parts::{extract_route_parts, finish_point};
use crate::{CourseElement, LatLng};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for flyover pacing and the chase camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlyoverConfig {
    /// Video length in seconds
    pub duration_secs: f64,
    /// Frames per second
    pub fps: u32,
    /// Pacing weight for the entry leg, the first lap, the last lap and the exit leg
    pub edge_lap_weight: f64,
    /// Pacing weight for every lap between the first and the last
    pub middle_lap_weight: f64,
    /// EMA factor applied to the heading between consecutive frames
    pub heading_smoothing: f64,
    /// Camera tilt in degrees
    pub tilt: f64,
    /// Camera zoom level
    pub zoom: f64,
    /// How far behind the swimmer the camera sits
    pub chase_distance_m: f64,
}

impl Default for FlyoverConfig {
    fn default() -> Self {
        Self {
            duration_secs: 20.0,
            fps: 30,
            edge_lap_weight: 3.0,
            middle_lap_weight: 1.0,
            heading_smoothing: 0.08,
            tilt: 67.5,
            zoom: 18.0,
            chase_distance_m: 10.0,
        }
    }
}

impl FlyoverConfig {
    /// Number of frames in the video: `floor(duration * fps)`.
    pub fn frame_count(&self) -> usize {
        (self.duration_secs.max(0.0) * self.fps as f64).floor() as usize
    }
}

// ============================================================================
// Path types
// ============================================================================

/// One vertex of the materialized path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathPoint {
    pub position: LatLng,
    /// Lap this vertex belongs to; 0 for the start
    pub lap: u32,
}

/// Which part of the race a segment covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "lap", rename_all = "snake_case")]
pub enum SegmentKind {
    /// Start to the first buoy of lap 1
    Entry,
    /// One lap, 1-based
    Lap(u32),
    /// Last buoy of the final lap to the finish
    Exit,
}

/// A contiguous run of path vertices that shares one pacing weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathSegment {
    pub kind: SegmentKind,
    /// Index of the first vertex (the previous segment's last vertex)
    pub first_index: usize,
    /// Index of the last vertex
    pub last_index: usize,
    /// Cumulative distance at `first_index`
    pub start_km: f64,
    pub distance_km: f64,
    pub weight: f64,
}

/// A point on the path at some time fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathSample {
    pub position: LatLng,
    /// Forward bearing of the edge being swum
    pub bearing: f64,
    pub lap: u32,
}

/// A materialized course path with its pacing segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoursePath {
    pub points: Vec<PathPoint>,
    /// Cumulative distance at each vertex; same length as `points`
    pub cumulative_km: Vec<f64>,
    pub segments: Vec<PathSegment>,
    pub total_km: f64,
}

impl CoursePath {
    /// Whether there is nothing to fly over.
    pub fn is_empty(&self) -> bool {
        self.points.len() < 2 || self.total_km <= 0.0
    }

    /// Sum of the weights of all non-degenerate segments.
    fn total_weight(&self) -> f64 {
        self.segments
            .iter()
            .filter(|s| s.distance_km > 0.0)
            .map(|s| s.weight)
            .sum()
    }

    /// Map a time fraction in [0, 1] to a cumulative distance.
    ///
    /// Piecewise linear: each segment spends `weight / total_weight` of the
    /// time, covering its distance uniformly within that span. Zero-length
    /// segments take no time.
    pub fn distance_at(&self, t: f64) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let t = t.clamp(0.0, 1.0);
        let total_weight = self.total_weight();
        if total_weight <= 0.0 {
            return t * self.total_km;
        }

        let mut elapsed = 0.0;
        let mut last_end = 0.0;
        for segment in self.segments.iter().filter(|s| s.distance_km > 0.0) {
            let span = segment.weight / total_weight;
            if t <= elapsed + span {
                let local = if span > 0.0 { (t - elapsed) / span } else { 0.0 };
                return segment.start_km + local.clamp(0.0, 1.0) * segment.distance_km;
            }
            elapsed += span;
            last_end = segment.start_km + segment.distance_km;
        }
        last_end
    }

    /// Locate the point at a cumulative distance, interpolating position
    /// linearly within the bracketing edge. Zero-length edges are skipped so
    /// the bearing always comes from a real edge.
    pub fn locate(&self, distance_km: f64) -> Option<PathSample> {
        if self.is_empty() {
            return None;
        }
        let target = distance_km.clamp(0.0, self.total_km);

        let edges = 0..self.points.len() - 1;
        let mut last_real = None;
        let mut found = None;
        for i in edges {
            let (from_km, to_km) = (self.cumulative_km[i], self.cumulative_km[i + 1]);
            if to_km <= from_km {
                continue;
            }
            last_real = Some(i);
            if to_km >= target {
                found = Some(i);
                break;
            }
        }
        let i = found.or(last_real)?;

        let from = &self.points[i];
        let to = &self.points[i + 1];
        let (from_km, to_km) = (self.cumulative_km[i], self.cumulative_km[i + 1]);
        let frac = ((target - from_km) / (to_km - from_km)).clamp(0.0, 1.0);

        Some(PathSample {
            position: LatLng::new(
                lerp(from.position.lat, to.position.lat, frac),
                lerp(from.position.lng, to.position.lng, frac),
            ),
            bearing: bearing(&from.position, &to.position),
            lap: to.lap,
        })
    }

    /// Sample the path at time fraction `t` in [0, 1].
    pub fn sample(&self, t: f64) -> Option<PathSample> {
        self.locate(self.distance_at(t))
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

// ============================================================================
// Materialization
// ============================================================================

/// Materialize the race path for `laps` laps with default pacing weights.
///
/// Empty when the course has fewer than 2 buoys or the path has no length.
///
/// # Example
/// ```
/// use swim_course::{materialize_path, CourseElement, ElementType};
///
/// let elements = vec![
///     CourseElement::new("s", ElementType::Start, 47.0000, 8.0000, 0),
///     CourseElement::new("b1", ElementType::Buoy, 47.0010, 8.0000, 1),
///     CourseElement::new("b2", ElementType::Buoy, 47.0010, 8.0010, 2),
///     CourseElement::new("f", ElementType::FinishEndpoint, 46.9995, 8.0005, 3),
/// ];
/// let path = materialize_path(&elements, 2);
/// // start, lap 1 (b1 b2 b1), lap 2 (b1 b2), finish
/// assert_eq!(path.points.len(), 7);
/// assert!(path.total_km > 0.0);
/// ```
pub fn materialize_path(elements: &[CourseElement], laps: u32) -> CoursePath {
    materialize_path_with_config(elements, laps, &FlyoverConfig::default())
}

/// [`materialize_path`] with explicit pacing weights.
pub fn materialize_path_with_config(
    elements: &[CourseElement],
    laps: u32,
    config: &FlyoverConfig,
) -> CoursePath {
    let parts = extract_route_parts(elements);
    if parts.buoys.len() < 2 {
        debug!("[Flyover] {} buoys, nothing to fly over", parts.buoys.len());
        return CoursePath::default();
    }

    let laps = laps.max(1);
    let finish = finish_point(&parts).map(|f| f.position());

    let mut points: Vec<PathPoint> = Vec::new();
    // (kind, first_index, last_index)
    let mut spans: Vec<(SegmentKind, usize, usize)> = Vec::new();
    // Last vertex of the previous segment
    let mut cursor: Option<usize> = None;

    if let Some(start) = &parts.start {
        points.push(PathPoint {
            position: start.position(),
            lap: 0,
        });
        cursor = Some(0);
    }

    for lap in 1..=laps {
        let lap_buoys = buoys_for_lap(&parts.buoys, lap);
        let first_new = points.len();

        for buoy in &lap_buoys {
            points.push(PathPoint {
                position: buoy.position(),
                lap,
            });
        }

        if lap == 1 && parts.start.is_some() && !lap_buoys.is_empty() {
            spans.push((SegmentKind::Entry, 0, first_new));
            cursor = Some(first_new);
        }

        let closes_loop = !(lap == laps && finish.is_some());
        if closes_loop {
            if let Some(first) = lap_buoys.first() {
                points.push(PathPoint {
                    position: first.position(),
                    lap,
                });
            }
        }

        let Some(last) = points.len().checked_sub(1) else {
            continue;
        };
        let first = cursor.unwrap_or(first_new).min(last);
        spans.push((SegmentKind::Lap(lap), first, last));
        cursor = Some(last);
    }

    if let (Some(finish), Some(from)) = (finish, cursor) {
        points.push(PathPoint {
            position: finish,
            lap: laps,
        });
        spans.push((SegmentKind::Exit, from, points.len() - 1));
    }

    let mut cumulative_km = Vec::with_capacity(points.len());
    let mut running = 0.0;
    for (i, point) in points.iter().enumerate() {
        if i > 0 {
            running += haversine_distance_km(&points[i - 1].position, &point.position);
        }
        cumulative_km.push(running);
    }
    let total_km = running;

    if points.len() < 2 || total_km <= 0.0 {
        debug!("[Flyover] Degenerate path ({} points, {:.3}km)", points.len(), total_km);
        return CoursePath::default();
    }

    let segments: Vec<PathSegment> = spans
        .into_iter()
        .map(|(kind, first_index, last_index)| PathSegment {
            kind,
            first_index,
            last_index,
            start_km: cumulative_km[first_index],
            distance_km: cumulative_km[last_index] - cumulative_km[first_index],
            weight: segment_weight(kind, laps, config),
        })
        .collect();

    debug!(
        "[Flyover] Materialized {} points, {} segments, {:.3}km over {} laps",
        points.len(),
        segments.len(),
        total_km,
        laps
    );

    CoursePath {
        points,
        cumulative_km,
        segments,
        total_km,
    }
}

fn segment_weight(kind: SegmentKind, laps: u32, config: &FlyoverConfig) -> f64 {
    match kind {
        SegmentKind::Entry | SegmentKind::Exit => config.edge_lap_weight,
        SegmentKind::Lap(lap) if lap == 1 || lap == laps => config.edge_lap_weight,
        SegmentKind::Lap(_) => config.middle_lap_weight,
    }
}

// ============================================================================
// Camera frames
// ============================================================================

/// One chase-camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraFrame {
    /// Camera position, behind the swimmer
    pub center: LatLng,
    /// Smoothed heading in degrees
    pub heading: f64,
    pub tilt: f64,
    pub zoom: f64,
    pub swimmer_pos: LatLng,
}

/// Samples for `frame_count` evenly spaced frames, `t = f / frame_count`.
pub fn frame_samples(path: &CoursePath, frame_count: usize) -> Vec<PathSample> {
    if path.is_empty() || frame_count == 0 {
        return Vec::new();
    }
    (0..frame_count)
        .filter_map(|f| path.sample(f as f64 / frame_count as f64))
        .collect()
}

/// Exponential moving average over headings along the shortest arc.
pub fn smooth_headings(raw: &[f64], alpha: f64) -> Vec<f64> {
    let mut smoothed: Vec<f64> = Vec::with_capacity(raw.len());
    for &heading in raw {
        let next = match smoothed.last() {
            Some(&prev) => lerp_angle(prev, heading, alpha),
            None => heading,
        };
        smoothed.push(next);
    }
    smoothed
}

/// Build the chase-camera frame sequence for a materialized path.
pub fn build_camera_frames(path: &CoursePath, config: &FlyoverConfig) -> Vec<CameraFrame> {
    let samples = frame_samples(path, config.frame_count());
    if samples.is_empty() {
        return Vec::new();
    }

    let raw: Vec<f64> = samples.iter().map(|s| s.bearing).collect();
    let headings = smooth_headings(&raw, config.heading_smoothing);

    let frames: Vec<CameraFrame> = samples
        .iter()
        .zip(headings)
        .map(|(sample, heading)| CameraFrame {
            center: offset_along_bearing(
                &sample.position,
                (heading + 180.0) % 360.0,
                config.chase_distance_m,
            ),
            heading,
            tilt: config.tilt,
            zoom: config.zoom,
            swimmer_pos: sample.position,
        })
        .collect();

    debug!("[Flyover] Built {} camera frames", frames.len());
    frames
}
