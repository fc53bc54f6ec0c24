//! # Swim Course
//!
//! Route geometry for open-water swim courses designed on a map.
//!
//! This library provides:
//! - Route-part extraction from a flat bag of placed course elements
//! - Loop, entry, exit and lap-aware race distances
//! - Finish-group synthesis (endpoint plus two funnel posts)
//! - Per-lap path materialization and camera frames for flyover videos
//! - An editing session with bounded undo history
//! - GPX/KML/CSV route export and shareable course links
//!
//! ## Quick Start
//!
//! ```rust
//! use swim_course::{CourseSession, ElementType, LatLng};
//!
//! let mut session = CourseSession::new();
//! session.add_element(ElementType::Buoy, LatLng::new(47.3700, 8.5400), None, None).unwrap();
//! session.add_element(ElementType::Buoy, LatLng::new(47.3710, 8.5400), None, None).unwrap();
//! session.add_element(ElementType::Buoy, LatLng::new(47.3710, 8.5415), None, None).unwrap();
//! session.add_finish_group(LatLng::new(47.3695, 8.5405)).unwrap();
//!
//! let distances = session.distances();
//! assert!(distances.loop_km > 0.0);
//! assert!(distances.exit_km > 0.0);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{CourseError, OptionExt, Result};

// Geodesy primitives (distance, bearing, offsets)
pub mod geo_utils;

// Typed views of the opaque metadata strings
pub mod metadata;
pub use metadata::{BuoySide, ElementMeta, Freehand, LapRestriction, Side};

// Route role classification
pub mod route_parts;
pub use route_parts::{extract_route_parts, finish_point, FinishPoint, Mark, RouteParts};

// Loop/entry/exit distances and lap-aware totals
pub mod distance;
pub use distance::{
    buoys_for_lap, compute_distances, differing_laps, race_total, CourseDistances, DifferingLap,
    RaceTotal,
};

// Finish structure synthesis
pub mod finish;
pub use finish::{build_finish_group, FinishConfig};

// Finish-last ordering invariant
pub mod ordering;
pub use ordering::{enforce_finish_last, normalize_order};

// Per-lap path materialization and camera frames
pub mod flyover;
pub use flyover::{
    build_camera_frames, materialize_path, CameraFrame, CoursePath, FlyoverConfig, PathSample,
};

// Bounded undo history
pub mod undo;
pub use undo::UndoHistory;

// Editing session (explicit state object)
pub mod session;
pub use session::{CourseSession, SessionConfig};

// Route serializers
pub mod export;
pub use export::{build_csv, build_gpx, build_kml};

// Share-link encoding
pub mod share;
pub use share::{decode_course, encode_course};

// Algorithm toolbox - flat access to the pure functions
pub mod algorithms;

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate in signed degrees.
///
/// # Example
/// ```
/// use swim_course::LatLng;
/// let point = LatLng::new(47.3769, 8.5417); // Lake Zurich
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Create a new coordinate.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat >= -90.0
            && self.lat <= 90.0
            && self.lng >= -180.0
            && self.lng <= 180.0
    }

    /// Midpoint in coordinate space (adequate at course scale).
    pub fn midpoint(&self, other: &LatLng) -> LatLng {
        LatLng::new((self.lat + other.lat) / 2.0, (self.lng + other.lng) / 2.0)
    }
}

impl From<LatLng> for geo::Point<f64> {
    fn from(p: LatLng) -> Self {
        geo::Point::new(p.lng, p.lat)
    }
}

impl From<LatLng> for geo::Coord<f64> {
    fn from(p: LatLng) -> Self {
        geo::Coord { x: p.lng, y: p.lat }
    }
}

impl From<geo::Coord<f64>> for LatLng {
    fn from(c: geo::Coord<f64>) -> Self {
        LatLng::new(c.y, c.x)
    }
}

/// Fresh element identifier, unique within any course.
pub fn new_element_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Bounding box of a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from points. Returns `None` for an empty slice.
    pub fn from_points(points: &[LatLng]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.lat);
            max_lat = max_lat.max(p.lat);
            min_lng = min_lng.min(p.lng);
            max_lng = max_lng.max(p.lng);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// The closed set of things that can be placed on a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Buoy,
    Start,
    ShoreEntry,
    GateLeft,
    GateRight,
    FinishEndpoint,
    FinishFunnelLeft,
    FinishFunnelRight,
    /// Legacy 2-point finish channel, left post
    FinishLeft,
    /// Legacy 2-point finish channel, right post
    FinishRight,
    /// Legacy single-point finish
    Finish,
    RescueZone,
    FeedingPlatform,
    /// Label-only annotation polyline, never part of the swim route
    Freehand,
}

/// Every element type that belongs to a finish group, current or legacy.
pub const FINISH_TYPES: [ElementType; 6] = [
    ElementType::Finish,
    ElementType::FinishLeft,
    ElementType::FinishRight,
    ElementType::FinishEndpoint,
    ElementType::FinishFunnelLeft,
    ElementType::FinishFunnelRight,
];

impl ElementType {
    /// Wire name, as stored in course documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Buoy => "buoy",
            ElementType::Start => "start",
            ElementType::ShoreEntry => "shore_entry",
            ElementType::GateLeft => "gate_left",
            ElementType::GateRight => "gate_right",
            ElementType::FinishEndpoint => "finish_endpoint",
            ElementType::FinishFunnelLeft => "finish_funnel_left",
            ElementType::FinishFunnelRight => "finish_funnel_right",
            ElementType::FinishLeft => "finish_left",
            ElementType::FinishRight => "finish_right",
            ElementType::Finish => "finish",
            ElementType::RescueZone => "rescue_zone",
            ElementType::FeedingPlatform => "feeding_platform",
            ElementType::Freehand => "freehand",
        }
    }

    /// Whether this type is part of the finish group.
    pub fn is_finish(&self) -> bool {
        FINISH_TYPES.contains(self)
    }

    /// Whether this type is a gate post.
    pub fn is_gate(&self) -> bool {
        matches!(self, ElementType::GateLeft | ElementType::GateRight)
    }

    /// Map annotations that never take a route role.
    pub fn is_annotation(&self) -> bool {
        matches!(self, ElementType::RescueZone | ElementType::FeedingPlatform)
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A placed item on the course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseElement {
    /// Stable identifier, unique within a course
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub lat: f64,
    pub lng: f64,
    /// Route sequence position
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Serialized metadata object, see [`metadata`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl CourseElement {
    /// Create an element without label or metadata.
    pub fn new(
        id: impl Into<String>,
        element_type: ElementType,
        lat: f64,
        lng: f64,
        order: u32,
    ) -> Self {
        Self {
            id: id.into(),
            element_type,
            lat,
            lng,
            order,
            label: None,
            metadata: None,
        }
    }

    /// Builder-style metadata setter.
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Builder-style label setter.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    /// Parse this element's metadata according to its type.
    pub fn meta(&self) -> ElementMeta {
        ElementMeta::parse(self.element_type, self.metadata.as_deref())
    }

    /// Display label: explicit label, else the type name with spaces.
    pub fn display_label(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self.element_type.as_str().replace('_', " "),
        }
    }
}

/// A course document: the element collection plus race settings and cached distances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default = "default_course_name")]
    pub name: String,
    #[serde(default)]
    pub lake_label: Option<String>,
    /// "lat,lng" of the lake the course was designed on
    #[serde(default)]
    pub lake_lat_lng: Option<String>,
    #[serde(default = "default_zoom_level")]
    pub zoom_level: u32,
    /// One-lap buoy loop distance
    #[serde(default)]
    pub distance_km: Option<f64>,
    /// Shore entry to start distance
    #[serde(default)]
    pub entry_dist_km: Option<f64>,
    /// Last buoy to finish distance
    #[serde(default)]
    pub exit_dist_km: Option<f64>,
    /// Extra distance on lap 1 from routing through the start
    #[serde(default)]
    pub first_lap_extra_km: Option<f64>,
    #[serde(default)]
    pub elements: Vec<CourseElement>,
    #[serde(default = "default_laps")]
    pub laps: u32,
    #[serde(default)]
    pub race_label: Option<String>,
    /// Encoded logo image; size limits belong to the persistence layer
    #[serde(default)]
    pub race_logo: Option<String>,
}

fn default_course_name() -> String {
    "Untitled Course".to_string()
}

fn default_zoom_level() -> u32 {
    14
}

fn default_laps() -> u32 {
    1
}

impl Default for CourseData {
    fn default() -> Self {
        Self {
            id: None,
            name: default_course_name(),
            lake_label: None,
            lake_lat_lng: None,
            zoom_level: default_zoom_level(),
            distance_km: None,
            entry_dist_km: None,
            exit_dist_km: None,
            first_lap_extra_km: None,
            elements: Vec::new(),
            laps: default_laps(),
            race_label: None,
            race_logo: None,
        }
    }
}

impl CourseData {
    /// Parse a course document from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the course document to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Elements in route order, excluding rescue zones and freehand annotations.
    pub fn route_elements(&self) -> Vec<&CourseElement> {
        let mut route: Vec<&CourseElement> = self
            .elements
            .iter()
            .filter(|el| {
                !matches!(
                    el.element_type,
                    ElementType::RescueZone | ElementType::Freehand
                )
            })
            .collect();
        route.sort_by_key(|el| el.order);
        route
    }

    /// Bounds of every placed element.
    pub fn bounds(&self) -> Option<Bounds> {
        let points: Vec<LatLng> = self.elements.iter().map(|el| el.position()).collect();
        Bounds::from_points(&points)
    }
}

// ============================================================================
// Tests
// ============================================================================
