//! Typed element metadata.
//!
//! Course documents carry `metadata` as an opaque JSON string whose shape
//! depends on the element type:
//!
//! | Type | Shape |
//! |---|---|
//! | `buoy` | `{"side": "left"\|"right", "mandatoryLaps": "1,3"}` |
//! | `gate_left`, `gate_right` | `{"mandatoryLaps": "2"}` |
//! | `finish_funnel_*` | `{"side": "left"\|"right"}` |
//! | `rescue_zone` | `[{"lat": .., "lng": ..}, ...]` (closed polygon) |
//! | `freehand` | `{"path": [LatLng], "label"?: string, "color": string}` |
//!
//! Parsing never fails. Malformed or missing data degrades to the permissive
//! default: a directional buoy, active on every lap, with no polygon.

use geo::{Contains, LineString, Polygon};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CourseElement, ElementType, LatLng};

/// Default freehand stroke color.
pub const DEFAULT_FREEHAND_COLOR: &str = "#FFFFFF";

/// A side of the swimmer or of a bearing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    fn from_value(value: Option<&Value>) -> Option<Side> {
        match value.and_then(Value::as_str) {
            Some("left") => Some(Side::Left),
            Some("right") => Some(Side::Right),
            _ => None,
        }
    }
}

/// Which side a buoy must be passed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuoySide {
    Left,
    Right,
    /// Either side; rendered without a rounding arc
    Directional,
}

impl BuoySide {
    /// The forced side, if any.
    pub fn side(&self) -> Option<Side> {
        match self {
            BuoySide::Left => Some(Side::Left),
            BuoySide::Right => Some(Side::Right),
            BuoySide::Directional => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuoySide::Left => "left",
            BuoySide::Right => "right",
            BuoySide::Directional => "directional",
        }
    }
}

impl From<Side> for BuoySide {
    fn from(side: Side) -> Self {
        match side {
            Side::Left => BuoySide::Left,
            Side::Right => BuoySide::Right,
        }
    }
}

/// Laps on which a buoy or gate is part of the route.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LapRestriction {
    #[default]
    Every,
    Only(Vec<u32>),
}

impl LapRestriction {
    /// Parse a comma-separated lap list such as `"1, 3"`.
    ///
    /// Fragments are read as numbers; whole values of at least 1 (`"2"`,
    /// `"2.0"`) are kept and everything else is dropped. An empty or blank
    /// string means no restriction.
    pub fn parse(list: &str) -> Self {
        if list.trim().is_empty() {
            return LapRestriction::Every;
        }
        let laps = list.split(',').filter_map(|part| lap_number(part.trim())).collect();
        LapRestriction::Only(laps)
    }

    /// Whether the element is active on `lap` (1-based).
    pub fn includes(&self, lap: u32) -> bool {
        match self {
            LapRestriction::Every => true,
            LapRestriction::Only(laps) => laps.contains(&lap),
        }
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, LapRestriction::Only(_))
    }

    fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::String(s)) => LapRestriction::parse(s),
            // Zero is "unset", same as a missing key
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => LapRestriction::Every,
            Some(Value::Number(n)) => LapRestriction::parse(&n.to_string()),
            _ => LapRestriction::Every,
        }
    }
}

fn lap_number(fragment: &str) -> Option<u32> {
    let value = fragment.parse::<f64>().ok()?;
    if value.fract() == 0.0 && value >= 1.0 && value <= f64::from(u32::MAX) {
        Some(value as u32)
    } else {
        None
    }
}

impl Serialize for LapRestriction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LapRestriction::Every => serializer.serialize_none(),
            LapRestriction::Only(laps) => serializer.collect_seq(laps),
        }
    }
}

/// A label-only annotation polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Freehand {
    pub path: Vec<LatLng>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub color: String,
}

impl Default for Freehand {
    fn default() -> Self {
        Self {
            path: Vec::new(),
            label: None,
            color: DEFAULT_FREEHAND_COLOR.to_string(),
        }
    }
}

/// Metadata parsed according to the element's type.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementMeta {
    Buoy { side: BuoySide, laps: LapRestriction },
    Gate { laps: LapRestriction },
    /// Finish funnel post; `side` is the swimmer's side as they approach
    FunnelPost { side: Option<Side> },
    RescueZone { vertices: Vec<LatLng> },
    Freehand(Freehand),
    None,
}

impl ElementMeta {
    /// Parse raw metadata for an element of type `element_type`.
    pub fn parse(element_type: ElementType, raw: Option<&str>) -> Self {
        match element_type {
            ElementType::Buoy => {
                let obj = parse_object(raw);
                ElementMeta::Buoy {
                    side: side_of(obj.as_ref()),
                    laps: laps_of(obj.as_ref()),
                }
            }
            ElementType::GateLeft | ElementType::GateRight => ElementMeta::Gate {
                laps: laps_of(parse_object(raw).as_ref()),
            },
            ElementType::FinishFunnelLeft | ElementType::FinishFunnelRight => {
                ElementMeta::FunnelPost {
                    side: Side::from_value(parse_object(raw).as_ref().and_then(|m| m.get("side"))),
                }
            }
            ElementType::RescueZone => ElementMeta::RescueZone {
                vertices: parse_vertices(raw),
            },
            ElementType::Freehand => ElementMeta::Freehand(parse_freehand(raw)),
            _ => ElementMeta::None,
        }
    }

    /// Lap restriction of buoys and gates; every other type is unrestricted.
    pub fn laps(&self) -> &LapRestriction {
        const EVERY: &LapRestriction = &LapRestriction::Every;
        match self {
            ElementMeta::Buoy { laps, .. } | ElementMeta::Gate { laps } => laps,
            _ => EVERY,
        }
    }

    pub fn buoy_side(&self) -> BuoySide {
        match self {
            ElementMeta::Buoy { side, .. } => *side,
            _ => BuoySide::Directional,
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

fn parse_json(raw: Option<&str>) -> Option<Value> {
    let raw = raw?;
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("[Metadata] Ignoring unparseable metadata {:?}: {}", raw, e);
            None
        }
    }
}

fn parse_object(raw: Option<&str>) -> Option<Map<String, Value>> {
    match parse_json(raw)? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn side_of(obj: Option<&Map<String, Value>>) -> BuoySide {
    Side::from_value(obj.and_then(|m| m.get("side")))
        .map(BuoySide::from)
        .unwrap_or(BuoySide::Directional)
}

fn laps_of(obj: Option<&Map<String, Value>>) -> LapRestriction {
    LapRestriction::from_value(obj.and_then(|m| m.get("mandatoryLaps")))
}

fn points_from_value(value: &Value) -> Vec<LatLng> {
    serde_json::from_value::<Vec<LatLng>>(value.clone()).unwrap_or_default()
}

/// Buoy side from raw metadata; anything unparseable is directional.
pub fn buoy_side(raw: Option<&str>) -> BuoySide {
    side_of(parse_object(raw).as_ref())
}

/// Lap restriction from raw buoy/gate metadata.
pub fn mandatory_laps(raw: Option<&str>) -> LapRestriction {
    laps_of(parse_object(raw).as_ref())
}

/// Rescue-zone vertex list. Returns an empty list when malformed.
pub fn parse_vertices(raw: Option<&str>) -> Vec<LatLng> {
    parse_json(raw)
        .map(|value| points_from_value(&value))
        .unwrap_or_default()
}

/// Freehand annotation, accepting the object form or a bare point array.
pub fn parse_freehand(raw: Option<&str>) -> Freehand {
    match parse_json(raw) {
        Some(Value::Object(map)) => match map.get("path") {
            Some(path @ Value::Array(_)) => Freehand {
                path: points_from_value(path),
                label: map
                    .get("label")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                color: map
                    .get("color")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(DEFAULT_FREEHAND_COLOR)
                    .to_string(),
            },
            _ => Freehand::default(),
        },
        Some(value @ Value::Array(_)) => Freehand {
            path: points_from_value(&value),
            ..Freehand::default()
        },
        _ => Freehand::default(),
    }
}

// ============================================================================
// Rescue zones
// ============================================================================

/// Closed polygon for a rescue zone; `None` with fewer than 3 vertices.
pub fn rescue_zone_polygon(raw: Option<&str>) -> Option<Polygon<f64>> {
    let vertices = parse_vertices(raw);
    if vertices.len() < 3 {
        return None;
    }
    let exterior: LineString<f64> = vertices.into_iter().map(geo::Coord::from).collect();
    // Polygon::new closes the ring
    Some(Polygon::new(exterior, vec![]))
}

/// Whether `point` lies inside a rescue zone element.
pub fn rescue_zone_contains(element: &CourseElement, point: &LatLng) -> bool {
    if element.element_type != ElementType::RescueZone {
        return false;
    }
    rescue_zone_polygon(element.metadata.as_deref())
        .map(|polygon| polygon.contains(&geo::Point::from(*point)))
        .unwrap_or(false)
}

// ============================================================================
// Editing
// ============================================================================

fn existing_object(raw: Option<&str>) -> Map<String, Value> {
    parse_object(raw).unwrap_or_default()
}

/// Set the buoy side, keeping every other metadata key.
pub fn set_buoy_side(raw: Option<&str>, side: BuoySide) -> String {
    let mut obj = existing_object(raw);
    obj.insert("side".to_string(), Value::String(side.as_str().to_string()));
    Value::Object(obj).to_string()
}

/// Set or clear `mandatoryLaps`, keeping every other metadata key.
///
/// Clearing the last remaining key yields `None`.
pub fn set_mandatory_laps(raw: Option<&str>, laps: Option<&str>) -> Option<String> {
    let mut obj = existing_object(raw);
    match laps.map(str::trim).filter(|s| !s.is_empty()) {
        Some(list) => {
            obj.insert("mandatoryLaps".to_string(), Value::String(list.to_string()));
        }
        None => {
            obj.remove("mandatoryLaps");
        }
    }
    if obj.is_empty() {
        None
    } else {
        Some(Value::Object(obj).to_string())
    }
}

/// Metadata for a finish funnel post.
pub fn funnel_post_metadata(side: Side) -> String {
    serde_json::json!({ "side": side.as_str() }).to_string()
}
