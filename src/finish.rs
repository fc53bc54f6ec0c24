//! Finish-group synthesis.
//!
//! A finish is three elements built from a single click: the endpoint where
//! swimmers touch out, and two funnel posts set perpendicular to the approach
//! from the last buoy. The posts record the swimmer's side as they approach,
//! which is the opposite of their geometric offset: the post offset to the
//! left of the bearing carries `{"side":"right"}` and vice versa.

use serde::{Deserialize, Serialize};

use crate::geo_utils::{bearing, offset_perpendicular};
use crate::metadata::{funnel_post_metadata, Side};
use crate::route_parts::Mark;
use crate::{new_element_id, CourseElement, ElementType, LatLng};

/// Finish funnel geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinishConfig {
    /// Perpendicular distance from the endpoint to each funnel post
    pub funnel_offset_m: f64,
}

impl Default for FinishConfig {
    fn default() -> Self {
        Self {
            funnel_offset_m: 10.0,
        }
    }
}

/// Bearing from the last buoy to `click`, or due north without buoys.
pub fn approach_bearing(click: &LatLng, buoys: &[Mark]) -> f64 {
    buoys
        .last()
        .map(|last| bearing(&last.position(), click))
        .unwrap_or(0.0)
}

/// Build `[endpoint, funnel_left, funnel_right]` around `click`.
///
/// The new elements get fresh ids and the orders `first_order`,
/// `first_order + 1`, `first_order + 2`. Removing any previous finish group
/// is the caller's job (see [`remove_finish_group`]).
///
/// # Example
/// ```
/// use swim_course::{build_finish_group, FinishConfig, LatLng};
///
/// let click = LatLng::new(47.0, 8.0);
/// let [endpoint, left, right] = build_finish_group(click, &[], 3, &FinishConfig::default());
/// assert_eq!(endpoint.order, 3);
/// assert_eq!(left.metadata.as_deref(), Some(r#"{"side":"right"}"#));
/// assert!(right.lng > endpoint.lng);
/// ```
pub fn build_finish_group(
    click: LatLng,
    buoys: &[Mark],
    first_order: u32,
    config: &FinishConfig,
) -> [CourseElement; 3] {
    let heading = approach_bearing(&click, buoys);
    let left = offset_perpendicular(&click, heading, config.funnel_offset_m, Side::Left);
    let right = offset_perpendicular(&click, heading, config.funnel_offset_m, Side::Right);

    [
        CourseElement::new(
            new_element_id(),
            ElementType::FinishEndpoint,
            click.lat,
            click.lng,
            first_order,
        ),
        CourseElement::new(
            new_element_id(),
            ElementType::FinishFunnelLeft,
            left.lat,
            left.lng,
            first_order + 1,
        )
        .with_metadata(funnel_post_metadata(Side::Right)),
        CourseElement::new(
            new_element_id(),
            ElementType::FinishFunnelRight,
            right.lat,
            right.lng,
            first_order + 2,
        )
        .with_metadata(funnel_post_metadata(Side::Left)),
    ]
}

/// Drop every finish-typed element, current or legacy.
pub fn remove_finish_group(elements: &[CourseElement]) -> Vec<CourseElement> {
    elements
        .iter()
        .filter(|el| !el.element_type.is_finish())
        .cloned()
        .collect()
}
