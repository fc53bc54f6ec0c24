//! Finish-last ordering.
//!
//! Route extraction and the exporters visit elements by `order`. Finish
//! elements must therefore always sort after everything else, however and
//! whenever they were added. After any insert, delete or reorder the
//! collection is partitioned (non-finish first, finish last, each partition
//! keeping its relative order) and `order` is renumbered densely from 0.

use crate::CourseElement;

/// Move finish elements to the end, keeping sequence order within each
/// partition, and renumber `order` from 0.
///
/// Use this after an explicit reorder, where the sequence position is the
/// intended order.
pub fn enforce_finish_last(elements: Vec<CourseElement>) -> Vec<CourseElement> {
    let (route, finish): (Vec<CourseElement>, Vec<CourseElement>) = elements
        .into_iter()
        .partition(|el| !el.element_type.is_finish());

    route
        .into_iter()
        .chain(finish)
        .enumerate()
        .map(|(i, mut el)| {
            el.order = i as u32;
            el
        })
        .collect()
}

/// Sort by the existing `order` (stable), then apply [`enforce_finish_last`].
///
/// Use this after inserts and deletes, where `order` is authoritative.
///
/// # Example
/// ```
/// use swim_course::{normalize_order, CourseElement, ElementType};
///
/// let normalized = normalize_order(vec![
///     CourseElement::new("fin", ElementType::FinishEndpoint, 0.0, 0.0, 1),
///     CourseElement::new("b2", ElementType::Buoy, 0.0, 0.0, 5),
///     CourseElement::new("b1", ElementType::Buoy, 0.0, 0.0, 0),
/// ]);
/// let ids: Vec<&str> = normalized.iter().map(|e| e.id.as_str()).collect();
/// assert_eq!(ids, vec!["b1", "b2", "fin"]);
/// assert_eq!(normalized[2].order, 2);
/// ```
pub fn normalize_order(mut elements: Vec<CourseElement>) -> Vec<CourseElement> {
    elements.sort_by_key(|el| el.order);
    enforce_finish_last(elements)
}

/// Whether every finish element sorts after every other element.
pub fn finish_is_last(elements: &[CourseElement]) -> bool {
    let max_route = elements
        .iter()
        .filter(|el| !el.element_type.is_finish())
        .map(|el| el.order)
        .max();
    let min_finish = elements
        .iter()
        .filter(|el| el.element_type.is_finish())
        .map(|el| el.order)
        .min();
    match (max_route, min_finish) {
        (Some(route), Some(finish)) => finish > route,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ElementType;
    use proptest::prelude::*;

    fn el(id: &str, t: ElementType, order: u32) -> CourseElement {
        CourseElement::new(id, t, 0.0, 0.0, order)
    }

    fn ids(elements: &[CourseElement]) -> Vec<&str> {
        elements.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_enforce_keeps_sequence_within_partitions() {
        let reordered = enforce_finish_last(vec![
            el("b2", ElementType::Buoy, 9),
            el("fl", ElementType::FinishFunnelLeft, 0),
            el("b1", ElementType::Buoy, 3),
            el("fe", ElementType::FinishEndpoint, 1),
            el("s", ElementType::Start, 2),
        ]);
        assert_eq!(ids(&reordered), vec!["b2", "b1", "s", "fl", "fe"]);
        let orders: Vec<u32> = reordered.iter().map(|e| e.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_normalize_sorts_by_order_first() {
        let normalized = normalize_order(vec![
            el("fe", ElementType::FinishEndpoint, 0),
            el("b2", ElementType::Buoy, 7),
            el("b1", ElementType::Buoy, 2),
        ]);
        assert_eq!(ids(&normalized), vec!["b1", "b2", "fe"]);
        assert!(finish_is_last(&normalized));
    }

    #[test]
    fn test_empty_and_finish_only() {
        assert!(normalize_order(vec![]).is_empty());
        let only = normalize_order(vec![el("f", ElementType::Finish, 4)]);
        assert_eq!(only[0].order, 0);
        assert!(finish_is_last(&only));
    }

    #[test]
    fn test_finish_is_last_detects_violation() {
        let bad = vec![el("f", ElementType::Finish, 0), el("b", ElementType::Buoy, 1)];
        assert!(!finish_is_last(&bad));
    }

    fn element_type_strategy() -> impl Strategy<Value = ElementType> {
        prop_oneof![
            Just(ElementType::Buoy),
            Just(ElementType::Start),
            Just(ElementType::GateLeft),
            Just(ElementType::RescueZone),
            Just(ElementType::FinishEndpoint),
            Just(ElementType::FinishFunnelLeft),
            Just(ElementType::Finish),
        ]
    }

    proptest! {
        #[test]
        fn prop_normalize_puts_finish_last(
            specs in prop::collection::vec((element_type_strategy(), 0u32..50), 0..20)
        ) {
            let elements: Vec<CourseElement> = specs
                .iter()
                .enumerate()
                .map(|(i, (t, order))| el(&format!("e{}", i), *t, *order))
                .collect();
            let normalized = normalize_order(elements);
            prop_assert!(finish_is_last(&normalized));
            for (i, e) in normalized.iter().enumerate() {
                prop_assert_eq!(e.order, i as u32);
            }
        }
    }
}
