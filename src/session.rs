//! # Course Session
//!
//! Stateful editor for a single course document.
//!
//! The session owns the [`CourseData`] being edited plus a bounded undo
//! history. Every element mutation follows the same cycle:
//!
//! 1. push a snapshot of the current elements onto the undo history
//! 2. build the new element collection and restore the finish-last order
//! 3. recompute the cached distances on the document
//! 4. mark the session dirty
//!
//! Race settings (laps, label, logo) are not part of the undo history,
//! matching what the editor's undo button restores.
//!
//! ## Usage
//!
//! ```rust
//! use swim_course::{CourseSession, ElementType, LatLng};
//!
//! let mut session = CourseSession::new();
//! let b1 = session.add_element(ElementType::Buoy, LatLng::new(47.0, 8.0), None, None).unwrap();
//! session.add_element(ElementType::Buoy, LatLng::new(47.001, 8.0), None, None).unwrap();
//! assert!(session.distances().loop_km > 0.0);
//!
//! session.remove_element(&b1).unwrap();
//! session.undo();
//! assert_eq!(session.course().elements.len(), 2);
//! ```

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::distance::{
    distances_for_parts, differing_laps_for_parts, race_total_for_parts, CourseDistances,
    DifferingLap, RaceTotal,
};
use crate::error::{CourseError, OptionExt, Result};
use crate::finish::{build_finish_group, remove_finish_group, FinishConfig};
use crate::flyover::{
    build_camera_frames, materialize_path_with_config, CameraFrame, CoursePath, FlyoverConfig,
};
use crate::ordering::{enforce_finish_last, normalize_order};
use crate::route_parts::extract_route_parts;
use crate::undo::UndoHistory;
use crate::{new_element_id, CourseData, CourseElement, ElementType, LatLng};

/// Session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of undo snapshots kept
    pub undo_depth: usize,
    pub finish: FinishConfig,
    pub flyover: FlyoverConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            undo_depth: 50,
            finish: FinishConfig::default(),
            flyover: FlyoverConfig::default(),
        }
    }
}

/// The course editing session.
///
/// Single-threaded and synchronous: every operation completes before it
/// returns, so undo can never interleave with a pending mutation.
#[derive(Debug, Clone)]
pub struct CourseSession {
    course: CourseData,
    undo: UndoHistory,
    dirty: bool,
    config: SessionConfig,
}

impl CourseSession {
    /// Create a session over an empty course with default configuration.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Create a session over an empty course with custom configuration.
    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            course: CourseData::default(),
            undo: UndoHistory::new(config.undo_depth),
            dirty: false,
            config,
        }
    }

    /// Replace the course with a loaded document.
    ///
    /// Clears the undo history and the dirty flag. Elements are renormalized
    /// so documents saved before the finish-last rule still route correctly.
    pub fn load(&mut self, mut course: CourseData) {
        course.elements = normalize_order(course.elements);
        self.course = course;
        self.undo.clear();
        self.dirty = false;
        self.recompute_distances();
        info!(
            "[CourseSession] Loaded '{}' with {} elements, {} laps",
            self.course.name,
            self.course.elements.len(),
            self.course.laps
        );
    }

    /// Load a course document from JSON.
    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let course = CourseData::from_json(json)?;
        self.load(course);
        Ok(())
    }

    /// Discard everything and start an empty course.
    pub fn reset(&mut self) {
        self.course = CourseData::default();
        self.undo.clear();
        self.dirty = false;
        info!("[CourseSession] Reset");
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn course(&self) -> &CourseData {
        &self.course
    }

    /// Take the course document out of the session.
    pub fn into_course(self) -> CourseData {
        self.course
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn element(&self, id: &str) -> Option<&CourseElement> {
        self.course.elements.iter().find(|el| el.id == id)
    }

    /// Cached distances as last recomputed.
    pub fn distances(&self) -> CourseDistances {
        CourseDistances {
            loop_km: self.course.distance_km.unwrap_or(0.0),
            entry_km: self.course.entry_dist_km.unwrap_or(0.0),
            exit_km: self.course.exit_dist_km.unwrap_or(0.0),
            first_lap_extra_km: self.course.first_lap_extra_km.unwrap_or(0.0),
        }
    }

    /// Whether there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record that the current state has been persisted.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    // ========================================================================
    // Element Mutations
    // ========================================================================

    /// Place a new element after every existing one and return its id.
    ///
    /// Finish-typed elements still end up last; other types are inserted
    /// ahead of any finish group.
    pub fn add_element(
        &mut self,
        element_type: ElementType,
        position: LatLng,
        label: Option<String>,
        metadata: Option<String>,
    ) -> Result<String> {
        let id = new_element_id();
        validate_position(&id, &position)?;

        let element = CourseElement {
            id: id.clone(),
            element_type,
            lat: position.lat,
            lng: position.lng,
            order: self.next_order(),
            label,
            metadata,
        };

        self.mutate_elements(|elements| {
            let mut elements = elements.to_vec();
            elements.push(element);
            normalize_order(elements)
        });
        debug!("[CourseSession] Added {} '{}'", element_type, id);
        Ok(id)
    }

    /// Build a finish group at `click` and return the ids of
    /// `[endpoint, funnel_left, funnel_right]`.
    ///
    /// Any existing finish elements, current or legacy, are replaced.
    pub fn add_finish_group(&mut self, click: LatLng) -> Result<Vec<String>> {
        validate_position("finish_endpoint", &click)?;

        let parts = extract_route_parts(&self.course.elements);
        let mut kept = remove_finish_group(&self.course.elements);
        let first_order = kept.iter().map(|el| el.order + 1).max().unwrap_or(0);
        let group = build_finish_group(click, &parts.buoys, first_order, &self.config.finish);
        let ids: Vec<String> = group.iter().map(|el| el.id.clone()).collect();

        kept.extend(group);
        self.mutate_elements(|_| normalize_order(kept));
        debug!("[CourseSession] Added finish group at ({:.6}, {:.6})", click.lat, click.lng);
        Ok(ids)
    }

    /// Move an element.
    pub fn update_element_position(&mut self, id: &str, position: LatLng) -> Result<()> {
        self.element(id).ok_or_not_found(id)?;
        validate_position(id, &position)?;

        self.mutate_elements(|elements| {
            elements
                .iter()
                .cloned()
                .map(|mut el| {
                    if el.id == id {
                        el.lat = position.lat;
                        el.lng = position.lng;
                    }
                    el
                })
                .collect()
        });
        debug!("[CourseSession] Moved '{}'", id);
        Ok(())
    }

    /// Replace an element's metadata string.
    pub fn update_element_meta(&mut self, id: &str, metadata: Option<String>) -> Result<()> {
        self.element(id).ok_or_not_found(id)?;

        self.mutate_elements(|elements| {
            elements
                .iter()
                .cloned()
                .map(|mut el| {
                    if el.id == id {
                        el.metadata = metadata.clone();
                    }
                    el
                })
                .collect()
        });
        debug!("[CourseSession] Updated metadata of '{}'", id);
        Ok(())
    }

    /// Replace an element's label.
    pub fn update_element_label(&mut self, id: &str, label: Option<String>) -> Result<()> {
        self.element(id).ok_or_not_found(id)?;

        self.mutate_elements(|elements| {
            elements
                .iter()
                .cloned()
                .map(|mut el| {
                    if el.id == id {
                        el.label = label.clone();
                    }
                    el
                })
                .collect()
        });
        Ok(())
    }

    /// Delete an element.
    ///
    /// The finish group is one structure: deleting any finish element
    /// deletes all of them.
    pub fn remove_element(&mut self, id: &str) -> Result<()> {
        let target = self.element(id).ok_or_not_found(id)?;
        let removes_finish = target.element_type.is_finish();

        self.mutate_elements(|elements| {
            let kept: Vec<CourseElement> = elements
                .iter()
                .filter(|el| el.id != id && !(removes_finish && el.element_type.is_finish()))
                .cloned()
                .collect();
            normalize_order(kept)
        });
        if removes_finish {
            debug!("[CourseSession] Removed finish group via '{}'", id);
        } else {
            debug!("[CourseSession] Removed '{}'", id);
        }
        Ok(())
    }

    /// Reorder elements by id.
    ///
    /// `ids` is the desired sequence; unknown ids are an error and elements
    /// not named keep their relative order after the named ones. Finish
    /// elements are moved last regardless.
    pub fn reorder_elements(&mut self, ids: &[String]) -> Result<()> {
        let mut sequence: Vec<CourseElement> = Vec::with_capacity(self.course.elements.len());
        for id in ids {
            let element = self.element(id).ok_or_not_found(id)?;
            if !sequence.iter().any(|el| el.id == *id) {
                sequence.push(element.clone());
            }
        }
        let mut rest: Vec<CourseElement> = self
            .course
            .elements
            .iter()
            .filter(|el| !ids.contains(&el.id))
            .cloned()
            .collect();
        rest.sort_by_key(|el| el.order);
        sequence.extend(rest);

        self.mutate_elements(|_| enforce_finish_last(sequence));
        debug!("[CourseSession] Reordered {} elements", ids.len());
        Ok(())
    }

    /// Restore the elements from before the last mutation.
    ///
    /// Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.undo.pop() {
            Some(previous) => {
                self.course.elements = previous;
                self.dirty = true;
                self.recompute_distances();
                debug!(
                    "[CourseSession] Undo ({} snapshots left)",
                    self.undo.len()
                );
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Race Settings
    // ========================================================================

    pub fn set_laps(&mut self, laps: u32) -> Result<()> {
        if laps < 1 {
            return Err(CourseError::InvalidLaps { laps });
        }
        self.course.laps = laps;
        self.dirty = true;
        debug!("[CourseSession] Laps set to {}", laps);
        Ok(())
    }

    pub fn set_race_label(&mut self, label: Option<String>) {
        self.course.race_label = label;
        self.dirty = true;
    }

    pub fn set_race_logo(&mut self, logo: Option<String>) {
        self.course.race_logo = logo;
        self.dirty = true;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.course.name = name.into();
        self.dirty = true;
    }

    // ========================================================================
    // Derived Views
    // ========================================================================

    /// Lap-aware total distance for the current lap count.
    pub fn race_total(&self) -> RaceTotal {
        let parts = extract_route_parts(&self.course.elements);
        race_total_for_parts(&parts, self.course.laps)
    }

    /// Laps whose buoy path differs from the full set.
    pub fn differing_laps(&self) -> Vec<DifferingLap> {
        let parts = extract_route_parts(&self.course.elements);
        differing_laps_for_parts(&parts, self.course.laps)
    }

    /// Materialized flyover path for the current lap count.
    pub fn flyover_path(&self) -> CoursePath {
        materialize_path_with_config(
            &self.course.elements,
            self.course.laps,
            &self.config.flyover,
        )
    }

    /// Chase-camera frames for the current course.
    pub fn camera_frames(&self) -> Vec<CameraFrame> {
        build_camera_frames(&self.flyover_path(), &self.config.flyover)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn next_order(&self) -> u32 {
        self.course
            .elements
            .iter()
            .map(|el| el.order + 1)
            .max()
            .unwrap_or(0)
    }

    /// Snapshot, apply, recompute, mark dirty.
    fn mutate_elements<F>(&mut self, apply: F)
    where
        F: FnOnce(&[CourseElement]) -> Vec<CourseElement>,
    {
        self.undo.push(self.course.elements.clone());
        self.course.elements = apply(&self.course.elements);
        self.recompute_distances();
        self.dirty = true;
    }

    fn recompute_distances(&mut self) {
        let parts = extract_route_parts(&self.course.elements);
        let distances = distances_for_parts(&parts);
        self.course.distance_km = Some(distances.loop_km);
        self.course.entry_dist_km = Some(distances.entry_km);
        self.course.exit_dist_km = Some(distances.exit_km);
        self.course.first_lap_extra_km = Some(distances.first_lap_extra_km);
    }
}

impl Default for CourseSession {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_position(id: &str, position: &LatLng) -> Result<()> {
    if position.is_valid() {
        Ok(())
    } else {
        Err(CourseError::InvalidCoordinates {
            id: id.to_string(),
            lat: position.lat,
            lng: position.lng,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::haversine_distance;
    use crate::ordering::finish_is_last;
    use proptest::prelude::*;

    fn buoy_session() -> (CourseSession, Vec<String>) {
        let mut session = CourseSession::new();
        let ids = [(47.0000, 8.0000), (47.0020, 8.0000), (47.0020, 8.0030)]
            .into_iter()
            .map(|(lat, lng)| {
                session
                    .add_element(ElementType::Buoy, LatLng::new(lat, lng), None, None)
                    .unwrap()
            })
            .collect();
        (session, ids)
    }

    fn types(session: &CourseSession) -> Vec<ElementType> {
        session.course().elements.iter().map(|e| e.element_type).collect()
    }

    #[test]
    fn test_session_add_element() {
        let (session, ids) = buoy_session();
        assert_eq!(session.course().elements.len(), 3);
        assert!(session.is_dirty());
        assert_eq!(session.undo_len(), 3);
        assert_eq!(session.element(&ids[2]).unwrap().order, 2);
        assert!(session.distances().loop_km > 0.0);
        assert!(session.course().distance_km.is_some());
    }

    #[test]
    fn test_session_rejects_invalid_coordinates() {
        let mut session = CourseSession::new();
        let err = session
            .add_element(ElementType::Buoy, LatLng::new(120.0, 0.0), None, None)
            .unwrap_err();
        assert!(matches!(err, CourseError::InvalidCoordinates { .. }));
        assert!(session.course().elements.is_empty());
        assert!(!session.can_undo());
    }

    #[test]
    fn test_added_route_element_goes_before_finish() {
        let (mut session, _) = buoy_session();
        session.add_finish_group(LatLng::new(46.9995, 8.0010)).unwrap();
        session.add_element(ElementType::Buoy, LatLng::new(47.001, 8.004), None, None).unwrap();

        assert!(finish_is_last(&session.course().elements));
        assert_eq!(types(&session)[3], ElementType::Buoy);
        assert_eq!(types(&session)[4], ElementType::FinishEndpoint);
    }

    #[test]
    fn test_add_finish_group_replaces_existing() {
        let (mut session, _) = buoy_session();
        session.add_element(ElementType::Finish, LatLng::new(46.999, 8.0), None, None).unwrap();
        let ids = session.add_finish_group(LatLng::new(46.9995, 8.0010)).unwrap();
        assert_eq!(ids.len(), 3);

        let finish: Vec<ElementType> =
            types(&session).into_iter().filter(|t| t.is_finish()).collect();
        assert_eq!(
            finish,
            vec![
                ElementType::FinishEndpoint,
                ElementType::FinishFunnelLeft,
                ElementType::FinishFunnelRight
            ]
        );
        assert!(session.distances().exit_km > 0.0);
    }

    #[test]
    fn test_finish_group_near_antimeridian_stays_valid() {
        let mut session = CourseSession::new();
        session
            .add_element(ElementType::Buoy, LatLng::new(0.0, 179.9999), None, None)
            .unwrap();
        let ids = session.add_finish_group(LatLng::new(0.001, 179.99995)).unwrap();

        assert!(session.course().elements.iter().all(|el| el.position().is_valid()));
        let endpoint = session.element(&ids[0]).unwrap().position();
        for post in &ids[1..] {
            let post = session.element(post).unwrap().position();
            assert!((haversine_distance(&endpoint, &post) - 10.0).abs() < 1e-3);
        }
        // The moved posts can be edited like any other element
        let right = session.element(&ids[2]).unwrap().position();
        session.update_element_position(&ids[2], right).unwrap();
    }

    #[test]
    fn test_remove_finish_member_removes_group() {
        let (mut session, _) = buoy_session();
        let ids = session.add_finish_group(LatLng::new(46.9995, 8.0010)).unwrap();
        session.remove_element(&ids[1]).unwrap();

        assert_eq!(session.course().elements.len(), 3);
        assert_eq!(session.distances().exit_km, 0.0);
        let orders: Vec<u32> = session.course().elements.iter().map(|e| e.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_unknown_element() {
        let (mut session, _) = buoy_session();
        let before = session.undo_len();
        let err = session.remove_element("missing").unwrap_err();
        assert!(matches!(err, CourseError::ElementNotFound { .. }));
        assert_eq!(session.undo_len(), before);
    }

    #[test]
    fn test_update_position_recomputes_distances() {
        let (mut session, ids) = buoy_session();
        let before = session.distances().loop_km;
        session.update_element_position(&ids[2], LatLng::new(47.0020, 8.0060)).unwrap();
        assert!(session.distances().loop_km > before);
    }

    #[test]
    fn test_update_meta_changes_lap_filtering() {
        let (mut session, ids) = buoy_session();
        session.set_laps(2).unwrap();
        assert!(session.differing_laps().is_empty());

        session
            .update_element_meta(&ids[1], Some(r#"{"mandatoryLaps":"1"}"#.to_string()))
            .unwrap();
        let differing = session.differing_laps();
        assert_eq!(differing.len(), 1);
        assert_eq!(differing[0].lap, 2);
    }

    #[test]
    fn test_reorder_keeps_finish_last() {
        let (mut session, ids) = buoy_session();
        let finish = session.add_finish_group(LatLng::new(46.9995, 8.0010)).unwrap();

        let sequence = vec![finish[0].clone(), ids[2].clone(), ids[0].clone(), ids[1].clone()];
        session.reorder_elements(&sequence).unwrap();

        let order: Vec<&str> = session.course().elements.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(&order[..3], &[ids[2].as_str(), ids[0].as_str(), ids[1].as_str()]);
        assert_eq!(order[3], finish[0].as_str());
        assert!(finish_is_last(&session.course().elements));
    }

    #[test]
    fn test_undo_restores_previous_elements() {
        let (mut session, ids) = buoy_session();
        let loop_before = session.distances().loop_km;
        session.remove_element(&ids[0]).unwrap();
        assert_eq!(session.course().elements.len(), 2);

        assert!(session.undo());
        assert_eq!(session.course().elements.len(), 3);
        assert_eq!(session.distances().loop_km, loop_before);
    }

    #[test]
    fn test_undo_depth_is_capped() {
        let mut session = CourseSession::with_config(SessionConfig {
            undo_depth: 2,
            ..SessionConfig::default()
        });
        for i in 0..5 {
            let position = LatLng::new(47.0 + i as f64 * 0.001, 8.0);
            session
                .add_element(ElementType::Buoy, position, None, None)
                .unwrap();
        }
        assert_eq!(session.undo_len(), 2);
        assert!(session.undo());
        assert!(session.undo());
        assert!(!session.undo());
        assert_eq!(session.course().elements.len(), 3);
    }

    #[test]
    fn test_set_laps_validation() {
        let mut session = CourseSession::new();
        assert!(matches!(session.set_laps(0), Err(CourseError::InvalidLaps { laps: 0 })));
        session.set_laps(3).unwrap();
        assert_eq!(session.course().laps, 3);
        // Settings are not undoable
        assert!(!session.can_undo());
    }

    #[test]
    fn test_race_settings_and_dirty_tracking() {
        let mut session = CourseSession::new();
        assert!(!session.is_dirty());
        session.set_race_label(Some("Sprint".to_string()));
        session.set_race_logo(Some("data:image/png;base64,AAAA".to_string()));
        assert!(session.is_dirty());
        session.mark_saved();
        assert!(!session.is_dirty());
        assert_eq!(session.course().race_label.as_deref(), Some("Sprint"));
    }

    #[test]
    fn test_load_normalizes_and_clears_history() {
        let (mut session, _) = buoy_session();
        let course = CourseData {
            elements: vec![
                CourseElement::new("f", ElementType::Finish, 46.999, 8.0, 0),
                CourseElement::new("b1", ElementType::Buoy, 47.0, 8.0, 1),
                CourseElement::new("b2", ElementType::Buoy, 47.001, 8.0, 2),
            ],
            ..CourseData::default()
        };
        session.load(course);

        assert!(!session.is_dirty());
        assert!(!session.can_undo());
        assert!(finish_is_last(&session.course().elements));
        assert!(session.distances().exit_km > 0.0);
    }

    #[test]
    fn test_reset() {
        let (mut session, _) = buoy_session();
        session.reset();
        assert!(session.course().elements.is_empty());
        assert!(!session.is_dirty());
        assert!(!session.can_undo());
    }

    #[test]
    fn test_flyover_from_session() {
        let (mut session, _) = buoy_session();
        session.set_laps(2).unwrap();
        let path = session.flyover_path();
        // (3+1) + (3+1)
        assert_eq!(path.points.len(), 8);
        assert!(!session.camera_frames().is_empty());
    }

    #[derive(Debug, Clone)]
    enum Edit {
        Add(ElementType, f64, f64),
        Finish(f64, f64),
        Remove(usize),
        Rotate(usize),
        Undo,
    }

    fn edit() -> impl Strategy<Value = Edit> {
        let element_type = prop::sample::select(vec![
            ElementType::Buoy,
            ElementType::Start,
            ElementType::ShoreEntry,
            ElementType::GateLeft,
            ElementType::Finish,
            ElementType::FinishEndpoint,
            ElementType::RescueZone,
        ]);
        prop_oneof![
            4 => (element_type, 46.99f64..47.01, 7.99f64..8.01)
                .prop_map(|(t, lat, lng)| Edit::Add(t, lat, lng)),
            1 => (46.99f64..47.01, 7.99f64..8.01).prop_map(|(lat, lng)| Edit::Finish(lat, lng)),
            2 => any::<usize>().prop_map(Edit::Remove),
            2 => any::<usize>().prop_map(Edit::Rotate),
            1 => Just(Edit::Undo),
        ]
    }

    proptest! {
        #[test]
        fn prop_edits_keep_finish_last(edits in prop::collection::vec(edit(), 1..30)) {
            let mut session = CourseSession::new();
            for edit in edits {
                let ids: Vec<String> =
                    session.course().elements.iter().map(|el| el.id.clone()).collect();
                match edit {
                    Edit::Add(t, lat, lng) => {
                        session.add_element(t, LatLng::new(lat, lng), None, None).unwrap();
                    }
                    Edit::Finish(lat, lng) => {
                        session.add_finish_group(LatLng::new(lat, lng)).unwrap();
                    }
                    Edit::Remove(i) if !ids.is_empty() => {
                        session.remove_element(&ids[i % ids.len()]).unwrap();
                    }
                    Edit::Rotate(k) if !ids.is_empty() => {
                        let mut rotated = ids.clone();
                        rotated.rotate_left(k % ids.len());
                        session.reorder_elements(&rotated).unwrap();
                    }
                    Edit::Undo => {
                        session.undo();
                    }
                    _ => {}
                }

                let elements = &session.course().elements;
                prop_assert!(finish_is_last(elements));
                for (i, el) in elements.iter().enumerate() {
                    prop_assert_eq!(el.order, i as u32);
                }
            }
        }
    }
}
