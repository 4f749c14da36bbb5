// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ordered in-memory store of the observations captured in one session.
//
// An observation's identity is its position. Removal shifts later entries
// down by one but never touches their values.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, RundgangError};
use crate::types::{FieldUpdate, Observation, ObservationField};

/// Insertion-ordered, mutable observation list for the active session.
#[derive(Debug, Clone, Default)]
pub struct ObservationStore {
    observations: Vec<Observation>,
}

impl ObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observation and return its position.
    pub fn add(&mut self, observation: Observation) -> usize {
        self.observations.push(observation);
        let index = self.observations.len() - 1;
        debug!(index, "observation added");
        index
    }

    /// Remove the observation at `index`, keeping the others in order.
    pub fn remove_at(&mut self, index: usize) -> Result<Observation> {
        self.check_index(index)?;
        let removed = self.observations.remove(index);
        debug!(index, remaining = self.observations.len(), "observation removed");
        Ok(removed)
    }

    /// Replace one field of the observation at `index`, addressed by name.
    ///
    /// The index is validated before the field name so that an out-of-range
    /// index is reported even when the field is also wrong.
    pub fn update_field(&mut self, index: usize, field: &str, value: &str) -> Result<()> {
        self.check_index(index)?;
        let field: ObservationField = field.parse()?;
        let update = FieldUpdate::parse(field, value)?;
        self.update(index, update)
    }

    /// Replace one field of the observation at `index`.
    pub fn update(&mut self, index: usize, update: FieldUpdate) -> Result<()> {
        self.check_index(index)?;
        self.observations[index].apply(update);
        debug!(index, ?update, "observation updated");
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Observation> {
        self.observations.get(index)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    pub fn clear(&mut self) {
        self.observations.clear();
    }

    /// Immutable ordered copy for composition. Later store mutations are not
    /// visible through it.
    pub fn snapshot(&self) -> ObservationSnapshot {
        ObservationSnapshot {
            observations: Arc::from(self.observations.clone()),
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.observations.len() {
            Ok(())
        } else {
            Err(RundgangError::IndexOutOfRange {
                index,
                len: self.observations.len(),
            })
        }
    }
}

/// Frozen view of the store at one point in time.
#[derive(Debug, Clone)]
pub struct ObservationSnapshot {
    observations: Arc<[Observation]>,
}

impl ObservationSnapshot {
    pub fn as_slice(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }
}

impl From<Vec<Observation>> for ObservationSnapshot {
    fn from(observations: Vec<Observation>) -> Self {
        Self {
            observations: Arc::from(observations),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CaptureType, Condition, FloorNumber, ImageBitmap};

    fn obs(capture_type: CaptureType, condition: Condition, floor: i64) -> Observation {
        Observation::new(
            ImageBitmap::new(vec![floor as u8; 8]),
            capture_type,
            condition,
            FloorNumber::new(floor).unwrap(),
            "Jane",
            "Tower A",
        )
    }

    fn three() -> ObservationStore {
        let mut store = ObservationStore::new();
        store.add(obs(CaptureType::Floor, Condition::Dirty, 3));
        store.add(obs(CaptureType::Restroom, Condition::Clean, 1));
        store.add(obs(CaptureType::Stairs, Condition::Dirty, 7));
        store
    }

    #[test]
    fn add_preserves_insertion_order() {
        let store = three();
        let floors: Vec<u8> = store.iter().map(|o| o.floor_number().get()).collect();
        assert_eq!(floors, vec![3, 1, 7]);
    }

    #[test]
    fn remove_shifts_without_mutating_others() {
        let mut store = three();
        let before_first = store.get(0).cloned().unwrap();
        let before_last = store.get(2).cloned().unwrap();

        store.remove_at(1).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0), Some(&before_first));
        assert_eq!(store.get(1), Some(&before_last));
    }

    #[test]
    fn remove_out_of_range_leaves_store_unchanged() {
        let mut store = ObservationStore::new();
        store.add(obs(CaptureType::Floor, Condition::Dirty, 3));
        store.add(obs(CaptureType::Restroom, Condition::Clean, 1));
        let before: Vec<Observation> = store.iter().cloned().collect();

        let err = store.remove_at(2).unwrap_err();

        assert!(matches!(err, RundgangError::IndexOutOfRange { index: 2, len: 2 }));
        assert_eq!(store.len(), 2);
        assert_eq!(store.iter().cloned().collect::<Vec<_>>(), before);
    }

    #[test]
    fn update_field_touches_only_that_field() {
        let mut store = three();
        store.update_field(0, "condition", "Clean").unwrap();

        let o = store.get(0).unwrap();
        assert_eq!(o.condition(), Condition::Clean);
        assert_eq!(o.capture_type(), CaptureType::Floor);
        assert_eq!(o.floor_number().get(), 3);
    }

    #[test]
    fn update_field_rejects_unknown_and_out_of_range() {
        let mut store = three();
        assert!(matches!(
            store.update_field(0, "reporterName", "Max"),
            Err(RundgangError::UnknownField(_))
        ));
        assert!(matches!(
            store.update_field(9, "condition", "Clean"),
            Err(RundgangError::IndexOutOfRange { index: 9, len: 3 })
        ));
        assert!(matches!(
            store.update_field(0, "floorNumber", "51"),
            Err(RundgangError::InvalidFloor(51))
        ));
    }

    #[test]
    fn snapshot_is_isolated_from_later_mutation() {
        let mut store = three();
        let snap = store.snapshot();

        store.remove_at(0).unwrap();
        store.update_field(0, "floor", "9").unwrap();

        assert_eq!(snap.len(), 3);
        assert_eq!(snap.as_slice()[0].floor_number().get(), 3);
        assert_eq!(snap.as_slice()[1].floor_number().get(), 1);
    }
}
