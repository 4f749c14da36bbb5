// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session aggregate: the single owned object every capture, review and
// export operation goes through.
//
// The location snapshot is write-once per session. Only one export may be in
// flight; a reset while it runs bumps the generation so the late result can be
// recognised as stale and dropped.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::{Result, RundgangError};
use crate::store::{ObservationSnapshot, ObservationStore};
use crate::types::{
    CaptureType, Condition, FieldUpdate, FloorNumber, ImageBitmap, LocationSnapshot, Observation,
};

/// Metadata preselected for the next capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureDraft {
    pub capture_type: CaptureType,
    pub condition: Condition,
    pub floor_number: FloorNumber,
}

/// Everything composition needs, frozen at one instant.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub observations: ObservationSnapshot,
    pub location: LocationSnapshot,
    pub facility_name: String,
    pub reporter_name: String,
}

/// Proof that an export was started; hand it back to [`SessionState::finish_export`].
#[derive(Debug)]
#[must_use = "an export ticket must be returned with finish_export"]
pub struct ExportTicket {
    generation: u64,
}

/// Live working set of one reporting pass.
#[derive(Debug)]
pub struct SessionState {
    id: Uuid,
    config: SessionConfig,
    store: ObservationStore,
    location: Option<LocationSnapshot>,
    reporter_name: String,
    facility_name: String,
    draft: CaptureDraft,
    generation: u64,
    export_in_flight: Option<u64>,
}

impl SessionState {
    pub fn new(config: SessionConfig) -> Self {
        let id = Uuid::new_v4();
        info!(session = %id, "session started");
        Self {
            id,
            config,
            store: ObservationStore::new(),
            location: None,
            reporter_name: String::new(),
            facility_name: String::new(),
            draft: CaptureDraft::default(),
            generation: 0,
            export_in_flight: None,
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &ObservationStore {
        &self.store
    }

    pub fn location(&self) -> Option<&LocationSnapshot> {
        self.location.as_ref()
    }

    pub fn reporter_name(&self) -> &str {
        &self.reporter_name
    }

    pub fn facility_name(&self) -> &str {
        &self.facility_name
    }

    pub fn draft(&self) -> CaptureDraft {
        self.draft
    }

    pub fn is_exporting(&self) -> bool {
        self.export_in_flight.is_some()
    }

    // -- Identity and draft ---------------------------------------------------

    pub fn set_reporter_name(&mut self, name: impl Into<String>) {
        self.reporter_name = name.into();
    }

    pub fn set_facility_name(&mut self, name: impl Into<String>) {
        self.facility_name = name.into();
    }

    pub fn set_draft(&mut self, draft: CaptureDraft) {
        self.draft = draft;
    }

    // -- Location -------------------------------------------------------------

    /// Store the resolved location. The first resolution wins; later calls
    /// are ignored and return `false`.
    pub fn set_location(&mut self, snapshot: LocationSnapshot) -> bool {
        if self.location.is_some() {
            debug!("location already resolved for this session, ignoring update");
            return false;
        }
        self.location = Some(snapshot);
        true
    }

    // -- Observations ---------------------------------------------------------

    /// Turn a camera frame into an observation using the current draft.
    pub fn capture(&mut self, frame: Option<Vec<u8>>) -> Result<usize> {
        let bytes = match frame {
            Some(bytes) if !bytes.is_empty() => bytes,
            Some(_) => return Err(RundgangError::Capture("camera returned an empty frame".into())),
            None => return Err(RundgangError::Capture("no frame available".into())),
        };
        let observation = Observation::new(
            ImageBitmap::new(bytes),
            self.draft.capture_type,
            self.draft.condition,
            self.draft.floor_number,
            self.reporter_name.clone(),
            self.facility_name.clone(),
        );
        Ok(self.store.add(observation))
    }

    pub fn add_observation(&mut self, observation: Observation) -> usize {
        self.store.add(observation)
    }

    pub fn remove_at(&mut self, index: usize) -> Result<Observation> {
        self.store.remove_at(index)
    }

    pub fn update_field(&mut self, index: usize, field: &str, value: &str) -> Result<()> {
        self.store.update_field(index, field, value)
    }

    pub fn update(&mut self, index: usize, update: FieldUpdate) -> Result<()> {
        self.store.update(index, update)
    }

    /// Frozen copy of everything composition reads.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            observations: self.store.snapshot(),
            location: self.location.clone().unwrap_or_default(),
            facility_name: self.facility_name.clone(),
            reporter_name: self.reporter_name.clone(),
        }
    }

    // -- Export guard ---------------------------------------------------------

    /// Claim the session's single export slot.
    pub fn begin_export(&mut self) -> Result<ExportTicket> {
        if self.export_in_flight.is_some() {
            return Err(RundgangError::ExportInProgress);
        }
        if self.store.is_empty() {
            return Err(RundgangError::EmptyExport);
        }
        self.export_in_flight = Some(self.generation);
        debug!(generation = self.generation, "export started");
        Ok(ExportTicket {
            generation: self.generation,
        })
    }

    /// Release the export slot. Returns `false` when the session was reset
    /// after the ticket was issued, in which case the result must be dropped.
    pub fn finish_export(&mut self, ticket: ExportTicket) -> bool {
        if ticket.generation != self.generation {
            warn!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding result of an export from a reset session"
            );
            return false;
        }
        self.export_in_flight = None;
        true
    }

    /// Clear every session field back to its initial state. The config and
    /// session id survive.
    pub fn reset(&mut self) {
        self.store.clear();
        self.location = None;
        self.reporter_name.clear();
        self.facility_name.clear();
        self.draft = CaptureDraft::default();
        self.export_in_flight = None;
        self.generation += 1;
        info!(session = %self.id, generation = self.generation, "session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionState {
        let mut s = SessionState::new(SessionConfig::default());
        s.set_reporter_name("Jane");
        s.set_facility_name("Tower A");
        s
    }

    #[test]
    fn capture_uses_draft_and_identity() {
        let mut s = session();
        s.set_draft(CaptureDraft {
            capture_type: CaptureType::Stairs,
            condition: Condition::Dirty,
            floor_number: FloorNumber::new(4).unwrap(),
        });
        let index = s.capture(Some(vec![1, 2, 3])).unwrap();

        let o = s.store().get(index).unwrap();
        assert_eq!(o.capture_type(), CaptureType::Stairs);
        assert_eq!(o.condition(), Condition::Dirty);
        assert_eq!(o.floor_number().get(), 4);
        assert_eq!(o.reporter_name(), "Jane");
        assert_eq!(o.facility_name(), "Tower A");
    }

    #[test]
    fn capture_without_frame_fails() {
        let mut s = session();
        assert!(matches!(s.capture(None), Err(RundgangError::Capture(_))));
        assert!(matches!(s.capture(Some(Vec::new())), Err(RundgangError::Capture(_))));
        assert!(s.store().is_empty());
    }

    #[test]
    fn first_location_wins() {
        let mut s = session();
        let first = LocationSnapshot {
            city: Some("Berlin".into()),
            ..LocationSnapshot::default()
        };
        let second = LocationSnapshot {
            city: Some("Hamburg".into()),
            ..LocationSnapshot::default()
        };
        assert!(s.set_location(first));
        assert!(!s.set_location(second));
        assert_eq!(s.location().unwrap().city.as_deref(), Some("Berlin"));
    }

    #[test]
    fn empty_session_cannot_export() {
        let mut s = session();
        assert!(matches!(s.begin_export(), Err(RundgangError::EmptyExport)));
        assert!(!s.is_exporting());
    }

    #[test]
    fn second_export_is_rejected_while_one_runs() {
        let mut s = session();
        s.capture(Some(vec![9])).unwrap();

        let ticket = s.begin_export().unwrap();
        assert!(matches!(s.begin_export(), Err(RundgangError::ExportInProgress)));
        assert!(s.finish_export(ticket));
        let again = s.begin_export().unwrap();
        assert!(s.finish_export(again));
    }

    #[test]
    fn reset_clears_everything_and_stales_tickets() {
        let mut s = session();
        s.capture(Some(vec![9])).unwrap();
        s.set_location(LocationSnapshot::default());
        let ticket = s.begin_export().unwrap();

        s.reset();

        assert!(s.store().is_empty());
        assert!(s.location().is_none());
        assert_eq!(s.reporter_name(), "");
        assert_eq!(s.facility_name(), "");
        assert_eq!(s.draft(), CaptureDraft::default());
        assert!(!s.is_exporting());
        assert!(!s.finish_export(ticket));
    }

    #[test]
    fn snapshot_substitutes_empty_location() {
        let mut s = session();
        s.capture(Some(vec![1])).unwrap();
        let snap = s.snapshot();
        assert_eq!(snap.observations.len(), 1);
        assert_eq!(snap.location, LocationSnapshot::default());
        assert_eq!(snap.facility_name, "Tower A");
    }
}
