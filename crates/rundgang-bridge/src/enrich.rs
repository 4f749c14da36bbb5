// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Location enrichment. Geocoding failures never reach the caller: they are
// logged and the snapshot keeps only the raw coordinates, so every address
// field renders as "Not available".

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use rundgang_core::session::SessionState;
use rundgang_core::types::{Coordinates, LocationSnapshot};
use tracing::{info, instrument, warn};

use crate::traits::Geocoder;

/// Resolves coordinates into the session's location snapshot.
#[derive(Clone, Default)]
pub struct LocationEnricher {
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl LocationEnricher {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            geocoder: Some(geocoder),
        }
    }

    /// Enricher that never performs a lookup.
    pub fn offline() -> Self {
        Self { geocoder: None }
    }

    /// Resolve `coords`, stamping the result with the current local time.
    pub async fn resolve(&self, coords: Coordinates) -> LocationSnapshot {
        self.resolve_at(coords, Local::now().naive_local()).await
    }

    #[instrument(skip(self), fields(lat = coords.latitude, lon = coords.longitude))]
    pub async fn resolve_at(&self, coords: Coordinates, at: NaiveDateTime) -> LocationSnapshot {
        let Some(geocoder) = &self.geocoder else {
            info!("no geocoder configured, keeping raw coordinates");
            return LocationSnapshot::coordinates_only(coords, at);
        };
        match geocoder.reverse(coords).await {
            Ok(mut snapshot) => {
                snapshot.latitude = Some(coords.latitude);
                snapshot.longitude = Some(coords.longitude);
                snapshot.timestamp = Some(at);
                snapshot
            }
            Err(err) => {
                warn!(error = %err, "location enrichment failed, using coordinates only");
                LocationSnapshot::coordinates_only(coords, at)
            }
        }
    }

    /// Resolve and store the session location unless it is already set.
    /// Returns whether the session took the new snapshot.
    pub async fn enrich_session(&self, session: &mut SessionState, coords: Coordinates) -> bool {
        if session.location().is_some() {
            return false;
        }
        let snapshot = self.resolve(coords).await;
        session.set_location(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rundgang_core::config::SessionConfig;
    use rundgang_core::error::{Result, RundgangError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HERE: Coordinates = Coordinates {
        latitude: 48.1374,
        longitude: 11.5755,
    };

    struct FixedGeocoder {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn reverse(&self, _coords: Coordinates) -> Result<LocationSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RundgangError::Enrichment("service down".into()));
            }
            Ok(LocationSnapshot {
                city: Some("Munich".into()),
                country: Some("Germany".into()),
                ..LocationSnapshot::default()
            })
        }
    }

    fn geocoder(fail: bool) -> Arc<FixedGeocoder> {
        Arc::new(FixedGeocoder {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    #[tokio::test]
    async fn successful_lookup_keeps_coordinates_and_time() {
        let at = NaiveDateTime::parse_from_str("2026-03-01 09:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let snap = LocationEnricher::new(geocoder(false)).resolve_at(HERE, at).await;
        assert_eq!(snap.city.as_deref(), Some("Munich"));
        assert_eq!(snap.latitude, Some(HERE.latitude));
        assert_eq!(snap.timestamp, Some(at));
    }

    #[tokio::test]
    async fn failed_lookup_is_absorbed() {
        let snap = LocationEnricher::new(geocoder(true)).resolve(HERE).await;
        assert_eq!(snap.latitude, Some(HERE.latitude));
        assert!(snap.city.is_none());
        assert_eq!(snap.address_line(), "Not available");
    }

    #[tokio::test]
    async fn offline_enricher_keeps_raw_coordinates() {
        let snap = LocationEnricher::offline().resolve(HERE).await;
        assert_eq!(snap.longitude, Some(HERE.longitude));
        assert!(snap.timestamp.is_some());
    }

    #[tokio::test]
    async fn session_location_is_written_once() {
        let geo = geocoder(false);
        let enricher = LocationEnricher::new(geo.clone());
        let mut session = SessionState::new(SessionConfig::default());

        assert!(enricher.enrich_session(&mut session, HERE).await);
        assert!(!enricher.enrich_session(&mut session, Coordinates { latitude: 0.0, longitude: 0.0 }).await);

        assert_eq!(geo.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.location().and_then(|l| l.latitude), Some(HERE.latitude));
    }
}
