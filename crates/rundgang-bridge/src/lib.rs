// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// rundgang-bridge: the outside world as seen by a reporting session.
//
// Traits for the camera, the reverse geocoder, and the credential source, plus
// the desktop implementations (files on disk, HTTP geocoding, environment
// token) and the location enricher that absorbs geocoding failures.

pub mod enrich;
pub mod geocode;
pub mod stub;
pub mod traits;

pub use enrich::LocationEnricher;
pub use geocode::{HttpGeocoder, parse_reverse_geocode};
pub use stub::{EnvCredentialSource, FileFrameSource, StaticCredentialSource};
pub use traits::{BearerToken, CredentialSource, FrameSource, Geocoder};
