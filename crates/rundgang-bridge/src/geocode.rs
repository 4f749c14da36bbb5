// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP reverse geocoder. Speaks the common `results[].address_components[]`
// response shape where each component carries a `long_name` and a list of
// `types`.

use std::time::Duration;

use async_trait::async_trait;
use rundgang_core::config::GeocodingConfig;
use rundgang_core::error::{Result, RundgangError};
use rundgang_core::types::{Coordinates, LocationSnapshot};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::traits::Geocoder;

/// Component types tried, in order, for the landmark line.
const LANDMARK_TYPES: [&str; 3] = ["point_of_interest", "premise", "establishment"];

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

/// Reverse geocoder backed by an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpGeocoder {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpGeocoder {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RundgangError::Config(format!("geocoding client: {err}")))?;
        Ok(Self::with_client(client, endpoint, api_key))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        }
    }

    /// Geocoder from settings; Ok(None) when no endpoint is configured.
    pub fn from_config(config: &GeocodingConfig, timeout: Duration) -> Result<Option<Self>> {
        match config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            Some(endpoint) => Self::new(endpoint, config.api_key.clone(), timeout).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn reverse(&self, coords: Coordinates) -> Result<LocationSnapshot> {
        let latlng = format!("{},{}", coords.latitude, coords.longitude);
        let mut query = vec![("latlng", latlng)];
        if let Some(key) = &self.api_key {
            query.push(("key", key.clone()));
        }

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|err| RundgangError::Enrichment(format!("geocoding request failed: {err}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RundgangError::Enrichment(format!(
                "geocoding service returned status {}",
                status.as_u16()
            )));
        }
        let body = resp
            .text()
            .await
            .map_err(|err| RundgangError::Enrichment(format!("geocoding body unreadable: {err}")))?;
        parse_reverse_geocode(&body, coords)
    }
}

/// Extract address fields from a geocoding response body.
///
/// Address parts come from the first result. The landmark is the first
/// component of type `point_of_interest`, then `premise`, then
/// `establishment`, searched across all results. An empty result list is
/// an enrichment failure.
pub fn parse_reverse_geocode(body: &str, coords: Coordinates) -> Result<LocationSnapshot> {
    let response: GeocodeResponse = serde_json::from_str(body)
        .map_err(|err| RundgangError::Enrichment(format!("malformed geocoding response: {err}")))?;

    let Some(first) = response.results.first() else {
        return Err(RundgangError::Enrichment(format!(
            "no address for {:.6},{:.6} (status {})",
            coords.latitude,
            coords.longitude,
            response.status.as_deref().unwrap_or("unknown"),
        )));
    };

    let component = |kind: &str| {
        first
            .address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
            .map(|c| c.long_name.clone())
    };
    let landmark = LANDMARK_TYPES.iter().find_map(|kind| {
        response
            .results
            .iter()
            .flat_map(|r| &r.address_components)
            .find(|c| c.types.iter().any(|t| t == kind))
            .map(|c| c.long_name.clone())
    });

    let snapshot = LocationSnapshot {
        latitude: Some(coords.latitude),
        longitude: Some(coords.longitude),
        city: component("locality"),
        country: component("country"),
        street: component("route"),
        house_number: component("street_number"),
        zipcode: component("postal_code"),
        landmark,
        timestamp: None,
    };
    debug!(city = ?snapshot.city, landmark = ?snapshot.landmark, "Address resolved");
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const COORDS: Coordinates = Coordinates {
        latitude: 52.5163,
        longitude: 13.3777,
    };

    #[test]
    fn full_response_fills_every_field() {
        let body = r#"{
            "status": "OK",
            "results": [
                {"address_components": [
                    {"long_name": "1", "types": ["street_number"]},
                    {"long_name": "Pariser Platz", "types": ["route"]},
                    {"long_name": "Berlin", "types": ["locality", "political"]},
                    {"long_name": "Germany", "types": ["country", "political"]},
                    {"long_name": "10117", "types": ["postal_code"]}
                ]},
                {"address_components": [
                    {"long_name": "Adlon", "types": ["establishment"]},
                    {"long_name": "Brandenburg Gate", "types": ["point_of_interest", "tourist_attraction"]}
                ]}
            ]
        }"#;

        let snap = parse_reverse_geocode(body, COORDS).unwrap();
        assert_eq!(snap.city.as_deref(), Some("Berlin"));
        assert_eq!(snap.country.as_deref(), Some("Germany"));
        assert_eq!(snap.street.as_deref(), Some("Pariser Platz"));
        assert_eq!(snap.house_number.as_deref(), Some("1"));
        assert_eq!(snap.zipcode.as_deref(), Some("10117"));
        assert_eq!(snap.landmark.as_deref(), Some("Brandenburg Gate"));
        assert_eq!(snap.latitude, Some(COORDS.latitude));
    }

    #[test]
    fn landmark_falls_back_through_premise_and_establishment() {
        let premise = r#"{"results":[{"address_components":[
            {"long_name":"Shop","types":["establishment"]},
            {"long_name":"Block C","types":["premise"]}]}]}"#;
        let snap = parse_reverse_geocode(premise, COORDS).unwrap();
        assert_eq!(snap.landmark.as_deref(), Some("Block C"));

        let establishment = r#"{"results":[{"address_components":[
            {"long_name":"Shop","types":["establishment"]}]}]}"#;
        let snap = parse_reverse_geocode(establishment, COORDS).unwrap();
        assert_eq!(snap.landmark.as_deref(), Some("Shop"));
    }

    #[test]
    fn missing_components_stay_unset() {
        let body = r#"{"results":[{"address_components":[
            {"long_name":"Berlin","types":["locality"]}]}]}"#;
        let snap = parse_reverse_geocode(body, COORDS).unwrap();
        assert!(snap.street.is_none());
        assert!(snap.landmark.is_none());
        assert_eq!(rundgang_core::types::or_not_available(&snap.landmark), "Not available");
    }

    #[test]
    fn no_results_is_an_enrichment_failure() {
        let body = r#"{"status":"ZERO_RESULTS","results":[]}"#;
        let err = parse_reverse_geocode(body, COORDS).unwrap_err();
        assert!(matches!(err, RundgangError::Enrichment(msg) if msg.contains("ZERO_RESULTS")));
    }

    #[test]
    fn garbage_is_an_enrichment_failure() {
        assert!(matches!(
            parse_reverse_geocode("<html>", COORDS),
            Err(RundgangError::Enrichment(_))
        ));
    }

    #[test]
    fn unconfigured_endpoint_yields_no_geocoder() {
        let config = GeocodingConfig::default();
        assert!(HttpGeocoder::from_config(&config, Duration::from_secs(5)).unwrap().is_none());
    }

    /// Answer one request with `status_line` and `body`; the handle yields
    /// the request head.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut buf = Vec::new();
            let mut chunk = [0u8; 2048];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut chunk).await.expect("read request");
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.expect("write response");
            let _ = stream.shutdown().await;
            String::from_utf8_lossy(&buf).into_owned()
        });
        (format!("http://{addr}/geocode"), handle)
    }

    fn geocoder(endpoint: String, key: Option<&str>) -> HttpGeocoder {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        HttpGeocoder::with_client(client, endpoint, key.map(str::to_string))
    }

    #[tokio::test]
    async fn reverse_sends_latlng_and_key() {
        let body = r#"{"status":"OK","results":[{"address_components":[
            {"long_name":"Berlin","types":["locality"]},
            {"long_name":"Germany","types":["country"]}]}]}"#;
        let (endpoint, server) = serve_once("200 OK", body).await;

        let snap = geocoder(endpoint, Some("k1")).reverse(COORDS).await.unwrap();
        assert_eq!(snap.city.as_deref(), Some("Berlin"));
        assert_eq!(snap.country.as_deref(), Some("Germany"));

        let request = server.await.unwrap();
        assert!(
            request.starts_with("GET /geocode?latlng=52.5163%2C13.3777&key=k1 HTTP/1.1\r\n"),
            "unexpected request line: {request}"
        );
    }

    #[tokio::test]
    async fn key_is_omitted_when_not_configured() {
        let (endpoint, server) = serve_once("200 OK", r#"{"results":[{"address_components":[]}]}"#).await;
        geocoder(endpoint, None).reverse(COORDS).await.unwrap();
        let request = server.await.unwrap();
        let line = request.lines().next().unwrap();
        assert!(line.contains("latlng=") && !line.contains("key="));
    }

    #[tokio::test]
    async fn error_status_is_an_enrichment_failure() {
        let (endpoint, server) = serve_once("503 Service Unavailable", "{}").await;
        let err = geocoder(endpoint, Some("k1")).reverse(COORDS).await.unwrap_err();
        server.await.unwrap();
        assert!(matches!(err, RundgangError::Enrichment(ref detail) if detail.contains("503")));
    }
}
