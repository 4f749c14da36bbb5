// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// rundgang-dispatch: ships a finished report. Three sinks: a mail message
// with the PDF attached, a zip of the raw photos, and a PDF file on disk.
// Every sink hands back a `DispatchReceipt`.

pub mod archive;
pub mod file;
pub mod message;
pub mod naming;
pub mod retry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use rundgang_bridge::{BearerToken, CredentialSource};
use rundgang_core::config::{MessageConfig, SessionConfig};
use rundgang_core::error::{Result, RundgangError};
use rundgang_core::session::SessionSnapshot;
use rundgang_core::types::SinkKind;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

pub use message::{HttpMessageTransport, MessageTransport, OutgoingMessage};
pub use retry::RetryConfig;

/// What a sink produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReceipt {
    pub sink: SinkKind,
    /// Size of the shipped payload.
    pub bytes: usize,
    /// Hex SHA-256 of the shipped payload.
    pub sha256: String,
    /// Written file, for the archive and file sinks.
    pub path: Option<PathBuf>,
}

impl DispatchReceipt {
    fn new(sink: SinkKind, payload: &[u8], path: Option<PathBuf>) -> Self {
        Self {
            sink,
            bytes: payload.len(),
            sha256: hex::encode(Sha256::digest(payload)),
            path,
        }
    }
}

/// Routes reports to their sinks.
pub struct ExportDispatcher {
    export_dir: PathBuf,
    message: MessageConfig,
    credentials: Arc<dyn CredentialSource>,
    transport: Arc<dyn MessageTransport>,
    retry: RetryConfig,
}

impl ExportDispatcher {
    pub fn new(
        export_dir: impl Into<PathBuf>,
        message: MessageConfig,
        credentials: Arc<dyn CredentialSource>,
        transport: Arc<dyn MessageTransport>,
    ) -> Self {
        Self {
            export_dir: export_dir.into(),
            message,
            credentials,
            transport,
            retry: RetryConfig::default(),
        }
    }

    /// Dispatcher wired to the HTTP mail API described by `config`.
    pub fn from_config(config: &SessionConfig, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        let transport = HttpMessageTransport::new(
            config.message.endpoint.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )?;
        Ok(Self::new(
            config.export_dir.clone(),
            config.message.clone(),
            credentials,
            Arc::new(transport),
        )
        .with_retry(RetryConfig::with_max_retries(config.max_dispatch_retries)))
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn message_configured(&self) -> bool {
        self.message.is_configured()
    }

    /// A usable token, or `Auth` when signed out or expired.
    fn current_token(&self) -> Result<BearerToken> {
        match self.credentials.bearer_token()? {
            None => Err(RundgangError::Auth("not signed in".into())),
            Some(token) if token.is_expired() => Err(RundgangError::Auth("access token expired".into())),
            Some(token) => Ok(token),
        }
    }

    /// Mail the PDF. Credentials are checked before anything goes on the
    /// wire. Only failures where the mail API provably did not take the
    /// message are retried; a timed-out send is reported, not repeated.
    #[instrument(skip(self, pdf), fields(pdf_len = pdf.len()))]
    pub async fn send_message(&self, pdf: &[u8]) -> Result<DispatchReceipt> {
        if !self.message.is_configured() {
            return Err(RundgangError::Config(
                "message sink needs an endpoint and at least one recipient".into(),
            ));
        }
        let token = self.current_token()?;

        let outgoing = OutgoingMessage::from_config(&self.message, pdf);
        let raw = outgoing.encode_raw(&message::new_boundary());
        retry::retry_async(&self.retry, || self.transport.send(&token, &raw))
            .await
            .inspect_err(|err| warn!(error = %err, "message dispatch failed"))?;

        info!(recipients = self.message.to.len(), "Report mailed");
        Ok(DispatchReceipt::new(SinkKind::Message, pdf, None))
    }

    /// Zip the raw photos of `snapshot` into the export directory.
    #[instrument(skip(self, snapshot), fields(observations = snapshot.observations.len()))]
    pub fn export_archive(&self, snapshot: &SessionSnapshot, at: NaiveDateTime) -> Result<DispatchReceipt> {
        let bytes = archive::build_archive(
            snapshot.observations.as_slice(),
            &snapshot.reporter_name,
            &snapshot.facility_name,
        )?;
        let name = naming::archive_file_name(&snapshot.reporter_name, &snapshot.facility_name, at);
        let path = file::write_export(&self.export_dir, &name, &bytes)?;
        Ok(DispatchReceipt::new(SinkKind::Archive, &bytes, Some(path)))
    }

    /// Write the PDF into the export directory.
    #[instrument(skip(self, pdf), fields(pdf_len = pdf.len()))]
    pub fn export_file(&self, pdf: &[u8], facility_name: &str, at: NaiveDateTime) -> Result<DispatchReceipt> {
        if pdf.is_empty() {
            return Err(RundgangError::Pdf("refusing to write an empty report".into()));
        }
        let name = naming::report_file_name(facility_name, at);
        let path = file::write_export(&self.export_dir, &name, pdf)?;
        Ok(DispatchReceipt::new(SinkKind::File, pdf, Some(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::{Duration as ChronoDuration, Utc};
    use rundgang_bridge::StaticCredentialSource;
    use rundgang_core::error::DispatchStage;
    use rundgang_core::session::SessionState;
    use rundgang_core::types::{CaptureType, Condition, FloorNumber, ImageBitmap, Observation};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(String, String)>>,
        failures_left: Mutex<u32>,
        failure: Option<(DispatchStage, String)>,
    }

    impl RecordingTransport {
        fn failing(times: u32, stage: DispatchStage, detail: &str) -> Self {
            Self {
                failures_left: Mutex::new(times),
                failure: Some((stage, detail.into())),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MessageTransport for RecordingTransport {
        async fn send(&self, token: &BearerToken, raw: &str) -> Result<()> {
            self.sent.lock().unwrap().push((token.value().to_string(), raw.to_string()));
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                let (stage, detail) = self.failure.clone().unwrap_or((DispatchStage::Local, String::new()));
                return Err(RundgangError::dispatch(stage, detail));
            }
            Ok(())
        }
    }

    fn message_config() -> MessageConfig {
        MessageConfig {
            to: vec!["facilities@example.org".into()],
            ..MessageConfig::default()
        }
    }

    fn instant_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            base_delay: std::time::Duration::from_millis(1),
            max_delay: std::time::Duration::from_millis(2),
        }
    }

    fn dispatcher(
        dir: &std::path::Path,
        token: Option<BearerToken>,
        transport: Arc<RecordingTransport>,
    ) -> ExportDispatcher {
        ExportDispatcher::new(
            dir,
            message_config(),
            Arc::new(StaticCredentialSource::new(token)),
            transport,
        )
        .with_retry(instant_retry())
    }

    fn at() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2026-05-04 13:07:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn session_snapshot(count: usize) -> SessionSnapshot {
        let mut session = SessionState::new(SessionConfig::default());
        session.set_reporter_name("Jane");
        session.set_facility_name("Tower A");
        for i in 0..count {
            session.add_observation(Observation::new(
                ImageBitmap::new(vec![0xFF, 0xD8, 0xFF, i as u8]),
                CaptureType::Floor,
                Condition::Dirty,
                FloorNumber::new(3).unwrap(),
                "Jane",
                "Tower A",
            ));
        }
        session.snapshot()
    }

    #[tokio::test]
    async fn missing_credential_fails_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let err = dispatcher(dir.path(), None, transport.clone())
            .send_message(b"%PDF")
            .await
            .unwrap_err();
        assert!(matches!(err, RundgangError::Auth(_)));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn expired_credential_fails_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let expired = BearerToken::new("old").with_expiry(Utc::now() - ChronoDuration::minutes(5));
        let err = dispatcher(dir.path(), Some(expired), transport.clone())
            .send_message(b"%PDF")
            .await
            .unwrap_err();
        assert!(matches!(err, RundgangError::Auth(_)));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn message_carries_token_and_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let receipt = dispatcher(dir.path(), Some(BearerToken::new("tok")), transport.clone())
            .send_message(b"%PDF-report")
            .await
            .unwrap();

        assert_eq!(receipt.sink, SinkKind::Message);
        assert_eq!(receipt.bytes, 11);
        assert_eq!(receipt.sha256, hex::encode(Sha256::digest(b"%PDF-report")));
        assert!(receipt.path.is_none());

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "tok");
        let mime = String::from_utf8(URL_SAFE_NO_PAD.decode(&sent[0].1).unwrap()).unwrap();
        assert!(mime.starts_with("To: facilities@example.org"));
        assert!(mime.contains("application/pdf"));
    }

    #[tokio::test]
    async fn transient_transport_failure_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(RecordingTransport::failing(
            1,
            DispatchStage::Status(503),
            "mail API returned status 503: busy",
        ));
        dispatcher(dir.path(), Some(BearerToken::new("tok")), transport.clone())
            .send_message(b"%PDF")
            .await
            .unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn persistent_failure_surfaces_dispatch_error() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(RecordingTransport::failing(
            10,
            DispatchStage::NotSent,
            "mail API unreachable: dns",
        ));
        let err = dispatcher(dir.path(), Some(BearerToken::new("tok")), transport.clone())
            .send_message(b"%PDF")
            .await
            .unwrap_err();
        assert!(matches!(err, RundgangError::Dispatch { stage: DispatchStage::NotSent, .. }));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn timed_out_send_is_not_repeated() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(RecordingTransport::failing(
            10,
            DispatchStage::InFlight,
            "mail request timed out",
        ));
        let err = dispatcher(dir.path(), Some(BearerToken::new("tok")), transport.clone())
            .send_message(b"%PDF")
            .await
            .unwrap_err();
        assert!(matches!(err, RundgangError::Dispatch { stage: DispatchStage::InFlight, .. }));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn silent_mail_api_receives_exactly_one_request() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio::io::AsyncReadExt;

        let dir = tempfile::tempdir().unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let seen = connections.clone();
        // Reads every request and never answers.
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                seen.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    while matches!(stream.read(&mut buf).await, Ok(n) if n > 0) {}
                });
            }
        });

        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_millis(300))
            .build()
            .unwrap();
        let transport = HttpMessageTransport::with_client(client, format!("http://{addr}/send"));
        let dispatcher = ExportDispatcher::new(
            dir.path(),
            message_config(),
            Arc::new(StaticCredentialSource::new(Some(BearerToken::new("tok")))),
            Arc::new(transport),
        )
        .with_retry(instant_retry());

        let err = dispatcher.send_message(b"%PDF").await.unwrap_err();
        assert!(matches!(err, RundgangError::Dispatch { stage: DispatchStage::InFlight, .. }));
        assert_eq!(connections.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unconfigured_message_sink_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = ExportDispatcher::new(
            dir.path(),
            MessageConfig::default(),
            Arc::new(StaticCredentialSource::new(Some(BearerToken::new("tok")))),
            transport.clone(),
        );
        assert!(!dispatcher.message_configured());
        assert!(matches!(
            dispatcher.send_message(b"%PDF").await,
            Err(RundgangError::Config(_))
        ));
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn archive_lands_under_sanitized_name() {
        let dir = tempfile::tempdir().unwrap();
        let receipt = dispatcher(dir.path(), None, Arc::new(RecordingTransport::default()))
            .export_archive(&session_snapshot(2), at())
            .unwrap();

        assert_eq!(receipt.sink, SinkKind::Archive);
        let path = receipt.path.unwrap();
        assert_eq!(path, dir.path().join("Jane_Tower_A_2026-05-04_13-07.zip"));
        let written = std::fs::read(&path).unwrap();
        assert_eq!(receipt.sha256, hex::encode(Sha256::digest(&written)));
    }

    #[test]
    fn empty_archive_export_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let err = dispatcher(dir.path(), None, Arc::new(RecordingTransport::default()))
            .export_archive(&session_snapshot(0), at())
            .unwrap_err();
        assert!(matches!(err, RundgangError::EmptyExport));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn file_export_names_by_facility() {
        let dir = tempfile::tempdir().unwrap();
        let receipt = dispatcher(dir.path(), None, Arc::new(RecordingTransport::default()))
            .export_file(b"%PDF-1.7", "Tower A", at())
            .unwrap();
        assert_eq!(receipt.sink, SinkKind::File);
        assert_eq!(receipt.path, Some(dir.path().join("Tower_A_2026-05-04_13-07.pdf")));
    }
}
