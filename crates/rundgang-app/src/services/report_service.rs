// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Report service: owns one session and drives it through capture, location
// enrichment, composition and dispatch.
//
// Exports hold the session's export ticket for their whole duration. If the
// session was reset meanwhile, the finished result is dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use rundgang_bridge::{CredentialSource, FrameSource, HttpGeocoder, LocationEnricher};
use rundgang_core::config::SessionConfig;
use rundgang_core::error::{Result, RundgangError};
use rundgang_core::session::{CaptureDraft, SessionSnapshot, SessionState};
use rundgang_core::types::{Coordinates, SinkKind};
use rundgang_dispatch::{DispatchReceipt, ExportDispatcher};
use rundgang_document::{PdfWriter, ReportComposer};
use tracing::{info, instrument, warn};

pub struct ReportService {
    session: SessionState,
    composer: ReportComposer,
    dispatcher: ExportDispatcher,
    enricher: LocationEnricher,
    concurrent: bool,
}

impl ReportService {
    /// Wire every collaborator from `config`.
    pub fn new(config: SessionConfig, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        let composer = ReportComposer::from_config(&config)?;
        let dispatcher = ExportDispatcher::from_config(&config, credentials)?;
        let timeout = Duration::from_secs(config.http_timeout_secs);
        let enricher = match HttpGeocoder::from_config(&config.geocoding, timeout)? {
            Some(geocoder) => LocationEnricher::new(Arc::new(geocoder)),
            None => LocationEnricher::offline(),
        };
        Ok(Self::with_parts(config, composer, dispatcher, enricher))
    }

    pub fn with_parts(
        config: SessionConfig,
        composer: ReportComposer,
        dispatcher: ExportDispatcher,
        enricher: LocationEnricher,
    ) -> Self {
        let session = SessionState::new(config);
        Self {
            session,
            composer,
            dispatcher,
            enricher,
            concurrent: true,
        }
    }

    /// Process photos one at a time instead of on the blocking pool.
    pub fn sequential(mut self, sequential: bool) -> Self {
        self.concurrent = !sequential;
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    pub fn begin(&mut self, facility_name: &str, reporter_name: &str) {
        self.session.set_facility_name(facility_name);
        self.session.set_reporter_name(reporter_name);
    }

    /// Capture one frame per draft, in order.
    pub fn capture_all(&mut self, frames: &dyn FrameSource, drafts: &[CaptureDraft]) -> Result<usize> {
        for draft in drafts {
            self.session.set_draft(*draft);
            self.session.capture(frames.next_frame()?)?;
        }
        Ok(self.session.store().len())
    }

    /// Resolve the session location; failures fall back to raw coordinates.
    pub async fn locate(&mut self, coords: Coordinates) -> bool {
        self.enricher.enrich_session(&mut self.session, coords).await
    }

    /// Run one export. Ok(None) means the session was reset while the export
    /// ran and the result was discarded.
    #[instrument(skip(self), fields(session = %self.session.id()))]
    pub async fn export(&mut self, sink: SinkKind) -> Result<Option<DispatchReceipt>> {
        let ticket = self.session.begin_export()?;
        let snapshot = self.session.snapshot();

        let outcome = self.run_export(sink, &snapshot).await;

        if !self.session.finish_export(ticket) {
            return Ok(None);
        }
        match outcome {
            Ok(receipt) => {
                info!(%sink, bytes = receipt.bytes, sha256 = %receipt.sha256, "export finished");
                Ok(Some(receipt))
            }
            Err(err) => {
                warn!(%sink, error = %err, "export failed, session kept for retry");
                Err(err)
            }
        }
    }

    async fn run_export(&self, sink: SinkKind, snapshot: &SessionSnapshot) -> Result<DispatchReceipt> {
        let now = Local::now().naive_local();
        match sink {
            SinkKind::Archive => self.dispatcher.export_archive(snapshot, now),
            SinkKind::File => {
                let pdf = self.render_pdf(snapshot).await?;
                self.dispatcher.export_file(&pdf, &snapshot.facility_name, now)
            }
            SinkKind::Message => {
                let pdf = self.render_pdf(snapshot).await?;
                self.dispatcher.send_message(&pdf).await
            }
        }
    }

    async fn render_pdf(&self, snapshot: &SessionSnapshot) -> Result<Vec<u8>> {
        let document = if self.concurrent {
            self.composer
                .compose_concurrent(
                    snapshot.observations.as_slice(),
                    &snapshot.location,
                    &snapshot.facility_name,
                    &snapshot.reporter_name,
                )
                .await?
        } else {
            self.composer.compose_snapshot(snapshot)?
        };
        tokio::task::spawn_blocking(move || PdfWriter::new().render(&document))
            .await
            .map_err(|err| RundgangError::Pdf(format!("render task failed: {err}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::{DynamicImage, Rgb, RgbImage};
    use rundgang_bridge::{BearerToken, FileFrameSource, StaticCredentialSource};
    use rundgang_core::config::MessageConfig;
    use rundgang_core::types::{CaptureType, Condition, FloorNumber, PaperSize};
    use rundgang_dispatch::{MessageTransport, RetryConfig};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MessageTransport for CountingTransport {
        async fn send(&self, _token: &BearerToken, _raw: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn service(out: &Path, token: Option<BearerToken>, transport: Arc<CountingTransport>) -> ReportService {
        let message = MessageConfig {
            to: vec!["ops@example.org".into()],
            ..MessageConfig::default()
        };
        let dispatcher = ExportDispatcher::new(
            out,
            message,
            Arc::new(StaticCredentialSource::new(token)),
            transport,
        )
        .with_retry(RetryConfig::with_max_retries(0));
        ReportService::with_parts(
            SessionConfig::default(),
            ReportComposer::new(PaperSize::A4),
            dispatcher,
            LocationEnricher::offline(),
        )
    }

    fn write_photo(dir: &Path, name: &str, shade: u8) -> PathBuf {
        let path = dir.join(name);
        DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb([shade, 90, 30])))
            .save(&path)
            .unwrap();
        path
    }

    fn drafts() -> Vec<CaptureDraft> {
        vec![
            CaptureDraft {
                capture_type: CaptureType::Floor,
                condition: Condition::Dirty,
                floor_number: FloorNumber::new(3).unwrap(),
            },
            CaptureDraft {
                capture_type: CaptureType::Restroom,
                condition: Condition::Clean,
                floor_number: FloorNumber::new(1).unwrap(),
            },
        ]
    }

    fn captured(out: &Path, photos: &Path, token: Option<BearerToken>, transport: Arc<CountingTransport>) -> ReportService {
        let mut svc = service(out, token, transport);
        svc.begin("Tower A", "Jane");
        let frames = FileFrameSource::new([
            write_photo(photos, "one.png", 10),
            write_photo(photos, "two.png", 200),
        ]);
        assert_eq!(svc.capture_all(&frames, &drafts()).unwrap(), 2);
        svc
    }

    #[tokio::test]
    async fn file_export_writes_cover_plus_one_page_per_photo() {
        let out = tempfile::tempdir().unwrap();
        let photos = tempfile::tempdir().unwrap();
        let mut svc = captured(out.path(), photos.path(), None, Arc::default());
        svc.locate(Coordinates { latitude: 1.0, longitude: 2.0 }).await;

        let receipt = svc.export(SinkKind::File).await.unwrap().unwrap();
        let path = receipt.path.unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("Tower_A_"));

        let pdf = lopdf::Document::load(&path).unwrap();
        assert_eq!(pdf.get_pages().len(), 3);
        assert!(!svc.session().is_exporting());
    }

    #[tokio::test]
    async fn sequential_export_renders_every_page() {
        let out = tempfile::tempdir().unwrap();
        let photos = tempfile::tempdir().unwrap();
        let mut svc = captured(out.path(), photos.path(), None, Arc::default()).sequential(true);
        let receipt = svc.export(SinkKind::File).await.unwrap().unwrap();
        let pdf = lopdf::Document::load(receipt.path.unwrap()).unwrap();
        assert_eq!(pdf.get_pages().len(), 3);
    }

    #[tokio::test]
    async fn archive_export_keeps_raw_photos() {
        let out = tempfile::tempdir().unwrap();
        let photos = tempfile::tempdir().unwrap();
        let mut svc = captured(out.path(), photos.path(), None, Arc::default());
        let receipt = svc.export(SinkKind::Archive).await.unwrap().unwrap();
        let name = receipt.path.unwrap().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("Jane_Tower_A_") && name.ends_with(".zip"));
    }

    #[tokio::test]
    async fn empty_session_exports_nothing() {
        let out = tempfile::tempdir().unwrap();
        let mut svc = service(out.path(), None, Arc::default());
        for sink in [SinkKind::File, SinkKind::Archive, SinkKind::Message] {
            assert!(matches!(svc.export(sink).await, Err(RundgangError::EmptyExport)));
        }
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_message_leaves_session_ready_for_retry() {
        let out = tempfile::tempdir().unwrap();
        let photos = tempfile::tempdir().unwrap();
        let transport = Arc::new(CountingTransport::default());
        let mut svc = captured(out.path(), photos.path(), None, transport.clone());

        let err = svc.export(SinkKind::Message).await.unwrap_err();
        assert!(matches!(err, RundgangError::Auth(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(svc.session().store().len(), 2);
        assert!(!svc.session().is_exporting());
    }

    #[tokio::test]
    async fn message_export_sends_once() {
        let out = tempfile::tempdir().unwrap();
        let photos = tempfile::tempdir().unwrap();
        let transport = Arc::new(CountingTransport::default());
        let mut svc = captured(out.path(), photos.path(), Some(BearerToken::new("tok")), transport.clone());

        let receipt = svc.export(SinkKind::Message).await.unwrap().unwrap();
        assert_eq!(receipt.sink, SinkKind::Message);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_export_is_refused_while_one_runs() {
        let out = tempfile::tempdir().unwrap();
        let photos = tempfile::tempdir().unwrap();
        let mut svc = captured(out.path(), photos.path(), None, Arc::default());

        let ticket = svc.session_mut().begin_export().unwrap();
        assert!(matches!(svc.export(SinkKind::File).await, Err(RundgangError::ExportInProgress)));
        assert!(svc.session_mut().finish_export(ticket));
    }

    #[test]
    fn running_out_of_frames_is_a_capture_failure() {
        let out = tempfile::tempdir().unwrap();
        let mut svc = service(out.path(), None, Arc::default());
        let frames = FileFrameSource::new(Vec::<PathBuf>::new());
        assert!(matches!(
            svc.capture_all(&frames, &drafts()),
            Err(RundgangError::Capture(_))
        ));
        assert!(svc.session().store().is_empty());
    }
}
