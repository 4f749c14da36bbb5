// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mail message sink: builds an RFC 2822 multipart message with the PDF
// attached and posts it to the mail API as `{"raw": <url-safe base64>}`.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use rundgang_bridge::BearerToken;
use rundgang_core::config::MessageConfig;
use rundgang_core::error::{DispatchStage, Result, RundgangError};
use serde::Serialize;
use tracing::{debug, instrument};

/// Line length of the base64 attachment body.
const BASE64_LINE: usize = 76;

/// UTF-8 bytes per RFC 2047 encoded word; keeps each word under 75 chars.
const ENCODED_WORD_BYTES: usize = 45;

/// A report ready to be mailed.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachment_name: String,
    pub attachment: Vec<u8>,
}

impl OutgoingMessage {
    pub fn from_config(config: &MessageConfig, pdf: &[u8]) -> Self {
        Self {
            to: config.to.clone(),
            cc: config.cc.clone(),
            subject: config.subject.clone(),
            body: config.body.clone(),
            attachment_name: config.attachment_name.clone(),
            attachment: pdf.to_vec(),
        }
    }

    /// Render the message with the given multipart boundary.
    pub fn to_mime(&self, boundary: &str) -> String {
        let mut lines: Vec<String> = Vec::new();
        lines.push(format!("To: {}", self.to.join(", ")));
        if !self.cc.is_empty() {
            lines.push(format!("Cc: {}", self.cc.join(", ")));
        }
        lines.push(format!("Subject: {}", encode_header_text(&self.subject)));
        lines.push("MIME-Version: 1.0".into());
        lines.push(format!("Content-Type: multipart/mixed; boundary=\"{boundary}\""));
        lines.push(String::new());
        lines.push(format!("--{boundary}"));
        lines.push("Content-Type: text/plain; charset=UTF-8".into());
        lines.push(String::new());
        lines.push(self.body.clone());
        lines.push(format!("--{boundary}"));
        lines.push(format!("Content-Type: application/pdf; name=\"{}\"", self.attachment_name));
        lines.push("Content-Transfer-Encoding: base64".into());
        lines.push(format!(
            "Content-Disposition: attachment; filename=\"{}\"",
            self.attachment_name
        ));
        lines.push(String::new());
        let encoded = STANDARD.encode(&self.attachment);
        lines.extend(
            encoded
                .as_bytes()
                .chunks(BASE64_LINE)
                .map(|chunk| String::from_utf8_lossy(chunk).into_owned()),
        );
        lines.push(format!("--{boundary}--"));
        lines.join("\r\n")
    }

    /// The whole message, url-safe base64 without padding.
    pub fn encode_raw(&self, boundary: &str) -> String {
        URL_SAFE_NO_PAD.encode(self.to_mime(boundary))
    }
}

/// Header text as-is when ASCII, else RFC 2047 `B` encoded words folded
/// onto continuation lines. Line breaks are flattened to spaces.
fn encode_header_text(text: &str) -> String {
    let text = text.replace(['\r', '\n'], " ");
    if text.is_ascii() {
        return text;
    }
    let mut words: Vec<String> = Vec::new();
    let mut chunk = String::new();
    for ch in text.chars() {
        if chunk.len() + ch.len_utf8() > ENCODED_WORD_BYTES {
            words.push(std::mem::take(&mut chunk));
        }
        chunk.push(ch);
    }
    if !chunk.is_empty() {
        words.push(chunk);
    }
    words
        .iter()
        .map(|word| format!("=?UTF-8?B?{}?=", STANDARD.encode(word)))
        .collect::<Vec<_>>()
        .join("\r\n ")
}

/// Fresh multipart boundary.
pub fn new_boundary() -> String {
    format!("rundgang-{}", uuid::Uuid::new_v4().simple())
}

/// Something that can deliver an encoded message.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Deliver `raw` (url-safe base64 of the full message) using `token`.
    async fn send(&self, token: &BearerToken, raw: &str) -> Result<()>;
}

#[derive(Serialize)]
struct SendRequest<'a> {
    raw: &'a str,
}

/// Mail API over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpMessageTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpMessageTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RundgangError::Config(format!("mail client: {err}")))?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

fn transport_error(err: reqwest::Error) -> RundgangError {
    if err.is_builder() {
        RundgangError::dispatch(DispatchStage::Local, format!("mail request invalid: {err}"))
    } else if err.is_connect() {
        RundgangError::dispatch(DispatchStage::NotSent, format!("mail API unreachable: {err}"))
    } else if err.is_timeout() {
        RundgangError::dispatch(DispatchStage::InFlight, format!("mail request timed out: {err}"))
    } else {
        RundgangError::dispatch(DispatchStage::InFlight, format!("mail request failed: {err}"))
    }
}

#[async_trait]
impl MessageTransport for HttpMessageTransport {
    #[instrument(skip(self, token, raw), fields(endpoint = %self.endpoint, raw_len = raw.len()))]
    async fn send(&self, token: &BearerToken, raw: &str) -> Result<()> {
        let auth = HeaderValue::from_str(&format!("Bearer {}", token.value()))
            .map_err(|err| RundgangError::Auth(format!("invalid auth header: {err}")))?;

        let resp = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, auth)
            .json(&SendRequest { raw })
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "Mail API accepted message");
            return Ok(());
        }
        let code = status.as_u16();
        let detail: String = resp.text().await.unwrap_or_default().chars().take(200).collect();
        if matches!(code, 401 | 403) {
            return Err(RundgangError::Auth(format!(
                "mail API rejected the access token (status {code}): {detail}"
            )));
        }
        Err(RundgangError::dispatch(
            DispatchStage::Status(code),
            format!("mail API returned status {code}: {detail}"),
        ))
    }
}
