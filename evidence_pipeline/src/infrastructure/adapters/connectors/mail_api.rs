// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Mailbox API Connector
//!
//! Pulls a mailbox over an HTTP API speaking OAuth2 client credentials:
//!
//! - token cache refreshed 300 s before expiry; invalidated and
//!   re-acquired exactly once per request on 401
//! - paginated listing driven by the server's continuation token
//! - per-message attachment fetch with base64-decoded payloads and
//!   locally computed checksums
//! - `Retry-After` honored on 429, exponential backoff (2 s base, 10 s
//!   cap, 3 attempts) on transient transport errors
//!
//! Required params: `api_base`, `token_url`, `client_id`, `client_secret`,
//! `mailbox`. Optional: `batch_size` (default 100, max 1000),
//! `max_messages`, `include_attachments` (default true).

use async_stream::try_stream;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use evidence_domain::entities::custody_event::actions;
use evidence_domain::{
    Attachment, Custodian, CustodyEvent, DocumentId, DocumentStream, EvidenceDocument,
    EvidenceError, SourceConnector,
};

use crate::infrastructure::config::ConnectorConfig;
use crate::infrastructure::retry::{retry_async, RetryPolicy};

/// Refresh margin before token expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(300);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BATCH_SIZE: u64 = 1000;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessagePage {
    #[serde(default)]
    pub(crate) messages: Vec<MailMessage>,
    #[serde(default)]
    pub(crate) next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MailAddress {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MailMessage {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) subject: Option<String>,
    #[serde(default)]
    pub(crate) body: Option<String>,
    #[serde(default)]
    pub(crate) from: MailAddress,
    #[serde(default)]
    pub(crate) to: Vec<MailAddress>,
    #[serde(default)]
    pub(crate) cc: Vec<MailAddress>,
    #[serde(default)]
    pub(crate) received_at: Option<String>,
    #[serde(default)]
    pub(crate) internet_message_id: Option<String>,
    #[serde(default)]
    pub(crate) conversation_id: Option<String>,
    #[serde(default)]
    pub(crate) importance: Option<String>,
    #[serde(default)]
    pub(crate) has_attachments: bool,
}

#[derive(Debug, Deserialize)]
struct AttachmentPage {
    #[serde(default)]
    attachments: Vec<MailAttachment>,
}

#[derive(Debug, Deserialize)]
struct MailAttachment {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    content_base64: Option<String>,
}

#[derive(Debug)]
pub struct MailApiConnector {
    name: String,
    api_base: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    mailbox: String,
    batch_size: u64,
    max_messages: Option<u64>,
    include_attachments: bool,
    client: reqwest::Client,
    token_cache: Mutex<Option<CachedToken>>,
}

impl MailApiConnector {
    pub fn new(config: &ConnectorConfig) -> Result<Self, EvidenceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EvidenceError::config(format!("http client: {e}")))?;

        Ok(Self {
            name: config.name.clone(),
            api_base: config.require_str("api_base")?.trim_end_matches('/').to_string(),
            token_url: config.require_str("token_url")?.to_string(),
            client_id: config.require_str("client_id")?.to_string(),
            client_secret: config.require_str("client_secret")?.to_string(),
            mailbox: config.require_str("mailbox")?.to_string(),
            batch_size: config.param_u64("batch_size", 100).min(MAX_BATCH_SIZE),
            max_messages: config.params.get("max_messages").and_then(|v| v.as_u64()),
            include_attachments: config
                .params
                .get("include_attachments")
                .and_then(|v| v.as_bool())
                .unwrap_or(true),
            client,
            token_cache: Mutex::new(None),
        })
    }

    /// Returns a valid access token, refreshing when within the expiry
    /// margin.
    async fn access_token(&self) -> Result<String, EvidenceError> {
        let mut cache = self.token_cache.lock().await;
        if let Some(token) = cache.as_ref() {
            if Instant::now() + TOKEN_REFRESH_MARGIN < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }

        info!("{}: acquiring access token", self.name);
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| EvidenceError::transport(format!("token request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EvidenceError::auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| EvidenceError::auth(format!("token response: {e}")))?;
        let cached = CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        };
        *cache = Some(cached);
        Ok(token.access_token)
    }

    async fn invalidate_token(&self) {
        *self.token_cache.lock().await = None;
    }

    /// One authenticated GET with the 429 / 401 contract applied. Transport
    /// errors propagate as recoverable for the outer backoff wrapper.
    async fn get_json_once<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, EvidenceError> {
        let mut reauthenticated = false;
        let mut rate_limit_retried = false;

        loop {
            let token = self.access_token().await?;
            let response = self
                .client
                .get(url)
                .bearer_auth(&token)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|e| EvidenceError::transport(format!("GET {url}: {e}")))?;

            let status = response.status();

            if status.as_u16() == 429 {
                let retry_after = retry_after_seconds(&response).unwrap_or(60);
                if !rate_limit_retried {
                    warn!("{}: rate limited, waiting {retry_after}s", self.name);
                    tokio::time::sleep(Duration::from_secs(retry_after)).await;
                    rate_limit_retried = true;
                    continue;
                }
                return Err(EvidenceError::rate_limited(
                    format!("GET {url} still rate limited"),
                    Some(retry_after),
                ));
            }

            if status.as_u16() == 401 {
                if !reauthenticated {
                    debug!("{}: token rejected, re-authenticating once", self.name);
                    self.invalidate_token().await;
                    reauthenticated = true;
                    continue;
                }
                return Err(EvidenceError::auth(format!("GET {url} unauthorized")));
            }

            if status.is_server_error() {
                return Err(EvidenceError::transport(format!("GET {url} returned {status}")));
            }
            if !status.is_success() {
                return Err(EvidenceError::parse(format!("GET {url} returned {status}")));
            }

            return response
                .json::<T>()
                .await
                .map_err(|e| EvidenceError::parse(format!("GET {url}: {e}")));
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, EvidenceError> {
        retry_async(RetryPolicy::default(), "mail_api request", || {
            self.get_json_once::<T>(url)
        })
        .await
    }

    async fn fetch_page(&self, page_token: Option<&str>) -> Result<MessagePage, EvidenceError> {
        let mut url = format!(
            "{}/mailboxes/{}/messages?limit={}",
            self.api_base, self.mailbox, self.batch_size
        );
        if let Some(token) = page_token {
            url.push_str("&page_token=");
            url.push_str(token);
        }
        self.get_json(&url).await
    }

    /// Attachment fetch failures degrade to an empty list; the message
    /// itself is still collected.
    async fn fetch_attachments(&self, message_id: &str) -> Vec<Attachment> {
        if !self.include_attachments {
            return Vec::new();
        }
        let url = format!(
            "{}/mailboxes/{}/messages/{}/attachments",
            self.api_base, self.mailbox, message_id
        );
        let page: AttachmentPage = match self.get_json(&url).await {
            Ok(page) => page,
            Err(err) => {
                warn!("{}: attachments for {message_id}: {err}", self.name);
                return Vec::new();
            }
        };

        let mut attachments = Vec::new();
        for entry in page.attachments {
            let Some(encoded) = entry.content_base64 else {
                continue;
            };
            match base64::engine::general_purpose::STANDARD.decode(encoded.as_bytes()) {
                Ok(payload) => attachments.push(Attachment::from_payload(
                    entry.filename.unwrap_or_else(|| "unnamed".to_string()),
                    entry.content_type,
                    payload,
                )),
                Err(err) => {
                    warn!("{}: attachment decode for {message_id}: {err}", self.name);
                }
            }
        }
        attachments
    }

    pub(crate) fn convert_message(
        &self,
        message: &MailMessage,
        attachments: Vec<Attachment>,
    ) -> Result<EvidenceDocument, EvidenceError> {
        let sender = message.from.address.clone().unwrap_or_else(|| "unknown".to_string());
        let mut custodian = Custodian::from_email(&sender);
        if let Some(name) = &message.from.name {
            custodian = custodian.with_display_name(name.clone());
        }

        let collected_at = message
            .received_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let mut document = EvidenceDocument::new(
            DocumentId::new(message.id.clone())?,
            self.name.clone(),
            collected_at,
            custodian,
        )
        .with_metadata("message_id", message.internet_message_id.clone().unwrap_or_default())
        .with_metadata("conversation_id", message.conversation_id.clone().unwrap_or_default())
        .with_metadata(
            "importance",
            message.importance.clone().unwrap_or_else(|| "normal".to_string()),
        )
        .with_metadata("to", join_addresses(&message.to))
        .with_metadata("cc", join_addresses(&message.cc));

        if let Some(subject) = &message.subject {
            document = document.with_subject(subject.clone());
        }
        if let Some(body) = &message.body {
            document = document.with_body_text(body.clone());
        }
        for attachment in attachments {
            document = document.with_attachment(attachment);
        }

        document.record_custody_event(
            CustodyEvent::now(&self.name, actions::COLLECTED)
                .with_metadata("mailbox", self.mailbox.clone()),
        );
        Ok(document)
    }
}

impl SourceConnector for MailApiConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> DocumentStream<'_> {
        Box::pin(try_stream! {
            info!("{}: starting mailbox ingestion for {}", self.name, self.mailbox);
            let mut fetched = 0u64;
            let mut page_token: Option<String> = None;

            'pages: loop {
                let page = self.fetch_page(page_token.as_deref()).await?;
                debug!("{}: fetched page with {} messages", self.name, page.messages.len());

                for message in &page.messages {
                    if self.max_messages.is_some_and(|max| fetched >= max) {
                        info!("{}: reached max_messages cap", self.name);
                        break 'pages;
                    }
                    let attachments = if message.has_attachments {
                        self.fetch_attachments(&message.id).await
                    } else {
                        Vec::new()
                    };
                    match self.convert_message(message, attachments) {
                        Ok(document) => {
                            fetched += 1;
                            yield document;
                        }
                        Err(err) => {
                            warn!("{}: skipping message {}: {err}", self.name, message.id);
                        }
                    }
                }

                match page.next_page_token {
                    Some(token) if !page.messages.is_empty() => page_token = Some(token),
                    _ => break,
                }
            }
            info!("{}: mailbox ingestion complete, {fetched} messages", self.name);
        })
    }
}

fn join_addresses(addresses: &[MailAddress]) -> String {
    addresses
        .iter()
        .filter_map(|a| a.address.as_deref())
        .collect::<Vec<_>>()
        .join(", ")
}

fn retry_after_seconds(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn connector() -> MailApiConnector {
        let params: BTreeMap<String, serde_json::Value> = BTreeMap::from([
            ("api_base".to_string(), "https://mail.example.com/v1/".into()),
            ("token_url".to_string(), "https://login.example.com/token".into()),
            ("client_id".to_string(), "client".into()),
            ("client_secret".to_string(), "secret".into()),
            ("mailbox".to_string(), "legal@example.com".into()),
            ("batch_size".to_string(), serde_json::Value::from(5000u64)),
        ]);
        MailApiConnector::new(&ConnectorConfig {
            r#type: "mail_api".to_string(),
            name: "m365_legal".to_string(),
            enabled: true,
            params,
        })
        .unwrap()
    }

    #[test]
    fn test_batch_size_is_capped() {
        assert_eq!(connector().batch_size, MAX_BATCH_SIZE);
    }

    #[test]
    fn test_missing_required_param_is_config_error() {
        let config = ConnectorConfig {
            r#type: "mail_api".to_string(),
            name: "broken".to_string(),
            enabled: true,
            params: BTreeMap::new(),
        };
        let err = MailApiConnector::new(&config).unwrap_err();
        assert!(matches!(err, EvidenceError::Config(_)));
    }

    #[test]
    fn test_convert_message_builds_document() {
        let message = MailMessage {
            id: "msg-001".to_string(),
            subject: Some("Q3 forecast".to_string()),
            body: Some("Numbers attached.".to_string()),
            from: MailAddress {
                name: Some("Kate Symes".to_string()),
                address: Some("kate.symes@example.com".to_string()),
            },
            to: vec![MailAddress {
                name: None,
                address: Some("desk@example.com".to_string()),
            }],
            cc: vec![],
            received_at: Some("2025-03-01T12:00:00Z".to_string()),
            internet_message_id: Some("<abc@example.com>".to_string()),
            conversation_id: Some("thread-7".to_string()),
            importance: None,
            has_attachments: true,
        };
        let attachment =
            Attachment::from_payload("forecast.txt", Some("text/plain".into()), b"q3".to_vec());

        let document = connector().convert_message(&message, vec![attachment]).unwrap();
        assert_eq!(document.document_id().as_str(), "msg-001");
        assert_eq!(document.source(), "m365_legal");
        assert_eq!(document.custodian().identifier(), "kate.symes");
        assert_eq!(document.metadata().get("to").unwrap(), "desk@example.com");
        assert_eq!(document.metadata().get("importance").unwrap(), "normal");
        assert_eq!(document.attachments().len(), 1);
        assert_eq!(document.chain_of_custody().len(), 1);
        assert_eq!(
            document.collected_at().to_rfc3339(),
            "2025-03-01T12:00:00+00:00"
        );
    }

    #[test]
    fn test_join_addresses() {
        let list = vec![
            MailAddress {
                name: None,
                address: Some("a@example.com".to_string()),
            },
            MailAddress {
                name: None,
                address: None,
            },
            MailAddress {
                name: None,
                address: Some("b@example.com".to_string()),
            },
        ];
        assert_eq!(join_addresses(&list), "a@example.com, b@example.com");
    }

    #[test]
    fn test_message_page_parses_wire_format() {
        let page: MessagePage = serde_json::from_str(
            r#"{"messages": [{"id": "m1", "has_attachments": false}],
                "next_page_token": "cursor-2"}"#,
        )
        .unwrap();
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.next_page_token.as_deref(), Some("cursor-2"));
    }
}
