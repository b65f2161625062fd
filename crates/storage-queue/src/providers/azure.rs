//! Azure Queue Storage provider implementation using the HTTP REST API.
//!
//! Requests go straight to the queue service endpoint of a storage account,
//! which keeps the provider testable against a mocked HTTP server and works
//! unchanged against the local storage emulator.
//!
//! ## Authentication
//!
//! - **Shared key**: every request is signed with HMAC-SHA256 over the
//!   canonical request using the decoded account key
//! - **Shared access signature**: the SAS token is appended to the query string
//!
//! ## Message Encoding
//!
//! Message bodies are base64-encoded inside `<MessageText>` so arbitrary bytes
//! survive the XML round trip. The size limit applies to the encoded form.
//!
//! ## Example
//!
//! ```no_run
//! use storage_queue::{QueueClientFactory, QueueConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = QueueConfig::azure_storage("UseDevelopmentStorage=true");
//! let client = QueueClientFactory::create_client(config)?;
//! # Ok(())
//! # }
//! ```

use crate::account::{StorageAccount, StorageCredential};
use crate::client::QueueProvider;
use crate::error::{ConfigurationError, QueueError, SerializationError};
use crate::message::{
    EnqueuedMessage, Message, MessageId, PeekedMessage, QueueName, QueueProperties,
    ReceiptHandle, ReceivedMessage, Timestamp,
};
use crate::provider::ProviderType;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::HeaderMap;
use reqwest::{Client as HttpClient, Method, StatusCode};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
use url::Url;

#[cfg(test)]
#[path = "azure_tests.rs"]
mod tests;

/// REST API version sent with every request
pub const STORAGE_API_VERSION: &str = "2019-12-12";

const PROVIDER_NAME: &str = "AzureStorage";

// ============================================================================
// Shared Key Signing
// ============================================================================

type HmacSha256 = Hmac<Sha256>;

/// Shared Key signer for request authorization
///
/// Signing process:
/// 1. Build the string to sign from the verb, standard headers,
///    canonicalized `x-ms-*` headers and canonicalized resource
/// 2. HMAC-SHA256 it with the decoded account key
/// 3. Send `Authorization: SharedKey {account}:{base64 signature}`
///
/// ## References
///
/// - [Authorize with Shared Key](https://learn.microsoft.com/rest/api/storageservices/authorize-with-shared-key)
#[derive(Clone)]
struct SharedKeySigner {
    account_name: String,
    key: zeroize::Zeroizing<Vec<u8>>,
}

impl SharedKeySigner {
    fn new(account_name: String, key: zeroize::Zeroizing<Vec<u8>>) -> Self {
        Self { account_name, key }
    }

    /// Build the `Authorization` header value for a request
    fn authorization(
        &self,
        method: &Method,
        url: &Url,
        content_length: usize,
        content_type: Option<&str>,
        ms_headers: &[(&str, String)],
        query: &[(&str, String)],
    ) -> Result<String, QueueError> {
        let resource = canonicalized_resource(&self.account_name, url, query);
        let string_to_sign =
            string_to_sign(method, content_length, content_type, ms_headers, &resource);

        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|e| {
            QueueError::AuthenticationFailed {
                message: format!("account key rejected by HMAC: {}", e),
            }
        })?;
        mac.update(string_to_sign.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        Ok(format!("SharedKey {}:{}", self.account_name, signature))
    }
}

/// Compose the Shared Key string to sign
///
/// Standard headers this provider never sends stay as empty lines.
pub(crate) fn string_to_sign(
    method: &Method,
    content_length: usize,
    content_type: Option<&str>,
    ms_headers: &[(&str, String)],
    canonicalized_resource: &str,
) -> String {
    let content_length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };

    let mut headers: Vec<(String, &str)> = ms_headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim()))
        .collect();
    headers.sort_by(|a, b| a.0.cmp(&b.0));
    let canonicalized_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect();

    format!(
        "{verb}\n\n\n{length}\n\n{content_type}\n\n\n\n\n\n\n{headers}{resource}",
        verb = method.as_str(),
        length = content_length,
        content_type = content_type.unwrap_or_default(),
        headers = canonicalized_headers,
        resource = canonicalized_resource,
    )
}

/// `/{account}{path}` followed by sorted `\nname:value` query parameters
pub(crate) fn canonicalized_resource(
    account_name: &str,
    url: &Url,
    query: &[(&str, String)],
) -> String {
    let mut resource = format!("/{}{}", account_name, url.path());

    let mut params: Vec<(String, &str)> = query
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.as_str()))
        .collect();
    params.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, value) in params {
        resource.push('\n');
        resource.push_str(&name);
        resource.push(':');
        resource.push_str(value);
    }

    resource
}

// ============================================================================
// Response Parsing
// ============================================================================

/// Raw fields of a `<QueueMessage>` element
#[derive(Debug, Default)]
struct QueueMessageXml {
    message_id: Option<String>,
    insertion_time: Option<String>,
    expiration_time: Option<String>,
    pop_receipt: Option<String>,
    time_next_visible: Option<String>,
    dequeue_count: Option<String>,
    message_text: Option<String>,
}

impl QueueMessageXml {
    fn set_field(&mut self, element: &[u8], text: String) {
        match element {
            b"MessageId" => self.message_id = Some(text),
            b"InsertionTime" => self.insertion_time = Some(text),
            b"ExpirationTime" => self.expiration_time = Some(text),
            b"PopReceipt" => self.pop_receipt = Some(text),
            b"TimeNextVisible" => self.time_next_visible = Some(text),
            b"DequeueCount" => self.dequeue_count = Some(text),
            b"MessageText" => self.message_text = Some(text),
            _ => {}
        }
    }

    fn message_id(&self) -> Result<MessageId, SerializationError> {
        self.message_id
            .as_deref()
            .and_then(|id| MessageId::from_str(id).ok())
            .ok_or_else(|| missing_field("MessageId"))
    }

    fn inserted_at(&self) -> Result<Timestamp, SerializationError> {
        let value = self
            .insertion_time
            .as_deref()
            .ok_or_else(|| missing_field("InsertionTime"))?;
        Timestamp::parse_http_date(value)
    }

    fn expires_at(&self) -> Result<Option<Timestamp>, SerializationError> {
        self.expiration_time
            .as_deref()
            .map(Timestamp::parse_http_date)
            .transpose()
    }

    fn dequeue_count(&self) -> Result<u32, SerializationError> {
        match self.dequeue_count.as_deref() {
            None => Ok(0),
            Some(value) => value
                .parse()
                .map_err(|_| SerializationError::MalformedResponse {
                    message: format!("invalid DequeueCount '{}'", value),
                }),
        }
    }

    fn body(&self) -> Result<Bytes, SerializationError> {
        let text = self.message_text.as_deref().unwrap_or_default();
        STANDARD
            .decode(text)
            .map(Bytes::from)
            .map_err(|e| SerializationError::InvalidBase64 {
                message: e.to_string(),
            })
    }

    fn into_enqueued(self) -> Result<EnqueuedMessage, SerializationError> {
        Ok(EnqueuedMessage {
            message_id: self.message_id()?,
            inserted_at: self.inserted_at()?,
            expires_at: self.expires_at()?,
        })
    }

    fn into_peeked(self) -> Result<PeekedMessage, SerializationError> {
        Ok(PeekedMessage {
            message_id: self.message_id()?,
            body: self.body()?,
            dequeue_count: self.dequeue_count()?,
            inserted_at: self.inserted_at()?,
            expires_at: self.expires_at()?,
        })
    }

    fn into_received(self, queue: &QueueName) -> Result<ReceivedMessage, SerializationError> {
        let message_id = self.message_id()?;
        let pop_receipt = self
            .pop_receipt
            .clone()
            .ok_or_else(|| missing_field("PopReceipt"))?;
        let next_visible_at = Timestamp::parse_http_date(
            self.time_next_visible
                .as_deref()
                .ok_or_else(|| missing_field("TimeNextVisible"))?,
        )?;

        Ok(ReceivedMessage {
            receipt_handle: ReceiptHandle::new(
                queue.clone(),
                message_id.clone(),
                pop_receipt,
                next_visible_at,
                ProviderType::AzureStorage,
            ),
            message_id,
            body: self.body()?,
            dequeue_count: self.dequeue_count()?,
            inserted_at: self.inserted_at()?,
            expires_at: self.expires_at()?,
        })
    }
}

fn missing_field(name: &str) -> SerializationError {
    SerializationError::MalformedResponse {
        message: format!("{} missing from QueueMessage", name),
    }
}

/// Parse a `<QueueMessagesList>` response body
fn parse_message_list(xml: &str) -> Result<Vec<QueueMessageXml>, SerializationError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut messages = Vec::new();
    let mut current: Option<QueueMessageXml> = None;
    let mut element: Option<Vec<u8>> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if e.name().as_ref() == b"QueueMessage" {
                    current = Some(QueueMessageXml::default());
                } else {
                    element = Some(e.name().as_ref().to_vec());
                }
            }
            Ok(Event::Text(e)) => {
                if let (Some(message), Some(name)) = (current.as_mut(), element.as_deref()) {
                    let text = e
                        .unescape()
                        .map_err(|e| SerializationError::MalformedResponse {
                            message: format!("XML parsing error: {}", e),
                        })?
                        .into_owned();
                    message.set_field(name, text);
                }
            }
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == b"QueueMessage" {
                    if let Some(message) = current.take() {
                        messages.push(message);
                    }
                }
                element = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SerializationError::MalformedResponse {
                    message: format!("XML parsing error: {}", e),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(messages)
}

/// Pull `Code` and `Message` out of an `<Error>` body
fn parse_error_body(xml: &str) -> (Option<String>, Option<String>) {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut code = None;
    let mut message = None;
    let mut in_code = false;
    let mut in_message = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"Code" => in_code = true,
                b"Message" => in_message = true,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_code {
                    code = e.unescape().ok().map(|s| s.into_owned());
                    in_code = false;
                } else if in_message {
                    message = e.unescape().ok().map(|s| s.into_owned());
                    in_message = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    (code, message)
}

/// Message body wrapper expected by Put Message and Update Message
fn message_body_xml(body: &Bytes) -> String {
    format!(
        "<QueueMessage><MessageText>{}</MessageText></QueueMessage>",
        STANDARD.encode(body)
    )
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// ============================================================================
// Azure Storage Queue Provider
// ============================================================================

/// What a failed request was addressing, used to build precise errors
struct RequestTarget<'a> {
    queue: Option<&'a QueueName>,
    message_id: Option<&'a MessageId>,
}

impl<'a> RequestTarget<'a> {
    fn queue(queue: &'a QueueName) -> Self {
        Self {
            queue: Some(queue),
            message_id: None,
        }
    }

    fn message(receipt: &'a ReceiptHandle) -> Self {
        Self {
            queue: Some(receipt.queue()),
            message_id: Some(receipt.message_id()),
        }
    }

    fn queue_name(&self) -> String {
        self.queue.map(|q| q.to_string()).unwrap_or_default()
    }

    fn message_id(&self) -> String {
        self.message_id.map(|m| m.to_string()).unwrap_or_default()
    }
}

/// Status, headers and body of a completed request
struct StorageResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

/// Azure Queue Storage provider implementation
///
/// The provider is thread-safe and can be shared across async tasks; the
/// underlying HTTP client pools connections.
pub struct AzureStorageQueueProvider {
    http_client: HttpClient,
    account: StorageAccount,
    signer: Option<SharedKeySigner>,
    request_timeout: Duration,
}

impl AzureStorageQueueProvider {
    /// Create new provider for a storage account
    ///
    /// `request_timeout` bounds each HTTP round trip; zero disables the bound.
    pub fn new(account: StorageAccount, request_timeout: Duration) -> Result<Self, QueueError> {
        let mut builder = HttpClient::builder();
        if let Ok(timeout) = request_timeout.to_std() {
            if !timeout.is_zero() {
                builder = builder.timeout(timeout);
            }
        }
        let http_client = builder.build().map_err(|e| {
            QueueError::ConfigurationError(ConfigurationError::Invalid {
                message: format!("failed to create HTTP client: {}", e),
            })
        })?;

        let signer = match account.credential() {
            StorageCredential::SharedKey { key } => Some(SharedKeySigner::new(
                account.account_name().to_string(),
                key.clone(),
            )),
            StorageCredential::SharedAccessSignature { .. } => None,
        };

        Ok(Self {
            http_client,
            account,
            signer,
            request_timeout,
        })
    }

    /// Build the request URL from path segments below the queue endpoint
    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, QueueError> {
        let invalid = |message: String| {
            QueueError::ConfigurationError(ConfigurationError::Invalid { message })
        };

        let mut url = Url::parse(self.account.queue_endpoint())
            .map_err(|e| invalid(format!("invalid queue endpoint: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| invalid("queue endpoint cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);

        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        if let StorageCredential::SharedAccessSignature { token } = self.account.credential() {
            let combined = match url.query() {
                Some(existing) => format!("{}&{}", existing, token.as_str()),
                None => token.as_str().to_string(),
            };
            url.set_query(Some(&combined));
        }

        Ok(url)
    }

    /// Send a signed request and collect the response
    ///
    /// Non-success statuses are returned as-is; callers decide which of them
    /// are acceptable before mapping the rest with [`Self::error_from_response`].
    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<String>,
    ) -> Result<StorageResponse, QueueError> {
        let url = self.url(segments, query)?;
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let ms_headers = [
            ("x-ms-date", date),
            ("x-ms-version", STORAGE_API_VERSION.to_string()),
        ];
        let content_type = body.as_ref().map(|_| "application/xml");
        let content_length = body.as_ref().map(String::len).unwrap_or(0);

        let mut request = self.http_client.request(method.clone(), url.clone());
        for (name, value) in &ms_headers {
            request = request.header(*name, value.as_str());
        }

        if let Some(signer) = &self.signer {
            let authorization = signer.authorization(
                &method,
                &url,
                content_length,
                content_type,
                &ms_headers,
                query,
            )?;
            request = request.header(reqwest::header::AUTHORIZATION, authorization);
        }

        if let (Some(body), Some(content_type)) = (body, content_type) {
            request = request
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(body);
        }

        debug!(method = %method, path = %url.path(), "Sending storage request");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                QueueError::Timeout {
                    duration: self.request_timeout,
                }
            } else if e.is_connect() {
                QueueError::ConnectionFailed {
                    message: format!("cannot reach {}: {}", self.account.queue_endpoint(), e),
                }
            } else {
                QueueError::ConnectionFailed {
                    message: format!("HTTP request failed: {}", e),
                }
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| QueueError::ConnectionFailed {
                message: format!("failed to read response body: {}", e),
            })?;

        Ok(StorageResponse {
            status,
            headers,
            body,
        })
    }

    /// Map a failed response to the matching QueueError
    fn error_from_response(response: &StorageResponse, target: &RequestTarget<'_>) -> QueueError {
        let (body_code, body_message) = parse_error_body(&response.body);
        let code = header_value(&response.headers, "x-ms-error-code")
            .map(str::to_string)
            .or(body_code)
            .unwrap_or_else(|| response.status.as_str().to_string());
        let message = body_message
            .map(|m| m.lines().next().unwrap_or_default().to_string())
            .unwrap_or_else(|| {
                response
                    .status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        match code.as_str() {
            "QueueNotFound" => QueueError::QueueNotFound {
                queue_name: target.queue_name(),
            },
            "QueueBeingDeleted" => QueueError::QueueBeingDeleted {
                queue_name: target.queue_name(),
            },
            "MessageNotFound" => QueueError::MessageNotFound {
                message_id: target.message_id(),
            },
            "PopReceiptMismatch" => QueueError::LeaseExpired {
                message_id: target.message_id(),
            },
            "AuthenticationFailed" | "AuthorizationFailure" => {
                QueueError::AuthenticationFailed { message }
            }
            _ if response.status == StatusCode::UNAUTHORIZED
                || response.status == StatusCode::FORBIDDEN =>
            {
                QueueError::AuthenticationFailed {
                    message: format!("{}: {}", code, message),
                }
            }
            _ => QueueError::ProviderError {
                provider: PROVIDER_NAME.to_string(),
                code,
                message,
            },
        }
    }

    fn expect_status(
        response: &StorageResponse,
        accepted: &[StatusCode],
        target: &RequestTarget<'_>,
    ) -> Result<(), QueueError> {
        if accepted.contains(&response.status) {
            Ok(())
        } else {
            Err(Self::error_from_response(response, target))
        }
    }
}

impl fmt::Debug for AzureStorageQueueProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureStorageQueueProvider")
            .field("account", &self.account.account_name())
            .field("endpoint", &self.account.queue_endpoint())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[async_trait]
impl QueueProvider for AzureStorageQueueProvider {
    async fn create_queue(&self, queue: &QueueName) -> Result<(), QueueError> {
        let response = self
            .send(Method::PUT, &[queue.as_str()], &[], None)
            .await?;

        match response.status {
            StatusCode::CREATED => {
                debug!(queue = %queue, "Queue created");
                Ok(())
            }
            StatusCode::NO_CONTENT => Ok(()),
            StatusCode::CONFLICT
                if header_value(&response.headers, "x-ms-error-code")
                    == Some("QueueAlreadyExists") =>
            {
                // Exists with different metadata; still usable
                Ok(())
            }
            _ => Err(Self::error_from_response(
                &response,
                &RequestTarget::queue(queue),
            )),
        }
    }

    async fn get_properties(&self, queue: &QueueName) -> Result<QueueProperties, QueueError> {
        let query = [("comp", "metadata".to_string())];
        let response = self
            .send(Method::GET, &[queue.as_str()], &query, None)
            .await?;
        Self::expect_status(&response, &[StatusCode::OK], &RequestTarget::queue(queue))?;

        let count = header_value(&response.headers, "x-ms-approximate-messages-count")
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| SerializationError::MalformedResponse {
                message: "x-ms-approximate-messages-count header missing".to_string(),
            })?;

        Ok(QueueProperties {
            approximate_message_count: count,
        })
    }

    async fn put_message(
        &self,
        queue: &QueueName,
        message: &Message,
    ) -> Result<EnqueuedMessage, QueueError> {
        let mut query = Vec::new();
        if let Some(delay) = message.initial_visibility_delay {
            query.push(("visibilitytimeout", delay.num_seconds().to_string()));
        }
        if let Some(ttl) = message.time_to_live {
            query.push(("messagettl", ttl.num_seconds().to_string()));
        }

        let response = self
            .send(
                Method::POST,
                &[queue.as_str(), "messages"],
                &query,
                Some(message_body_xml(&message.body)),
            )
            .await?;
        Self::expect_status(
            &response,
            &[StatusCode::CREATED],
            &RequestTarget::queue(queue),
        )?;

        let entry = parse_message_list(&response.body)?
            .into_iter()
            .next()
            .ok_or_else(|| SerializationError::MalformedResponse {
                message: "QueueMessage missing from Put Message response".to_string(),
            })?;

        Ok(entry.into_enqueued()?)
    }

    async fn peek_messages(
        &self,
        queue: &QueueName,
        max_messages: u32,
    ) -> Result<Vec<PeekedMessage>, QueueError> {
        let query = [
            ("peekonly", "true".to_string()),
            ("numofmessages", max_messages.to_string()),
        ];
        let response = self
            .send(Method::GET, &[queue.as_str(), "messages"], &query, None)
            .await?;
        Self::expect_status(&response, &[StatusCode::OK], &RequestTarget::queue(queue))?;

        let messages = parse_message_list(&response.body)?
            .into_iter()
            .map(QueueMessageXml::into_peeked)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    async fn get_messages(
        &self,
        queue: &QueueName,
        max_messages: u32,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let query = [
            ("numofmessages", max_messages.to_string()),
            (
                "visibilitytimeout",
                visibility_timeout.num_seconds().to_string(),
            ),
        ];
        let response = self
            .send(Method::GET, &[queue.as_str(), "messages"], &query, None)
            .await?;
        Self::expect_status(&response, &[StatusCode::OK], &RequestTarget::queue(queue))?;

        let messages = parse_message_list(&response.body)?
            .into_iter()
            .map(|m| m.into_received(queue))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    async fn update_message(
        &self,
        receipt: &ReceiptHandle,
        new_content: Option<&Bytes>,
        visibility_timeout: Duration,
    ) -> Result<ReceiptHandle, QueueError> {
        let query = [
            ("popreceipt", receipt.pop_receipt().to_string()),
            (
                "visibilitytimeout",
                visibility_timeout.num_seconds().to_string(),
            ),
        ];
        let response = self
            .send(
                Method::PUT,
                &[
                    receipt.queue().as_str(),
                    "messages",
                    receipt.message_id().as_str(),
                ],
                &query,
                new_content.map(message_body_xml),
            )
            .await?;
        Self::expect_status(
            &response,
            &[StatusCode::NO_CONTENT],
            &RequestTarget::message(receipt),
        )?;

        let pop_receipt = header_value(&response.headers, "x-ms-popreceipt")
            .ok_or_else(|| SerializationError::MalformedResponse {
                message: "x-ms-popreceipt header missing".to_string(),
            })?
            .to_string();
        let next_visible_at = match header_value(&response.headers, "x-ms-time-next-visible") {
            Some(value) => Timestamp::parse_http_date(value)?,
            None => {
                warn!("x-ms-time-next-visible header missing; estimating lease end");
                Timestamp::after(visibility_timeout)
            }
        };

        Ok(ReceiptHandle::new(
            receipt.queue().clone(),
            receipt.message_id().clone(),
            pop_receipt,
            next_visible_at,
            ProviderType::AzureStorage,
        ))
    }

    async fn delete_message(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        let query = [("popreceipt", receipt.pop_receipt().to_string())];
        let response = self
            .send(
                Method::DELETE,
                &[
                    receipt.queue().as_str(),
                    "messages",
                    receipt.message_id().as_str(),
                ],
                &query,
                None,
            )
            .await?;
        Self::expect_status(
            &response,
            &[StatusCode::NO_CONTENT],
            &RequestTarget::message(receipt),
        )
    }

    async fn delete_queue(&self, queue: &QueueName) -> Result<(), QueueError> {
        let response = self
            .send(Method::DELETE, &[queue.as_str()], &[], None)
            .await?;
        Self::expect_status(
            &response,
            &[StatusCode::NO_CONTENT],
            &RequestTarget::queue(queue),
        )
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::AzureStorage
    }
}
