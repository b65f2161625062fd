//! Message types for queue operations including core domain identifiers.

use crate::error::{SerializationError, ValidationError};
use crate::provider::ProviderType;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Validated queue name following the storage service naming rules
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: String) -> Result<Self, ValidationError> {
        if name.len() < 3 || name.len() > 63 {
            return Err(ValidationError::OutOfRange {
                field: "queue_name".to_string(),
                message: "must be 3-63 characters".to_string(),
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "only lowercase ASCII letters, digits, and hyphens allowed".to_string(),
            });
        }

        if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "no leading/trailing hyphens or consecutive hyphens".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for QueueName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QueueName> for String {
    fn from(name: QueueName) -> Self {
        name.0
    }
}

/// Service-assigned identifier of a message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Generate new random message ID
    pub fn new() -> Self {
        let id = uuid::Uuid::new_v4();
        Self(id.to_string())
    }

    /// Get message ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "message_id".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

/// Timestamp wrapper for consistent time handling
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create timestamp from DateTime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Create timestamp offset from now, saturating at the representable range
    pub fn after(duration: Duration) -> Self {
        Self::now().saturating_add(duration)
    }

    /// Offset this timestamp, saturating at the representable range
    pub fn saturating_add(&self, duration: Duration) -> Self {
        match self.0.checked_add_signed(duration) {
            Some(dt) => Self(dt),
            None if duration < Duration::zero() => Self(DateTime::<Utc>::MIN_UTC),
            None => Self(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Parse an RFC 1123 date as used by the storage REST API
    /// (`Fri, 09 Oct 2009 21:04:30 GMT`)
    pub fn parse_http_date(value: &str) -> Result<Self, SerializationError> {
        DateTime::parse_from_rfc2822(value)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| SerializationError::MalformedResponse {
                message: format!("invalid date '{}': {}", value, e),
            })
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dt = s.parse::<DateTime<Utc>>()?;
        Ok(Self::from_datetime(dt))
    }
}

// ============================================================================
// Queue Types
// ============================================================================

/// Reference to a queue that exists (or existed) on the service
///
/// Handles are cheap identities: two handles for the same queue on the same
/// provider compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueHandle {
    name: QueueName,
    provider_type: ProviderType,
}

impl QueueHandle {
    /// Reference a queue without contacting the service
    pub fn new(name: QueueName, provider_type: ProviderType) -> Self {
        Self {
            name,
            provider_type,
        }
    }

    /// Get the queue name
    pub fn name(&self) -> &QueueName {
        &self.name
    }

    /// Get provider type that owns the queue
    pub fn provider_type(&self) -> ProviderType {
        self.provider_type
    }
}

impl std::fmt::Display for QueueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Queue attributes fetched from the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueProperties {
    /// Best-effort, eventually consistent count of messages in the queue
    pub approximate_message_count: u64,
}

// ============================================================================
// Message Types
// ============================================================================

/// Time-to-live, in seconds, that keeps a message until it is deleted
pub const NEVER_EXPIRES_SECONDS: i64 = -1;

/// Check whether a time-to-live means the message never expires
pub fn never_expires(ttl: Duration) -> bool {
    ttl == Duration::seconds(NEVER_EXPIRES_SECONDS)
}

/// A message to be sent through the queue system
#[derive(Debug, Clone)]
pub struct Message {
    pub body: Bytes,
    pub time_to_live: Option<Duration>,
    pub initial_visibility_delay: Option<Duration>,
}

impl Message {
    /// Create new message with body
    pub fn new(body: Bytes) -> Self {
        Self {
            body,
            time_to_live: None,
            initial_visibility_delay: None,
        }
    }

    /// Create new message from text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(Bytes::from(text.into()))
    }

    /// Add time-to-live for message expiration
    ///
    /// The service counts in whole seconds: a TTL must be at least one
    /// second, or exactly `Duration::seconds(NEVER_EXPIRES_SECONDS)` for a
    /// message that never expires. Zero and other negative values are
    /// rejected by the client.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Keep the message until it is deleted
    pub fn without_expiry(self) -> Self {
        self.with_ttl(Duration::seconds(NEVER_EXPIRES_SECONDS))
    }

    /// Keep the message invisible for a while after it is enqueued
    pub fn with_visibility_delay(mut self, delay: Duration) -> Self {
        self.initial_visibility_delay = Some(delay);
        self
    }
}

/// Result of a successful enqueue
#[derive(Debug, Clone)]
pub struct EnqueuedMessage {
    pub message_id: MessageId,
    pub inserted_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

/// A message observed with `peek`; carries no lease
#[derive(Debug, Clone)]
pub struct PeekedMessage {
    pub message_id: MessageId,
    pub body: Bytes,
    pub dequeue_count: u32,
    pub inserted_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

impl PeekedMessage {
    /// Get the body as UTF-8 text
    pub fn body_text(&self) -> Result<&str, SerializationError> {
        std::str::from_utf8(&self.body).map_err(|_| SerializationError::InvalidUtf8)
    }
}

/// A message leased with `dequeue`; must be deleted before the lease expires
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub message_id: MessageId,
    pub body: Bytes,
    pub receipt_handle: ReceiptHandle,
    pub dequeue_count: u32,
    pub inserted_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

impl ReceivedMessage {
    /// Get the body as UTF-8 text
    pub fn body_text(&self) -> Result<&str, SerializationError> {
        std::str::from_utf8(&self.body).map_err(|_| SerializationError::InvalidUtf8)
    }

    /// Convert back to Message (for forwarding)
    pub fn message(&self) -> Message {
        Message::new(self.body.clone())
    }
}

/// Lease token (pop receipt) proving the holder may update or delete a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptHandle {
    queue: QueueName,
    message_id: MessageId,
    pop_receipt: String,
    next_visible_at: Timestamp,
    provider_type: ProviderType,
}

impl ReceiptHandle {
    /// Create new receipt handle
    pub fn new(
        queue: QueueName,
        message_id: MessageId,
        pop_receipt: String,
        next_visible_at: Timestamp,
        provider_type: ProviderType,
    ) -> Self {
        Self {
            queue,
            message_id,
            pop_receipt,
            next_visible_at,
            provider_type,
        }
    }

    /// Queue the leased message lives in
    pub fn queue(&self) -> &QueueName {
        &self.queue
    }

    /// Identifier of the leased message
    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    /// Opaque pop receipt issued by the service
    pub fn pop_receipt(&self) -> &str {
        &self.pop_receipt
    }

    /// Time at which the message becomes visible to other consumers
    pub fn next_visible_at(&self) -> &Timestamp {
        &self.next_visible_at
    }

    /// Check if the lease has run out
    pub fn is_expired(&self) -> bool {
        Timestamp::now() >= self.next_visible_at
    }

    /// Get time until the lease runs out
    pub fn time_until_expiry(&self) -> Duration {
        let now = Timestamp::now();
        if now >= self.next_visible_at {
            Duration::zero()
        } else {
            self.next_visible_at.as_datetime() - now.as_datetime()
        }
    }

    /// Get provider type
    pub fn provider_type(&self) -> ProviderType {
        self.provider_type
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
