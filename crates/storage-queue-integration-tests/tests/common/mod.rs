//! Common test utilities for storage-queue integration tests
//!
//! This module provides:
//! - Queue clients over the in-memory provider and over a mocked storage endpoint
//! - Helpers for building front door state and requests

use axum::{body::Body, http::Request};
use std::sync::Arc;
use storage_queue::{
    QueueClient, QueueClientFactory, QueueConfig, QueueHandle, QueueName, DEVELOPMENT_ACCOUNT_KEY,
};
use storage_queue_api::{AppState, ServiceConfig};

#[allow(dead_code)]
pub const MESSAGE_ID: &str = "5974b586-0df3-4e2d-ad0c-18e3892bfca2";

#[allow(dead_code)]
pub const POP_RECEIPT: &str = "AgAAAAMAAAAAAAAAqk2e5+ev2gE=";

#[allow(dead_code)]
pub fn queue_name(name: &str) -> QueueName {
    QueueName::new(name.to_string()).unwrap()
}

/// Shared in-memory client
#[allow(dead_code)]
pub fn in_memory_client() -> Arc<dyn QueueClient> {
    Arc::from(QueueClientFactory::create_test_client())
}

/// Azure client pointed at `endpoint`, e.g. a wiremock server or a closed port
#[allow(dead_code)]
pub fn azure_client(endpoint: &str) -> Arc<dyn QueueClient> {
    let connection_string = format!(
        "DefaultEndpointsProtocol=http;AccountName=devstoreaccount1;AccountKey={};QueueEndpoint={}/devstoreaccount1",
        DEVELOPMENT_ACCOUNT_KEY, endpoint
    );
    let config = QueueConfig {
        operation_timeout_seconds: 5,
        ..QueueConfig::azure_storage(connection_string)
    };
    Arc::from(QueueClientFactory::create_client(config).unwrap())
}

#[allow(dead_code)]
pub async fn created_queue(client: &dyn QueueClient, name: &str) -> QueueHandle {
    client.ensure_queue(&queue_name(name)).await.unwrap()
}

/// Front door state with default queue names over the given client
#[allow(dead_code)]
pub fn app_state(client: Arc<dyn QueueClient>) -> AppState {
    let mut config = ServiceConfig::default();
    config.storage.in_memory = true;
    AppState::new(config, client).unwrap()
}

#[allow(dead_code)]
pub fn post_name(name: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/DbCallOnQueue")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(name).unwrap()))
        .unwrap()
}

/// `<QueueMessagesList>` body with one entry per `(id, base64 text)`
#[allow(dead_code)]
pub fn message_list(messages: &[(&str, &str)]) -> String {
    let entries: String = messages
        .iter()
        .map(|(id, text)| {
            format!(
                "<QueueMessage><MessageId>{}</MessageId><InsertionTime>Fri, 09 Oct 2009 21:04:30 GMT</InsertionTime><ExpirationTime>Fri, 16 Oct 2009 21:04:30 GMT</ExpirationTime><PopReceipt>{}</PopReceipt><TimeNextVisible>Fri, 09 Oct 2009 23:29:20 GMT</TimeNextVisible><DequeueCount>0</DequeueCount><MessageText>{}</MessageText></QueueMessage>",
                id, POP_RECEIPT, text
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?><QueueMessagesList>{}</QueueMessagesList>",
        entries
    )
}
