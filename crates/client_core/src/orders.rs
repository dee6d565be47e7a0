use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::{Order, OrderId},
    protocol::OrderWritePayload,
};
use tracing::warn;

use crate::{error::ApiClientError, transport::ApiTransport};

const ORDERS_PATH: &str = "/api/orders";

/// Typed adapter over the order endpoints. Collection reads are
/// envelope-agnostic: the backend has returned both a bare array and a
/// `{"member": [...]}` wrapper across revisions.
#[derive(Clone)]
pub struct OrderQueryService {
    transport: Arc<ApiTransport>,
}

impl OrderQueryService {
    pub fn new(transport: Arc<ApiTransport>) -> Self {
        Self { transport }
    }

    /// Lists orders, optionally filtered by day and free-text search term.
    /// Blank filters are omitted from the query string.
    pub async fn list(
        &self,
        date_filter: Option<&str>,
        search_term: Option<&str>,
    ) -> Result<Vec<Order>, ApiClientError> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(date) = date_filter.filter(|d| !d.trim().is_empty()) {
            query.push(("date", date));
        }
        let trimmed = search_term.map(str::trim);
        if let Some(term) = trimmed.filter(|t| !t.is_empty()) {
            query.push(("search", term));
        }

        let value = self.transport.get_value(ORDERS_PATH, &query).await?;
        normalize_collection(value)
    }

    pub async fn get(&self, id: OrderId) -> Result<Order, ApiClientError> {
        self.transport
            .get_json(&format!("{ORDERS_PATH}/{}", id.0))
            .await
    }

    pub async fn create(&self, payload: &OrderWritePayload) -> Result<Order, ApiClientError> {
        self.transport.post_json(ORDERS_PATH, payload).await
    }

    pub async fn update(
        &self,
        id: OrderId,
        payload: &OrderWritePayload,
    ) -> Result<Order, ApiClientError> {
        self.transport
            .put_json(&format!("{ORDERS_PATH}/{}", id.0), payload)
            .await
    }

    pub async fn delete(&self, id: OrderId) -> Result<(), ApiClientError> {
        self.transport
            .delete(&format!("{ORDERS_PATH}/{}", id.0))
            .await
    }
}

/// Normalizes a collection response into a plain ordered sequence. An
/// object without the expected `member` field is logged and treated as
/// empty rather than failed; the rest of the page keeps working.
fn normalize_collection(value: Value) -> Result<Vec<Order>, ApiClientError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("member") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                warn!(
                    "orders: envelope member field is not an array (got {}), treating as empty",
                    type_name(&other)
                );
                Vec::new()
            }
            None => {
                warn!("orders: collection response missing member envelope field, treating as empty");
                Vec::new()
            }
        },
        other => {
            warn!(
                "orders: unexpected collection response shape ({}), treating as empty",
                type_name(&other)
            );
            Vec::new()
        }
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item)
                .map_err(|err| ApiClientError::Network(format!("invalid order in response: {err}")))
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "tests/orders_tests.rs"]
mod tests;
