use chrono::{DateTime, SecondsFormat, Utc};
use shared::{
    domain::{Order, OrderId, OrderItemRead, OrderStatus, ProductId},
    protocol::{OrderItemWrite, OrderWritePayload, ProductWrite},
};
use thiserror::Error;
use tracing::warn;

use crate::{
    error::{ApiClientError, ClientValidationError},
    orders::OrderQueryService,
};

/// Smallest unit price the form accepts: one hundredth of the currency
/// unit. Zero and negative prices never reach the backend.
pub const MIN_UNIT_PRICE: f64 = 0.01;
const MIN_CUSTOMER_NAME_LEN: usize = 3;

/// One editable line-item row, decoupled from every backend shape. The
/// unit price is what the user sees and edits; on submission it becomes
/// the immutable price-at-purchase snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemDraft {
    /// Known catalog identity, if this row came from (or was bound to) an
    /// existing product. `None` means submission creates the product
    /// inline from the row's own fields.
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub description: String,
    pub unit_price: f64,
    pub quantity: u32,
}

impl Default for LineItemDraft {
    fn default() -> Self {
        Self {
            product_id: None,
            product_name: String::new(),
            description: String::new(),
            unit_price: MIN_UNIT_PRICE,
            quantity: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LineItemEditError {
    #[error("an order must contain at least one line item")]
    LastItem,
    #[error("no line item at index {0}")]
    OutOfRange(usize),
}

/// The editable form model for one order aggregate. Row order is
/// preserved exactly as entered; the collection never becomes empty
/// through the editing API.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    /// `Some` when editing a persisted order, `None` for a new one.
    pub id: Option<OrderId>,
    pub order_number: String,
    pub customer_name: String,
    pub order_date: DateTime<Utc>,
    pub description: String,
    pub status: OrderStatus,
    items: Vec<LineItemDraft>,
}

impl OrderDraft {
    /// A fresh draft with one blank row, matching what a new-order form
    /// starts from.
    pub fn new(order_date: DateTime<Utc>) -> Self {
        Self {
            id: None,
            order_number: String::new(),
            customer_name: String::new(),
            order_date,
            description: String::new(),
            status: OrderStatus::Pending,
            items: vec![LineItemDraft::default()],
        }
    }

    /// Derives the editable rows from a backend order, reconciling all
    /// three historical item shapes. Never fails: a missing nested product
    /// becomes blank editable fields, a malformed price snapshot becomes
    /// zero, and both are logged.
    pub fn from_order(order: &Order) -> Self {
        let items = order.items.iter().map(line_item_from_read).collect::<Vec<_>>();
        Self {
            id: Some(order.id),
            order_number: order.order_number.clone(),
            customer_name: order.customer_name.clone(),
            order_date: order.order_date,
            description: order.description.clone().unwrap_or_default(),
            status: order.status,
            items,
        }
    }

    pub fn items(&self) -> &[LineItemDraft] {
        &self.items
    }

    pub fn item_mut(&mut self, index: usize) -> Option<&mut LineItemDraft> {
        self.items.get_mut(index)
    }

    /// Appends a blank row.
    pub fn add_item(&mut self) {
        self.items.push(LineItemDraft::default());
    }

    pub fn push_item(&mut self, item: LineItemDraft) {
        self.items.push(item);
    }

    /// Removes a row, refusing to remove the last remaining one.
    pub fn remove_item(&mut self, index: usize) -> Result<LineItemDraft, LineItemEditError> {
        if index >= self.items.len() {
            return Err(LineItemEditError::OutOfRange(index));
        }
        if self.items.len() == 1 {
            return Err(LineItemEditError::LastItem);
        }
        Ok(self.items.remove(index))
    }

    /// Checks every submission rule and aggregates all violations into a
    /// single error; a failing draft never produces a network call.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        let mut violations = Vec::new();

        if self.order_number.trim().is_empty() {
            violations.push("order number must not be empty".to_string());
        }
        if self.customer_name.trim().chars().count() < MIN_CUSTOMER_NAME_LEN {
            violations.push(format!(
                "customer name must be at least {MIN_CUSTOMER_NAME_LEN} characters"
            ));
        }
        if self.items.is_empty() {
            violations.push("an order must contain at least one line item".to_string());
        }
        for (index, item) in self.items.iter().enumerate() {
            let row = index + 1;
            if item.quantity == 0 {
                violations.push(format!("line item {row}: quantity must be a positive integer"));
            }
            if item.unit_price < MIN_UNIT_PRICE || !item.unit_price.is_finite() {
                violations.push(format!(
                    "line item {row}: unit price must be at least {MIN_UNIT_PRICE}"
                ));
            }
            if item.product_id.is_none() && item.product_name.trim().is_empty() {
                violations.push(format!(
                    "line item {row}: needs an existing product or a product name"
                ));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ClientValidationError::new(violations))
        }
    }

    /// Builds the backend write payload. Validates first; every row's unit
    /// price is re-snapshotted from the form into `priceAtPurchase`, never
    /// re-read from the live product price.
    pub fn to_write_payload(&self) -> Result<OrderWritePayload, ClientValidationError> {
        self.validate()?;

        let items = self
            .items
            .iter()
            .map(|item| {
                let product = match item.product_id {
                    Some(id) => ProductWrite::Reference(product_reference(id)),
                    None => ProductWrite::Inline {
                        name: item.product_name.trim().to_string(),
                        description: non_blank(&item.description),
                        price: item.unit_price,
                    },
                };
                OrderItemWrite {
                    product,
                    quantity: item.quantity,
                    price_at_purchase: format!("{:.2}", item.unit_price),
                }
            })
            .collect();

        Ok(OrderWritePayload {
            order_number: self.order_number.trim().to_string(),
            customer_name: self.customer_name.trim().to_string(),
            order_date: self
                .order_date
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            description: non_blank(&self.description),
            status: self.status,
            items,
        })
    }
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn product_reference(id: ProductId) -> String {
    format!("/api/products/{}", id.0)
}

/// Trailing integer of a product IRI (`/api/products/7`) or a bare id.
fn parse_product_reference(reference: &str) -> Option<ProductId> {
    reference
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse::<i64>().ok())
        .map(ProductId)
}

/// Parses a decimal-as-string price snapshot. Malformed input is worth a
/// warning but never a failure; the user sees a zero price and fixes it.
fn parse_price_snapshot(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(price) if price.is_finite() => price,
        _ => {
            warn!("order item has malformed price snapshot '{raw}', defaulting to 0");
            0.0
        }
    }
}

fn line_item_from_read(item: &OrderItemRead) -> LineItemDraft {
    match item {
        OrderItemRead::Priced {
            product,
            quantity,
            price_at_purchase,
        } => {
            if product.is_none() {
                warn!("order item is missing its nested product, leaving row fields blank");
            }
            let unit_price = match price_at_purchase {
                Some(raw) => parse_price_snapshot(raw),
                // Some backend revisions omit the snapshot; the live
                // product price is the only price there is.
                None => product.as_ref().map(|p| p.price).unwrap_or(0.0),
            };
            LineItemDraft {
                product_id: product.as_ref().and_then(|p| p.id),
                product_name: product
                    .as_ref()
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
                description: product
                    .as_ref()
                    .and_then(|p| p.description.clone())
                    .unwrap_or_default(),
                unit_price,
                quantity: *quantity,
            }
        }
        OrderItemRead::Referenced { product, quantity } => {
            let product_id = parse_product_reference(product);
            if product_id.is_none() {
                warn!("order item references unparseable product '{product}'");
            }
            warn!("order item carries only a product reference; name and price need re-entry");
            LineItemDraft {
                product_id,
                product_name: String::new(),
                description: String::new(),
                unit_price: 0.0,
                quantity: *quantity,
            }
        }
        OrderItemRead::Inline {
            id,
            name,
            description,
            price,
            quantity,
        } => LineItemDraft {
            product_id: *id,
            product_name: name.clone(),
            description: description.clone().unwrap_or_default(),
            unit_price: *price,
            quantity: *quantity,
        },
    }
}

/// Load→edit→save bridge between the editable draft and the backend
/// order representation.
#[derive(Clone)]
pub struct OrderAggregateSync {
    orders: OrderQueryService,
}

impl OrderAggregateSync {
    pub fn new(orders: OrderQueryService) -> Self {
        Self { orders }
    }

    pub async fn load_for_edit(&self, id: OrderId) -> Result<OrderDraft, ApiClientError> {
        let order = self.orders.get(id).await?;
        Ok(OrderDraft::from_order(&order))
    }

    /// Validates and submits the draft: create when it has no id, update
    /// otherwise. Last write wins; the returned order is the server's
    /// authoritative state including the recomputed total.
    pub async fn submit(&self, draft: &OrderDraft) -> Result<Order, ApiClientError> {
        let payload = draft.to_write_payload()?;
        match draft.id {
            Some(id) => self.orders.update(id, &payload).await,
            None => self.orders.create(&payload).await,
        }
    }
}

#[cfg(test)]
#[path = "tests/aggregate_tests.rs"]
mod tests;
