use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(OrderId);
id_newtype!(ProductId);

/// Lifecycle of an order as the backend reports it. Serialized in the
/// backend's PascalCase spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

/// A product catalog entry. `price` is the product's current list price and
/// is never the same field as a line item's price-at-purchase snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: Option<ProductId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
}

/// One persisted order line item, in any of the shapes the backend has used
/// across revisions. Variants are tried most-specific-first; the `Priced`
/// shape doubles as the tolerant fallback for items whose nested product
/// went missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderItemRead {
    /// Revision 2: the item references a product by IRI or id string.
    Referenced { product: String, quantity: u32 },
    /// Revision 1: the item *is* a flat product row carrying its own
    /// quantity; the row price was the live product price at the time.
    Inline {
        #[serde(default)]
        id: Option<ProductId>,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        price: f64,
        quantity: u32,
    },
    /// Revision 3 (current): nested product plus a decimal-as-string price
    /// snapshot taken at order time.
    #[serde(rename_all = "camelCase")]
    Priced {
        #[serde(default)]
        product: Option<Product>,
        quantity: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        price_at_purchase: Option<String>,
    },
}

/// The backend's read model for an order. `total_amount` is
/// server-authoritative and never echoed back on writes. The item
/// collection arrives as `items` on current backends and `products` on
/// older ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_name: String,
    pub order_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(default, alias = "products")]
    pub items: Vec<OrderItemRead>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_round_trips_in_pascal_case() {
        let json = serde_json::to_string(&OrderStatus::Shipped).expect("serialize");
        assert_eq!(json, "\"Shipped\"");
        let back: OrderStatus = serde_json::from_str("\"Cancelled\"").expect("deserialize");
        assert_eq!(back, OrderStatus::Cancelled);
    }

    #[test]
    fn parses_priced_item_shape() {
        let raw = r#"{
            "product": {"id": 4, "name": "Desk", "price": 199.5},
            "quantity": 2,
            "priceAtPurchase": "180.00"
        }"#;
        let item: OrderItemRead = serde_json::from_str(raw).expect("parse");
        match item {
            OrderItemRead::Priced {
                product,
                quantity,
                price_at_purchase,
            } => {
                let product = product.expect("product");
                assert_eq!(product.name, "Desk");
                assert_eq!(product.id, Some(ProductId(4)));
                assert_eq!(quantity, 2);
                assert_eq!(price_at_purchase.as_deref(), Some("180.00"));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn parses_reference_item_shape() {
        let raw = r#"{"product": "/api/products/7", "quantity": 1}"#;
        let item: OrderItemRead = serde_json::from_str(raw).expect("parse");
        assert_eq!(
            item,
            OrderItemRead::Referenced {
                product: "/api/products/7".to_string(),
                quantity: 1,
            }
        );
    }

    #[test]
    fn parses_legacy_inline_product_shape() {
        let raw = r#"{"id": 9, "name": "Chair", "price": 49.9, "quantity": 3}"#;
        let item: OrderItemRead = serde_json::from_str(raw).expect("parse");
        match item {
            OrderItemRead::Inline {
                id,
                name,
                price,
                quantity,
                ..
            } => {
                assert_eq!(id, Some(ProductId(9)));
                assert_eq!(name, "Chair");
                assert_eq!(price, 49.9);
                assert_eq!(quantity, 3);
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn item_with_missing_product_falls_back_to_priced_shape() {
        let raw = r#"{"quantity": 5}"#;
        let item: OrderItemRead = serde_json::from_str(raw).expect("parse");
        match item {
            OrderItemRead::Priced {
                product,
                quantity,
                price_at_purchase,
            } => {
                assert!(product.is_none());
                assert_eq!(quantity, 5);
                assert!(price_at_purchase.is_none());
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn order_accepts_legacy_products_field_name() {
        let raw = r#"{
            "id": 1,
            "orderNumber": "ORD-1",
            "customerName": "Acme",
            "orderDate": "2024-03-01T10:00:00Z",
            "status": "Pending",
            "products": [{"name": "Chair", "price": 10.0, "quantity": 1}]
        }"#;
        let order: Order = serde_json::from_str(raw).expect("parse");
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.total_amount, None);
    }
}
