use serde::{Deserialize, Serialize};

use crate::domain::OrderStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A successful login either issues a permanent token directly or hands
/// back a short-lived challenge token for the second factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoginResponse {
    TwoFactorChallenge {
        #[serde(rename = "2fa_required")]
        two_factor_required: bool,
        temp_token: String,
    },
    Token {
        token: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorLoginRequest {
    pub temp_token: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorSetupResponse {
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otpauth_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnableTwoFactorRequest {
    pub secret: String,
    pub code: String,
}

/// Product half of a line-item write: either a reference to an existing
/// catalog entry or an inline creation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductWrite {
    Reference(String),
    Inline {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        price: f64,
    },
}

/// One line item as submitted on create/update. `price_at_purchase` is the
/// decimal-as-string snapshot of the form's unit price; the backend never
/// recomputes it from the live product price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemWrite {
    pub product: ProductWrite,
    pub quantity: u32,
    pub price_at_purchase: String,
}

/// The write payload for create and update. Excludes `id` and
/// `totalAmount`, both of which are server-assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWritePayload {
    pub order_number: String,
    pub customer_name: String,
    pub order_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<OrderItemWrite>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_response_parses_direct_token() {
        let parsed: LoginResponse =
            serde_json::from_str(r#"{"token": "tok-1"}"#).expect("parse");
        assert_eq!(
            parsed,
            LoginResponse::Token {
                token: "tok-1".to_string()
            }
        );
    }

    #[test]
    fn login_response_parses_second_factor_challenge() {
        let parsed: LoginResponse =
            serde_json::from_str(r#"{"2fa_required": true, "temp_token": "tmp-9"}"#)
                .expect("parse");
        assert_eq!(
            parsed,
            LoginResponse::TwoFactorChallenge {
                two_factor_required: true,
                temp_token: "tmp-9".to_string()
            }
        );
    }

    #[test]
    fn item_write_serializes_camel_case_with_string_price() {
        let item = OrderItemWrite {
            product: ProductWrite::Inline {
                name: "Desk".to_string(),
                description: None,
                price: 199.5,
            },
            quantity: 2,
            price_at_purchase: "180.00".to_string(),
        };
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["priceAtPurchase"], "180.00");
        assert_eq!(json["product"]["name"], "Desk");
        assert!(json["product"].get("quantity").is_none());
    }

    #[test]
    fn product_reference_serializes_as_bare_string() {
        let item = OrderItemWrite {
            product: ProductWrite::Reference("/api/products/3".to_string()),
            quantity: 1,
            price_at_purchase: "10.00".to_string(),
        };
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["product"], "/api/products/3");
    }
}
