use super::*;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde_json::json;
use shared::{
    domain::OrderStatus,
    protocol::{OrderItemWrite, ProductWrite},
};
use std::collections::HashMap;
use tokio::{net::TcpListener, sync::Mutex};
use url::Url;

use crate::session::SessionStore;

fn sample_order_json(id: i64) -> Value {
    json!({
        "id": id,
        "orderNumber": format!("ORD-{id}"),
        "customerName": "Acme Corp",
        "orderDate": "2024-03-01T10:00:00Z",
        "status": "Pending",
        "totalAmount": 360.0,
        "items": [{
            "product": {"id": 4, "name": "Desk", "price": 199.5},
            "quantity": 2,
            "priceAtPurchase": "180.00"
        }]
    })
}

async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn service_for(base: &str) -> OrderQueryService {
    let transport = ApiTransport::new(Url::parse(base).expect("url"), SessionStore::in_memory());
    OrderQueryService::new(Arc::new(transport))
}

#[tokio::test]
async fn list_normalizes_member_envelope() {
    let app = Router::new().route(
        "/api/orders",
        get(|| async { Json(json!({"member": [sample_order_json(1)]})) }),
    );
    let base = spawn_server(app).await;

    let orders = service_for(&base).list(None, None).await.expect("list");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, OrderId(1));
    assert_eq!(orders[0].order_number, "ORD-1");
}

#[tokio::test]
async fn list_accepts_bare_array() {
    let app = Router::new().route(
        "/api/orders",
        get(|| async { Json(json!([sample_order_json(2)])) }),
    );
    let base = spawn_server(app).await;

    let orders = service_for(&base).list(None, None).await.expect("list");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, OrderId(2));
}

#[tokio::test]
async fn list_treats_missing_member_field_as_empty() {
    let app = Router::new().route(
        "/api/orders",
        get(|| async { Json(json!({"totalItems": 0})) }),
    );
    let base = spawn_server(app).await;

    let orders = service_for(&base).list(None, None).await.expect("list");
    assert!(orders.is_empty());
}

#[tokio::test]
async fn list_forwards_date_and_trimmed_search_params() {
    let captured: Arc<Mutex<Vec<HashMap<String, String>>>> = Arc::default();
    let app = Router::new()
        .route(
            "/api/orders",
            get(
                |State(captured): State<Arc<Mutex<Vec<HashMap<String, String>>>>>,
                 Query(params): Query<HashMap<String, String>>| async move {
                    captured.lock().await.push(params);
                    Json(json!([]))
                },
            ),
        )
        .with_state(Arc::clone(&captured));
    let base = spawn_server(app).await;
    let service = service_for(&base);

    service
        .list(Some("2024-03-01"), Some("  acme  "))
        .await
        .expect("list");
    service.list(None, Some("   ")).await.expect("list");
    service.list(Some(""), None).await.expect("list");

    let requests = captured.lock().await;
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].get("date").map(String::as_str), Some("2024-03-01"));
    assert_eq!(requests[0].get("search").map(String::as_str), Some("acme"));
    // Blank filters are omitted entirely.
    assert!(requests[1].is_empty());
    assert!(requests[2].is_empty());
}

#[tokio::test]
async fn get_fetches_single_order_by_id() {
    let app = Router::new().route(
        "/api/orders/:id",
        get(|Path(id): Path<i64>| async move { Json(sample_order_json(id)) }),
    );
    let base = spawn_server(app).await;

    let order = service_for(&base).get(OrderId(7)).await.expect("get");
    assert_eq!(order.id, OrderId(7));
    assert_eq!(order.total_amount, Some(360.0));
}

#[tokio::test]
async fn create_posts_payload_and_returns_created_order() {
    let captured: Arc<Mutex<Option<Value>>> = Arc::default();
    let app = Router::new()
        .route(
            "/api/orders",
            axum::routing::post(
                |State(captured): State<Arc<Mutex<Option<Value>>>>,
                 Json(body): Json<Value>| async move {
                    *captured.lock().await = Some(body);
                    (StatusCode::CREATED, Json(sample_order_json(42)))
                },
            ),
        )
        .with_state(Arc::clone(&captured));
    let base = spawn_server(app).await;

    let payload = OrderWritePayload {
        order_number: "ORD-42".to_string(),
        customer_name: "Acme Corp".to_string(),
        order_date: "2024-03-01T10:00:00.000Z".to_string(),
        description: None,
        status: OrderStatus::Pending,
        items: vec![OrderItemWrite {
            product: ProductWrite::Inline {
                name: "Desk".to_string(),
                description: None,
                price: 180.0,
            },
            quantity: 2,
            price_at_purchase: "180.00".to_string(),
        }],
    };

    let created = service_for(&base).create(&payload).await.expect("create");
    assert_eq!(created.id, OrderId(42));

    let body = captured.lock().await.clone().expect("captured body");
    assert_eq!(body["orderNumber"], "ORD-42");
    assert_eq!(body["items"][0]["priceAtPurchase"], "180.00");
    assert!(body.get("id").is_none());
    assert!(body.get("totalAmount").is_none());
}

#[tokio::test]
async fn update_puts_to_the_order_path() {
    let app = Router::new().route(
        "/api/orders/:id",
        put(|Path(id): Path<i64>, Json(_body): Json<Value>| async move {
            Json(sample_order_json(id))
        }),
    );
    let base = spawn_server(app).await;

    let payload = OrderWritePayload {
        order_number: "ORD-5".to_string(),
        customer_name: "Acme Corp".to_string(),
        order_date: "2024-03-01T10:00:00.000Z".to_string(),
        description: Some("rush".to_string()),
        status: OrderStatus::Processing,
        items: vec![OrderItemWrite {
            product: ProductWrite::Reference("/api/products/4".to_string()),
            quantity: 1,
            price_at_purchase: "10.00".to_string(),
        }],
    };

    let updated = service_for(&base)
        .update(OrderId(5), &payload)
        .await
        .expect("update");
    assert_eq!(updated.id, OrderId(5));
}

#[tokio::test]
async fn delete_maps_to_http_delete_with_empty_response() {
    let deleted: Arc<Mutex<Vec<i64>>> = Arc::default();
    let app = Router::new()
        .route(
            "/api/orders/:id",
            axum::routing::delete(
                |State(deleted): State<Arc<Mutex<Vec<i64>>>>, Path(id): Path<i64>| async move {
                    deleted.lock().await.push(id);
                    StatusCode::NO_CONTENT
                },
            ),
        )
        .with_state(Arc::clone(&deleted));
    let base = spawn_server(app).await;

    service_for(&base).delete(OrderId(9)).await.expect("delete");
    assert_eq!(deleted.lock().await.as_slice(), [9]);
}

#[tokio::test]
async fn backend_validation_error_surfaces_message() {
    let app = Router::new().route(
        "/api/orders",
        axum::routing::post(|| async {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"detail": "orderNumber must be unique"})),
            )
        }),
    );
    let base = spawn_server(app).await;

    let payload = OrderWritePayload {
        order_number: "DUP-1".to_string(),
        customer_name: "Acme Corp".to_string(),
        order_date: "2024-03-01T10:00:00.000Z".to_string(),
        description: None,
        status: OrderStatus::Pending,
        items: vec![OrderItemWrite {
            product: ProductWrite::Reference("/api/products/1".to_string()),
            quantity: 1,
            price_at_purchase: "1.00".to_string(),
        }],
    };

    let err = service_for(&base)
        .create(&payload)
        .await
        .expect_err("must fail");
    assert_eq!(
        err,
        ApiClientError::Server {
            status: 422,
            message: "orderNumber must be unique".to_string()
        }
    );
}
