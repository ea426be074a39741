//! A local stand-in for the order/product data service.

use crate::data_client::DataClient;
use axum::extract::{Path, Query};
use axum::routing::get;
use axum::{Json, Router};
use clerk_config::DataServiceConfig;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn orders() -> Vec<Value> {
    vec![
        json!({"order_id": 1, "customer_id": "37077", "product": "BOYA BYM1 Microphone"}),
        json!({"order_id": 2, "customer_id": "12001", "product": "USB-C cable"}),
        json!({"order_id": 3, "customer_id": "37077", "product": "Phone stand"}),
        json!({"order_id": 4, "customer_id": "55120", "product": "Tripod"}),
        json!({"order_id": 5, "customer_id": "55120", "product": "Ring light"}),
    ]
}

/// Serve the stub on an ephemeral port and return a client pointed at it.
pub async fn spawn_data_service() -> Arc<DataClient> {
    let app = Router::new()
        .route("/data", get(|| async { Json(Value::Array(orders())) }))
        .route(
            "/data/customer/{id}",
            get(|Path(id): Path<String>| async move {
                let rows: Vec<Value> = orders()
                    .into_iter()
                    .filter(|o| o["customer_id"] == id.as_str())
                    .collect();
                Json(Value::Array(rows))
            }),
        )
        .route(
            "/products/columns",
            get(|| async { Json(json!(["name", "price", "rating"])) }),
        )
        .route(
            "/products/search",
            get(|Query(params): Query<HashMap<String, String>>| async move { Json(params) }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Arc::new(DataClient::new(&DataServiceConfig {
        orders_endpoint: format!("http://{addr}/data"),
        products_endpoint: format!("http://{addr}/products"),
        timeout_secs: 5,
        max_results: 3,
    }))
}

/// A client whose endpoints refuse connections.
pub fn unreachable_client() -> Arc<DataClient> {
    Arc::new(DataClient::new(&DataServiceConfig {
        orders_endpoint: "http://127.0.0.1:9/data".into(),
        products_endpoint: "http://127.0.0.1:9/products".into(),
        timeout_secs: 2,
        max_results: 3,
    }))
}
