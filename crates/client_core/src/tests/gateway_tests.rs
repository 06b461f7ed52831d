use std::{collections::HashMap, sync::Arc};

use super::*;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    queries: Arc<Mutex<Vec<(String, HashMap<String, String>)>>>,
    interactions: Arc<Mutex<Vec<Value>>>,
}

fn user_json(id: i64, username: &str) -> Value {
    json!({"id": id, "username": username, "email": format!("{username}@example.com"), "preferences": ""})
}

fn product_json(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": "test product",
        "category": "Electronics",
        "price": 19.99,
        "image_url": "https://img.example/p.png",
        "rating": 4.2,
        "tags": "gadget"
    })
}

async fn list_users(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.queries.lock().await.push(("users".into(), query));
    Json(json!([user_json(1, "alice"), user_json(2, "bob")]))
}

async fn list_products(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.queries.lock().await.push(("products".into(), query));
    Json(json!([product_json(10, "Headphones")]))
}

async fn recommendations(
    State(state): State<ServerState>,
    Path(user_id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state
        .queries
        .lock()
        .await
        .push((format!("recommendations/{user_id}"), query));
    match user_id {
        99 => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "User not found"})),
        )
            .into_response(),
        500 => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => Json(json!([
            {"product": product_json(12, "Keyboard"), "score": 0.91, "explanation": "Matches your Electronics views"},
            {"product": product_json(10, "Headphones"), "score": 0.55, "explanation": "Popular right now"}
        ]))
        .into_response(),
    }
}

async fn create_interaction(
    State(state): State<ServerState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if body.get("product_id") == Some(&json!(0)) {
        return (StatusCode::SERVICE_UNAVAILABLE, "down").into_response();
    }
    state.interactions.lock().await.push(body.clone());
    let mut ack = body;
    ack["id"] = json!(1);
    ack["timestamp"] = json!("2024-01-01T00:00:00");
    Json(ack).into_response()
}

async fn spawn_api_server() -> (String, ServerState) {
    let state = ServerState::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route("/users", get(list_users))
        .route("/products", get(list_products))
        .route("/recommendations/:user_id", get(recommendations))
        .route("/interactions", post(create_interaction))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/"), state)
}

#[test]
fn normalize_base_url_trims_trailing_slash() {
    assert_eq!(
        normalize_base_url(" http://localhost:8000/ ").expect("valid"),
        "http://localhost:8000"
    );
}

#[test]
fn normalize_base_url_rejects_non_http_schemes() {
    assert!(normalize_base_url("ftp://example.com").is_err());
    assert!(normalize_base_url("not a url").is_err());
}

#[tokio::test]
async fn fetches_users_and_products_with_paging_query() {
    let (url, state) = spawn_api_server().await;
    let gateway = HttpGateway::new(&url).expect("gateway");

    let users = gateway.fetch_users().await.expect("users");
    assert_eq!(
        users.iter().map(|u| u.id).collect::<Vec<_>>(),
        vec![UserId(1), UserId(2)]
    );
    let products = gateway.fetch_products().await.expect("products");
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].tags, "gadget");

    let queries = state.queries.lock().await;
    assert_eq!(queries[0].0, "users");
    assert_eq!(queries[0].1.get("skip").map(String::as_str), Some("0"));
    assert_eq!(queries[0].1.get("limit").map(String::as_str), Some("100"));
    assert_eq!(queries[1].0, "products");
}

#[tokio::test]
async fn recommendations_keep_server_order_and_send_limit() {
    let (url, state) = spawn_api_server().await;
    let gateway = HttpGateway::with_options(
        &url,
        GatewayOptions {
            recommendations: RecommendationQuery {
                num_recommendations: 8,
            },
            ..GatewayOptions::default()
        },
    )
    .expect("gateway");

    let recs = gateway
        .fetch_recommendations(UserId(1))
        .await
        .expect("recommendations");
    assert_eq!(
        recs.iter().map(|r| r.product.id).collect::<Vec<_>>(),
        vec![ProductId(12), ProductId(10)]
    );

    let queries = state.queries.lock().await;
    assert_eq!(queries[0].0, "recommendations/1");
    assert_eq!(
        queries[0].1.get("num_recommendations").map(String::as_str),
        Some("8")
    );
}

#[tokio::test]
async fn unknown_user_maps_to_not_found() {
    let (url, _state) = spawn_api_server().await;
    let gateway = HttpGateway::new(&url).expect("gateway");

    let err = gateway
        .fetch_recommendations(UserId(99))
        .await
        .expect_err("unknown user");
    match err {
        GatewayError::NotFound { detail } => assert_eq!(detail, "User not found"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_maps_to_transport() {
    let (url, _state) = spawn_api_server().await;
    let gateway = HttpGateway::new(&url).expect("gateway");

    let err = gateway
        .fetch_recommendations(UserId(500))
        .await
        .expect_err("server error");
    assert!(matches!(err, GatewayError::Transport { .. }));
}

#[tokio::test]
async fn unreachable_server_maps_to_transport() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let gateway = HttpGateway::new(&format!("http://{addr}")).expect("gateway");
    let err = gateway.fetch_users().await.expect_err("connection refused");
    assert!(matches!(err, GatewayError::Transport { .. }));
}

#[tokio::test]
async fn record_interaction_posts_expected_body() {
    let (url, state) = spawn_api_server().await;
    let gateway = HttpGateway::new(&url).expect("gateway");

    gateway
        .record_interaction(UserId(1), ProductId(42), InteractionKind::Cart)
        .await
        .expect("record");

    let bodies = state.interactions.lock().await;
    assert_eq!(
        bodies.as_slice(),
        &[json!({"user_id": 1, "product_id": 42, "interaction_type": "cart"})]
    );
}

#[tokio::test]
async fn record_interaction_failure_is_transport_error() {
    let (url, _state) = spawn_api_server().await;
    let gateway = HttpGateway::new(&url).expect("gateway");

    let err = gateway
        .record_interaction(UserId(1), ProductId(0), InteractionKind::View)
        .await
        .expect_err("unavailable");
    assert!(matches!(err, GatewayError::Transport { .. }));
}
