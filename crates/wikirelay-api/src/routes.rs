//! HTTP routes.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use wikirelay_core::Subscription;

use crate::error::ApiError;
use crate::notification::WikiEvent;
use crate::AppState;

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/v1/channels/:channel_id/subscriptions",
            get(list_subscriptions),
        )
        // `:name` is the subscription type for POST/PUT and the alias for GET/DELETE
        .route(
            "/api/v1/channels/:channel_id/subscriptions/:name",
            post(create_subscription)
                .put(update_subscription)
                .get(get_subscription)
                .delete(delete_subscription),
        )
        .route(
            "/api/v1/autocomplete/subscriptions",
            get(autocomplete_subscriptions),
        )
        .route("/api/v1/events", post(receive_event))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Decode a request body and bind it to the channel in the path.
fn decode_subscription(
    body: &[u8],
    subscription_type: &str,
    channel_id: String,
) -> Result<Subscription, ApiError> {
    let mut sub = Subscription::from_request_json(body, subscription_type)?;
    sub.base_mut().channel_id = channel_id;
    Ok(sub)
}

async fn create_subscription(
    State(state): State<AppState>,
    Path((channel_id, subscription_type)): Path<(String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let sub = decode_subscription(&body, &subscription_type, channel_id)?;
    state.subscriptions.save_subscription(sub.clone()).await?;
    Ok(Json(sub))
}

async fn update_subscription(
    State(state): State<AppState>,
    Path((channel_id, subscription_type)): Path<(String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let mut sub = decode_subscription(&body, &subscription_type, channel_id)?;
    state.subscriptions.edit_subscription(sub.clone()).await?;
    sub.base_mut().old_alias = None;
    Ok(Json(sub))
}

async fn get_subscription(
    State(state): State<AppState>,
    Path((channel_id, alias)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let sub = state
        .subscriptions
        .get_channel_subscription(&channel_id, &alias)
        .await?;
    Ok(Json(sub))
}

async fn delete_subscription(
    State(state): State<AppState>,
    Path((channel_id, alias)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .subscriptions
        .delete_subscription(&channel_id, &alias)
        .await?;
    Ok(Json(serde_json::json!({
        "status": "deleted",
        "alias": alias,
    })))
}

async fn list_subscriptions(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let subscriptions = state
        .subscriptions
        .get_subscriptions_by_channel_id(&channel_id)
        .await?;
    let formatted = wikirelay_core::formatted_subscription_list(&subscriptions);
    Ok(Json(serde_json::json!({
        "subscriptions": subscriptions,
        "formatted": formatted,
    })))
}

#[derive(Debug, Deserialize)]
struct AutocompleteQuery {
    channel_id: String,
}

async fn autocomplete_subscriptions(
    State(state): State<AppState>,
    Query(query): Query<AutocompleteQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let aliases = state
        .subscriptions
        .autocomplete_aliases(&query.channel_id)
        .await?;
    Ok(Json(aliases))
}

async fn receive_event(
    State(state): State<AppState>,
    Json(event): Json<WikiEvent>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.dispatcher.dispatch(&event).await?;
    Ok(Json(report))
}
