//! HTTP API
//!
//! JSON routes over [`ImpactHub`]. Failures render as
//! `{"statusCode", "error", "message"}` with the matching HTTP status.

use crate::service::ImpactHub;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use impacthub_core::{ActivityFlag, ImpactError, VoterSummary};
use impacthub_security::{
    ActionMetadata, ReputationProfile, SuspiciousUser, DEFAULT_LEADERBOARD_LIMIT,
    DEFAULT_SUSPICIOUS_LIMIT,
};
use impacthub_voting::{ProposalVotes, VoteHistoryEntry, VoteRequest, VoteResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

type AppState = Arc<ImpactHub>;

/// Error body returned by every route
#[derive(Debug)]
pub struct ApiError(pub ImpactError);

impl From<ImpactError> for ApiError {
    fn from(err: ImpactError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ImpactError::bad_request(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };

        let body = Json(serde_json::json!({
            "statusCode": status.as_u16(),
            "error": self.0.kind(),
            "message": message,
        }));
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub user_id: String,
    pub action: String,
    #[serde(default)]
    pub metadata: ActionMetadata,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub suspicious: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<ActivityFlag>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reputation_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<u32>,
}

/// Build the API router
pub fn router(hub: AppState, cors: bool) -> Router {
    let mut app = Router::new()
        // Health & Metrics
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        // Voting
        .route("/voting/vote", post(vote))
        .route("/voting/proposal/:proposal_id/votes", get(proposal_votes))
        .route("/voting/user/:user_id/history", get(voting_history))
        // Reputation
        .route("/reputation/leaderboard", get(leaderboard))
        .route("/reputation/:user_id", get(user_reputation))
        .route("/reputation/:user_id/refresh", post(refresh_reputation))
        // Anti-gaming
        .route("/anti-gaming/check", post(check_activity))
        .route("/anti-gaming/risk/:user_id", get(risk_score))
        .route("/anti-gaming/suspicious", get(suspicious_users))
        .route("/anti-gaming/flags/:user_id", get(user_flags))
        .layer(TraceLayer::new_for_http());

    if cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.with_state(hub)
}

async fn health(State(hub): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": hub.clock.now(),
    }))
}

async fn metrics(State(hub): State<AppState>) -> Response {
    let Some(metrics) = &hub.metrics else {
        return ApiError(ImpactError::not_found("Metrics are disabled")).into_response();
    };
    match metrics.render() {
        Ok(text) => text.into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// === Voting ===

async fn vote(
    State(hub): State<AppState>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> ApiResult<VoteResponse> {
    let Json(request) = payload?;
    Ok(Json(hub.vote(&request).await?))
}

async fn proposal_votes(
    State(hub): State<AppState>,
    Path(proposal_id): Path<String>,
) -> ApiResult<ProposalVotes> {
    hub.voting
        .get_proposal_votes(&proposal_id)
        .await?
        .map(Json)
        .ok_or_else(|| ImpactError::not_found("Proposal not found").into())
}

async fn voting_history(
    State(hub): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<VoteHistoryEntry>> {
    Ok(Json(hub.voting.get_user_voting_history(&user_id).await?))
}

// === Reputation ===

async fn leaderboard(
    State(hub): State<AppState>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<VoterSummary>> {
    let limit = params.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    Ok(Json(hub.reputation.get_reputation_leaderboard(limit).await?))
}

async fn user_reputation(
    State(hub): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ReputationProfile> {
    hub.reputation
        .get_user_reputation(&user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ImpactError::not_found("User not found").into())
}

async fn refresh_reputation(
    State(hub): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ScoreResponse> {
    let score = hub.reputation.update_user_reputation(&user_id).await?;
    Ok(Json(ScoreResponse {
        user_id,
        reputation_score: Some(score),
        risk_score: None,
    }))
}

// === Anti-gaming ===

async fn check_activity(
    State(hub): State<AppState>,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> ApiResult<CheckResponse> {
    let Json(request) = payload?;
    let flag = hub
        .check_activity(&request.user_id, &request.action, &request.metadata)
        .await?;
    Ok(Json(CheckResponse {
        suspicious: flag.is_some(),
        flag,
    }))
}

async fn risk_score(
    State(hub): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ScoreResponse> {
    let score = hub.detector.get_user_risk_score(&user_id).await?;
    Ok(Json(ScoreResponse {
        user_id,
        reputation_score: None,
        risk_score: Some(score),
    }))
}

async fn suspicious_users(
    State(hub): State<AppState>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<SuspiciousUser>> {
    let limit = params.limit.unwrap_or(DEFAULT_SUSPICIOUS_LIMIT);
    Ok(Json(hub.detector.get_suspicious_users(limit).await?))
}

async fn user_flags(
    State(hub): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<ActivityFlag>> {
    Ok(Json(hub.detector.get_user_flags(&user_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use crate::demo;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use impacthub_core::ManualClock;
    use impacthub_storage::MemoryStore;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn app() -> Router {
        let now = Utc.with_ymd_and_hms(2026, 5, 5, 12, 0, 0).unwrap();
        let store = Arc::new(MemoryStore::new());
        demo::seed(store.as_ref(), now).await.unwrap();
        let clock = Arc::new(ManualClock::new(now));
        let hub = ImpactHub::new(&NodeConfig::default(), store, clock).unwrap();
        router(Arc::new(hub), true)
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn vote_body(user: &str, proposal: &str, vote_type: &str) -> Option<Value> {
        Some(serde_json::json!({
            "userId": user,
            "proposalId": proposal,
            "voteType": vote_type,
        }))
    }

    #[tokio::test]
    async fn test_vote_route() {
        let app = app().await;

        let (status, body) =
            send(app.clone(), "POST", "/voting/vote", vote_body("user_123", "1", "FOR")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Vote recorded successfully");

        let (status, body) = send(app, "GET", "/voting/proposal/1/votes", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["votesFor"], 1);
        assert_eq!(body["votes"][0]["user"]["name"], "John Doe");
    }

    #[tokio::test]
    async fn test_error_body() {
        let app = app().await;

        let (status, body) =
            send(app.clone(), "POST", "/voting/vote", vote_body("user_new", "1", "FOR")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["statusCode"], 403);
        assert_eq!(body["error"], "Forbidden");
        assert_eq!(body["message"], "Insufficient reputation to vote");

        let (status, body) =
            send(app.clone(), "POST", "/voting/vote", vote_body("user_123", "3", "FOR")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Proposal is not active for voting");

        let (status, body) = send(app, "GET", "/voting/proposal/404/votes", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Proposal not found");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = app().await;

        let (status, body) =
            send(app.clone(), "POST", "/voting/vote", vote_body("user_123", "1", "MAYBE")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["error"], "Bad Request");
        assert!(body["message"].is_string());

        let (status, body) = send(
            app,
            "POST",
            "/anti-gaming/check",
            Some(serde_json::json!({ "action": "vote" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["statusCode"], 400);
    }

    #[tokio::test]
    async fn test_voting_history_route() {
        let app = app().await;

        send(app.clone(), "POST", "/voting/vote", vote_body("user_123", "1", "FOR")).await;
        send(app.clone(), "POST", "/voting/vote", vote_body("user_123", "2", "AGAINST")).await;

        let (status, body) = send(app.clone(), "GET", "/voting/user/user_123/history", None).await;
        assert_eq!(status, StatusCode::OK);
        let history = body.as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert!(history
            .iter()
            .any(|entry| entry["proposal"]["id"] == "2" && entry["voteType"] == "AGAINST"));

        let (status, body) = send(app, "GET", "/voting/user/ghost/history", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_reputation_routes() {
        let app = app().await;

        let (status, body) = send(app.clone(), "GET", "/reputation/leaderboard?limit=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[0]["id"], "user_456");

        let (_, body) = send(app.clone(), "GET", "/reputation/user_456", None).await;
        assert_eq!(body["reputationLevel"], "EXPERT");
        assert_eq!(body["benefits"].as_array().unwrap().len(), 5);

        let (status, body) = send(app.clone(), "POST", "/reputation/user_123/refresh", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["reputationScore"].is_number());

        let (status, _) = send(app, "GET", "/reputation/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_anti_gaming_routes() {
        let app = app().await;

        let check = serde_json::json!({
            "userId": "user_456",
            "action": "donation",
            "metadata": { "projectId": "project_water", "amount": 100.0 },
        });
        let (status, body) = send(app.clone(), "POST", "/anti-gaming/check", Some(check)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["suspicious"], true);
        assert_eq!(body["flag"]["flagType"], "WASH_TRADING");

        let (_, body) = send(app.clone(), "GET", "/anti-gaming/flags/user_456", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = send(app.clone(), "GET", "/anti-gaming/risk/ghost", None).await;
        assert_eq!(body["riskScore"], 100);

        let (_, body) = send(app, "GET", "/anti-gaming/suspicious", None).await;
        assert_eq!(body[0]["id"], "user_new");
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let app = app().await;

        let (status, body) = send(app.clone(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("impacthub_votes_recorded_total"));
    }
}
