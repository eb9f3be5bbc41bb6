use std::collections::BTreeSet;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use contracts::{
    ApiError, Challenge, City, Completion, ErrorCode, LeaderboardEntry, Room, RoomSummary,
    RoomWithParticipants,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::warn;

use crate::{HuntError, HuntService};

const ACCOUNT_ID_HEADER: &str = "x-account-id";
const DEFAULT_SQLITE_PATH: &str = "hunt_rooms.sqlite";

include!("error.rs");
include!("state.rs");
include!("routes/catalog.rs");
include!("routes/rooms.rs");
include!("routes/completions.rs");
include!("util.rs");

pub async fn serve(addr: SocketAddr, service: HuntService) -> Result<(), ServerError> {
    let state = AppState::new(service);
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/cities", get(list_cities))
        .route("/api/cities/{city_id}/challenges", get(list_city_challenges))
        .route("/api/rooms", post(create_room))
        .route("/api/rooms/by-device/{device_id}", get(rooms_by_device))
        .route("/api/rooms/by-account", get(rooms_by_account))
        .route("/api/rooms/{code}", get(get_room))
        .route("/api/rooms/{code}/join", post(join_room))
        .route("/api/rooms/{code}/start-hunt", post(start_hunt))
        .route("/api/rooms/{code}/complete", patch(complete_room))
        .route("/api/rooms/{code}/refresh-challenges", post(refresh_challenges))
        .route("/api/rooms/{code}/completions", get(list_completions))
        .route("/api/rooms/{code}/leaderboard", get(get_leaderboard))
        .route(
            "/api/rooms/{code}/challenges/{challenge_id}/complete",
            post(add_completion).delete(remove_completion),
        )
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state)
}

async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = Response::new(axum::body::Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}
