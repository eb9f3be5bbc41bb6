#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteChallengeRequest {
    device_id: String,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UncompleteChallengeRequest {
    device_id: String,
}

async fn add_completion(
    Path((code, challenge_id)): Path<(String, u32)>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CompleteChallengeRequest>,
) -> Result<Json<Completion>, HttpApiError> {
    let account_id = account_id_from_headers(&headers);
    let mut service = state.inner.lock().await;
    let completion = service
        .add_completion(
            &code,
            challenge_id,
            &request.device_id,
            account_id.as_deref(),
            request.display_name.as_deref(),
        )
        .map_err(HttpApiError::from_hunt)?;
    Ok(Json(completion))
}

async fn remove_completion(
    Path((code, challenge_id)): Path<(String, u32)>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UncompleteChallengeRequest>,
) -> Result<StatusCode, HttpApiError> {
    let account_id = account_id_from_headers(&headers);
    let mut service = state.inner.lock().await;
    service
        .remove_completion(&code, challenge_id, &request.device_id, account_id.as_deref())
        .map_err(HttpApiError::from_hunt)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_completions(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Completion>>, HttpApiError> {
    let service = state.inner.lock().await;
    let completions = service.completions(&code).map_err(HttpApiError::from_hunt)?;
    Ok(Json(completions))
}

async fn get_leaderboard(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<LeaderboardEntry>>, HttpApiError> {
    let service = state.inner.lock().await;
    let entries = service.leaderboard(&code).map_err(HttpApiError::from_hunt)?;
    Ok(Json(entries))
}
