#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomRequest {
    code: Option<String>,
    city_id: String,
    host_device_id: String,
    display_name: Option<String>,
    #[serde(default)]
    interests: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinRoomRequest {
    device_id: String,
    display_name: Option<String>,
    #[serde(default)]
    interests: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartHuntRequest {
    device_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshChallengesRequest {
    challenge_ids_to_replace: Vec<u32>,
}

async fn create_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<RoomWithParticipants>, HttpApiError> {
    let account_id = account_id_from_headers(&headers);
    let mut service = state.inner.lock().await;
    let room = service
        .create_room(
            request.code.as_deref(),
            &request.city_id,
            &request.host_device_id,
            account_id.as_deref(),
            request.display_name.as_deref(),
            &request.interests,
        )
        .map_err(HttpApiError::from_hunt)?;
    Ok(Json(room))
}

async fn get_room(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RoomWithParticipants>, HttpApiError> {
    let service = state.inner.lock().await;
    let room = service
        .room_with_participants(&code)
        .map_err(HttpApiError::from_hunt)?;
    Ok(Json(room))
}

async fn join_room(
    Path(code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<JoinRoomRequest>,
) -> Result<Json<RoomWithParticipants>, HttpApiError> {
    let account_id = account_id_from_headers(&headers);
    let mut service = state.inner.lock().await;
    let room = service
        .join_room(
            &code,
            &request.device_id,
            account_id.as_deref(),
            request.display_name.as_deref(),
            &request.interests,
        )
        .map_err(HttpApiError::from_hunt)?;
    Ok(Json(room))
}

async fn start_hunt(
    Path(code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<StartHuntRequest>,
) -> Result<Json<Room>, HttpApiError> {
    let account_id = account_id_from_headers(&headers);
    let mut service = state.inner.lock().await;
    let room = service
        .start_hunt(&code, &request.device_id, account_id.as_deref())
        .map_err(HttpApiError::from_hunt)?;
    Ok(Json(room))
}

async fn complete_room(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Room>, HttpApiError> {
    let mut service = state.inner.lock().await;
    let room = service.complete_room(&code).map_err(HttpApiError::from_hunt)?;
    Ok(Json(room))
}

async fn refresh_challenges(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<RefreshChallengesRequest>,
) -> Result<Json<Room>, HttpApiError> {
    let mut service = state.inner.lock().await;
    let room = service
        .swap_challenges(&code, &request.challenge_ids_to_replace)
        .map_err(HttpApiError::from_hunt)?;
    Ok(Json(room))
}

async fn rooms_by_device(
    Path(device_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<RoomSummary>>, HttpApiError> {
    let service = state.inner.lock().await;
    let rooms = service
        .rooms_by_device(&device_id)
        .map_err(HttpApiError::from_hunt)?;
    Ok(Json(rooms))
}

async fn rooms_by_account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<RoomSummary>>, HttpApiError> {
    let Some(account_id) = account_id_from_headers(&headers) else {
        return Err(HttpApiError::invalid_argument(format!(
            "{ACCOUNT_ID_HEADER} header is required"
        )));
    };
    let service = state.inner.lock().await;
    let rooms = service
        .rooms_by_account(&account_id)
        .map_err(HttpApiError::from_hunt)?;
    Ok(Json(rooms))
}
