async fn list_cities(State(state): State<AppState>) -> Json<Vec<City>> {
    let service = state.inner.lock().await;
    Json(service.catalog().cities().to_vec())
}

async fn list_city_challenges(
    Path(city_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Challenge>>, HttpApiError> {
    let service = state.inner.lock().await;
    match service.catalog().challenges(&city_id) {
        Some(challenges) => Ok(Json(challenges.to_vec())),
        None => Err(HttpApiError::from_hunt(HuntError::NotFound(format!(
            "city {city_id}"
        )))),
    }
}
