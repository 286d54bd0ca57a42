use crate::handlers::common::{created_response, json_body, success_response};
use crate::{
    errors::ServiceError,
    models::{Credentials, Registration, UserProfile},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};

/// Creates the router for registration and login
pub fn sessions_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Register a user; responds with the public profile
async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let input = json_body(payload)?;
    let user = state.services.identity.register(input).await?;
    Ok(created_response(UserProfile::from(&user)))
}

/// Check credentials; responds with the public profile
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Credentials { username, password } = json_body(payload)?;
    let user = state
        .services
        .identity
        .authenticate(&username, &password)
        .await?;
    Ok(success_response(UserProfile::from(&user)))
}
