use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    app::route_not_found,
    dto::MessageResponse,
    error::{body, parse_id, ApiError, FieldErrors, EMAIL_TAKEN},
    state::AppState,
    users::{
        dto::{CreateUserRequest, UpdateUserRequest},
        password::{hash_password, verify_password},
        repo_types::{NewUser, User, UserUpdate},
        services,
    },
};

const NOT_FOUND: &str = "User not found";

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(list_users).post(create_user).fallback(route_not_found),
        )
        .route(
            "/users/:id",
            get(get_user)
                .put(update_user)
                .delete(delete_user)
                .fallback(route_not_found),
        )
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state
        .users
        .list()
        .await
        .map_err(ApiError::storage("Error while fetching users"))?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    state
        .users
        .find(id)
        .await
        .map_err(ApiError::storage("Error while fetching user"))?
        .map(Json)
        .ok_or(ApiError::NotFound(NOT_FOUND))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    const CTX: &str = "Error while creating user";

    let input = services::validate_new(body(payload)?).map_err(|errors| {
        warn!(fields = ?errors.fields().collect::<Vec<_>>(), "invalid user");
        errors
    })?;

    // Ensure email is not taken
    let taken = state
        .users
        .find_by_email(&input.email)
        .await
        .map_err(ApiError::storage(CTX))?;
    if taken.is_some() {
        warn!(email = %input.email, "email already registered");
        return Err(FieldErrors::single("email", EMAIL_TAKEN).into());
    }

    let password_hash = hash_password(&input.password).map_err(ApiError::internal(CTX))?;

    let user = state
        .users
        .insert(NewUser {
            name: input.name,
            email: input.email,
            password_hash,
            role: input.role,
        })
        .await
        .map_err(ApiError::storage(CTX))?;

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    const CTX: &str = "Error while updating user";

    let id = parse_id(&id, NOT_FOUND)?;
    let existing = state
        .users
        .find(id)
        .await
        .map_err(ApiError::storage(CTX))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;

    let changes = services::validate_update(body(payload)?)?;

    if let Some(email) = changes.email.as_deref().filter(|e| *e != existing.email) {
        let owner = state
            .users
            .find_by_email(email)
            .await
            .map_err(ApiError::storage(CTX))?;
        if owner.is_some_and(|u| u.id != id) {
            warn!(user_id = %id, email = %email, "email already registered");
            return Err(FieldErrors::single("email", EMAIL_TAKEN).into());
        }
    }

    // Only a password that differs from the stored one gets a fresh hash.
    let password_hash = match changes.password.as_deref() {
        Some(raw) if !verify_password(raw, &existing.password_hash).unwrap_or(false) => {
            Some(hash_password(raw).map_err(ApiError::internal(CTX))?)
        }
        _ => None,
    };

    let user = state
        .users
        .update(
            id,
            UserUpdate {
                name: changes.name,
                email: changes.email,
                password_hash,
                role: changes.role,
            },
        )
        .await
        .map_err(ApiError::storage(CTX))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;

    info!(user_id = %user.id, "user updated");
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    let removed = state
        .users
        .delete(id)
        .await
        .map_err(ApiError::storage("Error while deleting user"))?;
    if !removed {
        return Err(ApiError::NotFound(NOT_FOUND));
    }

    info!(user_id = %id, "user deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}
