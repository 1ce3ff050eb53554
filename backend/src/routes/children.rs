use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    models::{
        auth::AuthenticatedUser,
        child::{CreateChildRequest, UpdateChildRequest},
    },
    services::children::ChildService,
    AppState,
};

/// A path id that is not a number cannot belong to the caller either, so it
/// gets the same answer as a foreign id.
fn parse_child_id(raw: &str) -> Result<i64, AppError> {
    raw.parse().map_err(|_| AppError::ChildNotAccessible)
}

pub async fn create_child(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: Result<Json<CreateChildRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(body) = body?;
    let child = ChildService::create(&state.db, user.id, &body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Child added successfully", "data": child })),
    ))
}

pub async fn list_children(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, AppError> {
    let children = ChildService::list_for_parent(&state.db, user.id).await?;
    Ok(Json(json!({ "message": "Success", "data": children })))
}

pub async fn get_child(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let child_id = parse_child_id(&id)?;
    let child = ChildService::resolve_owned_child(&state.db, user.id, child_id).await?;
    Ok(Json(json!({ "message": "Success", "data": child })))
}

pub async fn update_child(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    body: Result<Json<UpdateChildRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let child_id = parse_child_id(&id)?;
    let Json(body) = body?;
    let child = ChildService::update(&state.db, user.id, child_id, &body).await?;
    Ok(Json(json!({ "message": "Child updated successfully", "data": child })))
}

pub async fn delete_child(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let child_id = parse_child_id(&id)?;
    ChildService::remove_for_parent(&state.db, user.id, child_id).await?;
    Ok(Json(json!({ "message": "Child relationship removed successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_numeric_ids_look_like_foreign_ids() {
        assert_eq!(parse_child_id("42").unwrap(), 42);
        for raw in ["abc", "", "1.5", "99999999999999999999"] {
            assert!(matches!(parse_child_id(raw), Err(AppError::ChildNotAccessible)), "{raw}");
        }
    }
}
