use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::state::AppState;
use crate::users::{
    dto::{ErrorBody, UserDraft},
    repo_types::{Lookup, User},
    services::ServiceError,
    validation::{validate, ValidationErrors},
};

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.users.get_all_users().await.map_err(internal)?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    match state.users.get_user_by_id(id).await.map_err(internal)? {
        Lookup::Found(user) => Ok(Json(user).into_response()),
        Lookup::Absent => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserDraft>, JsonRejection>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Json<User>), ApiError> {
    let draft = parse_draft(payload)?;

    match state.users.create_user(draft).await {
        Ok(user) => {
            let location = format!("/api/users/{}", user.id.unwrap_or_default());
            Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(user)))
        }
        Err(ServiceError::Conflict(msg)) => Err(error_body(StatusCode::CONFLICT, msg)),
        Err(e) => Err(internal(e)),
    }
}

/// Every service failure on update answers 404, conflicts included.
#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UserDraft>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let draft = parse_draft(payload)?;

    state.users.update_user(id, draft).await.map(Json).map_err(|e| {
        log_collapsed(id, &e);
        error_body(StatusCode::NOT_FOUND, e.to_string())
    })
}

#[instrument(skip(state))]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<i64>) -> StatusCode {
    match state.users.delete_user(id).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => {
            log_collapsed(id, &e);
            StatusCode::NOT_FOUND
        }
    }
}

fn parse_draft(payload: Result<Json<UserDraft>, JsonRejection>) -> Result<User, ApiError> {
    let Json(draft) = payload.map_err(|rejection| {
        warn!(error = %rejection, "unreadable user body");
        error_body(StatusCode::BAD_REQUEST, rejection.body_text())
    })?;

    validate(draft).map_err(|ValidationErrors(violations)| {
        warn!(count = violations.len(), "user body failed validation");
        let (status, Json(body)) = error_body(StatusCode::BAD_REQUEST, "Validation failed");
        (status, Json(ErrorBody { violations, ..body }))
    })
}

fn log_collapsed(id: i64, e: &ServiceError) {
    match e {
        ServiceError::Store(store) => error!(error = %store, user_id = id, "store failure"),
        other => warn!(error = %other, user_id = id, "request rejected"),
    }
}

fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: message.into(),
            violations: Vec::new(),
        }),
    )
}

fn internal(e: ServiceError) -> ApiError {
    error!(error = %e, "user request failed");
    error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::app::build_app;

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app
            .clone()
            .oneshot(req.body(body).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    fn app() -> Router {
        build_app(AppState::fake())
    }

    #[tokio::test]
    async fn end_to_end_scenario() {
        let app = app();

        let (status, alice) = send(
            &app,
            Method::POST,
            "/api/users",
            Some(json!({"name": "Alice", "email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(alice["id"], 1);
        assert_eq!(alice["address"], Value::Null);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/users",
            Some(json!({"name": "Bob", "email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "User with email a@x.com already exists");

        let (status, updated) = send(
            &app,
            Method::PUT,
            "/api/users/1",
            Some(json!({"name": "Alice2", "email": "a@x.com", "address": "Y"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            updated,
            json!({"id": 1, "name": "Alice2", "email": "a@x.com", "address": "Y"})
        );

        let (status, body) = send(&app, Method::DELETE, "/api/users/1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, body) = send(&app, Method::GET, "/api/users/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn create_sets_location_header() {
        let app = app();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"name": "A", "email": "a@x.com"}).to_string()))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()[header::LOCATION], "/api/users/1");
    }

    #[tokio::test]
    async fn list_returns_every_user_in_id_order() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/api/users", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        for (name, email) in [("A", "a@x.com"), ("B", "b@x.com")] {
            send(&app, Method::POST, "/api/users", Some(json!({"name": name, "email": email}))).await;
        }
        let (_, body) = send(&app, Method::GET, "/api/users", None).await;
        let ids: Vec<_> = body.as_array().unwrap().iter().map(|u| u["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn invalid_body_is_rejected_before_the_store() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/users",
            Some(json!({"name": " ", "email": "not-an-email"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(
            body["violations"],
            json!([
                {"field": "name", "rule": "not_blank", "message": "Name is required"},
                {"field": "email", "rule": "email", "message": "Email should be valid"},
            ])
        );

        let (_, list) = send(&app, Method::GET, "/api/users", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn update_validates_like_create() {
        let app = app();
        send(&app, Method::POST, "/api/users", Some(json!({"name": "A", "email": "a@x.com"}))).await;
        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/users/1",
            Some(json!({"name": "A", "email": "a@x.com", "address": "z".repeat(201)})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["violations"][0]["field"], "address");
        assert_eq!(body["violations"][0]["rule"], "max_length");
    }

    #[tokio::test]
    async fn malformed_json_and_bad_ids_are_bad_requests() {
        let app = app();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\":"))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::GET, "/api/users/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_conflict_collapses_to_not_found() {
        let app = app();
        send(&app, Method::POST, "/api/users", Some(json!({"name": "A", "email": "a@x.com"}))).await;
        send(&app, Method::POST, "/api/users", Some(json!({"name": "B", "email": "b@x.com"}))).await;

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/users/2",
            Some(json!({"name": "B", "email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User with email a@x.com already exists");

        let (_, bob) = send(&app, Method::GET, "/api/users/2", None).await;
        assert_eq!(bob["email"], "b@x.com");
    }

    #[tokio::test]
    async fn update_and_delete_of_unknown_id_are_not_found() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/users/9",
            Some(json!({"name": "A", "email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found with id: 9");

        for _ in 0..2 {
            let (status, body) = send(&app, Method::DELETE, "/api/users/9", None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body, Value::Null);
        }
    }

    #[tokio::test]
    async fn body_id_is_ignored() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/users",
            Some(json!({"id": 500, "name": "A", "email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 1);
    }
}
