use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use sqlx::SqlitePool;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::db::get_user;
use crate::validation::{ToValidationResponse, ValidationResponse};

use super::{User, verify_token};

fn bearer_token<'r>(request: &'r Request<'_>) -> Option<&'r str> {
    request
        .headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn authenticate(request: &Request<'_>) -> Outcome<User, ()> {
    let Some(token) = bearer_token(request) else {
        tracing::debug!("Missing bearer token");
        return Outcome::Error((Status::Unauthorized, ()));
    };

    let (Some(config), Some(db)) = (
        request.rocket().state::<AppConfig>(),
        request.rocket().state::<SqlitePool>(),
    ) else {
        tracing::error!("Configuration or database pool not found in managed state");
        return Outcome::Error((Status::InternalServerError, ()));
    };

    let claims = match verify_token(token, config) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(error = %err, "Rejected bearer token");
            return Outcome::Error((Status::Unauthorized, ()));
        }
    };

    match get_user(db, &claims.sub).await {
        Ok(user) => {
            tracing::info!(username = %user.username, role = %user.role, "User authenticated via bearer token");
            Outcome::Success(user)
        }
        Err(err) => {
            tracing::warn!(user_id = %claims.sub, error = %err, "Token refers to an unknown user");
            Outcome::Error((Status::Unauthorized, ()))
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        authenticate(request)
            .instrument(tracing::info_span!("user_auth_guard"))
            .await
    }
}

#[catch(400)]
pub fn bad_request(_req: &Request) -> Custom<Json<ValidationResponse>> {
    Status::BadRequest.to_validation_response()
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Custom<Json<ValidationResponse>> {
    tracing::warn!("Unauthorized access attempt");
    Status::Unauthorized.to_validation_response()
}

#[catch(403)]
pub fn forbidden_api(_req: &Request) -> Custom<Json<ValidationResponse>> {
    Status::Forbidden.to_validation_response()
}

#[catch(404)]
pub fn not_found_api(_req: &Request) -> Custom<Json<ValidationResponse>> {
    Status::NotFound.to_validation_response()
}

#[catch(422)]
pub fn unprocessable_api(_req: &Request) -> Custom<Json<ValidationResponse>> {
    Status::UnprocessableEntity.to_validation_response()
}

#[catch(500)]
pub fn internal_error_api(_req: &Request) -> Custom<Json<ValidationResponse>> {
    Status::InternalServerError.to_validation_response()
}
