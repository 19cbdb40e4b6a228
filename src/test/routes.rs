#[cfg(test)]
mod tests {
    use rocket::http::{ContentType, Header, Status};
    use rocket::response::status::Custom;
    use rocket::serde::json::Json;

    use crate::test::utils::test_db::{bearer, create_standard_test_db, setup_test_client};
    use crate::validation::{ToValidationResponse, ValidationResponse};

    #[rocket::async_test]
    async fn test_health_is_public() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;

        let response = client.get("/api/health").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().await.as_deref(), Some("OK"));
    }

    #[rocket::async_test]
    async fn test_protected_endpoints_require_token() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;

        for endpoint in [
            "/api/tasks",
            "/api/tasks/1",
            "/api/user/stats",
            "/api/user/current",
            "/api/admin/tables",
        ] {
            let response = client.get(endpoint).dispatch().await;
            assert_eq!(
                response.status(),
                Status::Unauthorized,
                "{} did not require authentication",
                endpoint
            );

            let body: ValidationResponse = response.into_json().await.expect("json error body");
            assert_eq!(body.status, "error");
            assert_eq!(
                body.message_for("authentication"),
                Some("Authentication required")
            );
        }

        let response = client
            .post("/api/tasks/1/run")
            .header(ContentType::JSON)
            .body(r#"{"query": "SELECT * FROM employees"}"#)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn test_invalid_tokens_are_rejected() {
        let (client, test_db) = setup_test_client(create_standard_test_db().await).await;

        let response = client
            .get("/api/user/current")
            .header(bearer("garbage"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);

        let token = test_db.token_for("learner_user");
        let response = client
            .get("/api/user/current")
            .header(Header::new("Authorization", token))
            .dispatch()
            .await;
        assert_eq!(
            response.status(),
            Status::Unauthorized,
            "token without the Bearer scheme must be rejected"
        );
    }

    #[rocket::async_test]
    async fn test_token_for_deleted_user_is_rejected() {
        let (client, test_db) = setup_test_client(create_standard_test_db().await).await;
        let token = test_db.token_for("learner_user");

        sqlx::query("DELETE FROM users WHERE username = 'learner_user'")
            .execute(&test_db.pool)
            .await
            .expect("user deleted");

        let response = client
            .get("/api/user/current")
            .header(bearer(&token))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn test_learner_cannot_use_admin_endpoints() {
        let (client, test_db) = setup_test_client(create_standard_test_db().await).await;
        let token = test_db.token_for("learner_user");

        let response = client
            .get("/api/admin/tables")
            .header(bearer(&token))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
        let body: ValidationResponse = response.into_json().await.expect("json error body");
        assert_eq!(body.message_for("permission"), Some("Admin access required"));

        let response = client
            .post("/api/admin/run-query")
            .header(bearer(&token))
            .header(ContentType::JSON)
            .body(r#"{"query": "SELECT 1"}"#)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn test_malformed_json_body_is_unprocessable() {
        let (client, test_db) = setup_test_client(create_standard_test_db().await).await;
        let token = test_db.token_for("learner_user");

        let response = client
            .post("/api/tasks/1/run")
            .header(bearer(&token))
            .header(ContentType::JSON)
            .body(r#"{"query": 42}"#)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);

        let body: ValidationResponse = response.into_json().await.expect("json error body");
        assert_eq!(body.status, "error");
        assert_eq!(
            body.message_for("validation"),
            Some("Request body could not be processed")
        );
    }

    #[rocket::async_test]
    async fn test_unknown_route_returns_json_404() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;

        let response = client.get("/api/does-not-exist").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        assert_eq!(response.content_type(), Some(ContentType::JSON));

        let body: ValidationResponse = response.into_json().await.expect("json error body");
        assert_eq!(body.message_for("resource"), Some("Resource not found"));
    }

    #[test]
    fn test_status_error_bodies() {
        let cases = [
            (Status::BadRequest, "request", "Bad request"),
            (Status::Unauthorized, "authentication", "Authentication required"),
            (Status::Forbidden, "permission", "Admin access required"),
            (Status::NotFound, "resource", "Resource not found"),
            (
                Status::UnprocessableEntity,
                "validation",
                "Request body could not be processed",
            ),
            (Status::InternalServerError, "server", "Internal server error"),
            (Status::ImATeapot, "error", "An error occurred"),
        ];

        for (status, field, message) in cases {
            let Custom(returned, Json(body)) = status.to_validation_response();
            assert_eq!(returned, status);
            assert_eq!(body.message_for(field), Some(message), "{}", status);
        }
    }
}
