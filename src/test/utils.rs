#[cfg(test)]
pub mod test_db {
    use crate::auth::{AccessToken, issue_token};
    use crate::config::AppConfig;
    use crate::db::create_user;
    use crate::error::AppError;
    use crate::sandbox::Sandbox;
    use crate::seed::seed_tasks;
    use rocket::http::{ContentType, Header, Status};
    use rocket::local::asynchronous::Client;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Pool, Sqlite};
    use std::collections::HashMap;
    use std::sync::Once;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";
    pub static ADMIN_KEY: &str = "test-admin-key";

    pub fn test_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            sandbox_database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret".to_string(),
            token_ttl_minutes: 30,
            admin_registration_key: ADMIN_KEY.to_string(),
            seed_admin: None,
            otlp_endpoint: None,
            honeycomb_api_key: None,
            environment: "test".to_string(),
        }
    }

    // A single connection keeps each in-memory database alive and free of
    // shared-cache lock contention.
    async fn memory_pool() -> Result<Pool<Sqlite>, AppError> {
        Ok(SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?)
    }

    pub struct TestUser {
        pub username: String,
        pub email: String,
        pub password: String,
        pub is_admin: bool,
    }

    pub struct TestDbBuilder {
        users: Vec<TestUser>,
        seed_tasks: bool,
    }

    impl Default for TestDbBuilder {
        fn default() -> Self {
            Self {
                users: Vec::new(),
                seed_tasks: true,
            }
        }
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn learner(mut self, username: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password: STANDARD_PASSWORD.to_string(),
                is_admin: false,
            });
            self
        }

        pub fn admin(mut self, username: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password: STANDARD_PASSWORD.to_string(),
                is_admin: true,
            });
            self
        }

        pub fn without_tasks(mut self) -> Self {
            self.seed_tasks = false;
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter("debug")
                    .with_test_writer()
                    .try_init();
            });

            let pool = memory_pool().await?;
            sqlx::migrate!("./migrations").run(&pool).await?;

            let sandbox = Sandbox::new(memory_pool().await?);
            sandbox.bootstrap().await?;

            if self.seed_tasks {
                seed_tasks(&pool, &sandbox).await?;
            }

            let mut user_id_map = HashMap::new();
            for user in &self.users {
                let user_id = create_user(
                    &pool,
                    &user.username,
                    &user.email,
                    &user.password,
                    user.is_admin,
                )
                .await?;
                user_id_map.insert(user.username.clone(), user_id);
            }

            Ok(TestDb {
                pool,
                sandbox,
                config: test_config(),
                user_id_map,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub sandbox: Sandbox,
        pub config: AppConfig,
        pub user_id_map: HashMap<String, String>,
    }

    impl TestDb {
        pub fn user_id(&self, username: &str) -> Option<&str> {
            self.user_id_map.get(username).map(String::as_str)
        }

        pub fn token_for(&self, username: &str) -> String {
            let user_id = self.user_id(username).expect("test user exists");
            issue_token(user_id, &self.config)
                .expect("token is issued")
                .access_token
        }
    }

    /// One learner (`learner_user`) and one admin (`admin_user`) on top of the
    /// seeded tasks.
    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .learner("learner_user")
            .admin("admin_user")
            .build()
            .await
            .expect("Failed to build test database")
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        let rocket = crate::init_rocket(
            test_db.pool.clone(),
            test_db.sandbox.clone(),
            test_db.config.clone(),
        )
        .await;

        let client = Client::tracked(rocket)
            .await
            .expect("valid rocket instance");

        (client, test_db)
    }

    pub fn bearer(token: &str) -> Header<'static> {
        Header::new("Authorization", format!("Bearer {}", token))
    }

    pub async fn login_test_user(client: &Client, username: &str, password: &str) -> String {
        let response = client
            .post("/api/login")
            .header(ContentType::Form)
            .body(format!("username={}&password={}", username, password))
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);

        let token: AccessToken = response
            .into_json()
            .await
            .expect("login returns an access token");
        token.access_token
    }
}
