use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;
use reqwest::header::HeaderMap;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tempfile::TempDir;

use ::common::StorageAppConfig;
use ::common::storage::filesystem::FilesystemObjectStore;
use admin_server::config::{AppConfig, AuthConfig, CorsConfig, DatabaseConfig, ServerConfig};
use admin_server::state::AppState;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const PASSWORD: &str = "securepass";

pub mod routes {
    pub const REGISTER: &str = "/auth/register";
    pub const LOGIN: &str = "/auth/jwt/login";
    pub const LOGOUT: &str = "/auth/jwt/logout";
    pub const ME: &str = "/auth/me";
    pub const CSRF: &str = "/csrf";
    pub const ROLES: &str = "/roles";
    pub const GROUPS: &str = "/groups";
    pub const USERS: &str = "/users";
    pub const UPLOADS: &str = "/uploads";

    pub fn role(id: &str) -> String {
        format!("/roles/{id}")
    }

    pub fn group(id: &str) -> String {
        format!("/groups/{id}")
    }

    pub fn group_members(id: &str) -> String {
        format!("/groups/{id}/members")
    }

    pub fn user(id: &str) -> String {
        format!("/users/{id}")
    }

    pub fn user_groups(id: &str) -> String {
        format!("/users/{id}/groups")
    }

    pub fn user_profile(id: &str) -> String {
        format!("/users/{id}/profile")
    }

    pub fn upload(id: &str) -> String {
        format!("/uploads/{id}")
    }

    pub fn upload_download(id: &str) -> String {
        format!("/uploads/{id}/download")
    }
}

/// A running test server backed by in-memory SQLite and a temp-dir object store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub db: DatabaseConnection,
    storage: TempDir,
}

/// One browser-like client with its own cookie jar.
pub struct Session {
    client: Client,
    base: String,
    csrf: Option<String>,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let storage = TempDir::new().expect("Failed to create storage dir");
        let database = DatabaseConfig::from_url("sqlite::memory:");
        let auth = AuthConfig {
            jwt_secret: "test-secret-for-integration-tests".to_string(),
            token_ttl_secs: 3600,
            cookie_name: "adminauth".to_string(),
            cookie_secure: false,
            superuser_email: Some(ADMIN_EMAIL.to_string()),
            superuser_password: Some(ADMIN_PASSWORD.to_string()),
        };
        let storage_config = StorageAppConfig {
            path: storage.path().to_path_buf(),
            ..Default::default()
        };

        let db = admin_server::database::init_db(&database)
            .await
            .expect("Failed to initialize database");
        admin_server::seed::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");
        admin_server::seed::seed_superuser(&db, &auth)
            .await
            .expect("Failed to seed superuser");

        let object_store = FilesystemObjectStore::new(
            storage_config.path.clone(),
            storage_config.max_upload_size,
        )
        .await
        .expect("Failed to create object store");

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database,
            auth,
            storage: storage_config,
        };

        let state = AppState {
            db: db.clone(),
            config: Arc::new(config),
            object_store: Arc::new(object_store),
        };
        let app = admin_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, db, storage }
    }

    pub fn stored_file(&self, key: &str) -> PathBuf {
        self.storage.path().join(key)
    }

    /// A fresh client with no cookies.
    pub fn session(&self) -> Session {
        Session {
            client: Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to build client"),
            base: format!("http://{}", self.addr),
            csrf: None,
        }
    }

    /// The seeded superuser, logged in and holding a CSRF token.
    pub async fn admin(&self) -> Session {
        let mut session = self.session();
        let res = session.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(res.status, 204, "Admin login failed: {}", res.text);
        session.fetch_csrf().await;
        session
    }

    /// Register `email`, log in and fetch a CSRF token. Returns the session and
    /// the new user's id.
    pub async fn user(&self, email: &str) -> (Session, String) {
        let mut session = self.session();
        let reg = session
            .post(routes::REGISTER, &json!({"email": email, "password": PASSWORD}))
            .await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        let res = session.login(email, PASSWORD).await;
        assert_eq!(res.status, 204, "Login failed: {}", res.text);
        session.fetch_csrf().await;
        (session, reg.id())
    }

    /// Register `email` without logging in and return the id.
    pub async fn register(&self, email: &str) -> String {
        let res = self
            .session()
            .post(routes::REGISTER, &json!({"email": email, "password": PASSWORD}))
            .await;
        assert_eq!(res.status, 201, "Registration failed: {}", res.text);
        res.id()
    }
}

impl Session {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn with_csrf(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.csrf {
            Some(token) => builder.header("X-CSRF-Token", token),
            None => builder,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.post(routes::LOGIN, &json!({"email": email, "password": password}))
            .await
    }

    pub async fn fetch_csrf(&mut self) {
        let res = self.get(routes::CSRF).await;
        assert_eq!(res.status, 200, "CSRF fetch failed: {}", res.text);
        self.csrf = res.body["csrf_token"].as_str().map(str::to_owned);
    }

    pub fn forget_csrf(&mut self) {
        self.csrf = None;
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    pub async fn get_with_bearer(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    pub async fn get_bytes(&self, path: &str) -> (u16, HeaderMap, Vec<u8>) {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let bytes = res.bytes().await.expect("Failed to read body").to_vec();
        (status, headers, bytes)
    }

    pub async fn post(&self, path: &str, body: &Value) -> TestResponse {
        let req = self.with_csrf(self.client.post(self.url(path)).json(body));
        TestResponse::from_response(req.send().await.expect("Failed to send POST request")).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> TestResponse {
        let req = self.with_csrf(self.client.put(self.url(path)).json(body));
        TestResponse::from_response(req.send().await.expect("Failed to send PUT request")).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let req = self.with_csrf(self.client.delete(self.url(path)));
        TestResponse::from_response(req.send().await.expect("Failed to send DELETE request"))
            .await
    }

    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        mime: &str,
        source: Option<&str>,
    ) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .expect("Failed to set MIME type");
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(source) = source {
            form = form.text("source", source.to_string());
        }

        let req = self.with_csrf(self.client.post(self.url(routes::UPLOADS)).multipart(form));
        TestResponse::from_response(
            req.send()
                .await
                .expect("Failed to send multipart upload request"),
        )
        .await
    }

    /// Create a role as this session and return its id.
    pub async fn create_role(&self, name: &str) -> String {
        let res = self
            .post(routes::ROLES, &json!({"role_name": name, "role_desc": "Created in a test"}))
            .await;
        assert_eq!(res.status, 201, "create_role failed: {}", res.text);
        res.id()
    }

    /// Create a group as this session and return its id.
    pub async fn create_group(&self, name: &str) -> String {
        let res = self
            .post(routes::GROUPS, &json!({"group_name": name, "permission": "read"}))
            .await;
        assert_eq!(res.status, 201, "create_group failed: {}", res.text);
        res.id()
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            text,
            body,
        }
    }

    pub fn id(&self) -> String {
        self.body["id"]
            .as_str()
            .expect("response body should contain 'id'")
            .to_string()
    }

    /// The `showAlert` payload of the `HX-Trigger` header.
    pub fn alert(&self) -> Value {
        let raw = self
            .headers
            .get("hx-trigger")
            .expect("response should carry HX-Trigger")
            .to_str()
            .expect("HX-Trigger should be ASCII");
        let trigger: Value = serde_json::from_str(raw).expect("HX-Trigger should be JSON");
        trigger["showAlert"].clone()
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get("hx-location")
            .and_then(|v| v.to_str().ok())
    }
}
