//! Shared helpers for the test suites: an in-memory database, a fully
//! wired application router, and request plumbing.
//!
//! The pool is capped at a single connection: an in-memory SQLite database
//! exists per connection, so one connection *is* the database. Handlers
//! already release their pooled connection before acquiring another, which
//! keeps everything deadlock-free under this cap.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use serde_json::{Value, json};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    AppState,
    api::models::{auth::TokenPair, users::Role},
    auth::password,
    config::{Argon2Config, Config, Environment},
    db::handlers::{Repository, Users},
    db::models::{
        personas::{PersonaCreateDBRequest, PersonaUpdateDBRequest, PhotoSet},
        registros::RegistroCreateDBRequest,
        users::UserCreateDBRequest,
    },
    metrics::Metrics,
    types::{PersonaId, UserId},
    uploads::UploadStore,
};

/// Open a migrated in-memory database.
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::new().in_memory(true).foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("open in-memory sqlite");

    crate::MIGRATOR.run(&pool).await.expect("run migrations");
    pool
}

/// Config tuned for tests: cheap hashing, fixed secrets, isolated uploads.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.environment = Environment::Test;
    config.auth.access_secret = "test-access-secret".to_string();
    config.auth.refresh_secret = "test-refresh-secret".to_string();
    config.auth.argon2 = Argon2Config {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };
    config.uploads.directory = std::env::temp_dir()
        .join(format!("sima-test-{}", Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();
    config
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub raw: Vec<u8>,
}

/// A fully wired application over an in-memory database, with the default
/// admin (admin / admin123) already seeded.
pub struct TestContext {
    pub state: AppState,
    pub router: Router,
}

impl TestContext {
    pub async fn new() -> Self {
        let config = test_config();
        let pool = test_pool().await;

        let uploads = Arc::new(UploadStore::from_config(&config.uploads));
        uploads.ensure_dir().await.expect("create uploads dir");

        let state = AppState {
            db: pool,
            config,
            metrics: Arc::new(Metrics::default()),
            uploads,
        };

        crate::bootstrap_admin(&state.db, &state.config).await.expect("seed admin");

        let router = crate::router(state.clone());
        Self { state, router }
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("infallible service");
        let status = response.status();
        let headers = response.headers().clone();
        let raw = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body")
            .to_vec();
        let body = serde_json::from_slice(&raw).unwrap_or(Value::Null);
        TestResponse {
            status,
            headers,
            body,
            raw,
        }
    }

    /// Issue a JSON (or body-less) request against the app.
    pub async fn request(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&value).expect("serialize body")))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        self.send(request).await
    }

    /// Issue a multipart/form-data request with text fields and files.
    pub async fn multipart_request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
    ) -> TestResponse {
        let boundary = "sima-test-boundary";
        let mut body: Vec<u8> = Vec::new();

        for (name, value) in fields {
            body.extend_from_slice(
                format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            );
        }
        for (name, filename, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"));
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        self.send(builder.body(Body::from(body)).expect("build request")).await
    }

    /// Log in and return the issued token pair; panics on failure.
    pub async fn login(&self, usuario: &str, password: &str) -> TokenPair {
        let response = self
            .request(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"usuario": usuario, "password": password})),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {:?}", response.body);
        serde_json::from_value(response.body).expect("token pair")
    }

    /// Insert a user directly (password admin123) and return its id.
    pub async fn seed_user(&self, usuario: &str, rol: Role, activo: bool) -> UserId {
        let password_hash = password::hash_password("admin123", self.state.config.auth.argon2).expect("hash");
        let mut conn = self.state.db.acquire().await.expect("acquire");
        Users::new(&mut conn)
            .create(&UserCreateDBRequest {
                usuario: usuario.to_string(),
                nombre: "Agente".to_string(),
                apellido: "Prueba".to_string(),
                rol,
                activo,
                password_hash,
                token_version: 0,
                created_by: None,
            })
            .await
            .expect("seed user")
    }
}

/// A minimal user create request for repository tests. The hash is opaque:
/// these tests never log in through the API.
pub fn create_request(usuario: &str, rol: Role) -> UserCreateDBRequest {
    UserCreateDBRequest {
        usuario: usuario.to_string(),
        nombre: "Nombre".to_string(),
        apellido: "Apellido".to_string(),
        rol,
        activo: true,
        password_hash: "$fake$hash".to_string(),
        token_version: 0,
        created_by: None,
    }
}

pub fn persona_request(nombre: &str, apellido: &str, dni: &str) -> PersonaCreateDBRequest {
    PersonaCreateDBRequest {
        nombre: nombre.to_string(),
        apellido: apellido.to_string(),
        dni: dni.to_string(),
        fecha_nacimiento: None,
        nacionalidad: None,
        direccion: None,
        telefono: None,
        email: None,
        observaciones: None,
        comisaria: None,
        photos: PhotoSet::default(),
        created_by: None,
    }
}

pub fn persona_update_request(nombre: &str, apellido: &str, dni: &str, photos: Option<PhotoSet>) -> PersonaUpdateDBRequest {
    PersonaUpdateDBRequest {
        nombre: nombre.to_string(),
        apellido: apellido.to_string(),
        dni: dni.to_string(),
        fecha_nacimiento: None,
        nacionalidad: None,
        direccion: None,
        telefono: None,
        email: None,
        observaciones: None,
        comisaria: None,
        photos,
        updated_by: None,
    }
}

pub fn registro_request(persona_id: PersonaId, tipo_delito: &str) -> RegistroCreateDBRequest {
    RegistroCreateDBRequest {
        persona_id,
        tipo_delito: tipo_delito.to_string(),
        lugar: None,
        estado: None,
        juzgado: None,
        detalle: None,
        created_by: None,
    }
}
