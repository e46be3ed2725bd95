use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use chrono::Utc;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use campus_events::error::Result;
use campus_events::modules::auth::interface::UserRepository;
use campus_events::modules::auth::model::{Role, User};
use campus_events::services::hashing;
use campus_events::services::image_store::LocalImageStore;
use campus_events::services::jwt::JwtService;
use campus_events::services::mailer::Mailer;
use campus_events::services::metrics::MetricsRegistry;
use campus_events::services::realtime::RealtimeHub;
use campus_events::store::MemoryStore;
use campus_events::{AppState, Settings};

// Allow dead_code for utilities used by other test files
#[allow(dead_code)]
pub const MAX_IMAGE_BYTES: usize = 64 * 1024;

/// Captures OTP codes instead of sending mail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

#[allow(dead_code)]
impl RecordingMailer {
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_otp(&self, email: &str, _name: &str, code: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), code.to_string()));
        Ok(())
    }
}

/// A logged-in account.
#[allow(dead_code)]
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub password: String,
    pub access_token: String,
}

#[allow(dead_code)]
pub struct TestContext {
    pub server: TestServer,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub realtime: Arc<RealtimeHub>,
    pub metrics: Arc<MetricsRegistry>,
    pub upload_dir: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub async fn new() -> Self {
        Self::with_rate_limit(1000).await
    }

    pub async fn with_rate_limit(burst: u32) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let realtime = Arc::new(RealtimeHub::default());
        let metrics = MetricsRegistry::new().expect("Failed to create metrics registry");

        let upload_dir = std::env::temp_dir().join(format!("campus-events-test-{}", uuid::Uuid::new_v4()));
        let images = LocalImageStore::new(&upload_dir, "http://localhost:3000")
            .await
            .expect("Failed to create upload dir");

        let state = AppState {
            store: store.clone(),
            jwt_service: JwtService::new(
                "test-access-secret-for-testing-only".to_string(),
                "test-refresh-secret-for-testing-only".to_string(),
            ),
            realtime: realtime.clone(),
            images: Arc::new(images),
            mailer: mailer.clone(),
            metrics: metrics.clone(),
            settings: Settings {
                cookie_secure: false,
                max_image_bytes: MAX_IMAGE_BYTES,
                auth_rate_limit_burst: burst,
                uploads_dir: Some(upload_dir.clone()),
            },
        };

        let app = campus_events::create_app(state).await;
        let server = TestServer::new(app).expect("Failed to create test server");

        Self {
            server,
            store,
            mailer,
            realtime,
            metrics,
            upload_dir,
        }
    }

    /// Inserts an account with the given role directly into the store.
    pub async fn create_user(&self, role: Role) -> (String, String) {
        let now = Utc::now();
        let email = test_email();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            name: format!("{} user", role),
            email: email.clone(),
            password_hash: hashing::hash_password(test_password()).unwrap(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.store.create_user(&user).await.unwrap();
        (user.id, email)
    }

    pub async fn login(&self, email: &str, password: &str) -> axum_test::TestResponse {
        self.server
            .post("/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .await
    }

    /// Creates an account with `role` and logs it in.
    pub async fn user_with_role(&self, role: Role) -> TestUser {
        let (id, email) = self.create_user(role).await;
        let response = self.login(&email, test_password()).await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();

        TestUser {
            id,
            email,
            password: test_password().to_string(),
            access_token: body["accessToken"].as_str().unwrap().to_string(),
        }
    }

    pub async fn student(&self) -> TestUser {
        self.user_with_role(Role::Student).await
    }

    pub async fn admin(&self) -> TestUser {
        self.user_with_role(Role::Admin).await
    }

    pub async fn super_admin(&self) -> TestUser {
        self.user_with_role(Role::SuperAdmin).await
    }

    /// Submits a valid event as `admin` and returns the response body.
    pub async fn create_event(&self, admin: &TestUser, name: &str) -> Value {
        let response = self
            .server
            .post("/event")
            .authorization_bearer(&admin.access_token)
            .multipart(event_form(name))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    /// Number of posters currently stored on disk.
    pub fn stored_images(&self) -> usize {
        std::fs::read_dir(&self.upload_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

// Helper to generate unique test email
#[allow(dead_code)]
pub fn test_email() -> String {
    format!("test_{}@example.com", uuid::Uuid::new_v4())
}

// Helper to generate test password
#[allow(dead_code)]
pub fn test_password() -> &'static str {
    "TestPassword123!"
}

/// Smallest valid PNG header; enough for a poster upload.
#[allow(dead_code)]
pub fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0]
}

#[allow(dead_code)]
pub fn event_form(name: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("name", name)
        .add_text("date", "2026-11-20")
        .add_text("startTime", "10:00")
        .add_text("endTime", "12:00")
        .add_text("location", "Main Auditorium")
        .add_text("speaker", "Dr. Okafor")
        .add_text("description", "An afternoon of talks")
        .add_part(
            "image",
            Part::bytes(png_bytes())
                .file_name("poster.png")
                .mime_type("image/png"),
        )
}
