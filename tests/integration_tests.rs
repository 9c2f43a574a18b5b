//! Integration tests for the notebook server
//!
//! These drive the full router in-process with `tower::ServiceExt::oneshot`,
//! against a scratch directory holding one provisioned user.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use notebook::auth::{totp, CredentialStore, UserRecord};
use notebook::config::AppConfig;
use notebook::server::{router, AppState};

const USERNAME: &str = "admin";
const PASSWORD: &str = "correct horse";
const SECRET: &str = "JBSWY3DPEHPK3PXP";

struct Fixture {
    _dir: TempDir,
    state: Arc<AppState>,
    app: Router,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::with_root(dir.path());
        config.secret_key = Some("integration-test-key".to_string());
        tweak(&mut config);

        CredentialStore::new(&config.users_file)
            .upsert_user(UserRecord {
                username: USERNAME.to_string(),
                password_hash: bcrypt::hash(PASSWORD, 4).unwrap(),
                totp_secret: SECRET.to_string(),
                role: "admin".to_string(),
            })
            .unwrap();
        fs::create_dir_all(&config.data_dir).unwrap();

        let state = Arc::new(AppState::new(config));
        let app = router(Arc::clone(&state));
        Self { _dir: dir, state, app }
    }

    fn data_dir(&self) -> &std::path::Path {
        &self.state.config.data_dir
    }

    fn write_note(&self, relative: &str, content: &str) {
        let path = self.data_dir().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// Cookie header value for an already-authenticated session.
    fn login_cookie(&self) -> String {
        let id = self.state.sessions.create_session(Some(USERNAME));
        format!("notebook_session={}", self.state.signer.sign(&id))
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn current_code() -> String {
    totp::build(SECRET, 0, "", None).unwrap().generate_current().unwrap()
}

// =============================================================================
// Health / Gate
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fx = Fixture::new();
    let response = fx.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json.get("version").is_some());
}

#[tokio::test]
async fn test_protected_routes_redirect_to_login() {
    let fx = Fixture::new();
    for uri in ["/", "/view/a.md", "/new", "/search?q=x", "/api/tree", "/api/search?q=x"] {
        let response = fx.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&response), "/login", "{}", uri);
    }
}

#[tokio::test]
async fn test_forged_cookie_is_rejected() {
    let fx = Fixture::new();
    let id = fx.state.sessions.create_session(Some(USERNAME));
    let forged = format!("notebook_session={}.{}", id, "00".repeat(32));

    let response = fx.get("/", Some(&forged)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_blocked_handler_does_not_run() {
    let fx = Fixture::new();
    fx.write_note("keep.md", "x");

    let response = fx.post_form("/delete/keep.md", "", None).await;
    assert_eq!(location(&response), "/login");
    assert!(fx.data_dir().join("keep.md").exists());
}

// =============================================================================
// Login / Logout
// =============================================================================

#[tokio::test]
async fn test_login_page_renders() {
    let fx = Fixture::new();
    let response = fx.get("/login", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("name=\"otp\""));
}

#[tokio::test]
async fn test_login_requires_all_fields() {
    let fx = Fixture::new();
    let response = fx.post_form("/login", "username=admin&password=&otp=", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("All fields are required"));
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let fx = Fixture::new();
    let body = format!("username=admin&password=wrong&otp={}", current_code());
    let response = fx.post_form("/login", &body, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).is_none());
    assert!(body_text(response).await.contains("Invalid credentials or verification code"));
}

#[tokio::test]
async fn test_login_with_wrong_code() {
    let fx = Fixture::new();
    let response = fx
        .post_form("/login", "username=admin&password=correct+horse&otp=000000", None)
        .await;
    // A six-zero code could collide with the real one; only assert on a mismatch.
    if current_code() != "000000" {
        assert!(set_cookie(&response).is_none());
    }
}

#[tokio::test]
async fn test_login_success_grants_access() {
    let fx = Fixture::new();
    let body = format!("username=admin&password=correct+horse&otp={}", current_code());
    let response = fx.post_form("/login", &body, None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let cookie = set_cookie(&response).expect("session cookie");
    assert!(cookie.starts_with("notebook_session=sess_"));

    let response = fx.get("/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_clears_identity() {
    let fx = Fixture::new();
    let cookie = fx.login_cookie();

    let response = fx.get("/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let response = fx.get("/", Some(&cookie)).await;
    assert_eq!(location(&response), "/login");

    let response = fx.get("/login", Some(&cookie)).await;
    assert!(body_text(response).await.contains("You have been logged out"));
}

#[tokio::test]
async fn test_logout_without_session() {
    let fx = Fixture::new();
    let response = fx.get("/logout", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(set_cookie(&response).is_none());

    let target = location(&response).to_string();
    assert!(target.starts_with("/login?"));
    let response = fx.get(&target, None).await;
    assert!(body_text(response).await.contains("You have been logged out"));
}

#[tokio::test]
async fn test_anonymous_logouts_allocate_no_sessions() {
    let fx = Fixture::new();
    let stale = format!("notebook_session={}", fx.state.signer.sign("sess_gone"));

    for _ in 0..200 {
        fx.get("/logout", None).await;
    }
    let response = fx.get("/logout", Some(&stale)).await;
    assert!(set_cookie(&response).unwrap().starts_with("notebook_session="));

    assert_eq!(fx.state.sessions.active_session_count(), 0);
}

#[tokio::test]
async fn test_internal_error_page_uses_app_name() {
    let fx = Fixture::with_config(|config| config.app_name = "Field Journal".to_string());
    fs::write(&fx.state.config.users_file, "{ not json").unwrap();

    let body = format!("username=admin&password=x&otp={}", current_code());
    let response = fx.post_form("/login", &body, None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let html = body_text(response).await;
    assert!(html.contains("Field Journal"));
    assert!(html.contains("ERR-"));
    assert!(!html.contains("not json"));
}

// =============================================================================
// Notes
// =============================================================================

#[tokio::test]
async fn test_index_lists_tree() {
    let fx = Fixture::new();
    fx.write_note("notes/a.md", "# A");
    fx.write_note("notes/skip.pdf", "x");
    fx.write_note(".hidden/secret.md", "x");
    let cookie = fx.login_cookie();

    let html = body_text(fx.get("/", Some(&cookie)).await).await;
    assert!(html.contains("/view/notes/a.md"));
    assert!(!html.contains("skip.pdf"));
    assert!(!html.contains("secret.md"));
}

#[tokio::test]
async fn test_create_then_view() {
    let fx = Fixture::new();
    let cookie = fx.login_cookie();

    let response = fx
        .post_form("/create", "filename=ideas&directory=projects&content=%23+Ideas%0Afirst", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/view/projects/ideas.md");
    assert_eq!(
        fs::read_to_string(fx.data_dir().join("projects/ideas.md")).unwrap(),
        "# Ideas\nfirst"
    );

    let html = body_text(fx.get("/view/projects/ideas.md", Some(&cookie)).await).await;
    assert!(html.contains("File created successfully"));
    assert!(html.contains("<h1>Ideas</h1>"));
}

#[tokio::test]
async fn test_create_existing_file_keeps_draft() {
    let fx = Fixture::new();
    fx.write_note("a.md", "original");
    let cookie = fx.login_cookie();

    let response = fx.post_form("/create", "filename=a.md&content=draft", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("File already exists"));
    assert!(html.contains("draft"));
    assert_eq!(fs::read_to_string(fx.data_dir().join("a.md")).unwrap(), "original");
}

#[tokio::test]
async fn test_view_missing_file() {
    let fx = Fixture::new();
    let cookie = fx.login_cookie();

    let response = fx.get("/view/nope.md", Some(&cookie)).await;
    assert_eq!(location(&response), "/");

    let html = body_text(fx.get("/", Some(&cookie)).await).await;
    assert!(html.contains("File not found"));
}

#[tokio::test]
async fn test_view_plain_text_is_escaped() {
    let fx = Fixture::new();
    fx.write_note("raw.txt", "<b>bold?</b>");
    let cookie = fx.login_cookie();

    let html = body_text(fx.get("/view/raw.txt", Some(&cookie)).await).await;
    assert!(html.contains("&lt;b&gt;bold?"));
    assert!(!html.contains("<b>bold"));
}

#[tokio::test]
async fn test_save_overwrites() {
    let fx = Fixture::new();
    fx.write_note("a.md", "old");
    let cookie = fx.login_cookie();

    let response = fx.post_form("/save/a.md", "content=new+text", Some(&cookie)).await;
    assert_eq!(location(&response), "/view/a.md");
    assert_eq!(fs::read_to_string(fx.data_dir().join("a.md")).unwrap(), "new text");
}

#[tokio::test]
async fn test_delete_missing_changes_nothing() {
    let fx = Fixture::new();
    fx.write_note("keep.md", "x");
    let cookie = fx.login_cookie();

    let response = fx.post_form("/delete/gone.md", "", Some(&cookie)).await;
    assert_eq!(location(&response), "/");
    assert!(fx.data_dir().join("keep.md").exists());

    let html = body_text(fx.get("/", Some(&cookie)).await).await;
    assert!(html.contains("File not found"));
}

#[tokio::test]
async fn test_delete_existing() {
    let fx = Fixture::new();
    fx.write_note("bye.md", "x");
    let cookie = fx.login_cookie();

    fx.post_form("/delete/bye.md", "", Some(&cookie)).await;
    assert!(!fx.data_dir().join("bye.md").exists());
}

fn multipart_body(boundary: &str, filename: &str, content: &str, directory: &str) -> String {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"directory\"\r\n\r\n{d}\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n{c}\r\n--{b}--\r\n",
        b = boundary,
        d = directory,
        f = filename,
        c = content
    )
}

async fn upload(fx: &Fixture, cookie: &str, filename: &str, content: &str, directory: &str) -> Response {
    let boundary = "XBOUNDARYX";
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(multipart_body(boundary, filename, content, directory)))
        .unwrap();
    fx.send(request).await
}

#[tokio::test]
async fn test_upload_allowed_file() {
    let fx = Fixture::new();
    let cookie = fx.login_cookie();

    let response = upload(&fx, &cookie, "Meeting Notes.txt", "agenda", "inbox").await;
    assert_eq!(location(&response), "/");
    assert_eq!(
        fs::read_to_string(fx.data_dir().join("inbox/Meeting_Notes.txt")).unwrap(),
        "agenda"
    );
}

#[tokio::test]
async fn test_upload_disallowed_extension_writes_nothing() {
    let fx = Fixture::new();
    let cookie = fx.login_cookie();

    let response = upload(&fx, &cookie, "tool.exe", "MZ", "").await;
    assert_eq!(location(&response), "/");
    assert!(!fx.data_dir().join("tool.exe").exists());

    let html = body_text(fx.get("/", Some(&cookie)).await).await;
    assert!(html.contains("Invalid file type"));
}

#[tokio::test]
async fn test_upload_with_truncated_directory_field_writes_nothing() {
    let fx = Fixture::new();
    let cookie = fx.login_cookie();

    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.md\"\r\n\
         Content-Type: application/octet-stream\r\n\r\ncontent\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"directory\"\r\n\r\ninb",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::COOKIE, &cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let response = fx.send(request).await;
    assert_eq!(location(&response), "/");
    assert!(!fx.data_dir().join("a.md").exists());
    assert!(!fx.data_dir().join("inb").exists());

    let html = body_text(fx.get("/", Some(&cookie)).await).await;
    assert!(html.contains("Error uploading file"));
}

#[tokio::test]
async fn test_upload_without_file() {
    let fx = Fixture::new();
    let cookie = fx.login_cookie();

    upload(&fx, &cookie, "", "", "").await;
    let html = body_text(fx.get("/", Some(&cookie)).await).await;
    assert!(html.contains("No file selected"));
}

// =============================================================================
// Search / API
// =============================================================================

#[tokio::test]
async fn test_api_search() {
    let fx = Fixture::new();
    fx.write_note("notes/a.md", "hello\nfoo bar\nbaz");
    fx.write_note("notes/report.txt", "nothing");
    let cookie = fx.login_cookie();

    let response = fx.get("/api/search?q=FOO", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    let results = json.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["path"], "notes/a.md");
    assert_eq!(results[0]["match_type"], "content");
    assert_eq!(results[0]["line"], 2);
    assert_eq!(results[0]["context"], "hello\nfoo bar\nbaz");

    let response = fx.get("/api/search?q=report", Some(&cookie)).await;
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json[0]["match_type"], "filename");
    assert!(json[0].get("context").is_none());
}

#[tokio::test]
async fn test_api_search_blank_query() {
    let fx = Fixture::new();
    fx.write_note("a.md", "anything");
    let cookie = fx.login_cookie();

    let response = fx.get("/api/search?q=+", Some(&cookie)).await;
    assert_eq!(body_text(response).await, "[]");
}

#[tokio::test]
async fn test_api_tree() {
    let fx = Fixture::new();
    fx.write_note("notes/a.md", "12345");
    let cookie = fx.login_cookie();

    let response = fx.get("/api/tree", Some(&cookie)).await;
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json[0]["type"], "directory");
    assert_eq!(json[0]["name"], "notes");
    assert_eq!(json[0]["children"][0]["path"], "notes/a.md");
    assert_eq!(json[0]["children"][0]["size"], 5);
}

#[tokio::test]
async fn test_search_page() {
    let fx = Fixture::new();
    fx.write_note("journal.md", "a day");
    let cookie = fx.login_cookie();

    let html = body_text(fx.get("/search?q=journal", Some(&cookie)).await).await;
    assert!(html.contains("/view/journal.md"));
}

#[tokio::test]
async fn test_traversal_is_refused() {
    let fx = Fixture::new();
    let cookie = fx.login_cookie();

    let response = fx.post_form("/save/..%2Fescape.md", "content=x", Some(&cookie)).await;
    assert_eq!(location(&response), "/");
    assert!(!fx.data_dir().parent().unwrap().join("escape.md").exists());
}
