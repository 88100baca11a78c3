//! Integration tests for the OSIS backend.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::events::{ChangeFeed, ChangeOp, TableName};
use crate::storage::PhotoStore;
use crate::sync::TableView;
use crate::{create_router, AppState};

const TEST_PASSWORD: &str = "test-password";

/// Test fixture for integration tests.
struct TestFixture {
    /// Client carrying a valid admin session token.
    client: Client,
    base_url: String,
    state: AppState,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let storage_path = temp_dir.path().join("images");

        // Initialize database and photo bucket
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));
        let photos = Arc::new(
            PhotoStore::open(&storage_path)
                .await
                .expect("Failed to init bucket"),
        );

        // Bind to random port first so the public base URL is known
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        let config = Config {
            admin_password: Some(TEST_PASSWORD.to_string()),
            db_path,
            storage_path,
            public_base_url: base_url.clone(),
            bind_addr: addr,
            session_ttl_hours: 1,
            log_level: "warn".to_string(),
        };

        let state = AppState {
            repo,
            photos,
            feed: ChangeFeed::new(64),
            config: Arc::new(config),
        };

        let app = create_router(state.clone());

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Sign in and build a client with the session token attached
        let login_resp = Client::new()
            .post(format!("{}/api/auth/login", base_url))
            .json(&json!({ "password": TEST_PASSWORD }))
            .send()
            .await
            .expect("Login request failed");
        assert_eq!(login_resp.status(), 200);
        let login_body: Value = login_resp.json().await.unwrap();
        let token = login_body["data"]["token"].as_str().unwrap().to_string();

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", token).parse().unwrap(),
        );

        TestFixture {
            client: Client::builder().default_headers(headers).build().unwrap(),
            base_url,
            state,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Upsert a member through the admin API and return the response body.
    async fn upsert_member(&self, nis: &str, nama: &str, kelas: &str, jabatan: &str) -> Value {
        self.upsert_member_with_code("01", nis, nama, kelas, jabatan)
            .await
    }

    async fn upsert_member_with_code(
        &self,
        kode: &str,
        nis: &str,
        nama: &str,
        kelas: &str,
        jabatan: &str,
    ) -> Value {
        let resp = self
            .client
            .put(self.url("/api/admin/members"))
            .json(&json!({
                "tahun_lulus": "26",
                "kode_jabatan": kode,
                "nis": nis,
                "nama": nama,
                "kelas": kelas,
                "nama_jabatan": jabatan
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_admin_requires_session() {
    let fixture = TestFixture::new().await;

    // Request without a token
    let resp = Client::new()
        .get(fixture.url("/api/admin/aspirations"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_admin_rejects_invalid_token() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .get(fixture.url("/api/admin/aspirations"))
        .header("Authorization", "Bearer not-a-session")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "password": "wrong" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_session_lookup_tri_state() {
    let fixture = TestFixture::new().await;

    // No token: explicit unauthenticated, not an error
    let resp = Client::new()
        .get(fixture.url("/api/auth/session"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["state"], "unauthenticated");

    // The fixture's token: authenticated, with an expiry
    let resp = fixture
        .client
        .get(fixture.url("/api/auth/session"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["state"], "authenticated");
    assert!(body["data"]["expires_at"].is_string());

    // After logout the same token resolves to unauthenticated
    let resp = fixture
        .client
        .post(fixture.url("/api/admin/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url("/api/auth/session"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["state"], "unauthenticated");
}

#[tokio::test]
async fn test_member_upsert_derives_key() {
    let fixture = TestFixture::new().await;

    let body = fixture
        .upsert_member("240917", "Andi Pratama", "XI SIJA 1", "Ketua")
        .await;

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["nba"], "26.01.240917");
    assert!(body["data"]["created_at"].is_string());

    // Visible on the public roster
    let resp = Client::new()
        .get(fixture.url("/api/members"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let list: Value = resp.json().await.unwrap();
    let members = list["data"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["nba"], "26.01.240917");
}

#[tokio::test]
async fn test_member_upsert_overwrites_by_key() {
    let fixture = TestFixture::new().await;

    let first = fixture
        .upsert_member("240917", "Andi", "XI SIJA 1", "Ketua")
        .await;
    let created_at = first["data"]["created_at"].as_str().unwrap().to_string();

    // Same constituent fields, new display data: overwrite, not insert
    let second = fixture
        .upsert_member("240917", "Andi Pratama", "XII SIJA 1", "Ketua")
        .await;
    assert_eq!(second["data"]["nba"], "26.01.240917");
    assert_eq!(second["data"]["nama"], "Andi Pratama");
    assert_eq!(second["data"]["created_at"], created_at.as_str());

    let resp = fixture
        .client
        .get(fixture.url("/api/members"))
        .send()
        .await
        .unwrap();
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
    assert_eq!(list["data"][0]["nama"], "Andi Pratama");
}

#[tokio::test]
async fn test_member_upsert_rejects_empty_nis() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .put(fixture.url("/api/admin/members"))
        .json(&json!({
            "tahun_lulus": "26",
            "kode_jabatan": "01",
            "nis": "",
            "nama": "Andi",
            "kelas": "XI A",
            "nama_jabatan": "Ketua"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // No key with a trailing separator reaches the table
    let resp = Client::new()
        .get(fixture.url("/api/members"))
        .send()
        .await
        .unwrap();
    let list: Value = resp.json().await.unwrap();
    assert!(list["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_member_delete_by_key() {
    let fixture = TestFixture::new().await;

    fixture
        .upsert_member("240917", "Andi", "XI A", "Ketua")
        .await;

    let resp = fixture
        .client
        .delete(fixture.url("/api/admin/members/26.01.240917"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // A subsequent fetch must not contain the key
    let resp = Client::new()
        .get(fixture.url("/api/members"))
        .send()
        .await
        .unwrap();
    let list: Value = resp.json().await.unwrap();
    assert!(list["data"].as_array().unwrap().is_empty());

    // Deleting again is a 404
    let resp = fixture
        .client
        .delete(fixture.url("/api/admin/members/26.01.240917"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_roster_filter_endpoint() {
    let fixture = TestFixture::new().await;

    fixture
        .upsert_member("100", "Andi", "XI A", "Ketua")
        .await;
    fixture
        .upsert_member_with_code("06", "200", "Budi", "XI B", "Anggota")
        .await;
    fixture
        .upsert_member_with_code("05", "300", "Citra", "XII C", "Sekbid 3: TIK")
        .await;

    let client = Client::new();

    // Case-insensitive name match
    let resp = client
        .get(fixture.url("/api/members?q=and"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let members = body["data"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["nama"], "Andi");

    // Category token as substring of the display role title
    let resp = client
        .get(fixture.url("/api/members?jabatan=Sekbid"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let members = body["data"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["nama_jabatan"], "Sekbid 3: TIK");

    // Both predicates ANDed: no record is both "Budi" and a Sekbid
    let resp = client
        .get(fixture.url("/api/members?q=budi&jabatan=Sekbid"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());

    // No params: full roster
    let resp = client
        .get(fixture.url("/api/members"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_aspiration_submission_defaults() {
    let fixture = TestFixture::new().await;

    // Public submission with only the message
    let resp = Client::new()
        .post(fixture.url("/api/aspirations"))
        .json(&json!({ "pesan": "Tolong perbanyak kegiatan olahraga" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["nama"], "Anonim");
    assert_eq!(body["data"]["kelas"], "-");
    assert!(body["data"]["id"].is_number());

    // Visible in the admin inbox
    let resp = fixture
        .client
        .get(fixture.url("/api/admin/aspirations"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let aspirations = body["data"].as_array().unwrap();
    assert_eq!(aspirations.len(), 1);
    assert_eq!(aspirations[0]["pesan"], "Tolong perbanyak kegiatan olahraga");
}

#[tokio::test]
async fn test_aspiration_empty_message_rejected() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .post(fixture.url("/api/aspirations"))
        .json(&json!({ "nama": "Budi", "pesan": "   " }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // No row was written
    let resp = fixture
        .client
        .get(fixture.url("/api/admin/aspirations"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_aspiration_delete() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .post(fixture.url("/api/aspirations"))
        .json(&json!({ "nama": "Citra", "kelas": "XI TKJ 2", "pesan": "Kantin kurang luas" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let id = body["data"]["id"].as_i64().unwrap();

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/admin/aspirations/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/aspirations"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_photo_upload_then_persist() {
    let fixture = TestFixture::new().await;

    // Step 1: upload the photo; the object name derives from the NBA
    let form = reqwest::multipart::Form::new()
        .text("tahun_lulus", "26")
        .text("kode_jabatan", "01")
        .text("nis", "240917")
        .part(
            "file",
            reqwest::multipart::Part::bytes(b"fake-png-bytes".to_vec()).file_name("foto.png"),
        );

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/members/photo"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let foto_url = body["data"]["foto_url"].as_str().unwrap().to_string();
    assert!(foto_url.starts_with("26.01.240917-"));
    assert!(foto_url.ends_with(".png"));
    let public_url = body["data"]["public_url"].as_str().unwrap();
    assert_eq!(
        public_url,
        format!("{}/images/{}", fixture.base_url, foto_url)
    );

    // The blob is publicly retrievable
    let resp = Client::new().get(public_url).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"fake-png-bytes");

    // Step 2: upsert the record referencing the bare object name
    let resp = fixture
        .client
        .put(fixture.url("/api/admin/members"))
        .json(&json!({
            "tahun_lulus": "26",
            "kode_jabatan": "01",
            "nis": "240917",
            "nama": "Andi",
            "kelas": "XI A",
            "nama_jabatan": "Ketua",
            "foto_url": foto_url
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["foto_url"], foto_url.as_str());
}

#[tokio::test]
async fn test_photo_upload_requires_nis() {
    let fixture = TestFixture::new().await;

    let form = reqwest::multipart::Form::new()
        .text("tahun_lulus", "26")
        .text("kode_jabatan", "01")
        .text("nis", "")
        .part(
            "file",
            reqwest::multipart::Part::bytes(b"bytes".to_vec()).file_name("foto.jpg"),
        );

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/members/photo"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // The aborted workflow wrote no member row
    let resp = Client::new()
        .get(fixture.url("/api/members"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_revision_increases_on_every_write() {
    let fixture = TestFixture::new().await;

    let body = fixture
        .upsert_member("100", "Andi", "XI A", "Ketua")
        .await;
    let r1 = body["revision_id"].as_i64().unwrap();

    let resp = Client::new()
        .post(fixture.url("/api/aspirations"))
        .json(&json!({ "pesan": "Halo" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let r2 = body["revision_id"].as_i64().unwrap();
    assert!(r2 > r1);

    let resp = fixture
        .client
        .delete(fixture.url("/api/admin/members/26.01.100"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let r3 = body["revision_id"].as_i64().unwrap();
    assert!(r3 > r2);
}

#[tokio::test]
async fn test_change_feed_publishes_on_writes() {
    let fixture = TestFixture::new().await;
    let mut rx = fixture.state.feed.subscribe();

    fixture
        .upsert_member("100", "Andi", "XI A", "Ketua")
        .await;
    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("No change event")
        .unwrap();
    assert_eq!(event.table, TableName::Members);
    assert_eq!(event.op, ChangeOp::Insert);
    let first_revision = event.revision_id;

    // Overwriting the same key is an update
    fixture
        .upsert_member("100", "Andi Pratama", "XI A", "Ketua")
        .await;
    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("No change event")
        .unwrap();
    assert_eq!(event.op, ChangeOp::Update);
    assert!(event.revision_id > first_revision);

    // Aspirations are watched too
    Client::new()
        .post(fixture.url("/api/aspirations"))
        .json(&json!({ "pesan": "Halo" }))
        .send()
        .await
        .unwrap();
    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("No change event")
        .unwrap();
    assert_eq!(event.table, TableName::Aspirations);
    assert_eq!(event.op, ChangeOp::Insert);
}

#[tokio::test]
async fn test_stale_fetch_response_discarded() {
    let fixture = TestFixture::new().await;
    let client = Client::new();

    fixture
        .upsert_member("100", "Andi", "XI A", "Ketua")
        .await;

    // First fetch, taken before the second write
    let resp = client
        .get(fixture.url("/api/members"))
        .send()
        .await
        .unwrap();
    let early: Value = resp.json().await.unwrap();

    fixture
        .upsert_member_with_code("06", "200", "Budi", "XI B", "Anggota")
        .await;

    let resp = client
        .get(fixture.url("/api/members"))
        .send()
        .await
        .unwrap();
    let late: Value = resp.json().await.unwrap();

    // The late response lands first; the early one arrives stale
    let mut view = TableView::new();
    assert!(view.apply(
        late["revision_id"].as_i64().unwrap(),
        late["data"].as_array().unwrap().clone()
    ));
    assert!(!view.apply(
        early["revision_id"].as_i64().unwrap(),
        early["data"].as_array().unwrap().clone()
    ));
    assert_eq!(view.rows().len(), 2);
}
