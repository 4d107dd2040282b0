use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct TimerResponse {
    remaining_seconds: u32,
    running: bool,
    mode: String,
    task_label: String,
    preset_seconds: u32,
    display: String,
}

#[derive(Debug, Deserialize)]
struct TestResponse {
    id: i64,
    name: String,
    date: String,
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    id: i64,
    file_name: String,
    tags: Vec<String>,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("study_assist_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/timer")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_study_assist"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env("RUST_LOG", "info")
        .env_remove("SLACK_WEBHOOK_URL")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn post_timer(client: &Client, server: &TestServer, path: &str, body: serde_json::Value) -> reqwest::Response {
    client
        .post(format!("{}/api/timer/{path}", server.base_url))
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_timer_start_pause_and_conflicts() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    post_timer(&client, &server, "mode", serde_json::json!({ "mode": "work" })).await;

    let started: TimerResponse = post_timer(&client, &server, "start", serde_json::json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert!(started.running);
    assert_eq!(started.mode, "work");
    assert_eq!(started.preset_seconds, 1500);

    let again = post_timer(&client, &server, "start", serde_json::json!({})).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let paused: TimerResponse = post_timer(&client, &server, "pause", serde_json::json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert!(!paused.running);
    assert!(paused.remaining_seconds <= 1500);

    let not_running = post_timer(&client, &server, "pause", serde_json::json!({})).await;
    assert_eq!(not_running.status(), StatusCode::CONFLICT);

    post_timer(&client, &server, "reset", serde_json::json!({})).await;
}

#[tokio::test]
async fn http_timer_mode_task_and_visibility() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let task: TimerResponse = post_timer(&client, &server, "task", serde_json::json!({ "task_name": "  Algebra " }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(task.task_label, "Algebra");

    let brk: TimerResponse = post_timer(&client, &server, "mode", serde_json::json!({ "mode": "break" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(brk.mode, "break");
    assert_eq!(brk.remaining_seconds, 300);
    assert_eq!(brk.display, "05:00");
    assert!(!brk.running);

    post_timer(&client, &server, "start", serde_json::json!({})).await;
    let hidden = post_timer(&client, &server, "visibility", serde_json::json!({ "state": "hidden" })).await;
    assert!(hidden.status().is_success());
    let visible: TimerResponse = post_timer(&client, &server, "visibility", serde_json::json!({ "state": "visible" }))
        .await
        .json()
        .await
        .unwrap();
    assert!(visible.running);
    assert!(visible.remaining_seconds <= 300);

    let reset: TimerResponse = post_timer(&client, &server, "reset", serde_json::json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert!(!reset.running);
    assert_eq!(reset.remaining_seconds, 300);

    let work: TimerResponse = post_timer(&client, &server, "mode", serde_json::json!({ "mode": "work" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(work.remaining_seconds, 1500);
}

#[tokio::test]
async fn http_tests_add_remind_and_delete() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let invalid = client
        .post(format!("{}/api/tests", server.base_url))
        .json(&serde_json::json!({ "name": "Chemistry", "date": "next week" }))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/api/tests", server.base_url))
        .json(&serde_json::json!({ "name": "Chemistry", "subject": "Science", "date": "2099-06-01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: TestResponse = response.json().await.unwrap();
    assert_eq!(created.name, "Chemistry");
    assert_eq!(created.date, "2099-06-01");

    let remind = client
        .post(format!("{}/api/tests/{}/remind", server.base_url, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(remind.status(), StatusCode::SERVICE_UNAVAILABLE);

    let deleted = client
        .delete(format!("{}/api/tests/{}", server.base_url, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let missing = client
        .delete(format!("{}/api/tests/{}", server.base_url, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_stats_has_seven_days() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let stats: serde_json::Value = client
        .get(format!("{}/api/stats", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(stats["last_7_days"].as_array().map(Vec::len), Some(7));
    assert!(stats["today"]["count"].is_u64());
    assert!(stats["monthly"]["avg_per_day"].is_number());
    assert!(stats["streak"].is_u64());
}

#[tokio::test]
async fn http_archive_upload_filter_and_download() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/archives", server.base_url))
        .json(&serde_json::json!({
            "file_name": "notes.txt",
            "school": "North High",
            "subject": "Math",
            "test_type": "Midterm",
            "date": "2024-05-20",
            "tags": "algebra, review",
            "file_data": "data:text/plain;base64,aGVsbG8="
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: ArchiveResponse = response.json().await.unwrap();
    assert_eq!(created.file_name, "notes.txt");
    assert_eq!(created.tags, vec!["algebra", "review"]);

    let filtered: Vec<ArchiveResponse> = client
        .get(format!("{}/api/archives?subject=Math&school=North", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(filtered.iter().any(|a| a.id == created.id));

    let other: Vec<ArchiveResponse> = client
        .get(format!("{}/api/archives?subject=English", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(other.iter().all(|a| a.id != created.id));

    let download = client
        .get(format!("{}/api/archives/{}/download", server.base_url, created.id))
        .send()
        .await
        .unwrap();
    assert!(download.status().is_success());
    assert_eq!(
        download.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("text/plain")
    );
    assert_eq!(download.text().await.unwrap(), "hello");

    let deleted = client
        .delete(format!("{}/api/archives/{}", server.base_url, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn http_index_and_theme_toggle() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let html = client.get(&server.base_url).send().await.unwrap().text().await.unwrap();
    assert!(html.contains("Study Assist"));

    let before: serde_json::Value = client
        .get(format!("{}/api/theme", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let after: serde_json::Value = client
        .post(format!("{}/api/theme/toggle", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_ne!(before["theme"], after["theme"]);
}
