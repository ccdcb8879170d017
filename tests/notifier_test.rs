//! End-to-end tests: config -> setup -> gate -> render -> webhook POST

use build_notifier::cli::process_stream;
use build_notifier::notification::{
    CallbackUrl, HttpSideEffectRunner, NotificationChannel, SideEffect, SideEffectRunner,
};
use build_notifier::{
    BuildEvent, BuildStatus, LocalSecretStore, NotificationMessage, NotifierBuilder,
    NotifierConfig, NotifierError, SendResult,
};
use std::io::{BufRead, BufReader, Cursor, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const RESOURCE: &str = "projects/my-project-id/secrets/discord-webhook/versions/latest";

/// A request as seen by the fake webhook endpoint
struct Captured {
    request_line: String,
    headers: String,
    body: String,
}

fn read_request(stream: &mut TcpStream) -> Captured {
    let mut reader = BufReader::new(stream.try_clone().unwrap());

    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();

    let mut headers = String::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        if line == "\r\n" || line.is_empty() {
            break;
        }
        let lower = line.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap();
        }
        headers.push_str(&lower);
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).unwrap();

    Captured {
        request_line: request_line.trim_end().to_string(),
        headers,
        body: String::from_utf8(body).unwrap(),
    }
}

/// Serve `requests` connections, answering each with `status_line`
fn spawn_server(status_line: &'static str, requests: usize) -> (String, thread::JoinHandle<Vec<Captured>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let mut captured = Vec::new();
        for _ in 0..requests {
            let (mut stream, _) = listener.accept().unwrap();
            captured.push(read_request(&mut stream));
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                status_line
            );
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
        }
        captured
    });

    (format!("http://{}/hook", addr), handle)
}

fn config(filter: &str) -> NotifierConfig {
    let json = serde_json::json!({
        "apiVersion": "cloud-build-notifiers/v1",
        "kind": "DiscordNotifier",
        "metadata": {"name": "test-notifier"},
        "spec": {
            "notification": {
                "filter": filter,
                "delivery": {"webhookUrl": {"secretRef": "webhook-url"}}
            },
            "secrets": [{"name": "webhook-url", "value": RESOURCE}]
        }
    });
    NotifierConfig::from_json(&json.to_string()).unwrap()
}

fn sample_build(status: BuildStatus) -> BuildEvent {
    BuildEvent::new("some-build-id", status)
        .with_project_id("my-project-id")
        .with_log_url("https://some.example.com/log/url?foo=bar")
        .with_substitution("_APP_NAME", "my-app")
        .with_substitution("_URL", "https://some.example.com")
}

struct CountingRunner {
    runs: AtomicUsize,
}

impl SideEffectRunner for CountingRunner {
    fn run(&self, _effect: &SideEffect) {
        self.runs.fetch_add(1, Ordering::SeqCst);
    }
}

struct RecordingChannel {
    sent: Mutex<Vec<NotificationMessage>>,
}

impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, message: &NotificationMessage) -> Result<SendResult, NotifierError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(SendResult::Sent { status: 200 })
    }
}

#[test]
fn test_success_event_posts_expected_payload() {
    let (url, server) = spawn_server("204 No Content", 1);
    let config = config("");
    let secrets = LocalSecretStore::new().with_secret(RESOURCE, url);
    let runner = Arc::new(CountingRunner { runs: AtomicUsize::new(0) });

    let notifier = NotifierBuilder::new(&config, &secrets)
        .timeout_secs(5)
        .side_effect_runner(runner.clone())
        .build()
        .unwrap();

    let result = notifier.send_notification(&sample_build(BuildStatus::Success)).unwrap();
    assert_eq!(result, SendResult::Sent { status: 204 });

    let requests = server.join().unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].request_line.starts_with("POST /hook "));
    assert!(requests[0].headers.contains("content-type: application/json"));

    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "content": "",
            "embeds": [{
                "title": "✅ SUCCESS",
                "color": 1127128,
                "description": "Build ID: some-build-id\nService: my-app\nEnvironment: my-project-id\nLogs: https://some.example.com/log/url?foo=bar\nAccess: https://some.example.com"
            }]
        })
    );
    assert_eq!(runner.runs.load(Ordering::SeqCst), 0);
}

#[test]
fn test_non_success_response_counts_as_sent() {
    let (url, server) = spawn_server("500 Internal Server Error", 1);
    let config = config("");
    let secrets = LocalSecretStore::new().with_secret(RESOURCE, url);

    let notifier = NotifierBuilder::new(&config, &secrets)
        .side_effect_runner(Arc::new(CountingRunner { runs: AtomicUsize::new(0) }))
        .build()
        .unwrap();

    let result = notifier.send_notification(&sample_build(BuildStatus::Failure)).unwrap();
    assert_eq!(result, SendResult::Sent { status: 500 });

    let requests = server.join().unwrap();
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(body["embeds"][0]["title"], "❌ ERROR - FAILURE");
    assert_eq!(body["embeds"][0]["color"], 14177041);
}

#[test]
fn test_backend_success_calls_callback_and_webhook() {
    let (webhook_url, webhook) = spawn_server("200 OK", 1);
    let (callback_url, callback) = spawn_server("200 OK", 1);

    let config = config("");
    let secrets = LocalSecretStore::new().with_secret(RESOURCE, webhook_url);
    let runner = HttpSideEffectRunner::new(CallbackUrl::Fixed(callback_url), Duration::from_secs(5)).unwrap();

    let notifier = NotifierBuilder::new(&config, &secrets)
        .side_effect_runner(Arc::new(runner))
        .build()
        .unwrap();

    let event = sample_build(BuildStatus::Success)
        .with_substitution("_APP_NAME", "my-backend-svc")
        .with_repo_name("R");
    let result = notifier.send_notification(&event).unwrap();
    assert!(result.is_sent());

    let callbacks = callback.join().unwrap();
    assert_eq!(callbacks.len(), 1);
    assert!(callbacks[0].request_line.starts_with("GET /hook "));

    let posts = webhook.join().unwrap();
    let body: serde_json::Value = serde_json::from_str(&posts[0].body).unwrap();
    assert_eq!(body["embeds"][0]["description"], "R");
}

#[test]
fn test_default_runner_calls_dojo_url() {
    let (webhook_url, webhook) = spawn_server("204 No Content", 1);
    let (callback_url, callback) = spawn_server("200 OK", 1);

    // Only test in this binary that relies on the environment runner
    std::env::set_var("DOJO_URL", &callback_url);

    let config = config("");
    let secrets = LocalSecretStore::new().with_secret(RESOURCE, webhook_url);
    let notifier = NotifierBuilder::new(&config, &secrets).timeout_secs(5).build().unwrap();

    let event = sample_build(BuildStatus::Success).with_substitution("_APP_NAME", "orders-backend");
    let result = notifier.send_notification(&event).unwrap();
    std::env::remove_var("DOJO_URL");

    assert_eq!(result, SendResult::Sent { status: 204 });
    let callbacks = callback.join().unwrap();
    assert_eq!(callbacks.len(), 1);
    assert!(callbacks[0].request_line.starts_with("GET /hook "));
    assert_eq!(webhook.join().unwrap().len(), 1);
}

#[test]
fn test_failing_callback_does_not_affect_delivery() {
    let (webhook_url, webhook) = spawn_server("204 No Content", 1);
    let config = config("");
    let secrets = LocalSecretStore::new().with_secret(RESOURCE, webhook_url);
    let runner = HttpSideEffectRunner::new(
        CallbackUrl::Fixed("http://127.0.0.1:1/unreachable".to_string()),
        Duration::from_secs(2),
    )
    .unwrap();

    let notifier = NotifierBuilder::new(&config, &secrets)
        .side_effect_runner(Arc::new(runner))
        .build()
        .unwrap();

    let event = sample_build(BuildStatus::Success).with_substitution("_APP_NAME", "backend");
    let result = notifier.send_notification(&event).unwrap();
    assert_eq!(result, SendResult::Sent { status: 204 });
    assert_eq!(webhook.join().unwrap().len(), 1);
}

#[test]
fn test_unreachable_webhook_is_delivery_error() {
    let config = config("");
    let secrets = LocalSecretStore::new().with_secret(RESOURCE, "http://127.0.0.1:1/hook");
    let notifier = NotifierBuilder::new(&config, &secrets)
        .timeout_secs(2)
        .side_effect_runner(Arc::new(CountingRunner { runs: AtomicUsize::new(0) }))
        .build()
        .unwrap();

    let result = notifier.send_notification(&sample_build(BuildStatus::Working));
    assert!(matches!(result, Err(NotifierError::Delivery(_))));
}

#[test]
fn test_setup_fails_for_unknown_secret() {
    let config = config("");
    let secrets = LocalSecretStore::new();
    let result = NotifierBuilder::new(&config, &secrets).build();
    assert!(matches!(result, Err(NotifierError::SecretFetch { .. })));
}

#[test]
fn test_stream_processes_each_line_independently() {
    let config = config("build.status == Build.Status.QUEUED");
    let secrets = LocalSecretStore::new().with_secret(RESOURCE, "https://unused.example.com/hook");
    let channel = Arc::new(RecordingChannel { sent: Mutex::new(Vec::new()) });

    let notifier = NotifierBuilder::new(&config, &secrets)
        .channel(channel.clone())
        .side_effect_runner(Arc::new(CountingRunner { runs: AtomicUsize::new(0) }))
        .build()
        .unwrap();

    let input = [
        r#"{"id": "b1", "status": "WORKING", "substitutions": {"_APP_NAME": "api"}}"#,
        "",
        "not json",
        r#"{"id": "b2", "status": "QUEUED", "substitutions": {"_APP_NAME": "api"}}"#,
        r#"{"id": "b3", "status": "SUCCESS", "substitutions": {"_APP_NAME": ""}}"#,
        r#"{"id": "b4", "status": "CANCELLED", "substitutions": {"_APP_NAME": "api"}}"#,
        r#"{"id": "b5", "status": "TIMEOUT", "substitutions": {"_APP_NAME": "api"}}"#,
    ]
    .join("\n");

    let summary = process_stream(&notifier, Cursor::new(input)).unwrap();
    assert_eq!(summary.sent, 2);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.failed, 0);

    let sent = channel.sent.lock().unwrap();
    assert_eq!(sent[0].embeds[0].title, "🔨 BUILDING");
    assert_eq!(sent[1].embeds[0].title, "❌ ERROR - TIMEOUT");
}
