//! Integration tests for the audit trail: mutation logs name the acting admin.

use std::io;
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;

use aiq_integration_tests::{ADMIN_USERNAME, TestApp};

/// Log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().expect("log buffer poisoned").clone();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// The log line carrying `message`, if any.
    fn line_with(&self, message: &str) -> Option<String> {
        self.lines().into_iter().find(|line| line.contains(message))
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer poisoned").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Install a plain-text subscriber for the current test thread.
fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}

fn assert_names_admin(logs: &LogBuffer, message: &str) {
    let line = logs
        .line_with(message)
        .unwrap_or_else(|| panic!("no log line for {message:?} in {:?}", logs.lines()));
    assert!(
        line.contains(&format!("admin={ADMIN_USERNAME}")),
        "log line lacks the acting admin: {line}"
    );
}

#[tokio::test]
async fn test_credit_mutations_log_the_acting_admin() {
    let (logs, _guard) = capture_logs();
    let app = TestApp::new();
    let cookie = app.login().await.expect("login failed");

    let resp = app
        .post_form("/users/u2/credits", "amount=5&reason=refund", Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_names_admin(&logs, "Adjusted user credits");

    let resp = app
        .post_form(
            "/credits/bulk-add",
            "user_ids=u1%2Cu3&amount=10&reason=promo",
            Some(&cookie),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_names_admin(&logs, "Bulk credit grant");
}

#[tokio::test]
async fn test_command_mutations_log_the_acting_admin() {
    let (logs, _guard) = capture_logs();
    let app = TestApp::new();
    let cookie = app.login().await.expect("login failed");

    app.post_form(
        "/commands",
        "text=%2Fquiz&category=games&description=Daily+quiz",
        Some(&cookie),
    )
    .await;
    assert_names_admin(&logs, "Command created");

    app.post_form(
        "/commands/c2",
        "text=%2Fweather&category=tools&description=Forecast",
        Some(&cookie),
    )
    .await;
    assert_names_admin(&logs, "Command updated");

    app.post_form("/commands/c1/toggle", "", Some(&cookie)).await;
    assert_names_admin(&logs, "Command toggled");

    app.post_form("/commands/c3/delete", "", Some(&cookie)).await;
    assert_names_admin(&logs, "Command deleted");
}
