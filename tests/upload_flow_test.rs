use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use image::{DynamicImage, ImageBuffer, Rgba};
use log::{Level, LevelFilter, Log, Metadata, Record};
use lutim_uploader::capture::{CaptureDetails, Surface};
use lutim_uploader::clipboard::{ClipboardError, ClipboardWriter};
use lutim_uploader::config::LutimConfig;
use lutim_uploader::encoder::ImageError;
use lutim_uploader::history::HistoryDb;
use lutim_uploader::lutim::UploadErrorKind;
use lutim_uploader::uploader::{LutimUploader, UPLOAD_FAILURE_TEXT};
use once_cell::sync::Lazy;

/// 按线程收集日志，测试只检查自己线程上的记录。
struct CapturingLogger {
    records: Mutex<Vec<(ThreadId, Level, String)>>,
}

impl Log for CapturingLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((thread::current().id(), record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: Lazy<CapturingLogger> = Lazy::new(|| CapturingLogger {
    records: Mutex::new(Vec::new()),
});

static LOGGER_INIT: Lazy<()> = Lazy::new(|| {
    let _ = log::set_logger(&*LOGGER);
    log::set_max_level(LevelFilter::Debug);
});

fn capture_logs() {
    Lazy::force(&LOGGER_INIT);
}

fn logged_here(level: Level) -> Vec<String> {
    let me = thread::current().id();
    LOGGER
        .records
        .lock()
        .expect("lock")
        .iter()
        .filter(|(id, lvl, _)| *id == me && *lvl == level)
        .map(|(_, _, msg)| msg.clone())
        .collect()
}

#[derive(Default)]
struct RecordingClipboard {
    writes: Mutex<Vec<String>>,
}

impl ClipboardWriter for RecordingClipboard {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.writes.lock().expect("lock").push(text.to_string());
        Ok(())
    }
}

struct BrokenClipboard {
    attempts: AtomicUsize,
}

impl ClipboardWriter for BrokenClipboard {
    fn set_text(&self, _text: &str) -> Result<(), ClipboardError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ClipboardError("剪贴板被占用".to_string()))
    }
}

struct BrokenSurface;

impl Surface for BrokenSurface {
    fn export_bitmap(&self) -> Result<DynamicImage, ImageError> {
        Err(ImageError::Export("surface disposed".to_string()))
    }
}

fn png_100() -> DynamicImage {
    DynamicImage::ImageRgba8(ImageBuffer::from_fn(100, 100, |x, y| {
        Rgba([(x % 255) as u8, (y % 255) as u8, 128, 255])
    }))
}

fn config_for(url: &str, copy_link: bool) -> LutimConfig {
    LutimConfig {
        lutim_url: url.to_string(),
        copy_link_to_clipboard: copy_link,
        request_timeout_secs: 5,
        connect_timeout_secs: 2,
        ..LutimConfig::default()
    }
}

async fn mock_success(server: &mut mockito::ServerGuard, short: &str) -> mockito::Mock {
    server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"short":"{short}","token":"tok-{short}","url":"https://x/{short}"}}"#
        ))
        .create_async()
        .await
}

#[tokio::test]
async fn scenario_a_success_records_history_and_copies_link() {
    let mut server = mockito::Server::new_async().await;
    let mock = mock_success(&mut server, "abc123").await;
    let clipboard = Arc::new(RecordingClipboard::default());
    let uploader = LutimUploader::new(config_for(&server.url(), true))
        .with_clipboard(clipboard.clone());

    let before = uploader.history_count();
    let outcome = uploader.upload(&CaptureDetails::new("scenario a"), &png_100()).await;

    mock.assert_async().await;
    assert_eq!(outcome.as_tuple(), (true, "https://x/abc123"));
    assert_eq!(uploader.history_count(), before + 1);
    assert_eq!(*clipboard.writes.lock().expect("lock"), vec!["https://x/abc123".to_string()]);

    let info = outcome.info.expect("info expected");
    assert_eq!(info.short(), "abc123");
    let thumb = info.thumbnail().expect("thumbnail expected");
    assert_eq!((thumb.width(), thumb.height()), (90, 90));

    let has_thumb = uploader
        .with_history(|store| store.get("abc123").and_then(|i| i.thumbnail()).is_some())
        .expect("history lock");
    assert!(has_thumb);
}

#[tokio::test]
async fn scenario_b_timeout_fails_without_touching_history() {
    capture_logs();
    // 只监听不响应，请求必然超时
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind failed");
    let url = format!("http://{}", listener.local_addr().expect("addr"));
    let config = LutimConfig {
        request_timeout_secs: 1,
        ..config_for(&url, true)
    };
    let clipboard = Arc::new(RecordingClipboard::default());
    let uploader = LutimUploader::new(config).with_clipboard(clipboard.clone());

    let outcome = uploader.upload(&CaptureDetails::new("timeout"), &png_100()).await;

    assert_eq!(outcome.as_tuple(), (false, ""));
    assert_eq!(outcome.error_kind, Some(UploadErrorKind::Transport));
    assert!(outcome
        .failure_message
        .expect("message expected")
        .starts_with(UPLOAD_FAILURE_TEXT));
    assert_eq!(uploader.history_count(), 0);
    assert!(clipboard.writes.lock().expect("lock").is_empty());
    let errors = logged_here(Level::Error);
    assert_eq!(errors.len(), 1, "errors: {:?}", errors);
    assert!(errors[0].contains("transport"));
    drop(listener);
}

#[tokio::test]
async fn scenario_c_malformed_body_is_protocol_violation() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;
    let uploader = LutimUploader::new(config_for(&server.url(), false));

    let outcome = uploader.upload(&CaptureDetails::new("c"), &png_100()).await;

    assert_eq!(outcome.as_tuple(), (false, ""));
    assert_eq!(outcome.error_kind, Some(UploadErrorKind::ProtocolViolation));
    assert!(!uploader.has_history());
}

#[tokio::test]
async fn scenario_d_clipboard_disabled_keeps_url_and_skips_write() {
    let mut server = mockito::Server::new_async().await;
    let _mock = mock_success(&mut server, "d1").await;
    let clipboard = Arc::new(RecordingClipboard::default());
    let uploader = LutimUploader::new(config_for(&server.url(), false))
        .with_clipboard(clipboard.clone());

    let outcome = uploader.upload(&CaptureDetails::new("d"), &png_100()).await;

    assert!(outcome.success);
    assert_eq!(outcome.url, "https://x/d1");
    assert!(clipboard.writes.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn scenario_e_clipboard_failure_keeps_success_but_clears_url() {
    capture_logs();
    let mut server = mockito::Server::new_async().await;
    let _mock = mock_success(&mut server, "e1").await;
    let clipboard = Arc::new(BrokenClipboard {
        attempts: AtomicUsize::new(0),
    });
    let uploader = LutimUploader::new(config_for(&server.url(), true))
        .with_clipboard(clipboard.clone());

    let outcome = uploader.upload(&CaptureDetails::new("e"), &png_100()).await;

    assert_eq!(outcome.as_tuple(), (true, ""));
    assert_eq!(clipboard.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(uploader.history_count(), 1);
    assert!(outcome.info.is_some());
    let warnings = logged_here(Level::Warn);
    assert_eq!(warnings.len(), 1, "warnings: {:?}", warnings);
    assert!(warnings[0].contains("剪贴板"));
    assert!(logged_here(Level::Error).is_empty());
}

#[tokio::test]
async fn invalid_config_fails_before_any_request() {
    capture_logs();
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", "/").expect(0).create_async().await;
    let config = LutimConfig {
        request_timeout_secs: 0,
        ..config_for(&server.url(), true)
    };
    let clipboard = Arc::new(RecordingClipboard::default());
    let uploader = LutimUploader::new(config).with_clipboard(clipboard.clone());

    let outcome = uploader.upload(&CaptureDetails::new("bad config"), &png_100()).await;

    mock.assert_async().await;
    assert_eq!(outcome.as_tuple(), (false, ""));
    assert_eq!(outcome.error_kind, Some(UploadErrorKind::ConfigurationUnavailable));
    assert!(outcome
        .failure_message
        .expect("message expected")
        .starts_with(UPLOAD_FAILURE_TEXT));
    assert_eq!(uploader.history_count(), 0);
    assert!(clipboard.writes.lock().expect("lock").is_empty());
    assert_eq!(logged_here(Level::Error).len(), 1);
}

#[tokio::test]
async fn service_rejection_does_not_mutate_history() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(r#"{"success":false,"msg":"Unable to save the file"}"#)
        .create_async()
        .await;
    let uploader = LutimUploader::new(config_for(&server.url(), true));

    let outcome = uploader.upload(&CaptureDetails::new("rejected"), &png_100()).await;

    assert_eq!(outcome.as_tuple(), (false, ""));
    assert_eq!(outcome.error_kind, Some(UploadErrorKind::ServiceRejected));
    assert!(outcome
        .failure_message
        .expect("message expected")
        .contains("Unable to save the file"));
    assert_eq!(uploader.history_count(), 0);
}

#[tokio::test]
async fn surface_export_failure_is_reported_before_network() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", "/").expect(0).create_async().await;
    let uploader = LutimUploader::new(config_for(&server.url(), false));

    let outcome = uploader.upload(&CaptureDetails::new("broken"), &BrokenSurface).await;

    mock.assert_async().await;
    assert_eq!(outcome.error_kind, Some(UploadErrorKind::Encode));
    assert_eq!(uploader.history_count(), 0);
}

#[tokio::test]
async fn duplicate_short_still_reports_success() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(r#"{"short":"same","token":"t","url":"https://x/same"}"#)
        .expect(2)
        .create_async()
        .await;
    let uploader = LutimUploader::new(config_for(&server.url(), false));

    let first = uploader.upload(&CaptureDetails::new("1"), &png_100()).await;
    let second = uploader.upload(&CaptureDetails::new("2"), &png_100()).await;

    assert!(first.success);
    assert_eq!(second.as_tuple(), (true, "https://x/same"));
    assert_eq!(uploader.history_count(), 1);
}

#[tokio::test]
async fn history_listener_sees_count_after_insert() {
    let mut server = mockito::Server::new_async().await;
    let _mock = mock_success(&mut server, "l1").await;
    let uploader = LutimUploader::new(config_for(&server.url(), false));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    uploader
        .on_history_changed(move |count| sink.lock().expect("lock").push(count))
        .expect("register listener");

    uploader.upload(&CaptureDetails::new("l"), &png_100()).await;

    assert_eq!(*seen.lock().expect("lock"), vec![1]);
}

#[tokio::test]
async fn successful_upload_is_flushed_to_history_db() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let db_path = dir.path().join("lutim_history.db");
    let mut server = mockito::Server::new_async().await;
    let _mock = mock_success(&mut server, "p1").await;

    let uploader = LutimUploader::new(config_for(&server.url(), false))
        .with_history_db(HistoryDb::open(&db_path).expect("open db"))
        .expect("attach db");
    let outcome = uploader.upload(&CaptureDetails::new("p"), &png_100()).await;
    assert!(outcome.success);
    drop(uploader);

    let reloaded = HistoryDb::open(&db_path)
        .expect("reopen db")
        .load_store(100)
        .expect("load store");
    let info = reloaded.get("p1").expect("record persisted");
    assert_eq!(info.uri().as_str(), "https://x/p1");
    assert_eq!(info.token(), "tok-p1");
}

#[test]
fn blocking_upload_waits_for_background_completion() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(r#"{"success":true,"msg":{"short":"b1","token":"t","ext":"png"}}"#)
        .create();
    let uploader = Arc::new(LutimUploader::new(config_for(&server.url(), false)));

    let outcome = uploader.upload_blocking(CaptureDetails::new("blocking"), Arc::new(png_100()));

    assert!(outcome.success);
    assert_eq!(outcome.url, format!("{}/b1.png", server.url()));
    assert!(uploader.has_history());
}
