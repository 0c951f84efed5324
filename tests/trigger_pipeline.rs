//! End-to-end sampling loop tests with a scripted source, a scripted
//! detector, and a local webhook endpoint that fetches the advertised
//! image URL like a real chat service would.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use anyhow::{anyhow, Result};

use presence_sentry::config::SentryConfig;
use presence_sentry::detect::{DetectionResult, DetectorBackend};
use presence_sentry::frame::Frame;
use presence_sentry::ingest::{FrameSource, SourceStats};
use presence_sentry::Sentry;

/// Source yielding a fixed number of identical frames, then end-of-stream.
struct ScriptedSource {
    remaining: u64,
    captured: u64,
}

impl ScriptedSource {
    fn new(frames: u64) -> Self {
        Self {
            remaining: frames,
            captured: 0,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        self.captured += 1;
        let frame = Frame::new(vec![60u8; 16 * 16 * 3], 16, 16, SystemTime::now())?;
        Ok(Some(frame))
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.captured,
            source: "scripted".to_string(),
        }
    }
}

/// Detector answering from a script; repeats the last answer once the
/// script runs out. `None` entries simulate inference failures.
struct ScriptedDetector {
    script: VecDeque<Option<bool>>,
    last: Option<bool>,
}

impl ScriptedDetector {
    fn new(script: impl IntoIterator<Item = Option<bool>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: Some(false),
        }
    }

    fn always_present() -> Self {
        Self::new([Some(true)])
    }
}

impl DetectorBackend for ScriptedDetector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<DetectionResult> {
        let answer = match self.script.pop_front() {
            Some(entry) => {
                self.last = entry;
                entry
            }
            None => self.last,
        };
        match answer {
            Some(present) => Ok(DetectionResult {
                present,
                confidence: if present { 0.9 } else { 0.0 },
                detections: vec![],
            }),
            None => Err(anyhow!("inference backend unavailable")),
        }
    }
}

struct ReceivedNotification {
    body: String,
    fetched_image: Option<Vec<u8>>,
}

/// Local webhook endpoint. Answers every POST with 200 and, when the body
/// carries an image_url, fetches it immediately (the listener is ephemeral).
struct WebhookEndpoint {
    url: String,
    received: Arc<Mutex<Vec<ReceivedNotification>>>,
    stop: Arc<AtomicBool>,
    join: Option<std::thread::JoinHandle<()>>,
}

impl WebhookEndpoint {
    fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        listener.set_nonblocking(true).unwrap();

        let received: Arc<Mutex<Vec<ReceivedNotification>>> = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let received_thread = received.clone();
        let stop_thread = stop.clone();
        let join = std::thread::spawn(move || {
            while !stop_thread.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((mut stream, _)) => {
                        stream.set_nonblocking(false).unwrap();
                        let body = read_post_body(&mut stream);
                        stream
                            .write_all(
                                b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                            )
                            .unwrap();
                        let fetched_image = image_url_in(&body).and_then(|url| fetch_bytes(&url));
                        received_thread
                            .lock()
                            .unwrap()
                            .push(ReceivedNotification {
                                body,
                                fetched_image,
                            });
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            url,
            received,
            stop,
            join: Some(join),
        }
    }

    fn stop(mut self) -> Vec<ReceivedNotification> {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join().unwrap();
        }
        Arc::try_unwrap(self.received)
            .map(|m| m.into_inner().unwrap())
            .unwrap_or_default()
    }
}

fn read_post_body(stream: &mut std::net::TcpStream) -> String {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let read = stream.read(&mut chunk).unwrap();
        if read == 0 {
            return String::new();
        }
        raw.extend_from_slice(&chunk[..read]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
    let content_length: usize = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse().ok())?
        })
        .unwrap_or(0);
    while raw.len() < header_end + content_length {
        let read = stream.read(&mut chunk).unwrap();
        if read == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..read]);
    }
    String::from_utf8_lossy(&raw[header_end..]).to_string()
}

fn image_url_in(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("image_url")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn fetch_bytes(url: &str) -> Option<Vec<u8>> {
    let response = ureq::get(url).call().ok()?;
    let mut bytes = Vec::new();
    response.into_reader().read_to_end(&mut bytes).ok()?;
    Some(bytes)
}

fn test_config(webhook_url: &str, save_dir: &std::path::Path) -> SentryConfig {
    let json = format!(
        r#"{{
            "device": "stub://unused",
            "sampling": {{ "frame_skip": 1, "interval_ms": 20 }},
            "debounce": {{ "hold_secs": 1 }},
            "artifacts": {{
                "save_dir": "{}",
                "serve_ttl_secs": 10
            }},
            "webhook": {{
                "url": "{}",
                "message": "object lingering",
                "timeout_secs": 2
            }}
        }}"#,
        save_dir.display(),
        webhook_url
    );
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, json.as_bytes()).unwrap();
    // load_from bypasses SENTRY_* env lookups for everything set in the file
    SentryConfig::load_from(Some(file.path())).unwrap()
}

#[test]
fn sustained_presence_notifies_exactly_once_with_fetchable_image() {
    let endpoint = WebhookEndpoint::start();
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&endpoint.url, dir.path());

    // ~20ms cadence, 1s hold: 90 frames of sustained presence cover the
    // hold comfortably and leave room to prove no re-trigger happens.
    let source = Box::new(ScriptedSource::new(90));
    let detector = Box::new(ScriptedDetector::always_present());

    let shutdown = AtomicBool::new(false);
    let mut sentry = Sentry::new(&cfg, source, detector).unwrap();
    let stats = sentry.run(&shutdown).unwrap();

    assert_eq!(stats.frames_seen, 90);
    assert_eq!(stats.triggers, 1);
    assert_eq!(stats.notifications_sent, 1);
    assert_eq!(stats.notifications_failed, 0);

    let received = endpoint.stop();
    assert_eq!(received.len(), 1);
    assert!(received[0].body.contains("object lingering"));
    let image = received[0]
        .fetched_image
        .as_ref()
        .expect("image url fetchable while serving");
    assert_eq!(&image[..2], &[0xFF, 0xD8]);

    // latest artifact was maintained alongside the snapshot
    assert!(dir.path().join("current.jpg").exists());
    let snapshots = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("capture_"))
        .count();
    assert_eq!(snapshots, 1);
}

#[test]
fn flicker_below_hold_never_notifies() {
    let endpoint = WebhookEndpoint::start();
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&endpoint.url, dir.path());

    // present in bursts of 20 samples (~400ms), each broken by an absent
    // sample before the 1s hold is reached
    let script: Vec<Option<bool>> = (0..80).map(|i| Some(i % 21 != 20)).collect();
    let source = Box::new(ScriptedSource::new(80));
    let detector = Box::new(ScriptedDetector::new(script));

    let shutdown = AtomicBool::new(false);
    let mut sentry = Sentry::new(&cfg, source, detector).unwrap();
    let stats = sentry.run(&shutdown).unwrap();

    assert_eq!(stats.triggers, 0);
    assert_eq!(stats.notifications_sent, 0);
    assert!(endpoint.stop().is_empty());
}

#[test]
fn detector_failures_degrade_to_absent_and_loop_survives() {
    let endpoint = WebhookEndpoint::start();
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&endpoint.url, dir.path());

    // every inference call fails: no observation ever reads present, but
    // the loop must run the source to exhaustion anyway
    let script: Vec<Option<bool>> = vec![None];
    let source = Box::new(ScriptedSource::new(30));
    let detector = Box::new(ScriptedDetector::new(script));

    let shutdown = AtomicBool::new(false);
    let mut sentry = Sentry::new(&cfg, source, detector).unwrap();
    let stats = sentry.run(&shutdown).unwrap();

    assert_eq!(stats.frames_seen, 30);
    assert_eq!(stats.triggers, 0);
    assert!(endpoint.stop().is_empty());
}

#[test]
fn shutdown_flag_stops_the_loop_promptly() {
    let endpoint = WebhookEndpoint::start();
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&endpoint.url, dir.path());

    let source = Box::new(ScriptedSource::new(u64::MAX));
    let detector = Box::new(ScriptedDetector::always_present());

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_thread = shutdown.clone();
    let join = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(200));
        shutdown_thread.store(true, Ordering::SeqCst);
    });

    let mut sentry = Sentry::new(&cfg, source, detector).unwrap();
    let started = std::time::Instant::now();
    sentry.run(&shutdown).unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    join.join().unwrap();
    endpoint.stop();
}
