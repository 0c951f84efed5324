//! Artifact persistence and ephemeral serving.
//!
//! The store owns a base directory with two kinds of artifacts:
//! - `current.jpg`, overwritten on every sampled frame (external pollers)
//! - `capture_<epoch>.jpg`, one immutable snapshot per trigger
//!
//! Snapshots accumulate; nothing prunes them in steady state.
//!
//! `serve` exposes one snapshot over plain HTTP for the notification
//! recipient. Each call binds its own listener on an ephemeral port before
//! returning, so the advertised URL always refers to a live socket and
//! successive triggers never collide on a port. The listener tears itself
//! down after a TTL or a request budget, whichever comes first.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::frame::Frame;

const LATEST_NAME: &str = "current.jpg";
const ACCEPT_POLL: Duration = Duration::from_millis(50);
const MAX_REQUEST_BYTES: usize = 8192;

pub struct ArtifactStore {
    base_dir: PathBuf,
    public_host: String,
}

impl ArtifactStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed.
    /// `public_host` is the host embedded in served artifact URLs.
    pub fn open(base_dir: impl Into<PathBuf>, public_host: impl Into<String>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("create artifact dir {}", base_dir.display()))?;
        Ok(Self {
            base_dir,
            public_host: public_host.into(),
        })
    }

    pub fn latest_path(&self) -> PathBuf {
        self.base_dir.join(LATEST_NAME)
    }

    /// Overwrite the fixed latest-frame artifact. Best-effort: failures are
    /// logged and swallowed so the sampling loop is never interrupted.
    pub fn save_latest(&self, frame: &Frame) {
        if let Err(e) = self.write_encoded(&self.latest_path(), frame) {
            log::warn!("latest artifact write failed: {:#}", e);
        }
    }

    /// Write an immutable, timestamp-named snapshot and return its path.
    /// Errors propagate; the caller decides whether to notify without one.
    pub fn save_snapshot(&self, frame: &Frame, at: SystemTime) -> Result<PathBuf> {
        let epoch_s = at
            .duration_since(UNIX_EPOCH)
            .context("snapshot timestamp before epoch")?
            .as_secs();
        let path = self.base_dir.join(format!("capture_{}.jpg", epoch_s));
        self.write_encoded(&path, frame)?;
        Ok(path)
    }

    fn write_encoded(&self, path: &Path, frame: &Frame) -> Result<()> {
        let bytes = frame.encode_jpeg()?;
        fs::write(path, &bytes).with_context(|| format!("write artifact {}", path.display()))?;
        Ok(())
    }

    /// Serve one artifact over HTTP until `ttl` elapses or `max_requests`
    /// GETs have been answered, whichever first.
    ///
    /// The listener is bound (port resolved) before this returns, so the
    /// URL in the handle is immediately fetchable.
    pub fn serve(&self, path: &Path, ttl: Duration, max_requests: usize) -> Result<ServeHandle> {
        let bytes =
            fs::read(path).with_context(|| format!("read artifact {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("artifact path has no file name: {}", path.display()))?
            .to_string();

        let listener = TcpListener::bind("0.0.0.0:0").context("bind ephemeral artifact port")?;
        let port = listener.local_addr()?.port();
        listener.set_nonblocking(true)?;

        let url = format!("http://{}:{}/{}", self.public_host, port, name);
        let done = Arc::new(AtomicBool::new(false));
        let done_thread = done.clone();
        let budget = max_requests.max(1);
        let join = std::thread::spawn(move || {
            serve_bytes(listener, bytes, ttl, budget, &done_thread);
            done_thread.store(true, Ordering::SeqCst);
        });

        log::info!("serving artifact {} at {} (ttl {:?})", name, url, ttl);
        Ok(ServeHandle {
            url,
            done,
            join: Some(join),
        })
    }
}

/// Handle to one ephemeral artifact listener.
///
/// The listener stops on its own after the TTL or request budget; `stop`
/// only hurries that along. Stopping an already-stopped handle is a no-op.
pub struct ServeHandle {
    pub url: String,
    done: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ServeHandle {
    /// True once the serving thread has torn the listener down.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Stop the listener and wait for the serving thread. Idempotent.
    pub fn stop(&mut self) {
        self.done.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                log::warn!("artifact listener thread panicked");
            }
        }
    }
}

impl Drop for ServeHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn serve_bytes(
    listener: TcpListener,
    bytes: Vec<u8>,
    ttl: Duration,
    max_requests: usize,
    done: &AtomicBool,
) {
    let deadline = Instant::now() + ttl;
    let mut served = 0usize;
    while served < max_requests && Instant::now() < deadline {
        if done.load(Ordering::SeqCst) {
            return;
        }
        match listener.accept() {
            Ok((stream, _)) => match handle_fetch(stream, &bytes) {
                Ok(true) => served += 1,
                Ok(false) => {}
                Err(e) => log::warn!("artifact fetch failed: {:#}", e),
            },
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                log::warn!("artifact listener accept failed: {}", e);
                return;
            }
        }
    }
}

/// Answer one request on `stream`. Returns true when the artifact body was
/// sent (counts against the request budget).
fn handle_fetch(mut stream: TcpStream, bytes: &[u8]) -> Result<bool> {
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    stream.set_write_timeout(Some(Duration::from_secs(5)))?;

    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let read = stream.read(&mut chunk).context("read artifact request")?;
        if read == 0 {
            break;
        }
        request.extend_from_slice(&chunk[..read]);
        if request.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if request.len() > MAX_REQUEST_BYTES {
            return Err(anyhow!("artifact request too large"));
        }
    }

    let head = String::from_utf8_lossy(&request);
    if !head.starts_with("GET ") {
        let resp = b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
        stream.write_all(resp)?;
        return Ok(false);
    }

    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        bytes.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(bytes)?;
    stream.flush()?;
    Ok(true)
}
