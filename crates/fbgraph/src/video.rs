//! Video Upload Session
//!
//! Three-phase resumable upload: start -> transfer chunks -> finish,
//! with an optional encoding-ready poll afterwards. The multipart field
//! names (`upload_phase`, `upload_session_id`, `start_offset`,
//! `video_file_chunk`, `file_size`, `title`) are vendor wire format.
//!
//! Only chunk transfers retry, and only on the two vendor signals:
//! offset-desync subcode 1363037 (resume from the offsets in
//! `error_data`) and the transient flag (sleep one second). Each chunk
//! gets a retry budget of `max(2, file_size / 10 MiB)`.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio_util::sync::CancellationToken;

use crate::client::{GraphClient, GraphError};

/// Vendor subcode signalling that the server-side offsets diverged from
/// ours; `error_data` carries the offsets to resume from.
pub const OFFSET_DESYNC_SUBCODE: i64 = 1363037;

const RETRY_FLOOR: u64 = 2;
const RETRY_BYTES_PER_UNIT: u64 = 10 * 1024 * 1024;
const TRANSIENT_BACKOFF: Duration = Duration::from_secs(1);

/// Bounds on the encoding poll knobs.
pub const POLL_INTERVAL_DEFAULT_S: u64 = 3;
pub const POLL_INTERVAL_MIN_S: u64 = 1;
pub const POLL_INTERVAL_MAX_S: u64 = 30;
pub const POLL_TIMEOUT_DEFAULT_S: u64 = 180;
pub const POLL_TIMEOUT_MIN_S: u64 = 30;
pub const POLL_TIMEOUT_MAX_S: u64 = 600;

/// Upload behavior knobs.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Poll until the video is encoding-ready after the upload finishes.
    pub wait_for_encoding: bool,
    /// Encoding poll interval.
    pub poll_interval: Duration,
    /// Absolute deadline for the encoding poll.
    pub timeout: Duration,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            wait_for_encoding: false,
            poll_interval: Duration::from_secs(POLL_INTERVAL_DEFAULT_S),
            timeout: Duration::from_secs(POLL_TIMEOUT_DEFAULT_S),
        }
    }
}

impl UploadOptions {
    /// Build options from raw seconds, clamping into the supported ranges.
    pub fn from_seconds(
        wait_for_encoding: bool,
        poll_interval_s: Option<u64>,
        timeout_s: Option<u64>,
    ) -> Self {
        let interval = poll_interval_s
            .unwrap_or(POLL_INTERVAL_DEFAULT_S)
            .clamp(POLL_INTERVAL_MIN_S, POLL_INTERVAL_MAX_S);
        let timeout = timeout_s
            .unwrap_or(POLL_TIMEOUT_DEFAULT_S)
            .clamp(POLL_TIMEOUT_MIN_S, POLL_TIMEOUT_MAX_S);
        Self {
            wait_for_encoding,
            poll_interval: Duration::from_secs(interval),
            timeout: Duration::from_secs(timeout),
        }
    }
}

/// Terminal state of a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub video_id: String,
    pub title: String,
    pub file_size: u64,
    /// True when the encoding poll was requested and reached "ready".
    pub encoding_ready: bool,
}

/// Owns at most one upload session at a time. A second `upload` call
/// while a session is active fails fast; independent uploader instances
/// do not affect each other.
pub struct VideoUploader {
    client: Arc<GraphClient>,
    active: AtomicBool,
}

struct SessionSlot<'a>(&'a AtomicBool);

impl Drop for SessionSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl VideoUploader {
    pub fn new(client: Arc<GraphClient>) -> Self {
        Self {
            client,
            active: AtomicBool::new(false),
        }
    }

    /// Run a full upload session for one file.
    pub async fn upload(
        &self,
        account_id: &str,
        file_path: &Path,
        options: &UploadOptions,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, GraphError> {
        let slot = self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| SessionSlot(&self.active))
            .map_err(|_| {
                GraphError::Upload("an upload session is already active".to_string())
            })?;
        let result = self.run_session(account_id, file_path, options, cancel).await;
        drop(slot);
        result
    }

    async fn run_session(
        &self,
        account_id: &str,
        file_path: &Path,
        options: &UploadOptions,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, GraphError> {
        let metadata = tokio::fs::metadata(file_path)
            .await
            .map_err(|e| GraphError::Upload(format!("cannot stat {}: {}", file_path.display(), e)))?;
        let file_size = metadata.len();
        if file_size == 0 {
            return Err(GraphError::Upload(format!(
                "{} is empty",
                file_path.display()
            )));
        }
        let title = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let endpoint = format!("/{}/advideos", account_id);

        let mut session = self.start(&endpoint, file_size, cancel).await?;
        tracing::info!(
            video_id = %session.video_id,
            file_size,
            "Upload session started"
        );

        self.transfer(&endpoint, &mut session, file_path, file_size, &title, cancel)
            .await?;
        self.finish(&endpoint, &session, &title, cancel).await?;
        tracing::info!(video_id = %session.video_id, "Upload finished");

        let mut encoding_ready = false;
        if options.wait_for_encoding {
            poll_encoding_ready(
                &self.client,
                &session.video_id,
                options.poll_interval,
                options.timeout,
                cancel,
            )
            .await?;
            encoding_ready = true;
        }

        Ok(UploadOutcome {
            video_id: session.video_id,
            title,
            file_size,
            encoding_ready,
        })
    }

    async fn start(
        &self,
        endpoint: &str,
        file_size: u64,
        cancel: &CancellationToken,
    ) -> Result<Session, GraphError> {
        let body = self
            .client
            .post_form(
                endpoint,
                &[
                    ("upload_phase".to_string(), "start".to_string()),
                    ("file_size".to_string(), file_size.to_string()),
                ],
                cancel,
            )
            .await?;
        let v: Value = serde_json::from_slice(&body)
            .map_err(|e| GraphError::Upload(format!("bad start response: {}", e)))?;
        let session = Session {
            session_id: str_field(&v, "upload_session_id")
                .ok_or_else(|| GraphError::Upload("start response missing upload_session_id".to_string()))?,
            video_id: str_field(&v, "video_id")
                .ok_or_else(|| GraphError::Upload("start response missing video_id".to_string()))?,
            start_offset: offset_field(&v, "start_offset")
                .ok_or_else(|| GraphError::Upload("start response missing start_offset".to_string()))?,
            end_offset: offset_field(&v, "end_offset")
                .ok_or_else(|| GraphError::Upload("start response missing end_offset".to_string()))?,
        };
        check_offsets(session.start_offset, session.end_offset, file_size)?;
        Ok(session)
    }

    async fn transfer(
        &self,
        endpoint: &str,
        session: &mut Session,
        file_path: &Path,
        file_size: u64,
        title: &str,
        cancel: &CancellationToken,
    ) -> Result<(), GraphError> {
        let mut file = File::open(file_path)
            .await
            .map_err(|e| GraphError::Upload(format!("cannot open {}: {}", file_path.display(), e)))?;

        while session.start_offset != session.end_offset {
            let mut budget = RETRY_FLOOR.max(file_size / RETRY_BYTES_PER_UNIT);
            loop {
                if cancel.is_cancelled() {
                    return Err(GraphError::Cancelled);
                }
                let chunk = read_chunk(&mut file, session.start_offset, session.end_offset).await?;
                let form = Form::new()
                    .text("upload_phase", "transfer")
                    .text("start_offset", session.start_offset.to_string())
                    .text("upload_session_id", session.session_id.clone())
                    .part(
                        "video_file_chunk",
                        Part::bytes(chunk).file_name(title.to_string()),
                    );
                match self.client.post_multipart_video(endpoint, form, cancel).await {
                    Ok(body) => {
                        let v: Value = serde_json::from_slice(&body).map_err(|e| {
                            GraphError::Upload(format!("bad transfer response: {}", e))
                        })?;
                        session.start_offset = offset_field(&v, "start_offset").ok_or_else(|| {
                            GraphError::Upload("transfer response missing start_offset".to_string())
                        })?;
                        session.end_offset = offset_field(&v, "end_offset").ok_or_else(|| {
                            GraphError::Upload("transfer response missing end_offset".to_string())
                        })?;
                        check_offsets(session.start_offset, session.end_offset, file_size)?;
                        break;
                    }
                    Err(GraphError::Api(api))
                        if api.error_subcode == Some(OFFSET_DESYNC_SUBCODE) && budget > 0 =>
                    {
                        let data = api.error_data.clone().unwrap_or(Value::Null);
                        let start = offset_field(&data, "start_offset");
                        let end = offset_field(&data, "end_offset");
                        let (Some(start), Some(end)) = (start, end) else {
                            return Err(GraphError::Api(api));
                        };
                        tracing::warn!(
                            start_offset = start,
                            end_offset = end,
                            "Offset desync; resuming from vendor offsets"
                        );
                        session.start_offset = start;
                        session.end_offset = end;
                        check_offsets(start, end, file_size)?;
                        budget -= 1;
                    }
                    Err(GraphError::Api(api)) if api.is_transient && budget > 0 => {
                        tracing::warn!(message = %api.message, "Transient upload error; retrying");
                        budget -= 1;
                        tokio::select! {
                            _ = cancel.cancelled() => return Err(GraphError::Cancelled),
                            _ = tokio::time::sleep(TRANSIENT_BACKOFF) => {}
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    async fn finish(
        &self,
        endpoint: &str,
        session: &Session,
        title: &str,
        cancel: &CancellationToken,
    ) -> Result<(), GraphError> {
        let body = self
            .client
            .post_form(
                endpoint,
                &[
                    ("upload_phase".to_string(), "finish".to_string()),
                    ("upload_session_id".to_string(), session.session_id.clone()),
                    ("title".to_string(), title.to_string()),
                ],
                cancel,
            )
            .await?;
        let v: Value = serde_json::from_slice(&body)
            .map_err(|e| GraphError::Upload(format!("bad finish response: {}", e)))?;
        if v.get("success").and_then(Value::as_bool) != Some(true) {
            return Err(GraphError::Upload(format!(
                "finish phase did not report success: {}",
                v
            )));
        }
        Ok(())
    }
}

struct Session {
    session_id: String,
    video_id: String,
    start_offset: u64,
    end_offset: u64,
}

/// Poll `GET {video_id}?fields=status` until the video is ready.
///
/// Fails on any non-`processing`, non-`ready` status, on the absolute
/// deadline, and on cancellation.
pub async fn poll_encoding_ready(
    client: &GraphClient,
    video_id: &str,
    interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<(), GraphError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let body = client
            .get(
                &format!("/{}", video_id),
                &vec![("fields".to_string(), "status".to_string())],
                cancel,
            )
            .await?;
        let v: Value = serde_json::from_slice(&body)
            .map_err(|e| GraphError::Upload(format!("bad status response: {}", e)))?;
        let status = v
            .pointer("/status/video_status")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        match status {
            "ready" => return Ok(()),
            "processing" => {}
            other => {
                return Err(GraphError::Upload(format!(
                    "video {} entered status '{}' while waiting for encoding",
                    video_id, other
                )));
            }
        }
        if tokio::time::Instant::now() + interval > deadline {
            return Err(GraphError::Upload(format!(
                "timed out after {:?} waiting for video {} to finish encoding",
                timeout, video_id
            )));
        }
        tokio::select! {
            _ = cancel.cancelled() => return Err(GraphError::Cancelled),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

async fn read_chunk(file: &mut File, start: u64, end: u64) -> Result<Vec<u8>, GraphError> {
    let len = (end - start) as usize;
    file.seek(SeekFrom::Start(start))
        .await
        .map_err(|e| GraphError::Upload(format!("seek failed: {}", e)))?;
    let mut chunk = vec![0u8; len];
    file.read_exact(&mut chunk)
        .await
        .map_err(|e| GraphError::Upload(format!("read failed: {}", e)))?;
    Ok(chunk)
}

fn check_offsets(start: u64, end: u64, file_size: u64) -> Result<(), GraphError> {
    if start > end || end > file_size {
        return Err(GraphError::Upload(format!(
            "vendor offsets out of range: start={} end={} file_size={}",
            start, end, file_size
        )));
    }
    Ok(())
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Offsets arrive as strings on the wire but tolerate numbers too.
fn offset_field(v: &Value, key: &str) -> Option<u64> {
    match v.get(key)? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_field_accepts_strings_and_numbers() {
        let v = serde_json::json!({"a": "1048576", "b": 42, "c": true});
        assert_eq!(offset_field(&v, "a"), Some(1_048_576));
        assert_eq!(offset_field(&v, "b"), Some(42));
        assert_eq!(offset_field(&v, "c"), None);
        assert_eq!(offset_field(&v, "missing"), None);
    }

    #[test]
    fn test_check_offsets_bounds() {
        assert!(check_offsets(0, 10, 10).is_ok());
        assert!(check_offsets(10, 10, 10).is_ok());
        assert!(check_offsets(11, 10, 10).is_err());
        assert!(check_offsets(0, 11, 10).is_err());
    }

    #[test]
    fn test_options_clamp() {
        let opts = UploadOptions::from_seconds(true, Some(0), Some(10_000));
        assert_eq!(opts.poll_interval, Duration::from_secs(POLL_INTERVAL_MIN_S));
        assert_eq!(opts.timeout, Duration::from_secs(POLL_TIMEOUT_MAX_S));
        let opts = UploadOptions::from_seconds(false, None, None);
        assert_eq!(opts.poll_interval, Duration::from_secs(POLL_INTERVAL_DEFAULT_S));
        assert_eq!(opts.timeout, Duration::from_secs(POLL_TIMEOUT_DEFAULT_S));
    }

    #[test]
    fn test_retry_budget_floor() {
        // 1 MiB file still gets two attempts; 100 MiB gets ten.
        assert_eq!(RETRY_FLOOR.max(1_048_576 / RETRY_BYTES_PER_UNIT), 2);
        assert_eq!(RETRY_FLOOR.max(104_857_600 / RETRY_BYTES_PER_UNIT), 10);
    }
}
