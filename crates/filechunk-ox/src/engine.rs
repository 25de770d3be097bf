//! The chunk loop.
//!
//! Each iteration sends one byte range and feeds the server's answer to
//! [`next_step`], which decides between sending the next range (possibly at an
//! offset the server chose) and finishing. The loop itself only does I/O,
//! cancellation and progress reporting.

use filechunk_common::{RawResponse, error::extract_error_message, error::status_message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{ChunkResponse, FileSource, Filechunk, FilechunkError, UploadContext, UploadedItem};

/// What to do after a chunk response was accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    /// Send the range starting at `next`; report `percent` if the server gave an offset.
    Continue { next: u64, percent: Option<u8> },
    /// The server stored the file.
    Finished(UploadedItem),
}

/// Decide the next step after the chunk `[.., stop)` of a `file_size` byte file.
///
/// The upload is over when the whole file was sent or the server says so; it then
/// must have named the stored file. Otherwise the next range starts at `stop`,
/// unless the server asked to resume at a given offset (which may be `0`).
pub(crate) fn next_step(
    file_size: u64,
    stop: u64,
    filename: &str,
    response: ChunkResponse,
) -> Result<Step, FilechunkError> {
    if stop >= file_size || response.finished {
        let (Some(fid), Some(hash)) = (response.fid, response.hash) else {
            return Err(FilechunkError::IncompleteUpload);
        };
        return Ok(Step::Finished(UploadedItem::new(
            fid,
            filename,
            Some(hash),
            response.preview,
        )));
    }

    let percent = response
        .offset
        .map(|offset| progress_percent(offset, file_size));

    let next = match response.offset {
        Some(offset) if response.resume => {
            if offset > file_size {
                return Err(FilechunkError::Protocol(format!(
                    "server asked to resume at {offset}, past the end of a {file_size} byte file"
                )));
            }
            offset
        }
        _ => stop,
    };

    Ok(Step::Continue { next, percent })
}

/// Percentage of a `size` byte file covered by `offset`, rounded, at most 100.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn progress_percent(offset: u64, size: u64) -> u8 {
    if size == 0 {
        return 100;
    }
    let percent = (offset as f64 / size as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Turn a raw exchange into a chunk response, or the error it stands for.
///
/// Rejections carry the body's `message`, then a nested `error.message`, then the
/// status text.
fn interpret(raw: RawResponse) -> Result<ChunkResponse, FilechunkError> {
    if !raw.is_success() {
        let message = ChunkResponse::from_slice(&raw.body)
            .ok()
            .and_then(|response| response.message)
            .or_else(|| extract_error_message(&raw.body))
            .unwrap_or_else(|| status_message(raw.status));
        return Err(FilechunkError::Server {
            status: raw.status.as_u16(),
            message,
        });
    }

    ChunkResponse::from_slice(&raw.body)
        .map_err(|e| FilechunkError::Protocol(format!("invalid chunk response: {e}")))
}

impl Filechunk {
    /// Upload `file` in chunks and return the stored item.
    ///
    /// # Errors
    ///
    /// Any failure aborts the whole upload; nothing is retried.
    pub async fn upload<F>(
        &self,
        file: &F,
        context: &UploadContext,
    ) -> Result<UploadedItem, FilechunkError>
    where
        F: FileSource + ?Sized,
    {
        self.upload_with_cancel(file, context, &CancellationToken::new())
            .await
    }

    /// Same as [`Filechunk::upload`], stopping with [`FilechunkError::Cancelled`]
    /// once `cancel` fires. An in-flight chunk request is dropped.
    #[tracing::instrument(skip_all, fields(file = file.name(), size = file.size()))]
    pub async fn upload_with_cancel<F>(
        &self,
        file: &F,
        context: &UploadContext,
        cancel: &CancellationToken,
    ) -> Result<UploadedItem, FilechunkError>
    where
        F: FileSource + ?Sized,
    {
        let helper = self.request_helper(context);
        let size = file.size();
        let mut start = 0u64;
        let mut requests = 0u64;

        loop {
            if cancel.is_cancelled() {
                warn!(start, "upload cancelled");
                return Err(FilechunkError::Cancelled);
            }

            let stop = start.saturating_add(context.chunk_size()).min(size);
            let body = file.slice(start, stop).await?;
            debug!(start, stop, "sending chunk");

            let raw = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    warn!(start, stop, "upload cancelled during chunk request");
                    return Err(FilechunkError::Cancelled);
                }
                raw = helper.send_chunk(context, file.name(), start, stop, size, body) => raw?,
            };
            requests = requests.saturating_add(1);

            let response = interpret(raw).inspect_err(|e| warn!(start, stop, error = %e, "chunk rejected"))?;
            match next_step(size, stop, file.name(), response)? {
                Step::Continue { next, percent } => {
                    if let Some(percent) = percent {
                        context.report_progress(percent, None);
                    }
                    if next != stop {
                        warn!(next, stop, "server asked to resume at another offset");
                    }
                    start = next;
                }
                Step::Finished(item) => {
                    context.report_progress(100, None);
                    info!(id = item.id(), requests, "upload finished");
                    return Ok(item);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filechunk_common::{Bytes, StatusCode};

    fn response(json: &str) -> ChunkResponse {
        ChunkResponse::from_slice(json.as_bytes()).unwrap()
    }

    #[test]
    fn intermediate_chunk_continues_at_stop() {
        let step = next_step(5_000_000, 2_097_152, "a.bin", response(r#"{"offset": 2097152}"#)).unwrap();
        assert_eq!(
            step,
            Step::Continue {
                next: 2_097_152,
                percent: Some(42)
            }
        );
    }

    #[test]
    fn offset_without_resume_only_reports_progress() {
        let step = next_step(1000, 100, "a.bin", response(r#"{"offset": 500}"#)).unwrap();
        assert_eq!(
            step,
            Step::Continue {
                next: 100,
                percent: Some(50)
            }
        );
    }

    #[test]
    fn no_offset_means_no_progress() {
        let step = next_step(1000, 100, "a.bin", response("{}")).unwrap();
        assert_eq!(
            step,
            Step::Continue {
                next: 100,
                percent: None
            }
        );
    }

    #[test]
    fn resume_jumps_to_server_offset() {
        let step = next_step(1000, 100, "a.bin", response(r#"{"resume": true, "offset": 700}"#)).unwrap();
        assert_eq!(
            step,
            Step::Continue {
                next: 700,
                percent: Some(70)
            }
        );
    }

    #[test]
    fn resume_to_zero_restarts() {
        let step = next_step(1000, 300, "a.bin", response(r#"{"resume": true, "offset": 0}"#)).unwrap();
        assert_eq!(
            step,
            Step::Continue {
                next: 0,
                percent: Some(0)
            }
        );
    }

    #[test]
    fn resume_past_end_is_a_protocol_error() {
        let result = next_step(1000, 100, "a.bin", response(r#"{"resume": true, "offset": 1001}"#));
        assert!(matches!(result, Err(FilechunkError::Protocol(_))));
    }

    #[test]
    fn resume_without_offset_continues_at_stop() {
        let step = next_step(1000, 100, "a.bin", response(r#"{"resume": true}"#)).unwrap();
        assert_eq!(
            step,
            Step::Continue {
                next: 100,
                percent: None
            }
        );
    }

    #[test]
    fn last_chunk_finishes_with_item() {
        let step = next_step(
            1000,
            1000,
            "report.pdf",
            response(r#"{"finished": true, "fid": 42, "hash": "abc123", "preview": "/p.png"}"#),
        )
        .unwrap();
        assert_eq!(
            step,
            Step::Finished(UploadedItem::new(
                "42",
                "report.pdf",
                Some("abc123".into()),
                Some("/p.png".into())
            ))
        );
    }

    #[test]
    fn server_may_finish_early() {
        let step = next_step(1000, 100, "a.bin", response(r#"{"finished": true, "fid": "9", "hash": "h"}"#)).unwrap();
        assert!(matches!(step, Step::Finished(item) if item.id() == "9"));
    }

    #[test]
    fn terminal_response_without_fid_or_hash_is_incomplete() {
        for body in [r#"{"finished": true, "hash": "h"}"#, r#"{"fid": "1"}"#, "{}"] {
            let result = next_step(1000, 1000, "a.bin", response(body));
            assert!(matches!(result, Err(FilechunkError::IncompleteUpload)), "{body}");
        }
    }

    #[test]
    fn progress_rounds_and_clamps() {
        assert_eq!(progress_percent(0, 1000), 0);
        assert_eq!(progress_percent(2_097_152, 5_000_000), 42);
        assert_eq!(progress_percent(4_194_304, 5_000_000), 84);
        assert_eq!(progress_percent(995, 1000), 100);
        assert_eq!(progress_percent(5000, 1000), 100);
        assert_eq!(progress_percent(0, 0), 100);
    }

    #[test]
    fn error_status_uses_json_message() {
        let raw = RawResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: Bytes::from_static(br#"{"message": "disk full"}"#),
        };
        let err = interpret(raw).unwrap_err();
        assert!(matches!(&err, FilechunkError::Server { status: 500, message } if message == "disk full"));
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn error_status_without_json_uses_status_text() {
        let raw = RawResponse {
            status: StatusCode::FORBIDDEN,
            body: Bytes::from_static(b"<h1>Forbidden</h1>"),
        };
        assert!(matches!(
            interpret(raw),
            Err(FilechunkError::Server { status: 403, message }) if message == "error: 403 Forbidden"
        ));
    }

    #[test]
    fn error_status_message_may_be_numeric() {
        let raw = RawResponse {
            status: StatusCode::INSUFFICIENT_STORAGE,
            body: Bytes::from_static(br#"{"finished": false, "message": 507}"#),
        };
        assert!(matches!(
            interpret(raw),
            Err(FilechunkError::Server { status: 507, message }) if message == "507"
        ));
    }

    #[test]
    fn error_status_falls_back_to_nested_message() {
        let raw = RawResponse {
            status: StatusCode::BAD_REQUEST,
            body: Bytes::from_static(br#"{"error": {"message": "bad range"}}"#),
        };
        assert!(matches!(
            interpret(raw),
            Err(FilechunkError::Server { status: 400, message }) if message == "bad range"
        ));
    }

    #[test]
    fn success_status_with_garbage_is_protocol_error() {
        let raw = RawResponse {
            status: StatusCode::OK,
            body: Bytes::from_static(b"not json"),
        };
        assert!(matches!(interpret(raw), Err(FilechunkError::Protocol(_))));
    }
}
