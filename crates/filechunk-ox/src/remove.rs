use filechunk_common::error::{extract_error_message, status_message};
use tracing::{debug, warn};

use crate::{Filechunk, FilechunkError, UploadContext};

impl Filechunk {
    /// Ask the server to delete a previously uploaded file.
    ///
    /// Needs a context with a remove endpoint. Ids that cannot be sent verbatim in a
    /// header are base64 encoded and flagged with `X-File-Id-Encoding: base64`.
    pub async fn remove(&self, context: &UploadContext, file_id: &str) -> Result<(), FilechunkError> {
        let url = context.remove_endpoint().ok_or_else(|| {
            FilechunkError::invalid_config("no remove endpoint set, file removal is not possible")
        })?;

        let raw = self.request_helper(context).send_remove(url, file_id).await?;
        if raw.is_success() {
            debug!(file_id, "file removed");
            return Ok(());
        }

        let message = extract_error_message(&raw.body).unwrap_or_else(|| status_message(raw.status));
        warn!(file_id, status = raw.status.as_u16(), %message, "file removal rejected");
        Err(FilechunkError::Server {
            status: raw.status.as_u16(),
            message,
        })
    }
}
