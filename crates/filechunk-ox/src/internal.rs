use crate::{FilechunkError, UploadContext};
use filechunk_common::{
    AuthMethod, Bytes, EncodedHeader, Endpoint, RawResponse, RequestBuilder, RequestConfig,
    encode_header_text,
};

/// Sent instead of a field name when the context has none.
const NO_FIELD: &str = "none";

/// Builds the chunk and remove requests for one upload context
pub(crate) struct FilechunkRequestHelper {
    request_builder: RequestBuilder,
}

impl std::fmt::Debug for FilechunkRequestHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilechunkRequestHelper")
            .field("request_builder", &"<RequestBuilder>")
            .finish()
    }
}

impl FilechunkRequestHelper {
    pub fn new(client: reqwest::Client, token: &str, user_agent: Option<&str>) -> Self {
        let mut config = RequestConfig::new()
            .with_auth(AuthMethod::Header {
                header_name: "X-File-Token".to_string(),
                token: token.to_string(),
            })
            .with_header("Accept", "application/json")
            .with_header("X-Requested-With", "XMLHttpRequest");
        if let Some(user_agent) = user_agent {
            config = config.with_user_agent(user_agent);
        }

        Self {
            request_builder: RequestBuilder::new(client, config),
        }
    }

    /// Send bytes `[start, stop)` of a `size` byte file called `filename`.
    pub async fn send_chunk(
        &self,
        context: &UploadContext,
        filename: &str,
        start: u64,
        stop: u64,
        size: u64,
        body: Bytes,
    ) -> Result<RawResponse, FilechunkError> {
        // The range end is exclusive, which is what the server side expects.
        let endpoint = Endpoint::new(context.endpoint())
            .with_header("Content-Range", format!("bytes {start}-{stop}/{size}"))
            .with_header("Content-Type", "application/octet-stream")
            .with_header("X-File-Field", context.field_name().unwrap_or(NO_FIELD))
            .with_header("X-File-Name", encode_header_text(filename));

        Ok(self.request_builder.send_bytes(&endpoint, body).await?)
    }

    /// Ask the server to drop a previously uploaded file.
    pub async fn send_remove(&self, url: &str, file_id: &str) -> Result<RawResponse, FilechunkError> {
        let id = EncodedHeader::for_value(file_id);
        let mut endpoint = Endpoint::new(url);
        if id.is_encoded() {
            endpoint = endpoint.with_header("X-File-Id-Encoding", id.encoding.as_str());
        }
        endpoint = endpoint.with_header("X-File-Id", id.value);

        Ok(self.request_builder.send_empty(&endpoint).await?)
    }
}
