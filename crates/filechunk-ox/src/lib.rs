#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::missing_docs_in_private_items
)]

//! Resumable chunked file uploads over HTTP
//!
//! A file is sent as a sequence of raw `POST` bodies, each carrying a
//! `Content-Range` header. The server answers every chunk with a small JSON document
//! that either acknowledges the chunk, redirects the client to another offset
//! (resume), or finishes the upload with a file id and content hash.
//!
//! ```no_run
//! use filechunk_ox::{Filechunk, LocalFile, UploadContext};
//!
//! # async fn run() -> Result<(), filechunk_ox::FilechunkError> {
//! let context = UploadContext::builder()
//!     .endpoint("https://example.com/filechunk/upload")
//!     .token("form-token")
//!     .build()?
//!     .with_progress(|percent, _| println!("{percent}%"));
//!
//! let file = LocalFile::open("report.pdf").await?;
//! let item = Filechunk::new().upload(&file, &context).await?;
//! println!("stored as {}", item.id());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod field;
mod internal;
pub mod item;
mod remove;
pub mod response;
pub mod source;

pub use context::{DEFAULT_CHUNK_SIZE, ProgressCallback, UploadContext, check_number};
pub use engine::progress_percent;
pub use error::FilechunkError;
pub use field::{FieldSettings, UploadField};
pub use item::UploadedItem;
pub use response::ChunkResponse;
pub use source::{FileSource, LocalFile, MemoryFile};

/// Re-exported so callers can cancel without depending on tokio-util themselves
pub use tokio_util::sync::CancellationToken;

use bon::Builder;
use core::fmt;

use crate::internal::FilechunkRequestHelper;

/// Upload client. Holds the HTTP connection pool; per-upload settings live in
/// [`UploadContext`].
#[derive(Clone, Default, Builder)]
pub struct Filechunk {
    #[builder(default)]
    pub(crate) client: reqwest::Client,
    #[builder(into)]
    pub(crate) user_agent: Option<String>,
}

impl Filechunk {
    /// Create a client with a default `reqwest` connection pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create request helper for internal use
    fn request_helper(&self, context: &UploadContext) -> FilechunkRequestHelper {
        FilechunkRequestHelper::new(
            self.client.clone(),
            context.token(),
            self.user_agent.as_deref(),
        )
    }
}

impl fmt::Debug for Filechunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filechunk")
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}
