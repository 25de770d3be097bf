/// A file the server has fully received and acknowledged.
///
/// Only the upload engine (on a terminal response) and the persisted field value
/// parser create items; they are immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadedItem {
    id: String,
    filename: String,
    hash: Option<String>,
    preview: Option<String>,
}

impl UploadedItem {
    pub(crate) fn new(
        id: impl Into<String>,
        filename: impl Into<String>,
        hash: Option<String>,
        preview: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            hash,
            preview,
        }
    }

    /// Server-assigned identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Original file name, as it was sent
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Server-computed content digest
    #[must_use]
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    #[must_use]
    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    /// Text to show for this item: file name, else hash, else id.
    #[must_use]
    pub fn label(&self) -> &str {
        if !self.filename.is_empty() {
            &self.filename
        } else {
            self.hash.as_deref().unwrap_or(&self.id)
        }
    }
}
