//! State of an upload form field: which files it holds and how many it may hold.
//!
//! The field value is persisted as a JSON object keyed by file id,
//! `{"42": {"filename": "report.pdf", "hash": "abc123"}}`, so that a form can be
//! re-rendered with the files that were already uploaded.

use futures_util::future::join_all;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{FileSource, Filechunk, FilechunkError, UploadContext, UploadedItem, check_number};

/// How many files a field accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldSettings {
    max_count: Option<usize>,
}

impl FieldSettings {
    /// Settings for a field rendered with the given `multiple` flag and raw max count.
    ///
    /// Single-value fields hold one file. Multi-value fields hold `max_count` files
    /// (a zero count means one) or any number when no count is given.
    pub fn new(multiple: bool, max_count: Option<&Value>) -> Result<Self, FilechunkError> {
        if !multiple {
            return Ok(Self::single());
        }
        let Some(raw) = max_count else {
            return Ok(Self::unlimited());
        };
        let max = check_number(raw, None)?;
        let max = usize::try_from(max.max(1)).unwrap_or(usize::MAX);
        Ok(Self {
            max_count: Some(max),
        })
    }

    #[must_use]
    pub fn single() -> Self {
        Self { max_count: Some(1) }
    }

    #[must_use]
    pub fn unlimited() -> Self {
        Self { max_count: None }
    }

    /// `None` when the field is unlimited
    #[must_use]
    pub fn max_count(&self) -> Option<usize> {
        self.max_count
    }
}

/// Items currently held by one upload field, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct UploadField {
    settings: FieldSettings,
    items: Vec<UploadedItem>,
}

impl UploadField {
    #[must_use]
    pub fn new(settings: FieldSettings) -> Self {
        Self {
            settings,
            items: Vec::new(),
        }
    }

    /// Restore a field from its persisted value. An empty value is an empty field.
    ///
    /// Entries whose value is not an object are skipped.
    pub fn from_value(settings: FieldSettings, value: &str) -> Result<Self, FilechunkError> {
        Ok(Self {
            settings,
            items: parse_items(value)?,
        })
    }

    #[must_use]
    pub fn settings(&self) -> FieldSettings {
        self.settings
    }

    #[must_use]
    pub fn items(&self) -> &[UploadedItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Persisted value of this field.
    #[must_use]
    pub fn value(&self) -> String {
        let mut map = Map::new();
        for item in &self.items {
            map.insert(
                item.id().to_string(),
                json!({ "filename": item.filename(), "hash": item.hash() }),
            );
        }
        Value::Object(map).to_string()
    }

    /// Fail if adding `incoming` files would exceed the field's maximum.
    pub fn ensure_capacity(&self, incoming: usize) -> Result<(), FilechunkError> {
        match self.settings.max_count {
            Some(max) if self.items.len().saturating_add(incoming) > max => {
                Err(FilechunkError::TooManyFiles { max })
            }
            _ => Ok(()),
        }
    }

    /// Add an item, replacing any item with the same id in place.
    pub fn push(&mut self, item: UploadedItem) {
        match self.items.iter_mut().find(|existing| existing.id() == item.id()) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    /// Upload `files` concurrently and add every file that made it.
    ///
    /// The outer error is a capacity failure, raised before anything is sent. The
    /// inner results are per file, in the order of `files`.
    pub async fn upload_files<F>(
        &mut self,
        client: &Filechunk,
        files: &[F],
        context: &UploadContext,
    ) -> Result<Vec<Result<UploadedItem, FilechunkError>>, FilechunkError>
    where
        F: FileSource,
    {
        self.upload_files_with_cancel(client, files, context, &CancellationToken::new())
            .await
    }

    /// [`UploadField::upload_files`] with every upload stopped once `cancel` fires.
    pub async fn upload_files_with_cancel<F>(
        &mut self,
        client: &Filechunk,
        files: &[F],
        context: &UploadContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<Result<UploadedItem, FilechunkError>>, FilechunkError>
    where
        F: FileSource,
    {
        self.ensure_capacity(files.len())?;

        let uploads = files.iter().map(|file| {
            context.report_progress(0, Some(&format!("Uploading file {}...", file.name())));
            client.upload_with_cancel(file, context, cancel)
        });
        let results = join_all(uploads).await;

        for item in results.iter().flatten() {
            self.push(item.clone());
        }
        debug!(
            uploaded = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "field uploads settled"
        );
        Ok(results)
    }

    /// Delete a file on the server, then drop it from the field.
    ///
    /// The item stays when the server refuses.
    pub async fn remove(
        &mut self,
        client: &Filechunk,
        context: &UploadContext,
        file_id: &str,
    ) -> Result<(), FilechunkError> {
        client.remove(context, file_id).await?;
        self.items.retain(|item| item.id() != file_id);
        Ok(())
    }
}

fn parse_items(value: &str) -> Result<Vec<UploadedItem>, FilechunkError> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }

    let parsed: Value = serde_json::from_str(value)
        .map_err(|e| FilechunkError::InvalidFieldValue(e.to_string()))?;

    let entries = match parsed {
        Value::Object(entries) => entries,
        // Empty mappings serialized by PHP come back as `[]`.
        Value::Array(list) if list.is_empty() => return Ok(Vec::new()),
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(FilechunkError::InvalidFieldValue(format!(
                "expected an object keyed by file id, got {other}"
            )));
        }
    };

    Ok(entries
        .into_iter()
        .filter_map(|(id, entry)| {
            let Value::Object(entry) = entry else {
                return None;
            };
            let filename = entry
                .get("filename")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some(UploadedItem::new(
                id,
                filename,
                scalar_text(entry.get("hash")),
                scalar_text(entry.get("preview")),
            ))
        })
        .collect())
}

/// Non-empty string or number as text
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
