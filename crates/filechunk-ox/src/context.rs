use core::fmt;
use std::sync::Arc;

use bon::bon;
use serde_json::Value;

use crate::FilechunkError;

/// Default chunk size: 2 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 2 * 1024 * 1024;

/// Progress sink: percentage in `0..=100` and an optional status message.
pub type ProgressCallback = Arc<dyn Fn(u8, Option<&str>) + Send + Sync>;

/// Transport configuration shared by every chunk request of an upload.
///
/// Built once with [`UploadContext::builder`] and never mutated. Cloning is cheap and
/// one context may drive several concurrent uploads.
#[derive(Clone)]
pub struct UploadContext {
    chunk_size: u64,
    endpoint: String,
    field_name: Option<String>,
    token: String,
    remove_endpoint: Option<String>,
    on_progress: Option<ProgressCallback>,
}

#[bon]
impl UploadContext {
    /// Validate caller supplied parameters.
    ///
    /// `chunk_size` accepts a JSON number or a numeric string (`2048` or `"2048"`);
    /// anything else fails with [`FilechunkError::InvalidConfiguration`].
    #[builder]
    pub fn new(
        #[builder(into)] endpoint: String,
        #[builder(into)] token: String,
        #[builder(into)] chunk_size: Option<Value>,
        #[builder(into)] field_name: Option<String>,
        #[builder(into)] remove_endpoint: Option<String>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Self, FilechunkError> {
        let endpoint = validate_url("endpoint", endpoint)?;
        let remove_endpoint = remove_endpoint
            .map(|url| validate_url("remove endpoint", url))
            .transpose()?;

        if token.is_empty() {
            return Err(FilechunkError::invalid_config(
                "no token set, file upload is not possible",
            ));
        }

        let chunk_size = match chunk_size {
            Some(value) => check_number(&value, Some(1))?,
            None => DEFAULT_CHUNK_SIZE,
        };

        Ok(Self {
            chunk_size,
            endpoint,
            field_name: field_name.filter(|name| !name.is_empty()),
            token,
            remove_endpoint,
            on_progress,
        })
    }
}

impl UploadContext {
    /// Build a context from `FILECHUNK_*` environment variables.
    ///
    /// `FILECHUNK_ENDPOINT` and `FILECHUNK_TOKEN` are required;
    /// `FILECHUNK_CHUNK_SIZE`, `FILECHUNK_FIELD` and `FILECHUNK_REMOVE_ENDPOINT` are
    /// optional.
    pub fn load_from_env() -> Result<Self, FilechunkError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, FilechunkError> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| FilechunkError::invalid_config(format!("{key} is not set")))
        };

        Self::builder()
            .endpoint(required("FILECHUNK_ENDPOINT")?)
            .token(required("FILECHUNK_TOKEN")?)
            .maybe_chunk_size(lookup("FILECHUNK_CHUNK_SIZE").map(Value::String))
            .maybe_field_name(lookup("FILECHUNK_FIELD"))
            .maybe_remove_endpoint(lookup("FILECHUNK_REMOVE_ENDPOINT"))
            .build()
    }

    /// Same transport settings, reporting progress to `callback`.
    #[must_use]
    pub fn with_progress(
        self,
        callback: impl Fn(u8, Option<&str>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_progress: Some(Arc::new(callback)),
            ..self
        }
    }

    #[must_use]
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        self.field_name.as_deref()
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn remove_endpoint(&self) -> Option<&str> {
        self.remove_endpoint.as_deref()
    }

    pub(crate) fn report_progress(&self, percent: u8, message: Option<&str>) {
        if let Some(ref callback) = self.on_progress {
            callback(percent.min(100), message);
        }
    }
}

impl fmt::Debug for UploadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadContext")
            .field("chunk_size", &self.chunk_size)
            .field("endpoint", &self.endpoint)
            .field("field_name", &self.field_name)
            .field("token", &"[REDACTED]")
            .field("remove_endpoint", &self.remove_endpoint)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

fn validate_url(what: &str, value: String) -> Result<String, FilechunkError> {
    if value.is_empty() {
        return Err(FilechunkError::invalid_config(format!(
            "no {what} set, file upload is not possible"
        )));
    }
    url::Url::parse(&value)
        .map_err(|e| FilechunkError::invalid_config(format!("invalid {what} {value:?}: {e}")))?;
    Ok(value)
}

/// Coerce a loosely typed configuration value into a non-negative integer.
///
/// Numbers are taken as is (integral values only). Strings are read like a base-10
/// integer parser reads them: surrounding whitespace and an optional sign, then at
/// least one digit; anything after the digits is ignored. Every other JSON type fails.
pub fn check_number(value: &Value, min: Option<u64>) -> Result<u64, FilechunkError> {
    let number = match value {
        Value::Number(n) => number_value(n)?,
        Value::String(s) => parse_leading_integer(s)?,
        _ => None,
    }
    .ok_or_else(|| FilechunkError::invalid_config("Invalid argument, number is not a number"))?;

    let number = u64::try_from(number).map_err(|_| {
        FilechunkError::invalid_config(format!("Invalid argument, {number} is negative"))
    })?;

    if let Some(min) = min {
        if min > 0 && number < min {
            return Err(FilechunkError::invalid_config(format!(
                "Invalid argument, number must be over {min}"
            )));
        }
    }
    Ok(number)
}

fn out_of_range(raw: impl fmt::Display) -> FilechunkError {
    FilechunkError::invalid_config(format!("Invalid argument, {raw} is out of range"))
}

/// Integral JSON number, `None` for fractions.
#[allow(clippy::cast_possible_truncation)]
fn number_value(n: &serde_json::Number) -> Result<Option<i64>, FilechunkError> {
    if let Some(i) = n.as_i64() {
        return Ok(Some(i));
    }
    if let Some(u) = n.as_u64() {
        return Err(out_of_range(u));
    }
    match n.as_f64() {
        Some(f) if f.fract() != 0.0 => Ok(None),
        Some(f) if f.abs() < 9.0e18 => Ok(Some(f as i64)),
        Some(_) => Err(out_of_range(n)),
        None => Ok(None),
    }
}

fn parse_leading_integer(text: &str) -> Result<Option<i64>, FilechunkError> {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Ok(None);
    }
    let magnitude: i64 = rest[..digits]
        .parse()
        .map_err(|_| out_of_range(&rest[..digits]))?;
    Ok(Some(if negative { -magnitude } else { magnitude }))
}
