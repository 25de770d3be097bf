use base64::{Engine, engine::general_purpose::STANDARD};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters left untouched by URI component encoding.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// How a header value was put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderEncoding {
    /// Sent as is
    Plain,
    /// Base64 of the percent-encoded UTF-8 text
    Base64,
}

impl HeaderEncoding {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderEncoding::Plain => "plain",
            HeaderEncoding::Base64 => "base64",
        }
    }
}

/// A header value together with the encoding that was applied to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedHeader {
    pub value: String,
    pub encoding: HeaderEncoding,
}

impl EncodedHeader {
    /// Encode `value` only when it cannot travel in a header verbatim.
    #[must_use]
    pub fn for_value(value: &str) -> Self {
        if is_header_safe(value) {
            Self {
                value: value.to_string(),
                encoding: HeaderEncoding::Plain,
            }
        } else {
            Self {
                value: encode_header_text(value),
                encoding: HeaderEncoding::Base64,
            }
        }
    }

    #[must_use]
    pub fn is_encoded(&self) -> bool {
        self.encoding == HeaderEncoding::Base64
    }
}

/// Encode arbitrary text so it is a valid header value.
///
/// The text is percent-encoded with the URI component rules, then base64'd, which is
/// what upload servers decode file names with.
#[must_use]
pub fn encode_header_text(value: &str) -> String {
    let escaped = utf8_percent_encode(value, URI_COMPONENT).to_string();
    STANDARD.encode(escaped)
}

/// Reverse of [`encode_header_text`]. Returns `None` on malformed input.
#[must_use]
pub fn decode_header_text(encoded: &str) -> Option<String> {
    let raw = STANDARD.decode(encoded).ok()?;
    let escaped = String::from_utf8(raw).ok()?;
    percent_decode_str(&escaped)
        .decode_utf8()
        .ok()
        .map(|text| text.into_owned())
}

/// Visible ASCII only; no whitespace, no control characters.
#[must_use]
pub fn is_header_safe(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| (0x21..=0x7e).contains(&b))
}
