use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unknown encoding label: {0}")]
    UnknownEncoding(String),
    #[error("Body is not valid {0}")]
    Malformed(&'static str),
}

/// Extracts the `charset` parameter from a `Content-Type` header value.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"').to_string())
        })
        .filter(|charset| !charset.is_empty())
}

/// Decodes a response body using the server-declared charset, or UTF-8 when none
/// was declared. A byte-order mark takes precedence over both.
///
/// When that decoding hits malformed input, the encoding is guessed from the
/// bytes themselves (legacy pages often send no charset or a wrong one). An
/// unknown declared label, or a guess that fails as well, is an error so the
/// caller can decide how to degrade.
pub fn decode_body(bytes: &[u8], charset: Option<&str>) -> Result<String, DecodeError> {
    let encoding = match charset {
        Some(label) => Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| DecodeError::UnknownEncoding(label.to_string()))?,
        None => UTF_8,
    };

    let (text, used, had_errors) = encoding.decode(bytes);
    if !had_errors {
        return Ok(text.into_owned());
    }

    let guessed = guess_encoding(bytes);
    if guessed == used {
        return Err(DecodeError::Malformed(used.name()));
    }
    debug!(
        declared = used.name(),
        guessed = guessed.name(),
        "Body does not match its encoding, using the detected one."
    );
    let (text, guessed_used, had_errors) = guessed.decode(bytes);
    if had_errors {
        return Err(DecodeError::Malformed(guessed_used.name()));
    }
    Ok(text.into_owned())
}

/// Apparent encoding of `bytes`. UTF-8 is excluded since strict decoding
/// already ruled it out.
fn guess_encoding(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, false)
}
