use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use engine_logging::engine_debug;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode bytes as {encoding}")]
    DecodeFailure { encoding: String },
}

/// Decode page bytes into UTF-8 text: BOM, then the Content-Type charset,
/// then chardetng detection as the fallback.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> Result<String, DecodeError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = content_type.and_then(declared_charset) {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, encoding);
        }
        engine_debug!("unknown charset label {label:?}, detecting instead");
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    decode_with(bytes, encoding)
}

fn declared_charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches(['"', '\'']).to_string())
        } else {
            None
        }
    })
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> Result<String, DecodeError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(DecodeError::DecodeFailure {
            encoding: encoding.name().to_string(),
        });
    }
    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_without_headers_decodes() {
        let text = decode_page("três pistas".as_bytes(), None).unwrap();
        assert_eq!(text, "três pistas");
    }

    #[test]
    fn declared_latin1_charset_is_honored() {
        let bytes = b"caf\xe9";
        let text = decode_page(bytes, Some("text/html; charset=ISO-8859-1")).unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn quoted_charset_label_is_accepted() {
        assert_eq!(
            declared_charset("text/html; charset=\"utf-8\"").as_deref(),
            Some("utf-8")
        );
    }
}
