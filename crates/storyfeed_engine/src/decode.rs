use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedStory {
    pub text: String,
    pub encoding_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to decode story as {encoding}")]
    DecodeFailure { encoding: String },
}

/// Decode raw story bytes into UTF-8 text: BOM -> Content-Type charset ->
/// chardetng fallback.
pub fn decode_story(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedStory, DecodeError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = content_type.and_then(charset_param) {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, encoding);
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches(['"', '\''].as_ref()).to_string())
        } else {
            None
        }
    })
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> Result<DecodedStory, DecodeError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(DecodeError::DecodeFailure {
            encoding: encoding.name().to_string(),
        });
    }
    Ok(DecodedStory {
        text: text.into_owned(),
        encoding_label: encoding.name().to_string(),
    })
}
