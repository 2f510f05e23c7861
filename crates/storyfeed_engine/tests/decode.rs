use pretty_assertions::assert_eq;
use storyfeed_engine::{decode_story, DecodeError};

#[test]
fn decode_respects_charset_header() {
    let bytes = b"caf\xe9"; // iso-8859-1
    let decoded = decode_story(bytes, Some("text/plain; charset=ISO-8859-1")).unwrap();
    assert_eq!(decoded.text, "café");
    assert!(
        decoded.encoding_label.eq_ignore_ascii_case("ISO-8859-1")
            || decoded.encoding_label.eq_ignore_ascii_case("windows-1252")
    );
}

#[test]
fn decode_handles_utf8_bom() {
    let bytes = b"\xEF\xBB\xBFhello";
    let decoded = decode_story(bytes, Some("text/plain")).unwrap();
    assert_eq!(decoded.text, "hello");
    assert_eq!(decoded.encoding_label, "UTF-8");
}

#[test]
fn decode_handles_quoted_charset_param() {
    let bytes = b"caf\xe9";
    let decoded = decode_story(bytes, Some("text/plain; charset=\"windows-1252\"")).unwrap();
    assert_eq!(decoded.text, "café");
}

#[test]
fn decode_falls_back_to_detection_without_charset() {
    let decoded = decode_story(b"plain ascii story", None).unwrap();
    assert_eq!(decoded.text, "plain ascii story");
}

#[test]
fn decode_rejects_malformed_bytes_for_declared_charset() {
    let err = decode_story(b"abc\xff", Some("text/plain; charset=utf-8")).unwrap_err();
    assert_eq!(
        err,
        DecodeError::DecodeFailure {
            encoding: "UTF-8".to_string()
        }
    );
}
