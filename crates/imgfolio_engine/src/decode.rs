use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use imgfolio_logging::folio_warn;

/// How far into the document a `<meta charset>` declaration is looked for.
const META_PRESCAN_BYTES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHtml {
    pub html: String,
    pub encoding_label: String,
    /// Some byte sequences were invalid and became U+FFFD.
    pub had_replacements: bool,
}

/// Decode raw page bytes into UTF-8.
///
/// Order of precedence: byte order mark, Content-Type charset, `<meta>`
/// charset in the first kilobyte, then chardetng detection. Malformed
/// sequences are replaced rather than rejected, so one stray byte never
/// hides the rest of the page.
pub fn decode_html(bytes: &[u8], content_type: Option<&str>) -> DecodedHtml {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(enc) = content_type
        .and_then(charset_from_content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_with(bytes, enc);
    }

    if let Some(enc) = charset_from_meta(bytes).and_then(|label| Encoding::for_label(label.as_bytes())) {
        return decode_with(bytes, enc);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    decode_with(bytes, enc)
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(['"', '\''].as_ref());
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Finds `charset=` inside a `<meta` tag near the start of the document.
/// Covers both `<meta charset="x">` and the http-equiv form.
fn charset_from_meta(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(META_PRESCAN_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    let mut rest = head.as_str();
    while let Some(start) = rest.find("<meta") {
        let tag = &rest[start..];
        let end = tag.find('>').unwrap_or(tag.len());
        let tag_body = &tag[..end];
        if let Some(pos) = tag_body.find("charset=") {
            let value = tag_body[pos + "charset=".len()..]
                .trim_start_matches(['"', '\''].as_ref());
            let label: String = value
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
                .collect();
            if !label.is_empty() {
                return Some(label);
            }
        }
        rest = &tag[end..];
    }
    None
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedHtml {
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors {
        folio_warn!("Page has malformed {} byte sequences; replaced", enc.name());
    }
    DecodedHtml {
        html: text.into_owned(),
        encoding_label: enc.name().to_string(),
        had_replacements: had_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::{charset_from_content_type, charset_from_meta, decode_html};

    #[test]
    fn stray_invalid_byte_is_replaced_not_fatal() {
        let decoded = decode_html(
            b"<html><body>caf\xff<img src=\"https://x.test/a.png\"></body></html>",
            Some("text/html; charset=utf-8"),
        );
        assert_eq!(decoded.encoding_label, "UTF-8");
        assert!(decoded.had_replacements);
        assert!(decoded.html.contains("caf\u{FFFD}<img"));
    }

    #[test]
    fn content_type_charset_is_case_insensitive() {
        assert_eq!(
            charset_from_content_type("text/html; Charset=\"Shift_JIS\""),
            Some("Shift_JIS".to_string())
        );
        assert_eq!(charset_from_content_type("text/html"), None);
    }

    #[test]
    fn meta_charset_forms() {
        assert_eq!(
            charset_from_meta(b"<html><head><meta charset=\"EUC-JP\">"),
            Some("euc-jp".to_string())
        );
        assert_eq!(
            charset_from_meta(
                b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=windows-1251\">"
            ),
            Some("windows-1251".to_string())
        );
        assert_eq!(charset_from_meta(b"<meta name=\"viewport\">"), None);
    }
}
