use base64::{engine::general_purpose, Engine as _};
use lazy_regex::regex;

/// Inline an embedded picture as a data URI the way the converter emits `<img>` sources.
pub fn image_data_uri(part_name: &str, data: &[u8]) -> String {
    let ext = part_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        _ => "image/png",
    };
    format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(data))
}

/// Drop inline tags, keeping only text. A `<` not followed by a tag name
/// (as in `a < b`) is text.
pub fn strip_tags(markup: &str) -> String {
    regex!(r"</?[A-Za-z][A-Za-z0-9:-]*(?:\s[^<>]*)?/?>")
        .replace_all(markup, "")
        .into_owned()
}

/// Decode the character references converters leave in markup.
/// Non-breaking spaces become plain spaces.
pub fn decode_entities(markup: &str) -> String {
    regex!(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);")
        .replace_all(markup, |caps: &lazy_regex::regex::Captures| {
            let name = &caps[1];
            let decoded = match name {
                "nbsp" => Some(' '),
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => name
                    .strip_prefix("#x")
                    .or_else(|| name.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| name.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32)
                    .map(|c| if c == '\u{a0}' { ' ' } else { c }),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Shorten text for log lines.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
