//! JSON pretty-printing with HTML syntax highlighting.
//!
//! Produces a standalone HTML document with inline styles so the result
//! renders the same in every mail client. The payload is validated with
//! `serde_json` and then re-indented from its own text, so key order and
//! token spelling are kept as received.

use std::fmt::Write;

use serde::de::IgnoredAny;

// Light monokai palette.
const BACKGROUND: &str = "#fafafa";
const FOREGROUND: &str = "#272822";
const KEY: &str = "#f92672";
const STRING: &str = "#d88200";
const NUMBER: &str = "#ae81ff";
const KEYWORD: &str = "#00a8c8";
const PUNCTUATION: &str = "#111111";

/// Indentation unit for nested values.
const INDENT: &str = "  ";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Render a JSON payload as a highlighted, indented HTML document.
///
/// Tokens are copied as received: numbers keep their spelling, string
/// escapes are not rewritten and duplicate keys are all shown.
pub fn highlight_json(payload: &[u8]) -> Result<String, RenderError> {
    serde_json::from_slice::<IgnoredAny>(payload)?;
    let text = std::str::from_utf8(payload)?;

    let mut out = String::with_capacity(payload.len() * 4);
    let _ = write!(
        out,
        "<html><body style=\"background-color:{BACKGROUND}\">\
         <pre style=\"color:{FOREGROUND};background-color:{BACKGROUND};\"><code>"
    );
    write_tokens(&mut out, text);
    out.push_str("\n</code></pre></body></html>");
    Ok(out)
}

/// Re-indent already validated JSON text, one token at a time.
fn write_tokens(out: &mut String, src: &str) {
    let bytes = src.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            open @ (b'{' | b'[') => {
                let close = if open == b'{' { b'}' } else { b']' };
                let next = skip_whitespace(bytes, i + 1);
                if bytes.get(next) == Some(&close) {
                    span(out, PUNCTUATION, if open == b'{' { "{}" } else { "[]" });
                    i = next + 1;
                } else {
                    span(out, PUNCTUATION, &src[i..i + 1]);
                    depth += 1;
                    newline(out, depth);
                    i += 1;
                }
            }
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                newline(out, depth);
                span(out, PUNCTUATION, &src[i..i + 1]);
                i += 1;
            }
            b',' => {
                span(out, PUNCTUATION, ",");
                newline(out, depth);
                i += 1;
            }
            b':' => {
                span(out, PUNCTUATION, ":");
                out.push(' ');
                i += 1;
            }
            b'"' => {
                let end = string_end(bytes, i);
                let is_key = bytes.get(skip_whitespace(bytes, end)) == Some(&b':');
                span(out, if is_key { KEY } else { STRING }, &src[i..end]);
                i = end;
            }
            _ => {
                let end = scalar_end(bytes, i);
                let token = &src[i..end];
                let color = match token {
                    "true" | "false" | "null" => KEYWORD,
                    _ => NUMBER,
                };
                span(out, color, token);
                i = end;
            }
        }
    }
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while matches!(bytes.get(i), Some(b' ' | b'\t' | b'\n' | b'\r')) {
        i += 1;
    }
    i
}

/// Index just past the closing quote of the string starting at `start`.
fn string_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Index just past a number or literal starting at `start`.
fn scalar_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len()
        && !matches!(
            bytes[i],
            b' ' | b'\t' | b'\n' | b'\r' | b',' | b':' | b'{' | b'}' | b'[' | b']' | b'"'
        )
    {
        i += 1;
    }
    i
}

fn newline(out: &mut String, depth: usize) {
    out.push('\n');
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn span(out: &mut String, color: &str, text: &str) {
    let _ = write!(out, "<span style=\"color:{color}\">");
    escape_into(out, text);
    out.push_str("</span>");
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    /// Strip tags and decode entities to recover the plain-text layout.
    fn plain_text(html: &str) -> String {
        let mut text = String::new();
        let mut in_tag = false;
        for c in html.chars() {
            match c {
                '<' => in_tag = true,
                '>' => in_tag = false,
                c if !in_tag => text.push(c),
                _ => {}
            }
        }
        text.replace("&quot;", "\"")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&#39;", "'")
            .replace("&amp;", "&")
    }

    #[test]
    fn indents_with_two_spaces_and_keeps_key_order() {
        let html = highlight_json(br#"{"status":"failed","id":7,"tags":[true,null]}"#).unwrap();
        let expected = "{\n  \"status\": \"failed\",\n  \"id\": 7,\n  \"tags\": [\n    true,\n    null\n  ]\n}\n";
        assert_eq!(plain_text(&html), expected);
    }

    #[test]
    fn token_classes_get_distinct_colors() {
        let html = highlight_json(br#"{"k":"v","n":1.5,"b":false}"#).unwrap();
        assert!(html.contains(&format!("<span style=\"color:{KEY}\">&quot;k&quot;</span>")));
        assert!(html.contains(&format!("<span style=\"color:{STRING}\">&quot;v&quot;</span>")));
        assert!(html.contains(&format!("<span style=\"color:{NUMBER}\">1.5</span>")));
        assert!(html.contains(&format!("<span style=\"color:{KEYWORD}\">false</span>")));
    }

    #[test]
    fn markup_in_values_is_escaped() {
        let html = highlight_json(br#"{"note":"<script>alert('x')</script> & more"}"#).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more"));
    }

    #[test]
    fn empty_containers_stay_on_one_line() {
        let html = highlight_json(br#"{"a":{},"b":[]}"#).unwrap();
        assert_eq!(plain_text(&html), "{\n  \"a\": {},\n  \"b\": []\n}\n");
    }

    #[test]
    fn output_is_a_standalone_document() {
        let html = highlight_json(b"1").unwrap();
        assert!(html.starts_with("<html>"));
        assert!(html.ends_with("</html>"));
    }

    #[test]
    fn number_tokens_are_kept_verbatim() {
        let html = highlight_json(br#"{"a":1e2,"b":123456789012345678901234567890,"c":-0.50}"#)
            .unwrap();
        assert_eq!(
            plain_text(&html),
            "{\n  \"a\": 1e2,\n  \"b\": 123456789012345678901234567890,\n  \"c\": -0.50\n}\n"
        );
    }

    #[test]
    fn duplicate_keys_and_escapes_survive() {
        let html = highlight_json(br#"{"k":1,"k":"caf\u00e9 \"x\""}"#).unwrap();
        assert_eq!(
            plain_text(&html),
            "{\n  \"k\": 1,\n  \"k\": \"caf\\u00e9 \\\"x\\\"\"\n}\n"
        );
    }

    #[test]
    fn input_whitespace_is_normalised() {
        let html = highlight_json(b" [ 1 ,\n\t{ } ]\r\n").unwrap();
        assert_eq!(plain_text(&html), "[\n  1,\n  {}\n]\n");
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert_matches!(highlight_json(b"not json"), Err(RenderError::Json(_)));
    }
}
