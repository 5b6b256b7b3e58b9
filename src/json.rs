//! JSON decoding with readable failure messages for upstream responses.

use anyhow::Result;

/// Deserialize `body`, reporting the serde path, the type mismatch, and a
/// short excerpt around the failure position when the shape is unexpected.
pub fn decode_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(de).map_err(|err| {
        let inner = err.inner();
        let (line, column) = (inner.line(), inner.column());
        let path = err.path().to_string();

        let message = inner.to_string();
        let suffix = format!(" at line {line} column {column}");
        let message = message.strip_suffix(&suffix).unwrap_or(&message);

        let location = if path.is_empty() || path == "." {
            String::new()
        } else {
            format!("at path '{path}': ")
        };
        anyhow::anyhow!(
            "{location}{} (line {line} col {column})\n{}",
            describe_mismatch(message),
            excerpt(body, line, column, 24)
        )
    })
}

/// Rewrite `invalid type: null, expected a string` as `expected a string, got null`.
fn describe_mismatch(message: &str) -> String {
    if let Some(rest) = message.strip_prefix("invalid type: ")
        && let Some((actual, expected)) = rest.split_once(", expected ")
    {
        return format!("expected {expected}, got {actual}");
    }
    message.to_string()
}

/// A window of `radius` characters either side of the error column, with a caret.
fn excerpt(body: &str, line: usize, column: usize, radius: usize) -> String {
    let target = body.lines().nth(line.saturating_sub(1)).unwrap_or("");
    if target.is_empty() {
        return "(empty line)".to_string();
    }

    let chars: Vec<char> = target.chars().collect();
    let focus = column.saturating_sub(1).min(chars.len());
    let start = focus.saturating_sub(radius);
    let end = (focus + radius).min(chars.len());

    let window: String = chars[start..end].iter().collect();
    let prefix = if start > 0 { "..." } else { "" };
    let suffix = if end < chars.len() { "..." } else { "" };
    let caret = " ".repeat(prefix.len() + focus - start);
    format!("{prefix}{window}{suffix}\n{caret}^")
}
