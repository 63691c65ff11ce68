use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use serde_json::Value;

use crate::relay::session::{MAX_LAST_MESSAGE_CHARS, tail_chars};

/// How much of the transcript's end is scanned
pub const TRANSCRIPT_TAIL_BYTES: u64 = 200_000;

/// Text of the newest assistant message in a JSONL transcript, bounded to
/// its last 3000 chars. Any read failure yields an empty string.
pub fn last_assistant_message(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return String::new();
    }
    let lines = match read_tail_lines(path) {
        Ok(lines) => lines,
        Err(_) => return String::new(),
    };

    for line in lines.iter().rev() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(entry) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if entry.get("type").and_then(Value::as_str) != Some("assistant") {
            continue;
        }
        let text = extract_text(&entry["message"]["content"]);
        if !text.is_empty() {
            return tail_chars(&text, MAX_LAST_MESSAGE_CHARS).to_string();
        }
    }

    String::new()
}

fn read_tail_lines(path: &Path) -> std::io::Result<Vec<String>> {
    let file = std::fs::File::open(path)?;
    let size = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    if size > TRANSCRIPT_TAIL_BYTES {
        reader.seek(SeekFrom::Start(size - TRANSCRIPT_TAIL_BYTES))?;
        // Drop the partial first line.
        let mut partial = Vec::new();
        reader.read_until(b'\n', &mut partial)?;
    }

    let mut lines = Vec::new();
    let mut buf = Vec::new();
    while reader.read_until(b'\n', &mut buf)? > 0 {
        lines.push(String::from_utf8_lossy(&buf).into_owned());
        buf.clear();
    }
    Ok(lines)
}

/// Content is either a plain string or a list of blocks; only `text`
/// blocks are kept, joined by newlines.
fn extract_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn transcript(entries: &[Value]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for entry in entries {
            writeln!(file, "{}", entry).unwrap();
        }
        file
    }

    #[test]
    fn picks_newest_assistant_text_blocks() {
        let file = transcript(&[
            json!({"type": "assistant", "message": {"content": "older"}}),
            json!({"type": "user", "message": {"content": "hi"}}),
            json!({"type": "assistant", "message": {"content": [
                {"type": "text", "text": "Refactored auth."},
                {"type": "tool_use", "name": "Edit"},
                {"type": "text", "text": "All tests passing."}
            ]}}),
            json!({"type": "user", "message": {"content": "thanks"}}),
        ]);

        assert_eq!(
            last_assistant_message(file.path()),
            "Refactored auth.\nAll tests passing."
        );
    }

    #[test]
    fn skips_assistant_entries_without_text() {
        let file = transcript(&[
            json!({"type": "assistant", "message": {"content": "real answer"}}),
            json!({"type": "assistant", "message": {"content": [{"type": "tool_use"}]}}),
        ]);
        assert_eq!(last_assistant_message(file.path()), "real answer");
    }

    #[test]
    fn tolerates_garbage_lines() {
        let mut file = transcript(&[json!({"type": "assistant", "message": {"content": "ok"}})]);
        writeln!(file, "not json at all").unwrap();
        assert_eq!(last_assistant_message(file.path()), "ok");
    }

    #[test]
    fn missing_file_is_empty() {
        assert_eq!(last_assistant_message("/nonexistent/transcript.jsonl"), "");
        assert_eq!(last_assistant_message(""), "");
    }

    #[test]
    fn large_transcript_reads_only_tail() {
        let mut file = NamedTempFile::new().unwrap();
        let early = json!({"type": "assistant", "message": {"content": "early"}});
        writeln!(file, "{}", early).unwrap();
        let filler = json!({"type": "user", "message": {"content": "x".repeat(1000)}});
        for _ in 0..300 {
            writeln!(file, "{}", filler).unwrap();
        }

        assert_eq!(last_assistant_message(file.path()), "");

        let late = json!({"type": "assistant", "message": {"content": "late"}});
        writeln!(file, "{}", late).unwrap();
        assert_eq!(last_assistant_message(file.path()), "late");
    }

    #[test]
    fn long_message_is_bounded() {
        let long = "z".repeat(MAX_LAST_MESSAGE_CHARS + 500);
        let file = transcript(&[json!({"type": "assistant", "message": {"content": long}})]);
        assert_eq!(
            last_assistant_message(file.path()).chars().count(),
            MAX_LAST_MESSAGE_CHARS
        );
    }
}
