//! Output formatting

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

/// Writes `value` as pretty-printed JSON followed by a newline
pub fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_json_is_pretty_and_terminated() {
        let mut out = Vec::new();
        write_json(&mut out, &json!({"ok": true})).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "{\n  \"ok\": true\n}\n");
    }
}
