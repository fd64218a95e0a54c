//! Utilities (saving code files, clipboard, reading sources).

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use base64::Engine;

use crate::execution::Language;

pub mod unicode;

/// Write `code` to `code.<ext>` in `dir`, picking `code (1).<ext>`, ... when taken.
pub fn save_code(dir: &Path, language: Language, code: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = unique_path(dir, "code", language.ext());
    fs::write(&path, code)?;
    Ok(path)
}

fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let first = dir.join(format!("{stem}.{ext}"));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| dir.join(format!("{stem} ({n}).{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

/// OSC 52 sequence asking the terminal to put `text` on the clipboard.
pub fn osc52_sequence(text: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{encoded}\x07")
}

pub fn copy_to_clipboard(out: &mut impl Write, text: &str) -> Result<()> {
    out.write_all(osc52_sequence(text).as_bytes())?;
    out.flush()?;
    Ok(())
}

/// Read a source file, or stdin when `path` is `-`.
pub fn read_source(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    let p = Path::new(path);
    if !p.exists() {
        bail!("Source file '{}' does not exist", path);
    }
    if !p.is_file() {
        bail!("'{}' is not a file", path);
    }
    fs::read_to_string(p).map_err(|e| anyhow::anyhow!("Failed to read file '{}': {}", path, e))
}

/// Language implied by a file name's extension.
pub fn language_for_path(path: &str) -> Option<Language> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(Language::from_extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_never_overwrites() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let first = save_code(dir.path(), Language::Python, "print(1)")?;
        let second = save_code(dir.path(), Language::Python, "print(2)")?;
        assert_eq!(first.file_name().and_then(|n| n.to_str()), Some("code.py"));
        assert_eq!(second.file_name().and_then(|n| n.to_str()), Some("code (1).py"));
        assert_eq!(fs::read_to_string(first)?, "print(1)");
        Ok(())
    }

    #[test]
    fn osc52_wraps_base64_payload() {
        assert_eq!(osc52_sequence("hi"), "\x1b]52;c;aGk=\x07");
        let mut out = Vec::new();
        copy_to_clipboard(&mut out, "hi").expect("write to vec");
        assert_eq!(out, osc52_sequence("hi").into_bytes());
    }

    #[test]
    fn extension_selects_language() {
        assert_eq!(language_for_path("demo/app.PY"), Some(Language::Python));
        assert_eq!(language_for_path("index.html"), Some(Language::Html));
        assert_eq!(language_for_path("notes.txt"), None);
    }

    #[test]
    fn missing_source_is_an_error() {
        assert!(read_source("definitely/missing.js").is_err());
    }
}
