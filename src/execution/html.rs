//! HTML preview rendering.

use std::{fs, path::{Path, PathBuf}};

use anyhow::Result;
use serde::Serialize;

/// Instruction to show a document in an isolated frame instead of running it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderDirective {
    pub document: String,
    pub srcdoc: String,
}

/// Escapes `"` so the document fits inside a double-quoted `srcdoc` attribute.
///
/// Only the double quote is handled; `&` is passed through unchanged, so an
/// existing entity in the source is decoded once by the frame.
pub fn escape_srcdoc(source: &str) -> String {
    source.replace('"', "&quot;")
}

impl RenderDirective {
    pub fn new(source: &str) -> Self {
        Self { document: source.to_string(), srcdoc: escape_srcdoc(source) }
    }

    pub fn iframe_markup(&self) -> String {
        format!(r#"<iframe class="preview-frame" srcdoc="{}"></iframe>"#, self.srcdoc)
    }

    /// Standalone page with a dismissable preview container around the frame.
    pub fn preview_page(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Preview</title>
<style>
body {{ margin: 0; font-family: sans-serif; background: #263238; }}
.preview-container {{ display: flex; flex-direction: column; height: 100vh; }}
.preview-container:not(.active) {{ display: none; }}
.preview-header {{ display: flex; justify-content: flex-end; padding: 4px; }}
.close-preview-btn {{ border: none; background: none; color: #eeffff; font-size: 18px; cursor: pointer; }}
.preview-frame {{ flex: 1; border: none; background: #fff; }}
</style>
</head>
<body>
<div class="preview-container active">
<div class="preview-header">
<button class="close-preview-btn" onclick="this.closest('.preview-container').classList.remove('active')">✕</button>
</div>
{}
</div>
</body>
</html>
"#,
            self.iframe_markup()
        )
    }

    pub fn write_preview(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.preview_page())?;
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_are_escaped_inside_the_attribute() {
        let directive = RenderDirective::new(r#"<p>"hi"</p>"#);
        assert_eq!(directive.srcdoc, "<p>&quot;hi&quot;</p>");
        let markup = directive.iframe_markup();
        let attr = markup
            .split_once("srcdoc=\"")
            .and_then(|(_, rest)| rest.rsplit_once("\"></iframe>"))
            .map(|(inner, _)| inner)
            .unwrap_or_default();
        assert!(!attr.contains('"'));
        assert!(attr.contains("<p>&quot;hi&quot;</p>"));
    }

    #[test]
    fn ampersands_and_single_quotes_pass_through() {
        let directive = RenderDirective::new("<a title='x'>&amp;</a>");
        assert_eq!(directive.srcdoc, "<a title='x'>&amp;</a>");
    }

    #[test]
    fn preview_page_is_written_to_disk() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("preview.html");
        let directive = RenderDirective::new("<h1>Title</h1>");
        let written = directive.write_preview(&path)?;
        let page = fs::read_to_string(written)?;
        assert!(page.contains(r#"srcdoc="<h1>Title</h1>""#));
        assert!(page.contains("close-preview-btn"));
        Ok(())
    }
}
