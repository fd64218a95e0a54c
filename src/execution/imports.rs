//! Finds the top-level modules a Python source imports.

use once_cell::sync::Lazy;
use regex::Regex;

static IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*import\s+([^#;]+)").expect("valid import regex"));
static FROM_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*from\s+([A-Za-z_][A-Za-z0-9_\.]*)\s+import\b").expect("valid from-import regex")
});

/// Top-level module names in first-seen order. Relative imports are skipped.
pub fn scan(source: &str) -> Vec<String> {
    let mut modules: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        let top = name.split('.').next().unwrap_or_default().trim();
        if is_identifier(top) && !modules.iter().any(|m| m == top) {
            modules.push(top.to_string());
        }
    };

    for statement in source.lines().flat_map(statements) {
        if let Some(caps) = FROM_IMPORT.captures(statement) {
            push(&caps[1]);
        } else if let Some(caps) = IMPORT.captures(statement) {
            for item in caps[1].split(',') {
                let name = item.split_whitespace().next().unwrap_or_default();
                push(name);
            }
        }
    }
    modules
}

/// Splits a line on `;` outside string literals, dropping any trailing comment.
fn statements(line: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '#' => {
                    parts.push(&line[start..i]);
                    return parts;
                }
                ';' => {
                    parts.push(&line[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&line[start..]);
    parts
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_aliased_imports() {
        let src = "import numpy as np, os.path\nimport sys  # stdlib\n";
        assert_eq!(scan(src), vec!["numpy", "os", "sys"]);
    }

    #[test]
    fn from_imports_and_relative_imports() {
        let src = "from pandas.io import json\nfrom . import sibling\nfrom .pkg import x\n";
        assert_eq!(scan(src), vec!["pandas"]);
    }

    #[test]
    fn indented_imports_count_and_duplicates_collapse() {
        let src = "def f():\n    import math\n    from math import pi\n";
        assert_eq!(scan(src), vec!["math"]);
    }

    #[test]
    fn text_mentioning_import_is_ignored() {
        let src = "print('import this')\n# import antigravity\ns = 'a; import fake'\n";
        assert!(scan(src).is_empty());
    }

    #[test]
    fn imports_after_semicolons_are_found() {
        let src = "x = 1; import numpy\nimport os; import requests\ny = 2; from scipy import stats  # ; import nope\n";
        assert_eq!(scan(src), vec!["numpy", "os", "requests", "scipy"]);
    }
}
