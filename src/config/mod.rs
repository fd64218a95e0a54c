use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    time::Duration,
};

use directories::BaseDirs;

use crate::execution::ExecutionSettings;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
    read_env: bool,
}

impl Config {
    pub fn load() -> Self {
        let config_path = default_config_path();
        let mut map = default_map();

        // Read .playgroundrc if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    if let Some((k, v)) = parse_line(&line) {
                        map.insert(k, v);
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path, read_env: true }
    }

    /// Defaults plus explicit overrides, ignoring the rc file and the environment.
    pub fn with_overrides<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = default_map();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        Self { inner: map, config_path: default_config_path(), read_env: false }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        // ENV first
        if self.read_env {
            if let Ok(v) = env::var(key) {
                return Some(v);
            }
        }
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    pub fn state_path(&self) -> PathBuf {
        self.get_path("PLAYGROUND_STATE_PATH")
            .unwrap_or_else(|| playground_config_dir().join("state.json"))
    }

    pub fn preview_path(&self) -> PathBuf {
        self.get_path("PREVIEW_PATH")
            .unwrap_or_else(|| playground_temp_dir().join("preview.html"))
    }

    pub fn log_path(&self) -> PathBuf {
        self.get_path("LOG_PATH")
            .unwrap_or_else(|| playground_temp_dir().join("playground.log"))
    }

    pub fn save_dir(&self) -> PathBuf {
        self.get_path("SAVE_DIR").unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn python_bin(&self) -> String {
        self.get("PYTHON_BIN").unwrap_or_else(default_python)
    }

    pub fn tab_size(&self) -> usize {
        self.get_usize("TAB_SIZE").filter(|n| *n > 0).unwrap_or(4)
    }

    /// `0` disables autosave.
    pub fn autosave_interval(&self) -> Option<Duration> {
        match self.get_usize("AUTOSAVE_INTERVAL") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs as u64)),
            None => Some(Duration::from_secs(5)),
        }
    }

    pub fn execution_settings(&self) -> ExecutionSettings {
        let timeout = match self.get_usize("EXECUTION_TIMEOUT") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs as u64)),
            None => Some(Duration::from_secs(30)),
        };
        let js_memory_limit = self.get_usize("JS_MEMORY_LIMIT_MB").unwrap_or(64) * 1024 * 1024;
        ExecutionSettings { timeout, js_memory_limit }
    }
}

fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (k, v) = line.split_once('=')?;
    Some((k.trim().to_string(), v.trim().to_string()))
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "PYTHON_BIN",
        "PYTHON_AUTO_INSTALL",
        "EXECUTION_TIMEOUT",
        "JS_MEMORY_LIMIT_MB",
        "AUTOSAVE_INTERVAL",
        "SAVE_DIR",
        "PREVIEW_PATH",
        "LOG_PATH",
        "DEFAULT_LANGUAGE",
        "DEFAULT_THEME",
        "TAB_SIZE",
    ];

    KEYS.contains(&k) || k.starts_with("PLAYGROUND_")
}

fn default_python() -> String {
    if cfg!(windows) { "python".into() } else { "python3".into() }
}

fn playground_config_dir() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("code_playground")
}

fn playground_temp_dir() -> PathBuf {
    env::temp_dir().join("code_playground")
}

fn default_config_path() -> PathBuf {
    playground_config_dir().join(".playgroundrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    let as_string = |p: &Path| p.to_string_lossy().into_owned();

    // Paths
    m.insert("PLAYGROUND_STATE_PATH".into(), as_string(&playground_config_dir().join("state.json")));
    m.insert("PREVIEW_PATH".into(), as_string(&playground_temp_dir().join("preview.html")));
    m.insert("LOG_PATH".into(), as_string(&playground_temp_dir().join("playground.log")));
    m.insert("SAVE_DIR".into(), ".".into());

    // Numbers
    m.insert("EXECUTION_TIMEOUT".into(), "30".into());
    m.insert("JS_MEMORY_LIMIT_MB".into(), "64".into());
    m.insert("AUTOSAVE_INTERVAL".into(), "5".into());
    m.insert("TAB_SIZE".into(), "4".into());

    // Strings
    m.insert("PYTHON_BIN".into(), default_python());
    m.insert("DEFAULT_LANGUAGE".into(), "javascript".into());
    m.insert("DEFAULT_THEME".into(), "material".into());

    // Bools as strings
    m.insert("PYTHON_AUTO_INSTALL".into(), "false".into());

    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rc_lines_skip_comments_and_blanks() {
        assert_eq!(parse_line("# comment"), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(
            parse_line(" TAB_SIZE = 2 "),
            Some(("TAB_SIZE".to_string(), "2".to_string()))
        );
        assert_eq!(parse_line("no separator"), None);
    }

    #[test]
    fn known_and_prefixed_keys_are_accepted() {
        assert!(is_config_key("PYTHON_BIN"));
        assert!(is_config_key("PLAYGROUND_ANYTHING"));
        assert!(!is_config_key("HOME"));
    }

    #[test]
    fn zero_timeout_disables_the_limit() {
        let cfg = Config::with_overrides([("EXECUTION_TIMEOUT", "0")]);
        assert_eq!(cfg.execution_settings().timeout, None);

        let cfg = Config::with_overrides([("EXECUTION_TIMEOUT", "3")]);
        assert_eq!(cfg.execution_settings().timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn defaults_cover_every_setting() {
        let cfg = Config::with_overrides(Vec::<(String, String)>::new());
        assert_eq!(cfg.tab_size(), 4);
        assert_eq!(cfg.autosave_interval(), Some(Duration::from_secs(5)));
        assert_eq!(cfg.execution_settings().js_memory_limit, 64 * 1024 * 1024);
        assert!(!cfg.get_bool("PYTHON_AUTO_INSTALL"));
        assert!(cfg.state_path().ends_with("state.json"));
    }
}
