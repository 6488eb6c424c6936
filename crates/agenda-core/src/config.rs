use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::Weekday;
use tracing::{debug, info, trace, warn};

use crate::datetime::{parse_timezone, viewer_timezone};
use crate::grid::{DEFAULT_END_HOUR, DEFAULT_START_HOUR, GridOptions};
use crate::layout::LayoutConfig;
use crate::navigation::ViewMode;
use crate::stack::MaxVisible;

const RC_ENV_VAR: &str = "AGENDARC";
const RC_FILE_NAME: &str = ".agendarc";

#[derive(Debug, Clone)]
pub struct Config {
    map: HashMap<String, String>,
    /// Every rc file read, in load order, includes after their parent.
    pub loaded_files: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let mut map = HashMap::new();
        let defaults = [
            ("calendar.hour_start", DEFAULT_START_HOUR.to_string()),
            ("calendar.hour_end", DEFAULT_END_HOUR.to_string()),
            ("calendar.max_visible.day", "3".to_string()),
            ("calendar.max_visible.week", "3".to_string()),
            ("calendar.max_visible.month", "2".to_string()),
            ("default.view", "week".to_string()),
            ("color", "on".to_string()),
        ];
        for (key, value) in defaults {
            map.insert(key.to_string(), value);
        }

        Self {
            map,
            loaded_files: vec![],
        }
    }
}

impl Config {
    #[tracing::instrument(skip(rc_override))]
    pub fn load(rc_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config::default();

        let rc = resolve_rc_path(rc_override)?;
        if let Some(path) = rc {
            info!(agendarc = %path.display(), "loading agendarc");
            let mut include_stack = Vec::new();
            cfg.load_file(&path, &mut include_stack)?;
        } else {
            debug!("no agendarc found; using defaults");
        }

        Ok(cfg)
    }

    #[tracing::instrument(skip(self, overrides))]
    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (k, v) in overrides {
            let key = k.strip_prefix("rc.").unwrap_or(&k).to_string();
            debug!(key = %key, value = %v, "applying override");
            self.map.insert(key, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.map.get(key).map(|v| parse_bool(v))
    }

    fn get_u32(&self, key: &str, default: u32) -> anyhow::Result<u32> {
        match self.map.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("invalid value for {key}: {raw}")),
            None => Ok(default),
        }
    }

    fn get_usize(&self, key: &str, default: usize) -> anyhow::Result<usize> {
        match self.map.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("invalid value for {key}: {raw}")),
            None => Ok(default),
        }
    }

    pub fn default_view(&self) -> anyhow::Result<ViewMode> {
        let raw = self
            .get("default.view")
            .unwrap_or_else(|| "week".to_string());
        ViewMode::from_key(&raw).ok_or_else(|| anyhow!("invalid value for default.view: {raw}"))
    }

    /// Hour bounds are passed through unchecked; the grid builder rejects
    /// an inverted range.
    #[tracing::instrument(skip(self))]
    pub fn layout_config(&self) -> anyhow::Result<LayoutConfig> {
        let timezone = match self.get("calendar.timezone") {
            Some(raw) => parse_timezone(&raw, "calendar.timezone")
                .ok_or_else(|| anyhow!("invalid value for calendar.timezone: {raw}"))?,
            None => viewer_timezone(),
        };

        let defaults = MaxVisible::default();
        let layout = LayoutConfig {
            grid: GridOptions {
                start_hour: self.get_u32("calendar.hour_start", DEFAULT_START_HOUR)?,
                end_hour: self.get_u32("calendar.hour_end", DEFAULT_END_HOUR)?,
                week_start: Weekday::Mon,
                timezone,
            },
            max_visible: MaxVisible {
                day: self.get_usize("calendar.max_visible.day", defaults.day)?,
                week: self.get_usize("calendar.max_visible.week", defaults.week)?,
                month: self.get_usize("calendar.max_visible.month", defaults.month)?,
            },
        };

        debug!(?layout, "resolved layout config");
        Ok(layout)
    }

    /// `include_stack` holds the canonical paths of the files currently
    /// being read; meeting one of them again is an include cycle.
    #[tracing::instrument(skip(self, include_stack))]
    fn load_file(&mut self, path: &Path, include_stack: &mut Vec<PathBuf>) -> anyhow::Result<()> {
        let path = expand_tilde(path);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if include_stack.contains(&canonical) {
            return Err(anyhow!("include cycle: {}", path.display()));
        }
        include_stack.push(canonical);
        self.loaded_files.push(path.clone());

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        for (line_num, raw_line) in text.lines().enumerate() {
            let mut line = raw_line.trim();
            if let Some((before, _)) = line.split_once('#') {
                line = before.trim();
            }

            if line.is_empty() {
                continue;
            }

            if let Some(include_rest) = line.strip_prefix("include ") {
                let include_path = resolve_include_path(&base_dir, include_rest.trim())?;
                debug!(
                    file = %path.display(),
                    include = %include_path.display(),
                    line = line_num + 1,
                    "processing include"
                );

                if include_path.exists() {
                    self.load_file(&include_path, include_stack)?;
                } else {
                    warn!(
                        include = %include_path.display(),
                        "include file does not exist; skipping"
                    );
                }
                continue;
            }

            let (k, v) = line.split_once('=').ok_or_else(|| {
                anyhow!(
                    "invalid config line {}:{}: {}",
                    path.display(),
                    line_num + 1,
                    raw_line
                )
            })?;

            let key = k.trim().to_string();
            let value = v.trim().to_string();
            trace!(key = %key, value = %value, "loaded config key");
            self.map.insert(key, value);
        }

        include_stack.pop();
        Ok(())
    }
}

fn resolve_rc_path(override_path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = override_path {
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(rc_env) = std::env::var(RC_ENV_VAR) {
        if rc_env == "/dev/null" {
            return Ok(None);
        }
        return Ok(Some(PathBuf::from(rc_env)));
    }

    let Some(home) = dirs::home_dir() else {
        warn!("cannot determine home directory; skipping agendarc");
        return Ok(None);
    };
    let candidate = home.join(RC_FILE_NAME);
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

fn resolve_include_path(base_dir: &Path, include: &str) -> anyhow::Result<PathBuf> {
    if include.trim().is_empty() {
        return Err(anyhow!("include path cannot be empty"));
    }

    let raw = PathBuf::from(include);
    let expanded = expand_tilde(&raw);
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base_dir.join(expanded))
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "on" | "true"
    )
}
