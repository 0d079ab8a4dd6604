//! INI-style run configuration
//!
//! A config file is a sequence of `[section]` headers and `key = value`
//! lines; anything else is ignored. Typed views ([`FilePaths`],
//! [`SimulationWindow`], [`GenerationSpec`]) pull out the keys the pipeline
//! consumes and turn missing required entries into config errors.

use crate::calendar::parse_date;
use crate::error::{ScenarioError, ScenarioResult};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Raw parsed configuration
#[derive(Debug, Clone, Default)]
pub struct IniConfig {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl IniConfig {
    /// Read and parse a config file
    pub fn load(path: &Path) -> ScenarioResult<Self> {
        info!("reading config file {}", path.display());
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Parse config text. Lines outside any `[section]` land in `others`.
    pub fn parse(text: &str) -> Self {
        let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut current = "others".to_string();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current = name.trim().to_string();
            } else if let Some((key, value)) = line.split_once('=') {
                sections
                    .entry(current.clone())
                    .or_default()
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Self { sections }
    }

    /// Whether the section/option pair exists
    pub fn has(&self, section: &str, option: &str) -> bool {
        self.sections
            .get(section)
            .is_some_and(|s| s.contains_key(option))
    }

    /// A required option; missing section or option is a config error
    pub fn get(&self, section: &str, option: &str) -> ScenarioResult<&str> {
        let sec = self
            .sections
            .get(section)
            .ok_or_else(|| ScenarioError::config(format!("section `{}` not found", section)))?;
        sec.get(option).map(String::as_str).ok_or_else(|| {
            ScenarioError::config(format!("section.option `{}.{}` not found", section, option))
        })
    }

    /// An option with a fallback value
    pub fn get_or<'a>(&'a self, section: &str, option: &str, default: &'a str) -> &'a str {
        self.sections
            .get(section)
            .and_then(|s| s.get(option))
            .map(String::as_str)
            .unwrap_or(default)
    }
}

/// The `[filepaths]` section. `metatrajectories`, `path-cache` and
/// `constraints` accept the literal `none`; `spaces-cache` is reserved.
#[derive(Debug, Clone)]
pub struct FilePaths {
    /// Spaces JSON
    pub spaces: PathBuf,
    /// Sensors JSON
    pub sensors: PathBuf,
    /// Metapeople JSON
    pub metapeople: PathBuf,
    /// Metaevents JSON
    pub metaevents: PathBuf,
    /// Metasensors JSON
    pub metasensors: PathBuf,
    /// Pre-recorded trajectories JSON, if any
    pub metatrajectories: Option<PathBuf>,
    /// Persistent shortest-path cache CSV, if any
    pub path_cache: Option<PathBuf>,
    /// Reserved for a future spaces cache
    pub spaces_cache: Option<PathBuf>,
    /// Constraints JSON, if any
    pub constraints: Option<PathBuf>,
    /// Events JSON (read and rewritten by entity generation)
    pub events: PathBuf,
    /// People JSON (read and rewritten by entity generation)
    pub people: PathBuf,
    /// Output directory for CSV and log files
    pub output: PathBuf,
}

/// Treat the literal `none` (or absence) as "no file"
fn optional_path(config: &IniConfig, option: &str) -> Option<PathBuf> {
    let value = config.get_or("filepaths", option, "none");
    (value != "none").then(|| PathBuf::from(value))
}

impl FilePaths {
    /// Extract the `[filepaths]` section
    pub fn from_config(config: &IniConfig) -> ScenarioResult<Self> {
        let required =
            |option: &str| -> ScenarioResult<PathBuf> { Ok(config.get("filepaths", option)?.into()) };
        Ok(Self {
            spaces: required("spaces")?,
            sensors: required("sensors")?,
            metapeople: required("metapeople")?,
            metaevents: required("metaevents")?,
            metasensors: required("metasensors")?,
            metatrajectories: optional_path(config, "metatrajectories"),
            path_cache: optional_path(config, "path-cache"),
            spaces_cache: optional_path(config, "spaces-cache"),
            constraints: optional_path(config, "constraints"),
            events: required("events")?,
            people: required("people")?,
            output: required("output")?,
        })
    }

    /// The attendance CSV inside the output directory
    pub fn data_csv(&self) -> PathBuf {
        self.output.join("data.csv")
    }

    /// The attendance log inside the output directory
    pub fn data_log(&self) -> PathBuf {
        self.output.join("data_log.txt")
    }

    /// The per-metasensor observation CSV
    pub fn observations_csv(&self, metasensor: crate::types::MetaSensorId) -> PathBuf {
        self.output.join(format!("obs_msid_{}.csv", metasensor))
    }

    /// The per-metasensor observation log
    pub fn observations_log(&self, metasensor: crate::types::MetaSensorId) -> PathBuf {
        self.output.join(format!("obs_log_msid_{}.csv", metasensor))
    }
}

/// The `[synthetic-data-generator]` section: simulated day range and the
/// optional random seed
#[derive(Debug, Clone, Copy)]
pub struct SimulationWindow {
    /// First simulated day
    pub start: NaiveDate,
    /// Last simulated day (inclusive)
    pub end: NaiveDate,
    /// Explicit random seed for reproducible runs
    pub seed: Option<u64>,
}

impl SimulationWindow {
    /// Extract the `[synthetic-data-generator]` section
    pub fn from_config(config: &IniConfig) -> ScenarioResult<Self> {
        let start = parse_date(config.get("synthetic-data-generator", "start")?)?;
        let end = parse_date(config.get("synthetic-data-generator", "end")?)?;
        let seed = match config.get_or("synthetic-data-generator", "seed", "") {
            "" => None,
            raw => Some(raw.parse::<u64>().map_err(|e| {
                ScenarioError::config(format!("bad seed `{}`: {}", raw, e))
            })?),
        };
        Ok(Self { start, end, seed })
    }
}

/// How `entitygen` treats an entity population
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// Reload from file, generate nothing
    None,
    /// Regenerate the full population
    All,
    /// Top up the existing file to the requested count
    Diff,
}

/// One `[events]` / `[people]` section
#[derive(Debug, Clone, Copy)]
pub struct GenerationSpec {
    /// Target population size
    pub number: usize,
    /// Generation mode
    pub mode: GenerationMode,
}

impl GenerationSpec {
    /// Extract the named generation section
    pub fn from_config(config: &IniConfig, section: &str) -> ScenarioResult<Self> {
        let number = config
            .get_or(section, "number", "0")
            .parse::<usize>()
            .map_err(|e| ScenarioError::config(format!("bad {}.number: {}", section, e)))?;
        let raw = config.get(section, "generation")?;
        let mode = match raw.chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('n') => GenerationMode::None,
            Some('a') => GenerationMode::All,
            Some('d') => GenerationMode::Diff,
            _ => {
                return Err(ScenarioError::invariant(format!(
                    "unknown generation mode `{}`",
                    raw
                )))
            }
        };
        Ok(Self { number, mode })
    }
}
