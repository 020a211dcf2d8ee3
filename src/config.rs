//! Configuration for rostrum paths and processing settings.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (ROSTRUM_HOME, ROSTRUM_DATA, ROSTRUM_OUTPUT)
//! 2. Config file (.rostrum/config.yaml)
//! 3. Defaults (~/.rostrum for engine state, the current directory as corpus)
//!
//! Config file discovery:
//! - Searches current directory and parents for .rostrum/config.yaml
//! - Paths in config file are relative to the project root (the parent of
//!   `.rostrum/`); source templates are relative to the corpus root

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::aggregate::AggregationSettings;
use crate::core::sentences::SentenceSplitter;
use crate::core::sources::SourcePaths;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub sources: SourceTemplates,
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// Replaces the built-in catalogue when present
    #[serde(default)]
    pub debates: Option<BTreeMap<String, DebateMeta>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Engine state directory (run logs)
    pub home: Option<String>,
    /// Corpus root the source templates are resolved against
    pub data: Option<String>,
    /// Where documents and metrics are written
    pub output: Option<String>,
}

/// Per-debate source paths; `{date}` is replaced by the debate date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceTemplates {
    pub segments: String,
    pub speakers: String,
    pub blocks: String,
    pub topics: String,
    pub mentions: String,
    pub proposals: String,
    pub claims: String,
    pub emotions: String,
    pub fallacies: String,
}

impl Default for SourceTemplates {
    fn default() -> Self {
        Self {
            segments: "transcriptions/segments/{date}/{date}_segments.jsonl".to_string(),
            speakers: "transcriptions/segments/{date}/{date}_speakers.jsonl".to_string(),
            blocks: "annotations/blocks/{date}.txt".to_string(),
            topics: "annotations/topics/{date}.txt".to_string(),
            mentions: "annotations/mentions/{date}.txt".to_string(),
            proposals: "annotations/proposals/{date}.txt".to_string(),
            claims: "annotations/claims/{date}.txt".to_string(),
            emotions: "annotations/emotions/{date}.txt".to_string(),
            fallacies: "annotations/fallacies/{date}.txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessingConfig {
    pub moderators: Option<Vec<String>>,
    pub sentence_delimiter: Option<String>,
}

/// Catalogue entry for one debate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateMeta {
    #[serde(alias = "election-date")]
    pub election_date: String,
    pub media: String,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Engine state directory
    pub home: PathBuf,
    /// Corpus root
    pub data: PathBuf,
    /// Output root
    pub output: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub sources: SourceTemplates,
    pub moderators: Vec<String>,
    pub sentence_delimiter: String,
    /// date → metadata, iterated in date order
    pub debates: BTreeMap<String, DebateMeta>,
}

impl ResolvedConfig {
    /// Source paths for one debate, resolved against the corpus root
    pub fn source_paths(&self, date: &str) -> SourcePaths {
        let path = |template: &str| self.data.join(template.replace("{date}", date));
        SourcePaths {
            segments: path(&self.sources.segments),
            speakers: path(&self.sources.speakers),
            blocks: path(&self.sources.blocks),
            topics: path(&self.sources.topics),
            mentions: path(&self.sources.mentions),
            proposals: path(&self.sources.proposals),
            claims: path(&self.sources.claims),
            emotions: path(&self.sources.emotions),
            fallacies: path(&self.sources.fallacies),
        }
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.home.join("runs")
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.output.join("documents")
    }

    pub fn document_path(&self, date: &str) -> PathBuf {
        self.documents_dir().join(format!("debate-{}.json", date))
    }

    pub fn metrics_dir(&self) -> PathBuf {
        self.output.join("metrics")
    }

    pub fn debate_meta(&self, date: &str) -> Option<&DebateMeta> {
        self.debates.get(date)
    }

    pub fn aggregation_settings(&self) -> AggregationSettings {
        AggregationSettings {
            moderators: self.moderators.clone(),
        }
    }

    pub fn splitter(&self) -> SentenceSplitter {
        SentenceSplitter::new(self.sentence_delimiter.clone())
    }
}

/// The debates of the source corpus
pub fn builtin_debates() -> BTreeMap<String, DebateMeta> {
    [
        ("1993-05-24", "1993-06-06", "Antena 3"),
        ("2008-02-25", "2008-03-09", "AcademiaTV"),
        ("2008-03-03", "2008-03-09", "AcademiaTV"),
        ("2011-11-07", "2011-11-20", "AcademiaTV"),
        ("2015-11-23", "2015-12-20", "Universidad Carlos III"),
        ("2015-11-30", "2015-12-20", "El País"),
        ("2015-12-14", "2015-12-20", "Atresmedia - AcademiaTV"),
        ("2016-06-13", "2016-06-26", "AcademiaTV"),
        ("2019-04-16", "2019-04-28", "RTVE"),
        ("2019-04-20", "2019-04-28", "La Sexta"),
        ("2019-04-22", "2019-04-28", "RTVE"),
        ("2019-04-23", "2019-04-28", "Atresmedia"),
        ("2019-11-01", "2019-11-10", "RTVE"),
        ("2019-11-02", "2019-11-10", "La Sexta"),
        ("2019-11-04", "2019-11-10", "AcademiaTV"),
        ("2019-11-07", "2019-11-10", "La Sexta"),
        ("2023-07-10", "2023-07-23", "Atresmedia"),
        ("2023-07-13", "2023-07-23", "RTVE"),
        ("2023-07-19", "2023-07-23", "RTVE"),
    ]
    .into_iter()
    .map(|(date, election_date, media)| {
        (
            date.to_string(),
            DebateMeta {
                election_date: election_date.to_string(),
                media: media.to_string(),
            },
        )
    })
    .collect()
}

/// Find config file by searching a directory and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".rostrum").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Build the resolved configuration from an optional config file
fn resolve(config_file: Option<PathBuf>, cwd: &Path) -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".rostrum");

    let (config, base_dir) = match config_file {
        Some(ref path) => {
            // Base directory is the parent of .rostrum/
            let base = path
                .parent()
                .and_then(|p| p.parent())
                .unwrap_or(Path::new("."))
                .to_path_buf();
            (load_config_file(path)?, base)
        }
        None => (ConfigFile::default(), cwd.to_path_buf()),
    };

    let home = env_path("ROSTRUM_HOME")
        .or_else(|| config.paths.home.as_deref().map(|p| resolve_path(&base_dir, p)))
        .unwrap_or(default_home);

    let data = env_path("ROSTRUM_DATA")
        .or_else(|| config.paths.data.as_deref().map(|p| resolve_path(&base_dir, p)))
        .unwrap_or_else(|| base_dir.clone());

    let output = env_path("ROSTRUM_OUTPUT")
        .or_else(|| config.paths.output.as_deref().map(|p| resolve_path(&base_dir, p)))
        .unwrap_or_else(|| data.join("output"));

    let defaults = AggregationSettings::default();

    Ok(ResolvedConfig {
        home,
        data,
        output,
        config_file,
        sources: config.sources,
        moderators: config.processing.moderators.unwrap_or(defaults.moderators),
        sentence_delimiter: config
            .processing
            .sentence_delimiter
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| SentenceSplitter::default().delimiter().to_string()),
        debates: config.debates.unwrap_or_else(builtin_debates),
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    resolve(find_config_file(&cwd), &cwd)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the runs directory ($ROSTRUM_HOME/runs)
pub fn runs_dir() -> Result<PathBuf> {
    Ok(config()?.runs_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_catalogue() {
        let debates = builtin_debates();
        assert_eq!(debates.len(), 19);
        assert_eq!(debates["2015-11-30"].media, "El País");
        assert_eq!(debates["2019-04-22"].election_date, "2019-04-28");
        assert_eq!(debates.keys().next().map(String::as_str), Some("1993-05-24"));
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let rostrum_dir = temp.path().join(".rostrum");
        std::fs::create_dir_all(&rostrum_dir).unwrap();

        let config_path = rostrum_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  data: ./corpus
sources:
  segments: "segments/{{date}}.jsonl"
processing:
  moderators: [PRESENTADORA]
  sentence_delimiter: "|"
debates:
  "2023-07-10":
    election-date: "2023-07-23"
    media: Atresmedia
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version.as_deref(), Some("1.0"));
        assert_eq!(config.paths.data.as_deref(), Some("./corpus"));
        assert_eq!(config.sources.segments, "segments/{date}.jsonl");
        // Templates not given keep their defaults
        assert_eq!(config.sources.blocks, "annotations/blocks/{date}.txt");
        assert_eq!(config.processing.moderators, Some(vec!["PRESENTADORA".to_string()]));
        assert_eq!(config.debates.unwrap()["2023-07-10"].election_date, "2023-07-23");
    }

    #[test]
    fn test_source_paths_substitute_date() {
        let config = ResolvedConfig {
            home: PathBuf::from("/state"),
            data: PathBuf::from("/corpus"),
            output: PathBuf::from("/out"),
            config_file: None,
            sources: SourceTemplates::default(),
            moderators: AggregationSettings::default().moderators,
            sentence_delimiter: ". ".to_string(),
            debates: builtin_debates(),
        };

        let paths = config.source_paths("2019-04-22");
        assert_eq!(
            paths.segments,
            PathBuf::from("/corpus/transcriptions/segments/2019-04-22/2019-04-22_segments.jsonl")
        );
        assert_eq!(paths.claims, PathBuf::from("/corpus/annotations/claims/2019-04-22.txt"));
        assert_eq!(
            config.document_path("2019-04-22"),
            PathBuf::from("/out/documents/debate-2019-04-22.json")
        );
        assert_eq!(config.runs_dir(), PathBuf::from("/state/runs"));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
