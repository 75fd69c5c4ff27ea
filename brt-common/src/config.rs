//! Bootstrap configuration loading and root folder resolution
//!
//! Configuration comes from a single TOML file whose every field has a
//! built-in default. A missing file is not fatal (defaults are used and a
//! warning is logged); a file that exists but does not parse is.
//!
//! Root folder resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. `BRT_ROOT_FOLDER` environment variable
//! 3. `root_folder` key in the TOML file
//! 4. OS-dependent compiled default (fallback)

use crate::registry::{LineEntry, LineRegistry};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "BRT_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "brt.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Root folder for the database (optional)
    pub root_folder: Option<PathBuf>,

    /// Explicit database file path; defaults to `<root_folder>/brt.db`
    pub database_path: Option<PathBuf>,

    /// Address the HTTP server binds to
    pub bind_address: String,

    /// HTTP server port
    pub port: u16,

    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub recognition: RecognitionConfig,
    pub prediction: PredictionConfig,
    pub retention: RetentionConfig,

    /// Line registry override; the built-in table is used when empty
    pub lines: Vec<LineEntry>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            database_path: None,
            bind_address: "0.0.0.0".to_string(),
            port: 10000,
            logging: LoggingConfig::default(),
            http: HttpConfig::default(),
            recognition: RecognitionConfig::default(),
            prediction: PredictionConfig::default(),
            retention: RetentionConfig::default(),
            lines: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// HTTP surface limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub max_upload_bytes: usize,
    pub recent_default_limit: u32,
    pub recent_max_limit: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            recent_default_limit: 20,
            recent_max_limit: 200,
        }
    }
}

/// Recognizer variants selectable in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerKind {
    /// Text recognition (OCR) on the plate/sign
    Text,
    /// Object detection, presence only
    Detection,
    /// Digits taken from the uploaded file name
    Filename,
    /// Deterministic choice from the image hash
    Simulated,
}

impl RecognizerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecognizerKind::Text => "text",
            RecognizerKind::Detection => "detection",
            RecognizerKind::Filename => "filename",
            RecognizerKind::Simulated => "simulated",
        }
    }
}

/// Recognition stage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Recognizers run in this order; their candidates are concatenated
    pub recognizers: Vec<RecognizerKind>,

    /// Upper bound on total recognizer time per request
    pub timeout_ms: u64,

    /// OCR program; receives the image on stdin
    pub tesseract_command: String,

    /// Object detector program; receives the image on stdin, prints JSON
    pub detector_command: Option<String>,

    /// Extra arguments for the detector program
    pub detector_args: Vec<String>,

    /// Detection labels that count as a transit vehicle
    pub detector_labels: Vec<String>,

    pub detector_min_confidence: f32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            recognizers: vec![RecognizerKind::Text],
            timeout_ms: 5000,
            tesseract_command: "tesseract".to_string(),
            detector_command: None,
            detector_args: Vec::new(),
            detector_labels: vec!["bus".to_string()],
            detector_min_confidence: 0.5,
        }
    }
}

/// Prediction strategy selectable in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStrategyKind {
    /// Per-line nominal duration from the registry
    Fixed,
    /// Accumulated route distance over a constant speed
    Route,
}

impl PredictionStrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionStrategyKind::Fixed => "fixed",
            PredictionStrategyKind::Route => "route",
        }
    }
}

/// One hop of a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub from: String,
    pub to: String,
    pub distance_km: f64,
}

impl RouteSegment {
    pub fn new(from: impl Into<String>, to: impl Into<String>, distance_km: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            distance_km,
        }
    }
}

/// Default BRT corridor topology
pub fn default_route_segments() -> Vec<RouteSegment> {
    vec![
        RouteSegment::new("BRT - Engenho Poeta", "BRT - Getúlio Vargas", 1.2),
        RouteSegment::new("BRT - Getúlio Vargas", "BRT - Cordeiro", 0.55),
        RouteSegment::new("BRT - Cordeiro", "BRT - Madalena", 0.50),
        RouteSegment::new("BRT - Madalena", "BRT - Derby", 1.0),
        RouteSegment::new("BRT - Derby", "BRT - Boa Vista", 0.9),
        RouteSegment::new("BRT - Boa Vista", "BRT - Praça do Diário", 0.28),
    ]
}

/// Average urban BRT speed: 22 km/h
pub const DEFAULT_SPEED_KM_PER_MIN: f64 = 22.0 / 60.0;

/// Prediction configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub strategy: PredictionStrategyKind,
    pub speed_km_per_min: f64,

    /// Shared topology used by every line without its own route
    pub segments: Vec<RouteSegment>,

    /// Optional per-line remaining route
    pub routes: HashMap<String, Vec<RouteSegment>>,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            strategy: PredictionStrategyKind::Fixed,
            speed_km_per_min: DEFAULT_SPEED_KM_PER_MIN,
            segments: default_route_segments(),
            routes: HashMap::new(),
        }
    }
}

/// Retention sweep configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub enabled: bool,
    /// Observations older than this are deleted
    pub window_secs: u64,
    /// Time between sweeps
    pub interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 3600,
            interval_secs: 300,
        }
    }
}

impl TomlConfig {
    /// Parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise from the platform config file
    ///
    /// A missing file yields defaults with a warning.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_file(),
        };

        match candidate {
            Some(p) if p.exists() => {
                info!("Loading configuration from {}", p.display());
                Self::load(&p)
            }
            Some(p) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    p.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("No config file location available, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.recognition.timeout_ms == 0 {
            return Err(Error::Config(
                "recognition.timeout_ms must be positive".to_string(),
            ));
        }
        if !(self.prediction.speed_km_per_min.is_finite() && self.prediction.speed_km_per_min > 0.0) {
            return Err(Error::Config(
                "prediction.speed_km_per_min must be a positive number".to_string(),
            ));
        }
        let all_segments = self
            .prediction
            .segments
            .iter()
            .chain(self.prediction.routes.values().flatten());
        for segment in all_segments {
            if !(segment.distance_km.is_finite() && segment.distance_km >= 0.0) {
                return Err(Error::Config(format!(
                    "Segment {} -> {} has an invalid distance",
                    segment.from, segment.to
                )));
            }
        }
        if self.retention.window_secs == 0 || self.retention.interval_secs == 0 {
            return Err(Error::Config(
                "retention.window_secs and retention.interval_secs must be positive".to_string(),
            ));
        }
        if self.http.recent_default_limit == 0 || self.http.recent_max_limit == 0 {
            return Err(Error::Config("http recent limits must be positive".to_string()));
        }
        Ok(())
    }

    /// Build the line registry (TOML override or built-in table)
    pub fn line_registry(&self) -> Result<LineRegistry> {
        if self.lines.is_empty() {
            Ok(LineRegistry::builtin())
        } else {
            LineRegistry::new(self.lines.clone())
        }
    }
}

/// Resolve the root folder from CLI, environment, TOML, then OS default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Database path: explicit override, TOML `database_path`, or `<root>/brt.db`
pub fn resolve_database_path(
    cli_arg: Option<&Path>,
    toml_config: &TomlConfig,
    root_folder: &Path,
) -> PathBuf {
    cli_arg
        .map(Path::to_path_buf)
        .or_else(|| toml_config.database_path.clone())
        .unwrap_or_else(|| root_folder.join(DATABASE_FILE_NAME))
}

/// Platform config file location (`<config dir>/brt-cam/config.toml`)
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("brt-cam").join("config.toml"))
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("brt-cam"))
        .unwrap_or_else(|| PathBuf::from("./brt_data"))
}
