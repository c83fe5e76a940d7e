use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnimaConfig {
    pub workspace: WorkspaceConfig,
    pub canvas: CanvasConfig,
    pub parser: ParserConfig,
    pub emotion: EmotionConfig,
    pub logging: LoggingConfig,
}

impl AnimaConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: AnimaConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let (cfg, fallback) = Self::try_load_or_default(path);
        if let Some(e) = fallback {
            tracing::info!("Config file not found or invalid ({}), using defaults", e);
        }
        cfg
    }

    /// Like [`load_or_default`](Self::load_or_default) but hands the load
    /// error back instead of logging it, for callers that install logging
    /// only after the config is known.
    pub fn try_load_or_default<P: AsRef<Path>>(path: P) -> (Self, Option<anyhow::Error>) {
        match Self::load(path) {
            Ok(cfg) => (cfg, None),
            Err(e) => {
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                (cfg, Some(e))
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ANIMA_WORKSPACE") {
            self.workspace.root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("ANIMA_CANVAS_ROOT") {
            self.canvas.root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("ANIMA_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("ANIMA_HISTORY_LIMIT") {
            if let Ok(n) = v.parse() {
                self.emotion.history_limit = n;
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

/// Where the persisted state documents live. Paths are relative to `root`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub root: PathBuf,
    pub emotion_state: String,
    pub presence_state: String,
    pub rooms: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("workspace"),
            emotion_state: "emotion-state.json".to_string(),
            presence_state: "presence-state.json".to_string(),
            rooms: "rooms.json".to_string(),
        }
    }
}

/// Shared canvas directory polled by the renderer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub root: PathBuf,
    pub file: String,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        let root = dirs::home_dir()
            .map(|home| home.join(".anima").join("canvas"))
            .unwrap_or_else(|| PathBuf::from(".anima/canvas"));
        Self {
            root,
            file: "persona-canvas.json".to_string(),
        }
    }
}

/// Which tag families are removed from the delivered text.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub strip_audio_tag: bool,
    pub strip_reply_tags: bool,
    pub strip_persona_tags: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            strip_audio_tag: true,
            strip_reply_tags: true,
            strip_persona_tags: true,
        }
    }
}

/// Blending weights given to the previous value, keyed by arousal band.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct InertiaProfile {
    pub fast: f64,
    pub default: f64,
    pub slow: f64,
    /// Arousal strictly above this selects `fast`.
    pub fast_above: f64,
    /// Arousal strictly below this selects `slow`.
    pub slow_below: f64,
}

impl Default for InertiaProfile {
    fn default() -> Self {
        Self {
            fast: 0.25,
            default: 0.4,
            slow: 0.55,
            fast_above: 0.6,
            slow_below: 0.3,
        }
    }
}

impl InertiaProfile {
    pub fn for_arousal(&self, arousal: f64) -> f64 {
        if arousal > self.fast_above {
            self.fast
        } else if arousal < self.slow_below {
            self.slow
        } else {
            self.default
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    pub history_limit: usize,
    pub default_confidence: f64,
    pub inertia: InertiaProfile,
    /// How many trailing history entries the trend compares against.
    pub trend_window: usize,
    /// Valence delta that counts as rising or falling.
    pub trend_threshold: f64,
    /// Valence magnitude that counts as a settled positive/negative mood.
    pub trend_band: f64,
    /// Valence magnitude used by the last-resort name fallback.
    pub fallback_band: f64,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            default_confidence: 0.8,
            inertia: InertiaProfile::default(),
            trend_window: 3,
            trend_threshold: 0.15,
            trend_band: 0.3,
            fallback_band: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
    /// When set, logs also go to a daily-rolling file in this directory.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            dir: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
