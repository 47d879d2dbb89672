use std::fmt;
use std::str::FromStr;

/// Environment variable that turns on the full EGL config dump. Only its
/// presence matters.
pub const SHOW_CONFIGS_ENV: &str = "SHOW_CONFIGS";

/// How the GLES context gets bound to the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextStrategy {
    /// Create a small offscreen pbuffer and make it current with the context.
    PbufferBacked { width: i32, height: i32 },
    /// Make the context current without any surface. Needs
    /// `EGL_KHR_surfaceless_context`.
    Surfaceless,
}

impl ContextStrategy {
    pub const DEFAULT_PBUFFER: Self = Self::PbufferBacked {
        width: 16,
        height: 16,
    };

    /// Client API version requested when none is configured explicitly.
    pub fn default_client_version(&self) -> (i32, i32) {
        match self {
            Self::PbufferBacked { .. } => (3, 0),
            Self::Surfaceless => (3, 1),
        }
    }
}

impl Default for ContextStrategy {
    fn default() -> Self {
        Self::DEFAULT_PBUFFER
    }
}

impl fmt::Display for ContextStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PbufferBacked { width, height } => write!(f, "pbuffer {width}x{height}"),
            Self::Surfaceless => write!(f, "surfaceless"),
        }
    }
}

/// Pixel buffer dimensions written as `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PbufferSize {
    pub width: i32,
    pub height: i32,
}

impl FromStr for PbufferSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{s}`"))?;

        let parse = |value: &str| -> Result<i32, String> {
            match value.trim().parse::<i32>() {
                Ok(v) if v > 0 => Ok(v),
                _ => Err(format!("`{value}` is not a positive pixel count")),
            }
        };

        Ok(Self {
            width: parse(width)?,
            height: parse(height)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub strategy: ContextStrategy,
    /// `(major, minor)` GLES version requested from `eglCreateContext`.
    pub client_version: (i32, i32),
    /// Bits per channel required for red, green, blue and alpha.
    pub color_bits: i32,
    pub show_configs: bool,
}

impl ProbeConfig {
    pub fn new(strategy: ContextStrategy) -> Self {
        Self {
            strategy,
            client_version: strategy.default_client_version(),
            color_bits: 8,
            show_configs: false,
        }
    }

    pub fn from_env() -> Self {
        Self {
            show_configs: std::env::var_os(SHOW_CONFIGS_ENV).is_some(),
            ..Self::default()
        }
    }

    /// Switches strategy and resets the client version to that strategy's
    /// default.
    pub fn with_strategy(mut self, strategy: ContextStrategy) -> Self {
        self.strategy = strategy;
        self.client_version = strategy.default_client_version();
        self
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self::new(ContextStrategy::default())
    }
}
