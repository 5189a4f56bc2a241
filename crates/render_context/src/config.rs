//! Configuration system
//!
//! File-backed configuration (TOML or RON, chosen by extension) plus the
//! startup parameters of the graphics context: target API version,
//! validation and the platform portability settings.

use ash::vk;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// On-disk format of a configuration file, chosen by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.ron`
    Ron,
}

impl ConfigFormat {
    /// Detect the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    fn parse<T: DeserializeOwned>(self, contents: &str) -> Result<T, String> {
        match self {
            Self::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
            Self::Ron => ron::from_str(contents).map_err(|e| e.to_string()),
        }
    }

    fn render<T: Serialize>(self, value: &T) -> Result<String, String> {
        match self {
            Self::Toml => toml::to_string_pretty(value).map_err(|e| e.to_string()),
            Self::Ron => ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
                .map_err(|e| e.to_string()),
        }
    }
}

/// File-backed configuration
///
/// Missing fields fall back to `Default` when the implementor is
/// `#[serde(default)]`, so partial files are accepted.
pub trait Config: Serialize + DeserializeOwned + Default {
    /// Load configuration from a `.toml` or `.ron` file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = format.parse(&contents).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        log::debug!("Loaded {:?} configuration from {}", format, path.display());
        Ok(config)
    }

    /// Save configuration, in the format its extension names
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = ConfigFormat::from_path(path)?
            .render(self)
            .map_err(ConfigError::Serialize)?;

        std::fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("cannot access {}: {source}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying IO failure
        source: std::io::Error,
    },

    /// The file contents are not valid for the format
    #[error("invalid configuration in {}: {message}", path.display())]
    Parse {
        /// File involved
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// The configuration could not be serialized
    #[error("cannot serialize configuration: {0}")]
    Serialize(String),

    /// The extension is neither `.toml` nor `.ron`
    #[error("unsupported configuration format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// Semantic version of the graphics API requested at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApiVersion {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Patch version
    pub patch: u32,
}

impl ApiVersion {
    /// Vulkan 1.0
    pub const V1_0: Self = Self::new(1, 0, 0);
    /// Vulkan 1.1
    pub const V1_1: Self = Self::new(1, 1, 0);
    /// Vulkan 1.2
    pub const V1_2: Self = Self::new(1, 2, 0);
    /// Vulkan 1.3
    pub const V1_3: Self = Self::new(1, 3, 0);

    /// Create a version from its components
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Packed form expected by the API (variant 0)
    pub const fn to_packed(self) -> u32 {
        vk::make_api_version(0, self.major, self.minor, self.patch)
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::V1_2
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Instance extension enabling enumeration of portability implementations
pub const PORTABILITY_ENUMERATION_EXTENSION: &str = "VK_KHR_portability_enumeration";

/// Device extension required on portability implementations
pub const PORTABILITY_SUBSET_EXTENSION: &str = "VK_KHR_portability_subset";

/// Platform-dependent creation settings, resolved once at startup
///
/// Portability platforms (MoltenVK on macOS/iOS) need one extra instance
/// extension, one extra device extension and the enumerate-portability
/// instance flag. Everything else gets the empty configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Instance extensions appended after the window system's required list
    pub extra_instance_extensions: Vec<String>,
    /// Device extensions appended after the swapchain extension
    pub extra_device_extensions: Vec<String>,
    /// Whether the instance is created with the enumerate-portability flag
    pub enumerate_portability: bool,
}

impl PlatformConfig {
    /// Settings for platforms with a conformant native driver
    pub fn native() -> Self {
        Self::default()
    }

    /// Settings for portability-layer platforms
    pub fn portability() -> Self {
        Self {
            extra_instance_extensions: vec![PORTABILITY_ENUMERATION_EXTENSION.to_string()],
            extra_device_extensions: vec![PORTABILITY_SUBSET_EXTENSION.to_string()],
            enumerate_portability: true,
        }
    }

    /// Resolve the settings for the platform this binary was built for
    pub fn for_current_platform() -> Self {
        if cfg!(any(target_os = "macos", target_os = "ios")) {
            Self::portability()
        } else {
            Self::native()
        }
    }

    /// Instance creation flags implied by these settings
    pub fn instance_flags(&self) -> vk::InstanceCreateFlags {
        if self.enumerate_portability {
            vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        } else {
            vk::InstanceCreateFlags::empty()
        }
    }
}

/// # Graphics Context Configuration
///
/// Startup parameters for [`GraphicsContext::initialize`](crate::GraphicsContext::initialize).
/// The API version is fixed for the lifetime of the context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Application name reported to the driver
    pub application_name: String,
    /// Target graphics API version
    pub api_version: ApiVersion,
    /// Whether to enable validation layers (None = debug builds only)
    pub enable_validation: Option<bool>,
    /// Whether the host binds the window right after context creation
    ///
    /// Android-style platforms hand out the surface only once the app is in
    /// the foreground, so the initial bind is deferred there.
    pub bind_on_startup: bool,
    /// Platform portability settings, resolved at startup
    #[serde(skip)]
    pub platform: PlatformConfig,
}

impl ContextConfig {
    /// Create a configuration with defaults for the given application
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            ..Self::default()
        }
    }

    /// Set the target API version
    pub fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    /// Enable or disable validation layers explicitly
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Choose whether the host performs the initial bind
    pub fn with_bind_on_startup(mut self, bind: bool) -> Self {
        self.bind_on_startup = bind;
        self
    }

    /// Override the platform settings
    pub fn with_platform(mut self, platform: PlatformConfig) -> Self {
        self.platform = platform;
        self
    }

    /// Resolve the validation setting against the build type
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            application_name: "render_context".to_string(),
            api_version: ApiVersion::V1_2,
            enable_validation: None,
            bind_on_startup: !cfg!(target_os = "android"),
            platform: PlatformConfig::for_current_platform(),
        }
    }
}

impl Config for ContextConfig {}
