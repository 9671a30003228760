//! Process-wide render configuration.

use log::warn;
use once_cell::sync::OnceCell;

/// Knobs shared by the integrator and the render driver. Installed
/// once at startup and immutable afterwards; readers that run before
/// installation see the defaults.
#[derive(Copy, Clone, Debug)]
pub struct Config {
    /// Bounce count below which Russian roulette never terminates a
    /// path.
    pub min_depth: usize,

    /// Hard bounce ceiling.
    pub max_depth: usize,

    /// Monte-Carlo samples per pixel in path-tracing mode.
    pub path_samples: usize,

    /// Path tracing when true, classic recursive ray tracing when
    /// false.
    pub pathtrace: bool,

    /// Whether the denoiser auxiliary channels are collected and
    /// written.
    pub denoise: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_depth: 3,
            max_depth: 1000,
            path_samples: 8,
            pathtrace: true,
            denoise: true,
        }
    }
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    /// Install the process configuration. Later installs are ignored.
    ///
    /// * `config` - The configuration to install.
    pub fn install(config: Config) {
        if CONFIG.set(config).is_err() {
            warn!("Render configuration is already installed; keeping the existing one");
        }
    }

    /// The installed configuration, or the defaults.
    pub fn get() -> Config {
        CONFIG.get().copied().unwrap_or_default()
    }
}
