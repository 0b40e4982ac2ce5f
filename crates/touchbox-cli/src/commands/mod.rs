pub mod config;
pub mod run;
pub mod simulate;

use std::path::Path;

use touchbox_core::Config;

/// Config from an explicit path, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config, touchbox_core::CoreError> {
    match path {
        Some(p) => Config::load_from(p),
        None => Config::load(),
    }
}
