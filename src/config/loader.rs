//! Configuration loading.

use std::path::Path;

use super::types::Config;

const CONFIG_FILE: &str = "config.json";

/// Load configuration from `config.json` in the working directory, falling
/// back to code defaults. A malformed file is an error on stderr, not a
/// silent fallback, so typos don't go unnoticed in deployments.
pub fn load() -> Config {
    load_from(Path::new(CONFIG_FILE))
}

pub fn load_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str::<Config>(&raw) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "Loaded configuration file");
                config
            }
            Err(err) => {
                eprintln!(
                    "Failed to parse {}: {err}; using built-in defaults",
                    path.display()
                );
                Config::default()
            }
        },
        Err(_) => Config::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_from(Path::new("/definitely/not/here/config.json"));
        assert_eq!(config.port, Config::default().port);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = std::env::temp_dir().join(format!("shove-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"port": 9999, "game": {"round_duration_secs": 2.5}}"#).unwrap();

        let config = load_from(&path);
        assert_eq!(config.port, 9999);
        assert!((config.game.round_duration_secs - 2.5).abs() < f64::EPSILON);
        // untouched fields keep their defaults
        assert_eq!(config.game.pieces_per_player, 3);
        assert_eq!(config.server.gc_interval_secs, 300);

        std::fs::remove_dir_all(&dir).ok();
    }
}
