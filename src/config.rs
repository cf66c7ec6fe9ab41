use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scribe", about = "A small paginated blog server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Replace all content with demo users, posts and comments before serving
    #[arg(long)]
    pub seed: bool,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub pagination: PaginationConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

/// Page sizes for the JSON API and the server-rendered views.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PaginationConfig {
    pub api_per_page: u32,
    pub html_per_page: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            api_per_page: 10,
            html_per_page: 5,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("scribe.db"));
        }

        // A zero page size would make every page empty
        config.pagination.api_per_page = config.pagination.api_per_page.max(1);
        config.pagination.html_per_page = config.pagination.html_per_page.max(1);

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match cli.data_dir.clone() {
            Some(dir) => Ok(dir),
            None => dirs::home_dir()
                .map(|home| home.join(".scribe"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    /// Database path, falling back to a relative file when `load` was bypassed.
    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("scribe.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with(data_dir: Option<PathBuf>) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir,
            seed: false,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.pagination.api_per_page, 10);
        assert_eq!(config.pagination.html_per_page, 5);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_with(Some(PathBuf::from("/tmp/test-scribe")));
        assert_eq!(
            Config::data_dir(&cli).unwrap(),
            PathBuf::from("/tmp/test-scribe")
        );
    }

    #[test]
    fn data_dir_defaults_to_home_dot_scribe() {
        let dir = Config::data_dir(&cli_with(None)).unwrap();
        assert!(dir.ends_with(".scribe"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_with(Some(tmp.path().to_path_buf()))).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.db_path(), tmp.path().join("scribe.db"));
    }

    #[test]
    fn load_reads_toml_file_and_cli_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000

[pagination]
api_per_page = 25
html_per_page = 0
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: None,
            port: Some(4000),
            data_dir: Some(tmp.path().to_path_buf()),
            seed: false,
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.pagination.api_per_page, 25);
        assert_eq!(config.pagination.html_per_page, 1);
    }
}
