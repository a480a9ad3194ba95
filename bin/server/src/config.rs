use std::path::PathBuf;

use clap::Parser;

/// Command line arguments, each also readable from the environment
#[derive(Parser, Debug, Clone)]
#[clap(name = "graphboot-server")]
#[clap(about = "Boots the graph component registry and serves its state over HTTP")]
pub struct Settings {
    /// Server host
    #[clap(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[clap(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Graph properties file (TOML, YAML or JSON)
    #[clap(long, env = "GRAPH_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Capabilities to leave out of the manifest, e.g. graph-repository
    #[clap(long = "without", value_delimiter = ',')]
    pub without: Vec<String>,
}

impl Settings {
    /// Parse arguments after loading `.env` so its values can fill `env` fallbacks
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Settings::parse()
    }

    /// Get the server address as a string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let settings = Settings::parse_from([
            "graphboot-server",
            "--port",
            "9000",
            "--without",
            "graph-repository,neo4j",
        ]);

        assert_eq!(settings.server_address(), format!("{}:9000", settings.host));
        assert_eq!(settings.without, vec!["graph-repository", "neo4j"]);
    }
}
