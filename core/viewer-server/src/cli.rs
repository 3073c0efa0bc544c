use clap::Parser;
use std::path::PathBuf;
use viewer_core::ViewerConfig;

#[derive(Debug, Parser)]
#[command(name = "claude-log-viewer")]
#[command(about = "Browse Claude Code session transcripts in the browser")]
#[command(version)]
pub struct Cli {
    /// Config file (default: <config dir>/claude-log-viewer/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Claude Code data directory (default: ~/.claude)
    #[arg(long, value_name = "DIR")]
    pub claude_dir: Option<PathBuf>,

    /// Directory of frontend assets to serve
    #[arg(long, value_name = "DIR")]
    pub static_dir: Option<PathBuf>,
}

impl Cli {
    /// Flags win over the config file and the environment.
    pub fn apply(&self, config: &mut ViewerConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.claude_dir {
            config.storage.claude_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.static_dir {
            config.server.static_dir = Some(dir.clone());
        }
    }
}
