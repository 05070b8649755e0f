use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// tabkeep - edit the sheets of one workbook and save them as you go
#[derive(Debug, Clone, Parser)]
#[command(name = "tabkeep-server")]
#[command(author, version, about = "Autosaving workbook editor backend", long_about = None)]
pub struct ServerConfig {
    /// Workbook file to edit
    #[arg(short, long, value_name = "PATH", default_value = "metadata-example.xlsx")]
    pub file: PathBuf,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    pub addr: SocketAddr,

    /// Start with autosave turned off
    #[arg(long)]
    pub no_autosave: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServerConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
