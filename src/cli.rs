use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::error::SyncError;
use crate::preview::PreviewMode;

#[derive(Parser)]
#[command(name = "syncpad")]
#[command(version = "0.3.0")]
#[command(about = "Headless client for the syncpad collaborative-editing engine")]
pub struct Args {
    /// File to open, by name (e.g. index.html) or numeric id
    pub file: Option<String>,

    /// HTTP origin of the file service
    #[arg(long)]
    pub base_url: Option<String>,

    /// Room whose file tree to load
    #[arg(long)]
    pub room: Option<String>,

    /// Preview composition policy
    #[arg(long, value_enum)]
    pub preview_mode: Option<PreviewMode>,

    /// Write the composed preview to this path after every update
    #[arg(long)]
    pub preview_out: Option<PathBuf>,

    /// Display name announced on the channel (random when omitted)
    #[arg(long)]
    pub name: Option<String>,

    /// TOML configuration file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// List the room's projects and files, then exit
    #[arg(long)]
    pub list: bool,
}

/// Overlay command-line flags onto a base configuration.
pub fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.trim_end_matches('/').to_string();
    }
    if let Some(room) = &args.room {
        config.room_id = room.clone();
    }
    if let Some(mode) = args.preview_mode {
        config.preview_mode = mode;
    }
    if let Some(name) = &args.name {
        config.display_name = Some(name.clone());
    }
}

/// Resolve the effective configuration: the file's values (when given),
/// overridden by whatever flags were passed.
pub fn resolve_config(args: &Args) -> Result<Config, SyncError> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    apply_overrides(&mut config, args);
    Ok(config)
}
