use std::path::Path;

use crate::config::{Config, resolve_api_url, save_config};

use super::render::{KeyValueRow, render_output};
use super::{Cli, ConfigCmd};

pub(super) fn run_config(
    cli: &Cli,
    path: &Path,
    cfg: &Config,
    cmd: ConfigCmd,
) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Show => render_output(
            cli,
            vec![
                KeyValueRow::new("config_file", path.display().to_string()),
                KeyValueRow::new("api_url", resolve_api_url(cli.api_url.as_deref(), cfg)),
                KeyValueRow::new(
                    "page_size",
                    cfg.page_size.map(|n| n.to_string()).unwrap_or_default(),
                ),
            ],
        ),
        ConfigCmd::SetApiUrl { url } => {
            let url = url.trim().trim_end_matches('/').to_string();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("api url must start with http:// or https://");
            }
            if cli.dry_run {
                println!("dry-run: would set api_url to {url} in {}", path.display());
                return Ok(());
            }
            let mut next = cfg.clone();
            next.api_url = Some(url.clone());
            save_config(path, &next)?;
            tracing::info!(path = %path.display(), "config saved");
            println!("api_url set to {url}");
            Ok(())
        }
        ConfigCmd::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}
