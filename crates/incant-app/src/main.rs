//! incant interactive REPL.
//!
//! Drives the test-drive demo catalog through a rustyline editor with tab
//! completion. Pass a TOML config path as the first argument or in
//! `INCANT_CONFIG`.

mod editor;
mod test_drive;

use anyhow::Result;

use editor::EditorSource;
use incant_terminal::Session;
use incant_types::ReplConfig;
use test_drive::TestDrive;

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("INCANT_CONFIG").ok());
    let config = match &config_path {
        Some(path) => ReplConfig::load(path)?,
        None => ReplConfig::default(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter.as_str()),
    )
    .init();
    log::info!(
        "Starting incant (config: {})",
        config_path.as_deref().unwrap_or("defaults")
    );

    let registry = test_drive::registry()?;
    let source = EditorSource::new(registry.catalog(), &config)?;
    let mut session =
        Session::new(registry, TestDrive::default(), source, std::io::stdout()).with_config(config);
    session.run()?;

    log::info!("Session ended");
    Ok(())
}
