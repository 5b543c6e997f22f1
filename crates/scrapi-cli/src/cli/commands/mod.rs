pub mod config;
pub mod dispatch;
pub mod entries;
pub mod register;
pub mod status;

use anyhow::{Context, Result};
use scrapi_client::Scrapi;
use std::path::Path;

use super::args::ServiceArgs;

pub use dispatch::dispatch;

pub(crate) fn connect(service: &ServiceArgs) -> Result<Scrapi> {
    let scrapi = Scrapi::new(&service.engine, service.engine_config())?;
    tracing::debug!(engine = %scrapi, "connected");
    Ok(scrapi)
}

pub(crate) fn read_statement(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read statement: {}", path.display()))
}

pub(crate) fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write output file: {}", path.display()))
}
