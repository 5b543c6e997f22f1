use anyhow::Result;

use super::super::args::ServiceArgs;
use super::connect;

pub async fn cmd_config(service: &ServiceArgs) -> Result<i32> {
    let scrapi = connect(service)?;
    let configuration = scrapi.get_configuration().await?;

    println!("{}", serde_json::to_string_pretty(&configuration)?);
    Ok(0)
}
