use anyhow::Result;

use super::super::args::{ServiceArgs, StatusArgs};
use super::connect;

pub async fn cmd_status(service: &ServiceArgs, args: StatusArgs) -> Result<i32> {
    let scrapi = connect(service)?;
    let record = scrapi.check_registration(&args.operation_id).await?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(0)
}
