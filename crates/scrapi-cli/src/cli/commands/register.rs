//! `scrapi register` and `scrapi submit`.

use anyhow::Result;
use scrapi_client::{BackoffPolicy, RegistrationPoller};
use std::time::Duration;

use super::super::args::{RegisterArgs, ServiceArgs, SubmitArgs};
use super::{connect, read_statement, write_output};

pub async fn cmd_register(service: &ServiceArgs, args: RegisterArgs) -> Result<i32> {
    let statement = read_statement(&args.file)?;
    let scrapi = connect(service)?;

    let poller = RegistrationPoller::new(&scrapi)
        .with_policy(BackoffPolicy::fixed(Duration::from_secs(args.interval)));

    eprintln!("Registering: {}", args.file.display());

    let registration = match args.timeout {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), poller.register(&statement))
            .await
            .map_err(|_| anyhow::anyhow!("registration still pending after {}s", secs))??,
        None => poller.register(&statement).await?,
    };

    write_output(&args.receipt_out, &registration.receipt)?;

    eprintln!(
        "✅ Registered operation {} as entry {}",
        registration.operation_id, registration.entry_id
    );
    eprintln!("✅ Receipt written to: {}", args.receipt_out.display());
    println!("{}", registration.entry_id);

    Ok(0)
}

pub async fn cmd_submit(service: &ServiceArgs, args: SubmitArgs) -> Result<i32> {
    let statement = read_statement(&args.file)?;
    let scrapi = connect(service)?;

    let operation_id = scrapi.register_signed_statement(&statement).await?;
    println!("{}", operation_id);

    Ok(0)
}
