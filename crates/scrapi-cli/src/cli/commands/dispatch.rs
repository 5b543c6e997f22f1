use super::super::args::{Cli, Command};

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let service = cli.service;
    match cli.cmd {
        Command::Register(args) => super::register::cmd_register(&service, args).await,
        Command::Submit(args) => super::register::cmd_submit(&service, args).await,
        Command::Status(args) => super::status::cmd_status(&service, args).await,
        Command::Receipt(args) => super::entries::cmd_receipt(&service, args).await,
        Command::Statement(args) => super::entries::cmd_statement(&service, args).await,
        Command::Config => super::config::cmd_config(&service).await,
    }
}
