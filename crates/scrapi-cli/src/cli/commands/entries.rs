//! Read-side commands for registered entries.

use anyhow::Result;
use ciborium::Value;
use scrapi_client::HeaderMap;

use super::super::args::{ReceiptArgs, ServiceArgs, StatementArgs};
use super::{connect, write_output};

pub async fn cmd_receipt(service: &ServiceArgs, args: ReceiptArgs) -> Result<i32> {
    let scrapi = connect(service)?;
    let receipt = scrapi.resolve_receipt(&args.entry_id).await?;

    write_output(&args.out, &receipt)?;
    eprintln!(
        "✅ Receipt ({} bytes) written to: {}",
        receipt.len(),
        args.out.display()
    );

    Ok(0)
}

pub async fn cmd_statement(service: &ServiceArgs, args: StatementArgs) -> Result<i32> {
    let scrapi = connect(service)?;
    let statement = scrapi.resolve_signed_statement(&args.entry_id).await?;

    println!("protected:");
    print_headers(&statement.protected_headers);
    println!("unprotected:");
    print_headers(&statement.unprotected_headers);
    match &statement.payload {
        Some(payload) => println!("payload: {}", hex::encode(payload)),
        None => println!("payload: (detached)"),
    }

    if let Some(out) = &args.out {
        write_output(out, &statement.encoded)?;
        eprintln!("✅ Statement written to: {}", out.display());
    }

    Ok(0)
}

fn print_headers(headers: &HeaderMap) {
    for (label, value) in headers {
        println!("  {}: {}", render(label), render(value));
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::Integer(i) => i128::from(*i).to_string(),
        Value::Text(s) => format!("{:?}", s),
        Value::Bytes(b) => format!("h'{}'", hex::encode(b)),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Map(entries) => {
            let entries: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", render(k), render(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        Value::Tag(tag, inner) => format!("{}({})", tag, render(inner)),
        other => format!("{:?}", other),
    }
}
