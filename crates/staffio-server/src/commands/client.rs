use anyhow::Result;
use colored::Colorize;
use staffio_core::prelude::*;

use crate::cli::{ClientAddArgs, ClientListArgs, OutputFormat};
use crate::config::AppConfig;
use crate::output::{print_client, print_clients, print_success};
use crate::services;

/// `-created` sorts descending, anything else ascending.
pub fn parse_sort(raw: &str) -> (String, SortOrder) {
    match raw.strip_prefix('-') {
        Some(field) => (field.to_string(), SortOrder::Descending),
        None => (
            raw.strip_prefix('+').unwrap_or(raw).to_string(),
            SortOrder::Ascending,
        ),
    }
}

pub async fn list(config: &AppConfig, args: &ClientListArgs, format: OutputFormat) -> Result<()> {
    let store = services::credential_store(config).await?;
    let query = args
        .sort
        .iter()
        .map(|s| parse_sort(s))
        .fold(ClientQuery::new(args.limit, args.offset), |q, (field, order)| {
            q.sort_by(field, order)
        });
    let clients = store.load_clients(&query).await?;
    let total = store.count_clients().await?;
    print_clients(&clients, total, format)?;
    store.gateway().close().await;
    Ok(())
}

pub async fn show(config: &AppConfig, code: &str, format: OutputFormat) -> Result<()> {
    let store = services::credential_store(config).await?;
    let client = store.get_client_with_code(code).await?;
    print_client(&client, format)?;
    store.gateway().close().await;
    Ok(())
}

pub async fn add(config: &AppConfig, args: &ClientAddArgs, format: OutputFormat) -> Result<()> {
    let store = services::credential_store(config).await?;
    let mut client = Client::new(
        args.name.as_str(),
        args.code.as_str(),
        args.secret.as_str(),
        args.redirect_uri.as_str(),
    )
    .with_grant_types(args.grant_types.iter().cloned())
    .with_response_types(args.response_types.iter().cloned())
    .with_scopes(args.scopes.iter().cloned());
    store.save_client(&mut client).await?;
    print_success(&format!(
        "Registered client {} with id {}",
        client.code.cyan(),
        client.id.map(|id| id.to_string()).unwrap_or_default()
    ));
    if format == OutputFormat::Json {
        print_client(&client, format)?;
    }
    store.gateway().close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort() {
        assert_eq!(parse_sort("id"), ("id".into(), SortOrder::Ascending));
        assert_eq!(parse_sort("+id"), ("id".into(), SortOrder::Ascending));
        assert_eq!(
            parse_sort("-created"),
            ("created".into(), SortOrder::Descending)
        );
    }
}
