use anyhow::{Context, Result};
use colored::Colorize;
use staffio_core::prelude::*;
use staffio_ldap::{BindKind, DirectorySource};
use staffio_postgres::{PgCredentialStore, migrations};

use crate::config::AppConfig;
use crate::output::{print_error, print_success, print_warning};
use crate::services;

pub async fn migrate(config: &AppConfig) -> Result<()> {
    let gateway = services::gateway(config).await?;
    gateway.migrate().await.context("migration failed")?;
    print_success(&format!(
        "Schema up to date ({} embedded migrations)",
        migrations::embedded_count()
    ));
    gateway.close().await;
    Ok(())
}

/// Pings the database and binds as the administrative identity at every
/// directory source. Fails if any check fails.
pub async fn check(config: &AppConfig) -> Result<()> {
    let mut failed = 0usize;

    match services::gateway(config).await {
        Ok(gateway) => {
            match gateway.ping().await {
                Ok(()) => {
                    print_success("Database reachable");
                    let store = PgCredentialStore::new(gateway.clone());
                    match store.rebuild_refresh_index().await {
                        Ok(count) => print_success(&format!("Refresh index: {count} entries")),
                        Err(e) => {
                            failed += 1;
                            print_error(&format!("Refresh index: {e}"));
                        }
                    }
                }
                Err(e) => {
                    failed += 1;
                    print_error(&format!("Database: {e}"));
                }
            }
            gateway.close().await;
        }
        Err(e) => {
            failed += 1;
            print_error(&format!("Database: {e:#}"));
        }
    }

    for source_config in &config.directory.sources {
        let source = DirectorySource::ldap(source_config.clone());
        if source_config.bind_dn.is_empty() {
            print_warning(&format!(
                "{}: no bind_dn configured, skipping admin bind",
                source.addr()
            ));
            continue;
        }
        match source
            .bind(
                &source_config.bind_dn,
                &source_config.bind_password,
                BindKind::Admin,
            )
            .await
        {
            Ok(()) => print_success(&format!("Directory {} reachable", source.addr().cyan())),
            Err(e) => {
                failed += 1;
                print_error(&format!("Directory: {e}"));
            }
        }
        source.close().await;
    }

    if failed > 0 {
        anyhow::bail!("{failed} check(s) failed");
    }
    Ok(())
}

pub async fn purge(config: &AppConfig) -> Result<()> {
    let store = services::credential_store(config).await?;
    let report = store.purge_expired().await?;
    print_success(&format!(
        "Purged {} authorization codes, {} access tokens, {} refresh entries",
        report.authorize_codes, report.access_tokens, report.refresh_entries
    ));
    store.gateway().close().await;
    Ok(())
}

pub async fn scopes(config: &AppConfig, format: crate::cli::OutputFormat) -> Result<()> {
    let store = services::credential_store(config).await?;
    let scopes = store.load_scopes().await?;
    crate::output::print_scopes(&scopes, format)?;
    store.gateway().close().await;
    Ok(())
}
