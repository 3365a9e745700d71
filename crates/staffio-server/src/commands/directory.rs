use anyhow::Result;
use colored::Colorize;
use staffio_core::prelude::*;
use staffio_ldap::FanOutReport;

use crate::cli::{
    AuthenticateArgs, OutputFormat, PasswordChangeArgs, PasswordResetArgs, StaffArgs,
};
use crate::config::AppConfig;
use crate::output::{print_report, print_staff, print_success};
use crate::services;

/// Prints every source's outcome, then applies the configured policy.
fn settle(report: &FanOutReport, config: &AppConfig, what: &str, uid: &str) -> Result<()> {
    print_report(report);
    report.resolve(config.directory.policy)?;
    print_success(&format!("{what} for {}", uid.cyan()));
    Ok(())
}

pub async fn password_change(config: &AppConfig, args: &PasswordChangeArgs) -> Result<()> {
    let store = services::directory_store(config);
    let report = store
        .password_change_report(&args.uid, &args.old_password, &args.new_password)
        .await;
    store.close().await;
    settle(&report, config, "Password changed", &args.uid)
}

pub async fn password_reset(config: &AppConfig, args: &PasswordResetArgs) -> Result<()> {
    let store = services::directory_store(config);
    let report = store
        .password_reset_report(&args.uid, &args.new_password)
        .await;
    store.close().await;
    settle(&report, config, "Password reset", &args.uid)
}

pub async fn authenticate(
    config: &AppConfig,
    args: &AuthenticateArgs,
    format: OutputFormat,
) -> Result<()> {
    let store = services::directory_store(config);
    let result = store.authenticate(&args.uid, &args.password).await;
    store.close().await;
    let staff = result?;
    print_success(&format!("Authenticated {}", staff.uid.cyan()));
    print_staff(&staff, format)
}

pub async fn staff(config: &AppConfig, args: &StaffArgs, format: OutputFormat) -> Result<()> {
    let store = services::directory_store(config);
    let result = if args.dn {
        store.get_by_dn(&args.key).await
    } else {
        store.get(&args.key).await
    };
    store.close().await;
    print_staff(&result?, format)
}
