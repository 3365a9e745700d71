use colored::Colorize;
use serde::Serialize;
use staffio_core::{Client, Scope, Staff};
use staffio_ldap::FanOutReport;
use tabled::builder::Builder;
use tabled::settings::Style;
use time::format_description::well_known::Rfc3339;

use crate::cli::OutputFormat;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn timestamp(at: time::OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}

pub fn print_clients(clients: &[Client], total: u64, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(clients);
    }
    if clients.is_empty() {
        println!("No clients found.");
        return Ok(());
    }
    let mut builder = Builder::default();
    builder.push_record(["ID", "Code", "Name", "Redirect URI", "Scopes", "Created"]);
    for client in clients {
        builder.push_record([
            client.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
            client.code.clone(),
            client.name.clone(),
            client.redirect_uri.clone(),
            client.allowed_scopes.join(" "),
            timestamp(client.created_at),
        ]);
    }
    println!("{}", builder.build().with(Style::rounded()));
    println!("Total: {total}");
    Ok(())
}

pub fn print_client(client: &Client, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(client);
    }
    let id = client.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into());
    println!("{} {}", "Client:".cyan(), client.code.cyan());
    println!("  id:             {id}");
    println!("  name:           {}", client.name);
    println!("  redirect_uri:   {}", client.redirect_uri);
    println!("  grant_types:    {}", client.allowed_grant_types.join(" "));
    println!("  response_types: {}", client.allowed_response_types.join(" "));
    println!("  scopes:         {}", client.allowed_scopes.join(" "));
    println!("  created:        {}", timestamp(client.created_at));
    Ok(())
}

pub fn print_scopes(scopes: &[Scope], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(scopes);
    }
    let mut builder = Builder::default();
    builder.push_record(["Name", "Label", "Default", "Description"]);
    for scope in scopes {
        builder.push_record([
            scope.name.clone(),
            scope.label.clone(),
            (if scope.is_default { "yes" } else { "" }).to_string(),
            scope.description.clone(),
        ]);
    }
    println!("{}", builder.build().with(Style::rounded()));
    Ok(())
}

pub fn print_staff(staff: &Staff, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(staff);
    }
    println!("{} {}", "Staff:".cyan(), staff.uid.cyan());
    if let Some(dn) = &staff.dn {
        println!("  dn:              {dn}");
    }
    println!("  name:            {}", staff.display_name());
    println!("  email:           {}", staff.email);
    println!("  mobile:          {}", staff.mobile);
    println!("  employee_number: {}", staff.employee_number);
    println!("  employee_type:   {}", staff.employee_type);
    println!("  gender:          {}", staff.gender);
    Ok(())
}

/// Renders each source's outcome of a password fan-out.
pub fn print_report(report: &FanOutReport) {
    let mut builder = Builder::default();
    builder.push_record(["Source", "Result"]);
    for outcome in report.outcomes() {
        let result = match &outcome.result {
            Ok(()) => "ok".green().to_string(),
            Err(e) => e.to_string().red().to_string(),
        };
        builder.push_record([outcome.source_addr.clone(), result]);
    }
    println!("{}", builder.build().with(Style::rounded()));
}
