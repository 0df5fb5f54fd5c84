//! Output formatting utilities

use chrono::Local;
use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::helpers::{first_line, styled_status, truncate_str};
use crate::cli::OutputFormat;
use crate::core::CaseSummary;
use crate::entities::case::Case;

/// Determine the effective output format based on context
pub fn effective_format(format: OutputFormat, is_list: bool) -> OutputFormat {
    match format {
        OutputFormat::Auto => {
            if is_list {
                OutputFormat::Table
            } else {
                OutputFormat::Auto
            }
        }
        other => other,
    }
}

#[derive(Tabled)]
struct CaseRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "SUBMITTED")]
    submitted: String,
    #[tabled(rename = "TYPE")]
    incident_type: String,
    #[tabled(rename = "LOCATION")]
    location: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "HANDLED BY")]
    handled_by: String,
}

impl From<&Case> for CaseRow {
    fn from(case: &Case) -> Self {
        Self {
            id: case.case_id.to_string(),
            submitted: case
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            incident_type: case.incident_type.to_string(),
            location: truncate_str(first_line(&case.location), 28),
            status: case.status.as_label().to_string(),
            handled_by: truncate_str(&case.handled_by, 20),
        }
    }
}

fn write_csv(cases: &[Case]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    writer
        .write_record([
            "id",
            "submitted",
            "reporter",
            "type",
            "location",
            "status",
            "handled_by",
        ])
        .into_diagnostic()?;
    for case in cases {
        writer
            .write_record([
                case.case_id.to_string(),
                case.created_at.to_rfc3339(),
                case.reporter_name.clone(),
                case.incident_type.to_string(),
                case.location.clone(),
                case.status.as_label().to_string(),
                case.handled_by.clone(),
            ])
            .into_diagnostic()?;
    }
    writer.flush().into_diagnostic()?;
    Ok(())
}

/// Print a list of cases in the requested format
pub fn print_case_list(cases: &[Case], format: OutputFormat) -> Result<()> {
    match effective_format(format, true) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(cases).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&cases).into_diagnostic()?);
        }
        OutputFormat::Csv => write_csv(cases)?,
        OutputFormat::Id => {
            for case in cases {
                println!("{}", case.case_id);
            }
        }
        OutputFormat::Table | OutputFormat::Auto => {
            if cases.is_empty() {
                println!("No cases found.");
                return Ok(());
            }
            let rows: Vec<CaseRow> = cases.iter().map(CaseRow::from).collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{}", table);
            println!();
            println!("{} case(s) found", style(cases.len()).cyan());
        }
    }
    Ok(())
}

/// Print one case in the requested format
pub fn print_case(case: &Case, format: OutputFormat) -> Result<()> {
    match effective_format(format, false) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(case).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(case).into_diagnostic()?);
        }
        OutputFormat::Csv => write_csv(std::slice::from_ref(case))?,
        OutputFormat::Id => println!("{}", case.case_id),
        OutputFormat::Table | OutputFormat::Auto => print_case_detail(case),
    }
    Ok(())
}

fn field(label: &str, value: &str) {
    let shown = if value.trim().is_empty() { "-" } else { value };
    println!("{:<20} {}", style(label).bold(), shown);
}

fn print_case_detail(case: &Case) {
    println!(
        "{} {}",
        style(case.case_id.as_str()).cyan().bold(),
        styled_status(case.status)
    );
    println!("{}", "-".repeat(60));
    field(
        "Submitted",
        &case
            .created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
    );
    field("Reporter", &case.reporter_name);
    field("Incident type", &case.incident_type.to_string());
    field("Location", &case.location);
    println!();
    println!("{}", style("Details").bold());
    println!("{}", case.details);
    println!();

    let findings = &case.findings;
    println!("{}", style("Findings").bold());
    field("  Victim", &findings.victim);
    field("  Accused", &findings.accused);
    field("  Witnesses", &findings.witnesses);
    field("  Staff investigator", &findings.staff_investigator);
    field("  Peer investigator", &findings.peer_investigator);
    field("  Action taken", &findings.statement);
    println!();
    field("Handled by", &case.handled_by);
    field(
        "Evidence",
        case.evidence.as_ref().map(|e| e.as_str()).unwrap_or_default(),
    );
    for (key, value) in &case.extra {
        field(key, value);
    }

    println!();
    println!("{}", style("Audit trail").bold());
    for (i, entry) in case.audit_trail.iter().enumerate() {
        println!(
            "  {:>2}. {}  {}  {}",
            i + 1,
            style(
                entry
                    .timestamp
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
            )
            .dim(),
            style(&entry.actor).yellow(),
            entry.note
        );
    }
}

/// Print dashboard counts
pub fn print_summary(summary: &CaseSummary, format: OutputFormat) -> Result<()> {
    match effective_format(format, true) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(summary).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", summary.total),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            writer.write_record(["group", "key", "count"]).into_diagnostic()?;
            for (status, count) in &summary.by_status {
                writer
                    .write_record([
                        "status".to_string(),
                        status.as_label().to_string(),
                        count.to_string(),
                    ])
                    .into_diagnostic()?;
            }
            for (incident_type, count) in &summary.by_type {
                writer
                    .write_record([
                        "type".to_string(),
                        incident_type.to_string(),
                        count.to_string(),
                    ])
                    .into_diagnostic()?;
            }
            writer.flush().into_diagnostic()?;
        }
        OutputFormat::Table | OutputFormat::Auto => {
            println!("{} {}", style("Total cases:").bold(), style(summary.total).cyan());
            println!();
            for (status, count) in &summary.by_status {
                println!("  {:<14} {:>5}", styled_status(*status), count);
            }
            if !summary.by_type.is_empty() {
                println!();
                for (incident_type, count) in &summary.by_type {
                    println!("  {:<14} {:>5}", incident_type.to_string(), count);
                }
            }
            if summary.unreadable > 0 {
                println!();
                println!(
                    "{} {} row(s) could not be read",
                    style("!").yellow(),
                    summary.unreadable
                );
            }
        }
    }
    Ok(())
}
