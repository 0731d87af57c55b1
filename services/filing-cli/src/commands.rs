use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{Local, Utc};
use rerx_filing::config::FilingConfig;
use rerx_filing::error::AppError;
use rerx_filing::filing::document::DocumentBuilder;
use rerx_filing::filing::submission::{FilingError, FilingOutcome, FilingService, PollOutcome};
use rerx_filing::filing::{verify_structure, StructureReport};
use rerx_filing::report::{ReportId, TransactionReport};
use tracing::warn;

use crate::cli::{DryRunArgs, FileArgs, PollArgs, ValidateArgs};
use crate::infra::{
    select_gateway, JsonFileReceiptSink, JsonFileSubmissionRepository, ReportLock,
};

pub(crate) fn run_file(args: FileArgs, config: FilingConfig) -> Result<(), AppError> {
    let report = load_report(&args.report)?;
    let _lock =
        ReportLock::acquire(&args.store, &report.report_id).map_err(FilingError::from)?;

    let service = build_service(&args.store, config)?;
    let outcome = service.file(&report, Utc::now())?;
    render_filing_outcome(&report.report_id, &outcome);
    Ok(())
}

pub(crate) fn run_poll(args: PollArgs, config: FilingConfig) -> Result<(), AppError> {
    let repository = JsonFileSubmissionRepository::open(&args.store).map_err(FilingError::from)?;
    let service = build_service(&args.store, config)?;
    let now = Utc::now();

    let targets: Vec<ReportId> = match &args.report_id {
        Some(id) => vec![ReportId(id.clone())],
        None => {
            use rerx_filing::filing::submission::SubmissionRepository as _;
            repository
                .due_for_poll(now, args.limit)
                .map_err(FilingError::from)?
                .into_iter()
                .map(|submission| submission.report_id)
                .collect()
        }
    };

    if targets.is_empty() {
        println!("No submissions are due for polling.");
        return Ok(());
    }

    for report_id in targets {
        let lock = match ReportLock::acquire(&args.store, &report_id) {
            Ok(lock) => lock,
            Err(err) => {
                warn!(%report_id, error = %err, "skipping locked submission");
                continue;
            }
        };

        match service.poll(&report_id, now) {
            Ok(outcome) => render_poll_outcome(&report_id, &outcome),
            Err(err) => println!("- {report_id}: poll failed: {err}"),
        }
        drop(lock);
    }

    Ok(())
}

pub(crate) fn run_dry_run(args: DryRunArgs, config: FilingConfig) -> Result<(), AppError> {
    let report = load_report(&args.report)?;
    let today = Local::now().date_naive();
    let filed_on = args.filed_on.unwrap_or(today);

    let builder = DocumentBuilder::new(config);
    let built = builder.build(&report, 1, filed_on, today)?;

    println!("Dry run for report {}", report.report_id);
    println!("Filing date: {filed_on}");
    println!(
        "Parties: {} transferee(s), {} transferor(s), {} associated person(s)",
        built.summary.transferees, built.summary.transferors, built.summary.associated_persons
    );
    println!(
        "Payments: {} detail(s) totaling ${}",
        built.summary.payment_details, built.summary.total_amount
    );
    println!("Sequence numbers assigned: {}", built.summary.sequence_count);

    match &args.output {
        Some(path) => {
            fs::write(path, built.xml.as_bytes())?;
            println!("Document written to {}", path.display());
        }
        None => {
            println!("\n{}", built.xml);
        }
    }

    Ok(())
}

pub(crate) fn run_validate(args: ValidateArgs, _config: FilingConfig) -> Result<(), AppError> {
    let xml = fs::read_to_string(&args.document)?;
    let report = verify_structure(&xml)?;
    render_structure_report(&args.document, &report);

    if !report.is_compliant() {
        std::process::exit(1);
    }
    Ok(())
}

pub(crate) fn run_check_connection(config: FilingConfig) -> Result<(), AppError> {
    let gateway = select_gateway(&config);
    let response_dir = config.transport.response_dir.clone();
    let names = gateway.list(&response_dir).map_err(FilingError::from)?;
    println!(
        "Transport OK: {} file(s) visible in {response_dir}",
        names.len()
    );
    Ok(())
}

fn build_service(
    store: &Path,
    config: FilingConfig,
) -> Result<FilingService<JsonFileSubmissionRepository, JsonFileReceiptSink>, AppError> {
    let repository = Arc::new(JsonFileSubmissionRepository::open(store).map_err(FilingError::from)?);
    let sink = Arc::new(JsonFileReceiptSink::open(store));
    let gateway = select_gateway(&config);
    Ok(FilingService::new(repository, sink, gateway, config))
}

fn load_report(path: &Path) -> Result<TransactionReport, AppError> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn render_filing_outcome(report_id: &ReportId, outcome: &FilingOutcome) {
    match outcome {
        FilingOutcome::AlreadyFiled { status } => {
            println!("Report {report_id}: already {}; nothing re-sent", status.label());
        }
        FilingOutcome::Submitted { filename } => {
            println!("Report {report_id}: submitted as {filename}");
        }
        FilingOutcome::Reconciled { filename } => {
            println!(
                "Report {report_id}: earlier upload of {filename} confirmed delivered; polling resumes"
            );
        }
        FilingOutcome::PreflightRejected { reason } => {
            println!("Report {report_id}: preflight failed: {reason}");
        }
        FilingOutcome::UploadFailed { reason, ambiguous } => {
            if *ambiguous {
                println!(
                    "Report {report_id}: upload outcome unknown: {reason}; rerun `file` to reconcile"
                );
            } else {
                println!("Report {report_id}: upload failed: {reason}; rerun `file` to retry");
            }
        }
    }
}

fn render_poll_outcome(report_id: &ReportId, outcome: &PollOutcome) {
    match outcome {
        PollOutcome::NotPollable { status } => {
            println!("- {report_id}: {} (not pollable)", status.label());
        }
        PollOutcome::NoResponseYet { next_poll_at } => {
            println!("- {report_id}: no response yet, next poll at {next_poll_at}");
        }
        PollOutcome::Accepted { receipt } => {
            println!("- {report_id}: accepted, receipt {receipt}");
        }
        PollOutcome::Rejected { errors } => {
            println!("- {report_id}: rejected ({})", errors.join("; "));
        }
        PollOutcome::NeedsReview { reason } => {
            println!("- {report_id}: needs review: {reason}");
        }
    }
}

fn render_structure_report(path: &Path, report: &StructureReport) {
    println!("Checklist for {}", path.display());
    println!(
        "Form type: {}",
        report.form_type_code.as_deref().unwrap_or("(missing)")
    );
    println!("Activities: {}", report.activities);
    println!("Sequence numbers: {}", report.sequence_numbers);

    if report.party_type_counts.is_empty() {
        println!("Parties: none found");
    } else {
        println!("Parties by type code:");
        for (code, count) in &report.party_type_counts {
            println!("- {code}: {count}");
        }
    }

    if report.is_compliant() {
        println!("Result: PASS");
    } else {
        println!("Result: FAIL");
        for violation in &report.violations {
            println!("- {violation}");
        }
    }
}
