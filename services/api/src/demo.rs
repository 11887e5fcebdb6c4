use std::time::Duration;

use chrono::NaiveDate;
use clap::Args;
use rust_decimal_macros::dec;

use crate::infra::{demo_pipeline, InMemorySnapshotStore};
use loanflow::error::AppError;
use loanflow::pipeline::domain::LoanStatus;
use loanflow::pipeline::intake::{IntakeError, LoanApplicationRequest};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Seconds to wait for the pipeline to settle before printing results
    #[arg(long, default_value_t = 5)]
    pub(crate) settle_timeout: u64,
}

/// Each demo applicant's CPF encodes its scenario: the last three digits
/// become the stub bureau score, a trailing 77 trips anti-fraud, a trailing
/// 00 fails CPF validation at intake.
const DEMO_APPLICANTS: &[(&str, &str)] = &[
    ("52998224901", "low risk, approved at the requested amount"),
    ("41663881650", "standard risk, 12% rate"),
    ("73819202450", "high risk, conditions adjusted"),
    ("96385274101", "below the bureau floor, rejected"),
    ("15926348777", "anti-fraud rejection"),
    ("84275196200", "irregular CPF, blocked at intake"),
];

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let (intake, store) = demo_pipeline()?;

    let mut submitted = Vec::new();
    for (cpf, description) in DEMO_APPLICANTS {
        let request = LoanApplicationRequest {
            cpf: (*cpf).to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 3, 14).expect("valid date"),
            amount_requested: dec!(5000.00),
            number_of_installments: 12,
            monthly_income: dec!(3000.00),
        };

        match intake.submit(request).await {
            Ok(record) => {
                println!(
                    "submitted {cpf} ({description}) as {}",
                    record.application_id
                );
                submitted.push(record.application_id);
            }
            Err(IntakeError::Validation(message)) => {
                println!("blocked   {cpf} ({description}): {message}");
            }
            Err(other) => return Err(other.into()),
        }
    }

    wait_until_settled(&store, &submitted, Duration::from_secs(args.settle_timeout)).await;

    println!();
    println!("final application records:");
    for application_id in &submitted {
        let record = store_record(&store, application_id)?;
        let terms = match (record.amount_approved, record.installment_value) {
            (Some(amount), Some(installment)) => format!(
                ", approved {amount} in {} x {installment}",
                record
                    .approved_installments
                    .map(|count| count.to_string())
                    .unwrap_or_else(|| "?".to_string())
            ),
            _ => String::new(),
        };
        let reason = record
            .rejection_reason
            .as_deref()
            .map(|text| format!(", reason: {text}"))
            .unwrap_or_default();
        println!(
            "  {} -> {}{terms}{reason}",
            application_id,
            record.status.label()
        );
    }

    Ok(())
}

fn store_record(
    store: &InMemorySnapshotStore,
    application_id: &loanflow::pipeline::domain::ApplicationId,
) -> Result<loanflow::pipeline::intake::LoanApplicationRecord, AppError> {
    use loanflow::pipeline::intake::SnapshotStore;
    store
        .fetch(application_id)
        .map_err(|err| AppError::Intake(err.into()))?
        .ok_or_else(|| AppError::Intake(IntakeError::NotFound(application_id.clone())))
}

async fn wait_until_settled(
    store: &InMemorySnapshotStore,
    ids: &[loanflow::pipeline::domain::ApplicationId],
    timeout: Duration,
) {
    use loanflow::pipeline::intake::SnapshotStore;
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        let pending = ids.iter().any(|id| {
            store
                .fetch(id)
                .ok()
                .flatten()
                .map(|record| record.status == LoanStatus::PendingAssessment)
                .unwrap_or(true)
        });
        if !pending {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
