use std::time::Instant;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::commands::CommandResult;
use reqflow_core::config::{AppConfig, LoadOptions};
use reqflow_core::domain::quote_slate::{QuoteOffer, QuoteSlate};
use reqflow_core::domain::request::{RequestItem, RequestStatus};
use reqflow_core::domain::user::UserId;
use reqflow_core::workflow::ReviewAction;
use reqflow_db::workflow::NewRequestInput;
use reqflow_db::{connect_with_settings, migrations, SeedDataset, WorkflowService};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config = match timed_check(|| AppConfig::load(LoadOptions::default())) {
        Ok((elapsed_ms, config)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Pass,
                elapsed_ms,
                message: "configuration loaded and validated".to_string(),
            });
            config
        }
        Err((elapsed_ms, error)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Fail,
                elapsed_ms,
                message: error.to_string(),
            });
            checks.push(skipped("db_connectivity"));
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("workflow_round_trip"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Fail,
                elapsed_ms: 0,
                message: format!("failed to initialize async runtime: {error}"),
            });
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("workflow_round_trip"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let db_started = Instant::now();
    let db_result = runtime.block_on(async {
        connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
    });

    let pool = match db_result {
        Ok(pool) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Pass,
                elapsed_ms: db_started.elapsed().as_millis() as u64,
                message: format!("connected using `{}`", config.database.url),
            });
            pool
        }
        Err(error) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Fail,
                elapsed_ms: db_started.elapsed().as_millis() as u64,
                message: format!("failed to connect: {error}"),
            });
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("workflow_round_trip"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let migration_started = Instant::now();
    let migration_result = runtime.block_on(async { migrations::run_pending(&pool).await });
    runtime.block_on(async {
        pool.close().await;
    });

    match migration_result {
        Ok(()) => checks.push(SmokeCheck {
            name: "migration_visibility",
            status: SmokeStatus::Pass,
            elapsed_ms: migration_started.elapsed().as_millis() as u64,
            message: "migrations are visible and executable".to_string(),
        }),
        Err(error) => {
            checks.push(SmokeCheck {
                name: "migration_visibility",
                status: SmokeStatus::Fail,
                elapsed_ms: migration_started.elapsed().as_millis() as u64,
                message: format!("migration execution failed: {error}"),
            });
            checks.push(skipped("workflow_round_trip"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    }

    // Exercise the whole approval chain on a scratch in-memory database so
    // the configured database is never mutated.
    let round_trip_started = Instant::now();
    let round_trip_result = runtime.block_on(round_trip());
    checks.push(match round_trip_result {
        Ok(message) => SmokeCheck {
            name: "workflow_round_trip",
            status: SmokeStatus::Pass,
            elapsed_ms: round_trip_started.elapsed().as_millis() as u64,
            message,
        },
        Err(error) => SmokeCheck {
            name: "workflow_round_trip",
            status: SmokeStatus::Fail,
            elapsed_ms: round_trip_started.elapsed().as_millis() as u64,
            message: error,
        },
    });

    finalize_report(checks, started.elapsed().as_millis() as u64)
}

/// Submit as the seeded requester, take the quote detour at finance, and
/// approve through to the executive.
async fn round_trip() -> Result<String, String> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("scratch database connect failed: {error}"))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| format!("scratch database migration failed: {error}"))?;
    SeedDataset::load(&pool).await.map_err(|error| format!("seed load failed: {error}"))?;

    let requester = UserId(6);
    let direct_manager = UserId(5);
    let procurement = UserId(4);
    let admin_manager = UserId(3);
    let finance_manager = UserId(2);
    let executive = UserId(1);

    let service = WorkflowService::new(pool.clone());
    let id = service
        .submit_request(
            requester,
            NewRequestInput {
                title: "smoke validation order".to_string(),
                description: None,
                items: vec![RequestItem {
                    name: "widget".to_string(),
                    quantity: 3,
                    price: Some(Decimal::from(40)),
                }],
            },
        )
        .await
        .map_err(|error| format!("submit failed: {error}"))?;

    for approver in [direct_manager, procurement, admin_manager] {
        service
            .transition(id, approver, ReviewAction::Approve, None)
            .await
            .map_err(|error| format!("approval by user {approver} failed: {error}"))?;
    }

    service
        .transition(id, finance_manager, ReviewAction::RequestQuotes, None)
        .await
        .map_err(|error| format!("quote request failed: {error}"))?;

    let slate = QuoteSlate::new(vec![QuoteOffer {
        supplier: "Smoke Supplier".to_string(),
        price: Decimal::from(110),
        description: None,
        selected: true,
        attachment_ref: None,
    }]);
    service
        .submit_quotes(id, procurement, slate)
        .await
        .map_err(|error| format!("quote submission failed: {error}"))?;

    for approver in [finance_manager, executive] {
        service
            .transition(id, approver, ReviewAction::Approve, None)
            .await
            .map_err(|error| format!("approval by user {approver} failed: {error}"))?;
    }

    let detail = service
        .get_detail(id, requester)
        .await
        .map_err(|error| format!("detail lookup failed: {error}"))?;
    if detail.request.status != RequestStatus::Approved {
        return Err(format!("expected an approved request, found {:?}", detail.request.status));
    }

    pool.close().await;
    Ok(format!(
        "request {} approved after {} audited transitions",
        detail.request.id,
        detail.log.len()
    ))
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((started.elapsed().as_millis() as u64, value)),
        Err(error) => Err((started.elapsed().as_millis() as u64, error)),
    }
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
