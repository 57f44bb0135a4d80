//! scholaraid-sim: runs the confidential application lifecycle end to end
//!
//! Wires an `ApplicationController` to the in-memory ledger, encryption
//! provider and decryption verifier, then connects, submits every configured
//! application, decrypts and verifies each one and reports eligibility.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use config::Config;
use scholaraid_core::{
    ApplicationController, ContractAddress, Identity, InMemoryLedger, MockDecryptionVerifier,
    MockEncryptionProvider, SubmitRequest,
};

#[derive(Parser)]
#[command(name = "scholaraid-sim")]
#[command(about = "Run a confidential scholarship lifecycle against in-memory collaborators")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "scholaraid.toml")]
    config: PathBuf,

    /// Identity address (overrides config file)
    #[arg(long, env = "SCHOLARAID_IDENTITY")]
    identity: Option<String>,

    /// Leave decryption proofs unconfirmed (overrides config file)
    #[arg(long)]
    defer_confirmation: bool,

    /// Number of activity entries to print
    #[arg(long, default_value_t = 5)]
    history: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scholaraid_core=info".parse()?)
                .add_directive("scholaraid_sim=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    info!("Starting scholaraid-sim");
    info!("Config file: {}", cli.config.display());

    let mut config = Config::load(&cli.config)?;
    if let Some(identity) = cli.identity {
        config.identity.address = identity;
    }
    if cli.defer_confirmation {
        config.ledger.defer_confirmation = true;
    }

    let ledger = Arc::new(InMemoryLedger::new(ContractAddress::new(
        config.ledger.contract_address.clone(),
    )));
    let verifier = Arc::new(MockDecryptionVerifier::new(ledger.clone()));
    verifier.set_await_confirmation(!config.ledger.defer_confirmation);

    let controller = ApplicationController::with_config(
        ledger.clone(),
        Arc::new(MockEncryptionProvider::new()),
        verifier,
        config.controller.clone(),
    );

    controller
        .connect(Identity::new(config.identity.address.clone()))
        .await?;

    if !controller.check_system_availability().await? {
        anyhow::bail!("ledger reports the system as unavailable");
    }

    let mut submitted = Vec::new();
    for seed in &config.applications {
        let request = SubmitRequest::new(seed.name.clone(), seed.income, seed.score);
        match controller.submit_application(request).await {
            Ok(app) => {
                info!(id = %app.id, name = %app.applicant_name, "Application submitted");
                submitted.push(app.id);
            }
            Err(err) => error!(name = %seed.name, error = %err, "Submission failed"),
        }
    }

    for id in &submitted {
        if let Err(err) = controller.decrypt_and_verify(id).await {
            warn!(id = %id, error = %err, "Decryption failed");
        }
    }

    println!();
    println!("{:<40} {:<12} {:>6} {:>12} {:>10}", "ID", "APPLICANT", "SCORE", "INCOME", "ELIGIBLE");
    for app in controller.snapshot().applications {
        let income = match (app.verification.clear_income(), app.locally_decrypted_income) {
            (Some(income), _) => income.to_string(),
            (None, Some(income)) => format!("{}*", income),
            (None, None) => "hidden".to_string(),
        };
        let eligible = match controller.assess(&app.id).await {
            Some(a) if a.is_authoritative() => a.eligible.to_string(),
            Some(a) => format!("{}*", a.eligible),
            None => "-".to_string(),
        };
        println!(
            "{:<40} {:<12} {:>6} {:>12} {:>10}",
            app.id, app.applicant_name, app.academic_score, income, eligible
        );
    }

    let now = chrono::Utc::now().timestamp().max(0) as u64;
    let stats = controller.stats(now).await;
    println!();
    println!(
        "{} applications, {} verified, average score {:.1}/10, {} this week",
        stats.total, stats.verified, stats.average_academic_score, stats.recent
    );
    if config.ledger.defer_confirmation {
        println!("* provisional: decryption proof not yet confirmed on the ledger");
    }

    println!();
    println!("Recent activity:");
    for entry in controller.activity(cli.history).await {
        println!("  {}", entry);
    }

    controller.disconnect().await;
    info!("Shutdown complete");
    Ok(())
}
