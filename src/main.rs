use batch_ocr::batch::{BatchPlan, Orchestrator, RunSummary, ShutdownSignal};
use batch_ocr::cli::Args;
use batch_ocr::config::Config;
use batch_ocr::engines;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let summary_json = args.summary_json;
    let config = Config::from(args);

    match run(config).await {
        Ok(summary) => {
            if summary_json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{}", json),
                    Err(e) => tracing::error!(error = %e, "Failed to serialize summary"),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> anyhow::Result<RunSummary> {
    tracing::info!("Starting batch-ocr v{}", env!("CARGO_PKG_VERSION"));
    config.validate()?;

    let plan = BatchPlan::prepare(&config.input_dir, &config.output_dir)?;
    tracing::info!(
        input = %plan.input_dir.display(),
        output = %plan.output_dir.display(),
        images = plan.len(),
        "Scanned input directory"
    );

    // Engines may download models, so only start one when there is work
    if plan.is_empty() {
        tracing::warn!(dir = %plan.input_dir.display(), "No matching image files found");
        return Ok(RunSummary::default());
    }

    let recognizer = engines::create_engine(&config)?;

    let shutdown = ShutdownSignal::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing running images, scheduling no more");
            ctrl_c.trigger();
        }
    });

    let orchestrator = Orchestrator::new(&config, recognizer)?.with_shutdown(shutdown);
    Ok(orchestrator.execute(plan).await)
}
