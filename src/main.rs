mod settings;

use coil::Optimizer;
use mimalloc::MiMalloc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::settings::TrainingSettings;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Logs go to stderr so stdout carries only the resulting JSON.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if std::env::var("COIL_LOG_FORMAT").is_ok_and(|format| format == "json") {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    color_eyre::install()?;

    let settings = TrainingSettings::from_env()?;
    info!(config = ?settings.optimizer, "Starting weight search");

    let mut optimizer = Optimizer::new(settings.optimizer)?;
    let report = optimizer.run()?;
    info!(
        fitness = report.best.fitness,
        weights = %report.best.weights,
        "Weight search finished"
    );

    let output = if settings.full_report {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string_pretty(&report.best)?
    };
    println!("{output}");
    Ok(())
}
