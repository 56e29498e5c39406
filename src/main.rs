//! u-scenario - computes a stored scenario from a JSON dataset.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use u_scenario::clock::SystemClock;
use u_scenario::models::ScenarioId;
use u_scenario::store::InMemoryStore;
use u_scenario::{EngineConfig, ScenarioEngine};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "u_scenario=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(dataset_path), Some(scenario_id)) = (args.next(), args.next()) else {
        anyhow::bail!("Usage: u-scenario <dataset.json> <scenario-id>");
    };

    let raw = std::fs::read_to_string(&dataset_path)
        .with_context(|| format!("reading dataset {dataset_path}"))?;
    let store = InMemoryStore::from_json(&raw)
        .with_context(|| format!("parsing dataset {dataset_path}"))?;

    let engine = ScenarioEngine::from_store(Arc::new(store), Arc::new(SystemClock::new()))
        .with_config(EngineConfig::from_env());
    let outcome = engine
        .compute_scenario(&ScenarioId::from(scenario_id.as_str()))
        .with_context(|| format!("computing scenario {scenario_id}"))?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
