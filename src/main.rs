//! sensorchain demo - Main Entry Point
//!
//! Runs a small temperature alarm chain on a streaming worker:
//! Celsius readings are converted to Fahrenheit and every reading above the
//! threshold lands in the alarm collector.

use anyhow::Context;
use sensorchain::config::EngineConfig;
use sensorchain::process::processes::{
    CollectorProcess, CompareProcess, DataSourceProcess, UnitConversionProcess,
};
use sensorchain::{quantity_schema, ChainBuilder, Record};
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const ALARM_THRESHOLD_F: f64 = 100.0;

fn init_logging(config: &EngineConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "sensorchain.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    guard
}

fn main() -> anyhow::Result<()> {
    let config = EngineConfig::load_or_default(EngineConfig::default_path());
    // Flushes the file layer on exit.
    let _guard = init_logging(&config);

    tracing::info!("Starting sensorchain demo");

    let mut chain = ChainBuilder::with_config("thermal", config)
        .component("sensor", DataSourceProcess::new(quantity_schema("temperature")))
        .component("to_fahrenheit", UnitConversionProcess::between("Cel", "[degF]"))
        .component("threshold", CompareProcess::new().with_operator(">"))
        .component("alarms", CollectorProcess::new(quantity_schema("temperature")))
        .connect("sensor/value", "to_fahrenheit/value")
        .connect("to_fahrenheit/value", "threshold/value")
        .connect("threshold/outputIfTrue", "alarms/value")
        .constant("threshold/threshold", Record::quantity(ALARM_THRESHOLD_F))
        .build()
        .context("building demo chain")?;

    let feed = chain.feed("sensor").context("sensor has no feed")?;
    let alarms = chain.collector("alarms").context("alarms has no collector")?;
    let verdicts = chain
        .component_output("threshold/result")
        .context("threshold has no result port")?
        .subscribe();

    let faults = chain.start_with_channel()?;

    for celsius in [21.5, 36.6, 41.0, 38.2, 55.0] {
        feed.push(Record::quantity(celsius))?;
        match verdicts.recv_timeout(Duration::from_secs(1)) {
            Some(event) => tracing::info!(
                "{:.1} Cel -> alarm: {}",
                celsius,
                event.record.as_bool().unwrap_or(false)
            ),
            None => tracing::warn!("No verdict for {:.1} Cel", celsius),
        }
    }

    chain.stop()?;

    for fault in faults.try_iter() {
        tracing::warn!("Fault: {}", fault);
    }
    for record in alarms.records() {
        println!("alarm: {:.1} [degF]", record.as_f64().unwrap_or(f64::NAN));
    }

    tracing::info!("Shutting down...");
    Ok(())
}
