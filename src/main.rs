use log::{error, info, warn};
use std::collections::HashMap;
use time::OffsetDateTime;
use tokio::time::{sleep, Duration};

use envsensors::bus::LinuxTransport;
use envsensors::config::PollerConfig;
use envsensors::delay::StdDelay;
use envsensors::models::Measurement;
use envsensors::sensors::{self, Sensor};
use envsensors::utils::{calculate_averages, duration_to_seconds, format_datetime};

type SensorPool = Vec<(String, Box<dyn Sensor + Send>)>;

/// Open every configured sensor, skipping the ones that fail to come up
fn open_sensors(config: &PollerConfig) -> SensorPool {
    let mut pool = SensorPool::new();

    for entry in &config.sensors {
        let label = entry.label();
        let transport = match LinuxTransport::open(&config.bus, entry.address) {
            Ok(transport) => transport,
            Err(e) => {
                error!("Failed to open {} on {}: {}", label, config.bus, e);
                continue;
            }
        };
        match sensors::build(entry.kind, transport, StdDelay) {
            Ok(mut sensor) => {
                if !sensor.ok() {
                    warn!("{} did not identify as a {}", label, sensor.name());
                }
                sensor.set_sea_level_pressure(config.sea_level_pa);
                info!("Opened {} (state {:?})", label, sensor.state());
                pool.push((label, sensor));
            }
            Err(e) => error!("Failed to initialise {}: {}", label, e),
        }
    }

    pool
}

/// Read every sensor once; bus transfers and settling delays block
fn poll_sensors(pool: &mut SensorPool) -> Vec<(String, Measurement)> {
    tokio::task::block_in_place(|| {
        pool.iter_mut()
            .map(|(label, sensor)| (label.clone(), sensor.measure()))
            .collect()
    })
}

async fn main_loop(
    config: &PollerConfig,
    pool: &mut SensorPool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting sensor polling service");

    loop {
        let mut measurements: HashMap<String, Vec<Measurement>> = HashMap::new();
        let start_time = OffsetDateTime::now_utc();

        info!(
            "Starting collection interval at: {}",
            format_datetime(&start_time)
        );

        // Collect data for the collection interval
        loop {
            let poll_start = OffsetDateTime::now_utc();
            let elapsed = duration_to_seconds(poll_start - start_time);
            if elapsed >= config.collection_interval_secs {
                break;
            }

            for (label, measurement) in poll_sensors(pool) {
                measurements.entry(label).or_default().push(measurement);
            }

            // Calculate remaining time in interval
            let now = OffsetDateTime::now_utc();
            let time_remaining = config
                .collection_interval_secs
                .saturating_sub(duration_to_seconds(now - start_time));
            if time_remaining == 0 {
                break;
            }

            // Wait until next poll time, but not longer than what's remaining
            let sleep_time = std::cmp::min(
                config
                    .poll_interval_secs
                    .saturating_sub(duration_to_seconds(now - poll_start)),
                time_remaining,
            );
            if sleep_time > 0 {
                sleep(Duration::from_secs(sleep_time)).await;
            }
        }

        let end_time = OffsetDateTime::now_utc();
        info!(
            "Collection interval complete at: {}",
            format_datetime(&end_time)
        );

        let averages = calculate_averages(&measurements);

        // Print summary
        for avg_data in averages.values() {
            info!(
                "Summary for {} at {}:",
                avg_data.name,
                format_datetime(&avg_data.time)
            );
            for (quantity, value) in &avg_data.values {
                info!("  Average {}: {:.2} {}", quantity, value, quantity.unit());
            }
            info!(
                "  Based on {} samples ({} failed)",
                avg_data.samples, avg_data.failed_samples
            );
        }

        // Warning if no data collected
        if averages.is_empty() {
            warn!("No data collected during this interval!");
        }

        // Wait until next interval should start
        let total_elapsed = duration_to_seconds(OffsetDateTime::now_utc() - start_time);
        if total_elapsed < config.collection_interval_secs {
            let wait_time = config.collection_interval_secs - total_elapsed;
            info!(
                "Waiting {} seconds until next collection interval",
                wait_time
            );
            sleep(Duration::from_secs(wait_time)).await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match PollerConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    let mut pool = open_sensors(&config);
    if pool.is_empty() {
        return Err("None of the configured sensors could be opened".into());
    }

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(());
            }
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });

    // Run main loop or wait for shutdown signal
    tokio::select! {
        result = main_loop(&config, &mut pool) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    for (label, sensor) in pool.iter_mut() {
        sensor.close();
        info!("Closed {}", label);
    }

    Ok(())
}
