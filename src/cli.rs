// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Running the pipeline without a terminal UI
//! - Listing available cameras

use object_announcer::AppResult;
use object_announcer::backends::camera::list_devices;
use object_announcer::config::PipelineConfig;
use object_announcer::constants::driver::RESULT_POLL_TIMEOUT;
use object_announcer::pipelines::build_detection_pipeline;
use object_announcer::pipelines::detection::{DetectionResult, Received, Termination};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// List all available cameras
pub fn list_cameras() -> AppResult<()> {
    let devices = list_devices();

    if devices.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, (path, name)) in devices.iter().enumerate() {
        println!("  [{}] {} ({})", index, name, path);
    }

    Ok(())
}

fn log_result(result: &DetectionResult) {
    let labels = result.labels();
    info!(
        cycle = result.sequence,
        detections = result.detections.len(),
        labels = %labels,
        duration_ms = result.cycle_duration.as_millis() as u64,
        "Detection result"
    );
    if let Some(announcement) = &result.announcement {
        println!("[{}] {}", result.sequence, announcement.phrase);
    }
}

/// Run the pipeline, logging results until Ctrl+C or the source ends
pub fn run_headless(config: PipelineConfig) -> AppResult<Option<Termination>> {
    let mut pipeline = build_detection_pipeline(config)?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| format!("Failed to install Ctrl+C handler: {}", e))?;

    pipeline.start()?;
    println!("Running detection on {} (Ctrl+C to stop)", pipeline.config().camera_source);

    while pipeline.is_alive() {
        if interrupted.load(Ordering::SeqCst) {
            info!("Interrupted, stopping pipeline");
            pipeline.stop();
            break;
        }

        match pipeline.results().recv_timeout(RESULT_POLL_TIMEOUT) {
            Received::Item(result) => log_result(&result),
            Received::Timeout => {}
            Received::Closed => break,
        }
    }

    let termination = pipeline.join();

    // Whatever the worker published before stopping
    for result in pipeline.results().drain() {
        log_result(&result);
    }

    let stats = pipeline.stats();
    println!(
        "Processed {} cycles, {} announcements, {} results dropped, {} detection failures",
        stats.cycles, stats.announcements, stats.dropped, stats.detection_failures
    );

    Ok(termination)
}
