//! Subcommand implementations

use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use cyclehud_core::config::AppConfig;
use cyclehud_core::demo::DemoRide;
use cyclehud_core::ingest::{FrameFile, IngestLoop};
use cyclehud_core::transport::{FifoReadConnector, FifoWriteConnector, LineReader, LineWriter};

/// Bridge the CAN bus and the telemetry FIFOs until shutdown
#[cfg(target_os = "linux")]
pub async fn relay(config: AppConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    use std::thread;

    use cyclehud_core::bus::socketcan::SocketCanConnector;
    use cyclehud_core::bus::Notifier;
    use cyclehud_core::catalog::SignalCatalog;
    use cyclehud_core::codec::{SignalDatabase, TelemetryCodec};
    use cyclehud_core::relay::{AuxiliarySource, BusRelay};
    use tracing::warn;

    let catalog = SignalCatalog::load(&config.paths.catalog).with_context(|| {
        format!(
            "loading signal catalog {}",
            config.paths.catalog.display()
        )
    })?;
    let dictionary = SignalDatabase::load(&config.paths.dictionary).with_context(|| {
        format!(
            "loading message dictionary {}",
            config.paths.dictionary.display()
        )
    })?;
    for signal in catalog.unresolved(&dictionary) {
        warn!(signal = %signal, "Catalog entry is not in the message dictionary");
    }
    info!(
        sensors = catalog.sensors().len(),
        messages = dictionary.messages().len(),
        bus = %config.bus.interface,
        "Relay configured"
    );

    let relay = BusRelay::new(TelemetryCodec::new(dictionary), catalog)
        .with_transmit_timeout(Duration::from_millis(config.bus.transmit_timeout_ms));

    // Bus -> video FIFO
    let (telemetry_tx, telemetry_rx) = mpsc::unbounded_channel();
    let notifier = Notifier::new(
        SocketCanConnector::new(config.bus.interface.clone()),
        config.bus.reconnect,
    )
    .with_sink(relay.inbound(telemetry_tx));
    let notifier_shutdown = shutdown.clone();
    let notifier_thread = thread::Builder::new()
        .name("bus-notifier".into())
        .spawn(move || notifier.run(&notifier_shutdown))
        .context("spawning bus notifier")?;

    let mut writer = LineWriter::new(
        FifoWriteConnector::new(config.paths.video_fifo.clone()),
        config.transport.reconnect,
    );
    let writer_shutdown = shutdown.clone();
    let writer_task = tokio::spawn(async move { writer.run(telemetry_rx, &writer_shutdown).await });

    // Sensor FIFO -> bus
    let (sensor_tx, sensor_rx) = mpsc::unbounded_channel();
    let outbound = relay.outbound(SocketCanConnector::new(config.bus.interface.clone()));
    let transmit_thread = thread::Builder::new()
        .name("bus-transmit".into())
        .spawn(move || outbound.run(sensor_rx))
        .context("spawning bus transmitter")?;

    let mut reader = LineReader::new(
        FifoReadConnector::new(config.paths.sensor_fifo.clone()),
        config.transport.reconnect,
    )
    .with_max_line_length(config.transport.max_line_length);
    let reader_shutdown = shutdown.clone();
    let reader_task = tokio::spawn(async move {
        // Dropping the source closes the channel and stops the transmit thread
        let mut source = AuxiliarySource::new(sensor_tx);
        reader.run(&mut source, &reader_shutdown).await;
    });

    shutdown.cancelled().await;

    let written = writer_task.await.context("telemetry writer task")?;
    reader_task.await.context("sensor reader task")?;
    tokio::task::spawn_blocking(move || {
        let notifier = notifier_thread.join();
        let transmit = transmit_thread.join();
        notifier
            .and(transmit)
            .map_err(|_| anyhow::anyhow!("bus thread panicked"))
    })
    .await
    .context("joining bus threads")??;

    info!(stats = ?relay.stats(), lines_written = written, "Relay stopped");
    Ok(())
}

/// SocketCAN is Linux only
#[cfg(not(target_os = "linux"))]
pub async fn relay(_config: AppConfig, _shutdown: CancellationToken) -> anyhow::Result<()> {
    anyhow::bail!("the relay needs SocketCAN, which is only available on Linux")
}

/// Render the HUD from the video FIFO until shutdown
pub async fn overlay(config: AppConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let output = FrameFile::new(config.paths.frame_output.clone());
    let mut ingest = IngestLoop::new(&config.overlay, output);
    // Start the preview with an empty overlay
    ingest.render();
    info!(
        fifo = %config.paths.video_fifo.display(),
        output = %config.paths.frame_output.display(),
        "Overlay running"
    );

    let mut reader = LineReader::new(
        FifoReadConnector::new(config.paths.video_fifo.clone()),
        config.transport.reconnect,
    )
    .with_max_line_length(config.transport.max_line_length);
    reader.run(&mut ingest, &shutdown).await;

    info!(
        frames = ingest.render_count(),
        transport_failures = ingest.transport_failures(),
        "Overlay stopped"
    );
    Ok(())
}

/// Write simulated ride telemetry to the video FIFO until shutdown
pub async fn demo(
    config: AppConfig,
    interval: Duration,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut writer = LineWriter::new(
        FifoWriteConnector::new(config.paths.video_fifo.clone()),
        config.transport.reconnect,
    );
    let writer_shutdown = shutdown.clone();
    let writer_task = tokio::spawn(async move { writer.run(rx, &writer_shutdown).await });

    info!(
        fifo = %config.paths.video_fifo.display(),
        interval_ms = interval.as_millis() as u64,
        "Demo ride started"
    );
    let mut ride = DemoRide::new();
    let started = Instant::now();
    let mut ticker = tokio::time::interval(interval);

    'ride: loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        for event in ride.update(started.elapsed().as_millis() as u64) {
            if tx.send(event).is_err() {
                break 'ride;
            }
        }
    }
    drop(tx);

    let written = writer_task.await.context("demo writer task")?;
    info!(lines_written = written, "Demo ride stopped");
    Ok(())
}
