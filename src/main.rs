use clap::Parser;
use serial_driver::config::ConfigLoader;
use serial_driver::{logging, AsyncSerialPort, SerialError};
use std::io::BufRead;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Bridge a serial device to the terminal.",
    long_about = "Opens a serial device through the native driver, writes each stdin line to it and prints everything it receives. The options string is passed to the driver untouched, e.g. \"baudrate=9600;parity=none;autocts=off;autorts=off\"."
)]
struct Args {
    /// Device path or alias from the config file. Falls back to `serial.port`.
    port: Option<String>,

    /// Driver options string. Falls back to `serial.options`.
    #[arg(short, long)]
    options: Option<String>,

    /// Configuration file to load instead of the standard locations.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print received bytes as hex instead of raw.
    #[arg(long)]
    hex: bool,

    /// Log filter, e.g. "debug" or "serial_driver=trace".
    #[arg(long)]
    log_level: Option<String>,
}

// --- Main Application Entry Point ---
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let config = loader.into_config();
    logging::init(&config.logging, args.log_level.as_deref())?;

    let port_name = args
        .port
        .as_deref()
        .or(config.serial.port.as_deref())
        .map(|name| config.serial.resolve_port(name))
        .ok_or("no port given and no serial.port configured")?;
    let options = args.options.unwrap_or(config.serial.options);

    let port = AsyncSerialPort::open(&port_name, &options).await?;
    info!(port = %port_name, options = %options, "port open");

    let mut receiver = tokio::spawn(pump_device_to_stdout(port.clone(), args.hex));
    let sender = tokio::spawn(pump_stdin_to_device(port.clone(), spawn_stdin_reader()));

    // Run until interrupted or the device stops delivering data.
    tokio::select! {
        _ = shutdown_signal() => {}
        result = &mut receiver => {
            if let Err(e) = result {
                error!("receiver task failed: {e}");
            }
        }
    }

    port.close().await;
    sender.abort();
    if !receiver.is_finished() {
        let _ = receiver.await;
    }
    info!(port = %port_name, "port closed");
    Ok(())
}

// A pending stdin read must not hold up runtime shutdown, so it lives on a plain thread.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn pump_stdin_to_device(port: AsyncSerialPort, mut lines: mpsc::Receiver<String>) {
    while let Some(line) = lines.recv().await {
        let mut data = line.into_bytes();
        data.push(b'\n');
        if let Err(e) = send_line(&port, data).await {
            if !matches!(e, SerialError::Closed) {
                error!("write failed: {e}");
            }
            return;
        }
    }
    debug!("stdin closed");
}

async fn send_line(port: &AsyncSerialPort, data: Vec<u8>) -> Result<(), SerialError> {
    port.write(data).await?;
    port.flush().await
}

async fn pump_device_to_stdout(port: AsyncSerialPort, hex: bool) {
    let mut stdout = tokio::io::stdout();
    loop {
        let data = match port.read(256).await {
            Ok(data) if data.is_empty() => {
                info!("device reached end of stream");
                break;
            }
            Ok(data) => data,
            Err(SerialError::Closed) => break,
            Err(e) => {
                error!("read failed: {e}");
                break;
            }
        };

        let written = if hex {
            let line: Vec<String> = data.iter().map(|b| format!("{:02X}", b)).collect();
            stdout.write_all(format!("{}\n", line.join(" ")).as_bytes()).await
        } else {
            stdout.write_all(&data).await
        };
        if written.and(stdout.flush().await).is_err() {
            break;
        }
    }
}

// --- Graceful Shutdown Handler ---
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, closing port");
}
