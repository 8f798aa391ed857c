use color_eyre::Result;
use controlstation::console::{ConsoleCommand, HELP};
use controlstation::input::gamepad::GamepadHandle;
use controlstation::protocol::TelemetryReading;
use controlstation::{EventSink, Station, StationConfig, StationEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = StationConfig::default_path();
    let config = StationConfig::load_or_default(&config_path).await?;
    info!("Using config {}", config_path.display());

    let (events, mut event_rx) = EventSink::channel(256);
    let (action_tx, mut action_rx) = mpsc::channel(100);

    // Gamepad läuft auf eigenem Thread, Events kommen über action_rx
    let _gamepad = if config.gamepad.enabled {
        match GamepadHandle::spawn(config.gamepad.clone(), action_tx.clone()) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Failed to start gamepad thread: {}", e);
                None
            }
        }
    } else {
        info!("Gamepad disabled in config");
        None
    };

    let mut station = Station::new(config, events);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", HELP);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        debug!("stdin closed");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read stdin: {}", e);
                        break;
                    }
                };
                match ConsoleCommand::parse(&line) {
                    Ok(Some(command)) => {
                        if !command.apply(&mut station).await {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{}", e),
                }
            }
            Some(action) = action_rx.recv() => {
                if let Err(e) = station.handle(action).await {
                    debug!("Gamepad action {:?} not sent: {}", action, e);
                }
            }
            Some(event) = event_rx.recv() => print_event(event),
        }
    }

    station.disconnect().await;
    while let Ok(event) = event_rx.try_recv() {
        print_event(event);
    }
    drop(action_tx);
    Ok(())
}

fn print_event(event: StationEvent) {
    match event {
        StationEvent::Log(line) => println!("{}", line),
        // Unbekannte Frames stehen schon als "Robot: ..." im Log
        StationEvent::Telemetry(TelemetryReading::Unknown(_)) => {}
        StationEvent::Telemetry(reading) => println!("[telemetry] {}", reading),
        StationEvent::StateChanged(state) => println!("[state] {:?}", state),
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
