use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lumino::{create_router, list_input_devices, AppState, Config, SessionController, SessionEvent};
use tracing::info;

#[derive(Parser)]
#[command(name = "lumino", about = "Live speech translation pipeline")]
struct Cli {
    /// Configuration file (without extension)
    #[arg(long, default_value = "config/lumino")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP control surface
    Serve,
    /// Run a single session in the terminal
    Run,
    /// List input devices by index
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve => serve(&cli.config).await,
        Command::Run => run(&cli.config).await,
        Command::Devices => {
            for (index, name) in list_input_devices().into_iter().enumerate() {
                println!("{index}: {name}");
            }
            Ok(())
        }
    }
}

async fn serve(config_path: &str) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;

    info!("{} starting", config.service.name);
    let addr = format!("{}:{}", config.service.http.bind, config.service.http.port);
    let state = AppState::new(config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("HTTP server listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn run(config_path: &str) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;

    let session = SessionController::from_config(&config)?;
    session.start().await?;
    let mut stream = session
        .take_stream()
        .context("session produced no result stream")?;
    info!("listening; press Ctrl-C to stop");

    loop {
        tokio::select! {
            event = stream.recv() => match event {
                Some(SessionEvent::Line(line)) => {
                    println!("{}", line.text);
                    if let Some(translation) = &line.translation {
                        println!("  -> {translation}");
                    }
                    if let Some(context) = &line.context {
                        println!("  ({context})");
                    }
                }
                Some(SessionEvent::Stopped { conversation }) => {
                    info!(lines = conversation.len(), "session finished");
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                session.stop().await?;
            }
        }
    }

    Ok(())
}
