// TimeTracker - daily work-session timer
// Entry point: logging, data directory, ticker and a line-based command loop

use std::path::PathBuf;
use timetracker::app;
use timetracker::commands::{self, Command};
use timetracker::config::TICK_INTERVAL;
use timetracker::services::Ticker;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timetracker=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting TimeTracker");

    let data_dir = app::resolve_data_dir(std::env::args_os().nth(1).map(PathBuf::from))?;
    let state = app::setup(data_dir).await?;

    let ticker = Ticker::spawn(state.engine.clone(), TICK_INTERVAL);

    println!("Data directory: {}", state.app_data_dir.display());
    println!("{}", commands::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        let quit = command == Command::Quit;

        match commands::dispatch(&state, command).await {
            Ok(reply) => println!("{}", reply),
            Err(e) => tracing::error!("Command failed: {}", e),
        }

        if quit {
            break;
        }
    }

    ticker.abort();
    state.engine.flush().await?;

    tracing::info!("TimeTracker stopped");

    Ok(())
}
