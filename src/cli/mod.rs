pub mod client;
pub mod health;
pub mod process;
pub mod shift;

use std::{env, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use health::{HealthCommand, TestCommand};
use process::{kill_previous_servers, restart_server, to_daemon_path};
use shift::DateStyle;
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::start_daemon,
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Shiftwatch", version, long_about = None)]
#[command(about = "Work shift tracker with checkout and health break reminders", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon for the application")]
    Init {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
    },
    #[command(
        about = "Run a daemon directly in current console. Used for creating a daemon internally and for debugging"
    )]
    Serve {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop {},
    #[command(name = "in", about = "Record today's shift start")]
    In {
        #[arg(help = "Check-in time as HH:MM. Defaults to the current time")]
        time: Option<String>,
    },
    #[command(about = "Remove today's check-in")]
    Clear {},
    #[command(about = "Show check-in, checkout and reminder state for a day")]
    Status {
        #[arg(
            long,
            short,
            help = "Day to show. Examples are \"yesterday\", \"last friday\", \"15/03/2025\""
        )]
        day: Option<String>,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
    },
    #[command(about = "Control the recurring health reminders")]
    Health {
        #[command(subcommand)]
        command: HealthCommand,
    },
    #[command(about = "Fire a test notification through the daemon")]
    Test {
        #[command(subcommand)]
        command: TestCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(
        CLI_PREFIX,
        &create_application_default_path()?,
        logging_level,
        args.log,
    )?;

    match args.commands {
        Commands::Init { .. } => {
            restart_server()?;
            Ok(())
        }
        Commands::Stop {} => {
            let process_name = env::current_exe().unwrap();
            kill_previous_servers(&to_daemon_path(process_name.clone()));
            kill_previous_servers(&process_name);
            Ok(())
        }
        Commands::Serve { dir } => {
            let dir = dir.map_or_else(create_application_default_path, Ok)?;
            start_daemon(dir).await?;
            Ok(())
        }
        Commands::In { time } => shift::process_check_in(time).await,
        Commands::Clear {} => shift::process_clear().await,
        Commands::Status { day, date_style } => shift::process_status(day, date_style).await,
        Commands::Health { command } => health::process_health_command(command).await,
        Commands::Test { command } => health::process_test_command(command).await,
    }
}
