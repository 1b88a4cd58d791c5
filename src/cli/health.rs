use ansi_term::Colour::{Green, Red};
use anyhow::{bail, Result};
use clap::Subcommand;
use tracing::warn;

use crate::{
    daemon::{
        health::{reminder_spec, HEALTH_REMINDERS},
        messages::{ControlRequest, ControlResponse},
        storage::entities::{load_health_selection, save_health_selection},
    },
    notify::{DesktopNotifier, NotificationSink},
    utils::dir::create_application_default_path,
};

use super::{client, shift::open_store};

#[derive(Subcommand, Debug)]
pub enum HealthCommand {
    #[command(about = "Start a recurring reminder (water, eye, stretch)")]
    Start { kind: String },
    #[command(about = "Stop a recurring reminder")]
    Stop { kind: String },
    #[command(about = "Stop every recurring reminder")]
    StopAll {},
    #[command(about = "Send a one-off health nudge")]
    Nudge {},
}

#[derive(Subcommand, Debug)]
pub enum TestCommand {
    #[command(about = "Explain which checkout reminders will fire")]
    Notification {},
    #[command(about = "Preview the one-hour reminder")]
    OneHour {},
    #[command(about = "Preview the five-minute reminder")]
    FiveMinute {},
    #[command(about = "Preview the completion notice")]
    Complete {},
}

/// Command to control the recurring health reminders. Besides talking to the daemon this
/// keeps the persisted selection current, which is what the daemon replays after a restart.
pub async fn process_health_command(command: HealthCommand) -> Result<()> {
    let dir = create_application_default_path()?;

    let request = match command {
        HealthCommand::Start { kind } => {
            if reminder_spec(&kind).is_none() {
                bail!(
                    "Unknown reminder {kind:?}. Available: {}",
                    HEALTH_REMINDERS
                        .iter()
                        .map(|spec| spec.kind)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            update_selection(|kinds| {
                if !kinds.contains(&kind) {
                    kinds.push(kind.clone());
                }
            })
            .await?;
            ControlRequest::StartHealthReminder {
                reminder_type: kind,
            }
        }
        HealthCommand::Stop { kind } => {
            update_selection(|kinds| kinds.retain(|k| k != &kind)).await?;
            ControlRequest::StopHealthReminder {
                reminder_type: kind,
            }
        }
        HealthCommand::StopAll {} => {
            update_selection(|kinds| kinds.clear()).await?;
            ControlRequest::StopAllHealthReminders
        }
        HealthCommand::Nudge {} => ControlRequest::HealthNudge,
    };

    print_response(client::send_request(&dir, &request).await?);
    Ok(())
}

/// Command to fire a manual test notification. When the daemon can't be reached the
/// notification is emitted directly from this process so the user still sees something.
pub async fn process_test_command(command: TestCommand) -> Result<()> {
    let dir = create_application_default_path()?;

    let request = match command {
        TestCommand::Notification {} => ControlRequest::TestNotification,
        TestCommand::OneHour {} => ControlRequest::TestOneHour,
        TestCommand::FiveMinute {} => ControlRequest::TestFiveMinute,
        TestCommand::Complete {} => ControlRequest::TestComplete,
    };

    match client::send_request(&dir, &request).await {
        Ok(response) => print_response(response),
        Err(e) => {
            warn!("Daemon unreachable, notifying directly: {e:?}");
            let (title, message) = request
                .canned_notification()
                .expect("every test request has a canned notification");
            DesktopNotifier.notify(title, message)?;
            println!("Daemon unreachable, sent the notification directly.");
        }
    }
    Ok(())
}

async fn update_selection(update: impl FnOnce(&mut Vec<String>)) -> Result<()> {
    let store = open_store()?;
    let mut kinds = load_health_selection(&store).await?;
    update(&mut kinds);
    save_health_selection(&store, &kinds).await
}

fn print_response(response: ControlResponse) {
    let mark = if response.ok {
        Green.paint("ok")
    } else {
        Red.paint("failed")
    };
    match response.message {
        Some(message) => println!("{mark}: {message}"),
        None => println!("{mark}"),
    }
}
