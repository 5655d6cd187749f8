//! Interactive work timer shell for `internboard track <task>`.

use std::io::{self, Write};

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use internboard_core::utils::format_elapsed;
use internboard_core::{TimerError, WorkTimer};

use crate::app::App;

const HELP: &str = "Commands: start, stop, reset, save, show, help, quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerCommand {
    Start,
    Stop,
    Reset,
    Save,
    Show,
    Help,
    Quit,
}

impl TimerCommand {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "start" | "s" => Some(Self::Start),
            "stop" | "p" => Some(Self::Stop),
            "reset" | "r" => Some(Self::Reset),
            "save" | "w" => Some(Self::Save),
            "show" | "" => Some(Self::Show),
            "help" | "?" => Some(Self::Help),
            "quit" | "q" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

pub async fn run(app: &App, task_id: i64) -> Result<()> {
    let client = &app.client;
    let user_id = client.session().user_id().await;
    let mut open_task = client.fetch_task(task_id).await?;

    let mut timer = WorkTimer::new(app.config.timer_guard);
    let recorded = user_id.map(|id| open_task.time_spent_by(id)).unwrap_or(0);
    timer.bind(task_id, open_task.task.name.clone(), recorded);
    let mut last_saved = recorded;
    info!(task_id, recorded, "Tracking task");

    println!("Tracking #{} {}", task_id, open_task.task.name);
    println!("{}", HELP);
    print_status(&timer);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let Some(command) = TimerCommand::parse(&line) else {
            println!("Unknown command '{}'. {}", line.trim(), HELP);
            continue;
        };
        debug!(?command, "Timer command");

        match command {
            TimerCommand::Start => {
                if !timer.start() {
                    println!("Timer already running");
                }
                print_status(&timer);
            }
            TimerCommand::Stop => {
                if !timer.stop() {
                    println!("Timer is not running");
                }
                print_status(&timer);
            }
            TimerCommand::Reset => {
                if timer.reset(&open_task, user_id) {
                    print_status(&timer);
                } else {
                    println!("Stop the timer before resetting");
                }
            }
            TimerCommand::Save => match timer.save(client, task_id).await {
                Ok(Some(task)) => {
                    open_task = task;
                    last_saved = timer.elapsed();
                    println!("Saved {}", format_elapsed(last_saved));
                }
                Ok(None) => println!("Stop the timer before saving"),
                Err(e) if e.is_saved() => {
                    last_saved = timer.elapsed();
                    println!("{}", e);
                    if e.api_error().is_session_ending() {
                        bail!("Session ended after saving {}", format_elapsed(last_saved));
                    }
                }
                Err(TimerError::Persistence(e)) if e.is_session_ending() => {
                    bail!("{}\nUnsaved time: {}", e, format_elapsed(timer.elapsed()));
                }
                Err(e) => println!("{} (time kept, try again)", e),
            },
            TimerCommand::Show => print_status(&timer),
            TimerCommand::Help => println!("{}", HELP),
            TimerCommand::Quit => break,
        }
    }

    timer.stop();
    if timer.elapsed() != last_saved {
        println!("Unsaved time discarded ({} on record)", format_elapsed(last_saved));
    }
    Ok(())
}

fn print_status(timer: &WorkTimer) {
    let state = if timer.is_running() { "running" } else { "stopped" };
    println!("{}  [{}]", format_elapsed(timer.elapsed()), state);
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}
