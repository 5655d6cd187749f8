//! Application state and command handlers for the internboard CLI.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::future::join_all;
use tracing::{debug, info, warn};

use internboard_core::auth::CredentialStore;
use internboard_core::models::{TaskDates, TaskDetail, ViewType};
use internboard_core::utils::{format_elapsed, format_optional_date, truncate_string};
use internboard_core::{ApiClient, ApiError, Config, SessionStore};

use crate::commands::{Command, USAGE};
use crate::tracker;

/// Column width for task names in listings
const NAME_COLUMN_WIDTH: usize = 40;

pub struct App {
    pub config: Config,
    pub client: ApiClient,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        debug!(accounts = %config.accounts_url, scheduler = %config.scheduler_url, "Config loaded");

        let session = match config.cache_dir().and_then(|dir| SessionStore::open(&dir)) {
            Ok(store) => store,
            Err(e) => {
                warn!(error = %e, "Failed to open session, continuing without persistence");
                SessionStore::in_memory()
            }
        };

        let client = ApiClient::new(&config, Arc::new(session))?;
        Ok(Self { config, client })
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        let needs_session = !matches!(command, Command::Login { .. } | Command::Logout | Command::Help);
        let result = if needs_session {
            match self.ensure_logged_in().await {
                Ok(()) => self.dispatch(command).await,
                Err(e) => Err(e),
            }
        } else {
            self.dispatch(command).await
        };
        if let Err(ref e) = result {
            if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_session_ending) {
                bail!("{}\nSession ended. Run `internboard login` to sign in again.", e);
            }
        }
        result
    }

    async fn ensure_logged_in(&self) -> Result<()> {
        if !self.client.session().is_authenticated().await {
            bail!("Not logged in. Run `internboard login` first.");
        }
        if let Err(e) = self.client.gateway().refresh_if_expiring().await {
            warn!(error = %e, "Proactive token refresh failed");
            return Err(e.into());
        }
        Ok(())
    }

    async fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Help => print!("{}", USAGE),
            Command::Login { username, remember } => self.login(username, remember).await?,
            Command::Logout => self.logout().await,
            Command::Projects => {
                for project in self.client.fetch_user_projects().await? {
                    println!("{:>6}  {}", project.id, project.title);
                }
            }
            Command::Tasks { view, project_id } => self.list_tasks(view, project_id).await?,
            Command::Task { ids } => self.show_tasks(&ids).await?,
            Command::Status { task_id, status } => {
                self.client.update_status(task_id, &status).await?;
                println!("Task {} status set to {}", task_id, status);
            }
            Command::Kanban { task_id } => {
                self.client.toggle_kanban(task_id).await?;
                println!("Task {} toggled on the Kanban board", task_id);
            }
            Command::Dates { task_id, start, end } => {
                let dates = TaskDates {
                    planned_start_date: start,
                    planned_final_date: end,
                };
                self.client.update_dates(task_id, &dates).await?;
                println!("Task {} dates updated", task_id);
            }
            Command::StageAdd { task_id, description } => {
                self.client.create_stage(task_id, &description).await?;
                println!("Stage added to task {}", task_id);
            }
            Command::StageToggle { task_id, stage_id } => {
                let detail = self.client.fetch_task(task_id).await?;
                let Some(stage) = detail.stages.iter().find(|s| s.id == stage_id) else {
                    bail!("Task {} has no stage {}", task_id, stage_id);
                };
                self.client.toggle_stage(stage).await?;
                println!(
                    "Stage {} marked {}",
                    stage_id,
                    if stage.is_ready { "not done" } else { "done" }
                );
            }
            Command::StageRemove { stage_id } => {
                self.client.delete_stage(stage_id).await?;
                println!("Stage {} deleted", stage_id);
            }
            Command::CommentAdd { task_id, message } => {
                self.client.create_comment(task_id, &message).await?;
                println!("Comment added to task {}", task_id);
            }
            Command::CommentEdit { comment_id, message } => {
                self.client.update_comment(comment_id, &message).await?;
                println!("Comment {} updated", comment_id);
            }
            Command::CommentRemove { comment_id } => {
                self.client.delete_comment(comment_id).await?;
                println!("Comment {} deleted", comment_id);
            }
            Command::Teams => {
                for team in self.client.fetch_teams().await? {
                    println!("{:>6}  {} ({} interns)", team.id, team.title, team.interns.len());
                }
            }
            Command::Team { team_id } => {
                let team = self.client.fetch_team(team_id).await?;
                println!("{} (#{})", team.title, team.id);
                if let Some(ref chat) = team.team_chat {
                    println!("Chat: {}", chat);
                }
                for member in &team.interns {
                    println!(
                        "  {:>6}  {}  {}",
                        member.id_intern,
                        member.name.as_deref().unwrap_or("-"),
                        member.role.as_deref().unwrap_or("")
                    );
                }
            }
            Command::Track { task_id } => tracker::run(self, task_id).await?,
        }
        Ok(())
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    async fn login(&mut self, username: Option<String>, remember: bool) -> Result<()> {
        let username = match username.or_else(|| self.config.last_username.clone()) {
            Some(name) => name,
            None => prompt_username()?,
        };

        let password = if !remember && CredentialStore::has_credentials(&username) {
            CredentialStore::get_password(&username)?
        } else {
            rpassword::prompt_password("Password: ").context("Failed to read password")?
        };

        self.client.login(&username, &password).await?;

        if remember {
            if let Err(e) = CredentialStore::store(&username, &password) {
                warn!(error = %e, "Failed to store credentials");
            }
        }

        self.config.last_username = Some(username.clone());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        info!(username = %username, "Login successful");
        println!("Logged in as {}", username);
        Ok(())
    }

    async fn logout(&mut self) {
        if self.client.logout().await {
            println!("Logged out");
        } else {
            println!("Not logged in");
        }
        if let Some(ref username) = self.config.last_username {
            if let Err(e) = CredentialStore::delete(username) {
                warn!(error = %e, "Failed to remove stored credentials");
            }
        }
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    async fn list_tasks(&self, view: ViewType, project_id: i64) -> Result<()> {
        let tasks = self.client.fetch_tasks(view, project_id).await?;
        if tasks.is_empty() {
            println!("No tasks in project {} ({} view)", project_id, view);
            return Ok(());
        }
        for root in &tasks {
            for task in root.flatten() {
                let indent = if task.parent_id.is_some() { "  " } else { "" };
                println!(
                    "{:>6}  {}{:<width$}  {:<12}  {} → {}",
                    task.id,
                    indent,
                    truncate_string(&task.name, NAME_COLUMN_WIDTH),
                    task.status_display(),
                    format_optional_date(task.planned_start_date.as_deref()),
                    format_optional_date(task.planned_final_date.as_deref()),
                    width = NAME_COLUMN_WIDTH,
                );
            }
        }
        Ok(())
    }

    /// Fetch and print several tasks concurrently
    async fn show_tasks(&self, ids: &[i64]) -> Result<()> {
        let user_id = self.client.session().user_id().await;
        let fetches = ids.iter().map(|&id| self.client.fetch_task(id));
        let results = join_all(fetches).await;

        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(detail) => print_task(&detail, user_id),
                Err(e) if e.is_session_ending() => return Err(e.into()),
                Err(e) => eprintln!("Task {}: {}", id, e),
            }
        }
        Ok(())
    }
}

fn print_task(detail: &TaskDetail, user_id: Option<i64>) {
    let task = &detail.task;
    println!("#{} {}", task.id, task.name);
    println!("  Status:   {}", task.status_display());
    println!(
        "  Planned:  {} → {}",
        format_optional_date(task.planned_start_date.as_deref()),
        format_optional_date(task.planned_final_date.as_deref())
    );
    println!("  Deadline: {}", format_optional_date(task.deadline.as_deref()));
    if let Some(ref description) = task.description {
        println!("  {}", description);
    }
    if let Some(user_id) = user_id {
        println!("  Your time: {}", format_elapsed(detail.time_spent_by(user_id)));
    }
    if !detail.stages.is_empty() {
        println!("  Stages ({}/{} done):", detail.stages_done(), detail.stages.len());
        for stage in &detail.stages {
            let mark = if stage.is_ready { "x" } else { " " };
            println!("    [{}] {:>5}  {}", mark, stage.id, stage.description);
        }
    }
    for comment in &detail.comments {
        println!("  💬 {:>5}  {}", comment.id, comment.message);
    }
}

fn prompt_username() -> Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    let username = username.trim().to_string();
    if username.is_empty() {
        bail!("Username required");
    }
    Ok(username)
}
