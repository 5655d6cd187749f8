//! Command-line parsing.

use anyhow::{anyhow, bail, Context, Result};
use internboard_core::models::ViewType;

pub const USAGE: &str = "\
Usage: internboard <command> [args]

Session:
  login [username] [--remember]   Log in (prompts for password)
  logout                          Log out and forget the session

Tasks:
  projects                        List your projects
  tasks <gantt|kanban> <project>  List tasks of a project
  task <id>...                    Show task details
  status <task> <status>          Change task status
  kanban <task>                   Toggle task on the Kanban board
  dates <task> <start> <final>    Change planned dates (YYYY-MM-DD)
  stage add <task> <description>  Add a stage
  stage toggle <task> <stage>     Mark a stage done / not done
  stage rm <stage>                Delete a stage
  comment add <task> <message>    Comment on a task
  comment edit <comment> <text>   Edit a comment
  comment rm <comment>            Delete a comment

Teams:
  teams                           List your teams
  team <id>                       Show a team

Time tracking:
  track <task>                    Interactive work timer for a task
";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { username: Option<String>, remember: bool },
    Logout,
    Projects,
    Tasks { view: ViewType, project_id: i64 },
    Task { ids: Vec<i64> },
    Status { task_id: i64, status: String },
    Kanban { task_id: i64 },
    Dates { task_id: i64, start: String, end: String },
    StageAdd { task_id: i64, description: String },
    StageToggle { task_id: i64, stage_id: i64 },
    StageRemove { stage_id: i64 },
    CommentAdd { task_id: i64, message: String },
    CommentEdit { comment_id: i64, message: String },
    CommentRemove { comment_id: i64 },
    Teams,
    Team { team_id: i64 },
    Track { task_id: i64 },
    Help,
}

fn parse_id(value: Option<&String>, what: &str) -> Result<i64> {
    let value = value.ok_or_else(|| anyhow!("missing {}", what))?;
    value
        .parse()
        .with_context(|| format!("invalid {} '{}'", what, value))
}

fn require_text(rest: &[String], what: &str) -> Result<String> {
    if rest.is_empty() {
        bail!("missing {}", what);
    }
    Ok(rest.join(" "))
}

impl Command {
    /// Parse arguments after the program name.
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some(name) = args.first() else {
            return Ok(Command::Help);
        };
        let rest = &args[1..];

        let command = match name.as_str() {
            "login" => {
                let remember = rest.iter().any(|a| a == "--remember");
                let username = rest.iter().find(|a| !a.starts_with("--")).cloned();
                Command::Login { username, remember }
            }
            "logout" => Command::Logout,
            "projects" => Command::Projects,
            "tasks" => {
                let view = rest
                    .first()
                    .ok_or_else(|| anyhow!("missing view type"))?
                    .parse::<ViewType>()
                    .map_err(|e| anyhow!(e))?;
                Command::Tasks {
                    view,
                    project_id: parse_id(rest.get(1), "project id")?,
                }
            }
            "task" => {
                if rest.is_empty() {
                    bail!("missing task id");
                }
                let ids = rest
                    .iter()
                    .map(|id| parse_id(Some(id), "task id"))
                    .collect::<Result<Vec<_>>>()?;
                Command::Task { ids }
            }
            "status" => Command::Status {
                task_id: parse_id(rest.first(), "task id")?,
                status: require_text(rest.get(1..).unwrap_or_default(), "status")?,
            },
            "kanban" => Command::Kanban {
                task_id: parse_id(rest.first(), "task id")?,
            },
            "dates" => {
                let (Some(start), Some(end)) = (rest.get(1), rest.get(2)) else {
                    bail!("expected: dates <task> <start> <final>");
                };
                Command::Dates {
                    task_id: parse_id(rest.first(), "task id")?,
                    start: start.clone(),
                    end: end.clone(),
                }
            }
            "stage" => match rest.first().map(String::as_str) {
                Some("add") => Command::StageAdd {
                    task_id: parse_id(rest.get(1), "task id")?,
                    description: require_text(rest.get(2..).unwrap_or_default(), "description")?,
                },
                Some("toggle") => Command::StageToggle {
                    task_id: parse_id(rest.get(1), "task id")?,
                    stage_id: parse_id(rest.get(2), "stage id")?,
                },
                Some("rm") => Command::StageRemove {
                    stage_id: parse_id(rest.get(1), "stage id")?,
                },
                _ => bail!("expected: stage add|toggle|rm"),
            },
            "comment" => match rest.first().map(String::as_str) {
                Some("add") => Command::CommentAdd {
                    task_id: parse_id(rest.get(1), "task id")?,
                    message: require_text(rest.get(2..).unwrap_or_default(), "message")?,
                },
                Some("edit") => Command::CommentEdit {
                    comment_id: parse_id(rest.get(1), "comment id")?,
                    message: require_text(rest.get(2..).unwrap_or_default(), "message")?,
                },
                Some("rm") => Command::CommentRemove {
                    comment_id: parse_id(rest.get(1), "comment id")?,
                },
                _ => bail!("expected: comment add|edit|rm"),
            },
            "teams" => Command::Teams,
            "team" => Command::Team {
                team_id: parse_id(rest.first(), "team id")?,
            },
            "track" => Command::Track {
                task_id: parse_id(rest.first(), "task id")?,
            },
            "help" | "--help" | "-h" => Command::Help,
            other => bail!("unknown command '{}'", other),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_parse_login() {
        assert_eq!(
            Command::parse(&args("login intern --remember")).unwrap(),
            Command::Login {
                username: Some("intern".to_string()),
                remember: true
            }
        );
        assert_eq!(
            Command::parse(&args("login")).unwrap(),
            Command::Login {
                username: None,
                remember: false
            }
        );
    }

    #[test]
    fn test_parse_tasks() {
        assert_eq!(
            Command::parse(&args("tasks kanban 3")).unwrap(),
            Command::Tasks {
                view: ViewType::Kanban,
                project_id: 3
            }
        );
        assert!(Command::parse(&args("tasks list 3")).is_err());
        assert!(Command::parse(&args("tasks gantt")).is_err());
    }

    #[test]
    fn test_parse_multiple_task_ids() {
        assert_eq!(
            Command::parse(&args("task 1 2 3")).unwrap(),
            Command::Task { ids: vec![1, 2, 3] }
        );
        assert!(Command::parse(&args("task one")).is_err());
        assert!(Command::parse(&args("task")).is_err());
    }

    #[test]
    fn test_parse_free_text_arguments() {
        assert_eq!(
            Command::parse(&args("comment add 5 looks good to me")).unwrap(),
            Command::CommentAdd {
                task_id: 5,
                message: "looks good to me".to_string()
            }
        );
        assert_eq!(
            Command::parse(&args("stage add 5 Write tests")).unwrap(),
            Command::StageAdd {
                task_id: 5,
                description: "Write tests".to_string()
            }
        );
        assert!(Command::parse(&args("comment add 5")).is_err());
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(Command::parse(&[]).unwrap(), Command::Help);
        assert_eq!(Command::parse(&args("track 5")).unwrap(), Command::Track { task_id: 5 });
        assert!(Command::parse(&args("frobnicate")).is_err());
        assert!(Command::parse(&args("dates 5 2024-01-01")).is_err());
    }
}
