use serde::{Deserialize, Serialize};

/// Which dashboard a task list is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    Gantt,
    Kanban,
}

impl ViewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewType::Gantt => "gantt",
            ViewType::Kanban => "kanban",
        }
    }
}

impl std::fmt::Display for ViewType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ViewType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gantt" => Ok(ViewType::Gantt),
            "kanban" => Ok(ViewType::Kanban),
            other => Err(format!("unknown view type '{}', expected gantt or kanban", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Task {
    pub id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub planned_start_date: Option<String>,
    #[serde(default)]
    pub planned_final_date: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_on_kanban: bool,
    // Gantt view nests subtasks under their parent
    #[serde(default)]
    pub children: Vec<Task>,
}

impl Task {
    /// This task followed by all of its subtasks, depth first.
    pub fn flatten(&self) -> Vec<&Task> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.flatten());
        }
        out
    }

    pub fn status_display(&self) -> &str {
        self.status.as_deref().unwrap_or("-")
    }
}

/// A user assigned to a task, with the time they have logged on it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Executor {
    pub user_id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub time_spent: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: i64,
    #[serde(default)]
    pub task_id: Option<i64>,
    pub description: String,
    #[serde(default)]
    pub is_ready: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    #[serde(default)]
    pub task_id: Option<i64>,
    #[serde(default)]
    pub author_id: Option<i64>,
    pub message: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Response of `GET task/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetail {
    pub task: Task,
    #[serde(default)]
    pub executors: Vec<Executor>,
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl TaskDetail {
    /// Persisted time for a user on this task (0 when unrecorded)
    pub fn time_spent_by(&self, user_id: i64) -> u64 {
        self.executors
            .iter()
            .find(|e| e.user_id == user_id)
            .and_then(|e| e.time_spent)
            .unwrap_or(0)
    }

    pub fn stages_done(&self) -> usize {
        self.stages.iter().filter(|s| s.is_ready).count()
    }
}

/// Fields for creating a task
#[derive(Debug, Clone, Serialize, Default)]
pub struct NewTask {
    pub parent_id: Option<i64>,
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub planned_start_date: Option<String>,
    pub planned_final_date: Option<String>,
    pub deadline: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewStage {
    pub description: String,
}

/// Body of `POST tasks`
#[derive(Debug, Clone, Serialize)]
pub struct CreateTaskRequest {
    pub task: NewTask,
    pub task_stages: Vec<NewStage>,
    pub responsible_users: Vec<i64>,
}

/// Body of `PUT task/{id}`
#[derive(Debug, Clone, Serialize, Default)]
pub struct TaskUpdate {
    pub name: String,
    pub description: Option<String>,
    pub planned_start_date: Option<String>,
    pub planned_final_date: Option<String>,
    pub deadline: Option<String>,
}

/// Body of `PUT task/{id}/dates`
#[derive(Debug, Clone, Serialize)]
pub struct TaskDates {
    pub planned_start_date: String,
    pub planned_final_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL_JSON: &str = r#"{
        "task": {"id": 5, "project_id": 2, "name": "Landing page", "status": "in_progress",
                 "is_on_kanban": true, "unexpected": "ignored"},
        "executors": [
            {"user_id": 1, "time_spent": 120},
            {"user_id": 2, "time_spent": null}
        ],
        "stages": [
            {"id": 10, "description": "Mockup", "is_ready": true},
            {"id": 11, "description": "Markup", "is_ready": false}
        ],
        "comments": [{"id": 3, "message": "Looks good"}]
    }"#;

    #[test]
    fn test_parse_task_detail() {
        let detail: TaskDetail = serde_json::from_str(DETAIL_JSON).unwrap();
        assert_eq!(detail.task.id, 5);
        assert_eq!(detail.task.name, "Landing page");
        assert!(detail.task.is_on_kanban);
        assert_eq!(detail.stages_done(), 1);
        assert_eq!(detail.comments[0].message, "Looks good");
    }

    #[test]
    fn test_time_spent_by() {
        let detail: TaskDetail = serde_json::from_str(DETAIL_JSON).unwrap();
        assert_eq!(detail.time_spent_by(1), 120);
        assert_eq!(detail.time_spent_by(2), 0); // null
        assert_eq!(detail.time_spent_by(99), 0); // not an executor
    }

    #[test]
    fn test_flatten_gantt_tree() {
        let json = r#"{"id": 1, "name": "Root", "children": [
            {"id": 2, "name": "A", "children": [{"id": 3, "name": "A1"}]},
            {"id": 4, "name": "B"}
        ]}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        let ids: Vec<i64> = task.flatten().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_view_type_parse_and_display() {
        assert_eq!("Gantt".parse::<ViewType>(), Ok(ViewType::Gantt));
        assert_eq!("kanban".parse::<ViewType>(), Ok(ViewType::Kanban));
        assert!("list".parse::<ViewType>().is_err());
        assert_eq!(ViewType::Kanban.to_string(), "kanban");
    }

    #[test]
    fn test_create_task_request_shape() {
        let request = CreateTaskRequest {
            task: NewTask {
                project_id: 2,
                name: "Docs".to_string(),
                ..Default::default()
            },
            task_stages: vec![NewStage { description: "Outline".to_string() }],
            responsible_users: vec![4],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["task"]["parent_id"], serde_json::Value::Null);
        assert_eq!(value["task_stages"][0]["description"], "Outline");
        assert_eq!(value["responsible_users"][0], 4);
    }
}
