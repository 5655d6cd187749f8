// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Intern or tutor as listed for a project or team picker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intern {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub patronymic: Option<String>,
}

impl Intern {
    pub fn full_name(&self) -> String {
        match self.patronymic.as_deref().filter(|p| !p.is_empty()) {
            Some(p) => format!("{} {} {}", self.last_name, self.first_name, p),
            None => format!("{} {}", self.last_name, self.first_name),
        }
    }
}

/// Response of `GET interns-tutors/`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InternsAndTutors {
    #[serde(default)]
    pub interns: Vec<Intern>,
    #[serde(default)]
    pub tutors: Vec<Intern>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub patronymic: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telegram: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub title: String,
}

/// Body of `PUT change-role/`
#[derive(Debug, Clone, Serialize)]
pub struct RoleChange {
    pub user_id: i64,
    pub team_id: i64,
    pub role_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationCriterion {
    pub id: i64,
    pub title: String,
}

/// Body of `POST estimate/`
#[derive(Debug, Clone, Serialize)]
pub struct Estimate {
    pub user_id: i64,
    pub team_id: i64,
    pub criterion_id: i64,
    pub estimation: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Estimation {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub criterion_id: Option<i64>,
    #[serde(default)]
    pub estimation: Option<i32>,
    #[serde(default)]
    pub author_id: Option<i64>,
}

/// Evaluation form for a team, as returned by `forms/` endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationForm {
    pub id: i64,
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default)]
    pub team_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub criteria: Vec<EvaluationCriterion>,
}

/// Stage of the internship itself (accounts API), not a task stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternshipStage {
    pub id: i64,
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Body of `PUT change-image/{id}/`
#[derive(Debug, Clone, Serialize)]
pub struct ImageChange {
    pub image: String,
}
