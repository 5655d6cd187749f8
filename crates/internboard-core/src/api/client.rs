//! API client for the scheduler and accounts REST APIs.
//!
//! This module provides the `ApiClient` struct with one method per backend
//! operation. Every authenticated call is routed through the [`Gateway`],
//! which handles bearer tokens and credential refresh.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::auth::{CredentialPair, SessionStore};
use crate::config::Config;
use crate::models::{
    CreateTaskRequest, Estimate, Estimation, EvaluationCriterion, EvaluationForm, ImageChange,
    Intern, InternsAndTutors, InternshipStage, NewStage, NewTask, Project, Role, RoleChange,
    Stage, Task, TaskDates, TaskDetail, TaskUpdate, Team, TeamPayload, UserInfo, ViewType,
};

use super::gateway::{join_url, ApiRequest, Gateway};
use super::ApiError;

/// Registration fields accepted by `POST register/`
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// API client for the internship backend.
/// Clone is cheap - the gateway and its connection pool are shared.
#[derive(Clone)]
pub struct ApiClient {
    gateway: Arc<Gateway>,
    accounts_url: String,
    scheduler_url: String,
}

impl ApiClient {
    /// Create a client for the URLs in `config`, bound to `session`.
    pub fn new(config: &Config, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self::with_http(http, config, session))
    }

    pub fn with_http(http: Client, config: &Config, session: Arc<SessionStore>) -> Self {
        Self {
            gateway: Arc::new(Gateway::new(http, session, config.accounts_url.clone())),
            accounts_url: config.accounts_url.clone(),
            scheduler_url: config.scheduler_url.clone(),
        }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.gateway.session()
    }

    fn accounts(&self, path: &str) -> String {
        join_url(&self.accounts_url, path)
    }

    fn scheduler(&self, path: &str) -> String {
        join_url(&self.scheduler_url, path)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn execute(&self, request: ApiRequest) -> Result<Response, ApiError> {
        debug!(method = %request.method, url = %request.url, "Sending request");
        let response = self.gateway.send(&request).await?;
        Self::check_response(response).await
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let url = request.url.clone();
        let response = self.execute(request).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }

    async fn submit(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute(request).await?;
        Ok(())
    }

    // ===== Session =====

    pub async fn login(&self, username: &str, password: &str) -> Result<CredentialPair, ApiError> {
        self.gateway.login(username, password).await
    }

    pub async fn logout(&self) -> bool {
        self.gateway.logout().await
    }

    pub async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let request = ApiRequest::post(self.accounts("register/")).json(registration)?;
        let response = self.gateway.send_anonymous(&request).await?;
        Self::check_response(response).await?;
        Ok(())
    }

    // ===== Tasks =====

    /// Fetch the tasks of a project as shown in a Gantt or Kanban view
    pub async fn fetch_tasks(&self, view: ViewType, project_id: i64) -> Result<Vec<Task>, ApiError> {
        let request = ApiRequest::get(self.scheduler("tasks"))
            .query("view_type", view)
            .query("project_id", project_id);
        self.fetch(request).await
    }

    pub async fn fetch_task(&self, task_id: i64) -> Result<TaskDetail, ApiError> {
        self.fetch(ApiRequest::get(self.scheduler(&format!("task/{}", task_id))))
            .await
    }

    pub async fn create_task(
        &self,
        task: NewTask,
        stages: &[String],
        responsible_users: &[i64],
    ) -> Result<(), ApiError> {
        let body = CreateTaskRequest {
            task,
            task_stages: stages
                .iter()
                .map(|description| NewStage {
                    description: description.clone(),
                })
                .collect(),
            responsible_users: responsible_users.to_vec(),
        };
        self.submit(ApiRequest::post(self.scheduler("tasks")).json(&body)?)
            .await
    }

    pub async fn update_task(&self, task_id: i64, update: &TaskUpdate) -> Result<(), ApiError> {
        let request = ApiRequest::put(self.scheduler(&format!("task/{}", task_id))).json(update)?;
        self.submit(request).await
    }

    pub async fn delete_task(&self, task_id: i64) -> Result<(), ApiError> {
        self.submit(ApiRequest::delete(self.scheduler(&format!("task/{}", task_id))))
            .await
    }

    /// Persist the time tracked on a task by the current user
    pub async fn save_timer(&self, task_id: i64, time_spent: u64) -> Result<(), ApiError> {
        let request = ApiRequest::put(self.scheduler(&format!("task/{}/save_timer", task_id)))
            .json(&serde_json::json!({ "time_spent": time_spent }))?;
        self.submit(request).await
    }

    pub async fn update_status(&self, task_id: i64, status: &str) -> Result<(), ApiError> {
        let request = ApiRequest::put(self.scheduler(&format!("task/{}/status", task_id)))
            .json(&serde_json::json!({ "status": status }))?;
        self.submit(request).await
    }

    /// Toggle whether the task appears on the Kanban board
    pub async fn toggle_kanban(&self, task_id: i64) -> Result<(), ApiError> {
        let request = ApiRequest::put(self.scheduler(&format!("task/{}/is_on_kanban", task_id)))
            .json(&serde_json::json!({}))?;
        self.submit(request).await
    }

    pub async fn update_dates(&self, task_id: i64, dates: &TaskDates) -> Result<(), ApiError> {
        let request = ApiRequest::put(self.scheduler(&format!("task/{}/dates", task_id))).json(dates)?;
        self.submit(request).await
    }

    // ===== Stages =====

    pub async fn create_stage(&self, task_id: i64, description: &str) -> Result<(), ApiError> {
        let request = ApiRequest::post(self.scheduler("stage")).json(&serde_json::json!({
            "task_id": task_id,
            "description": description,
        }))?;
        self.submit(request).await
    }

    pub async fn update_stage(
        &self,
        stage_id: i64,
        description: &str,
        is_ready: bool,
    ) -> Result<(), ApiError> {
        let request = ApiRequest::put(self.scheduler(&format!("stage/{}", stage_id))).json(
            &serde_json::json!({
                "description": description,
                "is_ready": is_ready,
            }),
        )?;
        self.submit(request).await
    }

    /// Flip a stage between done and not done
    pub async fn toggle_stage(&self, stage: &Stage) -> Result<(), ApiError> {
        self.update_stage(stage.id, &stage.description, !stage.is_ready)
            .await
    }

    pub async fn delete_stage(&self, stage_id: i64) -> Result<(), ApiError> {
        self.submit(ApiRequest::delete(self.scheduler(&format!("stage/{}", stage_id))))
            .await
    }

    // ===== Comments =====

    pub async fn create_comment(&self, task_id: i64, message: &str) -> Result<(), ApiError> {
        let request = ApiRequest::post(self.scheduler("comment")).json(&serde_json::json!({
            "task_id": task_id,
            "message": message,
        }))?;
        self.submit(request).await
    }

    pub async fn update_comment(&self, comment_id: i64, message: &str) -> Result<(), ApiError> {
        let request = ApiRequest::put(self.scheduler(&format!("comment/{}", comment_id)))
            .json(&serde_json::json!({ "message": message }))?;
        self.submit(request).await
    }

    pub async fn delete_comment(&self, comment_id: i64) -> Result<(), ApiError> {
        self.submit(ApiRequest::delete(self.scheduler(&format!("comment/{}", comment_id))))
            .await
    }

    // ===== Projects =====

    /// Projects the signed-in user takes part in
    pub async fn fetch_user_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.fetch(ApiRequest::get(self.scheduler("user_projects"))).await
    }

    pub async fn fetch_project_interns(&self, project_id: i64) -> Result<Vec<Intern>, ApiError> {
        let request = ApiRequest::get(self.scheduler("project_interns")).query("project_id", project_id);
        self.fetch(request).await
    }

    pub async fn fetch_project(&self, project_id: i64) -> Result<Project, ApiError> {
        self.fetch(ApiRequest::get(self.accounts(&format!("project/{}/", project_id))))
            .await
    }

    // ===== Teams =====

    pub async fn fetch_teams(&self) -> Result<Vec<Team>, ApiError> {
        self.fetch(ApiRequest::get(self.accounts("teams/"))).await
    }

    pub async fn fetch_team(&self, team_id: i64) -> Result<Team, ApiError> {
        self.fetch(ApiRequest::get(self.accounts(&format!("team/{}/", team_id))))
            .await
    }

    pub async fn create_team(&self, team: &TeamPayload) -> Result<(), ApiError> {
        self.submit(ApiRequest::post(self.accounts("team/")).json(team)?)
            .await
    }

    pub async fn update_team(&self, team_id: i64, team: &TeamPayload) -> Result<(), ApiError> {
        let request = ApiRequest::put(self.accounts(&format!("team/{}", team_id))).json(team)?;
        self.submit(request).await
    }

    pub async fn fetch_interns_and_tutors(&self) -> Result<InternsAndTutors, ApiError> {
        self.fetch(ApiRequest::get(self.accounts("interns-tutors/"))).await
    }

    // ===== Users =====

    pub async fn fetch_user(&self, user_id: i64) -> Result<Intern, ApiError> {
        self.fetch(ApiRequest::get(self.accounts(&format!("user/{}/", user_id))))
            .await
    }

    pub async fn fetch_user_info(&self, user_id: i64) -> Result<UserInfo, ApiError> {
        self.fetch(ApiRequest::get(self.accounts(&format!("user-info/{}/", user_id))))
            .await
    }

    pub async fn update_user_info(&self, user_id: i64, info: &UserInfo) -> Result<(), ApiError> {
        let request = ApiRequest::put(self.accounts(&format!("user-info/{}/", user_id))).json(info)?;
        self.submit(request).await
    }

    /// Replace the profile picture. `image` is whatever the backend accepts
    /// for the field (a data URL or an uploaded file reference).
    pub async fn change_image(&self, user_id: i64, image: &str) -> Result<(), ApiError> {
        let body = ImageChange {
            image: image.to_string(),
        };
        let request = ApiRequest::put(self.accounts(&format!("change-image/{}/", user_id))).json(&body)?;
        self.submit(request).await
    }

    pub async fn fetch_roles(&self) -> Result<Vec<Role>, ApiError> {
        self.fetch(ApiRequest::get(self.accounts("roles/"))).await
    }

    pub async fn change_role(&self, change: &RoleChange) -> Result<(), ApiError> {
        self.submit(ApiRequest::put(self.accounts("change-role/")).json(change)?)
            .await
    }

    // ===== Evaluations =====

    pub async fn fetch_evaluation_criteria(&self) -> Result<Vec<EvaluationCriterion>, ApiError> {
        self.fetch(ApiRequest::get(self.accounts("evaluation-creteria/")))
            .await
    }

    pub async fn submit_estimate(&self, estimate: &Estimate) -> Result<(), ApiError> {
        self.submit(ApiRequest::post(self.accounts("estimate/")).json(estimate)?)
            .await
    }

    pub async fn fetch_estimations(&self, user_id: i64, team_id: i64) -> Result<Vec<Estimation>, ApiError> {
        self.fetch(ApiRequest::get(
            self.accounts(&format!("estimations/{}/{}/", user_id, team_id)),
        ))
        .await
    }

    pub async fn fetch_form(&self, form_id: i64) -> Result<EvaluationForm, ApiError> {
        self.fetch(ApiRequest::get(self.accounts(&format!("forms/{}/", form_id))))
            .await
    }

    /// Forms `user_id` has to fill in for the members of `team_id`
    pub async fn fetch_forms_for_team(&self, user_id: i64, team_id: i64) -> Result<Vec<EvaluationForm>, ApiError> {
        self.fetch(ApiRequest::get(
            self.accounts(&format!("forms-for-team/{}/{}", user_id, team_id)),
        ))
        .await
    }

    // ===== Internship stages =====

    pub async fn fetch_internship_stages(&self) -> Result<Vec<InternshipStage>, ApiError> {
        self.fetch(ApiRequest::get(self.accounts("stage/"))).await
    }

    pub async fn fetch_internship_stage(&self, stage_id: i64) -> Result<InternshipStage, ApiError> {
        self.fetch(ApiRequest::get(self.accounts(&format!("stage/{}/", stage_id))))
            .await
    }
}
