//! Data models for scheduler and accounts entities.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - Task types: `Task`, `TaskDetail`, `Executor`, `Stage`, `Comment` and
//!   the request bodies used to create and edit them
//! - `Team`, `TeamMember`: project teams
//! - User types: `Project`, `Intern`, `UserInfo`, `Role`, internship stages,
//!   evaluation forms

pub mod task;
pub mod team;
pub mod user;

pub use task::{
    Comment, CreateTaskRequest, Executor, NewStage, NewTask, Stage, Task, TaskDates, TaskDetail,
    TaskUpdate, ViewType,
};
pub use team::{Team, TeamMember, TeamPayload};
pub use user::{
    Estimate, Estimation, EvaluationCriterion, EvaluationForm, ImageChange, Intern,
    InternsAndTutors, InternshipStage, Project, Role, RoleChange, UserInfo,
};
