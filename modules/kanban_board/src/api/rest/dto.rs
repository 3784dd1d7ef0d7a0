use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contract::model::{BoardView, Column, Task, UserIdentity};

/// REST DTO for the signed-in user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub user_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInReq {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInResp {
    /// Bearer token for the board endpoints
    pub session: Uuid,
    pub user: UserDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDto {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDto {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Empty until the column's task subscription delivered its first snapshot
    pub tasks: Vec<TaskDto>,
}

/// What a client renders: columns in creation order, each with its tasks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardViewDto {
    pub columns: Vec<ColumnDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddColumnReq {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTaskReq {
    pub text: String,
}

/// Returned for accepted creates; the board view catches up through the live stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedDto {
    pub id: String,
}

impl From<UserIdentity> for UserDto {
    fn from(user: UserIdentity) -> Self {
        Self {
            user_id: user.user_id.to_string(),
            display_name: user.display_name,
        }
    }
}

impl From<&Task> for TaskDto {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            text: task.text.clone(),
            created_at: task.created_at,
        }
    }
}

impl From<&BoardView> for BoardViewDto {
    fn from(view: &BoardView) -> Self {
        let columns = view
            .columns
            .iter()
            .map(|c: &Column| ColumnDto {
                id: c.id.to_string(),
                title: c.title.clone(),
                created_at: c.created_at,
                tasks: view.tasks_of(&c.id).iter().map(TaskDto::from).collect(),
            })
            .collect();
        Self { columns }
    }
}
