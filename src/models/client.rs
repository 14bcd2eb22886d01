use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct Client {
    pub id: i32,
    #[serde(skip)]
    pub owner_id: i32,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewClient {
    pub owner_id: i32,
    pub name: String,
    pub email: Option<String>,
}
