//! Row types for the `pages` and `chunks` tables.

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Page {
    pub id: Uuid,
    pub url: String,
    pub content: String,
    pub crawl_count: i32,
    pub process_count: i32,
    pub created_at: DateTime<Utc>,
    pub last_crawled_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Chunk {
    pub id: Uuid,
    pub url: String,
    pub content: String,
    pub embedding: Option<pgvector::Vector>,
    pub created_at: DateTime<Utc>,
}

/// A chunk ready to be persisted: content plus its embedding vector.
#[derive(Debug, Clone)]
pub struct ChunkRow {
    pub content: String,
    pub embedding: Option<Vec<f32>>,
}
