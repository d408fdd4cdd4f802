#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Vellum test utilities.
//!
//! Fixtures for integration tests: an in-memory SQLite content table and a
//! builder for rows to seed it with.

use serde_json::{Map, Value as JsonValue};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

/// Schema of the `content` fixture table. `data` holds a JSON document.
pub const CONTENT_SCHEMA: &str = "CREATE TABLE content (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    status TEXT NOT NULL,
    collection_id TEXT,
    views INTEGER NOT NULL DEFAULT 0,
    rating REAL,
    tags TEXT NOT NULL DEFAULT '',
    data TEXT NOT NULL DEFAULT '{}',
    thumbnail BLOB
)";

/// Open a single-connection in-memory database with an empty `content` table.
///
/// One connection is required: every new in-memory connection would get its
/// own empty database.
pub async fn content_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory SQLite should open");

    sqlx::query(CONTENT_SCHEMA)
        .execute(&pool)
        .await
        .expect("content schema should apply");

    pool
}

/// Create a published test content row with default values.
pub fn test_content(title: &str) -> TestContent {
    TestContent {
        id: Uuid::now_v7(),
        title: title.to_string(),
        status: "published".to_string(),
        collection_id: Some("blog".to_string()),
        views: 0,
        rating: None,
        tags: String::new(),
        data: serde_json::json!({}),
        thumbnail: None,
    }
}

/// A content row builder for seeding fixtures.
#[derive(Debug, Clone)]
pub struct TestContent {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub collection_id: Option<String>,
    pub views: i64,
    pub rating: Option<f64>,
    pub tags: String,
    pub data: JsonValue,
    pub thumbnail: Option<Vec<u8>>,
}

impl TestContent {
    /// Set as draft.
    pub fn draft(mut self) -> Self {
        self.status = "draft".to_string();
        self
    }

    /// Set the collection (or clear it).
    pub fn in_collection(mut self, collection_id: Option<&str>) -> Self {
        self.collection_id = collection_id.map(str::to_string);
        self
    }

    pub fn with_views(mut self, views: i64) -> Self {
        self.views = views;
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Comma-separated tag list.
    pub fn with_tags(mut self, tags: &str) -> Self {
        self.tags = tags.to_string();
        self
    }

    /// Add a key to the JSON `data` document.
    pub fn with_data(mut self, name: &str, value: JsonValue) -> Self {
        if let Some(obj) = self.data.as_object_mut() {
            obj.insert(name.to_string(), value);
        }
        self
    }

    pub fn with_thumbnail(mut self, bytes: &[u8]) -> Self {
        self.thumbnail = Some(bytes.to_vec());
        self
    }

    /// Insert the row into `pool`.
    pub async fn insert(self, pool: &SqlitePool) -> Self {
        sqlx::query(
            "INSERT INTO content (id, title, status, collection_id, views, rating, tags, data, thumbnail)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id.to_string())
        .bind(&self.title)
        .bind(&self.status)
        .bind(&self.collection_id)
        .bind(self.views)
        .bind(self.rating)
        .bind(&self.tags)
        .bind(self.data.to_string())
        .bind(&self.thumbnail)
        .execute(pool)
        .await
        .expect("content row should insert");
        self
    }
}

/// Titles of result rows, in order.
pub fn titles(rows: &[Map<String, JsonValue>]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            row.get("title")
                .and_then(JsonValue::as_str)
                .expect("row should have a string title")
                .to_string()
        })
        .collect()
}
