//! SQLite agent template repository implementation.

use kbatlas_core::repository::template::TemplateRepository;
use kbatlas_types::error::RepositoryError;
use kbatlas_types::template::AgentTemplate;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, from_json, parse_datetime, query_err, to_json};

pub struct SqliteTemplateRepository {
    pool: DatabasePool,
}

impl SqliteTemplateRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Parse a unit enum stored as its serde string form.
fn parse_enum<T: serde::de::DeserializeOwned>(field: &str, value: String) -> Result<T, RepositoryError> {
    serde_json::from_value(serde_json::Value::String(value))
        .map_err(|e| RepositoryError::Query(format!("invalid {field}: {e}")))
}

fn enum_str<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => Ok(s),
        Ok(other) => Err(RepositoryError::Query(format!(
            "expected string enum, got {other}"
        ))),
        Err(e) => Err(RepositoryError::Query(e.to_string())),
    }
}

fn row_to_template(row: &sqlx::sqlite::SqliteRow) -> Result<AgentTemplate, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_err)?;
    let name: String = row.try_get("name").map_err(query_err)?;
    let description: String = row.try_get("description").map_err(query_err)?;
    let category: String = row.try_get("category").map_err(query_err)?;
    let difficulty: String = row.try_get("difficulty").map_err(query_err)?;
    let tags: String = row.try_get("tags").map_err(query_err)?;
    let config: String = row.try_get("config").map_err(query_err)?;
    let is_public: bool = row.try_get("is_public").map_err(query_err)?;
    let created_at: String = row.try_get("created_at").map_err(query_err)?;

    Ok(AgentTemplate {
        id,
        name,
        description,
        category: parse_enum("category", category)?,
        config: from_json("config", &config)?,
        tags: from_json("tags", &tags)?,
        difficulty: parse_enum("difficulty", difficulty)?,
        is_public,
        created_at: parse_datetime(&created_at)?,
    })
}

impl TemplateRepository for SqliteTemplateRepository {
    async fn get(&self, id: &str) -> Result<Option<AgentTemplate>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM agent_templates WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => Ok(Some(row_to_template(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, public_only: bool) -> Result<Vec<AgentTemplate>, RepositoryError> {
        let sql = if public_only {
            "SELECT * FROM agent_templates WHERE is_public = 1 ORDER BY name ASC"
        } else {
            "SELECT * FROM agent_templates ORDER BY name ASC"
        };
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        rows.iter().map(row_to_template).collect()
    }

    async fn upsert(&self, template: &AgentTemplate) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO agent_templates
                (id, name, description, category, difficulty, tags, config, is_public, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                category = excluded.category,
                difficulty = excluded.difficulty,
                tags = excluded.tags,
                config = excluded.config,
                is_public = excluded.is_public",
        )
        .bind(&template.id)
        .bind(&template.name)
        .bind(&template.description)
        .bind(enum_str(&template.category)?)
        .bind(enum_str(&template.difficulty)?)
        .bind(to_json(&template.tags)?)
        .bind(to_json(&template.config)?)
        .bind(template.is_public)
        .bind(format_datetime(&template.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;
        Ok(())
    }
}
