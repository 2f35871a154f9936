//! SQLite builder state repository implementation.
//!
//! Implements `BuilderStateRepository` from `kbatlas-core` using sqlx with
//! split read/write pools. The nested sections of a session are stored as
//! JSON columns; `name`, `step` and `status` are denormalized so listings
//! never have to parse them.

use kbatlas_core::repository::builder_state::BuilderStateRepository;
use kbatlas_types::builder::{
    BuilderId, BuilderState, BuilderStep, BuilderSummary, DeploymentStatus, OwnerId,
};
use kbatlas_types::error::RepositoryError;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, from_json, parse_datetime, query_err, to_json};

/// SQLite-backed implementation of `BuilderStateRepository`.
pub struct SqliteBuilderStateRepository {
    pool: DatabasePool,
}

impl SqliteBuilderStateRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn stored_version(&self, id: &BuilderId) -> Result<Option<u64>, RepositoryError> {
        let row = sqlx::query("SELECT version FROM builder_states WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.writer)
            .await
            .map_err(query_err)?;
        match row {
            Some(row) => {
                let version: i64 = row.try_get("version").map_err(query_err)?;
                Ok(Some(version as u64))
            }
            None => Ok(None),
        }
    }
}

fn row_to_state(row: &sqlx::sqlite::SqliteRow) -> Result<BuilderState, RepositoryError> {
    let owner_id: String = row.try_get("owner_id").map_err(query_err)?;
    let config: String = row.try_get("config").map_err(query_err)?;
    let validation: String = row.try_get("validation").map_err(query_err)?;
    let preview: String = row.try_get("preview").map_err(query_err)?;
    let deployment: String = row.try_get("deployment").map_err(query_err)?;
    let version: i64 = row.try_get("version").map_err(query_err)?;
    let created_at: String = row.try_get("created_at").map_err(query_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(query_err)?;

    Ok(BuilderState {
        owner_id: OwnerId::new(owner_id),
        config: from_json("config", &config)?,
        validation: from_json("validation", &validation)?,
        preview: from_json("preview", &preview)?,
        deployment: from_json("deployment", &deployment)?,
        version: version as u64,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

fn row_to_summary(row: &sqlx::sqlite::SqliteRow) -> Result<BuilderSummary, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_err)?;
    let name: String = row.try_get("name").map_err(query_err)?;
    let step: String = row.try_get("step").map_err(query_err)?;
    let status: String = row.try_get("status").map_err(query_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(query_err)?;

    Ok(BuilderSummary {
        id: id
            .parse::<BuilderId>()
            .map_err(|e| RepositoryError::Query(format!("invalid builder id: {e}")))?,
        name,
        step: step.parse::<BuilderStep>().map_err(RepositoryError::Query)?,
        deployment_status: status
            .parse::<DeploymentStatus>()
            .map_err(RepositoryError::Query)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

impl BuilderStateRepository for SqliteBuilderStateRepository {
    async fn insert(&self, state: &BuilderState) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO builder_states
                (id, owner_id, name, step, status, config, validation, preview, deployment,
                 version, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(state.id().to_string())
        .bind(state.owner_id.as_str())
        .bind(&state.config.basic.name)
        .bind(state.config.step.as_str())
        .bind(state.deployment.status.to_string())
        .bind(to_json(&state.config)?)
        .bind(to_json(&state.validation)?)
        .bind(to_json(&state.preview)?)
        .bind(to_json(&state.deployment)?)
        .bind(state.version as i64)
        .bind(format_datetime(&state.created_at))
        .bind(format_datetime(&state.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.message().contains("UNIQUE") {
                    return RepositoryError::Conflict(format!(
                        "builder {} already exists",
                        state.id()
                    ));
                }
            }
            query_err(e)
        })?;
        Ok(())
    }

    async fn get(&self, id: &BuilderId) -> Result<Option<BuilderState>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM builder_states WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => Ok(Some(row_to_state(&row)?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        state: &BuilderState,
        expected_version: u64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE builder_states
             SET name = ?, step = ?, status = ?, config = ?, validation = ?, preview = ?,
                 deployment = ?, version = ?, updated_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(&state.config.basic.name)
        .bind(state.config.step.as_str())
        .bind(state.deployment.status.to_string())
        .bind(to_json(&state.config)?)
        .bind(to_json(&state.validation)?)
        .bind(to_json(&state.preview)?)
        .bind(to_json(&state.deployment)?)
        .bind(state.version as i64)
        .bind(format_datetime(&state.updated_at))
        .bind(state.id().to_string())
        .bind(expected_version as i64)
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return match self.stored_version(&state.id()).await? {
                Some(actual) => Err(RepositoryError::VersionConflict {
                    expected: expected_version,
                    actual,
                }),
                None => Err(RepositoryError::NotFound),
            };
        }
        Ok(())
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<BuilderSummary>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, step, status, updated_at FROM builder_states
             WHERE owner_id = ? ORDER BY updated_at DESC",
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter().map(row_to_summary).collect()
    }

    async fn delete(&self, id: &BuilderId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM builder_states WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;
        Ok(())
    }
}
