//! Index of history files uploaded for each patient folder.

use chrono::NaiveDateTime;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::gateway::like_pattern;
use crate::pagination::{ListQuery, Page};
use crate::schema::{patient_history, patients};

/// A row in `patient_history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = patient_history, check_for_backend(Pg))]
pub struct PatientHistory {
    /// Primary key.
    #[diesel(column_name = history_id)]
    pub id: i32,
    /// Folder the files live under.
    pub patient_name: String,
    /// Matching patient, when the name resolves to one.
    pub patient_id: Option<i32>,
    /// File names currently in the folder.
    pub history_files: Vec<String>,
    /// Last upload time.
    pub updated_at: NaiveDateTime,
}

/// Bookkeeping for uploaded history folders.
pub trait HistoryLedger: Send + Sync + 'static {
    /// Returns one page of ledger rows, optionally searched by patient name.
    fn list(&self, query: &ListQuery) -> AppResult<Page<PatientHistory>>;

    /// Records `files` as the current contents of `patient_name`'s folder.
    fn record(&self, patient_name: &str, files: &[String]) -> AppResult<PatientHistory>;

    /// Drops the ledger row for `patient_name`.
    fn forget(&self, patient_name: &str) -> AppResult<()>;
}

/// PostgreSQL ledger backed by `patient_history`.
#[derive(Clone)]
pub struct PatientHistoryGateway {
    pool: DbPool,
}

impl PatientHistoryGateway {
    /// Creates a ledger backed by `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl HistoryLedger for PatientHistoryGateway {
    fn list(&self, query: &ListQuery) -> AppResult<Page<PatientHistory>> {
        let mut conn = self.pool.get()?;
        let mut rows = patient_history::table
            .select(PatientHistory::as_select())
            .order(patient_history::patient_name.asc())
            .into_boxed();
        let mut total = patient_history::table.count().into_boxed();

        if let Some(pattern) = query.search.as_deref().map(like_pattern) {
            rows = rows.filter(patient_history::patient_name.ilike(pattern.clone()));
            total = total.filter(patient_history::patient_name.ilike(pattern));
        }

        let total = total.get_result::<i64>(&mut conn)?;
        let data = rows
            .limit(query.page.limit)
            .offset(query.page.offset())
            .load(&mut conn)?;
        Ok(Page::new(data, total, &query.page))
    }

    fn record(&self, patient_name: &str, files: &[String]) -> AppResult<PatientHistory> {
        let mut conn = self.pool.get()?;
        let patient_id = patients::table
            .filter(patients::name.eq(patient_name))
            .select(patients::patient_id)
            .order(patients::patient_id.asc())
            .first::<i32>(&mut conn)
            .optional()?;

        let row = diesel::insert_into(patient_history::table)
            .values((
                patient_history::patient_name.eq(patient_name),
                patient_history::patient_id.eq(patient_id),
                patient_history::history_files.eq(files),
                patient_history::updated_at.eq(diesel::dsl::now),
            ))
            .on_conflict(patient_history::patient_name)
            .do_update()
            .set((
                patient_history::patient_id.eq(patient_id),
                patient_history::history_files.eq(files),
                patient_history::updated_at.eq(diesel::dsl::now),
            ))
            .returning(PatientHistory::as_returning())
            .get_result(&mut conn)?;
        tracing::debug!(patient = patient_name, files = files.len(), "recorded history");
        Ok(row)
    }

    fn forget(&self, patient_name: &str) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(
            patient_history::table.filter(patient_history::patient_name.eq(patient_name)),
        )
        .execute(&mut conn)?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!(
                "Patient history for {patient_name}"
            )));
        }
        Ok(())
    }
}
