//! Evaluation store — at most one evaluation per fingerprint.
//!
//! Two implementations: an in-memory map (tests, embedding in a larger
//! service) and a SQLite table holding the evaluation as a JSON payload.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use rusqlite::{params, Connection, OptionalExtension};

use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;
use crate::models::{Evaluation, Fingerprint};

/// What happened on `put`.
#[derive(Debug, Clone, PartialEq)]
pub enum PutOutcome {
    Inserted,
    Replaced,
    /// A record already existed and `replace` was false; the stored record
    /// is returned and the new one discarded.
    AlreadyPresent(Box<Evaluation>),
}

pub trait EvaluationStore: Send + Sync {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Evaluation>, DatabaseError>;

    /// Store an evaluation under its fingerprint. With `replace` an existing
    /// record is overwritten (force refresh); otherwise the existing one wins.
    fn put(&self, evaluation: &Evaluation, replace: bool) -> Result<PutOutcome, DatabaseError>;

    /// All evaluations for a company, oldest first.
    fn list_for_company(&self, company_id: &str) -> Result<Vec<Evaluation>, DatabaseError>;
}

/// In-memory evaluation store.
#[derive(Default)]
pub struct InMemoryEvaluationStore {
    entries: RwLock<HashMap<Fingerprint, Evaluation>>,
}

impl InMemoryEvaluationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }
}

impl EvaluationStore for InMemoryEvaluationStore {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Evaluation>, DatabaseError> {
        let entries = self.entries.read().map_err(|_| DatabaseError::LockPoisoned)?;
        Ok(entries.get(fingerprint).cloned())
    }

    fn put(&self, evaluation: &Evaluation, replace: bool) -> Result<PutOutcome, DatabaseError> {
        let mut entries = self.entries.write().map_err(|_| DatabaseError::LockPoisoned)?;
        match entries.get(&evaluation.fingerprint) {
            Some(existing) if !replace => Ok(PutOutcome::AlreadyPresent(Box::new(existing.clone()))),
            Some(_) => {
                entries.insert(evaluation.fingerprint.clone(), evaluation.clone());
                Ok(PutOutcome::Replaced)
            }
            None => {
                entries.insert(evaluation.fingerprint.clone(), evaluation.clone());
                Ok(PutOutcome::Inserted)
            }
        }
    }

    fn list_for_company(&self, company_id: &str) -> Result<Vec<Evaluation>, DatabaseError> {
        let entries = self.entries.read().map_err(|_| DatabaseError::LockPoisoned)?;
        let mut found: Vec<Evaluation> = entries
            .values()
            .filter(|e| e.company_id == company_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        });
        Ok(found)
    }
}

/// SQLite-backed evaluation store.
pub struct SqliteEvaluationStore {
    conn: Mutex<Connection>,
}

impl SqliteEvaluationStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_database(path)?),
        })
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_memory_database()?),
        })
    }
}

fn decode_payload(payload: &str) -> Result<Evaluation, DatabaseError> {
    serde_json::from_str(payload).map_err(|e| DatabaseError::Serialization(e.to_string()))
}

impl EvaluationStore for SqliteEvaluationStore {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Evaluation>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM evaluations WHERE fingerprint = ?1",
                params![fingerprint.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        payload.as_deref().map(decode_payload).transpose()
    }

    fn put(&self, evaluation: &Evaluation, replace: bool) -> Result<PutOutcome, DatabaseError> {
        let payload = serde_json::to_string(evaluation)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let tx = conn.unchecked_transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT payload FROM evaluations WHERE fingerprint = ?1",
                params![evaluation.fingerprint.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match existing {
            Some(stored) if !replace => {
                return Ok(PutOutcome::AlreadyPresent(Box::new(decode_payload(&stored)?)));
            }
            Some(_) => PutOutcome::Replaced,
            None => PutOutcome::Inserted,
        };

        tx.execute(
            "INSERT OR REPLACE INTO evaluations
             (fingerprint, company_id, rubric_version, recommendation, scored_count, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                evaluation.fingerprint.as_str(),
                evaluation.company_id,
                evaluation.rubric_version,
                evaluation.recommendation.as_str(),
                evaluation.scored_count() as i64,
                payload,
                evaluation.created_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        Ok(outcome)
    }

    fn list_for_company(&self, company_id: &str) -> Result<Vec<Evaluation>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let mut stmt = conn.prepare(
            "SELECT payload FROM evaluations
             WHERE company_id = ?1
             ORDER BY created_at ASC, fingerprint ASC",
        )?;
        let rows = stmt.query_map(params![company_id], |row| row.get::<_, String>(0))?;

        let mut evaluations = Vec::new();
        for row in rows {
            evaluations.push(decode_payload(&row?)?);
        }
        Ok(evaluations)
    }
}
