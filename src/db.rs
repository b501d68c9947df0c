use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::models::JobRecord;

/// SQLite-backed job source.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                company TEXT,
                description TEXT,
                work_mode TEXT NOT NULL DEFAULT '',
                job_type TEXT NOT NULL DEFAULT '',
                experience_level TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                is_remote INTEGER NOT NULL DEFAULT 0,
                visa_sponsorship INTEGER NOT NULL DEFAULT 0,
                posted_at TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS job_skills (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id INTEGER NOT NULL REFERENCES jobs(id),
                skill TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_posted ON jobs(posted_at);
            CREATE INDEX IF NOT EXISTS idx_skills_job ON job_skills(job_id);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='jobs'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!("Database not initialized. Run 'jobsieve init' first."));
        }
        Ok(())
    }

    pub fn add_job(&self, job: &JobRecord) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO jobs (title, company, description, work_mode, job_type, experience_level,
                               location, is_remote, visa_sponsorship, posted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                job.title,
                job.company,
                job.description,
                job.work_mode,
                job.job_type,
                job.experience_level,
                job.location,
                job.is_remote,
                job.visa_sponsorship,
                job.posted_at.to_rfc3339(),
            ],
        )?;
        let job_id = tx.last_insert_rowid();

        for skill in &job.skills {
            // Skip blank skills
            let skill = skill.trim();
            if skill.is_empty() {
                continue;
            }
            tx.execute(
                "INSERT INTO job_skills (job_id, skill) VALUES (?1, ?2)",
                params![job_id, skill],
            )?;
        }
        tx.commit()?;

        debug!(job_id, title = %job.title, "added job");
        Ok(job_id)
    }

    /// Imports a JSON array of job records. Record ids in the file are ignored.
    pub fn import_json(&self, path: &Path) -> Result<usize> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read jobs file: {}", path.display()))?;
        let jobs: Vec<JobRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse jobs file: {}", path.display()))?;

        for job in &jobs {
            self.add_job(job)?;
        }
        info!(count = jobs.len(), file = %path.display(), "imported jobs");
        Ok(jobs.len())
    }

    /// All jobs, newest first.
    pub fn list_jobs(&self) -> Result<Vec<JobRecord>> {
        let mut skills = self.load_skills()?;
        let mut stmt = self.conn.prepare(
            "SELECT id, title, company, description, work_mode, job_type, experience_level,
                    location, is_remote, visa_sponsorship, posted_at
             FROM jobs
             ORDER BY posted_at DESC, id",
        )?;
        let rows = stmt.query_map([], Self::row_to_job)?;

        let mut jobs = rows
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list jobs")?;
        for job in &mut jobs {
            job.skills = skills.remove(&job.id).unwrap_or_default();
        }
        Ok(jobs)
    }

    pub fn get_job(&self, id: i64) -> Result<Option<JobRecord>> {
        let result = self.conn.query_row(
            "SELECT id, title, company, description, work_mode, job_type, experience_level,
                    location, is_remote, visa_sponsorship, posted_at
             FROM jobs WHERE id = ?1",
            [id],
            Self::row_to_job,
        );
        let mut job = match result {
            Ok(job) => job,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut stmt = self
            .conn
            .prepare("SELECT skill FROM job_skills WHERE job_id = ?1 ORDER BY id")?;
        job.skills = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(Some(job))
    }

    pub fn delete_job(&self, id: i64) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM job_skills WHERE job_id = ?1", [id])?;
        let removed = tx.execute("DELETE FROM jobs WHERE id = ?1", [id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn load_skills(&self) -> Result<HashMap<i64, Vec<String>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT job_id, skill FROM job_skills ORDER BY job_id, id")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;

        let mut skills: HashMap<i64, Vec<String>> = HashMap::new();
        for row in rows {
            let (job_id, skill) = row?;
            skills.entry(job_id).or_default().push(skill);
        }
        Ok(skills)
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<JobRecord> {
        let posted_raw: String = row.get(10)?;
        let posted_at = DateTime::parse_from_rfc3339(&posted_raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, Box::new(e))
            })?;

        Ok(JobRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            company: row.get(2)?,
            description: row.get(3)?,
            work_mode: row.get(4)?,
            job_type: row.get(5)?,
            experience_level: row.get(6)?,
            location: row.get(7)?,
            is_remote: row.get(8)?,
            visa_sponsorship: row.get(9)?,
            skills: Vec::new(),
            posted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample(title: &str, day: u32, skills: &[&str]) -> JobRecord {
        JobRecord {
            id: 0,
            title: title.to_string(),
            company: Some("CloudTech".into()),
            description: Some("Build things".into()),
            work_mode: "hybrid".into(),
            job_type: "full_time".into(),
            experience_level: "senior".into(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            location: "New York, NY".into(),
            is_remote: false,
            visa_sponsorship: true,
            posted_at: Utc.with_ymd_and_hms(2025, 2, day, 8, 30, 0).unwrap(),
        }
    }

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    #[test]
    fn test_uninitialized_database_is_reported() {
        let db = Database::open_in_memory().unwrap();
        let err = db.ensure_initialized().unwrap_err();
        assert!(err.to_string().contains("jobsieve init"));
        db.init().unwrap();
        assert!(db.ensure_initialized().is_ok());
    }

    #[test]
    fn test_add_and_get_job() {
        let db = db();
        let id = db.add_job(&sample("DevOps Engineer", 3, &["Docker", " ", "AWS"])).unwrap();

        let job = db.get_job(id).unwrap().unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.title, "DevOps Engineer");
        assert_eq!(job.skills, vec!["Docker", "AWS"]);
        assert!(job.visa_sponsorship);
        assert_eq!(job.posted_at, Utc.with_ymd_and_hms(2025, 2, 3, 8, 30, 0).unwrap());

        assert!(db.get_job(id + 100).unwrap().is_none());
    }

    #[test]
    fn test_list_jobs_newest_first() {
        let db = db();
        db.add_job(&sample("Older", 1, &["Go"])).unwrap();
        db.add_job(&sample("Newer", 20, &["Python", "Go"])).unwrap();

        let jobs = db.list_jobs().unwrap();
        let titles: Vec<_> = jobs.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["Newer", "Older"]);
        assert_eq!(jobs[0].skills, vec!["Python", "Go"]);
        assert_eq!(jobs[1].skills, vec!["Go"]);
    }

    #[test]
    fn test_delete_job() {
        let db = db();
        let id = db.add_job(&sample("Temp", 5, &["Go"])).unwrap();
        assert!(db.delete_job(id).unwrap());
        assert!(!db.delete_job(id).unwrap());
        assert!(db.list_jobs().unwrap().is_empty());
    }

    #[test]
    fn test_import_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        std::fs::write(
            &path,
            r#"[
                {"title": "Frontend Developer", "jobType": "contract", "isRemote": true,
                 "skills": ["JavaScript"], "postedAt": "2025-02-10T00:00:00Z"},
                {"title": "Backend Developer", "jobType": "full_time",
                 "postedAt": "2025-02-11T00:00:00Z"}
            ]"#,
        )
        .unwrap();

        let db = Database::open(&dir.path().join("data/jobs.db")).unwrap();
        db.init().unwrap();
        assert_eq!(db.import_json(&path).unwrap(), 2);

        let jobs = db.list_jobs().unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].title, "Backend Developer");
        assert!(jobs[1].is_remote);
    }
}
