//! SQLite persistence for study results.
//!
//! RULE: Only store.rs talks to the database.
//! The engine never touches it; hosts persist finished reports.

use crate::{
    config::SimulationConfig,
    error::SimResult,
    history::{ExcludedWeek, ExclusionReason},
    host::{BatchKind, BatchReport, StudyReport},
    message::ScenarioOutput,
};
use rusqlite::{params, Connection};

pub struct ResultStore {
    conn: Connection,
}

impl ResultStore {
    /// Open (or create) the results database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str, config: &SimulationConfig) -> SimResult<()> {
        insert_run(&self.conn, run_id, seed, version, config)
    }

    pub fn run_seed(&self, run_id: &str) -> SimResult<Option<u64>> {
        let mut stmt = self.conn.prepare("SELECT seed FROM run WHERE run_id = ?1")?;
        let seed = stmt
            .query_row(params![run_id], |row| row.get::<_, i64>(0))
            .ok()
            .map(|s| s as u64);
        Ok(seed)
    }

    // ── Scenario outputs ───────────────────────────────────────

    pub fn insert_scenario_output(&self, run_id: &str, batch: BatchKind, output: &ScenarioOutput) -> SimResult<()> {
        insert_scenario_output(&self.conn, run_id, batch, output)
    }

    pub fn scenario_outputs(&self, run_id: &str, batch: BatchKind) -> SimResult<Vec<ScenarioOutput>> {
        let mut stmt = self.conn.prepare(
            "SELECT scenario_name, overall_average_shortage, daily_average_shortage,
                    attendance_distribution_pct, average_preference_deviation, error
             FROM scenario_output WHERE run_id = ?1 AND batch = ?2
             ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, batch.name()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut outputs = Vec::with_capacity(rows.len());
        for (scenario_name, overall, daily, dist, deviation, error) in rows {
            outputs.push(ScenarioOutput {
                scenario_name,
                overall_average_shortage: overall,
                daily_average_shortage: daily.map(|s| serde_json::from_str(&s)).transpose()?,
                attendance_distribution_pct: dist.map(|s| serde_json::from_str(&s)).transpose()?,
                average_preference_deviation: deviation,
                error,
            });
        }
        Ok(outputs)
    }

    // ── Excluded weeks ─────────────────────────────────────────

    pub fn insert_excluded_week(&self, run_id: &str, week: &ExcludedWeek) -> SimResult<()> {
        insert_excluded_week(&self.conn, run_id, week)
    }

    pub fn excluded_weeks(&self, run_id: &str) -> SimResult<Vec<ExcludedWeek>> {
        let mut stmt = self.conn.prepare(
            "SELECT week_id, total_people, zero_attendance, reasons
             FROM excluded_week WHERE run_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)? as u64,
                    row.get::<_, i64>(2)? as u64,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut weeks = Vec::with_capacity(rows.len());
        for (week_id, total_people, zero_attendance, reasons) in rows {
            let reasons: Vec<ExclusionReason> = serde_json::from_str(&reasons)?;
            weeks.push(ExcludedWeek { week_id, total_people, zero_attendance, reasons });
        }
        Ok(weeks)
    }

    // ── Whole study ────────────────────────────────────────────

    /// Persist a finished study in one transaction.
    pub fn save_study(&mut self, report: &StudyReport, config: &SimulationConfig, version: &str) -> SimResult<()> {
        let tx = self.conn.transaction()?;
        insert_run(&tx, &report.run_id, report.seed, version, config)?;
        for batch in std::iter::once(&report.modeled).chain(report.empirical.as_ref()) {
            insert_batch(&tx, &report.run_id, batch)?;
        }
        let excluded = match &report.estimate {
            Some(Ok(est)) => est.excluded_weeks.as_slice(),
            Some(Err(e)) => e.excluded_weeks(),
            None => &[],
        };
        for week in excluded {
            insert_excluded_week(&tx, &report.run_id, week)?;
        }
        tx.commit()?;
        log::debug!("study {} saved", report.run_id);
        Ok(())
    }
}

// Statement helpers shared by the store methods and `save_study`'s transaction.

fn insert_run(conn: &Connection, run_id: &str, seed: u64, version: &str, config: &SimulationConfig) -> SimResult<()> {
    conn.execute(
        "INSERT INTO run (run_id, seed, version, started_at, config_json) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            run_id,
            seed as i64,
            version,
            chrono::Utc::now().to_rfc3339(),
            serde_json::to_string(config)?,
        ],
    )?;
    Ok(())
}

fn insert_scenario_output(conn: &Connection, run_id: &str, batch: BatchKind, output: &ScenarioOutput) -> SimResult<()> {
    let daily = output.daily_average_shortage.map(|d| serde_json::to_string(&d)).transpose()?;
    let dist = output.attendance_distribution_pct.map(|d| serde_json::to_string(&d)).transpose()?;
    conn.execute(
        "INSERT INTO scenario_output (
            run_id, batch, scenario_name, overall_average_shortage, daily_average_shortage,
            attendance_distribution_pct, average_preference_deviation, error
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            run_id,
            batch.name(),
            &output.scenario_name,
            output.overall_average_shortage,
            daily,
            dist,
            output.average_preference_deviation,
            output.error.as_deref(),
        ],
    )?;
    Ok(())
}

fn insert_batch(conn: &Connection, run_id: &str, batch: &BatchReport) -> SimResult<()> {
    for output in &batch.outputs {
        insert_scenario_output(conn, run_id, batch.kind, output)?;
    }
    Ok(())
}

fn insert_excluded_week(conn: &Connection, run_id: &str, week: &ExcludedWeek) -> SimResult<()> {
    conn.execute(
        "INSERT INTO excluded_week (run_id, week_id, total_people, zero_attendance, reasons)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            run_id,
            &week.week_id,
            week.total_people as i64,
            week.zero_attendance as i64,
            serde_json::to_string(&week.reasons)?,
        ],
    )?;
    Ok(())
}
