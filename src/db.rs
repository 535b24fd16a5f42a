use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    Acceptance, AssignmentLabel, RosterSnapshot, StatusTier, StudentRecord,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query("CREATE SCHEMA IF NOT EXISTS score_rating")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS score_rating.assignments (
            idx INTEGER PRIMARY KEY,
            label TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS score_rating.students (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            position_rank INTEGER NOT NULL,
            percent DOUBLE PRECISION NOT NULL,
            status TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS score_rating.results (
            student_id UUID NOT NULL REFERENCES score_rating.students(id) ON DELETE CASCADE,
            assignment_idx INTEGER NOT NULL REFERENCES score_rating.assignments(idx) ON DELETE CASCADE,
            code SMALLINT,
            raw_note TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (student_id, assignment_idx)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn code_for(acceptance: Acceptance) -> Option<i16> {
    match acceptance {
        Acceptance::Accepted => Some(1),
        Acceptance::NotAccepted => Some(0),
        Acceptance::NoSubmission => None,
    }
}

fn acceptance_for(code: Option<i16>) -> Acceptance {
    match code {
        Some(1) => Acceptance::Accepted,
        Some(0) => Acceptance::NotAccepted,
        _ => Acceptance::NoSubmission,
    }
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let labels = ["HW01", "HW02", "HW03"];
    let students = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Avery Lee",
            1,
            100.0,
            StatusTier::Good,
            ["1", "1", "1"],
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Jules Moreno",
            2,
            33.3,
            StatusTier::Mid,
            ["1", "0", ""],
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Kiara Patel",
            3,
            33.3,
            StatusTier::Mid,
            ["", "1", "0"],
        ),
        (
            Uuid::parse_str("7b2f9c41-5d36-4e0a-9f1d-8a4c2e6b0d93")?,
            "Rowan Smith",
            4,
            0.0,
            StatusTier::Low,
            ["0", "", "0"],
        ),
    ];

    let mut tx = pool.begin().await?;

    for (idx, label) in labels.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO score_rating.assignments (idx, label)
            VALUES ($1, $2)
            ON CONFLICT (idx) DO UPDATE SET label = EXCLUDED.label
            "#,
        )
        .bind(idx as i32)
        .bind(label)
        .execute(&mut *tx)
        .await?;
    }

    for (id, name, position_rank, percent, status, cells) in students {
        sqlx::query(
            r#"
            INSERT INTO score_rating.students (id, name, position_rank, percent, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO UPDATE
            SET position_rank = EXCLUDED.position_rank,
                percent = EXCLUDED.percent,
                status = EXCLUDED.status
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(position_rank)
        .bind(percent)
        .bind(status.as_str())
        .execute(&mut *tx)
        .await?;

        for (idx, raw) in cells.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO score_rating.results (student_id, assignment_idx, code, raw_note)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (student_id, assignment_idx) DO UPDATE
                SET code = EXCLUDED.code, raw_note = EXCLUDED.raw_note
                "#,
            )
            .bind(id)
            .bind(idx as i32)
            .bind(code_for(Acceptance::parse_cell(raw)))
            .bind(*raw)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Replaces the stored roster wholesale from a spreadsheet-shaped CSV. The
/// first four columns are `name,position_rank,percent,status`; every
/// remaining column is one assignment label with a raw result cell. Returns
/// (students imported, assignments found).
pub async fn import_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<(usize, usize)> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;

    let headers = reader.headers()?.clone();
    anyhow::ensure!(
        headers.len() >= 4,
        "expected at least the columns name,position_rank,percent,status"
    );
    let labels: Vec<String> = headers.iter().skip(4).map(str::to_string).collect();

    struct ImportRow {
        name: String,
        position_rank: i32,
        percent: f64,
        status: StatusTier,
        cells: Vec<String>,
    }

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or("").trim().to_string();
        let name = field(0);
        if name.is_empty() {
            continue;
        }
        let position_rank = field(1)
            .parse::<i32>()
            .with_context(|| format!("row {}: bad position_rank", line + 2))?;
        let percent = field(2)
            .parse::<f64>()
            .with_context(|| format!("row {}: bad percent", line + 2))?;
        let status = StatusTier::from_str(&field(3))
            .with_context(|| format!("row {}: bad status", line + 2))?;
        let cells: Vec<String> = (0..labels.len()).map(|i| field(4 + i)).collect();
        rows.push(ImportRow {
            name,
            position_rank,
            percent,
            status,
            cells,
        });
    }

    let mut tx = pool.begin().await?;

    // Snapshot lifecycle: the previous roster is dropped in the same
    // transaction, so readers only ever see one complete version.
    sqlx::query("DELETE FROM score_rating.results")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM score_rating.students")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM score_rating.assignments")
        .execute(&mut *tx)
        .await?;

    for (idx, label) in labels.iter().enumerate() {
        sqlx::query("INSERT INTO score_rating.assignments (idx, label) VALUES ($1, $2)")
            .bind(idx as i32)
            .bind(label)
            .execute(&mut *tx)
            .await?;
    }

    let imported = rows.len();
    for row in rows {
        let student_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO score_rating.students (id, name, position_rank, percent, status)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(student_id)
        .bind(&row.name)
        .bind(row.position_rank)
        .bind(row.percent)
        .bind(row.status.as_str())
        .execute(&mut *tx)
        .await?;

        for (idx, raw) in row.cells.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO score_rating.results (student_id, assignment_idx, code, raw_note)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(student_id)
            .bind(idx as i32)
            .bind(code_for(Acceptance::parse_cell(raw)))
            .bind(raw)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok((imported, labels.len()))
}

/// Assembles the current roster snapshot: ordered assignment labels, students
/// in upstream rank order, and the full-roster acceptance-count histogram.
pub async fn fetch_snapshot(pool: &PgPool) -> anyhow::Result<RosterSnapshot> {
    let label_rows = sqlx::query("SELECT idx, label FROM score_rating.assignments ORDER BY idx")
        .fetch_all(pool)
        .await?;
    let assignment_labels: Vec<AssignmentLabel> = label_rows
        .iter()
        .map(|row| AssignmentLabel {
            label: row.get("label"),
        })
        .collect();
    let hw_count = assignment_labels.len();

    let student_rows = sqlx::query(
        r#"
        SELECT id, name, position_rank, percent, status
        FROM score_rating.students
        ORDER BY position_rank, name
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut students = Vec::with_capacity(student_rows.len());
    let mut index_by_id: HashMap<Uuid, usize> = HashMap::new();
    for row in student_rows {
        let id: Uuid = row.get("id");
        let status: String = row.get("status");
        let position_rank: i32 = row.get("position_rank");
        index_by_id.insert(id, students.len());
        students.push(StudentRecord {
            name: row.get("name"),
            per_assignment: vec![Acceptance::NoSubmission; hw_count],
            per_assignment_raw: vec![String::new(); hw_count],
            accepted: 0,
            percent: row.get("percent"),
            status: StatusTier::from_str(&status)
                .with_context(|| format!("stored status for student {id}"))?,
            position_rank: position_rank as u32,
        });
    }

    let result_rows = sqlx::query(
        "SELECT student_id, assignment_idx, code, raw_note FROM score_rating.results",
    )
    .fetch_all(pool)
    .await?;

    for row in result_rows {
        let student_id: Uuid = row.get("student_id");
        let assignment_idx: i32 = row.get("assignment_idx");
        let code: Option<i16> = row.get("code");
        let Some(&student_index) = index_by_id.get(&student_id) else {
            continue;
        };
        let student = &mut students[student_index];
        let idx = assignment_idx as usize;
        if idx < hw_count {
            student.per_assignment[idx] = acceptance_for(code);
            student.per_assignment_raw[idx] = row.get("raw_note");
        }
    }

    let mut histogram: BTreeMap<usize, usize> = BTreeMap::new();
    for student in &mut students {
        student.accepted = student
            .per_assignment
            .iter()
            .filter(|a| a.is_accepted())
            .count();
        *histogram.entry(student.accepted).or_insert(0) += 1;
    }

    Ok(RosterSnapshot {
        generated_at: Utc::now(),
        assignment_labels,
        students,
        histogram,
    })
}
