use rusqlite::types::Type;
use rusqlite::{Connection, Error, OptionalExtension, Result, Row, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::models::{
    MATH_SUBJECT, Principal, Profile, QuestId, SubjectId, SubjectProgress,
};

/// db file path
pub fn db_path(data_dir: Option<&Path>) -> PathBuf {
    let data_dir = match data_dir {
        Some(dir) => dir.to_path_buf(),
        None => dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quizzy"),
    };
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::warn!("could not create {}: {}", data_dir.display(), e);
    }
    data_dir.join("quizzy.db")
}

/// open db + init tables
pub fn init_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS identities (
            principal TEXT PRIMARY KEY,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS auth_state (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            principal TEXT REFERENCES identities(principal)
        );

        INSERT OR IGNORE INTO auth_state (id, principal) VALUES (1, NULL);

        CREATE TABLE IF NOT EXISTS subjects (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );

        INSERT OR IGNORE INTO subjects (id, name) VALUES ('math', 'Mathematics');

        CREATE TABLE IF NOT EXISTS profiles (
            principal TEXT PRIMARY KEY REFERENCES identities(principal),
            display_name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS subject_progress (
            principal TEXT NOT NULL REFERENCES profiles(principal),
            subject_id TEXT NOT NULL REFERENCES subjects(id),
            level INTEGER NOT NULL DEFAULT 1,
            total_xp INTEGER NOT NULL DEFAULT 0,
            credits INTEGER NOT NULL DEFAULT 0,
            quests_completed INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (principal, subject_id)
        );

        CREATE TABLE IF NOT EXISTS quests (
            id INTEGER PRIMARY KEY,
            principal TEXT NOT NULL REFERENCES profiles(principal),
            subject_id TEXT NOT NULL REFERENCES subjects(id),
            difficulty INTEGER NOT NULL,
            content TEXT NOT NULL,
            answer INTEGER NOT NULL,
            xp_reward INTEGER NOT NULL,
            credit_reward INTEGER NOT NULL,
            completed BOOLEAN NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        ",
    )
}

/// quest as stored, content still serialized
#[derive(Debug, Clone)]
pub struct QuestRow {
    pub subject_id: SubjectId,
    pub difficulty: u32,
    pub content: String,
    pub answer: i64,
    pub xp_reward: u64,
    pub credit_reward: u64,
    pub completed: bool,
}

// sqlite integers are signed, XP and credits are kept as u64 in memory

fn to_sql_u64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|e| Error::ToSqlConversionFailure(Box::new(e)))
}

fn get_u64(row: &Row<'_>, idx: usize) -> Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|e| Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

// -- identities --

pub fn insert_identity(conn: &Connection, principal: &Principal, created_at: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO identities (principal, created_at) VALUES (?1, ?2)",
        params![principal.0, created_at],
    )?;
    Ok(())
}

/// most recently created identity on this device
pub fn latest_identity(conn: &Connection) -> Result<Option<Principal>> {
    conn.query_row(
        "SELECT principal FROM identities ORDER BY created_at DESC, rowid DESC LIMIT 1",
        [],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map(|p| p.map(Principal))
}

pub fn signed_in_principal(conn: &Connection) -> Result<Option<Principal>> {
    conn.query_row("SELECT principal FROM auth_state WHERE id = 1", [], |row| {
        row.get::<_, Option<String>>(0)
    })
    .map(|p| p.map(Principal))
}

pub fn set_signed_in(conn: &Connection, principal: Option<&Principal>) -> Result<()> {
    conn.execute(
        "UPDATE auth_state SET principal = ?1 WHERE id = 1",
        params![principal.map(|p| p.0.as_str())],
    )?;
    Ok(())
}

// -- profiles --

pub fn get_profile(conn: &Connection, principal: &Principal) -> Result<Option<Profile>> {
    let row = conn
        .query_row(
            "SELECT display_name, created_at FROM profiles WHERE principal = ?1",
            params![principal.0],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    let Some((display_name, created_at)) = row else {
        return Ok(None);
    };

    Ok(Some(Profile {
        principal: principal.clone(),
        display_name,
        subject_progress: get_subject_progress(conn, principal)?,
        created_at,
    }))
}

pub fn insert_profile(
    conn: &Connection,
    principal: &Principal,
    display_name: &str,
    created_at: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO profiles (principal, display_name, created_at) VALUES (?1, ?2, ?3)",
        params![principal.0, display_name, created_at],
    )?;
    insert_subject_progress(conn, principal, &SubjectProgress::new(SubjectId::from(MATH_SUBJECT)))
}

pub fn update_display_name(conn: &Connection, principal: &Principal, display_name: &str) -> Result<()> {
    conn.execute(
        "UPDATE profiles SET display_name = ?1 WHERE principal = ?2",
        params![display_name, principal.0],
    )?;
    Ok(())
}

/// case-insensitive, ignores `except`'s own name
pub fn display_name_taken(
    conn: &Connection,
    display_name: &str,
    except: Option<&Principal>,
) -> Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM profiles WHERE display_name = ?1 COLLATE NOCASE AND principal IS NOT ?2",
        params![display_name, except.map(|p| p.0.as_str())],
        |row| row.get::<_, u32>(0),
    )
    .map(|count| count > 0)
}

// -- subject progress --

pub fn get_subject_progress(conn: &Connection, principal: &Principal) -> Result<Vec<SubjectProgress>> {
    let mut stmt = conn.prepare(
        "SELECT subject_id, level, total_xp, credits, quests_completed
         FROM subject_progress
         WHERE principal = ?1
         ORDER BY subject_id",
    )?;

    let rows = stmt.query_map(params![principal.0], |row| {
        Ok(SubjectProgress {
            subject_id: SubjectId(row.get(0)?),
            level: row.get(1)?,
            total_xp: get_u64(row, 2)?,
            credits: get_u64(row, 3)?,
            quests_completed: row.get(4)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

pub fn insert_subject_progress(
    conn: &Connection,
    principal: &Principal,
    progress: &SubjectProgress,
) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO subject_progress (principal, subject_id, level, total_xp, credits, quests_completed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            principal.0,
            progress.subject_id.0,
            progress.level,
            to_sql_u64(progress.total_xp)?,
            to_sql_u64(progress.credits)?,
            progress.quests_completed,
        ],
    )?;
    Ok(())
}

pub fn update_subject_progress(
    conn: &Connection,
    principal: &Principal,
    progress: &SubjectProgress,
) -> Result<()> {
    conn.execute(
        "UPDATE subject_progress SET level = ?1, total_xp = ?2, credits = ?3, quests_completed = ?4
         WHERE principal = ?5 AND subject_id = ?6",
        params![
            progress.level,
            to_sql_u64(progress.total_xp)?,
            to_sql_u64(progress.credits)?,
            progress.quests_completed,
            principal.0,
            progress.subject_id.0,
        ],
    )?;
    Ok(())
}

// -- quests --

#[allow(clippy::too_many_arguments)]
pub fn insert_quest(
    conn: &Connection,
    principal: &Principal,
    subject_id: &SubjectId,
    difficulty: u32,
    content: &str,
    answer: i64,
    xp_reward: u64,
    credit_reward: u64,
    created_at: &str,
) -> Result<QuestId> {
    conn.execute(
        "INSERT INTO quests (principal, subject_id, difficulty, content, answer, xp_reward, credit_reward, completed, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
        params![
            principal.0,
            subject_id.0,
            difficulty,
            content,
            answer,
            to_sql_u64(xp_reward)?,
            to_sql_u64(credit_reward)?,
            created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// quest owned by `principal`
pub fn get_quest(conn: &Connection, principal: &Principal, id: QuestId) -> Result<Option<QuestRow>> {
    conn.query_row(
        "SELECT subject_id, difficulty, content, answer, xp_reward, credit_reward, completed
         FROM quests WHERE id = ?1 AND principal = ?2",
        params![id, principal.0],
        |row| {
            Ok(QuestRow {
                subject_id: SubjectId(row.get(0)?),
                difficulty: row.get(1)?,
                content: row.get(2)?,
                answer: row.get(3)?,
                xp_reward: get_u64(row, 4)?,
                credit_reward: get_u64(row, 5)?,
                completed: row.get(6)?,
            })
        },
    )
    .optional()
}

pub fn mark_quest_completed(conn: &Connection, id: QuestId) -> Result<()> {
    conn.execute("UPDATE quests SET completed = 1 WHERE id = ?1", params![id])?;
    Ok(())
}

// -- subjects --

pub fn subject_names(conn: &Connection, ids: &[SubjectId]) -> Result<HashMap<SubjectId, String>> {
    let mut stmt = conn.prepare("SELECT name FROM subjects WHERE id = ?1")?;
    let mut names = HashMap::new();
    for id in ids {
        let name = stmt
            .query_row(params![id.0], |row| row.get::<_, String>(0))
            .optional()?;
        if let Some(name) = name {
            names.insert(id.clone(), name);
        }
    }
    Ok(names)
}
