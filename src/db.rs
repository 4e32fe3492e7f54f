use rusqlite::Connection;
use std::path::Path;

pub fn open_db(path: &Path) -> anyhow::Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub const SKILL_TABLES: [&str; 7] = [
    "speaking_scores",
    "listening_scores",
    "reading_scores",
    "writing_scores",
    "grammar_scores",
    "pronunciation_scores",
    "chatbot_scores",
];

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS organization_members(
            user_id TEXT NOT NULL,
            organization_code TEXT NOT NULL,
            organization_name TEXT NOT NULL,
            PRIMARY KEY(user_id, organization_code)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_org_members_code ON organization_members(organization_code)",
        [],
    )?;

    // One table per skill area. The payload column carries the skill-specific
    // JSON blob (evaluation rubric, question-level results, conversation reference).
    for table in SKILL_TABLES {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {}(
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    task_id TEXT NOT NULL,
                    score REAL NOT NULL,
                    payload TEXT,
                    created_at TEXT NOT NULL
                )",
                table
            ),
            [],
        )?;
        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{t}_user ON {t}(user_id)",
                t = table
            ),
            [],
        )?;
        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{t}_created ON {t}(created_at)",
                t = table
            ),
            [],
        )?;
    }

    conn.execute(
        "CREATE TABLE IF NOT EXISTS conversation_messages(
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            task_id TEXT NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_conversation_messages_user_task
         ON conversation_messages(user_id, task_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS task_completions(
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            task_id TEXT NOT NULL,
            course_id TEXT NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 1,
            completed_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_task_completions_user ON task_completions(user_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollments(
            id TEXT PRIMARY KEY,
            student_email TEXT NOT NULL,
            course_id TEXT NOT NULL,
            organization_code TEXT NOT NULL,
            class_id TEXT,
            status TEXT NOT NULL,
            invitation_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    ensure_enrollments_class_id(conn)?;
    // The pre-insert existence check is advisory; this index is what actually
    // prevents duplicate enrollments under racing requests.
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_enrollments_unique
         ON enrollments(student_email, course_id, organization_code)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_email ON enrollments(student_email)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_org ON enrollments(organization_code)",
        [],
    )?;

    Ok(())
}

fn ensure_enrollments_class_id(conn: &Connection) -> anyhow::Result<()> {
    // Early deployments created enrollments without class_id.
    if table_has_column(conn, "enrollments", "class_id")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE enrollments ADD COLUMN class_id TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
