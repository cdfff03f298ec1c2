//! Read-only handle to the SQLite transactions database.

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Rows returned by a single query before the result is cut off.
pub const MAX_RESULT_ROWS: usize = 100;

/// Sample rows shown per table in schema descriptions.
const SAMPLE_ROWS: usize = 3;

/// Shared, read-only SQLite connection.
///
/// `rusqlite::Connection` is `Send` but not `Sync`; the mutex serialises
/// statements so the handle can be cloned into blocking tasks.
#[derive(Debug, Clone)]
pub struct SqlDatabase {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

/// Tabular query result rendered as text for the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// True when more than [`MAX_RESULT_ROWS`] rows matched.
    pub truncated: bool,
}

impl fmt::Display for QueryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return f.write_str("Statement executed; it returned no columns.");
        }
        if self.rows.is_empty() {
            return write!(f, "{}\n(no rows)", self.columns.join("\t"));
        }

        writeln!(f, "{}", self.columns.join("\t"))?;
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(&row.join("\t"))?;
        }
        if self.truncated {
            write!(
                f,
                "\n(showing the first {MAX_RESULT_ROWS} rows; add a LIMIT or aggregate to narrow the result)"
            )?;
        }
        Ok(())
    }
}

impl SqlDatabase {
    /// Open `path` read-only. The file must already exist.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Database '{}' not found", path.display());
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open database '{}'", path.display()))?;

        tracing::debug!(path = %path.display(), "opened transactions database");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dialect(&self) -> &'static str {
        "sqlite"
    }

    /// User tables, sorted by name.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// `CREATE` statement plus a few sample rows for each requested table.
    pub fn table_info(&self, tables: &[String]) -> Result<String> {
        let known = self.table_names()?;
        let missing: Vec<&str> = tables
            .iter()
            .map(String::as_str)
            .filter(|t| !known.iter().any(|k| k == t))
            .collect();
        if !missing.is_empty() {
            bail!("table_names {{{}}} not found in database", missing.join(", "));
        }

        let mut sections = Vec::with_capacity(tables.len());
        for table in tables {
            let create_sql: String = {
                let conn = self.conn.lock();
                conn.query_row(
                    "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    params![table],
                    |row| row.get(0),
                )?
            };
            let sample = self.run_limited(
                &format!("SELECT * FROM {} LIMIT {SAMPLE_ROWS}", quote_identifier(table)),
                SAMPLE_ROWS,
            )?;
            sections.push(format!(
                "{}\n\n/*\n{SAMPLE_ROWS} rows from {table} table:\n{}\n*/",
                create_sql.trim(),
                sample
            ));
        }
        Ok(sections.join("\n\n"))
    }

    /// Run one SQL statement and collect up to [`MAX_RESULT_ROWS`] rows.
    pub fn run(&self, sql: &str) -> Result<QueryOutput> {
        self.run_limited(sql, MAX_RESULT_ROWS)
    }

    fn run_limited(&self, sql: &str, max_rows: usize) -> Result<QueryOutput> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = columns.len();

        let mut rows = stmt.query([])?;
        let mut collected = Vec::new();
        let mut truncated = false;
        while let Some(row) = rows.next()? {
            if collected.len() == max_rows {
                truncated = true;
                break;
            }
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(render_value(row.get_ref(i)?));
            }
            collected.push(values);
        }

        Ok(QueryOutput {
            columns,
            rows: collected,
            truncated,
        })
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => r.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
