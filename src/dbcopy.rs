//! Database structure copier and inspector.
//!
//! `db clear` copies every database file under a source folder into a
//! target folder (same relative layout), then empties each user table and
//! resets its auto-increment counter, leaving an empty database with the
//! original structure. `db inspect` counts meaningful rows per table and
//! `db structure` lists each table's columns with their declared types.
//!
//! Storage access goes through [`DatabaseDriver`] / [`DatabaseConnection`];
//! [`SqliteDriver`] is the shipped implementation, built on `sqlx`.
//!
//! Encrypted files are opened with a password obtained from a
//! [`PasswordPrompt`]. The prompt is asked again after every rejected
//! password until it returns `None`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Connection, Row};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::progress::{ProgressEvent, ProgressReporter};

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("{0} is encrypted or the password is wrong")]
    PasswordRequired(PathBuf),
    #[error("{path}: {source}")]
    Sqlx {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An open database.
#[async_trait]
pub trait DatabaseConnection: Send {
    /// All table names, system tables included.
    async fn table_names(&mut self) -> Result<Vec<String>, DbError>;
    async fn columns(&mut self, table: &str) -> Result<Vec<String>, DbError>;
    /// Column definitions of `table`, in declaration order.
    async fn structure(&mut self, table: &str) -> Result<Vec<ColumnInfo>, DbError>;
    /// Delete every row; returns the number deleted.
    async fn clear_table(&mut self, table: &str) -> Result<u64, DbError>;
    /// Restart the table's auto-increment counter. A table without one is
    /// left alone.
    async fn reset_ids(&mut self, table: &str) -> Result<(), DbError>;
    /// Rows where at least one of `columns` holds something other than
    /// null, an empty string or `0`.
    async fn count_meaningful_rows(&mut self, table: &str, columns: &[String]) -> Result<i64, DbError>;
    async fn close(self: Box<Self>) -> Result<(), DbError>;
}

#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Open `path`. Must fail with [`DbError::PasswordRequired`] when the
    /// file cannot be read without (another) password.
    async fn connect(&self, path: &Path, password: Option<&str>) -> Result<Box<dyn DatabaseConnection>, DbError>;
}

/// Source of passwords for encrypted databases. `None` cancels.
pub trait PasswordPrompt: Send + Sync {
    fn ask(&self, path: &Path) -> Option<String>;
}

/// Reads a password line from stdin; an empty line cancels.
pub struct StdinPrompt;

impl PasswordPrompt for StdinPrompt {
    fn ask(&self, path: &Path) -> Option<String> {
        eprint!("Password for {} (leave blank to skip): ", path.display());
        let _ = std::io::stderr().flush();
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).ok()?;
        let pw = line.trim_end_matches(['\r', '\n']).to_string();
        (!pw.is_empty()).then_some(pw)
    }
}

/// Never supplies a password.
pub struct NoPrompt;

impl PasswordPrompt for NoPrompt {
    fn ask(&self, _path: &Path) -> Option<String> {
        None
    }
}

/// Connect without a password first, then keep asking until a password
/// works or the prompt cancels (`Ok(None)`).
pub async fn connect_with_password(
    driver: &dyn DatabaseDriver,
    path: &Path,
    prompt: &dyn PasswordPrompt,
) -> Result<Option<Box<dyn DatabaseConnection>>, DbError> {
    match driver.connect(path, None).await {
        Ok(conn) => return Ok(Some(conn)),
        Err(DbError::PasswordRequired(_)) => {}
        Err(e) => return Err(e),
    }
    loop {
        let Some(password) = prompt.ask(path) else {
            tracing::info!(path = %path.display(), "no password given, skipping");
            return Ok(None);
        };
        match driver.connect(path, Some(&password)).await {
            Ok(conn) => return Ok(Some(conn)),
            Err(DbError::PasswordRequired(_)) => {
                tracing::warn!(path = %path.display(), "password rejected");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Tables that belong to the user: not engine bookkeeping, not leftover
/// temporary tables.
pub fn is_user_table(name: &str) -> bool {
    !(name.starts_with("sqlite_") || name.starts_with("~TMP") || name.to_uppercase().contains("TMPCLP"))
}

pub async fn user_tables(conn: &mut dyn DatabaseConnection) -> Result<Vec<String>, DbError> {
    Ok(conn
        .table_names()
        .await?
        .into_iter()
        .filter(|t| is_user_table(t))
        .collect())
}

/// Empty every user table and reset its counter. Returns `(table, rows
/// deleted)` pairs.
pub async fn clear_data_and_reset_ids(conn: &mut dyn DatabaseConnection) -> Result<Vec<(String, u64)>, DbError> {
    let mut cleared = Vec::new();
    for table in user_tables(conn).await? {
        let rows = conn.clear_table(&table).await?;
        conn.reset_ids(&table).await?;
        tracing::debug!(table = %table, rows, "table cleared");
        cleared.push((table, rows));
    }
    Ok(cleared)
}

/// Database files under `root` whose name ends with one of `extensions`
/// (compared case-insensitively, leading dot optional).
pub fn find_databases(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let suffixes: Vec<String> = extensions
        .iter()
        .map(|e| {
            let e = e.trim().to_lowercase();
            if e.starts_with('.') {
                e
            } else {
                format!(".{}", e)
            }
        })
        .collect();

    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy().to_lowercase();
            suffixes.iter().any(|s| name.ends_with(s.as_str()))
        })
        .map(|e| e.into_path())
        .collect()
}

#[derive(Debug)]
pub struct ClearedDatabase {
    pub source: PathBuf,
    pub copy: PathBuf,
    pub tables: Vec<(String, u64)>,
}

#[derive(Debug, Default)]
pub struct ClearReport {
    pub cleared: Vec<ClearedDatabase>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Copy every database under `source` into `target` and clear the copies.
/// Originals are never opened for writing.
pub async fn process_folder(
    driver: &dyn DatabaseDriver,
    prompt: &dyn PasswordPrompt,
    source: &Path,
    target: &Path,
    extensions: &[String],
    reporter: &dyn ProgressReporter,
) -> Result<ClearReport> {
    anyhow::ensure!(source.is_dir(), "Not a directory: {}", source.display());
    let task = "db-clear";
    reporter.report(ProgressEvent::Scanning { task: task.into() });
    let files = find_databases(source, extensions);
    let total = files.len() as u64;

    let mut report = ClearReport::default();
    for (n, file) in files.into_iter().enumerate() {
        reporter.report(ProgressEvent::Working {
            task: task.into(),
            n: n as u64 + 1,
            total,
            item: file.display().to_string(),
        });
        let rel = file.strip_prefix(source).unwrap_or(&file);
        let copy = target.join(rel);
        match clear_copy(driver, prompt, &file, &copy).await {
            Ok(Some(tables)) => {
                tracing::info!(copy = %copy.display(), tables = tables.len(), "data cleared and ids reset");
                report.cleared.push(ClearedDatabase {
                    source: file,
                    copy,
                    tables,
                });
            }
            Ok(None) => report.skipped.push(file),
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %format!("{:#}", e), "database failed");
                report.failed.push((file, format!("{:#}", e)));
            }
        }
    }
    reporter.report(ProgressEvent::Finished {
        task: task.into(),
        total,
    });
    Ok(report)
}

async fn clear_copy(
    driver: &dyn DatabaseDriver,
    prompt: &dyn PasswordPrompt,
    file: &Path,
    copy: &Path,
) -> Result<Option<Vec<(String, u64)>>> {
    if let Some(parent) = copy.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::copy(file, copy).with_context(|| format!("Failed to copy {}", file.display()))?;

    // A copy that was not cleared still holds the source's rows.
    let outcome = clear_in_place(driver, prompt, copy).await;
    if !matches!(outcome, Ok(Some(_))) {
        match std::fs::remove_file(copy) {
            Ok(()) => tracing::info!(copy = %copy.display(), "uncleared copy removed"),
            Err(e) => tracing::warn!(copy = %copy.display(), error = %e, "uncleared copy left in place"),
        }
    }
    outcome
}

async fn clear_in_place(
    driver: &dyn DatabaseDriver,
    prompt: &dyn PasswordPrompt,
    copy: &Path,
) -> Result<Option<Vec<(String, u64)>>> {
    let Some(mut conn) = connect_with_password(driver, copy, prompt).await? else {
        return Ok(None);
    };
    let tables = clear_data_and_reset_ids(conn.as_mut()).await?;
    conn.close().await?;
    Ok(Some(tables))
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TableStats {
    pub name: String,
    pub rows: i64,
    pub columns: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Inspection {
    pub path: PathBuf,
    pub tables: Vec<TableStats>,
}

impl Inspection {
    pub fn total_rows(&self) -> i64 {
        self.tables.iter().map(|t| t.rows).sum()
    }

    pub fn total_columns(&self) -> usize {
        self.tables.iter().map(|t| t.columns).sum()
    }

    pub fn render(&self) -> String {
        let width = self.tables.iter().map(|t| t.name.len()).max().unwrap_or(5).max(5);
        let mut out = format!("{}\n", self.path.display());
        out.push_str(&format!("  {:<width$}  {:>7}  {:>7}\n", "Table", "Rows", "Columns"));
        for t in &self.tables {
            out.push_str(&format!("  {:<width$}  {:>7}  {:>7}\n", t.name, t.rows, t.columns));
        }
        out.push_str(&format!(
            "  {:<width$}  {:>7}  {:>7}\n",
            "Total",
            self.total_rows(),
            self.total_columns()
        ));
        out
    }
}

/// Row and column counts for each user table of one database. A table
/// whose columns cannot be read is reported with zeros.
pub async fn inspect(conn: &mut dyn DatabaseConnection, path: &Path) -> Result<Inspection, DbError> {
    let mut tables = Vec::new();
    for name in user_tables(conn).await? {
        let columns = match conn.columns(&name).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(table = %name, error = %e, "could not read columns");
                Vec::new()
            }
        };
        let data_columns: Vec<String> = columns
            .iter()
            .filter(|c| !c.eq_ignore_ascii_case("id"))
            .cloned()
            .collect();
        let rows = match conn.count_meaningful_rows(&name, &data_columns).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(table = %name, error = %e, "row count failed");
                0
            }
        };
        tables.push(TableStats {
            name,
            rows,
            columns: columns.len(),
        });
    }
    Ok(Inspection {
        path: path.to_path_buf(),
        tables,
    })
}

/// Inspect one database file, or every database under a folder.
pub async fn inspect_path(
    driver: &dyn DatabaseDriver,
    prompt: &dyn PasswordPrompt,
    path: &Path,
    extensions: &[String],
) -> Result<Vec<Inspection>> {
    let files = if path.is_dir() {
        find_databases(path, extensions)
    } else {
        vec![path.to_path_buf()]
    };
    let mut out = Vec::new();
    for file in files {
        let Some(mut conn) = connect_with_password(driver, &file, prompt).await? else {
            continue;
        };
        let inspection = inspect(conn.as_mut(), &file).await?;
        conn.close().await?;
        out.push(inspection);
    }
    Ok(out)
}

/// One column as declared in the schema.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    /// The first number in parentheses, as in `VARCHAR(50)`.
    pub size: Option<u32>,
    pub primary_key: bool,
}

const TEXT_SIZE_LIMIT: u32 = 255;

impl ColumnInfo {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, primary_key: bool) -> Self {
        let declared_type = declared_type.into();
        let size = declared_size(&declared_type);
        Self {
            name: name.into(),
            declared_type,
            size,
            primary_key,
        }
    }

    /// Office-style field kind for the declared type.
    pub fn kind(&self) -> &'static str {
        let t = self.declared_type.to_uppercase();
        let has = |parts: &[&str]| parts.iter().any(|p| t.contains(p));
        if self.primary_key && t.contains("INT") {
            "AutoNumber"
        } else if has(&["BOOL", "BIT"]) {
            "Yes/No"
        } else if has(&["CHAR", "TEXT", "CLOB"]) {
            match self.size {
                Some(n) if n <= TEXT_SIZE_LIMIT => "Short Text",
                _ => "Long Text",
            }
        } else if has(&["DATE", "TIME"]) {
            "Date/Time"
        } else if has(&["INT", "REAL", "NUM", "DEC", "FLOA", "DOUB"]) {
            "Number"
        } else {
            "Unknown Type"
        }
    }
}

fn declared_size(declared_type: &str) -> Option<u32> {
    let (_, rest) = declared_type.split_once('(')?;
    let digits: String = rest.trim_start().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TableStructure {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseStructure {
    pub path: PathBuf,
    pub tables: Vec<TableStructure>,
}

impl DatabaseStructure {
    pub fn render(&self) -> String {
        let mut out = format!("{}\n", self.path.display());
        for table in &self.tables {
            out.push_str(&format!("  {}\n", table.name));
            for c in &table.columns {
                out.push_str(&format!("    - {} -> {} [{}]\n", c.name, c.kind(), c.declared_type));
            }
        }
        out
    }
}

/// Column layout of each user table, or only of `table` when given (name
/// compared case-insensitively).
pub async fn structure(
    conn: &mut dyn DatabaseConnection,
    path: &Path,
    table: Option<&str>,
) -> Result<DatabaseStructure, DbError> {
    let mut tables = Vec::new();
    for name in user_tables(conn).await? {
        if table.is_some_and(|t| !t.eq_ignore_ascii_case(&name)) {
            continue;
        }
        let columns = conn.structure(&name).await?;
        tables.push(TableStructure { name, columns });
    }
    if let Some(t) = table.filter(|_| tables.is_empty()) {
        tracing::warn!(path = %path.display(), table = t, "table not found");
    }
    Ok(DatabaseStructure {
        path: path.to_path_buf(),
        tables,
    })
}

/// Structure of one database file, or of every database under a folder.
pub async fn structure_path(
    driver: &dyn DatabaseDriver,
    prompt: &dyn PasswordPrompt,
    path: &Path,
    extensions: &[String],
    table: Option<&str>,
) -> Result<Vec<DatabaseStructure>> {
    let files = if path.is_dir() {
        find_databases(path, extensions)
    } else {
        vec![path.to_path_buf()]
    };
    let mut out = Vec::new();
    for file in files {
        let Some(mut conn) = connect_with_password(driver, &file, prompt).await? else {
            continue;
        };
        let found = structure(conn.as_mut(), &file, table).await?;
        conn.close().await?;
        out.push(found);
    }
    Ok(out)
}

// ═══════════════════════════════════════════════════════════════════════
// SQLite
// ═══════════════════════════════════════════════════════════════════════

/// SQLite files via `sqlx`. A password is passed as `PRAGMA key`, which
/// only has an effect on SQLCipher builds.
pub struct SqliteDriver;

struct SqliteDb {
    path: PathBuf,
    conn: SqliteConnection,
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn is_not_a_database(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some("26") || db.message().contains("file is not a database")
        }
        _ => false,
    }
}

fn classify(path: &Path, e: sqlx::Error) -> DbError {
    if is_not_a_database(&e) {
        DbError::PasswordRequired(path.to_path_buf())
    } else {
        DbError::Sqlx {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    async fn connect(&self, path: &Path, password: Option<&str>) -> Result<Box<dyn DatabaseConnection>, DbError> {
        let mut options = SqliteConnectOptions::new().filename(path).create_if_missing(false);
        if let Some(pw) = password {
            options = options.pragma("key", pw.to_string());
        }
        let mut conn = SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| classify(path, e))?;

        // An encrypted or foreign file only fails on first read.
        sqlx::query_scalar::<_, i64>("SELECT count(*) FROM sqlite_master")
            .fetch_one(&mut conn)
            .await
            .map_err(|e| classify(path, e))?;

        Ok(Box::new(SqliteDb {
            path: path.to_path_buf(),
            conn,
        }))
    }
}

#[async_trait]
impl DatabaseConnection for SqliteDb {
    async fn table_names(&mut self) -> Result<Vec<String>, DbError> {
        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| classify(&self.path, e))?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("name"))
            .collect::<Result<_, _>>()
            .map_err(|e| classify(&self.path, e))
    }

    async fn columns(&mut self, table: &str) -> Result<Vec<String>, DbError> {
        let sql = format!("PRAGMA table_info({})", quote_ident(table));
        let rows = sqlx::query(&sql)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| classify(&self.path, e))?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("name"))
            .collect::<Result<_, _>>()
            .map_err(|e| classify(&self.path, e))
    }

    async fn structure(&mut self, table: &str) -> Result<Vec<ColumnInfo>, DbError> {
        let sql = format!("PRAGMA table_info({})", quote_ident(table));
        let rows = sqlx::query(&sql)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| classify(&self.path, e))?;
        rows.iter()
            .map(|r| -> Result<ColumnInfo, sqlx::Error> {
                let name: String = r.try_get("name")?;
                let declared: String = r.try_get("type")?;
                let pk: i64 = r.try_get("pk")?;
                Ok(ColumnInfo::new(name, declared, pk > 0))
            })
            .collect::<Result<_, _>>()
            .map_err(|e| classify(&self.path, e))
    }

    async fn clear_table(&mut self, table: &str) -> Result<u64, DbError> {
        let sql = format!("DELETE FROM {}", quote_ident(table));
        let done = sqlx::query(&sql)
            .execute(&mut self.conn)
            .await
            .map_err(|e| classify(&self.path, e))?;
        Ok(done.rows_affected())
    }

    async fn reset_ids(&mut self, table: &str) -> Result<(), DbError> {
        let has_sequence: i64 =
            sqlx::query_scalar("SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'")
                .fetch_one(&mut self.conn)
                .await
                .map_err(|e| classify(&self.path, e))?;
        if has_sequence == 0 {
            return Ok(());
        }
        sqlx::query("DELETE FROM sqlite_sequence WHERE name = ?")
            .bind(table)
            .execute(&mut self.conn)
            .await
            .map_err(|e| classify(&self.path, e))?;
        Ok(())
    }

    async fn count_meaningful_rows(&mut self, table: &str, columns: &[String]) -> Result<i64, DbError> {
        let mut sql = format!("SELECT count(*) FROM {}", quote_ident(table));
        if !columns.is_empty() {
            let conditions: Vec<String> = columns
                .iter()
                .map(|c| format!("COALESCE(CAST({} AS TEXT), '') NOT IN ('', '0')", quote_ident(c)))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" OR "));
        }
        sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| classify(&self.path, e))
    }

    async fn close(self: Box<Self>) -> Result<(), DbError> {
        let SqliteDb { path, conn } = *self;
        conn.close().await.map_err(|e| classify(&path, e))
    }
}
