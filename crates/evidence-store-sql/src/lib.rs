//! # evidence-store-sql
//!
//! The transactional table backend (§4.8): one relational table per
//! container type, a metadata table carrying the on-disk format version,
//! a buffered write path, and predicate pushdown into `WHERE` clauses via
//! `evidence_store_filter::sql`, backed by `rusqlite`.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};

use evidence_store_backend::{ReadCache, SequenceCounters, Store};
use evidence_store_core::codec::{RowStorageType, RowValue};
use evidence_store_core::registry::{container_registry, data_type_registry, Encoding};
use evidence_store_core::{Container, ContainerIdentifier, ContainerTypeName, SchemaDefinition, StoreError};
use evidence_store_filter::ast::Expr;
use evidence_store_filter::eval::matches;
use evidence_store_filter::sql::{translate, SqlColumn, SqlParam};
use evidence_store_profiler::{NullProfiler, StoreProfiler};

const META_TABLE: &str = "__evidence_store_meta__";
const IDENTIFIER_COLUMN: &str = "_identifier";

/// On-disk format version written by this release, dated YYYYMMDD per
/// §6's versioning convention (mirroring the original store's
/// `_FORMAT_VERSION = 20221023`-style constant).
const FORMAT: i64 = 20230312;
/// Lowest stored version this release will open read-write (possibly
/// upgrading it to [`FORMAT`] on clean close).
const APPEND_COMPATIBLE_FLOOR: i64 = 20221023;
/// Lowest stored version, within the append-compatible band, that this
/// release actually rewrites to [`FORMAT`] on close rather than leaving as
/// found. Currently coincides with [`APPEND_COMPATIBLE_FLOOR`]: every
/// append-compatible version this release can open is also one it upgrades.
const UPGRADE_COMPATIBLE_FLOOR: i64 = 20221023;
/// Lowest stored version this release will open at all (read-only).
const READ_COMPATIBLE_FLOOR: i64 = 20211121;

/// How an open request against a given stored format version should be
/// handled, per the compatibility policy in §4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compatibility {
    AsRequested,
    ReadWriteMayUpgrade { upgrade_on_close: bool },
    ReadOnlyOnly,
}

fn classify_with(
    stored: i64,
    format: i64,
    append_floor: i64,
    upgrade_floor: i64,
    read_floor: i64,
) -> Result<Compatibility, StoreError> {
    if stored == format {
        Ok(Compatibility::AsRequested)
    } else if stored >= append_floor && stored < format {
        Ok(Compatibility::ReadWriteMayUpgrade {
            upgrade_on_close: stored >= upgrade_floor,
        })
    } else if stored >= read_floor && stored < append_floor {
        Ok(Compatibility::ReadOnlyOnly)
    } else {
        Err(StoreError::IncompatibleFormat {
            stored_version: stored,
            minimum_readable: read_floor,
        })
    }
}

fn classify(stored: i64) -> Result<Compatibility, StoreError> {
    classify_with(
        stored,
        FORMAT,
        APPEND_COMPATIBLE_FLOOR,
        UPGRADE_COMPATIBLE_FLOOR,
        READ_COMPATIBLE_FLOOR,
    )
}

fn sql_err(e: rusqlite::Error) -> StoreError {
    tracing::error!(error = %e, "sqlite backend operation failed");
    StoreError::Backend {
        message: e.to_string(),
    }
}

/// Maximum number of buffered write operations before an implicit flush.
const FLUSH_THRESHOLD: usize = 500;

#[derive(Debug, Clone)]
enum PendingOp {
    Insert {
        identifier: String,
        columns: Vec<(String, SqlValue)>,
    },
    Update {
        identifier: String,
        columns: Vec<(String, SqlValue)>,
    },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum State {
    Closed,
    OpenRw,
    OpenRo,
}

/// The `rusqlite`-backed transactional table store.
///
/// Each container type gets its own table (created lazily on first
/// insert), named after the type, with one typed column per schema field
/// plus a text primary key `_identifier` holding the canonical identifier
/// string. Writes are buffered in memory and flushed in a single
/// transaction on threshold, on close, or before the next read against the
/// same type.
pub struct SqliteBackend {
    state: State,
    conn: Option<Connection>,
    counters: SequenceCounters,
    recovered: HashSet<String>,
    known_tables: HashSet<String>,
    pending: HashMap<String, Vec<PendingOp>>,
    pending_count: usize,
    upgrade_on_close: bool,
    cache: ReadCache,
    profiler: Box<dyn StoreProfiler>,
}

impl SqliteBackend {
    pub fn new() -> Self {
        Self {
            state: State::Closed,
            conn: None,
            counters: SequenceCounters::new(),
            recovered: HashSet::new(),
            known_tables: HashSet::new(),
            pending: HashMap::new(),
            pending_count: 0,
            upgrade_on_close: false,
            cache: ReadCache::default(),
            profiler: Box::new(NullProfiler),
        }
    }

    fn require_open(&self, operation: &str) -> Result<&Connection, StoreError> {
        self.conn.as_ref().ok_or_else(|| StoreError::NotOpen {
            operation: operation.to_string(),
        })
    }

    fn require_writable(&self, operation: &str) -> Result<&Connection, StoreError> {
        if self.state != State::OpenRw {
            return Err(StoreError::NotOpen {
                operation: operation.to_string(),
            });
        }
        self.require_open(operation)
    }

    fn open_metadata(&mut self) -> Result<(), StoreError> {
        let conn = self.conn.as_ref().expect("connection just established");
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{META_TABLE}\" (key TEXT PRIMARY KEY, value TEXT NOT NULL)"
        ))
        .map_err(sql_err)?;
        let stored: Option<i64> = conn
            .query_row(
                &format!("SELECT value FROM \"{META_TABLE}\" WHERE key = 'format_version'"),
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(sql_err)?
            .map(|s| s.parse::<i64>().map_err(|_| StoreError::Backend {
                message: format!("malformed stored format_version '{s}'"),
            }))
            .transpose()?;

        match stored {
            None => {
                conn.execute(
                    &format!(
                        "INSERT INTO \"{META_TABLE}\" (key, value) VALUES ('format_version', ?1), ('serialization_format', 'json')"
                    ),
                    [FORMAT.to_string()],
                )
                .map_err(sql_err)?;
                self.upgrade_on_close = false;
            }
            Some(version) => match classify(version)? {
                Compatibility::AsRequested => {
                    self.upgrade_on_close = false;
                }
                Compatibility::ReadWriteMayUpgrade { upgrade_on_close } => {
                    if self.state == State::OpenRo {
                        return Err(StoreError::IncompatibleFormat {
                            stored_version: version,
                            minimum_readable: READ_COMPATIBLE_FLOOR,
                        });
                    }
                    if upgrade_on_close {
                        tracing::warn!(
                            stored_version = version,
                            target_version = FORMAT,
                            "opened an older compatible format version, will upgrade on close"
                        );
                    }
                    self.upgrade_on_close = upgrade_on_close;
                }
                Compatibility::ReadOnlyOnly => {
                    if self.state == State::OpenRw {
                        return Err(StoreError::IncompatibleFormat {
                            stored_version: version,
                            minimum_readable: READ_COMPATIBLE_FLOOR,
                        });
                    }
                    self.upgrade_on_close = false;
                }
            },
        }

        let existing: HashSet<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
            .map_err(sql_err)?
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(sql_err)?
            .collect::<Result<_, _>>()
            .map_err(sql_err)?;
        self.known_tables = existing;
        self.known_tables.remove(META_TABLE);
        Ok(())
    }

    fn table_exists(&self, type_name: &str) -> bool {
        self.known_tables.contains(type_name)
    }

    fn schema_for(&self, type_name: &str) -> Result<std::sync::Arc<SchemaDefinition>, StoreError> {
        container_registry::global().lock().unwrap().schema(type_name)
    }

    fn ensure_table(&mut self, type_name: &str) -> Result<(), StoreError> {
        if self.known_tables.contains(type_name) {
            return Ok(());
        }
        let schema = self.schema_for(type_name)?;
        let types = data_type_registry::global().lock().unwrap();
        let mut columns = vec![format!("\"{IDENTIFIER_COLUMN}\" TEXT PRIMARY KEY")];
        for field in &schema.fields {
            let codec = types
                .serializer(field.logical_type.as_str(), Encoding::Row)
                .ok_or_else(|| StoreError::UnknownLogicalType {
                    logical_type: field.logical_type.to_string(),
                })?;
            let sql_type = match codec.row_storage_type() {
                RowStorageType::Integer => "INTEGER",
                RowStorageType::Text => "TEXT",
            };
            columns.push(format!("\"{}\" {sql_type}", field.name));
        }
        drop(types);
        let ddl = format!("CREATE TABLE \"{type_name}\" ({})", columns.join(", "));
        let conn = self.conn.as_ref().ok_or_else(|| StoreError::NotOpen {
            operation: "ensure_table".to_string(),
        })?;
        conn.execute(&ddl, []).map_err(sql_err)?;
        self.known_tables.insert(type_name.to_string());
        Ok(())
    }

    fn ensure_recovered(&mut self, type_name: &str) -> Result<(), StoreError> {
        if self.recovered.contains(type_name) {
            return Ok(());
        }
        self.flush_pending()?;
        let count = if self.table_exists(type_name) {
            let conn = self.require_open("open")?;
            conn.query_row(&format!("SELECT COUNT(*) FROM \"{type_name}\""), [], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(sql_err)? as u64
        } else {
            0
        };
        self.counters.recover(type_name, count);
        self.recovered.insert(type_name.to_string());
        Ok(())
    }

    fn encode_row(&self, container: &Container) -> Result<Vec<(String, SqlValue)>, StoreError> {
        let types = data_type_registry::global().lock().unwrap();
        let mut columns = Vec::new();
        for field in &container.schema().fields {
            let value = container
                .get(field.name.as_str())
                .expect("field declared on schema must be addressable");
            if value.is_absent() {
                columns.push((field.name.to_string(), SqlValue::Null));
                continue;
            }
            let codec = types
                .serializer(field.logical_type.as_str(), Encoding::Row)
                .ok_or_else(|| StoreError::UnknownLogicalType {
                    logical_type: field.logical_type.to_string(),
                })?;
            let row_value = match codec.row_encode(value)? {
                RowValue::Integer(i) => SqlValue::Integer(i),
                RowValue::Text(s) => SqlValue::Text(s),
            };
            columns.push((field.name.to_string(), row_value));
        }
        Ok(columns)
    }

    fn decode_row(&self, row: &Row<'_>, schema: &SchemaDefinition) -> Result<Container, StoreError> {
        let containers = container_registry::global().lock().unwrap();
        let types = data_type_registry::global().lock().unwrap();
        let mut container = containers.create(schema.type_name.as_str())?;
        let id_text: String = row.get(IDENTIFIER_COLUMN).map_err(sql_err)?;
        container.set_identifier(ContainerIdentifier::parse(&id_text)?);
        for field in &schema.fields {
            let codec = types
                .serializer(field.logical_type.as_str(), Encoding::Row)
                .ok_or_else(|| StoreError::UnknownLogicalType {
                    logical_type: field.logical_type.to_string(),
                })?;
            let row_value = match codec.row_storage_type() {
                RowStorageType::Integer => row
                    .get::<_, Option<i64>>(field.name.as_str())
                    .map_err(sql_err)?
                    .map(RowValue::Integer),
                RowStorageType::Text => row
                    .get::<_, Option<String>>(field.name.as_str())
                    .map_err(sql_err)?
                    .map(RowValue::Text),
            };
            if let Some(row_value) = row_value {
                container.set(field.name.as_str(), codec.row_decode(&row_value)?)?;
            }
        }
        Ok(container)
    }

    fn queue(&mut self, type_name: &str, op: PendingOp) {
        self.pending.entry(type_name.to_string()).or_default().push(op);
        self.pending_count += 1;
    }

    fn flush_pending(&mut self) -> Result<(), StoreError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batches = std::mem::take(&mut self.pending);
        self.pending_count = 0;
        let conn = self.conn.as_mut().ok_or_else(|| StoreError::NotOpen {
            operation: "flush".to_string(),
        })?;
        let txn = conn.transaction().map_err(sql_err)?;
        for (type_name, ops) in batches {
            for op in ops {
                match op {
                    PendingOp::Insert { identifier, columns } => {
                        let mut names = vec![format!("\"{IDENTIFIER_COLUMN}\"")];
                        let mut placeholders = vec!["?1".to_string()];
                        let mut values: Vec<SqlValue> = vec![SqlValue::Text(identifier)];
                        for (i, (name, value)) in columns.into_iter().enumerate() {
                            names.push(format!("\"{name}\""));
                            placeholders.push(format!("?{}", i + 2));
                            values.push(value);
                        }
                        let sql = format!(
                            "INSERT INTO \"{type_name}\" ({}) VALUES ({})",
                            names.join(", "),
                            placeholders.join(", ")
                        );
                        txn.execute(&sql, rusqlite::params_from_iter(values)).map_err(sql_err)?;
                    }
                    PendingOp::Update { identifier, columns } => {
                        let mut assignments = Vec::new();
                        let mut values: Vec<SqlValue> = Vec::new();
                        for (i, (name, value)) in columns.into_iter().enumerate() {
                            assignments.push(format!("\"{name}\" = ?{}", i + 1));
                            values.push(value);
                        }
                        values.push(SqlValue::Text(identifier));
                        let sql = format!(
                            "UPDATE \"{type_name}\" SET {} WHERE \"{IDENTIFIER_COLUMN}\" = ?{}",
                            assignments.join(", "),
                            values.len()
                        );
                        txn.execute(&sql, rusqlite::params_from_iter(values)).map_err(sql_err)?;
                    }
                }
            }
        }
        txn.commit().map_err(sql_err)?;
        Ok(())
    }

    fn finish_close(&mut self) -> Result<(), StoreError> {
        self.flush_pending()?;
        if self.upgrade_on_close {
            if let Some(conn) = self.conn.as_ref() {
                conn.execute(
                    &format!("UPDATE \"{META_TABLE}\" SET value = ?1 WHERE key = 'format_version'"),
                    [FORMAT.to_string()],
                )
                .map_err(sql_err)?;
            }
        }
        Ok(())
    }
}

impl Default for SqliteBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for SqliteBackend {
    fn open(&mut self, path: Option<&str>, read_only: bool) -> Result<(), StoreError> {
        if self.state != State::Closed {
            return Err(StoreError::AlreadyOpen);
        }
        let path = path.ok_or_else(|| StoreError::MissingArgument {
            argument: "path".to_string(),
        })?;
        let conn = if read_only {
            Connection::open_with_flags(Path::new(path), OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(sql_err)?
        } else {
            Connection::open(Path::new(path)).map_err(sql_err)?
        };
        self.conn = Some(conn);
        self.state = if read_only { State::OpenRo } else { State::OpenRw };
        self.recovered.clear();
        self.pending.clear();
        self.pending_count = 0;
        self.cache = ReadCache::default();
        self.open_metadata()?;
        tracing::debug!(path, read_only, "opened sqlite backend");
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if self.state == State::Closed {
            return Err(StoreError::AlreadyClosed);
        }
        if self.state == State::OpenRw {
            self.finish_close()?;
        }
        self.conn = None;
        self.state = State::Closed;
        tracing::debug!("closed sqlite backend");
        Ok(())
    }

    fn add(&mut self, container: &mut Container) -> Result<(), StoreError> {
        self.require_writable("add")?;
        if container.identifier().is_some() {
            return Err(StoreError::Backend {
                message: "container already has an identifier".to_string(),
            });
        }
        let timing = self.profiler.start_timing("add", container.type_name());
        let type_name = container.type_name().to_string();
        self.ensure_table(&type_name)?;
        self.ensure_recovered(&type_name)?;
        let sequence_number = self.counters.allocate(&type_name);
        let identifier = ContainerIdentifier::new(ContainerTypeName::new(type_name.as_str())?, sequence_number)?;
        container.set_identifier(identifier.clone());
        let columns = self.encode_row(container)?;
        self.queue(
            &type_name,
            PendingOp::Insert {
                identifier: identifier.to_canonical_string(),
                columns,
            },
        );
        self.cache.insert(&type_name, identifier.index(), container.clone());
        if self.pending_count >= FLUSH_THRESHOLD {
            self.flush_pending()?;
        }
        timing.stop();
        Ok(())
    }

    fn update(&mut self, container: &Container) -> Result<(), StoreError> {
        self.require_writable("update")?;
        let identifier = container.identifier().ok_or_else(|| StoreError::Backend {
            message: "container has no identifier to update".to_string(),
        })?;
        let type_name = identifier.type_name().as_str().to_string();
        let timing = self.profiler.start_timing("update", &type_name);
        self.ensure_recovered(&type_name)?;
        if identifier.sequence_number() > self.counters.count(&type_name) {
            return Err(StoreError::MissingRecord {
                type_name,
                sequence_number: identifier.sequence_number(),
            });
        }
        let columns = self.encode_row(container)?;
        self.queue(
            &type_name,
            PendingOp::Update {
                identifier: identifier.to_canonical_string(),
                columns,
            },
        );
        self.cache.invalidate(&type_name, identifier.index());
        self.cache.insert(&type_name, identifier.index(), container.clone());
        if self.pending_count >= FLUSH_THRESHOLD {
            self.flush_pending()?;
        }
        timing.stop();
        Ok(())
    }

    fn get_by_identifier(&mut self, identifier: &ContainerIdentifier) -> Result<Option<Container>, StoreError> {
        self.require_open("get_by_identifier")?;
        let type_name = identifier.type_name().as_str().to_string();
        let timing = self.profiler.start_timing("get_by_identifier", &type_name);
        if let Some(cached) = self.cache.get(&type_name, identifier.index()) {
            timing.stop();
            return Ok(Some(cached));
        }
        self.flush_pending()?;
        if !self.table_exists(&type_name) {
            timing.stop();
            return Ok(None);
        }
        let schema = self.schema_for(&type_name)?;
        let conn = self.require_open("get_by_identifier")?;
        let result = conn
            .query_row(
                &format!("SELECT * FROM \"{type_name}\" WHERE \"{IDENTIFIER_COLUMN}\" = ?1"),
                [identifier.to_canonical_string()],
                |row| Ok(self.decode_row(row, &schema)),
            )
            .optional()
            .map_err(sql_err)?
            .transpose()?;
        if let Some(container) = &result {
            self.cache.insert(&type_name, identifier.index(), container.clone());
        }
        timing.stop();
        Ok(result)
    }

    fn get_by_index(&mut self, type_name: &str, index: u64) -> Result<Option<Container>, StoreError> {
        self.require_open("get_by_index")?;
        if let Some(cached) = self.cache.get(type_name, index) {
            return Ok(Some(cached));
        }
        self.flush_pending()?;
        if !self.table_exists(type_name) {
            return Ok(None);
        }
        let schema = self.schema_for(type_name)?;
        let conn = self.require_open("get_by_index")?;
        let result = conn
            .query_row(&format!("SELECT * FROM \"{type_name}\" WHERE rowid = ?1"), [index as i64 + 1], |row| {
                Ok(self.decode_row(row, &schema))
            })
            .optional()
            .map_err(sql_err)?
            .transpose()?;
        if let Some(container) = &result {
            self.cache.insert(type_name, index, container.clone());
        }
        Ok(result)
    }

    fn iterate<'a>(
        &'a mut self,
        type_name: &str,
        predicate: Option<&'a Expr>,
    ) -> Result<Box<dyn Iterator<Item = Result<Container, StoreError>> + 'a>, StoreError> {
        self.require_open("iterate")?;
        self.flush_pending()?;
        let schema = self.schema_for(type_name).map_err(|_| StoreError::UnknownType {
            type_name: type_name.to_string(),
        })?;
        if !self.table_exists(type_name) {
            // Registered but never written to: its table hasn't been
            // created yet, so there is nothing to iterate, not an error.
            return Ok(Box::new(std::iter::empty()));
        }
        let columns: Vec<SqlColumn<'_>> = schema
            .fields
            .iter()
            .map(|f| SqlColumn {
                name: f.name.as_str(),
                logical_type: f.logical_type.as_str(),
            })
            .collect();
        let pushed = predicate.and_then(|expr| translate(expr, &columns));

        let conn = self.require_open("iterate")?;
        let decoded: Vec<Container> = match pushed {
            Some(predicate_sql) => {
                let sql = format!("SELECT * FROM \"{type_name}\" WHERE {}", predicate_sql.clause);
                let values: Vec<SqlValue> = predicate_sql.params.into_iter().map(sql_param_to_value).collect();
                let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(values), |row| Ok(self.decode_row(row, &schema)))
                    .map_err(sql_err)?;
                let rows: Vec<Result<Container, StoreError>> = rows.collect::<Result<_, _>>().map_err(sql_err)?;
                rows.into_iter().collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!("SELECT * FROM \"{type_name}\"")).map_err(sql_err)?;
                let rows = stmt
                    .query_map([], |row| Ok(self.decode_row(row, &schema)))
                    .map_err(sql_err)?;
                let rows: Vec<Result<Container, StoreError>> = rows.collect::<Result<_, _>>().map_err(sql_err)?;
                let all: Vec<Container> = rows.into_iter().collect::<Result<Vec<_>, _>>()?;
                all.into_iter().filter(|c| matches(c, predicate)).collect()
            }
        };
        Ok(Box::new(decoded.into_iter().map(Ok)))
    }

    fn count(&mut self, type_name: &str) -> Result<u64, StoreError> {
        self.require_open("count")?;
        self.flush_pending()?;
        if !self.table_exists(type_name) {
            return Ok(0);
        }
        let conn = self.require_open("count")?;
        let n: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{type_name}\""), [], |row| row.get(0))
            .map_err(sql_err)?;
        Ok(n as u64)
    }

    fn set_profiler(&mut self, profiler: Box<dyn StoreProfiler>) {
        self.profiler = profiler;
    }
}

fn sql_param_to_value(param: SqlParam) -> SqlValue {
    match param {
        SqlParam::Int(i) => SqlValue::Integer(i),
        SqlParam::Str(s) => SqlValue::Text(s),
        SqlParam::Bool(b) => SqlValue::Integer(if b { 1 } else { 0 }),
    }
}
