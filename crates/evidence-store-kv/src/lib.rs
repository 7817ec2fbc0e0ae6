//! # evidence-store-kv
//!
//! The ordered-KV backend (§4.7): one entry per container, keyed by the
//! canonical `"<type>.<sequence-number>"` string so that per-type ranges
//! are contiguous under lexicographic ordering, backed by `redb`.

use std::collections::HashSet;
use std::path::Path;

use evidence_store_backend::{ReadCache, SequenceCounters, Store};
use evidence_store_core::registry::{container_registry, data_type_registry};
use evidence_store_core::{Container, ContainerIdentifier, ContainerTypeName, StoreError};
use evidence_store_filter::ast::Expr;
use evidence_store_filter::eval::matches;
use evidence_store_profiler::{NullProfiler, StoreProfiler};
use redb::{Database, ReadableTable, TableDefinition};

const TABLE: TableDefinition<&str, &str> = TableDefinition::new("containers");

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum State {
    Closed,
    OpenRw,
    OpenRo,
}

fn backend_error(message: impl std::fmt::Display) -> StoreError {
    let message = message.to_string();
    tracing::error!(error = %message, "redb backend operation failed");
    StoreError::Backend { message }
}

/// The `redb`-backed ordered key-value store.
///
/// Decodes and encodes against the process-wide container and data-type
/// registries (`evidence_store_core::registry::*::global`), per the data
/// model's invariant that the registered type sets are process-global
/// resources; a backend consulting a different registry for decoding could
/// silently lose track of a type another part of the process registered.
pub struct RedbBackend {
    state: State,
    db: Option<Database>,
    counters: SequenceCounters,
    recovered: HashSet<String>,
    cache: ReadCache,
    profiler: Box<dyn StoreProfiler>,
}

impl RedbBackend {
    pub fn new() -> Self {
        Self {
            state: State::Closed,
            db: None,
            counters: SequenceCounters::new(),
            recovered: HashSet::new(),
            cache: ReadCache::default(),
            profiler: Box::new(NullProfiler),
        }
    }

    fn require_open(&self, operation: &str) -> Result<&Database, StoreError> {
        self.db.as_ref().ok_or_else(|| StoreError::NotOpen {
            operation: operation.to_string(),
        })
    }

    fn require_writable(&self, operation: &str) -> Result<&Database, StoreError> {
        if self.state != State::OpenRw {
            return Err(StoreError::NotOpen {
                operation: operation.to_string(),
            });
        }
        self.require_open(operation)
    }

    /// Recovers the sequence counter for `type_name` from persisted keys, if
    /// it hasn't been recovered already this session. Per §4.7: probe
    /// `"<type>.1"` and, if absent, record zero; otherwise count forward
    /// contiguously.
    fn ensure_recovered(&mut self, type_name: &str) -> Result<(), StoreError> {
        if self.recovered.contains(type_name) {
            return Ok(());
        }
        let db = self.require_open("open")?;
        let txn = db.begin_read().map_err(backend_error)?;
        let count = match txn.open_table(TABLE) {
            Ok(table) => {
                let mut n: u64 = 0;
                loop {
                    let key = format!("{type_name}.{}", n + 1);
                    match table.get(key.as_str()).map_err(backend_error)? {
                        Some(_) => n += 1,
                        None => break,
                    }
                }
                n
            }
            Err(redb::TableError::TableDoesNotExist(_)) => 0,
            Err(e) => return Err(backend_error(e)),
        };
        if count > 0 {
            tracing::warn!(type_name, count, "recovered sequence counter from persisted keys");
        }
        self.counters.recover(type_name, count);
        self.recovered.insert(type_name.to_string());
        Ok(())
    }

    fn put(&mut self, key: &str, json: &str) -> Result<(), StoreError> {
        let db = self.db.as_ref().ok_or_else(|| StoreError::NotOpen {
            operation: "write".to_string(),
        })?;
        let txn = db.begin_write().map_err(backend_error)?;
        {
            let mut table = txn.open_table(TABLE).map_err(backend_error)?;
            table.insert(key, json).map_err(backend_error)?;
        }
        txn.commit().map_err(backend_error)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let db = self.require_open("read")?;
        let txn = db.begin_read().map_err(backend_error)?;
        match txn.open_table(TABLE) {
            Ok(table) => Ok(table.get(key).map_err(backend_error)?.map(|v| v.value().to_string())),
            Err(redb::TableError::TableDoesNotExist(_)) => Ok(None),
            Err(e) => Err(backend_error(e)),
        }
    }

    fn decode(&self, json_text: &str) -> Result<Container, StoreError> {
        let value: serde_json::Value = serde_json::from_str(json_text).map_err(|e| StoreError::Parse {
            message: e.to_string(),
        })?;
        let containers = container_registry::global().lock().unwrap();
        let types = data_type_registry::global().lock().unwrap();
        evidence_store_core::json_format::json_to_container(&value, &containers, &types)
    }

    fn encode(&self, container: &Container) -> Result<String, StoreError> {
        let types = data_type_registry::global().lock().unwrap();
        let value = evidence_store_core::json_format::container_to_json(container, &types)?;
        Ok(value.to_string())
    }
}

impl Default for RedbBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for RedbBackend {
    fn open(&mut self, path: Option<&str>, read_only: bool) -> Result<(), StoreError> {
        if self.state != State::Closed {
            return Err(StoreError::AlreadyOpen);
        }
        let path = path.ok_or_else(|| StoreError::MissingArgument {
            argument: "path".to_string(),
        })?;
        let db = if read_only {
            Database::open(Path::new(path)).map_err(backend_error)?
        } else {
            Database::create(Path::new(path)).map_err(backend_error)?
        };
        self.db = Some(db);
        self.state = if read_only { State::OpenRo } else { State::OpenRw };
        self.recovered.clear();
        self.cache = ReadCache::default();
        tracing::debug!(path, read_only, "opened redb backend");
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if self.state == State::Closed {
            return Err(StoreError::AlreadyClosed);
        }
        self.db = None;
        self.state = State::Closed;
        tracing::debug!("closed redb backend");
        Ok(())
    }

    fn add(&mut self, container: &mut Container) -> Result<(), StoreError> {
        self.require_writable("add")?;
        if container.identifier().is_some() {
            return Err(backend_error("container already has an identifier"));
        }
        let timing = self.profiler.start_timing("add", container.type_name());
        let type_name = container.type_name().to_string();
        self.ensure_recovered(&type_name)?;
        let sequence_number = self.counters.allocate(&type_name);
        let identifier = ContainerIdentifier::new(ContainerTypeName::new(type_name.as_str())?, sequence_number)?;
        container.set_identifier(identifier.clone());
        let json = self.encode(container)?;
        self.put(&identifier.to_canonical_string(), &json)?;
        self.cache.insert(&type_name, identifier.index(), container.clone());
        timing.stop();
        Ok(())
    }

    fn update(&mut self, container: &Container) -> Result<(), StoreError> {
        self.require_writable("update")?;
        let identifier = container.identifier().ok_or_else(|| {
            backend_error("container has no identifier to update")
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
        let json = self.encode(container)?;
        self.put(&identifier.to_canonical_string(), &json)?;
        self.cache.invalidate(&type_name, identifier.index());
        self.cache.insert(&type_name, identifier.index(), container.clone());
        timing.stop();
        Ok(())
    }

    fn get_by_identifier(
        &mut self,
        identifier: &ContainerIdentifier,
    ) -> Result<Option<Container>, StoreError> {
        self.require_open("get_by_identifier")?;
        let type_name = identifier.type_name().as_str().to_string();
        let timing = self.profiler.start_timing("get_by_identifier", &type_name);
        self.ensure_recovered(&type_name)?;
        if identifier.sequence_number() > self.counters.count(&type_name) {
            timing.stop();
            return Ok(None);
        }
        if let Some(cached) = self.cache.get(&type_name, identifier.index()) {
            timing.stop();
            return Ok(Some(cached));
        }
        let result = match self.get(&identifier.to_canonical_string())? {
            Some(json) => {
                let container = self.decode(&json)?;
                self.cache.insert(&type_name, identifier.index(), container.clone());
                Some(container)
            }
            None => None,
        };
        timing.stop();
        Ok(result)
    }

    fn get_by_index(&mut self, type_name: &str, index: u64) -> Result<Option<Container>, StoreError> {
        let identifier = ContainerIdentifier::new(ContainerTypeName::new(type_name)?, index + 1)?;
        self.get_by_identifier(&identifier)
    }

    fn iterate<'a>(
        &'a mut self,
        type_name: &str,
        predicate: Option<&'a Expr>,
    ) -> Result<Box<dyn Iterator<Item = Result<Container, StoreError>> + 'a>, StoreError> {
        self.require_open("iterate")?;
        self.ensure_recovered(type_name)?;
        let max = self.counters.count(type_name);
        let mut decoded = Vec::with_capacity(max as usize);
        for n in 1..=max {
            let key = format!("{type_name}.{n}");
            if let Some(json) = self.get(&key)? {
                decoded.push(self.decode(&json)?);
            }
        }
        let iter = decoded.into_iter().filter(move |c| matches(c, predicate)).map(Ok);
        Ok(Box::new(iter))
    }

    fn count(&mut self, type_name: &str) -> Result<u64, StoreError> {
        self.require_open("count")?;
        self.ensure_recovered(type_name)?;
        Ok(self.counters.count(type_name))
    }

    fn set_profiler(&mut self, profiler: Box<dyn StoreProfiler>) {
        self.profiler = profiler;
    }
}
