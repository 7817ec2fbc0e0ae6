use std::collections::HashMap;

use evidence_store_core::{Container, ContainerIdentifier, ContainerTypeName, StoreError};
use evidence_store_filter::ast::Expr;
use evidence_store_filter::eval::matches;
use evidence_store_profiler::{NullProfiler, StoreProfiler};

use crate::counters::SequenceCounters;
use crate::traits::Store;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum State {
    Closed,
    OpenRw,
    OpenRo,
}

/// The in-memory backend: one insertion-ordered `Vec` per container type,
/// holding deep copies. Nothing is persisted; `open`/`close` only manage
/// the lifecycle state, and `path` is ignored.
pub struct InMemoryBackend {
    state: State,
    counters: SequenceCounters,
    records: HashMap<String, Vec<Container>>,
    profiler: Box<dyn StoreProfiler>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            state: State::Closed,
            counters: SequenceCounters::new(),
            records: HashMap::new(),
            profiler: Box::new(NullProfiler),
        }
    }

    fn require_open(&self, operation: &str) -> Result<(), StoreError> {
        if self.state == State::Closed {
            return Err(StoreError::NotOpen {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    fn require_writable(&self, operation: &str) -> Result<(), StoreError> {
        match self.state {
            State::OpenRw => Ok(()),
            State::OpenRo => Err(StoreError::NotOpen {
                operation: operation.to_string(),
            }),
            State::Closed => Err(StoreError::NotOpen {
                operation: operation.to_string(),
            }),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for InMemoryBackend {
    fn open(&mut self, _path: Option<&str>, read_only: bool) -> Result<(), StoreError> {
        if self.state != State::Closed {
            return Err(StoreError::AlreadyOpen);
        }
        self.state = if read_only { State::OpenRo } else { State::OpenRw };
        tracing::debug!(read_only, "opened in-memory backend");
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if self.state == State::Closed {
            return Err(StoreError::AlreadyClosed);
        }
        self.state = State::Closed;
        tracing::debug!("closed in-memory backend");
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
        let type_name = ContainerTypeName::new(container.type_name())?;
        let sequence_number = self.counters.allocate(type_name.as_str());
        let identifier = ContainerIdentifier::new(type_name, sequence_number)?;
        container.set_identifier(identifier);
        self.records
            .entry(container.type_name().to_string())
            .or_default()
            .push(container.clone());
        timing.stop();
        Ok(())
    }

    fn update(&mut self, container: &Container) -> Result<(), StoreError> {
        self.require_writable("update")?;
        let identifier = container
            .identifier()
            .ok_or_else(|| StoreError::Backend {
                message: "container has no identifier to update".to_string(),
            })?
            .clone();
        let timing = self.profiler.start_timing("update", container.type_name());
        let rows = self
            .records
            .get_mut(identifier.type_name().as_str())
            .ok_or_else(|| StoreError::MissingRecord {
                type_name: identifier.type_name().as_str().to_string(),
                sequence_number: identifier.sequence_number(),
            })?;
        let index = identifier.index() as usize;
        let slot = rows.get_mut(index).ok_or_else(|| StoreError::MissingRecord {
            type_name: identifier.type_name().as_str().to_string(),
            sequence_number: identifier.sequence_number(),
        })?;
        *slot = container.clone();
        timing.stop();
        Ok(())
    }

    fn get_by_identifier(
        &mut self,
        identifier: &ContainerIdentifier,
    ) -> Result<Option<Container>, StoreError> {
        self.require_open("get_by_identifier")?;
        let timing = self
            .profiler
            .start_timing("get_by_identifier", identifier.type_name().as_str());
        let result = self
            .records
            .get(identifier.type_name().as_str())
            .and_then(|rows| rows.get(identifier.index() as usize))
            .cloned();
        timing.stop();
        Ok(result)
    }

    fn get_by_index(&mut self, type_name: &str, index: u64) -> Result<Option<Container>, StoreError> {
        self.require_open("get_by_index")?;
        let timing = self.profiler.start_timing("get_by_index", type_name);
        let result = self
            .records
            .get(type_name)
            .and_then(|rows| rows.get(index as usize))
            .cloned();
        timing.stop();
        Ok(result)
    }

    fn iterate<'a>(
        &'a mut self,
        type_name: &str,
        predicate: Option<&'a Expr>,
    ) -> Result<Box<dyn Iterator<Item = Result<Container, StoreError>> + 'a>, StoreError> {
        self.require_open("iterate")?;
        let rows = self.records.get(type_name).map(Vec::as_slice).unwrap_or(&[]);
        let iter = rows
            .iter()
            .filter(move |c| matches(c, predicate))
            .map(|c| Ok(c.clone()));
        Ok(Box::new(iter))
    }

    fn count(&mut self, type_name: &str) -> Result<u64, StoreError> {
        self.require_open("count")?;
        Ok(self.records.get(type_name).map(Vec::len).unwrap_or(0) as u64)
    }

    fn set_profiler(&mut self, profiler: Box<dyn StoreProfiler>) {
        self.profiler = profiler;
    }
}
