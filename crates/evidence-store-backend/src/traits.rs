use evidence_store_core::{Container, ContainerIdentifier, StoreError};
use evidence_store_filter::ast::Expr;
use evidence_store_profiler::StoreProfiler;

/// Storage-agnostic contract shared by every backend (in-memory, ordered-KV,
/// transactional table).
///
/// Every operation is synchronous: `&mut self` methods returning
/// `Result<_, StoreError>`, deliberately not `async`. The store is a single
/// embedded resource per process, not a networked service, so there is
/// nothing to suspend on (§5, "No operation suspends; all are synchronous").
/// `Store: Send` is asserted at compile time by every implementation's test
/// module; `Sync` is not, since a store is not safe for concurrent use.
pub trait Store: Send {
    /// Opens the store. Fails with [`StoreError::AlreadyOpen`] if already
    /// open. `path` is ignored by backends with no persistent storage.
    fn open(&mut self, path: Option<&str>, read_only: bool) -> Result<(), StoreError>;

    /// Closes the store, releasing any backend handles. Fails with
    /// [`StoreError::AlreadyClosed`] if already closed.
    fn close(&mut self) -> Result<(), StoreError>;

    /// Inserts `container`, which must have no identifier. Allocates the
    /// next sequence number for its type, sets the identifier on the
    /// caller's container, and persists a deep copy. Requires an open,
    /// writable store.
    fn add(&mut self, container: &mut Container) -> Result<(), StoreError>;

    /// Overwrites the record at `container`'s identifier, which must have
    /// been previously assigned by this store. Fails with
    /// [`StoreError::MissingRecord`] if no such record exists. Requires an
    /// open, writable store.
    fn update(&mut self, container: &Container) -> Result<(), StoreError>;

    /// Returns the container at `identifier`, or `None` if its sequence
    /// number exceeds the current count for its type. Requires an open
    /// store (read-only or read-write).
    fn get_by_identifier(
        &mut self,
        identifier: &ContainerIdentifier,
    ) -> Result<Option<Container>, StoreError>;

    /// Returns the container at zero-based `index` within `type_name`, or
    /// `None` if `index >= count(type_name)`.
    fn get_by_index(&mut self, type_name: &str, index: u64) -> Result<Option<Container>, StoreError>;

    /// Iterates every container of `type_name` in insertion order,
    /// restricted to those matching `predicate` when given. Lazy,
    /// single-pass; mutating the store during iteration is undefined.
    fn iterate<'a>(
        &'a mut self,
        type_name: &str,
        predicate: Option<&'a Expr>,
    ) -> Result<Box<dyn Iterator<Item = Result<Container, StoreError>> + 'a>, StoreError>;

    /// The number of containers of `type_name`; zero for unknown or empty
    /// types.
    fn count(&mut self, type_name: &str) -> Result<u64, StoreError>;

    /// `count(type_name) > 0`.
    fn has(&mut self, type_name: &str) -> Result<bool, StoreError> {
        Ok(self.count(type_name)? > 0)
    }

    /// Attaches a profiler the backend calls into around read/write
    /// operations. A no-op default is used until this is called.
    fn set_profiler(&mut self, profiler: Box<dyn StoreProfiler>);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_store_is_send<T: Store>() {}
}
