//! Page store boundary consumed by `SeqScan`.
//!
//! Real storage (page files, eviction, locking) lives outside this crate; it
//! only has to hand back the tuples of one page of one table. `MemoryPageStore`
//! is the in-process implementation used by tests and benchmarks.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use tupleflow_core::config::ExecConfig;
use tupleflow_core::id::{TableId, TxnId};
use tupleflow_core::schema::SchemaRef;
use tupleflow_core::types::{RecordId, Tuple};

use crate::traits::{OpError, Result};

/// Page-granular access to stored tables.
pub trait PageStore {
    fn table_schema(&self, table: TableId) -> Result<SchemaRef>;

    /// Catalog name of the table.
    fn table_name(&self, table: TableId) -> Result<String>;

    fn num_pages(&self, table: TableId) -> Result<usize>;

    /// Tuples stored on `page`, read on behalf of `txn`. Pages outside
    /// `0..num_pages` are an error.
    fn read_page(&self, table: TableId, page: usize, txn: TxnId) -> Result<Vec<Tuple>>;
}

struct StoredTable {
    name: String,
    schema: SchemaRef,
    pages: Vec<Vec<Tuple>>,
}

#[derive(Default)]
struct StoreInner {
    tables: Vec<StoredTable>,
    faults: HashSet<(TableId, usize)>,
    page_reads: HashMap<TableId, usize>,
}

/// Thread-safe in-memory page store with a name catalog.
pub struct MemoryPageStore {
    page_tuples: usize,
    inner: Mutex<StoreInner>,
}

impl MemoryPageStore {
    /// Store with `page_tuples` tuples per page (at least one).
    pub fn new(page_tuples: usize) -> Self {
        Self {
            page_tuples: page_tuples.max(1),
            inner: Mutex::new(StoreInner::default()),
        }
    }

    pub fn from_config(cfg: &ExecConfig) -> Self {
        Self::new(cfg.scan_page_tuples)
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreInner>> {
        self.inner
            .lock()
            .map_err(|_| OpError::Storage("page store lock poisoned".into()))
    }

    pub fn create_table(&self, name: impl Into<String>, schema: SchemaRef) -> Result<TableId> {
        let mut inner = self.lock()?;
        let id = TableId::new(inner.tables.len() as u64);
        inner.tables.push(StoredTable {
            name: name.into(),
            schema,
            pages: Vec::new(),
        });
        Ok(id)
    }

    /// Look a table up by catalog name.
    pub fn table_id(&self, name: &str) -> Result<TableId> {
        let inner = self.lock()?;
        inner
            .tables
            .iter()
            .position(|t| t.name == name)
            .map(|idx| TableId::new(idx as u64))
            .ok_or_else(|| OpError::Storage(format!("no table named '{name}'")))
    }

    /// Append a tuple, stamping its record id.
    pub fn insert(&self, table: TableId, mut tuple: Tuple) -> Result<RecordId> {
        let page_tuples = self.page_tuples;
        let mut inner = self.lock()?;
        let stored = table_mut(&mut inner, table)?;
        if **tuple.schema() != *stored.schema {
            return Err(OpError::Storage(format!(
                "tuple ({}) does not match table '{}' ({})",
                tuple.schema(),
                stored.name,
                stored.schema
            )));
        }
        if stored.pages.last().map_or(true, |p| p.len() >= page_tuples) {
            stored.pages.push(Vec::with_capacity(page_tuples));
        }
        let page = stored.pages.len() - 1;
        let slots = &mut stored.pages[page];
        let rid = RecordId {
            page,
            slot: slots.len(),
        };
        tuple.set_record_id(Some(rid));
        slots.push(tuple);
        Ok(rid)
    }

    pub fn insert_all(&self, table: TableId, tuples: impl IntoIterator<Item = Tuple>) -> Result<()> {
        for t in tuples {
            self.insert(table, t)?;
        }
        Ok(())
    }

    /// Make every later read of `page` fail.
    pub fn fail_page(&self, table: TableId, page: usize) -> Result<()> {
        self.lock()?.faults.insert((table, page));
        Ok(())
    }

    pub fn clear_faults(&self) -> Result<()> {
        self.lock()?.faults.clear();
        Ok(())
    }

    /// Successful page reads served for `table` so far.
    pub fn page_reads(&self, table: TableId) -> usize {
        self.lock()
            .map(|inner| inner.page_reads.get(&table).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

fn table_ref(inner: &StoreInner, table: TableId) -> Result<&StoredTable> {
    inner
        .tables
        .get(table.get() as usize)
        .ok_or_else(|| OpError::Storage(format!("unknown table {table}")))
}

fn table_mut(inner: &mut StoreInner, table: TableId) -> Result<&mut StoredTable> {
    inner
        .tables
        .get_mut(table.get() as usize)
        .ok_or_else(|| OpError::Storage(format!("unknown table {table}")))
}

impl PageStore for MemoryPageStore {
    fn table_schema(&self, table: TableId) -> Result<SchemaRef> {
        let inner = self.lock()?;
        Ok(SchemaRef::clone(&table_ref(&inner, table)?.schema))
    }

    fn table_name(&self, table: TableId) -> Result<String> {
        let inner = self.lock()?;
        Ok(table_ref(&inner, table)?.name.clone())
    }

    fn num_pages(&self, table: TableId) -> Result<usize> {
        let inner = self.lock()?;
        Ok(table_ref(&inner, table)?.pages.len())
    }

    fn read_page(&self, table: TableId, page: usize, _txn: TxnId) -> Result<Vec<Tuple>> {
        let mut inner = self.lock()?;
        if inner.faults.contains(&(table, page)) {
            return Err(OpError::Storage(format!("read of page {page} of {table} failed")));
        }
        let stored = table_ref(&inner, table)?;
        let tuples = stored
            .pages
            .get(page)
            .cloned()
            .ok_or_else(|| {
                OpError::Storage(format!(
                    "page {page} out of range for table '{}' ({} pages)",
                    stored.name,
                    stored.pages.len()
                ))
            })?;
        *inner.page_reads.entry(table).or_insert(0) += 1;
        Ok(tuples)
    }
}
