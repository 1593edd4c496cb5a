//! Sequential scan over a stored table, page by page.
//!
//! The scan's schema prefixes every field with the table alias
//! (`alias.field`), which is what lets a join report qualified field names.

use std::sync::Arc;

use tupleflow_core::id::{TableId, TxnId};
use tupleflow_core::schema::SchemaRef;
use tupleflow_core::types::Tuple;

use crate::source::PageStore;
use crate::traits::{OpError, Result, TupleStream};

pub struct SeqScan {
    store: Arc<dyn PageStore>,
    txn: TxnId,
    table: TableId,
    alias: String,
    schema: SchemaRef,
    num_pages: usize,
    next_page: usize,
    page: std::vec::IntoIter<Tuple>,
    open: bool,
}

impl SeqScan {
    pub fn new(
        store: Arc<dyn PageStore>,
        txn: TxnId,
        table: TableId,
        alias: impl Into<String>,
    ) -> Result<Self> {
        let alias = alias.into();
        let schema = store.table_schema(table)?.qualified(&alias).into_ref();
        Ok(Self {
            store,
            txn,
            table,
            alias,
            schema,
            num_pages: 0,
            next_page: 0,
            page: Vec::new().into_iter(),
            open: false,
        })
    }

    /// Scan aliased by the table's catalog name.
    pub fn with_table_name(store: Arc<dyn PageStore>, txn: TxnId, table: TableId) -> Result<Self> {
        let name = store.table_name(table)?;
        Self::new(store, txn, table, name)
    }

    pub fn table_name(&self) -> Result<String> {
        self.store.table_name(self.table)
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn table(&self) -> TableId {
        self.table
    }

    /// Point the scan at another table. Closes it first.
    pub fn reset(&mut self, table: TableId, alias: impl Into<String>) -> Result<()> {
        self.close();
        let alias = alias.into();
        self.schema = self.store.table_schema(table)?.qualified(&alias).into_ref();
        self.table = table;
        self.alias = alias;
        Ok(())
    }
}

impl TupleStream for SeqScan {
    fn open(&mut self) -> Result<()> {
        if self.open {
            return Err(OpError::already_open("seq scan"));
        }
        self.num_pages = self.store.num_pages(self.table)?;
        self.next_page = 0;
        self.page = Vec::new().into_iter();
        self.open = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        if !self.open {
            return Err(OpError::not_open("seq scan"));
        }
        while self.page.as_slice().is_empty() {
            if self.next_page >= self.num_pages {
                return Ok(false);
            }
            let tuples = self.store.read_page(self.table, self.next_page, self.txn)?;

            #[cfg(feature = "tracing")]
            tracing::trace!(table = %self.table, page = self.next_page, tuples = tuples.len(), "scan page");

            self.next_page += 1;
            self.page = tuples.into_iter();
        }
        Ok(true)
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(OpError::NoSuchElement);
        }
        let tuple = self.page.next().ok_or(OpError::NoSuchElement)?;
        Ok(tuple.with_schema(SchemaRef::clone(&self.schema))?)
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.open {
            return Err(OpError::not_open("seq scan"));
        }
        self.close();
        self.open()
    }

    fn close(&mut self) {
        self.open = false;
        self.page = Vec::new().into_iter();
    }

    fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}
