use thiserror::Error;

/// Result type local to tupleflow-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("memory budget exceeded for tag '{tag}': requested {requested} bytes, capacity {capacity}, used {used}")]
    BudgetExceeded {
        tag: &'static str,
        requested: usize,
        capacity: usize,
        used: usize,
    },

    #[error("block budget of {budget} bytes cannot hold one {row_bytes}-byte row (tag '{tag}')")]
    RowTooWide {
        tag: &'static str,
        budget: usize,
        row_bytes: usize,
    },

    #[error("block '{tag}' is full ({capacity} rows)")]
    BlockFull { tag: &'static str, capacity: usize },
}
