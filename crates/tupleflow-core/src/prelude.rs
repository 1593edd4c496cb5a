//! Convenient re-exports for downstream crates.

pub use crate::config::{ExecConfig, JoinStrategy};
pub use crate::error::{Error, Result};
pub use crate::id::{TableId, TxnId};
pub use crate::schema::{Field, Schema, SchemaRef, Type, STRING_LEN};
pub use crate::types::{CmpOp, RecordId, Tuple, Value};
