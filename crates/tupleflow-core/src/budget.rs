//! Abstract memory budget interfaces.
//!
//! The concrete implementation lives in `tupleflow-mem`. Operators depend on
//! these traits so a join can be handed any budget that enforces a byte cap.

/// A reservation handed out by a memory budget.
///
/// Must be RAII: the reserved bytes go back to the budget on drop.
pub trait BudgetGuard: Send {
    /// Number of bytes currently reserved by this guard.
    fn bytes(&self) -> usize;
    /// Debug tag for tracing.
    fn tag(&self) -> &'static str {
        "guard"
    }
}

/// A handle representing a memory-cap enforcer.
///
/// Callers reserve before buffering rows. `None` means the request does not
/// fit and the caller must fail or shrink the request.
pub trait MemoryBudget: Send + Sync + 'static {
    type Guard: BudgetGuard;

    /// Attempt to reserve `bytes` from the live budget.
    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard>;

    /// Total configured capacity (bytes).
    fn capacity_bytes(&self) -> usize;

    /// Currently reserved bytes (advisory).
    fn used_bytes(&self) -> usize;
}
