//! Per-account credit balances.

/// Ledger trait plus memory and file implementations.
pub mod credits;
