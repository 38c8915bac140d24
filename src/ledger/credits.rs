use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::foundation::error::{AutopostError, AutopostResult};
use crate::foundation::fs::write_atomic;

/// Per-account credit balances.
///
/// Balances never go below zero. `debit_if_sufficient` is a single check-and-decrement step:
/// either the whole amount is taken or nothing changes.
pub trait CreditLedger: Send + Sync {
    /// Current balance; unknown accounts report the initial grant.
    fn balance(&self, account: &str) -> AutopostResult<u64>;

    /// Take `amount` if the balance covers it and return the new balance.
    ///
    /// Fails with [`AutopostError::InsufficientCredits`] otherwise, leaving the balance untouched.
    fn debit_if_sufficient(&self, account: &str, amount: u64) -> AutopostResult<u64>;

    /// Add `amount` and return the new balance.
    fn top_up(&self, account: &str, amount: u64) -> AutopostResult<u64>;
}

fn debit(
    balances: &mut BTreeMap<String, u64>,
    initial: u64,
    account: &str,
    amount: u64,
) -> AutopostResult<u64> {
    let bal = balances.entry(account.to_string()).or_insert(initial);
    if *bal < amount {
        return Err(AutopostError::InsufficientCredits {
            required: amount,
            available: *bal,
        });
    }
    *bal -= amount;
    Ok(*bal)
}

fn credit(balances: &mut BTreeMap<String, u64>, initial: u64, account: &str, amount: u64) -> u64 {
    let bal = balances.entry(account.to_string()).or_insert(initial);
    *bal = bal.saturating_add(amount);
    *bal
}

fn poisoned() -> AutopostError {
    AutopostError::Other(anyhow::anyhow!("credit ledger lock poisoned"))
}

/// Process-local ledger.
#[derive(Debug)]
pub struct MemoryLedger {
    initial: u64,
    balances: Mutex<BTreeMap<String, u64>>,
}

impl MemoryLedger {
    /// New accounts start with `initial` credits.
    pub fn new(initial: u64) -> Self {
        Self {
            initial,
            balances: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> AutopostResult<MutexGuard<'_, BTreeMap<String, u64>>> {
        self.balances.lock().map_err(|_| poisoned())
    }
}

impl CreditLedger for MemoryLedger {
    fn balance(&self, account: &str) -> AutopostResult<u64> {
        Ok(self.lock()?.get(account).copied().unwrap_or(self.initial))
    }

    fn debit_if_sufficient(&self, account: &str, amount: u64) -> AutopostResult<u64> {
        debit(&mut *self.lock()?, self.initial, account, amount)
    }

    fn top_up(&self, account: &str, amount: u64) -> AutopostResult<u64> {
        Ok(credit(&mut *self.lock()?, self.initial, account, amount))
    }
}

/// Ledger persisted as a JSON object of `account -> balance`.
///
/// Every mutation rewrites the file atomically while the lock is held; a failed write rolls the
/// in-memory balance back.
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    initial: u64,
    balances: Mutex<BTreeMap<String, u64>>,
}

impl FileLedger {
    /// Open (or lazily create) the ledger at `path`.
    pub fn open(path: impl Into<PathBuf>, initial: u64) -> AutopostResult<Self> {
        let path = path.into();
        let balances = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AutopostError::serde(format!("credit ledger '{}': {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("read '{}'", path.display()))
                    .into());
            }
        };
        Ok(Self {
            path,
            initial,
            balances: Mutex::new(balances),
        })
    }

    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, u64>) -> AutopostResult<T>,
    ) -> AutopostResult<T> {
        let mut guard = self.balances.lock().map_err(|_| poisoned())?;
        let before = guard.clone();
        let out = f(&mut *guard)?;
        let bytes =
            serde_json::to_vec_pretty(&*guard).map_err(|e| AutopostError::serde(e.to_string()))?;
        if let Err(e) = write_atomic(&self.path, &bytes) {
            *guard = before;
            return Err(e);
        }
        Ok(out)
    }
}

impl CreditLedger for FileLedger {
    fn balance(&self, account: &str) -> AutopostResult<u64> {
        let guard = self.balances.lock().map_err(|_| poisoned())?;
        Ok(guard.get(account).copied().unwrap_or(self.initial))
    }

    fn debit_if_sufficient(&self, account: &str, amount: u64) -> AutopostResult<u64> {
        let initial = self.initial;
        self.mutate(|b| debit(b, initial, account, amount))
    }

    fn top_up(&self, account: &str, amount: u64) -> AutopostResult<u64> {
        let initial = self.initial;
        self.mutate(|b| Ok(credit(b, initial, account, amount)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/ledger/credits.rs"]
mod tests;
