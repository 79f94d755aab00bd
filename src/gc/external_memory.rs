//! RAII charge against a [`MemoryAccountant`].

use std::sync::Arc;

use super::MemoryAccountant;

/// One charge of external memory.
///
/// Created by the accountant when a charge succeeds; dropping it releases
/// exactly the charged amount. A guard can therefore never be released twice,
/// and a charge can never be forgotten while the guard is alive.
///
/// # Example
///
/// ```ignore
/// let guard = accountant.try_charge(stride * height)?;
/// // the host now counts the pixels as external memory
/// drop(guard);
/// // and no longer does
/// ```
pub struct ExternalMemoryGuard {
    accountant: Arc<MemoryAccountant>,
    amount: u64,
}

impl ExternalMemoryGuard {
    pub(super) fn new(accountant: Arc<MemoryAccountant>, amount: u64) -> Self {
        Self { accountant, amount }
    }

    /// Bytes held by this guard.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn accountant(&self) -> &Arc<MemoryAccountant> {
        &self.accountant
    }
}

impl Drop for ExternalMemoryGuard {
    fn drop(&mut self) {
        if self.amount != 0 {
            self.accountant.release(self.amount);
        }
    }
}

impl std::fmt::Debug for ExternalMemoryGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalMemoryGuard")
            .field("amount", &self.amount)
            .finish()
    }
}
