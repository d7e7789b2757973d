use crate::events::VaultEvent;
use crate::state::{DepositorAccount, Vault};

/// Events recorded by the settlement core. Pending events become visible only
/// when the unit of work that produced them commits.
#[derive(Debug, Default)]
pub struct Journal {
    pending: Vec<VaultEvent>,
    committed: Vec<VaultEvent>,
}

impl Journal {
    pub fn record(&mut self, event: VaultEvent) {
        self.pending.push(event);
    }

    pub fn committed(&self) -> &[VaultEvent] {
        &self.committed
    }

    pub fn take_committed(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.committed)
    }
}

/// Snapshot of everything a unit of work may mutate. Committing keeps the
/// mutations and publishes the pending events; rolling back restores the
/// snapshot and drops them.
pub struct Checkpoint {
    vault: Vault,
    account: Option<DepositorAccount>,
    pending: usize,
}

impl Checkpoint {
    pub fn capture(vault: &Vault, account: Option<&DepositorAccount>, journal: &Journal) -> Self {
        Self {
            vault: vault.clone(),
            account: account.cloned(),
            pending: journal.pending.len(),
        }
    }

    pub fn commit(self, journal: &mut Journal) {
        let produced = journal.pending.split_off(self.pending);
        journal.committed.extend(produced);
    }

    pub fn rollback(
        self,
        vault: &mut Vault,
        account: Option<&mut DepositorAccount>,
        journal: &mut Journal,
    ) {
        *vault = self.vault;
        if let (Some(target), Some(saved)) = (account, self.account) {
            *target = saved;
        }
        journal.pending.truncate(self.pending);
    }
}
