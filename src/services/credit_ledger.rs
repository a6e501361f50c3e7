use anyhow::anyhow;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::{Arc, PoisonError, RwLock};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::{EngineError, Result},
    models::{
        common::{Amount, ContractStatus},
        contract::{Contract, ContractId},
        redemption::RedemptionRecord,
    },
    services::ledger_store::LedgerStore,
};

/// A contract and its redemption log, published together
#[derive(Debug, Clone)]
struct ContractState {
    contract: Contract,
    records: Arc<Vec<RedemptionRecord>>,
}

/// Per-contract storage cell.
///
/// `writer` serializes every mutation of this contract. Readers never take
/// it: they clone the currently published `state`, which writers swap in
/// only after the store has accepted the change.
struct ContractSlot {
    writer: Mutex<()>,
    state: RwLock<Arc<ContractState>>,
}

impl ContractSlot {
    fn new(state: ContractState) -> Self {
        Self {
            writer: Mutex::new(()),
            state: RwLock::new(Arc::new(state)),
        }
    }

    fn snapshot(&self) -> Arc<ContractState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, next: ContractState) {
        next.contract.assert_within_bounds();
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }
}

/// Point-in-time view of one owner's contracts.
///
/// Holds the snapshots taken when it was built; iterating again yields the
/// same contracts, with status evaluated at the instant the view was taken.
pub struct OwnerContracts {
    entries: Vec<Arc<ContractState>>,
    at: OffsetDateTime,
}

impl OwnerContracts {
    pub fn iter(&self) -> impl Iterator<Item = Contract> + '_ {
        self.entries
            .iter()
            .map(move |state| state.contract.revalidated(self.at))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Authoritative store of contracts and their consumption state.
///
/// Mutations on one contract id are mutually exclusive; mutations on
/// different ids never wait on each other.
pub struct CreditLedger {
    contracts: DashMap<ContractId, Arc<ContractSlot>>,
    by_owner: DashMap<String, Vec<ContractId>>,
    store: Arc<dyn LedgerStore>,
}

impl CreditLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            contracts: DashMap::new(),
            by_owner: DashMap::new(),
            store,
        }
    }

    /// Rebuild the ledger from everything the store holds
    #[instrument(skip(store))]
    pub async fn hydrate(store: Arc<dyn LedgerStore>) -> Result<Self> {
        let loaded = store.load_all().await?;
        let ledger = Self::new(store);

        let count = loaded.len();
        for (contract, records) in loaded {
            contract.assert_within_bounds();
            ledger.insert_slot(ContractState {
                contract,
                records: Arc::new(records),
            });
        }

        info!(contracts = count, "Credit ledger hydrated");
        Ok(ledger)
    }

    fn insert_slot(&self, state: ContractState) -> bool {
        let id = state.contract.id;
        let owner = state.contract.owner.clone();

        match self.contracts.entry(id) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(ContractSlot::new(state)));
            }
        }
        self.by_owner.entry(owner).or_default().push(id);
        true
    }

    fn slot(&self, id: ContractId) -> Result<Arc<ContractSlot>> {
        self.contracts
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(EngineError::NotFound(id))
    }

    /// Insert a new contract. Fails with `DuplicateId` if the id is taken.
    #[instrument(skip(self, contract), fields(contract_id = %contract.id, owner = %contract.owner))]
    pub async fn create(&self, contract: Contract) -> Result<Contract> {
        if self.contracts.contains_key(&contract.id) {
            return Err(EngineError::DuplicateId(contract.id));
        }
        if contract.used_credits != 0 || contract.total_credits <= 0 {
            return Err(EngineError::InvalidQuantity(format!(
                "new contract must start unused with positive credits (used {}, total {})",
                contract.used_credits, contract.total_credits
            )));
        }

        self.store.insert_contract(&contract).await?;

        let inserted = self.insert_slot(ContractState {
            contract: contract.clone(),
            records: Arc::new(Vec::new()),
        });
        if !inserted {
            return Err(EngineError::DuplicateId(contract.id));
        }

        debug!("Contract created");
        Ok(contract)
    }

    /// Contract with status evaluated now
    pub fn get(&self, id: ContractId) -> Result<Contract> {
        self.get_at(id, OffsetDateTime::now_utc())
    }

    pub fn get_at(&self, id: ContractId, now: OffsetDateTime) -> Result<Contract> {
        let state = self.slot(id)?.snapshot();
        state.contract.assert_within_bounds();
        Ok(state.contract.revalidated(now))
    }

    pub fn list_by_owner(&self, owner: &str) -> OwnerContracts {
        self.list_by_owner_at(owner, OffsetDateTime::now_utc())
    }

    pub fn list_by_owner_at(&self, owner: &str, now: OffsetDateTime) -> OwnerContracts {
        let ids = self
            .by_owner
            .get(owner)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();

        let entries = ids
            .into_iter()
            .filter_map(|id| self.slot(id).ok())
            .map(|slot| slot.snapshot())
            .collect();

        OwnerContracts { entries, at: now }
    }

    /// Redemption log of one contract, oldest first
    pub fn redemptions(&self, id: ContractId) -> Result<Vec<RedemptionRecord>> {
        Ok(self.slot(id)?.snapshot().records.as_ref().clone())
    }

    /// Every redemption across an owner's contracts, newest first
    pub fn redemptions_by_owner(&self, owner: &str) -> Vec<RedemptionRecord> {
        let view = self.list_by_owner(owner);
        let mut records: Vec<RedemptionRecord> = view
            .entries
            .iter()
            .flat_map(|state| state.records.iter().cloned())
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records
    }

    /// Ids of contracts past expiry that have not reached a terminal state
    pub fn expiry_candidates(&self, now: OffsetDateTime) -> Vec<ContractId> {
        self.contracts
            .iter()
            .filter_map(|entry| {
                let state = entry.value().snapshot();
                let contract = &state.contract;
                let pending = !contract.status.is_terminal()
                    && contract.expires_at <= now
                    && contract.used_credits < contract.total_credits;
                pending.then_some(contract.id)
            })
            .collect()
    }

    /// Sum of `remaining * locked_price` over contracts active at `now`
    pub fn outstanding_liability(&self, now: OffsetDateTime) -> Result<Amount> {
        self.contracts.iter().try_fold(Amount::ZERO, |total, entry| {
            let state = entry.value().snapshot();
            state
                .contract
                .liability_at(now)
                .and_then(|liability| total.checked_add(liability))
                .ok_or_else(|| EngineError::Internal(anyhow!("Liability overflow")))
        })
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Increase `used_credits` by `credits` and append `record`, all or
    /// nothing. Fails with `InsufficientCredits` if `credits` exceeds what
    /// remains, and with `ContractNotActive` once the contract is terminal
    /// at the record's timestamp.
    #[instrument(skip(self, record))]
    pub async fn apply_consumption(
        &self,
        id: ContractId,
        credits: i64,
        record: RedemptionRecord,
    ) -> Result<Contract> {
        if record.contract_id != id || record.credits_consumed != credits {
            return Err(EngineError::BadRequest(format!(
                "redemption record does not match consumption of {} credits on {}",
                credits, id
            )));
        }

        let now = record.timestamp;
        let (contract, _) = self
            .consume_with(id, now, move |_contract| Ok((credits, record)))
            .await?;
        Ok(contract)
    }

    /// Check-then-act consumption inside the contract's critical section.
    ///
    /// `decide` sees the contract as it stands once the writer lock is held
    /// and returns how many credits to take and the record to append. The
    /// status check, the bound check and the write all happen under the
    /// same lock.
    pub(crate) async fn consume_with<F>(
        &self,
        id: ContractId,
        now: OffsetDateTime,
        decide: F,
    ) -> Result<(Contract, RedemptionRecord)>
    where
        F: FnOnce(&Contract) -> Result<(i64, RedemptionRecord)> + Send,
    {
        let slot = self.slot(id)?;
        let _guard = slot.writer.lock().await;

        let current = slot.snapshot();
        let contract = &current.contract;
        contract.assert_within_bounds();

        if let Some(reason) = contract.inactive_reason_at(now) {
            return Err(EngineError::ContractNotActive {
                contract_id: id,
                reason,
            });
        }

        let (credits, record) = decide(contract)?;
        if credits <= 0 {
            return Err(EngineError::InvalidQuantity(format!(
                "consumption must be positive, got {}",
                credits
            )));
        }
        let remaining = contract.remaining_credits();
        if credits > remaining {
            return Err(EngineError::InsufficientCredits {
                contract_id: id,
                requested: credits,
                remaining,
            });
        }

        let mut next = contract.clone();
        next.used_credits += credits;
        next.version += 1;
        if next.used_credits == next.total_credits {
            next.status = ContractStatus::Depleted;
            next.depleted_at = Some(now);
        }

        if let Err(e) = self.store.record_consumption(&next, &record).await {
            self.resync_on_conflict(&slot, &e).await;
            return Err(e);
        }

        let mut records = current.records.as_ref().clone();
        records.push(record.clone());
        slot.publish(ContractState {
            contract: next.clone(),
            records: Arc::new(records),
        });

        Ok((next.revalidated(now), record))
    }

    /// After another writer won the store's compare-and-swap, replace the
    /// slot with what the store now holds so the next call on this contract
    /// decides against current state. Caller holds the slot's writer lock.
    async fn resync_on_conflict(&self, slot: &ContractSlot, err: &EngineError) {
        let EngineError::ConcurrentModification(id) = *err else {
            return;
        };

        match self.store.load_contract(id).await {
            Ok(Some((contract, records))) => {
                debug!(contract_id = %id, version = contract.version, "Resynced contract from store");
                slot.publish(ContractState {
                    contract,
                    records: Arc::new(records),
                });
            }
            Ok(None) => warn!(contract_id = %id, "Conflicting contract missing from store"),
            Err(e) => warn!(contract_id = %id, "Failed to resync contract: {}", e),
        }
    }

    pub async fn mark_expired(&self, id: ContractId) -> Result<Contract> {
        self.mark_expired_at(id, OffsetDateTime::now_utc()).await
    }

    /// Materialize `Expired` if the contract is past expiry with credits
    /// left. Already-terminal contracts are returned unchanged, as are
    /// contracts that are not yet eligible.
    pub async fn mark_expired_at(&self, id: ContractId, now: OffsetDateTime) -> Result<Contract> {
        self.expire_if_due(id, now)
            .await
            .map(|(contract, _transitioned)| contract)
    }

    /// As `mark_expired_at`, also reporting whether this call made the
    /// transition
    #[instrument(skip(self))]
    pub(crate) async fn expire_if_due(
        &self,
        id: ContractId,
        now: OffsetDateTime,
    ) -> Result<(Contract, bool)> {
        let slot = self.slot(id)?;
        let _guard = slot.writer.lock().await;

        let current = slot.snapshot();
        let contract = &current.contract;
        contract.assert_within_bounds();

        if contract.status.is_terminal() || contract.status_at(now) != ContractStatus::Expired {
            return Ok((contract.revalidated(now), false));
        }

        let mut next = contract.clone();
        next.status = ContractStatus::Expired;
        next.expired_at = Some(now);
        next.version += 1;

        if let Err(e) = self.store.update_status(&next).await {
            self.resync_on_conflict(&slot, &e).await;
            return Err(e);
        }

        slot.publish(ContractState {
            contract: next.clone(),
            records: Arc::clone(&current.records),
        });

        info!(
            contract_id = %id,
            forfeited_credits = next.remaining_credits(),
            "Contract expired"
        );
        Ok((next, true))
    }
}
