//! Load-balanced approver selection.
//!
//! Every selection reads the live candidate pool and open-application counts
//! through the caller's transaction, then picks the least-loaded approver.
//! Ties are broken by shuffling before a stable sort, so equally loaded
//! approvers are picked uniformly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::domain::application::ProductId;
use crate::domain::approver::{Approver, ApproverId, ApproverLoad, Role};
use crate::domain::credit_rule::resolve_rule;
use crate::store::{StoreError, WorkflowTx};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no active approvers for role `{role}`")]
    NoActiveApprovers { role: Role },
    #[error("no other approver available for role `{role}`")]
    NoOtherApprover { role: Role },
    #[error("no rule defined for product `{product_id}` and score {score}")]
    NoCreditRule { product_id: ProductId, score: i32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct ApproverSelector {
    rng: Arc<Mutex<StdRng>>,
}

impl Default for ApproverSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ApproverSelector {
    pub fn new() -> Self {
        Self { rng: Arc::new(Mutex::new(StdRng::from_entropy())) }
    }

    /// Reproducible tie-breaking.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))) }
    }

    pub async fn select<T>(
        &self,
        tx: &mut T,
        role: &Role,
        exclude: Option<&ApproverId>,
    ) -> Result<Approver, SelectionError>
    where
        T: WorkflowTx + ?Sized,
    {
        let pool = tx.list_active_approvers(role).await?;
        let candidates = eligible_candidates(role, pool, exclude)?;
        let ids: Vec<ApproverId> = candidates.iter().map(|approver| approver.id.clone()).collect();
        let loads = tx.open_application_counts(&ids).await?;

        let selected = self.pick(candidates, &loads);
        selected.ok_or_else(|| SelectionError::NoActiveApprovers { role: role.clone() })
    }

    pub async fn select_ops<T>(
        &self,
        tx: &mut T,
        exclude: Option<&ApproverId>,
    ) -> Result<Approver, SelectionError>
    where
        T: WorkflowTx + ?Sized,
    {
        self.select(tx, &Role::Ops, exclude).await
    }

    pub async fn select_senior_ops<T>(
        &self,
        tx: &mut T,
        exclude: Option<&ApproverId>,
    ) -> Result<Approver, SelectionError>
    where
        T: WorkflowTx + ?Sized,
    {
        self.select(tx, &Role::SeniorOps, exclude).await
    }

    /// Resolves the credit sub-role from the product's score bands, then
    /// selects within that role.
    pub async fn select_credit_by_score<T>(
        &self,
        tx: &mut T,
        product_id: &ProductId,
        score: i32,
        exclude: Option<&ApproverId>,
    ) -> Result<Approver, SelectionError>
    where
        T: WorkflowTx + ?Sized,
    {
        let rules = tx.list_credit_rules(product_id).await?;
        let role = resolve_rule(&rules, product_id, score)
            .map(|rule| rule.role.clone())
            .ok_or_else(|| SelectionError::NoCreditRule { product_id: product_id.clone(), score })?;

        tracing::debug!(
            event_name = "workflow.selector.credit_band_resolved",
            product_id = %product_id,
            score,
            role = %role,
            "credit band resolved"
        );
        self.select(tx, &role, exclude).await
    }

    pub async fn select_credit_by_role<T>(
        &self,
        tx: &mut T,
        role: &Role,
        exclude: Option<&ApproverId>,
    ) -> Result<Approver, SelectionError>
    where
        T: WorkflowTx + ?Sized,
    {
        self.select(tx, role, exclude).await
    }

    pub async fn select_finance<T>(
        &self,
        tx: &mut T,
        exclude: Option<&ApproverId>,
    ) -> Result<Approver, SelectionError>
    where
        T: WorkflowTx + ?Sized,
    {
        self.select(tx, &Role::Finance, exclude).await
    }

    pub async fn select_disbursal<T>(
        &self,
        tx: &mut T,
        exclude: Option<&ApproverId>,
    ) -> Result<Approver, SelectionError>
    where
        T: WorkflowTx + ?Sized,
    {
        self.select(tx, &Role::Disbursal, exclude).await
    }

    /// Every active approver of `role` with its current load, least loaded
    /// first.
    pub async fn workload<T>(&self, tx: &mut T, role: &Role) -> Result<Vec<ApproverLoad>, SelectionError>
    where
        T: WorkflowTx + ?Sized,
    {
        let approvers: Vec<Approver> = tx
            .list_active_approvers(role)
            .await?
            .into_iter()
            .filter(Approver::is_eligible)
            .collect();
        let ids: Vec<ApproverId> = approvers.iter().map(|approver| approver.id.clone()).collect();
        let loads = tx.open_application_counts(&ids).await?;

        let mut workload: Vec<ApproverLoad> = approvers
            .into_iter()
            .map(|approver| {
                let open_applications = loads.get(&approver.id).copied().unwrap_or(0);
                ApproverLoad { approver, open_applications }
            })
            .collect();
        workload.sort_by(|left, right| {
            left.open_applications
                .cmp(&right.open_applications)
                .then_with(|| left.approver.id.cmp(&right.approver.id))
        });
        Ok(workload)
    }

    fn pick(&self, candidates: Vec<Approver>, loads: &HashMap<ApproverId, u32>) -> Option<Approver> {
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            Err(poisoned) => poisoned.into_inner(),
        };
        pick_least_loaded(candidates, loads, &mut *rng)
    }
}

/// Drops ineligible approvers and the excluded current holder, telling an
/// empty pool apart from one emptied by the exclusion.
pub fn eligible_candidates(
    role: &Role,
    pool: Vec<Approver>,
    exclude: Option<&ApproverId>,
) -> Result<Vec<Approver>, SelectionError> {
    let pool: Vec<Approver> = pool.into_iter().filter(Approver::is_eligible).collect();
    if pool.is_empty() {
        return Err(SelectionError::NoActiveApprovers { role: role.clone() });
    }

    let candidates: Vec<Approver> = match exclude {
        Some(excluded) => pool.into_iter().filter(|approver| &approver.id != excluded).collect(),
        None => pool,
    };
    if candidates.is_empty() {
        return Err(SelectionError::NoOtherApprover { role: role.clone() });
    }
    Ok(candidates)
}

/// Least-loaded candidate; missing loads count as zero.
pub fn pick_least_loaded<R>(
    mut candidates: Vec<Approver>,
    loads: &HashMap<ApproverId, u32>,
    rng: &mut R,
) -> Option<Approver>
where
    R: Rng + ?Sized,
{
    candidates.shuffle(rng);
    candidates.sort_by_key(|approver| loads.get(&approver.id).copied().unwrap_or(0));
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::{eligible_candidates, pick_least_loaded, SelectionError};
    use crate::domain::approver::{Approver, ApproverId, ApproverStatus, Role};

    fn approver(id: &str, role: Role, status: ApproverStatus) -> Approver {
        Approver {
            id: ApproverId(id.to_owned()),
            name: format!("Approver {id}"),
            role,
            status,
            created_at: Utc::now(),
        }
    }

    fn ops(ids: &[&str]) -> Vec<Approver> {
        ids.iter().map(|id| approver(id, Role::Ops, ApproverStatus::Active)).collect()
    }

    #[test]
    fn least_loaded_approver_wins_without_ties() {
        let loads = HashMap::from([
            (ApproverId("ops-a".into()), 2),
            (ApproverId("ops-b".into()), 0),
            (ApproverId("ops-c".into()), 1),
        ]);

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = pick_least_loaded(ops(&["ops-a", "ops-b", "ops-c"]), &loads, &mut rng)
                .expect("candidate");
            assert_eq!(picked.id.0, "ops-b");
        }
    }

    #[test]
    fn approvers_without_open_applications_count_as_zero() {
        let loads = HashMap::from([(ApproverId("ops-a".into()), 1)]);
        let mut rng = StdRng::seed_from_u64(7);

        let picked = pick_least_loaded(ops(&["ops-a", "ops-b"]), &loads, &mut rng).expect("pick");
        assert_eq!(picked.id.0, "ops-b");
    }

    #[test]
    fn ties_are_broken_randomly() {
        let loads = HashMap::new();
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = HashSet::new();

        for _ in 0..30 {
            let picked =
                pick_least_loaded(ops(&["ops-a", "ops-b"]), &loads, &mut rng).expect("pick");
            seen.insert(picked.id.0);
        }

        assert_eq!(seen.len(), 2, "both tied approvers should be picked at least once");
    }

    #[test]
    fn excluding_the_only_approver_is_reported_distinctly() {
        let pool = vec![approver("fin-1", Role::Finance, ApproverStatus::Active)];
        let excluded = ApproverId("fin-1".into());

        let error = eligible_candidates(&Role::Finance, pool, Some(&excluded))
            .expect_err("exclusion empties the pool");
        assert_eq!(error, SelectionError::NoOtherApprover { role: Role::Finance });
        assert!(error.to_string().contains("no other approver available"));
    }

    #[test]
    fn inactive_approvers_never_count_as_candidates() {
        let pool = vec![
            approver("fin-1", Role::Finance, ApproverStatus::Suspended),
            approver("fin-2", Role::Finance, ApproverStatus::Deleted),
        ];

        let error = eligible_candidates(&Role::Finance, pool, None).expect_err("nobody eligible");
        assert!(matches!(error, SelectionError::NoActiveApprovers { .. }));
        assert!(error.to_string().contains("no active approvers for role"));
    }
}
