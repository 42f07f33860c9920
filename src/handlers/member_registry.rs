//! Member Registry
//!
//! Registration, share purchases and the member lifecycle.

use rust_decimal::Decimal;

use crate::aggregate::{Member, MemberChanges, WorkDomain};
use crate::domain::{DomainError, SharedClock};
use crate::error::AppError;
use crate::store::{MemberFilter, SharedStore, StoreError};

use super::{MemberCounts, RegisterMemberCommand};

/// Map a store-level unique violation to the business key it guards
fn duplicate_or(err: StoreError, field: &'static str, value: &str) -> AppError {
    if err.is_unique_violation() {
        DomainError::duplicate(field, value).into()
    } else {
        err.into()
    }
}

#[derive(Clone)]
pub struct MemberRegistry {
    store: SharedStore,
    clock: SharedClock,
}

impl MemberRegistry {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    // =========================================================================
    // register
    // =========================================================================

    /// Register a member and issue the initial three shares in one unit of work
    pub async fn register(&self, command: RegisterMemberCommand) -> Result<Member, AppError> {
        let (member, shares) = Member::register(command.into(), self.clock.today())?;

        if self
            .store
            .find_member_by_employee_id(&member.employee_id)
            .await?
            .is_some()
        {
            return Err(DomainError::duplicate("employeeId", member.employee_id).into());
        }

        // a concurrent registration can still win the race; the unique key catches it
        let member = self
            .store
            .insert_member(&member, &shares)
            .await
            .map_err(|e| duplicate_or(e, "employeeId", &member.employee_id))?;

        tracing::info!(
            member_id = member.id,
            employee_id = %member.employee_id,
            work_domain = %member.work_domain,
            "Member registered with {} shares",
            member.share_count()
        );
        Ok(member)
    }

    pub async fn get(&self, member_id: i64) -> Result<Member, AppError> {
        self.store
            .get_member(member_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Member", member_id).into())
    }

    pub async fn find_by_employee_id(&self, employee_id: &str) -> Result<Member, AppError> {
        self.store
            .find_member_by_employee_id(employee_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Member", employee_id).into())
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<Member>, AppError> {
        let filter = if active_only {
            MemberFilter::active()
        } else {
            MemberFilter::default()
        };
        Ok(self.store.list_members(&filter).await?)
    }

    /// Members whose active flag equals `active`
    pub async fn by_status(&self, active: bool) -> Result<Vec<Member>, AppError> {
        let filter = MemberFilter {
            active: Some(active),
            ..Default::default()
        };
        Ok(self.store.list_members(&filter).await?)
    }

    /// Case-insensitive search over names and employee id. A blank keyword
    /// lists every active member.
    pub async fn search(&self, keyword: Option<&str>) -> Result<Vec<Member>, AppError> {
        let keyword = keyword.map(str::trim).filter(|k| !k.is_empty());
        let filter = match keyword {
            Some(keyword) => MemberFilter {
                keyword: Some(keyword.to_string()),
                ..Default::default()
            },
            None => MemberFilter::active(),
        };
        Ok(self.store.list_members(&filter).await?)
    }

    /// Every member of a work domain, active or not, in registration order
    pub async fn by_domain(&self, work_domain: WorkDomain) -> Result<Vec<Member>, AppError> {
        let filter = MemberFilter {
            work_domain: Some(work_domain),
            ..Default::default()
        };
        Ok(self.store.list_members(&filter).await?)
    }

    pub async fn update_profile(
        &self,
        member_id: i64,
        changes: MemberChanges,
    ) -> Result<Member, AppError> {
        let mut member = self.get(member_id).await?;
        member.apply_changes(changes)?;
        self.store.update_member(&member).await?;

        tracing::info!(member_id, "Member profile updated");
        Ok(member)
    }

    // =========================================================================
    // purchase_shares
    // =========================================================================

    pub async fn purchase_shares(&self, member_id: i64, count: i64) -> Result<Member, AppError> {
        let mut member = self.get(member_id).await?;
        let shares = member.purchase_shares(count, self.clock.today())?;

        let issued = self
            .store
            .append_shares(member.id, &shares)
            .await
            .map_err(|e| {
                let first = shares
                    .first()
                    .map(|s| s.certificate_number.as_str())
                    .unwrap_or_default();
                duplicate_or(e, "certificateNumber", first)
            })?;
        member.shares.extend(issued);

        tracing::info!(
            member_id,
            purchased = count,
            total_shares = member.share_count(),
            "Shares purchased"
        );
        Ok(member)
    }

    pub async fn check_eligibility(&self, member_id: i64) -> Result<bool, AppError> {
        Ok(self.get(member_id).await?.is_eligible())
    }

    /// Fail with `Ineligible` unless the member may open accounts
    pub async fn require_eligible(&self, member_id: i64) -> Result<Member, AppError> {
        let member = self.get(member_id).await?;
        if !member.is_eligible() {
            return Err(DomainError::Ineligible { member_id }.into());
        }
        Ok(member)
    }

    pub async fn deactivate(
        &self,
        member_id: i64,
        reason: Option<String>,
    ) -> Result<Member, AppError> {
        let mut member = self.get(member_id).await?;
        member.deactivate(reason, self.clock.today());
        self.store.update_member(&member).await?;

        tracing::info!(
            member_id,
            reason = member.deactivation_reason.as_deref().unwrap_or_default(),
            "Member deactivated"
        );
        Ok(member)
    }

    pub async fn reactivate(&self, member_id: i64) -> Result<Member, AppError> {
        let mut member = self.get(member_id).await?;
        member.reactivate()?;
        self.store.update_member(&member).await?;

        tracing::info!(member_id, "Member reactivated");
        Ok(member)
    }

    pub async fn total_share_value(&self, member_id: i64) -> Result<Decimal, AppError> {
        Ok(self.get(member_id).await?.total_share_value())
    }

    pub async fn counts(&self) -> Result<MemberCounts, AppError> {
        let active = self.store.count_members(Some(true)).await?;
        let inactive = self.store.count_members(Some(false)).await?;
        Ok(MemberCounts {
            active,
            inactive,
            total: active + inactive,
        })
    }
}
