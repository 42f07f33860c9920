//! PostgreSQL store
//!
//! Ledger units run inside a database transaction that locks the account
//! row with `SELECT ... FOR UPDATE`, so concurrent deposits and withdrawals
//! on one account queue behind each other while other accounts proceed.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres};
use std::collections::HashMap;
use uuid::Uuid;

use super::{LedgerUnit, MemberFilter, Store, StoreError};
use crate::aggregate::{AccountKind, AccountTerms, Member, NewShare, SavingAccount, Share};
use crate::domain::{Amount, Balance, NewTransaction, Staff, Transaction, TransactionType};

const MEMBER_SELECT: &str = r#"
    SELECT id, employee_id, first_name, last_name, work_domain, email, phone_number,
           registration_date, registration_fee, is_active, deactivation_date, deactivation_reason
    FROM members
"#;

const SHARE_SELECT: &str = r#"
    SELECT id, member_id, certificate_number, share_value, purchase_date, is_active
    FROM shares
"#;

const ACCOUNT_SELECT: &str = r#"
    SELECT id, account_number, account_type, member_id, current_balance, opening_date, is_active,
           monthly_amount, last_monthly_deposit_date, maturity_date, interest_rate,
           target_amount, daily_withdrawal_limit, minimum_balance
    FROM saving_accounts
"#;

const TRANSACTION_SELECT: &str = r#"
    SELECT id, account_id, amount, transaction_type, description, reference_number, transaction_date
    FROM transactions
"#;

// =============================================================================
// Row mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    id: i64,
    employee_id: String,
    first_name: String,
    last_name: String,
    work_domain: String,
    email: Option<String>,
    phone_number: Option<String>,
    registration_date: NaiveDate,
    registration_fee: Decimal,
    is_active: bool,
    deactivation_date: Option<NaiveDate>,
    deactivation_reason: Option<String>,
}

impl MemberRow {
    fn into_member(self, shares: Vec<Share>) -> Result<Member, StoreError> {
        Ok(Member {
            id: self.id,
            work_domain: self
                .work_domain
                .parse()
                .map_err(|e: crate::domain::DomainError| StoreError::InvalidData(e.to_string()))?,
            employee_id: self.employee_id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone_number: self.phone_number,
            registration_date: self.registration_date,
            registration_fee: self.registration_fee,
            is_active: self.is_active,
            deactivation_date: self.deactivation_date,
            deactivation_reason: self.deactivation_reason,
            shares,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ShareRow {
    id: i64,
    member_id: i64,
    certificate_number: String,
    share_value: Decimal,
    purchase_date: NaiveDate,
    is_active: bool,
}

impl From<ShareRow> for Share {
    fn from(row: ShareRow) -> Self {
        Share {
            id: row.id,
            member_id: row.member_id,
            certificate_number: row.certificate_number,
            share_value: row.share_value,
            purchase_date: row.purchase_date,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: i64,
    account_number: String,
    account_type: String,
    member_id: i64,
    current_balance: Decimal,
    opening_date: NaiveDate,
    is_active: bool,
    monthly_amount: Option<Decimal>,
    last_monthly_deposit_date: Option<NaiveDate>,
    maturity_date: Option<NaiveDate>,
    interest_rate: Option<Decimal>,
    target_amount: Option<Decimal>,
    daily_withdrawal_limit: Option<Decimal>,
    minimum_balance: Option<Decimal>,
}

impl TryFrom<AccountRow> for SavingAccount {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let kind: AccountKind = row
            .account_type
            .parse()
            .map_err(|e: crate::domain::DomainError| StoreError::InvalidData(e.to_string()))?;

        let terms = match kind {
            AccountKind::Formal => AccountTerms::Formal {
                monthly_amount: row.monthly_amount.ok_or_else(|| {
                    StoreError::InvalidData(format!(
                        "formal account {} has no monthly amount",
                        row.account_number
                    ))
                })?,
                last_monthly_deposit_date: row.last_monthly_deposit_date,
                maturity_date: row.maturity_date,
                interest_rate: row
                    .interest_rate
                    .unwrap_or_else(crate::aggregate::account::default_interest_rate),
            },
            AccountKind::Informal => AccountTerms::Informal {
                target_amount: row.target_amount,
                daily_withdrawal_limit: row.daily_withdrawal_limit.unwrap_or_else(|| {
                    Decimal::from(crate::aggregate::account::DEFAULT_DAILY_WITHDRAWAL_LIMIT)
                }),
                minimum_balance: row.minimum_balance.unwrap_or(Decimal::ZERO),
            },
        };

        Ok(SavingAccount {
            id: row.id,
            current_balance: Balance::new(row.current_balance)
                .map_err(|e| StoreError::InvalidData(e.to_string()))?,
            account_number: row.account_number,
            member_id: row.member_id,
            opening_date: row.opening_date,
            is_active: row.is_active,
            terms,
        })
    }
}

/// Variant columns of `saving_accounts`; NULL where the variant has no such field
#[derive(Debug, Default)]
struct TermsColumns {
    monthly_amount: Option<Decimal>,
    last_monthly_deposit_date: Option<NaiveDate>,
    maturity_date: Option<NaiveDate>,
    interest_rate: Option<Decimal>,
    target_amount: Option<Decimal>,
    daily_withdrawal_limit: Option<Decimal>,
    minimum_balance: Option<Decimal>,
}

impl From<&AccountTerms> for TermsColumns {
    fn from(terms: &AccountTerms) -> Self {
        match terms {
            AccountTerms::Formal {
                monthly_amount,
                last_monthly_deposit_date,
                maturity_date,
                interest_rate,
            } => Self {
                monthly_amount: Some(*monthly_amount),
                last_monthly_deposit_date: *last_monthly_deposit_date,
                maturity_date: *maturity_date,
                interest_rate: Some(*interest_rate),
                ..Default::default()
            },
            AccountTerms::Informal {
                target_amount,
                daily_withdrawal_limit,
                minimum_balance,
            } => Self {
                target_amount: *target_amount,
                daily_withdrawal_limit: Some(*daily_withdrawal_limit),
                minimum_balance: Some(*minimum_balance),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    account_id: i64,
    amount: Decimal,
    transaction_type: String,
    description: Option<String>,
    reference_number: String,
    transaction_date: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            account_id: row.account_id,
            amount: Amount::new(row.amount).map_err(|e| StoreError::InvalidData(e.to_string()))?,
            transaction_type: row
                .transaction_type
                .parse()
                .map_err(|e: crate::domain::DomainError| StoreError::InvalidData(e.to_string()))?,
            description: row.description,
            reference_number: row.reference_number,
            transaction_date: row.transaction_date,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StaffRow {
    id: Uuid,
    username: String,
    role: String,
    key_hash: String,
    is_active: bool,
}

impl TryFrom<StaffRow> for Staff {
    type Error = StoreError;

    fn try_from(row: StaffRow) -> Result<Self, Self::Error> {
        Ok(Staff {
            id: row.id,
            username: row.username,
            role: row
                .role
                .parse()
                .map_err(|e: crate::domain::DomainError| StoreError::InvalidData(e.to_string()))?,
            key_hash: row.key_hash,
            is_active: row.is_active,
        })
    }
}

fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .trim()
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

// =============================================================================
// PgStore
// =============================================================================

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach shares to member rows, preserving row order
    async fn with_shares(&self, rows: Vec<MemberRow>) -> Result<Vec<Member>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

        let share_rows: Vec<ShareRow> =
            sqlx::query_as(&format!("{SHARE_SELECT} WHERE member_id = ANY($1) ORDER BY id"))
                .bind(&ids)
                .fetch_all(&self.pool)
                .await?;

        let mut by_member: HashMap<i64, Vec<Share>> = HashMap::new();
        for row in share_rows {
            by_member.entry(row.member_id).or_default().push(row.into());
        }

        rows.into_iter()
            .map(|row| {
                let shares = by_member.remove(&row.id).unwrap_or_default();
                row.into_member(shares)
            })
            .collect()
    }

    async fn insert_shares(
        conn: &mut PgConnection,
        member_id: i64,
        shares: &[NewShare],
    ) -> Result<Vec<Share>, StoreError> {
        let mut issued = Vec::with_capacity(shares.len());
        for share in shares {
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO shares
                    (member_id, certificate_number, share_value, purchase_date, is_active)
                VALUES ($1, $2, $3, $4, TRUE)
                RETURNING id
                "#,
            )
            .bind(member_id)
            .bind(&share.certificate_number)
            .bind(share.share_value)
            .bind(share.purchase_date)
            .fetch_one(&mut *conn)
            .await
            .map_err(StoreError::from_sqlx)?;

            issued.push(share.clone().into_share(id, member_id));
        }
        Ok(issued)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_member(
        &self,
        member: &Member,
        shares: &[NewShare],
    ) -> Result<Member, StoreError> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO members (employee_id, first_name, last_name, work_domain, email,
                                 phone_number, registration_date, registration_fee, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&member.employee_id)
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(member.work_domain.as_str())
        .bind(&member.email)
        .bind(&member.phone_number)
        .bind(member.registration_date)
        .bind(member.registration_fee)
        .bind(member.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        let issued = Self::insert_shares(&mut tx, id, shares).await?;
        tx.commit().await?;

        Ok(Member {
            id,
            shares: issued,
            ..member.clone()
        })
    }

    async fn get_member(&self, member_id: i64) -> Result<Option<Member>, StoreError> {
        let row: Option<MemberRow> = sqlx::query_as(&format!("{MEMBER_SELECT} WHERE id = $1"))
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(self.with_shares(row.into_iter().collect()).await?.pop())
    }

    async fn find_member_by_employee_id(
        &self,
        employee_id: &str,
    ) -> Result<Option<Member>, StoreError> {
        let row: Option<MemberRow> =
            sqlx::query_as(&format!("{MEMBER_SELECT} WHERE employee_id = $1"))
                .bind(employee_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(self.with_shares(row.into_iter().collect()).await?.pop())
    }

    async fn list_members(&self, filter: &MemberFilter) -> Result<Vec<Member>, StoreError> {
        let rows: Vec<MemberRow> = sqlx::query_as(&format!(
            r#"{MEMBER_SELECT}
            WHERE ($1::BOOLEAN IS NULL OR is_active = $1)
              AND ($2::VARCHAR IS NULL OR work_domain = $2)
              AND ($3::VARCHAR IS NULL
                   OR LOWER(first_name) LIKE $3
                   OR LOWER(last_name) LIKE $3
                   OR LOWER(employee_id) LIKE $3)
            ORDER BY id
            "#
        ))
        .bind(filter.active)
        .bind(filter.work_domain.map(|d| d.as_str()))
        .bind(filter.keyword.as_deref().map(like_pattern))
        .fetch_all(&self.pool)
        .await?;

        self.with_shares(rows).await
    }

    async fn count_members(&self, active: Option<bool>) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM members WHERE ($1::BOOLEAN IS NULL OR is_active = $1)",
        )
        .bind(active)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn update_member(&self, member: &Member) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE members
            SET first_name = $2, last_name = $3, email = $4, phone_number = $5,
                is_active = $6, deactivation_date = $7, deactivation_reason = $8
            WHERE id = $1
            "#,
        )
        .bind(member.id)
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.email)
        .bind(&member.phone_number)
        .bind(member.is_active)
        .bind(member.deactivation_date)
        .bind(&member.deactivation_reason)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("member {}", member.id)));
        }
        Ok(())
    }

    async fn append_shares(
        &self,
        member_id: i64,
        shares: &[NewShare],
    ) -> Result<Vec<Share>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let issued = Self::insert_shares(&mut tx, member_id, shares).await?;
        tx.commit().await?;
        Ok(issued)
    }

    async fn account_number_exists(&self, account_number: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM saving_accounts WHERE account_number = $1)",
        )
        .bind(account_number)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_account(&self, account: &SavingAccount) -> Result<SavingAccount, StoreError> {
        let columns = TermsColumns::from(&account.terms);

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO saving_accounts (
                account_number, account_type, member_id, current_balance, opening_date, is_active,
                monthly_amount, last_monthly_deposit_date, maturity_date, interest_rate,
                target_amount, daily_withdrawal_limit, minimum_balance
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(&account.account_number)
        .bind(account.kind().as_str())
        .bind(account.member_id)
        .bind(account.balance())
        .bind(account.opening_date)
        .bind(account.is_active)
        .bind(columns.monthly_amount)
        .bind(columns.last_monthly_deposit_date)
        .bind(columns.maturity_date)
        .bind(columns.interest_rate)
        .bind(columns.target_amount)
        .bind(columns.daily_withdrawal_limit)
        .bind(columns.minimum_balance)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(SavingAccount {
            id,
            ..account.clone()
        })
    }

    async fn get_account(&self, account_id: i64) -> Result<Option<SavingAccount>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!("{ACCOUNT_SELECT} WHERE id = $1"))
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(SavingAccount::try_from).transpose()
    }

    async fn find_account_by_number(
        &self,
        account_number: &str,
    ) -> Result<Option<SavingAccount>, StoreError> {
        let row: Option<AccountRow> =
            sqlx::query_as(&format!("{ACCOUNT_SELECT} WHERE account_number = $1"))
                .bind(account_number)
                .fetch_optional(&self.pool)
                .await?;
        row.map(SavingAccount::try_from).transpose()
    }

    async fn list_accounts(&self, search: Option<&str>) -> Result<Vec<SavingAccount>, StoreError> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            r#"{ACCOUNT_SELECT}
            WHERE $1::VARCHAR IS NULL
               OR LOWER(account_number) LIKE $1
               OR member_id IN (
                   SELECT id FROM members WHERE LOWER(first_name || ' ' || last_name) LIKE $1
               )
            ORDER BY id
            "#
        ))
        .bind(search.map(like_pattern))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SavingAccount::try_from).collect()
    }

    async fn member_accounts(
        &self,
        member_id: i64,
        active_only: bool,
    ) -> Result<Vec<SavingAccount>, StoreError> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            r#"{ACCOUNT_SELECT}
            WHERE member_id = $1 AND (is_active OR NOT $2)
            ORDER BY opening_date, id
            "#
        ))
        .bind(member_id)
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SavingAccount::try_from).collect()
    }

    async fn count_accounts(
        &self,
        member_id: i64,
        kind: AccountKind,
        active_only: bool,
    ) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM saving_accounts
            WHERE member_id = $1 AND account_type = $2 AND (is_active OR NOT $3)
            "#,
        )
        .bind(member_id)
        .bind(kind.as_str())
        .bind(active_only)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn begin_ledger(
        &self,
        account_id: i64,
    ) -> Result<Option<Box<dyn LedgerUnit>>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<AccountRow> =
            sqlx::query_as(&format!("{ACCOUNT_SELECT} WHERE id = $1 FOR UPDATE"))
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let unit: Box<dyn LedgerUnit> = Box::new(PgLedgerUnit {
            tx,
            account: SavingAccount::try_from(row)?,
        });
        Ok(Some(unit))
    }

    async fn account_transactions(&self, account_id: i64) -> Result<Vec<Transaction>, StoreError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "{TRANSACTION_SELECT} WHERE account_id = $1 ORDER BY transaction_date DESC, id DESC"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let row: Option<TransactionRow> =
            sqlx::query_as(&format!("{TRANSACTION_SELECT} WHERE reference_number = $1"))
                .bind(reference)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn transaction_total(
        &self,
        account_id: i64,
        kind: TransactionType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Decimal, StoreError> {
        let mut conn = self.pool.acquire().await?;
        sum_transactions(&mut conn, account_id, kind, from, to).await
    }

    async fn find_staff_by_key_hash(&self, key_hash: &str) -> Result<Option<Staff>, StoreError> {
        let row: Option<StaffRow> = sqlx::query_as(
            r#"
            SELECT id, username, role, key_hash, is_active
            FROM staff_api_keys
            WHERE key_hash = $1
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Staff::try_from).transpose()
    }

    async fn upsert_staff(&self, staff: &Staff) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO staff_api_keys (id, username, role, key_hash, is_active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (username) DO UPDATE
            SET role = EXCLUDED.role, key_hash = EXCLUDED.key_hash, is_active = EXCLUDED.is_active
            "#,
        )
        .bind(staff.id)
        .bind(&staff.username)
        .bind(staff.role.as_str())
        .bind(&staff.key_hash)
        .bind(staff.is_active)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }
}

async fn sum_transactions(
    conn: &mut PgConnection,
    account_id: i64,
    kind: TransactionType,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Decimal, StoreError> {
    let total: Decimal = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(amount), 0) FROM transactions
        WHERE account_id = $1 AND transaction_type = $2
          AND transaction_date >= $3 AND transaction_date < $4
        "#,
    )
    .bind(account_id)
    .bind(kind.as_str())
    .bind(from)
    .bind(to)
    .fetch_one(conn)
    .await?;
    Ok(total)
}

// =============================================================================
// Ledger unit
// =============================================================================

struct PgLedgerUnit {
    tx: sqlx::Transaction<'static, Postgres>,
    account: SavingAccount,
}

async fn write_account(conn: &mut PgConnection, account: &SavingAccount) -> Result<(), StoreError> {
    let columns = TermsColumns::from(&account.terms);
    let result = sqlx::query(
        r#"
        UPDATE saving_accounts
        SET current_balance = $2, is_active = $3, last_monthly_deposit_date = $4, maturity_date = $5
        WHERE id = $1
        "#,
    )
    .bind(account.id)
    .bind(account.balance())
    .bind(account.is_active)
    .bind(columns.last_monthly_deposit_date)
    .bind(columns.maturity_date)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("account {}", account.id)));
    }
    Ok(())
}

#[async_trait]
impl LedgerUnit for PgLedgerUnit {
    fn account(&self) -> &SavingAccount {
        &self.account
    }

    async fn transaction_total(
        &mut self,
        kind: TransactionType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Decimal, StoreError> {
        sum_transactions(&mut self.tx, self.account.id, kind, from, to).await
    }

    async fn reference_exists(&mut self, reference: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM transactions WHERE reference_number = $1)",
        )
        .bind(reference)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn post(
        self: Box<Self>,
        account: &SavingAccount,
        entry: NewTransaction,
    ) -> Result<Transaction, StoreError> {
        let mut tx = self.tx;
        write_account(&mut tx, account).await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (account_id, amount, transaction_type, description,
                                      reference_number, transaction_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(entry.account_id)
        .bind(entry.amount.value())
        .bind(entry.transaction_type.as_str())
        .bind(&entry.description)
        .bind(&entry.reference_number)
        .bind(entry.transaction_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        tx.commit().await?;
        Ok(entry.into_transaction(id))
    }

    async fn save(self: Box<Self>, account: &SavingAccount) -> Result<(), StoreError> {
        let mut tx = self.tx;
        write_account(&mut tx, account).await?;
        tx.commit().await?;
        Ok(())
    }
}
