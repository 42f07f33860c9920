//! API Routes
//!
//! HTTP endpoint definitions. Every handler checks the caller's role with
//! [`authorize`] before touching a component.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Member, MemberChanges, SavingAccount, WorkDomain};
use crate::domain::{Operation, OperationContext, Transaction};
use crate::error::AppError;
use crate::handlers::{
    BulkDepositCommand, BulkDepositResult, LedgerReceipt, MemberCounts, RegisterMemberCommand,
    Services,
};

use super::middleware::authorize;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterMemberRequest {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub work_domain: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MemberListQuery {
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub work_domain: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeactivateQuery {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseSharesRequest {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct EligibilityResponse {
    pub member_id: i64,
    pub eligible: bool,
}

#[derive(Debug, Serialize)]
pub struct ShareValueResponse {
    pub member_id: i64,
    pub share_count: usize,
    pub total_share_value: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountListQuery {
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountSearchQuery {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MemberBalanceResponse {
    pub member_id: i64,
    pub total_balance: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct OpenFormalRequest {
    pub member_id: i64,
    pub monthly_amount: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenInformalRequest {
    pub member_id: i64,
    #[serde(default)]
    pub target_amount: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LedgerRequest {
    pub amount: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DescriptionQuery {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountTotalResponse {
    pub account_id: i64,
    pub total: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct BulkDepositRequest {
    pub work_domain: String,
    pub amount: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Amounts travel as strings; anything `Decimal` cannot read is a bad request
fn parse_amount(field: &str, value: &str) -> Result<Decimal, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidRequest(format!("Invalid {field}: {value}")))
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<Services> {
    Router::new()
        // Members
        .route("/members", post(register_member).get(list_members))
        .route("/members/counts", get(member_counts))
        .route("/members/by-employee/:employee_id", get(get_member_by_employee_id))
        .route("/members/:member_id", get(get_member).patch(update_member))
        .route("/members/:member_id/deactivate", post(deactivate_member))
        .route("/members/:member_id/reactivate", post(reactivate_member))
        .route("/members/:member_id/shares", post(purchase_shares))
        .route("/members/:member_id/eligibility", get(check_eligibility))
        .route("/members/:member_id/share-value", get(share_value))
        .route("/members/:member_id/accounts", get(member_accounts))
        .route("/members/:member_id/balance", get(member_balance))
        // Accounts
        .route("/accounts", get(list_accounts))
        .route("/accounts/formal", post(open_formal))
        .route("/accounts/informal", post(open_informal))
        .route("/accounts/by-number/:account_number", get(get_account_by_number))
        .route("/accounts/:account_id", get(get_account))
        .route("/accounts/:account_id/close", post(close_account))
        .route("/accounts/:account_id/deactivate", post(deactivate_account))
        .route("/accounts/:account_id/reactivate", post(reactivate_account))
        // Ledger
        .route("/accounts/:account_id/deposit", post(deposit))
        .route("/accounts/:account_id/monthly-deposit", post(monthly_deposit))
        .route("/accounts/:account_id/withdraw", post(withdraw))
        .route("/accounts/:account_id/transactions", get(account_transactions))
        .route("/accounts/:account_id/withdrawn-today", get(withdrawn_today))
        .route("/accounts/:account_id/deposited-this-month", get(deposited_this_month))
        .route("/transactions/:reference_number", get(get_transaction))
        // Bulk
        .route("/bulk-deposits", post(bulk_deposit))
}

// =========================================================================
// Members
// =========================================================================

/// Self-service registration; no API key needed
async fn register_member(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<RegisterMemberRequest>,
) -> Result<(StatusCode, Json<Member>), AppError> {
    authorize(&context, Operation::RegisterMember)?;

    let work_domain: WorkDomain = request.work_domain.parse()?;
    let mut command = RegisterMemberCommand::new(
        request.employee_id,
        request.first_name,
        request.last_name,
        work_domain,
    );
    if let Some(email) = request.email {
        command = command.with_email(email);
    }
    if let Some(phone_number) = request.phone_number {
        command = command.with_phone_number(phone_number);
    }

    let member = services.members.register(command).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// `keyword` searches, `work_domain` filters, otherwise members by status
/// (active unless `active=false`)
async fn list_members(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Query(query): Query<MemberListQuery>,
) -> Result<Json<Vec<Member>>, AppError> {
    authorize(&context, Operation::ListMembers)?;

    let members = if let Some(keyword) = query.keyword.as_deref() {
        services.members.search(Some(keyword)).await?
    } else if let Some(work_domain) = query.work_domain.as_deref() {
        services.members.by_domain(work_domain.parse()?).await?
    } else {
        services.members.by_status(query.active.unwrap_or(true)).await?
    };
    Ok(Json(members))
}

async fn member_counts(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<MemberCounts>, AppError> {
    authorize(&context, Operation::ListMembers)?;
    Ok(Json(services.members.counts().await?))
}

async fn get_member(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(member_id): Path<i64>,
) -> Result<Json<Member>, AppError> {
    authorize(&context, Operation::ViewMember)?;
    Ok(Json(services.members.get(member_id).await?))
}

async fn get_member_by_employee_id(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(employee_id): Path<String>,
) -> Result<Json<Member>, AppError> {
    authorize(&context, Operation::ViewMember)?;
    Ok(Json(services.members.find_by_employee_id(&employee_id).await?))
}

async fn update_member(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(member_id): Path<i64>,
    Json(changes): Json<MemberChanges>,
) -> Result<Json<Member>, AppError> {
    authorize(&context, Operation::UpdateMember)?;
    Ok(Json(services.members.update_profile(member_id, changes).await?))
}

async fn deactivate_member(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(member_id): Path<i64>,
    Query(query): Query<DeactivateQuery>,
) -> Result<Json<Member>, AppError> {
    authorize(&context, Operation::DeactivateMember)?;
    Ok(Json(services.members.deactivate(member_id, query.reason).await?))
}

async fn reactivate_member(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(member_id): Path<i64>,
) -> Result<Json<Member>, AppError> {
    authorize(&context, Operation::ReactivateMember)?;
    Ok(Json(services.members.reactivate(member_id).await?))
}

async fn purchase_shares(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(member_id): Path<i64>,
    Json(request): Json<PurchaseSharesRequest>,
) -> Result<(StatusCode, Json<Member>), AppError> {
    authorize(&context, Operation::PurchaseShares)?;
    let member = services.members.purchase_shares(member_id, request.count).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

async fn check_eligibility(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(member_id): Path<i64>,
) -> Result<Json<EligibilityResponse>, AppError> {
    authorize(&context, Operation::CheckEligibility)?;
    let eligible = services.members.check_eligibility(member_id).await?;
    Ok(Json(EligibilityResponse {
        member_id,
        eligible,
    }))
}

async fn share_value(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(member_id): Path<i64>,
) -> Result<Json<ShareValueResponse>, AppError> {
    authorize(&context, Operation::ViewShareValue)?;
    let member = services.members.get(member_id).await?;
    Ok(Json(ShareValueResponse {
        member_id,
        share_count: member.share_count(),
        total_share_value: member.total_share_value(),
    }))
}

async fn member_accounts(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(member_id): Path<i64>,
    Query(query): Query<AccountListQuery>,
) -> Result<Json<Vec<SavingAccount>>, AppError> {
    authorize(&context, Operation::ViewAccounts)?;
    let accounts = if query.active.unwrap_or(false) {
        services.accounts.active_member_accounts(member_id).await?
    } else {
        services.accounts.member_accounts(member_id).await?
    };
    Ok(Json(accounts))
}

async fn member_balance(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(member_id): Path<i64>,
) -> Result<Json<MemberBalanceResponse>, AppError> {
    authorize(&context, Operation::ViewAccounts)?;
    let total_balance = services.accounts.member_total_balance(member_id).await?;
    Ok(Json(MemberBalanceResponse {
        member_id,
        total_balance,
    }))
}

// =========================================================================
// Accounts
// =========================================================================

async fn open_formal(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<OpenFormalRequest>,
) -> Result<(StatusCode, Json<SavingAccount>), AppError> {
    authorize(&context, Operation::OpenAccount)?;
    let monthly_amount = parse_amount("monthly_amount", &request.monthly_amount)?;
    let account = services
        .accounts
        .open_formal(request.member_id, monthly_amount)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn open_informal(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<OpenInformalRequest>,
) -> Result<(StatusCode, Json<SavingAccount>), AppError> {
    authorize(&context, Operation::OpenAccount)?;
    let target_amount = request
        .target_amount
        .as_deref()
        .map(|v| parse_amount("target_amount", v))
        .transpose()?;
    let account = services
        .accounts
        .open_informal(request.member_id, target_amount)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// Every account, optionally narrowed by `search` on number or holder name
async fn list_accounts(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Query(query): Query<AccountSearchQuery>,
) -> Result<Json<Vec<SavingAccount>>, AppError> {
    authorize(&context, Operation::ViewAccounts)?;
    Ok(Json(services.accounts.list(query.search.as_deref()).await?))
}

async fn get_account(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<i64>,
) -> Result<Json<SavingAccount>, AppError> {
    authorize(&context, Operation::ViewAccounts)?;
    Ok(Json(services.accounts.get(account_id).await?))
}

async fn get_account_by_number(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(account_number): Path<String>,
) -> Result<Json<SavingAccount>, AppError> {
    authorize(&context, Operation::ViewAccounts)?;
    Ok(Json(services.accounts.get_by_number(&account_number).await?))
}

async fn close_account(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<i64>,
) -> Result<Json<SavingAccount>, AppError> {
    authorize(&context, Operation::CloseAccount)?;
    Ok(Json(services.accounts.close(account_id).await?))
}

async fn deactivate_account(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<i64>,
) -> Result<Json<SavingAccount>, AppError> {
    authorize(&context, Operation::DeactivateAccount)?;
    Ok(Json(services.accounts.deactivate(account_id).await?))
}

async fn reactivate_account(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<i64>,
) -> Result<Json<SavingAccount>, AppError> {
    authorize(&context, Operation::ReactivateAccount)?;
    Ok(Json(services.accounts.reactivate(account_id).await?))
}

// =========================================================================
// Ledger
// =========================================================================

async fn deposit(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<i64>,
    Json(request): Json<LedgerRequest>,
) -> Result<(StatusCode, Json<LedgerReceipt>), AppError> {
    authorize(&context, Operation::Deposit)?;
    let amount = parse_amount("amount", &request.amount)?;
    let receipt = services
        .ledger
        .deposit(account_id, amount, request.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn monthly_deposit(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<i64>,
    Query(query): Query<DescriptionQuery>,
) -> Result<(StatusCode, Json<LedgerReceipt>), AppError> {
    authorize(&context, Operation::Deposit)?;
    let receipt = services
        .ledger
        .monthly_deposit(account_id, query.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn withdraw(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<i64>,
    Json(request): Json<LedgerRequest>,
) -> Result<(StatusCode, Json<LedgerReceipt>), AppError> {
    authorize(&context, Operation::Withdraw)?;
    let amount = parse_amount("amount", &request.amount)?;
    let receipt = services
        .ledger
        .withdraw(account_id, amount, request.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn account_transactions(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<i64>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    authorize(&context, Operation::ViewTransactions)?;
    Ok(Json(services.ledger.transactions(account_id).await?))
}

async fn withdrawn_today(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<i64>,
) -> Result<Json<AccountTotalResponse>, AppError> {
    authorize(&context, Operation::ViewTransactions)?;
    let total = services.ledger.withdrawn_today(account_id).await?;
    Ok(Json(AccountTotalResponse { account_id, total }))
}

async fn deposited_this_month(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<i64>,
) -> Result<Json<AccountTotalResponse>, AppError> {
    authorize(&context, Operation::ViewTransactions)?;
    let total = services.ledger.deposited_this_month(account_id).await?;
    Ok(Json(AccountTotalResponse { account_id, total }))
}

async fn get_transaction(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Path(reference_number): Path<String>,
) -> Result<Json<Transaction>, AppError> {
    authorize(&context, Operation::ViewTransactions)?;
    Ok(Json(services.ledger.find_by_reference(&reference_number).await?))
}

// =========================================================================
// Bulk
// =========================================================================

async fn bulk_deposit(
    State(services): State<Services>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<BulkDepositRequest>,
) -> Result<Json<BulkDepositResult>, AppError> {
    authorize(&context, Operation::BulkDeposit)?;

    let amount = parse_amount("amount", &request.amount)?;
    let mut command = BulkDepositCommand::new(request.work_domain, amount);
    if let Some(description) = request.description {
        command = command.with_description(description);
    }

    tracing::info!(
        staff_id = ?context.staff_id,
        correlation_id = ?context.correlation_id,
        work_domain = %command.work_domain,
        amount = %command.amount,
        "Bulk deposit requested"
    );

    Ok(Json(services.bulk.bulk_deposit_by_domain(command).await?))
}
