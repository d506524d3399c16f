//! 시뮬레이션 거래소 구현.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hodl_core::{AccountEntry, DecimalExt, DepositRequest, MarketBuyRequest, QUOTE_DECIMALS};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::traits::{Account, DepositReceipt, Exchange, ExchangeResult, OrderReceipt, PaymentMethod};
use crate::ExchangeError;

/// 실패를 주입할 수 있는 거래소 작업.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulatedOperation {
    ListPaymentMethods,
    ListAccounts,
    AccountHistory,
    Transfers,
    MarketBuy,
    Deposit,
}

/// 시뮬레이션 거래소 설정.
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// 연결된 결제 수단
    pub payment_methods: Vec<PaymentMethod>,
    /// 통화별 계좌
    pub accounts: Vec<Account>,
    /// 계좌별 원장 시드
    pub history: HashMap<String, Vec<AccountEntry>>,
    /// 계좌별 이체 내역 시드
    pub transfers: HashMap<String, Vec<AccountEntry>>,
    /// 거래 수수료율 (예: 0.5%의 경우 0.005)
    pub fee_rate: Decimal,
    /// 항상 실패하는 작업
    pub failures: HashSet<SimulatedOperation>,
    /// 매수가 실패하는 기준 통화
    pub failing_buys: HashSet<String>,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            payment_methods: Vec::new(),
            accounts: Vec::new(),
            history: HashMap::new(),
            transfers: HashMap::new(),
            fee_rate: dec!(0.005), // 0.5%
            failures: HashSet::new(),
            failing_buys: HashSet::new(),
        }
    }
}

impl SimulatedConfig {
    /// 결제 수단을 추가합니다.
    pub fn with_payment_method(
        mut self,
        id: &str,
        name: &str,
        method_type: &str,
        currency: &str,
    ) -> Self {
        self.payment_methods.push(PaymentMethod {
            id: id.to_string(),
            name: name.to_string(),
            method_type: method_type.to_string(),
            currency: currency.to_string(),
        });
        self
    }

    /// 보류 잔고 없는 계좌를 추가합니다.
    pub fn with_account(mut self, id: &str, currency: &str, available: Decimal) -> Self {
        self.accounts.push(Account {
            id: id.to_string(),
            currency: currency.to_string(),
            balance: available,
            available,
            hold: Decimal::ZERO,
        });
        self
    }

    /// 계좌 원장 항목을 시드합니다.
    pub fn with_history(mut self, account_id: &str, entries: Vec<AccountEntry>) -> Self {
        self.history
            .entry(account_id.to_string())
            .or_default()
            .extend(entries);
        self
    }

    /// 계좌 이체 내역을 시드합니다.
    pub fn with_transfers(mut self, account_id: &str, entries: Vec<AccountEntry>) -> Self {
        self.transfers
            .entry(account_id.to_string())
            .or_default()
            .extend(entries);
        self
    }

    /// 수수료율을 설정합니다.
    pub fn with_fee_rate(mut self, rate: Decimal) -> Self {
        self.fee_rate = rate;
        self
    }

    /// 작업이 항상 실패하도록 설정합니다.
    pub fn with_failure(mut self, operation: SimulatedOperation) -> Self {
        self.failures.insert(operation);
        self
    }

    /// 특정 기준 통화의 매수가 실패하도록 설정합니다.
    pub fn with_failing_buy(mut self, base_currency: &str) -> Self {
        self.failing_buys.insert(base_currency.to_uppercase());
        self
    }
}

/// 내부 계정 상태.
#[derive(Debug, Clone)]
struct AccountState {
    accounts: Vec<Account>,
    history: HashMap<String, Vec<AccountEntry>>,
    transfers: HashMap<String, Vec<AccountEntry>>,
    buy_requests: Vec<MarketBuyRequest>,
    deposit_requests: Vec<DepositRequest>,
}

impl AccountState {
    fn new(config: &SimulatedConfig) -> Self {
        Self {
            accounts: config.accounts.clone(),
            history: config.history.clone(),
            transfers: config.transfers.clone(),
            buy_requests: Vec::new(),
            deposit_requests: Vec::new(),
        }
    }

    fn account_mut(&mut self, currency: &str) -> ExchangeResult<&mut Account> {
        self.accounts
            .iter_mut()
            .find(|a| a.currency.eq_ignore_ascii_case(currency))
            .ok_or_else(|| ExchangeError::NotFound(format!("no {} account", currency)))
    }

    fn has_account(&self, account_id: &str) -> bool {
        self.accounts.iter().any(|a| a.id == account_id)
    }
}

/// 최신순 정렬된 사본.
fn newest_first(entries: Option<&Vec<AccountEntry>>) -> Vec<AccountEntry> {
    let mut entries = entries.cloned().unwrap_or_default();
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    entries
}

/// 메모리 내 시뮬레이션 거래소.
///
/// 매수는 같은 주문 ID를 공유하는 체결/수수료 원장 항목 쌍을 남기고 법정화폐
/// 계좌에서 차감합니다. 입금은 대기 중 이체 항목을 남깁니다. 따라서 실행
/// 직후 다시 실행하면 이력 게이트가 중복 실행을 막는지 확인할 수 있습니다.
pub struct SimulatedExchange {
    /// 설정
    config: SimulatedConfig,
    /// 계정 상태
    state: Arc<RwLock<AccountState>>,
}

impl SimulatedExchange {
    /// 새로운 시뮬레이션 거래소를 생성합니다.
    pub fn new(config: SimulatedConfig) -> Self {
        let state = AccountState::new(&config);
        Self {
            config,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// 접수된 매수 요청.
    pub async fn buy_requests(&self) -> Vec<MarketBuyRequest> {
        self.state.read().await.buy_requests.clone()
    }

    /// 접수된 입금 요청.
    pub async fn deposit_requests(&self) -> Vec<DepositRequest> {
        self.state.read().await.deposit_requests.clone()
    }

    /// 현재 계좌 스냅샷.
    pub async fn accounts(&self) -> Vec<Account> {
        self.state.read().await.accounts.clone()
    }

    fn check_failure(&self, operation: SimulatedOperation) -> ExchangeResult<()> {
        if self.config.failures.contains(&operation) {
            return Err(ExchangeError::Simulated(format!("{:?} failed", operation)));
        }
        Ok(())
    }

    async fn entries_for(
        &self,
        account_id: &str,
        operation: SimulatedOperation,
    ) -> ExchangeResult<Vec<AccountEntry>> {
        self.check_failure(operation)?;
        let state = self.state.read().await;
        if !state.has_account(account_id) {
            return Err(ExchangeError::NotFound(format!("account {}", account_id)));
        }
        let source = match operation {
            SimulatedOperation::Transfers => &state.transfers,
            _ => &state.history,
        };
        Ok(newest_first(source.get(account_id)))
    }
}

#[async_trait]
impl Exchange for SimulatedExchange {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn list_payment_methods(&self) -> ExchangeResult<Vec<PaymentMethod>> {
        self.check_failure(SimulatedOperation::ListPaymentMethods)?;
        Ok(self.config.payment_methods.clone())
    }

    async fn list_accounts(&self) -> ExchangeResult<Vec<Account>> {
        self.check_failure(SimulatedOperation::ListAccounts)?;
        Ok(self.state.read().await.accounts.clone())
    }

    /// `since`와 관계없이 전체 원장을 돌려줍니다 (경계 페이지 동작).
    async fn get_account_history(
        &self,
        account_id: &str,
        _since: Option<DateTime<Utc>>,
    ) -> ExchangeResult<Vec<AccountEntry>> {
        self.entries_for(account_id, SimulatedOperation::AccountHistory)
            .await
    }

    async fn get_transfers(
        &self,
        account_id: &str,
        _since: Option<DateTime<Utc>>,
    ) -> ExchangeResult<Vec<AccountEntry>> {
        self.entries_for(account_id, SimulatedOperation::Transfers)
            .await
    }

    async fn place_market_buy(&self, request: &MarketBuyRequest) -> ExchangeResult<OrderReceipt> {
        self.check_failure(SimulatedOperation::MarketBuy)?;
        if self.config.failing_buys.contains(&request.product.base) {
            return Err(ExchangeError::ApiError {
                code: 400,
                message: format!("Product {} is not available", request.product),
            });
        }

        let mut state = self.state.write().await;
        let fiat = state.account_mut(&request.product.quote)?;
        if fiat.available < request.funds {
            return Err(ExchangeError::InsufficientBalance(format!(
                "Insufficient funds: need {} {}, have {}",
                request.funds, request.product.quote, fiat.available
            )));
        }
        fiat.available -= request.funds;
        fiat.balance -= request.funds;
        let fiat_id = fiat.id.clone();

        let order_id = Uuid::new_v4().to_string();
        let fee = (request.funds * self.config.fee_rate).quantize_down(QUOTE_DECIMALS);
        let now = Utc::now();
        let ledger = state.history.entry(fiat_id).or_default();
        ledger.push(AccountEntry::trade_match(
            order_id.clone(),
            request.product.clone(),
            -(request.funds - fee),
            now,
        ));
        ledger.push(AccountEntry::fee(order_id.clone(), request.product.clone(), -fee, now));
        state.buy_requests.push(request.clone());

        info!(
            order_id = %order_id,
            product = %request.product,
            funds = %request.funds,
            "Simulated market buy filled"
        );

        Ok(OrderReceipt {
            order_id,
            product_id: request.product.product_id(),
            funds: request.funds,
            status: "done".to_string(),
        })
    }

    async fn deposit(&self, request: &DepositRequest) -> ExchangeResult<DepositReceipt> {
        self.check_failure(SimulatedOperation::Deposit)?;
        if !self
            .config
            .payment_methods
            .iter()
            .any(|m| m.id == request.payment_method_id)
        {
            return Err(ExchangeError::NotFound(format!(
                "payment method {}",
                request.payment_method_id
            )));
        }

        let mut state = self.state.write().await;
        let fiat_id = state.account_mut(&request.currency)?.id.clone();

        let id = Uuid::new_v4().to_string();
        state
            .transfers
            .entry(fiat_id)
            .or_default()
            .push(AccountEntry::deposit(request.amount, Utc::now()).with_id(id.clone()));
        state.deposit_requests.push(request.clone());

        debug!(deposit_id = %id, amount = %request.amount, "Simulated deposit pending");

        Ok(DepositReceipt {
            id,
            amount: request.amount,
            currency: request.currency.clone(),
            payout_at: None,
        })
    }
}
