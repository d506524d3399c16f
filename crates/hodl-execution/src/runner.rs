//! 정기 입금/매수 실행기.
//!
//! 한 번의 실행은 다음 순서로 진행됩니다:
//! 1. 결제 수단 확인 (유형 + 이름 부분 일치)
//! 2. 결제 수단 통화의 법정화폐 계좌 확인
//! 3. 입금 단계: 이체 내역으로 이번 주기 입금 여부를 판단하고 필요 시 입금
//! 4. 매수 단계: 원장으로 자산별 매수 여부를 판단하고 필요 시 시장가 매수
//!
//! 1, 2단계 실패는 상태 변경 호출 전에 실행 전체를 중단합니다. 입금과 매수
//! 단계는 서로 독립적이며 한 단계의 실패가 다른 단계를 막지 않습니다.
//! 재시도는 없습니다. 다음 실행이 이력을 다시 읽어 판단합니다.

use chrono::Utc;
use hodl_core::{
    compute_allocation, phase_span, AllocationWeights, BuyGate, DecimalExt, DepositRequest,
    HodlConfig, MarketBuyRequest, Money, ProductPair, RecurrenceDecision, RecurrenceWindow,
    Tolerance, QUOTE_DECIMALS,
};
use hodl_exchange::{Account, Exchange, ExchangeError, PaymentMethod};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn, Instrument};

use crate::report::{AssetOutcome, BuyOutcome, DepositOutcome, RunReport};
use crate::sink::StatusSink;

/// 실행 전체를 중단시키는 오류.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("No {method_type} payment method matching '{name}'")]
    PaymentMethodNotFound { method_type: String, name: String },

    #[error("No {0} account found")]
    FiatAccountNotFound(String),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),
}

/// 실행 설정.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// 결제 수단 이름 부분 문자열
    pub deposit_account_name: String,
    /// 결제 수단 유형
    pub deposit_account_type: String,
    /// 주기당 입금액
    pub deposit_amount: Decimal,
    /// 주기당 매수 총액
    pub buy_amount: Decimal,
    /// 매수에 필요한 최소 가용 잔고
    pub min_available: Decimal,
    /// 배분 비율
    pub weights: AllocationWeights,
    /// 매수 게이트 단위
    pub gate: BuyGate,
    /// 주기 (일)
    pub interval_days: u32,
    /// 허용 오차
    pub tolerance: Tolerance,
    /// 드라이런
    pub dry_run: bool,
}

impl From<&HodlConfig> for RunSettings {
    fn from(config: &HodlConfig) -> Self {
        Self {
            deposit_account_name: config.deposit.account_name.clone(),
            deposit_account_type: config.deposit.account_type.clone(),
            deposit_amount: config.deposit.amount,
            buy_amount: config.buy.amount,
            min_available: config.buy.threshold(),
            weights: config.buy.weights(),
            gate: config.buy.gate,
            interval_days: config.schedule.interval_days,
            tolerance: config.schedule.tolerance,
            dry_run: config.dry_run,
        }
    }
}

/// 정기 입금/매수 실행기.
pub struct HodlRunner {
    exchange: Arc<dyn Exchange>,
    sink: Arc<dyn StatusSink>,
    settings: RunSettings,
}

impl HodlRunner {
    pub fn new(
        exchange: Arc<dyn Exchange>,
        sink: Arc<dyn StatusSink>,
        settings: RunSettings,
    ) -> Self {
        Self {
            exchange,
            sink,
            settings,
        }
    }

    /// 한 번의 실행을 수행합니다.
    ///
    /// # Errors
    /// 결제 수단이나 법정화폐 계좌를 확인할 수 없으면 `RunError`를 반환합니다.
    /// 단계별 실패는 `RunReport`에 기록됩니다.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let window = RecurrenceWindow::days(Utc::now(), self.settings.interval_days);
        let decider = RecurrenceDecision::new(window, self.settings.tolerance);

        info!(
            exchange = self.exchange.name(),
            window = %window,
            tolerance = %self.settings.tolerance,
            dry_run = self.settings.dry_run,
            "Starting recurring run"
        );
        if self.settings.dry_run {
            self.status("Dry run: no deposits or orders will be placed");
        }

        let method = self.resolve_payment_method().await?;
        let fiat = self.resolve_fiat_account(&method.currency).await?;

        let deposit = self
            .deposit_phase(&decider, &method, &fiat)
            .instrument(phase_span!("deposit", fiat.currency))
            .await;

        let (buys, buy_phase_error) = self
            .buy_phase(&decider, &fiat)
            .instrument(phase_span!("buy", fiat.currency))
            .await;

        let report = RunReport {
            deposit,
            buys,
            buy_phase_error,
            dry_run: self.settings.dry_run,
        };

        info!(
            orders = report.orders_placed(),
            failed = report.has_failures(),
            "Recurring run finished"
        );
        Ok(report)
    }

    fn status(&self, message: &str) {
        debug!(sink = self.sink.name(), "{}", message);
        self.sink.emit(message);
    }

    fn interval_label(&self) -> String {
        format!("the last {} days", self.settings.interval_days)
    }

    /// 유형과 이름 부분 문자열로 결제 수단을 찾습니다.
    async fn resolve_payment_method(&self) -> Result<PaymentMethod, RunError> {
        let methods = self.exchange.list_payment_methods().await?;
        let method_type = &self.settings.deposit_account_type;
        let name = &self.settings.deposit_account_name;

        methods
            .into_iter()
            .find(|m| m.matches(method_type, name))
            .ok_or_else(|| {
                error!(method_type = %method_type, name = %name, "Payment method not found");
                RunError::PaymentMethodNotFound {
                    method_type: method_type.clone(),
                    name: name.clone(),
                }
            })
    }

    async fn resolve_fiat_account(&self, currency: &str) -> Result<Account, RunError> {
        let accounts = self.exchange.list_accounts().await?;
        accounts
            .into_iter()
            .find(|a| a.currency.eq_ignore_ascii_case(currency))
            .ok_or_else(|| {
                error!(currency, "Fiat account not found");
                RunError::FiatAccountNotFound(currency.to_string())
            })
    }

    /// 입금 단계.
    async fn deposit_phase(
        &self,
        decider: &RecurrenceDecision,
        method: &PaymentMethod,
        fiat: &Account,
    ) -> DepositOutcome {
        let amount = self.settings.deposit_amount.quantize_down(QUOTE_DECIMALS);
        if amount.is_zero() {
            debug!("Deposit amount is zero, skipping deposit phase");
            return DepositOutcome::Disabled;
        }

        let since = decider.matcher().window().start();
        let transfers = match self.exchange.get_transfers(&fiat.id, Some(since)).await {
            Ok(transfers) => transfers,
            Err(e) => {
                error!(error = %e, retryable = e.is_retryable(), "Failed to fetch transfers");
                self.status(&format!("Could not check recent deposits: {}", e));
                return DepositOutcome::Failed(e.to_string());
            }
        };

        if let Some(evidence) = decider.deposit(&transfers, amount).evidence() {
            info!(%evidence, "Deposit already made this interval");
            self.status(&format!(
                "Already deposited {} in {} ({})",
                Money::new(amount, &method.currency),
                self.interval_label(),
                evidence
            ));
            return DepositOutcome::AlreadyDone(evidence.clone());
        }

        let request = DepositRequest::new(amount, &method.currency, &method.id);
        let money = Money::new(request.amount, &request.currency);
        if self.settings.dry_run {
            self.status(&format!("Would deposit {} from {}", money, method.name));
            return DepositOutcome::DryRun(request);
        }

        self.status(&format!("Depositing {} from {}", money, method.name));
        match self.exchange.deposit(&request).await {
            Ok(receipt) => {
                info!(deposit_id = %receipt.id, "Deposit requested");
                DepositOutcome::Deposited(receipt)
            }
            Err(e) => {
                error!(error = %e, fatal = e.is_fatal(), "Deposit failed");
                self.status(&format!("Deposit failed: {}", e));
                DepositOutcome::Failed(e.to_string())
            }
        }
    }

    /// 매수 단계.
    async fn buy_phase(
        &self,
        decider: &RecurrenceDecision,
        fiat: &Account,
    ) -> (Vec<AssetOutcome>, Option<String>) {
        if self.settings.weights.is_empty() {
            self.status("No allocation configured, skipping buys");
            return (Vec::new(), None);
        }
        if self.settings.weights.total_fraction() > Decimal::ONE {
            warn!(
                total = %self.settings.weights.total_fraction(),
                "Allocation fractions sum to more than 1"
            );
        }

        let since = decider.matcher().window().start();
        let history = match self.exchange.get_account_history(&fiat.id, Some(since)).await {
            Ok(history) => history,
            Err(e) => {
                error!(error = %e, retryable = e.is_retryable(), "Failed to fetch account history");
                self.status(&format!("Could not check recent buys: {}", e));
                return (Vec::new(), Some(e.to_string()));
            }
        };

        let plan = compute_allocation(self.settings.buy_amount, &self.settings.weights);
        let decisions = decider.buys(&history, &plan, self.settings.gate);
        let due = decisions.iter().filter(|d| d.decision.is_act()).count();
        debug!(planned = plan.len(), due, gate = %self.settings.gate, "Buy decisions computed");

        let funds_ok = fiat.available >= self.settings.min_available;
        if due > 0 && !funds_ok {
            warn!(
                available = %fiat.available,
                required = %self.settings.min_available,
                "Insufficient available balance for buys"
            );
            self.status(&format!(
                "Not enough available funds to buy: {} available, {} required",
                Money::new(fiat.available, &fiat.currency),
                Money::new(self.settings.min_available, &fiat.currency)
            ));
        }

        let mut outcomes = Vec::with_capacity(decisions.len());
        for decision in decisions {
            let outcome = match decision.decision.evidence() {
                Some(evidence) => {
                    self.status(&format!(
                        "Already bought {} in {} ({})",
                        decision.currency,
                        self.interval_label(),
                        evidence
                    ));
                    BuyOutcome::AlreadyBought(evidence.clone())
                }
                None if !funds_ok => BuyOutcome::InsufficientBalance {
                    available: fiat.available,
                    required: self.settings.min_available,
                },
                None => {
                    self.buy_asset(&decision.currency, decision.target, &fiat.currency)
                        .instrument(phase_span!("buy", fiat.currency, decision.currency))
                        .await
                }
            };
            outcomes.push(AssetOutcome {
                currency: decision.currency,
                target: decision.target,
                outcome,
            });
        }

        (outcomes, None)
    }

    /// 자산 하나를 매수합니다. 실패해도 다음 자산은 계속 진행됩니다.
    async fn buy_asset(&self, currency: &str, target: Decimal, quote: &str) -> BuyOutcome {
        let funds = target.quantize_down(QUOTE_DECIMALS);
        if funds.is_zero() {
            self.status(&format!(
                "Skipping {}: {} {} is below the quote increment",
                currency, target, quote
            ));
            return BuyOutcome::BelowIncrement;
        }

        let request = MarketBuyRequest::new(ProductPair::new(currency, quote), funds);
        let money = Money::new(request.funds, quote);
        if self.settings.dry_run {
            self.status(&format!("Would buy {} of {}", money, currency));
            return BuyOutcome::DryRun(request);
        }

        self.status(&format!("Buying {} of {}", money, currency));
        match self.exchange.place_market_buy(&request).await {
            Ok(receipt) => {
                info!(order_id = %receipt.order_id, "Market buy placed");
                BuyOutcome::Bought(receipt)
            }
            Err(e) => {
                error!(error = %e, fatal = e.is_fatal(), "Market buy failed");
                self.status(&format!("Buy of {} failed: {}", currency, e));
                BuyOutcome::Failed(e.to_string())
            }
        }
    }
}
