//! 실행기 통합 테스트 (시뮬레이션 거래소).

use chrono::{Duration, Utc};
use hodl_core::{AccountEntry, AllocationWeights, BuyGate, ProductPair, Tolerance};
use hodl_exchange::{SimulatedConfig, SimulatedExchange, SimulatedOperation};
use hodl_execution::{
    BuyOutcome, DepositOutcome, HodlRunner, RecordingSink, RunError, RunSettings,
};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn settings() -> RunSettings {
    RunSettings {
        deposit_account_name: "1234".to_string(),
        deposit_account_type: "ach_bank_account".to_string(),
        deposit_amount: dec!(100.00),
        buy_amount: dec!(100.00),
        min_available: dec!(100.00),
        weights: AllocationWeights::new()
            .with("BTC", dec!(0.50))
            .with("ETH", dec!(0.30))
            .with("LTC", dec!(0.20)),
        gate: BuyGate::PerAsset,
        interval_days: 15,
        tolerance: Tolerance::default(),
        dry_run: false,
    }
}

fn base_config() -> SimulatedConfig {
    SimulatedConfig::default()
        .with_payment_method("pm-savings", "Savings ******9999", "ach_bank_account", "USD")
        .with_payment_method("pm-checking", "Checking ******1234", "ach_bank_account", "USD")
        .with_account("usd-1", "USD", dec!(500.00))
        .with_account("btc-1", "BTC", dec!(0))
}

fn runner(
    exchange: &Arc<SimulatedExchange>,
    settings: RunSettings,
) -> (HodlRunner, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let runner = HodlRunner::new(exchange.clone(), sink.clone(), settings);
    (runner, sink)
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let exchange = Arc::new(SimulatedExchange::new(base_config()));

    let (first, _) = runner(&exchange, settings());
    let report = first.run().await.unwrap();

    assert!(matches!(report.deposit, DepositOutcome::Deposited(_)));
    assert_eq!(report.orders_placed(), 3);
    assert!(!report.has_failures());

    let deposits = exchange.deposit_requests().await;
    assert_eq!(deposits.len(), 1);
    assert_eq!(deposits[0].payment_method_id, "pm-checking");
    assert_eq!(deposits[0].amount, dec!(100.00));

    let (second, sink) = runner(&exchange, settings());
    let report = second.run().await.unwrap();

    assert!(matches!(report.deposit, DepositOutcome::AlreadyDone(_)));
    assert!(report
        .buys
        .iter()
        .all(|b| matches!(b.outcome, BuyOutcome::AlreadyBought(_))));
    assert_eq!(exchange.deposit_requests().await.len(), 1);
    assert_eq!(exchange.buy_requests().await.len(), 3);
    assert!(sink.contains("Already deposited 100.00 USD"));
    assert!(sink.contains("Already bought BTC"));
}

#[tokio::test]
async fn test_buy_funds_quantized_down() {
    let exchange = Arc::new(SimulatedExchange::new(base_config()));
    let mut s = settings();
    s.weights = AllocationWeights::new()
        .with("BTC", dec!(0.3333))
        .with("ETH", dec!(0.6667));

    let (runner, _) = runner(&exchange, s);
    runner.run().await.unwrap();

    let buys = exchange.buy_requests().await;
    let btc = buys.iter().find(|b| b.product.base == "BTC").unwrap();
    let eth = buys.iter().find(|b| b.product.base == "ETH").unwrap();
    assert_eq!(btc.funds, dec!(33.33));
    assert_eq!(eth.funds, dec!(66.67));
    assert_eq!(btc.product, ProductPair::new("BTC", "USD"));
}

#[tokio::test]
async fn test_dry_run_makes_no_state_changes() {
    let exchange = Arc::new(SimulatedExchange::new(base_config()));
    let mut s = settings();
    s.dry_run = true;

    let (runner, sink) = runner(&exchange, s);
    let report = runner.run().await.unwrap();

    assert!(report.dry_run);
    assert!(matches!(report.deposit, DepositOutcome::DryRun(ref r) if r.amount == dec!(100.00)));
    assert!(report
        .buys
        .iter()
        .all(|b| matches!(b.outcome, BuyOutcome::DryRun(_))));
    assert!(exchange.deposit_requests().await.is_empty());
    assert!(exchange.buy_requests().await.is_empty());
    assert!(sink.contains("Would buy 50.00 USD of BTC"));
}

#[tokio::test]
async fn test_failed_buy_does_not_stop_other_assets() {
    let exchange = Arc::new(SimulatedExchange::new(
        base_config().with_failing_buy("ETH"),
    ));

    let (runner, sink) = runner(&exchange, settings());
    let report = runner.run().await.unwrap();

    assert!(matches!(report.buy_for("BTC"), Some(BuyOutcome::Bought(_))));
    assert!(matches!(report.buy_for("ETH"), Some(BuyOutcome::Failed(_))));
    assert!(matches!(report.buy_for("LTC"), Some(BuyOutcome::Bought(_))));
    assert!(report.has_failures());
    assert!(sink.contains("Buy of ETH failed"));
}

#[tokio::test]
async fn test_transfer_fetch_failure_only_aborts_deposit() {
    let exchange = Arc::new(SimulatedExchange::new(
        base_config().with_failure(SimulatedOperation::Transfers),
    ));

    let (runner, _) = runner(&exchange, settings());
    let report = runner.run().await.unwrap();

    assert!(report.deposit.is_failed());
    assert_eq!(report.orders_placed(), 3);
    assert!(exchange.deposit_requests().await.is_empty());
    assert!(report.has_failures());
}

#[tokio::test]
async fn test_history_fetch_failure_only_aborts_buys() {
    let exchange = Arc::new(SimulatedExchange::new(
        base_config().with_failure(SimulatedOperation::AccountHistory),
    ));

    let (runner, _) = runner(&exchange, settings());
    let report = runner.run().await.unwrap();

    assert!(matches!(report.deposit, DepositOutcome::Deposited(_)));
    assert!(report.buy_phase_error.is_some());
    assert!(report.buys.is_empty());
    assert!(exchange.buy_requests().await.is_empty());
}

#[tokio::test]
async fn test_payment_method_not_found_is_fatal() {
    let exchange = Arc::new(SimulatedExchange::new(base_config()));
    let mut s = settings();
    s.deposit_account_name = "Brokerage".to_string();

    let (runner, _) = runner(&exchange, s);
    let result = runner.run().await;

    assert!(matches!(result, Err(RunError::PaymentMethodNotFound { .. })));
    assert!(exchange.deposit_requests().await.is_empty());
    assert!(exchange.buy_requests().await.is_empty());
}

#[tokio::test]
async fn test_listing_failure_is_fatal() {
    let exchange = Arc::new(SimulatedExchange::new(
        base_config().with_failure(SimulatedOperation::ListAccounts),
    ));

    let (runner, _) = runner(&exchange, settings());
    assert!(matches!(runner.run().await, Err(RunError::Exchange(_))));
}

#[tokio::test]
async fn test_insufficient_balance_skips_buys() {
    let config = SimulatedConfig::default()
        .with_payment_method("pm-checking", "Checking ******1234", "ach_bank_account", "USD")
        .with_account("usd-1", "USD", dec!(40.00));
    let exchange = Arc::new(SimulatedExchange::new(config));

    let (runner, sink) = runner(&exchange, settings());
    let report = runner.run().await.unwrap();

    // 입금은 잔고와 무관하게 진행
    assert!(matches!(report.deposit, DepositOutcome::Deposited(_)));
    assert!(report.buys.iter().all(|b| matches!(
        b.outcome,
        BuyOutcome::InsufficientBalance { available, .. } if available == dec!(40.00)
    )));
    assert!(!report.has_failures());
    assert!(exchange.buy_requests().await.is_empty());
    assert!(sink.contains("Not enough available funds"));
}

#[tokio::test]
async fn test_min_available_below_buy_amount() {
    let config = SimulatedConfig::default()
        .with_payment_method("pm-checking", "Checking ******1234", "ach_bank_account", "USD")
        .with_account("usd-1", "USD", dec!(60.00));
    let exchange = Arc::new(SimulatedExchange::new(config));
    let mut s = settings();
    s.min_available = dec!(50.00);
    s.weights = AllocationWeights::new().with("BTC", dec!(0.5));

    let (runner, _) = runner(&exchange, s);
    let report = runner.run().await.unwrap();

    assert!(matches!(report.buy_for("BTC"), Some(BuyOutcome::Bought(_))));
}

#[tokio::test]
async fn test_per_asset_and_aggregate_gates() {
    let now = Utc::now();
    let btc = ProductPair::new("BTC", "USD");
    let seeded = vec![
        AccountEntry::trade_match("prev", btc.clone(), dec!(-49.97), now - Duration::days(3)),
        AccountEntry::fee("prev", btc, dec!(-0.03), now - Duration::days(3)),
    ];

    let exchange = Arc::new(SimulatedExchange::new(
        base_config().with_history("usd-1", seeded.clone()),
    ));
    let (per_asset, _) = runner(&exchange, settings());
    let report = per_asset.run().await.unwrap();
    assert!(matches!(report.buy_for("BTC"), Some(BuyOutcome::AlreadyBought(_))));
    assert!(matches!(report.buy_for("ETH"), Some(BuyOutcome::Bought(_))));

    let exchange = Arc::new(SimulatedExchange::new(
        base_config().with_history("usd-1", seeded),
    ));
    let mut s = settings();
    s.gate = BuyGate::Aggregate;
    let (aggregate, _) = runner(&exchange, s);
    let report = aggregate.run().await.unwrap();
    assert_eq!(report.orders_placed(), 0);
    assert!(exchange.buy_requests().await.is_empty());
}

#[tokio::test]
async fn test_activity_outside_window_is_ignored() {
    let old = Utc::now() - Duration::days(20);
    let btc = ProductPair::new("BTC", "USD");
    let config = base_config()
        .with_transfers("usd-1", vec![AccountEntry::deposit(dec!(100.00), old)])
        .with_history(
            "usd-1",
            vec![AccountEntry::trade_match("old", btc, dec!(-50.00), old)],
        );
    let exchange = Arc::new(SimulatedExchange::new(config));

    let (runner, _) = runner(&exchange, settings());
    let report = runner.run().await.unwrap();

    assert!(matches!(report.deposit, DepositOutcome::Deposited(_)));
    assert!(matches!(report.buy_for("BTC"), Some(BuyOutcome::Bought(_))));
}

#[tokio::test]
async fn test_pending_deposit_blocks_new_deposit() {
    let config = base_config().with_transfers(
        "usd-1",
        vec![AccountEntry::deposit(dec!(100.05), Utc::now() - Duration::hours(6))],
    );
    let exchange = Arc::new(SimulatedExchange::new(config));

    let (runner, _) = runner(&exchange, settings());
    let report = runner.run().await.unwrap();

    assert!(matches!(report.deposit, DepositOutcome::AlreadyDone(_)));
    assert!(exchange.deposit_requests().await.is_empty());
}

#[tokio::test]
async fn test_tiny_allocation_below_increment() {
    let exchange = Arc::new(SimulatedExchange::new(base_config()));
    let mut s = settings();
    s.weights = AllocationWeights::new()
        .with("BTC", dec!(0.99))
        .with("DOGE", dec!(0.00001));

    let (runner, sink) = runner(&exchange, s);
    let report = runner.run().await.unwrap();

    assert_eq!(report.buy_for("DOGE"), Some(&BuyOutcome::BelowIncrement));
    assert!(matches!(report.buy_for("BTC"), Some(BuyOutcome::Bought(_))));
    assert!(sink.contains("below the quote increment"));
}
