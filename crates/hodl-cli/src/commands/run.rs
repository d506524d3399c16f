//! 정기 입금/매수 실행 명령어.
//!
//! # 사용 예시
//!
//! ```bash
//! # 15일마다 100 USD 입금, BTC 60% / ETH 40% 매수
//! hodl -n "Checking" -d 100 -b 100 -a BTC 0.6 -a ETH 0.4
//!
//! # 설정 파일 사용, 실제 주문 없이 확인
//! hodl --config config/hodl.toml --dry-run
//! ```

use anyhow::{bail, Context, Result};
use clap::Args;
use hodl_core::{BuyGate, HodlConfig, Tolerance};
use hodl_exchange::Exchange;
use hodl_execution::{
    BuyOutcome, DepositOutcome, HodlRunner, RunReport, RunSettings, StatusSink,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// 실행 인자. 지정된 값만 설정 파일/환경 변수 값을 덮어씁니다.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// 입금할 결제 수단 이름에 포함된 문자열
    #[arg(short = 'n', long = "deposit-account")]
    pub deposit_account: Option<String>,

    /// 결제 수단 유형 [기본: ach_bank_account]
    #[arg(short = 't', long = "deposit-account-type")]
    pub deposit_account_type: Option<String>,

    /// 주기당 입금액, 0이면 입금하지 않음 [기본: 100.00]
    #[arg(short = 'd', long = "deposit-amount")]
    pub deposit_amount: Option<Decimal>,

    /// 입금/매수 주기 (일) [기본: 15]
    #[arg(short = 'i', long = "interval")]
    pub interval: Option<u32>,

    /// 주기당 배분할 매수 총액 [기본: 100.00]
    #[arg(short = 'b', long = "buy-amount")]
    pub buy_amount: Option<Decimal>,

    /// 매수에 필요한 최소 가용 잔고 [기본: 매수 총액]
    #[arg(short = 'm', long = "min-available")]
    pub min_available: Option<Decimal>,

    /// 통화별 배분 비율 (반복 가능, 예: -a BTC 0.6 -a ETH 0.4)
    #[arg(
        short = 'a',
        long = "allocation-percentage",
        num_args = 2,
        value_names = ["CURRENCY", "FRACTION"],
        action = clap::ArgAction::Append
    )]
    pub allocation: Vec<String>,

    /// 금액 일치 허용 오차 [기본: 0.10]
    #[arg(long)]
    pub tolerance: Option<Decimal>,

    /// 매수 게이트 단위 (per-asset, aggregate) [기본: per-asset]
    #[arg(long = "buy-gate")]
    pub buy_gate: Option<BuyGate>,

    /// 샌드박스 API 사용
    #[arg(long)]
    pub sandbox: bool,

    /// 입금/주문 없이 수행할 작업만 출력
    #[arg(long)]
    pub dry_run: bool,
}

/// `CURRENCY FRACTION` 쌍 목록을 파싱합니다.
///
/// 같은 통화가 반복되면 마지막 값이 사용됩니다.
pub fn parse_allocation_pairs(values: &[String]) -> Result<BTreeMap<String, Decimal>> {
    if values.len() % 2 != 0 {
        bail!("allocation must be given as CURRENCY FRACTION pairs");
    }

    let mut allocation = BTreeMap::new();
    for pair in values.chunks(2) {
        let currency = pair[0].trim().to_uppercase();
        if currency.is_empty() || !currency.chars().all(|c| c.is_ascii_alphanumeric()) {
            bail!("invalid currency code '{}'", pair[0]);
        }
        let fraction: Decimal = pair[1]
            .trim()
            .parse()
            .with_context(|| format!("invalid fraction '{}' for {}", pair[1], currency))?;
        allocation.insert(currency, fraction);
    }
    Ok(allocation)
}

impl RunArgs {
    /// 지정된 인자로 설정을 덮어씁니다.
    pub fn apply(&self, config: &mut HodlConfig) -> Result<()> {
        if let Some(name) = &self.deposit_account {
            config.deposit.account_name = name.clone();
        }
        if let Some(account_type) = &self.deposit_account_type {
            config.deposit.account_type = account_type.clone();
        }
        if let Some(amount) = self.deposit_amount {
            config.deposit.amount = amount;
        }
        if let Some(interval) = self.interval {
            config.schedule.interval_days = interval;
        }
        if let Some(amount) = self.buy_amount {
            config.buy.amount = amount;
        }
        if let Some(min) = self.min_available {
            config.buy.min_available = Some(min);
        }
        if !self.allocation.is_empty() {
            config.buy.allocation = parse_allocation_pairs(&self.allocation)?;
        }
        if let Some(tolerance) = self.tolerance {
            config.schedule.tolerance = Tolerance::new(tolerance)?;
        }
        if let Some(gate) = self.buy_gate {
            config.buy.gate = gate;
        }
        if self.sandbox {
            config.exchange.sandbox = true;
        }
        if self.dry_run {
            config.dry_run = true;
        }

        config.validate()?;
        Ok(())
    }
}

/// 배분 비율 합이 1을 넘으면 그 합을 반환합니다.
pub fn allocation_overflow(config: &HodlConfig) -> Option<Decimal> {
    let total = config.buy.weights().total_fraction();
    (total > Decimal::ONE).then_some(total)
}

/// 설정으로 실행기를 구성해 한 번 실행합니다.
pub async fn execute(
    config: &HodlConfig,
    exchange: Arc<dyn Exchange>,
    sink: Arc<dyn StatusSink>,
) -> Result<RunReport> {
    let settings = RunSettings::from(config);
    info!(
        exchange = exchange.name(),
        assets = settings.weights.len(),
        gate = %settings.gate,
        "Running recurring deposit and buys"
    );

    let runner = HodlRunner::new(exchange, sink, settings);
    Ok(runner.run().await?)
}

/// 실행 결과 요약 한 줄.
pub fn summarize(report: &RunReport) -> String {
    let deposit = match &report.deposit {
        DepositOutcome::Disabled => "disabled".to_string(),
        DepositOutcome::Deposited(receipt) => format!("deposited {} {}", receipt.amount, receipt.currency),
        DepositOutcome::AlreadyDone(_) => "already done".to_string(),
        DepositOutcome::DryRun(request) => format!("would deposit {} {}", request.amount, request.currency),
        DepositOutcome::Failed(_) => "failed".to_string(),
    };

    let buys = if let Some(error) = &report.buy_phase_error {
        format!("failed ({})", error)
    } else if report.buys.is_empty() {
        "none planned".to_string()
    } else {
        report
            .buys
            .iter()
            .map(|b| {
                let state = match &b.outcome {
                    BuyOutcome::Bought(_) => "bought",
                    BuyOutcome::AlreadyBought(_) => "already bought",
                    BuyOutcome::InsufficientBalance { .. } => "insufficient funds",
                    BuyOutcome::BelowIncrement => "below increment",
                    BuyOutcome::DryRun(_) => "would buy",
                    BuyOutcome::Failed(_) => "failed",
                };
                format!("{} {}", b.currency, state)
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!("Deposit: {}. Buys: {}.", deposit, buys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use hodl_exchange::{SimulatedConfig, SimulatedExchange};
    use hodl_execution::RecordingSink;
    use rust_decimal_macros::dec;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: RunArgs,
    }

    fn parse(args: &[&str]) -> RunArgs {
        let mut argv = vec!["hodl"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn test_parse_short_flags() {
        let args = parse(&[
            "-n", "Checking", "-d", "250.00", "-i", "7", "-b", "95", "-m", "50", "-a", "btc",
            "0.6", "-a", "ETH", "0.4", "--dry-run",
        ]);

        assert_eq!(args.deposit_account.as_deref(), Some("Checking"));
        assert_eq!(args.deposit_amount, Some(dec!(250.00)));
        assert_eq!(args.interval, Some(7));
        assert_eq!(args.allocation, vec!["btc", "0.6", "ETH", "0.4"]);
        assert!(args.dry_run);
    }

    #[test]
    fn test_allocation_requires_pairs() {
        let mut argv = vec!["hodl", "-a", "BTC"];
        assert!(TestCli::try_parse_from(argv.clone()).is_err());
        argv.push("0.5");
        assert!(TestCli::try_parse_from(argv).is_ok());
    }

    #[test]
    fn test_parse_allocation_pairs() {
        let values: Vec<String> = ["btc", "0.5", "ETH", "0.25", "BTC", "0.3"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let allocation = parse_allocation_pairs(&values).unwrap();

        assert_eq!(allocation.len(), 2);
        assert_eq!(allocation["BTC"], dec!(0.3));
        assert_eq!(allocation["ETH"], dec!(0.25));

        let bad = vec!["BTC".to_string(), "half".to_string()];
        assert!(parse_allocation_pairs(&bad).is_err());
        let bad = vec!["BTC-USD".to_string(), "0.5".to_string()];
        assert!(parse_allocation_pairs(&bad).is_err());
    }

    #[test]
    fn test_apply_overrides_only_given_values() {
        let mut config = HodlConfig::default();
        config.deposit.account_name = "From File".to_string();
        config.buy.allocation.insert("LTC".to_string(), dec!(1));

        let args = parse(&["-b", "95", "--buy-gate", "aggregate", "--tolerance", "0"]);
        args.apply(&mut config).unwrap();

        assert_eq!(config.deposit.account_name, "From File");
        assert_eq!(config.buy.amount, dec!(95));
        assert_eq!(config.buy.threshold(), dec!(95));
        assert_eq!(config.buy.gate, BuyGate::Aggregate);
        assert_eq!(config.schedule.tolerance, Tolerance::exact());
        assert_eq!(config.buy.allocation.len(), 1);
    }

    #[test]
    fn test_apply_rejects_invalid_values() {
        let mut config = HodlConfig::default();
        assert!(parse(&["-i", "0"]).apply(&mut config).is_err());

        let mut config = HodlConfig::default();
        assert!(parse(&["-i", "4000000000"]).apply(&mut config).is_err());

        let mut config = HodlConfig::default();
        assert!(parse(&["--tolerance=-1"]).apply(&mut config).is_err());
    }

    #[test]
    fn test_allocation_overflow() {
        let mut config = HodlConfig::default();
        parse(&["-a", "BTC", "0.7", "-a", "ETH", "0.3"]).apply(&mut config).unwrap();
        assert_eq!(allocation_overflow(&config), None);

        parse(&["-a", "BTC", "0.8", "-a", "ETH", "0.4"]).apply(&mut config).unwrap();
        assert_eq!(allocation_overflow(&config), Some(dec!(1.2)));
    }

    #[tokio::test]
    async fn test_execute_with_simulated_exchange() {
        let mut config = HodlConfig::default();
        parse(&["-n", "1234", "-a", "BTC", "1"]).apply(&mut config).unwrap();

        let exchange = Arc::new(SimulatedExchange::new(
            SimulatedConfig::default()
                .with_payment_method("pm-1", "Checking ******1234", "ach_bank_account", "USD")
                .with_account("usd-1", "USD", dec!(200)),
        ));
        let sink = Arc::new(RecordingSink::new());

        let report = execute(&config, exchange.clone(), sink.clone()).await.unwrap();

        assert!(!report.has_failures());
        assert_eq!(
            summarize(&report),
            "Deposit: deposited 100.00 USD. Buys: BTC bought."
        );
        assert!(sink.contains("Buying 100.00 USD of BTC"));
    }
}
