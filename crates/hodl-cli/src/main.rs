//! 정기 입금 및 배분 매수 CLI.
//!
//! cron 등으로 주기보다 자주 실행하도록 설계되었습니다. 매 실행마다 거래소
//! 이력을 읽어 이번 주기에 이미 입금/매수했는지 판단하므로 중복 실행해도
//! 같은 작업을 반복하지 않습니다.
//!
//! # 사용 예시
//!
//! ```bash
//! # 매일 실행, 15일 주기로 100 USD 입금 후 BTC/ETH 매수
//! hodl -n "Checking" -d 100 -i 15 -b 100 -a BTC 0.6 -a ETH 0.4
//!
//! # 샌드박스에서 드라이런, 상세 로그
//! hodl --sandbox --dry-run -v -a BTC 1
//! ```

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use hodl_cli::commands::run::{allocation_overflow, execute, summarize, RunArgs};
use hodl_core::{init_logging, HodlConfig, LogConfig, LogFormat};
use hodl_exchange::{CoinbaseProClient, CoinbaseProConfig};
use hodl_execution::StdoutSink;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

const LONG_ABOUT: &str = "\
Deposits a fixed fiat amount from a linked bank account and spreads a fixed \
buy amount across crypto assets on Coinbase Pro, at most once per interval.

Each run re-reads the exchange's own deposit and fill history to decide \
whether this interval's deposit and buys already happened, so it is safe to \
run from cron more often than the interval.

Credentials are read from COINBASE_PRO_API_KEY, COINBASE_PRO_API_SECRET and \
COINBASE_PRO_PASSPHRASE (a .env file is honoured).

There is no locking between concurrent invocations: two runs started at the \
same moment can both decide to act. Schedule a single instance.";

#[derive(Parser)]
#[command(name = "hodl")]
#[command(about = "Recurring fiat deposits and allocated crypto buys", long_about = LONG_ABOUT)]
#[command(version)]
struct Cli {
    /// TOML 설정 파일 (HODL__* 환경 변수와 명령줄 인자가 우선)
    #[arg(long)]
    config: Option<PathBuf>,

    /// 상세 로그 출력 (debug 레벨)
    #[arg(short, long)]
    verbose: bool,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long = "log-format", env = "LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(flatten)]
    run: RunArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run() -> Result<ExitCode> {
    // .env 파일이 없어도 무시
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = HodlConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    let log_config = if cli.verbose {
        LogConfig::verbose(true).with_span_events(true)
    } else {
        LogConfig::new(config.logging.level.clone())
    };
    let format = match cli.log_format {
        Some(format) => format,
        None => config
            .logging
            .format
            .parse()
            .map_err(|e: String| anyhow!(e))?,
    };
    init_logging(log_config.with_format(format))
        .map_err(|e| anyhow!("failed to initialize logging: {}", e))?;

    cli.run.apply(&mut config)?;
    if let Some(total) = allocation_overflow(&config) {
        warn!(%total, "Allocation fractions sum to more than 1, buys will exceed the buy amount");
    }

    // 네트워크 호출 전에 자격 증명 확인
    let credentials = CoinbaseProConfig::from_env()?
        .with_sandbox(config.exchange.sandbox)
        .with_api_url(config.exchange.api_url.clone())
        .with_timeout_secs(config.exchange.timeout_secs);
    info!(?credentials, "Loaded exchange credentials");
    let client = CoinbaseProClient::new(credentials)?;

    let report = execute(&config, Arc::new(client), Arc::new(StdoutSink)).await?;
    info!("{}", summarize(&report));

    if report.has_failures() {
        error!("One or more phases failed");
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
