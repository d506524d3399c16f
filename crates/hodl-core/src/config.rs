//! 설정 관리.
//!
//! 기본값 → TOML 파일(선택) → `HODL__*` 환경 변수 순으로 덮어쓰며,
//! CLI 플래그는 마지막에 바이너리에서 적용됩니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::AllocationWeights;
use crate::error::{HodlError, HodlResult};
use crate::recurrence::{BuyGate, Tolerance};

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HodlConfig {
    /// 입금 설정
    #[serde(default)]
    pub deposit: DepositConfig,
    /// 매수 설정
    #[serde(default)]
    pub buy: BuyConfig,
    /// 반복 주기 설정
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// 거래소 연결 설정
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 드라이런 모드 (실제 입금/주문 미실행)
    #[serde(default)]
    pub dry_run: bool,
}

/// 입금 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DepositConfig {
    /// 결제 수단 이름에 포함되어야 하는 문자열 (빈 문자열이면 첫 번째 일치)
    #[serde(default)]
    pub account_name: String,
    /// 결제 수단 유형
    #[serde(default = "default_account_type")]
    pub account_type: String,
    /// 주기당 입금액 (0이면 입금 단계 비활성화)
    #[serde(default = "default_amount")]
    pub amount: Decimal,
}

impl Default for DepositConfig {
    fn default() -> Self {
        Self {
            account_name: String::new(),
            account_type: default_account_type(),
            amount: default_amount(),
        }
    }
}

/// 매수 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuyConfig {
    /// 주기당 배분할 법정화폐 금액
    #[serde(default = "default_amount")]
    pub amount: Decimal,
    /// 매수에 필요한 최소 가용 잔고 (없으면 `amount`)
    #[serde(default)]
    pub min_available: Option<Decimal>,
    /// 매수 게이트 단위
    #[serde(default)]
    pub gate: BuyGate,
    /// 통화별 배분 비율
    #[serde(default)]
    pub allocation: BTreeMap<String, Decimal>,
}

impl Default for BuyConfig {
    fn default() -> Self {
        Self {
            amount: default_amount(),
            min_available: None,
            gate: BuyGate::default(),
            allocation: BTreeMap::new(),
        }
    }
}

impl BuyConfig {
    /// 매수 실행에 필요한 가용 잔고 임계값.
    pub fn threshold(&self) -> Decimal {
        self.min_available.unwrap_or(self.amount)
    }

    /// 배분 비율 (통화 코드 대문자 정규화).
    pub fn weights(&self) -> AllocationWeights {
        self.allocation
            .iter()
            .map(|(currency, fraction)| (currency.clone(), *fraction))
            .collect()
    }
}

/// 반복 주기 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// 입금/매수 주기 (일)
    #[serde(default = "default_interval_days")]
    pub interval_days: u32,
    /// 금액 일치 허용 오차
    #[serde(default)]
    pub tolerance: Tolerance,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_days: default_interval_days(),
            tolerance: Tolerance::default(),
        }
    }
}

/// 거래소 연결 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeConfig {
    /// 샌드박스 사용
    #[serde(default)]
    pub sandbox: bool,
    /// REST API 기본 URL 재정의
    #[serde(default)]
    pub api_url: Option<String>,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            sandbox: false,
            api_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// 허용되는 최대 반복 주기 (일).
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

fn default_account_type() -> String {
    "ach_bank_account".to_string()
}
fn default_amount() -> Decimal {
    dec!(100.00)
}
fn default_interval_days() -> u32 {
    15
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "compact".to_string()
}

impl HodlConfig {
    /// 파일(선택)과 환경 변수에서 설정을 로드합니다.
    pub fn load(path: Option<&Path>) -> HodlResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        // 환경 변수로 오버라이드 (예: HODL__BUY__AMOUNT=95.00)
        builder = builder.add_source(
            config::Environment::with_prefix("HODL")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 로드합니다 (환경 변수 미적용).
    pub fn from_toml_str(content: &str) -> HodlResult<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 설정 값의 범위를 검증합니다.
    pub fn validate(&self) -> HodlResult<()> {
        if self.schedule.interval_days == 0 {
            return Err(HodlError::InvalidInput(
                "interval must be at least one day".to_string(),
            ));
        }
        if self.schedule.interval_days > MAX_INTERVAL_DAYS {
            return Err(HodlError::InvalidInput(format!(
                "interval must be at most {} days, got {}",
                MAX_INTERVAL_DAYS, self.schedule.interval_days
            )));
        }
        if self.deposit.amount < Decimal::ZERO {
            return Err(HodlError::InvalidInput(format!(
                "deposit amount must be non-negative, got {}",
                self.deposit.amount
            )));
        }
        if self.buy.amount < Decimal::ZERO {
            return Err(HodlError::InvalidInput(format!(
                "buy amount must be non-negative, got {}",
                self.buy.amount
            )));
        }
        if let Some(min) = self.buy.min_available {
            if min < Decimal::ZERO {
                return Err(HodlError::InvalidInput(format!(
                    "minimum available must be non-negative, got {}",
                    min
                )));
            }
        }
        Ok(())
    }
}
