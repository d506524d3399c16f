//! Coinbase Pro 거래소 커넥터.
//!
//! 결제 수단, 계좌, 원장/이체 내역 조회와 시장가 매수, 결제 수단 입금을 위한
//! REST API 구현. 운영 환경과 샌드박스 모두 지원.

use crate::traits::{Account, DepositReceipt, Exchange, ExchangeResult, OrderReceipt, PaymentMethod};
use crate::ExchangeError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use hodl_core::{AccountEntry, DepositRequest, EntryType, MarketBuyRequest, ProductPair};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// 운영 REST API URL
pub const PRODUCTION_API_URL: &str = "https://api.pro.coinbase.com";
/// 샌드박스 REST API URL
pub const SANDBOX_API_URL: &str = "https://api-public.sandbox.pro.coinbase.com";

/// 페이지당 요청 항목 수
const PAGE_LIMIT: u32 = 100;

/// 자격 증명 환경 변수
pub const ENV_API_KEY: &str = "COINBASE_PRO_API_KEY";
pub const ENV_API_SECRET: &str = "COINBASE_PRO_API_SECRET";
pub const ENV_PASSPHRASE: &str = "COINBASE_PRO_PASSPHRASE";

// ============================================================================
// 설정
// ============================================================================

/// Coinbase Pro 클라이언트 설정.
///
/// # 보안
/// - `Debug` 구현은 민감 정보(`api_key`, `api_secret`, `passphrase`)를 마스킹합니다.
pub struct CoinbaseProConfig {
    /// API 키
    pub api_key: String,
    /// API 시크릿 (base64)
    pub api_secret: SecretString,
    /// API 패스프레이즈
    pub passphrase: SecretString,
    /// 샌드박스 사용
    pub sandbox: bool,
    /// REST API 기본 URL 재정의 (테스트용 목 서버 등)
    pub api_url: Option<String>,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl fmt::Debug for CoinbaseProConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked_key = if self.api_key.chars().count() > 8 {
            let head: String = self.api_key.chars().take(4).collect();
            let mut tail: Vec<char> = self.api_key.chars().rev().take(4).collect();
            tail.reverse();
            format!("{}...{}", head, tail.into_iter().collect::<String>())
        } else {
            "***REDACTED***".to_string()
        };

        f.debug_struct("CoinbaseProConfig")
            .field("api_key", &masked_key)
            .field("api_secret", &"***REDACTED***")
            .field("passphrase", &"***REDACTED***")
            .field("sandbox", &self.sandbox)
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl CoinbaseProConfig {
    /// 새 설정 생성.
    pub fn new(api_key: String, api_secret: String, passphrase: String) -> Self {
        Self {
            api_key,
            api_secret: SecretString::new(api_secret.into()),
            passphrase: SecretString::new(passphrase.into()),
            sandbox: false,
            api_url: None,
            timeout_secs: 30,
        }
    }

    /// 샌드박스 사용.
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// 기본 URL 재정의.
    pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
        self.api_url = api_url;
        self
    }

    /// 요청 타임아웃 설정.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// 환경 변수에서 생성.
    ///
    /// # Errors
    /// 필요한 변수가 없으면 변수 이름을 담은 `ExchangeError::Config`를 반환합니다.
    pub fn from_env() -> ExchangeResult<Self> {
        Ok(Self::new(
            required_env(ENV_API_KEY)?,
            required_env(ENV_API_SECRET)?,
            required_env(ENV_PASSPHRASE)?,
        ))
    }

    /// REST API 기본 URL 반환.
    pub fn rest_base_url(&self) -> &str {
        match &self.api_url {
            Some(url) => url.trim_end_matches('/'),
            None if self.sandbox => SANDBOX_API_URL,
            None => PRODUCTION_API_URL,
        }
    }
}

fn required_env(name: &str) -> ExchangeResult<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ExchangeError::Config(format!(
            "missing environment variable {}",
            name
        ))),
    }
}

/// 요청 서명: base64(HMAC-SHA256(base64 디코딩한 시크릿, timestamp + METHOD + path + body)).
pub fn sign_request(
    secret: &str,
    timestamp: &str,
    method: &str,
    request_path: &str,
    body: &str,
) -> ExchangeResult<String> {
    let key = BASE64
        .decode(secret)
        .map_err(|e| ExchangeError::Config(format!("API secret is not valid base64: {}", e)))?;
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| ExchangeError::Config(format!("Invalid signing key: {}", e)))?;
    mac.update(timestamp.as_bytes());
    mac.update(method.as_bytes());
    mac.update(request_path.as_bytes());
    mac.update(body.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// 거래소 타임스탬프 파싱.
///
/// RFC 3339와 이체 API가 쓰는 `2019-06-18 01:37:48.78953+00` 형식을 모두 받습니다.
pub fn parse_timestamp(value: &str) -> ExchangeResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z"))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ExchangeError::ParseError(format!("invalid timestamp '{}': {}", value, e)))
}

fn parse_optional_timestamp(value: Option<&str>) -> ExchangeResult<Option<DateTime<Utc>>> {
    value.map(parse_timestamp).transpose()
}

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
struct CbPaymentMethod {
    id: String,
    #[serde(rename = "type")]
    method_type: String,
    name: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct CbAccount {
    id: String,
    currency: String,
    balance: Decimal,
    available: Decimal,
    hold: Decimal,
}

#[derive(Debug, Default, Deserialize)]
struct CbLedgerDetails {
    order_id: Option<String>,
    product_id: Option<String>,
    transfer_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CbLedgerEntry {
    id: String,
    created_at: String,
    amount: Decimal,
    #[serde(rename = "type")]
    entry_type: String,
    #[serde(default)]
    details: CbLedgerDetails,
}

#[derive(Debug, Deserialize)]
struct CbTransfer {
    id: String,
    #[serde(rename = "type")]
    transfer_type: String,
    created_at: String,
    completed_at: Option<String>,
    canceled_at: Option<String>,
    amount: Decimal,
}

#[derive(Debug, Serialize)]
struct CbOrderBody {
    #[serde(rename = "type")]
    order_type: &'static str,
    side: &'static str,
    product_id: String,
    funds: Decimal,
    client_oid: Uuid,
}

#[derive(Debug, Deserialize)]
struct CbOrderResponse {
    id: String,
    product_id: String,
    funds: Option<Decimal>,
    status: String,
}

#[derive(Debug, Serialize)]
struct CbDepositBody {
    amount: Decimal,
    currency: String,
    payment_method_id: String,
}

#[derive(Debug, Deserialize)]
struct CbDepositResponse {
    id: String,
    amount: Decimal,
    currency: String,
    payout_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CbError {
    message: String,
}

impl CbLedgerEntry {
    fn into_entry(self) -> ExchangeResult<AccountEntry> {
        let entry_type = match self.entry_type.as_str() {
            "transfer" if self.details.transfer_type.as_deref() == Some("deposit") => {
                EntryType::TransferDeposit
            }
            "match" => EntryType::TradeMatch,
            "fee" => EntryType::Fee,
            _ => EntryType::Other,
        };

        let product_pair = match self.details.product_id.as_deref() {
            Some(product_id) => match product_id.parse::<ProductPair>() {
                Ok(pair) => Some(pair),
                Err(e) => {
                    warn!(entry_id = %self.id, "Ignoring unparseable product id: {}", e);
                    None
                }
            },
            None => None,
        };

        let mut entry = AccountEntry::new(entry_type, self.amount, parse_timestamp(&self.created_at)?)
            .with_id(self.id);
        entry.order_id = self.details.order_id;
        entry.product_pair = product_pair;
        Ok(entry)
    }
}

impl CbTransfer {
    fn into_entry(self) -> ExchangeResult<AccountEntry> {
        let entry_type = if self.transfer_type == "deposit" {
            EntryType::TransferDeposit
        } else {
            EntryType::Other
        };

        let mut entry = AccountEntry::new(entry_type, self.amount, parse_timestamp(&self.created_at)?)
            .with_id(self.id);
        entry.completed_at = parse_optional_timestamp(self.completed_at.as_deref())?;
        entry.canceled_at = parse_optional_timestamp(self.canceled_at.as_deref())?;
        Ok(entry)
    }
}

// ============================================================================
// Coinbase Pro 클라이언트
// ============================================================================

/// Coinbase Pro 거래소 클라이언트.
pub struct CoinbaseProClient {
    config: CoinbaseProConfig,
    client: Client,
}

impl CoinbaseProClient {
    /// 새 Coinbase Pro 클라이언트 생성.
    ///
    /// # Errors
    /// 시크릿이 base64가 아니면 `ExchangeError::Config`,
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::NetworkError`를 반환합니다.
    pub fn new(config: CoinbaseProConfig) -> ExchangeResult<Self> {
        BASE64
            .decode(config.api_secret.expose_secret())
            .map_err(|e| ExchangeError::Config(format!("API secret is not valid base64: {}", e)))?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExchangeError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 서명된 요청을 보내고 응답 본문과 다음 페이지 커서를 반환합니다.
    async fn signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        request_path: &str,
        body: Option<String>,
    ) -> ExchangeResult<(T, Option<String>)> {
        let url = format!("{}{}", self.config.rest_base_url(), request_path);
        let timestamp = Utc::now().timestamp().to_string();
        let body = body.unwrap_or_default();
        let signature = sign_request(
            self.config.api_secret.expose_secret(),
            &timestamp,
            method.as_str(),
            request_path,
            &body,
        )?;

        debug!("{} (signed) {}", method, request_path);

        let mut request = self
            .client
            .request(method, &url)
            .header("CB-ACCESS-KEY", &self.config.api_key)
            .header("CB-ACCESS-SIGN", signature)
            .header("CB-ACCESS-TIMESTAMP", timestamp)
            .header("CB-ACCESS-PASSPHRASE", self.config.passphrase.expose_secret())
            .header("User-Agent", concat!("hodl/", env!("CARGO_PKG_VERSION")));

        if !body.is_empty() {
            request = request
                .header("Content-Type", "application/json")
                .body(body);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    async fn signed_get<T: DeserializeOwned>(&self, request_path: &str) -> ExchangeResult<T> {
        let (value, _) = self.signed_request(Method::GET, request_path, None).await?;
        Ok(value)
    }

    async fn signed_post<B: Serialize, T: DeserializeOwned>(
        &self,
        request_path: &str,
        body: &B,
    ) -> ExchangeResult<T> {
        let body = serde_json::to_string(body)?;
        let (value, _) = self
            .signed_request(Method::POST, request_path, Some(body))
            .await?;
        Ok(value)
    }

    /// `CB-AFTER` 커서를 따라 페이지를 순회합니다.
    ///
    /// 빈 페이지, 커서 없음, 또는 페이지의 가장 오래된 항목이 `since`보다
    /// 오래되면 중단합니다.
    async fn paginated_entries<W, F>(
        &self,
        path: &str,
        since: Option<DateTime<Utc>>,
        convert: F,
    ) -> ExchangeResult<Vec<AccountEntry>>
    where
        W: DeserializeOwned,
        F: Fn(W) -> ExchangeResult<AccountEntry>,
    {
        let mut entries = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let request_path = match &cursor {
                Some(after) => format!("{}?limit={}&after={}", path, PAGE_LIMIT, after),
                None => format!("{}?limit={}", path, PAGE_LIMIT),
            };

            let (page, next): (Vec<W>, Option<String>) =
                self.signed_request(Method::GET, &request_path, None).await?;
            if page.is_empty() {
                break;
            }

            let page = page
                .into_iter()
                .map(&convert)
                .collect::<ExchangeResult<Vec<_>>>()?;
            let reached_since = match (since, page.iter().map(|e| e.created_at).min()) {
                (Some(since), Some(oldest)) => oldest < since,
                _ => false,
            };
            entries.extend(page);

            match next {
                Some(after) if !reached_since && cursor.as_deref() != Some(after.as_str()) => {
                    cursor = Some(after);
                }
                _ => break,
            }
        }

        debug!(path, count = entries.len(), "Fetched paginated entries");
        Ok(entries)
    }

    /// API 응답 처리.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ExchangeResult<(T, Option<String>)> {
        let status = response.status();
        let cursor = response
            .headers()
            .get("cb-after")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        if status.is_success() {
            let value = serde_json::from_str(&body).map_err(|e| {
                error!("Failed to parse response: {} - Body: {}", e, body);
                ExchangeError::ParseError(e.to_string())
            })?;
            Ok((value, cursor))
        } else {
            let message = serde_json::from_str::<CbError>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            Err(Self::map_error(status.as_u16(), message))
        }
    }

    /// HTTP 상태와 메시지를 ExchangeError로 매핑.
    fn map_error(status: u16, message: String) -> ExchangeError {
        match status {
            401 | 403 => ExchangeError::Unauthorized(message),
            429 => ExchangeError::RateLimited,
            _ if message.contains("Insufficient funds") => ExchangeError::InsufficientBalance(message),
            404 => ExchangeError::NotFound(message),
            _ => ExchangeError::ApiError {
                code: status as i32,
                message,
            },
        }
    }
}

#[async_trait]
impl Exchange for CoinbaseProClient {
    fn name(&self) -> &str {
        "coinbase-pro"
    }

    async fn list_payment_methods(&self) -> ExchangeResult<Vec<PaymentMethod>> {
        let methods: Vec<CbPaymentMethod> = self.signed_get("/payment-methods").await?;
        Ok(methods
            .into_iter()
            .map(|m| PaymentMethod {
                id: m.id,
                name: m.name,
                method_type: m.method_type,
                currency: m.currency,
            })
            .collect())
    }

    async fn list_accounts(&self) -> ExchangeResult<Vec<Account>> {
        let accounts: Vec<CbAccount> = self.signed_get("/accounts").await?;
        Ok(accounts
            .into_iter()
            .map(|a| Account {
                id: a.id,
                currency: a.currency,
                balance: a.balance,
                available: a.available,
                hold: a.hold,
            })
            .collect())
    }

    async fn get_account_history(
        &self,
        account_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> ExchangeResult<Vec<AccountEntry>> {
        let path = format!("/accounts/{}/ledger", account_id);
        self.paginated_entries(&path, since, CbLedgerEntry::into_entry)
            .await
    }

    async fn get_transfers(
        &self,
        account_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> ExchangeResult<Vec<AccountEntry>> {
        let path = format!("/accounts/{}/transfers", account_id);
        self.paginated_entries(&path, since, CbTransfer::into_entry)
            .await
    }

    async fn place_market_buy(&self, request: &MarketBuyRequest) -> ExchangeResult<OrderReceipt> {
        let body = CbOrderBody {
            order_type: "market",
            side: "buy",
            product_id: request.product.product_id(),
            funds: request.funds,
            client_oid: request.client_oid,
        };

        info!(
            "Placing market buy for {} with funds {} (client_oid {})",
            body.product_id, body.funds, body.client_oid
        );

        let resp: CbOrderResponse = self.signed_post("/orders", &body).await?;

        info!("Order placed successfully: {}", resp.id);
        Ok(OrderReceipt {
            order_id: resp.id,
            product_id: resp.product_id,
            funds: resp.funds.unwrap_or(request.funds),
            status: resp.status,
        })
    }

    async fn deposit(&self, request: &DepositRequest) -> ExchangeResult<DepositReceipt> {
        let body = CbDepositBody {
            amount: request.amount,
            currency: request.currency.clone(),
            payment_method_id: request.payment_method_id.clone(),
        };

        info!(
            "Depositing {} {} from payment method {}",
            body.amount, body.currency, body.payment_method_id
        );

        let resp: CbDepositResponse = self.signed_post("/deposits/payment-method", &body).await?;

        info!("Deposit created successfully: {}", resp.id);
        Ok(DepositReceipt {
            id: resp.id,
            amount: resp.amount,
            currency: resp.currency,
            payout_at: parse_optional_timestamp(resp.payout_at.as_deref())?,
        })
    }
}
