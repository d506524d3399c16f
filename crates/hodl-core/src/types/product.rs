//! 거래 상품(통화쌍) 정의.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 기준 통화와 호가 통화로 구성된 거래 상품.
///
/// 거래소 상품 ID 형식은 `BASE-QUOTE` 입니다 (예: `BTC-USD`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductPair {
    /// 기준 통화 (예: BTC)
    pub base: String,
    /// 호가 통화 (예: USD)
    pub quote: String,
}

impl ProductPair {
    /// 새 상품을 생성합니다. 통화 코드는 대문자로 정규화됩니다.
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into().to_uppercase(),
            quote: quote.into().to_uppercase(),
        }
    }

    /// 거래소 상품 ID (`BASE-QUOTE`)를 반환합니다.
    pub fn product_id(&self) -> String {
        format!("{}-{}", self.base, self.quote)
    }
}

impl FromStr for ProductPair {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((base, quote)) if !base.is_empty() && !quote.is_empty() && !quote.contains('-') => {
                Ok(Self::new(base, quote))
            }
            _ => Err(format!("Invalid product id: {}", s)),
        }
    }
}

impl fmt::Display for ProductPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}
