//! Dashboard Payloads - Decoded Feed Bodies
//!
//! Wire shapes for the four dashboard feeds and the `FeedPayload`
//! trait the polling core is generic over. Optional fields default
//! when absent so a partially populated upstream still decodes.

use std::fmt;
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::feed::{FeedKey, FeedKind};

/// A value the polling core can cache.
///
/// `decode` turns a response body into the value for a key;
/// `is_empty` identifies well-formed bodies that carry no data.
pub trait FeedPayload: Debug + Clone + PartialEq + Send + Sync + 'static {
    /// Decode a raw response body fetched for `key`.
    ///
    /// # Errors
    /// Returns the serde error if the body does not match the shape.
    fn decode(key: &FeedKey, body: &[u8]) -> Result<Self, serde_json::Error>;

    /// Whether the decoded value carries no usable data.
    fn is_empty(&self) -> bool;
}

impl<T> FeedPayload for Vec<T>
where
    T: DeserializeOwned + Debug + Clone + PartialEq + Send + Sync + 'static,
{
    fn decode(_key: &FeedKey, body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl FeedPayload for serde_json::Value {
    fn decode(_key: &FeedKey, body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Array(items) => items.is_empty(),
            Self::Object(fields) => fields.is_empty(),
            _ => false,
        }
    }
}

// ────────────────────────────────────────────
// Item shapes
// ────────────────────────────────────────────

/// Upstream identifiers arrive as numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Num(u64),
    Text(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One ticker entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    /// Ticker symbol (e.g. "BTC", "NVDA").
    pub symbol: String,
    /// Last price in USD.
    pub price: f64,
    /// 24h change in percent.
    #[serde(default)]
    pub change_24h: f64,
}

/// A private deal filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: ItemId,
    pub company_name: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub filed_at: Option<DateTime<Utc>>,
    /// Amount raised in USD.
    #[serde(default)]
    pub amount_raised: f64,
    #[serde(default)]
    pub filing_url: Option<String>,
}

/// A large on-chain transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhaleAlert {
    pub id: ItemId,
    pub token_symbol: String,
    /// Contract address, present for tokens that can be swapped.
    #[serde(default)]
    pub token_address: Option<String>,
    #[serde(default)]
    pub is_tradeable: bool,
    #[serde(default)]
    pub sender_label: String,
    #[serde(default)]
    pub receiver_label: String,
    pub amount: f64,
    #[serde(default)]
    pub tx_hash: String,
}

impl WhaleAlert {
    /// Whether the alert can be acted on (tradeable with a known address).
    pub const fn is_actionable(&self) -> bool {
        self.is_tradeable && self.token_address.is_some()
    }
}

/// Editorial sentiment attached to a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sentiment {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

/// A news story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sentiment: Sentiment,
}

// ────────────────────────────────────────────
// FeedValue - the dashboard's heterogeneous payload
// ────────────────────────────────────────────

/// Decoded body of any dashboard feed, selected by the key's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedValue {
    Market(Vec<MarketQuote>),
    Deals(Vec<Deal>),
    Alerts(Vec<WhaleAlert>),
    News(Vec<NewsItem>),
}

impl FeedValue {
    /// Number of items in the payload.
    pub fn len(&self) -> usize {
        match self {
            Self::Market(v) => v.len(),
            Self::Deals(v) => v.len(),
            Self::Alerts(v) => v.len(),
            Self::News(v) => v.len(),
        }
    }

    pub const fn kind(&self) -> FeedKind {
        match self {
            Self::Market(_) => FeedKind::Market,
            Self::Deals(_) => FeedKind::Deals,
            Self::Alerts(_) => FeedKind::Alerts,
            Self::News(_) => FeedKind::News,
        }
    }

    pub fn as_market(&self) -> Option<&[MarketQuote]> {
        match self {
            Self::Market(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_deals(&self) -> Option<&[Deal]> {
        match self {
            Self::Deals(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_alerts(&self) -> Option<&[WhaleAlert]> {
        match self {
            Self::Alerts(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_news(&self) -> Option<&[NewsItem]> {
        match self {
            Self::News(v) => Some(v),
            _ => None,
        }
    }
}

/// Decode a list and drop anything past the requested page size.
fn decode_list<T: DeserializeOwned>(key: &FeedKey, body: &[u8]) -> Result<Vec<T>, serde_json::Error> {
    let mut items: Vec<T> = serde_json::from_slice(body)?;
    if let Some(limit) = key.limit() {
        items.truncate(limit as usize);
    }
    Ok(items)
}

impl FeedPayload for FeedValue {
    fn decode(key: &FeedKey, body: &[u8]) -> Result<Self, serde_json::Error> {
        match key.kind() {
            Some(FeedKind::Market) => decode_list(key, body).map(Self::Market),
            Some(FeedKind::Deals) => decode_list(key, body).map(Self::Deals),
            Some(FeedKind::Alerts) => decode_list(key, body).map(Self::Alerts),
            Some(FeedKind::News) => decode_list(key, body).map(Self::News),
            None => Err(serde::de::Error::custom(format!(
                "no decoder for feed '{}'",
                key.name()
            ))),
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
