//! HTTP data provider.
//!
//! Fetches daily OHLCV bars from a broker-style history endpoint:
//! `GET {base_url}/history?symbol=S&from=YYYY-MM-DD&to=YYYY-MM-DD`.
//! The endpoint answers with either parallel candle arrays or a structured
//! error envelope `{errorCode, errorType, errorMessage}`. Rate-limit errors
//! are recognized by a classification predicate (code/type/message pattern),
//! never by exact string comparison alone.

use super::provider::{DataProvider, FetchError};
use crate::domain::{Bar, PriceSeries};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

/// History endpoint response: candle arrays on success, an error envelope
/// on failure. Some deployments return both fields; error wins.
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    data: Option<CandleArrays>,
    error: Option<ErrorEnvelope>,
}

/// Parallel arrays, one entry per bar. Missing values come back as null.
#[derive(Debug, Deserialize)]
struct CandleArrays {
    timestamp: Vec<i64>,
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(rename = "errorCode", default)]
    code: String,
    #[serde(rename = "errorType", default)]
    kind: String,
    #[serde(rename = "errorMessage", default)]
    message: String,
}

/// Configuration for the HTTP provider.
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub base_url: String,
    /// Bearer token sent as `access-token` header when present.
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl HttpProviderConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Live HTTP data provider.
pub struct HttpProvider {
    client: reqwest::blocking::Client,
    config: HttpProviderConfig,
}

impl HttpProvider {
    pub fn new(config: HttpProviderConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to build HTTP client");
        Self { client, config }
    }

    fn history_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/history?symbol={symbol}&from={start}&to={end}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Turn a decoded response into a validated series.
    fn parse_response(
        symbol: &str,
        resp: HistoryResponse,
    ) -> Result<PriceSeries, FetchError> {
        if let Some(envelope) = resp.error {
            return Err(classify_error(&envelope, symbol));
        }

        let data = resp
            .data
            .ok_or_else(|| FetchError::InvalidResponse("no data and no error".into()))?;

        let n = data.timestamp.len();
        let mut bars = Vec::with_capacity(n);

        for (i, &ts) in data.timestamp.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    FetchError::InvalidResponse(format!("invalid timestamp: {ts}"))
                })?;

            let open = data.open.get(i).copied().flatten();
            let high = data.high.get(i).copied().flatten();
            let low = data.low.get(i).copied().flatten();
            let close = data.close.get(i).copied().flatten();
            let volume = data.volume.get(i).copied().flatten();

            // Rows with no fields at all are non-trading days; skip them.
            if open.is_none() && high.is_none() && low.is_none() && close.is_none() {
                continue;
            }

            bars.push(Bar {
                symbol: symbol.to_string(),
                date,
                open: open.unwrap_or(f64::NAN),
                high: high.unwrap_or(f64::NAN),
                low: low.unwrap_or(f64::NAN),
                close: close.unwrap_or(f64::NAN),
                volume: volume.unwrap_or(0),
            });
        }

        if bars.is_empty() {
            return Err(FetchError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        bars.sort_by_key(|b| b.date);
        PriceSeries::new(symbol, bars).map_err(|e| FetchError::BadData(e.to_string()))
    }
}

/// Map an error envelope into the fetch taxonomy.
///
/// Rate-limit recognition is a pattern predicate over all three fields,
/// matching the provider's documented indicators plus generic phrasing.
fn classify_error(envelope: &ErrorEnvelope, symbol: &str) -> FetchError {
    if is_rate_limit_envelope(envelope) {
        return FetchError::RateLimited(format!(
            "{}: {}",
            envelope.code, envelope.message
        ));
    }
    if is_auth_envelope(envelope) {
        return FetchError::AuthenticationRequired(format!(
            "{}: {}",
            envelope.code, envelope.message
        ));
    }
    let message = envelope.message.to_lowercase();
    if envelope.kind == "Invalid_Symbol" || message.contains("not found") {
        return FetchError::SymbolNotFound {
            symbol: symbol.to_string(),
        };
    }
    FetchError::Upstream {
        code: envelope.code.clone(),
        message: envelope.message.clone(),
    }
}

fn is_rate_limit_envelope(envelope: &ErrorEnvelope) -> bool {
    let message = envelope.message.to_lowercase();
    envelope.code == "DH-904"
        || envelope.kind == "Rate_Limit"
        || message.contains("rate limit")
        || message.contains("too many requests")
}

fn is_auth_envelope(envelope: &ErrorEnvelope) -> bool {
    envelope.code == "DH-902"
        || envelope.kind == "Invalid_Access"
        || envelope.message.contains("not subscribed")
}

impl DataProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, FetchError> {
        let url = self.history_url(symbol, start, end);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.config.access_token {
            request = request.header("access-token", token);
        }

        let resp = request.send().map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                FetchError::Network(e.to_string())
            } else {
                FetchError::InvalidResponse(e.to_string())
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited(format!("HTTP 429 for {symbol}")));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(FetchError::AuthenticationRequired(format!(
                "HTTP {status} for {symbol}"
            )));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Network(format!("HTTP {status} for {symbol}")));
        }

        let decoded: HistoryResponse = resp
            .json()
            .map_err(|e| FetchError::InvalidResponse(format!("{symbol}: {e}")))?;

        Self::parse_response(symbol, decoded)
    }
}
