//! Search-interest fetcher backed by the Google Trends widget API.
//!
//! Given up to [`MAX_KEYWORDS`] keywords, issues one batched
//! interest-over-time query over a fixed trailing window and reduces
//! each keyword's series to its arithmetic mean. Failures never
//! propagate: every requested keyword appears in the result, with a 0
//! score and a classified [`TrendsError`] tag for anything that failed.
//!
//! The upstream protocol is the two-step widget flow: an `explore`
//! request yields a TIMESERIES widget token, then `widgetdata/multiline`
//! returns the series. Both responses carry a short anti-JSON garbage
//! prefix that must be stripped before decoding.

use crate::config::TrendsConfig;
use crate::error::TrendsError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Hard upstream limit on keywords per batched query.
pub const MAX_KEYWORDS: usize = 5;

/// The outcome of one batched interest query.
///
/// `scores` is keyed by every prepared (trimmed, non-blank, truncated)
/// input keyword with no partial omission; `failures` tags the subset
/// that degraded to 0, keyed the same way.
#[derive(Debug, Default)]
pub struct VolumeReport {
    pub scores: BTreeMap<String, u64>,
    pub failures: BTreeMap<String, TrendsError>,
}

impl VolumeReport {
    /// True when every keyword in the report failed (e.g. the whole
    /// batch request was rejected).
    pub fn fully_degraded(&self) -> bool {
        !self.scores.is_empty() && self.failures.len() >= self.scores.len()
    }
}

/// Source of search-interest scores. Seam for tests and alternative backends.
#[async_trait]
pub trait InterestSource: Send + Sync {
    /// Resolve a mean interest score for each keyword.
    ///
    /// Always returns a complete mapping over the prepared input set;
    /// an empty prepared set yields an empty report without any
    /// external call.
    async fn interest_scores(&self, keywords: &[String]) -> VolumeReport;
}

/// Google Trends client implementing [`InterestSource`].
pub struct GoogleTrendsClient {
    client: Client,
    config: TrendsConfig,
}

impl GoogleTrendsClient {
    pub fn new(config: &TrendsConfig) -> Result<Self, TrendsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TrendsError::Connection {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Trim keywords, drop blanks, truncate to the upstream batch limit.
    fn prepare_keywords(keywords: &[String]) -> Vec<String> {
        keywords
            .iter()
            .map(|kw| kw.trim())
            .filter(|kw| !kw.is_empty())
            .take(MAX_KEYWORDS)
            .map(str::to_string)
            .collect()
    }

    /// Run the two-step widget flow and return one series per keyword,
    /// indexed like the input (None = column absent upstream).
    async fn fetch_series(
        &self,
        keywords: &[String],
    ) -> Result<Vec<Option<Vec<f64>>>, TrendsError> {
        let comparison: Vec<Value> = keywords
            .iter()
            .map(|kw| {
                json!({
                    "keyword": kw,
                    "geo": self.config.geo,
                    "time": self.config.timeframe,
                })
            })
            .collect();
        let explore_req = json!({
            "comparisonItem": comparison,
            "category": 0,
            "property": "",
        });

        let explore_url = format!("{}/trends/api/explore", self.config.base_url);
        let response = self
            .client
            .get(&explore_url)
            .query(&[
                ("hl", self.config.hl.as_str()),
                ("tz", &self.config.tz.to_string()),
                ("req", &explore_req.to_string()),
            ])
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrendsError::Status {
                code: status.as_u16(),
            });
        }
        let text = response.text().await.map_err(map_reqwest_error)?;
        let explore_body = parse_prefixed_json(&text)?;
        let (token, widget_request) = extract_timeseries_widget(&explore_body)?;

        debug!(keywords = keywords.len(), "Fetching interest-over-time series");

        let widget_url = format!("{}/trends/api/widgetdata/multiline", self.config.base_url);
        let response = self
            .client
            .get(&widget_url)
            .query(&[
                ("hl", self.config.hl.as_str()),
                ("tz", &self.config.tz.to_string()),
                ("req", &widget_request.to_string()),
                ("token", &token),
            ])
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrendsError::Status {
                code: status.as_u16(),
            });
        }
        let text = response.text().await.map_err(map_reqwest_error)?;
        let body = parse_prefixed_json(&text)?;
        parse_multiline(&body, keywords.len())
    }
}

#[async_trait]
impl InterestSource for GoogleTrendsClient {
    async fn interest_scores(&self, keywords: &[String]) -> VolumeReport {
        let prepared = Self::prepare_keywords(keywords);
        if prepared.is_empty() {
            return VolumeReport::default();
        }

        // Fixed delay before each batched query to avoid upstream throttling.
        if self.config.throttle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.throttle_ms)).await;
        }

        let mut report = VolumeReport::default();
        match self.fetch_series(&prepared).await {
            Ok(columns) => {
                for (i, keyword) in prepared.into_iter().enumerate() {
                    match columns.get(i).and_then(|c| c.as_deref()) {
                        Some(series) => {
                            report.scores.insert(keyword, mean_truncated(series));
                        }
                        None => {
                            report.scores.insert(keyword.clone(), 0);
                            report.failures.insert(keyword, TrendsError::MissingSeries);
                        }
                    }
                }
            }
            Err(err) => {
                for keyword in prepared {
                    report.scores.insert(keyword.clone(), 0);
                    report.failures.insert(keyword, err.clone());
                }
            }
        }
        report
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TrendsError {
    if err.is_timeout() {
        TrendsError::Timeout
    } else {
        TrendsError::Connection {
            message: err.to_string(),
        }
    }
}

/// Strip the upstream anti-JSON garbage prefix and decode the rest.
///
/// The prefix is `)]}'` with or without a trailing comma/newline
/// depending on the endpoint, so scan to the first JSON bracket
/// instead of slicing a fixed byte count.
fn parse_prefixed_json(body: &str) -> Result<Value, TrendsError> {
    let start = body
        .find(['{', '['])
        .ok_or_else(|| TrendsError::Parse {
            message: "no JSON payload after prefix".to_string(),
        })?;
    serde_json::from_str(&body[start..]).map_err(|e| TrendsError::Parse {
        message: e.to_string(),
    })
}

/// Pull the TIMESERIES widget token and request out of an explore response.
fn extract_timeseries_widget(body: &Value) -> Result<(String, Value), TrendsError> {
    let widgets = body
        .get("widgets")
        .and_then(|w| w.as_array())
        .ok_or_else(|| TrendsError::Parse {
            message: "explore response has no widgets".to_string(),
        })?;

    let widget = widgets
        .iter()
        .find(|w| w.get("id").and_then(|id| id.as_str()) == Some("TIMESERIES"))
        .ok_or_else(|| TrendsError::Parse {
            message: "no TIMESERIES widget in explore response".to_string(),
        })?;

    let token = widget
        .get("token")
        .and_then(|t| t.as_str())
        .ok_or_else(|| TrendsError::Parse {
            message: "TIMESERIES widget has no token".to_string(),
        })?
        .to_string();
    let request = widget
        .get("request")
        .cloned()
        .ok_or_else(|| TrendsError::Parse {
            message: "TIMESERIES widget has no request".to_string(),
        })?;

    Ok((token, request))
}

/// Extract one value column per keyword from a multiline response.
fn parse_multiline(body: &Value, keyword_count: usize) -> Result<Vec<Option<Vec<f64>>>, TrendsError> {
    let points = body
        .get("default")
        .and_then(|d| d.get("timelineData"))
        .and_then(|t| t.as_array())
        .ok_or_else(|| TrendsError::Parse {
            message: "multiline response has no timelineData".to_string(),
        })?;

    let mut columns: Vec<Option<Vec<f64>>> = vec![None; keyword_count];
    for point in points {
        let Some(values) = point.get("value").and_then(|v| v.as_array()) else {
            continue;
        };
        for (i, column) in columns.iter_mut().enumerate() {
            if let Some(v) = values.get(i).and_then(|v| v.as_f64()) {
                column.get_or_insert_with(Vec::new).push(v);
            }
        }
    }
    Ok(columns)
}

/// Arithmetic mean, truncated to an integer.
fn mean_truncated(series: &[f64]) -> u64 {
    if series.is_empty() {
        return 0;
    }
    let sum: f64 = series.iter().sum();
    (sum / series.len() as f64) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prepare_keywords_truncates_to_limit() {
        let keywords: Vec<String> = (1..=8).map(|i| format!("kw{}", i)).collect();
        let prepared = GoogleTrendsClient::prepare_keywords(&keywords);
        assert_eq!(prepared, vec!["kw1", "kw2", "kw3", "kw4", "kw5"]);
    }

    #[test]
    fn test_prepare_keywords_trims_and_drops_blanks() {
        let keywords = vec![
            "  rust  ".to_string(),
            "   ".to_string(),
            String::new(),
            "axum".to_string(),
        ];
        let prepared = GoogleTrendsClient::prepare_keywords(&keywords);
        assert_eq!(prepared, vec!["rust", "axum"]);
    }

    #[test]
    fn test_parse_prefixed_json() {
        let body = ")]}'\n{\"widgets\":[]}";
        let parsed = parse_prefixed_json(body).unwrap();
        assert!(parsed.get("widgets").is_some());

        // Comma-bearing variant used by the widgetdata endpoint
        let body = ")]}',\n{\"default\":{}}";
        assert!(parse_prefixed_json(body).is_ok());

        assert!(parse_prefixed_json(")]}'garbage").is_err());
        assert!(parse_prefixed_json("").is_err());
    }

    #[test]
    fn test_extract_timeseries_widget() {
        let body: Value = serde_json::from_str(
            r#"{"widgets":[
                {"id":"GEO_MAP","token":"x","request":{}},
                {"id":"TIMESERIES","token":"abc123","request":{"time":"today 12-m"}}
            ]}"#,
        )
        .unwrap();
        let (token, request) = extract_timeseries_widget(&body).unwrap();
        assert_eq!(token, "abc123");
        assert_eq!(request["time"], "today 12-m");
    }

    #[test]
    fn test_extract_timeseries_widget_missing() {
        let body: Value = serde_json::from_str(r#"{"widgets":[{"id":"GEO_MAP"}]}"#).unwrap();
        assert!(matches!(
            extract_timeseries_widget(&body),
            Err(TrendsError::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_multiline_columns() {
        let body: Value = serde_json::from_str(
            r#"{"default":{"timelineData":[
                {"time":"1","value":[10, 4]},
                {"time":"2","value":[20, 6]},
                {"time":"3","value":[30, 5]}
            ]}}"#,
        )
        .unwrap();
        // Three keywords requested, only two columns present upstream.
        let columns = parse_multiline(&body, 3).unwrap();
        assert_eq!(columns[0].as_deref(), Some(&[10.0, 20.0, 30.0][..]));
        assert_eq!(columns[1].as_deref(), Some(&[4.0, 6.0, 5.0][..]));
        assert_eq!(columns[2], None);
    }

    #[test]
    fn test_mean_truncated() {
        assert_eq!(mean_truncated(&[10.0, 20.0, 30.0]), 20);
        // 5/3 = 1.66.. truncates to 1
        assert_eq!(mean_truncated(&[1.0, 2.0, 2.0]), 1);
        assert_eq!(mean_truncated(&[]), 0);
    }

    #[tokio::test]
    async fn test_empty_prepared_set_skips_external_call() {
        let config = TrendsConfig {
            // Unroutable on purpose; and a throttle long enough that an
            // accidental call would blow the test timing.
            base_url: "http://127.0.0.1:9".to_string(),
            throttle_ms: 60_000,
            ..Default::default()
        };
        let client = GoogleTrendsClient::new(&config).unwrap();
        let start = std::time::Instant::now();
        let report = client
            .interest_scores(&["   ".to_string(), String::new()])
            .await;
        assert!(report.scores.is_empty());
        assert!(report.failures.is_empty());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_batch_failure_degrades_every_keyword_to_zero() {
        let config = TrendsConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            throttle_ms: 0,
            timeout_secs: 2,
            ..Default::default()
        };
        let client = GoogleTrendsClient::new(&config).unwrap();
        let keywords = vec!["rust".to_string(), "tokio".to_string()];
        let report = client.interest_scores(&keywords).await;

        // Key set equals the prepared input set, all zeros, all tagged.
        assert_eq!(report.scores.len(), 2);
        assert_eq!(report.scores.get("rust"), Some(&0));
        assert_eq!(report.scores.get("tokio"), Some(&0));
        assert_eq!(report.failures.len(), 2);
        assert!(report.fully_degraded());
    }
}
