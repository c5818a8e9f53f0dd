use {
    anyhow::{Result, bail},
    binance_sdk::{
        config::ConfigurationRestApi,
        errors::{self, ConnectorError as connection_error},
        spot::{
            SpotRestApi,
            rest_api::{KlinesIntervalEnum, KlinesItemInner, KlinesParams, RestApi},
        },
    },
    std::{collections::HashSet, convert::TryFrom, time::Duration},
};

use crate::{
    config::{BINANCE, BinanceApiConfig, DF},
    data::GlobalRateLimiter,
    domain::{Kline, PairInterval},
    utils::TimeUtils,
};

pub fn try_interval_from_ms(ms: i64) -> Result<KlinesIntervalEnum, String> {
    use TimeUtils as T;
    match ms {
        T::MS_IN_S => Ok(KlinesIntervalEnum::Interval1s),
        T::MS_IN_MIN => Ok(KlinesIntervalEnum::Interval1m),
        T::MS_IN_3_MIN => Ok(KlinesIntervalEnum::Interval3m),
        T::MS_IN_5_MIN => Ok(KlinesIntervalEnum::Interval5m),
        T::MS_IN_15_MIN => Ok(KlinesIntervalEnum::Interval15m),
        T::MS_IN_30_MIN => Ok(KlinesIntervalEnum::Interval30m),
        T::MS_IN_H => Ok(KlinesIntervalEnum::Interval1h),
        T::MS_IN_2_H => Ok(KlinesIntervalEnum::Interval2h),
        T::MS_IN_4_H => Ok(KlinesIntervalEnum::Interval4h),
        T::MS_IN_6_H => Ok(KlinesIntervalEnum::Interval6h),
        T::MS_IN_8_H => Ok(KlinesIntervalEnum::Interval8h),
        T::MS_IN_12_H => Ok(KlinesIntervalEnum::Interval12h),
        T::MS_IN_D => Ok(KlinesIntervalEnum::Interval1d),
        T::MS_IN_3_D => Ok(KlinesIntervalEnum::Interval3d),
        T::MS_IN_W => Ok(KlinesIntervalEnum::Interval1w),
        T::MS_IN_1_M => Ok(KlinesIntervalEnum::Interval1M),
        _ => Err(format!("Unsupported interval: {}ms", ms)),
    }
}

#[derive(Debug, PartialOrd, PartialEq)]
pub struct BNKline {
    pub open_timestamp_ms: i64,
    pub open_price: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub close_price: Option<f64>,
    pub base_asset_volume: Option<f64>,
    pub quote_asset_volume: Option<f64>,
}

/// Why a kline page could not be turned into data. Every variant is final for the request.
#[derive(Debug, thiserror::Error)]
pub enum BNKlineError {
    #[error("Invalid length")]
    InvalidLength,
    #[error("Invalid type: {0}")]
    InvalidType(String),
    #[error("Unknown symbol {0}")]
    InvalidSymbol(String),
    #[error("No permission to read klines: {0}")]
    Unauthorized(String),
    #[error("Binance API connection failed: {0}")]
    ConnectionFailed(String),
}

fn convert_kline_item_inner_enum_string_to_float(kline: Option<KlinesItemInner>) -> Option<f64> {
    kline.and_then(|inner| {
        if let KlinesItemInner::String(s) = inner {
            s.parse::<f64>().ok()
        } else {
            None
        }
    })
}

impl TryFrom<Vec<KlinesItemInner>> for BNKline {
    type Error = BNKlineError;

    fn try_from(vec_inner_klines: Vec<KlinesItemInner>) -> Result<Self, Self::Error> {
        if vec_inner_klines.len() < 8 {
            return Err(BNKlineError::InvalidLength);
        }

        let mut items = vec_inner_klines.into_iter();
        let open_timestamp_ms = match items.next().ok_or(BNKlineError::InvalidLength)? {
            KlinesItemInner::Integer(a) => a,
            _ => return Err(BNKlineError::InvalidType("open_time".to_string())),
        };

        let open_price = convert_kline_item_inner_enum_string_to_float(items.next());
        let high_price = convert_kline_item_inner_enum_string_to_float(items.next());
        let low_price = convert_kline_item_inner_enum_string_to_float(items.next());
        let close_price = convert_kline_item_inner_enum_string_to_float(items.next());
        let volume = convert_kline_item_inner_enum_string_to_float(items.next());
        let _ = items.next(); // close_time, unused
        let quote_asset_volume = convert_kline_item_inner_enum_string_to_float(items.next());

        Ok(BNKline {
            open_timestamp_ms,
            open_price,
            high_price,
            low_price,
            close_price,
            base_asset_volume: volume,
            quote_asset_volume,
        })
    }
}

impl From<BNKline> for Kline {
    fn from(bn: BNKline) -> Self {
        Kline::new(
            bn.open_timestamp_ms,
            bn.open_price.unwrap_or_default(),
            bn.high_price.unwrap_or_default(),
            bn.low_price.unwrap_or_default(),
            bn.close_price.unwrap_or_default(),
            bn.base_asset_volume.unwrap_or_default(),
            bn.quote_asset_volume.unwrap_or_default(),
        )
    }
}

fn convert_klines(data: Vec<Vec<KlinesItemInner>>) -> Result<Vec<BNKline>, BNKlineError> {
    data.into_iter().map(Vec::try_into).collect()
}

fn configure_binance_client() -> Result<RestApi, anyhow::Error> {
    let config = BinanceApiConfig::default();
    let rest_conf = ConfigurationRestApi::builder()
        .timeout(config.timeout_ms)
        .retries(config.retries)
        .backoff(config.backoff_ms)
        .build()?;
    // Create the Spot REST API client
    let rest_client = SpotRestApi::production(rest_conf);
    Ok(rest_client)
}

/// How a failed page request should be handled.
#[derive(Debug)]
enum PageFailure {
    /// Transient: try the same page again after a pause.
    Retry(Duration),
    /// Weight limit hit: wait for the next minute's budget, then retry.
    WaitForBudget,
    Fatal(anyhow::Error),
}

// `msg` is the message text of a 4xx body, e.g. "Invalid symbol." for code -1121.
fn classify_client_error(msg: &str, pair_interval: &PairInterval) -> PageFailure {
    let text = msg.to_ascii_lowercase();
    if text.contains(BINANCE.errors.invalid_symbol) {
        PageFailure::Fatal(BNKlineError::InvalidSymbol(pair_interval.bn_name()).into())
    } else if text.contains(BINANCE.errors.no_permissions) {
        PageFailure::Fatal(BNKlineError::Unauthorized(msg.to_string()).into())
    } else if text.contains(BINANCE.errors.weight_exceeded) {
        PageFailure::WaitForBudget
    } else {
        PageFailure::Fatal(BNKlineError::ConnectionFailed(msg.to_string()).into())
    }
}

async fn fetch_klines_page(
    rest_client: &RestApi,
    params: KlinesParams,
    pair_interval: &PairInterval,
) -> Result<Vec<Vec<KlinesItemInner>>, PageFailure> {
    let response = match rest_client.klines(params).await {
        Ok(r) => r,
        Err(e) => {
            let Some(conn_err) = e.downcast_ref::<errors::ConnectorError>() else {
                log::error!(
                    "An unexpected error occurred for {}: {:#}",
                    pair_interval,
                    e
                );
                return Err(PageFailure::Fatal(
                    anyhow::Error::new(BNKlineError::ConnectionFailed(e.to_string())).context(
                        format!("Unexpected error during API call for {}", pair_interval),
                    ),
                ));
            };

            return Err(match conn_err {
                errors::ConnectorError::NetworkError(msg) => {
                    log::warn!(
                        "{} Network error, retrying: {}",
                        pair_interval,
                        msg
                    );
                    PageFailure::Retry(Duration::from_millis(BINANCE.client.retry_delay_ms))
                }
                connection_error::TooManyRequestsError(msg) => {
                    log::warn!(
                        "{} Rate limit exceeded, waiting for the next minute. {}",
                        pair_interval,
                        msg
                    );
                    PageFailure::WaitForBudget
                }
                connection_error::ConnectorClientError(msg)
                | connection_error::BadRequestError(msg) => {
                    log::error!("{} Client error: {}", pair_interval, msg);
                    classify_client_error(msg, pair_interval)
                }
                connection_error::RateLimitBanError(msg) => {
                    log::error!(
                        "{} IP address banned due to excessive rate limits. {}",
                        pair_interval,
                        msg
                    );
                    PageFailure::Fatal(BNKlineError::ConnectionFailed(msg.clone()).into())
                }
                errors::ConnectorError::ServerError { msg, status_code } => {
                    log::error!(
                        "{} Server error: {} (status code: {:?})",
                        pair_interval,
                        msg,
                        status_code
                    );
                    PageFailure::Fatal(BNKlineError::ConnectionFailed(msg.clone()).into())
                }
                errors::ConnectorError::NotFoundError(msg) => {
                    log::error!("Resource not found. {}", msg);
                    PageFailure::Fatal(BNKlineError::ConnectionFailed(msg.clone()).into())
                }
                other => {
                    // Unauthorized / forbidden and anything newer the connector grows.
                    log::error!("{} Unexpected connector error: {:?}", pair_interval, other);
                    PageFailure::Fatal(BNKlineError::Unauthorized(other.to_string()).into())
                }
            });
        }
    };

    response.data().await.map_err(|e| {
        PageFailure::Fatal(
            anyhow::Error::new(BNKlineError::ConnectionFailed(e.to_string()))
                .context(format!("Undecodable klines response for {}", pair_interval)),
        )
    })
}

/// All klines of `pair_interval` with open time in `[start_ms, end_ms)`, oldest first.
///
/// Pages forward from `start_ms`. Network failures are retried forever; a spent weight budget
/// waits for the next minute; unknown symbols and permission errors abort.
pub async fn load_klines_range(
    pair_interval: &PairInterval,
    start_ms: i64,
    end_ms: i64,
    limiter: &GlobalRateLimiter,
) -> Result<Vec<BNKline>> {
    let rest_client = configure_binance_client()?;
    let limit_klines_returned = BINANCE.limits.klines_limit;
    let call_weight = BINANCE.limits.kline_call_weight;
    let pair_name = pair_interval.bn_name();

    let mut next_start = start_ms;
    let mut all_klines: Vec<BNKline> = Vec::new();

    while next_start < end_ms {
        limiter.acquire(call_weight, &pair_name).await;

        let interval =
            try_interval_from_ms(pair_interval.interval_ms).map_err(anyhow::Error::msg)?;
        let params = KlinesParams::builder(pair_name.clone(), interval)
            .limit(limit_klines_returned)
            .start_time(Some(next_start))
            .end_time(Some(end_ms - 1))
            .build()?;

        let rows = match fetch_klines_page(&rest_client, params, pair_interval).await {
            Ok(rows) => rows,
            Err(PageFailure::Retry(pause)) => {
                tokio::time::sleep(pause).await;
                continue;
            }
            Err(PageFailure::WaitForBudget) => {
                limiter.saturate().await;
                continue;
            }
            Err(PageFailure::Fatal(e)) => return Err(e),
        };

        let page = convert_klines(rows).map_err(|e| {
            anyhow::Error::new(e).context(format!("{} convert_klines failed", pair_interval))
        })?;
        let page_len = page.len();

        if DF.log_kline_pages {
            log::debug!(
                "{}: page from {} returned {} klines",
                pair_interval,
                crate::utils::epoch_ms_to_utc(next_start),
                page_len
            );
        }

        let Some(last_open) = page.last().map(|k| k.open_timestamp_ms) else {
            break;
        };
        if last_open < next_start {
            bail!(
                "{}: exchange returned klines older than requested ({} < {})",
                pair_interval,
                last_open,
                next_start
            );
        }
        next_start = last_open + 1;
        all_klines.extend(page.into_iter().filter(|k| k.open_timestamp_ms < end_ms));

        if page_len < limit_klines_returned as usize {
            break;
        }
    }

    if has_duplicate_kline_open_time(&all_klines) {
        bail!(
            "has_duplicate_kline_open_time() failed for {} so bailing load_klines_range()!",
            pair_interval
        );
    }
    Ok(all_klines)
}

fn has_duplicate_kline_open_time(klines: &[BNKline]) -> bool {
    let mut seen_ids = HashSet::new();
    for kline in klines {
        if !seen_ids.insert(kline.open_timestamp_ms) {
            return true;
        }
    }
    false
}
