use serde::{Deserialize, Serialize};

/// Price position inside a kline, for picking which price feeds the regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceField {
    Open,
    High,
    Low,
    #[default]
    Close,
}

/// One exchange candle as fetched, before any analysis.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Kline {
    pub open_timestamp_ms: i64,

    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,

    pub base_asset_volume: f64,
    pub quote_asset_volume: f64,
}

impl Kline {
    // A constructor for convenience
    pub fn new(
        open_timestamp_ms: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        base_vol: f64,
        quote_vol: f64,
    ) -> Self {
        Kline {
            open_timestamp_ms,
            open_price: open,
            high_price: high,
            low_price: low,
            close_price: close,
            base_asset_volume: base_vol,
            quote_asset_volume: quote_vol,
        }
    }

    pub fn price(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open_price,
            PriceField::High => self.high_price,
            PriceField::Low => self.low_price,
            PriceField::Close => self.close_price,
        }
    }
}

/// Flatten klines into the price series the regression runs over.
pub fn prices_of_klines(klines: &[Kline], field: PriceField) -> Vec<f64> {
    klines.iter().map(|k| k.price(field)).collect()
}
