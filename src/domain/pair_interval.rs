use {
    crate::utils::TimeUtils,
    serde::{Deserialize, Serialize},
};

/// Symbol plus candle width: what a single fetch is about.
#[derive(Serialize, Deserialize, Debug, Clone, Hash, Eq, PartialEq)]
pub struct PairInterval {
    pub name: String,
    pub interval_ms: i64,
}

impl PairInterval {
    pub fn new(name: impl Into<String>, interval_ms: i64) -> Self {
        Self {
            name: name.into(),
            interval_ms,
        }
    }

    // The name we pass into the Binance API (not necessarily display name)
    pub(crate) fn bn_name(&self) -> String {
        self.name.to_ascii_uppercase()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for PairInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} @ {}",
            self.name,
            TimeUtils::interval_to_string(self.interval_ms)
        )
    }
}
