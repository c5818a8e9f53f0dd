use {
    serde::{Deserialize, Serialize},
    std::str::FromStr,
    strum_macros::{Display, EnumIter},
};

/// Which regression output a run reports at every position.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, Default,
)]
pub enum CoefficientSelector {
    /// Slope.
    #[strum(to_string = "a")]
    A,
    /// Intercept.
    #[strum(to_string = "b")]
    B,
    /// Slope plus intercept.
    #[strum(to_string = "ab")]
    #[default]
    AB,
}

impl FromStr for CoefficientSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(Self::A),
            "b" => Ok(Self::B),
            "ab" => Ok(Self::AB),
            other => Err(format!(
                "unsupported coefficient '{}': expected 'a', 'b' or 'ab'",
                other
            )),
        }
    }
}
