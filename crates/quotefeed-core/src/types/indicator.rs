//! Indicator request and result types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use super::quote::normalize_symbol;
use super::CandleRange;
use crate::error::{FeedError, IndicatorError};

/// Supported indicator families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Macd,
    #[serde(alias = "bbands", alias = "bb")]
    Bollinger,
}

impl IndicatorKind {
    /// Wire name of the indicator.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::Sma => "sma",
            IndicatorKind::Ema => "ema",
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::Macd => "macd",
            IndicatorKind::Bollinger => "bollinger",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorKind {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sma" => Ok(IndicatorKind::Sma),
            "ema" => Ok(IndicatorKind::Ema),
            "rsi" => Ok(IndicatorKind::Rsi),
            "macd" => Ok(IndicatorKind::Macd),
            "bollinger" | "bbands" | "bb" => Ok(IndicatorKind::Bollinger),
            other => Err(IndicatorError::InvalidParameter(format!(
                "unknown indicator type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PeriodArgs {
    period: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MacdArgs {
    fast: Option<i64>,
    slow: Option<i64>,
    signal: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BollingerArgs {
    period: Option<i64>,
    multiplier: Option<f64>,
}

/// A fully resolved indicator configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorSpec {
    Sma { period: usize },
    Ema { period: usize },
    Rsi { period: usize },
    Macd { fast: usize, slow: usize, signal: usize },
    Bollinger { period: usize, multiplier: f64 },
}

impl IndicatorSpec {
    pub const DEFAULT_MA_PERIOD: usize = 20;
    pub const DEFAULT_RSI_PERIOD: usize = 14;
    pub const DEFAULT_MACD: (usize, usize, usize) = (12, 26, 9);
    pub const DEFAULT_BOLLINGER_MULTIPLIER: f64 = 2.0;

    /// Parse and validate raw parameters for an indicator kind.
    ///
    /// Missing fields take their defaults; `null` is treated as `{}`.
    /// Unknown fields, wrong types and out-of-range values are all
    /// reported as `InvalidParameter`.
    pub fn from_parameters(kind: IndicatorKind, parameters: &Value) -> Result<Self, IndicatorError> {
        let parameters = if parameters.is_null() {
            json!({})
        } else {
            parameters.clone()
        };

        let spec = match kind {
            IndicatorKind::Sma | IndicatorKind::Ema | IndicatorKind::Rsi => {
                let args: PeriodArgs = parse_args(kind, parameters)?;
                let default = if kind == IndicatorKind::Rsi {
                    Self::DEFAULT_RSI_PERIOD
                } else {
                    Self::DEFAULT_MA_PERIOD
                };
                let period = to_period("period", args.period, default)?;
                match kind {
                    IndicatorKind::Sma => IndicatorSpec::Sma { period },
                    IndicatorKind::Ema => IndicatorSpec::Ema { period },
                    _ => IndicatorSpec::Rsi { period },
                }
            }
            IndicatorKind::Macd => {
                let args: MacdArgs = parse_args(kind, parameters)?;
                let (fast, slow, signal) = Self::DEFAULT_MACD;
                IndicatorSpec::Macd {
                    fast: to_period("fast", args.fast, fast)?,
                    slow: to_period("slow", args.slow, slow)?,
                    signal: to_period("signal", args.signal, signal)?,
                }
            }
            IndicatorKind::Bollinger => {
                let args: BollingerArgs = parse_args(kind, parameters)?;
                IndicatorSpec::Bollinger {
                    period: to_period("period", args.period, Self::DEFAULT_MA_PERIOD)?,
                    multiplier: args
                        .multiplier
                        .unwrap_or(Self::DEFAULT_BOLLINGER_MULTIPLIER),
                }
            }
        };

        spec.validate()?;
        Ok(spec)
    }

    /// Check the shape constraints of the configuration.
    pub fn validate(&self) -> Result<(), IndicatorError> {
        match *self {
            IndicatorSpec::Sma { period }
            | IndicatorSpec::Ema { period }
            | IndicatorSpec::Rsi { period } => check_period("period", period),
            IndicatorSpec::Macd { fast, slow, signal } => {
                check_period("fast", fast)?;
                check_period("slow", slow)?;
                check_period("signal", signal)?;
                if fast >= slow {
                    return Err(IndicatorError::InvalidParameter(format!(
                        "fast period ({fast}) must be less than slow period ({slow})"
                    )));
                }
                Ok(())
            }
            IndicatorSpec::Bollinger { period, multiplier } => {
                check_period("period", period)?;
                if !multiplier.is_finite() || multiplier <= 0.0 {
                    return Err(IndicatorError::InvalidParameter(format!(
                        "multiplier must be a positive number, got {multiplier}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Indicator family.
    pub fn kind(&self) -> IndicatorKind {
        match self {
            IndicatorSpec::Sma { .. } => IndicatorKind::Sma,
            IndicatorSpec::Ema { .. } => IndicatorKind::Ema,
            IndicatorSpec::Rsi { .. } => IndicatorKind::Rsi,
            IndicatorSpec::Macd { .. } => IndicatorKind::Macd,
            IndicatorSpec::Bollinger { .. } => IndicatorKind::Bollinger,
        }
    }

    /// Fully populated parameters object (defaults filled in).
    pub fn parameters(&self) -> Value {
        match *self {
            IndicatorSpec::Sma { period }
            | IndicatorSpec::Ema { period }
            | IndicatorSpec::Rsi { period } => json!({ "period": period }),
            IndicatorSpec::Macd { fast, slow, signal } => {
                json!({ "fast": fast, "signal": signal, "slow": slow })
            }
            IndicatorSpec::Bollinger { period, multiplier } => {
                json!({ "multiplier": multiplier, "period": period })
            }
        }
    }

    /// Number of candles after which every output series is defined.
    pub fn warmup(&self) -> usize {
        match *self {
            IndicatorSpec::Sma { period } | IndicatorSpec::Bollinger { period, .. } => {
                period.saturating_sub(1)
            }
            IndicatorSpec::Ema { .. } => 0,
            IndicatorSpec::Rsi { period } => period,
            IndicatorSpec::Macd { slow, signal, .. } => (slow + signal).saturating_sub(2),
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(
    kind: IndicatorKind,
    parameters: Value,
) -> Result<T, IndicatorError> {
    serde_json::from_value(parameters)
        .map_err(|e| IndicatorError::InvalidParameter(format!("{kind} parameters: {e}")))
}

fn to_period(name: &str, value: Option<i64>, default: usize) -> Result<usize, IndicatorError> {
    match value {
        None => Ok(default),
        Some(v) if v >= 1 => usize::try_from(v)
            .map_err(|_| IndicatorError::InvalidParameter(format!("{name} is too large: {v}"))),
        Some(v) => Err(IndicatorError::InvalidParameter(format!(
            "{name} must be >= 1, got {v}"
        ))),
    }
}

/// Reject a zero window length. Shared by request validation and the
/// indicator functions themselves.
pub fn check_period(name: &str, period: usize) -> Result<(), IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidParameter(format!(
            "{name} must be >= 1, got 0"
        )));
    }
    Ok(())
}

/// Inbound "calculate indicator" request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorRequest {
    /// Ticker
    pub symbol: String,
    /// Indicator family
    #[serde(rename = "type")]
    pub kind: IndicatorKind,
    /// Raw parameters; missing fields take defaults
    #[serde(default)]
    pub parameters: Value,
    /// Candle window; when absent the service picks a trailing window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<CandleRange>,
}

impl IndicatorRequest {
    /// Create a request with default range.
    pub fn new(symbol: impl Into<String>, kind: IndicatorKind, parameters: Value) -> Self {
        Self {
            symbol: symbol.into(),
            kind,
            parameters,
            range: None,
        }
    }

    /// Set an explicit candle range.
    pub fn with_range(mut self, range: CandleRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Normalize the symbol and validate the parameters.
    pub fn resolve(&self) -> Result<ResolvedRequest, FeedError> {
        let symbol = normalize_symbol(&self.symbol)?;
        let spec = IndicatorSpec::from_parameters(self.kind, &self.parameters)?;
        Ok(ResolvedRequest { symbol, spec })
    }
}

/// A validated request: normalized symbol plus typed configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub symbol: String,
    pub spec: IndicatorSpec,
}

impl ResolvedRequest {
    /// Idempotence key: `(symbol, type, canonical parameters)`.
    ///
    /// Parameters are serialized with sorted keys and defaults filled in,
    /// so `{}` and `{"period": 20}` share a fingerprint for SMA.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}:{}:{}",
            self.symbol,
            self.spec.kind(),
            self.spec.parameters()
        )
    }
}

/// One named output sequence.
///
/// Undefined entries are NaN in memory and `null` on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorSeries {
    pub name: String,
    pub values: Vec<f64>,
}

impl IndicatorSeries {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Computed indicator output aligned to a candle sequence.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorResult {
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: IndicatorKind,
    pub parameters: Value,
    /// Candle timestamps the series are aligned to
    pub timestamps: Vec<i64>,
    pub series: Vec<IndicatorSeries>,
}

impl IndicatorResult {
    /// Look up a series by name.
    pub fn series(&self, name: &str) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.values.as_slice())
    }

    /// Bit-level equality, treating identical NaNs as equal.
    pub fn bit_identical(&self, other: &IndicatorResult) -> bool {
        self.symbol == other.symbol
            && self.kind == other.kind
            && self.parameters == other.parameters
            && self.timestamps == other.timestamps
            && self.series.len() == other.series.len()
            && self.series.iter().zip(&other.series).all(|(a, b)| {
                a.name == b.name
                    && a.values.len() == b.values.len()
                    && a.values
                        .iter()
                        .zip(&b.values)
                        .all(|(x, y)| x.to_bits() == y.to_bits())
            })
    }
}
