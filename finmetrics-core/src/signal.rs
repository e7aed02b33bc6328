//! Five-zone signal classification.
//!
//! A `SignalBand` holds four non-decreasing thresholds that split the real
//! line into five zones, mapped in order to the five `SignalLabel`s.
//! Which zone owns a value sitting exactly on a threshold is decided by the
//! band's `BoundaryRule`; the default gives ties to the upper zone.

use crate::error::{MetricError, Result};
use crate::series::{SignalSeries, TimeSeries};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Printed in place of a label when the input value was missing.
pub const INSUFFICIENT_DATA: &str = "Insufficient Data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignalLabel {
    #[serde(rename = "Strong Bearish")]
    StrongBearish,
    #[serde(rename = "Bearish")]
    Bearish,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Bullish")]
    Bullish,
    #[serde(rename = "Strong Bullish")]
    StrongBullish,
}

impl SignalLabel {
    pub const ALL: [SignalLabel; 5] = [
        Self::StrongBearish,
        Self::Bearish,
        Self::Neutral,
        Self::Bullish,
        Self::StrongBullish,
    ];

    /// Zone index, 0 (lowest) through 4 (highest).
    pub fn zone(self) -> usize {
        self as usize
    }

    pub fn from_zone(zone: usize) -> Option<Self> {
        Self::ALL.get(zone).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrongBearish => "Strong Bearish",
            Self::Bearish => "Bearish",
            Self::Neutral => "Neutral",
            Self::Bullish => "Bullish",
            Self::StrongBullish => "Strong Bullish",
        }
    }

    /// Name used for level metrics, where the zones mean below/above normal.
    pub fn relative_str(self) -> &'static str {
        match self {
            Self::StrongBearish => "Strongly Below",
            Self::Bearish => "Below",
            Self::Neutral => "Neutral",
            Self::Bullish => "Above",
            Self::StrongBullish => "Strongly Above",
        }
    }

    /// Signed score, -2 through +2.
    pub fn score(self) -> i8 {
        self.zone() as i8 - 2
    }

    /// Mirror around Neutral. For metrics where a higher reading is worse.
    pub fn inverted(self) -> Self {
        Self::ALL[4 - self.zone()]
    }
}

impl fmt::Display for SignalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which zone owns a value exactly equal to a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryRule {
    /// `(-inf,t1) [t1,t2) [t2,t3) [t3,t4) [t4,inf)`.
    #[default]
    UpperInclusive,
    /// `(-inf,t1] (t1,t2] (t2,t3] (t3,t4] (t4,inf)`.
    LowerInclusive,
    /// Ties move away from the middle zone: `<= t1`, `<= t2`, `>= t3`, `>= t4`.
    /// Upper thresholds are tested first when `t2 == t3`.
    Outward,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BandSpec", into = "BandSpec")]
pub struct SignalBand {
    thresholds: [f64; 4],
    rule: BoundaryRule,
}

/// Serialized form of a band; validated on the way in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct BandSpec {
    thresholds: [f64; 4],
    #[serde(default)]
    rule: BoundaryRule,
}

impl TryFrom<BandSpec> for SignalBand {
    type Error = MetricError;

    fn try_from(spec: BandSpec) -> Result<Self> {
        Ok(Self::from_array(spec.thresholds)?.with_rule(spec.rule))
    }
}

impl From<SignalBand> for BandSpec {
    fn from(band: SignalBand) -> Self {
        Self {
            thresholds: band.thresholds,
            rule: band.rule,
        }
    }
}

impl SignalBand {
    pub fn new(t1: f64, t2: f64, t3: f64, t4: f64) -> Result<Self> {
        Self::from_array([t1, t2, t3, t4])
    }

    pub fn from_array(thresholds: [f64; 4]) -> Result<Self> {
        let finite = thresholds.iter().all(|t| t.is_finite());
        let ordered = thresholds.windows(2).all(|w| w[0] <= w[1]);
        if !finite || !ordered {
            return Err(MetricError::InvalidBand { thresholds });
        }
        Ok(Self {
            thresholds,
            rule: BoundaryRule::default(),
        })
    }

    pub fn with_rule(mut self, rule: BoundaryRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn thresholds(&self) -> [f64; 4] {
        self.thresholds
    }

    pub fn rule(&self) -> BoundaryRule {
        self.rule
    }

    /// Deviation-from-average band: ±5% strong, centre at zero. Exactly -5%
    /// is strong bearish and exactly zero is bullish.
    pub fn deviation() -> Self {
        Self {
            thresholds: [-0.05, 0.0, 0.0, 0.05],
            rule: BoundaryRule::Outward,
        }
    }

    /// Band for 0–100 normalized scores. 30 is strong bearish, 50 bullish.
    pub fn normalized() -> Self {
        Self {
            thresholds: [30.0, 50.0, 50.0, 70.0],
            rule: BoundaryRule::Outward,
        }
    }

    /// VIX level ladder: 12 / 15 / 20 / 30, strictly-above comparisons.
    pub fn vix_level() -> Self {
        Self {
            thresholds: [12.0, 15.0, 20.0, 30.0],
            rule: BoundaryRule::LowerInclusive,
        }
    }

    /// Band for the VIX percentile rank.
    pub fn vix_normalized() -> Self {
        Self {
            thresholds: [30.0, 50.0, 70.0, 85.0],
            rule: BoundaryRule::LowerInclusive,
        }
    }

    /// Label for one value. `None` for NaN or infinite input.
    pub fn label(&self, value: f64) -> Option<SignalLabel> {
        if !value.is_finite() {
            return None;
        }
        let [t1, t2, t3, t4] = self.thresholds;
        let zone = match self.rule {
            BoundaryRule::UpperInclusive => self
                .thresholds
                .iter()
                .position(|&t| value < t)
                .unwrap_or(4),
            BoundaryRule::LowerInclusive => self
                .thresholds
                .iter()
                .position(|&t| value <= t)
                .unwrap_or(4),
            BoundaryRule::Outward => {
                if value >= t4 {
                    4
                } else if value >= t3 {
                    3
                } else if value <= t1 {
                    0
                } else if value <= t2 {
                    1
                } else {
                    2
                }
            }
        };
        SignalLabel::from_zone(zone)
    }
}

/// Classify every value of `values`. Missing values give missing labels.
pub fn classify(values: &TimeSeries, bands: &SignalBand) -> SignalSeries {
    values.map(format!("{}_signal", values.name()), |&v| bands.label(v))
}

/// Validate raw thresholds and classify in one step.
pub fn classify_thresholds(values: &TimeSeries, thresholds: [f64; 4]) -> Result<SignalSeries> {
    let band = SignalBand::from_array(thresholds)?;
    Ok(classify(values, &band))
}

/// Display text for an optional label.
pub fn label_text(label: Option<SignalLabel>) -> &'static str {
    label.map_or(INSUFFICIENT_DATA, SignalLabel::as_str)
}

/// Serde helper: write an optional label as its display text, or
/// `Insufficient Data` when missing. Use with `serialize_with`.
pub fn label_or_missing<S, T>(value: &Option<T>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    T: fmt::Display,
{
    match value {
        Some(label) => serializer.collect_str(label),
        None => serializer.serialize_str(INSUFFICIENT_DATA),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{daily_dates, ymd};

    fn band() -> SignalBand {
        SignalBand::new(-1.5, -0.5, 0.5, 1.5).unwrap()
    }

    #[test]
    fn upper_inclusive_zones() {
        let b = band();
        assert_eq!(b.label(-2.0), Some(SignalLabel::StrongBearish));
        assert_eq!(b.label(-1.5), Some(SignalLabel::Bearish));
        assert_eq!(b.label(-0.5), Some(SignalLabel::Neutral));
        assert_eq!(b.label(0.0), Some(SignalLabel::Neutral));
        assert_eq!(b.label(0.5), Some(SignalLabel::Bullish));
        assert_eq!(b.label(1.5), Some(SignalLabel::StrongBullish));
        assert_eq!(b.label(9.0), Some(SignalLabel::StrongBullish));
    }

    #[test]
    fn lower_inclusive_zones() {
        let b = band().with_rule(BoundaryRule::LowerInclusive);
        assert_eq!(b.label(-1.5), Some(SignalLabel::StrongBearish));
        assert_eq!(b.label(-0.5), Some(SignalLabel::Bearish));
        assert_eq!(b.label(0.5), Some(SignalLabel::Neutral));
        assert_eq!(b.label(1.5), Some(SignalLabel::Bullish));
        assert_eq!(b.label(1.6), Some(SignalLabel::StrongBullish));
    }

    #[test]
    fn outward_ties_leave_the_middle() {
        let b = band().with_rule(BoundaryRule::Outward);
        assert_eq!(b.label(-1.5), Some(SignalLabel::StrongBearish));
        assert_eq!(b.label(-0.5), Some(SignalLabel::Bearish));
        assert_eq!(b.label(0.0), Some(SignalLabel::Neutral));
        assert_eq!(b.label(0.5), Some(SignalLabel::Bullish));
        assert_eq!(b.label(1.5), Some(SignalLabel::StrongBullish));
    }

    #[test]
    fn collapsed_middle_has_no_neutral() {
        let b = SignalBand::deviation();
        assert_eq!(b.label(-0.06), Some(SignalLabel::StrongBearish));
        assert_eq!(b.label(-0.01), Some(SignalLabel::Bearish));
        assert_eq!(b.label(0.0), Some(SignalLabel::Bullish));
        assert_eq!(b.label(0.05), Some(SignalLabel::StrongBullish));
    }

    #[test]
    fn preset_edges_fall_outward() {
        let dev = SignalBand::deviation();
        assert_eq!(dev.rule(), BoundaryRule::Outward);
        assert_eq!(dev.label(-0.05), Some(SignalLabel::StrongBearish));
        assert_eq!(dev.label(-0.049), Some(SignalLabel::Bearish));

        let norm = SignalBand::normalized();
        assert_eq!(norm.label(30.0), Some(SignalLabel::StrongBearish));
        assert_eq!(norm.label(30.5), Some(SignalLabel::Bearish));
        assert_eq!(norm.label(50.0), Some(SignalLabel::Bullish));
        assert_eq!(norm.label(70.0), Some(SignalLabel::StrongBullish));
    }

    #[test]
    fn rejects_decreasing_thresholds() {
        let err = SignalBand::new(1.5, 1.0, 2.0, 3.0).unwrap_err();
        assert_eq!(
            err,
            MetricError::InvalidBand {
                thresholds: [1.5, 1.0, 2.0, 3.0]
            }
        );
    }

    #[test]
    fn rejects_nan_threshold() {
        assert!(SignalBand::new(0.0, f64::NAN, 1.0, 2.0).is_err());
    }

    #[test]
    fn equal_thresholds_are_allowed() {
        assert!(SignalBand::new(1.0, 1.0, 1.0, 1.0).is_ok());
    }

    #[test]
    fn classify_propagates_missing() {
        let dates = daily_dates(ymd(2024, 3, 1), 3);
        let s = TimeSeries::from_options("dev", dates.into_iter().zip([Some(-2.0), None, Some(2.0)]))
            .unwrap();
        let labels = classify(&s, &band());
        assert_eq!(labels.name(), "dev_signal");
        let got: Vec<_> = labels.iter().map(|o| o.value).collect();
        assert_eq!(
            got,
            vec![Some(SignalLabel::StrongBearish), None, Some(SignalLabel::StrongBullish)]
        );
        assert_eq!(label_text(got[1]), INSUFFICIENT_DATA);
    }

    #[test]
    fn label_helpers() {
        assert_eq!(SignalLabel::StrongBearish.score(), -2);
        assert_eq!(SignalLabel::StrongBullish.score(), 2);
        assert_eq!(SignalLabel::Bullish.inverted(), SignalLabel::Bearish);
        assert_eq!(SignalLabel::Neutral.inverted(), SignalLabel::Neutral);
        assert_eq!(SignalLabel::Bearish.relative_str(), "Below");
        assert_eq!(SignalLabel::StrongBullish.to_string(), "Strong Bullish");
    }

    #[test]
    fn band_deserialize_validates() {
        let ok: SignalBand =
            serde_json::from_str(r#"{"thresholds":[1.0,2.0,3.0,4.0],"rule":"outward"}"#).unwrap();
        assert_eq!(ok.rule(), BoundaryRule::Outward);

        let bad = serde_json::from_str::<SignalBand>(r#"{"thresholds":[4.0,3.0,2.0,1.0]}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn label_serializes_with_display_name() {
        let json = serde_json::to_string(&SignalLabel::StrongBearish).unwrap();
        assert_eq!(json, r#""Strong Bearish""#);
    }
}
