pub mod compute;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use toto_db::models::{Draw, POOL_SIZE};

use crate::config::TotoConfig;

/// Catalogue fermé des features. Les dix premières sont pondérées par le
/// `WeightVector` ; les suivantes sont des agrégats informatifs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureId {
    TotalAppearances,
    RecentAppearances,
    MissingIntervals,
    HotCold,
    Periodicity,
    RegressionTrend,
    MovingAverage,
    AttractionEffect,
    Distribution,
    AdjacentCorrelation,
    RepeatPatterns,
    CombinationFrequency,
    ChiSquare,
    ConsecutivePairs,
    OddEven,
    NumberStatistics,
    PrimeSquare,
}

/// Forme de la valeur produite par une feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureShape {
    /// Une valeur par numéro de 1 à 49.
    PerNumber,
    /// Un scalaire ou un petit enregistrement global.
    Aggregate,
}

impl FeatureId {
    pub const WEIGHTED: [FeatureId; 10] = [
        FeatureId::TotalAppearances,
        FeatureId::RecentAppearances,
        FeatureId::MissingIntervals,
        FeatureId::HotCold,
        FeatureId::Periodicity,
        FeatureId::RegressionTrend,
        FeatureId::MovingAverage,
        FeatureId::AttractionEffect,
        FeatureId::Distribution,
        FeatureId::AdjacentCorrelation,
    ];

    pub const ALL: [FeatureId; 17] = [
        FeatureId::TotalAppearances,
        FeatureId::RecentAppearances,
        FeatureId::MissingIntervals,
        FeatureId::HotCold,
        FeatureId::Periodicity,
        FeatureId::RegressionTrend,
        FeatureId::MovingAverage,
        FeatureId::AttractionEffect,
        FeatureId::Distribution,
        FeatureId::AdjacentCorrelation,
        FeatureId::RepeatPatterns,
        FeatureId::CombinationFrequency,
        FeatureId::ChiSquare,
        FeatureId::ConsecutivePairs,
        FeatureId::OddEven,
        FeatureId::NumberStatistics,
        FeatureId::PrimeSquare,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureId::TotalAppearances => "total_appearances",
            FeatureId::RecentAppearances => "recent_appearances",
            FeatureId::MissingIntervals => "missing_intervals",
            FeatureId::HotCold => "hot_cold",
            FeatureId::Periodicity => "periodicity",
            FeatureId::RegressionTrend => "regression_trend",
            FeatureId::MovingAverage => "moving_average",
            FeatureId::AttractionEffect => "attraction_effect",
            FeatureId::Distribution => "distribution",
            FeatureId::AdjacentCorrelation => "adjacent_correlation",
            FeatureId::RepeatPatterns => "repeat_patterns",
            FeatureId::CombinationFrequency => "combination_frequency",
            FeatureId::ChiSquare => "chi_square",
            FeatureId::ConsecutivePairs => "consecutive_pairs",
            FeatureId::OddEven => "odd_even",
            FeatureId::NumberStatistics => "number_statistics",
            FeatureId::PrimeSquare => "prime_square",
        }
    }

    /// Poids par défaut ; `None` pour les agrégats non pondérés.
    pub fn default_weight(&self) -> Option<f64> {
        match self {
            FeatureId::TotalAppearances => Some(0.15),
            FeatureId::RecentAppearances => Some(0.20),
            FeatureId::MissingIntervals => Some(0.15),
            FeatureId::HotCold => Some(0.10),
            FeatureId::Periodicity => Some(0.10),
            FeatureId::RegressionTrend => Some(0.08),
            FeatureId::MovingAverage => Some(0.08),
            FeatureId::AttractionEffect => Some(0.05),
            FeatureId::Distribution => Some(0.05),
            FeatureId::AdjacentCorrelation => Some(0.04),
            _ => None,
        }
    }

    pub fn is_weighted(&self) -> bool {
        self.default_weight().is_some()
    }

    pub fn shape(&self) -> FeatureShape {
        match self {
            FeatureId::TotalAppearances
            | FeatureId::RecentAppearances
            | FeatureId::MissingIntervals
            | FeatureId::HotCold
            | FeatureId::Periodicity
            | FeatureId::RegressionTrend
            | FeatureId::MovingAverage
            | FeatureId::AttractionEffect => FeatureShape::PerNumber,
            _ => FeatureShape::Aggregate,
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureId::ALL
            .iter()
            .copied()
            .find(|id| id.name() == s)
            .ok_or_else(|| format!("Feature inconnue : '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temperature {
    Hot,
    Cold,
    Neutral,
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Temperature::Hot => write!(f, "HOT"),
            Temperature::Cold => write!(f, "COLD"),
            Temperature::Neutral => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Periodicity {
    /// `f64::INFINITY` quand le numéro est apparu au plus une fois.
    pub avg_interval: f64,
    pub std_interval: f64,
    pub last_appearance: Option<usize>,
}

impl Periodicity {
    pub fn has_period(&self) -> bool {
        self.avg_interval.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
    pub slope: f64,
    pub r_squared: f64,
    pub p_value: f64,
}

impl Default for Trend {
    fn default() -> Self {
        Self { slope: 0.0, r_squared: 0.0, p_value: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovingAverage {
    pub current: f64,
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attraction {
    pub most_attracted: Option<u8>,
    pub strength: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdjacentCorrelation {
    /// Part des paires (précédent, courant) d'écart 1.
    pub diff_1: f64,
    /// Part des paires (précédent, courant) d'écart 2.
    pub diff_2: f64,
    /// Par numéro : nombre de numéros du dernier tirage à distance 1 ou 2.
    pub latest_neighbours: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatPatterns {
    pub avg_repeats: f64,
    /// Nombre de transitions ayant 0..=6 numéros en commun avec le tirage précédent.
    pub distribution: [u32; 7],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairFrequency {
    pub pair: (u8, u8),
    pub frequency: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChiSquare {
    pub statistic: f64,
    pub p_value: f64,
    pub is_biased: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsecutivePairs {
    pub consecutive_rate: f64,
    pub pair_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NumberStatistics {
    pub avg_sum: f64,
    pub avg_median: f64,
    pub avg_variance: f64,
    pub sum_std: f64,
    pub median_std: f64,
    pub variance_std: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimeSquare {
    pub prime_ratio: f64,
    pub square_ratio: f64,
}

/// Toutes les features calculées sur un instantané de l'historique.
/// Les vecteurs par numéro sont indexés par `numéro - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub draw_count: usize,
    pub recent_window: usize,
    pub total_appearances: Vec<u32>,
    pub recent_appearances: Vec<u32>,
    pub missing_intervals: Vec<u32>,
    pub hot_cold: Vec<Temperature>,
    pub periodicity: Vec<Periodicity>,
    pub regression_trend: Vec<Trend>,
    pub moving_average: Vec<MovingAverage>,
    pub attraction_effect: Vec<Attraction>,
    pub distribution: [f64; 5],
    pub adjacent_correlation: AdjacentCorrelation,
    pub repeat_patterns: RepeatPatterns,
    pub combination_frequency: Vec<PairFrequency>,
    pub chi_square: ChiSquare,
    pub consecutive_pairs: ConsecutivePairs,
    pub odd_even_ratio: f64,
    pub number_statistics: NumberStatistics,
    pub prime_square: PrimeSquare,
}

pub(crate) fn slot(number: u8) -> usize {
    debug_assert!((1..=POOL_SIZE).contains(&number));
    (number - 1) as usize
}

impl FeatureSet {
    /// Calcule le catalogue complet. `history[0]` = le tirage le plus ancien.
    pub fn extract(history: &[Draw], config: &TotoConfig) -> Self {
        compute::extract_all(history, config)
    }

    /// Fréquence théorique d'apparition d'un numéro sur l'historique.
    pub fn expected_appearances(&self) -> f64 {
        self.draw_count as f64 * toto_db::models::PICK_COUNT as f64 / POOL_SIZE as f64
    }

    /// Valeur numérique d'une feature pondérée pour un numéro, utilisée pour
    /// mesurer l'efficacité. `None` pour les agrégats.
    pub fn projection(&self, id: FeatureId, number: u8) -> Option<f64> {
        let i = slot(number);
        let value = match id {
            FeatureId::TotalAppearances => self.total_appearances[i] as f64,
            FeatureId::RecentAppearances => self.recent_appearances[i] as f64,
            FeatureId::MissingIntervals => self.missing_intervals[i] as f64,
            FeatureId::HotCold => match self.hot_cold[i] {
                Temperature::Hot => 1.0,
                Temperature::Neutral => 0.5,
                Temperature::Cold => 0.0,
            },
            FeatureId::Periodicity => {
                let p = self.periodicity[i];
                if p.has_period() { p.avg_interval } else { self.draw_count as f64 }
            }
            FeatureId::RegressionTrend => self.regression_trend[i].slope,
            FeatureId::MovingAverage => self.moving_average[i].current,
            FeatureId::AttractionEffect => self.attraction_effect[i].strength as f64,
            FeatureId::Distribution => self.distribution[compute::bin_of(number)],
            FeatureId::AdjacentCorrelation => self.adjacent_correlation.latest_neighbours[i] as f64,
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_names_roundtrip() {
        for id in FeatureId::ALL {
            assert_eq!(id.name().parse::<FeatureId>().unwrap(), id);
        }
        assert!("lstm_magic".parse::<FeatureId>().is_err());
    }

    #[test]
    fn test_weighted_defaults_sum_to_one() {
        let sum: f64 = FeatureId::WEIGHTED.iter().filter_map(|id| id.default_weight()).sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum = {}", sum);
        assert_eq!(FeatureId::ALL.iter().filter(|id| id.is_weighted()).count(), 10);
    }

    #[test]
    fn test_serde_name_matches_display() {
        let json = serde_json::to_string(&FeatureId::AdjacentCorrelation).unwrap();
        assert_eq!(json, "\"adjacent_correlation\"");
    }

    #[test]
    fn test_projection_only_for_weighted() {
        let features = FeatureSet::extract(&[], &TotoConfig::default());
        for id in FeatureId::ALL {
            assert_eq!(features.projection(id, 1).is_some(), id.is_weighted(), "{}", id);
        }
    }

    #[test]
    fn test_shapes() {
        assert_eq!(FeatureId::MissingIntervals.shape(), FeatureShape::PerNumber);
        assert_eq!(FeatureId::Distribution.shape(), FeatureShape::Aggregate);
        assert_eq!(FeatureId::ChiSquare.shape(), FeatureShape::Aggregate);
    }
}
