use toto_db::models::{PICK_COUNT, POOL_SIZE};

use crate::features::compute::{bin_of, is_perfect_square, is_prime};
use crate::features::{slot, FeatureId, FeatureSet, Temperature, TrendDirection};
use crate::weights::WeightVector;

/// Somme « idéale » d'une combinaison de 6 numéros parmi 49.
const TARGET_SUM: f64 = 147.0;

/// Score par numéro : Σ poids(f) × sous-score_f(n) sur les features pondérées.
pub struct Scorer<'a> {
    features: &'a FeatureSet,
    weights: &'a WeightVector,
}

impl<'a> Scorer<'a> {
    pub fn new(features: &'a FeatureSet, weights: &'a WeightVector) -> Self {
        Self { features, weights }
    }

    pub fn features(&self) -> &FeatureSet {
        self.features
    }

    /// Sous-score dans [0, 1] d'une feature pondérée pour un numéro ; 0 pour un agrégat.
    pub fn sub_score(&self, id: FeatureId, number: u8) -> f64 {
        let f = self.features;
        let i = slot(number);
        let expected = f.expected_appearances();

        match id {
            FeatureId::TotalAppearances => {
                if expected <= 0.0 {
                    0.0
                } else {
                    let total = f.total_appearances[i] as f64;
                    (1.0 - (total - expected).abs() / expected).clamp(0.0, 1.0)
                }
            }
            FeatureId::RecentAppearances => (f.recent_appearances[i] as f64 / 3.0).min(1.0),
            FeatureId::MissingIntervals => {
                let missing = f.missing_intervals[i] as f64;
                if expected > 0.0 && missing > 1.5 * expected {
                    (missing / (2.0 * expected)).min(1.0)
                } else {
                    0.3
                }
            }
            FeatureId::HotCold => match f.hot_cold[i] {
                Temperature::Hot => 0.7,
                Temperature::Cold => 0.8,
                Temperature::Neutral => 0.5,
            },
            FeatureId::Periodicity => {
                let p = f.periodicity[i];
                if !p.has_period() {
                    0.5
                } else if (f.missing_intervals[i] as f64 - p.avg_interval).abs() <= p.std_interval {
                    0.9
                } else {
                    0.3
                }
            }
            FeatureId::RegressionTrend => {
                let t = f.regression_trend[i];
                if t.r_squared > 0.3 {
                    if t.slope > 0.0 { 0.8 } else { 0.6 }
                } else {
                    0.5
                }
            }
            FeatureId::MovingAverage => match f.moving_average[i].direction {
                TrendDirection::Up => 0.7,
                TrendDirection::Down => 0.8,
                TrendDirection::Stable => 0.5,
            },
            FeatureId::AttractionEffect => {
                if f.attraction_effect[i].strength > 2 { 0.8 } else { 0.5 }
            }
            FeatureId::Distribution => {
                let rate = f.distribution[bin_of(number)];
                if rate < 0.15 {
                    0.8
                } else if rate > 0.25 {
                    0.3
                } else {
                    0.5
                }
            }
            FeatureId::AdjacentCorrelation => {
                let adj = &f.adjacent_correlation;
                if adj.diff_1 > 0.1 || adj.diff_2 > 0.1 { 0.6 } else { 0.5 }
            }
            _ => 0.0,
        }
    }

    pub fn number_score(&self, number: u8) -> f64 {
        FeatureId::WEIGHTED
            .iter()
            .map(|&id| self.weights.get(id) * self.sub_score(id, number))
            .sum()
    }

    /// Scores des numéros 1..=49, indexés par `numéro - 1`.
    pub fn number_scores(&self) -> Vec<f64> {
        (1..=POOL_SIZE).map(|n| self.number_score(n)).collect()
    }

    /// Contribution pondérée de chaque feature au score d'un numéro.
    pub fn breakdown(&self, number: u8) -> Vec<(FeatureId, f64)> {
        FeatureId::WEIGHTED
            .iter()
            .map(|&id| (id, self.weights.get(id) * self.sub_score(id, number)))
            .collect()
    }

    /// Étiquettes courtes expliquant pourquoi un numéro est retenu.
    pub fn reasons(&self, number: u8) -> Vec<&'static str> {
        let f = self.features;
        let i = slot(number);
        let expected = f.expected_appearances();
        let total = f.total_appearances[i] as f64;
        let mut reasons = Vec::new();

        if total > expected {
            reasons.push("fréquent");
        } else if total < expected * 0.8 {
            reasons.push("rare");
        }

        if f.recent_appearances[i] >= 2 {
            reasons.push("récent");
        } else if f.missing_intervals[i] as f64 > f.draw_count as f64 * 0.3 {
            reasons.push("longue absence");
        }

        match f.hot_cold[i] {
            Temperature::Hot => reasons.push("chaud"),
            Temperature::Cold => reasons.push("froid"),
            Temperature::Neutral => {}
        }
        reasons
    }
}

/// Score structurel d'une combinaison triée, indépendant de l'historique.
pub fn combination_score(numbers: &[u8; PICK_COUNT]) -> f64 {
    let sum: f64 = numbers.iter().map(|&n| n as f64).sum();
    let sum_score = 1.0 - (sum - TARGET_SUM).abs() / TARGET_SUM;

    let odd = numbers.iter().filter(|&&n| n % 2 == 1).count() as f64;
    let even = PICK_COUNT as f64 - odd;
    let parity_score = 1.0 - (odd - even).abs() / 6.0;

    let mut bins = [0usize; 5];
    for &n in numbers {
        bins[bin_of(n)] += 1;
    }
    let bin_score = bins
        .iter()
        .map(|&c| match c {
            0 => 0.3,
            1 | 2 => 1.0,
            _ => 0.5,
        })
        .sum::<f64>()
        / bins.len() as f64;

    let mut sorted = *numbers;
    sorted.sort_unstable();
    let runs = sorted.windows(2).filter(|w| w[1] == w[0] + 1).count() as f64;
    let run_score = 1.0 - runs / 3.0;

    let primes = numbers.iter().filter(|&&n| is_prime(n)).count() as f64;
    let prime_score = 1.0 - (primes - 2.0).abs() / 6.0;

    let squares = numbers.iter().filter(|&&n| is_perfect_square(n)).count() as f64;
    let square_score = 1.0 - (squares - 1.0).abs() / 6.0;

    let score = 0.2 * sum_score
        + 0.15 * parity_score
        + 0.15 * bin_score
        + 0.1 * run_score
        + 0.1 * prime_score
        + 0.1 * square_score;
    score.clamp(0.0, 1.0)
}

/// Confiance en pourcentage : 60 % moyenne des scores par numéro, 40 % score de combinaison.
pub fn confidence(number_scores: &[f64], numbers: &[u8; PICK_COUNT], combination: f64) -> f64 {
    let mean = numbers.iter().map(|&n| number_scores[slot(n)]).sum::<f64>() / PICK_COUNT as f64;
    (100.0 * (0.6 * mean + 0.4 * combination)).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TotoConfig;
    use crate::make_test_draws;

    #[test]
    fn test_scores_in_unit_interval() {
        let features = FeatureSet::extract(&make_test_draws(80), &TotoConfig::default());
        let weights = WeightVector::default();
        let scorer = Scorer::new(&features, &weights);
        for (i, s) in scorer.number_scores().iter().enumerate() {
            assert!((0.0..=1.0).contains(s), "numéro {} : {}", i + 1, s);
        }
    }

    #[test]
    fn test_empty_history_scores() {
        let features = FeatureSet::extract(&[], &TotoConfig::default());
        let weights = WeightVector::default();
        let scorer = Scorer::new(&features, &weights);
        assert_eq!(scorer.sub_score(FeatureId::TotalAppearances, 1), 0.0);
        assert_eq!(scorer.sub_score(FeatureId::MissingIntervals, 1), 0.3);
        assert_eq!(scorer.sub_score(FeatureId::Periodicity, 1), 0.5);
        // taux 0.2 par intervalle
        assert_eq!(scorer.sub_score(FeatureId::Distribution, 1), 0.5);
        let s = scorer.number_score(1);
        assert!(s.is_finite() && (0.0..=1.0).contains(&s));
    }

    #[test]
    fn test_aggregates_do_not_score() {
        let features = FeatureSet::extract(&make_test_draws(30), &TotoConfig::default());
        let weights = WeightVector::default();
        let scorer = Scorer::new(&features, &weights);
        assert_eq!(scorer.sub_score(FeatureId::ChiSquare, 5), 0.0);
        assert_eq!(scorer.breakdown(5).len(), 10);
        let total: f64 = scorer.breakdown(5).iter().map(|(_, c)| c).sum();
        assert!((total - scorer.number_score(5)).abs() < 1e-12);
    }

    #[test]
    fn test_recent_sub_score_caps_at_one() {
        let history: Vec<_> = make_test_draws(1)
            .into_iter()
            .cycle()
            .take(5)
            .enumerate()
            .map(|(i, mut d)| {
                d.index = i as u32;
                d.date = format!("2024-01-{:02}", i + 1);
                d
            })
            .collect();
        let features = FeatureSet::extract(&history, &TotoConfig::default());
        let weights = WeightVector::default();
        let scorer = Scorer::new(&features, &weights);
        let n = history[0].numbers[0];
        assert_eq!(scorer.sub_score(FeatureId::RecentAppearances, n), 1.0);
        assert!(scorer.reasons(n).contains(&"récent"));
        assert!(scorer.reasons(n).contains(&"fréquent"));
    }

    #[test]
    fn test_combination_score_balanced() {
        let balanced = [4, 13, 22, 31, 36, 41];
        let lopsided = [1, 2, 3, 4, 5, 6];
        let a = combination_score(&balanced);
        let b = combination_score(&lopsided);
        assert!(a > b, "{} <= {}", a, b);
        assert!(a <= 0.8 + 1e-12);
        assert!((0.0..=1.0).contains(&b));
    }

    #[test]
    fn test_combination_score_exact() {
        // somme 147, 3 pairs / 3 impairs, intervalles [1,1,1,2,1], aucune suite,
        // premiers {13, 31, 41}, carrés {4, 36}
        let numbers = [4, 13, 22, 31, 36, 41];
        let expected = 0.2 + 0.15 + 0.15 + 0.1 + 0.1 * (5.0 / 6.0) + 0.1 * (5.0 / 6.0);
        assert!((combination_score(&numbers) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_monotonic_and_bounded() {
        let scores = vec![0.5; 49];
        let numbers = [1, 2, 3, 4, 5, 6];
        let low = confidence(&scores, &numbers, 0.2);
        let high = confidence(&scores, &numbers, 0.7);
        assert!(high > low);
        assert!((confidence(&scores, &numbers, 0.5) - 50.0).abs() < 1e-9);
        assert!(confidence(&[1.0; 49], &numbers, 1.0) <= 100.0);
    }
}
