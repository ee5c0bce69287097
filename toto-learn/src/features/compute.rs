use std::collections::HashMap;

use statrs::distribution::{ChiSquared, ContinuousCDF, StudentsT};
use toto_db::models::{Draw, PICK_COUNT, POOL_SIZE};

use super::{
    AdjacentCorrelation, Attraction, ChiSquare, ConsecutivePairs, FeatureSet, MovingAverage,
    NumberStatistics, PairFrequency, Periodicity, PrimeSquare, RepeatPatterns, Temperature, Trend,
    TrendDirection, slot,
};
use crate::config::TotoConfig;

const SIZE: usize = POOL_SIZE as usize;
const BIN_COUNT: usize = 5;
const TOP_PAIRS: usize = 10;
/// Nombre minimal d'apparitions pour ajuster une tendance.
const MIN_TREND_POINTS: usize = 6;

/// Calcule toutes les features. Aucune ne panique sur un historique vide ou court.
/// history[0] = le plus ancien.
pub fn extract_all(history: &[Draw], config: &TotoConfig) -> FeatureSet {
    let total = total_appearances(history);
    let recent = recent_appearances(history, config.recent_window);
    let effective_window = config.recent_window.min(history.len());
    let hot_cold = hot_cold(&total, &recent, history.len(), effective_window, config.hot_cold_threshold);

    FeatureSet {
        draw_count: history.len(),
        recent_window: effective_window,
        missing_intervals: missing_intervals(history),
        periodicity: periodicity(history),
        regression_trend: regression_trend(history),
        moving_average: moving_average(history, config.moving_average_window),
        attraction_effect: attraction_effect(history),
        distribution: distribution(history),
        adjacent_correlation: adjacent_correlation(history),
        repeat_patterns: repeat_patterns(history),
        combination_frequency: combination_frequency(history),
        chi_square: chi_square(&total),
        consecutive_pairs: consecutive_pairs(history),
        odd_even_ratio: odd_even_ratio(history),
        number_statistics: number_statistics(history),
        prime_square: prime_square(history),
        total_appearances: total,
        recent_appearances: recent,
        hot_cold,
    }
}

/// Intervalle 0..=4 : 1-10, 11-20, 21-30, 31-40, 41-49.
pub fn bin_of(number: u8) -> usize {
    (((number.max(1) - 1) / 10) as usize).min(BIN_COUNT - 1)
}

pub fn is_prime(n: u8) -> bool {
    if n < 2 {
        return false;
    }
    let mut d = 2u8;
    while (d as u16) * (d as u16) <= n as u16 {
        if n % d == 0 {
            return false;
        }
        d += 1;
    }
    true
}

pub fn is_perfect_square(n: u8) -> bool {
    let root = (n as f64).sqrt() as u8;
    root as u16 * root as u16 == n as u16
}

fn count_in(draws: &[Draw]) -> Vec<u32> {
    let mut counts = vec![0u32; SIZE];
    for draw in draws {
        for &n in &draw.numbers {
            counts[slot(n)] += 1;
        }
    }
    counts
}

pub fn total_appearances(history: &[Draw]) -> Vec<u32> {
    count_in(history)
}

pub fn recent_appearances(history: &[Draw], window: usize) -> Vec<u32> {
    let start = history.len().saturating_sub(window);
    count_in(&history[start..])
}

/// Tirages écoulés depuis la dernière apparition ; la longueur de l'historique si jamais vu.
pub fn missing_intervals(history: &[Draw]) -> Vec<u32> {
    let len = history.len();
    (1..=POOL_SIZE)
        .map(|number| {
            history
                .iter()
                .rposition(|d| d.contains(number))
                .map_or(len, |last| len - 1 - last) as u32
        })
        .collect()
}

pub fn hot_cold(
    total: &[u32],
    recent: &[u32],
    draw_count: usize,
    window: usize,
    threshold: f64,
) -> Vec<Temperature> {
    if draw_count == 0 || window == 0 {
        return vec![Temperature::Neutral; SIZE];
    }
    total
        .iter()
        .zip(recent)
        .map(|(&t, &r)| {
            let total_freq = t as f64 / draw_count as f64;
            let recent_freq = r as f64 / window as f64;
            if recent_freq > total_freq * threshold {
                Temperature::Hot
            } else if recent_freq < total_freq * (1.0 - threshold) {
                Temperature::Cold
            } else {
                Temperature::Neutral
            }
        })
        .collect()
}

fn appearance_indices(history: &[Draw], number: u8) -> Vec<usize> {
    history
        .iter()
        .enumerate()
        .filter(|(_, d)| d.contains(number))
        .map(|(i, _)| i)
        .collect()
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

pub fn periodicity(history: &[Draw]) -> Vec<Periodicity> {
    (1..=POOL_SIZE)
        .map(|number| {
            let appearances = appearance_indices(history, number);
            let last_appearance = appearances.last().copied();
            if appearances.len() > 1 {
                let gaps: Vec<f64> = appearances.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
                let (avg, std) = mean_std(&gaps);
                Periodicity { avg_interval: avg, std_interval: std, last_appearance }
            } else {
                Periodicity { avg_interval: f64::INFINITY, std_interval: 0.0, last_appearance }
            }
        })
        .collect()
}

/// Régression linéaire du rang d'apparition (0, 1, 2, ...) sur l'index du tirage.
pub fn regression_trend(history: &[Draw]) -> Vec<Trend> {
    (1..=POOL_SIZE)
        .map(|number| {
            let appearances = appearance_indices(history, number);
            if appearances.len() < MIN_TREND_POINTS {
                return Trend::default();
            }
            let x: Vec<f64> = appearances.iter().map(|&i| i as f64).collect();
            let y: Vec<f64> = (0..appearances.len()).map(|i| i as f64).collect();
            linear_regression(&x, &y)
        })
        .collect()
}

fn linear_regression(x: &[f64], y: &[f64]) -> Trend {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let sxx: f64 = x.iter().map(|xi| (xi - mean_x).powi(2)).sum();
    let syy: f64 = y.iter().map(|yi| (yi - mean_y).powi(2)).sum();
    let sxy: f64 = x.iter().zip(y).map(|(xi, yi)| (xi - mean_x) * (yi - mean_y)).sum();

    if sxx.abs() < 1e-15 || syy.abs() < 1e-15 {
        return Trend::default();
    }

    let slope = sxy / sxx;
    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let r_squared = r * r;

    let df = n - 2.0;
    let p_value = if r_squared >= 1.0 - 1e-12 {
        0.0
    } else {
        let t = r * (df / (1.0 - r_squared)).sqrt();
        match StudentsT::new(0.0, 1.0, df) {
            Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
            Err(_) => 1.0,
        }
    };

    Trend { slope, r_squared, p_value }
}

/// Moyenne mobile de la série 0/1 d'apparition : valeur courante et sens par
/// rapport à la moyenne `window` tirages plus tôt.
pub fn moving_average(history: &[Draw], window: usize) -> Vec<MovingAverage> {
    let len = history.len();
    (1..=POOL_SIZE)
        .map(|number| {
            if window == 0 || len < window {
                return MovingAverage { current: 0.0, direction: TrendDirection::Stable };
            }
            let series: Vec<f64> = history
                .iter()
                .map(|d| if d.contains(number) { 1.0 } else { 0.0 })
                .collect();
            let rolling_at = |end: usize| -> Option<f64> {
                if end + 1 < window {
                    return None;
                }
                let slice = &series[end + 1 - window..=end];
                Some(slice.iter().sum::<f64>() / window as f64)
            };
            let current = rolling_at(len - 1).unwrap_or(0.0);
            let direction = match rolling_at(len - window) {
                Some(earlier) if current > earlier => TrendDirection::Up,
                _ => TrendDirection::Down,
            };
            MovingAverage { current, direction }
        })
        .collect()
}

/// Pour chaque numéro, le numéro qui le suit le plus souvent au tirage suivant.
/// Égalité : le plus petit numéro l'emporte.
pub fn attraction_effect(history: &[Draw]) -> Vec<Attraction> {
    let mut counts = vec![[0u32; SIZE]; SIZE];
    for pair in history.windows(2) {
        for &prev in &pair[0].numbers {
            for &next in &pair[1].numbers {
                counts[slot(prev)][slot(next)] += 1;
            }
        }
    }

    counts
        .iter()
        .map(|row| {
            let mut best: Option<(usize, u32)> = None;
            for (j, &c) in row.iter().enumerate() {
                if c > 0 && best.map_or(true, |(_, b)| c > b) {
                    best = Some((j, c));
                }
            }
            match best {
                Some((j, c)) => Attraction { most_attracted: Some((j + 1) as u8), strength: c },
                None => Attraction { most_attracted: None, strength: 0 },
            }
        })
        .collect()
}

/// Part des numéros tirés dans chaque intervalle ; uniforme (0.2) sans historique.
pub fn distribution(history: &[Draw]) -> [f64; BIN_COUNT] {
    if history.is_empty() {
        return [1.0 / BIN_COUNT as f64; BIN_COUNT];
    }
    let mut bins = [0u32; BIN_COUNT];
    for draw in history {
        for &n in &draw.numbers {
            bins[bin_of(n)] += 1;
        }
    }
    let total = (history.len() * PICK_COUNT) as f64;
    bins.map(|c| c as f64 / total)
}

pub fn adjacent_correlation(history: &[Draw]) -> AdjacentCorrelation {
    let mut diff_counts = [0u32; 3];
    let mut opportunities = 0u32;

    for pair in history.windows(2) {
        for &prev in &pair[0].numbers {
            for &curr in &pair[1].numbers {
                let diff = prev.abs_diff(curr) as usize;
                if (1..=2).contains(&diff) {
                    diff_counts[diff] += 1;
                }
                opportunities += 1;
            }
        }
    }

    let rate = |c: u32| if opportunities > 0 { c as f64 / opportunities as f64 } else { 0.0 };

    let latest_neighbours = match history.last() {
        Some(latest) => (1..=POOL_SIZE)
            .map(|n| {
                latest
                    .numbers
                    .iter()
                    .filter(|&&m| (1..=2).contains(&m.abs_diff(n)))
                    .count() as u32
            })
            .collect(),
        None => vec![0; SIZE],
    };

    AdjacentCorrelation {
        diff_1: rate(diff_counts[1]),
        diff_2: rate(diff_counts[2]),
        latest_neighbours,
    }
}

fn overlap(a: &Draw, b: &Draw) -> usize {
    a.numbers.iter().filter(|&&n| b.contains(n)).count()
}

pub fn repeat_patterns(history: &[Draw]) -> RepeatPatterns {
    let mut distribution = [0u32; PICK_COUNT + 1];
    let mut total = 0usize;
    let mut transitions = 0usize;

    for pair in history.windows(2) {
        let repeats = overlap(&pair[0], &pair[1]);
        distribution[repeats] += 1;
        total += repeats;
        transitions += 1;
    }

    let avg_repeats = if transitions > 0 { total as f64 / transitions as f64 } else { 0.0 };
    RepeatPatterns { avg_repeats, distribution }
}

/// Les 10 paires les plus fréquentes, fréquence = apparitions / nombre de tirages.
pub fn combination_frequency(history: &[Draw]) -> Vec<PairFrequency> {
    if history.is_empty() {
        return Vec::new();
    }
    let mut counts: HashMap<(u8, u8), u32> = HashMap::new();
    for draw in history {
        for i in 0..PICK_COUNT {
            for j in (i + 1)..PICK_COUNT {
                *counts.entry((draw.numbers[i], draw.numbers[j])).or_insert(0) += 1;
            }
        }
    }

    let mut sorted: Vec<((u8, u8), u32)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let n = history.len() as f64;
    sorted
        .into_iter()
        .take(TOP_PAIRS)
        .map(|(pair, count)| PairFrequency { pair, frequency: count as f64 / n })
        .collect()
}

/// Test du χ² des fréquences observées contre la loi uniforme (ddl = 48).
pub fn chi_square(total: &[u32]) -> ChiSquare {
    let drawn: u32 = total.iter().sum();
    if drawn == 0 {
        return ChiSquare { statistic: 0.0, p_value: 1.0, is_biased: false };
    }
    let expected = drawn as f64 / total.len() as f64;
    let statistic: f64 = total
        .iter()
        .map(|&o| (o as f64 - expected).powi(2) / expected)
        .sum();

    let p_value = match ChiSquared::new((total.len() - 1) as f64) {
        Ok(dist) => (1.0 - dist.cdf(statistic)).clamp(0.0, 1.0),
        Err(_) => 1.0,
    };

    ChiSquare { statistic, p_value, is_biased: p_value < 0.05 }
}

pub fn consecutive_pairs(history: &[Draw]) -> ConsecutivePairs {
    if history.is_empty() {
        return ConsecutivePairs { consecutive_rate: 0.0, pair_rate: 0.0 };
    }
    let mut consecutive = 0usize;
    let mut close_pairs = 0usize;
    for draw in history {
        consecutive += draw.numbers.windows(2).filter(|w| w[1] - w[0] == 1).count();
        for i in 0..PICK_COUNT {
            for j in (i + 1)..PICK_COUNT {
                if draw.numbers[i].abs_diff(draw.numbers[j]) <= 2 {
                    close_pairs += 1;
                }
            }
        }
    }
    let n = history.len() as f64;
    // C(6, 2) = 15 paires par tirage
    ConsecutivePairs {
        consecutive_rate: consecutive as f64 / n,
        pair_rate: close_pairs as f64 / (n * 15.0),
    }
}

fn ratio_of(history: &[Draw], predicate: impl Fn(u8) -> bool) -> f64 {
    let total = history.len() * PICK_COUNT;
    if total == 0 {
        return 0.0;
    }
    let matching = history
        .iter()
        .flat_map(|d| d.numbers.iter())
        .filter(|&&n| predicate(n))
        .count();
    matching as f64 / total as f64
}

pub fn odd_even_ratio(history: &[Draw]) -> f64 {
    ratio_of(history, |n| n % 2 == 1)
}

pub fn number_statistics(history: &[Draw]) -> NumberStatistics {
    if history.is_empty() {
        return NumberStatistics::default();
    }
    let mut sums = Vec::with_capacity(history.len());
    let mut medians = Vec::with_capacity(history.len());
    let mut variances = Vec::with_capacity(history.len());

    for draw in history {
        let values: Vec<f64> = draw.numbers.iter().map(|&n| n as f64).collect();
        let (mean, std) = mean_std(&values);
        sums.push(mean * PICK_COUNT as f64);
        // numbers est trié : médiane de 6 valeurs
        medians.push((values[2] + values[3]) / 2.0);
        variances.push(std * std);
    }

    let (avg_sum, sum_std) = mean_std(&sums);
    let (avg_median, median_std) = mean_std(&medians);
    let (avg_variance, variance_std) = mean_std(&variances);

    NumberStatistics { avg_sum, avg_median, avg_variance, sum_std, median_std, variance_std }
}

pub fn prime_square(history: &[Draw]) -> PrimeSquare {
    PrimeSquare {
        prime_ratio: ratio_of(history, is_prime),
        square_ratio: ratio_of(history, is_perfect_square),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_test_draws;

    fn draws_from(rows: &[[u8; 6]]) -> Vec<Draw> {
        rows.iter()
            .enumerate()
            .map(|(i, nums)| Draw::new(i as u32, format!("2024-01-{:02}", i + 1), nums).unwrap())
            .collect()
    }

    /// 7 dans chaque tirage, les autres numéros tournent sur 5 blocs disjoints.
    fn seven_everywhere(n: usize) -> Vec<Draw> {
        (0..n)
            .map(|i| {
                let base = 10 + (i % 5) as u8 * 6;
                let nums = [7, base, base + 1, base + 2, base + 3, base + 4];
                Draw::new(i as u32, format!("2024-{:02}-{:02}", i / 28 + 1, i % 28 + 1), &nums).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_number_seven_every_draw() {
        let history = seven_everywhere(30);
        let features = extract_all(&history, &TotoConfig::default());
        assert_eq!(features.total_appearances[slot(7)], 30);
        assert_eq!(features.missing_intervals[slot(7)], 0);
        // Numéros jamais tirés
        for n in [1u8, 2, 3, 4, 5, 6, 8, 9, 40, 49] {
            assert_eq!(features.total_appearances[slot(n)], 0, "numéro {}", n);
            assert_eq!(features.missing_intervals[slot(n)], 30, "numéro {}", n);
        }
        // 10..=14 : 6 tirages sur 30
        assert_eq!(features.total_appearances[slot(10)], 6);
        let total: u32 = features.total_appearances.iter().sum();
        assert_eq!(total, 30 * 6);
    }

    #[test]
    fn test_empty_history_defaults() {
        let features = extract_all(&[], &TotoConfig::default());
        assert_eq!(features.draw_count, 0);
        assert_eq!(features.total_appearances.len(), 49);
        assert!(features.missing_intervals.iter().all(|&m| m == 0));
        assert!(features.hot_cold.iter().all(|&t| t == Temperature::Neutral));
        assert!(features.periodicity.iter().all(|p| !p.has_period() && p.last_appearance.is_none()));
        assert!(features.moving_average.iter().all(|m| m.direction == TrendDirection::Stable));
        assert_eq!(features.distribution, [0.2; 5]);
        assert_eq!(features.adjacent_correlation.diff_1, 0.0);
        assert!(features.combination_frequency.is_empty());
        assert_eq!(features.chi_square.p_value, 1.0);
        assert_eq!(features.odd_even_ratio, 0.0);
    }

    #[test]
    fn test_single_draw_history() {
        let history = draws_from(&[[1, 2, 3, 4, 5, 6]]);
        let features = extract_all(&history, &TotoConfig::default());
        assert_eq!(features.missing_intervals[slot(1)], 0);
        assert_eq!(features.missing_intervals[slot(7)], 1);
        assert_eq!(features.periodicity[slot(1)].last_appearance, Some(0));
        assert!(features.periodicity[slot(1)].avg_interval.is_infinite());
        assert_eq!(features.repeat_patterns.avg_repeats, 0.0);
    }

    #[test]
    fn test_recent_window_counts_last_draws_only() {
        let mut rows = vec![[1, 2, 3, 4, 5, 6]; 5];
        rows.extend(vec![[10, 11, 12, 13, 14, 15]; 3]);
        let history = draws_from(&rows);
        let recent = recent_appearances(&history, 3);
        assert_eq!(recent[slot(1)], 0);
        assert_eq!(recent[slot(10)], 3);
        let recent_all = recent_appearances(&history, 50);
        assert_eq!(recent_all[slot(1)], 5);
    }

    #[test]
    fn test_missing_intervals_uses_latest_appearance() {
        let history = draws_from(&[
            [1, 2, 3, 4, 5, 6],
            [7, 8, 9, 10, 11, 12],
            [1, 20, 21, 22, 23, 24],
            [30, 31, 32, 33, 34, 35],
        ]);
        let missing = missing_intervals(&history);
        assert_eq!(missing[slot(1)], 1);
        assert_eq!(missing[slot(2)], 3);
        assert_eq!(missing[slot(30)], 0);
        assert_eq!(missing[slot(49)], 4);
    }

    #[test]
    fn test_hot_cold_classification() {
        // total_freq 0.5, recent_freq 1.0 => hot ; total_freq 0.5, recent 0 => cold
        let total = {
            let mut t = vec![0u32; 49];
            t[0] = 10;
            t[1] = 10;
            t
        };
        let recent = {
            let mut r = vec![0u32; 49];
            r[0] = 10;
            r
        };
        let classes = hot_cold(&total, &recent, 20, 10, 0.7);
        assert_eq!(classes[0], Temperature::Hot);
        assert_eq!(classes[1], Temperature::Cold);
        assert_eq!(classes[2], Temperature::Neutral);
    }

    #[test]
    fn test_periodicity_regular_gaps() {
        let rows: Vec<[u8; 6]> = (0..9)
            .map(|i| if i % 3 == 0 { [1, 2, 3, 4, 5, 6] } else { [10, 11, 12, 13, 14, 15] })
            .collect();
        let history = draws_from(&rows);
        let p = periodicity(&history)[slot(1)];
        assert!((p.avg_interval - 3.0).abs() < 1e-12);
        assert!(p.std_interval.abs() < 1e-12);
        assert_eq!(p.last_appearance, Some(6));
    }

    #[test]
    fn test_regression_trend_requires_six_points() {
        let history = make_test_draws(20);
        let trends = regression_trend(&history);
        // make_test_draws : le numéro 1 n'apparaît que 3 fois sur 20 tirages
        assert_eq!(trends[slot(1)], Trend::default());

        let regular = draws_from(&vec![[1, 2, 3, 4, 5, 6]; 8]);
        let t = regression_trend(&regular)[slot(1)];
        assert!((t.slope - 1.0).abs() < 1e-12);
        assert!((t.r_squared - 1.0).abs() < 1e-12);
        assert_eq!(t.p_value, 0.0);
    }

    #[test]
    fn test_moving_average_direction() {
        // Le numéro 1 absent au début, présent sur les 5 derniers tirages
        let mut rows = vec![[10, 11, 12, 13, 14, 15]; 5];
        rows.extend(vec![[1, 2, 3, 4, 5, 6]; 5]);
        let history = draws_from(&rows);
        let ma = moving_average(&history, 5);
        assert_eq!(ma[slot(1)].current, 1.0);
        assert_eq!(ma[slot(1)].direction, TrendDirection::Up);
        assert_eq!(ma[slot(10)].current, 0.0);
        assert_eq!(ma[slot(10)].direction, TrendDirection::Down);

        let short = moving_average(&history[..3], 5);
        assert!(short.iter().all(|m| m.direction == TrendDirection::Stable));
    }

    #[test]
    fn test_attraction_effect() {
        let history = draws_from(&[
            [1, 2, 3, 4, 5, 6],
            [7, 8, 9, 10, 11, 12],
            [1, 20, 21, 22, 23, 24],
            [7, 30, 31, 32, 33, 34],
        ]);
        let attraction = attraction_effect(&history);
        assert_eq!(attraction[slot(1)], Attraction { most_attracted: Some(7), strength: 2 });
        assert_eq!(attraction[slot(34)], Attraction { most_attracted: None, strength: 0 });
    }

    #[test]
    fn test_distribution_sums_to_one() {
        let history = make_test_draws(30);
        let dist = distribution(&history);
        assert!((dist.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(bin_of(1), 0);
        assert_eq!(bin_of(10), 0);
        assert_eq!(bin_of(11), 1);
        assert_eq!(bin_of(41), 4);
        assert_eq!(bin_of(49), 4);
    }

    #[test]
    fn test_adjacent_correlation() {
        let history = draws_from(&[[1, 10, 20, 30, 40, 49], [2, 12, 25, 35, 44, 48]]);
        let adj = adjacent_correlation(&history);
        // diff 1 : (1,2) (49,48) ; diff 2 : (10,12)
        assert!((adj.diff_1 - 2.0 / 36.0).abs() < 1e-12);
        assert!((adj.diff_2 - 1.0 / 36.0).abs() < 1e-12);
        // 46 est à distance 2 de 44 et de 48
        assert_eq!(adj.latest_neighbours[slot(46)], 2);
        assert_eq!(adj.latest_neighbours[slot(2)], 0);
    }

    #[test]
    fn test_repeat_patterns() {
        let history = draws_from(&[
            [1, 2, 3, 4, 5, 6],
            [1, 2, 3, 10, 11, 12],
            [20, 21, 22, 23, 24, 25],
        ]);
        let repeats = repeat_patterns(&history);
        assert!((repeats.avg_repeats - 1.5).abs() < 1e-12);
        assert_eq!(repeats.distribution[3], 1);
        assert_eq!(repeats.distribution[0], 1);
    }

    #[test]
    fn test_combination_frequency_top_pair() {
        let history = draws_from(&[
            [1, 2, 3, 4, 5, 6],
            [1, 2, 13, 14, 15, 16],
            [20, 21, 22, 23, 24, 25],
        ]);
        let top = combination_frequency(&history);
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].pair, (1, 2));
        assert!((top[0].frequency - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_chi_square_uniform_vs_biased() {
        let uniform = chi_square(&vec![10u32; 49]);
        assert!(uniform.statistic.abs() < 1e-12);
        assert!((uniform.p_value - 1.0).abs() < 1e-9);
        assert!(!uniform.is_biased);

        let mut skewed = vec![0u32; 49];
        skewed[0] = 300;
        let biased = chi_square(&skewed);
        assert!(biased.is_biased);
        assert!(biased.p_value < 0.05);
    }

    #[test]
    fn test_aggregate_ratios() {
        let history = draws_from(&[[1, 2, 3, 4, 9, 11]]);
        assert!((odd_even_ratio(&history) - 4.0 / 6.0).abs() < 1e-12);
        let ps = prime_square(&history);
        // premiers : 2, 3, 11 ; carrés : 1, 4, 9
        assert!((ps.prime_ratio - 0.5).abs() < 1e-12);
        assert!((ps.square_ratio - 0.5).abs() < 1e-12);
        let cp = consecutive_pairs(&history);
        assert!((cp.consecutive_rate - 3.0).abs() < 1e-12);
        let stats = number_statistics(&history);
        assert!((stats.avg_sum - 30.0).abs() < 1e-9);
        assert!((stats.avg_median - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_primes_and_squares() {
        let primes: Vec<u8> = (1..=20).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19]);
        let squares: Vec<u8> = (1..=49).filter(|&n| is_perfect_square(n)).collect();
        assert_eq!(squares, vec![1, 4, 9, 16, 25, 36, 49]);
    }

    #[test]
    fn test_features_finite_except_sentinel() {
        let history = make_test_draws(40);
        let features = extract_all(&history, &TotoConfig::default());
        for n in 1..=POOL_SIZE {
            for id in crate::features::FeatureId::WEIGHTED {
                let v = features.projection(id, n).unwrap();
                assert!(v.is_finite(), "{} non fini pour {}", id, n);
            }
        }
    }
}
