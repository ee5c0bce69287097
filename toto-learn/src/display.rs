use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use toto_db::models::{Draw, POOL_SIZE};

use crate::evaluator::EvaluationResult;
use crate::features::{slot, ConsecutivePairs, FeatureSet};
use crate::generator::{rank_numbers, Prediction};
use crate::learner::{LearnOutcome, LearningRecord};
use crate::run_loop::{RunSummary, SystemStatus};
use crate::scoring::Scorer;
use crate::trends::PerformanceTrends;
use crate::weights::WeightVector;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn join_numbers(numbers: &[u8]) -> String {
    if numbers.is_empty() {
        return "—".to_string();
    }
    numbers
        .iter()
        .map(|n| format!("{:2}", n))
        .collect::<Vec<_>>()
        .join(" - ")
}

pub fn display_draws(draws: &[Draw]) {
    if draws.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    let mut table = new_table();
    table.set_header(vec!["#", "Date", "Numéros"]);
    for draw in draws {
        table.add_row(vec![draw.index.to_string(), draw.date.clone(), join_numbers(&draw.numbers)]);
    }
    println!("{table}");
}

pub fn display_weights(weights: &WeightVector) {
    println!("\n== Poids des features ==\n");

    let mut table = new_table();
    table.set_header(vec!["Feature", "Poids", "Contribution"]);
    for (id, weight) in weights.ranked() {
        let bar = "█".repeat((weight * 60.0).round() as usize);
        table.add_row(vec![id.name().to_string(), format!("{:.4}", weight), bar]);
    }
    println!("{table}");
    println!("Somme : {:.4}", weights.sum());
}

pub fn display_predictions(predictions: &[Prediction], scorer: &Scorer) {
    println!("\n== Prédictions ==\n");

    let mut table = new_table();
    table.set_header(vec!["#", "Numéros", "Score combinaison", "Confiance", "Raisons"]);
    for (i, p) in predictions.iter().enumerate() {
        let reasons = p
            .numbers
            .iter()
            .filter_map(|&n| {
                let tags = scorer.reasons(n);
                if tags.is_empty() {
                    None
                } else {
                    Some(format!("{}: {}", n, tags.join(", ")))
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        let cells = vec![
            Cell::new(p.rank),
            Cell::new(join_numbers(&p.numbers)),
            Cell::new(format!("{:.4}", p.combination_score)),
            Cell::new(format!("{:.1} %", p.confidence)),
            Cell::new(reasons),
        ];
        if i == 0 {
            table.add_row(cells.into_iter().map(|c| c.fg(Color::Green)).collect::<Vec<_>>());
        } else {
            table.add_row(cells);
        }
    }
    println!("{table}");
}

pub fn display_evaluation(evaluation: &EvaluationResult) {
    println!(
        "\n== Évaluation du tirage {} : {} ==\n",
        evaluation.draw_date,
        join_numbers(&evaluation.actual_result)
    );

    let mut table = new_table();
    table.set_header(vec!["#", "Prédiction", "Trouvés", "Numéros trouvés", "Confiance"]);
    for p in &evaluation.predictions {
        let color = match p.hit_count {
            0 => Color::Reset,
            1 => Color::Yellow,
            _ => Color::Green,
        };
        table.add_row(vec![
            Cell::new(p.index),
            Cell::new(join_numbers(&p.predicted_numbers)),
            Cell::new(p.hit_count).fg(color),
            Cell::new(join_numbers(&p.hit_numbers)),
            Cell::new(format!("{:.1} %", p.confidence)),
        ]);
    }
    println!("{table}");

    let s = &evaluation.summary;
    let best = if s.best_prediction_index == 0 {
        "aucune".to_string()
    } else {
        format!("#{}", s.best_prediction_index)
    };
    println!(
        "Meilleur : {} numéros ({}), moyenne : {:.2}",
        s.best_hit_count, best, s.average_hit_count
    );
    let histogram = s
        .hit_distribution
        .iter()
        .enumerate()
        .filter(|(_, c)| **c > 0)
        .map(|(k, c)| format!("{}→{}", k, c))
        .collect::<Vec<_>>()
        .join("  ");
    println!("Répartition : {}", histogram);
}

pub fn display_learning(outcome: &LearnOutcome) {
    match outcome {
        LearnOutcome::EvaluationNotFound { date } => {
            println!("Aucune évaluation pour le {}, poids inchangés.", date);
        }
        LearnOutcome::Updated(record) => display_learning_record(record),
    }
}

pub fn display_learning_record(record: &LearningRecord) {
    println!(
        "\n== Apprentissage {} (performance {:.3}) ==\n",
        record.draw_date, record.performance
    );

    let mut table = new_table();
    table.set_header(vec!["Feature", "Moy. tirés", "Moy. prédits", "Efficacité"]);
    for f in &record.features {
        table.add_row(vec![
            f.feature.name().to_string(),
            format!("{:.3}", f.actual_average),
            format!("{:.3}", f.predicted_average),
            format!("{:.3}", f.effectiveness),
        ]);
    }
    println!("{table}");

    if record.adjustments.is_empty() {
        println!("Aucun ajustement significatif.");
        return;
    }
    let mut table = new_table();
    table.set_header(vec!["Feature", "Ancien", "Nouveau", "Δ"]);
    for c in &record.adjustments {
        let color = if c.delta > 0.0 { Color::Green } else { Color::Red };
        table.add_row(vec![
            Cell::new(c.feature.name()),
            Cell::new(format!("{:.4}", c.old_weight)),
            Cell::new(format!("{:.4}", c.new_weight)),
            Cell::new(format!("{:+.4}", c.delta)).fg(color),
        ]);
    }
    println!("{table}");
}

pub fn display_trends(trends: Option<&PerformanceTrends>) {
    println!("\n== Tendances de performance ==\n");
    let Some(t) = trends else {
        println!("Aucune évaluation enregistrée.");
        return;
    };

    let mut table = new_table();
    table.set_header(vec!["Indicateur", "Valeur"]);
    table.add_row(vec!["Tirages évalués".to_string(), t.evaluated_draws.to_string()]);
    table.add_row(vec!["Meilleur score moyen".to_string(), format!("{:.2}", t.mean_best_hits)]);
    table.add_row(vec!["Score moyen".to_string(), format!("{:.2}", t.mean_average_hits)]);
    table.add_row(vec![
        "Meilleur tirage".to_string(),
        format!("{} ({} numéros)", t.best_draw.0, t.best_draw.1),
    ]);
    table.add_row(vec![
        "Pire tirage".to_string(),
        format!("{} ({} numéros)", t.worst_draw.0, t.worst_draw.1),
    ]);
    println!("{table}");
}

pub fn display_status(status: &SystemStatus) {
    println!("\n== État du système ==\n");
    println!("Tirages traités : {}", status.processed_count);
    println!(
        "Dernier tirage traité : {}",
        status.last_processed.as_deref().unwrap_or("—")
    );

    display_trends(status.trends.as_ref());

    println!("\n── Top poids ──");
    let mut table = new_table();
    table.set_header(vec!["Feature", "Poids"]);
    for (id, w) in &status.top_weights {
        table.add_row(vec![id.name().to_string(), format!("{:.4}", w)]);
    }
    println!("{table}");
}

pub fn display_run_summary(summary: &RunSummary) {
    println!("\nCycle terminé :");
    println!("  Tirages traités : {}", summary.processed.len());
    if !summary.failures.is_empty() {
        println!("  Échecs          : {}", summary.failures.len());
        for (date, error) in &summary.failures {
            println!("    {} : {}", date, error);
        }
    }
}

fn consecutive_pairs_line(pairs: &ConsecutivePairs) -> String {
    format!(
        "Paires consécutives : {:.3} par tirage ; paires proches (écart ≤ 2) : {:.3} des 15 paires",
        pairs.consecutive_rate, pairs.pair_rate
    )
}

/// Classement des numéros avec leurs principales features.
pub fn display_features(features: &FeatureSet, scorer: &Scorer, top: usize) {
    println!(
        "\n== Features sur {} tirages (fréquence théorique {:.2}) ==\n",
        features.draw_count,
        features.expected_appearances()
    );

    let scores = scorer.number_scores();
    let mut table = new_table();
    table.set_header(vec!["Numéro", "Score", "Total", "Récent", "Absent depuis", "Temp.", "Période", "Principale"]);
    for n in rank_numbers(&scores).into_iter().take(top.min(POOL_SIZE as usize)) {
        let i = slot(n);
        let period = features.periodicity[i];
        let period = if period.has_period() {
            format!("{:.1} ± {:.1}", period.avg_interval, period.std_interval)
        } else {
            "—".to_string()
        };
        let main_feature = scorer
            .breakdown(n)
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(id, contribution)| format!("{} ({:.3})", id.name(), contribution))
            .unwrap_or_default();
        table.add_row(vec![
            format!("{:2}", n),
            format!("{:.4}", scores[i]),
            features.total_appearances[i].to_string(),
            features.recent_appearances[i].to_string(),
            features.missing_intervals[i].to_string(),
            features.hot_cold[i].to_string(),
            period,
            main_feature,
        ]);
    }
    println!("{table}");

    println!("\n── Agrégats ──");
    let chi = features.chi_square;
    println!(
        "Khi² : {:.2} (p = {:.4}){}",
        chi.statistic,
        chi.p_value,
        if chi.is_biased { ", biais détecté" } else { "" }
    );
    println!(
        "Répétitions moyennes avec le tirage précédent : {:.2}",
        features.repeat_patterns.avg_repeats
    );
    println!("{}", consecutive_pairs_line(&features.consecutive_pairs));
    println!("Part de numéros impairs : {:.3}", features.odd_even_ratio);
    println!(
        "Somme moyenne : {:.1} (σ {:.1}), médiane moyenne : {:.1}",
        features.number_statistics.avg_sum,
        features.number_statistics.sum_std,
        features.number_statistics.avg_median
    );
    println!(
        "Premiers : {:.3}, carrés : {:.3}",
        features.prime_square.prime_ratio, features.prime_square.square_ratio
    );
    let bins = features
        .distribution
        .iter()
        .enumerate()
        .map(|(b, rate)| format!("{}-{}: {:.3}", b * 10 + 1, (b * 10 + 10).min(POOL_SIZE as usize), rate))
        .collect::<Vec<_>>()
        .join("  ");
    println!("Répartition par dizaine : {}", bins);
    if let Some(top_pair) = features.combination_frequency.first() {
        println!(
            "Paire la plus fréquente : {}-{} ({:.3})",
            top_pair.pair.0, top_pair.pair.1, top_pair.frequency
        );
    }
}
