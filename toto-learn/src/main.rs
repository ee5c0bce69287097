mod import;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;

use toto_db::db::{count_draws, data_dir, db_path, fetch_history, fetch_last_draws, migrate, open_db};
use toto_db::models::parse_numbers;
use toto_db::rusqlite::Connection;
use toto_learn::config::TotoConfig;
use toto_learn::display;
use toto_learn::features::FeatureSet;
use toto_learn::generator::date_seed;
use toto_learn::run_loop::RunLoop;
use toto_learn::scoring::Scorer;
use toto_learn::store::{EvaluationStore, JsonStore, WeightStore};
use toto_learn::trends::{export_evaluations_csv, performance_trends};

const CONFIG_FILE: &str = "config.json";

#[derive(Parser)]
#[command(name = "toto", about = "Prédiction adaptative de tirages 6/49")]
struct Cli {
    /// Fichier de configuration JSON (défaut : data/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Importer l'historique depuis un CSV (DrawDate,Weekday,Number1..Number6)
    Import {
        /// Fichier CSV
        file: PathBuf,
    },

    /// Historique des derniers tirages
    History {
        /// Nombre de tirages
        #[arg(short, long, default_value = "10")]
        last: u32,
    },

    /// Rejouer les tirages non traités : prédiction, évaluation, apprentissage
    Run {
        /// Nombre maximal de tirages à traiter
        #[arg(short, long)]
        max: Option<usize>,

        /// Seed pour la reproductibilité (défaut: date du jour YYYYMMDD)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Prédire le prochain tirage avec les poids courants
    Predict {
        /// Nombre de prédictions
        #[arg(short, long)]
        count: Option<usize>,

        /// Taille du pool de candidats
        #[arg(short, long)]
        pool: Option<usize>,

        /// Seed pour la reproductibilité (défaut: date du jour YYYYMMDD)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Enregistrer un résultat réel et lancer un cycle d'apprentissage
    Add {
        /// Date du tirage (AAAA-MM-JJ)
        date: String,

        /// 6 numéros : "1,2,3,4,5,6" ou 1 2 3 4 5 6
        #[arg(required = true, num_args = 1..)]
        numbers: Vec<String>,

        /// Seed pour la reproductibilité (défaut: date du jour YYYYMMDD)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Afficher les poids des features
    Weights,

    /// État du système d'apprentissage
    Status,

    /// Tendances de performance sur les tirages évalués
    Trends,

    /// Exporter les évaluations en CSV
    Export {
        /// Fichier de sortie
        #[arg(short, long, default_value = "evaluation_summary.csv")]
        output: PathBuf,
    },

    /// Afficher les features calculées sur tout l'historique
    Features {
        /// Nombre de numéros affichés
        #[arg(short, long, default_value = "15")]
        top: usize,
    },

    /// Afficher la configuration effective (et l'écrire avec --write)
    Config {
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(|| data_dir().join(CONFIG_FILE));
    let config = TotoConfig::load_or_default(&config_path);

    let path = db_path();
    let conn = open_db(&path)?;
    migrate(&conn)?;
    let mut store = JsonStore::new(data_dir());

    match cli.command {
        Command::Import { file } => cmd_import(&conn, &file),
        Command::History { last } => cmd_history(&conn, last),
        Command::Run { max, seed } => cmd_run(&conn, &config, &mut store, max, seed),
        Command::Predict { count, pool, seed } => cmd_predict(&conn, &config, &mut store, count, pool, seed),
        Command::Add { date, numbers, seed } => cmd_add(&conn, &config, &mut store, &date, &numbers, seed),
        Command::Weights => cmd_weights(&store),
        Command::Status => cmd_status(&config, &mut store),
        Command::Trends => cmd_trends(&store),
        Command::Export { output } => cmd_export(&store, &output),
        Command::Features { top } => cmd_features(&conn, &config, &store, top),
        Command::Config { write } => cmd_config(&config, &config_path, write),
    }
}

fn load_history(conn: &Connection) -> Result<Vec<toto_db::models::Draw>> {
    if count_draws(conn)? == 0 {
        bail!("Base vide. Lancez d'abord : toto import <fichier.csv>");
    }
    fetch_history(conn)
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    let seed = seed.unwrap_or_else(date_seed);
    log::info!("Seed : {}", seed);
    StdRng::seed_from_u64(seed)
}

fn cmd_import(conn: &Connection, file: &Path) -> Result<()> {
    let result = import::import_csv(conn, file)?;
    println!("Import terminé :");
    println!("  Total lignes lues : {}", result.total_records);
    println!("  Insérés           : {}", result.inserted);
    println!("  Doublons ignorés  : {}", result.skipped);
    if result.errors > 0 {
        println!("  Erreurs           : {}", result.errors);
    }
    Ok(())
}

fn cmd_history(conn: &Connection, last: u32) -> Result<()> {
    let draws = fetch_last_draws(conn, last)?;
    display::display_draws(&draws);
    Ok(())
}

fn cmd_run(conn: &Connection, config: &TotoConfig, store: &mut JsonStore, max: Option<usize>, seed: Option<u64>) -> Result<()> {
    let history = load_history(conn)?;
    let mut rng = seeded_rng(seed);
    let mut run = RunLoop::new(config, store);

    let pending = run.pending(&history).len().min(max.unwrap_or(usize::MAX));
    if pending == 0 {
        println!("Aucun nouveau tirage à traiter.");
        return Ok(());
    }
    println!("Traitement de {} tirages sur {}...", pending, history.len());

    let pb = ProgressBar::new(pending as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Modèle de barre de progression invalide")?
            .progress_chars("=> "),
    );

    let summary = run.run(&history, max, &mut rng, |date, result| {
        pb.set_message(date.to_string());
        if let Err(e) = result {
            pb.println(format!("  {} : {}", date, e));
        }
        pb.inc(1);
    });
    pb.finish_with_message("Apprentissage terminé");

    display::display_run_summary(&summary);
    display::display_weights(run.weights());
    Ok(())
}

fn cmd_predict(
    conn: &Connection,
    config: &TotoConfig,
    store: &mut JsonStore,
    count: Option<usize>,
    pool: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let config = TotoConfig {
        prediction_count: count.unwrap_or(config.prediction_count),
        ..config.clone()
    };
    let pool = pool.unwrap_or(config.next_draw_pool_size);
    let history = load_history(conn)?;
    let mut rng = seeded_rng(seed);

    let run = RunLoop::new(&config, store);
    let (features, generation) = run.predict_next(&history, pool, &mut rng)?;
    if let Some(last) = history.last() {
        println!("Prédictions après le tirage du {} ({} tirages, pool de {})", last.date, history.len(), pool);
    }

    let scorer = Scorer::new(&features, run.weights());
    display::display_predictions(&generation.predictions, &scorer);
    if generation.is_partial() {
        println!(
            "Seulement {} combinaisons uniques sur {} demandées.",
            generation.predictions.len(),
            generation.requested
        );
    }
    Ok(())
}

fn cmd_add(
    conn: &Connection,
    config: &TotoConfig,
    store: &mut JsonStore,
    date: &str,
    numbers: &[String],
    seed: Option<u64>,
) -> Result<()> {
    let numbers = parse_numbers(&numbers.join(" "))?;
    let draw = import::add_draw(conn, date, &numbers)?;
    println!("Tirage du {} enregistré.", draw.date);

    let history = fetch_history(conn)?;
    let position = history
        .iter()
        .position(|d| d.date == draw.date)
        .with_context(|| format!("Tirage du {} introuvable après insertion", draw.date))?;

    let mut rng = seeded_rng(seed);
    let mut run = RunLoop::new(config, store);
    let report = run
        .process_draw(&history, position, &mut rng)
        .with_context(|| format!("Cycle d'apprentissage impossible pour le {}", draw.date))?;

    display::display_evaluation(&report.evaluation);
    display::display_learning(&report.learning);
    Ok(())
}

fn cmd_weights(store: &JsonStore) -> Result<()> {
    display::display_weights(&store.load_weights());
    Ok(())
}

fn cmd_status(config: &TotoConfig, store: &mut JsonStore) -> Result<()> {
    let run = RunLoop::new(config, store);
    display::display_status(&run.status());
    Ok(())
}

fn cmd_trends(store: &JsonStore) -> Result<()> {
    let evaluations = store.load_evaluations();
    display::display_trends(performance_trends(&evaluations).as_ref());
    Ok(())
}

fn cmd_export(store: &JsonStore, output: &Path) -> Result<()> {
    let evaluations = store.load_evaluations();
    if evaluations.is_empty() {
        bail!("Aucune évaluation à exporter. Lancez d'abord : toto run");
    }
    let rows = export_evaluations_csv(&evaluations, output)?;
    println!("{} évaluations exportées dans : {}", rows, output.display());
    Ok(())
}

fn cmd_features(conn: &Connection, config: &TotoConfig, store: &JsonStore, top: usize) -> Result<()> {
    let history = load_history(conn)?;
    let features = FeatureSet::extract(&history, config);
    let weights = store.load_weights();
    let scorer = Scorer::new(&features, &weights);
    display::display_features(&features, &scorer, top);
    Ok(())
}

fn cmd_config(config: &TotoConfig, path: &Path, write: bool) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("Sérialisation de la configuration")?;
    println!("{json}");
    if write {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
        }
        std::fs::write(path, json).with_context(|| format!("Impossible d'écrire {:?}", path))?;
        println!("Configuration écrite dans : {}", path.display());
    }
    Ok(())
}
