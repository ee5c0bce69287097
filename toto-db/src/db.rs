use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::models::{Draw, PICK_COUNT};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    draw_index  INTEGER PRIMARY KEY,
    date        TEXT NOT NULL UNIQUE,
    number_1    INTEGER NOT NULL,
    number_2    INTEGER NOT NULL,
    number_3    INTEGER NOT NULL,
    number_4    INTEGER NOT NULL,
    number_5    INTEGER NOT NULL,
    number_6    INTEGER NOT NULL
);
";

/// Répertoire des artefacts (base, poids, évaluations).
pub fn data_dir() -> PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path
}

pub fn db_path() -> PathBuf {
    data_dir().join("toto.db")
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    Ok(())
}

/// Insère un tirage. Renvoie false si la date ou l'index existe déjà.
pub fn insert_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws (draw_index, date, number_1, number_2, number_3, number_4, number_5, number_6)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            draw.index,
            draw.date,
            draw.numbers[0],
            draw.numbers[1],
            draw.numbers[2],
            draw.numbers[3],
            draw.numbers[4],
            draw.numbers[5],
        ],
    ).context("Échec de l'insertion")?;
    Ok(changed > 0)
}

fn row_to_draw(row: &rusqlite::Row<'_>) -> rusqlite::Result<Draw> {
    let mut numbers = [0u8; PICK_COUNT];
    for (i, slot) in numbers.iter_mut().enumerate() {
        *slot = row.get::<_, u8>(2 + i)?;
    }
    numbers.sort_unstable();
    Ok(Draw {
        index: row.get(0)?,
        date: row.get(1)?,
        numbers,
    })
}

/// Tout l'historique en ordre chronologique (le plus ancien d'abord).
pub fn fetch_history(conn: &Connection) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(
        "SELECT draw_index, date, number_1, number_2, number_3, number_4, number_5, number_6
         FROM draws ORDER BY date ASC"
    )?;
    let draws = stmt.query_map([], row_to_draw)?.collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

/// Les `limit` derniers tirages, le plus récent d'abord.
pub fn fetch_last_draws(conn: &Connection, limit: u32) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(
        "SELECT draw_index, date, number_1, number_2, number_3, number_4, number_5, number_6
         FROM draws ORDER BY date DESC LIMIT ?1"
    )?;
    let draws = stmt.query_map([limit], row_to_draw)?.collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

pub fn count_draws(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
    Ok(count)
}

/// Index à attribuer au prochain tirage ajouté.
pub fn next_draw_index(conn: &Connection) -> Result<u32> {
    let max: Option<u32> = conn.query_row("SELECT MAX(draw_index) FROM draws", [], |row| row.get(0))?;
    Ok(max.map_or(0, |m| m + 1))
}

/// Réattribue les index dans l'ordre des dates (0 = le plus ancien), après
/// l'insertion de tirages antérieurs au dernier tirage connu.
pub fn reindex_draws(conn: &Connection) -> Result<()> {
    // passage par des index négatifs : la clé primaire reste unique à chaque étape
    conn.execute("UPDATE draws SET draw_index = -draw_index - 1", [])
        .context("Échec de la réindexation")?;
    conn.execute(
        "UPDATE draws SET draw_index = (SELECT COUNT(*) FROM draws AS d WHERE d.date < draws.date)",
        [],
    )
    .context("Échec de la réindexation")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_draw(index: u32, date: &str) -> Draw {
        Draw::new(index, date, &[1, 2, 3, 4, 5, 6]).unwrap()
    }

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_count() {
        let conn = memory_db();
        assert_eq!(count_draws(&conn).unwrap(), 0);

        insert_draw(&conn, &test_draw(0, "2024-01-01")).unwrap();
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_ignored() {
        let conn = memory_db();

        assert!(insert_draw(&conn, &test_draw(0, "2024-01-01")).unwrap());
        assert!(!insert_draw(&conn, &test_draw(0, "2024-01-01")).unwrap());
        // Même date, autre index
        assert!(!insert_draw(&conn, &test_draw(1, "2024-01-01")).unwrap());
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_fetch_order() {
        let conn = memory_db();

        insert_draw(&conn, &test_draw(2, "2024-01-08")).unwrap();
        insert_draw(&conn, &test_draw(0, "2024-01-01")).unwrap();
        insert_draw(&conn, &test_draw(1, "2024-01-04")).unwrap();

        let history = fetch_history(&conn).unwrap();
        let dates: Vec<&str> = history.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-04", "2024-01-08"]);

        let last = fetch_last_draws(&conn, 2).unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].date, "2024-01-08");
        assert_eq!(last[1].date, "2024-01-04");
    }

    #[test]
    fn test_numbers_roundtrip_sorted() {
        let conn = memory_db();
        let draw = Draw::new(0, "2024-02-02", &[40, 3, 17, 9, 22, 31]).unwrap();
        insert_draw(&conn, &draw).unwrap();
        let history = fetch_history(&conn).unwrap();
        assert_eq!(history[0], draw);
    }

    #[test]
    fn test_reindex_follows_dates() {
        let conn = memory_db();
        insert_draw(&conn, &test_draw(0, "2024-02-01")).unwrap();
        insert_draw(&conn, &test_draw(1, "2024-03-01")).unwrap();
        // tirage antérieur ajouté après coup
        insert_draw(&conn, &test_draw(2, "2024-01-01")).unwrap();

        reindex_draws(&conn).unwrap();
        let history = fetch_history(&conn).unwrap();
        let indexed: Vec<(u32, &str)> = history.iter().map(|d| (d.index, d.date.as_str())).collect();
        assert_eq!(indexed, vec![(0, "2024-01-01"), (1, "2024-02-01"), (2, "2024-03-01")]);
        assert_eq!(next_draw_index(&conn).unwrap(), 3);
    }

    #[test]
    fn test_next_draw_index() {
        let conn = memory_db();
        assert_eq!(next_draw_index(&conn).unwrap(), 0);
        insert_draw(&conn, &test_draw(4, "2024-01-01")).unwrap();
        assert_eq!(next_draw_index(&conn).unwrap(), 5);
    }
}
