use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use log::warn;
use toto_db::db::{insert_draw, next_draw_index, reindex_draws};
use toto_db::models::{validate_numbers, Draw, PICK_COUNT};
use toto_db::rusqlite::Connection;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Normalise une date en AAAA-MM-JJ.
pub fn parse_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
        .with_context(|| format!("Format de date invalide: '{}'", raw))
}

/// Positions des colonnes utiles, trouvées par nom d'en-tête.
struct Columns {
    date: usize,
    numbers: [usize; PICK_COUNT],
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .with_context(|| format!("Colonne '{}' absente de l'en-tête", name))
        };

        let date = find("DrawDate")?;
        let mut numbers = [0usize; PICK_COUNT];
        for (k, col) in numbers.iter_mut().enumerate() {
            *col = find(&format!("Number{}", k + 1))?;
        }
        Ok(Self { date, numbers })
    }
}

fn parse_record(record: &csv::StringRecord, columns: &Columns) -> Result<(String, [u8; PICK_COUNT])> {
    let get = |idx: usize| -> Result<String> {
        record
            .get(idx)
            .map(|s| s.trim().to_string())
            .with_context(|| format!("Champ manquant à l'index {}", idx))
    };

    let date = parse_date(&get(columns.date)?)?;
    let mut numbers = [0u8; PICK_COUNT];
    for (slot, &idx) in numbers.iter_mut().zip(&columns.numbers) {
        let s = get(idx)?;
        *slot = s
            .parse::<u8>()
            .with_context(|| format!("Impossible de parser '{}' (index {})", s, idx))?;
    }
    Ok((date, validate_numbers(&numbers)?))
}

pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

/// Importe un CSV `DrawDate,Weekday,Number1..Number6[,Bonus]`. Les dates déjà
/// présentes sont ignorées ; les index sont ensuite réattribués par date.
pub fn import_csv(conn: &Connection, path: &Path) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?;

    let headers = reader.headers().context("En-tête CSV illisible")?.clone();
    let columns = Columns::from_headers(&headers)?;

    let mut result = ImportResult {
        total_records: 0,
        inserted: 0,
        skipped: 0,
        errors: 0,
    };

    let mut parsed = Vec::new();
    for record_result in reader.records() {
        result.total_records += 1;
        match record_result.map_err(anyhow::Error::from).and_then(|r| parse_record(&r, &columns)) {
            Ok(row) => parsed.push(row),
            Err(e) => {
                warn!("Erreur ligne {}: {:#}", result.total_records, e);
                result.errors += 1;
            }
        }
    }
    parsed.sort_by(|a, b| a.0.cmp(&b.0));

    let tx = conn
        .unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;
    let mut index = next_draw_index(&tx)?;
    for (date, numbers) in parsed {
        let draw = Draw { index, date, numbers };
        match insert_draw(&tx, &draw) {
            Ok(true) => {
                result.inserted += 1;
                index += 1;
            }
            Ok(false) => result.skipped += 1,
            Err(e) => {
                warn!("Erreur insertion tirage {}: {:#}", draw.date, e);
                result.errors += 1;
            }
        }
    }
    if result.inserted > 0 {
        // un import peut contenir des tirages plus anciens que ceux déjà en base
        reindex_draws(&tx)?;
    }
    tx.commit().context("Échec du commit")?;
    Ok(result)
}

/// Ajoute un tirage réel après le dernier tirage enregistré.
pub fn add_draw(conn: &Connection, date: &str, numbers: &[u8]) -> Result<Draw> {
    let date = parse_date(date)?;
    let history_tail = toto_db::db::fetch_last_draws(conn, 1)?;
    if let Some(last) = history_tail.first() {
        if date == last.date {
            bail!("Le tirage du {} est déjà enregistré", date);
        }
        if date < last.date {
            bail!("Le tirage du {} précède le dernier tirage enregistré ({})", date, last.date);
        }
    }
    let draw = Draw::new(next_draw_index(conn)?, date, numbers)?;
    insert_draw(conn, &draw)?;
    Ok(draw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use toto_db::db::{fetch_history, migrate};

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-01-04").unwrap(), "2024-01-04");
        assert_eq!(parse_date("2024/01/04").unwrap(), "2024-01-04");
        assert_eq!(parse_date("17/02/2026").unwrap(), "2026-02-17");
        assert!(parse_date("demain").is_err());
    }

    #[test]
    fn test_import_sorts_and_skips() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DrawDate,Weekday,Number1,Number2,Number3,Number4,Number5,Number6,Bonus").unwrap();
        writeln!(file, "2024-01-08,Mon,10,20,30,40,45,49,3").unwrap();
        writeln!(file, "2024-01-04,Thu,6,5,4,3,2,1,7").unwrap();
        writeln!(file, "2024-01-11,Thu,1,1,2,3,4,5,8").unwrap();
        writeln!(file, "2024-01-04,Thu,6,5,4,3,2,1,7").unwrap();
        file.flush().unwrap();

        let conn = memory_db();
        let result = import_csv(&conn, file.path()).unwrap();
        assert_eq!(result.total_records, 4);
        assert_eq!(result.inserted, 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.errors, 1);

        let history = fetch_history(&conn).unwrap();
        assert_eq!(history[0].date, "2024-01-04");
        assert_eq!(history[0].numbers, [1, 2, 3, 4, 5, 6]);
        assert_eq!(history[1].index, 1);
    }

    fn write_csv(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DrawDate,Weekday,Number1,Number2,Number3,Number4,Number5,Number6").unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_second_import_with_older_draws_stays_chronological() {
        let conn = memory_db();
        let recent = write_csv(&["2024-02-01,Thu,1,2,3,4,5,6", "2024-02-05,Mon,7,8,9,10,11,12"]);
        import_csv(&conn, recent.path()).unwrap();

        let backfill = write_csv(&["2024-01-01,Mon,13,14,15,16,17,18"]);
        let result = import_csv(&conn, backfill.path()).unwrap();
        assert_eq!(result.inserted, 1);

        let history = fetch_history(&conn).unwrap();
        let dates: Vec<&str> = history.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-02-01", "2024-02-05"]);
        let indices: Vec<u32> = history.iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        let last = toto_db::db::fetch_last_draws(&conn, 1).unwrap();
        assert_eq!(last[0].date, "2024-02-05");
    }

    #[test]
    fn test_import_requires_headers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Date,A,B").unwrap();
        file.flush().unwrap();
        assert!(import_csv(&memory_db(), file.path()).is_err());
    }

    #[test]
    fn test_add_draw_must_be_newer() {
        let conn = memory_db();
        add_draw(&conn, "2024-01-04", &[1, 2, 3, 4, 5, 6]).unwrap();
        let draw = add_draw(&conn, "2024-01-08", &[7, 8, 9, 10, 11, 12]).unwrap();
        assert_eq!(draw.index, 1);
        assert!(add_draw(&conn, "2024-01-08", &[1, 2, 3, 4, 5, 6]).is_err());
        assert!(add_draw(&conn, "2024-01-01", &[1, 2, 3, 4, 5, 6]).is_err());
        assert!(add_draw(&conn, "2024-01-09", &[1, 2, 3, 4, 5, 60]).is_err());
    }
}
