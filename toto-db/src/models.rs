use anyhow::{bail, Result};

/// Plus grand numéro tirable.
pub const POOL_SIZE: u8 = 49;
/// Nombre de numéros par tirage.
pub const PICK_COUNT: usize = 6;

/// Un tirage enregistré. `index` donne la position chronologique (0 = le plus ancien).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draw {
    pub index: u32,
    pub date: String,
    pub numbers: [u8; PICK_COUNT],
}

impl Draw {
    /// Construit un tirage validé ; les numéros sont stockés triés.
    pub fn new(index: u32, date: impl Into<String>, numbers: &[u8]) -> Result<Self> {
        let date = date.into();
        validate_date(&date)?;
        let numbers = validate_numbers(numbers)?;
        Ok(Self { index, date, numbers })
    }

    pub fn contains(&self, number: u8) -> bool {
        self.numbers.contains(&number)
    }
}

/// Vérifie 6 numéros distincts dans [1, 49] et les renvoie triés.
pub fn validate_numbers(numbers: &[u8]) -> Result<[u8; PICK_COUNT]> {
    if numbers.len() != PICK_COUNT {
        bail!("Attendu {} numéros, reçu {}", PICK_COUNT, numbers.len());
    }
    for &n in numbers {
        if n < 1 || n > POOL_SIZE {
            bail!("Numéro {} hors limites (1-{})", n, POOL_SIZE);
        }
    }
    let mut sorted = [0u8; PICK_COUNT];
    sorted.copy_from_slice(numbers);
    sorted.sort_unstable();
    if let Some(w) = sorted.windows(2).find(|w| w[0] == w[1]) {
        bail!("Numéro en double : {}", w[0]);
    }
    Ok(sorted)
}

/// Parse "1,2,3,4,5,6" ou "1 2 3 4 5 6".
pub fn parse_numbers(input: &str) -> Result<[u8; PICK_COUNT]> {
    let parsed: Vec<u8> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim()
                .parse::<u8>()
                .map_err(|_| anyhow::anyhow!("Numéro invalide : '{}'", s))
        })
        .collect::<Result<_>>()?;
    validate_numbers(&parsed)
}

/// Valide une date AAAA-MM-JJ.
pub fn validate_date(date: &str) -> Result<()> {
    if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        bail!("Format de date invalide : '{}' (attendu AAAA-MM-JJ)", date);
    }
    Ok(())
}
