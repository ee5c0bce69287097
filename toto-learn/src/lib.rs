pub mod config;
pub mod display;
pub mod error;
pub mod evaluator;
pub mod features;
pub mod generator;
pub mod learner;
pub mod run_loop;
pub mod scoring;
pub mod store;
pub mod trends;
pub mod weights;

use toto_db::models::{Draw, PICK_COUNT, POOL_SIZE};

/// Historique synthétique déterministe, en ordre chronologique.
/// Le tirage i contient (5i + 8k) mod 49 + 1 pour k = 0..6.
pub fn make_test_draws(n: usize) -> Vec<Draw> {
    (0..n)
        .map(|i| {
            let mut numbers = [0u8; PICK_COUNT];
            for (k, slot) in numbers.iter_mut().enumerate() {
                *slot = ((i * 5 + k * 8) % POOL_SIZE as usize) as u8 + 1;
            }
            numbers.sort_unstable();
            Draw {
                index: i as u32,
                date: format!("2024-{:02}-{:02}", i / 28 + 1, i % 28 + 1),
                numbers,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use toto_db::models::validate_numbers;

    #[test]
    fn test_make_test_draws_valid() {
        let draws = make_test_draws(60);
        assert_eq!(draws.len(), 60);
        for (i, d) in draws.iter().enumerate() {
            assert_eq!(d.index as usize, i);
            assert_eq!(validate_numbers(&d.numbers).unwrap(), d.numbers);
        }
    }
}
