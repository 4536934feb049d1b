//! Random password generator.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{KeeperError, Result};

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";
const SYMBOLS: &str = "@#$%&*()-+=^.,";

/// Characters that are easy to confuse and never generated.
const AMBIGUOUS: &[char] = &['I', 'l', 'O', '0'];

/// Shortest password the generator will produce.
pub const MIN_LENGTH: usize = 4;

/// Which character sets to draw from and how long the result is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorOptions {
    pub upper_case: bool,
    pub lower_case: bool,
    pub digits: bool,
    pub symbols: bool,
    pub length: usize,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            upper_case: true,
            lower_case: true,
            digits: true,
            symbols: true,
            length: 16,
        }
    }
}

impl GeneratorOptions {
    fn buckets(&self) -> Vec<Vec<char>> {
        [
            (self.upper_case, UPPER),
            (self.lower_case, LOWER),
            (self.digits, DIGITS),
            (self.symbols, SYMBOLS),
        ]
        .into_iter()
        .filter(|(used, _)| *used)
        .map(|(_, chars)| chars.chars().filter(|c| !AMBIGUOUS.contains(c)).collect())
        .collect()
    }
}

/// Generates a password containing at least one character of every selected set.
pub fn generate(options: &GeneratorOptions) -> Result<String> {
    if options.length < MIN_LENGTH {
        return Err(KeeperError::InvalidInput(format!(
            "Password length must be {MIN_LENGTH} or greater"
        )));
    }
    let buckets = options.buckets();
    if buckets.is_empty() {
        return Err(KeeperError::InvalidInput(
            "At least one character set must be selected".to_string(),
        ));
    }

    let mut rng = rand::rng();
    loop {
        let password: String = (0..options.length)
            .map(|_| {
                let bucket = &buckets[rng.random_range(0..buckets.len())];
                bucket[rng.random_range(0..bucket.len())]
            })
            .collect();
        if buckets
            .iter()
            .all(|bucket| password.chars().any(|c| bucket.contains(&c)))
        {
            return Ok(password);
        }
    }
}
