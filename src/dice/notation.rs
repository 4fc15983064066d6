//! Dice notation parsing and result formatting
//!
//! Handles notation like "2d6+3", "1d20", "d8-1". Parsing is case-insensitive
//! and ignores surrounding whitespace.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::roll::roll_dice_with;
use super::DiceError;

/// Largest number of dice accepted in one notation
pub const MAX_DICE_COUNT: u32 = 100;

/// Largest die accepted in one notation
pub const MAX_DICE_SIDES: u32 = 1000;

/// Largest flat modifier accepted in one notation, either sign
pub const MAX_DICE_MODIFIER: i32 = 1000;

static NOTATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d*)d(\d+)([+-]\d+)?$").unwrap());

/// A parsed dice notation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDice {
    /// Number of dice to roll
    pub count: u32,
    /// Number of sides per die
    pub sides: u32,
    /// Flat modifier added to the sum
    pub modifier: i32,
    /// Normalized notation string
    pub notation: String,
}

impl ParsedDice {
    /// Lowest possible total
    pub fn min(&self) -> i32 {
        clamp_total(self.count as i64 + self.modifier as i64)
    }

    /// Highest possible total
    pub fn max(&self) -> i32 {
        clamp_total(self.count as i64 * self.sides as i64 + self.modifier as i64)
    }

    /// Expected average, rounded down
    pub fn average(&self) -> i32 {
        let avg_per_die = (1.0 + self.sides as f64) / 2.0;
        (self.count as f64 * avg_per_die + self.modifier as f64).floor() as i32
    }

    /// Roll the notation with the thread RNG
    pub fn roll(&self) -> DiceResult {
        self.roll_with(&mut rand::rng())
    }

    /// Roll the notation with the provided RNG
    pub fn roll_with<R: Rng + ?Sized>(&self, rng: &mut R) -> DiceResult {
        // A hand-built notation with zero dice or sides rolls nothing
        let rolls = roll_dice_with(rng, self.count, self.sides)
            .map(|pool| pool.rolls)
            .unwrap_or_default();
        let subtotal = sum_rolls(&rolls);

        DiceResult {
            count: self.count,
            sides: self.sides,
            modifier: self.modifier,
            notation: self.notation.clone(),
            rolls,
            subtotal,
            total: clamp_total(subtotal as i64 + self.modifier as i64),
        }
    }
}

// Hand-built notations skip the parser limits, so totals saturate
fn clamp_total(total: i64) -> i32 {
    total.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn sum_rolls(rolls: &[u32]) -> u32 {
    rolls.iter().fold(0u32, |acc, &r| acc.saturating_add(r))
}

impl FromStr for ParsedDice {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_dice_notation(s)
    }
}

impl fmt::Display for ParsedDice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifier > 0 {
            write!(f, "{}d{}+{}", self.count, self.sides, self.modifier)
        } else if self.modifier < 0 {
            write!(f, "{}d{}{}", self.count, self.sides, self.modifier)
        } else {
            write!(f, "{}d{}", self.count, self.sides)
        }
    }
}

/// A fully resolved roll of a dice notation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceResult {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
    pub notation: String,
    /// Individual die results
    pub rolls: Vec<u32>,
    /// Sum of the dice before the modifier
    pub subtotal: u32,
    /// subtotal + modifier
    pub total: i32,
}

impl fmt::Display for DiceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_dice_result(self))
    }
}

/// Parse a dice notation string like "2d6+3"
pub fn parse_dice_notation(notation: &str) -> Result<ParsedDice, DiceError> {
    let normalized = notation.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(DiceError::EmptyNotation);
    }

    let caps = NOTATION_REGEX
        .captures(&normalized)
        .ok_or_else(|| DiceError::InvalidNotation(notation.trim().to_string()))?;

    let count = match caps.get(1).map(|m| m.as_str()) {
        None | Some("") => 1,
        Some(s) => s
            .parse::<u32>()
            .map_err(|_| DiceError::TooManyDice(MAX_DICE_COUNT))?,
    };
    let sides: u32 = caps[2]
        .parse()
        .map_err(|_| DiceError::TooManySides(MAX_DICE_SIDES))?;
    let modifier: i32 = match caps.get(3) {
        Some(m) => m
            .as_str()
            .parse::<i32>()
            .ok()
            .filter(|v| v.unsigned_abs() <= MAX_DICE_MODIFIER.unsigned_abs())
            .ok_or(DiceError::ModifierTooLarge(MAX_DICE_MODIFIER))?,
        None => 0,
    };

    if count == 0 {
        return Err(DiceError::InvalidCount(count));
    }
    if count > MAX_DICE_COUNT {
        return Err(DiceError::TooManyDice(MAX_DICE_COUNT));
    }
    if sides == 0 {
        return Err(DiceError::InvalidSides(sides));
    }
    if sides > MAX_DICE_SIDES {
        return Err(DiceError::TooManySides(MAX_DICE_SIDES));
    }

    Ok(ParsedDice {
        count,
        sides,
        modifier,
        notation: normalized,
    })
}

/// Build a result from externally supplied die values
///
/// Every roll must lie in `1..=parsed.sides` and there must be exactly
/// `parsed.count` of them.
pub fn calculate_result(parsed: &ParsedDice, rolls: &[u32]) -> Result<DiceResult, DiceError> {
    if rolls.len() != parsed.count as usize {
        return Err(DiceError::RollCountMismatch {
            expected: parsed.count,
            actual: rolls.len(),
        });
    }
    if let Some(&bad) = rolls.iter().find(|&&r| r < 1 || r > parsed.sides) {
        return Err(DiceError::RollOutOfRange {
            roll: bad,
            sides: parsed.sides,
        });
    }

    let subtotal = sum_rolls(rolls);
    Ok(DiceResult {
        count: parsed.count,
        sides: parsed.sides,
        modifier: parsed.modifier,
        notation: parsed.notation.clone(),
        rolls: rolls.to_vec(),
        subtotal,
        total: clamp_total(subtotal as i64 + parsed.modifier as i64),
    })
}

/// Parse and roll a notation in one step
pub fn roll_notation(notation: &str) -> Result<DiceResult, DiceError> {
    Ok(parse_dice_notation(notation)?.roll())
}

/// Render a result for display, e.g. `2d6+3: [4, 2] + 3 = 9`
pub fn format_dice_result(result: &DiceResult) -> String {
    let rolls = result
        .rolls
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    match result.modifier {
        0 => format!("{}: [{}] = {}", result.notation, rolls, result.total),
        m if m > 0 => format!("{}: [{}] + {} = {}", result.notation, rolls, m, result.total),
        m => format!(
            "{}: [{}] - {} = {}",
            result.notation,
            rolls,
            m.unsigned_abs(),
            result.total
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_basic() {
        let parsed = parse_dice_notation("2d6+3").unwrap();
        assert_eq!(
            parsed,
            ParsedDice {
                count: 2,
                sides: 6,
                modifier: 3,
                notation: "2d6+3".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_with_minus() {
        let parsed = parse_dice_notation("3d8-2").unwrap();
        assert_eq!(parsed.count, 3);
        assert_eq!(parsed.sides, 8);
        assert_eq!(parsed.modifier, -2);
    }

    #[test]
    fn test_parse_implicit_one() {
        let parsed = parse_dice_notation("d20").unwrap();
        assert_eq!(parsed.count, 1);
        assert_eq!(parsed.sides, 20);
        assert_eq!(parsed.modifier, 0);
    }

    #[test]
    fn test_parse_whitespace_and_case() {
        let parsed = parse_dice_notation("  2D10+3  ").unwrap();
        assert_eq!(parsed.count, 2);
        assert_eq!(parsed.sides, 10);
        assert_eq!(parsed.modifier, 3);
        assert_eq!(parsed.notation, "2d10+3");
    }

    #[test]
    fn test_parse_empty() {
        let err = parse_dice_notation("").unwrap_err();
        assert_eq!(err, DiceError::EmptyNotation);
        assert_eq!(err.to_string(), "Dice notation cannot be empty");
        assert_eq!(parse_dice_notation("   ").unwrap_err(), DiceError::EmptyNotation);
    }

    #[test]
    fn test_parse_malformed() {
        for bad in ["abc", "2d", "d", "2x6", "2d6+", "2d6+1d4", "+3"] {
            assert!(
                matches!(parse_dice_notation(bad), Err(DiceError::InvalidNotation(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_limits() {
        assert!(parse_dice_notation("100d6").is_ok());
        assert_eq!(
            parse_dice_notation("101d6").unwrap_err(),
            DiceError::TooManyDice(MAX_DICE_COUNT)
        );
        assert!(parse_dice_notation("1d1000").is_ok());
        assert_eq!(
            parse_dice_notation("1d1001").unwrap_err(),
            DiceError::TooManySides(MAX_DICE_SIDES)
        );
        assert_eq!(
            parse_dice_notation("99999999999d6").unwrap_err(),
            DiceError::TooManyDice(MAX_DICE_COUNT)
        );
        assert!(parse_dice_notation("0d6").is_err());
        assert!(parse_dice_notation("2d0").is_err());
    }

    #[test]
    fn test_parse_modifier_limits() {
        assert_eq!(parse_dice_notation("1d6+1000").unwrap().modifier, 1000);
        assert_eq!(parse_dice_notation("1d6-1000").unwrap().modifier, -1000);
        for bad in ["1d6+1001", "1d6-1001", "1d6+2147483647", "1d6-99999999999999"] {
            assert_eq!(
                parse_dice_notation(bad).unwrap_err(),
                DiceError::ModifierTooLarge(MAX_DICE_MODIFIER),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_hand_built_totals_saturate() {
        let parsed = ParsedDice {
            count: 1,
            sides: 6,
            modifier: i32::MAX,
            notation: "1d6+huge".to_string(),
        };
        assert_eq!(parsed.max(), i32::MAX);
        assert_eq!(parsed.min(), i32::MAX);
        assert_eq!(calculate_result(&parsed, &[3]).unwrap().total, i32::MAX);

        let parsed = parse_dice_notation("100d1000-1000").unwrap();
        assert_eq!(parsed.max(), 99_000);
        assert_eq!(parsed.min(), -900);
    }

    #[test]
    fn test_calculate_result() {
        let parsed = parse_dice_notation("2d6+3").unwrap();
        let result = calculate_result(&parsed, &[4, 2]).unwrap();
        assert_eq!(result.rolls, vec![4, 2]);
        assert_eq!(result.subtotal, 6);
        assert_eq!(result.total, 9);
        assert_eq!(result.notation, "2d6+3");
    }

    #[test]
    fn test_calculate_result_rejects_bad_rolls() {
        let parsed = parse_dice_notation("2d6").unwrap();
        assert_eq!(
            calculate_result(&parsed, &[3]).unwrap_err(),
            DiceError::RollCountMismatch {
                expected: 2,
                actual: 1
            }
        );
        assert_eq!(
            calculate_result(&parsed, &[3, 7]).unwrap_err(),
            DiceError::RollOutOfRange { roll: 7, sides: 6 }
        );
        assert!(calculate_result(&parsed, &[0, 1]).is_err());
    }

    #[test]
    fn test_roll_within_bounds() {
        let parsed = parse_dice_notation("3d6-1").unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let result = parsed.roll_with(&mut rng);
            assert_eq!(result.rolls.len(), 3);
            assert!(result.total >= parsed.min() && result.total <= parsed.max());
            assert_eq!(result.total, result.subtotal as i32 - 1);
        }
    }

    #[test]
    fn test_min_max_average() {
        let parsed = parse_dice_notation("2d6+3").unwrap();
        assert_eq!(parsed.min(), 5);
        assert_eq!(parsed.max(), 15);
        assert_eq!(parsed.average(), 10);
    }

    #[test]
    fn test_display() {
        assert_eq!(parse_dice_notation("d6").unwrap().to_string(), "1d6");
        assert_eq!(parse_dice_notation("1d20+5").unwrap().to_string(), "1d20+5");
        assert_eq!(parse_dice_notation("3d8-2").unwrap().to_string(), "3d8-2");
    }

    #[test]
    fn test_format_result() {
        let parsed = parse_dice_notation("2d6+3").unwrap();
        let result = calculate_result(&parsed, &[4, 2]).unwrap();
        assert_eq!(format_dice_result(&result), "2d6+3: [4, 2] + 3 = 9");

        let parsed = parse_dice_notation("1d8-2").unwrap();
        let result = calculate_result(&parsed, &[5]).unwrap();
        assert_eq!(format_dice_result(&result), "1d8-2: [5] - 2 = 3");

        let parsed = parse_dice_notation("d20").unwrap();
        let result = calculate_result(&parsed, &[17]).unwrap();
        assert_eq!(result.to_string(), "d20: [17] = 17");
    }
}
