use anyhow::{bail, Context};
use std::fmt;
use std::str::FromStr;

/// A worksheet cell coordinate in A1 notation. Both `row` and `col` are 1-based, so `B5` is
/// `CellRef { row: 5, col: 2 }`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(crate) struct CellRef {
    pub(crate) row: u32,
    pub(crate) col: u32,
}

impl CellRef {
    pub(crate) fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

impl FromStr for CellRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .with_context(|| format!("Cell reference '{s}' has no row number"))?;
        let (letters, digits) = s.split_at(split);
        let col = column_index(letters)?;
        let row: u32 = digits
            .parse()
            .with_context(|| format!("Invalid row number in cell reference '{s}'"))?;
        if row == 0 {
            bail!("Row numbers start at 1, got cell reference '{s}'");
        }
        Ok(CellRef { row, col })
    }
}

/// Converts a 1-based column index into its letters, `1 -> A`, `27 -> AA`.
pub(crate) fn column_letters(col: u32) -> String {
    let mut n = col;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Converts column letters into a 1-based column index, `A -> 1`, `AA -> 27`. Lowercase letters
/// are accepted.
pub(crate) fn column_index(letters: &str) -> anyhow::Result<u32> {
    if letters.is_empty() {
        bail!("A column reference must have at least one letter");
    }
    let mut n: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            bail!("Column reference '{letters}' has illegal char '{c}'");
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A' + 1) as u32;
        n = n
            .checked_mul(26)
            .and_then(|n| n.checked_add(digit))
            .with_context(|| format!("Column reference '{letters}' is too large"))?;
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(11), "K");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(702), "ZZ");
        assert_eq!(column_letters(703), "AAA");
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A").unwrap(), 1);
        assert_eq!(column_index("k").unwrap(), 11);
        assert_eq!(column_index("AA").unwrap(), 27);
        assert_eq!(column_index("ZZ").unwrap(), 702);
        assert!(column_index("").is_err());
        assert!(column_index("A1").is_err());
    }

    #[test]
    fn test_cell_ref_display() {
        assert_eq!(CellRef::new(5, 2).to_string(), "B5");
        assert_eq!(CellRef::new(100, 28).to_string(), "AB100");
    }

    #[test]
    fn test_cell_ref_from_str() {
        let cell: CellRef = "B5".parse().unwrap();
        assert_eq!(cell, CellRef::new(5, 2));
        let cell: CellRef = " ab100 ".parse().unwrap();
        assert_eq!(cell, CellRef::new(100, 28));
    }

    #[test]
    fn test_cell_ref_from_str_invalid() {
        assert!("B".parse::<CellRef>().is_err());
        assert!("5".parse::<CellRef>().is_err());
        assert!("B0".parse::<CellRef>().is_err());
        assert!("B5x".parse::<CellRef>().is_err());
    }
}
