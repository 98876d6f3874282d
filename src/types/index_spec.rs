//! Selection of positions within the entry list of one key.
//!
//! Grammar: items separated by commas and/or whitespace. An item is an index
//! `i` or an inclusive range `i:j`. Indices are 1-based; negative indices
//! count from the end, so `-1` is the last entry. `0` is not an index.

use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::ExplError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Item {
    Single(i64),
    Range(i64, i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexSpec {
    items: Vec<Item>,
}

impl IndexSpec {
    /// Selects every entry.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_all(&self) -> bool {
        self.items.is_empty()
    }

    /// 0-based positions selected in a list of `len` entries, ascending and
    /// without duplicates. Items outside the list are ignored.
    pub fn select(&self, len: usize) -> Vec<usize> {
        if self.is_all() {
            return (0..len).collect();
        }

        let len = i64::try_from(len).unwrap_or(i64::MAX);
        let one_based = |i: i64| if i < 0 { len + 1 + i } else { i };

        let mut picked = BTreeSet::new();
        for item in &self.items {
            let (lo, hi) = match *item {
                Item::Single(i) => (one_based(i), one_based(i)),
                Item::Range(i, j) => (one_based(i), one_based(j)),
            };
            for pos in lo.max(1)..=hi.min(len) {
                if let Ok(pos) = usize::try_from(pos - 1) {
                    picked.insert(pos);
                }
            }
        }
        picked.into_iter().collect()
    }
}

impl FromStr for IndexSpec {
    type Err = ExplError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let items = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(parse_item)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { items })
    }
}

fn parse_item(part: &str) -> Result<Item, ExplError> {
    match part.split_once(':') {
        Some((from, to)) => Ok(Item::Range(parse_index(from)?, parse_index(to)?)),
        None => Ok(Item::Single(parse_index(part)?)),
    }
}

fn parse_index(s: &str) -> Result<i64, ExplError> {
    match s.parse::<i64>() {
        Ok(0) | Err(_) => Err(ExplError::InvalidInput(format!("invalid index: {s:?}"))),
        Ok(i) => Ok(i),
    }
}
