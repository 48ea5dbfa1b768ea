//! Order identifier codec.

use crate::{AllocatorError, AllocatorResult};
use std::fmt;
use std::str::FromStr;

/// Highest valid identifier index (`Z999`).
pub const MAX_ORDER_INDEX: u32 = 25_999;

/// Sequential order identifier: one letter `A`-`Z` plus a zero-padded
/// three-digit number (`A000`..`Z999`).
///
/// The index mapping is `(letter - 'A') * 1000 + number`, so lexicographic
/// order on the string form equals numeric order on the index. That is what
/// lets the allocator use `MAX(order_id)` on a TEXT column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderId {
    index: u32,
}

impl OrderId {
    /// Build from a raw index. Errors past [`MAX_ORDER_INDEX`].
    pub fn from_index(index: u32) -> AllocatorResult<Self> {
        if index > MAX_ORDER_INDEX {
            return Err(AllocatorError::InvalidId(format!(
                "index {index} out of range 0..={MAX_ORDER_INDEX}"
            )));
        }
        Ok(Self { index })
    }

    /// Parse the string form (`B017` → index 1017).
    pub fn parse(s: &str) -> AllocatorResult<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 {
            return Err(AllocatorError::InvalidId(s.to_string()));
        }
        let letter = bytes[0];
        if !letter.is_ascii_uppercase() {
            return Err(AllocatorError::InvalidId(s.to_string()));
        }
        if !bytes[1..].iter().all(|b| b.is_ascii_digit()) {
            return Err(AllocatorError::InvalidId(s.to_string()));
        }
        let number: u32 = s[1..]
            .parse()
            .map_err(|_| AllocatorError::InvalidId(s.to_string()))?;
        Ok(Self {
            index: u32::from(letter - b'A') * 1000 + number,
        })
    }

    /// Numeric index in `0..=MAX_ORDER_INDEX`.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The identifier after this one, if any remain.
    pub fn next(&self) -> Option<Self> {
        Self::from_index(self.index + 1).ok()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = (b'A' + (self.index / 1000) as u8) as char;
        write!(f, "{}{:03}", letter, self.index % 1000)
    }
}

impl FromStr for OrderId {
    type Err = AllocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Contiguous block of `count` identifiers following `max`.
///
/// With no existing maximum the block starts at `A000`. Errors with
/// [`AllocatorError::RangeExhausted`] when the block would pass `Z999`;
/// that error is fatal and must not be retried.
pub fn next_block(max: Option<OrderId>, count: usize) -> AllocatorResult<Vec<OrderId>> {
    let start = match max {
        Some(id) => id.index() + 1,
        None => 0,
    };

    let end = start as u64 + count as u64;
    if end > u64::from(MAX_ORDER_INDEX) + 1 {
        return Err(AllocatorError::RangeExhausted {
            start,
            needed: count,
        });
    }

    (start..start + count as u32)
        .map(OrderId::from_index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        for s in ["A000", "A999", "B000", "B017", "Z999"] {
            let id = OrderId::parse(s).unwrap();
            assert_eq!(id.to_string(), s);
        }
    }

    #[test]
    fn index_mapping() {
        assert_eq!(OrderId::parse("A000").unwrap().index(), 0);
        assert_eq!(OrderId::parse("A999").unwrap().index(), 999);
        assert_eq!(OrderId::parse("B000").unwrap().index(), 1000);
        assert_eq!(OrderId::parse("Z999").unwrap().index(), MAX_ORDER_INDEX);
    }

    #[test]
    fn lexicographic_order_matches_index_order() {
        let a999 = OrderId::parse("A999").unwrap();
        let b000 = OrderId::parse("B000").unwrap();
        assert!(a999 < b000);
        assert!("A999" < "B000");
    }

    #[test]
    fn rejects_malformed_ids() {
        for s in ["", "A00", "A0000", "a000", "1000", "AB00", "A0x0", "A-01"] {
            assert!(OrderId::parse(s).is_err(), "{s:?} should not parse");
        }
    }

    #[test]
    fn from_index_rejects_out_of_range() {
        assert!(OrderId::from_index(MAX_ORDER_INDEX).is_ok());
        assert!(OrderId::from_index(MAX_ORDER_INDEX + 1).is_err());
    }

    #[test]
    fn next_block_starts_at_a000_when_empty() {
        let block = next_block(None, 3).unwrap();
        let ids: Vec<String> = block.iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["A000", "A001", "A002"]);
    }

    #[test]
    fn next_block_continues_after_max() {
        let max = OrderId::parse("A998").unwrap();
        let block = next_block(Some(max), 3).unwrap();
        let ids: Vec<String> = block.iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["A999", "B000", "B001"]);
    }

    #[test]
    fn next_block_fills_to_the_last_id() {
        let max = OrderId::parse("Z997").unwrap();
        let block = next_block(Some(max), 2).unwrap();
        assert_eq!(block.last().unwrap().to_string(), "Z999");
    }

    #[test]
    fn next_block_past_the_end_is_exhausted() {
        let max = OrderId::parse("Z998").unwrap();
        let err = next_block(Some(max), 2).unwrap_err();
        assert!(matches!(err, AllocatorError::RangeExhausted { .. }));

        let max = OrderId::parse("Z999").unwrap();
        let err = next_block(Some(max), 1).unwrap_err();
        assert!(matches!(err, AllocatorError::RangeExhausted { .. }));
    }
}
