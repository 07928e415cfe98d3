//! Width ladder for self-describing adaptive numbers.
//!
//! An adaptive number is a unary level prefix followed by a payload. Level `k`
//! is written as `k` one-bits and a terminating zero-bit (the last level has no
//! terminator), then `ADAPTIVE_WIDTHS[k]` payload bits, MSB first.

/// Payload widths, smallest first. Encoder and decoder must agree on this table.
pub const ADAPTIVE_WIDTHS: [u8; 8] = [4, 8, 12, 16, 24, 32, 48, 64];

const LAST_LEVEL: usize = ADAPTIVE_WIDTHS.len() - 1;

/// Returns the smallest ladder level whose payload can hold `value`.
pub(crate) const fn level_for(value: u64) -> usize {
    let mut level = 0;
    while level < LAST_LEVEL {
        if value < (1u64 << ADAPTIVE_WIDTHS[level]) {
            return level;
        }
        level += 1;
    }
    LAST_LEVEL
}

/// Number of prefix bits used by `level`.
pub(crate) const fn prefix_bits(level: usize) -> usize {
    if level == LAST_LEVEL {
        level
    } else {
        level + 1
    }
}

/// Returns `true` if `level` is the last rung, which has no terminator bit.
pub(crate) const fn is_last_level(level: usize) -> bool {
    level == LAST_LEVEL
}

/// Returns the exact number of bits an adaptive number for `value` occupies.
#[must_use]
pub const fn adaptive_bit_count(value: u64) -> usize {
    let level = level_for(value);
    prefix_bits(level) + ADAPTIVE_WIDTHS[level] as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values_use_first_rung() {
        assert_eq!(level_for(0), 0);
        assert_eq!(level_for(15), 0);
        assert_eq!(adaptive_bit_count(0), 5);
        assert_eq!(adaptive_bit_count(15), 5);
    }

    #[test]
    fn rung_boundaries() {
        assert_eq!(level_for(16), 1);
        assert_eq!(level_for(255), 1);
        assert_eq!(level_for(256), 2);
        assert_eq!(adaptive_bit_count(16), 10);
        assert_eq!(adaptive_bit_count(256), 15);
        assert_eq!(adaptive_bit_count(u64::from(u32::MAX)), 38);
    }

    #[test]
    fn last_rung_has_no_terminator() {
        assert_eq!(level_for(u64::MAX), LAST_LEVEL);
        assert_eq!(adaptive_bit_count(u64::MAX), LAST_LEVEL + 64);
    }
}
