//! Limits for codec-level decoding and dictionaries.

/// Codec-specific limits enforced while decoding payloads and growing dictionaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecLimits {
    /// Maximum element count of a decoded array, on top of any `maxCount`.
    pub max_array_count: usize,
    /// Maximum byte length of a decoded string, on top of any `maxLength`.
    pub max_string_length: usize,
    /// Maximum number of segments in a path.
    pub max_path_depth: usize,
    /// Maximum number of entries in each dictionary table.
    pub max_dictionary_entries: usize,
    /// Maximum number of nested structures entered while decoding one value.
    pub max_nesting_depth: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_array_count: 4096,
            max_string_length: 16 * 1024,
            max_path_depth: 32,
            max_dictionary_entries: usize::from(u16::MAX),
            max_nesting_depth: 64,
        }
    }
}

impl CodecLimits {
    /// Nesting depth used by [`unlimited`](Self::unlimited).
    pub const MAX_NESTING_DEPTH: usize = 256;

    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_array_count: 64,
            max_string_length: 256,
            max_path_depth: 8,
            max_dictionary_entries: 128,
            max_nesting_depth: 16,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    ///
    /// Frame headers carry 16-bit ids, so dictionaries still stop at `u16::MAX` entries on send.
    /// Nesting stays bounded at [`MAX_NESTING_DEPTH`](Self::MAX_NESTING_DEPTH), since
    /// decoding recurses once per nested structure.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_array_count: usize::MAX,
            max_string_length: usize::MAX,
            max_path_depth: usize::MAX,
            max_dictionary_entries: usize::MAX,
            max_nesting_depth: Self::MAX_NESTING_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dictionary_fits_frame_ids() {
        let limits = CodecLimits::default();
        assert!(limits.max_dictionary_entries <= usize::from(u16::MAX));
    }

    #[test]
    fn testing_limits_smaller() {
        let test_limits = CodecLimits::for_testing();
        let default_limits = CodecLimits::default();
        assert!(test_limits.max_array_count < default_limits.max_array_count);
        assert!(test_limits.max_string_length < default_limits.max_string_length);
        assert!(test_limits.max_path_depth < default_limits.max_path_depth);
        assert!(test_limits.max_dictionary_entries < default_limits.max_dictionary_entries);
        assert!(test_limits.max_nesting_depth < default_limits.max_nesting_depth);
    }

    #[test]
    fn unlimited_limits() {
        let limits = CodecLimits::unlimited();
        assert_eq!(limits.max_array_count, usize::MAX);
        assert_eq!(limits.max_path_depth, usize::MAX);
        assert_eq!(limits.max_nesting_depth, CodecLimits::MAX_NESTING_DEPTH);
    }
}
