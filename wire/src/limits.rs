//! Configurable limits for bounded frame handling.

/// Wire-level limits for frame encoding and decoding.
///
/// These bound what a single frame may carry. Limits on decoded payload
/// contents (array counts, string lengths) belong to the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum frame size in bytes, header included.
    pub max_frame_bytes: usize,

    /// Maximum text length of one string update in bytes.
    pub max_string_update_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_bytes: 64 * 1024,
            max_string_update_bytes: 1024,
        }
    }
}

impl Limits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_frame_bytes: 4096,
            max_string_update_bytes: 256,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_frame_bytes: usize::MAX,
            max_string_update_bytes: usize::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_frame_bytes() {
        let limits = Limits::default();
        assert_eq!(limits.max_frame_bytes, 64 * 1024);
        assert!(limits.max_string_update_bytes < limits.max_frame_bytes);
    }

    #[test]
    fn testing_limits_smaller() {
        let test_limits = Limits::for_testing();
        let default_limits = Limits::default();

        assert!(test_limits.max_frame_bytes < default_limits.max_frame_bytes);
        assert!(test_limits.max_string_update_bytes < default_limits.max_string_update_bytes);
    }

    #[test]
    fn unlimited_limits() {
        let limits = Limits::unlimited();
        assert_eq!(limits.max_frame_bytes, usize::MAX);
        assert_eq!(limits.max_string_update_bytes, usize::MAX);
    }

    #[test]
    fn limits_const_constructible() {
        const LIMITS: Limits = Limits::for_testing();
        assert_eq!(LIMITS.max_frame_bytes, 4096);
    }
}
