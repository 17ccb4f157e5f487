use crate::sampler::Sampler;

/// Environment variable holding the sampling interval, e.g. `512KiB`.
pub const INTERVAL_ENV: &str = "HEAPSAMPLE_INTERVAL";

/// Startup configuration for allocation sampling.
///
/// # Examples
///
/// ```rust
/// use heapsample::SamplerConfig;
///
/// let config = SamplerConfig::default().with_sampling_interval(512 * 1024);
/// let sampler = config.sampler();
/// assert_eq!(sampler.sampling_interval(), 512 * 1024);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Average number of bytes between samples, 0 disables sampling.
    pub sampling_interval: u64,
}

impl SamplerConfig {
    /// Reads the configuration from `HEAPSAMPLE_INTERVAL`.
    ///
    /// Values that cannot be parsed are reported and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(INTERVAL_ENV) {
            match parse_byte_size(&raw) {
                Some(interval) => config.sampling_interval = interval,
                None => tracing::warn!(
                    value = %raw,
                    "ignoring invalid {INTERVAL_ENV}, expected a byte count such as 4096 or 512KiB"
                ),
            }
        }

        config
    }

    #[must_use]
    pub fn with_sampling_interval(mut self, sampling_interval: u64) -> Self {
        self.sampling_interval = sampling_interval;
        self
    }

    /// Builds a sampler seeded from OS entropy with this configuration applied.
    pub fn sampler(&self) -> Sampler {
        let mut sampler = Sampler::new();
        sampler.set_sampling_interval(self.sampling_interval);
        sampler
    }

    /// Applies the interval to every thread served by [`crate::SamplingAllocator`].
    pub fn apply(&self) {
        crate::alloc::set_sampling_interval(self.sampling_interval);
    }
}

/// Parses a byte count with an optional binary unit suffix.
///
/// `K`, `KB` and `KiB` all mean 1024 bytes; the same goes for `M` and `G`.
/// Units are case-insensitive and may be separated from the number by
/// whitespace.
pub fn parse_byte_size(value: &str) -> Option<u64> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let count: u64 = digits.parse().ok()?;

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1 << 10,
        "m" | "mb" | "mib" => 1 << 20,
        "g" | "gb" | "gib" => 1 << 30,
        _ => return None,
    };

    count.checked_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_suffixed_sizes() {
        assert_eq!(parse_byte_size("0"), Some(0));
        assert_eq!(parse_byte_size("4096"), Some(4096));
        assert_eq!(parse_byte_size(" 128 "), Some(128));
        assert_eq!(parse_byte_size("64b"), Some(64));
        assert_eq!(parse_byte_size("512K"), Some(512 * 1024));
        assert_eq!(parse_byte_size("512 KiB"), Some(512 * 1024));
        assert_eq!(parse_byte_size("2mb"), Some(2 * 1024 * 1024));
        assert_eq!(parse_byte_size("1GiB"), Some(1 << 30));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_byte_size(""), None);
        assert_eq!(parse_byte_size("KiB"), None);
        assert_eq!(parse_byte_size("-1"), None);
        assert_eq!(parse_byte_size("1.5M"), None);
        assert_eq!(parse_byte_size("12 parsecs"), None);
        assert_eq!(parse_byte_size("99999999999999999999"), None);
        assert_eq!(parse_byte_size("17179869184G"), None);
    }

    #[test]
    fn from_env_defaults_to_disabled() {
        temp_env::with_var_unset(INTERVAL_ENV, || {
            assert_eq!(SamplerConfig::from_env(), SamplerConfig::default());
            assert_eq!(SamplerConfig::from_env().sampling_interval, 0);
        });
    }

    #[test]
    fn from_env_reads_interval() {
        temp_env::with_var(INTERVAL_ENV, Some("256KiB"), || {
            assert_eq!(SamplerConfig::from_env().sampling_interval, 256 * 1024);
        });
    }

    #[test]
    fn from_env_ignores_invalid_interval() {
        temp_env::with_var(INTERVAL_ENV, Some("lots"), || {
            assert_eq!(SamplerConfig::from_env().sampling_interval, 0);
        });
    }

    #[test]
    fn sampler_uses_configured_interval() {
        let sampler = SamplerConfig::default()
            .with_sampling_interval(4096)
            .sampler();
        assert!(sampler.is_active());
        assert_eq!(sampler.sampling_interval(), 4096);
    }
}
