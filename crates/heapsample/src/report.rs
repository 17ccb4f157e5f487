//! Snapshot of what [`crate::SamplingAllocator`] has sampled so far.

use std::fmt;

#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::alloc::MAX_THREAD_SLOTS;

/// Sampling totals for one thread slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct ThreadReport {
    pub slot: usize,
    pub samples: u64,
    /// Sum of sample weights.
    pub estimated_bytes: u64,
    /// Sum of the requested sizes of sampled allocations.
    pub requested_bytes: u64,
}

/// Sampling totals across all threads.
///
/// `estimated_bytes` is the unbiased estimate of everything allocated while
/// sampling was on. `requested_bytes` only covers the sampled allocations
/// themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct SamplingReport {
    pub sampling_interval: u64,
    pub samples: u64,
    pub estimated_bytes: u64,
    pub requested_bytes: u64,
    pub threads: Vec<ThreadReport>,
}

/// Collects the current statistics. Slots that never sampled are skipped.
pub fn report() -> SamplingReport {
    let threads = (0..MAX_THREAD_SLOTS).filter_map(|slot| {
        let (samples, estimated_bytes, requested_bytes) = crate::alloc::core::slot_stats(slot);
        (samples > 0).then_some(ThreadReport {
            slot,
            samples,
            estimated_bytes,
            requested_bytes,
        })
    });

    SamplingReport::from_threads(crate::alloc::sampling_interval(), threads)
}

impl SamplingReport {
    pub fn from_threads(
        sampling_interval: u64,
        threads: impl IntoIterator<Item = ThreadReport>,
    ) -> Self {
        let mut report = Self {
            sampling_interval,
            ..Self::default()
        };

        for thread in threads {
            report.samples = report.samples.saturating_add(thread.samples);
            report.estimated_bytes = report
                .estimated_bytes
                .saturating_add(thread.estimated_bytes);
            report.requested_bytes = report
                .requested_bytes
                .saturating_add(thread.requested_bytes);
            report.threads.push(thread);
        }

        report
    }

    #[cfg(feature = "json")]
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for SamplingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sampling_interval == 0 {
            writeln!(f, "[heapsample] sampling interval: off")?;
        } else {
            writeln!(
                f,
                "[heapsample] sampling interval: {}",
                format_bytes(self.sampling_interval)
            )?;
        }

        writeln!(
            f,
            "{:<8} {:>10} {:>14} {:>14}",
            "slot", "samples", "estimated", "sampled"
        )?;
        for thread in &self.threads {
            writeln!(
                f,
                "{:<8} {:>10} {:>14} {:>14}",
                thread.slot,
                thread.samples,
                format_bytes(thread.estimated_bytes),
                format_bytes(thread.requested_bytes)
            )?;
        }
        write!(
            f,
            "{:<8} {:>10} {:>14} {:>14}",
            "total",
            self.samples,
            format_bytes(self.estimated_bytes),
            format_bytes(self.requested_bytes)
        )
    }
}

/// Formats a byte count with binary units, e.g. `2048` as `2.0 KB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log(THRESHOLD).floor() as usize).min(UNITS.len() - 1);
    let unit_value = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", unit_value, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(slot: usize, samples: u64, estimated_bytes: u64) -> ThreadReport {
        ThreadReport {
            slot,
            samples,
            estimated_bytes,
            requested_bytes: estimated_bytes / 2,
        }
    }

    #[test]
    fn formats_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(1536 * 1024), "1.5 MB");
        assert_eq!(format_bytes(3 << 30), "3.0 GB");
    }

    #[test]
    fn sums_threads() {
        let report =
            SamplingReport::from_threads(4096, [thread(0, 3, 12_288), thread(5, 1, 4096)]);

        assert_eq!(report.sampling_interval, 4096);
        assert_eq!(report.samples, 4);
        assert_eq!(report.estimated_bytes, 16_384);
        assert_eq!(report.requested_bytes, 8192);
        assert_eq!(report.threads.len(), 2);
    }

    #[test]
    fn displays_table() {
        let report = SamplingReport::from_threads(4096, [thread(2, 3, 12_288)]);
        let text = report.to_string();

        assert!(text.contains("sampling interval: 4.0 KB"), "{text}");
        assert!(text.contains("12.0 KB"), "{text}");
        assert!(text.lines().last().unwrap().starts_with("total"), "{text}");
    }

    #[test]
    fn displays_disabled_interval() {
        let report = SamplingReport::from_threads(0, []);
        assert!(report.to_string().contains("sampling interval: off"));
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_round_trip() {
        let report = SamplingReport::from_threads(100, [thread(1, 2, 200)]);
        let json = report.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["sampling_interval"], 100);
        assert_eq!(value["threads"][0]["estimated_bytes"], 200);
    }
}
