use serde::ser::{Serialize, SerializeMap, Serializer};

use super::BinSpec;

/// Name of the first bucket whose `(lower, upper]` interval holds `size`,
/// where `lower` is the previous bucket's upper bound (0 for the first).
///
/// Sizes of 0 or below belong to no bucket.
pub fn compute_bin(bins: &[BinSpec], size: i64) -> Option<&str> {
    let mut lower = 0i64;
    for bin in bins {
        let fits_upper = bin.upper.map_or(true, |upper| size <= upper);
        if size > lower && fits_upper {
            return Some(&bin.name);
        }
        match bin.upper {
            Some(upper) => lower = upper,
            None => break,
        }
    }
    None
}

/// Per-bucket counters, kept in configuration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BinCounts(Vec<(String, u32)>);

impl BinCounts {
    pub fn zeroed(bins: &[BinSpec]) -> Self {
        BinCounts(bins.iter().map(|b| (b.name.clone(), 0)).collect())
    }

    pub fn increment(&mut self, name: &str) {
        if let Some((_, count)) = self.0.iter_mut().find(|(n, _)| n == name) {
            *count += 1;
        }
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, c)| *c)
    }

    pub fn total(&self) -> u32 {
        self.0.iter().map(|(_, c)| c).sum()
    }
}

impl Serialize for BinCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, count) in &self.0 {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureConfig;

    fn bins() -> Vec<BinSpec> {
        FeatureConfig::default().bins
    }

    #[test]
    fn bucket_edges() {
        let b = bins();
        assert_eq!(compute_bin(&b, 1), Some("bin_≤26"));
        assert_eq!(compute_bin(&b, 26), Some("bin_≤26"));
        assert_eq!(compute_bin(&b, 27), Some("bin_27_500"));
        assert_eq!(compute_bin(&b, 100), Some("bin_27_500"));
        assert_eq!(compute_bin(&b, 500), Some("bin_27_500"));
        assert_eq!(compute_bin(&b, 501), Some("bin_501_5000"));
        assert_eq!(compute_bin(&b, 5000), Some("bin_501_5000"));
        assert_eq!(compute_bin(&b, 5001), Some("bin_5001_1e6"));
        assert_eq!(compute_bin(&b, 1_000_000), Some("bin_5001_1e6"));
        assert_eq!(compute_bin(&b, 1_000_001), Some("bin_large"));
        assert_eq!(compute_bin(&b, i64::MAX), Some("bin_large"));
    }

    #[test]
    fn non_positive_sizes_are_unclassified() {
        let b = bins();
        assert_eq!(compute_bin(&b, 0), None);
        assert_eq!(compute_bin(&b, -8), None);
        assert_eq!(compute_bin(&b, i64::MIN), None);
    }

    #[test]
    fn counters_ignore_unknown_names() {
        let b = bins();
        let mut counts = BinCounts::zeroed(&b);
        counts.increment("bin_large");
        counts.increment("bin_large");
        counts.increment("bin_nonexistent");
        assert_eq!(counts.get("bin_large"), Some(2));
        assert_eq!(counts.get("bin_≤26"), Some(0));
        assert_eq!(counts.total(), 2);
    }

    #[test]
    fn serializes_as_ordered_map() {
        let counts = BinCounts::zeroed(&bins());
        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(
            json,
            r#"{"bin_≤26":0,"bin_27_500":0,"bin_501_5000":0,"bin_5001_1e6":0,"bin_large":0}"#
        );
    }
}
