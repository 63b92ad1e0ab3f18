use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::pipeline::ProcessedCurve;
use crate::CurveMetadata;

const BOILERPLATE: [&str; 3] = ["raw data csv", "raw data", "force curve"];

pub fn normalize_key(identity: &str) -> String {
    let name = identity.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(identity);
    let stem = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    };
    let words: String = stem
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let mut padded = format!(" {} ", words.split_whitespace().collect::<Vec<_>>().join(" "));
    for phrase in BOILERPLATE {
        let needle = format!(" {phrase} ");
        while padded.contains(&needle) {
            padded = padded.replace(&needle, " ");
        }
    }
    let slug = padded.split_whitespace().collect::<Vec<_>>().join("-");
    if slug.is_empty() {
        "unnamed".to_string()
    } else {
        slug
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyCollision {
    pub key: String,
    pub kept: String,
    pub dropped: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Registry {
    entries: BTreeMap<String, CurveMetadata>,
    sources: BTreeMap<String, String>,
    collisions: Vec<KeyCollision>,
}

impl Registry {
    pub fn from_processed(curves: &[ProcessedCurve]) -> Self {
        let mut registry = Self::default();
        for curve in curves {
            registry.insert(&curve.key, &curve.source, curve.metadata);
        }
        registry
    }

    pub fn from_entries(entries: BTreeMap<String, CurveMetadata>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    pub fn insert(&mut self, key: &str, source: &str, metadata: CurveMetadata) -> bool {
        if self.entries.contains_key(key) {
            let kept = self.sources.get(key).cloned().unwrap_or_default();
            warn!(key, kept = %kept, dropped = source, "duplicate registry key, keeping first");
            self.collisions.push(KeyCollision {
                key: key.to_string(),
                kept,
                dropped: source.to_string(),
            });
            return false;
        }
        self.entries.insert(key.to_string(), metadata);
        self.sources.insert(key.to_string(), source.to_string());
        true
    }

    pub fn get(&self, key: &str) -> Option<&CurveMetadata> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn source_of(&self, key: &str) -> Option<&str> {
        self.sources.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, CurveMetadata> {
        &self.entries
    }

    pub fn collisions(&self) -> &[KeyCollision] {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn key_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for key in self.entries.keys() {
            hasher.update(key.as_bytes());
            hasher.update([0u8]);
        }
        let digest = hasher.finalize();
        let mut out = String::with_capacity(digest.len() * 2);
        for b in digest {
            use std::fmt::Write;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Curve, Point};

    fn processed(source: &str, force: f64) -> ProcessedCurve {
        ProcessedCurve {
            key: normalize_key(source),
            source: source.to_string(),
            curve: Curve::default(),
            metadata: CurveMetadata {
                bottom_out: Point::new(3.6, force),
                ..CurveMetadata::default()
            },
        }
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(
            normalize_key("data/Cherry MX Black/Cherry MX Black Raw Data CSV.csv"),
            "cherry-mx-black"
        );
        assert_eq!(
            normalize_key(r"C:\curves\Gateron_Yellow  (Force Curve).CSV"),
            "gateron-yellow"
        );
        assert_eq!(normalize_key("Kailh Box Jade"), "kailh-box-jade");
        assert_eq!(normalize_key("  Raw Data.csv"), "unnamed");
        assert_eq!(normalize_key("raw-dataset.csv"), "raw-dataset");
    }

    #[test]
    fn test_first_registration_wins() {
        let curves = vec![
            processed("a/Holy Panda Raw Data CSV.csv", 60.0),
            processed("b/Holy Panda.csv", 70.0),
            processed("Boba U4T.csv", 62.0),
        ];
        let registry = Registry::from_processed(&curves);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("holy-panda").map(|m| m.bottom_out.y), Some(60.0));
        assert_eq!(
            registry.source_of("holy-panda"),
            Some("a/Holy Panda Raw Data CSV.csv")
        );
        assert_eq!(registry.collisions().len(), 1);
        assert_eq!(registry.collisions()[0].dropped, "b/Holy Panda.csv");
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["boba-u4t", "holy-panda"]);
    }

    #[test]
    fn test_fingerprint_tracks_key_set_only() {
        let a = Registry::from_processed(&[processed("x.csv", 1.0), processed("y.csv", 2.0)]);
        let b = Registry::from_processed(&[processed("y.csv", 9.0), processed("x.csv", 8.0)]);
        let c = Registry::from_processed(&[processed("x.csv", 1.0)]);
        assert_eq!(a.key_fingerprint(), b.key_fingerprint());
        assert_ne!(a.key_fingerprint(), c.key_fingerprint());
        assert_eq!(a.key_fingerprint().len(), 64);
    }

    #[test]
    fn test_entries_round_trip_through_json() {
        let registry = Registry::from_processed(&[processed("Alpaca V2.csv", 62.0)]);
        let json = serde_json::to_string(registry.entries()).unwrap();
        let restored = Registry::from_entries(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.entries(), registry.entries());
        assert!(restored.contains_key("alpaca-v2"));
    }
}
