use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::pipeline::ProcessedCurve;
use crate::registry::Registry;
use crate::FcError;

pub trait CurveSource {
    fn fetch(&self, key: &str) -> Result<Option<ProcessedCurve>, FcError>;
}

#[derive(Clone, Debug)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl CurveSource for DirSource {
    fn fetch(&self, key: &str) -> Result<Option<ProcessedCurve>, FcError> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl CurveSource for BTreeMap<String, ProcessedCurve> {
    fn fetch(&self, key: &str) -> Result<Option<ProcessedCurve>, FcError> {
        Ok(self.get(key).cloned())
    }
}

pub struct CurveStore<S> {
    source: S,
    keys: BTreeSet<String>,
    fingerprint: String,
    loaded: HashMap<String, Arc<ProcessedCurve>>,
}

impl<S: CurveSource> CurveStore<S> {
    pub fn new(source: S, registry: &Registry) -> Self {
        Self {
            source,
            keys: registry.keys().map(str::to_string).collect(),
            fingerprint: registry.key_fingerprint(),
            loaded: HashMap::new(),
        }
    }

    pub fn sync(&mut self, registry: &Registry) -> bool {
        let fingerprint = registry.key_fingerprint();
        if fingerprint == self.fingerprint {
            return false;
        }
        debug!(
            old = %self.fingerprint,
            new = %fingerprint,
            dropped = self.loaded.len(),
            "registry key set changed, clearing curve cache"
        );
        self.keys = registry.keys().map(str::to_string).collect();
        self.fingerprint = fingerprint;
        self.loaded.clear();
        true
    }

    pub fn get(&mut self, key: &str) -> Result<Arc<ProcessedCurve>, FcError> {
        if let Some(curve) = self.loaded.get(key) {
            return Ok(Arc::clone(curve));
        }
        if !self.keys.contains(key) {
            return Err(FcError::FileNotFound(format!("no registry entry for '{key}'")));
        }
        let curve = self
            .source
            .fetch(key)?
            .ok_or_else(|| FcError::FileNotFound(format!("no curve record for '{key}'")))?;
        let curve = Arc::new(curve);
        self.loaded.insert(key.to_string(), Arc::clone(&curve));
        Ok(curve)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn cached_len(&self) -> usize {
        self.loaded.len()
    }
}
