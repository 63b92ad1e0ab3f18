use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::features::extract_features;
use crate::loader::load_samples;
use crate::registry::{normalize_key, Registry};
use crate::simplify::{simplify, RENDER_EPSILON};
use crate::stroke::partition;
use crate::{Curve, CurveMetadata, Params};

#[derive(Clone, Debug)]
pub struct SourceFile {
    pub identity: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(identity: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            text: text.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessedCurve {
    pub key: String,
    pub source: String,
    pub curve: Curve,
    pub metadata: CurveMetadata,
}

#[derive(Clone, Debug)]
pub struct BatchOutput {
    pub curves: Vec<ProcessedCurve>,
    pub registry: Registry,
}

pub fn process_source(source: &SourceFile, params: &Params) -> ProcessedCurve {
    let samples = load_samples(&source.text, params);
    let strokes = partition(&samples);
    let metadata = extract_features(&strokes.downstroke);
    let curve = Curve {
        downstroke: simplify(&strokes.downstroke, RENDER_EPSILON),
        upstroke: simplify(&strokes.upstroke, RENDER_EPSILON),
    };
    debug!(
        source = %source.identity,
        samples = samples.len(),
        kept = curve.downstroke.len() + curve.upstroke.len(),
        tactile = metadata.is_tactile,
        "processed curve"
    );
    ProcessedCurve {
        key: normalize_key(&source.identity),
        source: source.identity.clone(),
        curve,
        metadata,
    }
}

pub fn process_batch(sources: &[SourceFile], params: &Params) -> Vec<ProcessedCurve> {
    sources
        .par_iter()
        .map(|source| process_source(source, params))
        .collect()
}

pub fn run_batch(sources: &[SourceFile], params: &Params) -> BatchOutput {
    let curves = process_batch(sources, params);
    let registry = Registry::from_processed(&curves);
    BatchOutput { curves, registry }
}
