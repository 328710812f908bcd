use crate::diff::{self, DiffError};
use crate::fingerprint::FingerprintAlgorithm;
use crate::model::{NormalizedRecord, RawPair};

/// Builds the destination record for one raw pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    pub algorithm: FingerprintAlgorithm,
    pub context_lines: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            algorithm: FingerprintAlgorithm::Md5,
            context_lines: diff::DEFAULT_CONTEXT,
        }
    }
}

impl Normalizer {
    /// Fingerprints both sides and diffs `content_a` against `content_b`.
    ///
    /// A diff failure yields no record at all; the caller drops the pair.
    pub fn normalize(
        &self,
        pair: &RawPair,
        experiment_id: i64,
    ) -> Result<NormalizedRecord, DiffError> {
        let diff = diff::unified_diff_with_context(
            &pair.name_a,
            &pair.name_b,
            &pair.content_a,
            &pair.content_b,
            self.context_lines,
        )?;

        Ok(NormalizedRecord {
            name_a: pair.name_a.clone(),
            name_b: pair.name_b.clone(),
            hash_a: self.algorithm.digest(&pair.content_a),
            hash_b: self.algorithm.digest(&pair.content_b),
            content_a: pair.content_a.clone(),
            content_b: pair.content_b.clone(),
            diff,
            experiment_id,
        })
    }
}

/// [`Normalizer::normalize`] with MD5 fingerprints and 3 lines of context.
pub fn normalize(pair: &RawPair, experiment_id: i64) -> Result<NormalizedRecord, DiffError> {
    Normalizer::default().normalize(pair, experiment_id)
}
