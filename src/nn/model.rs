use super::evaluator::Evaluator;
use super::evaluator::Prediction;
use super::features::PLANES;
use anyhow::Context;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;

/// model.json: topology description plus the weight blob manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub board_size: usize,
    pub hidden: usize,
    pub weights: Vec<String>,
}

/// the reference evaluator backend: a two-head affine network over the
/// three input planes (hidden ReLU layer, softmax policy head, tanh value
/// head). it exists so the pipeline runs end-to-end and doubles as the
/// model factory for first-cycle bootstrap; any backend satisfying the
/// Evaluator contract can stand in for it.
pub struct NetModel {
    manifest: Manifest,
    w1: Vec<f32>,
    b1: Vec<f32>,
    wp: Vec<f32>,
    bp: Vec<f32>,
    wv: Vec<f32>,
    bv: f32,
    fingerprint: String,
}

impl NetModel {
    const DEFAULT_HIDDEN: usize = 64;

    fn input(&self) -> usize {
        self.manifest.board_size * self.manifest.board_size * PLANES
    }
    fn output(&self) -> usize {
        self.manifest.board_size * self.manifest.board_size
    }

    fn expected_floats(manifest: &Manifest) -> usize {
        let n2 = manifest.board_size * manifest.board_size;
        let input = n2 * PLANES;
        let hidden = manifest.hidden;
        hidden * input + hidden + n2 * hidden + n2 + hidden + 1
    }

    /// load manifest + weight blobs from a model directory
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let manifest_path = dir.join("model.json");
        let manifest: Manifest = serde_json::from_str(
            &std::fs::read_to_string(&manifest_path)
                .with_context(|| format!("read {}", manifest_path.display()))?,
        )
        .context("parse model.json")?;
        let mut bytes = Vec::new();
        for blob in &manifest.weights {
            bytes.extend(
                std::fs::read(dir.join(blob)).with_context(|| format!("read weight blob {}", blob))?,
            );
        }
        let floats = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect::<Vec<_>>();
        if floats.len() != Self::expected_floats(&manifest) {
            return Err(anyhow::anyhow!(
                "weight count mismatch: have {}, topology wants {}",
                floats.len(),
                Self::expected_floats(&manifest)
            ));
        }
        let fingerprint = fingerprint(&bytes);
        Ok(Self::assemble(manifest, floats, fingerprint))
    }

    fn assemble(manifest: Manifest, floats: Vec<f32>, fingerprint: String) -> Self {
        let n2 = manifest.board_size * manifest.board_size;
        let input = n2 * PLANES;
        let hidden = manifest.hidden;
        let mut cursor = floats.into_iter();
        let mut chunk = |len: usize| cursor.by_ref().take(len).collect::<Vec<_>>();
        let w1 = chunk(hidden * input);
        let b1 = chunk(hidden);
        let wp = chunk(n2 * hidden);
        let bp = chunk(n2);
        let wv = chunk(hidden);
        let bv = chunk(1)[0];
        Self {
            manifest,
            w1,
            b1,
            wp,
            bp,
            wv,
            bv,
            fingerprint,
        }
    }

    /// the model factory: a seeded, randomly-initialized instance
    pub fn random(board_size: usize, seed: u64) -> Self {
        let manifest = Manifest {
            version: 1,
            board_size,
            hidden: Self::DEFAULT_HIDDEN,
            weights: vec!["weights.bin".into()],
        };
        let mut rng = SmallRng::seed_from_u64(seed);
        let count = Self::expected_floats(&manifest);
        let scale = 1.0 / (manifest.hidden as f32).sqrt();
        let floats = (0..count)
            .map(|_| rng.random_range(-scale..scale))
            .collect::<Vec<f32>>();
        let bytes = floats
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect::<Vec<u8>>();
        let print = fingerprint(&bytes);
        Self::assemble(manifest, floats, print)
    }

    /// write manifest + weights into a model directory
    pub fn save(&self, dir: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(dir)?;
        let floats = self
            .w1
            .iter()
            .chain(self.b1.iter())
            .chain(self.wp.iter())
            .chain(self.bp.iter())
            .chain(self.wv.iter())
            .chain(std::iter::once(&self.bv));
        let bytes = floats.flat_map(|f| f.to_le_bytes()).collect::<Vec<u8>>();
        std::fs::write(dir.join("weights.bin"), &bytes)?;
        std::fs::write(
            dir.join("model.json"),
            serde_json::to_string_pretty(&self.manifest)?,
        )?;
        Ok(())
    }

    /// bootstrap a fresh model directory when none exists yet
    pub fn bootstrap(dir: &Path, board_size: usize) -> anyhow::Result<Self> {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time moves slow")
            .as_nanos() as u64;
        let model = Self::random(board_size, seed);
        model.save(dir)?;
        log::info!("bootstrapped fresh model at {}", dir.display());
        Ok(model)
    }

    /// modification time of the manifest, for staleness checks
    pub fn mtime(dir: &Path) -> Option<std::time::SystemTime> {
        std::fs::metadata(dir.join("model.json"))
            .and_then(|m| m.modified())
            .ok()
    }

    fn forward(&self, input: &[f32]) -> Prediction {
        let hidden = self.manifest.hidden;
        let width = self.input();
        let mut h = vec![0.0f32; hidden];
        for (j, unit) in h.iter_mut().enumerate() {
            let row = &self.w1[j * width..(j + 1) * width];
            let mut sum = self.b1[j];
            for (w, x) in row.iter().zip(input.iter()) {
                sum += w * x;
            }
            *unit = sum.max(0.0);
        }
        let out = self.output();
        let mut logits = vec![0.0f32; out];
        for (i, logit) in logits.iter_mut().enumerate() {
            let row = &self.wp[i * hidden..(i + 1) * hidden];
            let mut sum = self.bp[i];
            for (w, x) in row.iter().zip(h.iter()) {
                sum += w * x;
            }
            *logit = sum;
        }
        let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let mut policy = logits.iter().map(|l| (l - max).exp()).collect::<Vec<_>>();
        let denom = policy.iter().sum::<f32>();
        for p in policy.iter_mut() {
            *p /= denom;
        }
        let mut value = self.bv;
        for (w, x) in self.wv.iter().zip(h.iter()) {
            value += w * x;
        }
        Prediction {
            policy,
            value: value.tanh(),
        }
    }
}

impl Evaluator for NetModel {
    fn board_size(&self) -> usize {
        self.manifest.board_size
    }
    fn fingerprint(&self) -> String {
        self.fingerprint.clone()
    }
    fn predict(&self, batch: &[Vec<f32>]) -> Vec<Prediction> {
        batch.iter().map(|input| self.forward(input)).collect()
    }
}

/// FNV-1a over the weight bytes, hex encoded
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hash = 0xcbf29ce484222325u64;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    format!("{:016x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_is_a_distribution() {
        let model = NetModel::random(15, 42);
        let input = vec![0.0; 15 * 15 * 3];
        let prediction = model.forward(&input);
        assert_eq!(prediction.policy.len(), 225);
        let sum = prediction.policy.iter().sum::<f32>();
        assert!((sum - 1.0).abs() < 1e-4);
        assert!(prediction.value >= -1.0 && prediction.value <= 1.0);
    }

    #[test]
    fn save_load_roundtrip_preserves_fingerprint() {
        let dir = std::env::temp_dir().join(format!("gomokuzero-model-{}", std::process::id()));
        let model = NetModel::random(15, 7);
        model.save(&dir).unwrap();
        let loaded = NetModel::load(&dir).unwrap();
        assert_eq!(loaded.fingerprint(), model.fingerprint());
        assert_eq!(loaded.board_size(), 15);
        let input = vec![1.0; 15 * 15 * 3];
        let a = model.forward(&input);
        let b = loaded.forward(&input);
        assert!((a.value - b.value).abs() < 1e-6);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn same_seed_same_weights() {
        let a = NetModel::random(15, 123);
        let b = NetModel::random(15, 123);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
