use anyhow::Context;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// pipeline phases as they appear in the status document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    SelfPlay,
    Distill,
    Arena,
    Upload,
    BookImport,
}

/// the single JSON status document. updates are read-modify-write deep
/// merges, written atomically (tmp + rename), with this process as the
/// single writer.
pub struct StatusFile {
    path: String,
}

impl StatusFile {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }

    pub fn read(&self) -> Value {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_else(|| Value::Object(Default::default()))
    }

    /// merge a partial update into the document without erasing siblings
    pub fn merge(&self, patch: Value) -> anyhow::Result<Value> {
        let mut current = self.read();
        deep_merge(&mut current, patch);
        if let Some(fields) = current.as_object_mut() {
            fields.insert("ts".into(), Value::from(millis()));
        }
        let tmp = format!("{}.tmp", self.path);
        std::fs::write(&tmp, serde_json::to_string_pretty(&current)?)
            .with_context(|| format!("write {}", tmp))?;
        std::fs::rename(&tmp, &self.path).context("install status document")?;
        Ok(current)
    }
}

/// objects merge key by key, recursively; everything else replaces
pub fn deep_merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                if base.contains_key(&key) {
                    deep_merge(base.get_mut(&key).expect("present"), value);
                } else {
                    base.insert(key, value);
                }
            }
        }
        (base, patch) => *base = patch,
    }
}

fn millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_merge_keeps_siblings() {
        let mut base = json!({
            "phase": "self_play",
            "selfplay": { "games": 10, "samples": 300 },
            "arena": { "winrate": 0.5 }
        });
        deep_merge(
            &mut base,
            json!({ "selfplay": { "games": 11 }, "phase": "arena" }),
        );
        assert_eq!(base["selfplay"]["games"], 11);
        assert_eq!(base["selfplay"]["samples"], 300);
        assert_eq!(base["arena"]["winrate"], 0.5);
        assert_eq!(base["phase"], "arena");
    }

    #[test]
    fn scalars_replace_wholesale() {
        let mut base = json!({ "error": "selfplay: disk full" });
        deep_merge(&mut base, json!({ "error": null }));
        assert_eq!(base["error"], Value::Null);
    }

    #[test]
    fn file_updates_are_cumulative() {
        let path = std::env::temp_dir()
            .join(format!("gomokuzero-status-{}.json", std::process::id()))
            .to_string_lossy()
            .into_owned();
        std::fs::remove_file(&path).ok();
        let status = StatusFile::new(&path);
        status.merge(json!({ "cycle": 1, "selfplay": { "games": 4 } })).unwrap();
        let merged = status
            .merge(json!({ "selfplay": { "samples": 120 } }))
            .unwrap();
        assert_eq!(merged["cycle"], 1);
        assert_eq!(merged["selfplay"]["games"], 4);
        assert_eq!(merged["selfplay"]["samples"], 120);
        assert!(merged["ts"].as_u64().is_some());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn phases_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&Phase::SelfPlay).unwrap(),
            "\"self_play\""
        );
        assert_eq!(
            serde_json::to_string(&Phase::BookImport).unwrap(),
            "\"book_import\""
        );
    }
}
