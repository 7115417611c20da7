use super::sample::Sample;
use anyhow::Context;
use rand::Rng;
use std::path::PathBuf;

/// the replay buffer: a directory of append-only JSONL files. each flush
/// closes one immutable file whose name sorts after every earlier one
/// (millisecond timestamp, random suffix, flush counter), so no two
/// writers ever collide. a failed flush keeps its samples for the next
/// interval.
pub struct ReplayBuffer {
    dir: PathBuf,
    pending: Vec<Sample>,
    flushes: usize,
}

impl ReplayBuffer {
    pub fn new(dir: &str) -> Self {
        Self {
            dir: PathBuf::from(dir),
            pending: Vec::new(),
            flushes: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn extend(&mut self, samples: Vec<Sample>) {
        self.pending.extend(samples);
    }

    /// write everything pending into one fresh file. returns how many
    /// samples went out; on error the pending samples are retained.
    pub fn flush(&mut self) -> anyhow::Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let lines = self
            .pending
            .iter()
            .map(|s| s.encode())
            .collect::<Result<Vec<_>, _>>()
            .context("encode replay samples")?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create replay dir {}", self.dir.display()))?;
        let path = self.dir.join(self.filename());
        std::fs::write(&path, lines.join("\n") + "\n")
            .with_context(|| format!("flush replay batch to {}", path.display()))?;
        let flushed = self.pending.len();
        log::info!("flushed {} samples to {}", flushed, path.display());
        self.pending.clear();
        self.flushes += 1;
        Ok(flushed)
    }

    fn filename(&self) -> String {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time moves slow")
            .as_millis();
        let suffix = rand::rng()
            .sample_iter(rand::distr::Alphanumeric)
            .take(4)
            .map(char::from)
            .collect::<String>();
        format!("{}_{}_{:04}.jsonl", millis, suffix, self.flushes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Board;
    use crate::game::Stone;
    use crate::selfplay::sample::Meta;

    fn sample(index: usize) -> Sample {
        Sample {
            state: Board::empty(15).rows(),
            player: Stone::Black,
            mcts_policy: vec![0.0; 225],
            teacher_policy: vec![0.0; 225],
            teacher_value: 0.0,
            final_value: 0,
            meta: Meta {
                source: "self_play".into(),
                game_id: "test".into(),
                move_index: index,
                total_moves: 1,
                result: 0,
                tags: vec![],
                extra: serde_json::Value::Null,
            },
        }
    }

    fn scratch(tag: &str) -> String {
        std::env::temp_dir()
            .join(format!("gomokuzero-replay-{}-{}", tag, std::process::id()))
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn flush_writes_one_line_per_sample() {
        let dir = scratch("lines");
        let mut buffer = ReplayBuffer::new(&dir);
        buffer.extend(vec![sample(0), sample(1), sample(2)]);
        assert_eq!(buffer.flush().unwrap(), 3);
        assert!(buffer.is_empty());
        let entries = std::fs::read_dir(&dir).unwrap().collect::<Vec<_>>();
        assert_eq!(entries.len(), 1);
        let content = std::fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
        assert_eq!(content.lines().count(), 3);
        for line in content.lines() {
            Sample::decode(line).unwrap();
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn empty_flush_is_a_noop() {
        let dir = scratch("noop");
        let mut buffer = ReplayBuffer::new(&dir);
        assert_eq!(buffer.flush().unwrap(), 0);
        assert!(!std::path::Path::new(&dir).exists());
    }

    #[test]
    fn filenames_grow_lexicographically() {
        let dir = scratch("order");
        let mut buffer = ReplayBuffer::new(&dir);
        let mut names: Vec<String> = Vec::new();
        for round in 0..3 {
            buffer.extend(vec![sample(round)]);
            buffer.flush().unwrap();
            let mut entries = std::fs::read_dir(&dir)
                .unwrap()
                .map(|e| e.unwrap().file_name().into_string().unwrap())
                .filter(|name| !names.contains(name))
                .collect::<Vec<_>>();
            assert_eq!(entries.len(), 1);
            names.append(&mut entries);
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        // flush order and name order agree
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, names);
        std::fs::remove_dir_all(&dir).ok();
    }
}
