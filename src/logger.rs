use serde::{Deserialize, Serialize};
use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// One scalar observation, tagged and ordered by the global step counter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScalarRecord {
    pub tag: String,
    pub value: f64,
    pub step: usize,
}

/// Free-form snapshot, written once at the head of the training log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    pub tag: String,
    pub text: String,
}

/// Append-only JSON-lines sink for run metrics. Purely observational: nothing
/// in the training loop reads it back.
pub struct MetricsLogger {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl MetricsLogger {
    /// Opens `<dir>/<name>.jsonl`, creating the directory as needed.
    pub fn create(dir: &Path, name: &str) -> Self {
        create_dir_all(dir)
            .unwrap_or_else(|e| panic!("Failed to create the log directory {dir:?}: {e}"));
        let path = dir.join(format!("{name}.jsonl"));
        let file = File::create(&path)
            .unwrap_or_else(|e| panic!("Failed to create the log file {path:?}: {e}"));
        Self {
            path,
            writer: BufWriter::new(file),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_scalar(&mut self, tag: &str, value: f64, step: usize) {
        self.append(&ScalarRecord {
            tag: tag.into(),
            value,
            step,
        });
    }

    pub fn log_text(&mut self, tag: &str, text: &str) {
        self.append(&SnapshotRecord {
            tag: tag.into(),
            text: text.into(),
        });
    }

    fn append(&mut self, record: &impl Serialize) {
        serde_json::to_writer(&mut self.writer, record)
            .unwrap_or_else(|e| panic!("Failed to write to the log file {:?}: {e}", self.path));
        self.writer
            .write_all(b"\n")
            .and_then(|()| self.writer.flush())
            .unwrap_or_else(|e| panic!("Failed to write to the log file {:?}: {e}", self.path));
    }
}

/// Seconds since the Unix epoch; names the pair of logs belonging to one run.
pub fn run_stamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use temp_dir::TempDir;

    #[test]
    fn scalars_round_trip_through_the_log() {
        let dir = TempDir::new().unwrap();
        let mut logger = MetricsLogger::create(dir.path(), "0_train");
        logger.log_text("architecture", "{\"num_classes\":100}");
        logger.log_scalar("loss", 4.6, 1);
        logger.log_scalar("accuracy", 0.01, 1);

        let contents = std::fs::read_to_string(logger.path()).unwrap();
        let mut lines = contents.lines();

        let snapshot: SnapshotRecord = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(snapshot.tag, "architecture");

        let loss: ScalarRecord = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(
            loss,
            ScalarRecord {
                tag: "loss".into(),
                value: 4.6,
                step: 1
            }
        );

        let accuracy: ScalarRecord = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(accuracy.tag, "accuracy");
        assert_eq!(accuracy.step, 1);
        assert!(lines.next().is_none());
    }
}
