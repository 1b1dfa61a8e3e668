use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender, bounded};
use tm_model::TelemetryFrame;
use tm_timing::WallClock;
use tracing::{error, info};

/// Batching/worker-thread shape follows `persisting_tile.rs`'s channel-fed
/// writer: the ingest thread only ever enqueues, a dedicated thread owns
/// the file handle and blocks on I/O.
pub struct CsvWriter {
    tx: Option<Sender<Command>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

enum Command {
    Row(TelemetryFrame),
    Stop,
}

impl CsvWriter {
    /// Opens `<dir>/<title>_<ISO8601>.csv`, stamped once at construction
    /// (one file per Connect).
    pub fn open(dir: &Path, title: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let stamp = WallClock::now().to_filename_stamp();
        let path: PathBuf = dir.join(format!("{title}_{stamp}.csv"));
        let file = std::fs::File::create(&path)?;
        let mut writer = csv::Writer::from_writer(file);

        let (tx, rx) = bounded::<Command>(1024);
        let thread = std::thread::spawn(move || run_writer(&mut writer, rx));

        info!(?path, "csv writer open");
        Ok(Self { tx: Some(tx), thread: Some(thread) })
    }

    /// Never blocks the ingest thread beyond the enqueue itself.
    pub fn write_frame(&self, frame: TelemetryFrame) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Command::Row(frame));
        }
    }

    pub fn close(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Command::Stop);
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CsvWriter {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_writer(writer: &mut csv::Writer<std::fs::File>, rx: Receiver<Command>) {
    let mut header_written = false;
    while let Ok(cmd) = rx.recv() {
        match cmd {
            Command::Stop => break,
            Command::Row(frame) => {
                if !header_written {
                    let mut header = vec!["Timestamp".to_string()];
                    for group in &frame.groups {
                        for dataset in &group.datasets {
                            header.push(format!("{}/{} ({})", group.title, dataset.title, dataset.units));
                        }
                    }
                    if let Err(e) = writer.write_record(&header) {
                        error!(error = %e, "csv header write failed");
                    }
                    header_written = true;
                }
                let mut row = vec![WallClock::now().to_iso8601_millis()];
                for dataset in frame.datasets() {
                    row.push(dataset.value.as_str_lossy());
                }
                if let Err(e) = writer.write_record(&row) {
                    error!(error = %e, "csv row write failed");
                }
            }
        }
    }
    if let Err(e) = writer.flush() {
        error!(error = %e, "csv flush on teardown failed");
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use tm_model::{Dataset, DatasetValue, Group};

    use super::*;

    #[test]
    fn writes_header_then_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvWriter::open(dir.path(), "demo").unwrap();

        let frame = TelemetryFrame {
            title: "demo".to_string(),
            groups: vec![Group {
                title: "g".to_string(),
                widget: "group".to_string(),
                datasets: vec![Dataset {
                    title: "Temp".to_string(),
                    units: "C".to_string(),
                    widget: "plot".to_string(),
                    index: 1,
                    value: DatasetValue::Number(21.5),
                    alarm_low: None,
                    alarm_high: None,
                    fft: false,
                    log: false,
                    history_depth: None,
                }],
            }],
        };
        writer.write_frame(frame);
        writer.close();

        let entry = std::fs::read_dir(dir.path()).unwrap().next().unwrap().unwrap();
        let mut contents = String::new();
        std::fs::File::open(entry.path()).unwrap().read_to_string(&mut contents).unwrap();
        assert!(contents.contains("Timestamp,g/Temp (C)"));
        assert!(contents.contains("21.5"));
    }
}
