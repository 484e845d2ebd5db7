// Per-Tick JSONL Time Series Recorder
// Outputs one JSON line per tick for independent analysis

use depeg_engine::TickMetrics;
use std::io::Write;

/// Time series recorder that accumulates tick metrics and writes JSONL
pub struct TimeSeriesRecorder {
    rows: Vec<TickMetrics>,
}

impl TimeSeriesRecorder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn record(&mut self, metrics: &TickMetrics) {
        self.rows.push(metrics.clone());
    }

    /// Write all rows to a JSONL file
    pub fn write_jsonl(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        for row in &self.rows {
            let line = serde_json::to_string(row)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }
}
