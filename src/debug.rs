use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

// Diagnostics are a side channel with no functional contract: the transform
// behaves identically whether or not a logger is attached.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    sink: Sink,
    counters: HashMap<String, u64>,
}

enum Sink {
    File(BufWriter<File>),
    Memory(Vec<String>),
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(DebugState {
                sink: Sink::File(BufWriter::new(file)),
                counters: HashMap::new(),
            })),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Mutex::new(DebugState {
                sink: Sink::Memory(Vec::new()),
                counters: HashMap::new(),
            })),
        }
    }

    pub fn log_json(&self, json: &str) {
        if let Ok(mut state) = self.inner.lock() {
            match &mut state.sink {
                Sink::File(writer) => {
                    let _ = writeln!(writer, "{json}");
                }
                Sink::Memory(lines) => lines.push(json.to_string()),
            }
        }
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let mut counters: Vec<(String, u64)> = state.counters.drain().collect();
            counters.sort_by(|a, b| a.0.cmp(&b.0));
            let counts_json = if counters.is_empty() {
                "{}".to_string()
            } else {
                let mut out = String::from("{");
                for (idx, (key, value)) in counters.iter().enumerate() {
                    if idx > 0 {
                        out.push(',');
                    }
                    out.push_str(&format!("\"{}\":{}", json_escape(key), value));
                }
                out.push('}');
                out
            };
            let json = format!(
                "{{\"type\":\"debug.summary\",\"context\":\"{}\",\"counts\":{}}}",
                json_escape(context),
                counts_json
            );
            match &mut state.sink {
                Sink::File(writer) => {
                    let _ = writeln!(writer, "{json}");
                }
                Sink::Memory(lines) => lines.push(json),
            }
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            if let Sink::File(writer) = &mut state.sink {
                let _ = writer.flush();
            }
        }
    }

    // Captured lines of an in-memory sink. A file sink has nothing to hand back.
    pub fn lines(&self) -> Vec<String> {
        match self.inner.lock() {
            Ok(state) => match &state.sink {
                Sink::Memory(lines) => lines.clone(),
                Sink::File(_) => Vec::new(),
            },
            Err(_) => Vec::new(),
        }
    }
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_captures_lines_in_order() {
        let logger = DebugLogger::in_memory();
        logger.log_json("{\"a\":1}");
        logger.log_json("{\"b\":2}");
        assert_eq!(logger.lines(), vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn summary_drains_counters_sorted_by_key() {
        let logger = DebugLogger::in_memory();
        logger.increment("file-missing", 2);
        logger.increment("density-mismatch", 1);
        logger.emit_summary("transform");
        let lines = logger.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0],
            "{\"type\":\"debug.summary\",\"context\":\"transform\",\"counts\":{\"density-mismatch\":1,\"file-missing\":2}}"
        );

        logger.emit_summary("transform");
        assert!(logger.lines()[1].contains("\"counts\":{}"));
    }

    #[test]
    fn json_escape_handles_quotes_and_backslashes() {
        assert_eq!(json_escape("a\"b\\c\n"), "a\\\"b\\\\c\\n");
    }
}
