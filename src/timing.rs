//! Server-Timing entries for compile phases.

use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingEntry {
    pub name: String,
    /// Milliseconds.
    pub duration: f64,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ServerTiming {
    entries: Vec<TimingEntry>,
}

impl ServerTiming {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, duration: Duration, description: &str) {
        self.entries.push(TimingEntry {
            name: name.to_string(),
            duration: duration.as_secs_f64() * 1000.0,
            description: description.to_string(),
        });
    }

    /// Runs `f` and records how long it took.
    pub fn measure<T>(&mut self, name: &str, description: &str, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.add(name, started.elapsed(), description);
        out
    }

    pub fn entries(&self) -> &[TimingEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Header value: `name;dur=<ms>;desc="<text>"` entries joined by `, `.
impl fmt::Display for ServerTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{};dur={:.3}", entry.name, entry.duration)?;
            if !entry.description.is_empty() {
                write!(
                    f,
                    ";desc=\"{}\"",
                    entry.description.replace('\\', "\\\\").replace('"', "\\\"")
                )?;
            }
        }
        Ok(())
    }
}
