use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Wall-clock duration of each scan phase, in seconds
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PhaseTimings(BTreeMap<String, f64>);

impl PhaseTimings {
    pub fn record(&mut self, phase: &str, elapsed: Duration) {
        self.0.insert(phase.to_string(), elapsed.as_secs_f64());
    }

    pub fn get(&self, phase: &str) -> Option<f64> {
        self.0.get(phase).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(phase, secs)| (phase.as_str(), *secs))
    }
}

impl fmt::Display for PhaseTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (phase, secs)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={:.3}s", phase, secs)?;
        }
        Ok(())
    }
}
