//! The timing toolkit for diagnostics.

use crate::common::*;
use dashmap::DashSet;

lazy_static! {
    static ref PROFILING_CONFIG: ProfilingConfig = {
        let config: ProfilingConfig = match envy::prefixed("BOXDATA_").from_env() {
            Ok(config) => config,
            Err(err) => {
                eprintln!("failed to load profiling environment variables, fallback to default values: {:?}", err);
                Default::default()
            }
        };
        config
    };
    static ref REGISTERED_TIMINGS: DashSet<&'static str> = DashSet::new();
}

/// Read from `BOXDATA_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilingConfig {
    /// Comma separated names of timings that are reported.
    pub profiling_whitelist: Option<Vec<String>>,
}

/// Accumulated durations of named phases.
#[derive(Debug, Clone)]
pub struct Timing {
    name: &'static str,
    elapsed: Vec<(&'static str, Duration)>,
}

impl Timing {
    pub fn new(name: &'static str) -> Self {
        if REGISTERED_TIMINGS.insert(name) {
            debug!("registered timing profile '{}'", name);
        }

        Self {
            name,
            elapsed: vec![],
        }
    }

    /// Add a duration to `name`.
    pub fn add(&mut self, name: &'static str, duration: Duration) {
        match self.elapsed.iter_mut().find(|(key, _)| *key == name) {
            Some((_, total)) => *total += duration,
            None => self.elapsed.push((name, duration)),
        }
    }

    /// The total duration recorded under `name`.
    pub fn get(&self, name: &str) -> Duration {
        self.elapsed
            .iter()
            .filter(|(key, _)| *key == name)
            .map(|(_, duration)| *duration)
            .sum()
    }

    pub fn report(&self) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }

        let can_report = PROFILING_CONFIG
            .profiling_whitelist
            .as_ref()
            .map(|whitelist| whitelist.iter().any(|name| name == self.name))
            .unwrap_or(true);

        if can_report {
            debug!("profiling report for '{}'", self.name);
            self.elapsed.iter().for_each(|(name, elapsed)| {
                debug!("- {}\t{:?}", name, elapsed);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_accumulates() {
        let mut timing = Timing::new("test");
        timing.add("read", Duration::from_millis(2));
        timing.add("transform", Duration::from_millis(5));
        timing.add("read", Duration::from_millis(3));
        assert_eq!(timing.get("read"), Duration::from_millis(5));
        assert_eq!(timing.get("transform"), Duration::from_millis(5));
        assert_eq!(timing.get("missing"), Duration::ZERO);
    }
}
