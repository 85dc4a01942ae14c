//! Analysis configuration: externally supplied constants.

use crate::bootstrap::BootstrapConfig;
use crate::error::Result;
use crate::model::ModelSpec;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Display label and presentation order for one collection method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodLabel {
    /// Method value as it appears in the survey table.
    pub method: String,
    /// Display string for plots and tables.
    pub label: String,
}

/// Externally supplied analysis constants, loadable from YAML.
///
/// Everything here is presentation or tuning, not part of the core logic's
/// contract; all fields default sensibly when the file or field is absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Bootstrap tuning (iterations, seed, parallelism).
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    /// Fixed-effect terms for the mixed model.
    #[serde(default)]
    pub model: ModelSpec,
    /// Method display labels, in presentation order.
    #[serde(default)]
    pub method_labels: Vec<MethodLabel>,
}

impl AnalysisConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    /// Display label for a method, falling back to the raw value.
    pub fn display_label<'a>(&'a self, method: &'a str) -> &'a str {
        self.method_labels
            .iter()
            .find(|l| l.method == method)
            .map(|l| l.label.as_str())
            .unwrap_or(method)
    }

    /// Order observed methods by the configured presentation order; methods
    /// without a configured label keep their sorted position at the end.
    pub fn ordered_methods(&self, observed: &[String]) -> Vec<String> {
        let mut ordered: Vec<String> = self
            .method_labels
            .iter()
            .filter(|l| observed.contains(&l.method))
            .map(|l| l.method.clone())
            .collect();
        for method in observed {
            if !ordered.contains(method) {
                ordered.push(method.clone());
            }
        }
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.bootstrap.iterations, 1000);
        assert_eq!(config.bootstrap.seed, 42);
        assert!(!config.model.size_covariate);
        assert!(config.method_labels.is_empty());
    }

    #[test]
    fn test_from_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "bootstrap:").unwrap();
        writeln!(file, "  iterations: 500").unwrap();
        writeln!(file, "  seed: 7").unwrap();
        writeln!(file, "  parallel: false").unwrap();
        writeln!(file, "model:").unwrap();
        writeln!(file, "  size_covariate: true").unwrap();
        writeln!(file, "  interaction: true").unwrap();
        writeln!(file, "method_labels:").unwrap();
        writeln!(file, "  - method: Malaise").unwrap();
        writeln!(file, "    label: Malaise trap").unwrap();
        writeln!(file, "  - method: Pollard Walk").unwrap();
        writeln!(file, "    label: Pollard walk").unwrap();
        file.flush().unwrap();

        let config = AnalysisConfig::from_yaml(file.path()).unwrap();
        assert_eq!(config.bootstrap.iterations, 500);
        assert_eq!(config.bootstrap.seed, 7);
        assert!(config.model.interaction);
        assert_eq!(config.display_label("Malaise"), "Malaise trap");
        assert_eq!(config.display_label("other"), "other");
    }

    #[test]
    fn test_ordered_methods() {
        let config = AnalysisConfig {
            method_labels: vec![
                MethodLabel {
                    method: "Pollard Walk".to_string(),
                    label: "Pollard walk".to_string(),
                },
                MethodLabel {
                    method: "Malaise".to_string(),
                    label: "Malaise trap".to_string(),
                },
            ],
            ..Default::default()
        };

        let observed = vec!["Malaise".to_string(), "Pollard Walk".to_string()];
        assert_eq!(
            config.ordered_methods(&observed),
            vec!["Pollard Walk".to_string(), "Malaise".to_string()]
        );
    }
}
