use std::path::Path;

use serde::Deserialize;
use spl_lower::CaptureOrder;

/// Knobs for one run of the middle-end, usually read from a `[pipeline]`
/// table or a standalone TOML file. Every field has a default.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineOptions {
    /// Order in which captures become leading parameters.
    pub capture_order: CaptureOrder,
    /// Rewrite local reads into register nodes before handoff.
    pub materialize_locals: bool,
    /// Check the backend contract after lowering.
    pub verify_handoff: bool,
    /// Specialize generic functions. Turning this off leaves template
    /// references in place, which handoff verification rejects.
    pub monomorphize: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            capture_order: CaptureOrder::Discovery,
            materialize_locals: false,
            verify_handoff: true,
            monomorphize: true,
        }
    }
}

impl PipelineOptions {
    /// Read and parse options from a TOML file.
    pub fn from_file(path: &Path) -> Result<PipelineOptions, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content)
    }

    /// Parse options from TOML text.
    pub fn from_toml_str(content: &str) -> Result<PipelineOptions, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse pipeline options: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_gives_defaults() {
        let options = PipelineOptions::from_toml_str("").unwrap();
        assert_eq!(options, PipelineOptions::default());
        assert!(options.verify_handoff);
        assert!(options.monomorphize);
        assert!(!options.materialize_locals);
    }

    #[test]
    fn parse_all_fields() {
        let toml = r#"
capture_order = "sorted"
materialize_locals = true
verify_handoff = false
monomorphize = false
"#;
        let options = PipelineOptions::from_toml_str(toml).unwrap();
        assert_eq!(options.capture_order, CaptureOrder::Sorted);
        assert!(options.materialize_locals);
        assert!(!options.verify_handoff);
        assert!(!options.monomorphize);
    }

    #[test]
    fn unknown_capture_order_is_rejected() {
        let err = PipelineOptions::from_toml_str(r#"capture_order = "random""#).unwrap_err();
        assert!(err.starts_with("Failed to parse pipeline options"), "{err}");
    }

    #[test]
    fn misspelled_field_is_rejected() {
        assert!(PipelineOptions::from_toml_str("verify = true").is_err());
    }
}
