//! loader configuration
//!
//! ```yaml
//! scheme: ydl
//! class_map:
//!   persons: Person
//!   lawyers: Lawyer
//! class_init:
//!   Person: from_hash
//! ```
//!
//! Keys that ydl does not know about are ignored, so the configuration can live in a file
//! shared with other tools.
use crate::reference::Syntax;
use indexmap::IndexMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    /// Scheme of cross-references (`<scheme>:/path/to/entry`)
    pub scheme: String,
    /// container key -> class of its children
    pub class_map: IndexMap<String, String>,
    /// class -> name of its constructor
    pub class_init: IndexMap<String, String>,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            scheme: Syntax::DEFAULT_SCHEME.to_string(),
            class_map: Default::default(),
            class_init: Default::default(),
        }
    }
}

impl BinderConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        tracing::info!(path=%path.display(), "loading config");
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn syntax(&self) -> Syntax {
        Syntax::new(self.scheme.as_str())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse config")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = BinderConfig::from_yaml("").unwrap();
        assert_eq!(config, BinderConfig::default());
        assert_eq!(config.syntax(), Syntax::default());
    }

    #[test]
    fn tables_keep_their_order() {
        let config = BinderConfig::from_yaml(
            r#"
scheme: ref
system_ydl_dir: /etc/ydl
class_map:
  persons: Person
  lawyers: Lawyer
class_init:
  Person: from_hash
"#,
        )
        .unwrap();

        assert_eq!(config.scheme, "ref");
        assert_eq!(
            config.class_map.keys().collect::<Vec<_>>(),
            vec!["persons", "lawyers"]
        );
        assert_eq!(config.class_init["Person"], "from_hash");
    }

    #[test]
    fn invalid_yaml() {
        assert!(matches!(
            BinderConfig::from_yaml("class_map: [persons"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
