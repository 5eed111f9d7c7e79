use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// The persisted configuration document.
///
/// Only the fields this tool reads are typed. Everything else is carried in
/// `extra` so a rewrite never drops settings owned by other tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    #[serde(default)]
    pub bundles_installed: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_timeout_secs: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigDocument {
    /// Reads the document, treating a missing file as an empty document.
    pub fn read(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => Ok(Self::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Serializes with tab indentation and a trailing newline.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let doc = ConfigDocument::read(&dir.path().join("config.json")).unwrap();
        assert_eq!(doc, ConfigDocument::default());
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let raw = r#"{"smtpHost":"mail.example.com","bundlesInstalled":["shop"],"pgPort":5432}"#;
        let doc: ConfigDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.bundles_installed, vec!["shop"]);
        assert_eq!(doc.extra["smtpHost"], "mail.example.com");

        let out: Value = serde_json::from_slice(&doc.to_pretty_json().unwrap()).unwrap();
        assert_eq!(out["smtpHost"], "mail.example.com");
        assert_eq!(out["pgPort"], 5432);
        assert_eq!(out["bundlesInstalled"][0], "shop");
    }

    #[test]
    fn test_pretty_json_uses_tabs() {
        let doc = ConfigDocument {
            bundles_installed: vec!["shop".to_string()],
            ..Default::default()
        };
        let text = String::from_utf8(doc.to_pretty_json().unwrap()).unwrap();
        assert!(text.contains("\n\t\"bundlesInstalled\""));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_malformed_document_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(ConfigDocument::read(&path).is_err());
    }
}
