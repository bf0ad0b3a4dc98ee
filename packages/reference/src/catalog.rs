//! C3PO aggregate substance catalog.

use std::collections::BTreeMap;
use std::path::Path;

use phyto_map_substance_models::SubstanceCatalogEntry;
use serde::Deserialize;

use crate::ReferenceError;

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    apercu: Option<Vec<SubstanceCatalogEntry>>,
}

/// Catalog entries indexed by Sandre parameter code.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<SubstanceCatalogEntry>,
    by_code: BTreeMap<String, usize>,
}

impl Catalog {
    /// Builds a catalog from entries. When two entries share a parameter
    /// code the later one wins the index slot.
    #[must_use]
    pub fn from_entries(entries: Vec<SubstanceCatalogEntry>) -> Self {
        let mut by_code = BTreeMap::new();
        for (i, entry) in entries.iter().enumerate() {
            if let Some(code) = entry.parameter_code.as_deref() {
                by_code.insert(code.to_string(), i);
            }
        }
        Self { entries, by_code }
    }

    /// Entry for a (trimmed) parameter code.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&SubstanceCatalogEntry> {
        self.by_code.get(code.trim()).map(|&i| &self.entries[i])
    }

    /// All entries, in file order.
    #[must_use]
    pub fn entries(&self) -> &[SubstanceCatalogEntry] {
        &self.entries
    }

    /// Number of distinct parameter codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    /// Whether no entry carries a parameter code.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

/// Parses the catalog JSON document (`{"apercu": [...]}`).
///
/// A document without an `apercu` list is an empty catalog.
///
/// # Errors
///
/// Returns [`ReferenceError::Json`] if the document is not a JSON object of
/// the expected shape.
pub fn parse_catalog(json: &str) -> Result<Catalog, ReferenceError> {
    let file: CatalogFile = serde_json::from_str(json)?;
    Ok(Catalog::from_entries(file.apercu.unwrap_or_default()))
}

/// Loads the catalog file. Unlike the other reference tables, the catalog is
/// required.
///
/// # Errors
///
/// * [`ReferenceError::MissingFile`] if `path` does not exist
/// * [`ReferenceError::Io`] / [`ReferenceError::Json`] if it cannot be read
///   or parsed
pub fn load_catalog(path: &Path) -> Result<Catalog, ReferenceError> {
    if !path.exists() {
        return Err(ReferenceError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let catalog = parse_catalog(&std::fs::read_to_string(path)?)?;
    log::info!(
        "Loaded {} catalog substances from {}",
        catalog.len(),
        path.display()
    );

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_by_code_and_skips_codeless_entries() {
        let catalog = parse_catalog(
            r#"{"nombre": 3, "apercu": [
                {"code_parametre_sandre": 1105, "libelle_parametre_sandre": "Aminotriazole"},
                {"code_parametre_sandre": null, "libelle_ephy": "orphan"},
                {"code_parametre_sandre": "1107", "cas_parametre_sandre": "1912-24-9"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries().len(), 3);
        assert_eq!(
            catalog.get(" 1105 ").unwrap().sandre_label.as_deref(),
            Some("Aminotriazole")
        );
        assert_eq!(
            catalog.get("1107").unwrap().cas.as_deref(),
            Some("1912-24-9")
        );
    }

    #[test]
    fn later_duplicate_wins() {
        let catalog = parse_catalog(
            r#"{"apercu": [
                {"code_parametre_sandre": "1", "libelle_ephy": "first"},
                {"code_parametre_sandre": "1", "libelle_ephy": "second"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(catalog.get("1").unwrap().ephy_label.as_deref(), Some("second"));
    }

    #[test]
    fn missing_apercu_is_empty() {
        assert!(parse_catalog("{}").unwrap().is_empty());
        assert!(parse_catalog(r#"{"apercu": null}"#).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join("phyto_map_no_such_catalog.json");
        assert!(matches!(
            load_catalog(&path),
            Err(ReferenceError::MissingFile { .. })
        ));
    }
}
