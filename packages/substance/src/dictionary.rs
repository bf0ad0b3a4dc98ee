//! Usage dictionary rebuild.
//!
//! Produces the `code_parametre;cas;ppp_usage;ppp_usages_typiques` file the
//! resolver reads as its manual override table. [`write_usage_dictionary`]
//! derives it from the substance catalog: only substances whose labels
//! match a usage keyword get a row, the rest stay with the runtime
//! heuristic or are curated by hand. The richer BNV-D variant lives in
//! [`crate::sources`].

use std::path::Path;

use phyto_map_reference::{Catalog, ReferenceError};
use phyto_map_substance_models::{SubstanceCatalogEntry, UsageOverride};

use crate::usage_mapping::detect_usage;

/// Header written to the dictionary.
pub const DICTIONARY_HEADER: [&str; 4] = ["code_parametre", "cas", "ppp_usage", "ppp_usages_typiques"];

/// Errors that can occur while building the usage dictionary.
#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    /// CSV serialization failed.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A source table is missing or unreadable.
    #[error(transparent)]
    Source(#[from] ReferenceError),
}

/// One dictionary row: its keys plus the override it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DictionaryRow {
    pub code: String,
    pub cas: String,
    pub entry: UsageOverride,
}

/// Writes the usage dictionary for every catalog entry with a parameter code
/// and a detectable usage. Returns the number of rows written.
///
/// The caller must invalidate its usage-override cache afterwards (see
/// `ReferenceTables::rebuild`).
///
/// # Errors
///
/// Returns [`DictionaryError`] if the file cannot be created or written.
pub fn write_usage_dictionary(catalog: &Catalog, path: &Path) -> Result<usize, DictionaryError> {
    let rows = catalog.entries().iter().filter_map(|entry| {
        let code = entry.parameter_code.as_deref()?;
        let Some(category) = detect_usage(&catalog_text(entry)) else {
            log::trace!("No usage detected for parameter {code}");
            return None;
        };
        Some(DictionaryRow {
            code: code.to_string(),
            cas: entry.any_cas().unwrap_or_default().to_string(),
            entry: UsageOverride {
                usage: Some(category.label().to_string()),
                typical_uses: Some(category.default_typical_uses().to_string()),
                ..UsageOverride::default()
            },
        })
    });

    let written = write_rows(path, &DICTIONARY_HEADER, rows)?;
    log::info!(
        "Wrote {written} usage rows ({} catalog entries) to {}",
        catalog.entries().len(),
        path.display()
    );

    Ok(written)
}

/// Writes `rows` under `header`. Columns past the four key columns are
/// filled from [`UsageOverride::attributes`].
pub(crate) fn write_rows(
    path: &Path,
    header: &[&str],
    rows: impl IntoIterator<Item = DictionaryRow>,
) -> Result<usize, DictionaryError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)?;
    writer.write_record(header)?;

    let mut written = 0;
    for row in rows {
        let mut record = vec![
            row.code.as_str(),
            row.cas.as_str(),
            row.entry.usage.as_deref().unwrap_or_default(),
            row.entry.typical_uses.as_deref().unwrap_or_default(),
        ];
        record.extend(header.iter().skip(DICTIONARY_HEADER.len()).map(|column| {
            row.entry
                .attributes
                .get(*column)
                .map_or("", String::as_str)
        }));
        writer.write_record(&record)?;
        written += 1;
    }
    writer.flush()?;

    Ok(written)
}

fn catalog_text(entry: &SubstanceCatalogEntry) -> String {
    [
        entry.sandre_label.as_deref(),
        entry.ephy_label.as_deref(),
        entry.bnvd_label.as_deref(),
        entry.agritox_label.as_deref(),
        entry.eupdb_label.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}

#[cfg(test)]
mod tests {
    use phyto_map_reference::UsageOverrides;
    use phyto_map_reference::table::read_table;

    use super::*;

    fn entry(code: Option<&str>, cas: Option<&str>, eupdb: &str) -> SubstanceCatalogEntry {
        SubstanceCatalogEntry {
            parameter_code: code.map(str::to_string),
            cas: cas.map(str::to_string),
            eupdb_label: Some(eupdb.to_string()),
            ..SubstanceCatalogEntry::default()
        }
    }

    #[test]
    fn writes_rows_for_detected_usages_only() {
        let catalog = Catalog::from_entries(vec![
            entry(Some("1105"), Some("61-82-5"), "Herbicide"),
            entry(Some("1340"), None, "Nitrates"),
            entry(None, Some("50-00-0"), "Insecticide"),
            entry(Some("1680"), None, "Acaricide, insecticide"),
        ]);
        let path = std::env::temp_dir()
            .join("phyto_map_dictionary_test")
            .join("ppp_usages.csv");

        let written = write_usage_dictionary(&catalog, &path).unwrap();
        assert_eq!(written, 2);

        let table = read_table(&path).unwrap();
        assert_eq!(table.headers(), DICTIONARY_HEADER);

        let overrides = UsageOverrides::from_table(&table).unwrap();
        let aminotriazole = overrides.by_code("1105").unwrap();
        assert_eq!(aminotriazole.usage.as_deref(), Some("herbicide"));
        assert!(overrides.by_cas("61-82-5").is_some());
        assert_eq!(
            overrides.by_code("1680").unwrap().usage.as_deref(),
            Some("insecticide")
        );
        assert!(overrides.by_code("1340").is_none());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn cas_column_falls_back_across_sources() {
        let catalog = Catalog::from_entries(vec![SubstanceCatalogEntry {
            parameter_code: Some("1107".to_string()),
            agritox_cas: Some("1912-24-9".to_string()),
            bnvd_cas: Some("0000-00-0".to_string()),
            sandre_label: Some("Atrazine".to_string()),
            ephy_label: Some("herbicide".to_string()),
            ..SubstanceCatalogEntry::default()
        }]);
        let path = std::env::temp_dir()
            .join("phyto_map_dictionary_cas_test")
            .join("ppp_usages.csv");

        write_usage_dictionary(&catalog, &path).unwrap();

        let overrides = UsageOverrides::from_table(&read_table(&path).unwrap()).unwrap();
        assert_eq!(
            overrides.by_cas("1912-24-9").unwrap().usage.as_deref(),
            Some("herbicide")
        );
        assert!(overrides.by_cas("0000-00-0").is_none());

        std::fs::remove_file(&path).ok();
    }
}
