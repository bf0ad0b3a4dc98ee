//! Substance metadata resolution.
//!
//! Combines the catalog entry of a parameter with the manual usage
//! dictionary, the keyword heuristic, the authorization registry, and the
//! Fichetox index into a single [`SubstanceMetadata`].

use std::sync::Arc;

use phyto_map_reference::{
    AuthorizationRegistry, ReferenceError, ReferenceTables, ToxSheetIndex, UsageOverrides,
};
use phyto_map_substance_models::{
    ResolutionStep, SubstanceCatalogEntry, SubstanceMetadata, UsageCategory, UsageOverride,
};

use crate::usage_mapping::detect_usage;

/// Resolves substance metadata against a snapshot of the reference tables.
///
/// The snapshot is taken once at construction, so resolution itself never
/// touches the caches and is a pure function of its arguments.
#[derive(Debug, Clone)]
pub struct SubstanceResolver {
    overrides: Arc<UsageOverrides>,
    authorizations: Arc<AuthorizationRegistry>,
    tox_sheets: Arc<ToxSheetIndex>,
}

impl SubstanceResolver {
    #[must_use]
    pub const fn new(
        overrides: Arc<UsageOverrides>,
        authorizations: Arc<AuthorizationRegistry>,
        tox_sheets: Arc<ToxSheetIndex>,
    ) -> Self {
        Self {
            overrides,
            authorizations,
            tox_sheets,
        }
    }

    /// Snapshots the tables a resolver needs, loading them if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError`] if a configured table cannot be parsed.
    pub fn from_tables(tables: &ReferenceTables) -> Result<Self, ReferenceError> {
        Ok(Self::new(
            tables.usage_overrides.get()?,
            tables.authorizations.get()?,
            tables.tox_sheets.get()?,
        ))
    }

    /// Resolves the metadata of one parameter.
    ///
    /// Usage resolution order (first hit wins): dictionary row by parameter
    /// code, dictionary row by catalog CAS, keyword heuristic over the
    /// labels, unknown. A dictionary row without a usage still contributes
    /// its typical-use text.
    #[must_use]
    pub fn resolve(
        &self,
        code: &str,
        label: Option<&str>,
        entry: Option<&SubstanceCatalogEntry>,
    ) -> SubstanceMetadata {
        let code = code.trim();
        let cas = entry
            .and_then(|e| e.cas.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let base_label = non_blank(label).or_else(|| {
            entry.and_then(|e| e.display_labels().into_iter().find_map(non_blank))
        });

        let (manual, manual_step) = self.manual_override(code, cas);
        let manual_usage = manual.and_then(|m| m.usage.as_deref());

        let (usage, category, resolved_by) = if let Some(usage) = manual_usage {
            (
                Some(usage.to_string()),
                UsageCategory::from_label(usage),
                manual_step,
            )
        } else if let Some(category) = detect_usage(&detection_text(base_label, entry)) {
            (
                Some(category.label().to_string()),
                Some(category),
                ResolutionStep::Keyword,
            )
        } else {
            (None, None, ResolutionStep::Unknown)
        };

        let typical_uses = manual
            .and_then(|m| m.typical_uses.clone())
            .or_else(|| category.map(|c| c.default_typical_uses().to_string()));

        let display_name = base_label
            .map(str::to_string)
            .or_else(|| (!code.is_empty()).then(|| format!("Parameter {code}")));

        SubstanceMetadata {
            display_name,
            usage,
            category,
            typical_uses,
            authorized: cas.and_then(|c| self.authorizations.lookup(c)),
            cas: cas.map(str::to_string),
            reference_link: self.tox_sheets.link_for(cas),
            resolved_by,
        }
    }

    fn manual_override(
        &self,
        code: &str,
        cas: Option<&str>,
    ) -> (Option<&UsageOverride>, ResolutionStep) {
        if let Some(found) = self.overrides.by_code(code) {
            return (Some(found), ResolutionStep::ManualCode);
        }
        if let Some(found) = cas.and_then(|c| self.overrides.by_cas(c)) {
            return (Some(found), ResolutionStep::ManualCas);
        }
        (None, ResolutionStep::Unknown)
    }
}

/// Display label plus the e-phy, BNV-D, and Agritox labels, space separated.
fn detection_text(base_label: Option<&str>, entry: Option<&SubstanceCatalogEntry>) -> String {
    let mut parts = vec![base_label.unwrap_or_default()];
    if let Some(entry) = entry {
        parts.extend(entry.detection_labels().into_iter().flatten());
    }
    parts.join(" ")
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
