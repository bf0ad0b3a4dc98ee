#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Substance catalog, plant-protection usage taxonomy, and resolved metadata.
//!
//! Every measured parameter is described through these types once the
//! resolver has combined the C3PO catalog, the manual usage dictionary, and
//! the authorization registry.

pub mod lenient;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Plant-protection usage categories.
///
/// Labels are the French vocabulary used by the reference exports (e-phy,
/// BNV-D) so that dictionary values round-trip unchanged. Parsing also
/// accepts the common English and unaccented spellings.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum UsageCategory {
    /// Weed control
    #[strum(to_string = "herbicide")]
    Herbicide,
    /// Insect control
    #[strum(to_string = "insecticide")]
    Insecticide,
    /// Fungal disease control
    #[strum(to_string = "fongicide", serialize = "fungicide")]
    Fungicide,
    /// Mite control
    #[strum(to_string = "acaricide")]
    Acaricide,
    /// Rodent control
    #[strum(to_string = "rodenticide")]
    Rodenticide,
    /// Nematode control
    #[strum(to_string = "nématicide", serialize = "nematicide")]
    Nematicide,
    /// Mating disruption
    #[strum(
        to_string = "phéromone de confusion sexuelle",
        serialize = "pheromone de confusion sexuelle",
        serialize = "phéromone",
        serialize = "pheromone",
        serialize = "sex pheromone"
    )]
    SexPheromone,
    /// Bacterial control
    #[strum(to_string = "bactericide", serialize = "bactéricide")]
    Bactericide,
    /// Slug and snail control
    #[strum(to_string = "molluscicide")]
    Molluscicide,
    /// Plant growth regulation
    #[strum(
        to_string = "régulateur de croissance",
        serialize = "regulateur de croissance",
        serialize = "growth regulator"
    )]
    GrowthRegulator,
    /// Any other plant-protection function
    #[strum(to_string = "autre", serialize = "other")]
    Other,
}

impl UsageCategory {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Herbicide,
            Self::Insecticide,
            Self::Fungicide,
            Self::Acaricide,
            Self::Rodenticide,
            Self::Nematicide,
            Self::SexPheromone,
            Self::Bactericide,
            Self::Molluscicide,
            Self::GrowthRegulator,
            Self::Other,
        ]
    }

    /// Canonical label written to features and dictionaries.
    #[must_use]
    pub fn label(self) -> &'static str {
        self.into()
    }

    /// Parses a usage label, ignoring surrounding whitespace.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        label.trim().parse().ok()
    }

    /// Generic typical-use text shown when the dictionary has none.
    #[must_use]
    pub const fn default_typical_uses(self) -> &'static str {
        match self {
            Self::Herbicide => "Désherbage des cultures, bords de champs, talus ou voiries.",
            Self::Insecticide => {
                "Lutte contre les insectes ravageurs des cultures ou des stockages."
            }
            Self::Fungicide => {
                "Protection des cultures contre les maladies fongiques (mildiou, oïdium, etc.)."
            }
            Self::Acaricide => "Lutte contre les acariens sur les cultures.",
            Self::Rodenticide => {
                "Lutte contre les rongeurs (bâtiments agricoles, stockages, etc.)."
            }
            Self::Nematicide => "Lutte contre les nématodes des cultures.",
            Self::SexPheromone => {
                "Confusion sexuelle pour limiter les ravageurs, en viticulture ou arboriculture."
            }
            Self::Bactericide => {
                "Lutte contre les bactéries (traitements des cultures ou des stockages)."
            }
            Self::Molluscicide => "Lutte contre les limaces et mollusques.",
            Self::GrowthRegulator => {
                "Régulation de la croissance des plantes (antigerminatif, etc.)."
            }
            Self::Other => {
                "Autre usage phytopharmaceutique ; consulter e-phy/INRS pour le détail."
            }
        }
    }
}

/// One substance from the C3PO aggregate catalog.
///
/// Field names follow the upstream JSON export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstanceCatalogEntry {
    /// Sandre parameter code.
    #[serde(
        rename = "code_parametre_sandre",
        default,
        deserialize_with = "lenient::scalar"
    )]
    pub parameter_code: Option<String>,
    /// CAS registry number.
    #[serde(
        rename = "cas_parametre_sandre",
        default,
        deserialize_with = "lenient::scalar"
    )]
    pub cas: Option<String>,
    /// Sandre parameter label.
    #[serde(
        rename = "libelle_parametre_sandre",
        default,
        deserialize_with = "lenient::scalar"
    )]
    pub sandre_label: Option<String>,
    /// e-phy label.
    #[serde(rename = "libelle_ephy", default, deserialize_with = "lenient::scalar")]
    pub ephy_label: Option<String>,
    /// BNV-D label.
    #[serde(rename = "libelle_bnvd", default, deserialize_with = "lenient::scalar")]
    pub bnvd_label: Option<String>,
    /// Agritox label.
    #[serde(
        rename = "libelle_agritox",
        default,
        deserialize_with = "lenient::scalar"
    )]
    pub agritox_label: Option<String>,
    /// EU pesticides database label.
    #[serde(rename = "libelle_eupdb", default, deserialize_with = "lenient::scalar")]
    pub eupdb_label: Option<String>,
    /// CAS number according to Agritox.
    #[serde(rename = "cas_agritox", default, deserialize_with = "lenient::scalar")]
    pub agritox_cas: Option<String>,
    /// CAS number according to e-phy.
    #[serde(rename = "cas_ephy", default, deserialize_with = "lenient::scalar")]
    pub ephy_cas: Option<String>,
    /// CAS number according to BNV-D.
    #[serde(rename = "cas_bnvd", default, deserialize_with = "lenient::scalar")]
    pub bnvd_cas: Option<String>,
    /// CAS number according to the EU pesticides database.
    #[serde(rename = "cas_eupdb", default, deserialize_with = "lenient::scalar")]
    pub eupdb_cas: Option<String>,
}

impl SubstanceCatalogEntry {
    /// Labels in display-name priority order: Sandre, e-phy, BNV-D, Agritox.
    #[must_use]
    pub fn display_labels(&self) -> [Option<&str>; 4] {
        [
            self.sandre_label.as_deref(),
            self.ephy_label.as_deref(),
            self.bnvd_label.as_deref(),
            self.agritox_label.as_deref(),
        ]
    }

    /// First non-blank CAS number: Sandre, then Agritox, e-phy, BNV-D, and
    /// the EU database.
    ///
    /// Lookups against the authorization registry and the sheet index stay
    /// on the Sandre number alone; this chain only fills dictionary rows.
    #[must_use]
    pub fn any_cas(&self) -> Option<&str> {
        [
            &self.cas,
            &self.agritox_cas,
            &self.ephy_cas,
            &self.bnvd_cas,
            &self.eupdb_cas,
        ]
        .into_iter()
        .filter_map(Option::as_deref)
        .map(str::trim)
        .find(|cas| !cas.is_empty())
    }

    /// Labels appended to the display label for usage keyword detection.
    #[must_use]
    pub fn detection_labels(&self) -> [Option<&str>; 3] {
        [
            self.ephy_label.as_deref(),
            self.bnvd_label.as_deref(),
            self.agritox_label.as_deref(),
        ]
    }
}

/// A row of the manual usage dictionary.
///
/// Any extra non-empty column (EU status, PNEC, hazard statements, …) is
/// kept verbatim in [`UsageOverride::attributes`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageOverride {
    /// Usage label (`ppp_usage`).
    pub usage: Option<String>,
    /// Typical-use text (`ppp_usages_typiques`).
    pub typical_uses: Option<String>,
    /// Other regulatory or hazard columns, keyed by column name.
    pub attributes: BTreeMap<String, String>,
}

impl UsageOverride {
    /// Whether the row carries nothing usable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.usage.is_none() && self.typical_uses.is_none() && self.attributes.is_empty()
    }
}

/// Which resolution step produced the usage of a [`SubstanceMetadata`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResolutionStep {
    /// Manual dictionary row keyed by parameter code
    ManualCode,
    /// Manual dictionary row keyed by CAS number
    ManualCas,
    /// Keyword heuristic over the catalog labels
    Keyword,
    /// Nothing matched
    Unknown,
}

/// Everything the feature builder needs to know about a measured parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct SubstanceMetadata {
    /// Human-readable substance name.
    pub display_name: Option<String>,
    /// Usage label (canonical category label or free dictionary text).
    pub usage: Option<String>,
    /// Parsed usage category, when the label is a known one.
    pub category: Option<UsageCategory>,
    /// Typical-use text.
    pub typical_uses: Option<String>,
    /// Market authorization: `Some(true)` authorized, `Some(false)` not
    /// authorized, `None` unknown.
    pub authorized: Option<bool>,
    /// CAS number taken from the catalog entry.
    pub cas: Option<String>,
    /// Link to the toxicological sheet (or the sheet search page).
    pub reference_link: String,
    /// Which step produced [`SubstanceMetadata::usage`].
    pub resolved_by: ResolutionStep,
}
