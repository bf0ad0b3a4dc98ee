//! Usage dictionary rebuild from the BNV-D substance exports.
//!
//! The sources directory holds `;`-delimited tables keyed by `id_bnvd`.
//! `substances_identification.csv` maps each id to its Sandre code and CAS
//! number, and `substances_fonctions.csv` carries one boolean column per
//! plant-protection function; both are required. Regulation, mention,
//! PNEC, and hazard tables are optional and fill the extra dictionary
//! columns when present.
//!
//! When the e-phy product exports sit in the same directory (or in a
//! `decision…`/`intrant…` subdirectory), their short usage labels replace
//! the generic typical-use text.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use phyto_map_reference::ReferenceError;
use phyto_map_reference::table::{Row, Table, read_table};
use phyto_map_substance_models::{UsageCategory, UsageOverride};

use crate::dictionary::{DICTIONARY_HEADER, DictionaryError, DictionaryRow, write_rows};

/// Header written by [`write_usage_dictionary_from_sources`].
pub const SOURCES_HEADER: [&str; 10] = [
    DICTIONARY_HEADER[0],
    DICTIONARY_HEADER[1],
    DICTIONARY_HEADER[2],
    DICTIONARY_HEADER[3],
    "statut_ue",
    "date_expiration",
    "autorisation_france",
    "mentions",
    "pnec_ugl",
    "mentions_danger",
];

const IDENTIFICATION_FILE: &str = "substances_identification.csv";
const FUNCTIONS_FILE: &str = "substances_fonctions.csv";
const REGULATION_FILE: &str = "substances_reglementation.csv";
const MENTIONS_FILE: &str = "substances_mentions_categories.csv";
const PNEC_FILE: &str = "substances_pnec.csv";
const HAZARD_FILE: &str = "substances_classements_tox_ecotox.csv";
const EPHY_SUBSTANCES_FILE: &str = "substance_active_utf8.csv";
const EPHY_USAGES_FILE: &str = "usages_des_produits_autorises_utf8.csv";

const ID_COLUMN: &str = "id_bnvd";

/// Boolean function columns, in the order that picks the single usage.
const FUNCTION_COLUMNS: [(&str, UsageCategory); 10] = [
    ("herbicide", UsageCategory::Herbicide),
    ("insecticide", UsageCategory::Insecticide),
    ("fongicide", UsageCategory::Fungicide),
    ("acaricide", UsageCategory::Acaricide),
    ("bactericide", UsageCategory::Bactericide),
    ("molluscicide", UsageCategory::Molluscicide),
    ("nematicide", UsageCategory::Nematicide),
    ("regulateur_croissance", UsageCategory::GrowthRegulator),
    ("rodenticide", UsageCategory::Rodenticide),
    ("autre_fonction", UsageCategory::Other),
];

const MENTION_FLAGS: [(&str, &str); 3] = [
    ("in_biocontrole", "biocontrôle"),
    ("faible_risque", "faible risque"),
    ("candidat_substitution", "candidat à la substitution"),
];

const MAX_HAZARD_CHARS: usize = 250;
const MAX_EPHY_USAGES: usize = 8;
const MAX_EPHY_USAGE_CHARS: usize = 80;

/// Non-empty cells of one row, by column name.
type Cells = BTreeMap<String, String>;

/// Writes the usage dictionary, with its regulatory columns, from the BNV-D
/// exports in `dir`. Returns the number of rows written.
///
/// One row is written per Sandre code: the first function row whose id is
/// identified and that flags at least one function decides it.
///
/// # Errors
///
/// Returns [`DictionaryError::Source`] if the identification or function
/// table is missing or any present table is unreadable, and the other
/// [`DictionaryError`] variants if the output cannot be written.
pub fn write_usage_dictionary_from_sources(
    dir: &Path,
    path: &Path,
) -> Result<usize, DictionaryError> {
    let identification = read_required(&dir.join(IDENTIFICATION_FILE))?;
    let functions = read_required(&dir.join(FUNCTIONS_FILE))?;

    let ids = identify(&identification);
    let regulation = read_by_id(&dir.join(REGULATION_FILE))?;
    let mentions = read_by_id(&dir.join(MENTIONS_FILE))?;
    let hazards = read_by_id(&dir.join(HAZARD_FILE))?;
    let pnec = lowest_pnec(&dir.join(PNEC_FILE), &ids)?;
    let ephy_usages = match find_ephy_dir(dir) {
        Some(ephy_dir) => ephy_usages_by_cas(&ephy_dir)?,
        None => BTreeMap::new(),
    };

    let mut seen = BTreeSet::new();
    let mut rows = Vec::new();
    for row in functions.rows() {
        let cells = cells(row);
        let Some(id) = cells.get(ID_COLUMN) else {
            continue;
        };
        let Some((code, cas)) = ids.get(id) else {
            continue;
        };
        if !seen.insert(code.clone()) {
            continue;
        }
        let Some(category) = function_usage(&cells) else {
            log::trace!("No function flagged for {id} (parameter {code})");
            continue;
        };

        let typical_uses = match ephy_usages.get(cas) {
            Some(usages) if !cas.is_empty() => usages.join("; "),
            _ => category.default_typical_uses().to_string(),
        };

        let mut attributes = BTreeMap::new();
        let mut set = |column: &str, value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                attributes.insert(column.to_string(), value);
            }
        };
        let regulated = regulation.get(id);
        let field = |column: &str| regulated.and_then(|c| c.get(column)).cloned();
        set("statut_ue", field("etat_reg_1107_2009"));
        set("date_expiration", field("date_expiration_approbation"));
        set("autorisation_france", field("autorisation_france"));
        set("mentions", mentions.get(id).map(mention_text));
        set("pnec_ugl", pnec.get(id).map(f64::to_string));
        set("mentions_danger", hazards.get(id).and_then(hazard_text));

        rows.push(DictionaryRow {
            code: code.clone(),
            cas: cas.clone(),
            entry: UsageOverride {
                usage: Some(category.label().to_string()),
                typical_uses: Some(typical_uses),
                attributes,
            },
        });
    }

    let written = write_rows(path, &SOURCES_HEADER, rows)?;
    log::info!(
        "Wrote {written} usage rows from {} identified substances in {} to {}",
        ids.len(),
        dir.display(),
        path.display()
    );

    Ok(written)
}

fn read_required(path: &Path) -> Result<Table, ReferenceError> {
    if !path.exists() {
        return Err(ReferenceError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    read_table(path)
}

fn cells(row: Row<'_>) -> Cells {
    row.cells()
        .map(|(header, value)| (header.to_string(), value.to_string()))
        .collect()
}

/// `id_bnvd` to `(Sandre code, CAS)`. The CAS falls back to the BNV-D one.
fn identify(table: &Table) -> BTreeMap<String, (String, String)> {
    let mut ids = BTreeMap::new();
    for row in table.rows() {
        let cells = cells(row);
        let (Some(code), Some(id)) = (cells.get("code_parametre_sandre"), cells.get(ID_COLUMN))
        else {
            continue;
        };
        let cas = cells
            .get("cas_parametre_sandre")
            .or_else(|| cells.get("cas_bnvd"))
            .cloned()
            .unwrap_or_default();
        ids.insert(id.clone(), (code.clone(), cas));
    }
    ids
}

/// Optional table keyed by `id_bnvd`. The last row of an id wins.
fn read_by_id(path: &Path) -> Result<BTreeMap<String, Cells>, ReferenceError> {
    if !path.exists() {
        log::debug!("Optional source {} not found", path.display());
        return Ok(BTreeMap::new());
    }

    let mut by_id = BTreeMap::new();
    for row in read_table(path)?.rows() {
        let cells = cells(row);
        if let Some(id) = cells.get(ID_COLUMN).cloned() {
            by_id.insert(id, cells);
        }
    }
    Ok(by_id)
}

/// Lowest PNEC in µg/L per identified substance.
fn lowest_pnec(
    path: &Path,
    ids: &BTreeMap<String, (String, String)>,
) -> Result<BTreeMap<String, f64>, ReferenceError> {
    let mut lowest: BTreeMap<String, f64> = BTreeMap::new();
    if !path.exists() {
        return Ok(lowest);
    }

    let table = read_table(path)?;
    let id_col = table.column(&[ID_COLUMN]);
    let value_col = table.column(&["valeur_pnec"]);
    let unit_col = table.column(&["unite_pnec"]);

    for row in table.rows() {
        let Some(id) = row.get_opt(id_col).filter(|id| ids.contains_key(*id)) else {
            continue;
        };
        let (Some(value), Some(unit)) = (row.get_opt(value_col), row.get_opt(unit_col)) else {
            continue;
        };
        if let Some(value) = pnec_micrograms_per_litre(value, unit) {
            lowest
                .entry(id.to_string())
                .and_modify(|min| *min = min.min(value))
                .or_insert(value);
        }
    }
    Ok(lowest)
}

/// Parses a PNEC such as `"0,54"` or `"> 0.776"` in µg/L or mg/L.
fn pnec_micrograms_per_litre(value: &str, unit: &str) -> Option<f64> {
    let value = value.trim().replace(',', ".");
    let value = value.strip_prefix('>').unwrap_or(&value).trim();
    let number = value.parse::<f64>().ok().filter(|v| v.is_finite())?;

    match unit.trim().to_lowercase().replace('µ', "u").as_str() {
        "ug/l" => Some(number),
        "mg/l" => Some(number * 1000.0),
        _ => None,
    }
}

fn truthy(value: Option<&String>) -> bool {
    value.is_some_and(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "oui" | "yes"))
}

fn function_usage(cells: &Cells) -> Option<UsageCategory> {
    FUNCTION_COLUMNS
        .iter()
        .find(|(column, _)| truthy(cells.get(*column)))
        .map(|&(_, category)| category)
}

fn mention_text(cells: &Cells) -> String {
    MENTION_FLAGS
        .iter()
        .filter(|(column, _)| truthy(cells.get(*column)))
        .map(|&(_, label)| label)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Hazard codes on one line, truncated with an ellipsis.
fn hazard_text(cells: &Cells) -> Option<String> {
    let raw = cells
        .get("codes_h_agritox")
        .or_else(|| cells.get("mentions_danger_agritox"))?;
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    if text.chars().count() > MAX_HAZARD_CHARS {
        let kept: String = text.chars().take(MAX_HAZARD_CHARS - 3).collect();
        Some(format!("{kept}..."))
    } else {
        Some(text)
    }
}

fn has_ephy_exports(dir: &Path) -> bool {
    dir.join(EPHY_SUBSTANCES_FILE).exists() && dir.join(EPHY_USAGES_FILE).exists()
}

fn find_ephy_dir(dir: &Path) -> Option<PathBuf> {
    if has_ephy_exports(dir) {
        return Some(dir.to_path_buf());
    }

    let mut children: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    children.sort();

    children.into_iter().find(|child| {
        let name = child
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        (name.contains("decision") || name.contains("intrant")) && has_ephy_exports(child)
    })
}

/// Lower-cases a substance name and drops the grave and acute accents on `e`.
fn fold_name(name: &str) -> String {
    name.to_lowercase().replace(['é', 'è'], "e")
}

/// CAS number to the short usage labels of authorized e-phy products.
fn ephy_usages_by_cas(dir: &Path) -> Result<BTreeMap<String, Vec<String>>, ReferenceError> {
    let substances = read_table(&dir.join(EPHY_SUBSTANCES_FILE))?;
    let cas_col = substances.column(&["Numero CAS"]);
    let name_col = substances.column(&["Nom substance active"]);

    let mut name_to_cas: BTreeMap<String, String> = BTreeMap::new();
    for row in substances.rows() {
        let (Some(cas), Some(name)) = (row.get_opt(cas_col), row.get_opt(name_col)) else {
            continue;
        };
        name_to_cas.insert(fold_name(name), cas.to_string());
        if let Some((first, _)) = name.split_once(' ') {
            name_to_cas.insert(first.to_lowercase(), cas.to_string());
        }
    }

    let usages = read_table(&dir.join(EPHY_USAGES_FILE))?;
    let actives_col = usages.column(&["Substances actives"]);
    let usage_col = usages.column(&["identifiant usage", "identifiant usage lib court"]);

    let mut by_cas: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in usages.rows() {
        let (Some(actives), Some(usage)) = (row.get_opt(actives_col), row.get_opt(usage_col))
        else {
            continue;
        };
        let Some(name) = active_name(actives) else {
            continue;
        };
        let Some(cas) = name_to_cas
            .get(&fold_name(name))
            .or_else(|| name_to_cas.get(&name.to_lowercase()))
        else {
            continue;
        };

        let short: String = usage
            .replace('*', ", ")
            .chars()
            .take(MAX_EPHY_USAGE_CHARS)
            .collect();
        let labels = by_cas.entry(cas.clone()).or_default();
        if !labels.contains(&short) {
            labels.push(short);
        }
    }

    for labels in by_cas.values_mut() {
        labels.truncate(MAX_EPHY_USAGES);
    }
    Ok(by_cas)
}

/// Substance name in an e-phy product composition: the text in the first
/// parentheses, or else the first word.
fn active_name(actives: &str) -> Option<&str> {
    let name = match actives.split_once('(') {
        Some((_, rest)) => rest.split(')').next().unwrap_or_default().trim(),
        None => actives.split_whitespace().next().unwrap_or_default(),
    };
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use phyto_map_reference::UsageOverrides;

    use super::*;

    fn sources_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "phyto_map_sources_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        std::fs::write(
            dir.join(IDENTIFICATION_FILE),
            "id_bnvd;code_parametre_sandre;cas_parametre_sandre;cas_bnvd\n\
             B1;1107;1912-24-9;\n\
             B2;1506;;1071-83-6\n\
             B3;;50-00-0;\n\
             B4;1680;;\n",
        )
        .unwrap();
        std::fs::write(
            dir.join(FUNCTIONS_FILE),
            "id_bnvd;herbicide;insecticide;fongicide;acaricide;autre_fonction\n\
             B1;true;false;false;false;false\n\
             B1;false;true;false;false;false\n\
             B2;oui;;;;\n\
             B3;1;;;;\n\
             B4;false;false;false;false;false\n\
             B9;true;;;;\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn builds_rows_from_identified_functions() {
        let dir = sources_dir("functions");
        let out = dir.join("out").join("ppp_usages.csv");

        let written = write_usage_dictionary_from_sources(&dir, &out).unwrap();
        assert_eq!(written, 2);

        let table = read_table(&out).unwrap();
        assert_eq!(table.headers(), SOURCES_HEADER);

        let overrides = UsageOverrides::from_table(&table).unwrap();
        let atrazine = overrides.by_code("1107").unwrap();
        assert_eq!(atrazine.usage.as_deref(), Some("herbicide"));
        assert_eq!(
            atrazine.typical_uses.as_deref(),
            Some(UsageCategory::Herbicide.default_typical_uses())
        );
        assert!(atrazine.attributes.is_empty());

        assert!(overrides.by_cas("1071-83-6").is_some());
        assert!(overrides.by_code("1680").is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn optional_tables_fill_the_regulatory_columns() {
        let dir = sources_dir("optional");
        std::fs::write(
            dir.join(REGULATION_FILE),
            "id_bnvd;etat_reg_1107_2009;date_expiration_approbation;autorisation_france\n\
             B1;Non approuvée;2004-09-10;non\n",
        )
        .unwrap();
        std::fs::write(
            dir.join(MENTIONS_FILE),
            "id_bnvd;in_biocontrole;faible_risque;candidat_substitution\n\
             B2;false;TRUE;oui\n",
        )
        .unwrap();
        std::fs::write(
            dir.join(PNEC_FILE),
            "id_bnvd;valeur_pnec;unite_pnec\n\
             B1;0,75;µg/L\n\
             B1;> 0.5;mg/L\n\
             B1;12;ng/L\n\
             B9;0.001;µg/L\n",
        )
        .unwrap();
        let long = "H400 ".repeat(60);
        std::fs::write(
            dir.join(HAZARD_FILE),
            format!("id_bnvd;codes_h_agritox;mentions_danger_agritox\nB1;H373   H410;\nB2;;{long}\n"),
        )
        .unwrap();

        let out = dir.join("ppp_usages.csv");
        write_usage_dictionary_from_sources(&dir, &out).unwrap();
        let overrides = UsageOverrides::from_table(&read_table(&out).unwrap()).unwrap();

        let atrazine = &overrides.by_code("1107").unwrap().attributes;
        assert_eq!(atrazine.get("statut_ue").map(String::as_str), Some("Non approuvée"));
        assert_eq!(atrazine.get("date_expiration").map(String::as_str), Some("2004-09-10"));
        assert_eq!(atrazine.get("autorisation_france").map(String::as_str), Some("non"));
        assert_eq!(atrazine.get("pnec_ugl").map(String::as_str), Some("0.75"));
        assert_eq!(atrazine.get("mentions_danger").map(String::as_str), Some("H373 H410"));
        assert_eq!(atrazine.get("mentions"), None);

        let glyphosate = &overrides.by_code("1506").unwrap().attributes;
        assert_eq!(
            glyphosate.get("mentions").map(String::as_str),
            Some("faible risque; candidat à la substitution")
        );
        let danger = glyphosate.get("mentions_danger").unwrap();
        assert_eq!(danger.chars().count(), MAX_HAZARD_CHARS);
        assert!(danger.ends_with("..."));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn ephy_usages_replace_generic_typical_uses() {
        let dir = sources_dir("ephy");
        let ephy = dir.join("decision_intrant_2024");
        std::fs::create_dir_all(&ephy).unwrap();
        std::fs::write(
            ephy.join(EPHY_SUBSTANCES_FILE),
            "Numero CAS;Nom substance active\n1071-83-6;Glyphosate acide\n",
        )
        .unwrap();
        std::fs::write(
            ephy.join(EPHY_USAGES_FILE),
            "Substances actives;identifiant usage\n\
             Roundup (glyphosate);Vigne*Désherbage\n\
             glyphosate 360 g/L;Arbres fruitiers*Désherbage\n\
             Roundup (glyphosate);Vigne*Désherbage\n",
        )
        .unwrap();

        let out = dir.join("ppp_usages.csv");
        write_usage_dictionary_from_sources(&dir, &out).unwrap();
        let overrides = UsageOverrides::from_table(&read_table(&out).unwrap()).unwrap();

        assert_eq!(
            overrides.by_code("1506").unwrap().typical_uses.as_deref(),
            Some("Vigne, Désherbage; Arbres fruitiers, Désherbage")
        );
        assert_eq!(
            overrides.by_code("1107").unwrap().typical_uses.as_deref(),
            Some(UsageCategory::Herbicide.default_typical_uses())
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_function_table_is_an_error() {
        let dir = sources_dir("missing");
        std::fs::remove_file(dir.join(FUNCTIONS_FILE)).unwrap();

        let result = write_usage_dictionary_from_sources(&dir, &dir.join("out.csv"));
        assert!(matches!(
            result,
            Err(DictionaryError::Source(ReferenceError::MissingFile { .. }))
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn pnec_units_and_prefixes() {
        assert_eq!(pnec_micrograms_per_litre("0,54", "µg/l"), Some(0.54));
        assert_eq!(pnec_micrograms_per_litre("> 2", "mg/L"), Some(2000.0));
        assert_eq!(pnec_micrograms_per_litre("2", "ng/L"), None);
        assert_eq!(pnec_micrograms_per_litre("n.d.", "ug/L"), None);
    }
}
