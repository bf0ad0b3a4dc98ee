//! Target-department membership.

use phyto_map_measurement_models::RawMeasurement;

/// Department used when none is configured (Côte-d'Or).
pub const DEFAULT_DEPARTMENT: &str = "21";

/// Digits in a metropolitan department code.
const DEPARTMENT_DIGITS: usize = 2;
/// Digits in an INSEE commune code.
const COMMUNE_DIGITS: usize = 5;

/// Keeps records located in one department.
///
/// A record belongs to the department when its department code equals the
/// target, OR its department number does, OR its INSEE commune code starts
/// with it. A record carrying none of those signals is excluded.
///
/// All-digit codes that lost their leading zero on the way through a JSON
/// number (`1` for `"01"`, `1053` for `"01053"`) are zero-padded before
/// comparing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentFilter {
    code: String,
}

impl Default for DepartmentFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DEPARTMENT)
    }
}

impl DepartmentFilter {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: zero_pad(code.into().trim(), DEPARTMENT_DIGITS),
        }
    }

    /// Target department code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Membership test over the three location signals.
    #[must_use]
    pub fn matches(
        &self,
        department_code: Option<&str>,
        department_number: Option<&str>,
        commune_code: Option<&str>,
    ) -> bool {
        let equals = |value: Option<&str>| {
            value.is_some_and(|v| zero_pad(v.trim(), DEPARTMENT_DIGITS) == self.code)
        };

        equals(department_code)
            || equals(department_number)
            || commune_code.is_some_and(|insee| {
                zero_pad(insee.trim(), COMMUNE_DIGITS).starts_with(self.code.as_str())
            })
    }

    /// Membership test for a [`RawMeasurement`].
    #[must_use]
    pub fn contains(&self, raw: &RawMeasurement) -> bool {
        self.matches(
            raw.department_code.as_deref(),
            raw.department_number.as_deref(),
            raw.commune_code.as_deref(),
        )
    }
}

/// Left-pads an all-digit code with zeros to `width`. Other codes, such as
/// `2A`, are returned unchanged.
fn zero_pad(code: &str, width: usize) -> String {
    if !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit()) {
        format!("{code:0>width$}")
    } else {
        code.to_string()
    }
}
