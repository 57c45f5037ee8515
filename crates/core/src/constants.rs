//! Constants used throughout the cohort core crate.
//!
//! Option catalogues mirror the NHS Data Dictionary codes offered on the cohort form.

/// Default root concept for terminology searches (`404684003 |Clinical finding|`).
pub const DEFAULT_ROOT_CODE: &str = snomed::CLINICAL_FINDING_ROOT;

/// Default base URL of the cohort builder API.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Sentinel emitted for a demographic category with nothing selected.
pub const ALL_CATEGORIES: &str = "ALL";

/// Summary text for a polarity with no criteria.
pub const NO_CRITERIA: &str = "None";

/// Default minimum age on a fresh form.
pub const DEFAULT_MIN_AGE: u32 = 18;

/// Default maximum age on a fresh form.
pub const DEFAULT_MAX_AGE: u32 = 80;

/// Upper bound accepted for either end of the age range.
pub const MAX_AGE: u32 = 120;

/// Search endpoint, relative to the API base URL.
pub const SEARCH_PATH: &str = "/api/snomed/search";

/// Descendant count endpoint, relative to the API base URL.
pub const COUNT_DESCENDANTS_PATH: &str = "/api/snomed/count-descendants-and-self";

/// Cohort submission endpoint, relative to the API base URL.
pub const COHORT_SELECT_PATH: &str = "/api/cohort/select";

/// Gender options (NHS Data Dictionary "Person Stated Gender Code").
pub const GENDER_OPTIONS: &[(&str, &str)] = &[
    ("1", "Male"),
    ("2", "Female"),
    ("3", "Non-binary"),
    ("4", "Other (not listed)"),
    ("X", "Not Known (not recorded)"),
    (
        "Z",
        "Not Stated (person asked but declined to provide a response)",
    ),
];

/// Ethnicity options (NHS Data Dictionary "Ethnic Category").
pub const ETHNICITY_OPTIONS: &[(&str, &str)] = &[
    ("A", "White - British"),
    ("B", "White - Irish"),
    ("C", "White - Any other White background"),
    ("D", "Mixed - White and Black Caribbean"),
    ("E", "Mixed - White and Black African"),
    ("F", "Mixed - White and Asian"),
    ("G", "Mixed - Any other mixed background"),
    ("H", "Asian or Asian British - Indian"),
    ("J", "Asian or Asian British - Pakistani"),
    ("K", "Asian or Asian British - Bangladeshi"),
    ("L", "Asian or Asian British - Any other Asian background"),
    ("M", "Black or Black British - Caribbean"),
    ("N", "Black or Black British - African"),
    ("P", "Black or Black British - Any other Black background"),
    ("R", "Other Ethnic Groups - Chinese"),
    ("S", "Other Ethnic Groups - Any other ethnic group"),
    ("Z", "Not stated"),
    ("99", "Not known"),
];
