use std::collections::HashMap;

/// Fixed output header, taken from the reference sample file. Update
/// this list if the sample changes.
pub const CANONICAL_HEADER: [&str; 41] = [
    "Primary Salutation",
    "Street Address",
    "Secondary Ad",
    "City Address",
    "ST",
    "Zip",
    "Z+4",
    "CRRT",
    "WalkS",
    "Delivery Point Usage Code",
    "DPBC Digit",
    "DPBC Check Digit",
    "List Code",
    "Alternate Salutation",
    "Median Age",
    "Median Home Value",
    "Median Income",
    "Dwelling Type",
    "Home Ownership Code",
    "Owner Occupied",
    "Renter Occupied",
    "Households with Children",
    "African American",
    "Asian",
    "Hispanic",
    "Education",
    "Health & Fitness",
    "Do It Yourselfer",
    "Travel",
    "Latitude",
    "Longitude",
    "Match Code Level",
    "CBSA",
    "Census Tract",
    "Census Block",
    "Endorsement Field",
    "Pre Name",
    "First Name",
    "M",
    "Last Name",
    "Post",
];

/// Canonical field -> expected uploaded column name. Canonical fields
/// without an entry here always render as quoted empty strings.
const FIELD_MAP: [(&str, &str); 11] = [
    ("Primary Salutation", "title"),
    ("Street Address", "addressl"),
    ("City Address", "city"),
    ("ST", "st"),
    ("Zip", "zip"),
    ("Z+4", "zip4"),
    ("CRRT", "crid"),
    ("WalkS", "sequence"),
    ("DPBC Digit", "dp"),
    ("DPBC Check Digit", "cd"),
    ("Endorsement Field", "endorse"),
];

/// Static output schema, built once at startup and shared through the
/// application state.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    field_map: HashMap<&'static str, &'static str>,
}

impl OutputSchema {
    pub fn new() -> Self {
        Self {
            field_map: FIELD_MAP.iter().copied().collect(),
        }
    }

    pub fn canonical_header(&self) -> &'static [&'static str] {
        &CANONICAL_HEADER
    }

    /// The uploaded column name a canonical field is filled from, if any.
    pub fn source_column(&self, canonical_field: &str) -> Option<&'static str> {
        self.field_map.get(canonical_field).copied()
    }
}

impl Default for OutputSchema {
    fn default() -> Self {
        Self::new()
    }
}
