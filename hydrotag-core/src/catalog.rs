/// Call-type value that switches the form to a free-text entry.
pub const OTHER_CALL_TYPE: &str = "other";

/// Species selectable in the annotation form: (value, display name).
pub const SPECIES: &[(&str, &str)] = &[
    ("blue-whale", "Blue Whale"),
    ("humpback-whale", "Humpback Whale"),
    ("fin-whale", "Fin Whale"),
    ("gray-whale", "Gray Whale"),
];

/// Call types selectable in the annotation form: (value, display name).
pub const CALL_TYPES: &[(&str, &str)] = &[
    ("song", "Song"),
    ("call", "Call"),
    ("click", "Click"),
    ("whistle", "Whistle"),
    ("burst", "Burst"),
    ("moan", "Moan"),
    ("grunt", "Grunt"),
    ("tonal", "Tonal"),
    (OTHER_CALL_TYPE, "Other"),
];

fn lookup(table: &'static [(&'static str, &'static str)], value: &str) -> Option<&'static str> {
    table.iter().find(|(v, _)| *v == value).map(|(_, name)| *name)
}

pub fn species_name(value: &str) -> Option<&'static str> {
    lookup(SPECIES, value)
}

pub fn call_type_name(value: &str) -> Option<&'static str> {
    lookup(CALL_TYPES, value)
}
