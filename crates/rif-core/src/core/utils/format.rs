const SUFFIXES: [(f64, &str); 8] = [
    (1e3, " "),
    (1e6, "K"),
    (1e9, "M"),
    (1e12, "G"),
    (1e15, "T"),
    (1e18, "P"),
    (1e21, "E"),
    (1e24, "Z"),
];

/// Formats a large count with a metric suffix, e.g. `12.35M`.
///
/// Values below one thousand get a trailing space so columns line up in logs.
pub fn kmgt(value: f64) -> String {
    let mut scale = 1.0;
    for (limit, suffix) in SUFFIXES {
        if value < limit {
            return format!("{:.2}{}", value / scale, suffix);
        }
        scale = limit;
    }
    format!("{:.2}Y", value / 1e24)
}
