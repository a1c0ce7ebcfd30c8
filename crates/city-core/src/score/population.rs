/// Map a raw population count onto [0,1] on a log10 scale.
///
/// Absent or zero populations score zero. `max_population` is supplied by
/// the caller (scanned once from the store at startup); this function does
/// no I/O.
pub fn normalize(population: Option<i64>, max_population: i64) -> f64 {
    let Some(p) = population else {
        return 0.0;
    };
    if p <= 0 || max_population <= 1 {
        return 0.0;
    }

    let score = (p as f64).log10() / (max_population as f64).log10();
    score.clamp(0.0, 1.0)
}
