use std::collections::HashSet;

/// Distinct non-empty records in first-occurrence order
///
/// Records are compared after trimming, and the trimmed value is what
/// survives.
#[must_use]
pub fn dedupe_records<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .map(|record| record.trim())
        .filter(|record| !record.is_empty())
        .filter(|record| seen.insert(*record))
        .map(str::to_string)
        .collect()
}
