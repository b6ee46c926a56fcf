//! Single-column delimited text

use crate::utils::EXPORT_HEADER_LABEL;

/// Header row plus one row per record, each line ending in `\n`
///
/// Fields are quoted only when they hold a delimiter, quote or line break.
pub fn serialize_rows(rows: &[String]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record([EXPORT_HEADER_LABEL])?;
    for row in rows {
        writer.write_record([row])?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
