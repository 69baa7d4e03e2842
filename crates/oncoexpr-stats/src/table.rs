//! Shared TSV output helpers.

use std::fs::File;
use std::path::Path;

use oncoexpr_common::{OncoexprError, Result};

/// Missing-value marker in every written table.
pub(crate) const NA: &str = "NA";

pub(crate) fn tsv_writer(path: &Path) -> Result<csv::Writer<File>> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|e| OncoexprError::csv(path, e))
}

pub(crate) fn write_row<I, T>(writer: &mut csv::Writer<File>, path: &Path, row: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    writer
        .write_record(row)
        .map_err(|e| OncoexprError::csv(path, e))
}

pub(crate) fn finish(mut writer: csv::Writer<File>, path: &Path) -> Result<()> {
    writer.flush().map_err(|e| OncoexprError::io(path, e))
}

/// Shortest round-trip decimal, or `NA` for undefined values.
pub(crate) fn fmt_value(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        NA.to_string()
    }
}

pub(crate) fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| NA.to_string(), fmt_value)
}
