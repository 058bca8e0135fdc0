use std::path::Path;

use anyhow::{Context, Result, bail};

use super::model::{CellValue, Dataset};

// ---------------------------------------------------------------------------
// Upload payload
// ---------------------------------------------------------------------------

/// Raw file handed to the processing service. The table structure is only
/// ever taken from the service's answer, never guessed here.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Read a file for upload.  Dispatch by extension.
///
/// Supported formats (whatever the service's CSV reader accepts):
/// * `.csv` – comma separated with a header row
/// * `.txt` – same layout, different extension
pub fn read_upload(path: &Path) -> Result<UploadFile> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "txt" => {}
        other => bail!("Unsupported file extension: .{other}"),
    }

    let bytes = std::fs::read(path)
        .with_context(|| format!("reading {}", path.display()))?;
    if bytes.is_empty() {
        bail!("{} is empty", path.display());
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.csv")
        .to_string();

    Ok(UploadFile { file_name, bytes })
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

/// Write a dataset as CSV: header row, then one record per row.
/// Nulls become empty fields.
pub fn write_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_records(dataset, &mut writer)?;
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_records<W: std::io::Write>(dataset: &Dataset, writer: &mut csv::Writer<W>) -> Result<()> {
    writer
        .write_record(dataset.columns())
        .context("writing CSV header")?;
    for (row_no, row) in dataset.rows().iter().enumerate() {
        writer
            .write_record(row.iter().map(csv_field))
            .with_context(|| format!("writing CSV row {row_no}"))?;
    }
    Ok(())
}

fn csv_field(cell: &CellValue) -> String {
    match cell {
        CellValue::Null => String::new(),
        // Full precision, unlike the 4-digit display form.
        CellValue::Float(v) => v.to_string(),
        other => other.to_string(),
    }
}
