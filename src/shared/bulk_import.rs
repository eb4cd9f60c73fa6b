use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::{info, warn};

use crate::binding::Registry;
use crate::error::ServiceError;

/// Maximum number of device codes accepted from one file
pub const MAX_IMPORT_ROWS: usize = 5000;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const CFB_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Outcome of a bulk bind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub requested: usize,
    pub bound: usize,
    pub failed: Vec<BatchFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub device_code: String,
    pub error: String,
    pub message: String,
}

/// Read device codes from the first column of an uploaded file
///
/// Workbooks (xlsx, xlsm, xlsb, ods, xls) are read from their first sheet;
/// anything else is parsed as CSV. The first row is data.
pub fn read_device_codes(bytes: &[u8], max: usize) -> Result<Vec<String>, ServiceError> {
    if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(CFB_MAGIC) {
        read_workbook(bytes, max)
    } else {
        read_csv(bytes, max)
    }
}

/// Keep non-blank trimmed cells, failing once more than `max` are seen
pub fn collect_device_codes<I, S>(cells: I, max: usize) -> Result<Vec<String>, ServiceError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut codes = Vec::new();
    for cell in cells {
        push_code(&mut codes, cell.as_ref(), max)?;
    }
    Ok(codes)
}

fn push_code(codes: &mut Vec<String>, cell: &str, max: usize) -> Result<(), ServiceError> {
    let value = cell.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if value.is_empty() {
        return Ok(());
    }
    if codes.len() >= max {
        return Err(ServiceError::ImportLimitExceeded(max));
    }
    codes.push(value.to_string());
    Ok(())
}

fn read_workbook(bytes: &[u8], max: usize) -> Result<Vec<String>, ServiceError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ServiceError::Spreadsheet(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ServiceError::Spreadsheet("workbook has no sheets".to_string()))?
        .map_err(|e| ServiceError::Spreadsheet(e.to_string()))?;

    // A range starting right of column A means column A is empty
    let first_column_present = range.start().map(|(_, col)| col == 0).unwrap_or(false);
    if !first_column_present {
        return Ok(Vec::new());
    }

    collect_device_codes(
        range.rows().map(|row| row.first().map(cell_text).unwrap_or_default()),
        max,
    )
}

fn read_csv(bytes: &[u8], max: usize) -> Result<Vec<String>, ServiceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut codes = Vec::new();
    let mut record = csv::StringRecord::new();
    while reader
        .read_record(&mut record)
        .map_err(|e| ServiceError::Spreadsheet(e.to_string()))?
    {
        push_code(&mut codes, record.get(0).unwrap_or_default(), max)?;
    }

    Ok(codes)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

impl<'a> Registry<'a> {
    /// Bind every code in order; failures are logged and reported per row
    pub async fn bind_batch(
        &self,
        user_id: &str,
        agent_id: &str,
        remark: &str,
        codes: &[String],
    ) -> BatchReport {
        let mut report = BatchReport {
            requested: codes.len(),
            bound: 0,
            failed: Vec::new(),
        };

        for code in codes {
            match self.bind_device(user_id, agent_id, code, remark).await {
                Ok(_) => report.bound += 1,
                Err(e) => {
                    warn!(
                        device_code = %code,
                        error = %e,
                        "Skipping device code in batch"
                    );
                    report.failed.push(BatchFailure {
                        device_code: code.clone(),
                        error: e.error_code().to_string(),
                        message: e.public_message(),
                    });
                }
            }
        }

        info!(
            agent_id = %agent_id,
            requested = report.requested,
            bound = report.bound,
            failed = report.failed.len(),
            "Batch bind finished"
        );
        report
    }
}
