//! CSV Import service
//!
//! Parses bank CSV exports into records, encodes each one through the
//! [`RecordCodec`] and hands them to a [`RecordSink`] in bounded chunks.
//! Every field gets its own nonce, so chunks are independent of each other.

use std::collections::BTreeMap;
use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::settings::MAX_IMPORT_CHUNK;
use crate::config::SessionConfig;
use crate::error::{LockError, LockResult};
use crate::models::{Money, Record, RecordId};

use super::record_codec::{FieldCipher, RecordCodec};

/// Column mapping configuration for CSV import
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    /// Index of the date column
    pub date_column: usize,
    /// Index of the amount column (or separate inflow/outflow columns)
    pub amount_column: Option<usize>,
    /// Index of the outflow column (if using separate columns)
    pub outflow_column: Option<usize>,
    /// Index of the inflow column (if using separate columns)
    pub inflow_column: Option<usize>,
    /// Index of the payee/description column
    pub description_column: Option<usize>,
    /// Index of the category column
    pub category_column: Option<usize>,
    /// Date format string (e.g., "%Y-%m-%d", "%m/%d/%Y")
    pub date_format: String,
    /// Whether the first row is a header
    pub has_header: bool,
    /// Delimiter character
    pub delimiter: u8,
    /// Whether to invert amounts (some banks use positive for debits)
    pub invert_amounts: bool,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date_column: 0,
            amount_column: Some(1),
            outflow_column: None,
            inflow_column: None,
            description_column: Some(2),
            category_column: None,
            date_format: "%Y-%m-%d".to_string(),
            has_header: true,
            delimiter: b',',
            invert_amounts: false,
        }
    }
}

impl ColumnMapping {
    /// Create a new column mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Common mapping for bank CSV exports (date, description, amount)
    pub fn simple_bank() -> Self {
        Self {
            amount_column: Some(2),
            description_column: Some(1),
            date_format: "%m/%d/%Y".to_string(),
            ..Self::default()
        }
    }

    /// Common mapping for credit card CSV exports
    pub fn credit_card() -> Self {
        Self {
            invert_amounts: true, // Credit cards often show positive for purchases
            ..Self::simple_bank()
        }
    }

    /// Mapping for separate inflow/outflow columns
    pub fn separate_inout(
        date_col: usize,
        outflow_col: usize,
        inflow_col: usize,
        description_col: usize,
    ) -> Self {
        Self {
            date_column: date_col,
            amount_column: None,
            outflow_column: Some(outflow_col),
            inflow_column: Some(inflow_col),
            description_column: Some(description_col),
            ..Self::default()
        }
    }

    /// Headerless date/description/debit/credit/balance exports
    pub fn debit_credit_no_header() -> Self {
        Self {
            has_header: false,
            ..Self::separate_inout(0, 2, 3, 1)
        }
    }

    /// Set the date format
    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = format.to_string();
        self
    }

    /// Set whether first row is header
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Set the delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the category column
    pub fn with_category_column(mut self, column: usize) -> Self {
        self.category_column = Some(column);
        self
    }

    /// Detect a mapping from the first row of a file
    ///
    /// A first row that already parses as data is treated as a headerless
    /// debit/credit export.
    pub fn detect(first_row: &StringRecord) -> Self {
        if looks_like_data_row(first_row) {
            if first_row.len() >= 4 {
                let col2 = first_row.get(2).map(|s| s.trim()).unwrap_or("");
                let col3 = first_row.get(3).map(|s| s.trim()).unwrap_or("");
                let is_num = |s: &str| s.is_empty() || s.parse::<f64>().is_ok();

                if is_num(col2) && is_num(col3) {
                    return Self::debit_credit_no_header();
                }
            }
            return Self::new().with_header(false);
        }

        let mut mapping = Self::new();
        mapping.description_column = None;

        for (idx, header) in first_row.iter().enumerate() {
            let h = header.to_lowercase();
            let h = h.trim();

            if h.contains("date") || h.contains("posted") {
                mapping.date_column = idx;
            } else if h.contains("amount") {
                mapping.amount_column = Some(idx);
            } else if h.contains("debit") || h.contains("outflow") || h.contains("withdrawal") {
                mapping.outflow_column = Some(idx);
            } else if h.contains("credit") || h.contains("inflow") || h.contains("deposit") {
                mapping.inflow_column = Some(idx);
            } else if h.contains("category") {
                mapping.category_column = Some(idx);
            } else if h.contains("description")
                || h.contains("payee")
                || h.contains("merchant")
                || h.contains("name")
                || h.contains("memo")
            {
                if mapping.description_column.is_none() {
                    mapping.description_column = Some(idx);
                }
            }
        }

        // If we have separate inflow/outflow, clear the amount column
        if mapping.outflow_column.is_some() && mapping.inflow_column.is_some() {
            mapping.amount_column = None;
        }

        mapping
    }
}

/// A parsed row from the CSV before encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    /// Transaction date
    pub date: NaiveDate,
    /// Amount (negative for outflow)
    pub amount: Money,
    /// Payee/description
    pub description: String,
    /// Category label
    pub category: Option<String>,
    /// Data row number (1-based, excluding header)
    pub row_number: usize,
}

impl ParsedRow {
    /// Stable fingerprint for duplicate detection
    ///
    /// Only attached to records stored as plaintext: a hash of date, amount
    /// and payee is guessable and would undo field encryption.
    pub fn import_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.date.to_string().as_bytes());
        hasher.update(self.amount.cents().to_le_bytes());
        hasher.update(self.description.as_bytes());
        let digest = hasher.finalize();

        let hex: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
        format!("imp-{}", hex)
    }

    fn into_record(self) -> Record {
        let import_id = self.import_id();
        let mut record = Record::new(self.date, self.amount, self.description);
        record.category = self.category;
        record.import_id = Some(import_id);
        record
    }
}

/// Destination of imported records (the backend's batch insert)
pub trait RecordSink {
    /// Store one chunk of encoded records
    fn insert_batch(&mut self, records: &[Record]) -> LockResult<()>;

    /// Whether a plaintext record with this import id already exists
    fn contains_import_id(&self, _import_id: &str) -> bool {
        false
    }
}

/// Result of a completed import
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    /// Number of records stored
    pub imported: usize,
    /// Number of records stored encrypted
    pub encrypted: usize,
    /// Number of duplicates skipped
    pub duplicates_skipped: usize,
    /// Number of rows that were not stored
    pub errors: usize,
    /// Number of chunks sent to the sink
    pub chunks: usize,
    /// IDs of stored records
    pub imported_ids: Vec<RecordId>,
    /// Error messages by row number
    pub error_messages: BTreeMap<usize, String>,
}

/// Service for CSV import
pub struct ImportService<'a, C: FieldCipher> {
    codec: RecordCodec<'a, C>,
    chunk_size: usize,
}

impl<'a, C: FieldCipher> ImportService<'a, C> {
    /// Create an import service writing at most `chunk_size` records per batch
    pub fn new(cipher: &'a C, chunk_size: usize) -> LockResult<Self> {
        if chunk_size == 0 || chunk_size > MAX_IMPORT_CHUNK {
            return Err(LockError::Config(format!(
                "import chunk size must be between 1 and {}",
                MAX_IMPORT_CHUNK
            )));
        }

        Ok(Self {
            codec: RecordCodec::new(cipher),
            chunk_size,
        })
    }

    /// Create an import service using the configured chunk size
    pub fn with_config(cipher: &'a C, config: &SessionConfig) -> LockResult<Self> {
        Self::new(cipher, config.import_chunk_size)
    }

    /// Parse CSV data into rows
    ///
    /// Bad rows are reported individually and do not stop parsing.
    pub fn parse_csv<R: Read>(
        &self,
        reader: R,
        mapping: &ColumnMapping,
    ) -> Vec<Result<ParsedRow, (usize, String)>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(mapping.has_header)
            .delimiter(mapping.delimiter)
            .flexible(true)
            .from_reader(reader);

        let mut results = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let row_number = idx + 1;
            let parsed = result
                .map_err(|e| format!("Error reading CSV record: {}", e))
                .and_then(|record| parse_record(&record, row_number, mapping));
            results.push(parsed.map_err(|e| (row_number, e)));
        }
        results
    }

    /// Parse, encode and store CSV data
    pub fn import<R: Read, S: RecordSink>(
        &self,
        reader: R,
        mapping: &ColumnMapping,
        sink: &mut S,
    ) -> LockResult<ImportResult> {
        let mut result = ImportResult::default();
        let mut pending: Vec<(usize, Record)> = Vec::new();

        for parsed in self.parse_csv(reader, mapping) {
            let row = match parsed {
                Ok(row) => row,
                Err((row_number, message)) => {
                    result.errors += 1;
                    result.error_messages.insert(row_number, message);
                    continue;
                }
            };

            let row_number = row.row_number;
            let record = row.into_record();
            if record
                .import_id
                .as_deref()
                .is_some_and(|id| sink.contains_import_id(id))
            {
                result.duplicates_skipped += 1;
                continue;
            }

            match self.codec.encode(record) {
                Ok(mut encoded) => {
                    if encoded.is_encrypted() {
                        encoded.import_id = None;
                    }
                    pending.push((row_number, encoded));
                }
                Err(e) => {
                    result.errors += 1;
                    result.error_messages.insert(row_number, e.to_string());
                }
            }
        }

        for chunk in pending.chunks(self.chunk_size) {
            let records: Vec<Record> = chunk.iter().map(|(_, record)| record.clone()).collect();
            result.chunks += 1;

            match sink.insert_batch(&records) {
                Ok(()) => {
                    result.imported += records.len();
                    result.encrypted += records.iter().filter(|r| r.is_encrypted()).count();
                    result.imported_ids.extend(records.iter().map(|r| r.id));
                }
                Err(e) => {
                    warn!(error = %e, size = records.len(), "import chunk rejected");
                    result.errors += records.len();
                    for (row_number, _) in chunk {
                        result.error_messages.insert(*row_number, e.to_string());
                    }
                }
            }
        }

        info!(
            imported = result.imported,
            encrypted = result.encrypted,
            duplicates = result.duplicates_skipped,
            errors = result.errors,
            "CSV import finished"
        );
        Ok(result)
    }
}

/// Parse a single CSV record
fn parse_record(
    record: &StringRecord,
    row_number: usize,
    mapping: &ColumnMapping,
) -> Result<ParsedRow, String> {
    let date_str = record
        .get(mapping.date_column)
        .ok_or_else(|| "Missing date column".to_string())?
        .trim();
    let date = parse_date(date_str, &mapping.date_format)?;

    let amount = parse_amount_from_record(record, mapping)?;

    let description = mapping
        .description_column
        .and_then(|col| record.get(col))
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let category = mapping
        .category_column
        .and_then(|col| record.get(col))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(ParsedRow {
        date,
        amount,
        description,
        category,
        row_number,
    })
}

/// Parse amount from a record
fn parse_amount_from_record(record: &StringRecord, mapping: &ColumnMapping) -> Result<Money, String> {
    let amount = if let Some(amount_col) = mapping.amount_column {
        let amount_str = record
            .get(amount_col)
            .ok_or_else(|| "Missing amount column".to_string())?
            .trim();

        parse_amount_string(amount_str)?
    } else {
        let outflow_col = mapping
            .outflow_column
            .ok_or_else(|| "Missing outflow column configuration".to_string())?;
        let inflow_col = mapping
            .inflow_column
            .ok_or_else(|| "Missing inflow column configuration".to_string())?;

        let outflow_str = record.get(outflow_col).map(|s| s.trim()).unwrap_or("");
        let inflow_str = record.get(inflow_col).map(|s| s.trim()).unwrap_or("");

        let outflow = if outflow_str.is_empty() {
            Money::zero()
        } else {
            -parse_amount_string(outflow_str)?.abs()
        };

        let inflow = if inflow_str.is_empty() {
            Money::zero()
        } else {
            parse_amount_string(inflow_str)?.abs()
        };

        outflow + inflow
    };

    if mapping.invert_amounts {
        Ok(-amount)
    } else {
        Ok(amount)
    }
}

/// Parse a date string using multiple format attempts
fn parse_date(s: &str, primary_format: &str) -> Result<NaiveDate, String> {
    if let Ok(date) = NaiveDate::parse_from_str(s, primary_format) {
        return Ok(date);
    }

    const FORMATS: [&str; 8] = [
        "%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y", "%d/%m/%Y", "%d/%m/%y", "%Y/%m/%d", "%m-%d-%Y",
        "%d-%m-%Y",
    ];

    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            debug!(format, "date parsed with fallback format");
            return Ok(date);
        }
    }

    Err(format!("Could not parse date: '{}'", s))
}

/// Whether the first column parses as a date
fn looks_like_data_row(record: &StringRecord) -> bool {
    let Some(first) = record.get(0) else {
        return false;
    };
    let first = first.trim();

    ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y", "%d/%m/%Y", "%d/%m/%y"]
        .iter()
        .any(|format| NaiveDate::parse_from_str(first, format).is_ok())
}

/// Parse an amount string, handling currency symbols and accounting negatives
fn parse_amount_string(s: &str) -> Result<Money, String> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '(' | ')'))
        .collect();

    Money::parse(&cleaned).map_err(|e| format!("Could not parse amount '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Amount;
    use crate::services::record_codec::testing::KeyCipher;
    use std::collections::HashSet;

    #[derive(Default)]
    struct MemorySink {
        batches: Vec<Vec<Record>>,
        known_import_ids: HashSet<String>,
        reject_batch: Option<usize>,
    }

    impl RecordSink for MemorySink {
        fn insert_batch(&mut self, records: &[Record]) -> LockResult<()> {
            if self.reject_batch == Some(self.batches.len()) {
                self.reject_batch = None;
                self.batches.push(Vec::new());
                return Err(LockError::Storage("backend unavailable".into()));
            }
            self.batches.push(records.to_vec());
            Ok(())
        }

        fn contains_import_id(&self, import_id: &str) -> bool {
            self.known_import_ids.contains(import_id)
        }
    }

    fn csv_with_rows(rows: usize) -> String {
        let mut data = String::from("Date,Amount,Description\n");
        for i in 0..rows {
            data.push_str(&format!("2025-01-{:02},-{}.00,Store {}\n", i % 28 + 1, i + 1, i));
        }
        data
    }

    #[test]
    fn test_parse_simple_csv() {
        let cipher = KeyCipher(None);
        let service = ImportService::new(&cipher, 100).unwrap();

        let csv_data =
            "Date,Amount,Description\n2025-01-15,-50.00,Test Store\n2025-01-16,100.00,Paycheck";
        let results = service.parse_csv(csv_data.as_bytes(), &ColumnMapping::new());
        assert_eq!(results.len(), 2);

        let row1 = results[0].as_ref().unwrap();
        assert_eq!(row1.date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(row1.amount.cents(), -5000);
        assert_eq!(row1.description, "Test Store");

        let row2 = results[1].as_ref().unwrap();
        assert_eq!(row2.amount.cents(), 10000);
        assert_eq!(row2.row_number, 2);
    }

    #[test]
    fn test_parse_separate_inflow_outflow() {
        let cipher = KeyCipher(None);
        let service = ImportService::new(&cipher, 100).unwrap();

        let csv_data = "Date,Outflow,Inflow,Description\n2025-01-15,50.00,,Groceries\n2025-01-16,,100.00,Paycheck";
        let mapping = ColumnMapping::separate_inout(0, 1, 2, 3);
        let results = service.parse_csv(csv_data.as_bytes(), &mapping);

        assert_eq!(results[0].as_ref().unwrap().amount.cents(), -5000);
        assert_eq!(results[1].as_ref().unwrap().amount.cents(), 10000);
    }

    #[test]
    fn test_parse_date_and_amount_formats() {
        let cipher = KeyCipher(None);
        let service = ImportService::new(&cipher, 100).unwrap();

        let csv_data = "Date,Amount,Description\n01/15/2025,\"(1,250.00)\",Rent\n01/16/2025,$12.5,Refund";
        let mapping = ColumnMapping::new().with_date_format("%m/%d/%Y");
        let results = service.parse_csv(csv_data.as_bytes(), &mapping);

        let rent = results[0].as_ref().unwrap();
        assert_eq!(rent.date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(rent.amount.cents(), -125000);
        assert_eq!(results[1].as_ref().unwrap().amount.cents(), 1250);
    }

    #[test]
    fn test_credit_card_inverts() {
        let cipher = KeyCipher(None);
        let service = ImportService::new(&cipher, 100).unwrap();

        let csv_data = "Date,Description,Amount\n02/01/2025,Bookshop,19.99";
        let results = service.parse_csv(csv_data.as_bytes(), &ColumnMapping::credit_card());
        assert_eq!(results[0].as_ref().unwrap().amount.cents(), -1999);
    }

    #[test]
    fn test_detect_mapping() {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader("Transaction Date,Debit,Credit,Description,Category".as_bytes());
        let first = reader.records().next().unwrap().unwrap();
        let mapping = ColumnMapping::detect(&first);

        assert_eq!(mapping.date_column, 0);
        assert_eq!(mapping.outflow_column, Some(1));
        assert_eq!(mapping.inflow_column, Some(2));
        assert_eq!(mapping.description_column, Some(3));
        assert_eq!(mapping.category_column, Some(4));
        assert!(mapping.amount_column.is_none());
    }

    #[test]
    fn test_detect_headerless_debit_credit() {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader("2025-01-15,Coffee,4.50,,995.50".as_bytes());
        let first = reader.records().next().unwrap().unwrap();
        let mapping = ColumnMapping::detect(&first);

        assert!(!mapping.has_header);
        assert_eq!(mapping.outflow_column, Some(2));
        assert_eq!(mapping.inflow_column, Some(3));
    }

    #[test]
    fn test_import_encrypts_in_bounded_chunks() {
        let cipher = KeyCipher::unlocked();
        let service = ImportService::new(&cipher, 100).unwrap();
        let mut sink = MemorySink::default();

        let result = service
            .import(csv_with_rows(250).as_bytes(), &ColumnMapping::new(), &mut sink)
            .unwrap();

        assert_eq!(result.imported, 250);
        assert_eq!(result.encrypted, 250);
        assert_eq!(result.chunks, 3);
        let sizes: Vec<usize> = sink.batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);

        let first = &sink.batches[0][0];
        assert!(first.is_encrypted());
        assert!(first.import_id.is_none());
        assert!(matches!(first.amount, Amount::Sealed(_)));
        assert_ne!(first.description, "Store 0");

        let decoded = RecordCodec::new(&cipher).decode(first.clone());
        assert_eq!(decoded.description, "Store 0");
        assert_eq!(decoded.amount, Amount::Plain(Money::from_cents(-100)));
    }

    #[test]
    fn test_import_while_locked_stores_plaintext_with_import_ids() {
        let cipher = KeyCipher(None);
        let service = ImportService::new(&cipher, 10).unwrap();
        let mut sink = MemorySink::default();

        let result = service
            .import(csv_with_rows(3).as_bytes(), &ColumnMapping::new(), &mut sink)
            .unwrap();
        assert_eq!(result.imported, 3);
        assert_eq!(result.encrypted, 0);
        assert!(sink.batches[0].iter().all(|r| r.import_id.is_some()));
    }

    #[test]
    fn test_duplicates_skipped() {
        let cipher = KeyCipher(None);
        let service = ImportService::new(&cipher, 10).unwrap();
        let mut sink = MemorySink::default();
        service
            .import(csv_with_rows(2).as_bytes(), &ColumnMapping::new(), &mut sink)
            .unwrap();
        sink.known_import_ids = sink.batches[0]
            .iter()
            .filter_map(|r| r.import_id.clone())
            .collect();

        let result = service
            .import(csv_with_rows(2).as_bytes(), &ColumnMapping::new(), &mut sink)
            .unwrap();
        assert_eq!(result.imported, 0);
        assert_eq!(result.duplicates_skipped, 2);
    }

    #[test]
    fn test_bad_rows_do_not_abort() {
        let cipher = KeyCipher::unlocked();
        let service = ImportService::new(&cipher, 100).unwrap();
        let mut sink = MemorySink::default();

        let csv_data = "Date,Amount,Description\n2025-01-15,-5.00,Ok\nnot-a-date,1.00,Bad\n2025-01-17,abc,Bad amount\n2025-01-18,3.00,Ok too";
        let result = service
            .import(csv_data.as_bytes(), &ColumnMapping::new(), &mut sink)
            .unwrap();

        assert_eq!(result.imported, 2);
        assert_eq!(result.errors, 2);
        assert!(result.error_messages[&2].contains("Could not parse date"));
        assert!(result.error_messages[&3].contains("Could not parse amount"));
    }

    #[test]
    fn test_doubled_sign_amount_is_a_row_error() {
        let cipher = KeyCipher(None);
        let service = ImportService::new(&cipher, 100).unwrap();
        let mut sink = MemorySink::default();

        let csv_data = "Date,Amount,Description\n2025-01-15,--5.50,Weird\n2025-01-16,(-5.50),Weirder\n2025-01-17,(5.50),Refund";
        let result = service
            .import(csv_data.as_bytes(), &ColumnMapping::new(), &mut sink)
            .unwrap();

        assert_eq!(result.imported, 1);
        assert_eq!(result.errors, 2);
        assert!(result.error_messages[&1].contains("Could not parse amount"));
        assert!(result.error_messages[&2].contains("Could not parse amount"));
        assert_eq!(
            sink.batches[0][0].amount,
            Amount::Plain(Money::from_cents(-550))
        );
    }

    #[test]
    fn test_rejected_chunk_is_reported_per_row() {
        let cipher = KeyCipher::unlocked();
        let service = ImportService::new(&cipher, 2).unwrap();
        let mut sink = MemorySink {
            reject_batch: Some(1),
            ..MemorySink::default()
        };

        let result = service
            .import(csv_with_rows(5).as_bytes(), &ColumnMapping::new(), &mut sink)
            .unwrap();
        assert_eq!(result.chunks, 3);
        assert_eq!(result.imported, 3);
        assert_eq!(result.errors, 2);
        assert!(result.error_messages.contains_key(&3));
        assert!(result.error_messages.contains_key(&4));
    }

    #[test]
    fn test_chunk_size_bounds() {
        let cipher = KeyCipher(None);
        assert!(ImportService::new(&cipher, 0).is_err());
        assert!(ImportService::new(&cipher, 101).is_err());
        assert!(ImportService::new(&cipher, 100).is_ok());
    }

    #[test]
    fn test_with_config_uses_chunk_size() {
        let cipher = KeyCipher(None);
        let config = SessionConfig {
            import_chunk_size: 4,
            ..SessionConfig::default()
        };
        let service = ImportService::with_config(&cipher, &config).unwrap();
        let mut sink = MemorySink::default();

        let result = service
            .import(csv_with_rows(9).as_bytes(), &ColumnMapping::new(), &mut sink)
            .unwrap();
        assert_eq!(result.chunks, 3);
        assert_eq!(sink.batches.last().map(Vec::len), Some(1));
    }

    #[test]
    fn test_import_id_is_stable() {
        let row = ParsedRow {
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            amount: Money::from_cents(-5000),
            description: "Test Store".to_string(),
            category: None,
            row_number: 1,
        };
        let id = row.import_id();
        assert!(id.starts_with("imp-"));
        assert_eq!(id.len(), 20);
        assert_eq!(id, row.clone().import_id());
    }
}
