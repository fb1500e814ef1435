//! Service layer for ledgerlock
//!
//! Record-level operations on top of the session: field encoding for the
//! backend and CSV import.

pub mod import;
pub mod record_codec;

pub use import::{ColumnMapping, ImportResult, ImportService, ParsedRow, RecordSink};
pub use record_codec::{FieldCipher, RecordCodec};
