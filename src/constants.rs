//! # System Constants
//!
//! Circuit names, breaker defaults and paging limits shared across the record layer.

/// Stable circuit names, one per repository operation kind
pub mod circuits {
    pub const INSERT_RECORD: &str = "insert_record";
    pub const UPDATE_RECORD: &str = "update_record";
    pub const DELETE_RECORD: &str = "delete_record";
    pub const SELECT_RECORD_BY_ID: &str = "select_record_by_id";
    pub const SELECT_RECORDS: &str = "select_records";

    /// Every circuit the record repositories register
    pub const ALL: [&str; 5] = [
        INSERT_RECORD,
        UPDATE_RECORD,
        DELETE_RECORD,
        SELECT_RECORD_BY_ID,
        SELECT_RECORDS,
    ];
}

/// Defaults applied to circuits without an explicit configuration
pub mod circuit_defaults {
    pub const TIMEOUT_MS: u64 = 1_000;
    pub const MAX_CONCURRENT_REQUESTS: usize = 10;
    pub const ERROR_PERCENT_THRESHOLD: u8 = 50;
    pub const REQUEST_VOLUME_THRESHOLD: u64 = 20;
    pub const SLEEP_WINDOW_MS: u64 = 5_000;

    /// Rolling statistics window: `ROLLING_WINDOW_BUCKETS` buckets of `BUCKET_WIDTH_MS` each
    pub const ROLLING_WINDOW_BUCKETS: usize = 10;
    pub const BUCKET_WIDTH_MS: u64 = 1_000;
}

/// Pagination limits for record listings
pub mod pagination {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;
    pub const MAX_PAGE_SIZE: u32 = 1_000;
}

/// Database table backing the record repositories
pub const RECORDS_TABLE: &str = "records";
