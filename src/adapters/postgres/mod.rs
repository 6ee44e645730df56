//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresNoticeRepository` - Notification rows in `tbl_notification`

mod notice_repository;

pub use notice_repository::PostgresNoticeRepository;
