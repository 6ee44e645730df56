//! In-memory adapters for tests and database-less runs.

mod notice_repository;

pub use notice_repository::InMemoryNoticeRepository;
