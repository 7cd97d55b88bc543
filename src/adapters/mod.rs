pub mod http_identity;
pub mod postgres_catalog;
pub mod postgres_enrollments;
pub mod postgres_ledger;

pub use http_identity::HttpUserDirectory;
pub use postgres_catalog::PostgresCourseCatalog;
pub use postgres_enrollments::PostgresEnrollmentStore;
pub use postgres_ledger::PostgresTransactionLedger;
