pub mod course;
pub mod enrollment;
pub mod transaction;

pub use course::{Course, CourseStatus};
pub use enrollment::{Enrollment, EnrollmentStatus};
pub use transaction::{Gateway, Transaction, TransactionStatus, LOCAL_REFERENCE_PREFIX};
