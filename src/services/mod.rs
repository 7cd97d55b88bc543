pub mod enrollment;
pub mod payments;
pub mod reconciliation;
pub mod sweep;

pub use enrollment::EnrollmentService;
pub use payments::{InitiatePayment, PaymentInitiated, PaymentService};
pub use reconciliation::Reconciler;
pub use sweep::MaintenanceSweep;
