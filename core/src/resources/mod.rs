//! PostgreSQL gateways, one module per resource.

/// Dialysis and nephrologist appointments.
pub mod appointments;
/// Hospital staff.
pub mod hospital_staff;
/// Notifications.
pub mod notifications;
/// Patient history ledger.
pub mod patient_history;
/// Patients.
pub mod patients;
/// Payment methods.
pub mod payment_details;
/// Posts.
pub mod posts;
/// System administrators.
pub mod system_admins;

pub use appointments::{AppointmentGateway, AppointmentType};
pub use hospital_staff::StaffGateway;
pub use notifications::NotificationGateway;
pub use patient_history::{HistoryLedger, PatientHistory, PatientHistoryGateway};
pub use patients::PatientGateway;
pub use payment_details::PaymentDetailGateway;
pub use posts::PostGateway;
pub use system_admins::AdminGateway;
