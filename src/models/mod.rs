pub mod access_log;
pub mod consent;
pub mod credentials;
pub mod envelope;
pub mod facility;
pub mod user;

pub use access_log::AccessLog;
pub use consent::{ConsentRecord, ConsentType, NewConsent, PatientRecord};
pub use credentials::{ActiveCredential, CredentialBundle, ScopeKind};
pub use envelope::Envelope;
pub use facility::Facility;
pub use user::{Role, UserSummary};
