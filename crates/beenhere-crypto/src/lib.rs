pub mod envelope;
pub mod pepper;

pub use envelope::{decrypt_with_password, encrypt_with_password, BackupEnvelope};
pub use pepper::Pepper;
