pub mod credentials;
#[cfg(test)]
pub mod memory;

pub use credentials::{CredentialStore, FileCredentialStore, StoreError};
