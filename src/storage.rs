//! Secure credential storage using the OS credential store.
//!
//! On Windows this uses DPAPI (via the `keyring` crate), on macOS Keychain,
//! and on Linux the Secret Service API. Holds the generative-text extraction
//! service's endpoint and API key so neither ever lands in the SQLite file.

use keyring::Entry;
use tracing::{info, warn};

const SERVICE_NAME: &str = "otaku-pos";

// Credential keys
pub const KEY_EXTRACTION_ENDPOINT: &str = "extraction_endpoint";
pub const KEY_EXTRACTION_API_KEY: &str = "extraction_api_key";

/// All credential keys managed by this module.
const ALL_KEYS: &[&str] = &[KEY_EXTRACTION_ENDPOINT, KEY_EXTRACTION_API_KEY];

// ---------------------------------------------------------------------------
// Low-level helpers
// ---------------------------------------------------------------------------

/// Retrieve a single credential from the OS keyring. Returns `None` when the
/// entry does not exist (or the platform returns a "not found" error).
pub fn get_credential(key: &str) -> Option<String> {
    let entry = match Entry::new(SERVICE_NAME, key) {
        Ok(e) => e,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to create entry");
            return None;
        }
    };
    match entry.get_password() {
        Ok(pw) => Some(pw),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to read credential");
            None
        }
    }
}

/// Store a credential in the OS keyring.
pub fn set_credential(key: &str, value: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    entry.set_password(value).map_err(|e| e.to_string())?;
    Ok(())
}

/// Delete a credential from the OS keyring. Silently succeeds if the entry
/// does not exist.
pub fn delete_credential(key: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

pub fn has_credential(key: &str) -> bool {
    get_credential(key).is_some()
}

// ---------------------------------------------------------------------------
// High-level API
// ---------------------------------------------------------------------------

/// The AI extraction path is available once both endpoint and key exist.
pub fn extraction_is_configured() -> bool {
    has_credential(KEY_EXTRACTION_ENDPOINT) && has_credential(KEY_EXTRACTION_API_KEY)
}

/// Store extraction-service credentials from the settings view.
pub fn set_extraction_credentials(endpoint: &str, api_key: &str) -> Result<(), String> {
    let endpoint = endpoint.trim();
    let api_key = api_key.trim();
    if endpoint.is_empty() || api_key.is_empty() {
        return Err("Endpoint and API key are required".to_string());
    }
    set_credential(KEY_EXTRACTION_ENDPOINT, endpoint)?;
    set_credential(KEY_EXTRACTION_API_KEY, api_key)?;
    info!("extraction service credentials updated");
    Ok(())
}

/// Delete every stored credential (factory reset).
pub fn factory_reset() -> Result<(), String> {
    info!("performing factory reset - deleting all credentials");
    for key in ALL_KEYS {
        delete_credential(key)?;
    }
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================
