//! Account persistence between sessions.
//!
//! The account file holds the `AccountState` as JSON. A session seeds its
//! balance from the file when one exists and writes the final state back on
//! exit. Risk and payout fractions always come from the session config.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};

use papertrade_core::domain::AccountState;

#[derive(Debug, Error)]
pub enum AccountFileError {
    #[error("account file I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("account file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read a saved account. `Ok(None)` when no file exists yet.
pub fn load_account(path: &Path) -> Result<Option<AccountState>, AccountFileError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(AccountFileError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| AccountFileError::Malformed {
            path: path.to_path_buf(),
            source,
        })
}

/// Write the account, replacing any previous file in one rename.
pub fn save_account(path: &Path, account: &AccountState) -> Result<(), AccountFileError> {
    let io_err = |source| AccountFileError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(account).map_err(|source| AccountFileError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    info!(path = %path.display(), balance = account.balance, "account saved");
    Ok(())
}

/// Seed `configured` with the saved balance at `path`, if any.
///
/// An unreadable or malformed file is logged and the configured account is
/// used unchanged, so a damaged file never blocks a session from starting.
pub fn restore_balance(path: &Path, configured: AccountState) -> AccountState {
    match load_account(path) {
        Ok(Some(saved)) if saved.balance.is_finite() => {
            info!(path = %path.display(), balance = saved.balance, "account restored");
            AccountState {
                balance: saved.balance,
                ..configured
            }
        }
        Ok(Some(saved)) => {
            error!(path = %path.display(), balance = saved.balance, "saved balance is not finite, using config");
            configured
        }
        Ok(None) => configured,
        Err(err) => {
            error!(error = %err, "could not load account, using config");
            configured
        }
    }
}
