use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NodeError, Result};

/// Fund wallet credited with the founding deposit.
pub const DEFAULT_FUND_ADDRESS: &str = "dUAenXe1YurRzDD35GgnyqoTDTfjMrhhDm";
pub const DEFAULT_FUND_PUBLIC_KEY: &str = "04752e4afbe121db17bd570981f8a3ca14916378685869951fb56367b416d3f672f6f356a6d0cf55cff5a49bcb1285f461f58120942b7d004140c51fc2ad1ca72b";

/// The wallet whose key approves or rejects pending transactions.
/// Loaded once at startup and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundAuthority {
    pub address: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

impl Default for FundAuthority {
    fn default() -> Self {
        Self::new(DEFAULT_FUND_ADDRESS, DEFAULT_FUND_PUBLIC_KEY)
    }
}

impl FundAuthority {
    pub fn new(address: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            public_key: public_key.into(),
        }
    }

    /// Read `{ "address": ..., "publicKey": ... }` from a JSON key file.
    /// Any other fields (private key material) are ignored.
    pub fn from_key_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            NodeError::structural(format!("cannot read key file {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            NodeError::structural(format!("invalid key file {}: {e}", path.display()))
        })
    }
}
