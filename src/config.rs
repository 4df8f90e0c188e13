use std::env;
use std::path::PathBuf;

use crate::blockchain::ChainRules;
use crate::error::{NodeError, Result};
use crate::ledger::LedgerPolicy;
use crate::transaction::ValidationPolicy;
use crate::transaction::validation::validate_address;
use crate::wallet::{FundAuthority, address_from_public_key};

/// Runtime settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub authority: FundAuthority,
    pub chain_file: Option<PathBuf>,
    pub tx_policy: ValidationPolicy,
    pub ledger_policy: LedgerPolicy,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match lookup("PORT") {
            Some(v) => v
                .parse()
                .map_err(|_| NodeError::structural(format!("PORT must be a port number, got {v:?}")))?,
            None => 3001,
        };

        let authority = match lookup("FUND_KEY_FILE") {
            Some(path) => FundAuthority::from_key_file(path)?,
            None => {
                let default = FundAuthority::default();
                FundAuthority::new(
                    lookup("FUND_ADDRESS").unwrap_or(default.address),
                    lookup("FUND_PUBLIC_KEY").unwrap_or(default.public_key),
                )
            }
        };
        validate_authority(&authority)?;

        Ok(Self {
            host,
            port,
            authority,
            chain_file: lookup("CHAIN_FILE").map(PathBuf::from),
            tx_policy: ValidationPolicy {
                require_positive_amounts: flag(&lookup, "REQUIRE_POSITIVE_AMOUNTS", true)?,
            },
            ledger_policy: LedgerPolicy {
                allow_negative_balances: flag(&lookup, "ALLOW_NEGATIVE_BALANCES", false)?,
            },
        })
    }

    pub fn chain_rules(&self) -> ChainRules {
        let mut rules = ChainRules::new(self.authority.clone());
        rules.tx_policy = self.tx_policy;
        rules.ledger_policy = self.ledger_policy;
        rules
    }
}

/// The founding block embeds the authority, so a malformed one would
/// make the node reject its own genesis.
fn validate_authority(authority: &FundAuthority) -> Result<()> {
    validate_address(&authority.address)
        .map_err(|e| NodeError::structural(format!("fund authority: {e}")))?;
    address_from_public_key(&authority.public_key)
        .map_err(|e| NodeError::structural(format!("fund authority public key: {e}")))?;
    Ok(())
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool> {
    match lookup(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(NodeError::structural(format!(
            "{key} must be true or false, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::TestKeys;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.host, "127.0.0.1");
        assert_eq!(s.port, 3001);
        assert_eq!(s.authority, FundAuthority::default());
        assert_eq!(s.chain_file, None);
        assert!(s.tx_policy.require_positive_amounts);
        assert!(!s.ledger_policy.allow_negative_balances);
    }

    #[test]
    fn overrides_are_applied() {
        let keys = TestKeys::generate();
        let s = settings(&[
            ("PORT", "8080"),
            ("FUND_ADDRESS", keys.address.as_str()),
            ("CHAIN_FILE", "/tmp/chain.json"),
            ("ALLOW_NEGATIVE_BALANCES", "TRUE"),
            ("REQUIRE_POSITIVE_AMOUNTS", "0"),
        ])
        .unwrap();
        assert_eq!(s.port, 8080);
        assert_eq!(s.authority.address, keys.address);
        assert_eq!(s.authority.public_key, FundAuthority::default().public_key);
        assert_eq!(s.chain_file, Some(PathBuf::from("/tmp/chain.json")));

        let rules = s.chain_rules();
        assert!(rules.ledger_policy.allow_negative_balances);
        assert!(!rules.tx_policy.require_positive_amounts);
    }

    #[test]
    fn key_file_wins_over_individual_variables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fund.json");
        let keys = TestKeys::generate();
        std::fs::write(&path, serde_json::to_string(&keys.authority()).unwrap()).unwrap();
        let s = settings(&[
            ("FUND_KEY_FILE", path.to_str().unwrap()),
            ("FUND_ADDRESS", "dIgnored"),
        ])
        .unwrap();
        assert_eq!(s.authority, keys.authority());
    }

    #[test]
    fn malformed_fund_authority_is_refused_at_startup() {
        let keys = TestKeys::generate();
        for vars in [
            vec![("FUND_ADDRESS", "dOther")],
            vec![("FUND_PUBLIC_KEY", "not-hex")],
            vec![("FUND_PUBLIC_KEY", "02cd")],
            vec![("FUND_ADDRESS", keys.address.as_str()), ("FUND_PUBLIC_KEY", "")],
        ] {
            assert!(
                matches!(settings(&vars), Err(NodeError::Structural(_))),
                "{vars:?} was accepted"
            );
        }

        // an accepted authority always yields a genesis its own rules accept
        let s = settings(&[
            ("FUND_ADDRESS", keys.address.as_str()),
            ("FUND_PUBLIC_KEY", keys.public_key.as_str()),
        ])
        .unwrap();
        let rules = s.chain_rules();
        assert!(rules.validate_chain(&[rules.genesis()]).is_ok());
    }

    #[test]
    fn invalid_values_are_structural_errors() {
        assert!(matches!(
            settings(&[("PORT", "http")]),
            Err(NodeError::Structural(_))
        ));
        assert!(matches!(
            settings(&[("ALLOW_NEGATIVE_BALANCES", "maybe")]),
            Err(NodeError::Structural(_))
        ));
    }
}
