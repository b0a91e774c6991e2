//! Persisted user preferences.
//!
//! A flat JSON object on disk. Chain-scoped entries are keyed by the
//! serialized pair `[chainId,"key"]`; the selected network is stored under
//! its bare key.

use crate::error::{AppError, AppResult};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use vwave_core::chain::is_supported_chain;
use vwave_core::constants::{DEFAULT_CHAIN_ID, DEFAULT_SLIPPAGE_AMOUNT, MAX_REFERRAL_CODE_LENGTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefKey {
    SelectedNetwork,
    SlippageBps,
    ReferralCode,
    PnlInLeverage,
    ShowPnlAfterFees,
    DisableOrderValidation,
    ShowPositionLines,
}

impl PrefKey {
    pub const ALL: [PrefKey; 7] = [
        PrefKey::SelectedNetwork,
        PrefKey::SlippageBps,
        PrefKey::ReferralCode,
        PrefKey::PnlInLeverage,
        PrefKey::ShowPnlAfterFees,
        PrefKey::DisableOrderValidation,
        PrefKey::ShowPositionLines,
    ];

    /// Storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrefKey::SelectedNetwork => "SELECTED_NETWORK",
            PrefKey::SlippageBps => "Exchange-swap-slippage-basis-points-v3",
            PrefKey::ReferralCode => "VWAVE-referralCode",
            PrefKey::PnlInLeverage => "Exchange-swap-is-pnl-in-leverage",
            PrefKey::ShowPnlAfterFees => "Exchange-swap-show-pnl-after-fees",
            PrefKey::DisableOrderValidation => "disable-order-validation",
            PrefKey::ShowPositionLines => "Exchange-swap-should-show-position-lines",
        }
    }

    /// Short name used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            PrefKey::SelectedNetwork => "network",
            PrefKey::SlippageBps => "slippage",
            PrefKey::ReferralCode => "referral-code",
            PrefKey::PnlInLeverage => "pnl-in-leverage",
            PrefKey::ShowPnlAfterFees => "pnl-after-fees",
            PrefKey::DisableOrderValidation => "disable-order-validation",
            PrefKey::ShowPositionLines => "position-lines",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn is_chain_scoped(&self) -> bool {
        !matches!(self, PrefKey::SelectedNetwork)
    }

    /// Key under which the value is stored for `chain_id`.
    pub fn storage_key(&self, chain_id: u64) -> String {
        if self.is_chain_scoped() {
            Value::Array(vec![Value::from(chain_id), Value::from(self.as_str())]).to_string()
        } else {
            self.as_str().to_string()
        }
    }
}

/// Check a CLI-supplied value against the key's expected shape.
fn validate(key: PrefKey, value: &Value) -> AppResult<()> {
    let ok = match key {
        PrefKey::SelectedNetwork => value.as_u64().is_some(),
        PrefKey::SlippageBps => value.as_u64().is_some_and(|bps| bps < 10_000),
        PrefKey::ReferralCode => value
            .as_str()
            .is_some_and(|code| !code.is_empty() && code.len() <= MAX_REFERRAL_CODE_LENGTH),
        PrefKey::PnlInLeverage
        | PrefKey::ShowPnlAfterFees
        | PrefKey::DisableOrderValidation
        | PrefKey::ShowPositionLines => value.is_boolean(),
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::Prefs(format!("invalid value for {}: {value}", key.name())))
    }
}

pub struct Preferences {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
}

impl Preferences {
    /// Load from `path`; a missing file starts empty.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Value>(&content)? {
                Value::Object(map) => map,
                other => {
                    return Err(AppError::Prefs(format!(
                        "expected a JSON object in {}, found {other}",
                        path.display()
                    )))
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No preferences file, starting empty");
                Map::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_raw(&self, chain_id: u64, key: PrefKey) -> Option<Value> {
        self.values.read().get(&key.storage_key(chain_id)).cloned()
    }

    /// Typed read; a stored value of the wrong shape reads as absent.
    pub fn get<T: DeserializeOwned>(&self, chain_id: u64, key: PrefKey) -> Option<T> {
        let value = self.get_raw(chain_id, key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "Ignoring malformed preference");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, chain_id: u64, key: PrefKey, value: T) -> AppResult<()> {
        let value = serde_json::to_value(value)?;
        validate(key, &value)?;
        self.values.write().insert(key.storage_key(chain_id), value);
        Ok(())
    }

    /// Set from command-line text: JSON literals first, otherwise a string.
    pub fn set_from_str(&self, chain_id: u64, key: PrefKey, raw: &str) -> AppResult<()> {
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        self.set(chain_id, key, value)
    }

    pub fn remove(&self, chain_id: u64, key: PrefKey) -> Option<Value> {
        self.values.write().remove(&key.storage_key(chain_id))
    }

    /// Write all values back to disk.
    pub fn save(&self) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&*self.values.read())?;
        std::fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "Preferences saved");
        Ok(())
    }

    /// Stored network if it is a supported chain, else the default. An
    /// unparseable stored value is dropped.
    pub fn selected_chain_id(&self) -> u64 {
        match self.get_raw(0, PrefKey::SelectedNetwork) {
            Some(value) => match value.as_u64().or_else(|| value.as_str().and_then(|s| s.parse().ok())) {
                Some(id) if is_supported_chain(id) => id,
                Some(_) => DEFAULT_CHAIN_ID,
                None => {
                    self.remove(0, PrefKey::SelectedNetwork);
                    DEFAULT_CHAIN_ID
                }
            },
            None => DEFAULT_CHAIN_ID,
        }
    }

    pub fn slippage_bps(&self, chain_id: u64) -> u32 {
        self.get(chain_id, PrefKey::SlippageBps)
            .unwrap_or(DEFAULT_SLIPPAGE_AMOUNT)
    }

    pub fn referral_code(&self, chain_id: u64) -> Option<String> {
        self.get(chain_id, PrefKey::ReferralCode)
    }

    pub fn flag(&self, chain_id: u64, key: PrefKey) -> bool {
        self.get(chain_id, key).unwrap_or(false)
    }
}
