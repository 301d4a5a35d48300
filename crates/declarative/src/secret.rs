//! Write-only secret lifecycle
//!
//! A rotatable secret is a triple: plaintext input (config only), opaque
//! ciphertext returned by the remote (state only), and a user-chosen version
//! token (both). The version token is the only change detector. Editing the
//! plaintext without bumping the version is not observable and does nothing.

use crate::value::Value;

/// What goes into the mutation for one secret
#[derive(Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Send the new plaintext from config
    Plaintext(String),
    /// Echo the stored ciphertext; the remote reads it as "unchanged"
    Ciphertext(String),
    /// Omit the field
    Absent,
}

impl Outgoing {
    pub fn into_option(self) -> Option<String> {
        match self {
            Self::Plaintext(s) | Self::Ciphertext(s) => Some(s),
            Self::Absent => None,
        }
    }

    pub fn is_plaintext(&self) -> bool {
        matches!(self, Self::Plaintext(_))
    }
}

impl std::fmt::Debug for Outgoing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plaintext(_) => write!(f, "Plaintext(<redacted>)"),
            Self::Ciphertext(_) => write!(f, "Ciphertext(<opaque>)"),
            Self::Absent => write!(f, "Absent"),
        }
    }
}

/// Config side of a secret
#[derive(Clone, Copy)]
pub struct SecretInput<'a> {
    pub plaintext: &'a Value<String>,
    pub version: &'a Value<String>,
}

/// Persisted side of a secret
#[derive(Clone, Copy)]
pub struct SecretState<'a> {
    pub ciphertext: &'a Value<String>,
    pub version: &'a Value<String>,
}

/// One write-only field
#[derive(Debug, Clone, Copy)]
pub struct SecretField {
    pub name: &'static str,
}

impl SecretField {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    /// Decide what to send for this field
    ///
    /// `state` is `None` on create. `paired_changed` is true when an associated
    /// non-secret field differs between state and plan.
    pub fn value_to_send(
        &self,
        state: Option<SecretState<'_>>,
        config: SecretInput<'_>,
        paired_changed: bool,
    ) -> Outgoing {
        let Some(state) = state else {
            return match config.plaintext.as_known() {
                Some(p) => Outgoing::Plaintext(p.clone()),
                None => Outgoing::Absent,
            };
        };

        if needs_resend(state.version, config.version, paired_changed) {
            log::debug!("secret {}: version or paired field changed, sending plaintext", self.name);
            return match config.plaintext.as_known() {
                Some(p) => Outgoing::Plaintext(p.clone()),
                None => Outgoing::Absent,
            };
        }

        match state.ciphertext.as_known() {
            Some(c) => Outgoing::Ciphertext(c.clone()),
            None => Outgoing::Absent,
        }
    }
}

/// Whether the plaintext must be resent
pub fn needs_resend(
    state_version: &Value<String>,
    config_version: &Value<String>,
    paired_changed: bool,
) -> bool {
    paired_changed || state_version != config_version
}

/// Planned ciphertext: the stored one when nothing forces a resend, unknown otherwise
pub fn plan_ciphertext(
    state: Option<SecretState<'_>>,
    config_version: &Value<String>,
    paired_changed: bool,
) -> Value<String> {
    match state {
        Some(s) if !needs_resend(s.version, config_version, paired_changed) => s.ciphertext.clone(),
        _ => Value::Unknown,
    }
}

/// State after a round: ciphertext from the remote (or the prior one when the
/// remote did not echo it), version from the plan
pub fn settle(
    returned: Option<String>,
    prior: Option<SecretState<'_>>,
    planned_version: &Value<String>,
) -> (Value<String>, Value<String>) {
    let ciphertext = match (returned, prior) {
        (Some(c), _) if !c.is_empty() => Value::Known(c),
        (_, Some(p)) if p.ciphertext.is_known() => {
            if p.version != planned_version {
                log::warn!(
                    "no ciphertext returned after secret version changed from {} to {}; keeping the previous one",
                    p.version.as_str().unwrap_or("null"),
                    planned_version.as_str().unwrap_or("null"),
                );
            }
            p.ciphertext.clone()
        }
        _ => Value::Null,
    };
    (ciphertext, planned_version.clone())
}

/// Find the prior block with the same name
pub fn by_name<'a, T>(prior: &'a [T], name: &str, key: impl Fn(&T) -> Option<&str>) -> Option<&'a T> {
    prior.iter().find(|p| key(p) == Some(name))
}
