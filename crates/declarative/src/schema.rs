//! Attribute schema
//!
//! A resource kind declares just enough about each top-level attribute for
//! the plan engine to work generically: who sets it, whether it is
//! write-only, and which modifiers and validators apply.

use crate::modifiers::{DefaultFn, Modifier, NormalizeFn};
use crate::validators::Validator;

/// Who supplies an attribute's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Must be configured
    Required,
    /// May be configured
    Optional,
    /// Always set by the remote
    Computed,
    /// Configured, or set by the remote when left null
    OptionalComputed,
}

/// Ties a ciphertext attribute to its version token and paired fields
#[derive(Debug, Clone, Copy)]
pub struct SecretBinding {
    /// Attribute holding the user-chosen version token
    pub version: &'static str,
    /// Non-secret attributes whose change also forces a resend
    pub paired: &'static [&'static str],
}

/// One top-level attribute
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: &'static str,
    pub mode: Mode,
    /// Present in config only, never planned or persisted
    pub write_only: bool,
    /// Redacted in plan output
    pub sensitive: bool,
    /// JSON document stored as a canonical string
    pub json: bool,
    /// Set for server-returned ciphertexts of write-only secrets
    pub secret: Option<SecretBinding>,
    pub modifiers: Vec<Modifier>,
    pub validators: Vec<Validator>,
}

impl Attribute {
    fn new(name: &'static str, mode: Mode) -> Self {
        Self {
            name,
            mode,
            write_only: false,
            sensitive: false,
            json: false,
            secret: None,
            modifiers: Vec::new(),
            validators: Vec::new(),
        }
    }

    pub fn required(name: &'static str) -> Self {
        Self::new(name, Mode::Required)
    }

    pub fn optional(name: &'static str) -> Self {
        Self::new(name, Mode::Optional)
    }

    pub fn computed(name: &'static str) -> Self {
        Self::new(name, Mode::Computed)
    }

    pub fn optional_computed(name: &'static str) -> Self {
        Self::new(name, Mode::OptionalComputed)
    }

    /// Plaintext secret input; config only
    pub fn write_only(name: &'static str) -> Self {
        let mut attr = Self::new(name, Mode::Optional);
        attr.write_only = true;
        attr.sensitive = true;
        attr
    }

    /// Server-returned ciphertext of a write-only secret, keyed to `version`
    pub fn ciphertext(name: &'static str, version: &'static str) -> Self {
        let mut attr = Self::new(name, Mode::Computed);
        attr.sensitive = true;
        attr.secret = Some(SecretBinding {
            version,
            paired: &[],
        });
        attr
    }

    /// Also resend the secret when any of these attributes change
    #[must_use]
    pub fn paired(mut self, fields: &'static [&'static str]) -> Self {
        if let Some(binding) = self.secret.as_mut() {
            binding.paired = fields;
        }
        self
    }

    #[must_use]
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    #[must_use]
    pub fn json(mut self) -> Self {
        self.json = true;
        self.validators.push(Validator::Json);
        self
    }

    #[must_use]
    pub fn replace(self) -> Self {
        self.modifier(Modifier::RequiresReplace)
    }

    #[must_use]
    pub fn replace_if_unset(self) -> Self {
        self.modifier(Modifier::RequiresReplaceIfUnset)
    }

    #[must_use]
    pub fn replace_if_null_string_change(self) -> Self {
        self.modifier(Modifier::RequiresReplaceIfNullStringChange)
    }

    #[must_use]
    pub fn replace_if_fields_changed(self, fields: &'static [&'static str]) -> Self {
        self.modifier(Modifier::RequiresReplaceIfFieldsChanged(fields))
    }

    #[must_use]
    pub fn use_state(self) -> Self {
        self.modifier(Modifier::UseStateForUnknown)
    }

    #[must_use]
    pub fn default(self, default: DefaultFn) -> Self {
        self.modifier(Modifier::DefaultObject(default))
    }

    #[must_use]
    pub fn trim(self) -> Self {
        self.modifier(Modifier::TrimWhitespace)
    }

    #[must_use]
    pub fn normalize(self, f: NormalizeFn) -> Self {
        self.modifier(Modifier::Normalize(f))
    }

    #[must_use]
    pub fn modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    #[must_use]
    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn has(&self, pred: impl Fn(&Modifier) -> bool) -> bool {
        self.modifiers.iter().any(pred)
    }

    /// Whether the value may come from the remote
    pub fn is_computed(&self) -> bool {
        matches!(self.mode, Mode::Computed | Mode::OptionalComputed)
    }

    pub fn default_fn(&self) -> Option<DefaultFn> {
        self.modifiers.iter().find_map(|m| match m {
            Modifier::DefaultObject(f) => Some(*f),
            _ => None,
        })
    }
}

/// Attribute list for one resource kind
#[derive(Debug, Clone)]
pub struct Schema {
    pub type_name: &'static str,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn attr(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Attributes that are persisted (everything but write-only inputs)
    pub fn persisted(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| !a.write_only)
    }

    pub fn is_sensitive(&self, name: &str) -> bool {
        self.get(name).is_some_and(|a| a.sensitive)
    }
}
