//! Closed enumerations of the control plane
//!
//! Parsing is case-insensitive; each enum serializes in its canonical form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as Json;
use std::fmt;
use std::str::FromStr;

macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $canonical:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Canonical spellings, in declaration order
            pub const VALUES: &'static [&'static str] = &[$($canonical),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $canonical),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($canonical) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!(
                    "\"{s}\" is not one of: {}",
                    Self::VALUES.join(", ")
                ))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

closed_enum! {
    /// Cloud provider of an account, group or collection
    CloudProvider {
        Aws => "AWS",
        Azure => "AZURE",
        Gcp => "GCP",
        Kubernetes => "KUBERNETES",
        Tencent => "TENCENT",
    }
}

closed_enum! {
    /// What a report group reports on
    ReportSource {
        Binding => "BINDING",
        Control => "CONTROL",
        Policy => "POLICY",
    }
}

closed_enum! {
    /// Who a role is granted to
    PrincipalType {
        User => "user",
        SsoGroup => "sso-group",
    }
}

closed_enum! {
    /// What a role is granted on
    TargetType {
        System => "system",
        AccountGroup => "account-group",
        PolicyCollection => "policy-collection",
        Repository => "repository",
    }
}

/// Plan-time normalizer: canonical spelling of a known cloud provider,
/// anything else untouched so validation can report it
pub fn normalize_provider(value: &Json) -> Json {
    match value.as_str().map(CloudProvider::from_str) {
        Some(Ok(provider)) => Json::String(provider.as_str().to_string()),
        _ => value.clone(),
    }
}

/// Plan-time normalizer for report sources
pub fn normalize_report_source(value: &Json) -> Json {
    match value.as_str().map(ReportSource::from_str) {
        Some(Ok(source)) => Json::String(source.as_str().to_string()),
        _ => value.clone(),
    }
}
