//! Validated primary-key newtypes (§3, §4.2).
//!
//! Following the store's own `GitOid` convention: a thin wrapper that can
//! only be constructed through validation, so a value of this type is a
//! proof the format invariant holds everywhere it is passed around.

use std::fmt;

use crate::error::ArmoryError;

macro_rules! validated_name {
    ($name:ident, $field:expr, $validate:expr) => {
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap a raw string.
            ///
            /// # Errors
            /// Returns [`ArmoryError::InvalidInput`] if the value fails validation.
            pub fn new(raw: impl Into<String>) -> Result<Self, ArmoryError> {
                let raw = raw.into();
                let validator: fn(&str) -> Result<String, String> = $validate;
                validator(&raw)
                    .map(Self)
                    .map_err(|reason| ArmoryError::InvalidInput { field: $field, reason })
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// `^[a-z0-9_-]+$`, the default primary-key charset (§4.2) used unless an
/// entity declares otherwise.
fn validate_key_charset(raw: &str) -> Result<String, String> {
    if raw.is_empty() {
        return Err("must not be empty".to_owned());
    }
    if !raw.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-') {
        return Err(format!("'{raw}' must match ^[a-z0-9_-]+$"));
    }
    Ok(raw.to_owned())
}

validated_name!(ApplicationName, "application.name", validate_key_charset);
validated_name!(BuildName, "build.name", validate_key_charset);
validated_name!(FileName, "file.name", validate_key_charset);
validated_name!(SystemName, "system.name", validate_key_charset);
validated_name!(ResourceValue, "resource.value", validate_key_charset);

validated_name!(EnvironmentName, "environment.name", validate_key_charset);

/// Environment aliases are a single uppercase character (§3).
fn validate_environment_alias(raw: &str) -> Result<String, String> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() => Ok(raw.to_owned()),
        _ => Err(format!("'{raw}' must be exactly one uppercase letter")),
    }
}
validated_name!(EnvironmentAlias, "environment.alias", validate_environment_alias);

/// Location codes are lowercased and exactly three characters (§3, §4.2).
fn validate_location_code(raw: &str) -> Result<String, String> {
    let lowered = raw.to_ascii_lowercase();
    if lowered.chars().count() != 3 {
        return Err(format!("'{raw}' must be exactly 3 characters"));
    }
    if !lowered.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) {
        return Err(format!("'{raw}' must be alphanumeric"));
    }
    Ok(lowered)
}
validated_name!(LocationCode, "location.code", validate_location_code);

/// Constant names are uppercased on every write path (§3, §4.2).
fn validate_constant_name(raw: &str) -> Result<String, String> {
    let upper = raw.to_ascii_uppercase();
    if upper.is_empty() || upper.contains(',') || upper.contains('\n') {
        return Err(format!("'{raw}' is not a valid constant name"));
    }
    Ok(upper)
}
validated_name!(ConstantName, "constant.name", validate_constant_name);

/// File permission octal, `^[0-7]{3,4}$` (§3).
fn validate_octal(raw: &str) -> Result<String, String> {
    if !(3..=4).contains(&raw.len()) || !raw.chars().all(|c| ('0'..='7').contains(&c)) {
        return Err(format!("'{raw}' must match ^[0-7]{{3,4}}$"));
    }
    Ok(raw.to_owned())
}
validated_name!(Octal, "file.octal", validate_octal);

/// File entity type (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    File,
    Symlink,
    Binary,
    Copy,
    Download,
}

impl FileType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Symlink => "symlink",
            Self::Binary => "binary",
            Self::Copy => "copy",
            Self::Download => "download",
        }
    }

    /// Non-`file`/`binary` types require a `target`.
    #[must_use]
    pub const fn requires_target(self) -> bool {
        !matches!(self, Self::File | Self::Binary)
    }
}

impl std::str::FromStr for FileType {
    type Err = ArmoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "symlink" => Ok(Self::Symlink),
            "binary" => Ok(Self::Binary),
            "copy" => Ok(Self::Copy),
            "download" => Ok(Self::Download),
            other => Err(ArmoryError::InvalidInput {
                field: "file.type",
                reason: format!("'{other}' must be one of file, symlink, binary, copy, download"),
            }),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Network zone (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Zone {
    Core,
    Edge,
}

impl std::str::FromStr for Zone {
    type Err = ArmoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "core" => Ok(Self::Core),
            "edge" => Ok(Self::Edge),
            other => Err(ArmoryError::InvalidInput {
                field: "network.zone",
                reason: format!("'{other}' must be one of core, edge"),
            }),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            Self::Core => "core",
            Self::Edge => "edge",
        })
    }
}

/// Resource type (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Ip,
    ClusterIp,
    HaIp,
}

impl ResourceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::ClusterIp => "cluster_ip",
            Self::HaIp => "ha_ip",
        }
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = ArmoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ip" => Ok(Self::Ip),
            "cluster_ip" => Ok(Self::ClusterIp),
            "ha_ip" => Ok(Self::HaIp),
            other => Err(ArmoryError::InvalidInput {
                field: "resource.type",
                reason: format!("'{other}' must be one of ip, cluster_ip, ha_ip"),
            }),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resource assignment state (§4.2 state machine).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Assignment {
    Unassigned,
    Host(String),
    Application {
        location: String,
        environment: String,
        application: String,
    },
}

impl Assignment {
    #[must_use]
    pub fn assign_type(&self) -> &'static str {
        match self {
            Self::Unassigned => "",
            Self::Host(_) => "host",
            Self::Application { .. } => "application",
        }
    }

    #[must_use]
    pub fn assign_to(&self) -> String {
        match self {
            Self::Unassigned => "not assigned".to_owned(),
            Self::Host(h) => h.clone(),
            Self::Application { location, environment, application } => {
                format!("{location}:{environment}:{application}")
            }
        }
    }

    /// Parse the `(assignType, assignTo)` pair back into an [`Assignment`].
    ///
    /// # Errors
    /// Returns [`ArmoryError::InvalidInput`] if the pair matches none of the
    /// three state-machine forms in §4.2.
    pub fn parse(assign_type: &str, assign_to: &str) -> Result<Self, ArmoryError> {
        match assign_type {
            "" if assign_to == "not assigned" => Ok(Self::Unassigned),
            "host" => Ok(Self::Host(assign_to.to_owned())),
            "application" => {
                let parts: Vec<&str> = assign_to.split(':').collect();
                let [location, environment, application] = parts[..] else {
                    return Err(ArmoryError::InvalidInput {
                        field: "resource.assignTo",
                        reason: format!("'{assign_to}' must be 'location:environment:application'"),
                    });
                };
                Ok(Self::Application {
                    location: location.to_owned(),
                    environment: environment.to_owned(),
                    application: application.to_owned(),
                })
            }
            other => Err(ArmoryError::InvalidInput {
                field: "resource.assignType",
                reason: format!("'{other}' must be empty, 'host', or 'application'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_code_lowercases_and_checks_length() {
        assert_eq!(LocationCode::new("NYC").unwrap().as_str(), "nyc");
        assert!(LocationCode::new("ny").is_err());
        assert!(LocationCode::new("nycx").is_err());
    }

    #[test]
    fn constant_name_uppercases() {
        assert_eq!(ConstantName::new("timeout").unwrap().as_str(), "TIMEOUT");
    }

    #[test]
    fn environment_alias_requires_single_uppercase() {
        assert!(EnvironmentAlias::new("P").is_ok());
        assert!(EnvironmentAlias::new("p").is_err());
        assert!(EnvironmentAlias::new("PP").is_err());
    }

    #[test]
    fn octal_accepts_three_or_four_digits() {
        assert!(Octal::new("644").is_ok());
        assert!(Octal::new("0644").is_ok());
        assert!(Octal::new("888").is_err());
    }

    #[test]
    fn assignment_round_trips() {
        let a = Assignment::Host("host01".to_owned());
        let (t, to) = (a.assign_type(), a.assign_to());
        assert_eq!(Assignment::parse(t, &to).unwrap(), a);

        let b = Assignment::Unassigned;
        assert_eq!(Assignment::parse(b.assign_type(), &b.assign_to()).unwrap(), b);

        let c = Assignment::Application {
            location: "nyc".into(),
            environment: "prod".into(),
            application: "frontend".into(),
        };
        assert_eq!(Assignment::parse(c.assign_type(), &c.assign_to()).unwrap(), c);
    }
}
