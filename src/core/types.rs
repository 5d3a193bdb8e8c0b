//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`ModuleName`] - Validated module name
//! - [`PackageName`] - Validated Java package name
//! - [`ServiceName`] - Fully-qualified service interface name
//! - [`ArtifactCoords`] - `(group, artifact, version)` artifact coordinates
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use weft::core::types::{ModuleName, PackageName, ServiceName};
//!
//! // Valid constructions
//! let name = ModuleName::new("kit-web").unwrap();
//! let pkg = PackageName::new("com.ex.ui").unwrap();
//! let spi = ServiceName::new("com.ex.spi.Store").unwrap();
//!
//! // Invalid constructions fail at creation time
//! assert!(ModuleName::new("").is_err());
//! assert!(PackageName::new("com..ex").is_err());
//! assert!(ServiceName::new("NoPackage").is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid module name: {0}")]
    InvalidModuleName(String),

    #[error("invalid package name: {0}")]
    InvalidPackageName(String),

    #[error("invalid service name: {0}")]
    InvalidServiceName(String),

    #[error("invalid target tag: {0}")]
    InvalidTargetTag(String),

    #[error("invalid artifact coordinates: {0}")]
    InvalidCoords(String),
}

/// A validated module name.
///
/// Module names are the primary identity key in the registry. They must:
/// - be non-empty
/// - contain only lowercase ASCII letters, digits, `-`, `.` and `_`
/// - start and end with a letter or digit
///
/// # Example
///
/// ```
/// use weft::core::types::ModuleName;
///
/// let name = ModuleName::new("javabase-emul-web").unwrap();
/// assert_eq!(name.as_str(), "javabase-emul-web");
///
/// assert!(ModuleName::new("-bad").is_err());
/// assert!(ModuleName::new("Bad").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleName(String);

impl ModuleName {
    /// Create a new validated module name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidModuleName` if the name violates the rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidModuleName(
                "module name cannot be empty".into(),
            ));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_'))
        {
            return Err(TypeError::InvalidModuleName(format!(
                "module name '{name}' contains invalid characters"
            )));
        }
        let first = name.chars().next().unwrap_or('-');
        let last = name.chars().last().unwrap_or('-');
        if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
            return Err(TypeError::InvalidModuleName(format!(
                "module name '{name}' must start and end with a letter or digit"
            )));
        }
        Ok(())
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ModuleName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ModuleName> for String {
    fn from(value: ModuleName) -> Self {
        value.0
    }
}

/// A validated Java package name.
///
/// Dot-separated identifiers, each starting with a letter or underscore
/// and continuing with letters, digits or underscores.
///
/// # Example
///
/// ```
/// use weft::core::types::PackageName;
///
/// let pkg = PackageName::new("com.ex.ui").unwrap();
/// assert_eq!(pkg.as_str(), "com.ex.ui");
///
/// assert!(PackageName::new("").is_err());
/// assert!(PackageName::new("com.1bad").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName(String);

impl PackageName {
    /// Create a new validated package name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidPackageName` if any segment is invalid.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::InvalidPackageName(
                "package name cannot be empty".into(),
            ));
        }
        for segment in name.split('.') {
            if !is_java_identifier(segment) {
                return Err(TypeError::InvalidPackageName(format!(
                    "package name '{name}' has invalid segment '{segment}'"
                )));
            }
        }
        Ok(Self(name))
    }

    /// Get the package as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PackageName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PackageName> for String {
    fn from(value: PackageName) -> Self {
        value.0
    }
}

/// A fully-qualified service interface name (SPI).
///
/// A package name followed by a final class segment, e.g.
/// `com.ex.spi.Store`. The class segment must start with a letter or
/// underscore; by convention it starts uppercase but this is not
/// enforced.
///
/// # Example
///
/// ```
/// use weft::core::types::ServiceName;
///
/// let spi = ServiceName::new("com.ex.spi.Store").unwrap();
/// assert_eq!(spi.package().as_str(), "com.ex.spi");
/// assert_eq!(spi.simple_name(), "Store");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceName(String);

impl ServiceName {
    /// Create a new validated service interface name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidServiceName` if the name is not a
    /// package-qualified identifier.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        let Some((pkg, class)) = name.rsplit_once('.') else {
            return Err(TypeError::InvalidServiceName(format!(
                "service name '{name}' must be package-qualified"
            )));
        };
        if PackageName::new(pkg).is_err() || !is_java_identifier(class) {
            return Err(TypeError::InvalidServiceName(format!(
                "service name '{name}' is not a valid qualified class name"
            )));
        }
        Ok(Self(name))
    }

    /// The declaring package of the interface.
    pub fn package(&self) -> PackageName {
        // Constructor guarantees a valid package prefix.
        let (pkg, _) = self.0.rsplit_once('.').unwrap_or(("", ""));
        PackageName(pkg.to_string())
    }

    /// The simple (unqualified) class name.
    pub fn simple_name(&self) -> &str {
        self.0.rsplit_once('.').map(|(_, c)| c).unwrap_or(&self.0)
    }

    /// Get the full name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ServiceName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ServiceName> for String {
    fn from(value: ServiceName) -> Self {
        value.0
    }
}

/// Artifact coordinates: `(group, artifact, version)`.
///
/// Coordinates identify the published artifact behind a module. The
/// display name of the module is tracked separately (see
/// [`crate::core::module::Module`]); two modules may never share a
/// name, but coordinates are not required to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactCoords {
    pub group: String,
    pub artifact: String,
    pub version: String,
}

impl ArtifactCoords {
    /// Create coordinates, rejecting empty components.
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, TypeError> {
        let coords = Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
        };
        if coords.group.is_empty() || coords.artifact.is_empty() || coords.version.is_empty() {
            return Err(TypeError::InvalidCoords(coords.to_string()));
        }
        Ok(coords)
    }

    /// The group id as a relative path (`com.ex` becomes `com/ex`).
    pub fn group_path(&self) -> String {
        self.group.replace('.', "/")
    }
}

impl fmt::Display for ArtifactCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

fn is_java_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
