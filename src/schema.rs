//! Recipes file schema
//!
//! ```toml
//! run_list = ["rails"]
//!
//! [recipes.rails]
//! depends = ["user"]
//! packages = ["gcc-c++", "sqlite-devel"]
//!
//! [[recipes.rails.directories]]
//! path = "/var/www"
//! mode = "0755"
//! owner = "app"
//! ```
//!
//! Within a recipe, assertions run users first, then directories, then
//! packages, each list in file order.

use anyhow::{Context, Result};
use declarative::Error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Main Config Schema
// ============================================================================

/// The recipes file
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Recipes to reconcile when no `--recipe` is given
    #[serde(default)]
    pub run_list: Vec<String>,

    /// Recipes by name
    #[serde(default)]
    pub recipes: BTreeMap<String, RecipeConfig>,
}

/// A named group of assertions
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RecipeConfig {
    /// Recipes reconciled before this one
    #[serde(default)]
    pub depends: Vec<String>,

    #[serde(default)]
    pub users: Vec<UserConfig>,

    #[serde(default)]
    pub directories: Vec<DirectoryConfig>,

    /// Package names; any installed version satisfies them
    #[serde(default)]
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub name: String,

    #[serde(default)]
    pub system: bool,

    #[serde(default)]
    pub home: Option<String>,

    #[serde(default)]
    pub shell: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    pub path: String,
    pub mode: Mode,
    pub owner: String,
}

// ============================================================================
// Mode
// ============================================================================

/// Octal permission bits, written as a string such as "0755"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Mode(u32);

impl Mode {
    pub const MAX: u32 = 0o7777;

    pub fn new(bits: u32) -> Result<Self, Error> {
        if bits > Self::MAX {
            return Err(Error::InvalidMode(format!("{:o}", bits)));
        }
        Ok(Self(bits))
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim();
        let digits = digits.strip_prefix("0o").unwrap_or(digits);

        if digits.is_empty() || !digits.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
            return Err(Error::InvalidMode(s.to_string()));
        }

        let bits = u32::from_str_radix(digits, 8).map_err(|_| Error::InvalidMode(s.to_string()))?;
        Self::new(bits).map_err(|_| Error::InvalidMode(s.to_string()))
    }
}

impl TryFrom<String> for Mode {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

// ============================================================================
// Parsing and validation
// ============================================================================

impl HostConfig {
    /// Parse and validate a recipes file
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Invalid recipes file")?;
        config.validate()?;
        Ok(config)
    }

    /// The recipes shipped with the binary
    pub fn builtin() -> Result<Self> {
        Self::parse(include_str!("recipes.toml")).context("Built-in recipes are invalid")
    }

    /// Check every recipe before anything is applied
    ///
    /// Unknown dependencies and cycles are caught later, when the run
    /// list is resolved.
    pub fn validate(&self) -> Result<()> {
        for name in &self.run_list {
            if name.trim().is_empty() {
                return Err(invalid("run_list contains an empty recipe name"));
            }
        }

        for (name, recipe) in &self.recipes {
            if name.trim().is_empty() {
                return Err(invalid("recipe name cannot be empty"));
            }
            recipe
                .validate()
                .with_context(|| format!("In recipe '{}'", name))?;
        }

        Ok(())
    }
}

impl RecipeConfig {
    pub fn validate(&self) -> Result<()> {
        for dep in &self.depends {
            if dep.trim().is_empty() {
                return Err(invalid("depends contains an empty recipe name"));
            }
        }

        let mut seen = HashSet::new();
        for user in &self.users {
            if user.name.trim().is_empty() {
                return Err(invalid("user name cannot be empty"));
            }
            if user.name.starts_with('-') {
                return Err(invalid(&format!("user name '{}' cannot start with '-'", user.name)));
            }
            if !seen.insert(user.name.as_str()) {
                return Err(invalid(&format!("user '{}' declared twice", user.name)));
            }
        }

        let mut seen = HashSet::new();
        for dir in &self.directories {
            let path = crate::paths::expand(&dir.path);
            if !path.is_absolute() {
                return Err(invalid(&format!(
                    "directory path '{}' must be absolute",
                    dir.path
                )));
            }
            if dir.owner.trim().is_empty() {
                return Err(invalid(&format!("directory '{}' has an empty owner", dir.path)));
            }
            if !seen.insert(path) {
                return Err(invalid(&format!("directory '{}' declared twice", dir.path)));
            }
        }

        let mut seen = HashSet::new();
        for name in &self.packages {
            if name.trim().is_empty() || name.contains(char::is_whitespace) {
                return Err(invalid(&format!("invalid package name '{}'", name)));
            }
            // Would reach rpm, dnf or apt-get as an option
            if name.starts_with('-') {
                return Err(invalid(&format!(
                    "package name '{}' cannot start with '-'",
                    name
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(invalid(&format!("package '{}' declared twice", name)));
            }
        }

        Ok(())
    }

    /// Number of assertions in this recipe
    pub fn len(&self) -> usize {
        self.users.len() + self.directories.len() + self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn invalid(message: &str) -> anyhow::Error {
    Error::Invalid(message.to_string()).into()
}

// ============================================================================
// Tests
// ============================================================================
