//! dnf / yum backend, querying the rpm database directly.

use crate::backend::{Backend, command_exists, run};
use crate::error::Result;
use crate::types::{InstallCommand, ManagerKind, Package};

/// Query format: one line per installed arch, `VERSION-RELEASE`.
const QUERY_FORMAT: &str = "%{VERSION}-%{RELEASE}\\n";

/// Backend for rpm based distributions.
pub struct RpmBackend {
    kind: ManagerKind,
}

impl RpmBackend {
    /// Create a backend driving `dnf` or `yum`.
    pub fn new(kind: ManagerKind) -> Self {
        debug_assert!(matches!(kind, ManagerKind::Dnf | ManagerKind::Yum));
        Self { kind }
    }
}

impl Backend for RpmBackend {
    fn kind(&self) -> ManagerKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        command_exists(self.kind.program()) && command_exists("rpm")
    }

    fn installed_version(&self, package: &Package) -> Result<Option<String>> {
        let output = run("rpm", &["-q", "--qf", QUERY_FORMAT, &package.name])?;

        // rpm exits 1 with "package X is not installed"
        if !output.status.success() {
            return Ok(None);
        }

        Ok(parse_query(&String::from_utf8_lossy(&output.stdout)))
    }

    fn install_command(&self, package: &Package) -> InstallCommand {
        InstallCommand {
            program: self.kind.program().to_string(),
            args: vec!["install".into(), "-y".into(), package.name.clone()],
        }
    }
}

/// Take the first version line from `rpm -q --qf` output.
fn parse_query(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.contains("is not installed"))
        .map(str::to_string)
}
