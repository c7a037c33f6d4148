//! apt-get backend, querying dpkg.

use crate::backend::{Backend, command_exists, run};
use crate::error::Result;
use crate::types::{InstallCommand, ManagerKind, Package};

/// Backend for Debian based distributions.
#[derive(Default)]
pub struct AptBackend;

impl AptBackend {
    /// Create a new apt backend.
    pub fn new() -> Self {
        Self
    }
}

impl Backend for AptBackend {
    fn kind(&self) -> ManagerKind {
        ManagerKind::Apt
    }

    fn is_available(&self) -> bool {
        command_exists("apt-get") && command_exists("dpkg-query")
    }

    fn installed_version(&self, package: &Package) -> Result<Option<String>> {
        let output = run(
            "dpkg-query",
            &["-W", "-f=${Status}\t${Version}", &package.name],
        )?;

        if !output.status.success() {
            return Ok(None);
        }

        Ok(parse_status(&String::from_utf8_lossy(&output.stdout)))
    }

    fn install_command(&self, package: &Package) -> InstallCommand {
        InstallCommand {
            program: "apt-get".to_string(),
            args: vec![
                "install".into(),
                "-y".into(),
                "-q".into(),
                package.name.clone(),
            ],
        }
    }
}

/// Parse `${Status}\t${Version}`; only "install ok installed" counts.
fn parse_status(stdout: &str) -> Option<String> {
    let (status, version) = stdout.trim().split_once('\t')?;
    if status.trim() == "install ok installed" && !version.trim().is_empty() {
        Some(version.trim().to_string())
    } else {
        None
    }
}
