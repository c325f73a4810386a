use crate::config::ManagerConfig;
use std::fmt;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(bin: &str) -> bool {
    if bin.contains('/') {
        return std::path::Path::new(bin).is_file();
    }
    Command::new("which")
        .arg(bin)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check the external tools the configured managers shell out to.
/// An empty list means everything is in place; the mock managers need nothing.
pub fn check_prereqs(config: &ManagerConfig) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();
    if config.managers != "cli" {
        return missing;
    }

    if !command_exists(&config.ssh_keygen_bin) {
        missing.push(MissingPrereq {
            name: config.ssh_keygen_bin.clone(),
            purpose: "generating the environment key pair",
            install_hint: "part of OpenSSH: apt install openssh-client | dnf install openssh-clients",
        });
    }
    if !command_exists(&config.terraform_bin) {
        missing.push(MissingPrereq {
            name: config.terraform_bin.clone(),
            purpose: "provisioning IaaS resources",
            install_hint: "https://developer.hashicorp.com/terraform/install",
        });
    }
    if !command_exists(&config.bosh_bin) {
        missing.push(MissingPrereq {
            name: config.bosh_bin.clone(),
            purpose: "deploying the BOSH director",
            install_hint: "https://bosh.io/docs/cli-v2-install/",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nbbl requires these tools to manage environments.");
    msg
}
