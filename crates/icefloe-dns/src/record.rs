//! Static DNS record declarations.

/// TTL applied to every service A record, in seconds.
pub const RECORD_TTL: u32 = 300;

/// A single service A record to maintain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpec {
    /// Subdomain prefix (e.g. "forgejo" creates forgejo.<domain>.).
    pub subdomain: &'static str,
}

impl RecordSpec {
    /// Fully-qualified, dot-terminated record name.
    pub fn fqdn(&self, domain: &str) -> String {
        format!("{}.{}.", self.subdomain, domain)
    }
}

/// The DNS records needed for the Antarctica services.
pub fn service_records() -> Vec<RecordSpec> {
    vec![
        RecordSpec { subdomain: "forgejo" },
        RecordSpec { subdomain: "woodpecker" },
        RecordSpec { subdomain: "sshx" },
        RecordSpec { subdomain: "registry" },
        RecordSpec { subdomain: "vscode" },
        RecordSpec { subdomain: "cockpit" },
    ]
}
