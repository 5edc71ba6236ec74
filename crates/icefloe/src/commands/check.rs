use crate::deploy;
use colored::Colorize;
use icefloe_proxmox::{ProxmoxClient, VmApi};
use icefloe_secrets::{manifest, verify_manifest, OpCli};
use std::path::Path;

/// Pre-flight: validate the config, probe the cluster API, and report
/// on the secrets inventory without touching anything.
pub async fn handle(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    println!("{} configuration valid", "✓".green());
    println!(
        "  VM {} ({}) on node {}, template {}",
        config.vm_id.to_string().cyan(),
        config.hostname.cyan(),
        config.node.cyan(),
        config.template_vm_id.to_string().cyan()
    );

    let api = ProxmoxClient::from_env(&config.api_url, config.insecure_tls)?;
    let version = api.version().await?;
    println!(
        "{} Proxmox VE {} at {}",
        "✓".green(),
        version.cyan(),
        config.api_url.cyan()
    );

    match deploy::dns_settings(&config)? {
        Some(settings) => println!(
            "{} DNS: zone {} in project {}",
            "✓".green(),
            settings.managed_zone.cyan(),
            settings.project.cyan()
        ),
        None => println!("{} DNS record management disabled", "→".yellow()),
    }

    let report = verify_manifest(&OpCli::new(), &manifest()).await;
    if report.tool_unavailable {
        println!("{} 1Password CLI not found, secrets unchecked", "→".yellow());
    } else if report.all_present() {
        println!(
            "{} all {} 1Password items present",
            "✓".green(),
            report.present.len()
        );
    } else {
        println!(
            "{} 1Password items missing: {}",
            "✗".red(),
            report.missing.join(", ").yellow()
        );
    }

    Ok(())
}
