use crate::deploy;
use colored::Colorize;
use icefloe_dns::{CloudDns, DnsApi};
use icefloe_engine::SettledOutputs;
use icefloe_proxmox::{Provisioner, ProxmoxClient};
use icefloe_secrets::OpCli;
use std::path::Path;

pub async fn handle(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    println!(
        "Deploying {} on {}",
        config.hostname.cyan(),
        config.node.cyan()
    );

    let api = ProxmoxClient::from_env(&config.api_url, config.insecure_tls)?;
    let provisioner = Provisioner::new(api);

    let dns = match deploy::dns_settings(&config)? {
        Some(settings) => {
            let client = CloudDns::from_env(&settings)?;
            Some((client, settings))
        }
        None => {
            println!(
                "  {} DNS records skipped (gcp_dns_zone / dns_domain not configured)",
                "→".yellow()
            );
            None
        }
    };

    let outputs = deploy::run(
        &config,
        &provisioner,
        dns.as_ref()
            .map(|(client, settings)| (client as &dyn DnsApi, settings)),
        &OpCli::new(),
    )
    .await?;

    outputs.write_under(Path::new(".")).await?;

    println!();
    println!("{} stack outputs", "✓".green());
    print_outputs(&outputs, false);
    println!(
        "\nWritten to {}",
        SettledOutputs::path_under(Path::new("."))
            .display()
            .to_string()
            .cyan()
    );

    Ok(())
}

pub fn print_outputs(outputs: &SettledOutputs, show_secrets: bool) {
    for (name, record) in &outputs.outputs {
        let value = if record.secret && !show_secrets {
            "[secret]".to_string()
        } else {
            match &record.value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            }
        };
        println!("  {:<18} {}", name, value.cyan());
    }
}
