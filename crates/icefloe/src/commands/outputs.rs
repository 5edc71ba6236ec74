use colored::Colorize;
use icefloe_engine::SettledOutputs;
use std::path::Path;

pub async fn handle(show_secrets: bool) -> anyhow::Result<()> {
    let root = Path::new(".");
    let path = SettledOutputs::path_under(root);
    if !path.exists() {
        anyhow::bail!(
            "no outputs found at {} (run `icefloe up` first)",
            path.display()
        );
    }

    let outputs = SettledOutputs::read_under(root).await?;

    println!(
        "Outputs from {}",
        outputs.generated_at.to_rfc3339().cyan()
    );
    super::up::print_outputs(&outputs, show_secrets);

    Ok(())
}
