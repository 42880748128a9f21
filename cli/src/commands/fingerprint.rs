use action_sync::Fingerprint;
use action_sync::fingerprint::normalize;
use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct FingerprintArgs {
    /// Action item description
    #[arg(required = true, num_args = 1..)]
    pub description: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

pub fn run(args: FingerprintArgs) -> Result<()> {
    let description = args.description.join(" ");
    let fingerprint = Fingerprint::of(&description);

    if args.json {
        let output = serde_json::json!({
            "description": description,
            "normalized": normalize(&description),
            "fingerprint": fingerprint
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", fingerprint);
    }

    Ok(())
}
