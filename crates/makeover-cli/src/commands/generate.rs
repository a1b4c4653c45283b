use super::bootstrap;
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use makeover_core::orchestrator::CompletionOutcome;
use makeover_core::slot::{ELEMENT_SLOTS, VIBE_SLOT};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Main portrait (required)
    #[arg(long)]
    portrait: PathBuf,

    /// Style element image (up to five)
    #[arg(long = "element")]
    elements: Vec<PathBuf>,

    /// Overall vibe reference image
    #[arg(long)]
    vibe: Option<PathBuf>,

    /// Edit instruction applied after generating (repeatable, in order)
    #[arg(long = "edit")]
    edits: Vec<String>,

    /// Output directory (defaults to the configured one)
    #[arg(long)]
    out: Option<PathBuf>,
}

pub async fn run(base_dir: Option<&Path>, args: GenerateArgs) -> Result<()> {
    let element_capacity = ELEMENT_SLOTS.count();
    if args.elements.len() > element_capacity {
        bail!(
            "At most {} style elements are supported, got {}",
            element_capacity,
            args.elements.len()
        );
    }

    let app = bootstrap::build(base_dir, None).await?;
    let usecase = &app.usecase;

    usecase.upload_files(&[&args.portrait]).await?;
    for (index, element) in ELEMENT_SLOTS.zip(&args.elements) {
        usecase.set_slot_from_file(index, element).await?;
    }
    if let Some(vibe) = &args.vibe {
        usecase.set_slot_from_file(VIBE_SLOT, vibe).await?;
    }

    println!("{}", "Generating makeover...".bright_magenta());
    expect_applied(usecase.generate().await?)?;

    for instruction in &args.edits {
        println!("{}", format!("Applying edit: {}", instruction).bright_magenta());
        expect_applied(usecase.apply_edit(instruction).await?)?;
    }

    let path = usecase.download(args.out.as_deref()).await?;
    println!("{}", format!("Saved {}", path.display()).bright_green());
    Ok(())
}

fn expect_applied(outcome: CompletionOutcome) -> Result<()> {
    match outcome {
        CompletionOutcome::Applied { .. } => Ok(()),
        CompletionOutcome::Failed(message) => bail!(message),
        CompletionOutcome::Stale => bail!("The request was abandoned before it completed"),
    }
}
