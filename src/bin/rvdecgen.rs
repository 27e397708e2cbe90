use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use rvdecgen::emit::{self, ArtifactSet};
use rvdecgen::{MetaBundle, Target};

#[derive(Parser)]
#[command(
    name = "rvdecgen",
    about = "Compiles RISC-V encoding tables into decoder sources",
    long_about = "Reads a directory of riscv-meta style encoding tables and generates \
                  the decoder source artifacts for the hardware toolchain."
)]
struct Cli {
    /// Directory containing the encoding tables.
    tables: PathBuf,

    /// Base ISA name extension tags must start with.
    #[arg(long, default_value = "rv64")]
    base: String,

    /// Extension letters to include, as one string (e.g. "imafds").
    #[arg(long, default_value = "imafds")]
    ext: String,

    /// Output directory for the generated artifacts.
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Comma-separated artifact subset to generate
    /// (structural,logic,constants,csrs,immediate); default is all.
    #[arg(long)]
    artifacts: Option<String>,
}

fn artifact_selection(spec: Option<&str>) -> Result<ArtifactSet> {
    let Some(spec) = spec else {
        return Ok(ArtifactSet::all());
    };
    let mut set = ArtifactSet::empty();
    for name in spec.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        match ArtifactSet::from_name(name) {
            Some(flag) => set |= flag,
            None => bail!("unknown artifact '{name}'"),
        }
    }
    if set.is_empty() {
        bail!("artifact selection is empty");
    }
    Ok(set)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let selection = artifact_selection(cli.artifacts.as_deref())?;

    let bundle = MetaBundle::load(&cli.tables)
        .with_context(|| format!("loading tables from {}", cli.tables.display()))?;
    let target = Target::new(cli.base.as_str(), &cli.ext);
    for unknown in bundle.unknown_target_extensions(&target) {
        eprintln!("warning: extension '{unknown}' is not in the extensions table");
    }

    let model = bundle.compile(&target);
    eprintln!(
        "{}: {} of {} instructions in scope",
        target,
        model.scoped_instruction_count(),
        bundle.instructions.len()
    );
    for group in emit::immediate::groups(&model) {
        eprintln!("{:<24} {}", format!("{:?}", group.operands), group.expression);
    }

    let artifacts = emit::render(&model, selection);
    emit::write_all(&artifacts, &cli.out)
        .with_context(|| format!("writing artifacts to {}", cli.out.display()))?;
    for artifact in &artifacts {
        eprintln!("wrote {}", cli.out.join(artifact.file_name).display());
    }
    Ok(())
}
