use clap::Parser;
use log::info;
use packfs::archive::{pack, PackOptions};
use packfs::block::DEFAULT_BLOCK_SIZE;
use packfs::manifest::{
    parse_entry_arg, parse_meta_arg, parse_template_arg, Manifest, ManifestIndex, TemplateVars,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "packfs", about = "Generate packfs file archive")]
struct Cli {
    /// Add meta variables of the form key=value
    #[arg(short, long)]
    meta: Vec<String>,
    /// Strip the image section out of the generated file
    #[arg(short, long)]
    strip: bool,
    /// Add file entry of the form name=flag1,flag2:path (flags: reg, img, lzo)
    #[arg(short, long)]
    entry: Vec<String>,
    /// Read manifest json file
    #[arg(short, long)]
    file: Vec<PathBuf>,
    /// Output manifest index in json format
    #[arg(short, long)]
    index: Option<PathBuf>,
    /// Replace template variables in manifest files, given as name=value.
    /// Replaces file contents of the form {{name}}.
    #[arg(short, long)]
    template: Vec<String>,
    /// Output filename of the generated packfile
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Compression block size in bytes
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut vars = TemplateVars::new();
    for t in &cli.template {
        let (name, value) = parse_template_arg(t)?;
        vars.insert(name, value);
    }

    // Manifests first, then command-line meta and entries.
    let mut manifest = Manifest::default();
    for path in &cli.file {
        manifest.merge(Manifest::load(&vars, path)?);
    }
    for m in &cli.meta {
        manifest.meta.push(parse_meta_arg(m)?);
    }
    for e in &cli.entry {
        manifest.entries.push(parse_entry_arg(e)?);
    }
    if cli.output.is_some() {
        manifest.output = cli.output;
    }
    if cli.index.is_some() {
        manifest.index = cli.index;
    }

    let output = manifest.output.clone().ok_or("no output file given (use -o or \"output\" in a manifest)")?;
    let entries = manifest.load_entries()?;

    if let Some(index_path) = &manifest.index {
        ManifestIndex::from_entries(&entries).save(index_path)?;
        info!("Wrote manifest index {}", index_path.display());
    }

    info!("== Writing PACK file {} ==", output.display());
    let opts = PackOptions {
        block_size: cli.block_size,
        strip: cli.strip,
        ..PackOptions::default()
    };
    let packed = pack(&manifest.meta_records(), &entries, &opts)?;
    std::fs::write(&output, &packed.bytes)?;

    println!("Created: {} ({} bytes)", output.display(), packed.bytes.len());
    Ok(())
}
