//! `codewright tools`: list the built-in tools.

use super::{Overrides, load_config};

pub fn run(overrides: &Overrides) -> anyhow::Result<()> {
    let config = load_config(overrides)?;
    let working_dir = config.resolved_working_dir();
    let registry = codewright_tools::default_registry(&working_dir);

    println!("🔧 Available tools ({})", registry.len());
    println!("   Working directory: {}", working_dir.display());
    println!();
    for spec in registry.specs() {
        println!("  {:<18} {}", spec.name, spec.description);
    }
    Ok(())
}
