use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;

const DEFAULT_OUT_DIR: &str = "dist/share/man/man1";

#[derive(Args, Debug)]
pub struct ManArgs {
    /// Output directory, relative to the workspace root
    #[arg(long = "out-dir", default_value = DEFAULT_OUT_DIR)]
    pub out_dir: PathBuf,
}

impl Default for ManArgs {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
        }
    }
}

fn write_page(cmd: clap::Command, path: &Path) -> Result<(), String> {
    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd)
        .render(&mut buffer)
        .map_err(|e| format!("render {}: {e}", path.display()))?;
    fs::write(path, buffer).map_err(|e| format!("{}: {e}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}

/// One page for `reltag`, plus `reltag-<sub>.1` per subcommand.
pub fn cmd_man(args: ManArgs) -> Result<(), String> {
    let out_dir = crate::workspace_root().join(&args.out_dir);
    fs::create_dir_all(&out_dir).map_err(|e| format!("{}: {e}", out_dir.display()))?;

    let cmd = reltag::command();
    for sub in cmd.get_subcommands() {
        let path = out_dir.join(format!("reltag-{}.1", sub.get_name()));
        write_page(sub.clone(), &path)?;
    }
    write_page(cmd, &out_dir.join("reltag.1"))
}
