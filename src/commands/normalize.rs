use clap::Args;
use serde::Serialize;
use std::path::Path;

use unpin::normalize::{self, FileChange};

use super::CmdResult;

#[derive(Args)]
pub struct NormalizeArgs {
    /// Root directory to normalize (walked recursively)
    root: String,
}

#[derive(Serialize)]
pub struct NormalizeOutput {
    root: String,
    files_scanned: usize,
    files_changed: usize,
    total_replacements: usize,
    changes: Vec<FileChange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    hints: Vec<String>,
}

pub fn run_json(args: NormalizeArgs) -> CmdResult<NormalizeOutput> {
    let root = shellexpand::tilde(&args.root).to_string();
    let result = normalize::normalize_tree(Path::new(&root))?;

    let mut hints = Vec::new();
    if result.files_changed == 0 {
        hints.push("No version pins found.".to_string());
    } else {
        hints.push(format!(
            "{} pin(s) stripped across {} file(s).",
            result.total_replacements, result.files_changed
        ));
    }

    Ok((
        NormalizeOutput {
            root,
            files_scanned: result.files_scanned,
            files_changed: result.files_changed,
            total_replacements: result.total_replacements,
            changes: result.changes,
            hints,
        },
        0,
    ))
}
