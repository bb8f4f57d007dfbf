pub mod run;
pub mod trial;
pub mod validate;

use std::path::Path;

use anyhow::Context;
use nightfall_shared::content::ContentTables;

/// Content tables from `dir`, or the built-in ones.
pub fn load_content(dir: Option<&str>) -> anyhow::Result<ContentTables> {
    match dir {
        Some(dir) => ContentTables::load_dir(Path::new(dir))
            .with_context(|| format!("loading content tables from {}", dir)),
        None => ContentTables::builtin().context("loading built-in content tables"),
    }
}
