use std::path::Path;

use anyhow::{Context, Result};

use quotebook_core::service::Action;

use super::helpers::render_outcome;
use super::{Service, run_effects};

pub(crate) async fn cmd_export(
    service: &mut Service,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let outcome = service.dispatch(Action::Export, &mut rand::rng())?;
    run_effects(service, None, outcome.effects, output, json).await
}

pub(crate) fn cmd_import(service: &mut Service, path: &Path, json: bool) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let outcome = service.dispatch(Action::Import(contents), &mut rand::rng())?;
    render_outcome(&outcome, json)
}
