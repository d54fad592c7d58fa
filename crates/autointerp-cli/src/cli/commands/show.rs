//! CLI command: autointerp show
//!
//! Print a stored document, or list the features stored in a directory.

use anyhow::Context;
use autointerp_core::RecordStore;

use super::setup;
use crate::cli::args::ShowArgs;
use crate::exit_codes;

pub async fn run(args: ShowArgs) -> anyhow::Result<i32> {
    let store = RecordStore::new(&args.dir);

    let Some(name) = &args.feature else {
        let features = store
            .list_features()
            .await
            .with_context(|| format!("failed to list {}", args.dir.display()))?;
        for feature in features {
            println!("{feature}");
        }
        return Ok(exit_codes::SUCCESS);
    };

    let feature = setup::parse_feature(name)?;
    let document = store
        .load(&feature)
        .await
        .with_context(|| format!("failed to load {feature}"))?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(exit_codes::SUCCESS)
}
