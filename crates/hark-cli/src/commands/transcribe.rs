//! Reprocess a saved recording through the long-audio pipeline.
//!
//! Pairs with keep-audio mode: a meeting whose upload failed can be
//! transcribed again from the archived WAV without re-recording anything.

use anyhow::{Context, Result};
use std::path::PathBuf;

use hark_core::{OpenAiProvider, Settings, build_http_client, probe_asset, transcribe_asset};

pub fn run(settings: Settings, file: PathBuf, language: Option<String>) -> Result<()> {
    let api_key = settings.resolve_api_key()?;
    let asset = probe_asset(&file)?;

    let backend = OpenAiProvider::new(settings.api.api_url.clone(), settings.api.model.clone());
    let language = language.or_else(|| settings.api.language.clone());

    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    let text = runtime.block_on(async {
        let client = build_http_client()?;
        anyhow::Ok(
            transcribe_asset(
                &backend,
                &client,
                &api_key,
                language.as_deref(),
                &settings.limits,
                &asset,
            )
            .await?,
        )
    })?;

    println!("{text}");
    Ok(())
}
