use anyhow::{Context, Result, anyhow, bail};
use schemars::{Schema, schema_for};
use serde_valid::Validate;
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};

use super::models::PageDefinition;

/// Load a page definition from a string slice.
pub fn load_from_str(s: &str) -> Result<PageDefinition> {
    let page: PageDefinition =
        serde_json::from_str(s).context("Failed to parse JSON page definition string")?;
    validate_page(&page)?;
    Ok(page)
}

/// Load a page definition from any reader (e.g., a file).
pub fn load_from_reader<R: Read>(reader: R) -> Result<PageDefinition> {
    let page: PageDefinition =
        serde_json::from_reader(reader).context("Failed to parse JSON page definition from reader")?;
    validate_page(&page)?;
    Ok(page)
}

/// Load a page definition from a file path synchronously.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<PageDefinition> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open page file {}", path_ref.display()))?;
    let page = load_from_reader(file)?;
    debug!("Loaded page from {}", path_ref.display());
    Ok(page)
}

/// Load a page definition from a file path asynchronously (Tokio).
pub async fn load_from_path_async<P: AsRef<Path>>(path: P) -> Result<PageDefinition> {
    use tokio::fs;
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref)
        .await
        .with_context(|| format!("Failed to read page file {}", path_ref.display()))?;
    let page: PageDefinition = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse JSON page definition from {}", path_ref.display()))?;
    validate_page(&page)?;
    debug!("Loaded page from {}", path_ref.display());
    Ok(page)
}

/// Generate the JSON Schema for the page definition (for editors and external tooling).
pub fn generate_schema() -> Schema {
    schema_for!(PageDefinition)
}

/// Write the JSON Schema for the page definition to any writer (pretty-printed).
pub fn write_schema_to_writer<W: Write>(mut writer: W) -> Result<()> {
    let schema = generate_schema();
    let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;
    writer
        .write_all(json.as_bytes())
        .context("Failed to write schema to writer")?;
    Ok(())
}

/// Sanity checks on the page document.
/// - Settings must satisfy their declared bounds.
/// - `baseUrl`, when present, must be an absolute URL.
/// - Component ids must be non-empty.
///
/// Several events for the same trigger on one component are allowed but only the
/// first one is dispatched, so a warning is logged.
pub fn validate_page(page: &PageDefinition) -> Result<()> {
    page.validate()
        .map_err(|errors| anyhow!("Invalid page settings: {errors}"))?;

    if let Some(base) = &page.settings.base_url {
        url::Url::parse(base).with_context(|| format!("Invalid baseUrl '{base}'"))?;
    }

    for (id, component) in &page.components {
        if id.trim().is_empty() {
            bail!("Component ids must not be empty");
        }
        let mut seen = HashSet::new();
        for event in &component.events {
            if !seen.insert(event.trigger) {
                warn!(
                    target: "pageflow::config",
                    component = %id,
                    trigger = event.trigger.as_str(),
                    "Several events declared for one trigger; only the first is dispatched"
                );
            }
        }
    }

    Ok(())
}
