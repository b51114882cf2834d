//! Source registry: loads every source definition from embedded TOML.
//!
//! Each `.toml` file in `packages/source/sources/` is baked into the binary
//! at compile time via [`include_str!`]. Registration is explicit: adding a
//! source means adding its TOML file to the list below.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ComplaintSource;
use crate::source_def::{SourceDefinition, parse_source_toml};

/// Environment variable holding a comma-separated list of enabled ids.
pub const SOURCES_ENV_VAR: &str = "SPOTLIGHT_SOURCES";

/// TOML configs embedded at compile time.
const SOURCE_TOMLS: &[(&str, &str)] = &[
    ("anatel", include_str!("../sources/anatel.toml")),
    ("cvm", include_str!("../sources/cvm.toml")),
    (
        "consumidor_gov",
        include_str!("../sources/consumidor_gov.toml"),
    ),
    ("procon", include_str!("../sources/procon.toml")),
    ("reclame_aqui", include_str!("../sources/reclame_aqui.toml")),
];

/// Total number of configured sources (used in tests).
#[cfg(test)]
const EXPECTED_SOURCE_COUNT: usize = 5;

/// Returns all configured source definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (the configs are embedded, so this
/// is caught by the registry tests).
#[must_use]
pub fn all_sources() -> Vec<SourceDefinition> {
    SOURCE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_source_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Keeps the definitions whose id appears in the comma-separated `filter`.
/// With no filter every definition is kept.
#[must_use]
pub fn filter_sources(all: Vec<SourceDefinition>, filter: Option<&str>) -> Vec<SourceDefinition> {
    let Some(filter_str) = filter else {
        return all;
    };

    let ids: Vec<&str> = filter_str.split(',').map(str::trim).collect();
    let available: Vec<String> = all.iter().map(|s| s.id().to_owned()).collect();

    let filtered: Vec<SourceDefinition> =
        all.into_iter().filter(|s| ids.contains(&s.id())).collect();

    if filtered.is_empty() {
        log::warn!(
            "No matching sources found for filter {ids:?}. Available: {}",
            available.join(", ")
        );
    }

    filtered
}

/// Returns the sources to run, filtered by the `--sources` CLI flag or the
/// `SPOTLIGHT_SOURCES` environment variable. If neither is set, all sources
/// are returned.
#[must_use]
pub fn enabled_sources(cli_filter: Option<String>) -> Vec<SourceDefinition> {
    let filter = cli_filter.or_else(|| std::env::var(SOURCES_ENV_VAR).ok());
    filter_sources(all_sources(), filter.as_deref())
}

/// Builds a ready-to-use adapter for each definition, keyed by id.
///
/// An empty input yields an empty map.
///
/// # Panics
///
/// Panics if an embedded definition holds an unusable value (caught by the
/// registry tests).
#[must_use]
pub fn adapters(definitions: &[SourceDefinition]) -> BTreeMap<String, Arc<dyn ComplaintSource>> {
    definitions
        .iter()
        .map(|def| {
            let adapter = def
                .build()
                .unwrap_or_else(|e| panic!("Invalid {}.toml: {e}", def.id()));
            (def.id().to_owned(), adapter)
        })
        .collect()
}
