use crate::subset_utils::{get_json_reader_from_path, get_json_reader_from_reader};
use anyhow::Context;
use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{BufRead, Read};
use std::path::Path;
use tracing::info;

/// In-memory representation of a cdot data file.
///
/// Only the two collections the filter touches are modeled as typed fields.  Every
/// other top-level key of the file (`cdot_version`, `genome_builds`, and whatever a
/// future cdot release may add) is collected into `extra` and written back verbatim,
/// so a filtered file stays loadable by anything that consumes cdot JSON.
///
/// The collections are kept in [LinkedHashMap]s so that record order survives a
/// load/store round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub genes: LinkedHashMap<String, Gene>,
    pub transcripts: LinkedHashMap<String, Transcript>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of the `genes` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gene {
    /// Display symbol, e.g., `"BRCA1"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene_symbol: Option<String>,
    /// HGNC identifier without prefix, e.g., `"1100"` for BRCA1 which is `HGNC:1100`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hgnc: Option<String>,
    /// All remaining attributes (aliases, biotype, description, map_location, ...),
    /// passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of the `transcripts` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Display symbol of the owning gene, e.g., `"BRCA1"` for `"NM_007294.3"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene_name: Option<String>,
    /// HGNC identifier of the owning gene without prefix, e.g., `"1100"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hgnc: Option<String>,
    /// All remaining attributes (gene_version, genome_builds, start/stop codon, ...),
    /// passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Container {
    /// Loads a [Container] from the provided path. The file may be gzip compressed
    /// or uncompressed; the two cases are distinguished automatically by the magic
    /// bytes of the stream rather than by the file name.
    ///
    /// ### Arguments
    ///
    /// * `json_path`: The path to the cdot JSON file to be read.
    ///
    /// ### Returns
    ///
    /// Returns an `anyhow::Result<Container>` carrying the parsed container, or the
    /// underlying open/decompression/parse error with the offending path attached.
    pub fn from_path<T: AsRef<Path>>(json_path: T) -> anyhow::Result<Container> {
        let json_path = json_path.as_ref();
        info!("loading {}", json_path.display());
        let rdr = get_json_reader_from_path(json_path)
            .with_context(|| format!("failed to open {}", json_path.display()))?;
        Container::parse(rdr).with_context(|| format!("failed to parse {}", json_path.display()))
    }

    /// Loads a [Container] from the provided reader, applying the same automatic
    /// gzip detection as [Container::from_path].
    pub fn from_reader(rdr: impl Read + 'static) -> anyhow::Result<Container> {
        let rdr = get_json_reader_from_reader(rdr)?;
        Container::parse(rdr)
    }

    fn parse(rdr: impl BufRead) -> anyhow::Result<Container> {
        let container: Container = serde_json::from_reader(rdr)?;
        info!(
            "parsed {} gene records and {} transcript records",
            container.genes.len(),
            container.transcripts.len()
        );
        Ok(container)
    }
}
