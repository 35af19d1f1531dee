use crate::options::{ExtractOptions, FilterPolicy, HgncId};
use crate::reader::json::{Container, Gene, Transcript};
use crate::subset_utils::derive_output_path;
use anyhow::Context;
use linked_hash_map::LinkedHashMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A cdot container tied to the path it was loaded from, with the operations needed
/// to cut it down to a small set of genes and write the result back out.
///
/// The expected lifecycle is strictly linear: [CdotSubset::from_json] loads the file,
/// [CdotSubset::extract] narrows the `genes` and `transcripts` collections in place,
/// and [CdotSubset::write_json] (usually at [CdotSubset::output_path]) serializes
/// whatever is left.  Nothing is shared between instances, so processing several
/// input files is just a loop constructing one [CdotSubset] per path.
pub struct CdotSubset {
    container: Container,
    json_path: PathBuf,
}

impl CdotSubset {
    /// Loads the cdot JSON file at `json_path`, which may be gzip compressed or
    /// uncompressed, and ties the parsed container to that path.
    ///
    /// ### Arguments
    ///
    /// * `json_path`: The path to the cdot JSON file to be read.
    ///
    /// ### Returns
    ///
    /// Returns an `anyhow::Result<CdotSubset>`:
    /// * `Ok(CdotSubset)`: The loaded container on success.
    /// * `Err(anyhow::Error)`: If the file cannot be opened, decompressed, or parsed.
    pub fn from_json<T: AsRef<Path>>(json_path: T) -> anyhow::Result<CdotSubset> {
        let container = Container::from_path(json_path.as_ref())?;
        Ok(CdotSubset {
            container,
            json_path: json_path.as_ref().to_path_buf(),
        })
    }

    /// Builds a [CdotSubset] from an already parsed container and the path it came
    /// from. This is the constructor the tests use to avoid touching the file system.
    pub fn from_container<T: AsRef<Path>>(container: Container, json_path: T) -> CdotSubset {
        CdotSubset {
            container,
            json_path: json_path.as_ref().to_path_buf(),
        }
    }

    /// Narrows the `genes` and `transcripts` collections to the identifiers in `opts`,
    /// leaving every other field of the container untouched.
    ///
    /// The gene matching behavior is selected by `opts.policy`; see [FilterPolicy] for
    /// the two variants. An empty filtered transcript collection is not an error.
    ///
    /// ### Returns
    ///
    /// Returns the display symbols of the retained genes, in retention order. These are
    /// the symbols [CdotSubset::output_path] splices into the output file name.
    ///
    /// ### Errors
    ///
    /// Under [FilterPolicy::DirectKey], a supplied identifier that is not a key of the
    /// `genes` collection is a hard error. Under both policies, a retained gene without
    /// a `gene_symbol` attribute is an error, since the symbol names the output file.
    pub fn extract(&mut self, opts: &ExtractOptions) -> anyhow::Result<Vec<String>> {
        info!("extracting...");
        let symbols = match opts.policy {
            FilterPolicy::DirectKey => self.extract_by_key(&opts.hgnc_ids)?,
            FilterPolicy::AttributeScan => self.extract_by_attribute(&opts.hgnc_ids)?,
        };
        info!(
            "retained {} gene records and {} transcript records",
            self.container.genes.len(),
            self.container.transcripts.len()
        );
        Ok(symbols)
    }

    // Treat each identifier as a key of `genes`; transcripts follow by display symbol.
    fn extract_by_key(&mut self, hgnc_ids: &[HgncId]) -> anyhow::Result<Vec<String>> {
        let mut genes: LinkedHashMap<String, Gene> = LinkedHashMap::with_capacity(hgnc_ids.len());
        // symbols keep the supplied order, duplicates included; the map de-duplicates
        // by key on its own
        let mut symbols: Vec<String> = Vec::with_capacity(hgnc_ids.len());
        for hgnc_id in hgnc_ids {
            let key = hgnc_id.to_string();
            let gene = self
                .container
                .genes
                .get(&key)
                .cloned()
                .with_context(|| {
                    format!(
                        "no gene record with key {} in {}",
                        key,
                        self.json_path.display()
                    )
                })?;
            symbols.push(gene_symbol_of(&key, &gene)?);
            genes.insert(key, gene);
        }

        let wanted: HashSet<&str> = symbols.iter().map(String::as_str).collect();
        let transcripts = retain_transcripts(&self.container.transcripts, |tx| {
            tx.gene_name
                .as_deref()
                .map(|name| wanted.contains(name))
                .unwrap_or(false)
        });

        self.container.genes = genes;
        self.container.transcripts = transcripts;
        Ok(symbols)
    }

    // Scan gene records for an `hgnc` attribute; transcripts follow by their own
    // `hgnc` attribute, independent of the retained genes.
    fn extract_by_attribute(&mut self, hgnc_ids: &[HgncId]) -> anyhow::Result<Vec<String>> {
        let wanted: HashSet<String> = hgnc_ids.iter().map(|id| id.to_string()).collect();

        let mut genes: LinkedHashMap<String, Gene> = LinkedHashMap::new();
        let mut symbols: Vec<String> = Vec::new();
        for (key, gene) in self.container.genes.iter() {
            if let Some(hgnc) = gene.hgnc.as_deref() {
                if wanted.contains(hgnc) {
                    symbols.push(gene_symbol_of(key, gene)?);
                    genes.insert(key.clone(), gene.clone());
                }
            }
        }
        if genes.is_empty() {
            warn!(
                "no gene record in {} carries a requested hgnc attribute",
                self.json_path.display()
            );
        }

        let transcripts = retain_transcripts(&self.container.transcripts, |tx| {
            tx.hgnc
                .as_deref()
                .map(|hgnc| wanted.contains(hgnc))
                .unwrap_or(false)
        });

        self.container.genes = genes;
        self.container.transcripts = transcripts;
        Ok(symbols)
    }

    /// Derives the output path for this subset from the input path and the retained
    /// gene display symbols, per the naming scheme of [derive_output_path].
    pub fn output_path(&self, symbols: &[String]) -> PathBuf {
        derive_output_path(&self.json_path, symbols)
    }

    /// Serializes the container to `out_path` as pretty-printed JSON (2-space
    /// indentation), creating or overwriting the file. The output is always written
    /// uncompressed, even when the input was compressed.
    pub fn write_json<T: AsRef<Path>>(&self, out_path: T) -> anyhow::Result<()> {
        let out_path = out_path.as_ref();
        info!("writing to {}...", out_path.display());
        let file = File::create(out_path)
            .with_context(|| format!("failed to create {}", out_path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.container)
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        writer.flush()?;
        Ok(())
    }

    /// Returns a reference to the underlying container.
    pub fn container(&self) -> &Container {
        &self.container
    }
}

fn gene_symbol_of(key: &str, gene: &Gene) -> anyhow::Result<String> {
    gene.gene_symbol
        .clone()
        .with_context(|| format!("gene record {} has no gene_symbol", key))
}

fn retain_transcripts<F>(
    transcripts: &LinkedHashMap<String, Transcript>,
    keep: F,
) -> LinkedHashMap<String, Transcript>
where
    F: Fn(&Transcript) -> bool,
{
    transcripts
        .iter()
        .filter(|(_, tx)| keep(tx))
        .map(|(k, tx)| (k.clone(), tx.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOY_JSON: &str = r#"{
        "cdot_version": "0.2.21",
        "genome_builds": ["GRCh38"],
        "genes": {
            "1100": {
                "aliases": "RNF53",
                "gene_symbol": "BRCA1",
                "hgnc": "1100"
            },
            "1101": {
                "gene_symbol": "BRCA2",
                "hgnc": "1101"
            },
            "11998": {
                "gene_symbol": "TP53",
                "hgnc": "11998"
            },
            "ENSG00000277400": {
                "gene_symbol": "AC004556.1"
            }
        },
        "transcripts": {
            "NM_007294.3": {
                "gene_name": "BRCA1",
                "hgnc": "1100",
                "gene_version": "672"
            },
            "NM_007300.4": {
                "gene_name": "BRCA1",
                "hgnc": "1100"
            },
            "NM_000059.4": {
                "gene_name": "BRCA2",
                "hgnc": "1101"
            },
            "NM_000546.6": {
                "gene_name": "TP53",
                "hgnc": "11998"
            },
            "NR_047525.1": {}
        }
    }"#;

    fn toy_subset() -> CdotSubset {
        let container: Container = serde_json::from_str(TOY_JSON).unwrap();
        CdotSubset::from_container(container, "cdot-0.2.21.json.gz")
    }

    #[test]
    fn test_extract_direct_key() {
        let mut subset = toy_subset();
        let opts = ExtractOptions::new(["HGNC:1100", "HGNC:1101"], FilterPolicy::DirectKey);
        let symbols = subset.extract(&opts).unwrap();

        assert_eq!(symbols, vec!["BRCA1", "BRCA2"]);
        let genes: Vec<&String> = subset.container().genes.keys().collect();
        assert_eq!(genes, vec!["1100", "1101"]);
        let transcripts: Vec<&String> = subset.container().transcripts.keys().collect();
        assert_eq!(
            transcripts,
            vec!["NM_007294.3", "NM_007300.4", "NM_000059.4"]
        );
        // untouched top-level fields survive
        assert!(subset.container().extra.contains_key("cdot_version"));
        assert!(subset.container().extra.contains_key("genome_builds"));
    }

    #[test]
    fn test_extract_direct_key_missing_key_fails() {
        let mut subset = toy_subset();
        let opts = ExtractOptions::new(["HGNC:9999"], FilterPolicy::DirectKey);
        let err = subset.extract(&opts).unwrap_err();
        assert!(err.to_string().contains("no gene record with key 9999"));
    }

    #[test]
    fn test_extract_direct_key_keeps_duplicates_in_symbols() {
        let mut subset = toy_subset();
        let opts = ExtractOptions::new(["HGNC:1100", "HGNC:1100"], FilterPolicy::DirectKey);
        let symbols = subset.extract(&opts).unwrap();

        // the symbol list keeps the duplicate, the gene map cannot
        assert_eq!(symbols, vec!["BRCA1", "BRCA1"]);
        assert_eq!(subset.container().genes.len(), 1);
        assert_eq!(
            subset.output_path(&symbols),
            PathBuf::from("cdot-0.2.21.brca1_brca1.json")
        );
    }

    #[test]
    fn test_extract_attribute_scan() {
        let mut subset = toy_subset();
        let opts = ExtractOptions::new(["HGNC:1101", "HGNC:1100"], FilterPolicy::AttributeScan);
        let symbols = subset.extract(&opts).unwrap();

        // scan order of the collection wins over the supplied order
        assert_eq!(symbols, vec!["BRCA1", "BRCA2"]);
        let genes: Vec<&String> = subset.container().genes.keys().collect();
        assert_eq!(genes, vec!["1100", "1101"]);
        // the gene without an hgnc attribute is never considered
        assert!(!subset.container().genes.contains_key("ENSG00000277400"));
        // transcripts are matched on their own hgnc attribute
        let transcripts: Vec<&String> = subset.container().transcripts.keys().collect();
        assert_eq!(
            transcripts,
            vec!["NM_007294.3", "NM_007300.4", "NM_000059.4"]
        );
    }

    #[test]
    fn test_extract_attribute_scan_no_match_is_not_an_error() {
        let mut subset = toy_subset();
        let opts = ExtractOptions::new(["HGNC:9999"], FilterPolicy::AttributeScan);
        let symbols = subset.extract(&opts).unwrap();

        assert!(symbols.is_empty());
        assert!(subset.container().genes.is_empty());
        assert!(subset.container().transcripts.is_empty());
    }

    #[test]
    fn test_extract_empty_transcript_set_still_serializes() {
        let mut subset = toy_subset();
        // AC004556.1 has no transcripts in the toy data
        let opts = ExtractOptions::new(["ENSG00000277400"], FilterPolicy::DirectKey);
        let symbols = subset.extract(&opts).unwrap();
        assert_eq!(symbols, vec!["AC004556.1"]);
        assert!(subset.container().transcripts.is_empty());

        let text = serde_json::to_string_pretty(subset.container()).unwrap();
        let reparsed: Container = serde_json::from_str(&text).unwrap();
        assert!(reparsed.transcripts.is_empty());
        assert_eq!(reparsed.genes.len(), 1);
    }

    #[test]
    fn test_extract_is_idempotent() {
        let opts = ExtractOptions::new(["HGNC:1100"], FilterPolicy::DirectKey);

        let mut once = toy_subset();
        once.extract(&opts).unwrap();
        let first = serde_json::to_string_pretty(once.container()).unwrap();

        // re-running the filter over the already filtered container changes nothing
        let refiltered: Container = serde_json::from_str(&first).unwrap();
        let mut twice = CdotSubset::from_container(refiltered, "cdot-0.2.21.json.gz");
        twice.extract(&opts).unwrap();
        let second = serde_json::to_string_pretty(twice.container()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_output_path_from_input_path() {
        let subset = toy_subset();
        assert_eq!(
            subset.output_path(&[String::from("BRCA1")]),
            PathBuf::from("cdot-0.2.21.brca1.json")
        );
        assert_eq!(
            subset.output_path(&[String::from("BRCA1"), String::from("BRCA2")]),
            PathBuf::from("cdot-0.2.21.brca1_brca2.json")
        );
    }

    #[test]
    fn test_retained_gene_without_symbol_fails() {
        let json = r#"{
            "genes": {"49": {"hgnc": "49"}},
            "transcripts": {}
        }"#;
        let container: Container = serde_json::from_str(json).unwrap();
        let mut subset = CdotSubset::from_container(container, "cdot.json");
        let opts = ExtractOptions::new(["HGNC:49"], FilterPolicy::DirectKey);
        let err = subset.extract(&opts).unwrap_err();
        assert!(err.to_string().contains("has no gene_symbol"));
    }
}
