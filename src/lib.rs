//! cdot-subset cuts a [cdot](https://github.com/SACGF/cdot) transcript JSON file down to the
//! handful of genes a test suite actually needs.  Given one or more (possibly gzip compressed)
//! cdot files and a set of HGNC identifiers, it retains the matching gene records and the
//! transcript records that belong to them, and writes the reduced file next to the input with
//! the retained gene symbols spliced into the name.  Everything else about the file (the cdot
//! version, the genome build list, any attribute we do not model) passes through untouched, so
//! the output remains a valid cdot file that downstream tooling can load like the original.

pub mod options;
pub mod reader;
pub mod subset_info;
pub mod subset_utils;
pub use options::{ExtractOptions, FilterPolicy, HgncId};
pub use subset_info::CdotSubset;
