use nutype::nutype;

/// Name of the environment variable holding the comma separated list of HGNC
/// identifiers to extract, e.g. `HGNC_ID="HGNC:1100,HGNC:1101"`.
pub const HGNC_ID_ENV: &str = "HGNC_ID";

/// Identifier extracted when [HGNC_ID_ENV] is unset.
pub const DEFAULT_HGNC_ID: &str = "HGNC:672";

#[nutype(
    sanitize(trim, with = |raw: String| match raw.strip_prefix("HGNC:") {
        Some(stripped) => stripped.to_string(),
        None => raw,
    }),
    derive(Debug, Clone, PartialEq, Eq, Hash, AsRef, Display),
)]
/// An HGNC gene identifier with the `HGNC:` prefix already stripped.
///
/// Identifiers arrive from the environment as `HGNC:1100`; every comparison in the
/// filter happens against the bare numeric part, so the prefix strip is a sanitizer
/// of the newtype rather than something each call site has to remember.
pub struct HgncId(String);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// Represents the gene matching policies available when filtering a cdot file.
///
/// # Variants
///
/// * `DirectKey` - Each supplied identifier is treated as a key of the `genes` mapping
///   and must be present, otherwise the extraction fails.  Transcripts are retained when
///   their `gene_name` attribute equals the display symbol of a retained gene.
///
/// * `AttributeScan` - Every gene record is scanned for an `hgnc` attribute and retained
///   when that attribute appears in the supplied identifier set.  Transcripts are retained
///   when their own `hgnc` attribute appears in the identifier set, independently of which
///   genes were retained.
///
/// The two policies compare different fields when deciding which transcripts survive, and
/// can therefore retain different transcript sets for the same input. They are kept as an
/// explicit selection instead of being merged.
pub enum FilterPolicy {
    DirectKey,
    AttributeScan,
}

impl std::str::FromStr for FilterPolicy {
    type Err = anyhow::Error;

    /// Converts from a [&str] to an appropriate [FilterPolicy] type.
    /// The result is returned in an [`anyhow::Result<FilterPolicy>`]
    /// and is an error variant if there is no corresponding type for
    /// the input argument `s`.
    fn from_str(s: &str) -> anyhow::Result<FilterPolicy> {
        let fp = match s.to_lowercase().as_str() {
            "direct-key" => FilterPolicy::DirectKey,
            "key" => FilterPolicy::DirectKey,
            "attribute-scan" => FilterPolicy::AttributeScan,
            "scan" => FilterPolicy::AttributeScan,
            _ => anyhow::bail!("Cannot parse the filter policy."),
        };
        Ok(fp)
    }
}

impl std::fmt::Display for FilterPolicy {
    /// Print the formatted description of the current [FilterPolicy]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterPolicy::DirectKey => write!(f, "direct-key"),
            FilterPolicy::AttributeScan => write!(f, "attribute-scan"),
        }
    }
}

#[derive(Clone, Debug)]
/// Configuration for one extraction run.
///
/// The identifier list and the policy travel together through the pipeline as an
/// explicit value; nothing reads the process environment after construction, which
/// keeps the filter itself testable without environment manipulation.
///
/// # Fields
///
/// * `hgnc_ids`: The target identifiers, prefix already stripped, in the order they
///   were supplied. Duplicates are kept.
/// * `policy`: The gene matching policy to apply.
pub struct ExtractOptions {
    pub hgnc_ids: Vec<HgncId>,
    pub policy: FilterPolicy,
}

impl ExtractOptions {
    /// Constructs a new [ExtractOptions] from an identifier list and a policy.
    pub fn new<I, S>(hgnc_ids: I, policy: FilterPolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        ExtractOptions {
            hgnc_ids: hgnc_ids
                .into_iter()
                .map(|s| HgncId::new(s.to_string()))
                .collect(),
            policy,
        }
    }

    /// Constructs an [ExtractOptions] from the process environment.
    ///
    /// Reads [HGNC_ID_ENV] once, splitting the value on `,`; when the variable is
    /// unset, falls back to [DEFAULT_HGNC_ID]. The `HGNC:` prefix of every entry is
    /// stripped on ingest.
    pub fn from_env(policy: FilterPolicy) -> Self {
        let raw = std::env::var(HGNC_ID_ENV).unwrap_or_else(|_| String::from(DEFAULT_HGNC_ID));
        ExtractOptions::new(raw.split(','), policy)
    }
}
