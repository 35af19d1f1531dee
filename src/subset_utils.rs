use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Type alias for a boxed reader over the decoded bytes of a cdot JSON file.
/// It is used to allow reading from either a compressed or uncompressed file.
pub type JsonReader = Box<dyn BufRead>;

/// Suffix marking a gzip compressed input file.
pub const GZ_SUFFIX: &str = ".gz";

/// Suffix of an (uncompressed) cdot data file.
pub const JSON_SUFFIX: &str = ".json";

/// Tests if the stream underlying the [BufReader] `reader` is gzipped or not by examining the
/// first 2 bytes for the magic header.  This function *requires*, but does not check, that
/// none of the stream has yet been consumed (i.e. that no read calls have yet been issued
/// to `reader`). It will fill the buffer to examine the first two bytes, but will not consume
/// them.
///
/// If the first 2 bytes could be succesfully read, this returns
/// [Ok]`(true)` if the file is a gzipped file
/// [Ok]`(false)` if it is not a gzipped file
///
/// If the first 2 bytes could not be succesfully read, then this
/// returns the relevant [std::io::Error].
///
/// Notes: implementation taken from
/// <https://github.com/zaeleus/noodles/blob/ba1b34ce22e72c2df277b20ce4c5c7b75d75a199/noodles-util/src/variant/reader/builder.rs#L131>
pub fn is_gzipped<T: BufRead>(reader: &mut T) -> std::io::Result<bool> {
    const GZIP_MAGIC_NUMBER: [u8; 2] = [0x1f, 0x8b];

    let src = reader.fill_buf()?;
    if src.get(..2) == Some(&GZIP_MAGIC_NUMBER) {
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Creates a [JsonReader] from the provided path. This function will automatically
/// determine if the provided path points to a gzip compressed or an uncompressed
/// file, and will return the appropriate reader accordingly.
///
/// It returns [Ok]`(`[JsonReader]`)` on success and an [anyhow::Error] on failure.
pub fn get_json_reader_from_path<T: AsRef<Path>>(p: T) -> anyhow::Result<JsonReader> {
    let file = File::open(p.as_ref())?;
    let mut inner_rdr = BufReader::new(file);
    if is_gzipped(&mut inner_rdr)? {
        trace!("auto-detected gzipped JSON file - reading via decompression");
        Ok(Box::new(BufReader::new(GzDecoder::new(inner_rdr))))
    } else {
        Ok(Box::new(inner_rdr))
    }
}

/// Creates a [JsonReader] from the provided reader. This function will automatically
/// determine if the provided reader is reading from a gzip compressed or an uncompressed
/// stream, and will return the appropriate reader accordingly.
///
/// It returns [Ok]`(`[JsonReader]`)` on success and an [anyhow::Error] on failure.
///
/// **Note** : It is intended that this function *take ownership* of the underlying reader, which
/// is the reason behind the `'static` lifetime bound.
pub fn get_json_reader_from_reader(r: impl Read + 'static) -> anyhow::Result<JsonReader> {
    let mut inner_rdr = BufReader::new(r);
    if is_gzipped(&mut inner_rdr)? {
        trace!("auto-detected gzipped JSON stream - reading via decompression");
        Ok(Box::new(BufReader::new(GzDecoder::new(inner_rdr))))
    } else {
        Ok(Box::new(inner_rdr))
    }
}

/// Derives the output path for a filtered file from the input path and the display
/// symbols of the retained genes.
///
/// The derivation strips a trailing [GZ_SUFFIX] and then a trailing [JSON_SUFFIX]
/// from the input path, and appends the lowercased symbols joined by `_` followed
/// by [JSON_SUFFIX].  The output is always named as an uncompressed file, even when
/// the input was compressed.
///
/// # Examples
///
/// ```rust
/// use cdot_subset::subset_utils::derive_output_path;
/// use std::path::PathBuf;
///
/// let out = derive_output_path("data/cdot-0.2.21.json.gz", &[String::from("BRCA1")]);
/// assert_eq!(out, PathBuf::from("data/cdot-0.2.21.brca1.json"));
/// ```
pub fn derive_output_path<T: AsRef<Path>>(input: T, symbols: &[String]) -> PathBuf {
    let input = input.as_ref().to_string_lossy();
    let stem = input.strip_suffix(GZ_SUFFIX).unwrap_or(&input);
    let stem = stem.strip_suffix(JSON_SUFFIX).unwrap_or(stem);
    let joined = symbols
        .iter()
        .map(|s| s.to_lowercase())
        .collect::<Vec<String>>()
        .join("_");
    PathBuf::from(format!("{}.{}{}", stem, joined, JSON_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_output_path() {
        assert_eq!(
            derive_output_path("foo.json.gz", &[String::from("brca1")]),
            PathBuf::from("foo.brca1.json")
        );
        assert_eq!(
            derive_output_path("foo.json.gz", &[String::from("brca1"), String::from("brca2")]),
            PathBuf::from("foo.brca1_brca2.json")
        );
        // uncompressed inputs only lose the data-file suffix
        assert_eq!(
            derive_output_path("foo.json", &[String::from("brca1")]),
            PathBuf::from("foo.brca1.json")
        );
    }

    #[test]
    fn test_derive_output_path_lowercases_symbols() {
        assert_eq!(
            derive_output_path("cdot-0.2.21.refseq.grch38.json.gz", &[String::from("BRCA1")]),
            PathBuf::from("cdot-0.2.21.refseq.grch38.brca1.json")
        );
    }

    #[test]
    fn test_is_gzipped() {
        let plain = b"{\"genes\": {}}";
        let mut rdr = std::io::BufReader::new(&plain[..]);
        assert!(!is_gzipped(&mut rdr).unwrap());

        let magic = [0x1fu8, 0x8b, 0x08, 0x00];
        let mut rdr = std::io::BufReader::new(&magic[..]);
        assert!(is_gzipped(&mut rdr).unwrap());
    }
}
