//! The gasfs-specific manifest schema built on top of the generic INI
//! tokenizer.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use gasfs_core::GasFsError;

use crate::ini::Document;

/// The literal token that, in a slice's `PathList`, forbids the free-fill
/// phase from placing anything else in that slice.
pub const NO_ADD_FREE_FILE_TOKEN: &str = "****";

/// A parsed `.gfi` manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// `[Global] Slices=`.
    pub slices: u8,
    /// `[Global] MaxSliceSize=`, in mebibytes.
    pub max_slice_size_mib: u32,
    /// `[Input] PathList=`: path prefixes (relative to the base directory)
    /// to traverse for input files.
    pub input_paths: Vec<String>,
    /// `[NNN] PathList=` sections, keyed by slice number.
    pub pins: BTreeMap<u8, PinSection>,
}

/// One `[NNN]` section: paths pinned to that slice, and whether the
/// `****` token was present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinSection {
    /// Paths pinned to this slice.
    pub paths: Vec<String>,
    /// Whether free-fill is forbidden from placing anything in this slice.
    pub no_add_free_file: bool,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, GasFsError> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|e| GasFsError::io(path.to_path_buf(), e))?;
        Self::parse(&source)
    }

    /// Parse a manifest from its textual source.
    pub fn parse(source: &str) -> Result<Self, GasFsError> {
        let doc = Document::parse(source)?;

        let slices = doc
            .get("Global", "Slices")
            .and_then(|v| v.as_scalar())
            .ok_or_else(|| GasFsError::ManifestError("missing [Global] Slices".into()))?
            .parse::<u8>()
            .map_err(|e| GasFsError::ManifestError(format!("invalid Slices: {e}")))?;

        let max_slice_size_mib = doc
            .get("Global", "MaxSliceSize")
            .and_then(|v| v.as_scalar())
            .ok_or_else(|| GasFsError::ManifestError("missing [Global] MaxSliceSize".into()))?
            .parse::<u32>()
            .map_err(|e| GasFsError::ManifestError(format!("invalid MaxSliceSize: {e}")))?;

        let input_paths = doc
            .get("Input", "PathList")
            .and_then(|v| v.as_list())
            .ok_or_else(|| GasFsError::ManifestError("missing [Input] PathList".into()))?
            .to_vec();

        let mut pins = BTreeMap::new();
        for section in doc.section_names() {
            if section == "Global" || section == "Input" {
                continue;
            }
            let slice_no: u8 = section.parse().map_err(|_| {
                GasFsError::ManifestError(format!("unrecognised section [{section}]"))
            })?;
            let Some(list) = doc.get(section, "PathList").and_then(|v| v.as_list()) else {
                continue;
            };

            let mut pin = PinSection::default();
            for item in list {
                if item == NO_ADD_FREE_FILE_TOKEN {
                    pin.no_add_free_file = true;
                } else {
                    pin.paths.push(item.clone());
                }
            }
            pins.insert(slice_no, pin);
        }

        Ok(Manifest {
            slices,
            max_slice_size_mib,
            input_paths,
            pins,
        })
    }

    /// Render this manifest back into `.gfi` textual form, for `--list`
    /// round-tripping.
    pub fn to_gfi_string(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "[Global]");
        let _ = writeln!(out, "Slices={}", self.slices);
        let _ = writeln!(out, "MaxSliceSize={}", self.max_slice_size_mib);
        let _ = writeln!(out);

        let _ = writeln!(out, "[Input]");
        write_path_list(&mut out, &self.input_paths);
        let _ = writeln!(out);

        for (slice_no, pin) in &self.pins {
            let _ = writeln!(out, "[{slice_no:03}]");
            let mut items = pin.paths.clone();
            if pin.no_add_free_file {
                items.push(NO_ADD_FREE_FILE_TOKEN.to_string());
            }
            write_path_list(&mut out, &items);
            let _ = writeln!(out);
        }

        out
    }
}

fn write_path_list(out: &mut String, items: &[String]) {
    let _ = writeln!(out, "PathList=[[[[");
    for item in items {
        let _ = writeln!(out, "{item}");
    }
    let _ = writeln!(out, "]]]]");
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[Global]
Slices=2
MaxSliceSize=1

[Input]
PathList=[[[[
a/
]]]]

[001]
PathList=[[[[
pin.bin
]]]]

[002]
PathList=[[[[
****
]]]]
";

    #[test]
    fn parses_full_manifest() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        assert_eq!(manifest.slices, 2);
        assert_eq!(manifest.max_slice_size_mib, 1);
        assert_eq!(manifest.input_paths, ["a/".to_string()]);

        let pin1 = &manifest.pins[&1];
        assert_eq!(pin1.paths, ["pin.bin".to_string()]);
        assert!(!pin1.no_add_free_file);

        let pin2 = &manifest.pins[&2];
        assert!(pin2.paths.is_empty());
        assert!(pin2.no_add_free_file);
    }

    #[test]
    fn round_trips_through_gfi_string() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        let rendered = manifest.to_gfi_string();
        let reparsed = Manifest::parse(&rendered).unwrap();
        assert_eq!(manifest, reparsed);
    }

    #[test]
    fn missing_global_section_is_an_error() {
        let source = "[Input]\nPathList=[[[[\na/\n]]]]\n";
        assert!(Manifest::parse(source).is_err());
    }
}
