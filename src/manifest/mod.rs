//! Manifest loading and the CLI argument grammars.
//!
//! A manifest is a JSON file describing what goes into an archive:
//!
//! ```json
//! {
//!   "meta":    [{ "name": "board", "value": "rev1" }],
//!   "entries": [{ "name": "fw.bin", "flags": ["img", "lzo"], "path": "build/fw.bin" }],
//!   "output":  "out.pack",
//!   "index":   "out.json"
//! }
//! ```
//!
//! Template variables are substituted into the manifest text before it is
//! parsed.  Entry paths are resolved against the current directory.

pub mod template;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

use crate::checksum::content_hash;
use crate::entry::{Entry, FLAG_IMAGE, FLAG_LZO, FLAG_REGULAR};
use crate::record::MetaRecord;
pub use template::{render, TemplateVars};

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Template variable not set: {0}")]
    UnsetVariable(String),
    #[error("Bad parse {expected}: {arg}")]
    BadArgument { expected: &'static str, arg: String },
    #[error("Unknown entry flag '{flag}' for entry {name}")]
    UnknownFlag { name: String, flag: String },
    #[error("{}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Manifest file ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetaSpec {
    pub name:  String,
    pub value: String,
}

impl From<&MetaSpec> for MetaRecord {
    fn from(m: &MetaSpec) -> Self {
        MetaRecord::new(0, m.name.as_str(), m.value.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntrySpec {
    pub name:  String,
    pub flags: Vec<String>,
    pub path:  PathBuf,
}

impl EntrySpec {
    /// Flag bits for the words in `flags` (`reg`, `img`, `lzo`).
    pub fn flag_bits(&self) -> Result<u8, ManifestError> {
        self.flags.iter().try_fold(0u8, |acc, word| {
            let bit = match word.as_str() {
                "reg" => FLAG_REGULAR,
                "img" => FLAG_IMAGE,
                "lzo" => FLAG_LZO,
                other => {
                    return Err(ManifestError::UnknownFlag {
                        name: self.name.clone(),
                        flag: other.to_owned(),
                    })
                }
            };
            Ok(acc | bit)
        })
    }

    /// Read the entry's source file.
    pub fn load(&self) -> Result<Entry, ManifestError> {
        let flags = self.flag_bits()?;
        let data = std::fs::read(&self.path).map_err(|source| ManifestError::Read {
            path: self.path.clone(),
            source,
        })?;
        Ok(Entry::new(self.name.as_str(), flags, data))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    #[serde(default)]
    pub meta:    Vec<MetaSpec>,
    #[serde(default)]
    pub entries: Vec<EntrySpec>,
    #[serde(default)]
    pub output:  Option<PathBuf>,
    #[serde(default)]
    pub index:   Option<PathBuf>,
}

impl Manifest {
    pub fn parse(vars: &TemplateVars, text: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(&render(vars, text)?)?)
    }

    pub fn load<P: AsRef<Path>>(vars: &TemplateVars, path: P) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(vars, &text)
    }

    /// Append `other`'s meta and entries; its `output`/`index` win when set.
    pub fn merge(&mut self, other: Manifest) {
        self.meta.extend(other.meta);
        self.entries.extend(other.entries);
        if other.output.is_some() {
            self.output = other.output;
        }
        if other.index.is_some() {
            self.index = other.index;
        }
    }

    pub fn meta_records(&self) -> Vec<MetaRecord> {
        self.meta.iter().map(MetaRecord::from).collect()
    }

    /// Read every entry's source file, in manifest order.
    pub fn load_entries(&self) -> Result<Vec<Entry>, ManifestError> {
        self.entries.iter().map(EntrySpec::load).collect()
    }
}

// ── CLI argument grammars ─────────────────────────────────────────────────────

fn key_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([a-zA-Z0-9_]+)=(.*)$").expect("static regex"))
}

fn entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([a-zA-Z0-9_/.]+)=([a-z,]+):(.*)$").expect("static regex"))
}

fn parse_key_value(arg: &str) -> Result<(String, String), ManifestError> {
    let caps = key_value_re().captures(arg).ok_or_else(|| ManifestError::BadArgument {
        expected: "key=value",
        arg:      arg.to_owned(),
    })?;
    Ok((caps[1].to_owned(), caps[2].to_owned()))
}

/// `name=value` for `--template`.
pub fn parse_template_arg(arg: &str) -> Result<(String, String), ManifestError> {
    parse_key_value(arg)
}

/// `key=value` for `--meta`.
pub fn parse_meta_arg(arg: &str) -> Result<MetaSpec, ManifestError> {
    let (name, value) = parse_key_value(arg)?;
    Ok(MetaSpec { name, value })
}

/// `name=flag1,flag2:path` for `--entry`.
pub fn parse_entry_arg(arg: &str) -> Result<EntrySpec, ManifestError> {
    let caps = entry_re().captures(arg).ok_or_else(|| ManifestError::BadArgument {
        expected: "key=flag1,flag2:value",
        arg:      arg.to_owned(),
    })?;
    Ok(EntrySpec {
        name:  caps[1].to_owned(),
        flags: caps[2].split(',').filter(|f| !f.is_empty()).map(str::to_owned).collect(),
        path:  PathBuf::from(&caps[3]),
    })
}

// ── Manifest index ────────────────────────────────────────────────────────────

/// Entry name → hex SHA-256 of the entry's raw bytes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ManifestIndex {
    pub hashes: BTreeMap<String, String>,
}

impl ManifestIndex {
    pub fn from_entries(entries: &[Entry]) -> Self {
        Self {
            hashes: entries
                .iter()
                .map(|e| (e.name.clone(), hex::encode(content_hash(&e.data))))
                .collect(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ManifestError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_arg() {
        let m = parse_meta_arg("board=rev1=b").unwrap();
        assert_eq!(m, MetaSpec { name: "board".into(), value: "rev1=b".into() });
        assert_eq!(parse_meta_arg("empty=").unwrap().value, "");
        assert!(matches!(parse_meta_arg("bad key=x"), Err(ManifestError::BadArgument { .. })));
    }

    #[test]
    fn entry_arg() {
        let e = parse_entry_arg("fw/app.bin=img,lzo:build/app.bin").unwrap();
        assert_eq!(e.name, "fw/app.bin");
        assert_eq!(e.flags, ["img", "lzo"]);
        assert_eq!(e.path, PathBuf::from("build/app.bin"));
        assert_eq!(e.flag_bits().unwrap(), FLAG_IMAGE | FLAG_LZO);
        assert!(parse_entry_arg("noflags:path").is_err());
        assert!(parse_entry_arg("bad name=reg:path").is_err());
    }

    #[test]
    fn unknown_flag_rejected() {
        let e = parse_entry_arg("a=reg,gz:x").unwrap();
        assert!(matches!(e.flag_bits(), Err(ManifestError::UnknownFlag { ref flag, .. }) if flag == "gz"));
    }

    #[test]
    fn manifest_with_template() {
        let mut vars = TemplateVars::new();
        vars.insert("rev".into(), "rev2".into());
        let text = r#"{
            "meta": [{"name": "board", "value": "{{ rev }}"}],
            "entries": [{"name": "a", "flags": ["reg"], "path": "a.bin"}],
            "output": "out.pack"
        }"#;
        let m = Manifest::parse(&vars, text).unwrap();
        assert_eq!(m.meta[0].value, "rev2");
        assert_eq!(m.entries[0].flag_bits().unwrap(), FLAG_REGULAR);
        assert_eq!(m.output, Some(PathBuf::from("out.pack")));
        assert_eq!(m.index, None);
        assert_eq!(MetaRecord::from(&m.meta[0]), MetaRecord::new(0, "board", "rev2"));
    }

    #[test]
    fn merge_appends_and_overrides() {
        let vars = TemplateVars::new();
        let mut a = Manifest::parse(&vars, r#"{"meta": [{"name": "a", "value": "1"}], "output": "a.pack", "index": "a.json"}"#).unwrap();
        let b = Manifest::parse(&vars, r#"{"meta": [{"name": "b", "value": "2"}], "output": "b.pack"}"#).unwrap();
        a.merge(b);
        let keys: Vec<&str> = a.meta.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(a.output, Some(PathBuf::from("b.pack")));
        assert_eq!(a.index, Some(PathBuf::from("a.json")));
    }

    #[test]
    fn missing_source_file_names_path() {
        let e = parse_entry_arg("a=reg:/nonexistent/packfs/source.bin").unwrap();
        let err = e.load().unwrap_err();
        assert!(err.to_string().starts_with("/nonexistent/packfs/source.bin: "));
    }

    #[test]
    fn empty_manifest() {
        let m = Manifest::parse(&TemplateVars::new(), "{}").unwrap();
        assert_eq!(m, Manifest::default());
    }

    #[test]
    fn index_json() {
        let entries = [
            Entry::new("b", FLAG_REGULAR, b"abc".to_vec()),
            Entry::new("a", FLAG_IMAGE | FLAG_LZO, vec![]),
        ];
        let idx = ManifestIndex::from_entries(&entries);
        let json = String::from_utf8(idx.to_bytes().unwrap()).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"a":"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855","#,
                r#""b":"ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"}"#
            )
        );
        assert_eq!(ManifestIndex::from_bytes(json.as_bytes()).unwrap(), idx);
    }
}
