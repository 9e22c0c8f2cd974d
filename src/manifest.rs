//! # Manifest Model
//!
//! Parses, merges, and serializes the block-structured manifest embedded in
//! the archive (`META-INF/MANIFEST.MF`). A manifest is one global attribute
//! block followed by zero or more named entry blocks; each block is an
//! insertion-ordered, case-sensitive `name: value` mapping. Lookups by entry
//! name are O(1) through an index built while reading.
//!
//! The on-disk format is line oriented: CRLF endings, blank-line block
//! terminators, and 72-byte line wrapping with single-space continuation
//! lines.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use crate::error::JarError;

/// Conventional directory marker written ahead of the manifest entry.
pub const MANIFEST_DIR: &str = "META-INF/";
/// Archive path of the manifest entry.
pub const MANIFEST_NAME: &str = "META-INF/MANIFEST.MF";
/// Archive path of the classpath index entry.
pub const INDEX_NAME: &str = "META-INF/INDEX.LIST";

pub const VERSION_ATTR: &str = "Manifest-Version";
pub const CREATED_BY_ATTR: &str = "Created-By";
pub const MAIN_CLASS_ATTR: &str = "Main-Class";
pub const CLASS_PATH_ATTR: &str = "Class-Path";
pub const NAME_ATTR: &str = "Name";

const VERSION_VALUE: &str = "1.0";

// Maximum manifest line length is 72 bytes including the CRLF; continuation
// lines consume one byte for the leading space.
const LINE_LIMIT: usize = 70;

fn created_by_value() -> String {
    format!("jarc {}", env!("CARGO_PKG_VERSION"))
}

/// One attribute block: an ordered `name -> value` mapping with O(1) lookup.
/// `put` on an existing name replaces the value in place, preserving the
/// attribute's original position.
#[derive(Debug, Default, Clone)]
pub struct ManifestBlock {
    attrs: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl ManifestBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.index.get(name).map(|&i| self.attrs[i].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn put(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.index.get(&name) {
            Some(&i) => self.attrs[i].1 = value,
            None => {
                self.index.insert(name.clone(), self.attrs.len());
                self.attrs.push((name, value));
            }
        }
    }

    /// Inserts at the front, shifting the index of every later attribute.
    fn put_front(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.attrs.insert(0, (name.clone(), value.into()));
        for idx in self.index.values_mut() {
            *idx += 1;
        }
        self.index.insert(name, 0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// The value of this block's `Name` attribute, if any. The global block
    /// never carries one.
    pub fn entry_name(&self) -> Option<&str> {
        self.get(NAME_ATTR)
    }
}

/// A full manifest: the distinguished global block plus named entry blocks in
/// their original order.
#[derive(Debug, Default, Clone)]
pub struct ManifestModel {
    global: ManifestBlock,
    named: Vec<ManifestBlock>,
    by_name: HashMap<String, usize>,
}

impl ManifestModel {
    /// The default manifest generated when the caller supplies none: just the
    /// version and creator attributes.
    pub fn default_manifest() -> Self {
        let mut m = Self::default();
        m.global.put(VERSION_ATTR, VERSION_VALUE);
        m.global.put(CREATED_BY_ATTR, created_by_value());
        m
    }

    /// Reads a user-supplied manifest and synthesizes the version attribute
    /// as its first line (unless one is already present — detected
    /// case-insensitively, the only case-insensitive lookup in the model)
    /// plus a creator attribute if missing.
    pub fn read<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut m = Self::parse(reader)?;
        let has_version = m.global.iter().any(|(n, _)| n.eq_ignore_ascii_case(VERSION_ATTR));
        if !has_version {
            m.global.put_front(VERSION_ATTR, VERSION_VALUE);
        }
        if !m.global.contains(CREATED_BY_ATTR) {
            m.global.put(CREATED_BY_ATTR, created_by_value());
        }
        Ok(m)
    }

    /// Parses the block structure without synthesizing anything. Used when
    /// re-reading a manifest that is already inside an archive.
    pub fn parse<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut m = Self::default();
        let mut block = ManifestBlock::new();
        let mut first_block = true;

        for line in reader.lines() {
            let line = line?;
            let line = line.strip_suffix('\r').unwrap_or(&line);

            if line.is_empty() {
                if !block.is_empty() {
                    m.push_block(std::mem::take(&mut block), &mut first_block);
                }
                continue;
            }

            if let Some(continuation) = line.strip_prefix(' ') {
                // continuation of the previous attribute's value
                if let Some((_, value)) = block.attrs.last_mut() {
                    value.push_str(continuation);
                }
                continue;
            }

            if let Some((name, value)) = line.split_once(':') {
                let value = value.strip_prefix(' ').unwrap_or(value);
                block.put(name.trim_end(), value);
            }
        }
        if !block.is_empty() {
            m.push_block(block, &mut first_block);
        }
        Ok(m)
    }

    fn push_block(&mut self, block: ManifestBlock, first_block: &mut bool) {
        if *first_block {
            self.global = block;
            *first_block = false;
        } else {
            if let Some(name) = block.entry_name() {
                self.by_name.insert(name.to_string(), self.named.len());
            }
            self.named.push(block);
        }
    }

    pub fn global(&self) -> &ManifestBlock {
        &self.global
    }

    pub fn global_mut(&mut self) -> &mut ManifestBlock {
        &mut self.global
    }

    /// O(1) lookup of a named entry block.
    pub fn get_block(&self, name: &str) -> Option<&ManifestBlock> {
        self.by_name.get(name).map(|&i| &self.named[i])
    }

    pub fn main_class(&self) -> Option<&str> {
        self.global.get(MAIN_CLASS_ATTR)
    }

    /// Records a main-class override. Fails when the global block already
    /// declares one; this validation runs before any archive output exists.
    pub fn set_main_class(&mut self, class: &str) -> Result<(), JarError> {
        if self.global.contains(MAIN_CLASS_ATTR) {
            return Err(JarError::AmbiguousMainClass);
        }
        self.global.put(MAIN_CLASS_ATTR, class);
        Ok(())
    }

    /// Merges `delta` over `self`: delta's attributes win on conflicting
    /// keys, everything else is preserved. Named blocks merge into blocks of
    /// the same name or are appended.
    pub fn merge(&mut self, delta: &ManifestModel) {
        for (name, value) in delta.global.iter() {
            self.global.put(name, value);
        }
        for block in &delta.named {
            match block.entry_name().and_then(|n| self.by_name.get(n)).copied() {
                Some(i) => {
                    for (name, value) in block.iter() {
                        self.named[i].put(name, value);
                    }
                }
                None => {
                    if let Some(name) = block.entry_name() {
                        self.by_name.insert(name.to_string(), self.named.len());
                    }
                    self.named.push(block.clone());
                }
            }
        }
    }

    /// Serializes the manifest: global block first, then named blocks in
    /// original order, each terminated by a blank line.
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        write_block(&mut writer, &self.global)?;
        for block in &self.named {
            write_block(&mut writer, block)?;
        }
        Ok(())
    }

    /// Serializes into an in-memory sink. The STORED write path needs the
    /// full byte length and CRC before the entry header goes out.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        // writing into a Vec cannot fail
        self.write(&mut buf).expect("in-memory manifest serialization");
        buf
    }
}

fn write_block<W: Write>(writer: &mut W, block: &ManifestBlock) -> io::Result<()> {
    for (name, value) in block.iter() {
        write_attribute(writer, name, value)?;
    }
    writer.write_all(b"\r\n")
}

fn write_attribute<W: Write>(writer: &mut W, name: &str, value: &str) -> io::Result<()> {
    let line = format!("{}: {}", name, value);
    let bytes = line.as_bytes();
    let mut written = 0;
    let mut limit = LINE_LIMIT;
    while bytes.len() - written > limit {
        let end = written + limit;
        writer.write_all(&bytes[written..end])?;
        writer.write_all(b"\r\n ")?;
        written = end;
        limit = LINE_LIMIT - 1;
    }
    writer.write_all(&bytes[written..])?;
    writer.write_all(b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> ManifestModel {
        ManifestModel::parse(Cursor::new(text.as_bytes())).unwrap()
    }

    #[test]
    fn default_manifest_has_version_and_creator() {
        let m = ManifestModel::default_manifest();
        assert_eq!(m.global().get(VERSION_ATTR), Some("1.0"));
        assert!(m.global().get(CREATED_BY_ATTR).unwrap().starts_with("jarc "));
    }

    #[test]
    fn read_synthesizes_version_first() {
        let m = ManifestModel::read(Cursor::new(b"Custom-Key: custom-value\r\n\r\n" as &[u8])).unwrap();
        let first = m.global().iter().next().unwrap();
        assert_eq!(first.0, VERSION_ATTR);
        assert_eq!(m.global().get("Custom-Key"), Some("custom-value"));
        assert!(m.global().contains(CREATED_BY_ATTR));
    }

    #[test]
    fn read_keeps_existing_version_case_insensitively() {
        let m = ManifestModel::read(Cursor::new(b"MANIFEST-VERSION: 2.0\r\n\r\n" as &[u8])).unwrap();
        // no second version line synthesized
        let count = m.global().iter().filter(|(n, _)| n.eq_ignore_ascii_case(VERSION_ATTR)).count();
        assert_eq!(count, 1);
        assert_eq!(m.global().get("MANIFEST-VERSION"), Some("2.0"));
    }

    #[test]
    fn named_block_lookup_is_by_name() {
        let m = parse(
            "Manifest-Version: 1.0\r\n\r\nName: com/demo/App.class\r\nSealed: true\r\n\r\nName: other.txt\r\nX-Flag: yes\r\n\r\n",
        );
        let block = m.get_block("com/demo/App.class").unwrap();
        assert_eq!(block.get("Sealed"), Some("true"));
        assert_eq!(m.get_block("other.txt").unwrap().get("X-Flag"), Some("yes"));
        assert!(m.get_block("missing").is_none());
    }

    #[test]
    fn attribute_lookup_is_case_sensitive() {
        let m = parse("Manifest-Version: 1.0\r\nMain-Class: demo.App\r\n\r\n");
        assert_eq!(m.global().get("Main-Class"), Some("demo.App"));
        assert_eq!(m.global().get("main-class"), None);
    }

    #[test]
    fn continuation_lines_are_joined() {
        let m = parse("Manifest-Version: 1.0\r\nClass-Path: first.jar sec\r\n ond.jar\r\n\r\n");
        assert_eq!(m.global().get(CLASS_PATH_ATTR), Some("first.jar second.jar"));
    }

    #[test]
    fn long_values_wrap_and_round_trip() {
        let mut m = ManifestModel::default_manifest();
        let long = "x".repeat(200);
        m.global_mut().put("Long-Attribute", long.clone());
        let bytes = m.to_bytes();
        for line in bytes.split(|&b| b == b'\n') {
            assert!(line.len() <= 71, "line too long: {} bytes", line.len());
        }
        let back = ManifestModel::parse(Cursor::new(&bytes)).unwrap();
        assert_eq!(back.global().get("Long-Attribute"), Some(long.as_str()));
    }

    #[test]
    fn set_main_class_rejects_existing() {
        let mut m = parse("Manifest-Version: 1.0\r\nMain-Class: demo.App\r\n\r\n");
        assert!(matches!(m.set_main_class("demo.Other"), Err(JarError::AmbiguousMainClass)));
        // value untouched on failure
        assert_eq!(m.main_class(), Some("demo.App"));

        let mut fresh = ManifestModel::default_manifest();
        fresh.set_main_class("demo.App").unwrap();
        assert_eq!(fresh.main_class(), Some("demo.App"));
    }

    #[test]
    fn merge_delta_wins_and_preserves_order() {
        let mut old = parse("Manifest-Version: 1.0\r\nVendor: old\r\nKeep: yes\r\n\r\n");
        let delta = parse("Vendor: new\r\nExtra: added\r\n\r\n");
        old.merge(&delta);
        assert_eq!(old.global().get("Vendor"), Some("new"));
        assert_eq!(old.global().get("Keep"), Some("yes"));
        assert_eq!(old.global().get("Extra"), Some("added"));
        // Vendor kept its original position
        let names: Vec<&str> = old.global().iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Manifest-Version", "Vendor", "Keep", "Extra"]);
    }

    #[test]
    fn merge_named_blocks() {
        let mut old = parse("Manifest-Version: 1.0\r\n\r\nName: a.txt\r\nOld: 1\r\n\r\n");
        let delta = parse("Manifest-Version: 1.0\r\n\r\nName: a.txt\r\nOld: 2\r\n\r\nName: b.txt\r\nNew: 3\r\n\r\n");
        old.merge(&delta);
        assert_eq!(old.get_block("a.txt").unwrap().get("Old"), Some("2"));
        assert_eq!(old.get_block("b.txt").unwrap().get("New"), Some("3"));
    }

    #[test]
    fn write_emits_global_then_named_blocks() {
        let m = parse("Manifest-Version: 1.0\r\n\r\nName: z.txt\r\nK: v\r\n\r\nName: a.txt\r\nK: w\r\n\r\n");
        let text = String::from_utf8(m.to_bytes()).unwrap();
        let z = text.find("Name: z.txt").unwrap();
        let a = text.find("Name: a.txt").unwrap();
        let version = text.find("Manifest-Version").unwrap();
        assert!(version < z && z < a, "blocks must keep original order");
    }
}
