use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use jarc::manifest::{MANIFEST_DIR, MANIFEST_NAME};
use jarc::ops::{self, JarOptions};
use tempfile::tempdir;
use zip::CompressionMethod;
use zip::ZipArchive;

fn open_archive(path: &Path) -> ZipArchive<File> {
    ZipArchive::new(File::open(path).unwrap()).unwrap()
}

fn entry_names(archive: &mut ZipArchive<File>) -> Vec<String> {
    (0..archive.len()).map(|i| archive.by_index(i).unwrap().name().to_string()).collect()
}

fn entry_bytes(archive: &mut ZipArchive<File>, name: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    archive.by_name(name).unwrap().read_to_end(&mut buf).unwrap();
    buf
}

fn options(inputs: Vec<PathBuf>, relocate: &Path) -> JarOptions {
    JarOptions { inputs, relocations: vec![relocate.to_path_buf()], ..Default::default() }
}

#[test]
fn build_scenario_two_files_with_default_manifest() {
    // 1. Setup: two plain files
    let source = tempdir().unwrap();
    fs::write(source.path().join("a.txt"), b"alpha").unwrap();
    fs::write(source.path().join("b.txt"), b"beta").unwrap();

    let out = tempdir().unwrap();
    let jar = out.path().join("app.jar");

    // 2. Build with a generated default manifest
    let inputs = vec![source.path().join("a.txt"), source.path().join("b.txt")];
    ops::create(&jar, &options(inputs, source.path())).unwrap();

    // 3. Exactly four entries: manifest dir marker, manifest, then the files
    let mut archive = open_archive(&jar);
    assert_eq!(
        entry_names(&mut archive),
        vec![MANIFEST_DIR.to_string(), MANIFEST_NAME.to_string(), "a.txt".to_string(), "b.txt".to_string()]
    );

    // 4. Round-trip: each entry reproduces its input bytes
    assert_eq!(entry_bytes(&mut archive, "a.txt"), b"alpha");
    assert_eq!(entry_bytes(&mut archive, "b.txt"), b"beta");
    let manifest = String::from_utf8(entry_bytes(&mut archive, MANIFEST_NAME)).unwrap();
    assert!(manifest.starts_with("Manifest-Version: 1.0"));
}

#[test]
fn round_trip_preserves_names_and_content_recursively() {
    let source = tempdir().unwrap();
    let nested = source.path().join("pkg").join("deep");
    fs::create_dir_all(&nested).unwrap();
    fs::write(source.path().join("top.txt"), b"top level").unwrap();
    fs::write(nested.join("leaf.bin"), &[0u8, 1, 2, 3, 255]).unwrap();
    fs::write(source.path().join("pkg").join("empty.txt"), b"").unwrap();

    let out = tempdir().unwrap();
    let jar = out.path().join("tree.jar");
    ops::create(&jar, &options(vec![source.path().to_path_buf()], source.path())).unwrap();

    let mut archive = open_archive(&jar);
    let names = entry_names(&mut archive);
    for expected in ["top.txt", "pkg/", "pkg/deep/", "pkg/deep/leaf.bin", "pkg/empty.txt"] {
        assert!(names.iter().any(|n| n == expected), "missing entry {expected} in {names:?}");
    }
    assert_eq!(entry_bytes(&mut archive, "top.txt"), b"top level");
    assert_eq!(entry_bytes(&mut archive, "pkg/deep/leaf.bin"), vec![0u8, 1, 2, 3, 255]);

    // directories and the empty file are STORED with no payload
    let empty = archive.by_name("pkg/empty.txt").unwrap();
    assert_eq!(empty.size(), 0);
    assert_eq!(empty.compression(), CompressionMethod::Stored);
}

#[test]
fn store_only_archives_use_stored_method_throughout() {
    let source = tempdir().unwrap();
    fs::write(source.path().join("data.txt"), b"stored, not deflated").unwrap();

    let out = tempdir().unwrap();
    let jar = out.path().join("stored.jar");
    let mut opts = options(vec![source.path().join("data.txt")], source.path());
    opts.store_only = true;
    ops::create(&jar, &opts).unwrap();

    let mut archive = open_archive(&jar);
    let entry = archive.by_name("data.txt").unwrap();
    assert_eq!(entry.compression(), CompressionMethod::Stored);
    assert_eq!(entry.size(), entry.compressed_size());
}

#[test]
fn archive_never_embeds_itself() {
    // the target lives inside the directory being archived
    let source = tempdir().unwrap();
    fs::write(source.path().join("a.txt"), b"content").unwrap();
    let jar = source.path().join("self.jar");
    fs::write(&jar, b"placeholder so the walk sees it").unwrap();

    ops::create(&jar, &options(vec![source.path().to_path_buf()], source.path())).unwrap();

    let mut archive = open_archive(&jar);
    let names = entry_names(&mut archive);
    assert!(!names.iter().any(|n| n == "self.jar"), "archive embedded itself: {names:?}");
    assert!(names.iter().any(|n| n == "a.txt"));
}

#[test]
fn no_manifest_flag_suppresses_manifest_entries() {
    let source = tempdir().unwrap();
    fs::write(source.path().join("a.txt"), b"a").unwrap();

    let out = tempdir().unwrap();
    let jar = out.path().join("bare.jar");
    let mut opts = options(vec![source.path().join("a.txt")], source.path());
    opts.no_manifest = true;
    ops::create(&jar, &opts).unwrap();

    let mut archive = open_archive(&jar);
    assert_eq!(entry_names(&mut archive), vec!["a.txt".to_string()]);
}

#[test]
fn user_manifest_and_main_class_override() {
    let source = tempdir().unwrap();
    let mf = source.path().join("extra.mf");
    fs::write(&mf, b"X-Vendor: acme\r\n\r\n").unwrap();
    fs::write(source.path().join("a.txt"), b"a").unwrap();

    let out = tempdir().unwrap();
    let jar = out.path().join("app.jar");
    let mut opts = options(vec![source.path().join("a.txt")], source.path());
    opts.manifest = Some(mf);
    opts.main_class = Some("com.acme.Main".into());
    ops::create(&jar, &opts).unwrap();

    let mut archive = open_archive(&jar);
    let manifest = String::from_utf8(entry_bytes(&mut archive, MANIFEST_NAME)).unwrap();
    assert!(manifest.starts_with("Manifest-Version: 1.0"), "version must be synthesized first: {manifest}");
    assert!(manifest.contains("X-Vendor: acme"));
    assert!(manifest.contains("Main-Class: com.acme.Main"));
}

#[test]
fn main_class_override_rejected_when_manifest_declares_one() {
    let source = tempdir().unwrap();
    let mf = source.path().join("has-main.mf");
    fs::write(&mf, b"Main-Class: com.acme.Original\r\n\r\n").unwrap();
    fs::write(source.path().join("a.txt"), b"a").unwrap();

    let out = tempdir().unwrap();
    let jar = out.path().join("app.jar");
    let mut opts = options(vec![source.path().join("a.txt")], source.path());
    opts.manifest = Some(mf);
    opts.main_class = Some("com.acme.Override".into());

    let err = ops::create(&jar, &opts).unwrap_err();
    assert!(matches!(err, jarc::JarError::AmbiguousMainClass));
    // nothing was written
    assert!(!jar.exists());
}

#[test]
fn main_class_with_suppressed_manifest_is_rejected() {
    let source = tempdir().unwrap();
    fs::write(source.path().join("a.txt"), b"a").unwrap();

    let out = tempdir().unwrap();
    let jar = out.path().join("app.jar");
    let mut opts = options(vec![source.path().join("a.txt")], source.path());
    opts.no_manifest = true;
    opts.main_class = Some("com.acme.Main".into());

    // the CLI blocks this pair at parse time; the library surface must not
    // silently drop the entry point instead
    let err = ops::create(&jar, &opts).unwrap_err();
    assert!(matches!(err, jarc::JarError::InvalidOptions(_)));
    assert!(!jar.exists());
}

#[test]
fn missing_inputs_are_aggregated() {
    let source = tempdir().unwrap();
    fs::write(source.path().join("real.txt"), b"r").unwrap();

    let out = tempdir().unwrap();
    let jar = out.path().join("app.jar");
    let opts = options(
        vec![source.path().join("ghost1"), source.path().join("real.txt"), source.path().join("ghost2")],
        source.path(),
    );

    match ops::create(&jar, &opts).unwrap_err() {
        jarc::JarError::MissingInput(paths) => assert_eq!(paths.len(), 2),
        other => panic!("expected MissingInput, got {other:?}"),
    }
    assert!(!jar.exists());
}
