use packfs::archive::build_archive;
use packfs::entry::{Entry, FLAG_IMAGE, FLAG_LZO, FLAG_REGULAR};
use packfs::manifest::ManifestIndex;
use packfs::record::MetaRecord;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn packfs() -> Command {
    Command::new(env!("CARGO_BIN_EXE_packfs"))
}

#[test]
fn test_pack_from_arguments() {
    let dir = tempdir().unwrap();
    let reg = dir.path().join("init.bin");
    let img = dir.path().join("app.img");
    fs::write(&reg, b"ABCD").unwrap();
    fs::write(&img, vec![0u8; 2048]).unwrap();
    let out = dir.path().join("out.pack");

    let status = packfs()
        .arg("-m").arg("board=rev1")
        .arg("-e").arg(format!("init.bin=reg:{}", reg.display()))
        .arg("-e").arg(format!("app.img=img,lzo:{}", img.display()))
        .arg("-o").arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let expected = build_archive(
        &[MetaRecord::new(0, "board", "rev1")],
        &[
            Entry::new("init.bin", FLAG_REGULAR, b"ABCD".to_vec()),
            Entry::new("app.img", FLAG_IMAGE | FLAG_LZO, vec![0u8; 2048]),
        ],
        false,
    )
    .unwrap();
    assert_eq!(fs::read(&out).unwrap(), expected);
}

#[test]
fn test_pack_from_templated_manifest() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("fw.bin");
    fs::write(&src, b"firmware image bytes").unwrap();
    let out = dir.path().join("fw.pack");
    let index = dir.path().join("fw.json");
    let manifest = dir.path().join("manifest.json");
    fs::write(
        &manifest,
        r#"{
            "meta": [{"name": "version", "value": "{{ ver }}"}],
            "entries": [{"name": "fw.bin", "flags": ["img"], "path": "{{src}}"}],
            "output": "{{out}}",
            "index": "{{idx}}"
        }"#,
    )
    .unwrap();

    let status = packfs()
        .arg("-t").arg("ver=2.0.1")
        .arg("-t").arg(format!("src={}", src.display()))
        .arg("-t").arg(format!("out={}", out.display()))
        .arg("-t").arg(format!("idx={}", index.display()))
        .arg("-f").arg(&manifest)
        .arg("--strip")
        .status()
        .unwrap();
    assert!(status.success());

    let entries = [Entry::new("fw.bin", FLAG_IMAGE, b"firmware image bytes".to_vec())];
    let expected = build_archive(&[MetaRecord::new(0, "version", "2.0.1")], &entries, true).unwrap();
    assert_eq!(fs::read(&out).unwrap(), expected);

    let written = ManifestIndex::from_bytes(&fs::read(&index).unwrap()).unwrap();
    assert_eq!(written, ManifestIndex::from_entries(&entries));
}

#[test]
fn test_missing_template_variable_fails() {
    let dir = tempdir().unwrap();
    let manifest = dir.path().join("manifest.json");
    fs::write(&manifest, r#"{"output": "{{ out }}"}"#).unwrap();

    let output = packfs().arg("-f").arg(&manifest).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("UnsetVariable(\"out\")"));
}

#[test]
fn test_missing_output_fails() {
    let output = packfs().arg("-m").arg("a=b").output().unwrap();
    assert!(!output.status.success());
}
