use std::{
    path::PathBuf,
    process::{Command, Output},
};

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_ugoira-convert")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "ugoira-convert.exe"
            } else {
                "ugoira-convert"
            });
            p
        })
}

fn run(args: &[&str]) -> Output {
    Command::new(exe())
        .args(args)
        .env_remove("UGCONV_SESSION_ID")
        .output()
        .unwrap()
}

#[test]
fn help_lists_input_flags() {
    let out = run(&["--help"]);
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    for flag in ["--meta", "--zip", "--ugoira", "--id", "--fmt", "--session-id"] {
        assert!(text.contains(flag), "missing {flag} in help:\n{text}");
    }
}

#[test]
fn bad_url_exits_with_url_invalid() {
    let out = run(&["-q", "https://example.com/en/artworks/1"]);
    assert_eq!(out.status.code(), Some(7));
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("Invalid artwork URL"), "{err}");
}

#[test]
fn zip_without_meta_is_rejected() {
    let out = run(&["--zip", "frames.zip", "out.gif"]);
    assert!(!out.status.success());
}

#[test]
fn missing_meta_file_exits_with_meta_cant_open() {
    let dir = tempfile::tempdir().unwrap();
    let meta = dir.path().join("absent.json");
    let out = run(&["-q", "--meta", meta.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn malformed_meta_file_exits_with_meta_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let meta = dir.path().join("meta.json");
    std::fs::write(&meta, "{\"frames\": ").unwrap();
    let out = run(&["-q", "--meta", meta.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(5));
}

#[test]
fn unknown_output_extension_is_rejected() {
    let out = run(&["-q", "--id", "12345", "clip.mp4"]);
    assert!(!out.status.success());
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("Unrecognized extension .mp4"), "{err}");
}
