#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

pub fn temp_dir(prefix: &str) -> PathBuf {
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let mut dir = std::env::temp_dir();
    dir.push(format!("hexbin_{prefix}_{}_{}", std::process::id(), id));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_file(path: &Path, data: &[u8]) {
    std::fs::write(path, data).unwrap();
}

pub fn run_hexbin(args: &[String]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hexbin"))
        .args(args)
        .output()
        .unwrap()
}

pub fn assert_success(output: &Output) {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("hexbin failed: {stderr}");
    }
}

/// Deterministic image with a padding gap in the middle.
pub fn sample_image() -> Vec<u8> {
    let mut data: Vec<u8> = (0..300u32).map(|i| (i * 7 % 251) as u8).collect();
    data.extend(vec![0xFF; 5000]);
    data.extend((0..77u32).map(|i| (i * 13 % 241) as u8));
    data
}
