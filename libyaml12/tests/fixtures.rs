//! Test harness for the YAML parser against fixture files.
//!
//! Every .yaml file under test/yaml/ must parse, and its event dump must
//! equal test/event/<name>.event. Every .yaml file under test/nay/ must fail;
//! when test/nay/<name>.error exists the error message must match it.

use std::fs;
use std::path::{Path, PathBuf};

use libyaml12::{parse, parse_with_filename, to_events};

/// Root test directory.
fn test_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("test")
}

/// All .yaml files in a subdirectory of test/, sorted.
fn yaml_files(subdir: &str) -> Vec<PathBuf> {
    let pattern = test_root().join(subdir).join("*.yaml");
    let mut files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .unwrap()
        .flatten()
        .collect();
    files.sort();
    files
}

/// Read a sibling fixture: test/<subdir>/<stem>.<ext>.
fn read_companion(path: &Path, subdir: &str, ext: &str) -> Option<String> {
    let stem = path.file_stem().unwrap().to_string_lossy();
    let companion = test_root().join(subdir).join(format!("{}.{}", stem, ext));
    fs::read_to_string(companion).ok()
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().to_string()
}

/// Run a single test/yaml file (expected to succeed).
fn run_yaml_test(path: &Path) -> Result<(), String> {
    let filename = file_name(path);
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", filename, e))?;

    let stream =
        parse(&content).map_err(|e| format!("{}: Unexpected parse error: {}", filename, e))?;
    let actual = to_events(&stream);

    match read_companion(path, "event", "event") {
        Some(expected) => {
            if actual.trim_end() != expected.trim_end() {
                return Err(format!(
                    "{}: Event mismatch\n    expected:\n{}\n    actual:\n{}",
                    filename, expected, actual
                ));
            }
            println!("  {} => {} documents", filename, stream.len());
        }
        None => println!("  {} => parsed (no .event file)", filename),
    }
    Ok(())
}

/// Run a single test/nay file (expected to fail with a specific error).
fn run_nay_test(path: &Path) -> Result<(), String> {
    let filename = file_name(path);
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", filename, e))?;

    match parse_with_filename(&content, Some(&filename)) {
        Ok(stream) => Err(format!(
            "{}: Expected parse error, but got success:\n{}",
            filename,
            to_events(&stream)
        )),
        Err(e) => {
            let actual = e.to_string();
            match read_companion(path, "nay", "error") {
                Some(expected) if actual != expected.trim() => Err(format!(
                    "{}: Error mismatch\n    expected: {}\n    actual:   {}",
                    filename,
                    expected.trim(),
                    actual
                )),
                Some(_) => {
                    println!("  {} => error (as expected)", filename);
                    Ok(())
                }
                None => {
                    println!("  {} => error: {} (no .error file to compare)", filename, actual);
                    Ok(())
                }
            }
        }
    }
}

fn run_all(subdir: &str, run: fn(&Path) -> Result<(), String>) {
    let files = yaml_files(subdir);
    assert!(!files.is_empty(), "no fixtures found in test/{}", subdir);

    println!("\nRunning {} test/{} files:", files.len(), subdir);

    let errors: Vec<String> = files.iter().filter_map(|f| run(f).err()).collect();
    let failed = errors.len();
    println!("\nResults: {} passed, {} failed", files.len() - failed, failed);

    if !errors.is_empty() {
        println!("\nErrors:");
        for error in &errors {
            println!("  - {}", error);
        }
    }

    assert!(failed == 0, "{} test/{} fixtures failed", failed, subdir);
}

#[test]
fn test_all_yaml_fixtures() {
    run_all("yaml", run_yaml_test);
}

#[test]
fn test_all_nay_fixtures() {
    run_all("nay", run_nay_test);
}

#[test]
fn test_every_event_file_has_input() {
    let pattern = test_root().join("event").join("*.event");
    for event in glob::glob(&pattern.to_string_lossy()).unwrap().flatten() {
        let stem = event.file_stem().unwrap().to_string_lossy().to_string();
        let input = test_root().join("yaml").join(format!("{}.yaml", stem));
        assert!(input.exists(), "{} has no input file", event.display());
    }
}
