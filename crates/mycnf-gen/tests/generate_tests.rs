//! End-to-end generation against the shipped template

use mycnf_gen::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn shipped_template() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../etc/templates/my.cnf.tmpl")
}

#[test]
fn test_generate_with_defaults() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("my.cnf");

    let generator = MyCnfGenerator::new("2")
        .with_template(shipped_template())
        .with_output(&output);
    let settings = generator.generate(DEFAULT_MEMORY, DEFAULT_POOL_SIZE).unwrap();
    assert_eq!(settings.sort_buffer_size, 98304);

    let written = MyCnfDocument::load(&output).unwrap();
    assert_eq!(written.get("mysqld", "server-id"), Some("2"));
    assert_eq!(written.get("mysqld", "query_cache_size"), Some("8388608"));
    assert_eq!(written.get("mysqld", "innodb_buffer_pool_size"), Some("134217728"));
    assert_eq!(written.get("mysqld", "sort_buffer_size"), Some("98304"));
    assert_eq!(written.get("mysqld", "join_buffer_size"), Some("98304"));
}

#[test]
fn test_bad_memory_argument_generates_default_budget() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("my.cnf");

    let budget = parse_budget(Some("abc"), Some("1G"));
    MyCnfGenerator::new("3")
        .with_template(shipped_template())
        .with_output(&output)
        .generate(budget.memory, budget.pool_size)
        .unwrap();

    let written = MyCnfDocument::load(&output).unwrap();
    assert_eq!(written.get("mysqld", "innodb_buffer_pool_size"), Some("134217728"));
    assert_eq!(written.get("mysqld", "sort_buffer_size"), Some("98304"));
    assert_eq!(written.get("mysqld", "join_buffer_size"), Some("98304"));
}

#[test]
fn test_generate_keeps_template_shape() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("my.cnf");
    let template = MyCnfDocument::load(shipped_template()).unwrap();

    MyCnfGenerator::new("1")
        .with_template(shipped_template())
        .with_output(&output)
        .generate(2 * GB, 512 * MB)
        .unwrap();
    let written = MyCnfDocument::load(&output).unwrap();

    let template_sections: Vec<_> = template.sections().map(|s| s.name().to_string()).collect();
    let written_sections: Vec<_> = written.sections().map(|s| s.name().to_string()).collect();
    assert_eq!(template_sections, written_sections);

    let managed = [
        "server-id",
        "query_cache_size",
        "innodb_buffer_pool_size",
        "sort_buffer_size",
        "join_buffer_size",
    ];
    for section in template.sections() {
        let other = written.section(section.name()).unwrap();
        let keys: Vec<_> = section.entries().map(|e| e.key.as_str()).collect();
        let written_keys: Vec<_> = other.entries().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, written_keys, "section [{}]", section.name());

        for entry in section.entries() {
            if section.name() == MYSQLD_SECTION && managed.contains(&entry.key.as_str()) {
                continue;
            }
            assert_eq!(other.get(&entry.key), Some(entry), "key {}", entry.key);
        }
    }

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("# memory, derived from the pod budget"));
    assert!(text.contains("\nskip-name-resolve\n"));
    assert!(text.contains("query_cache_size = 33554432\n"));
}

#[test]
fn test_generate_overwrites_existing_file() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("my.cnf");
    std::fs::write(&output, "stale contents that are much longer than nothing\n".repeat(500)).unwrap();

    MyCnfGenerator::new("4")
        .with_template(shipped_template())
        .with_output(&output)
        .generate(GB, 256 * MB)
        .unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(!text.contains("stale contents"));
    assert!(text.contains("server-id = 4\n"));
}

#[test]
fn test_missing_template_is_fatal() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("my.cnf");

    let err = MyCnfGenerator::new("1")
        .with_template(dir.path().join("absent.tmpl"))
        .with_output(&output)
        .generate(DEFAULT_MEMORY, DEFAULT_POOL_SIZE)
        .unwrap_err();

    assert!(matches!(err, MyCnfError::Io { .. }));
    assert!(!output.exists());
}

#[test]
fn test_template_missing_managed_key_leaves_output_untouched() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("my.cnf.tmpl");
    let output = dir.path().join("my.cnf");
    std::fs::write(
        &template,
        "[mysqld]\nserver-id = 0\nquery_cache_size = 0\ninnodb_buffer_pool_size = 0\nsort_buffer_size = 0\n",
    )
    .unwrap();
    std::fs::write(&output, "previous\n").unwrap();

    let err = MyCnfGenerator::new("1")
        .with_template(&template)
        .with_output(&output)
        .generate(DEFAULT_MEMORY, DEFAULT_POOL_SIZE)
        .unwrap_err();

    assert!(matches!(err, MyCnfError::MissingKey { ref key, .. } if key == "join_buffer_size"));
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "previous\n");
}

#[test]
fn test_render_does_not_write() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("my.cnf");

    let (doc, settings) = MyCnfGenerator::new("9")
        .with_template(shipped_template())
        .with_output(&output)
        .render(8 * GB, 4 * GB)
        .unwrap();

    assert_eq!(settings.query_cache_size, QUERY_CACHE_CAP);
    assert_eq!(doc.get("mysqld", "server-id"), Some("9"));
    assert!(!output.exists());
}
