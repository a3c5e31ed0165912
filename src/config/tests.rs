use super::*;
use tempfile::NamedTempFile;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.embedding.model_name, "all-MiniLM-L6-v2");
    assert_eq!(config.embedding.batch_size, 32);
    assert_eq!(config.chunking.chunk_size, 1000);
    assert_eq!(config.chunking.chunk_overlap, 100);
    assert_eq!(config.corpus.default_category, "general");
    assert_eq!(config.vector_db.table_name, "knowledge_chunks");
    assert!(config.sync.disabled_formats.is_empty());
    assert!(config.sync.concurrency >= 1);
}

#[test]
fn test_validate_valid_config() {
    let config = Config::default();
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_overlap_not_smaller_than_size() {
    let mut config = Config::default();
    config.chunking.chunk_size = 100;
    config.chunking.chunk_overlap = 100;
    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        SyncError::Config(ConfigError::InvalidValue { ref key, .. }) if key == "chunking.chunk_overlap"
    ));
}

#[test]
fn test_validate_zero_chunk_size() {
    let mut config = Config::default();
    config.chunking.chunk_size = 0;
    config.chunking.chunk_overlap = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_invalid_batch_size() {
    let mut config = Config::default();
    config.embedding.batch_size = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_zero_concurrency() {
    let mut config = Config::default();
    config.sync.concurrency = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_bad_glob() {
    let mut config = Config::default();
    config.corpus.exclude_patterns.push("[unclosed".to_string());
    assert!(config.validate().is_err());
}

#[test]
fn test_serialized_config_round_trips() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    let mut config = Config::default();
    config.embedding.batch_size = 64;
    config.chunking.chunk_size = 500;
    config.chunking.chunk_overlap = 50;
    config.sync.disabled_formats = vec![Format::PageDoc];

    std::fs::write(path, toml::to_string_pretty(&config).unwrap()).unwrap();
    let loaded = Config::from_file(path).unwrap();

    assert_eq!(loaded.embedding.batch_size, 64);
    assert_eq!(loaded.chunking.chunk_size, 500);
    assert_eq!(loaded.chunking.chunk_overlap, 50);
    assert_eq!(loaded.sync.disabled_formats, vec![Format::PageDoc]);
}

#[test]
fn test_load_nonexistent_file() {
    let result = Config::from_file(Path::new("/nonexistent/config.toml"));
    assert!(matches!(
        result,
        Err(SyncError::Config(ConfigError::FileNotFound(_)))
    ));
}

#[test]
fn test_partial_file_uses_defaults() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(
        temp_file.path(),
        "[corpus]\nroot = \"/srv/knowledge\"\n\n[sync]\ndisabled_formats = [\"docx\", \"html\"]\n",
    )
    .unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.corpus.root, PathBuf::from("/srv/knowledge"));
    assert_eq!(config.corpus.default_category, "general");
    assert_eq!(config.chunking.chunk_size, 1000);
    assert_eq!(
        config.sync.disabled_formats,
        vec![Format::FlowDoc, Format::Html]
    );
}

#[test]
fn test_invalid_toml() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), "[chunking\nchunk_size = ").unwrap();

    let result = Config::from_file(temp_file.path());
    assert!(matches!(
        result,
        Err(SyncError::Config(ConfigError::ParseFailed(_)))
    ));
}

#[test]
fn test_invalid_values_in_file_rejected() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(
        temp_file.path(),
        "[chunking]\nchunk_size = 200\nchunk_overlap = 300\n",
    )
    .unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}
