use anyhow::{Context, Result};
use markup_view::MarkupConfig;
use std::path::Path;

/// Load `markup.config.json` from `dir` (the working directory when not
/// given) and apply command-line overrides
pub fn load(dir: Option<&Path>, page_size: Option<usize>) -> Result<MarkupConfig> {
    let dir = match dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Cannot get current directory")?,
    };

    let mut config = MarkupConfig::load(&dir)
        .with_context(|| format!("Cannot load config from {}", dir.display()))?;
    if let Some(page_size) = page_size {
        config = config.with_page_size(page_size);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use markup_view::DEFAULT_CONFIG_NAME;

    #[test]
    fn test_override_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_NAME),
            r#"{ "pageSize": 20, "undoDepth": 5 }"#,
        )
        .unwrap();

        let config = load(Some(dir.path()), None).unwrap();
        assert_eq!(config.page_size, 20);
        assert_eq!(config.undo_depth, 5);

        let config = load(Some(dir.path()), Some(3)).unwrap();
        assert_eq!(config.page_size, 3);
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{ pageSize").unwrap();

        let err = load(Some(dir.path()), None).unwrap_err();
        assert!(err.to_string().contains("Cannot load config"));
    }
}
