//! Path helpers

use std::path::PathBuf;

use directories::BaseDirs;

/// Expand `~` and make relative paths absolute against the working directory.
///
/// An empty path resolves to the working directory.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    let home = || BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    let expanded = if path == "~" {
        home().unwrap_or_else(|| PathBuf::from(path))
    } else if let Some(rest) = path.strip_prefix("~/") {
        home()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| PathBuf::from(path))
    } else {
        PathBuf::from(path)
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}

/// Home directory of the current user, if the platform reports one
pub fn home_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path_unchanged() {
        assert_eq!(expand_path("/var/lib/spans"), PathBuf::from("/var/lib/spans"));
    }

    #[test]
    fn test_relative_path_made_absolute() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path("data"), cwd.join("data"));
        assert_eq!(expand_path("  "), cwd);
    }

    #[test]
    fn test_tilde_expansion() {
        if let Some(home) = home_dir() {
            assert_eq!(expand_path("~"), home);
            assert_eq!(expand_path("~/spans"), home.join("spans"));
        }
    }
}
