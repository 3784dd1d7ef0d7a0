use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

/// Resolve the server home directory.
///
/// `None` maps to `<platform home>/<default_subdir>`; a leading `~` is expanded
/// against the platform home; relative paths are made absolute against the cwd.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf> {
    let resolved = match configured {
        None => platform_home()?.join(default_subdir),
        Some(raw) => expand_tilde(raw.trim())?,
    };

    let resolved = if resolved.is_relative() {
        std::env::current_dir()
            .context("cannot determine current directory")?
            .join(resolved)
    } else {
        resolved
    };

    if create {
        std::fs::create_dir_all(&resolved)
            .with_context(|| format!("cannot create home_dir {}", resolved.display()))?;
    }
    Ok(resolved)
}

fn platform_home() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| anyhow!("platform home directory is not available"))
}

fn expand_tilde(raw: &str) -> Result<PathBuf> {
    if raw == "~" {
        return platform_home();
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        return Ok(platform_home()?.join(rest));
    }
    Ok(PathBuf::from(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn absolute_path_is_kept_and_created() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("nested/home");
        let resolved =
            resolve_home_dir(Some(target.to_string_lossy().to_string()), ".x", true).unwrap();
        assert_eq!(resolved, target);
        assert!(target.is_dir());
    }

    #[test]
    fn tilde_is_expanded() {
        let resolved = resolve_home_dir(Some("~/.kanban-test".into()), ".x", false).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with(".kanban-test"));
    }

    #[test]
    fn none_uses_default_subdir() {
        let resolved = resolve_home_dir(None, ".kanban-default", false).unwrap();
        assert!(resolved.ends_with(".kanban-default"));
    }
}
