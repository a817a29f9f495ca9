use std::path::{Component, Path, PathBuf};

/// Resolve `path` to a form suitable for equality checks.
///
/// Existing paths are fully symlink-resolved. For paths that do not exist
/// yet (a clone destination, a directory about to be created) the longest
/// existing ancestor of the lexically cleaned path is resolved and the
/// missing tail appended. Never fails, and resolving a result again gives
/// the same result.
pub fn canonicalize(path: &Path) -> PathBuf {
    let abs = absolute(path);
    match std::fs::canonicalize(&abs) {
        Ok(resolved) => clean(&resolved),
        Err(_) => resolve_existing_prefix(&clean(&abs)),
    }
}

fn resolve_existing_prefix(cleaned: &Path) -> PathBuf {
    let mut tail = Vec::new();
    let mut cur = cleaned;
    loop {
        if let Ok(resolved) = std::fs::canonicalize(cur) {
            let mut out = clean(&resolved);
            out.extend(tail.iter().rev());
            return out;
        }
        match (cur.parent(), cur.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name);
                cur = parent;
            }
            _ => return cleaned.to_path_buf(),
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Lexically drop `.` components and fold `..` into its parent.
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                None | Some(Component::ParentDir) | Some(Component::CurDir) => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Expand a leading `~` to `home` and make the path absolute against `cwd`.
pub fn expand_user(path: &str, home: Option<&Path>, cwd: &Path) -> PathBuf {
    let expanded = match (path.strip_prefix('~'), home) {
        (Some(rest), Some(home)) => home.join(rest.trim_start_matches('/')),
        _ => PathBuf::from(path),
    };
    clean(&cwd.join(expanded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn clean_folds_dots() {
        assert_eq!(clean(Path::new("/a/./b/../c/")), PathBuf::from("/a/c"));
        assert_eq!(clean(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(clean(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn missing_path_is_cleaned_not_resolved() {
        let dir = TempDir::new().unwrap();
        let base = canonicalize(dir.path());
        let p = dir.path().join("not-yet/../clone-target");
        assert_eq!(canonicalize(&p), base.join("clone-target"));
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("real")).unwrap();
        for p in [
            dir.path().join("real"),
            dir.path().join("real/../real/."),
            dir.path().join("missing/child"),
        ] {
            let once = canonicalize(&p);
            assert_eq!(canonicalize(&once), once, "{}", p.display());
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlink_resolves_to_target() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir_all(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        assert_eq!(canonicalize(&link), canonicalize(&real));
    }

    #[cfg(unix)]
    #[test]
    fn missing_component_behind_symlink_is_stable() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir_all(real.join("child")).unwrap();
        std::os::unix::fs::symlink(&real, dir.path().join("link")).unwrap();

        let once = canonicalize(&dir.path().join("link/ghost/../child"));
        assert_eq!(once, canonicalize(&real.join("child")));
        assert_eq!(canonicalize(&once), once);

        let missing = canonicalize(&dir.path().join("link/new/deeper"));
        assert_eq!(missing, canonicalize(&real).join("new/deeper"));
        assert_eq!(canonicalize(&missing), missing);
    }

    #[test]
    fn expand_user_handles_tilde_and_relative() {
        let home = Path::new("/home/dev");
        let cwd = Path::new("/work");
        assert_eq!(
            expand_user("~/projects/x", Some(home), cwd),
            PathBuf::from("/home/dev/projects/x")
        );
        assert_eq!(
            expand_user("./x", Some(home), cwd),
            PathBuf::from("/work/x")
        );
        assert_eq!(expand_user("/abs", None, cwd), PathBuf::from("/abs"));
    }
}
