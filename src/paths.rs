use std::{
    env,
    path::{Path, PathBuf},
};

/// Directory holding the glmirror config file.
///
/// `$XDG_CONFIG_HOME/glmirror`, falling back to `~/.config/glmirror`.
pub fn config_home() -> PathBuf {
    let xdg = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty());
    let base = xdg
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env::var_os("HOME").unwrap_or_default()).join(".config"));
    base.join("glmirror")
}

/// Default location of `config.toml`.
pub fn default_config_file() -> PathBuf {
    config_home().join("config.toml")
}

/// Compute `root / namespace / leaf` for a repository.
///
/// `namespace` is GitLab's slash separated full path. Segments are joined one
/// by one and empty, `.` and `..` segments are dropped, so the result always
/// stays below `root`.
pub fn destination_for(root: &Path, namespace: &str, leaf: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for seg in namespace.split('/').chain(leaf.split('/')) {
        match seg {
            "" | "." | ".." => continue,
            s => out.push(s),
        }
    }
    out
}
