use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::git::CloneProtocol;
use crate::paths::default_config_file;
use crate::sync::MirrorOptions;

pub const DEFAULT_HOST: &str = "https://gitlab.com";
pub const DEFAULT_DEST_DIR: &str = "./repos";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Options shared by `glmirror sync` and `glmirror plan`.
///
/// Every option may also come from the config file; ID lists from both
/// places are concatenated, scalar options on the command line win.
#[derive(Debug, Clone, Default, Args)]
pub struct MirrorArgs {
    /// Directory repositories are mirrored into [default: ./repos]
    #[arg(long, value_name = "DIR")]
    pub dest_dir: Option<PathBuf>,

    /// Group IDs to skip, together with everything below them
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub ignore_group_ids: Vec<u64>,

    /// Project IDs to skip
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub ignore_project_ids: Vec<u64>,

    /// GitLab base URL [env: GITLAB_HOST] [default: https://gitlab.com]
    #[arg(long, value_name = "URL")]
    pub gitlab_host: Option<String>,

    /// Personal access token [env: GITLAB_TOKEN]
    #[arg(long, value_name = "TOKEN")]
    pub gitlab_token: Option<String>,

    /// Group IDs to mirror recursively
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub group_ids: Vec<u64>,

    /// Project IDs to mirror at the top of the destination
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub project_ids: Vec<u64>,

    /// Show clone/fetch progress for every repository (`--progress=false`
    /// overrides the config file)
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub progress: Option<bool>,

    /// Visit each group and project at most once per run (`--dedupe=false`
    /// overrides the config file)
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub dedupe: Option<bool>,

    /// Clone over SSH (agent auth) or HTTPS (token auth)
    #[arg(long, value_enum, value_name = "PROTOCOL")]
    pub clone_protocol: Option<CloneProtocol>,

    /// Timeout for a single API request, in seconds [default: 60]
    #[arg(long, value_name = "SECS")]
    pub http_timeout: Option<u64>,

    /// Config file [default: $XDG_CONFIG_HOME/glmirror/config.toml]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Contents of `config.toml`. All keys are optional.
///
/// Example TOML:
/// ```toml
/// gitlab_host = "https://gitlab.example.com"
/// dest_dir = "/srv/mirror"
/// group_ids = [10, 42]
/// ignore_project_ids = [5]
/// clone_protocol = "ssh"
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub dest_dir: Option<PathBuf>,
    pub gitlab_host: Option<String>,
    pub gitlab_token: Option<String>,
    pub group_ids: Vec<u64>,
    pub project_ids: Vec<u64>,
    pub ignore_group_ids: Vec<u64>,
    pub ignore_project_ids: Vec<u64>,
    pub progress: Option<bool>,
    pub dedupe: Option<bool>,
    pub clone_protocol: Option<CloneProtocol>,
    pub http_timeout: Option<u64>,
}

/// Load the config file.
///
/// An explicitly given path must exist. Without one, the default location is
/// used if present and an empty config otherwise.
///
/// # Errors
/// - Returns an error if an explicit config file cannot be read.
/// - Returns an error if parsing the TOML fails.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let p = default_config_file();
            if !p.is_file() {
                return Ok(FileConfig::default());
            }
            p
        }
    };
    let txt = fs::read_to_string(&path)
        .with_context(|| format!("config not found: {}", path.display()))?;
    let cfg: FileConfig = toml::from_str(&txt)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(cfg)
}

/// Fully resolved settings of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub dest_dir: PathBuf,
    pub host: String,
    pub token: String,
    pub group_ids: Vec<u64>,
    pub project_ids: Vec<u64>,
    pub ignore_group_ids: HashSet<u64>,
    pub ignore_project_ids: HashSet<u64>,
    pub progress: bool,
    pub dedupe: bool,
    pub protocol: CloneProtocol,
    pub http_timeout: Duration,
}

impl Settings {
    /// Merge command line, environment, config file and defaults, in that
    /// order of precedence.
    ///
    /// `env` looks up environment variables; it is a parameter so callers
    /// can pass `std::env::var(..).ok()` or a fixed map.
    ///
    /// # Errors
    /// Returns an error if no group or project IDs were given at all.
    pub fn resolve(
        args: &MirrorArgs,
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let host = non_empty(args.gitlab_host.clone())
            .or_else(|| non_empty(env("GITLAB_HOST")))
            .or_else(|| non_empty(file.gitlab_host))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let token = non_empty(args.gitlab_token.clone())
            .or_else(|| non_empty(env("GITLAB_TOKEN")))
            .or_else(|| non_empty(file.gitlab_token))
            .unwrap_or_default();

        let concat = |a: Vec<u64>, b: &[u64]| -> Vec<u64> {
            a.into_iter().chain(b.iter().copied()).collect()
        };
        let group_ids = concat(file.group_ids, &args.group_ids);
        let project_ids = concat(file.project_ids, &args.project_ids);
        if group_ids.is_empty() && project_ids.is_empty() {
            bail!("nothing to mirror: pass --group-ids and/or --project-ids");
        }

        let timeout = args
            .http_timeout
            .or(file.http_timeout)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        if timeout == 0 {
            bail!("--http-timeout must be at least 1 second");
        }

        Ok(Self {
            dest_dir: args
                .dest_dir
                .clone()
                .or(file.dest_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DEST_DIR)),
            host,
            token,
            group_ids,
            project_ids,
            ignore_group_ids: concat(file.ignore_group_ids, &args.ignore_group_ids)
                .into_iter()
                .collect(),
            ignore_project_ids: concat(file.ignore_project_ids, &args.ignore_project_ids)
                .into_iter()
                .collect(),
            progress: args.progress.or(file.progress).unwrap_or(false),
            dedupe: args.dedupe.or(file.dedupe).unwrap_or(false),
            protocol: args.clone_protocol.or(file.clone_protocol).unwrap_or_default(),
            http_timeout: Duration::from_secs(timeout),
        })
    }

    /// Options for the walker.
    pub fn mirror_options(&self) -> MirrorOptions {
        MirrorOptions {
            dest_root: self.dest_dir.clone(),
            exclude_groups: self.ignore_group_ids.clone(),
            exclude_projects: self.ignore_project_ids.clone(),
            protocol: self.protocol,
            dedupe: self.dedupe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn args_with_group(id: u64) -> MirrorArgs {
        MirrorArgs {
            group_ids: vec![id],
            ..MirrorArgs::default()
        }
    }

    #[test]
    fn defaults_apply_when_nothing_set() {
        let s = Settings::resolve(&args_with_group(1), FileConfig::default(), no_env).unwrap();
        assert_eq!(s.host, DEFAULT_HOST);
        assert_eq!(s.dest_dir, PathBuf::from("./repos"));
        assert_eq!(s.token, "");
        assert_eq!(s.protocol, CloneProtocol::Ssh);
        assert_eq!(s.http_timeout, Duration::from_secs(60));
        assert!(!s.progress);
        assert!(!s.dedupe);
    }

    #[test]
    fn cli_switch_overrides_file_in_both_directions() {
        let file = FileConfig {
            progress: Some(true),
            dedupe: Some(false),
            ..FileConfig::default()
        };
        let s = Settings::resolve(&args_with_group(1), file.clone(), no_env).unwrap();
        assert!(s.progress);
        assert!(!s.dedupe);

        let mut args = args_with_group(1);
        args.progress = Some(false);
        args.dedupe = Some(true);
        let s = Settings::resolve(&args, file, no_env).unwrap();
        assert!(!s.progress);
        assert!(s.dedupe);
    }

    #[test]
    fn switches_parse_bare_and_with_value() {
        use clap::Parser;

        #[derive(Parser)]
        struct Cli {
            #[command(flatten)]
            args: MirrorArgs,
        }

        let cli = Cli::try_parse_from(["glmirror", "--progress", "--dedupe=false"]).unwrap();
        assert_eq!(cli.args.progress, Some(true));
        assert_eq!(cli.args.dedupe, Some(false));

        let cli = Cli::try_parse_from(["glmirror", "--group-ids", "1"]).unwrap();
        assert_eq!(cli.args.progress, None);
        assert_eq!(cli.args.dedupe, None);
    }

    #[test]
    fn requires_some_root() {
        let err = Settings::resolve(&MirrorArgs::default(), FileConfig::default(), no_env)
            .unwrap_err();
        assert!(err.to_string().contains("nothing to mirror"));
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let file = FileConfig {
            gitlab_host: Some("https://file.example".into()),
            gitlab_token: Some("file-token".into()),
            ..FileConfig::default()
        };
        let env: HashMap<&str, &str> =
            HashMap::from([("GITLAB_HOST", "https://env.example"), ("GITLAB_TOKEN", "env-token")]);
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());

        let s = Settings::resolve(&args_with_group(1), file.clone(), lookup).unwrap();
        assert_eq!(s.host, "https://env.example");
        assert_eq!(s.token, "env-token");

        let mut args = args_with_group(1);
        args.gitlab_host = Some("https://cli.example".into());
        args.gitlab_token = Some("cli-token".into());
        let s = Settings::resolve(&args, file.clone(), lookup).unwrap();
        assert_eq!(s.host, "https://cli.example");
        assert_eq!(s.token, "cli-token");

        let s = Settings::resolve(&args_with_group(1), file, no_env).unwrap();
        assert_eq!(s.host, "https://file.example");
        assert_eq!(s.token, "file-token");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let s = Settings::resolve(&args_with_group(1), FileConfig::default(), |_| {
            Some("  ".to_string())
        })
        .unwrap();
        assert_eq!(s.host, DEFAULT_HOST);
        assert!(s.token.is_empty());
    }

    #[test]
    fn id_lists_are_concatenated() {
        let file = FileConfig {
            group_ids: vec![1, 2],
            ignore_project_ids: vec![5],
            ..FileConfig::default()
        };
        let args = MirrorArgs {
            group_ids: vec![3],
            ignore_project_ids: vec![6],
            ..MirrorArgs::default()
        };
        let s = Settings::resolve(&args, file, no_env).unwrap();
        assert_eq!(s.group_ids, vec![1, 2, 3]);
        assert_eq!(s.ignore_project_ids, HashSet::from([5, 6]));

        let opts = s.mirror_options();
        assert!(opts.exclude_projects.contains(&6));
        assert_eq!(opts.dest_root, PathBuf::from("./repos"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut args = args_with_group(1);
        args.http_timeout = Some(0);
        assert!(Settings::resolve(&args, FileConfig::default(), no_env).is_err());
    }

    #[test]
    fn load_file_config_parses_toml() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.toml");
        fs::write(
            &p,
            r#"
gitlab_host = "https://gitlab.example.com"
dest_dir = "/srv/mirror"
group_ids = [10, 42]
ignore_group_ids = [7]
progress = true
clone_protocol = "https"
"#,
        )
        .unwrap();

        let cfg = load_file_config(Some(&p)).unwrap();
        assert_eq!(cfg.gitlab_host.as_deref(), Some("https://gitlab.example.com"));
        assert_eq!(cfg.group_ids, vec![10, 42]);
        assert_eq!(cfg.ignore_group_ids, vec![7]);
        assert_eq!(cfg.progress, Some(true));
        assert_eq!(cfg.clone_protocol, Some(CloneProtocol::Https));
    }

    #[test]
    fn load_file_config_rejects_unknown_keys() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.toml");
        fs::write(&p, "group_id = [1]\n").unwrap();
        assert!(load_file_config(Some(&p)).is_err());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let td = tempdir().unwrap();
        let err = load_file_config(Some(&td.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("config not found"));
    }
}
