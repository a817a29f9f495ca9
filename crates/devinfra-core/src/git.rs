use crate::error::{DevinfraError, Result};
use crate::process::{OutputMode, ToolCommand, ToolRunner};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Upper bound on a clone, applied even when the caller sets no deadline.
pub const CLONE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const GIT_PREFIXES: &[&str] = &["git@", "git://", "https://", "http://", "ssh://"];

/// Schemes that look like URLs but are refused outright.
const REFUSED_PREFIXES: &[&str] = &["ext::", "file://"];

/// What the argument to `add` points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    GitUrl(String),
    LocalPath(String),
}

pub fn classify_input(arg: &str) -> ImportSource {
    if GIT_PREFIXES
        .iter()
        .chain(REFUSED_PREFIXES)
        .any(|p| arg.starts_with(p))
    {
        ImportSource::GitUrl(arg.to_string())
    } else {
        ImportSource::LocalPath(arg.to_string())
    }
}

/// Reject transports that can run arbitrary commands or smuggle flags.
pub fn validate_git_url(url: &str) -> Result<()> {
    let invalid = |reason: &str| DevinfraError::InvalidGitUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };
    if url.starts_with("ext::") {
        return Err(invalid("the ext:: transport is not allowed"));
    }
    if url.starts_with("file://") {
        return Err(invalid("file:// URLs are not supported; pass a local path instead"));
    }
    if url.starts_with("ssh://-") {
        return Err(invalid("ssh host may not start with '-'"));
    }
    if !GIT_PREFIXES.iter().any(|p| url.starts_with(p)) {
        return Err(invalid("expected git@, git://, ssh://, http:// or https://"));
    }
    Ok(())
}

/// `https://github.com/user/MyApp.git` -> `myapp`
pub fn repo_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let tail = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    tail.trim_end_matches(".git").to_lowercase()
}

/// Fetches a repository into a local directory.
pub trait RepoCloner: Send + Sync {
    fn clone_repo(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// [`RepoCloner`] backed by the `git` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli {
    runner: ToolRunner,
}

impl RepoCloner for GitCli {
    async fn clone_repo(&self, url: &str, dest: &Path, cancel: &CancellationToken) -> Result<()> {
        validate_git_url(url)?;
        info!(url, dest = %dest.display(), "cloning");
        let cmd = ToolCommand::new("git")
            .args(["clone", "--", url])
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .timeout(CLONE_TIMEOUT);
        self.runner.run(&cmd, OutputMode::Progress, cancel).await?;
        Ok(())
    }
}
