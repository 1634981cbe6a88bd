//! Git ref classification and remote ref resolution.
//!
//! greater never clones. Content is fetched file by file at a ref, and git is only
//! needed to turn a floating ref (a branch such as `main`) into the commit it
//! currently points at, so that cached content is always keyed by something
//! immutable. That lookup uses `git ls-remote` through
//! [`command_builder::GitCommand`].
//!
//! A ref is immutable when it is one of:
//! - a full 40-character commit SHA
//! - a semver tag (`v1.2.3`, `1.2.3`, `v2.0.0-beta.1`)
//! - a package tag (`greater-v1.2.3`, `@scope/pkg@1.2.3`, `pkg@1.2.3`)
//!
//! Everything else is floating and must be resolved before touching the cache.

pub mod command_builder;

use anyhow::Result;

use crate::constants::GIT_LS_REMOTE_TIMEOUT;
use crate::core::GreaterError;
use command_builder::GitCommand;

/// Whether `value` is a full hexadecimal commit SHA.
#[must_use]
pub fn is_commit_sha(value: &str) -> bool {
    value.len() == 40 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn is_semver_tag(value: &str) -> bool {
    let version = value.strip_prefix('v').or_else(|| value.strip_prefix('V')).unwrap_or(value);
    semver::Version::parse(version).is_ok()
}

/// Whether `git_ref` names content that can never change, so it is safe to cache forever.
#[must_use]
pub fn is_immutable_ref(git_ref: &str) -> bool {
    if is_commit_sha(git_ref) || is_semver_tag(git_ref) {
        return true;
    }

    // pkg@1.2.3 and @scope/pkg@1.2.3
    if let Some((name, version)) = git_ref.rsplit_once('@')
        && !name.is_empty()
        && name != "@"
        && semver::Version::parse(version).is_ok()
    {
        return true;
    }

    // greater-v1.2.3
    if let Some((name, version)) = git_ref.rsplit_once("-v")
        && !name.is_empty()
        && semver::Version::parse(version).is_ok()
    {
        return true;
    }

    false
}

/// Pick the commit for `git_ref` out of `git ls-remote` output.
///
/// Preference order: branch head, peeled annotated tag (`^{}`), lightweight tag,
/// then an exact ref-name match (for `HEAD` or fully qualified refs).
#[must_use]
pub fn parse_ls_remote_output(output: &str, git_ref: &str) -> Option<String> {
    let entries: Vec<(&str, &str)> = output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            Some((parts.next()?, parts.next()?))
        })
        .filter(|(sha, _)| is_commit_sha(sha))
        .collect();

    let candidates = [
        format!("refs/heads/{git_ref}"),
        format!("refs/tags/{git_ref}^{{}}"),
        format!("refs/tags/{git_ref}"),
        git_ref.to_string(),
    ];

    candidates.iter().find_map(|wanted| {
        entries.iter().find(|(_, name)| name == wanted).map(|(sha, _)| sha.to_ascii_lowercase())
    })
}

/// Resolve a floating ref on `repository` to its current commit SHA.
///
/// Fails with [`GreaterError::GitCommandError`] when the ref does not exist and with
/// [`GreaterError::GitNotFound`] when git is not installed.
pub async fn resolve_remote_ref(repository: &str, git_ref: &str) -> Result<String> {
    let output = GitCommand::ls_remote(repository, git_ref)
        .with_timeout(Some(GIT_LS_REMOTE_TIMEOUT))
        .with_context(format!("resolve {git_ref}"))
        .execute_stdout()
        .await?;

    let sha =
        parse_ls_remote_output(&output, git_ref).ok_or_else(|| GreaterError::GitCommandError {
            operation: "ls-remote".to_string(),
            stderr: format!("ref '{git_ref}' not found in {repository}"),
        })?;

    tracing::debug!(target: "git", "Resolved {} to {}", git_ref, sha);
    Ok(sha)
}

/// Installed git version string, `None` when git is unavailable.
pub async fn git_version() -> Option<String> {
    GitCommand::version()
        .with_timeout(Some(std::time::Duration::from_secs(10)))
        .execute_stdout()
        .await
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA_A: &str = "1111111111111111111111111111111111111111";
    const SHA_B: &str = "2222222222222222222222222222222222222222";
    const SHA_C: &str = "3333333333333333333333333333333333333333";

    #[test]
    fn test_is_commit_sha() {
        assert!(is_commit_sha("a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2"));
        assert!(is_commit_sha("A1B2C3D4E5F6A1B2C3D4E5F6A1B2C3D4E5F6A1B2"));
        assert!(!is_commit_sha("a1b2c3d"));
        assert!(!is_commit_sha("g1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2"));
    }

    #[test]
    fn test_immutable_refs() {
        for r in [
            SHA_A,
            "v1.2.3",
            "1.2.3",
            "v2.0.0-beta.1",
            "greater-v1.2.3",
            "@equaltoai/greater-components@0.3.1",
            "greater-components@1.0.0",
        ] {
            assert!(is_immutable_ref(r), "{r} should be immutable");
        }
    }

    #[test]
    fn test_floating_refs() {
        for r in
            ["main", "develop", "feature/new-button", "v1", "v1.2", "latest", "@1.2.3", "-v1.2.3"]
        {
            assert!(!is_immutable_ref(r), "{r} should be floating");
        }
    }

    #[test]
    fn test_parse_ls_remote_output() {
        let output = format!(
            "{SHA_A}\trefs/heads/main\n{SHA_B}\trefs/tags/v1.0.0\n{SHA_C}\trefs/tags/v1.0.0^{{}}\n"
        );
        assert_eq!(parse_ls_remote_output(&output, "main").as_deref(), Some(SHA_A));
        // Annotated tags resolve to the peeled commit
        assert_eq!(parse_ls_remote_output(&output, "v1.0.0").as_deref(), Some(SHA_C));
        assert_eq!(parse_ls_remote_output(&output, "missing"), None);
        assert_eq!(parse_ls_remote_output("", "main"), None);
    }

    #[tokio::test]
    async fn test_resolve_remote_ref_against_local_repo() {
        if !crate::utils::platform::command_exists(crate::utils::platform::get_git_command()) {
            return;
        }
        let temp = tempfile::tempdir().unwrap();
        let repo = temp.path();
        GitCommand::init().current_dir(repo).execute().await.unwrap();
        std::fs::write(repo.join("README.md"), "# registry").unwrap();
        GitCommand::add(".").current_dir(repo).execute().await.unwrap();
        GitCommand::commit("initial").current_dir(repo).execute().await.unwrap();
        let head = GitCommand::rev_parse("HEAD").current_dir(repo).execute_stdout().await.unwrap();

        let url = repo.display().to_string();
        assert_eq!(resolve_remote_ref(&url, "HEAD").await.unwrap(), head);

        let err = resolve_remote_ref(&url, "no-such-branch").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GreaterError>(),
            Some(GreaterError::GitCommandError { .. })
        ));
    }
}
