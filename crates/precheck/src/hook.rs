//! Git pre-commit hook installation

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const HOOK_SCRIPT: &str = "#!/bin/sh\n\
# Installed by precheck. Runs the pre-commit checks; a non-zero exit aborts the commit.\n\
exec precheck\n";

/// Resolve the git directory, following `.git` files used by worktrees
pub fn git_dir(project: &Path) -> Result<PathBuf> {
    let dot_git = project.join(".git");

    if dot_git.is_dir() {
        return Ok(dot_git);
    }

    if dot_git.is_file() {
        let content = fs::read_to_string(&dot_git)
            .with_context(|| format!("Failed to read {}", dot_git.display()))?;
        let target = content
            .lines()
            .find_map(|l| l.strip_prefix("gitdir:"))
            .map(str::trim)
            .with_context(|| format!("No gitdir line in {}", dot_git.display()))?;
        return Ok(project.join(target));
    }

    anyhow::bail!("Not a git repository: {}", project.display())
}

/// Directory git runs hooks from
///
/// Linked worktrees have a private gitdir whose `commondir` file points back
/// at the shared repository; hooks are only read from the shared one.
pub fn hooks_dir(project: &Path) -> Result<PathBuf> {
    let git_dir = git_dir(project)?;
    let commondir = git_dir.join("commondir");

    let common = if commondir.is_file() {
        let content = fs::read_to_string(&commondir)
            .with_context(|| format!("Failed to read {}", commondir.display()))?;
        git_dir.join(content.trim())
    } else {
        git_dir
    };

    Ok(common.join("hooks"))
}

/// Write the pre-commit hook into the repository's hooks directory
pub fn install_hook(project: &Path, force: bool) -> Result<PathBuf> {
    let hooks = hooks_dir(project)?;
    let hook = hooks.join("pre-commit");

    if hook.exists() && !force {
        anyhow::bail!(
            "Hook already exists: {} (use --force to replace it)",
            hook.display()
        );
    }

    fs::create_dir_all(&hooks).context("Failed to create hooks directory")?;
    fs::write(&hook, HOOK_SCRIPT).context("Failed to write hook")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&hook, fs::Permissions::from_mode(0o755))
            .context("Failed to make hook executable")?;
    }

    Ok(hook)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::tempdir;

    #[test]
    fn test_install_into_repo() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let hook = install_hook(dir.path(), false).unwrap();
        assert_eq!(hook, dir.path().join(".git/hooks/pre-commit"));
        assert!(fs::read_to_string(&hook).unwrap().contains("exec precheck"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&hook).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn test_refuses_overwrite_without_force() {
        let dir = tempdir().unwrap();
        let hooks = dir.path().join(".git/hooks");
        fs::create_dir_all(&hooks).unwrap();
        fs::write(hooks.join("pre-commit"), "#!/bin/sh\nexit 0\n").unwrap();

        assert!(install_hook(dir.path(), false).is_err());
        assert_eq!(
            fs::read_to_string(hooks.join("pre-commit")).unwrap(),
            "#!/bin/sh\nexit 0\n"
        );

        install_hook(dir.path(), true).unwrap();
        assert_eq!(
            fs::read_to_string(hooks.join("pre-commit")).unwrap(),
            HOOK_SCRIPT
        );
    }

    #[test]
    fn test_worktree_gitdir_file() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("real-git");
        fs::create_dir(&real).unwrap();
        fs::write(dir.path().join(".git"), "gitdir: real-git\n").unwrap();

        assert_eq!(git_dir(dir.path()).unwrap(), dir.path().join("real-git"));
    }

    #[test]
    fn test_worktree_installs_into_common_dir() {
        let dir = tempdir().unwrap();
        let main_git = dir.path().join("main/.git");
        let private = main_git.join("worktrees/wt");
        let worktree = dir.path().join("wt");
        fs::create_dir_all(&private).unwrap();
        fs::create_dir_all(&worktree).unwrap();
        fs::write(private.join("commondir"), "../..\n").unwrap();
        fs::write(
            worktree.join(".git"),
            format!("gitdir: {}\n", private.display()),
        )
        .unwrap();

        let hook = install_hook(&worktree, false).unwrap();
        assert_eq!(
            hook.canonicalize().unwrap(),
            main_git.join("hooks/pre-commit").canonicalize().unwrap()
        );
        assert!(!private.join("hooks").exists());
    }

    fn git(dir: &Path, args: &[&str]) -> std::process::Output {
        Command::new("git")
            .args(["-c", "user.name=precheck", "-c", "user.email=precheck@localhost"])
            .args(args)
            .current_dir(dir)
            .env("GIT_CONFIG_GLOBAL", "/dev/null")
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .output()
            .unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_hook_runs_on_commit_in_worktree() {
        if Command::new("git").arg("--version").output().is_err() {
            return;
        }

        let dir = tempdir().unwrap();
        let main = dir.path().join("main");
        fs::create_dir(&main).unwrap();
        assert!(git(&main, &["init", "-q"]).status.success());
        assert!(git(&main, &["commit", "-q", "--allow-empty", "-m", "init"])
            .status
            .success());
        assert!(git(&main, &["worktree", "add", "-q", "../wt"]).status.success());

        let worktree = dir.path().join("wt");
        let hook = install_hook(&worktree, false).unwrap();
        fs::write(&hook, "#!/bin/sh\nexit 1\n").unwrap();

        let commit = git(&worktree, &["commit", "-q", "--allow-empty", "-m", "blocked"]);
        assert!(!commit.status.success(), "commit bypassed the pre-commit hook");
    }

    #[test]
    fn test_not_a_repo() {
        let dir = tempdir().unwrap();
        assert!(install_hook(dir.path(), false).is_err());
    }
}
