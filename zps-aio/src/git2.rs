/*
File: zps-aio/src/git2.rs
Purpose: Synchronous Git operations using git2.
*/
use std::fs;
use std::path::{Path, PathBuf};

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    BranchType, Cred, FetchOptions, FetchPrune, ObjectType, Oid, RemoteCallbacks, Repository,
    ResetType, StatusOptions, SubmoduleUpdateOptions,
};
use tracing::{debug, info, warn};
use zps_common::error::{Result, ZpsError};
use zps_common::model::RevState;

use crate::fs::remove_path;

/// Commit and checkout state of a working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoHead {
    pub commit: String,
    pub rev_state: RevState,
}

/// Divergence of an attached branch from its upstream, as of the last fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamStatus {
    pub ahead: usize,
    pub behind: usize,
    pub dirty: bool,
    /// `false` when there is no upstream to compare against.
    pub known: bool,
}

/// SSH-agent credentials first, then whatever libgit2 finds by default.
fn fetch_options() -> FetchOptions<'static> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, _allowed| {
        Cred::ssh_key_from_agent(username_from_url.unwrap_or("git")).or_else(|_| Cred::default())
    });
    let mut fo = FetchOptions::new();
    fo.remote_callbacks(callbacks);
    fo
}

/// Where an in-flight clone of `dest` lives until it completes.
pub fn partial_clone_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}.partial"))
}

/// Opens `path` only if it looks like a completed managed clone:
/// an `origin` remote and a `HEAD` that peels to a commit.
pub fn open_managed_repo(path: &Path) -> Option<Repository> {
    let repo = Repository::open(path).ok()?;
    if repo.find_remote("origin").is_err() {
        debug!("{} has no 'origin' remote", path.display());
        return None;
    }
    let head_ok = repo.head().and_then(|h| h.peel_to_commit()).is_ok();
    if !head_ok {
        debug!("{} has no resolvable HEAD", path.display());
        return None;
    }
    Some(repo)
}

/// Clones `url` into a sibling staging directory and renames it into place,
/// so `dest` never holds a half-written clone.
pub fn clone_repo(url: &str, dest: &Path) -> Result<Repository> {
    let partial = partial_clone_path(dest);
    if partial.exists() {
        warn!(
            "Removing leftover partial clone at {} from an interrupted run",
            partial.display()
        );
        remove_path(&partial)?;
    }

    debug!("Cloning {} into {}", url, partial.display());
    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options());
    let cloned = builder.clone(url, &partial);
    match cloned {
        Ok(repo) => drop(repo),
        Err(e) => {
            let _ = remove_path(&partial);
            return Err(e.into());
        }
    }

    fs::rename(&partial, dest)?;
    debug!("Clone of {} complete at {}", url, dest.display());
    Ok(Repository::open(dest)?)
}

/// Fetches all branches and tags from `origin`, force-updating local copies
/// and pruning refs that disappeared upstream.
pub fn fetch_origin(repo: &Repository) -> Result<()> {
    let mut remote = repo.find_remote("origin")?;
    let mut fo = fetch_options();
    fo.prune(FetchPrune::On);
    remote.fetch(
        &[
            "+refs/heads/*:refs/remotes/origin/*",
            "+refs/tags/*:refs/tags/*",
        ],
        Some(&mut fo),
        None,
    )?;
    Ok(())
}

/// Points `origin` at `url` if it was cloned from somewhere else.
fn ensure_origin_url(repo: &Repository, url: &str) -> Result<()> {
    let current = repo.find_remote("origin")?.url().map(str::to_string);
    if current.as_deref() != Some(url) {
        info!(
            "Repointing origin from {} to {}",
            current.as_deref().unwrap_or("<none>"),
            url
        );
        repo.remote_set_url("origin", url)?;
    }
    Ok(())
}

/// Makes `dest` a clean, up-to-date checkout of `url` at `rev`.
///
/// - missing or unusable `dest`: clone (via a staging directory)
/// - existing clone: fetch
/// - `rev` naming a remote branch: attached tracking checkout
/// - `rev` naming a tag or commit: detached checkout
/// - no `rev`: attached checkout of the remote default branch
///
/// Submodules are initialized and updated recursively afterwards.
pub fn ensure_repo(url: &str, dest: &Path, rev: Option<&str>) -> Result<RepoHead> {
    let repo = match open_managed_repo(dest) {
        Some(repo) => {
            ensure_origin_url(&repo, url)?;
            repo
        }
        None => {
            if dest.symlink_metadata().is_ok() {
                warn!(
                    "{} exists but is not a usable clone; re-cloning",
                    dest.display()
                );
                remove_path(dest)?;
            }
            clone_repo(url, dest)?
        }
    };

    debug!("Fetching origin for {}", dest.display());
    fetch_origin(&repo)?;

    match rev {
        Some(r) => checkout_rev(&repo, r)?,
        None => attach_default_branch(&repo)?,
    }
    update_submodules(&repo)?;
    head_state(&repo)
}

fn default_remote_branch(repo: &Repository) -> Result<String> {
    let target = if let Ok(origin_head) = repo.find_reference("refs/remotes/origin/HEAD") {
        origin_head
            .symbolic_target()
            .map(str::to_string)
            .ok_or_else(|| ZpsError::Generic("origin/HEAD has no symbolic target".to_string()))?
    } else if repo.find_reference("refs/remotes/origin/main").is_ok() {
        "refs/remotes/origin/main".to_string()
    } else if repo.find_reference("refs/remotes/origin/master").is_ok() {
        "refs/remotes/origin/master".to_string()
    } else {
        return Err(ZpsError::Generic(
            "could not determine default branch (missing origin/HEAD, origin/main, origin/master)"
                .to_string(),
        ));
    };

    target
        .strip_prefix("refs/remotes/origin/")
        .map(str::to_string)
        .ok_or_else(|| ZpsError::Generic(format!("unexpected remote ref: {target}")))
}

fn attach_default_branch(repo: &Repository) -> Result<()> {
    let branch = default_remote_branch(repo)?;
    debug!("Tracking default branch '{}'", branch);
    attach_tracking_branch(repo, &branch)
}

/// Attaches `HEAD` to local `branch`, creating it with an upstream if needed,
/// and hard-resets it to the fetched `origin/<branch>` tip.
fn attach_tracking_branch(repo: &Repository, branch: &str) -> Result<()> {
    let remote_tip = repo
        .find_reference(&format!("refs/remotes/origin/{branch}"))?
        .peel_to_commit()?;

    if repo.find_branch(branch, BranchType::Local).is_err() {
        let mut created = repo.branch(branch, &remote_tip, false)?;
        created.set_upstream(Some(&format!("origin/{branch}")))?;
    }

    repo.set_head(&format!("refs/heads/{branch}"))?;
    repo.reset(
        remote_tip.as_object(),
        ResetType::Hard,
        Some(CheckoutBuilder::new().force()),
    )?;
    Ok(())
}

fn detach_at(repo: &Repository, commit: &git2::Commit<'_>) -> Result<()> {
    repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
    repo.set_head_detached(commit.id())?;
    Ok(())
}

/// Checks out `rev`, trying in order: remote branch (attached), tag
/// (detached), any commit-ish (detached). A local branch whose remote
/// counterpart is gone is an error rather than a silent stale checkout.
pub fn checkout_rev(repo: &Repository, rev: &str) -> Result<()> {
    if repo
        .find_reference(&format!("refs/remotes/origin/{rev}"))
        .is_ok()
    {
        debug!("'{}' is a remote branch; attaching", rev);
        return attach_tracking_branch(repo, rev);
    }

    if let Ok(tag_obj) = repo.revparse_single(&format!("refs/tags/{rev}")) {
        debug!("'{}' is a tag; detaching", rev);
        let commit = tag_obj
            .peel(ObjectType::Commit)?
            .into_commit()
            .map_err(|_| ZpsError::Generic(format!("tag '{rev}' does not point at a commit")))?;
        return detach_at(repo, &commit);
    }

    if repo.find_reference(&format!("refs/heads/{rev}")).is_ok() {
        return Err(ZpsError::Generic(format!(
            "branch '{rev}' no longer exists on origin"
        )));
    }

    let obj = repo
        .revparse_single(rev)
        .map_err(|e| ZpsError::Generic(format!("rev not found: {rev} ({})", e.message())))?;
    let commit = obj
        .peel(ObjectType::Commit)?
        .into_commit()
        .map_err(|_| ZpsError::Generic(format!("rev '{rev}' does not point at a commit")))?;
    debug!("'{}' resolved to commit {}; detaching", rev, commit.id());
    detach_at(repo, &commit)
}

/// Initializes and updates every submodule, recursing into nested ones.
pub fn update_submodules(repo: &Repository) -> Result<()> {
    for mut sm in repo.submodules()? {
        let name = sm.name().unwrap_or("<unnamed>").to_string();
        debug!("Updating submodule {}", name);
        let mut opts = SubmoduleUpdateOptions::new();
        opts.fetch(fetch_options());
        sm.update(true, Some(&mut opts)).map_err(|e| {
            ZpsError::Generic(format!("submodule '{name}' update failed: {}", e.message()))
        })?;
        let nested = sm.open()?;
        update_submodules(&nested)?;
    }
    Ok(())
}

fn tag_pointing_at(repo: &Repository, commit: Oid) -> Option<String> {
    let names = repo.tag_names(None).ok()?;
    let mut matching: Vec<String> = names
        .iter()
        .flatten()
        .filter(|name| {
            repo.revparse_single(&format!("refs/tags/{name}"))
                .and_then(|o| o.peel_to_commit())
                .is_ok_and(|c| c.id() == commit)
        })
        .map(str::to_string)
        .collect();
    matching.sort();
    matching.into_iter().next()
}

/// Reads the current commit and attached/detached state.
pub fn head_state(repo: &Repository) -> Result<RepoHead> {
    let head = repo.head()?;
    let commit = head.peel_to_commit()?.id();
    let rev_state = if repo.head_detached()? {
        RevState::Detached {
            tag: tag_pointing_at(repo, commit),
        }
    } else {
        RevState::TrackingBranch {
            branch: head.shorthand().unwrap_or("HEAD").to_string(),
        }
    };
    Ok(RepoHead {
        commit: commit.to_string(),
        rev_state,
    })
}

/// Read-only head lookup; `None` when `path` is not a completed clone.
pub fn inspect_repo(path: &Path) -> Result<Option<RepoHead>> {
    match open_managed_repo(path) {
        Some(repo) => head_state(&repo).map(Some),
        None => Ok(None),
    }
}

fn is_dirty(repo: &Repository) -> Result<bool> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(false).include_ignored(false);
    Ok(!repo.statuses(Some(&mut opts))?.is_empty())
}

/// Compares the checked-out branch with its upstream without touching the network.
pub fn upstream_status(path: &Path) -> Result<UpstreamStatus> {
    let repo = Repository::open(path)?;
    let dirty = is_dirty(&repo)?;
    if repo.head_detached()? {
        return Ok(UpstreamStatus {
            dirty,
            ..Default::default()
        });
    }

    let head = repo.head()?;
    let (Some(local), Some(name)) = (head.target(), head.shorthand()) else {
        return Ok(UpstreamStatus {
            dirty,
            ..Default::default()
        });
    };
    let upstream = match repo
        .find_branch(name, BranchType::Local)
        .and_then(|b| b.upstream())
    {
        Ok(upstream) => upstream,
        Err(e) => {
            debug!("No upstream for {} in {}: {}", name, path.display(), e);
            return Ok(UpstreamStatus {
                dirty,
                ..Default::default()
            });
        }
    };
    let Some(remote) = upstream.get().target() else {
        return Ok(UpstreamStatus {
            dirty,
            ..Default::default()
        });
    };

    let (ahead, behind) = repo.graph_ahead_behind(local, remote)?;
    Ok(UpstreamStatus {
        ahead,
        behind,
        dirty,
        known: true,
    })
}
