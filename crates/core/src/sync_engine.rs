//! Direction-aware sync director.
//!
//! [`SyncDirector`] turns a requested [`Action`] on a [`SyncEntry`] into zero
//! or more [`CopyRequest`]s and runs them in order through its
//! [`CopyExecutor`]:
//!
//! | Action | Direction        | Copies                                   |
//! |--------|------------------|------------------------------------------|
//! | push   | not repo_to_local (or forced) | local → repo                |
//! | pull   | not local_to_repo (or forced) | repo → local                |
//! | sync   | local_to_repo    | same as push                             |
//! | sync   | repo_to_local    | same as pull                             |
//! | sync   | both, file       | newer side wins, see [`reconcile_file`]  |
//! | sync   | both, dir        | update-only local → repo, then repo → local |
//!
//! Entries are processed strictly one after another and the first failure
//! aborts the batch.

use std::fs::Metadata;

use tracing::{debug, info, instrument};

use crate::copy::{CopyExecutor, CopyRequest};
use crate::errors::SyncError;
use crate::models::{Action, DefaultSource, PathType, SyncDirection, SyncEntry};
use crate::probe;

/// What happened to one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryOutcome {
    pub name: String,
    pub path_type: PathType,
    /// Copies issued, in order. Empty when already in sync.
    pub copies: Vec<CopyRequest>,
}

/// Runs push / pull / sync for entries through a copy executor.
#[derive(Debug)]
pub struct SyncDirector<E> {
    executor: E,
}

impl<E: CopyExecutor> SyncDirector<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Handle every entry in order, stopping at the first error.
    pub async fn run<'a, I>(
        &self,
        action: Action,
        entries: I,
        force: bool,
    ) -> Result<Vec<EntryOutcome>, SyncError>
    where
        I: IntoIterator<Item = &'a SyncEntry>,
    {
        self.run_with(action, entries, force, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_outcome` as soon as each entry
    /// finishes. Entries completed before a failure are still reported.
    pub async fn run_with<'a, I, F>(
        &self,
        action: Action,
        entries: I,
        force: bool,
        mut on_outcome: F,
    ) -> Result<Vec<EntryOutcome>, SyncError>
    where
        I: IntoIterator<Item = &'a SyncEntry>,
        F: FnMut(&EntryOutcome),
    {
        let mut outcomes = Vec::new();
        for entry in entries {
            let outcome = self.run_entry(action, entry, force).await?;
            on_outcome(&outcome);
            outcomes.push(outcome);
        }
        info!(%action, entries = outcomes.len(), "batch complete");
        Ok(outcomes)
    }

    /// Plan and execute `action` for a single entry.
    #[instrument(skip(self, entry), fields(entry = %entry.name))]
    pub async fn run_entry(
        &self,
        action: Action,
        entry: &SyncEntry,
        force: bool,
    ) -> Result<EntryOutcome, SyncError> {
        check_direction(action, entry, force)?;
        let path_type = probe::resolve_path_type(entry).await?;
        let copies = plan(action, entry, path_type).await?;

        for request in &copies {
            info!(
                src = %request.source.display(),
                dest = %request.destination.display(),
                update_only = request.update_only,
                "copying"
            );
            self.executor
                .copy(request)
                .await
                .map_err(|source| SyncError::Copy {
                    entry: entry.name.clone(),
                    source,
                })?;
        }

        Ok(EntryOutcome {
            name: entry.name.clone(),
            path_type,
            copies,
        })
    }
}

/// Refuse an explicit push/pull against the opposite-only direction.
///
/// `sync` is never refused; it follows the configured direction instead.
pub fn check_direction(action: Action, entry: &SyncEntry, force: bool) -> Result<(), SyncError> {
    let blocked = match action {
        Action::Push => entry.sync_direction == SyncDirection::RepoToLocal,
        Action::Pull => entry.sync_direction == SyncDirection::LocalToRepo,
        Action::Sync => false,
    };
    if blocked && !force {
        return Err(SyncError::DirectionNotAllowed {
            entry: entry.name.clone(),
            action: action.to_string(),
            direction: entry.sync_direction.to_string(),
        });
    }
    if blocked {
        debug!(%action, direction = %entry.sync_direction, "direction restriction overridden by force");
    }
    Ok(())
}

/// Decide the copies for `action` without running them.
pub async fn plan(
    action: Action,
    entry: &SyncEntry,
    path_type: PathType,
) -> Result<Vec<CopyRequest>, SyncError> {
    let effective = match (action, entry.sync_direction) {
        (Action::Sync, SyncDirection::LocalToRepo) => Action::Push,
        (Action::Sync, SyncDirection::RepoToLocal) => Action::Pull,
        (other, _) => other,
    };

    let copies = match (effective, path_type) {
        (Action::Push, PathType::Dir) => {
            vec![CopyRequest::dir(&entry.local_path, &entry.repo_path, false)]
        }
        (Action::Push, PathType::File) => {
            vec![CopyRequest::file(&entry.local_path, &entry.repo_path)]
        }
        (Action::Pull, PathType::Dir) => {
            vec![CopyRequest::dir(&entry.repo_path, &entry.local_path, false)]
        }
        (Action::Pull, PathType::File) => {
            vec![CopyRequest::file(&entry.repo_path, &entry.local_path)]
        }
        (Action::Sync, PathType::Dir) => vec![
            CopyRequest::dir(&entry.local_path, &entry.repo_path, true),
            CopyRequest::dir(&entry.repo_path, &entry.local_path, true),
        ],
        (Action::Sync, PathType::File) => {
            let local = probe::metadata(&entry.local_path).await?;
            let repo = probe::metadata(&entry.repo_path).await?;
            reconcile_file(entry, local.as_ref(), repo.as_ref())
                .into_iter()
                .collect()
        }
    };
    Ok(copies)
}

/// Which side of a bidirectional file entry should be copied, if any.
///
/// A missing side is created from the present one. When both exist the one
/// with the strictly later modification time wins; equal times defer to the
/// entry's `default_source`.
pub fn reconcile_file(
    entry: &SyncEntry,
    local: Option<&Metadata>,
    repo: Option<&Metadata>,
) -> Option<CopyRequest> {
    let push = || CopyRequest::file(&entry.local_path, &entry.repo_path);
    let pull = || CopyRequest::file(&entry.repo_path, &entry.local_path);

    match (local, repo) {
        (None, None) => {
            debug!(entry = %entry.name, "neither side exists; nothing to do");
            None
        }
        (Some(_), None) => Some(push()),
        (None, Some(_)) => Some(pull()),
        (Some(local), Some(repo)) => {
            let local_mtime = local.modified().ok();
            let repo_mtime = repo.modified().ok();
            if local_mtime > repo_mtime {
                Some(push())
            } else if repo_mtime > local_mtime {
                Some(pull())
            } else if entry.default_source == DefaultSource::Repo {
                Some(pull())
            } else {
                Some(push())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn entry(direction: SyncDirection) -> SyncEntry {
        SyncEntry {
            name: "shell-rc".into(),
            description: None,
            local_path: PathBuf::from("/home/kit/.zshrc"),
            repo_path: PathBuf::from("/srv/dots/settings/zsh/.zshrc"),
            sync_direction: direction,
            default_source: DefaultSource::Local,
        }
    }

    #[test]
    fn test_push_blocked_for_repo_to_local() {
        let e = entry(SyncDirection::RepoToLocal);
        assert!(matches!(
            check_direction(Action::Push, &e, false),
            Err(SyncError::DirectionNotAllowed { .. })
        ));
        assert!(check_direction(Action::Push, &e, true).is_ok());
        assert!(check_direction(Action::Pull, &e, false).is_ok());
        assert!(check_direction(Action::Sync, &e, false).is_ok());
    }

    #[test]
    fn test_pull_blocked_for_local_to_repo() {
        let e = entry(SyncDirection::LocalToRepo);
        assert!(matches!(
            check_direction(Action::Pull, &e, false),
            Err(SyncError::DirectionNotAllowed { ref action, .. }) if action == "pull"
        ));
        assert!(check_direction(Action::Pull, &e, true).is_ok());
    }

    #[test]
    fn test_both_allows_everything() {
        let e = entry(SyncDirection::Both);
        for action in [Action::Push, Action::Pull, Action::Sync] {
            assert!(check_direction(action, &e, false).is_ok());
        }
    }

    #[tokio::test]
    async fn test_sync_follows_one_way_direction() {
        let e = entry(SyncDirection::LocalToRepo);
        let copies = plan(Action::Sync, &e, PathType::File).await.unwrap();
        assert_eq!(copies, vec![CopyRequest::file(&e.local_path, &e.repo_path)]);

        let e = entry(SyncDirection::RepoToLocal);
        let copies = plan(Action::Sync, &e, PathType::Dir).await.unwrap();
        assert_eq!(copies, vec![CopyRequest::dir(&e.repo_path, &e.local_path, false)]);
    }

    #[tokio::test]
    async fn test_bidirectional_dir_pushes_then_pulls_update_only() {
        let e = entry(SyncDirection::Both);
        let copies = plan(Action::Sync, &e, PathType::Dir).await.unwrap();
        assert_eq!(
            copies,
            vec![
                CopyRequest::dir(&e.local_path, &e.repo_path, true),
                CopyRequest::dir(&e.repo_path, &e.local_path, true),
            ]
        );
    }

    #[test]
    fn test_reconcile_neither_side() {
        assert_eq!(reconcile_file(&entry(SyncDirection::Both), None, None), None);
    }
}
