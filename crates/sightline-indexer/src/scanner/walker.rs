//! File system walker that prunes excluded directories before descending.

use crate::filter::PathFilter;
use ignore::{WalkBuilder, WalkState};
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use tracing::debug;

/// Walks a project root and yields in-scope files.
pub struct Walker {
    filter: Arc<PathFilter>,
    respect_gitignore: bool,
}

impl Walker {
    pub fn new(filter: Arc<PathFilter>, respect_gitignore: bool) -> Self {
        Self {
            filter,
            respect_gitignore,
        }
    }

    /// Walk the tree, never following symlinks, and return matching files
    /// sorted by path.
    pub fn walk(&self) -> Vec<PathBuf> {
        let (tx, rx) = mpsc::channel();

        let prune = self.filter.clone();
        let walker = WalkBuilder::new(self.filter.root())
            .standard_filters(false)
            .follow_links(false)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .parents(self.respect_gitignore)
            .require_git(false)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
                if !is_dir || entry.depth() == 0 {
                    return true;
                }
                entry
                    .file_name()
                    .to_str()
                    .map(|name| !prune.is_excluded_dir_name(name))
                    .unwrap_or(true)
            })
            .build_parallel();

        walker.run(|| {
            let tx = tx.clone();
            let filter = self.filter.clone();
            Box::new(move |result| {
                match result {
                    Ok(entry) => {
                        // Symlinks report their own file type since links are not followed
                        let is_file = entry.file_type().map(|ft| ft.is_file()).unwrap_or(false);
                        if is_file && filter.has_supported_extension(entry.path()) {
                            let _ = tx.send(entry.into_path());
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "Walk error");
                    }
                }
                WalkState::Continue
            })
        });

        // Drop the original sender so the receiver knows when we're done
        drop(tx);

        let mut paths: Vec<PathBuf> = rx.into_iter().collect();
        paths.sort();
        paths
    }
}
