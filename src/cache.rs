//! On-disk cache of every issue seen so far, keyed by issue number.
//!
//! The file is a self-describing JSON document carrying a format name and a
//! schema version. Entries are only ever inserted or overwritten; nothing is
//! pruned, so the key set grows monotonically across runs.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{GitHubToolsError, Result};
use crate::types::{IssueRecord, Repository};

pub const CACHE_FORMAT: &str = "github-tools/issue-cache";
pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    format: String,
    version: u32,
    repository: String,
    saved_at: DateTime<Utc>,
    issues: Vec<IssueRecord>,
}

/// What has to be requested from the forge to bring the cache up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPlan {
    /// Nothing cached yet: enumerate the whole issue history.
    Full,
    /// Only issues modified after the newest cached modification.
    Since(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Refreshed,
    /// Not newer than the sync point, left alone.
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: usize,
    pub refreshed: usize,
    pub skipped: usize,
}

impl MergeSummary {
    pub fn count(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted => self.inserted += 1,
            MergeOutcome::Refreshed => self.refreshed += 1,
            MergeOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn updated(&self) -> usize {
        self.inserted + self.refreshed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueCache {
    issues: BTreeMap<u64, IssueRecord>,
}

impl IssueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the cache for `repo` from `path`. A missing file yields an empty cache.
    pub fn load(path: &Path, repo: &Repository) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No issue cache at {}", path.display());
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };

        let file: CacheFile = serde_json::from_str(&raw).map_err(|e| {
            GitHubToolsError::CacheError(format!("{} is not a valid cache file: {}", path.display(), e))
        })?;

        if file.format != CACHE_FORMAT {
            return Err(GitHubToolsError::CacheError(format!(
                "{} has format '{}', expected '{}'",
                path.display(),
                file.format,
                CACHE_FORMAT
            )));
        }
        if file.version != CACHE_VERSION {
            return Err(GitHubToolsError::CacheError(format!(
                "{} uses cache version {}, this build reads version {}. Remove the file to rebuild it.",
                path.display(),
                file.version,
                CACHE_VERSION
            )));
        }
        if file.repository != repo.full_name {
            return Err(GitHubToolsError::CacheError(format!(
                "{} holds issues of {}, not {}",
                path.display(),
                file.repository,
                repo.full_name
            )));
        }

        info!(
            "Loaded {} cached issues saved at {}",
            file.issues.len(),
            file.saved_at
        );
        Ok(Self::from_records(file.issues))
    }

    /// Write the cache next to `path` and move it into place.
    pub fn save(&self, path: &Path, repo: &Repository) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = CacheFile {
            format: CACHE_FORMAT.to_string(),
            version: CACHE_VERSION,
            repository: repo.full_name.clone(),
            saved_at: Utc::now(),
            issues: self.issues.values().cloned().collect(),
        };

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&file)?)?;
        fs::rename(&tmp, path)?;
        debug!("Saved {} issues to {}", self.issues.len(), path.display());
        Ok(())
    }

    pub fn from_records(records: impl IntoIterator<Item = IssueRecord>) -> Self {
        let mut cache = Self::new();
        for record in records {
            cache.upsert(record);
        }
        cache
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn get(&self, number: u64) -> Option<&IssueRecord> {
        self.issues.get(&number)
    }

    /// Records in ascending issue number order.
    pub fn records(&self) -> impl Iterator<Item = &IssueRecord> {
        self.issues.values()
    }

    pub fn numbers(&self) -> impl Iterator<Item = u64> + '_ {
        self.issues.keys().copied()
    }

    /// Newest modification time across all cached issues.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.issues.values().map(|issue| issue.updated_at).max()
    }

    pub fn sync_plan(&self) -> SyncPlan {
        match self.last_update() {
            Some(since) => SyncPlan::Since(since),
            None => SyncPlan::Full,
        }
    }

    /// Insert or overwrite the entry for `record.number`. Returns whether the
    /// number was new.
    pub fn upsert(&mut self, record: IssueRecord) -> bool {
        self.issues.insert(record.number, record).is_none()
    }

    /// Apply one record of the forge enumeration made for `plan`.
    ///
    /// With [`SyncPlan::Since`] only records modified strictly after the sync
    /// point are applied, so replaying the same enumeration converges.
    pub fn apply(&mut self, plan: SyncPlan, record: IssueRecord) -> MergeOutcome {
        if let SyncPlan::Since(since) = plan {
            if record.updated_at <= since {
                return MergeOutcome::Skipped;
            }
        }
        if self.upsert(record) {
            MergeOutcome::Inserted
        } else {
            MergeOutcome::Refreshed
        }
    }

    pub fn merge<I>(&mut self, plan: SyncPlan, updates: I) -> MergeSummary
    where
        I: IntoIterator<Item = IssueRecord>,
    {
        let mut summary = MergeSummary::default();
        for record in updates {
            summary.count(self.apply(plan, record));
        }
        summary
    }
}
