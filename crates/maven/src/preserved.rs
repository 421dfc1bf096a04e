//! Pruning of old timestamped snapshot builds.
//!
//! Maven finishes a snapshot deploy by republishing the version directory's
//! `maven-metadata.xml`. That makes the metadata deploy a reliable signal
//! that a new build is complete and older ones may be removed.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use quarry_core::{Location, METADATA_FILE};
use quarry_storage::{FileDetails, StorageError};

use crate::api::DeployEvent;
use crate::repository::Repository;

/// Event handler that keeps only the newest N builds per snapshot version
/// directory. Runs detached so deploys never wait on pruning.
pub fn preserved_snapshots_listener() -> impl Fn(&DeployEvent) + Send + Sync + 'static {
    |event: &DeployEvent| {
        if event.gav.simple_name() != METADATA_FILE {
            return;
        }

        let repository = event.repository.clone();
        let metadata = event.gav.clone();

        tokio::spawn(async move {
            if let Err(err) = prune_snapshots(&repository, &metadata).await {
                warn!(
                    repository = repository.name(),
                    %metadata,
                    error = %err,
                    "snapshot pruning failed"
                );
            }
        });
    }
}

async fn prune_snapshots(
    repository: &Arc<Repository>,
    metadata: &Location,
) -> Result<(), StorageError> {
    let preserved = repository.policy().await.preserved_snapshots;
    if preserved == 0 {
        return Ok(());
    }

    let Some(version_dir) = metadata.parent() else {
        return Ok(());
    };
    if !version_dir.simple_name().ends_with("-SNAPSHOT") {
        return Ok(());
    }

    let FileDetails::Directory(listing) = repository.storage().file_details(&version_dir).await?
    else {
        return Ok(());
    };

    // Group files by the build they belong to, ordered oldest first.
    let mut builds: BTreeMap<BuildId, Vec<String>> = BTreeMap::new();
    for file in &listing.files {
        if let FileDetails::Document(document) = file {
            if let Some(build) = BuildId::from_file_name(&document.name) {
                builds.entry(build).or_default().push(document.name.clone());
            }
        }
    }

    let total = builds.len();
    if total <= preserved as usize {
        return Ok(());
    }

    let stale = total - preserved as usize;
    for (build, files) in builds.into_iter().take(stale) {
        debug!(
            repository = repository.name(),
            directory = %version_dir,
            timestamp = %build.timestamp,
            number = build.number,
            "removing stale snapshot build"
        );
        for file in files {
            let target = match version_dir.resolve(&file) {
                Ok(target) => target,
                Err(err) => {
                    warn!(directory = %version_dir, file = %file, error = %err, "invalid listing entry");
                    continue;
                }
            };
            if let Err(err) = repository.storage().remove_file(&target).await {
                warn!(%target, error = %err, "failed to remove stale snapshot file");
            }
        }
    }

    Ok(())
}

/// The `{yyyyMMdd.HHmmss}-{buildNumber}` pair embedded in timestamped
/// snapshot file names such as `lib-1.0-20240105.113000-3-sources.jar`.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct BuildId {
    timestamp: String,
    number: u64,
}

impl BuildId {
    fn from_file_name(name: &str) -> Option<Self> {
        let parts: Vec<&str> = name.split('-').collect();

        for pair in parts.windows(2) {
            if !is_timestamp(pair[0]) {
                continue;
            }
            let digits: String = pair[1]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if digits.is_empty() {
                continue;
            }
            return Some(Self {
                timestamp: pair[0].to_string(),
                number: digits.parse().ok()?,
            });
        }

        None
    }
}

fn is_timestamp(segment: &str) -> bool {
    let Some((date, time)) = segment.split_once('.') else {
        return false;
    };
    date.len() == 8
        && time.len() == 6
        && date.chars().all(|c| c.is_ascii_digit())
        && time.chars().all(|c| c.is_ascii_digit())
}
