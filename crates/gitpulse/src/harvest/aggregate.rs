//! Merging per-project results into one de-duplicated batch.

use std::collections::HashSet;

use super::types::HarvestStats;
use crate::commit::{HarvestedCommit, RawCommit};

/// Accepted commits and counters from harvesting a single project.
#[derive(Debug, Clone, Default)]
pub struct ProjectHarvest {
    pub project_id: u64,
    pub project_path: String,
    /// Accepted commits in branch-listing order.
    pub commits: Vec<RawCommit>,
    pub stats: HarvestStats,
}

/// Merge per-project results.
///
/// Results are ordered by project identifier, commits keep their
/// branch-listing order, and the first occurrence of an identifier wins.
/// Later sightings are counted as duplicates. Messages are dropped.
pub fn aggregate(mut results: Vec<ProjectHarvest>) -> (Vec<HarvestedCommit>, HarvestStats) {
    results.sort_by_key(|r| r.project_id);

    let mut stats = HarvestStats::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut commits = Vec::new();

    for result in results {
        stats.absorb(result.stats);
        for commit in result.commits {
            if seen.insert(commit.id.clone()) {
                commits.push(HarvestedCommit::from(commit));
            } else {
                stats.duplicates += 1;
            }
        }
    }

    stats.commits_accepted = commits.len();
    (commits, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn raw(id: &str, project_id: u64, branch: &str) -> RawCommit {
        RawCommit {
            id: id.to_string(),
            project_id,
            branch: branch.to_string(),
            author_name: "Alice".to_string(),
            author_email: "alice@example.com".to_string(),
            committer_email: "alice@example.com".to_string(),
            committed_at: DateTime::parse_from_rfc3339("2024-01-01T10:00:00+00:00")
                .expect("valid timestamp"),
            additions: 5,
            deletions: 1,
            parent_ids: vec!["p0".to_string()],
            message: "Fix parser".to_string(),
        }
    }

    fn harvest(project_id: u64, commits: Vec<RawCommit>) -> ProjectHarvest {
        ProjectHarvest {
            project_id,
            project_path: format!("group/p{project_id}"),
            stats: HarvestStats {
                projects_seen: 1,
                commits_observed: commits.len(),
                ..Default::default()
            },
            commits,
        }
    }

    #[test]
    fn test_duplicate_identifiers_collapse_to_one_entry() {
        let results = vec![harvest(
            1,
            vec![raw("a1", 1, "main"), raw("a1", 1, "develop")],
        )];

        let (commits, stats) = aggregate(results);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].branch, "main");
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.commits_accepted, 1);
    }

    #[test]
    fn test_lowest_project_id_wins_regardless_of_completion_order() {
        let forward = vec![
            harvest(2, vec![raw("shared", 2, "fork-main")]),
            harvest(1, vec![raw("shared", 1, "main"), raw("b2", 1, "main")]),
        ];
        let backward: Vec<ProjectHarvest> = forward.iter().rev().cloned().collect();

        let (a, stats_a) = aggregate(forward);
        let (b, stats_b) = aggregate(backward);

        assert_eq!(a, b);
        assert_eq!(stats_a, stats_b);
        assert_eq!(a[0].project_id, 1);
        assert_eq!(a[0].branch, "main");
        assert_eq!(a.len(), 2);
        assert_eq!(stats_a.projects_seen, 2);
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let (commits, stats) = aggregate(Vec::new());
        assert!(commits.is_empty());
        assert_eq!(stats, HarvestStats::default());
    }
}
