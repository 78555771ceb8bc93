//! Aggregation of per-path publicness verdicts into per-program-point
//! verdicts (§4.5): pointwise publicness is the conjunction over every path
//! through a point -- one path reporting `false` is enough to make the whole
//! point `false`, regardless of how any other path at that point resolved.

use std::collections::{HashMap, HashSet};

use pubcheck_model::record::{CfgPath, MissingPolicy, PathPublicness, PpCoverage, PublicAtPoint};

struct CoverageInfo {
    path_ids: Vec<i64>,
    truncated: bool,
}

/// Coverage keyed by `(fn, pp)`. When no coverage records were supplied at
/// all, it is derived from each path's `pp_seq` (deduped within a path);
/// derived coverage is never marked truncated.
fn coverage_map(paths: &[CfgPath], coverage: &[PpCoverage]) -> HashMap<(String, String), CoverageInfo> {
    if !coverage.is_empty() {
        return coverage
            .iter()
            .map(|c| {
                (
                    (c.function.clone(), c.pp.clone()),
                    CoverageInfo {
                        path_ids: c.path_ids.clone(),
                        truncated: c.truncated,
                    },
                )
            })
            .collect();
    }

    let mut derived: HashMap<(String, String), Vec<i64>> = HashMap::new();
    for p in paths {
        let Some(path_id) = p.path_id else { continue };
        let mut seen_in_path = HashSet::new();
        for pp in &p.pp_seq {
            if seen_in_path.insert(pp.clone()) {
                derived
                    .entry((p.function.clone(), pp.clone()))
                    .or_default()
                    .push(path_id);
            }
        }
    }
    derived
        .into_iter()
        .map(|(k, path_ids)| (k, CoverageInfo { path_ids, truncated: false }))
        .collect()
}

/// Folds per-path verdicts into per-`(fn, pp, value)` aggregates.
///
/// Enumerates `(fn, pp)` strictly over the coverage map -- a program point
/// absent from coverage is never visited and so never emitted, matching
/// the two-level "for each covered point, for each value seen at it" walk
/// rather than inventing a stand-in coverage row for it.
pub fn aggregate(
    paths: &[CfgPath],
    coverage: &[PpCoverage],
    verdicts: &[PathPublicness],
    missing_policy: MissingPolicy,
) -> Vec<PublicAtPoint> {
    let cov = coverage_map(paths, coverage);

    let mut verdict_index: HashMap<(String, i64, String, String), Option<bool>> = HashMap::new();
    let mut values_at_point: HashMap<(String, String), Vec<String>> = HashMap::new();
    let mut seen_values: HashSet<(String, String, String)> = HashSet::new();
    for v in verdicts {
        verdict_index.insert(
            (v.function.clone(), v.path_id, v.pp.clone(), v.value.clone()),
            v.public,
        );
        let key = (v.function.clone(), v.pp.clone(), v.value.clone());
        if seen_values.insert(key) {
            values_at_point
                .entry((v.function.clone(), v.pp.clone()))
                .or_default()
                .push(v.value.clone());
        }
    }

    let mut out = Vec::new();
    for ((function, pp), info) in &cov {
        let Some(values) = values_at_point.get(&(function.clone(), pp.clone())) else {
            continue;
        };

        for value in values {
            let mut any_false = false;
            let mut any_unknown = false;
            let mut missing = 0u64;
            for pid in &info.path_ids {
                match verdict_index.get(&(function.clone(), *pid, pp.clone(), value.clone())) {
                    Some(Some(true)) => {}
                    Some(Some(false)) => any_false = true,
                    Some(None) => any_unknown = true,
                    None => missing += 1,
                }
            }
            if missing > 0 {
                any_unknown = true;
            }

            let public = if any_false {
                Some(false)
            } else if any_unknown || info.truncated {
                match missing_policy {
                    MissingPolicy::Unknown => None,
                    MissingPolicy::Public => Some(true),
                    MissingPolicy::Secret => Some(false),
                }
            } else {
                Some(true)
            };

            out.push(PublicAtPoint::new(
                function.clone(),
                pp.clone(),
                value.clone(),
                public,
                info.path_ids.len() as u64,
                missing,
                info.truncated,
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg_path(function: &str, path_id: i64, pp_seq: &[&str]) -> CfgPath {
        CfgPath {
            kind: "path".to_string(),
            function: function.to_string(),
            path_id: Some(path_id),
            bbs: Vec::new(),
            decisions: Vec::new(),
            path_cond: Vec::new(),
            path_cond_json: Vec::new(),
            pp_seq: pp_seq.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn coverage(function: &str, pp: &str, path_ids: &[i64], truncated: bool) -> PpCoverage {
        PpCoverage {
            kind: "pp_coverage".to_string(),
            function: function.to_string(),
            pp: pp.to_string(),
            path_count: path_ids.len() as u64,
            path_ids: path_ids.to_vec(),
            truncated,
        }
    }

    fn verdict(function: &str, path_id: i64, pp: &str, value: &str, public: Option<bool>) -> PathPublicness {
        PathPublicness::new(function, path_id, pp, value, public)
    }

    #[test]
    fn one_false_path_dominates_the_aggregate() {
        let paths = vec![];
        let cov = vec![coverage("f", "p1", &[1, 2], false)];
        let verdicts = vec![
            verdict("f", 1, "p1", "v", Some(false)),
            verdict("f", 2, "p1", "v", Some(true)),
        ];
        let out = aggregate(&paths, &cov, &verdicts, MissingPolicy::Unknown);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].public, Some(false));
    }

    #[test]
    fn all_true_paths_aggregate_true() {
        let paths = vec![];
        let cov = vec![coverage("f", "p1", &[1, 2], false)];
        let verdicts = vec![
            verdict("f", 1, "p1", "v", Some(true)),
            verdict("f", 2, "p1", "v", Some(true)),
        ];
        let out = aggregate(&paths, &cov, &verdicts, MissingPolicy::Unknown);
        assert_eq!(out[0].public, Some(true));
        assert_eq!(out[0].missing_paths, 0);
    }

    #[test]
    fn truncated_coverage_with_only_false_still_reports_false() {
        let paths = vec![];
        let cov = vec![coverage("f", "p1", &[1, 2], true)];
        let verdicts = vec![verdict("f", 1, "p1", "v", Some(false))];
        let out = aggregate(&paths, &cov, &verdicts, MissingPolicy::Unknown);
        assert_eq!(out[0].public, Some(false));
    }

    #[test]
    fn truncated_coverage_with_only_true_is_unknown_under_default_policy() {
        let paths = vec![];
        let cov = vec![coverage("f", "p1", &[1, 2], true)];
        let verdicts = vec![verdict("f", 1, "p1", "v", Some(true))];
        let out = aggregate(&paths, &cov, &verdicts, MissingPolicy::Unknown);
        assert_eq!(out[0].public, None);
        assert_eq!(out[0].missing_paths, 1);
        assert!(out[0].truncated);
    }

    #[test]
    fn missing_policy_has_no_effect_when_fully_covered_and_decided() {
        let paths = vec![];
        let cov = vec![coverage("f", "p1", &[1], false)];
        let verdicts = vec![verdict("f", 1, "p1", "v", Some(true))];
        let unknown = aggregate(&paths, &cov, &verdicts, MissingPolicy::Unknown);
        let public = aggregate(&paths, &cov, &verdicts, MissingPolicy::Public);
        let secret = aggregate(&paths, &cov, &verdicts, MissingPolicy::Secret);
        assert_eq!(unknown[0].public, Some(true));
        assert_eq!(public[0].public, Some(true));
        assert_eq!(secret[0].public, Some(true));
    }

    #[test]
    fn coverage_falls_back_to_pp_seq_when_absent() {
        let paths = vec![cfg_path("f", 1, &["p1", "p2"]), cfg_path("f", 2, &["p1"])];
        let verdicts = vec![
            verdict("f", 1, "p1", "v", Some(true)),
            verdict("f", 2, "p1", "v", Some(true)),
        ];
        let out = aggregate(&paths, &[], &verdicts, MissingPolicy::Unknown);
        let p1 = out.iter().find(|o| o.pp == "p1").unwrap();
        assert_eq!(p1.total_paths, 2);
        assert_eq!(p1.public, Some(true));
    }
}
