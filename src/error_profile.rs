use std::cmp::{max, min};
use std::collections::HashMap;
use std::time::SystemTime;

use log::debug;

use crate::containers::{ErrorProfileSegment, SeqInterval, TigVector, Unitig};
use crate::evidence::PlacementEvidence;

/// Compute and store an error profile for every assembled tig in the collection.
pub fn compute_error_profiles<E: PlacementEvidence>(tigs: &mut TigVector, evidence: &E) {
    let start_time = SystemTime::now();
    let mut n_segments = 0;
    for tig_id in 0..tigs.len() as u32 {
        let profile = match tigs.get(tig_id) {
            Some(tig) if !tig.is_unassembled => compute_error_profile(tig, evidence),
            _ => continue,
        };
        n_segments += profile.len();
        if let Some(tig) = tigs.get_mut(tig_id) {
            tig.error_profile = profile;
        }
    }
    debug!("{} error profile segments over {} tigs", n_segments, tigs.len());
    debug!(
        "Computing error profiles: {}s",
        start_time.elapsed().unwrap_or_default().as_secs()
    );
}

/// Cut the tig at every read end, then summarise the erates of the overlaps
/// between the tig's own reads that cover each piece. Pieces with no overlap
/// coverage are left out of the profile.
pub fn compute_error_profile<E: PlacementEvidence>(
    tig: &Unitig,
    evidence: &E,
) -> Vec<ErrorProfileSegment> {
    let mut boundaries: Vec<i32> = tig
        .ufpath
        .iter()
        .flat_map(|read| [read.position.min(), read.position.max()])
        .collect();
    boundaries.sort_unstable();
    boundaries.dedup();
    if boundaries.len() < 2 {
        return Vec::new();
    }

    let positions: HashMap<u32, SeqInterval> = tig
        .ufpath
        .iter()
        .map(|read| (read.id, read.position))
        .collect();
    let mut segment_erates: Vec<Vec<f64>> = vec![Vec::new(); boundaries.len() - 1];

    for read in tig.ufpath.iter() {
        for overlap in evidence.overlaps(read.id) {
            // each pair is seen from both reads; count it from the lower id only
            if overlap.a_id != read.id || overlap.b_id <= read.id {
                continue;
            }
            if let Some(b_position) = positions.get(&overlap.b_id) {
                let bgn = max(read.position.min(), b_position.min());
                let end = min(read.position.max(), b_position.max());
                if bgn >= end {
                    continue;
                }
                let first_segment = boundaries.partition_point(|&b| b < bgn);
                let last_segment = boundaries.partition_point(|&b| b < end);
                for erates in segment_erates[first_segment..last_segment].iter_mut() {
                    erates.push(overlap.erate);
                }
            }
        }
    }

    let mut profile = Vec::new();
    for (idx, erates) in segment_erates.iter().enumerate() {
        if erates.is_empty() {
            continue;
        }
        let n = erates.len() as f64;
        let mean = erates.iter().sum::<f64>() / n;
        let variance = erates.iter().map(|e| (e - mean) * (e - mean)).sum::<f64>() / n;
        profile.push(ErrorProfileSegment {
            bgn: boundaries[idx],
            end: boundaries[idx + 1],
            mean,
            stddev: variance.sqrt(),
        });
    }
    profile
}

impl Unitig {
    /// Fraction of the error profile over [bgn, end) that would accept an overlap
    /// with this erate. A tig with nothing to compare against is always consistent.
    pub fn overlap_consistent_with_tig(
        &self,
        deviations: f64,
        bgn: i32,
        end: i32,
        erate: f64,
    ) -> f64 {
        let mut n_below = 0;
        let mut n_above = 0;
        for segment in self.error_profile.iter() {
            if segment.end <= bgn || end <= segment.bgn {
                continue;
            }
            if erate <= segment.max_erate(deviations) {
                n_below += 1;
            } else {
                n_above += 1;
            }
        }
        if n_below + n_above == 0 {
            return 1.0;
        }
        n_below as f64 / (n_below + n_above) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils;

    fn create_test_profiled_tig() -> Unitig {
        let mut tig = utils::create_test_tig(0, &[(1, 0, 500), (2, 300, 800), (3, 1000, 600)]);
        let store = utils::create_test_store(
            &[(1, 500, true), (2, 500, true), (3, 400, true)],
            vec![
                utils::create_test_overlap(1, 2, 0.01),
                utils::create_test_overlap(3, 2, 0.03),
            ],
            Vec::new(),
        );
        tig.error_profile = compute_error_profile(&tig, &store);
        tig
    }

    #[test]
    fn test_compute_error_profile_segments() {
        let tig = create_test_profiled_tig();
        assert_eq!(tig.error_profile.len(), 2);
        assert_eq!((tig.error_profile[0].bgn, tig.error_profile[0].end), (300, 500));
        assert!((tig.error_profile[0].mean - 0.01).abs() < 1e-12);
        assert_eq!((tig.error_profile[1].bgn, tig.error_profile[1].end), (600, 800));
        assert!((tig.error_profile[1].mean - 0.03).abs() < 1e-12);
        assert_eq!(tig.error_profile[1].stddev, 0.0);
    }

    #[test]
    fn test_error_profile_mean_and_stddev() {
        let tig = utils::create_test_tig(0, &[(1, 0, 1000), (2, 0, 1000), (3, 0, 1000)]);
        let store = utils::create_test_store(
            &[(1, 1000, true), (2, 1000, true), (3, 1000, true)],
            vec![
                utils::create_test_overlap(1, 2, 0.01),
                utils::create_test_overlap(1, 3, 0.03),
            ],
            Vec::new(),
        );
        let profile = compute_error_profile(&tig, &store);
        assert_eq!(profile.len(), 1);
        assert!((profile[0].mean - 0.02).abs() < 1e-12);
        assert!((profile[0].stddev - 0.01).abs() < 1e-12);
        assert!((profile[0].max_erate(2.0) - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_overlap_consistent_with_tig() {
        let tig = create_test_profiled_tig();
        assert_eq!(tig.overlap_consistent_with_tig(6.0, 0, 1000, 0.02), 0.5);
        assert_eq!(tig.overlap_consistent_with_tig(6.0, 0, 550, 0.02), 0.0);
        assert_eq!(tig.overlap_consistent_with_tig(6.0, 0, 550, 0.005), 1.0);
        // no profile coverage in the region
        assert_eq!(tig.overlap_consistent_with_tig(6.0, 850, 1000, 0.5), 1.0);
    }

    #[test]
    fn test_empty_profile_is_consistent() {
        let tig = utils::create_test_tig(0, &[(1, 0, 500)]);
        assert!(tig.error_profile.is_empty());
        assert_eq!(tig.overlap_consistent_with_tig(6.0, 0, 500, 0.2), 1.0);
    }

    #[test]
    fn test_compute_error_profiles_skips_unassembled() {
        let mut unassembled = utils::create_test_tig(1, &[(3, 0, 500), (4, 100, 600)]);
        unassembled.is_unassembled = true;
        let mut tigs = TigVector::from_unitigs(vec![
            utils::create_test_tig(0, &[(1, 0, 500), (2, 300, 800)]),
            unassembled,
        ]);
        let store = utils::create_test_store(
            &[(1, 500, true), (2, 500, true), (3, 500, true), (4, 500, true)],
            vec![
                utils::create_test_overlap(1, 2, 0.01),
                utils::create_test_overlap(3, 4, 0.01),
            ],
            Vec::new(),
        );
        compute_error_profiles(&mut tigs, &store);
        assert_eq!(tigs.get(0).map(|t| t.error_profile.len()), Some(1));
        assert_eq!(tigs.get(1).map(|t| t.error_profile.len()), Some(0));
    }
}
