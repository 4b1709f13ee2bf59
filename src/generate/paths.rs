//! Path choosers for predicate and aggregation synthesis.

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::dataset::DataSet;

/// Picks one path of the dataset, or `None` when it has no paths.
///
/// Uniform mode sorts the paths, Fisher-Yates shuffles them with the walk's
/// RNG, and takes the first. Weighted mode samples with weights
/// `2^((max_depth - depth) + 1)` computed over the lexicographically sorted
/// path list, so shallow paths are preferred and tie-breaking is fixed by
/// the seed alone.
pub fn pick_path(ds: &DataSet, weighted: bool, rng: &mut ChaCha8Rng) -> Option<String> {
    if weighted {
        weighted_path(ds, rng)
    } else {
        let mut keys: Vec<&String> = ds.paths.keys().collect();
        keys.shuffle(rng);
        keys.first().map(|k| (*k).clone())
    }
}

fn weighted_path(ds: &DataSet, rng: &mut ChaCha8Rng) -> Option<String> {
    let keys: Vec<&String> = ds.paths.keys().collect();
    if keys.is_empty() {
        return None;
    }
    let depths: Vec<u32> = keys
        .iter()
        .map(|path| path.matches('/').count() as u32)
        .collect();
    let max_depth = depths.iter().copied().max().unwrap_or(0) + 1;
    let weights: Vec<f64> = depths
        .iter()
        .map(|depth| 2f64.powi(((max_depth - depth) + 1) as i32))
        .collect();
    let chooser = WeightedIndex::new(&weights).ok()?;
    Some(keys[chooser.sample(rng)].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DataPath;
    use rand::SeedableRng;

    fn dataset(paths: &[&str]) -> DataSet {
        DataSet {
            name: "d".into(),
            count: Some(10),
            paths: paths
                .iter()
                .map(|p| {
                    (
                        p.to_string(),
                        DataPath {
                            path: p.to_string(),
                            ..Default::default()
                        },
                    )
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_dataset_yields_none() {
        let ds = dataset(&[]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(pick_path(&ds, false, &mut rng), None);
        assert_eq!(pick_path(&ds, true, &mut rng), None);
    }

    #[test]
    fn choices_are_seed_deterministic() {
        let ds = dataset(&["/a", "/a/b", "/a/b/c", "/z"]);
        for weighted in [false, true] {
            let mut first = ChaCha8Rng::seed_from_u64(99);
            let mut second = ChaCha8Rng::seed_from_u64(99);
            for _ in 0..20 {
                assert_eq!(
                    pick_path(&ds, weighted, &mut first),
                    pick_path(&ds, weighted, &mut second)
                );
            }
        }
    }

    #[test]
    fn weighted_mode_prefers_shallow_paths() {
        let ds = dataset(&["/a", "/deep/nested/path/x"]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut shallow = 0;
        for _ in 0..200 {
            if pick_path(&ds, true, &mut rng).as_deref() == Some("/a") {
                shallow += 1;
            }
        }
        // Depth 1 gets weight 2^4 versus 2^1, i.e. 8 of 9 draws on average.
        assert!(shallow > 140, "shallow picked only {shallow}/200 times");
    }
}
