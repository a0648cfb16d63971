//! Regression tree growth and prediction.
//!
//! Trees are grown depth-first on an index buffer that is partitioned in
//! place. Impurity is the sum of squared errors (SSE) of the response; every
//! accepted split adds its SSE reduction to the importance of its feature.

use rand::rngs::StdRng;
use rand::Rng;

use crate::trainer::RegressionProblem;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TreeNode {
    Leaf { value: f64 },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

/// How candidate splits are drawn and constrained.
#[derive(Debug, Clone, Copy)]
pub struct SplitRule {
    /// Non-constant candidate features examined per node.
    pub mtry: usize,
    pub min_leaf_size: usize,
    /// One random threshold per feature instead of an exhaustive scan.
    pub extra_randomization: bool,
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    reduction: f64,
}

/// A fully grown regression tree. Node 0 is the root.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Grow a tree on `samples` (row indices into `problem`, repeats allowed).
    ///
    /// The SSE reduction of every split is added to `importances[feature]`.
    pub fn grow(
        problem: &RegressionProblem<'_>,
        mut samples: Vec<usize>,
        rule: &SplitRule,
        rng: &mut StdRng,
        importances: &mut [f64],
    ) -> Self {
        let mut nodes = vec![TreeNode::Leaf { value: 0.0 }];
        let mut features: Vec<usize> = (0..problem.n_predictors).collect();
        let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(samples.len());
        let mut stack = vec![(0usize, 0usize, samples.len())];

        while let Some((node, start, end)) = stack.pop() {
            let idx = &samples[start..end];
            let n = idx.len();
            if n == 0 {
                continue;
            }

            let mut sum = 0.0;
            let mut y_min = f64::INFINITY;
            let mut y_max = f64::NEG_INFINITY;
            for &s in idx {
                let y = problem.response[s];
                sum += y;
                y_min = y_min.min(y);
                y_max = y_max.max(y);
            }
            let mean = sum / n as f64;

            if n < 2 * rule.min_leaf_size || y_min == y_max {
                nodes[node] = TreeNode::Leaf { value: mean };
                continue;
            }

            let Some(split) = best_split(problem, idx, sum, rule, rng, &mut features, &mut pairs) else {
                nodes[node] = TreeNode::Leaf { value: mean };
                continue;
            };

            importances[split.feature] += split.reduction;

            let slice = &mut samples[start..end];
            let mut mid = 0;
            for i in 0..slice.len() {
                if problem.x(slice[i], split.feature) <= split.threshold {
                    slice.swap(i, mid);
                    mid += 1;
                }
            }

            let left = nodes.len();
            let right = left + 1;
            nodes.push(TreeNode::Leaf { value: 0.0 });
            nodes.push(TreeNode::Leaf { value: 0.0 });
            nodes[node] = TreeNode::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            stack.push((right, start + mid, end));
            stack.push((left, start, start + mid));
        }

        Self { nodes }
    }

    /// Predict from a feature accessor (`feature index -> value`).
    pub fn predict_with<F: Fn(usize) -> f64>(&self, value_of: F) -> f64 {
        let mut node = 0;
        loop {
            match self.nodes[node] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split { feature, threshold, left, right } => {
                    node = if value_of(feature) <= threshold { left } else { right };
                }
            }
        }
    }

    /// Predict the response of one sample of `problem`.
    pub fn predict(&self, problem: &RegressionProblem<'_>, sample: usize) -> f64 {
        self.predict_with(|feature| problem.x(sample, feature))
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, TreeNode::Leaf { .. })).count()
    }
}

/// Draw candidate features until `mtry` non-constant ones were examined and
/// keep the split with the largest SSE reduction.
fn best_split(
    problem: &RegressionProblem<'_>,
    idx: &[usize],
    total: f64,
    rule: &SplitRule,
    rng: &mut StdRng,
    features: &mut [usize],
    pairs: &mut Vec<(f64, f64)>,
) -> Option<Split> {
    let p = features.len();
    let mtry = rule.mtry.min(p);
    let parent = total * total / idx.len() as f64;
    let mut visited = 0;
    let mut best: Option<Split> = None;

    for i in 0..p {
        if visited == mtry {
            break;
        }
        // partial Fisher-Yates: features[..=i] is a uniform draw without replacement
        let j = rng.gen_range(i..p);
        features.swap(i, j);
        let feature = features[i];

        let (lo, hi) = idx.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| {
            let x = problem.x(s, feature);
            (lo.min(x), hi.max(x))
        });
        if lo == hi {
            continue;
        }
        visited += 1;

        let candidate = if rule.extra_randomization {
            random_threshold_split(problem, idx, feature, lo, hi, total, parent, rule.min_leaf_size, rng)
        } else {
            exhaustive_split(problem, idx, feature, total, parent, rule.min_leaf_size, pairs)
        };
        if let Some(c) = candidate {
            if best.map_or(true, |b| c.reduction > b.reduction) {
                best = Some(c);
            }
        }
    }
    best
}

/// Best threshold of one feature by scanning every midpoint between
/// consecutive distinct values.
fn exhaustive_split(
    problem: &RegressionProblem<'_>,
    idx: &[usize],
    feature: usize,
    total: f64,
    parent: f64,
    min_leaf: usize,
    pairs: &mut Vec<(f64, f64)>,
) -> Option<Split> {
    pairs.clear();
    pairs.extend(idx.iter().map(|&s| (problem.x(s, feature), problem.response[s])));
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = pairs.len();
    let mut left_sum = 0.0;
    let mut best: Option<Split> = None;
    for i in 0..n - 1 {
        left_sum += pairs[i].1;
        let n_left = i + 1;
        let n_right = n - n_left;
        if n_right < min_leaf {
            break;
        }
        if n_left < min_leaf || pairs[i].0 == pairs[i + 1].0 {
            continue;
        }
        let right_sum = total - left_sum;
        let reduction = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64 - parent;
        if best.map_or(true, |b| reduction > b.reduction) {
            let (a, b) = (pairs[i].0, pairs[i + 1].0);
            let mid = a + (b - a) / 2.0;
            let threshold = if mid < b { mid } else { a };
            best = Some(Split { feature, threshold, reduction: reduction.max(0.0) });
        }
    }
    best
}

/// One uniformly drawn threshold in `[lo, hi)`.
///
/// Interpolates instead of sampling `lo..hi` directly: `hi - lo` overflows
/// when the feature spans most of the `f64` range.
#[allow(clippy::too_many_arguments)]
fn random_threshold_split(
    problem: &RegressionProblem<'_>,
    idx: &[usize],
    feature: usize,
    lo: f64,
    hi: f64,
    total: f64,
    parent: f64,
    min_leaf: usize,
    rng: &mut StdRng,
) -> Option<Split> {
    let threshold = uniform_threshold(lo, hi, rng.gen::<f64>());
    let mut n_left = 0usize;
    let mut left_sum = 0.0;
    for &s in idx {
        if problem.x(s, feature) <= threshold {
            n_left += 1;
            left_sum += problem.response[s];
        }
    }
    let n_right = idx.len() - n_left;
    if n_left < min_leaf || n_right < min_leaf {
        return None;
    }
    let right_sum = total - left_sum;
    let reduction = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64 - parent;
    Some(Split { feature, threshold, reduction: reduction.max(0.0) })
}

/// `lo + u * (hi - lo)` for `u` in `[0, 1)`, finite for any finite `lo < hi`.
fn uniform_threshold(lo: f64, hi: f64, u: f64) -> f64 {
    let t = lo * (1.0 - u) + hi * u;
    if t >= lo && t < hi {
        t
    } else {
        lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    // x0 drives y as a step; x1 is constant.
    #[rustfmt::skip]
    const X: [f64; 12] = [
        0.1, 5.0,
        0.2, 5.0,
        0.3, 5.0,
        0.7, 5.0,
        0.8, 5.0,
        0.9, 5.0,
    ];
    const Y: [f64; 6] = [1.0, 1.0, 1.0, 3.0, 3.0, 3.0];

    fn rule(extra: bool) -> SplitRule {
        SplitRule { mtry: 2, min_leaf_size: 1, extra_randomization: extra }
    }

    #[test]
    fn test_exhaustive_split_finds_step() {
        let problem = RegressionProblem::new(6, 2, &X, &Y);
        let mut rng = StdRng::seed_from_u64(1);
        let mut imp = vec![0.0; 2];
        let tree = RegressionTree::grow(&problem, (0..6).collect(), &rule(false), &mut rng, &mut imp);

        // one split separates the two plateaus: SSE 6 -> 0
        assert!((imp[0] - 6.0).abs() < 1e-9);
        assert_eq!(imp[1], 0.0);
        assert_eq!(tree.n_leaves(), 2);
        for s in 0..6 {
            assert_eq!(tree.predict(&problem, s), Y[s]);
        }
        match tree.nodes()[0] {
            TreeNode::Split { feature, threshold, .. } => {
                assert_eq!(feature, 0);
                assert!(threshold > 0.3 && threshold < 0.7);
            }
            other => panic!("root should split, got {other:?}"),
        }
    }

    #[test]
    fn test_extra_trees_explain_all_variance() {
        let problem = RegressionProblem::new(6, 2, &X, &Y);
        let mut rng = StdRng::seed_from_u64(7);
        let mut imp = vec![0.0; 2];
        let tree = RegressionTree::grow(&problem, (0..6).collect(), &rule(true), &mut rng, &mut imp);

        // fully grown: total reduction equals root SSE, all on the only varying feature
        assert!((imp[0] - 6.0).abs() < 1e-9);
        assert_eq!(imp[1], 0.0);
        for s in 0..6 {
            assert_eq!(tree.predict(&problem, s), Y[s]);
        }
    }

    #[test]
    fn test_constant_response_is_single_leaf() {
        let y = [2.0; 6];
        let problem = RegressionProblem::new(6, 2, &X, &y);
        let mut rng = StdRng::seed_from_u64(3);
        let mut imp = vec![0.0; 2];
        let tree = RegressionTree::grow(&problem, (0..6).collect(), &rule(false), &mut rng, &mut imp);
        assert_eq!(tree.nodes(), &[TreeNode::Leaf { value: 2.0 }]);
        assert_eq!(imp, vec![0.0, 0.0]);
    }

    #[test]
    fn test_uniform_threshold_spans_full_range() {
        for u in [0.0, 0.25, 0.5, 0.999_999] {
            let t = uniform_threshold(-1e308, 1e308, u);
            assert!(t.is_finite());
            assert!((-1e308..1e308).contains(&t));
        }
        assert_eq!(uniform_threshold(-f64::MAX, f64::MAX, 0.5), 0.0);
        assert_eq!(uniform_threshold(1.0, 2.0, 0.0), 1.0);
        assert!(uniform_threshold(1.0, 1.0 + f64::EPSILON, 0.999_999) < 1.0 + f64::EPSILON);
    }

    #[test]
    fn test_extra_trees_on_extreme_feature_range() {
        #[rustfmt::skip]
        let x = [
            -1e308, 0.0,
            1e308, 1.0,
            0.0, 0.0,
            5.0, 1.0,
            -5.0, 0.0,
            1.0, 1.0,
        ];
        let y = [1.0, 2.0, 1.5, 2.0, 1.0, 1.5];
        let problem = RegressionProblem::new(6, 2, &x, &y);
        let mut imp = vec![0.0; 2];
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            RegressionTree::grow(&problem, (0..6).collect(), &rule(true), &mut rng, &mut imp);
        }
        assert!(imp.iter().all(|v| v.is_finite() && *v >= 0.0));
        assert!(imp[0] > 0.0);
    }

    #[test]
    fn test_min_leaf_size_blocks_small_splits() {
        let problem = RegressionProblem::new(6, 2, &X, &Y);
        let mut rng = StdRng::seed_from_u64(3);
        let mut imp = vec![0.0; 2];
        let rule = SplitRule { mtry: 2, min_leaf_size: 4, extra_randomization: false };
        let tree = RegressionTree::grow(&problem, (0..6).collect(), &rule, &mut rng, &mut imp);
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(imp, vec![0.0, 0.0]);
    }
}
