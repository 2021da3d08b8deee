//! Call trees from sample-encoded fragments.

use super::{BuildOptions, TreeBuilder};
use crate::fragment::{Sample, SampleFragment};
use crate::nodetree::{Node, ThreadTrees};
use crate::utils::error::BuildError;
use log::debug;
use std::collections::BTreeMap;

impl TreeBuilder for SampleFragment {
    /// Each sample's stack is active from its timestamp until the next
    /// sample on the same thread. The last sample of a thread only closes
    /// the one before it.
    fn call_trees(&self, options: &BuildOptions<'_>) -> Result<ThreadTrees, BuildError> {
        let mut samples: Vec<&Sample> = self
            .profile
            .samples
            .iter()
            .filter(|s| options.includes_thread(&s.thread_id))
            .collect();
        samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let mut by_thread: BTreeMap<&str, Vec<&Sample>> = BTreeMap::new();
        for sample in samples {
            by_thread.entry(sample.thread_id.as_str()).or_default().push(sample);
        }

        let mut trees = ThreadTrees::new();
        for (thread_id, samples) in by_thread {
            let roots = self.build_thread(&samples, options)?;
            if !roots.is_empty() {
                trees.insert(thread_id.to_string(), roots);
            }
        }

        debug!("Built sample call trees for {} threads", trees.len());
        Ok(trees)
    }
}

impl SampleFragment {
    /// Build the call tree of one thread from its time-ordered samples
    ///
    /// **Internal** - called once per thread by `call_trees`
    ///
    /// # Arguments
    /// * `samples` - One thread's samples, sorted by timestamp
    /// * `options` - Depth limit and application predicate
    ///
    /// # Returns
    /// Top-level nodes in time order, or the first invalid stack or frame id
    ///
    /// # Algorithm
    /// 1. Pair each sample with the next one to get its `[start, end)` span
    /// 2. Walk the stack root to leaf, starting from the top-level list
    /// 3. Extend the last node at that level when its fingerprint matches and
    ///    it ends exactly where this span starts, otherwise start a new node
    /// 4. Descend into the extended or new node and continue with its children
    fn build_thread(
        &self,
        samples: &[&Sample],
        options: &BuildOptions<'_>,
    ) -> Result<Vec<Node>, BuildError> {
        let frames = &self.profile.frames;
        let stacks = &self.profile.stacks;
        let mut roots: Vec<Node> = Vec::new();

        for pair in samples.windows(2) {
            let (sample, next) = (pair[0], pair[1]);
            let start_ns = sample.timestamp_ns();
            let end_ns = next.timestamp_ns();

            let stack = stacks
                .get(sample.stack_id)
                .ok_or(BuildError::InvalidStackId(sample.stack_id))?;
            if let Some(&frame_id) = stack.iter().find(|&&id| id >= frames.len()) {
                return Err(BuildError::InvalidFrameId(frame_id));
            }

            let mut level = &mut roots;
            for &frame_id in stack.iter().rev() {
                let frame = &frames[frame_id];
                let fingerprint = frame.fingerprint();

                let contiguous = level
                    .last()
                    .is_some_and(|n| n.fingerprint == fingerprint && n.end_ns == start_ns);
                if !contiguous {
                    let is_application = frame.is_application(options.is_application);
                    level.push(Node::from_frame(frame, start_ns, end_ns, fingerprint, is_application));
                }

                let Some(node) = level.last_mut() else {
                    break;
                };
                if contiguous {
                    node.extend(end_ns);
                }
                level = &mut node.children;
            }
        }

        Ok(roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::SampleData;
    use crate::frame::Frame;

    fn sample(stack_id: usize, thread_id: &str, timestamp: f64) -> Sample {
        Sample {
            stack_id,
            thread_id: thread_id.to_string(),
            timestamp,
        }
    }

    fn fragment(stacks: Vec<Vec<usize>>, samples: Vec<Sample>) -> SampleFragment {
        SampleFragment {
            profile: SampleData {
                frames: vec![
                    Frame::new("function0", "package0"),
                    Frame::new("function1", "package1"),
                    Frame::new("function2", "package2"),
                ],
                stacks,
                samples,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_single_sample_emits_nothing() {
        let fragment = fragment(vec![vec![1, 0]], vec![sample(0, "1", 0.01)]);
        let trees = fragment.call_trees(&BuildOptions::default()).unwrap();
        assert!(trees.is_empty());
    }

    #[test]
    fn test_diverging_stacks_share_root() {
        let fragment = fragment(
            vec![vec![1, 0], vec![2, 0]],
            vec![sample(0, "1", 0.01), sample(1, "1", 0.02), sample(1, "1", 0.03)],
        );
        let trees = fragment.call_trees(&BuildOptions::default()).unwrap();
        let roots = &trees["1"];
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].name, "function0");
        assert_eq!(roots[0].sample_count, 2);
        assert_eq!(roots[0].end_ns, 30_000_000);
        let names: Vec<&str> = roots[0].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["function1", "function2"]);
    }

    #[test]
    fn test_gap_breaks_contiguity() {
        // Same stack twice, but the second occurrence does not start where
        // the first ended because another stack ran in between.
        let fragment = fragment(
            vec![vec![0], vec![1]],
            vec![
                sample(0, "1", 0.01),
                sample(1, "1", 0.02),
                sample(0, "1", 0.03),
                sample(0, "1", 0.04),
            ],
        );
        let trees = fragment.call_trees(&BuildOptions::default()).unwrap();
        let names: Vec<&str> = trees["1"].iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["function0", "function1", "function0"]);
    }

    #[test]
    fn test_invalid_frame_id() {
        let fragment = fragment(vec![vec![0, 9]], vec![sample(0, "1", 0.01), sample(0, "1", 0.02)]);
        assert_eq!(
            fragment.call_trees(&BuildOptions::default()),
            Err(BuildError::InvalidFrameId(9))
        );
    }

    #[test]
    fn test_active_thread_filter() {
        let fragment = fragment(
            vec![vec![0]],
            vec![
                sample(0, "1", 0.01),
                sample(0, "1", 0.02),
                sample(0, "2", 0.01),
                sample(0, "2", 0.02),
            ],
        );
        let options = BuildOptions::default().with_active_thread(Some("2"));
        let trees = fragment.call_trees(&options).unwrap();
        assert_eq!(trees.keys().collect::<Vec<_>>(), vec!["2"]);
    }
}
