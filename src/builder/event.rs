//! Call trees from event-encoded fragments.
//!
//! Events are replayed per thread. Entered frames sit on an open-frame
//! stack until their exit, at which point they are attached to the frame
//! below them (or become a root). Fingerprints cover the whole ancestor
//! chain.

use super::{BuildOptions, TreeBuilder};
use crate::fragment::{Action, Event, EventFragment, Method};
use crate::frame::StackHasher;
use crate::nodetree::{Node, ThreadTrees};
use crate::utils::error::BuildError;
use log::debug;
use std::collections::BTreeMap;

struct OpenFrame {
    method_id: u64,
    node: Node,
}

/// Replay state of one thread
#[derive(Default)]
struct ThreadState {
    roots: Vec<Node>,
    open: Vec<OpenFrame>,
    hashes: StackHasher,
    depth: usize,
    max_ts: u64,
}

impl ThreadState {
    fn enter(&mut self, method: &Method, ts: u64, options: &BuildOptions<'_>) {
        self.depth += 1;
        if self.depth > options.max_depth {
            return;
        }
        let frame = method.frame();
        let fingerprint = self.hashes.push(&frame);
        let is_application = frame.is_application(options.is_application);
        self.open.push(OpenFrame {
            method_id: method.id,
            node: Node::from_frame(&frame, ts, ts, fingerprint, is_application),
        });
    }

    /// Close frames from the top down to the innermost frame of `method_id`
    ///
    /// An exit for a method that has no open frame is ignored, as is the
    /// exit of a frame that was dropped for being too deep.
    fn exit(&mut self, method_id: u64, ts: u64, options: &BuildOptions<'_>) {
        if self.depth > options.max_depth {
            self.depth -= 1;
            return;
        }
        let Some(position) = self.open.iter().rposition(|f| f.method_id == method_id) else {
            return;
        };
        while self.open.len() > position {
            self.close_top(ts);
        }
        // Nothing deeper than the limit is outstanding here
        self.depth = position;
    }

    fn close_top(&mut self, ts: u64) {
        let Some(OpenFrame { mut node, .. }) = self.open.pop() else {
            return;
        };
        self.hashes.pop();
        node.close(ts);
        match self.open.last_mut() {
            Some(parent) => parent.node.children.push(node),
            None => self.roots.push(node),
        }
    }

    /// Close whatever is still open at the latest time seen on the thread
    fn finish(mut self) -> Vec<Node> {
        let ts = self.max_ts;
        while !self.open.is_empty() {
            self.close_top(ts);
        }
        self.roots
    }
}

impl TreeBuilder for EventFragment {
    /// **Public** - builds every thread of an event-encoded fragment
    ///
    /// # Algorithm
    /// 1. Repair wall-clock regressions, then resolve the clock domain
    /// 2. Replay enter and exit events per thread against an open-frame stack
    /// 3. On exit, close frames down to the exiting method and estimate their
    ///    sample counts from duration
    /// 4. Close whatever is still open at the thread's latest timestamp
    fn call_trees(&self, options: &BuildOptions<'_>) -> Result<ThreadTrees, BuildError> {
        let mut data = self.profile.clone();
        data.repair_wall_clock();

        let clock = data.event_clock();
        let methods = data.methods_by_id();
        let mut threads: BTreeMap<u64, ThreadState> = BTreeMap::new();

        for Event { action, thread_id, method_id, time } in &data.events {
            if !options.includes_thread(&thread_id.to_string()) {
                continue;
            }
            let ts = clock.timestamp_ns(time);
            let state = threads.entry(*thread_id).or_default();
            state.max_ts = state.max_ts.max(ts);

            match action {
                Action::Enter => match methods.get(method_id) {
                    Some(method) => state.enter(method, ts, options),
                    None => state.enter(&Method::unknown(*method_id), ts, options),
                },
                Action::Exit | Action::Unwind => state.exit(*method_id, ts, options),
            }
        }

        let trees: ThreadTrees = threads
            .into_iter()
            .map(|(thread_id, state)| (thread_id.to_string(), state.finish()))
            .filter(|(_, roots)| !roots.is_empty())
            .collect();

        debug!("Built event call trees for {} threads", trees.len());
        Ok(trees)
    }
}
