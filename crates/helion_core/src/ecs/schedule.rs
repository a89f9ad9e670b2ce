//! # Task graph
//!
//! Frame work is expressed as a dependency graph of named closures and
//! executed on a rayon pool: every node whose predecessors have all
//! finished is eligible, eligible nodes run concurrently, and completion
//! of a node immediately unlocks its successors. The graph is rebuilt
//! each tick, so node closures only need to live for one run.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::ecs::error::EcsError;

/// Opaque handle to a node within one [`TaskGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId(usize);

struct Node<'t> {
    name: String,
    work: Box<dyn Fn() + Send + Sync + 't>,
    successors: Vec<usize>,
    pending: AtomicUsize,
}

/// One frame's worth of scheduled work.
///
/// Duplicate edges between the same pair of nodes are benign: each copy
/// adds one pending count and one matching decrement.
pub struct TaskGraph<'t> {
    nodes: Vec<Node<'t>>,
}

impl<'t> TaskGraph<'t> {
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Adds a node. The closure may run on any worker thread.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        work: impl Fn() + Send + Sync + 't,
    ) -> NodeId {
        self.nodes.push(Node {
            name: name.into(),
            work: Box::new(work),
            successors: Vec::new(),
            pending: AtomicUsize::new(0),
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Requires `before` to finish before `after` may start.
    pub fn add_edge(&mut self, before: NodeId, after: NodeId) {
        self.nodes[before.0].successors.push(after.0);
        self.nodes[after.0].pending.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Executes the whole graph on `pool`, blocking until every reachable
    /// node has run.
    ///
    /// If the constraint edges form a cycle, the nodes on it can never
    /// become eligible; rather than deadlock, the run returns
    /// [`EcsError::OrderingCycle`] naming the stuck nodes. Panics inside
    /// node closures propagate to the caller once the rest of the graph
    /// has drained.
    pub fn run(&self, pool: &rayon::ThreadPool) -> Result<(), EcsError> {
        if self.nodes.is_empty() {
            return Ok(());
        }

        let executed = AtomicUsize::new(0);
        pool.scope(|scope| {
            let executed = &executed;
            for (index, node) in self.nodes.iter().enumerate() {
                if node.pending.load(Ordering::Relaxed) == 0 {
                    scope.spawn(move |scope| self.execute(index, scope, executed));
                }
            }
        });

        let ran = executed.load(Ordering::Relaxed);
        if ran == self.nodes.len() {
            Ok(())
        } else {
            let stuck = self
                .nodes
                .iter()
                .filter(|node| node.pending.load(Ordering::Relaxed) > 0)
                .map(|node| node.name.clone())
                .collect();
            Err(EcsError::OrderingCycle { stuck })
        }
    }

    fn execute<'s>(&'s self, index: usize, scope: &rayon::Scope<'s>, executed: &'s AtomicUsize) {
        let node = &self.nodes[index];
        (node.work)();
        executed.fetch_add(1, Ordering::Relaxed);
        for &successor in &node.successors {
            if self.nodes[successor].pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                scope.spawn(move |scope| self.execute(successor, scope, executed));
            }
        }
    }
}

impl Default for TaskGraph<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicU32;

    fn pool() -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap()
    }

    #[test]
    fn test_all_nodes_run() {
        let count = AtomicU32::new(0);
        let mut graph = TaskGraph::new();
        for i in 0..16 {
            graph.add_node(format!("n{i}"), || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        graph.run(&pool()).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn test_diamond_ordering() {
        let log = Mutex::new(Vec::new());
        let mut graph = TaskGraph::new();
        let a = graph.add_node("a", || log.lock().push('a'));
        let b = graph.add_node("b", || log.lock().push('b'));
        let c = graph.add_node("c", || log.lock().push('c'));
        let d = graph.add_node("d", || log.lock().push('d'));
        graph.add_edge(a, b);
        graph.add_edge(a, c);
        graph.add_edge(b, d);
        graph.add_edge(c, d);

        graph.run(&pool()).unwrap();
        drop(graph);

        let order = log.into_inner();
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], 'a');
        assert_eq!(order[3], 'd');
    }

    #[test]
    fn test_duplicate_edges_benign() {
        let log = Mutex::new(Vec::new());
        let mut graph = TaskGraph::new();
        let a = graph.add_node("a", || log.lock().push('a'));
        let b = graph.add_node("b", || log.lock().push('b'));
        graph.add_edge(a, b);
        graph.add_edge(a, b);

        graph.run(&pool()).unwrap();
        drop(graph);
        assert_eq!(log.into_inner(), vec!['a', 'b']);
    }

    #[test]
    fn test_repeated_runs_keep_edge_order() {
        let pool = pool();
        let total = AtomicU32::new(0);
        for round in 0..50u32 {
            let mut graph = TaskGraph::new();
            let write = graph.add_node("write", || {
                total.fetch_add(1, Ordering::SeqCst);
            });
            let check = graph.add_node("check", || {
                assert_eq!(total.load(Ordering::SeqCst), round + 1);
            });
            graph.add_edge(write, check);
            graph.run(&pool).unwrap();
        }
        assert_eq!(total.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = TaskGraph::new();
        let a = graph.add_node("a", || {});
        let b = graph.add_node("b", || {});
        let free = graph.add_node("free", || {});
        graph.add_edge(a, b);
        graph.add_edge(b, a);
        let _ = free;

        let err = graph.run(&pool()).unwrap_err();
        match err {
            EcsError::OrderingCycle { mut stuck } => {
                stuck.sort();
                assert_eq!(stuck, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
