//! Execution order of a composite's children.

use crate::error::{ChainError, Result};
use crate::process::id::ComponentId;
use std::collections::VecDeque;

/// Children of one composite in dependency order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Child indices in topological order
    pub order: Vec<ComponentId>,

    /// Direct consumers of each child, indexed by child
    pub downstream: Vec<Vec<ComponentId>>,

    /// Planning statistics
    pub stats: PlanStats,
}

/// Statistics about the computed plan
#[derive(Debug, Clone, Default)]
pub struct PlanStats {
    /// Number of children
    pub components: usize,

    /// Number of child-to-child links
    pub links: usize,

    /// Children no other child feeds
    pub sources: usize,

    /// Children feeding no other child
    pub sinks: usize,

    /// Planning time in microseconds
    pub compile_time_us: u64,
}

impl ExecutionPlan {
    /// Order `names.len()` children given `(producer, consumer)` edges.
    ///
    /// Fails with `CyclicGraph` naming one offending cycle.
    pub fn compute(names: &[&str], edges: &[(ComponentId, ComponentId)]) -> Result<Self> {
        let start_time = std::time::Instant::now();
        let n = names.len();

        let (fwd_adj, bwd_adj) = Self::build_adjacency(n, edges);
        let order = Self::topological_sort(n, &fwd_adj, &bwd_adj);

        if order.len() < n {
            let path = Self::cycle_path(names, &order, &bwd_adj);
            tracing::debug!("Cycle among children: {}", path);
            return Err(ChainError::CyclicGraph { path });
        }

        let mut downstream: Vec<Vec<ComponentId>> = fwd_adj
            .iter()
            .map(|targets| targets.iter().map(|&t| ComponentId(t as u32)).collect())
            .collect();
        for targets in &mut downstream {
            targets.sort();
            targets.dedup();
        }

        let stats = PlanStats {
            components: n,
            links: edges.len(),
            sources: bwd_adj.iter().filter(|preds| preds.is_empty()).count(),
            sinks: fwd_adj.iter().filter(|succs| succs.is_empty()).count(),
            compile_time_us: start_time.elapsed().as_micros() as u64,
        };

        Ok(Self {
            order: order.into_iter().map(|i| ComponentId(i as u32)).collect(),
            downstream,
            stats,
        })
    }

    /// Build forward and backward adjacency lists
    fn build_adjacency(
        n: usize,
        edges: &[(ComponentId, ComponentId)],
    ) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
        let mut fwd_adj = vec![Vec::new(); n];
        let mut bwd_adj = vec![Vec::new(); n];

        for (from, to) in edges {
            let (from, to) = (from.index(), to.index());
            if from >= n || to >= n {
                continue;
            }
            fwd_adj[from].push(to);
            bwd_adj[to].push(from);
        }

        (fwd_adj, bwd_adj)
    }

    /// Kahn's algorithm. Ties are broken by insertion order.
    fn topological_sort(n: usize, fwd_adj: &[Vec<usize>], bwd_adj: &[Vec<usize>]) -> Vec<usize> {
        let mut in_degree: Vec<usize> = bwd_adj.iter().map(Vec::len).collect();
        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut result = Vec::with_capacity(n);

        while let Some(node) = queue.pop_front() {
            result.push(node);

            for &neighbor in &fwd_adj[node] {
                in_degree[neighbor] -= 1;
                if in_degree[neighbor] == 0 {
                    queue.push_back(neighbor);
                }
            }
        }

        result
    }

    /// Render one cycle among the children Kahn's algorithm could not order.
    ///
    /// Every unordered child has an unordered predecessor, so walking
    /// predecessors from any of them must revisit a node.
    fn cycle_path(names: &[&str], ordered: &[usize], bwd_adj: &[Vec<usize>]) -> String {
        let mut remaining = vec![true; names.len()];
        for &i in ordered {
            remaining[i] = false;
        }

        let Some(mut current) = remaining.iter().position(|&r| r) else {
            return String::new();
        };
        let mut walk: Vec<usize> = Vec::new();
        let cycle = loop {
            if let Some(pos) = walk.iter().position(|&v| v == current) {
                break walk.split_off(pos);
            }
            walk.push(current);
            match bwd_adj[current].iter().find(|&&p| remaining[p]) {
                Some(&pred) => current = pred,
                None => break walk,
            }
        };

        // Walked backwards; render forwards starting from the earliest child.
        let mut forward: Vec<usize> = cycle.into_iter().rev().collect();
        if let Some(start) = forward
            .iter()
            .enumerate()
            .min_by_key(|(_, &v)| v)
            .map(|(pos, _)| pos)
        {
            forward.rotate_left(start);
        }

        let mut rendered: Vec<&str> = forward.iter().map(|&i| names[i]).collect();
        if let Some(&first) = rendered.first() {
            rendered.push(first);
        }
        rendered.join(" -> ")
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Position of each child in `order`.
    pub fn rank(&self) -> Vec<usize> {
        let mut rank = vec![0; self.order.len()];
        for (position, id) in self.order.iter().enumerate() {
            rank[id.index()] = position;
        }
        rank
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(i: u32) -> ComponentId {
        ComponentId(i)
    }

    #[test]
    fn test_linear_chain() {
        // c <- b <- a, inserted out of order
        let plan = ExecutionPlan::compute(&["c", "b", "a"], &[(id(2), id(1)), (id(1), id(0))]).unwrap();
        assert_eq!(plan.order, vec![id(2), id(1), id(0)]);
        assert_eq!(plan.stats.sources, 1);
        assert_eq!(plan.stats.sinks, 1);
        assert_eq!(plan.downstream[2], vec![id(1)]);
    }

    #[test]
    fn test_independent_children_keep_insertion_order() {
        let plan = ExecutionPlan::compute(&["x", "y", "z"], &[]).unwrap();
        assert_eq!(plan.order, vec![id(0), id(1), id(2)]);
        assert_eq!(plan.rank(), vec![0, 1, 2]);
    }

    #[test]
    fn test_self_loop() {
        let err = ExecutionPlan::compute(&["A"], &[(id(0), id(0))]).unwrap_err();
        match err {
            ChainError::CyclicGraph { path } => assert_eq!(path, "A -> A"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cycle_path_names_members() {
        // src -> a -> b -> c -> a
        let edges = [(id(0), id(1)), (id(1), id(2)), (id(2), id(3)), (id(3), id(1))];
        let err = ExecutionPlan::compute(&["src", "a", "b", "c"], &edges).unwrap_err();
        let ChainError::CyclicGraph { path } = err else {
            panic!("expected a cycle error");
        };
        assert_eq!(path, "a -> b -> c -> a");
    }

    #[test]
    fn test_duplicate_edges() {
        let plan = ExecutionPlan::compute(&["a", "b"], &[(id(0), id(1)), (id(0), id(1))]).unwrap();
        assert_eq!(plan.order, vec![id(0), id(1)]);
        assert_eq!(plan.downstream[0], vec![id(1)]);
        assert_eq!(plan.stats.links, 2);
    }
}
