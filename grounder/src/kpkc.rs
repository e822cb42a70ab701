use crate::consistency::StaticConsistencyGraph;
use fixedbitset::FixedBitSet;
use vega_collections::Idx;
use vega_formalism::Object;

/// Reusable scratch for k-clique enumeration: one candidate mask per
/// recursion level plus the binding under construction.
#[derive(Default)]
pub struct KpkcWorkspace {
    /// Vertices still viable under the current fluent/derived facts. Starts
    /// all-ones after [`KpkcWorkspace::prepare`]; callers clear bits to prune.
    pub vertex_mask: FixedBitSet,
    allowed: Vec<FixedBitSet>,
    binding: Vec<Idx<Object>>,
}

impl KpkcWorkspace {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sizes the scratch for `graph` and resets the vertex mask to all-ones.
    pub fn prepare(&mut self, graph: &StaticConsistencyGraph) {
        let k = graph.num_partitions();
        self.vertex_mask.clear();
        self.vertex_mask.grow(graph.num_vertices);
        self.vertex_mask.insert_range(..);
        self.allowed.resize_with(k + 1, FixedBitSet::new);
        self.binding.clear();
    }
}

/// Enumerates every k-clique of the graph that survives the vertex mask, one
/// vertex per partition.
///
/// Enumeration is canonical: partitions in parameter order, vertices in
/// object-index order, so two runs over the same graph and mask emit the same
/// bindings in the same sequence. A graph whose ground static literals
/// already failed has no cliques; a 0-partition graph has exactly the empty
/// clique.
pub fn enumerate_cliques(
    graph: &StaticConsistencyGraph,
    ws: &mut KpkcWorkspace,
    emit: &mut dyn FnMut(&[Idx<Object>]),
) {
    if !graph.nullary_consistent {
        return;
    }
    let k = graph.num_partitions();
    if k == 0 {
        emit(&[]);
        return;
    }
    ws.allowed[0].clone_from(&ws.vertex_mask);
    ws.binding.clear();
    recurse(graph, &mut ws.allowed, &mut ws.binding, 0, emit);
}

fn recurse(
    graph: &StaticConsistencyGraph,
    allowed: &mut Vec<FixedBitSet>,
    binding: &mut Vec<Idx<Object>>,
    level: usize,
    emit: &mut dyn FnMut(&[Idx<Object>]),
) {
    let k = graph.num_partitions();
    for v in graph.vertex_range(level) {
        if !allowed[level].contains(v) {
            continue;
        }
        binding.push(graph.partitions[level][v - graph.offsets[level]]);
        if level + 1 == k {
            emit(binding);
        } else {
            let (head, tail) = allowed.split_at_mut(level + 1);
            tail[0].clone_from(&head[level]);
            tail[0].intersect_with(&graph.adjacency[v]);
            recurse(graph, allowed, binding, level + 1, emit);
        }
        binding.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a bare graph without going through a repository.
    fn graph(partitions: Vec<Vec<u32>>, edges: &[(usize, usize)]) -> StaticConsistencyGraph {
        let partitions: Vec<Vec<Idx<Object>>> = partitions
            .into_iter()
            .map(|p| p.into_iter().map(Idx::new).collect())
            .collect();
        let mut offsets = Vec::new();
        let mut num_vertices = 0;
        for p in &partitions {
            offsets.push(num_vertices);
            num_vertices += p.len();
        }
        let mut adjacency = vec![FixedBitSet::with_capacity(num_vertices); num_vertices];
        for &(v, w) in edges {
            adjacency[v].insert(w);
            adjacency[w].insert(v);
        }
        StaticConsistencyGraph {
            partitions,
            offsets,
            num_vertices,
            adjacency,
            nullary_consistent: true,
        }
    }

    fn collect(graph: &StaticConsistencyGraph) -> Vec<Vec<u32>> {
        let mut ws = KpkcWorkspace::new();
        ws.prepare(graph);
        let mut out = Vec::new();
        enumerate_cliques(graph, &mut ws, &mut |clique| {
            out.push(clique.iter().map(|o| o.raw()).collect());
        });
        out
    }

    #[test]
    fn enumerates_all_consistent_cliques_in_order() {
        // Partition 0: vertices 0(a) 1(b); partition 1: vertices 2(c) 3(d).
        // a-c, a-d, b-d are consistent.
        let g = graph(vec![vec![10, 11], vec![20, 21]], &[(0, 2), (0, 3), (1, 3)]);
        assert_eq!(collect(&g), vec![vec![10, 20], vec![10, 21], vec![11, 21]]);
    }

    #[test]
    fn three_partitions_require_mutual_edges() {
        // Triangle needed across three singleton partitions.
        let complete = graph(vec![vec![1], vec![2], vec![3]], &[(0, 1), (0, 2), (1, 2)]);
        assert_eq!(collect(&complete), vec![vec![1, 2, 3]]);

        let missing = graph(vec![vec![1], vec![2], vec![3]], &[(0, 1), (0, 2)]);
        assert!(collect(&missing).is_empty());
    }

    #[test]
    fn vertex_mask_prunes() {
        let g = graph(vec![vec![10, 11], vec![20]], &[(0, 2), (1, 2)]);
        let mut ws = KpkcWorkspace::new();
        ws.prepare(&g);
        ws.vertex_mask.set(0, false);
        let mut out = Vec::new();
        enumerate_cliques(&g, &mut ws, &mut |clique| {
            out.push(clique.iter().map(|o| o.raw()).collect::<Vec<_>>());
        });
        assert_eq!(out, vec![vec![11, 20]]);
    }

    #[test]
    fn zero_partitions_emit_the_empty_clique() {
        let g = graph(vec![], &[]);
        assert_eq!(collect(&g), vec![Vec::<u32>::new()]);
    }
}
