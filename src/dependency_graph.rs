//! Dynamic precedence graph: raw precedence/late-part/rework tables
//! expanded per-product, QI-redirected, and validated for acyclicity.
//!
//! Dual id/index maps plus a `toposort`-based cycle check over a concrete
//! [`NodeKey`] graph, rather than a generic `Task<A>` node type — this
//! domain only ever has one node shape.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::error::{CoreError, LoadWarning};
use crate::model::{
    CoreInput, EdgeOrigin, NodeKey, PrecedenceEdge, Relation, TaskInstance, TaskKind,
};

/// The dynamic dependency graph plus its id <-> index mapping.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: StableGraph<NodeKey, PrecedenceEdge>,
    index_of: HashMap<NodeKey, NodeIndex>,
}

impl DependencyGraph {
    /// Builds the dynamic edge set over `instances` and validates
    /// acyclicity. Returns unreachable-instance warnings alongside a
    /// successful build; returns [`CoreError::Cycle`] if the graph is not
    /// acyclic.
    pub fn build(
        input: &CoreInput,
        instances: &HashMap<NodeKey, TaskInstance>,
    ) -> Result<(Self, Vec<LoadWarning>), CoreError> {
        let edges = build_edge_set(input, instances);

        let mut graph = StableGraph::new();
        let mut index_of = HashMap::new();
        for &key in instances.keys() {
            let idx = graph.add_node(key);
            index_of.insert(key, idx);
        }
        for edge in &edges {
            if let (Some(&from), Some(&to)) = (index_of.get(&edge.from), index_of.get(&edge.to)) {
                graph.add_edge(from, to, *edge);
            }
        }

        let mut this = Self { graph, index_of };
        if let Err(cycle) = this.topo_order() {
            return Err(cycle);
        }

        let warnings = this.unreachable_warnings(input);
        Ok((this, warnings))
    }

    fn unreachable_warnings(&self, input: &CoreInput) -> Vec<LoadWarning> {
        let roots = self.roots();
        let mut reachable: HashSet<NodeKey> = HashSet::new();
        let mut stack: Vec<NodeKey> = roots;
        while let Some(node) = stack.pop() {
            if !reachable.insert(node) {
                continue;
            }
            stack.extend(self.successors(node));
        }

        self.index_of
            .keys()
            .copied()
            .filter(|k| !reachable.contains(k))
            .filter_map(|k| {
                input.product_by_index(k.product).map(|p| LoadWarning::UnreachableInstance {
                    product: p.product_id.clone(),
                    task_num: k.task_num,
                })
            })
            .collect()
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.index_of.contains_key(&key)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Topological order over the dynamic graph, or the full cycle as a
    /// [`CoreError::Cycle`] if one exists.
    pub fn topo_order(&self) -> Result<Vec<NodeKey>, CoreError> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order.into_iter().map(|idx| self.graph[idx]).collect()),
            Err(cycle) => Err(CoreError::Cycle(self.reconstruct_cycle(cycle.node_id()))),
        }
    }

    /// Topological order in reverse, used to compute critical-path
    /// remainder without recursion.
    pub fn reverse_topo_order(&self) -> Result<Vec<NodeKey>, CoreError> {
        let mut order = self.topo_order()?;
        order.reverse();
        Ok(order)
    }

    /// DFS from `start` tracking the current path; the first back edge
    /// found to a node still on the path closes the cycle.
    fn reconstruct_cycle(&self, start: NodeIndex) -> Vec<NodeKey> {
        let mut on_stack: HashSet<NodeIndex> = HashSet::new();
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut path: Vec<NodeIndex> = Vec::new();

        fn dfs(
            graph: &StableGraph<NodeKey, PrecedenceEdge>,
            node: NodeIndex,
            path: &mut Vec<NodeIndex>,
            on_stack: &mut HashSet<NodeIndex>,
            visited: &mut HashSet<NodeIndex>,
        ) -> Option<Vec<NodeIndex>> {
            path.push(node);
            on_stack.insert(node);
            visited.insert(node);

            for next in graph.neighbors_directed(node, Direction::Outgoing) {
                if on_stack.contains(&next) {
                    let start_pos = path.iter().position(|&n| n == next).unwrap();
                    let mut cycle = path[start_pos..].to_vec();
                    cycle.push(next);
                    return Some(cycle);
                }
                if !visited.contains(&next) {
                    if let Some(cycle) = dfs(graph, next, path, on_stack, visited) {
                        return Some(cycle);
                    }
                }
            }

            path.pop();
            on_stack.remove(&node);
            None
        }

        let cycle = dfs(&self.graph, start, &mut path, &mut on_stack, &mut visited)
            .unwrap_or_else(|| vec![start]);
        cycle.into_iter().map(|idx| self.graph[idx]).collect()
    }

    pub fn roots(&self) -> Vec<NodeKey> {
        self.graph
            .node_indices()
            .filter(|&n| {
                self.graph
                    .neighbors_directed(n, Direction::Incoming)
                    .count()
                    == 0
            })
            .map(|n| self.graph[n])
            .collect()
    }

    pub fn predecessors(&self, key: NodeKey) -> Vec<NodeKey> {
        let Some(&idx) = self.index_of.get(&key) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| self.graph[n])
            .collect()
    }

    pub fn successors(&self, key: NodeKey) -> Vec<NodeKey> {
        let Some(&idx) = self.index_of.get(&key) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n])
            .collect()
    }

    pub fn in_edges(&self, key: NodeKey) -> Vec<PrecedenceEdge> {
        let Some(&idx) = self.index_of.get(&key) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| *e.weight())
            .collect()
    }

    pub fn out_degree(&self, key: NodeKey) -> usize {
        self.index_of
            .get(&key)
            .map(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Outgoing)
                    .count()
            })
            .unwrap_or(0)
    }
}

/// Builds the dynamic edge set (baseline precedence, late-part gating,
/// rework, then QI redirection), filtering out any edge whose endpoints are
/// not both live instances.
fn build_edge_set(
    input: &CoreInput,
    instances: &HashMap<NodeKey, TaskInstance>,
) -> Vec<PrecedenceEdge> {
    let mut edges = Vec::new();
    let mut seen = HashSet::new();
    let mut push_edge = |edges: &mut Vec<PrecedenceEdge>, edge: PrecedenceEdge| {
        if instances.contains_key(&edge.from)
            && instances.contains_key(&edge.to)
            && seen.insert((edge.from, edge.to, edge.relation))
        {
            edges.push(edge);
        }
    };

    let qi_of = |primary: NodeKey| -> Option<NodeKey> {
        let candidate = primary.qi_key();
        instances
            .get(&candidate)
            .filter(|i| i.primary_task_ref == Some(primary))
            .map(|_| candidate)
    };

    // Step 1: baseline precedence, per product, QI-redirected.
    for raw in &input.precedence_edges {
        for (product_index, _product) in input.products.iter().enumerate() {
            let product_index = product_index as u32;
            let from = NodeKey::new(product_index, raw.first);
            let to = NodeKey::new(product_index, raw.second);
            if !instances.contains_key(&from) || !instances.contains_key(&to) {
                continue;
            }
            emit_possibly_redirected(&mut push_edge, &mut edges, from, to, raw.relation, &qi_of, EdgeOrigin::Baseline);
        }
    }

    // Step 2: late-part gating edges (tight F<=S onto the dependent).
    for (&key, instance) in instances {
        if instance.kind != TaskKind::LatePart {
            continue;
        }
        // Find the constraint row(s) this instance satisfies to know its
        // dependent task number(s).
        for lp in &input.late_parts {
            if lp.first != key.task_num {
                continue;
            }
            let dependent = NodeKey::new(key.product, lp.second);
            if instances.contains_key(&dependent) {
                push_edge(
                    &mut edges,
                    PrecedenceEdge {
                        from: key,
                        to: dependent,
                        relation: Relation::FinishLeqStart,
                        origin: EdgeOrigin::LatePart,
                    },
                );
            }
        }
    }

    // Step 3: rework edges, QI-redirected like baseline.
    for (&key, instance) in instances {
        if instance.kind != TaskKind::Rework {
            continue;
        }
        for rw in &input.rework {
            if rw.first != key.task_num {
                continue;
            }
            let successor = NodeKey::new(key.product, rw.second);
            if instances.contains_key(&successor) {
                emit_possibly_redirected(
                    &mut push_edge,
                    &mut edges,
                    key,
                    successor,
                    rw.relation,
                    &qi_of,
                    EdgeOrigin::Rework,
                );
            }
        }
    }

    // Step 4: ensure every QI companion has its primary -> QI edge, even if
    // no baseline/rework constraint happened to reference the primary task.
    for (&key, instance) in instances {
        if let Some(primary) = instance.primary_task_ref {
            push_edge(
                &mut edges,
                PrecedenceEdge {
                    from: primary,
                    to: key,
                    relation: Relation::FinishEqStart,
                    origin: EdgeOrigin::Quality,
                },
            );
        }
    }

    edges
}

fn emit_possibly_redirected(
    push_edge: &mut impl FnMut(&mut Vec<PrecedenceEdge>, PrecedenceEdge),
    edges: &mut Vec<PrecedenceEdge>,
    from: NodeKey,
    to: NodeKey,
    relation: Relation,
    qi_of: &impl Fn(NodeKey) -> Option<NodeKey>,
    origin: EdgeOrigin,
) {
    match qi_of(from) {
        Some(qi) => {
            push_edge(
                edges,
                PrecedenceEdge {
                    from,
                    to: qi,
                    relation: Relation::FinishEqStart,
                    origin: EdgeOrigin::Quality,
                },
            );
            push_edge(
                edges,
                PrecedenceEdge {
                    from: qi,
                    to,
                    relation,
                    origin,
                },
            );
        }
        None => push_edge(edges, PrecedenceEdge { from, to, relation, origin }),
    }
}
