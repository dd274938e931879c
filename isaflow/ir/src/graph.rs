use crate::{
    DefinitionKind, EdgeRewriter, Family, FaultResult, GlobalId, GraphFault, GraphId,
    IndexRef, IndexedMap, Kind, Node, NodeFilter, NodeId, NodeKind, NodeState,
    Slot, StructuralPool, Type,
};
use isaflow_utils::{GPosIdx, Id, WithPos};
use itertools::Itertools;
use log::trace;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::iter::FusedIterator;

/// The definition whose behavior a graph describes. Diagnostics about the
/// graph are reported at its position.
#[derive(Clone, Debug)]
pub struct Owner {
    pub name: Id,
    pub kind: DefinitionKind,
    pub pos: GPosIdx,
}

/// A mutable directed graph of behavior nodes.
///
/// Nodes live in an arena owned by the graph and refer to each other through
/// [NodeId]s. Every node is either detached (created but not yet a member),
/// active, or deleted. Edges of active nodes always point to active nodes of
/// the same graph, and every such edge is recorded in the usages of its
/// target.
#[derive(Debug)]
pub struct Graph {
    id: GraphId,
    name: Id,
    owner: Option<Owner>,
    pub(crate) nodes: IndexedMap<NodeId, Node>,
    pool: StructuralPool,
}

impl Graph {
    pub fn new<S: Into<Id>>(name: S) -> Self {
        Self {
            id: GraphId::fresh(),
            name: name.into(),
            owner: None,
            nodes: IndexedMap::new(),
            pool: StructuralPool::default(),
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn name(&self) -> Id {
        self.name
    }

    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }

    pub fn set_owner(&mut self, owner: Owner) {
        self.owner = Some(owner)
    }

    pub fn global_id(&self, id: NodeId) -> GlobalId {
        GlobalId {
            graph: self.id,
            node: id,
        }
    }

    pub fn pool(&self) -> &StructuralPool {
        &self.pool
    }

    pub fn node(&self, id: NodeId) -> FaultResult<&Node> {
        self.nodes.get(id).ok_or(GraphFault::UnknownNode(id))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Payload of the node `id`.
    ///
    /// # Panics
    /// Panics if `id` was not created by this graph.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    pub fn is_active(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(Node::is_active)
    }

    /// Mutable access to the payload of a detached node. Active nodes can
    /// only change through the edge rewrite operations.
    pub fn kind_mut(&mut self, id: NodeId) -> FaultResult<&mut NodeKind> {
        let node = self.nodes.get_mut(id).ok_or(GraphFault::UnknownNode(id))?;
        match node.state {
            NodeState::Detached => Ok(&mut node.kind),
            NodeState::Active => Err(GraphFault::Attached(id)),
            NodeState::Deleted => Err(GraphFault::Deleted(id)),
        }
    }

    fn check_active(&self, id: NodeId) -> FaultResult<()> {
        match self.node(id)?.state {
            NodeState::Active => Ok(()),
            NodeState::Detached => Err(GraphFault::Detached(id)),
            NodeState::Deleted => Err(GraphFault::Deleted(id)),
        }
    }

    /// Check that `target` may fill `slot` of `owner`.
    fn check_slot(
        &self,
        owner: NodeId,
        slot: &Slot,
        target: Option<NodeId>,
    ) -> FaultResult<()> {
        let Some(target) = target else {
            return if slot.optional {
                Ok(())
            } else {
                Err(GraphFault::MissingInput {
                    node: owner,
                    slot: slot.name,
                })
            };
        };
        let node = self.node(target)?;
        if node.is_deleted() {
            return Err(GraphFault::Deleted(target));
        }
        let found = node.kind.kind();
        if !found.is_a(slot.family) {
            return Err(GraphFault::TypeMismatch {
                node: owner,
                slot: slot.name,
                expected: slot.family,
                found,
            });
        }
        Ok(())
    }

    // ============ Adding and removing nodes ============

    /// Create a detached node. It becomes a member of the graph once it is
    /// passed to [Graph::attach].
    pub fn detached<K: Into<NodeKind>>(&mut self, kind: K) -> NodeId {
        self.nodes.push(Node::detached(kind.into()))
    }

    /// Create a node and attach it. See [Graph::attach].
    pub fn add<K: Into<NodeKind>>(&mut self, kind: K) -> FaultResult<NodeId> {
        let id = self.detached(kind);
        self.attach(id)
    }

    /// Make the detached node `id` a member of the graph and return the node
    /// that represents it.
    ///
    /// Detached inputs and successors are attached first. A unique node
    /// structurally equal to an active node of the graph is discarded and
    /// the existing node is returned instead. Attaching an active node
    /// returns it unchanged.
    pub fn attach(&mut self, id: NodeId) -> FaultResult<NodeId> {
        self.attach_resolving(id, &mut HashMap::new())
    }

    /// [Graph::attach], recording in `resolved` the node that now represents
    /// every detached node reached. A detached node shared by several slots
    /// is attached once and every slot receives the same representative.
    fn attach_resolving(
        &mut self,
        id: NodeId,
        resolved: &mut HashMap<NodeId, NodeId>,
    ) -> FaultResult<NodeId> {
        self.attach_rec(id, &mut HashSet::new(), resolved)
    }

    fn attach_rec(
        &mut self,
        id: NodeId,
        visiting: &mut HashSet<NodeId>,
        resolved: &mut HashMap<NodeId, NodeId>,
    ) -> FaultResult<NodeId> {
        if let Some(&rep) = resolved.get(&id) {
            return Ok(rep);
        }
        let node = self.node(id)?;
        match node.state {
            NodeState::Active => return Ok(id),
            NodeState::Deleted => return Err(GraphFault::Deleted(id)),
            NodeState::Detached => {}
        }
        if !visiting.insert(id) {
            return Err(GraphFault::Cycle(id));
        }
        let inputs = node.kind.input_slots();
        let successors = node.kind.successor_slots();
        for slot in inputs.iter().chain(&successors) {
            let target = slot.target.map(|t| *resolved.get(&t).unwrap_or(&t));
            self.check_slot(id, slot, target)?;
        }

        let mut attached_inputs = Vec::with_capacity(inputs.len());
        for slot in &inputs {
            attached_inputs.push(match slot.target {
                Some(t) => Some(self.attach_rec(t, visiting, resolved)?),
                None => None,
            });
        }
        let mut attached_successors = Vec::with_capacity(successors.len());
        for slot in &successors {
            attached_successors.push(match slot.target {
                Some(t) => Some(self.attach_rec(t, visiting, resolved)?),
                None => None,
            });
        }
        visiting.remove(&id);

        let kind = &mut self.nodes[id].kind;
        kind.assign_inputs(attached_inputs);
        kind.assign_successors(attached_successors);

        if kind.kind().is_unique() {
            if let Some(pooled) = self.pooled(&self.nodes[id].kind) {
                trace!("{}: {id} deduplicated to {pooled}", self.name);
                self.nodes[id].state = NodeState::Deleted;
                resolved.insert(id, pooled);
                return Ok(pooled);
            }
            self.pool.insert(self.nodes[id].kind.clone(), id);
        }

        let node = &mut self.nodes[id];
        node.state = NodeState::Active;
        node.graph = Some(self.id);
        for target in node.kind.edges() {
            self.nodes[target].usages.push(id);
        }
        resolved.insert(id, id);
        trace!("{}: attached {id} ({})", self.name, self.nodes[id].kind.kind());
        Ok(id)
    }

    /// The canonical node for `kind`, if the pool entry is still live and
    /// matches. Stale entries count as misses.
    fn pooled(&self, kind: &NodeKind) -> Option<NodeId> {
        self.pool.get(kind).filter(|&p| {
            self.nodes
                .get(p)
                .is_some_and(|n| n.is_active() && &n.kind == kind)
        })
    }

    fn remove_usage(&mut self, target: NodeId, user: NodeId) {
        let usages = &mut self.nodes[target].usages;
        if let Some(pos) = usages.iter().position(|u| *u == user) {
            usages.remove(pos);
        }
    }

    /// Delete a node that has no users. Its own edges are unregistered from
    /// their targets.
    pub fn delete(&mut self, id: NodeId) -> FaultResult<()> {
        let node = self.node(id)?;
        if node.is_deleted() {
            return Err(GraphFault::Deleted(id));
        }
        if !node.usages.is_empty() {
            return Err(GraphFault::HasUsages {
                node: id,
                users: node.usages.to_vec(),
            });
        }
        if node.is_active() {
            let kind = node.kind.clone();
            for target in kind.edges() {
                self.remove_usage(target, id);
            }
            if kind.kind().is_unique() {
                self.pool.remove(&kind, id);
            }
        }
        let node = &mut self.nodes[id];
        node.state = NodeState::Deleted;
        node.graph = None;
        trace!("{}: deleted {id} ({})", self.name, node.kind.kind());
        Ok(())
    }

    /// Redirect every input and successor edge pointing to `old` to `new`,
    /// then delete `old`. `new` is attached first; if that yields `old`
    /// itself nothing happens. Returns the node that replaced `old`.
    pub fn replace_and_delete(
        &mut self,
        old: NodeId,
        new: NodeId,
    ) -> FaultResult<NodeId> {
        self.check_active(old)?;
        let new = self.attach(new)?;
        if new == old {
            return Ok(old);
        }
        if self.reaches(new, old) {
            return Err(GraphFault::SelfReplacement { old, new });
        }

        let users = self.users(old);
        let found = self.nodes[new].kind.kind();
        for &user in &users {
            let kind = &self.nodes[user].kind;
            for slot in kind.input_slots().iter().chain(&kind.successor_slots()) {
                if slot.target == Some(old) && !found.is_a(slot.family) {
                    return Err(GraphFault::TypeMismatch {
                        node: user,
                        slot: slot.name,
                        expected: slot.family,
                        found,
                    });
                }
            }
        }

        let swap = |t: Option<NodeId>| if t == Some(old) { Some(new) } else { t };
        for &user in &users {
            let kind = &mut self.nodes[user].kind;
            let inputs = kind.inputs().into_iter().map(swap).collect_vec();
            let successors = kind.successors().into_iter().map(swap).collect_vec();
            kind.assign_inputs(inputs);
            kind.assign_successors(successors);
        }
        let moved = std::mem::take(&mut self.nodes[old].usages);
        self.nodes[new].usages.extend(moved);
        trace!("{}: replacing {old} with {new}", self.name);
        self.delete(old)?;
        Ok(new)
    }

    // ============ Edge rewrites ============

    /// Replace every input edge target of `owner` by the output of
    /// `rewriter`. All new targets are validated before the node changes.
    /// Returns whether an edge changed.
    pub fn apply_input_rewrite<R>(
        &mut self,
        owner: NodeId,
        rewriter: &mut R,
    ) -> FaultResult<bool>
    where
        R: EdgeRewriter + ?Sized,
    {
        self.check_active(owner)?;
        let slots = self.nodes[owner].kind.input_slots();
        let graph: &Graph = self;
        let targets = slots
            .iter()
            .map(|s| rewriter.rewrite(graph, owner, s.target))
            .collect_vec();
        self.retarget(owner, &slots, targets, false)
    }

    /// Control-flow variant of [Graph::apply_input_rewrite].
    pub fn apply_successor_rewrite<R>(
        &mut self,
        owner: NodeId,
        rewriter: &mut R,
    ) -> FaultResult<bool>
    where
        R: EdgeRewriter + ?Sized,
    {
        self.check_active(owner)?;
        let slots = self.nodes[owner].kind.successor_slots();
        let graph: &Graph = self;
        let targets = slots
            .iter()
            .map(|s| rewriter.rewrite(graph, owner, s.target))
            .collect_vec();
        self.retarget(owner, &slots, targets, true)
    }

    /// Point every input edge of `owner` that targets `old` to `new`.
    pub fn replace_input(
        &mut self,
        owner: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> FaultResult<bool> {
        self.apply_input_rewrite(
            owner,
            &mut |_: &Graph, _: NodeId, t: Option<NodeId>| {
                if t == Some(old) { Some(new) } else { t }
            },
        )
    }

    fn retarget(
        &mut self,
        owner: NodeId,
        slots: &[Slot],
        targets: Vec<Option<NodeId>>,
        successors: bool,
    ) -> FaultResult<bool> {
        for (slot, target) in slots.iter().zip(&targets) {
            if slot.target != *target {
                self.check_slot(owner, slot, *target)?;
            }
        }
        let mut resolved = Vec::with_capacity(targets.len());
        for (slot, target) in slots.iter().zip(targets) {
            resolved.push(match target {
                Some(t) if slot.target != Some(t) => Some(self.attach(t)?),
                t => t,
            });
        }
        let mut changed = false;
        for (slot, target) in slots.iter().zip(&resolved) {
            if slot.target == *target {
                continue;
            }
            changed = true;
            if let Some(old) = slot.target {
                self.remove_usage(old, owner);
            }
            if let Some(new) = target {
                self.nodes[*new].usages.push(owner);
            }
        }
        if changed {
            let kind = &mut self.nodes[owner].kind;
            if successors {
                kind.assign_successors(resolved);
            } else {
                kind.assign_inputs(resolved);
            }
            trace!("{}: rewrote edges of {owner}", self.name);
        }
        Ok(changed)
    }

    // ============ Queries ============

    /// One entry per edge pointing to `id`.
    pub fn usages(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].usages
    }

    /// Distinct nodes with an edge to `id`, in the order they started using
    /// it.
    pub fn users(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id].usages.iter().copied().unique().collect()
    }

    pub fn inputs(&self, id: NodeId) -> Vec<Option<NodeId>> {
        self.nodes[id].kind.inputs()
    }

    pub fn successors(&self, id: NodeId) -> Vec<Option<NodeId>> {
        self.nodes[id].kind.successors()
    }

    /// The control node whose successor edge points to `id`.
    pub fn predecessor(&self, id: NodeId) -> Option<NodeId> {
        self.users(id)
            .into_iter()
            .find(|u| self.nodes[*u].kind.successors().contains(&Some(id)))
    }

    /// Active nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, n)| n.is_active())
            .map(|(id, _)| id)
    }

    /// Active nodes matching `filter`, in creation order.
    pub fn nodes_of<F: Into<NodeFilter>>(&self, filter: F) -> NodesOf<'_> {
        NodesOf {
            graph: self,
            next: 0,
            filter: filter.into(),
        }
    }

    /// The active nodes at this point. Iterating a snapshot stays valid while
    /// the graph is mutated, but nodes in it may have been deleted since.
    pub fn snapshot(&self) -> Vec<NodeId> {
        self.nodes().collect()
    }

    /// The only active node matching `filter`, if there is exactly one.
    pub fn single_node_of<F: Into<NodeFilter>>(&self, filter: F) -> Option<NodeId> {
        let mut matches = self.nodes_of(filter);
        let first = matches.next()?;
        matches.next().is_none().then_some(first)
    }

    pub fn start(&self) -> Option<NodeId> {
        self.single_node_of(Kind::Start)
    }

    /// Terminal nodes of the graph.
    pub fn ends(&self) -> Vec<NodeId> {
        self.nodes_of(Family::Terminal).collect()
    }

    /// Number of active nodes.
    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes().next().is_none()
    }

    /// Value type produced by `id`, looking through `Let` bindings.
    pub fn type_of(&self, id: NodeId) -> Option<Type> {
        let mut cur = id;
        loop {
            match &self.nodes.get(cur)?.kind {
                NodeKind::Let(l) => cur = l.value,
                kind => return kind.declared_type(),
            }
        }
    }

    /// Whether `to` can be reached from `from` along input and successor
    /// edges.
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(cur) = stack.pop() {
            if cur == to {
                return true;
            }
            if seen.insert(cur) {
                if let Some(node) = self.nodes.get(cur) {
                    stack.extend(node.kind.edges());
                }
            }
        }
        false
    }

    // ============ Copying ============

    /// Deep copy of `id` and every node reachable through its inputs. The
    /// copies are detached and have no successors.
    pub fn copy(&mut self, id: NodeId) -> FaultResult<NodeId> {
        self.copy_rec(id, &mut HashMap::new(), &mut HashSet::new())
    }

    fn copy_rec(
        &mut self,
        id: NodeId,
        memo: &mut HashMap<NodeId, NodeId>,
        visiting: &mut HashSet<NodeId>,
    ) -> FaultResult<NodeId> {
        if let Some(copied) = memo.get(&id) {
            return Ok(*copied);
        }
        let node = self.node(id)?;
        if node.is_deleted() {
            return Err(GraphFault::Deleted(id));
        }
        if !visiting.insert(id) {
            return Err(GraphFault::Cycle(id));
        }
        let mut kind = node.kind.clone();
        let mut inputs = Vec::new();
        for input in kind.inputs() {
            inputs.push(match input {
                Some(t) => Some(self.copy_rec(t, memo, visiting)?),
                None => None,
            });
        }
        kind.assign_inputs(inputs);
        kind.clear_successors();
        let copied = self.detached(kind);
        memo.insert(id, copied);
        Ok(copied)
    }

    /// Detached copy of `id` with the same edge targets.
    pub fn shallow_copy(&mut self, id: NodeId) -> FaultResult<NodeId> {
        let node = self.node(id)?;
        if node.is_deleted() {
            return Err(GraphFault::Deleted(id));
        }
        let kind = node.kind.clone();
        Ok(self.detached(kind))
    }

    /// Copy the active nodes into a fresh graph with the same name and owner.
    /// The structural pool of the copy is rebuilt from its nodes.
    pub fn copy_graph(&self) -> Graph {
        let mut dst = Graph {
            id: GraphId::fresh(),
            name: self.name,
            owner: self.owner.clone(),
            nodes: IndexedMap::with_capacity(self.nodes.len()),
            pool: StructuralPool::default(),
        };

        let mut map = HashMap::new();
        for (id, node) in self.nodes.iter().filter(|(_, n)| n.is_active()) {
            let copied = dst.nodes.push(Node {
                kind: node.kind.clone(),
                state: NodeState::Active,
                graph: Some(dst.id),
                usages: SmallVec::new(),
            });
            map.insert(id, copied);
        }

        let remap = |t: Option<NodeId>| t.and_then(|t| map.get(&t).copied());
        for id in dst.nodes.keys() {
            let kind = &mut dst.nodes[id].kind;
            let inputs = kind.inputs().into_iter().map(remap).collect_vec();
            let successors = kind.successors().into_iter().map(remap).collect_vec();
            kind.assign_inputs(inputs);
            kind.assign_successors(successors);
            for target in dst.nodes[id].kind.edges() {
                dst.nodes[target].usages.push(id);
            }
            let kind = &dst.nodes[id].kind;
            if kind.kind().is_unique() && dst.pool.get(kind).is_none() {
                dst.pool.insert(kind.clone(), id);
            }
        }
        dst
    }

    /// Copy `root` and its input closure into `dst` and attach the copy.
    ///
    /// `map` is consulted before copying a node, so entries mapping nodes of
    /// this graph to active nodes of `dst` substitute them. The attached
    /// copies are recorded in `map`, after deduplication against `dst`.
    pub fn copy_into(
        &self,
        root: NodeId,
        dst: &mut Graph,
        map: &mut HashMap<NodeId, NodeId>,
    ) -> FaultResult<NodeId> {
        let copied = self.copy_into_rec(root, dst, map, &mut HashSet::new())?;
        let mut resolved = HashMap::new();
        let attached = dst.attach_resolving(copied, &mut resolved)?;
        for target in map.values_mut() {
            if let Some(&rep) = resolved.get(target) {
                *target = rep;
            }
        }
        Ok(attached)
    }

    fn copy_into_rec(
        &self,
        id: NodeId,
        dst: &mut Graph,
        map: &mut HashMap<NodeId, NodeId>,
        visiting: &mut HashSet<NodeId>,
    ) -> FaultResult<NodeId> {
        if let Some(copied) = map.get(&id) {
            return Ok(*copied);
        }
        let node = self.node(id)?;
        if node.is_deleted() {
            return Err(GraphFault::Deleted(id));
        }
        if !visiting.insert(id) {
            return Err(GraphFault::Cycle(id));
        }
        let mut kind = node.kind.clone();
        let mut inputs = Vec::new();
        for input in kind.inputs() {
            inputs.push(match input {
                Some(t) => Some(self.copy_into_rec(t, dst, map, visiting)?),
                None => None,
            });
        }
        kind.assign_inputs(inputs);
        kind.clear_successors();
        let copied = dst.detached(kind);
        map.insert(id, copied);
        Ok(copied)
    }
}

impl WithPos for Graph {
    fn copy_span(&self) -> GPosIdx {
        self.owner.as_ref().map_or(GPosIdx::UNKNOWN, |o| o.pos)
    }
}

/// Iterator over the active nodes of a graph matching a [NodeFilter].
pub struct NodesOf<'a> {
    graph: &'a Graph,
    next: usize,
    filter: NodeFilter,
}

impl Iterator for NodesOf<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = NodeId::new(self.next);
            let node = self.graph.nodes.get(id)?;
            self.next += 1;
            if node.is_active() && self.filter.matches(node.kind.kind()) {
                return Some(id);
            }
        }
    }
}

impl FusedIterator for NodesOf<'_> {}
