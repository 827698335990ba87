//! Construcción y validación del grafo de tareas.
//!
//! Las aristas no se declaran: se derivan estructuralmente. Existe una
//! arista P -> C si algún kind de salida de P casa con un input declarado
//! de C (respetando la clave exacta o el comodín por kind). La validación
//! es atómica: ciclo o dependencia sin productor ni semilla invalidan el
//! grafo completo y no se entrega nada al scheduler.

use indexmap::IndexMap;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::node::{KeyMatch, NodeStatus, TaskNode};
use crate::constants::ENGINE_VERSION;
use crate::errors::EngineError;
use crate::hashing::hash_value;
use crate::model::{ArtifactId, ArtifactKind};

/// Origen concreto resuelto para un input declarado.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// El artifact lo escribe un nodo del grafo (key = id del productor).
    Producer(String),
    /// El artifact estaba sembrado en el blackboard antes de ejecutar.
    Seed(ArtifactId),
}

/// Input declarado ya resuelto contra productores y semillas.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInput {
    pub kind: ArtifactKind,
    pub sources: Vec<InputSource>,
}

#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: IndexMap<String, TaskNode>,
    /// productor -> consumidores
    edges: BTreeMap<String, BTreeSet<String>>,
    /// consumidor -> productores
    reverse: BTreeMap<String, BTreeSet<String>>,
    resolved: BTreeMap<String, Vec<ResolvedInput>>,
    definition_hash: String,
}

impl TaskGraph {
    /// Construye y valida el grafo. Falla atómicamente: ningún grafo parcial
    /// sale de acá.
    pub fn build(nodes: Vec<TaskNode>, seeds: &[ArtifactId]) -> Result<TaskGraph, EngineError> {
        let mut index: IndexMap<String, TaskNode> = IndexMap::with_capacity(nodes.len());
        for node in nodes {
            if index.insert(node.id.clone(), node.clone()).is_some() {
                return Err(EngineError::Internal(format!("duplicate node id '{}'", node.id)));
            }
        }

        let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut reverse: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut resolved: BTreeMap<String, Vec<ResolvedInput>> = BTreeMap::new();

        for (cid, consumer) in index.iter() {
            let mut inputs = Vec::with_capacity(consumer.declared_inputs.len());
            for sel in &consumer.declared_inputs {
                let mut sources = Vec::new();
                for (pid, producer) in index.iter() {
                    if !producer.declared_outputs.contains(&sel.kind) {
                        continue;
                    }
                    let matches = match &sel.key {
                        KeyMatch::AnyProducer => true,
                        KeyMatch::Exact(k) => k == pid,
                    };
                    if matches {
                        sources.push(InputSource::Producer(pid.clone()));
                        edges.entry(pid.clone()).or_default().insert(cid.clone());
                        reverse.entry(cid.clone()).or_default().insert(pid.clone());
                    }
                }
                for seed in seeds {
                    let matches = seed.kind == sel.kind
                                  && match &sel.key {
                                      KeyMatch::AnyProducer => true,
                                      KeyMatch::Exact(k) => *k == seed.key,
                                  };
                    if matches {
                        sources.push(InputSource::Seed(seed.clone()));
                    }
                }
                if sources.is_empty() {
                    return Err(EngineError::MissingDependency { node: cid.clone(),
                                                                kind: sel.kind.to_string() });
                }
                inputs.push(ResolvedInput { kind: sel.kind.clone(),
                                            sources });
            }
            resolved.insert(cid.clone(), inputs);
        }

        if let Some(path) = find_cycle(&index, &edges) {
            return Err(EngineError::CycleDetected { path });
        }

        let definition_hash = compute_definition_hash(&index, &edges)?;

        Ok(TaskGraph { nodes: index,
                       edges,
                       reverse,
                       resolved,
                       definition_hash })
    }

    pub fn node(&self, id: &str) -> Option<&TaskNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut TaskNode> {
        self.nodes.get_mut(id)
    }

    /// Ids en orden de inserción (el orden del plan es determinista).
    pub fn ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn definition_hash(&self) -> &str {
        &self.definition_hash
    }

    /// Consumidores directos de un nodo.
    pub fn dependents_of(&self, id: &str) -> BTreeSet<String> {
        self.edges.get(id).cloned().unwrap_or_default()
    }

    /// Productores directos de un nodo.
    pub fn producers_of(&self, id: &str) -> BTreeSet<String> {
        self.reverse.get(id).cloned().unwrap_or_default()
    }

    /// Clausura transitiva hacia adelante (todo lo que consumió, directa o
    /// indirectamente, la salida de `id`). No incluye a `id`.
    pub fn transitive_dependents(&self, id: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let mut frontier: Vec<String> = self.dependents_of(id).into_iter().collect();
        while let Some(next) = frontier.pop() {
            if out.insert(next.clone()) {
                frontier.extend(self.dependents_of(&next));
            }
        }
        out
    }

    pub fn resolved_inputs(&self, id: &str) -> &[ResolvedInput] {
        self.resolved.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn checkpoint_ids(&self) -> Vec<String> {
        self.nodes.values().filter(|n| n.checkpoint).map(|n| n.id.clone()).collect()
    }

    /// ¿Queda algún nodo por ejecutar o en ejecución?
    pub fn has_active_nodes(&self) -> bool {
        self.nodes.values().any(|n| matches!(n.status, NodeStatus::Pending | NodeStatus::Ready | NodeStatus::Running))
    }

    pub fn statuses(&self) -> BTreeMap<String, NodeStatus> {
        self.nodes.iter().map(|(id, n)| (id.clone(), n.status)).collect()
    }

    /// Copia del grafo con el delta reiniciado para re-ejecutarse. Los nodos
    /// afectados vuelven a `Pending` con `revision_group` incrementado; el
    /// resto conserva estado y artifacts. El grafo anterior queda intacto en
    /// manos del llamador (auditoría vía trace).
    pub(crate) fn reset_for_replan(&self, affected: &BTreeSet<String>) -> TaskGraph {
        let mut next = self.clone();
        for id in affected {
            if let Some(node) = next.nodes.get_mut(id) {
                node.status = NodeStatus::Pending;
                node.attempt = 0;
                node.revision_group += 1;
            }
        }
        next
    }
}

/// DFS con conjunto en pila; devuelve el ciclo implicado si existe.
fn find_cycle(nodes: &IndexMap<String, TaskNode>, edges: &BTreeMap<String, BTreeSet<String>>) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        White,
        OnStack,
        Done,
    }

    fn visit(id: &str,
             edges: &BTreeMap<String, BTreeSet<String>>,
             marks: &mut HashMap<String, Mark>,
             stack: &mut Vec<String>)
             -> Option<Vec<String>> {
        marks.insert(id.to_string(), Mark::OnStack);
        stack.push(id.to_string());
        if let Some(consumers) = edges.get(id) {
            for next in consumers {
                match marks.get(next).copied().unwrap_or(Mark::White) {
                    Mark::White => {
                        if let Some(cycle) = visit(next, edges, marks, stack) {
                            return Some(cycle);
                        }
                    }
                    Mark::OnStack => {
                        let start = stack.iter().position(|n| n == next).unwrap_or(0);
                        let mut path: Vec<String> = stack[start..].to_vec();
                        path.push(next.clone());
                        return Some(path);
                    }
                    Mark::Done => {}
                }
            }
        }
        stack.pop();
        marks.insert(id.to_string(), Mark::Done);
        None
    }

    let mut marks: HashMap<String, Mark> = HashMap::new();
    let mut stack: Vec<String> = Vec::new();
    for id in nodes.keys() {
        if marks.get(id).copied().unwrap_or(Mark::White) == Mark::White {
            if let Some(cycle) = visit(id, edges, &mut marks, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

fn compute_definition_hash(nodes: &IndexMap<String, TaskNode>,
                           edges: &BTreeMap<String, BTreeSet<String>>)
                           -> Result<String, EngineError> {
    let mut node_values = Vec::with_capacity(nodes.len());
    for node in nodes.values() {
        let inputs = serde_json::to_value(&node.declared_inputs)
            .map_err(|e| EngineError::Internal(format!("definition hash: {e}")))?;
        let outputs = serde_json::to_value(&node.declared_outputs)
            .map_err(|e| EngineError::Internal(format!("definition hash: {e}")))?;
        node_values.push(json!({
            "id": node.id,
            "capability": node.capability,
            "params": node.params,
            "inputs": inputs,
            "outputs": outputs,
            "optional": node.optional,
            "checkpoint": node.checkpoint,
        }));
    }
    let edge_values: BTreeMap<&String, Vec<&String>> = edges.iter()
                                                            .map(|(p, cs)| (p, cs.iter().collect()))
                                                            .collect();
    let edge_json = serde_json::to_value(&edge_values)
        .map_err(|e| EngineError::Internal(format!("definition hash: {e}")))?;
    Ok(hash_value(&json!({
           "engine_version": ENGINE_VERSION,
           "nodes": node_values,
           "edges": edge_json,
       })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::InputSelector;
    use serde_json::json;

    fn node(id: &str, inputs: Vec<InputSelector>, outputs: Vec<&str>) -> TaskNode {
        TaskNode { id: id.to_string(),
                   capability: format!("cap_{}", id),
                   declared_inputs: inputs,
                   declared_outputs: outputs.into_iter().map(ArtifactKind::new).collect(),
                   params: json!({}),
                   optional: false,
                   checkpoint: false,
                   status: NodeStatus::Pending,
                   attempt: 0,
                   revision_group: 1 }
    }

    fn kind(tag: &str) -> ArtifactKind {
        ArtifactKind::new(tag)
    }

    #[test]
    fn edges_derive_from_kind_matching() {
        let nodes = vec![node("a", vec![], vec!["x"]),
                         node("b", vec![], vec!["y"]),
                         node("c", vec![InputSelector::any(kind("x")), InputSelector::any(kind("y"))], vec!["z"])];
        let g = TaskGraph::build(nodes, &[]).unwrap();
        assert_eq!(g.dependents_of("a"), BTreeSet::from(["c".to_string()]));
        assert_eq!(g.producers_of("c"), BTreeSet::from(["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn missing_producer_without_seed_is_fatal() {
        let nodes = vec![node("c", vec![InputSelector::any(kind("x"))], vec!["z"])];
        let err = TaskGraph::build(nodes, &[]).unwrap_err();
        assert!(matches!(err, EngineError::MissingDependency { node, kind } if node == "c" && kind == "x"));
    }

    #[test]
    fn seed_satisfies_missing_producer() {
        let nodes = vec![node("c", vec![InputSelector::any(kind("x"))], vec!["z"])];
        let seeds = vec![ArtifactId::new(kind("x"), "source")];
        let g = TaskGraph::build(nodes, &seeds).unwrap();
        assert_eq!(g.producers_of("c"), BTreeSet::new());
        assert_eq!(g.resolved_inputs("c")[0].sources,
                   vec![InputSource::Seed(ArtifactId::new(kind("x"), "source"))]);
    }

    #[test]
    fn cycle_is_detected_with_path() {
        let nodes = vec![node("a", vec![InputSelector::any(kind("z"))], vec!["x"]),
                         node("b", vec![InputSelector::any(kind("x"))], vec!["y"]),
                         node("c", vec![InputSelector::any(kind("y"))], vec!["z"])];
        let err = TaskGraph::build(nodes, &[]).unwrap_err();
        match err {
            EngineError::CycleDetected { path } => {
                assert!(path.len() >= 3, "path too short: {:?}", path);
                assert_eq!(path.first(), path.last());
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn self_consumption_is_a_cycle() {
        let nodes = vec![node("a", vec![InputSelector::any(kind("x"))], vec!["x"])];
        assert!(matches!(TaskGraph::build(nodes, &[]), Err(EngineError::CycleDetected { .. })));
    }

    #[test]
    fn exact_key_match_binds_to_one_producer() {
        let nodes = vec![node("a", vec![], vec!["x"]),
                         node("b", vec![], vec!["x"]),
                         node("c", vec![InputSelector::exact(kind("x"), "b")], vec!["z"])];
        let g = TaskGraph::build(nodes, &[]).unwrap();
        assert_eq!(g.producers_of("c"), BTreeSet::from(["b".to_string()]));
    }

    #[test]
    fn transitive_dependents_cover_the_forward_closure() {
        let nodes = vec![node("a", vec![], vec!["x"]),
                         node("b", vec![InputSelector::any(kind("x"))], vec!["y"]),
                         node("c", vec![InputSelector::any(kind("y"))], vec!["z"]),
                         node("d", vec![], vec!["w"])];
        let g = TaskGraph::build(nodes, &[]).unwrap();
        assert_eq!(g.transitive_dependents("a"), BTreeSet::from(["b".to_string(), "c".to_string()]));
        assert!(g.transitive_dependents("d").is_empty());
    }

    #[test]
    fn replan_reset_bumps_revision_group_only_for_affected() {
        let nodes = vec![node("a", vec![], vec!["x"]),
                         node("b", vec![InputSelector::any(kind("x"))], vec!["y"])];
        let mut g = TaskGraph::build(nodes, &[]).unwrap();
        g.node_mut("a").unwrap().status = NodeStatus::Succeeded;
        g.node_mut("b").unwrap().status = NodeStatus::Succeeded;

        let affected = BTreeSet::from(["b".to_string()]);
        let next = g.reset_for_replan(&affected);
        assert_eq!(next.node("a").unwrap().status, NodeStatus::Succeeded);
        assert_eq!(next.node("a").unwrap().revision_group, 1);
        assert_eq!(next.node("b").unwrap().status, NodeStatus::Pending);
        assert_eq!(next.node("b").unwrap().revision_group, 2);
        // el grafo previo queda como estaba
        assert_eq!(g.node("b").unwrap().status, NodeStatus::Succeeded);
    }

    #[test]
    fn definition_hash_is_stable_and_sensitive() {
        let mk = || vec![node("a", vec![], vec!["x"]), node("b", vec![InputSelector::any(kind("x"))], vec!["y"])];
        let g1 = TaskGraph::build(mk(), &[]).unwrap();
        let g2 = TaskGraph::build(mk(), &[]).unwrap();
        assert_eq!(g1.definition_hash(), g2.definition_hash());

        let mut other = mk();
        other[1].params = json!({"depth": 2});
        let g3 = TaskGraph::build(other, &[]).unwrap();
        assert_ne!(g1.definition_hash(), g3.definition_hash());
    }
}
