use crate::expression::SymbolRef;
use crate::graph::{GraphHost, InputSource, NodeId, SceneGraph};
use crate::prelude::*;

impl SceneGraph {
    /// Checks a network, and every network nested in it, for problems that
    /// would only surface once the host cooks it: required inputs that were
    /// never wired, and expressions referencing nodes, parameters or inputs
    /// that don't exist. All problems are reported at once.
    pub fn validate_network(&self, container: NodeId) -> Result<()> {
        if self.node(container).is_none() {
            bail!("Node {container:?} does not exist");
        }
        let mut problems = vec![];
        self.collect_problems(container, &mut problems);
        if problems.is_empty() {
            Ok(())
        } else {
            bail!(
                "Network {} has {} problem(s):\n  - {}",
                self.path(container),
                problems.len(),
                problems.iter().join("\n  - ")
            )
        }
    }

    fn collect_problems(&self, container: NodeId, problems: &mut Vec<String>) {
        for &child in self.children(container) {
            self.check_inputs(child, problems);
            self.check_expressions(child, problems);
            if self.is_network(child) {
                self.collect_problems(child, problems);
            }
        }
    }

    fn check_inputs(&self, node_id: NodeId, problems: &mut Vec<String>) {
        let node = &self.nodes[node_id];
        let def = self.definition(node_id);
        let required = def.map_or(0, |def| def.required_inputs);
        // Slots missing from the node's list count as unwired
        let num_slots = def.map_or(0, |def| def.max_inputs).max(node.inputs.len());

        for slot in 0..num_slots {
            match node.inputs.get(slot).copied().flatten() {
                None if slot < required => {
                    problems.push(format!(
                        "{}: input {slot} is not connected",
                        self.path(node_id)
                    ));
                }
                Some(InputSource::SubnetInput(idx)) => {
                    let subnet_input = node.parent.and_then(|p| self.input(p, idx));
                    if subnet_input.is_none() {
                        problems.push(format!(
                            "{}: reads subnet input {idx}, which is not connected",
                            self.path(node_id)
                        ));
                    }
                }
                _ => {}
            }
        }
    }

    fn check_expressions(&self, node_id: NodeId, problems: &mut Vec<String>) {
        let node = &self.nodes[node_id];
        for (param, value) in &node.params {
            let expr = match value.as_expression() {
                Some(expr) => expr,
                None => continue,
            };
            for reference in expr.references() {
                if let Err(problem) = self.check_reference(node_id, reference) {
                    problems.push(format!(
                        "{}/{param}: {problem} in `{expr}`",
                        self.path(node_id)
                    ));
                }
            }
        }
    }

    fn check_reference(&self, node_id: NodeId, reference: &SymbolRef) -> Result<()> {
        let input_connected = |input: usize| {
            if self.input(node_id, input).is_none() {
                bail!("input {input} is not connected");
            }
            Ok(())
        };

        match reference {
            SymbolRef::Channel { node_path, param } => {
                let target = self
                    .resolve_relative(node_id, node_path)
                    .ok_or_else(|| anyhow!("node '{node_path}' not found"))?;
                let target_node = &self.nodes[target];
                let declared = target_node.params.contains_key(param)
                    || target_node.control(param).is_some()
                    || self
                        .definition(target)
                        .map_or(false, |def| def.param(param).is_some());
                if !declared {
                    bail!("parameter '{param}' not found on {}", self.path(target));
                }
                Ok(())
            }
            SymbolRef::Bounds { node_path, .. } => {
                self.resolve_relative(node_id, node_path)
                    .ok_or_else(|| anyhow!("node '{node_path}' not found"))?;
                Ok(())
            }
            SymbolRef::InputBounds { input, .. } | SymbolRef::Input { input } => {
                input_connected(*input)
            }
        }
    }
}
