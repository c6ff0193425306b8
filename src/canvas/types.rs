use std::collections::{HashMap, HashSet};

use log::warn;

use super::style::{ContainerStyle, NodeStyle};
use crate::theme::ThemeName;

pub const DEFAULT_NODE_WIDTH: f32 = 250.0;
pub const DEFAULT_NODE_HEIGHT: f32 = 120.0;
pub const DEFAULT_TITLE: &str = "Untitled Canvas";
pub const DEFAULT_VERSION: &str = "2.0";

/// Semantic node types; each one owns an accent color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeType {
    Input,
    Output,
    Process,
    Decision,
    Ai,
    Source,
    Static,
    #[default]
    Default,
}

impl NodeType {
    pub const ALL: [NodeType; 8] = [
        NodeType::Input,
        NodeType::Output,
        NodeType::Process,
        NodeType::Decision,
        NodeType::Ai,
        NodeType::Source,
        NodeType::Static,
        NodeType::Default,
    ];

    /// Unknown names map to [`NodeType::Default`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "input" => NodeType::Input,
            "output" => NodeType::Output,
            "process" => NodeType::Process,
            "decision" => NodeType::Decision,
            "ai" => NodeType::Ai,
            "source" => NodeType::Source,
            "static" => NodeType::Static,
            "default" | "" => NodeType::Default,
            other => {
                warn!(node_type = other; "Unknown node type, using default");
                NodeType::Default
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Input => "input",
            NodeType::Output => "output",
            NodeType::Process => "process",
            NodeType::Decision => "decision",
            NodeType::Ai => "ai",
            NodeType::Source => "source",
            NodeType::Static => "static",
            NodeType::Default => "default",
        }
    }

    pub fn accent_color(self) -> &'static str {
        match self {
            NodeType::Input => "#2196f3",
            NodeType::Output => "#ffc107",
            NodeType::Process => "#00bcd4",
            NodeType::Decision => "#f44336",
            NodeType::Ai => "#9c27b0",
            NodeType::Source => "#ff9800",
            NodeType::Static => "#4caf50",
            NodeType::Default => "#999999",
        }
    }
}

fn display_label<'a>(label: &'a Option<String>, id: &'a str) -> &'a str {
    match label {
        Some(label) if !label.is_empty() => label,
        _ => id,
    }
}

/// The atomic unit of a canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub label: Option<String>,
    pub content: String,
    pub node_type: NodeType,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub style: Option<NodeStyle>,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            content: String::new(),
            node_type: NodeType::Default,
            x: 0.0,
            y: 0.0,
            width: DEFAULT_NODE_WIDTH,
            height: DEFAULT_NODE_HEIGHT,
            inputs: Vec::new(),
            outputs: Vec::new(),
            style: None,
        }
    }

    pub fn label(&self) -> &str {
        display_label(&self.label, &self.id)
    }

    /// `(0, 0)` doubles as "no position given".
    pub fn is_unset(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Machine {
    pub id: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub nodes: Vec<Node>,
    pub style: Option<ContainerStyle>,
}

impl Machine {
    pub fn label(&self) -> &str {
        display_label(&self.label, &self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Factory {
    pub id: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub machines: Vec<Machine>,
    pub style: Option<ContainerStyle>,
}

impl Factory {
    pub fn label(&self) -> &str {
        display_label(&self.label, &self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Network {
    pub id: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub factories: Vec<Factory>,
}

impl Network {
    pub fn label(&self) -> &str {
        display_label(&self.label, &self.id)
    }
}

/// A directed connection between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

/// Indices of a node inside the container tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodePath {
    pub network: usize,
    pub factory: usize,
    pub machine: usize,
    pub node: usize,
}

/// The diagram root.
///
/// Nodes live inside their machines; the canvas keeps an id index and the
/// derived edge list alongside the tree. Edges refer to nodes by id only.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    pub version: String,
    pub title: String,
    pub theme: ThemeName,
    pub networks: Vec<Network>,
    edges: Vec<Edge>,
    index: HashMap<String, NodePath>,
}

impl Canvas {
    /// Builds the id index and the edge list from the tree.
    ///
    /// Callers are expected to have validated id uniqueness and references
    /// already; the parser does both before calling this.
    pub fn new(
        version: impl Into<String>,
        title: impl Into<String>,
        theme: ThemeName,
        networks: Vec<Network>,
    ) -> Self {
        let mut canvas = Self {
            version: version.into(),
            title: title.into(),
            theme,
            networks,
            edges: Vec::new(),
            index: HashMap::new(),
        };
        canvas.reindex();
        canvas
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (ni, network) in self.networks.iter().enumerate() {
            for (fi, factory) in network.factories.iter().enumerate() {
                for (mi, machine) in factory.machines.iter().enumerate() {
                    for (i, node) in machine.nodes.iter().enumerate() {
                        self.index.insert(
                            node.id.clone(),
                            NodePath {
                                network: ni,
                                factory: fi,
                                machine: mi,
                                node: i,
                            },
                        );
                    }
                }
            }
        }
        self.edges = collect_edges(self.nodes());
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// All nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.networks
            .iter()
            .flat_map(|n| n.factories.iter())
            .flat_map(|f| f.machines.iter())
            .flat_map(|m| m.nodes.iter())
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.networks
            .iter_mut()
            .flat_map(|n| n.factories.iter_mut())
            .flat_map(|f| f.machines.iter_mut())
            .flat_map(|m| m.nodes.iter_mut())
    }

    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    pub fn locate(&self, id: &str) -> Option<NodePath> {
        self.index.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        let path = self.locate(id)?;
        self.networks
            .get(path.network)?
            .factories
            .get(path.factory)?
            .machines
            .get(path.machine)?
            .nodes
            .get(path.node)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        let path = self.locate(id)?;
        self.networks
            .get_mut(path.network)?
            .factories
            .get_mut(path.factory)?
            .machines
            .get_mut(path.machine)?
            .nodes
            .get_mut(path.node)
    }

    pub fn machine_of(&self, id: &str) -> Option<&Machine> {
        let path = self.locate(id)?;
        self.networks
            .get(path.network)?
            .factories
            .get(path.factory)?
            .machines
            .get(path.machine)
    }

    pub fn factory_of(&self, id: &str) -> Option<&Factory> {
        let path = self.locate(id)?;
        self.networks.get(path.network)?.factories.get(path.factory)
    }

    pub fn network_of(&self, id: &str) -> Option<&Network> {
        let path = self.locate(id)?;
        self.networks.get(path.network)
    }
}

/// Union of every node's `outputs` and `inputs`, first declaration wins.
fn collect_edges<'a>(nodes: impl Iterator<Item = &'a Node>) -> Vec<Edge> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut edges = Vec::new();

    let mut push = |source: &str, target: &str| {
        if seen.insert((source.to_string(), target.to_string())) {
            edges.push(Edge {
                source: source.to_string(),
                target: target.to_string(),
            });
        }
    };

    for node in nodes {
        for upstream in &node.inputs {
            push(upstream, &node.id);
        }
        for downstream in &node.outputs {
            push(&node.id, downstream);
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_machine(nodes: Vec<Node>) -> Canvas {
        Canvas::new(
            DEFAULT_VERSION,
            "t",
            ThemeName::Dark,
            vec![Network {
                id: "net".into(),
                factories: vec![Factory {
                    id: "fac".into(),
                    machines: vec![Machine {
                        id: "m".into(),
                        nodes,
                        ..Machine::default()
                    }],
                    ..Factory::default()
                }],
                ..Network::default()
            }],
        )
    }

    #[test]
    fn label_falls_back_to_id() {
        let mut node = Node::new("ingest");
        assert_eq!(node.label(), "ingest");
        node.label = Some(String::new());
        assert_eq!(node.label(), "ingest");
        node.label = Some("Ingest".into());
        assert_eq!(node.label(), "Ingest");

        let machine = Machine {
            id: "m1".into(),
            ..Machine::default()
        };
        assert_eq!(machine.label(), "m1");
    }

    #[test]
    fn unknown_type_names_become_default() {
        assert_eq!(NodeType::from_name("AI"), NodeType::Ai);
        assert_eq!(NodeType::from_name("spaceship"), NodeType::Default);
        for ty in NodeType::ALL {
            assert_eq!(NodeType::from_name(ty.as_str()), ty);
        }
    }

    #[test]
    fn edge_declared_from_both_ends_is_stored_once() {
        let mut a = Node::new("a");
        a.outputs.push("b".into());
        let mut b = Node::new("b");
        b.inputs.push("a".into());

        let canvas = single_machine(vec![a, b]);
        assert_eq!(
            canvas.edges(),
            &[Edge {
                source: "a".into(),
                target: "b".into()
            }]
        );
    }

    #[test]
    fn lookup_resolves_container_path() {
        let canvas = single_machine(vec![Node::new("a"), Node::new("b")]);
        let path = canvas.locate("b").expect("b indexed");
        assert_eq!(path.node, 1);
        assert_eq!(canvas.machine_of("b").map(|m| m.id.as_str()), Some("m"));
        assert_eq!(canvas.factory_of("a").map(|f| f.id.as_str()), Some("fac"));
        assert_eq!(canvas.network_of("a").map(|n| n.id.as_str()), Some("net"));
        assert!(canvas.node("zzz").is_none());
        assert_eq!(canvas.node_count(), 2);
    }
}
