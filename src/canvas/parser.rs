use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::style::{ContainerStyle, NodeStyle};
use super::types::{
    Canvas, DEFAULT_NODE_HEIGHT, DEFAULT_NODE_WIDTH, DEFAULT_TITLE, DEFAULT_VERSION, Factory,
    Machine, Network, Node, NodeType,
};
use crate::error::Error;
use crate::theme::ThemeName;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    node_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    y: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    inputs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    outputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<NodeStyle>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawMachine {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<ContainerStyle>,
    nodes: Vec<RawNode>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawFactory {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<ContainerStyle>,
    machines: Vec<RawMachine>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawNetwork {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    factories: Vec<RawFactory>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawCanvas {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    theme: Option<String>,
    networks: Vec<RawNetwork>,
}

#[derive(Debug, Serialize, Deserialize)]
struct HierarchicalRecipe {
    canvas: RawCanvas,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SimplifiedRecipe {
    version: Option<String>,
    title: Option<String>,
    theme: Option<String>,
    nodes: Vec<RawNode>,
}

/// One id namespace shared by every level of the tree.
#[derive(Default)]
struct IdRegistry {
    owners: HashMap<String, &'static str>,
    counters: HashMap<&'static str, usize>,
}

impl IdRegistry {
    fn claim(&mut self, id: &str, level: &'static str) -> Result<(), Error> {
        if let Some(&first) = self.owners.get(id) {
            return Err(Error::DuplicateId {
                id: id.to_string(),
                first,
                second: level,
            });
        }
        self.owners.insert(id.to_string(), level);
        Ok(())
    }

    /// Next free `<level>-<n>` id.
    fn generate(&mut self, level: &'static str) -> String {
        let counter = self.counters.entry(level).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{level}-{counter}");
            if !self.owners.contains_key(&candidate) {
                self.owners.insert(candidate.clone(), level);
                return candidate;
            }
        }
    }

    fn claim_optional(&mut self, id: &Option<String>, level: &'static str) -> Result<(), Error> {
        match declared(id) {
            Some(id) => self.claim(id, level),
            None => Ok(()),
        }
    }

    fn resolve(&mut self, id: Option<String>, level: &'static str) -> String {
        match id.filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => self.generate(level),
        }
    }
}

fn declared(id: &Option<String>) -> Option<&str> {
    id.as_deref().filter(|id| !id.trim().is_empty())
}

/// Parses a recipe in either the hierarchical (`canvas:` root) or the
/// simplified (flat `nodes:`) shape.
pub fn parse_recipe(text: &str) -> Result<Canvas, Error> {
    if text.trim().is_empty() {
        return Err(Error::EmptyRecipe);
    }

    let value: serde_yaml::Value = serde_yaml::from_str(text)?;
    if value.is_null() {
        return Err(Error::EmptyRecipe);
    }

    let canvas = if value.get("canvas").is_some() {
        let recipe: HierarchicalRecipe = serde_yaml::from_value(value)?;
        build_hierarchical(recipe.canvas)?
    } else {
        let recipe: SimplifiedRecipe = serde_yaml::from_value(value)?;
        build_simplified(recipe)?
    };

    info!(
        title = canvas.title.as_str(),
        nodes = canvas.node_count(),
        edges = canvas.edges().len();
        "Parsed recipe"
    );
    Ok(canvas)
}

fn resolve_theme(name: Option<String>) -> ThemeName {
    match name {
        None => ThemeName::default(),
        Some(name) => ThemeName::from_builtin(&name).unwrap_or_else(|err| {
            warn!(error = err.as_str(); "Falling back to the dark theme");
            ThemeName::default()
        }),
    }
}

fn build_hierarchical(raw: RawCanvas) -> Result<Canvas, Error> {
    let mut registry = IdRegistry::default();

    // Declared ids are reserved first so generated ones never collide.
    let mut position = 0;
    for network in &raw.networks {
        registry.claim_optional(&network.id, "network")?;
        for factory in &network.factories {
            registry.claim_optional(&factory.id, "factory")?;
            for machine in &factory.machines {
                registry.claim_optional(&machine.id, "machine")?;
                for node in &machine.nodes {
                    position += 1;
                    let id = declared(&node.id).ok_or(Error::MissingId {
                        level: "node",
                        position,
                    })?;
                    registry.claim(id, "node")?;
                }
            }
        }
    }

    let node_ids = raw
        .networks
        .iter()
        .flat_map(|n| n.factories.iter())
        .flat_map(|f| f.machines.iter())
        .flat_map(|m| m.nodes.iter())
        .filter_map(|n| n.id.clone())
        .collect::<HashSet<_>>();
    for node in raw
        .networks
        .iter()
        .flat_map(|n| n.factories.iter())
        .flat_map(|f| f.machines.iter())
        .flat_map(|m| m.nodes.iter())
    {
        check_references(node, &node_ids)?;
    }

    let mut networks = Vec::with_capacity(raw.networks.len());
    for network in raw.networks {
        let id = registry.resolve(network.id, "network");
        let mut factories = Vec::with_capacity(network.factories.len());
        for factory in network.factories {
            let factory_id = registry.resolve(factory.id, "factory");
            let mut machines = Vec::with_capacity(factory.machines.len());
            for machine in factory.machines {
                let machine_id = registry.resolve(machine.id, "machine");
                machines.push(Machine {
                    id: machine_id,
                    label: machine.label,
                    description: machine.description,
                    nodes: machine.nodes.into_iter().map(into_node).collect(),
                    style: machine.style,
                });
            }
            factories.push(Factory {
                id: factory_id,
                label: factory.label,
                description: factory.description,
                machines,
                style: factory.style,
            });
        }
        networks.push(Network {
            id,
            label: network.label,
            description: network.description,
            factories,
        });
    }

    debug!(networks = networks.len(); "Built hierarchical recipe");
    Ok(Canvas::new(
        raw.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
        raw.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        resolve_theme(raw.theme),
        networks,
    ))
}

fn build_simplified(raw: SimplifiedRecipe) -> Result<Canvas, Error> {
    let mut registry = IdRegistry::default();
    for (i, node) in raw.nodes.iter().enumerate() {
        let id = declared(&node.id).ok_or(Error::MissingId {
            level: "node",
            position: i + 1,
        })?;
        registry.claim(id, "node")?;
    }

    let index: HashMap<String, usize> = raw
        .nodes
        .iter()
        .enumerate()
        .filter_map(|(i, n)| n.id.clone().map(|id| (id, i)))
        .collect();
    let node_ids: HashSet<String> = index.keys().cloned().collect();
    for node in &raw.nodes {
        check_references(node, &node_ids)?;
    }

    let groups = connected_components(&raw.nodes, &index);
    debug!(components = groups.len(); "Partitioned simplified recipe into machines");

    let network_id = registry.generate("network");
    let factory_id = registry.generate("factory");

    let mut slots: Vec<Option<RawNode>> = raw.nodes.into_iter().map(Some).collect();
    let mut machines = Vec::with_capacity(groups.len());
    for group in groups {
        let nodes = group
            .into_iter()
            .filter_map(|i| slots.get_mut(i).and_then(Option::take))
            .map(into_node)
            .collect();
        machines.push(Machine {
            id: registry.generate("machine"),
            nodes,
            ..Machine::default()
        });
    }

    let network = Network {
        id: network_id,
        factories: vec![Factory {
            id: factory_id,
            machines,
            ..Factory::default()
        }],
        ..Network::default()
    };

    Ok(Canvas::new(
        raw.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
        raw.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        resolve_theme(raw.theme),
        vec![network],
    ))
}

fn check_references(node: &RawNode, node_ids: &HashSet<String>) -> Result<(), Error> {
    let owner = node.id.clone().unwrap_or_default();
    for (field, targets) in [("inputs", &node.inputs), ("outputs", &node.outputs)] {
        if let Some(target) = targets.iter().find(|t| !node_ids.contains(*t)) {
            return Err(Error::UnknownReference {
                node: owner,
                field,
                target: target.clone(),
            });
        }
    }
    Ok(())
}

/// Undirected components, ordered by their first declared node. Members
/// keep declaration order.
fn connected_components(nodes: &[RawNode], index: &HashMap<String, usize>) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..nodes.len()).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for (i, node) in nodes.iter().enumerate() {
        for other in node.inputs.iter().chain(node.outputs.iter()) {
            if let Some(&j) = index.get(other) {
                let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                if a != b {
                    parent[a.max(b)] = a.min(b);
                }
            }
        }
    }

    let mut group_of_root: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for i in 0..nodes.len() {
        let root = find(&mut parent, i);
        let group = *group_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[group].push(i);
    }
    groups
}

fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

fn into_node(raw: RawNode) -> Node {
    Node {
        id: raw.id.unwrap_or_default(),
        label: raw.label,
        content: raw.content.unwrap_or_default(),
        node_type: raw
            .node_type
            .as_deref()
            .map(NodeType::from_name)
            .unwrap_or_default(),
        x: raw.x.unwrap_or(0.0),
        y: raw.y.unwrap_or(0.0),
        width: raw.width.unwrap_or(DEFAULT_NODE_WIDTH),
        height: raw.height.unwrap_or(DEFAULT_NODE_HEIGHT),
        inputs: dedup_ids(raw.inputs),
        outputs: dedup_ids(raw.outputs),
        style: raw.style,
    }
}

fn from_node(node: &Node) -> RawNode {
    RawNode {
        id: Some(node.id.clone()),
        node_type: Some(node.node_type.as_str().to_string()),
        label: node.label.clone(),
        content: Some(node.content.clone()).filter(|c| !c.is_empty()),
        x: Some(node.x),
        y: Some(node.y),
        width: Some(node.width).filter(|w| *w != DEFAULT_NODE_WIDTH),
        height: Some(node.height).filter(|h| *h != DEFAULT_NODE_HEIGHT),
        inputs: node.inputs.clone(),
        outputs: node.outputs.clone(),
        style: node.style.clone().filter(|s| *s != NodeStyle::default()),
    }
}

/// Writes a (usually positioned) canvas back out in the hierarchical shape.
pub fn canvas_to_yaml(canvas: &Canvas) -> Result<String, Error> {
    let networks = canvas
        .networks
        .iter()
        .map(|network| RawNetwork {
            id: Some(network.id.clone()),
            label: network.label.clone(),
            description: network.description.clone(),
            factories: network
                .factories
                .iter()
                .map(|factory| RawFactory {
                    id: Some(factory.id.clone()),
                    label: factory.label.clone(),
                    description: factory.description.clone(),
                    style: factory
                        .style
                        .clone()
                        .filter(|s| *s != ContainerStyle::default()),
                    machines: factory
                        .machines
                        .iter()
                        .map(|machine| RawMachine {
                            id: Some(machine.id.clone()),
                            label: machine.label.clone(),
                            description: machine.description.clone(),
                            style: machine
                                .style
                                .clone()
                                .filter(|s| *s != ContainerStyle::default()),
                            nodes: machine.nodes.iter().map(from_node).collect(),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    let recipe = HierarchicalRecipe {
        canvas: RawCanvas {
            version: Some(canvas.version.clone()),
            title: Some(canvas.title.clone()),
            theme: Some(canvas.theme.as_str().to_string()),
            networks,
        },
    };
    Ok(serde_yaml::to_string(&recipe)?)
}
