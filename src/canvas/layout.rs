use std::collections::{HashMap, VecDeque};

use log::{debug, info, trace, warn};

use super::types::{Canvas, Node};
use crate::config::{Orientation, RenderConfig, Spacing};
use crate::error::Error;

pub const START_X: f32 = 120.0;
pub const START_Y: f32 = 170.0;
const FACTORY_GAP: f32 = 80.0;

/// Room a machine container takes around its nodes on each side.
pub const MACHINE_PADDING: f32 = 45.0;
/// Room a factory container takes around its machines on each side.
pub const FACTORY_PADDING: f32 = 20.0;
/// Label band on top of every container.
pub const CONTAINER_HEADER: f32 = 40.0;

/// Minimum node-to-node gaps that keep two sibling machine containers from
/// touching, horizontally and vertically.
const X_CLEARANCE: f32 = 2.0 * MACHINE_PADDING + 20.0;
const Y_CLEARANCE: f32 = 2.0 * MACHINE_PADDING + CONTAINER_HEADER + 20.0;

/// Axis-aligned box in canvas pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn of_node(node: &Node) -> Self {
        Self::new(node.x, node.y, node.width, node.height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn with_padding(&self, padding: f32) -> Self {
        Self::new(
            self.x - padding,
            self.y - padding,
            self.width + padding * 2.0,
            self.height + padding * 2.0,
        )
    }

    /// Grows the top edge by `header` pixels.
    pub fn with_header(&self, header: f32) -> Self {
        Self::new(self.x, self.y - header, self.width, self.height + header)
    }

    /// True when the interiors overlap; shared edges do not count.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn union(&self, other: &BBox) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::new(x, y, right - x, bottom - y)
    }

    /// Smallest box containing all of `boxes`; `None` when empty.
    pub fn enclosing(boxes: impl IntoIterator<Item = BBox>) -> Option<Self> {
        boxes.into_iter().reduce(|acc, b| acc.union(&b))
    }
}

/// Positions every node of `canvas` in place.
///
/// With `organize` off, a recipe whose nodes are all unset gets the basic
/// container-driven arrangement and any other recipe is left as written.
pub fn layout_canvas(canvas: &mut Canvas, config: &RenderConfig) -> Result<(), Error> {
    validate(canvas)?;
    let spacing = config.spacing_level.spacing();

    if config.organize {
        organize(canvas, Axes::new(config.orientation, spacing));
        info!(
            nodes = canvas.node_count(),
            spacing:? = config.spacing_level,
            orientation:? = config.orientation;
            "Organized canvas"
        );
    } else if canvas.nodes().all(Node::is_unset) {
        auto_layout(canvas, spacing);
        info!(nodes = canvas.node_count(); "Applied basic auto-layout");
    } else {
        debug!("Recipe carries coordinates, keeping them");
    }
    Ok(())
}

fn validate(canvas: &Canvas) -> Result<(), Error> {
    if canvas.node_count() == 0 {
        return Err(Error::EmptyCanvas);
    }

    for node in canvas.nodes() {
        let invalid = |reason: String| Error::InvalidGeometry {
            id: node.id.clone(),
            reason,
        };
        if !node.width.is_finite() || node.width <= 0.0 {
            return Err(invalid(format!("width {}", node.width)));
        }
        if !node.height.is_finite() || node.height <= 0.0 {
            return Err(invalid(format!("height {}", node.height)));
        }
        if !node.x.is_finite() || !node.y.is_finite() {
            return Err(invalid(format!("position ({}, {})", node.x, node.y)));
        }
    }
    Ok(())
}

/// Nodes left to right in their machine, machines stacked downwards,
/// factories separated by an extra gap.
fn auto_layout(canvas: &mut Canvas, spacing: Spacing) {
    let mut y = START_Y;
    let mut first_factory = true;

    for network in &mut canvas.networks {
        for factory in &mut network.factories {
            if !first_factory {
                y += FACTORY_GAP;
            }
            first_factory = false;

            for machine in &mut factory.machines {
                if machine.nodes.is_empty() {
                    continue;
                }
                let mut x = START_X;
                let mut tallest: f32 = 0.0;
                for node in &mut machine.nodes {
                    node.x = x;
                    node.y = y;
                    trace!(node = node.id.as_str(), x = x, y = y; "Placed node");
                    x += node.width + spacing.horizontal;
                    tallest = tallest.max(node.height);
                }
                y += tallest + spacing.vertical;
            }
        }
    }
}

/// Adjacency over node indices in declaration order, plus the container
/// grouping the indices came from.
struct Graph {
    ids: Vec<String>,
    sizes: Vec<(f32, f32)>,
    succ: Vec<Vec<usize>>,
    pred: Vec<Vec<usize>>,
    /// Machine index of each node.
    machine: Vec<usize>,
    /// Node indices per machine, grouped by factory.
    factories: Vec<Vec<Vec<usize>>>,
}

impl Graph {
    fn from_canvas(canvas: &Canvas) -> Self {
        let ids: Vec<String> = canvas.nodes().map(|n| n.id.clone()).collect();
        let sizes = canvas.nodes().map(|n| (n.width, n.height)).collect();
        let index: HashMap<&str, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut succ = vec![Vec::new(); ids.len()];
        let mut pred = vec![Vec::new(); ids.len()];
        for edge in canvas.edges() {
            let (Some(&s), Some(&t)) = (
                index.get(edge.source.as_str()),
                index.get(edge.target.as_str()),
            ) else {
                continue;
            };
            // Self-loops carry no ordering information.
            if s == t {
                continue;
            }
            succ[s].push(t);
            pred[t].push(s);
        }

        let mut machine = Vec::with_capacity(ids.len());
        let mut factories = Vec::new();
        let mut next = 0;
        let mut machine_index = 0;
        for factory in canvas.networks.iter().flat_map(|n| n.factories.iter()) {
            let mut machines = Vec::with_capacity(factory.machines.len());
            for m in &factory.machines {
                let count = m.nodes.len();
                machine.extend(std::iter::repeat_n(machine_index, count));
                machines.push((next..next + count).collect());
                next += count;
                machine_index += 1;
            }
            factories.push(machines);
        }

        Self {
            ids,
            sizes,
            succ,
            pred,
            machine,
            factories,
        }
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn is_connected(&self, i: usize) -> bool {
        !self.succ[i].is_empty() || !self.pred[i].is_empty()
    }
}

/// Organize works in `(main, cross)` coordinates: levels advance along
/// `main`, machine bands stack along `cross`.
#[derive(Debug, Clone, Copy)]
struct Axes {
    vertical: bool,
    main_gap: f32,
    cross_gap: f32,
    /// Between machine bands, and between rows of the loose-node grid.
    band_gap: f32,
    /// Between columns of the loose-node grid.
    cell_gap: f32,
    main_start: f32,
    cross_start: f32,
}

impl Axes {
    fn new(orientation: Orientation, spacing: Spacing) -> Self {
        match orientation {
            Orientation::Horizontal => Self {
                vertical: false,
                main_gap: spacing.horizontal,
                cross_gap: spacing.vertical,
                band_gap: spacing.vertical.max(Y_CLEARANCE),
                cell_gap: spacing.horizontal.max(X_CLEARANCE),
                main_start: START_X,
                cross_start: START_Y,
            },
            Orientation::Vertical => Self {
                vertical: true,
                main_gap: spacing.vertical,
                cross_gap: spacing.horizontal,
                band_gap: spacing.horizontal.max(X_CLEARANCE),
                cell_gap: spacing.vertical.max(Y_CLEARANCE),
                main_start: START_Y,
                cross_start: START_X,
            },
        }
    }

    /// `(main, cross)` extents of a `(width, height)` size.
    fn extents(&self, (width, height): (f32, f32)) -> (f32, f32) {
        if self.vertical {
            (height, width)
        } else {
            (width, height)
        }
    }

    fn to_xy(&self, (main, cross): (f32, f32)) -> (f32, f32) {
        if self.vertical {
            (cross, main)
        } else {
            (main, cross)
        }
    }
}

fn organize(canvas: &mut Canvas, axes: Axes) {
    let positions = {
        let graph = Graph::from_canvas(canvas);
        organize_positions(&graph, axes)
    };

    for (node, (x, y)) in canvas.nodes_mut().zip(positions) {
        node.x = x;
        node.y = y;
    }
}

fn next_level(preds: &[usize], levels: &[Option<usize>]) -> usize {
    preds
        .iter()
        .filter_map(|&p| levels[p])
        .map(|l| l + 1)
        .max()
        .unwrap_or(0)
}

/// Longest-path levels via Kahn's algorithm. When the queue runs dry with
/// nodes left over, one of them is forced free (preferring a node already
/// reached from a leveled predecessor) and the sweep resumes. Every round
/// levels at least one node, so all connected nodes end up leveled.
fn assign_levels(graph: &Graph) -> Vec<Option<usize>> {
    let n = graph.len();
    let mut levels: Vec<Option<usize>> = vec![None; n];
    let mut remaining: Vec<usize> = graph.pred.iter().map(Vec::len).collect();
    let mut queue: VecDeque<usize> = VecDeque::new();

    for i in 0..n {
        if graph.is_connected(i) && remaining[i] == 0 {
            levels[i] = Some(0);
            queue.push_back(i);
        }
    }

    loop {
        while let Some(u) = queue.pop_front() {
            for &v in &graph.succ[u] {
                // Edges into leveled nodes close a cycle.
                if levels[v].is_some() {
                    continue;
                }
                remaining[v] = remaining[v].saturating_sub(1);
                if remaining[v] == 0 {
                    levels[v] = Some(next_level(&graph.pred[v], &levels));
                    queue.push_back(v);
                }
            }
        }

        let unresolved = |i: &usize| graph.is_connected(*i) && levels[*i].is_none();
        let entry = (0..n)
            .filter(unresolved)
            .find(|&i| graph.pred[i].iter().any(|&p| levels[p].is_some()))
            .or_else(|| (0..n).find(unresolved));
        let Some(forced) = entry else {
            break;
        };

        let level = next_level(&graph.pred[forced], &levels);
        warn!(node = graph.ids[forced].as_str(), level = level; "Breaking cycle");
        levels[forced] = Some(level);
        queue.push_back(forced);
    }

    levels
}

/// Places nodes band by band. Positions are `(main, cross)` until the end.
struct Organizer<'a> {
    graph: &'a Graph,
    levels: &'a [Option<usize>],
    extents: Vec<(f32, f32)>,
    axes: Axes,
    depth: usize,
    level_step: f32,
    positions: Vec<Option<(f32, f32)>>,
}

impl Organizer<'_> {
    /// Levels run along `main` for the whole canvas; within one machine,
    /// nodes center on their same-machine parents across `cross`. Returns
    /// the far `cross` edge of the band starting at `top`.
    fn place_machine(&mut self, members: &[usize], top: f32) -> f32 {
        let (leveled, loose): (Vec<usize>, Vec<usize>) =
            members.iter().copied().partition(|&i| self.levels[i].is_some());
        let thickest = leveled
            .iter()
            .map(|&i| self.extents[i].1)
            .fold(0.0f32, f32::max);

        for level in 0..self.depth {
            let in_level: Vec<usize> = leveled
                .iter()
                .copied()
                .filter(|&i| self.levels[i] == Some(level))
                .collect();
            if in_level.is_empty() {
                continue;
            }
            let main = self.axes.main_start + level as f32 * self.level_step;

            let mut targets: Vec<(f32, usize)> = in_level
                .iter()
                .enumerate()
                .map(|(ordinal, &i)| {
                    let parent_centers: Vec<f32> = self.graph.pred[i]
                        .iter()
                        .filter(|&&p| self.graph.machine[p] == self.graph.machine[i])
                        .filter_map(|&p| self.positions[p].map(|(_, c)| c + self.extents[p].1 / 2.0))
                        .collect();
                    let start = if parent_centers.is_empty() {
                        top + ordinal as f32 * (thickest + self.axes.cross_gap)
                    } else {
                        let mean = parent_centers.iter().sum::<f32>() / parent_centers.len() as f32;
                        mean - self.extents[i].1 / 2.0
                    };
                    (start, i)
                })
                .collect();

            // Overlap sweep: keep the target where possible, otherwise push on.
            targets.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            let mut floor: Option<f32> = None;
            for (start, i) in targets {
                let cross = floor.map_or(start, |f| start.max(f));
                self.positions[i] = Some((main, cross));
                floor = Some(cross + self.extents[i].1 + self.axes.cross_gap);
                trace!(node = self.graph.ids[i].as_str(), level = level, main = main, cross = cross; "Placed node");
            }
        }

        // Centering may pull a large node before the band start.
        let first = leveled
            .iter()
            .filter_map(|&i| self.positions[i])
            .map(|(_, c)| c)
            .fold(f32::INFINITY, f32::min);
        if first < top {
            let shift = top - first;
            for &i in &leveled {
                if let Some((_, cross)) = self.positions[i].as_mut() {
                    *cross += shift;
                }
            }
        }

        let mut end = leveled
            .iter()
            .filter_map(|&i| self.positions[i].map(|(_, c)| c + self.extents[i].1))
            .reduce(f32::max);
        if !loose.is_empty() {
            let grid_top = end.map_or(top, |e| e + self.axes.cross_gap);
            let grid_end = self.place_grid(&loose, grid_top, self.axes.main_gap, self.axes.cross_gap);
            end = Some(end.map_or(grid_end, |e| e.max(grid_end)));
        }
        end.unwrap_or(top)
    }

    /// `ceil(sqrt(n))` columns along `main`; returns the far `cross` edge.
    fn place_grid(&mut self, nodes: &[usize], top: f32, column_gap: f32, row_gap: f32) -> f32 {
        let placed = layout_grid(
            nodes,
            &self.extents,
            (self.axes.main_start, top),
            (column_gap, row_gap),
        );
        let mut end = top;
        for (i, (main, cross)) in placed {
            self.positions[i] = Some((main, cross));
            end = end.max(cross + self.extents[i].1);
        }
        end
    }
}

fn organize_positions(graph: &Graph, axes: Axes) -> Vec<(f32, f32)> {
    let n = graph.len();
    let levels = assign_levels(graph);
    let extents: Vec<(f32, f32)> = graph.sizes.iter().map(|&s| axes.extents(s)).collect();

    let leveled = levels.iter().flatten().count();
    let depth = levels.iter().flatten().max().map_or(0, |l| l + 1);
    let machines: usize = graph.factories.iter().map(Vec::len).sum();
    debug!(
        leveled = leveled,
        isolated = n - leveled,
        depth = depth,
        machines = machines;
        "Assigned levels"
    );

    let thickest = (0..n)
        .filter(|&i| levels[i].is_some())
        .map(|i| extents[i].0)
        .fold(0.0f32, f32::max);
    let mut organizer = Organizer {
        graph,
        levels: &levels,
        extents,
        axes,
        depth,
        level_step: thickest + axes.main_gap,
        positions: vec![None; n],
    };

    let mut cross = axes.cross_start;
    let mut first_factory = true;
    for machines in &graph.factories {
        if machines.iter().all(Vec::is_empty) {
            continue;
        }
        if !first_factory {
            cross += FACTORY_GAP;
        }
        first_factory = false;

        // One-node machines without edges share a grid after the bands.
        let mut pooled = Vec::new();
        for members in machines {
            match members.as_slice() {
                [] => {}
                [single] if levels[*single].is_none() => pooled.push(*single),
                _ => cross = organizer.place_machine(members, cross) + axes.band_gap,
            }
        }
        if !pooled.is_empty() {
            cross = organizer.place_grid(&pooled, cross, axes.cell_gap, axes.band_gap) + axes.band_gap;
        }
    }

    organizer
        .positions
        .into_iter()
        .map(|p| axes.to_xy(p.unwrap_or((axes.main_start, axes.cross_start))))
        .collect()
}

/// `ceil(sqrt(n))` columns, row thickness = largest in the row.
fn layout_grid(
    nodes: &[usize],
    extents: &[(f32, f32)],
    origin: (f32, f32),
    gaps: (f32, f32),
) -> Vec<(usize, (f32, f32))> {
    if nodes.is_empty() {
        return Vec::new();
    }

    let cols = ((nodes.len() as f32).sqrt().ceil() as usize).max(1);
    let widest = nodes.iter().map(|&i| extents[i].0).fold(0.0f32, f32::max);

    let mut row_sizes: Vec<f32> = vec![0.0; nodes.len().div_ceil(cols)];
    for (idx, &i) in nodes.iter().enumerate() {
        let row = idx / cols;
        row_sizes[row] = row_sizes[row].max(extents[i].1);
    }

    nodes
        .iter()
        .enumerate()
        .map(|(idx, &i)| {
            let col = idx % cols;
            let row = idx / cols;
            let main = origin.0 + col as f32 * (widest + gaps.0);
            let cross = origin.1 + row_sizes[..row].iter().sum::<f32>() + row as f32 * gaps.1;
            (i, (main, cross))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::parser::parse_recipe;
    use crate::canvas::render::{factory_bounds, machine_bounds};
    use crate::config::SpacingLevel;
    use crate::error::ErrorKind;

    fn organized() -> RenderConfig {
        RenderConfig {
            organize: true,
            ..RenderConfig::default()
        }
    }

    fn pos(canvas: &Canvas, id: &str) -> (f32, f32) {
        let node = canvas.node(id).expect("node exists");
        (node.x, node.y)
    }

    #[test]
    fn basic_layout_runs_left_to_right_then_down() {
        let mut canvas = parse_recipe(
            "nodes:\n  - id: a\n    outputs: [b]\n  - id: b\n  - id: c\n    height: 200\n",
        )
        .expect("parse");
        layout_canvas(&mut canvas, &RenderConfig::default()).expect("layout");

        // container preset: 200 horizontal, 240 vertical
        assert_eq!(pos(&canvas, "a"), (120.0, 170.0));
        assert_eq!(pos(&canvas, "b"), (120.0 + 250.0 + 200.0, 170.0));
        assert_eq!(pos(&canvas, "c"), (120.0, 170.0 + 120.0 + 240.0));
    }

    #[test]
    fn basic_layout_separates_factories() {
        let recipe = r#"
canvas:
  networks:
    - factories:
        - machines:
            - nodes: [{id: a}]
        - machines:
            - nodes: [{id: b}]
"#;
        let mut canvas = parse_recipe(recipe).expect("parse");
        let config = RenderConfig {
            spacing_level: SpacingLevel::Node,
            ..RenderConfig::default()
        };
        layout_canvas(&mut canvas, &config).expect("layout");
        assert_eq!(pos(&canvas, "b").1, 170.0 + 120.0 + 140.0 + 80.0);
    }

    #[test]
    fn explicit_coordinates_are_kept_without_organize() {
        let mut canvas =
            parse_recipe("nodes:\n  - id: a\n    x: 5\n    y: 7\n  - id: b\n").expect("parse");
        layout_canvas(&mut canvas, &RenderConfig::default()).expect("layout");
        assert_eq!(pos(&canvas, "a"), (5.0, 7.0));
        assert_eq!(pos(&canvas, "b"), (0.0, 0.0));
    }

    #[test]
    fn empty_canvas_and_bad_geometry_are_layout_errors() {
        let mut empty = parse_recipe("title: nothing\n").expect("parse");
        let err = layout_canvas(&mut empty, &RenderConfig::default()).expect_err("empty");
        assert!(matches!(err, Error::EmptyCanvas));

        let mut flat = parse_recipe("nodes:\n  - id: a\n    height: 0\n").expect("parse");
        let err = layout_canvas(&mut flat, &RenderConfig::default()).expect_err("geometry");
        assert_eq!(err.kind(), ErrorKind::Layout);
        assert_eq!(err.offending_id(), Some("a"));
    }

    #[test]
    fn organize_levels_a_chain_left_to_right() {
        let mut canvas = parse_recipe(
            "nodes:\n  - id: c\n    inputs: [b]\n  - id: a\n    outputs: [b]\n  - id: b\n",
        )
        .expect("parse");
        layout_canvas(&mut canvas, &organized()).expect("layout");

        let step = 250.0 + 200.0;
        assert_eq!(pos(&canvas, "a"), (120.0, 170.0));
        assert_eq!(pos(&canvas, "b"), (120.0 + step, 170.0));
        assert_eq!(pos(&canvas, "c"), (120.0 + 2.0 * step, 170.0));
    }

    #[test]
    fn organize_uses_longest_path_levels() {
        let mut canvas = parse_recipe(
            "nodes:\n  - id: a\n    outputs: [b, c]\n  - id: b\n    outputs: [c]\n  - id: c\n",
        )
        .expect("parse");
        layout_canvas(&mut canvas, &organized()).expect("layout");
        assert!(pos(&canvas, "c").0 > pos(&canvas, "b").0);
    }

    #[test]
    fn organize_centers_children_on_their_parents() {
        let mut canvas = parse_recipe(
            "nodes:\n  - id: a\n    outputs: [c]\n  - id: b\n    outputs: [c]\n  - id: c\n",
        )
        .expect("parse");
        layout_canvas(&mut canvas, &organized()).expect("layout");

        let (_, ay) = pos(&canvas, "a");
        let (_, by) = pos(&canvas, "b");
        let (_, cy) = pos(&canvas, "c");
        assert_eq!(by, ay + 120.0 + 240.0);
        assert_eq!(cy, (ay + by) / 2.0);
    }

    #[test]
    fn organize_breaks_cycles_and_grids_isolated_nodes() {
        let mut canvas = parse_recipe(
            "nodes:\n  - id: a\n    outputs: [b]\n  - id: b\n    outputs: [c]\n  - id: c\n    outputs: [a]\n  - id: d\n",
        )
        .expect("parse");
        layout_canvas(&mut canvas, &organized()).expect("layout");

        let xs: Vec<f32> = ["a", "b", "c"].iter().map(|id| pos(&canvas, id).0).collect();
        assert!(xs[0] < xs[1] && xs[1] < xs[2]);

        let main_bottom = ["a", "b", "c"]
            .iter()
            .map(|id| pos(&canvas, id).1 + 120.0)
            .fold(f32::MIN, f32::max);
        let (dx, dy) = pos(&canvas, "d");
        assert_eq!(dx, START_X);
        assert_eq!(dy, main_bottom + 240.0);
    }

    #[test]
    fn organize_without_edges_is_a_grid() {
        let mut canvas =
            parse_recipe("nodes:\n  - id: a\n  - id: b\n  - id: c\n  - id: d\n  - id: e\n")
                .expect("parse");
        layout_canvas(&mut canvas, &organized()).expect("layout");

        // five nodes -> three columns
        assert_eq!(pos(&canvas, "a"), (120.0, 170.0));
        assert_eq!(pos(&canvas, "c"), (120.0 + 2.0 * 450.0, 170.0));
        assert_eq!(pos(&canvas, "d"), (120.0, 170.0 + 120.0 + 240.0));
    }

    fn sibling_boxes(canvas: &Canvas) -> (Vec<BBox>, Vec<BBox>) {
        let factories: Vec<_> = canvas.networks.iter().flat_map(|n| n.factories.iter()).collect();
        let machines = factories
            .iter()
            .flat_map(|f| f.machines.iter())
            .filter_map(machine_bounds)
            .collect();
        let factories = factories.into_iter().filter_map(factory_bounds).collect();
        (machines, factories)
    }

    fn assert_disjoint(boxes: &[BBox]) {
        for (i, a) in boxes.iter().enumerate() {
            for b in &boxes[i + 1..] {
                assert!(!a.intersects(b), "{a:?} intersects {b:?}");
            }
        }
    }

    #[test]
    fn organize_keeps_sibling_machines_apart() {
        let mut canvas = parse_recipe(
            "nodes:\n  - id: a\n    outputs: [b, c]\n  - id: b\n  - id: c\n  - id: x\n    outputs: [y]\n  - id: y\n",
        )
        .expect("parse");
        layout_canvas(&mut canvas, &organized()).expect("layout");

        let (machines, _) = sibling_boxes(&canvas);
        assert_eq!(machines.len(), 2);
        assert_disjoint(&machines);

        // x and y share a band below the first machine.
        let (_, cy) = pos(&canvas, "c");
        assert_eq!(pos(&canvas, "x"), (START_X, cy + 120.0 + 240.0));
        assert_eq!(pos(&canvas, "y").1, pos(&canvas, "x").1);
    }

    #[test]
    fn organize_keeps_factories_apart_across_edges() {
        let recipe = r#"
canvas:
  networks:
    - factories:
        - machines:
            - nodes:
                - id: a
                  outputs: [b]
                - id: b
            - nodes:
                - id: c
                  inputs: [b]
        - machines:
            - nodes:
                - id: d
                  inputs: [a]
                - id: e
"#;
        let mut canvas = parse_recipe(recipe).expect("parse");
        let config = RenderConfig {
            spacing_level: SpacingLevel::Node,
            ..organized()
        };
        layout_canvas(&mut canvas, &config).expect("layout");

        let (machines, factories) = sibling_boxes(&canvas);
        assert_eq!((machines.len(), factories.len()), (3, 2));
        assert_disjoint(&machines);
        assert_disjoint(&factories);

        // Levels are canvas-wide even across containers.
        assert!(pos(&canvas, "c").0 > pos(&canvas, "b").0);
        assert_eq!(pos(&canvas, "d").0, pos(&canvas, "b").0);
    }

    #[test]
    fn vertical_orientation_runs_levels_downwards() {
        let mut canvas = parse_recipe(
            "nodes:\n  - id: a\n    outputs: [b]\n  - id: b\n    outputs: [c]\n  - id: c\n  - id: x\n    outputs: [y]\n  - id: y\n",
        )
        .expect("parse");
        let config = RenderConfig {
            orientation: Orientation::Vertical,
            ..organized()
        };
        layout_canvas(&mut canvas, &config).expect("layout");

        let step = 120.0 + 240.0;
        assert_eq!(pos(&canvas, "a"), (120.0, 170.0));
        assert_eq!(pos(&canvas, "b"), (120.0, 170.0 + step));
        assert_eq!(pos(&canvas, "c"), (120.0, 170.0 + 2.0 * step));

        // The second machine sits beside the first one.
        assert_eq!(pos(&canvas, "x"), (120.0 + 250.0 + 200.0, 170.0));

        let (machines, _) = sibling_boxes(&canvas);
        assert_disjoint(&machines);
    }

    #[test]
    fn bbox_union_covers_both() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(20.0, -5.0, 5.0, 5.0);
        assert_eq!(a.union(&b), BBox::new(0.0, -5.0, 25.0, 15.0));
        assert_eq!(BBox::enclosing(Vec::new()), None);
        assert_eq!(a.with_padding(2.0).with_header(3.0), BBox::new(-2.0, -5.0, 14.0, 17.0));
        assert!(a.intersects(&BBox::new(5.0, 5.0, 10.0, 10.0)));
        assert!(!a.intersects(&BBox::new(10.0, 0.0, 5.0, 5.0)));
    }
}
