mod layout;
mod parser;
mod ports;
mod render;
mod style;
mod types;

pub use layout::{BBox, START_X, START_Y, layout_canvas};
pub use parser::{canvas_to_yaml, parse_recipe};
pub use ports::{HORIZON_FACTOR, Port, select_ports};
pub use render::{
    NodeText, Scene, control_points, factory_bounds, layout_node_text, machine_bounds,
    render_canvas, render_scene, scene_bounds,
};
pub use style::{
    ContainerLevel, ContainerStyle, NodeStyle, ResolvedContainerStyle, ResolvedNodeStyle,
    resolve_container_style, resolve_node_style,
};
pub use types::{Canvas, Edge, Factory, Machine, Network, Node, NodePath, NodeType};
