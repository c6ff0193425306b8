use super::layout::BBox;

/// Vertical distance, in multiples of the source height, beyond which a
/// connection leaves through the top or bottom instead of the sides.
pub const HORIZON_FACTOR: f32 = 1.5;

/// Side of a node where a connection attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    Top,
    Right,
    Bottom,
    Left,
}

impl Port {
    /// Midpoint of this side of `bbox`.
    pub fn anchor(self, bbox: &BBox) -> (f32, f32) {
        match self {
            Port::Top => (bbox.center_x(), bbox.y),
            Port::Right => (bbox.right(), bbox.center_y()),
            Port::Bottom => (bbox.center_x(), bbox.bottom()),
            Port::Left => (bbox.x, bbox.center_y()),
        }
    }

    /// Unit vector pointing away from the node.
    pub fn outward(self) -> (f32, f32) {
        match self {
            Port::Top => (0.0, -1.0),
            Port::Right => (1.0, 0.0),
            Port::Bottom => (0.0, 1.0),
            Port::Left => (-1.0, 0.0),
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Port::Top | Port::Bottom)
    }
}

/// Picks `(source_port, target_port)` for a connection.
pub fn select_ports(source: &BBox, target: &BBox) -> (Port, Port) {
    let dy = target.center_y() - source.center_y();
    if dy.abs() > HORIZON_FACTOR * source.height {
        if dy > 0.0 {
            (Port::Bottom, Port::Top)
        } else {
            (Port::Top, Port::Bottom)
        }
    } else {
        (Port::Right, Port::Left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_at(x: f32, y: f32) -> BBox {
        BBox::new(x, y, 250.0, 120.0)
    }

    #[test]
    fn side_by_side_nodes_connect_right_to_left() {
        let source = node_at(0.0, 0.0);
        assert_eq!(select_ports(&source, &node_at(400.0, 0.0)), (Port::Right, Port::Left));
        // Within the horizon: 1.5 * 120 = 180.
        assert_eq!(select_ports(&source, &node_at(400.0, 180.0)), (Port::Right, Port::Left));
        // Targets behind the source still use right -> left.
        assert_eq!(select_ports(&source, &node_at(-400.0, 50.0)), (Port::Right, Port::Left));
    }

    #[test]
    fn distant_rows_switch_to_vertical_flow() {
        let source = node_at(0.0, 0.0);
        assert_eq!(select_ports(&source, &node_at(0.0, 181.0)), (Port::Bottom, Port::Top));
        assert_eq!(select_ports(&source, &node_at(300.0, -400.0)), (Port::Top, Port::Bottom));
    }

    #[test]
    fn anchors_sit_on_side_midpoints() {
        let bbox = BBox::new(10.0, 20.0, 100.0, 40.0);
        assert_eq!(Port::Top.anchor(&bbox), (60.0, 20.0));
        assert_eq!(Port::Right.anchor(&bbox), (110.0, 40.0));
        assert_eq!(Port::Bottom.anchor(&bbox), (60.0, 60.0));
        assert_eq!(Port::Left.anchor(&bbox), (10.0, 40.0));
        assert!(Port::Bottom.is_vertical() && !Port::Left.is_vertical());
    }
}
