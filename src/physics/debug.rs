/// Debug draw commands for an external renderer.
///
/// Nothing is drawn here. Each frame the interpolated state of every body is
/// turned into integer-coordinate primitives in [`DrawList`], which the host
/// hands to whatever renderer it uses.

use bevy::prelude::*;

use crate::config::PhysicsConfig;
use crate::math::{to_draw_coord, FixedPointVector2};
use super::components::*;
use super::resources::RenderDelta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Colour {
    Aqua,
    PaleVioletRed,
    Orange,
    White,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCommand {
    Plus { colour: Colour, x: i32, y: i32, size: i32 },
    Cross { colour: Colour, x: i32, y: i32, size: i32 },
    Circle { colour: Colour, x: i32, y: i32, radius: i32 },
    Box { colour: Colour, min_x: i32, min_y: i32, max_x: i32, max_y: i32 },
    Line { colour: Colour, from_x: i32, from_y: i32, to_x: i32, to_y: i32 },
}

impl DrawCommand {
    pub fn colour(&self) -> Colour {
        match *self {
            DrawCommand::Plus { colour, .. }
            | DrawCommand::Cross { colour, .. }
            | DrawCommand::Circle { colour, .. }
            | DrawCommand::Box { colour, .. }
            | DrawCommand::Line { colour, .. } => colour,
        }
    }

    fn line(colour: Colour, from: FixedPointVector2, to: FixedPointVector2) -> Self {
        let (from_x, from_y) = from.to_draw_point();
        let (to_x, to_y) = to.to_draw_point();
        DrawCommand::Line { colour, from_x, from_y, to_x, to_y }
    }
}

/// This frame's draw commands, ordered by [`BodyId`].
#[derive(Resource, Debug, Clone, Default)]
pub struct DrawList {
    pub commands: Vec<DrawCommand>,
}

pub fn debug_draw_enabled(config: Res<PhysicsConfig>) -> bool {
    config.debug_draw
}

/// Rebuilds the [`DrawList`] from interpolated body positions.
pub fn collect_draw_commands(
    config: Res<PhysicsConfig>,
    delta: Res<RenderDelta>,
    bodies: Query<(Option<&BodyId>, &SimTransform, Option<&BoxCollider>, Option<&CircleCollider>)>,
    mut draw_list: ResMut<DrawList>,
) {
    let mut bodies: Vec<_> = bodies.iter().collect();
    bodies.sort_by_key(|(id, ..)| id.copied());

    draw_list.commands.clear();
    for (_, transform, box_collider, circle_collider) in bodies {
        let point = transform.interpolate(delta.0);
        let (x, y) = point.to_draw_point();
        draw_list.commands.push(DrawCommand::Plus { colour: Colour::Aqua, x, y, size: config.marker_size });

        if let Some(collider) = box_collider {
            let aabb = collider.to_aabb(point);
            let (min_x, min_y) = aabb.min.to_draw_point();
            let (max_x, max_y) = aabb.max.to_draw_point();
            draw_list.commands.push(DrawCommand::Box { colour: Colour::PaleVioletRed, min_x, min_y, max_x, max_y });
        }

        if let Some(collider) = circle_collider {
            let (x, y) = (point + collider.center).to_draw_point();
            let radius = to_draw_coord(collider.radius.floor());
            draw_list.commands.push(DrawCommand::Circle { colour: Colour::PaleVioletRed, x, y, radius });
        }

        if let Midpoint::Waypoint(midpoint) = transform.midpoint() {
            let (x, y) = midpoint.to_draw_point();
            draw_list.commands.push(DrawCommand::Cross { colour: Colour::Orange, x, y, size: config.marker_size });
            draw_list.commands.push(DrawCommand::line(Colour::White, transform.position_last_tick(), midpoint));
            draw_list.commands.push(DrawCommand::line(Colour::White, midpoint, transform.position()));
        }
    }
}
