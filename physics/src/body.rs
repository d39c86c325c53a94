use crate::{bounds::Bounds, math::Transform, shapes::Shape};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Stable handle to a body. The generation detects handles to deleted bodies whose slot has been
/// reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl Default for BodyHandle {
    // default to invalid value
    fn default() -> Self {
        Self {
            index: u32::MAX,
            generation: u32::MAX,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    /// Never moves, infinite mass.
    Static,
    /// Moves by its velocity only, infinite mass.
    Kinematic,
    /// Driven by forces and contacts.
    Dynamic,
}

/// Everything needed to create a body.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyDesc {
    pub body_type: BodyType,
    pub shape: Shape,
    pub density: f32,
    pub restitution: f32,
    pub friction: f32,
    pub position: Vec2,
    pub rotation: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub fixed_rotation: bool,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            body_type: BodyType::Dynamic,
            shape: Shape::default(),
            density: 1.0,
            restitution: 0.5,
            friction: 0.5,
            position: Vec2::ZERO,
            rotation: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            fixed_rotation: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Body {
    pub position: Vec2,
    /// Angle in radians.
    pub rotation: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub restitution: f32,
    pub friction: f32,

    body_type: BodyType,
    shape: Shape,
    density: f32,
    fixed_rotation: bool,

    force: Vec2,
    torque: f32,

    mass: f32,
    inv_mass: f32,
    inertia: f32,
    inv_inertia: f32,

    // leaf in the broad phase tree, inserted lazily on the first step
    pub(crate) proxy: Option<u32>,
    // dense index into the solver arrays, rebuilt every step
    pub(crate) solver_index: usize,
}

impl Default for Body {
    fn default() -> Self {
        Self::new(BodyDesc::default())
    }
}

impl Body {
    pub fn new(desc: BodyDesc) -> Self {
        let mut body = Self {
            position: desc.position,
            rotation: desc.rotation,
            linear_velocity: desc.linear_velocity,
            angular_velocity: desc.angular_velocity,
            restitution: desc.restitution,
            friction: desc.friction,
            body_type: desc.body_type,
            shape: desc.shape,
            density: desc.density,
            fixed_rotation: desc.fixed_rotation,
            force: Vec2::ZERO,
            torque: 0.0,
            mass: 0.0,
            inv_mass: 0.0,
            inertia: 0.0,
            inv_inertia: 0.0,
            proxy: None,
            solver_index: 0,
        };
        body.update_mass();
        body
    }

    fn update_mass(&mut self) {
        self.mass = self.shape.area() * self.density;
        self.inertia = self.shape.inertia(self.density);
        self.inv_mass = if self.mass > 0.0 { self.mass.recip() } else { 0.0 };
        self.inv_inertia = if self.inertia > 0.0 {
            self.inertia.recip()
        } else {
            0.0
        };
    }

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    pub fn set_body_type(&mut self, body_type: BodyType) {
        self.body_type = body_type;
        if body_type != BodyType::Dynamic {
            self.force = Vec2::ZERO;
            self.torque = 0.0;
        }
        if body_type == BodyType::Static {
            self.linear_velocity = Vec2::ZERO;
            self.angular_velocity = 0.0;
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Replaces the shape and recomputes the mass properties.
    pub fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
        self.update_mass();
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn set_density(&mut self, density: f32) {
        self.density = density;
        self.update_mass();
    }

    pub fn fixed_rotation(&self) -> bool {
        self.fixed_rotation
    }

    pub fn set_fixed_rotation(&mut self, fixed_rotation: bool) {
        self.fixed_rotation = fixed_rotation;
        if fixed_rotation {
            self.angular_velocity = 0.0;
        }
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    pub fn inv_inertia(&self) -> f32 {
        self.inv_inertia
    }

    /// Inverse mass as seen by the contact solver, zero unless dynamic.
    pub(crate) fn solver_inv_mass(&self) -> f32 {
        if self.is_dynamic() {
            self.inv_mass
        } else {
            0.0
        }
    }

    /// Inverse inertia as seen by the contact solver, zero unless dynamic and free to rotate.
    pub(crate) fn solver_inv_inertia(&self) -> f32 {
        if self.is_dynamic() && !self.fixed_rotation {
            self.inv_inertia
        } else {
            0.0
        }
    }

    pub fn has_infinite_mass(&self) -> bool {
        self.solver_inv_mass() == 0.0
    }

    pub fn force(&self) -> Vec2 {
        self.force
    }

    pub fn torque(&self) -> f32 {
        self.torque
    }

    /// Accumulates a force through the body origin until the end of the next step.
    pub fn apply_force(&mut self, force: Vec2) {
        if !self.is_dynamic() {
            return;
        }
        self.force += force;
    }

    pub fn apply_torque(&mut self, torque: f32) {
        if !self.is_dynamic() {
            return;
        }
        self.torque += torque;
    }

    /// Accumulates a force applied at a world space point.
    pub fn apply_force_at_point(&mut self, force: Vec2, world_point: Vec2) {
        if !self.is_dynamic() {
            return;
        }
        self.force += force;
        self.torque += (world_point - self.position).perp_dot(force);
    }

    pub fn apply_impulse_linear(&mut self, impulse: Vec2) {
        if self.has_infinite_mass() {
            return;
        }

        // p = mv
        // dp = m dv = J
        // => dv = J / m
        self.linear_velocity += impulse * self.inv_mass;
    }

    pub fn apply_impulse_angular(&mut self, impulse: f32) {
        if self.has_infinite_mass() {
            return;
        }
        self.angular_velocity += impulse * self.solver_inv_inertia();
    }

    pub(crate) fn clear_forces(&mut self) {
        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.rotation)
    }

    /// Tight world space bounds of the shape.
    pub fn bounds(&self) -> Bounds {
        self.shape.bounds(&self.transform())
    }

    pub fn local_to_world(&self, body_point: Vec2) -> Vec2 {
        self.transform().transform_point(body_point)
    }

    pub fn world_to_local(&self, world_point: Vec2) -> Vec2 {
        self.transform().inv_transform_point(world_point)
    }

    /// True when the body has no pending force and moves slower than the given tolerances.
    pub(crate) fn is_quiet(&self, linear_tolerance: f32, angular_tolerance: f32) -> bool {
        self.force == Vec2::ZERO
            && self.torque == 0.0
            && self.linear_velocity.length_squared() <= linear_tolerance * linear_tolerance
            && self.angular_velocity.abs() <= angular_tolerance
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    body: Option<Body>,
}

/// Owns the bodies. Slots are recycled through a free list, handles stay valid until the body is
/// removed and iteration follows creation order.
#[derive(Debug, Default)]
pub struct BodyArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    handles: Vec<BodyHandle>,
}

impl BodyArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, body: Body) -> BodyHandle {
        let handle = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.body = Some(body);
            BodyHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                body: Some(body),
            });
            BodyHandle {
                index,
                generation: 0,
            }
        };
        self.handles.push(handle);
        handle
    }

    pub fn remove(&mut self, handle: BodyHandle) -> Option<Body> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let body = slot.body.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.handles.retain(|&h| h != handle);
        Some(body)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.get_body(handle).is_some()
    }

    pub fn get_body(&self, handle: BodyHandle) -> Option<&Body> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_ref())
    }

    pub fn get_body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_mut())
    }

    /// Live handles in creation order.
    pub fn handles(&self) -> &[BodyHandle] {
        &self.handles
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &Body)> + '_ {
        self.handles
            .iter()
            .filter_map(move |&handle| self.get_body(handle).map(|body| (handle, body)))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.handles.clear();
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
