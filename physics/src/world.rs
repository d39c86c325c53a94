use crate::{
    body::{Body, BodyArena, BodyDesc, BodyHandle, BodyType},
    broadphase::DbvhTree,
    config::WorldConfig,
    constraints::{
        init_velocity_constraints, solve_position_constraints, solve_velocity_constraints,
        warm_start, Position, Velocity,
    },
    contact::{ContactGraph, ContactView},
    error::{PhysicsError, PhysicsResult},
    intersect::collide,
    shapes::Shape,
};
use glam::Vec2;
use tracing::{debug, trace};

/// What a call to [`World::step`] did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepStatus {
    Simulated,
    /// Everything has been at rest long enough, velocities were zeroed and nothing moved.
    Asleep,
}

pub struct World {
    config: WorldConfig,
    bodies: BodyArena,
    tree: DbvhTree,
    contacts: ContactGraph,
    positions: Vec<Position>,
    velocities: Vec<Velocity>,
    sleeping: bool,
    sleep_timer: u32,
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            tree: DbvhTree::new(config.aabb_enlarge_factor),
            config,
            bodies: BodyArena::new(),
            contacts: ContactGraph::new(),
            positions: Vec::new(),
            velocities: Vec::new(),
            sleeping: false,
            sleep_timer: 0,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut WorldConfig {
        self.wake();
        &mut self.config
    }

    fn wake(&mut self) {
        if self.sleeping {
            debug!("world woken");
        }
        self.sleeping = false;
        self.sleep_timer = 0;
    }

    pub fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let body_type = desc.body_type;
        let handle = self.bodies.add(Body::new(desc));
        debug!(?handle, ?body_type, "created body");
        self.wake();
        handle
    }

    /// Removes a body along with every contact it takes part in.
    pub fn delete_body(&mut self, handle: BodyHandle) -> PhysicsResult<()> {
        if !self.bodies.contains(handle) {
            return Err(PhysicsError::InvalidBody(handle));
        }
        let contact_count = self.contacts.destroy_body_contacts(handle);
        let body = self
            .bodies
            .remove(handle)
            .ok_or(PhysicsError::InvalidBody(handle))?;
        if let Some(proxy) = body.proxy {
            self.tree.remove(proxy);
        }
        debug!(?handle, contact_count, "deleted body");
        self.wake();
        Ok(())
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get_body(handle)
    }

    /// Mutable access wakes the world, the caller may be about to move the body.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        if !self.bodies.contains(handle) {
            return None;
        }
        self.wake();
        self.bodies.get_body_mut(handle)
    }

    /// Replaces the shape of a body and recomputes its mass properties.
    pub fn set_body_shape(&mut self, handle: BodyHandle, shape: Shape) -> PhysicsResult<()> {
        let body = self
            .bodies
            .get_body_mut(handle)
            .ok_or(PhysicsError::InvalidBody(handle))?;
        body.set_shape(shape);
        self.wake();
        Ok(())
    }

    /// Bodies in creation order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> + '_ {
        self.bodies.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn contacts(&self) -> impl Iterator<Item = ContactView> + '_ {
        self.contacts.iter().map(|contact| contact.view())
    }

    pub fn contact_graph(&self) -> &ContactGraph {
        &self.contacts
    }

    pub fn tree(&self) -> &DbvhTree {
        &self.tree
    }

    /// Overlapping broad phase pairs found by the last step.
    pub fn collision_pair_count(&self) -> usize {
        self.tree.pairs().len()
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    pub fn sleep_timer(&self) -> u32 {
        self.sleep_timer
    }

    pub fn sleep_enabled(&self) -> bool {
        self.config.sleep.enabled
    }

    pub fn set_sleep_enabled(&mut self, enabled: bool) {
        self.config.sleep.enabled = enabled;
        if !enabled {
            self.wake();
        }
    }

    /// Removes every body and contact.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
        self.tree.clear();
        self.positions.clear();
        self.velocities.clear();
        self.wake();
    }

    fn all_quiet(&self) -> bool {
        let sleep = &self.config.sleep;
        self.bodies
            .iter()
            .all(|(_, body)| body.is_quiet(sleep.linear_tolerance, sleep.angular_tolerance))
    }

    pub fn step(&mut self, dt: f32) -> StepStatus {
        // dense solver indices in creation order, new bodies join the broad phase
        for index in 0..self.bodies.len() {
            let handle = self.bodies.handles()[index];
            if let Some(body) = self.bodies.get_body_mut(handle) {
                body.solver_index = index;
                if body.proxy.is_none() {
                    body.proxy = Some(self.tree.insert(handle, body.bounds()));
                }
            }
        }

        let sleep = self.config.sleep;
        if self.sleeping && self.all_quiet() {
            self.sleep_timer += 1;
        } else {
            self.sleeping = false;
            self.sleep_timer = 0;
        }
        if sleep.enabled && self.sleeping && self.sleep_timer > sleep.timer_threshold {
            for index in 0..self.bodies.len() {
                let handle = self.bodies.handles()[index];
                if let Some(body) = self.bodies.get_body_mut(handle) {
                    body.linear_velocity = Vec2::ZERO;
                    body.angular_velocity = 0.0;
                }
            }
            return StepStatus::Asleep;
        }

        self.collide();
        self.integrate_velocities(dt);

        init_velocity_constraints(
            &mut self.contacts,
            &self.bodies,
            &self.positions,
            &self.velocities,
        );
        warm_start(
            &mut self.contacts,
            &mut self.velocities,
            self.config.warm_start_scale,
        );
        for _ in 0..self.config.velocity_iterations {
            solve_velocity_constraints(&mut self.contacts, &mut self.velocities);
        }

        for (position, velocity) in self.positions.iter_mut().zip(&self.velocities) {
            position.c += velocity.v * dt;
            position.a += velocity.w * dt;
        }

        let mut min_separation = 0.0;
        for _ in 0..self.config.position_iterations {
            min_separation =
                solve_position_constraints(&self.contacts, &mut self.positions, &self.config);
        }

        for index in 0..self.bodies.len() {
            let handle = self.bodies.handles()[index];
            if let Some(body) = self.bodies.get_body_mut(handle) {
                let position = self.positions[index];
                let velocity = self.velocities[index];
                body.position = position.c;
                body.rotation = position.a;
                body.linear_velocity = velocity.v;
                body.angular_velocity = velocity.w;
                body.clear_forces();
            }
        }

        let quiet = self.all_quiet();
        if quiet && !self.sleeping {
            debug!("world at rest");
        }
        self.sleeping = quiet;
        if !quiet {
            self.sleep_timer = 0;
        }

        trace!(
            bodies = self.bodies.len(),
            pairs = self.tree.pairs().len(),
            contacts = self.contacts.len(),
            min_separation,
            "step"
        );
        StepStatus::Simulated
    }

    /// Broad phase, then contact creation for new pairs and narrow phase over every contact.
    fn collide(&mut self) {
        for index in 0..self.bodies.len() {
            let handle = self.bodies.handles()[index];
            if let Some(body) = self.bodies.get_body_mut(handle) {
                if let Some(proxy) = body.proxy {
                    body.proxy = Some(self.tree.update(proxy, body.bounds()));
                }
            }
        }

        for pair in self.tree.test_collision() {
            let (body_a, body_b) = match (self.bodies.get_body(pair.a), self.bodies.get_body(pair.b)) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };
            if !body_a.is_dynamic() && !body_b.is_dynamic() {
                continue;
            }
            if !self.contacts.contains(pair.a, pair.b) {
                self.contacts.create(pair.a, pair.b);
            }
        }

        let bodies = &self.bodies;
        self.contacts.update(|contact| {
            let body_a = bodies.get_body(contact.body_a)?;
            let body_b = bodies.get_body(contact.body_b)?;
            if !body_a.is_dynamic() && !body_b.is_dynamic() {
                return None;
            }
            collide(
                body_a.shape(),
                &body_a.transform(),
                body_b.shape(),
                &body_b.transform(),
            )
        });
    }

    /// Semi-implicit Euler on the velocities, filling the dense solver arrays.
    fn integrate_velocities(&mut self, dt: f32) {
        let gravity = self.config.gravity;
        self.positions.clear();
        self.velocities.clear();

        for (_, body) in self.bodies.iter() {
            let mut v = body.linear_velocity;
            let mut w = body.angular_velocity;
            match body.body_type() {
                BodyType::Dynamic => {
                    let force = body.force() + gravity * body.mass();
                    v += force * body.inv_mass() * dt;
                    if body.fixed_rotation() {
                        w = 0.0;
                    } else {
                        w += body.torque() * body.inv_inertia() * dt;
                    }
                }
                BodyType::Static => {
                    v = Vec2::ZERO;
                    w = 0.0;
                }
                BodyType::Kinematic => {}
            }
            self.positions.push(Position {
                c: body.position,
                a: body.rotation,
            });
            self.velocities.push(Velocity { v, w });
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn ground() -> BodyDesc {
        BodyDesc {
            body_type: BodyType::Static,
            shape: Shape::make_box(Vec2::new(10.0, 0.5)).unwrap(),
            ..BodyDesc::default()
        }
    }

    #[test]
    fn test_free_fall() {
        let mut world = World::default();
        let handle = world.create_body(BodyDesc {
            position: Vec2::new(0.0, 10.0),
            ..BodyDesc::default()
        });
        let dt = 1.0 / 60.0;
        assert_eq!(world.step(dt), StepStatus::Simulated);

        let body = world.body(handle).unwrap();
        assert_relative_eq!(body.linear_velocity.y, -9.8 * dt, epsilon = 1e-6);
        assert_relative_eq!(body.position.y, 10.0 - 9.8 * dt * dt, epsilon = 1e-6);
        assert_eq!(world.contact_count(), 0);
        assert_eq!(world.tree().leaf_count(), 1);
    }

    #[test]
    fn test_static_and_kinematic_ignore_gravity() {
        let mut world = World::default();
        let fixed = world.create_body(ground());
        let mover = world.create_body(BodyDesc {
            body_type: BodyType::Kinematic,
            position: Vec2::new(0.0, 5.0),
            linear_velocity: Vec2::new(1.0, 0.0),
            ..BodyDesc::default()
        });
        for _ in 0..60 {
            world.step(1.0 / 60.0);
        }
        assert_eq!(world.body(fixed).unwrap().position, Vec2::ZERO);
        let mover = world.body(mover).unwrap();
        assert_relative_eq!(mover.position.x, 1.0, epsilon = 1e-4);
        assert_eq!(mover.position.y, 5.0);
        assert_eq!(mover.linear_velocity, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_static_pairs_make_no_contacts() {
        let mut world = World::default();
        world.create_body(ground());
        world.create_body(BodyDesc {
            position: Vec2::new(0.5, 0.0),
            ..ground()
        });
        world.step(1.0 / 60.0);
        assert_eq!(world.collision_pair_count(), 1);
        assert_eq!(world.contact_count(), 0);
    }

    #[test]
    fn test_contact_lifecycle() {
        let mut world = World::default();
        world.set_sleep_enabled(false);
        let floor = world.create_body(ground());
        let ball = world.create_body(BodyDesc {
            shape: Shape::make_circle(0.5).unwrap(),
            position: Vec2::new(0.0, 0.95),
            restitution: 0.0,
            ..BodyDesc::default()
        });
        world.step(1.0 / 60.0);
        assert_eq!(world.contact_count(), 1);

        let view = world.contacts().next().unwrap();
        assert_eq!(view.count, 1);
        assert!(view.body_a == floor || view.body_b == floor);
        assert!(view.body_a == ball || view.body_b == ball);

        // throw the ball away, the contact goes the step the shapes separate
        world.body_mut(ball).unwrap().position = Vec2::new(0.0, 1.3);
        world.step(1.0 / 60.0);
        assert_eq!(world.contact_count(), 0);
    }

    #[test]
    fn test_delete_body() {
        let mut world = World::default();
        let floor = world.create_body(ground());
        let block = world.create_body(BodyDesc {
            position: Vec2::new(0.0, 0.95),
            ..BodyDesc::default()
        });
        world.step(1.0 / 60.0);
        assert_eq!(world.contact_count(), 1);

        world.delete_body(block).unwrap();
        assert_eq!(world.contact_count(), 0);
        assert!(world.contact_graph().edges(floor).is_empty());
        assert_eq!(world.tree().leaf_count(), 1);
        assert_eq!(world.body_count(), 1);
        assert!(world.body(block).is_none());

        assert!(matches!(
            world.delete_body(block),
            Err(PhysicsError::InvalidBody(_))
        ));
        assert!(world
            .set_body_shape(block, Shape::make_circle(1.0).unwrap())
            .is_err());
    }

    #[test]
    fn test_set_body_shape() {
        let mut world = World::default();
        let handle = world.create_body(BodyDesc::default());
        world
            .set_body_shape(handle, Shape::make_circle(1.0).unwrap())
            .unwrap();
        assert_relative_eq!(world.body(handle).unwrap().mass(), std::f32::consts::PI);
    }

    #[test]
    fn test_fixed_rotation() {
        let mut world = World::default();
        let handle = world.create_body(BodyDesc {
            fixed_rotation: true,
            angular_velocity: 3.0,
            ..BodyDesc::default()
        });
        world.body_mut(handle).unwrap().apply_torque(10.0);
        world.step(1.0 / 60.0);
        let body = world.body(handle).unwrap();
        assert_eq!(body.angular_velocity, 0.0);
        assert_eq!(body.rotation, 0.0);
        assert_eq!(body.torque(), 0.0);
    }

    #[test]
    fn test_sleep_needs_a_quiet_world() {
        let mut world = World::new(WorldConfig {
            gravity: Vec2::ZERO,
            ..WorldConfig::default()
        });
        let handle = world.create_body(BodyDesc::default());

        // first step settles the flag, then the timer runs past the threshold
        assert_eq!(world.step(1.0 / 60.0), StepStatus::Simulated);
        assert!(world.is_sleeping());
        for _ in 0..20 {
            assert_eq!(world.step(1.0 / 60.0), StepStatus::Simulated);
        }
        assert_eq!(world.sleep_timer(), 20);
        assert_eq!(world.step(1.0 / 60.0), StepStatus::Asleep);
        assert_eq!(world.sleep_timer(), 21);

        // touching a body wakes everything up
        world.body_mut(handle).unwrap().linear_velocity = Vec2::X;
        assert!(!world.is_sleeping());
        assert_eq!(world.step(1.0 / 60.0), StepStatus::Simulated);
        assert!(!world.is_sleeping());
    }

    #[test]
    fn test_sleep_disabled() {
        let mut world = World::new(WorldConfig {
            gravity: Vec2::ZERO,
            ..WorldConfig::default()
        });
        world.set_sleep_enabled(false);
        world.create_body(BodyDesc::default());
        for _ in 0..100 {
            assert_eq!(world.step(1.0 / 60.0), StepStatus::Simulated);
        }
        assert!(world.is_sleeping());
        assert!(!world.sleep_enabled());
    }
}
