use crate::{
    body::BodyHandle,
    manifold::{ContactManifold, ContactType, FeatureId},
};
use glam::{Mat2, Vec2};
use std::collections::HashMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactHandle(pub u32);

/// Solver state of one manifold point.
#[derive(Copy, Clone, Debug, Default)]
pub struct ContactPoint {
    /// Lever arm from body A's origin.
    pub r_a: Vec2,
    /// Lever arm from body B's origin.
    pub r_b: Vec2,
    pub normal_impulse: f32,
    pub tangent_impulse: f32,
    pub normal_mass: f32,
    pub tangent_mass: f32,
    pub velocity_bias: f32,
}

/// Coupled normal mass of a two point manifold.
#[derive(Copy, Clone, Debug)]
pub struct BlockMass {
    pub k: Mat2,
    pub normal_mass: Mat2,
}

#[derive(Clone, Debug)]
pub struct Contact {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub manifold: ContactManifold,
    pub points: [ContactPoint; 2],
    pub friction: f32,
    pub restitution: f32,

    // filled in when the velocity constraints are built
    pub(crate) index_a: usize,
    pub(crate) index_b: usize,
    pub(crate) inv_mass_a: f32,
    pub(crate) inv_inertia_a: f32,
    pub(crate) inv_mass_b: f32,
    pub(crate) inv_inertia_b: f32,
    pub(crate) block: Option<BlockMass>,
    // points taking part in the velocity solve this step
    pub(crate) solver_count: usize,
}

impl Contact {
    fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            manifold: ContactManifold::default(),
            points: [ContactPoint::default(); 2],
            friction: 0.0,
            restitution: 0.0,
            index_a: 0,
            index_b: 0,
            inv_mass_a: 0.0,
            inv_inertia_a: 0.0,
            inv_mass_b: 0.0,
            inv_inertia_b: 0.0,
            block: None,
            solver_count: 0,
        }
    }

    /// Stores a fresh manifold. Accumulated impulses survive only when the same features
    /// generated the same number of points.
    pub fn refresh(&mut self, manifold: ContactManifold) {
        let persistent = manifold.feature == self.manifold.feature
            && manifold.feature != FeatureId::INVALID
            && manifold.count == self.manifold.count;
        if !persistent {
            for point in &mut self.points {
                point.normal_impulse = 0.0;
                point.tangent_impulse = 0.0;
            }
        }
        self.manifold = manifold;
    }

    pub fn other(&self, body: BodyHandle) -> BodyHandle {
        if body == self.body_a {
            self.body_b
        } else {
            self.body_a
        }
    }

    pub fn view(&self) -> ContactView {
        let mut normal_impulses = [0.0; 2];
        let mut tangent_impulses = [0.0; 2];
        for i in 0..self.manifold.count {
            normal_impulses[i] = self.points[i].normal_impulse;
            tangent_impulses[i] = self.points[i].tangent_impulse;
        }
        ContactView {
            body_a: self.body_a,
            body_b: self.body_b,
            contact_type: self.manifold.contact_type,
            feature: self.manifold.feature,
            count: self.manifold.count,
            points: self.manifold.points,
            normal: self.manifold.normal,
            depths: self.manifold.depths,
            ref_points: self.manifold.ref_points,
            inc_points: self.manifold.inc_points,
            normal_impulses,
            tangent_impulses,
        }
    }
}

/// Read only snapshot of a contact for debug drawing and inspection.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactView {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub contact_type: ContactType,
    pub feature: FeatureId,
    pub count: usize,
    pub points: [Vec2; 2],
    pub normal: Vec2,
    pub depths: [f32; 2],
    pub ref_points: [Vec2; 2],
    pub inc_points: [Vec2; 2],
    pub normal_impulses: [f32; 2],
    pub tangent_impulses: [f32; 2],
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ContactEdge {
    pub other: BodyHandle,
    pub contact: ContactHandle,
}

/// Live contacts plus, for every body, the edges to the contacts it takes part in.
#[derive(Debug, Default)]
pub struct ContactGraph {
    contacts: Vec<Option<Contact>>,
    free: Vec<u32>,
    edges: HashMap<BodyHandle, Vec<ContactEdge>>,
    len: usize,
}

impl ContactGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, handle: ContactHandle) -> Option<&Contact> {
        self.contacts.get(handle.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, handle: ContactHandle) -> Option<&mut Contact> {
        self.contacts.get_mut(handle.0 as usize)?.as_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Contact> {
        self.contacts.iter_mut().flatten()
    }

    /// Contact edges of a body.
    pub fn edges(&self, body: BodyHandle) -> &[ContactEdge] {
        self.edges.get(&body).map_or(&[], |edges| edges.as_slice())
    }

    pub fn find(&self, a: BodyHandle, b: BodyHandle) -> Option<ContactHandle> {
        self.edges(a)
            .iter()
            .find(|edge| edge.other == b)
            .map(|edge| edge.contact)
    }

    pub fn contains(&self, a: BodyHandle, b: BodyHandle) -> bool {
        self.find(a, b).is_some()
    }

    /// Links two bodies with a new contact whose feature id is invalid, so its first manifold
    /// starts from zero impulses.
    pub fn create(&mut self, body_a: BodyHandle, body_b: BodyHandle) -> ContactHandle {
        debug_assert!(!self.contains(body_a, body_b));
        let contact = Contact::new(body_a, body_b);
        let handle = if let Some(index) = self.free.pop() {
            self.contacts[index as usize] = Some(contact);
            ContactHandle(index)
        } else {
            self.contacts.push(Some(contact));
            ContactHandle((self.contacts.len() - 1) as u32)
        };
        self.len += 1;

        self.edges.entry(body_a).or_default().insert(
            0,
            ContactEdge {
                other: body_b,
                contact: handle,
            },
        );
        self.edges.entry(body_b).or_default().insert(
            0,
            ContactEdge {
                other: body_a,
                contact: handle,
            },
        );
        handle
    }

    fn unlink(&mut self, body: BodyHandle, handle: ContactHandle) {
        if let Some(edges) = self.edges.get_mut(&body) {
            edges.retain(|edge| edge.contact != handle);
            if edges.is_empty() {
                self.edges.remove(&body);
            }
        }
    }

    pub fn destroy(&mut self, handle: ContactHandle) -> Option<Contact> {
        let contact = self.contacts.get_mut(handle.0 as usize)?.take()?;
        self.unlink(contact.body_a, handle);
        self.unlink(contact.body_b, handle);
        self.free.push(handle.0);
        self.len -= 1;
        Some(contact)
    }

    /// Destroys every contact touching `body`, returning how many were removed.
    pub fn destroy_body_contacts(&mut self, body: BodyHandle) -> usize {
        let edges = self.edges.remove(&body).unwrap_or_default();
        for edge in &edges {
            if let Some(slot) = self.contacts.get_mut(edge.contact.0 as usize) {
                if slot.take().is_some() {
                    self.free.push(edge.contact.0);
                    self.len -= 1;
                }
            }
            self.unlink(edge.other, edge.contact);
        }
        edges.len()
    }

    /// Runs the narrow phase over every live contact. Contacts whose shapes no longer touch are
    /// destroyed, the rest get their manifold refreshed.
    pub fn update<F>(&mut self, mut narrow_phase: F)
    where
        F: FnMut(&Contact) -> Option<ContactManifold>,
    {
        for index in 0..self.contacts.len() {
            let manifold = match &self.contacts[index] {
                Some(contact) => narrow_phase(contact),
                None => continue,
            };
            match manifold {
                Some(manifold) => {
                    if let Some(contact) = &mut self.contacts[index] {
                        contact.refresh(manifold);
                    }
                }
                None => {
                    self.destroy(ContactHandle(index as u32));
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.contacts.clear();
        self.free.clear();
        self.edges.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::body::{Body, BodyArena};
    use crate::shapes::ShapeKind;

    fn bodies(count: usize) -> Vec<BodyHandle> {
        let mut arena = BodyArena::new();
        (0..count).map(|_| arena.add(Body::default())).collect()
    }

    fn manifold(edge: u8, count: usize) -> ContactManifold {
        ContactManifold {
            count,
            feature: FeatureId::new(ShapeKind::Box, ShapeKind::Box, edge, 0, false),
            ..ContactManifold::default()
        }
    }

    #[test]
    fn test_create_and_destroy() {
        let b = bodies(3);
        let mut graph = ContactGraph::new();
        let ab = graph.create(b[0], b[1]);
        let bc = graph.create(b[1], b[2]);
        assert_eq!(graph.len(), 2);
        assert!(graph.contains(b[1], b[0]));
        assert!(!graph.contains(b[0], b[2]));
        assert_eq!(graph.edges(b[1]).len(), 2);
        // newest edge first
        assert_eq!(graph.edges(b[1])[0].contact, bc);

        graph.destroy(ab);
        assert_eq!(graph.len(), 1);
        assert!(!graph.contains(b[0], b[1]));
        assert!(graph.edges(b[0]).is_empty());
        assert_eq!(graph.edges(b[1]).len(), 1);

        // freed slots are reused
        let ca = graph.create(b[2], b[0]);
        assert_eq!(ca, ab);
    }

    #[test]
    fn test_destroy_body_contacts() {
        let b = bodies(4);
        let mut graph = ContactGraph::new();
        graph.create(b[0], b[1]);
        graph.create(b[0], b[2]);
        graph.create(b[3], b[0]);
        graph.create(b[1], b[2]);

        assert_eq!(graph.destroy_body_contacts(b[0]), 3);
        assert_eq!(graph.len(), 1);
        assert!(graph.edges(b[0]).is_empty());
        assert!(graph.edges(b[3]).is_empty());
        assert!(graph.contains(b[1], b[2]));
        assert_eq!(graph.iter().count(), 1);
    }

    #[test]
    fn test_warm_start_continuity() {
        let b = bodies(2);
        let mut graph = ContactGraph::new();
        let handle = graph.create(b[0], b[1]);
        let contact = graph.get_mut(handle).unwrap();

        contact.refresh(manifold(1, 2));
        contact.points[0].normal_impulse = 3.0;
        contact.points[1].tangent_impulse = 1.0;

        // same features, impulses carry over
        contact.refresh(manifold(1, 2));
        assert_eq!(contact.points[0].normal_impulse, 3.0);
        assert_eq!(contact.points[1].tangent_impulse, 1.0);

        // point count changed
        contact.refresh(manifold(1, 1));
        assert_eq!(contact.points[0].normal_impulse, 0.0);

        contact.points[0].normal_impulse = 3.0;
        // different edge
        contact.refresh(manifold(2, 1));
        assert_eq!(contact.points[0].normal_impulse, 0.0);
    }

    #[test]
    fn test_update_drops_separated_contacts() {
        let b = bodies(3);
        let mut graph = ContactGraph::new();
        graph.create(b[0], b[1]);
        graph.create(b[1], b[2]);

        let touching = b[0];
        graph.update(|contact| {
            if contact.body_a == touching {
                Some(manifold(0, 1))
            } else {
                None
            }
        });

        assert_eq!(graph.len(), 1);
        assert!(graph.contains(b[0], b[1]));
        assert!(!graph.contains(b[1], b[2]));
        assert!(graph.edges(b[2]).is_empty());
    }

    #[test]
    fn test_update_drops_contact_when_epa_gives_up() {
        use crate::gjk;
        use crate::math::Transform;
        use crate::shapes::Shape;

        let circle = Shape::make_circle(1.0).unwrap();
        let triangle = Shape::make_polygon(&[
            Vec2::new(-2.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(0.0, -2.0),
        ])
        .unwrap();
        let xf_a = Transform::new(Vec2::new(0.0, 0.75), 0.0);
        let xf_b = Transform::default();

        let b = bodies(2);
        let mut graph = ContactGraph::new();
        graph.create(b[0], b[1]);

        // overlapping shapes, but the expansion runs out of iterations
        let narrow_phase = |max_iterations| {
            let simplex = gjk::gjk_intersect(&circle, &xf_a, &triangle, &xf_b)?;
            gjk::expand_polytope(&circle, &xf_a, &triangle, &xf_b, simplex, max_iterations)
                .map(|_| manifold(0, 1))
        };
        graph.update(|_| narrow_phase(gjk::EPA_MAX_ITERATIONS));
        assert_eq!(graph.len(), 1);

        graph.update(|_| narrow_phase(1));
        assert!(graph.is_empty());
        assert!(graph.edges(b[0]).is_empty());
        assert!(graph.edges(b[1]).is_empty());
    }
}
