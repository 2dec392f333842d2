//! Physics collaborator
//!
//! The level only needs something that advances bodies and reports which
//! pairs started touching. [`BasicPhysics`] is the built-in stand-in: Euler
//! integration, arena wrap-around and circle overlap tests.

use std::collections::BTreeSet;

use super::entity::{Body, EntityId};
use crate::wrap_position;

/// Bounce factor between two solid bodies
const RESTITUTION: f32 = 0.8;

/// A body exposed to the physics step for one tick
pub struct BodyMut<'a> {
    pub id: EntityId,
    pub body: &'a mut Body,
}

/// Two bodies that started touching this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Contact {
    pub a: EntityId,
    pub b: EntityId,
}

pub trait PhysicsStep {
    /// Advance every body by `dt` and report new contacts in a stable order
    fn step(&mut self, bodies: &mut [BodyMut<'_>], dt: f32) -> Vec<Contact>;

    /// Forget any contact state carried between steps
    fn reset(&mut self) {}
}

#[derive(Debug, Clone, Default)]
pub struct BasicPhysics {
    touching: BTreeSet<(EntityId, EntityId)>,
}

impl BasicPhysics {
    pub fn new() -> Self {
        Self::default()
    }
}

fn inverse_mass(body: &Body) -> f32 {
    if body.fixed || body.mass <= 0.0 {
        0.0
    } else {
        1.0 / body.mass
    }
}

fn bounce(a: &mut Body, b: &mut Body) {
    let inv_a = inverse_mass(a);
    let inv_b = inverse_mass(b);
    if inv_a + inv_b == 0.0 {
        return;
    }
    let normal = (b.position - a.position).normalize_or_zero();
    let closing = (b.velocity - a.velocity).dot(normal);
    if closing >= 0.0 {
        return;
    }
    let impulse = -(1.0 + RESTITUTION) * closing / (inv_a + inv_b);
    a.velocity -= normal * impulse * inv_a;
    b.velocity += normal * impulse * inv_b;
}

impl PhysicsStep for BasicPhysics {
    fn reset(&mut self) {
        self.touching.clear();
    }

    fn step(&mut self, bodies: &mut [BodyMut<'_>], dt: f32) -> Vec<Contact> {
        for entry in bodies.iter_mut() {
            let body = &mut *entry.body;
            if body.fixed {
                continue;
            }
            body.position = wrap_position(body.position + body.velocity * dt);
            body.angle = (body.angle + body.angular_velocity * dt).rem_euclid(360.0);
        }

        let mut now = BTreeSet::new();
        let mut contacts = Vec::new();

        for i in 0..bodies.len() {
            let (head, tail) = bodies.split_at_mut(i + 1);
            let a = &mut head[i];
            for b in tail.iter_mut() {
                if !a.body.solid && !b.body.solid {
                    continue;
                }
                let reach = a.body.radius() + b.body.radius();
                if a.body.position.distance_squared(b.body.position) >= reach * reach {
                    continue;
                }

                let key = if a.id < b.id { (a.id, b.id) } else { (b.id, a.id) };
                now.insert(key);
                if !self.touching.contains(&key) {
                    contacts.push(Contact { a: key.0, b: key.1 });
                    if a.body.solid && b.body.solid {
                        bounce(a.body, b.body);
                    }
                }
            }
        }

        self.touching = now;
        contacts.sort();
        contacts
    }
}
