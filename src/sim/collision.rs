//! Contact classification and dispatch
//!
//! A reported contact is seen once from each side. Only players and
//! destructibles react; indestructibles and non-interactives are passive.
//! The reacting side classifies the other participant by kind tag and runs
//! one of four handlers, which return [`Reaction`]s for the level to apply.
//! Handlers never mutate the world directly.

use super::entity::{Asteroid, EntityId, KindTag, Mine, Player};

/// What the other participant turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactClass {
    Player,
    Destructible,
    Indestructible,
    NonInteractive,
}

/// Priority match on the other participant. `None` means it could not be
/// resolved (already destroyed, or never existed).
pub fn classify(other: Option<KindTag>) -> Option<ContactClass> {
    match other? {
        KindTag::Player => Some(ContactClass::Player),
        KindTag::Destructible => Some(ContactClass::Destructible),
        KindTag::Indestructible => Some(ContactClass::Indestructible),
        KindTag::NonInteractive => Some(ContactClass::NonInteractive),
    }
}

/// Routing decision for one side of a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The receiver does not react to contacts
    Passive,
    Handle(ContactClass),
    /// The other side could not be classified; log and ignore
    Unclassified,
}

/// Pure routing from (receiver tag, other tag) to a handler
pub fn dispatch(receiver: KindTag, other: Option<KindTag>) -> Dispatch {
    match receiver {
        KindTag::Player | KindTag::Destructible => match classify(other) {
            Some(class) => Dispatch::Handle(class),
            None => Dispatch::Unclassified,
        },
        KindTag::Indestructible | KindTag::NonInteractive => Dispatch::Passive,
    }
}

/// A world change requested by a contact handler
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reaction {
    Damage { target: EntityId, amount: f32 },
    Destroy(EntityId),
    PickUp { player: EntityId, pickup: EntityId },
}

/// Snapshot of one side of a contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactInfo {
    pub this: EntityId,
    pub other: EntityId,
    /// Mass of `this`
    pub mass: f32,
    pub difficulty_modifier: f32,
}

/// Per-variant reactions. Unhandled shapes do nothing.
pub trait ContactHandler {
    fn on_player_contact(&self, _contact: &ContactInfo) -> Vec<Reaction> {
        Vec::new()
    }

    fn on_destructible_contact(&self, _contact: &ContactInfo) -> Vec<Reaction> {
        Vec::new()
    }

    fn on_indestructible_contact(&self, _contact: &ContactInfo) -> Vec<Reaction> {
        Vec::new()
    }

    fn on_non_interactive_contact(&self, _contact: &ContactInfo) -> Vec<Reaction> {
        Vec::new()
    }

    fn handle(&self, class: ContactClass, contact: &ContactInfo) -> Vec<Reaction> {
        match class {
            ContactClass::Player => self.on_player_contact(contact),
            ContactClass::Destructible => self.on_destructible_contact(contact),
            ContactClass::Indestructible => self.on_indestructible_contact(contact),
            ContactClass::NonInteractive => self.on_non_interactive_contact(contact),
        }
    }
}

impl Asteroid {
    /// Damage dealt to whatever this asteroid hits
    pub fn impact_damage(&self, contact: &ContactInfo) -> f32 {
        self.damage_multiply * contact.mass * contact.difficulty_modifier
    }
}

impl ContactHandler for Asteroid {
    fn on_player_contact(&self, contact: &ContactInfo) -> Vec<Reaction> {
        vec![Reaction::Damage {
            target: contact.other,
            amount: self.impact_damage(contact),
        }]
    }

    fn on_destructible_contact(&self, contact: &ContactInfo) -> Vec<Reaction> {
        vec![Reaction::Damage {
            target: contact.other,
            amount: self.impact_damage(contact),
        }]
    }
}

impl Mine {
    fn detonate(&self, contact: &ContactInfo) -> Vec<Reaction> {
        vec![
            Reaction::Damage {
                target: contact.other,
                amount: self.damage * contact.difficulty_modifier,
            },
            Reaction::Destroy(contact.this),
        ]
    }
}

impl ContactHandler for Mine {
    fn on_player_contact(&self, contact: &ContactInfo) -> Vec<Reaction> {
        self.detonate(contact)
    }

    fn on_destructible_contact(&self, contact: &ContactInfo) -> Vec<Reaction> {
        self.detonate(contact)
    }
}

impl ContactHandler for Player {
    fn on_non_interactive_contact(&self, contact: &ContactInfo) -> Vec<Reaction> {
        if self.first_free_slot().is_none() {
            return Vec::new();
        }
        vec![Reaction::PickUp {
            player: contact.this,
            pickup: contact.other,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (EntityId, EntityId) {
        (
            EntityId {
                index: 0,
                generation: 0,
            },
            EntityId {
                index: 1,
                generation: 0,
            },
        )
    }

    #[test]
    fn test_classification_priority() {
        assert_eq!(classify(Some(KindTag::Player)), Some(ContactClass::Player));
        assert_eq!(
            classify(Some(KindTag::Destructible)),
            Some(ContactClass::Destructible)
        );
        assert_eq!(
            classify(Some(KindTag::Indestructible)),
            Some(ContactClass::Indestructible)
        );
        assert_eq!(classify(None), None);
    }

    #[test]
    fn test_passive_sides_never_dispatch() {
        for other in [Some(KindTag::Player), Some(KindTag::Destructible), None] {
            assert_eq!(dispatch(KindTag::Indestructible, other), Dispatch::Passive);
            assert_eq!(dispatch(KindTag::NonInteractive, other), Dispatch::Passive);
        }
    }

    #[test]
    fn test_unresolvable_other_is_unclassified() {
        assert_eq!(dispatch(KindTag::Destructible, None), Dispatch::Unclassified);
        assert_eq!(dispatch(KindTag::Player, None), Dispatch::Unclassified);
        assert_eq!(
            dispatch(KindTag::Player, Some(KindTag::NonInteractive)),
            Dispatch::Handle(ContactClass::NonInteractive)
        );
    }

    #[test]
    fn test_asteroid_damage_formula() {
        let (this, other) = ids();
        let asteroid = Asteroid::default();
        let contact = ContactInfo {
            this,
            other,
            mass: 2.0,
            difficulty_modifier: 1.5,
        };
        let reactions = asteroid.handle(ContactClass::Player, &contact);
        assert_eq!(
            reactions,
            vec![Reaction::Damage {
                target: other,
                amount: 15.0
            }]
        );
        assert!(asteroid.handle(ContactClass::Indestructible, &contact).is_empty());
        assert!(asteroid.handle(ContactClass::NonInteractive, &contact).is_empty());
    }

    #[test]
    fn test_mine_detonates_on_destructible() {
        let (this, other) = ids();
        let mine = Mine::default();
        let contact = ContactInfo {
            this,
            other,
            mass: 0.25,
            difficulty_modifier: 2.0,
        };
        let reactions = mine.handle(ContactClass::Destructible, &contact);
        assert_eq!(reactions.len(), 2);
        assert_eq!(reactions[1], Reaction::Destroy(this));
    }

    #[test]
    fn test_full_player_cannot_pick_up() {
        let (this, other) = ids();
        let mut player = Player::new(0);
        let contact = ContactInfo {
            this,
            other,
            mass: 1.0,
            difficulty_modifier: 1.0,
        };
        assert_eq!(
            player.handle(ContactClass::NonInteractive, &contact),
            vec![Reaction::PickUp {
                player: this,
                pickup: other
            }]
        );

        for slot in player.items.iter_mut() {
            *slot = Some(Box::new(crate::items::Armor::default()));
        }
        assert!(player.handle(ContactClass::NonInteractive, &contact).is_empty());
    }
}
