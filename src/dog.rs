//! Dogs and the lost items they collect.

use crate::geom::{Coords, Vec2};
use crate::movement::{Direction, MoveIntent};

/// A collectible item lying somewhere on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LostItem {
    pub id: u64,
    /// Index into the map's loot-type catalog.
    pub type_index: usize,
    pub position: Coords,
}

/// Bounded ordered container for the items a dog carries.
///
/// `try_add` hands the item back when the bag is full so the caller can
/// leave it in the world; `drain` empties the bag for deposit at an office.
#[derive(Debug)]
pub struct Bag {
    capacity: usize,
    items: Vec<LostItem>,
}

impl Bag {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn try_add(&mut self, item: LostItem) -> Result<(), LostItem> {
        if self.items.len() >= self.capacity {
            return Err(item);
        }
        self.items.push(item);
        Ok(())
    }

    pub fn drain(&mut self) -> Vec<LostItem> {
        std::mem::take(&mut self.items)
    }

    pub fn items(&self) -> &[LostItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }
}

/// One player's avatar inside a session.
#[derive(Debug)]
pub struct Dog {
    id: u64,
    name: String,
    position: Coords,
    velocity: Vec2,
    direction: Direction,
    bag: Bag,
    score: u32,
}

impl Dog {
    pub fn new(id: u64, name: impl Into<String>, spawn: Coords, bag_capacity: usize) -> Self {
        Self {
            id,
            name: name.into(),
            position: spawn,
            velocity: Vec2::ZERO,
            direction: Direction::North,
            bag: Bag::new(bag_capacity),
            score: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Coords {
        self.position
    }

    pub fn set_position(&mut self, position: Coords) {
        self.position = position;
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn stop(&mut self) {
        self.velocity = Vec2::ZERO;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn bag(&self) -> &Bag {
        &self.bag
    }

    pub fn bag_mut(&mut self) -> &mut Bag {
        &mut self.bag
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn add_score(&mut self, points: u32) {
        self.score += points;
    }

    /// Apply a validated move command: turn and run at `speed`, or halt.
    /// The facing is only changed by a Go intent, so a stopped dog keeps
    /// looking where it last ran.
    pub fn apply_intent(&mut self, intent: MoveIntent, speed: f64) {
        match intent {
            MoveIntent::Go(direction) => {
                self.direction = direction;
                self.velocity = direction.velocity(speed);
            }
            MoveIntent::Stop => self.velocity = Vec2::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64) -> LostItem {
        LostItem {
            id,
            type_index: 0,
            position: Coords::new(0.0, 0.0),
        }
    }

    #[test]
    fn test_bag_respects_capacity() {
        let mut bag = Bag::new(2);
        assert!(bag.try_add(item(1)).is_ok());
        assert!(bag.try_add(item(2)).is_ok());
        assert!(bag.is_full());

        let rejected = bag.try_add(item(3)).unwrap_err();
        assert_eq!(rejected.id, 3);
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn test_bag_drain_preserves_order_and_empties() {
        let mut bag = Bag::new(3);
        bag.try_add(item(5)).unwrap();
        bag.try_add(item(1)).unwrap();

        let drained = bag.drain();
        assert_eq!(drained.iter().map(|i| i.id).collect::<Vec<_>>(), vec![5, 1]);
        assert!(bag.is_empty());
    }

    #[test]
    fn test_zero_capacity_bag_rejects_everything() {
        let mut bag = Bag::new(0);
        assert!(bag.try_add(item(1)).is_err());
    }

    #[test]
    fn test_intent_sets_facing_and_velocity() {
        let mut dog = Dog::new(0, "Rex", Coords::new(0.0, 0.0), 3);
        dog.apply_intent(MoveIntent::Go(Direction::East), 4.0);
        assert_eq!(dog.direction(), Direction::East);
        assert_eq!(dog.velocity(), Vec2::new(4.0, 0.0));
    }

    #[test]
    fn test_stop_keeps_facing() {
        let mut dog = Dog::new(0, "Rex", Coords::new(0.0, 0.0), 3);
        dog.apply_intent(MoveIntent::Go(Direction::West), 4.0);
        dog.apply_intent(MoveIntent::Stop, 4.0);
        assert_eq!(dog.direction(), Direction::West);
        assert!(dog.velocity().is_zero());
    }
}
