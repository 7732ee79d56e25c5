//! Gather detection between moving dogs and stationary collectibles.
//!
//! Every dog is swept as a segment from its pre-tick to post-tick position
//! with a capture radius; loot items and offices are stationary points with
//! their own radii. An event fires when the minimum distance between the
//! swept segment and the point is within the radius sum. The detector is
//! pure: applying event effects (bag, score) is the session's job.

use crate::geom::{project_onto_segment, Coords};

/// Capture radius of a dog (half of its 0.6 width).
pub const GATHERER_RADIUS: f64 = 0.3;
/// Loot items are collected on exact contact with the capture circle.
pub const ITEM_RADIUS: f64 = 0.0;
/// Deposit radius of an office (half of its 0.5 width).
pub const BASE_RADIUS: f64 = 0.25;

/// Identity of a stationary collectible. Items sort before offices, and
/// items among themselves by ascending id, which fixes the resolution order
/// of simultaneous events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CollectibleId {
    Item(u64),
    Office(usize),
}

/// A moving dog, reduced to what the detector needs.
#[derive(Debug, Clone, Copy)]
pub struct Gatherer {
    pub id: u64,
    pub start: Coords,
    pub end: Coords,
    pub radius: f64,
}

/// A stationary point a gatherer can reach: a loot item or an office.
#[derive(Debug, Clone, Copy)]
pub struct Collectible {
    pub id: CollectibleId,
    pub position: Coords,
    pub radius: f64,
}

/// One contact during the tick's displacement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatherEvent {
    pub gatherer_id: u64,
    pub collectible_id: CollectibleId,
    /// Position along the gatherer's sweep at which contact happened,
    /// 0.0 = tick start, 1.0 = tick end.
    pub time: f64,
    pub sq_distance: f64,
}

/// Find every contact between the swept gatherers and the collectibles,
/// ordered by contact time, then by collectible id for determinism.
pub fn find_gather_events(
    gatherers: &[Gatherer],
    collectibles: &[Collectible],
) -> Vec<GatherEvent> {
    let mut events = Vec::new();

    for gatherer in gatherers {
        for collectible in collectibles {
            let proj = project_onto_segment(gatherer.start, gatherer.end, collectible.position);
            let reach = gatherer.radius + collectible.radius;
            if proj.within_segment() && proj.sq_distance <= reach * reach {
                events.push(GatherEvent {
                    gatherer_id: gatherer.id,
                    collectible_id: collectible.id,
                    time: proj.ratio,
                    sq_distance: proj.sq_distance,
                });
            }
        }
    }

    events.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then(a.collectible_id.cmp(&b.collectible_id))
    });
    events
}
