//! The fixed set of worm type descriptors shared by every worm.

use serde::Serialize;
use wormsim_core::WormKind;

/// How a worm treats another worm whose segment lies in its path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Aggression {
    /// Stops in front of other worms
    Passive,
    /// Cuts the other worm in two at the struck segment
    Slice,
    /// Eats the other worm whole
    Devour,
}

/// Everything that differs from one kind of worm to another
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct WormTypeInfo {
    pub kind: WormKind,
    /// Opaque display attribute handed to presentation layers
    pub attr: i32,
    pub aggression: Aggression,
    /// Food another worm gains per segment when it eats a worm of this type
    pub food_value_per_segment: i32,
    /// Stomach room each segment adds, before the configured capacity scale
    pub capacity_per_segment: i32,
}

static REGISTRY: [WormTypeInfo; 3] = [
    WormTypeInfo {
        kind: WormKind::Vegetarian,
        attr: 1,
        aggression: Aggression::Passive,
        food_value_per_segment: 3,
        capacity_per_segment: 3,
    },
    WormTypeInfo {
        kind: WormKind::Scissorhead,
        attr: 2,
        aggression: Aggression::Slice,
        food_value_per_segment: 5,
        capacity_per_segment: 4,
    },
    WormTypeInfo {
        kind: WormKind::Cannibal,
        attr: 3,
        aggression: Aggression::Devour,
        food_value_per_segment: 4,
        capacity_per_segment: 5,
    },
];

/// All registered worm types
pub fn worm_types() -> &'static [WormTypeInfo] {
    &REGISTRY
}

/// Descriptor for a kind of worm
pub fn type_info(kind: WormKind) -> &'static WormTypeInfo {
    match kind {
        WormKind::Vegetarian => &REGISTRY[0],
        WormKind::Scissorhead => &REGISTRY[1],
        WormKind::Cannibal => &REGISTRY[2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_is_registered_once() {
        for kind in WormKind::all() {
            let info = type_info(kind);
            assert_eq!(info.kind, kind);
            assert_eq!(worm_types().iter().filter(|t| t.kind == kind).count(), 1);
        }
    }

    #[test]
    fn test_descriptors_are_shared() {
        let a = type_info(WormKind::Cannibal);
        let b = type_info(WormKind::Cannibal);
        assert!(std::ptr::eq(a, b));
        assert_eq!(a.aggression, Aggression::Devour);
        assert_eq!(type_info(WormKind::Scissorhead).aggression, Aggression::Slice);
        assert_eq!(type_info(WormKind::Vegetarian).aggression, Aggression::Passive);
    }

    #[test]
    fn test_bigger_eaters_hold_more() {
        assert_eq!(type_info(WormKind::Vegetarian).capacity_per_segment, 3);
        assert_eq!(type_info(WormKind::Scissorhead).capacity_per_segment, 4);
        assert_eq!(type_info(WormKind::Cannibal).capacity_per_segment, 5);
    }
}
