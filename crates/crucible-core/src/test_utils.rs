//! Test fixtures for the graph store

use crate::graph::GraphStore;
use crate::loader::RawElement;
use crate::model::TIME_ELEMENT;

/// A small but realistic recipe set.
///
/// Tiers: Steam/Mud/Lava/Energy/Dust/Pressure 1, Stone/Cloud 2, Rain/Sand 3,
/// Glass 4. `Unicorn` has no recipe and is therefore basic.
pub fn sample_elements() -> Vec<RawElement> {
    vec![
        RawElement::new("Air").with_image("../backend/images/Air.svg"),
        RawElement::new("Earth").with_image("images/Earth.svg"),
        RawElement::new("Fire").with_image("/images/Fire.svg"),
        // A primitive with a recipe of its own must not create a cycle.
        RawElement::new("Water")
            .with_image("images/Water.svg")
            .with_recipe("Rain", "Rain"),
        RawElement::new("Steam")
            .with_recipe("Water", "Fire")
            .with_recipe("Fire", "Water"),
        RawElement::new("Mud").with_recipe("Water", "Earth"),
        RawElement::new("Lava").with_recipe("Earth", "Fire"),
        RawElement::new("Energy").with_recipe("Fire", "Air"),
        RawElement::new("Dust").with_recipe("Earth", "Air"),
        RawElement::new("Pressure").with_recipe("Air", "Air"),
        RawElement::new("Stone")
            .with_recipe("Lava", "Water")
            .with_recipe("Lava", "Air"),
        RawElement::new("Cloud").with_recipe("Steam", "Air"),
        RawElement::new("Rain").with_recipe("Cloud", "Water"),
        RawElement::new("Sand").with_recipe("Stone", "Air"),
        RawElement::new("Glass").with_recipe("Sand", "Fire"),
        RawElement::new("Unicorn"),
    ]
}

pub fn sample_store() -> GraphStore {
    GraphStore::from_elements(sample_elements()).unwrap()
}

/// Primitives, `filler_count` recipe-less fillers and a craftable `Time`.
pub fn time_store(filler_count: usize) -> GraphStore {
    let mut elements = vec![
        RawElement::new("Air"),
        RawElement::new("Earth"),
        RawElement::new("Fire"),
        RawElement::new("Water"),
        RawElement::new("Sand").with_recipe("Earth", "Air"),
        RawElement::new(TIME_ELEMENT).with_recipe("Sand", "Sand"),
    ];
    elements.extend((0..filler_count).map(|i| RawElement::new(format!("Filler {}", i))));
    GraphStore::from_elements(elements).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_store_builds() {
        let store = sample_store();
        assert_eq!(store.element_count(), sample_elements().len());
    }
}
