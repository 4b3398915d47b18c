use chrono::{Duration, Utc};

use crate::inventory::{Category, Item};
use crate::layout::{Cell, GridGeometry};

pub const DEMO_FRIDGE: &str = "demo";

/// Items for `--offline`: a few already on the grid, the rest waiting for a cell.
pub fn demo_items(geometry: &GridGeometry) -> Vec<Item> {
    let now = Utc::now();

    vec![
        Item::new("milk", "우유", DEMO_FRIDGE)
            .with_category(Category::Dairy)
            .with_position(geometry.anchor(Cell::new(0, 0)))
            .with_expiration(now + Duration::days(2)),
        Item::new("apple", "사과", DEMO_FRIDGE)
            .with_category(Category::Fruit)
            .with_position(geometry.anchor(Cell::new(2, 0)))
            .with_expiration(now + Duration::days(10)),
        Item::new("tofu", "두부", DEMO_FRIDGE)
            .with_category(Category::Other)
            .with_expiration(now - Duration::days(1)),
        Item::new("kimchi", "김치", DEMO_FRIDGE).with_category(Category::Vegetable),
        Item::new("pork", "돼지고기", DEMO_FRIDGE)
            .with_category(Category::Meat)
            .with_position(geometry.anchor(Cell::new(1, 1)))
            .with_expiration(now + Duration::days(5)),
    ]
}
