pub mod expiry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::layout::Position;

pub use expiry::{partition_expiring, relative_day_label, ExpirationStatus, ExpiringItems, Freshness};

/// Food categories accepted by the item API. Unknown labels decode as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Category {
    #[serde(rename = "채소")]
    Vegetable,
    #[serde(rename = "과일")]
    Fruit,
    #[serde(rename = "육류")]
    Meat,
    #[serde(rename = "해산물")]
    Seafood,
    #[serde(rename = "유제품")]
    Dairy,
    #[serde(rename = "음료")]
    Beverage,
    #[serde(rename = "조미료")]
    Seasoning,
    #[serde(rename = "냉동식품")]
    Frozen,
    #[serde(rename = "기타")]
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Vegetable,
        Category::Fruit,
        Category::Meat,
        Category::Seafood,
        Category::Dairy,
        Category::Beverage,
        Category::Seasoning,
        Category::Frozen,
        Category::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Vegetable => "채소",
            Category::Fruit => "과일",
            Category::Meat => "육류",
            Category::Seafood => "해산물",
            Category::Dairy => "유제품",
            Category::Beverage => "음료",
            Category::Seasoning => "조미료",
            Category::Frozen => "냉동식품",
            Category::Other => "기타",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::Vegetable => "🥬",
            Category::Fruit => "🍎",
            Category::Meat => "🥩",
            Category::Seafood => "🐟",
            Category::Dairy => "🥛",
            Category::Beverage => "🥤",
            Category::Seasoning => "🧂",
            Category::Frozen => "🧊",
            Category::Other => "📦",
        }
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::ALL
            .into_iter()
            .find(|category| category.label() == label.trim())
            .unwrap_or(Category::Other)
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Other
    }
}

/// One stored food item as the item API returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub expiration_date: Option<DateTime<Utc>>,
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, deserialize_with = "deserialize_position")]
    pub position: Option<Position>,
    #[serde(default)]
    pub fridge_id: String,
}

fn default_quantity() -> u32 {
    1
}

fn default_unit() -> String {
    "개".to_string()
}

/// `null`, a missing field and the legacy `(0,0)` all mean "not placed yet".
fn deserialize_position<'de, D>(deserializer: D) -> Result<Option<Position>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Raw {
        x: Option<f64>,
        y: Option<f64>,
    }

    let raw = Option::<Raw>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| match (raw.x, raw.y) {
        (Some(x), Some(y)) => Some(Position::new(x, y)).filter(|p| !p.is_unset_sentinel()),
        _ => None,
    }))
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>, fridge_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: Category::default(),
            quantity: default_quantity(),
            unit: default_unit(),
            expiration_date: None,
            purchase_date: None,
            image_url: None,
            memo: None,
            position: None,
            fridge_id: fridge_id.into(),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position).filter(|p| !p.is_unset_sentinel());
        self
    }

    pub fn with_expiration(mut self, expiration_date: DateTime<Utc>) -> Self {
        self.expiration_date = Some(expiration_date);
        self
    }

    pub fn is_placed(&self) -> bool {
        self.position.is_some()
    }
}
