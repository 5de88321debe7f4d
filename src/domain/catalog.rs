//! Static option catalog shared by the draft model and the preference tags.

/// Main garment categories.
pub const TOP_GARMENT: &str = "top garment";
pub const BOTTOM_GARMENT: &str = "bottom garment";
pub const ONE_PIECE: &str = "one-piece";
pub const FOOTWEAR: &str = "footwear";
pub const BAG: &str = "bag";
pub const HEADWEAR: &str = "headwear";
pub const JEWELRY: &str = "jewelry";
pub const ACCESSORY: &str = "accessory";

pub const MAIN_CATEGORIES: [&str; 8] = [
    TOP_GARMENT,
    BOTTOM_GARMENT,
    ONE_PIECE,
    FOOTWEAR,
    BAG,
    HEADWEAR,
    JEWELRY,
    ACCESSORY,
];

/// Sub-category value set belonging to a main category. Unknown mains have none.
pub fn sub_categories(main: &str) -> &'static [&'static str] {
    match main {
        TOP_GARMENT => &[
            "t-shirt",
            "hoodie",
            "sweater",
            "shirt",
            "tank top",
            "jacket",
            "trench coat",
            "overcoat",
            "down jacket",
            "blazer",
            "vest",
            "leather jacket",
            "shell jacket",
            "other top",
        ],
        BOTTOM_GARMENT => &[
            "jeans",
            "chinos",
            "sweatpants",
            "suit trousers",
            "cargo pants",
            "shorts",
            "skirt",
            "pleated skirt",
            "a-line skirt",
            "leather skirt",
            "leggings",
            "other bottom",
        ],
        ONE_PIECE => &["dress", "jumpsuit", "overalls"],
        FOOTWEAR => &[
            "sneakers",
            "skate shoes",
            "canvas shoes",
            "leather shoes",
            "boots",
            "loafers",
            "sandals",
            "slippers",
            "heels",
            "other footwear",
        ],
        BAG => &[
            "shoulder bag",
            "backpack",
            "handbag",
            "crossbody bag",
            "belt bag",
            "tote",
            "other bag",
        ],
        HEADWEAR => &[
            "baseball cap",
            "bucket hat",
            "beanie",
            "beret",
            "fedora",
            "sun hat",
            "other headwear",
        ],
        JEWELRY => &[
            "necklace",
            "earrings",
            "ring",
            "bracelet",
            "brooch",
            "watch",
            "other jewelry",
        ],
        ACCESSORY => &[
            "scarf",
            "silk scarf",
            "gloves",
            "belt",
            "glasses",
            "socks",
            "tie",
            "hair accessory",
            "other accessory",
        ],
        _ => &[],
    }
}

pub fn is_main_category(main: &str) -> bool {
    MAIN_CATEGORIES.contains(&main)
}

/// Whether `sub` belongs to the value set of `main`.
pub fn is_valid_sub(main: &str, sub: &str) -> bool {
    sub_categories(main).contains(&sub)
}

/// Main category implied by a segmentation part key.
pub fn main_for_segment_key(key: &str) -> Option<&'static str> {
    match key {
        "upper" => Some(TOP_GARMENT),
        "lower" => Some(BOTTOM_GARMENT),
        "shoes" => Some(FOOTWEAR),
        _ => None,
    }
}

pub const DEFAULT_STYLES: [&str; 10] = [
    "casual",
    "business",
    "sporty",
    "streetwear",
    "vintage",
    "minimalist",
    "elegant",
    "japanese",
    "workwear",
    "sweet-cool",
];

pub const DEFAULT_OCCASIONS: [&str; 8] = [
    "commute",
    "home",
    "outdoor",
    "date",
    "formal event",
    "travel",
    "sport",
    "shopping",
];

/// Wear status of a stored garment.
pub const STATUS_NORMAL: &str = "normal";
pub const STATUS_WASHING: &str = "washing";
pub const STATUS_IDLE: &str = "idle";
/// Virtual garment the user does not own yet.
pub const STATUS_NOT_OWNED: &str = "not owned";

pub const STATUSES: [&str; 4] = [STATUS_NORMAL, STATUS_WASHING, STATUS_IDLE, STATUS_NOT_OWNED];

pub const GENDER_UNISEX: &str = "unisex";
