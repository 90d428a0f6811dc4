// Warehouse label and color tables
//
// Detector class names are remapped to warehouse vocabulary for display.
// Both lookups are total: anything not in the table resolves to the
// `unknown` label and the gray sentinel color.

use lazy_static::lazy_static;
use opencv::core::Scalar;
use std::collections::HashMap;

pub const UNKNOWN_LABEL: &str = "unknown";
pub const UNKNOWN_COLOR: Color = Color(128, 128, 128);

/// A 3-channel display color, in the channel order OpenCV draws with (BGR).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub fn to_scalar(self) -> Scalar {
        Scalar::new(self.0 as f64, self.1 as f64, self.2 as f64, 0.0)
    }
}

lazy_static! {
    static ref CLASS_MAPPING: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("person", "warehouse worker");
        m.insert("truck", "forklift");
        // Forklifts are often picked up as cars
        m.insert("car", "forklift");
        for class in [
            "backpack",
            "handbag",
            "sports ball",
            "mouse",
            "remote",
            "keyboard",
            "cell phone",
            "clock",
            "scissors",
            "hair drier",
            "toothbrush",
        ] {
            m.insert(class, "warehouse equipment");
        }
        for class in ["suitcase", "box", "laptop", "book", "vase", "teddy bear"] {
            m.insert(class, "cardboard box");
        }
        // Large rectangular objects tend to be shelving
        m.insert("tv", "pallet rack");
        m
    };
    static ref LABEL_COLORS: HashMap<&'static str, Color> = {
        let mut m = HashMap::new();
        m.insert("warehouse worker", Color(255, 255, 0));
        m.insert("forklift", Color(0, 0, 255));
        m.insert("warehouse equipment", Color(128, 255, 255));
        m.insert("cardboard box", Color(255, 0, 0));
        m.insert("pallet rack", Color(255, 0, 255));
        m.insert(UNKNOWN_LABEL, UNKNOWN_COLOR);
        m
    };
}

/// Map a detector class name to its warehouse label.
pub fn resolve_label(class_name: &str) -> &'static str {
    CLASS_MAPPING
        .get(class_name)
        .copied()
        .unwrap_or(UNKNOWN_LABEL)
}

/// Map a warehouse label to its display color.
pub fn resolve_color(domain_label: &str) -> Color {
    LABEL_COLORS
        .get(domain_label)
        .copied()
        .unwrap_or(UNKNOWN_COLOR)
}
