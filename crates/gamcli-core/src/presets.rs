//! Inventory forecast presets
//!
//! Immutable catalog of three creative-size bundles. `run-of-site` carries
//! no size filter and forecasts against everything.

/// A named bundle of creative sizes (width, height).
#[derive(Debug, Clone, Copy)]
pub struct InventoryPreset {
    pub key: &'static str,
    pub label: &'static str,
    pub sizes: Option<&'static [(u32, u32)]>,
}

const DESKTOP_SIZES: &[(u32, u32)] = &[(970, 250), (300, 250), (300, 600), (728, 90)];

const MOBILE_SIZES: &[(u32, u32)] = &[
    (320, 50),
    (320, 100),
    (300, 50),
    (320, 480),
    (300, 250),
    (728, 90),
];

pub const PRESETS: [InventoryPreset; 3] = [
    InventoryPreset {
        key: "run-of-site",
        label: "Run of site (all sites)",
        sizes: None,
    },
    InventoryPreset {
        key: "desktop",
        label: "Desktop banners",
        sizes: Some(DESKTOP_SIZES),
    },
    InventoryPreset {
        key: "mobile",
        label: "Mobile banners",
        sizes: Some(MOBILE_SIZES),
    },
];

/// Look up a preset by key.
pub fn find(key: &str) -> Option<&'static InventoryPreset> {
    PRESETS.iter().find(|p| p.key == key)
}

/// Presets to forecast: the named one when it exists, otherwise all three.
pub fn selected(key: Option<&str>) -> Vec<&'static InventoryPreset> {
    match key.and_then(find) {
        Some(p) => vec![p],
        None => PRESETS.iter().collect(),
    }
}

impl InventoryPreset {
    /// Display form of the size list, `"All"` when unfiltered.
    pub fn sizes_label(&self) -> String {
        match self.sizes {
            Some(sizes) => sizes
                .iter()
                .map(|(w, h)| format!("{}x{}", w, h))
                .collect::<Vec<_>>()
                .join(", "),
            None => "All".to_string(),
        }
    }
}
