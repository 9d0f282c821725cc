//! Engine variant registry.
//!
//! Each variant pairs an installation engine with the default build ids it
//! pins. Engines are constructed lazily, on first use, and shared.

use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

use crate::engine::{BrowserEngine, cft::CftEngine, legacy::LegacySnapshotEngine};

/// Pinned Chrome for Testing build for the modern variant.
const MODERN_CHROME_BUILD: &str = "140.0.7339.82";
/// Pinned Chromium snapshot revision for the legacy variant.
const LEGACY_CHROMIUM_REVISION: &str = "722234";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantId {
    Modern,
    LegacyV2,
}

impl VariantId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Modern => "modern",
            Self::LegacyV2 => "legacy-v2",
        }
    }
}

/// A selectable engine generation.
pub struct Variant {
    id: VariantId,
    label: &'static str,
    engine: OnceLock<Arc<dyn BrowserEngine>>,
    revisions: OnceLock<HashMap<String, String>>,
}

static MODERN: Variant = Variant {
    id: VariantId::Modern,
    label: "chrome-for-testing",
    engine: OnceLock::new(),
    revisions: OnceLock::new(),
};

static LEGACY_V2: Variant = Variant {
    id: VariantId::LegacyV2,
    label: "chromium-snapshots",
    engine: OnceLock::new(),
    revisions: OnceLock::new(),
};

/// Look up a variant by its config identifier. Unknown identifiers fall back
/// to the modern variant.
pub fn resolve_variant(id: &str) -> &'static Variant {
    match id.trim() {
        "legacy-v2" => &LEGACY_V2,
        _ => &MODERN,
    }
}

impl Variant {
    pub fn id(&self) -> VariantId {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// The installation engine for this variant, constructed on first use.
    pub fn engine(&self) -> Arc<dyn BrowserEngine> {
        self.engine
            .get_or_init(|| match self.id {
                VariantId::Modern => Arc::new(CftEngine),
                VariantId::LegacyV2 => Arc::new(LegacySnapshotEngine),
            })
            .clone()
    }

    /// Default build/revision ids, keyed by browser name.
    pub fn revisions(&self) -> &HashMap<String, String> {
        self.revisions.get_or_init(|| match self.id {
            VariantId::Modern => HashMap::from([
                ("chrome".to_string(), MODERN_CHROME_BUILD.to_string()),
                ("chrome-headless-shell".to_string(), MODERN_CHROME_BUILD.to_string()),
            ]),
            VariantId::LegacyV2 => HashMap::from([
                ("chromium".to_string(), LEGACY_CHROMIUM_REVISION.to_string()),
                ("chrome".to_string(), LEGACY_CHROMIUM_REVISION.to_string()),
                (
                    "chrome-headless-shell".to_string(),
                    LEGACY_CHROMIUM_REVISION.to_string(),
                ),
            ]),
        })
    }
}
