//! Assembly checklist schema and per-unit checklist state.
//!
//! The schema is a fixed, versioned list of categories and item keys. A unit
//! stores only the items a technician has recorded; completion means every
//! item of every category is `true`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::errors::BuildlineError;

/// Partial checklist update: item key to recorded value.
pub type ChecklistPatch = BTreeMap<String, bool>;

/// Version tag of the checklist schema a unit was recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecklistVersion {
    V1,
}

impl ChecklistVersion {
    pub const CURRENT: ChecklistVersion = ChecklistVersion::V1;

    pub fn as_i32(&self) -> i32 {
        match self {
            ChecklistVersion::V1 => 1,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(ChecklistVersion::V1),
            _ => None,
        }
    }

    /// Carries a checklist recorded under this version forward to
    /// [`ChecklistVersion::CURRENT`]. Items the current schema no longer
    /// knows are dropped.
    pub fn migrate(self, checklist: Checklist) -> Checklist {
        match self {
            ChecklistVersion::V1 => checklist.retain_known(ChecklistSchema::current()),
        }
    }
}

impl Serialize for ChecklistVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

impl<'de> Deserialize<'de> for ChecklistVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i32::deserialize(deserializer)?;
        ChecklistVersion::from_i32(value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown checklist version {value}")))
    }
}

/// A named group of checklist items.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChecklistCategory {
    pub name: &'static str,
    pub items: &'static [&'static str],
}

/// A complete checklist schema.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChecklistSchema {
    pub version: ChecklistVersion,
    pub categories: &'static [ChecklistCategory],
}

const V1_CATEGORIES: &[ChecklistCategory] = &[
    ChecklistCategory {
        name: "Frame & Fork",
        items: &["frame_inspection", "fork_installed", "headset_adjusted"],
    },
    ChecklistCategory {
        name: "Wheels & Tyres",
        items: &["wheels_installed", "wheels_trued", "tyres_inflated"],
    },
    ChecklistCategory {
        name: "Drivetrain",
        items: &[
            "crankset_installed",
            "chain_installed",
            "derailleurs_indexed",
            "pedals_installed",
        ],
    },
    ChecklistCategory {
        name: "Brakes",
        items: &["brakes_installed", "brakes_adjusted", "brake_levers_secured"],
    },
    ChecklistCategory {
        name: "Cockpit & Seating",
        items: &[
            "handlebar_aligned",
            "stem_torqued",
            "seatpost_secured",
            "saddle_level",
        ],
    },
    ChecklistCategory {
        name: "Final Checks",
        items: &[
            "accessories_fitted",
            "reflectors_fitted",
            "bolts_torque_checked",
            "test_ride",
        ],
    },
];

static V1_SCHEMA: ChecklistSchema = ChecklistSchema {
    version: ChecklistVersion::V1,
    categories: V1_CATEGORIES,
};

/// Completion progress of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryProgress {
    pub name: String,
    pub completed: usize,
    pub total: usize,
    pub complete: bool,
}

impl ChecklistSchema {
    /// Schema new units are recorded against.
    pub fn current() -> &'static ChecklistSchema {
        Self::for_version(ChecklistVersion::CURRENT)
    }

    pub fn for_version(version: ChecklistVersion) -> &'static ChecklistSchema {
        match version {
            ChecklistVersion::V1 => &V1_SCHEMA,
        }
    }

    /// All item keys in category order.
    pub fn item_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.categories.iter().flat_map(|c| c.items.iter().copied())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.item_keys().any(|k| k == key)
    }

    /// Rejects patches that mention keys outside this schema.
    pub fn validate_patch(&self, patch: &ChecklistPatch) -> Result<(), BuildlineError> {
        let unknown: Vec<String> = patch
            .keys()
            .filter(|k| !self.contains(k))
            .cloned()
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(BuildlineError::UnknownChecklistItem { keys: unknown })
        }
    }

    /// Items that are not recorded as `true`, in schema order.
    pub fn missing_items(&self, checklist: &Checklist) -> Vec<&'static str> {
        self.item_keys()
            .filter(|k| checklist.get(k) != Some(true))
            .collect()
    }

    /// JSON object with every item set to `true`; a stored checklist is
    /// complete when it contains this object (`@>` in PostgreSQL).
    pub fn completion_json(&self) -> serde_json::Value {
        self.item_keys()
            .map(|k| (k.to_string(), serde_json::Value::Bool(true)))
            .collect::<serde_json::Map<_, _>>()
            .into()
    }

    pub fn is_complete(&self, checklist: &Checklist) -> bool {
        self.item_keys().all(|k| checklist.get(k) == Some(true))
    }

    /// Per-category progress for display.
    pub fn progress(&self, checklist: &Checklist) -> Vec<CategoryProgress> {
        self.categories
            .iter()
            .map(|c| {
                let completed = c
                    .items
                    .iter()
                    .filter(|k| checklist.get(k) == Some(true))
                    .count();
                CategoryProgress {
                    name: c.name.to_string(),
                    completed,
                    total: c.items.len(),
                    complete: completed == c.items.len(),
                }
            })
            .collect()
    }
}

/// Checklist state of one unit as shown to the technician.
#[derive(Debug, Clone, Serialize)]
pub struct ChecklistView {
    pub barcode: String,
    pub checklist_version: ChecklistVersion,
    pub checklist: Checklist,
    pub progress: Vec<CategoryProgress>,
    pub missing: Vec<&'static str>,
    pub complete: bool,
}

impl ChecklistView {
    pub fn new(barcode: &str, checklist: &Checklist, schema: &ChecklistSchema) -> Self {
        let missing = schema.missing_items(checklist);
        Self {
            barcode: barcode.to_string(),
            checklist_version: schema.version,
            checklist: checklist.clone(),
            progress: schema.progress(checklist),
            complete: missing.is_empty(),
            missing,
        }
    }
}

/// Recorded checklist state of one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checklist(BTreeMap<String, bool>);

impl Checklist {
    pub fn new(items: BTreeMap<String, bool>) -> Self {
        Self(items)
    }

    /// Recorded value of an item; `None` if never recorded.
    pub fn get(&self, key: &str) -> Option<bool> {
        self.0.get(key).copied()
    }

    /// Per-key merge: keys absent from the patch are left untouched.
    pub fn merge(&mut self, patch: &ChecklistPatch) {
        for (key, value) in patch {
            self.0.insert(key.clone(), *value);
        }
    }

    pub fn merged(mut self, patch: &ChecklistPatch) -> Self {
        self.merge(patch);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, bool> {
        &self.0
    }

    /// Builds a checklist from stored JSON, ignoring non-boolean entries.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let items = value
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_bool().map(|b| (k.clone(), b)))
                    .collect()
            })
            .unwrap_or_default();
        Self(items)
    }

    fn retain_known(mut self, schema: &ChecklistSchema) -> Self {
        self.0.retain(|k, _| schema.contains(k));
        self
    }
}
