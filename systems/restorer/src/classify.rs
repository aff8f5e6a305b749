//! Protection policy and cleanup classification of things.

use arena_rounds_core::{AnchorKind, DefName, ThingCategory, ThingSnapshot, ANCHOR_NAMESPACE};
use serde::{Deserialize, Serialize};

const CASING_FRAGMENT: &str = "casing";

/// Rules identifying things that must never be removed.
///
/// The anchor marker attached at creation is authoritative; exact names, the
/// reserved name fragment and the namespace prefix catch anchors whose marker
/// was lost.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionPolicy {
    /// Definition names that are always protected.
    pub exact_names: Vec<String>,
    /// Fragment whose presence in a definition name marks it as reserved.
    pub reserved_fragment: String,
    /// Runtime type namespace prefix owned by the arena.
    pub namespace_prefix: String,
}

impl Default for ProtectionPolicy {
    fn default() -> Self {
        Self {
            exact_names: AnchorKind::ALL
                .iter()
                .map(|kind| kind.def_name().to_owned())
                .collect(),
            reserved_fragment: "Arena".to_owned(),
            namespace_prefix: ANCHOR_NAMESPACE.to_owned(),
        }
    }
}

impl ProtectionPolicy {
    /// Reports whether a live thing is protected.
    #[must_use]
    pub fn is_protected(&self, thing: &ThingSnapshot) -> bool {
        thing.anchor.is_some()
            || self.is_protected_def(&thing.def)
            || (!self.namespace_prefix.is_empty()
                && thing.type_namespace.starts_with(&self.namespace_prefix))
    }

    /// Reports whether a definition name alone marks a thing as protected.
    #[must_use]
    pub fn is_protected_def(&self, def: &DefName) -> bool {
        let name = def.as_str();
        self.exact_names.iter().any(|exact| exact == name)
            || (!self.reserved_fragment.is_empty() && name.contains(&self.reserved_fragment))
    }
}

/// Cleanup verdict for a single thing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Arena anchor or lookalike; never removed.
    Protected,
    /// Active structure such as a turret or generator; kept.
    ActiveStructure,
    /// Transient debris; removed.
    Removable,
    /// Anything else; kept.
    Keep,
}

/// Classifies a thing for the cleanup pass.
///
/// Protection is checked first, then active structures, then the removable
/// set. Anything that matches none of them is kept.
#[must_use]
pub fn classify(thing: &ThingSnapshot, policy: &ProtectionPolicy) -> Classification {
    if policy.is_protected(thing) {
        return Classification::Protected;
    }
    if thing.has_building_properties && thing.active {
        return Classification::ActiveStructure;
    }

    let removable_category = matches!(
        thing.category,
        ThingCategory::Corpse
            | ThingCategory::Item
            | ThingCategory::Filth
            | ThingCategory::Fire
            | ThingCategory::Gas
            | ThingCategory::Projectile
            | ThingCategory::Ethereal
    );
    if removable_category || is_casing(&thing.def) {
        Classification::Removable
    } else {
        Classification::Keep
    }
}

fn is_casing(def: &DefName) -> bool {
    def.as_str().to_ascii_lowercase().contains(CASING_FRAGMENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_rounds_core::{CellCoord, Durability, Rotation, ThingId};

    fn thing(def: &str, category: ThingCategory) -> ThingSnapshot {
        ThingSnapshot {
            id: ThingId::new(1),
            cell: CellCoord::new(0, 0),
            def: DefName::new(def),
            stuff: None,
            rotation: Rotation::North,
            category,
            durability: Durability::full(10),
            quality: None,
            has_building_properties: matches!(category, ThingCategory::Building),
            active: false,
            anchor: None,
            type_namespace: "host::things".to_owned(),
        }
    }

    #[test]
    fn each_protection_layer_is_sufficient_on_its_own() {
        let policy = ProtectionPolicy::default();

        let mut marked = thing("Unremarkable", ThingCategory::Item);
        marked.anchor = Some(AnchorKind::Core);
        assert_eq!(classify(&marked, &policy), Classification::Protected);

        let named = thing("ArenaSpawnTeamB", ThingCategory::Item);
        assert_eq!(classify(&named, &policy), Classification::Protected);

        let fragment = thing("Filth_ArenaDust", ThingCategory::Filth);
        assert_eq!(classify(&fragment, &policy), Classification::Protected);

        let mut namespaced = thing("Corpse_Mystery", ThingCategory::Corpse);
        namespaced.type_namespace = format!("{ANCHOR_NAMESPACE}::legacy");
        assert_eq!(classify(&namespaced, &policy), Classification::Protected);
    }

    #[test]
    fn active_structures_are_kept() {
        let mut turret = thing("Turret_Mini", ThingCategory::Building);
        turret.active = true;
        assert_eq!(
            classify(&turret, &ProtectionPolicy::default()),
            Classification::ActiveStructure
        );
    }

    #[test]
    fn debris_is_removable() {
        let policy = ProtectionPolicy::default();
        for category in [
            ThingCategory::Corpse,
            ThingCategory::Item,
            ThingCategory::Filth,
            ThingCategory::Fire,
            ThingCategory::Gas,
            ThingCategory::Projectile,
            ThingCategory::Ethereal,
        ] {
            assert_eq!(
                classify(&thing("Debris", category), &policy),
                Classification::Removable,
                "{category:?}"
            );
        }
        assert_eq!(
            classify(&thing("Shell_Casing_Rifle", ThingCategory::Other), &policy),
            Classification::Removable
        );
    }

    #[test]
    fn everything_else_is_kept() {
        let policy = ProtectionPolicy::default();
        assert_eq!(
            classify(&thing("Wall", ThingCategory::Building), &policy),
            Classification::Keep
        );
        assert_eq!(
            classify(&thing("Plant_Tree", ThingCategory::Plant), &policy),
            Classification::Keep
        );
        assert_eq!(
            classify(&thing("Boulder", ThingCategory::Other), &policy),
            Classification::Keep
        );
    }

    #[test]
    fn empty_fragment_and_namespace_disable_those_layers() {
        let policy = ProtectionPolicy {
            exact_names: Vec::new(),
            reserved_fragment: String::new(),
            namespace_prefix: String::new(),
        };
        assert!(!policy.is_protected(&thing("ArenaCore", ThingCategory::Building)));
    }
}
