//! Class data and flattened member lists
//!
//! Each class keeps its ancestors, its descendants and the flattened list of
//! properties and methods visible on it (every ancestor's own items followed
//! by its own). The flattened lists are rebuilt for the class and all of its
//! descendants whenever one of them changes, so an item added to a base
//! class after a derived class was registered is still visible there.

use std::iter;

use rustc_hash::FxHashSet;

use super::filter::Filter;
use super::items::parameters_accept;
use super::RegistryState;
use crate::support::ItemId;
use crate::types::{BaseClassInfo, Type, TypeIndex};

/// Inheritance edges and members of a type
#[derive(Default)]
pub(crate) struct ClassData {
    /// Every ancestor, deduplicated and ordered by identity
    pub base_types: Vec<TypeIndex>,
    /// Direct bases with their up-cast functions
    pub direct_bases: Vec<(TypeIndex, BaseClassInfo)>,
    /// Every descendant, in registration order
    pub derived_types: Vec<TypeIndex>,
    /// Flattened properties
    pub properties: Vec<ItemId>,
    /// Flattened methods
    pub methods: Vec<ItemId>,
    /// Own constructors
    pub constructors: Vec<ItemId>,
    pub destructor: Option<ItemId>,
}

/// Deduplicate candidate base edges and order them by identity.
///
/// The scan runs back to front so the last occurrence of a diamond edge is
/// the one kept.
pub(crate) fn dedup_base_types(candidates: Vec<TypeIndex>) -> Vec<TypeIndex> {
    let mut seen = FxHashSet::default();
    let mut unique: Vec<TypeIndex> = candidates
        .into_iter()
        .rev()
        .filter(|candidate| seen.insert(*candidate))
        .collect();
    unique.sort();
    unique
}

impl RegistryState {
    /// Link a freshly allocated type to its base classes
    pub(crate) fn link_bases(&mut self, index: TypeIndex, direct: Vec<(TypeIndex, BaseClassInfo)>) {
        let mut candidates = Vec::new();
        for (base, _) in &direct {
            if let Some(data) = self.type_data(*base) {
                candidates.extend(data.class.base_types.iter().copied());
            }
            candidates.push(*base);
        }
        let base_types = dedup_base_types(candidates);

        for base in &base_types {
            if let Some(data) = self.type_data_mut(*base) {
                data.class.derived_types.push(index);
            }
        }
        if let Some(data) = self.type_data_mut(index) {
            data.class.base_types = base_types;
            data.class.direct_bases = direct;
        }
        self.refresh_members(index);
    }

    /// Rebuild the flattened lists of `index` and every descendant
    pub(crate) fn refresh_members(&mut self, index: TypeIndex) {
        let mut targets = vec![index];
        if let Some(data) = self.type_data(index) {
            targets.extend(data.class.derived_types.iter().copied());
        }
        for target in targets {
            self.rebuild_flattened(target);
        }
    }

    fn rebuild_flattened(&mut self, index: TypeIndex) {
        let Some(data) = self.type_data(index) else {
            return;
        };
        let owners: Vec<TypeIndex> = data
            .class
            .base_types
            .iter()
            .copied()
            .chain(iter::once(index))
            .collect();

        let mut properties = Vec::new();
        let mut methods = Vec::new();
        for owner in owners {
            let Some(owner_data) = self.type_data(owner) else {
                continue;
            };
            properties.extend(owner_data.class.properties.iter().copied().filter(|id| {
                self.properties
                    .get(*id)
                    .is_some_and(|entry| entry.info.declaring == Some(owner))
            }));
            methods.extend(owner_data.class.methods.iter().copied().filter(|id| {
                self.methods
                    .get(*id)
                    .is_some_and(|entry| entry.info.declaring == Some(owner))
            }));
        }

        if let Some(data) = self.type_data_mut(index) {
            data.class.properties = properties;
            data.class.methods = methods;
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub(crate) fn class_properties(&self, index: TypeIndex, filter: Filter) -> Vec<ItemId> {
        let Some(data) = self.type_data(index) else {
            return Vec::new();
        };
        data.class
            .properties
            .iter()
            .copied()
            .filter(|id| {
                self.properties.get(*id).is_some_and(|entry| {
                    filter.matches(entry.info.is_static, entry.info.access, entry.info.declaring, index)
                })
            })
            .collect()
    }

    pub(crate) fn class_methods(&self, index: TypeIndex, filter: Filter) -> Vec<ItemId> {
        let Some(data) = self.type_data(index) else {
            return Vec::new();
        };
        data.class
            .methods
            .iter()
            .copied()
            .filter(|id| {
                self.methods.get(*id).is_some_and(|entry| {
                    filter.matches(entry.info.is_static, entry.info.access, entry.info.declaring, index)
                })
            })
            .collect()
    }

    pub(crate) fn find_class_property(&self, index: TypeIndex, name: &str) -> Option<ItemId> {
        let data = self.type_data(index)?;
        data.class.properties.iter().copied().find(|id| {
            self.properties
                .get(*id)
                .is_some_and(|entry| entry.info.name == name)
        })
    }

    pub(crate) fn find_class_method(
        &self,
        index: TypeIndex,
        name: &str,
        arguments: Option<&[Type]>,
    ) -> Option<ItemId> {
        let data = self.type_data(index)?;
        data.class.methods.iter().copied().find(|id| {
            self.methods.get(*id).is_some_and(|entry| {
                entry.info.name == name
                    && arguments.map_or(true, |arguments| parameters_accept(&entry.parameters, arguments))
            })
        })
    }

    pub(crate) fn find_constructor(&self, index: TypeIndex, arguments: &[Type]) -> Option<ItemId> {
        let data = self.type_data(index)?;
        data.class.constructors.iter().copied().find(|id| {
            self.constructors
                .get(*id)
                .is_some_and(|entry| parameters_accept(&entry.parameters, arguments))
        })
    }
}
