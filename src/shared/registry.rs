//! Categories and keys.
//!
//! Handles are handed out as soon as a name is asked for; the persisted
//! index of a category or of a key variant (static or per-frame) is only
//! assigned on the first write that needs it. On open the registry is
//! rebuilt from the persisted name lists.

use std::collections::HashMap;

use super::SharedData;
use crate::backend::Backend;
use crate::core::names;
use crate::core::{Category, Key};
use crate::util::{Error, Result, StringTraits, TypeTraits, ValueType};

pub(super) struct CategoryEntry {
    pub name: String,
    /// Position in the category-name table once persisted.
    pub index: Option<usize>,
}

pub(super) struct KeyEntry {
    pub category: Category,
    pub value_type: ValueType,
    pub name: String,
    pub static_index: Option<usize>,
    pub per_frame_index: Option<usize>,
}

impl KeyEntry {
    pub fn index(&self, per_frame: bool) -> Option<usize> {
        if per_frame {
            self.per_frame_index
        } else {
            self.static_index
        }
    }

    fn set_index(&mut self, per_frame: bool, index: usize) {
        if per_frame {
            self.per_frame_index = Some(index);
        } else {
            self.static_index = Some(index);
        }
    }
}

#[derive(Default)]
pub(super) struct Registry {
    categories: Vec<CategoryEntry>,
    category_by_name: HashMap<String, Category>,
    keys: Vec<KeyEntry>,
    key_by_name: HashMap<(Category, ValueType, String), u32>,
}

impl Registry {
    pub fn number_of_categories(&self) -> usize {
        self.categories.len()
    }

    pub fn category(&self, category: Category) -> Result<&CategoryEntry> {
        self.categories
            .get(category.slot())
            .ok_or_else(|| Error::usage(format!("invalid category {}", category.0)))
    }

    fn category_mut(&mut self, category: Category) -> Result<&mut CategoryEntry> {
        self.categories
            .get_mut(category.slot())
            .ok_or_else(|| Error::usage(format!("invalid category {}", category.0)))
    }

    fn find_or_add_category(&mut self, name: &str) -> Category {
        if let Some(&c) = self.category_by_name.get(name) {
            return c;
        }
        let c = Category(self.categories.len() as u32);
        self.categories.push(CategoryEntry {
            name: name.to_string(),
            index: None,
        });
        self.category_by_name.insert(name.to_string(), c);
        c
    }

    pub fn key(&self, id: u32) -> Result<&KeyEntry> {
        self.keys
            .get(id as usize)
            .ok_or_else(|| Error::usage(format!("invalid key {id}")))
    }

    fn key_mut(&mut self, id: u32) -> Result<&mut KeyEntry> {
        self.keys
            .get_mut(id as usize)
            .ok_or_else(|| Error::usage(format!("invalid key {id}")))
    }

    fn find_or_add_key(&mut self, category: Category, value_type: ValueType, name: &str) -> u32 {
        let lookup = (category, value_type, name.to_string());
        if let Some(&id) = self.key_by_name.get(&lookup) {
            return id;
        }
        let id = self.keys.len() as u32;
        self.keys.push(KeyEntry {
            category,
            value_type,
            name: name.to_string(),
            static_index: None,
            per_frame_index: None,
        });
        self.key_by_name.insert(lookup, id);
        id
    }
}

impl SharedData {
    // ========================================================================
    // Categories
    // ========================================================================

    /// Category named `name`, registered in memory if new.
    pub fn get_category(&mut self, name: &str) -> Result<Category> {
        names::audit_key_name(name)?;
        Ok(self.registry.find_or_add_category(name))
    }

    /// Categories persisted in the file, in index order.
    pub fn get_categories(&self) -> Vec<Category> {
        let mut out: Vec<(usize, Category)> = self
            .registry
            .categories
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.index.map(|index| (index, Category(i as u32))))
            .collect();
        out.sort();
        out.into_iter().map(|(_, c)| c).collect()
    }

    pub fn get_category_name(&self, category: Category) -> Result<String> {
        Ok(self.registry.category(category)?.name.clone())
    }

    /// Persisted index of `category`, appending it to the category-name
    /// table on first use.
    pub(super) fn category_index_create(&mut self, category: Category) -> Result<usize> {
        let entry = self.registry.category(category)?;
        if let Some(index) = entry.index {
            return Ok(index);
        }
        let name = entry.name.clone();
        let index = self.category_names.get_size().size(0);
        self.category_names.fit(&[index])?;
        self.category_names.set_value(&[index], name.clone())?;
        self.registry.category_mut(category)?.index = Some(index);
        tracing::debug!(category = %name, index, "added category");
        Ok(index)
    }

    /// Rebuild the categories from the category-name table.
    pub(super) fn initialize_categories(&mut self) {
        for index in 0..self.category_names.get_size().size(0) {
            let name = self.category_names.get_value(&[index]);
            let c = self.registry.find_or_add_category(&name);
            if let Some(entry) = self.registry.categories.get_mut(c.slot()) {
                entry.index = Some(index);
            }
        }
    }

    // ========================================================================
    // Keys
    // ========================================================================

    /// Key `name` of type `T` in `category`, registered in memory if new.
    pub fn get_key<T: TypeTraits>(&mut self, category: Category, name: &str) -> Result<Key<T>> {
        self.registry.category(category)?;
        names::audit_key_name(name)?;
        Ok(Key::new(
            self.registry.find_or_add_key(category, T::VALUE_TYPE, name),
        ))
    }

    /// Register and persist the static or per-frame variant of a key.
    ///
    /// Registering a variant that already exists is a usage fault; the other
    /// variant of the same name is independent.
    pub fn add_key<T: TypeTraits>(
        &mut self,
        category: Category,
        name: &str,
        per_frame: bool,
    ) -> Result<Key<T>> {
        self.check_writable()?;
        let key = self.get_key::<T>(category, name)?;
        if self.registry.key(key.id)?.index(per_frame).is_some() {
            return Err(Error::DuplicateKey {
                name: name.to_string(),
                category: self.registry.category(category)?.name.clone(),
                type_name: T::name(),
            });
        }
        self.key_index_create(key.id, per_frame)?;
        Ok(key)
    }

    /// Keys of type `T` in `category` with at least one persisted variant.
    pub fn get_keys<T: TypeTraits>(&self, category: Category) -> Vec<Key<T>> {
        self.registry
            .keys
            .iter()
            .enumerate()
            .filter(|(_, k)| {
                k.category == category
                    && k.value_type == T::VALUE_TYPE
                    && (k.static_index.is_some() || k.per_frame_index.is_some())
            })
            .map(|(id, _)| Key::new(id as u32))
            .collect()
    }

    pub fn get_key_name<T: TypeTraits>(&self, key: Key<T>) -> Result<String> {
        Ok(self.registry.key(key.id)?.name.clone())
    }

    pub fn get_key_category<T: TypeTraits>(&self, key: Key<T>) -> Result<Category> {
        Ok(self.registry.key(key.id)?.category)
    }

    /// True if the per-frame variant of `key` has been persisted.
    pub fn get_is_per_frame<T: TypeTraits>(&self, key: Key<T>) -> Result<bool> {
        Ok(self.registry.key(key.id)?.per_frame_index.is_some())
    }

    /// Persisted index of one variant of a key, appending the name to the
    /// partition's name list on first use.
    pub(super) fn key_index_create(&mut self, id: u32, per_frame: bool) -> Result<usize> {
        let entry = self.registry.key(id)?;
        if let Some(index) = entry.index(per_frame) {
            return Ok(index);
        }
        let (category, value_type, name) = (entry.category, entry.value_type, entry.name.clone());
        self.category_index_create(category)?;
        let category_name = self.registry.category(category)?.name.clone();

        let list_name = names::key_list(&category_name, value_type, per_frame);
        let list = self.caches.table::<StringTraits>(&list_name, 1)?;
        let len = list.get_size().size(0);
        if (0..len).any(|i| list.get_value(&[i]) == name) {
            return Err(Error::DuplicateKey {
                name,
                category: category_name,
                type_name: value_type.name(),
            });
        }
        list.fit(&[len])?;
        list.set_value(&[len], name.clone())?;

        self.registry.key_mut(id)?.set_index(per_frame, len);
        tracing::debug!(
            key = %name,
            category = %category_name,
            %value_type,
            per_frame,
            index = len,
            "added key"
        );
        Ok(len)
    }

    /// Rebuild the keys from every persisted name list.
    pub(super) fn initialize_keys(&mut self) -> Result<()> {
        let categories: Vec<(Category, String)> = self
            .get_categories()
            .into_iter()
            .map(|c| (c, self.registry.categories[c.slot()].name.clone()))
            .collect();
        for (category, category_name) in categories {
            for value_type in ValueType::ALL {
                for per_frame in [false, true] {
                    let list_name = names::key_list(&category_name, value_type, per_frame);
                    if !self.backend.borrow().has_table(&list_name) {
                        continue;
                    }
                    let list = self.caches.table::<StringTraits>(&list_name, 1)?;
                    let key_names: Vec<String> = (0..list.get_size().size(0))
                        .map(|i| list.get_value(&[i]))
                        .collect();
                    for (index, name) in key_names.into_iter().enumerate() {
                        let id = self.registry.find_or_add_key(category, value_type, &name);
                        self.registry.key_mut(id)?.set_index(per_frame, index);
                    }
                }
            }
        }
        tracing::trace!(keys = self.registry.keys.len(), "initialized keys");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::NodeId;
    use crate::util::{FloatTraits, IntTraits};

    use super::*;

    #[test]
    fn test_category_is_idempotent() {
        let mut data = SharedData::create_in_buffer().unwrap();
        let a = data.get_category("physics").unwrap();
        assert_eq!(data.get_category("physics").unwrap(), a);
        assert_ne!(data.get_category("shape").unwrap(), a);
        assert_eq!(data.get_category_name(a).unwrap(), "physics");
        assert!(data.get_categories().is_empty());
        assert!(data.get_category("bad:name").is_err());
    }

    #[test]
    fn test_key_partitions() {
        let mut data = SharedData::create_in_buffer().unwrap();
        let c = data.get_category("physics").unwrap();
        let x = data.add_key::<FloatTraits>(c, "x", true).unwrap();
        let err = data.add_key::<FloatTraits>(c, "x", true).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { .. }));
        assert!(err.is_usage());

        let x_static = data.add_key::<FloatTraits>(c, "x", false).unwrap();
        assert_eq!(x_static, x);
        let x_int = data.add_key::<IntTraits>(c, "x", true).unwrap();
        assert_eq!(data.get_key_name(x_int).unwrap(), "x");
        assert_eq!(data.get_key_category(x_int).unwrap(), c);
        assert_eq!(data.get_keys::<FloatTraits>(c), vec![x]);
        assert_eq!(data.get_categories(), vec![c]);
    }

    #[test]
    fn test_keys_survive_reload() {
        let mut data = SharedData::create_in_buffer().unwrap();
        let c = data.get_category("physics").unwrap();
        let mass = data.get_key::<FloatTraits>(c, "mass").unwrap();
        data.set_static_value(NodeId::ROOT, mass, 2.0).unwrap();
        data.reload().unwrap();

        let c = data.get_category("physics").unwrap();
        let keys = data.get_keys::<FloatTraits>(c);
        assert_eq!(keys.len(), 1);
        assert_eq!(data.get_key_name(keys[0]).unwrap(), "mass");
        assert!(!data.get_is_per_frame(keys[0]).unwrap());
        assert_eq!(data.get_static_value(NodeId::ROOT, keys[0]).unwrap(), 2.0);
    }
}
