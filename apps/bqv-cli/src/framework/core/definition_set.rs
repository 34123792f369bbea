use std::collections::BTreeMap;

use super::infrastructure::view::{ViewDefinition, ViewId};

#[derive(Debug, thiserror::Error)]
pub enum DefinitionSetError {
    #[error("View {0} is declared more than once")]
    Duplicate(ViewId),
}

/// The declared views of an invocation, keyed by identity.
///
/// Iteration order is by `(dataset, view)` so output is stable no matter how the
/// definitions were discovered. Nothing in reconciliation depends on that order.
#[derive(Debug, Clone, Default)]
pub struct DefinitionSet {
    definitions: BTreeMap<ViewId, ViewDefinition>,
}

impl DefinitionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(
        definitions: impl IntoIterator<Item = ViewDefinition>,
    ) -> Result<Self, DefinitionSetError> {
        let mut set = Self::new();
        for definition in definitions {
            set.insert(definition)?;
        }
        Ok(set)
    }

    pub fn insert(&mut self, definition: ViewDefinition) -> Result<(), DefinitionSetError> {
        let id = definition.id();
        if self.definitions.contains_key(&id) {
            return Err(DefinitionSetError::Duplicate(id));
        }
        self.definitions.insert(id, definition);
        Ok(())
    }

    pub fn find(&self, dataset_name: &str, view_name: &str) -> Option<&ViewDefinition> {
        self.definitions.get(&ViewId::new(dataset_name, view_name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ViewDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_identity_is_rejected() {
        let result = DefinitionSet::from_definitions(vec![
            ViewDefinition::new("d", "v", "SELECT 1"),
            ViewDefinition::new("d", "v", "SELECT 2"),
        ]);
        assert!(matches!(
            result,
            Err(DefinitionSetError::Duplicate(id)) if id == ViewId::new("d", "v")
        ));
    }

    #[test]
    fn test_same_view_name_in_different_datasets() {
        let set = DefinitionSet::from_definitions(vec![
            ViewDefinition::new("a", "v", "SELECT 1"),
            ViewDefinition::new("b", "v", "SELECT 2"),
        ])
        .unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.find("b", "v").unwrap().query_template, "SELECT 2");
        assert!(set.find("c", "v").is_none());
    }

    #[test]
    fn test_iteration_is_sorted_by_identity() {
        let set = DefinitionSet::from_definitions(vec![
            ViewDefinition::new("z", "a", "SELECT 1"),
            ViewDefinition::new("a", "z", "SELECT 2"),
            ViewDefinition::new("a", "b", "SELECT 3"),
        ])
        .unwrap();

        let ids: Vec<String> = set.iter().map(|d| d.id().to_string()).collect();
        assert_eq!(ids, vec!["a.b", "a.z", "z.a"]);
    }
}
