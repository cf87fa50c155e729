use std::collections::BTreeMap;

use super::{
    CsvRecordFactory, LibsvmRecordFactory, RecordFactory, Schema, TwentyNewsgroupsRecordFactory,
};
use crate::{MlErr, Result};

pub const TWENTY_NEWSGROUPS: &str = "twenty_newsgroups";
pub const CSV: &str = "csv";
pub const LIBSVM: &str = "libsvm";

/// Builds a record factory for a given schema.
pub type FactoryCtor = fn(Schema) -> Box<dyn RecordFactory>;

/// Maps record factory identifiers to their constructors.
///
/// The default registry knows every built-in factory, custom ones can be registered
/// at startup and are resolved by identifier when a worker is set up.
#[derive(Debug, Clone)]
pub struct RecordFactoryRegistry {
    ctors: BTreeMap<String, FactoryCtor>,
}

impl RecordFactoryRegistry {
    /// Creates a registry without any factory.
    pub fn empty() -> Self {
        Self {
            ctors: BTreeMap::new(),
        }
    }

    /// Registers a new factory constructor.
    ///
    /// # Arguments
    /// * `id` - The identifier used to select this factory.
    /// * `ctor` - The factory constructor.
    ///
    /// # Returns
    /// The constructor previously registered under `id`, if any.
    pub fn register(&mut self, id: impl Into<String>, ctor: FactoryCtor) -> Option<FactoryCtor> {
        self.ctors.insert(id.into(), ctor)
    }

    /// Builds the factory registered under `id`.
    ///
    /// # Arguments
    /// * `id` - The identifier of the factory.
    /// * `schema` - The dimensions the produced records must fit in.
    ///
    /// # Returns
    /// The factory or an `UnknownRecordFactory` error.
    pub fn resolve(&self, id: &str, schema: Schema) -> Result<Box<dyn RecordFactory>> {
        let ctor = self
            .ctors
            .get(id)
            .ok_or_else(|| MlErr::UnknownRecordFactory {
                id: id.to_string(),
                known: self.identifiers().map(str::to_string).collect(),
            })?;

        Ok(ctor(schema))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ctors.contains_key(id)
    }

    /// Returns the registered identifiers in lexicographic order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.ctors.keys().map(String::as_str)
    }
}

impl Default for RecordFactoryRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(TWENTY_NEWSGROUPS, |schema| {
            Box::new(TwentyNewsgroupsRecordFactory::new(schema))
        });
        registry.register(CSV, |schema| Box::new(CsvRecordFactory::new(schema)));
        registry.register(LIBSVM, |schema| Box::new(LibsvmRecordFactory::new(schema)));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;

    struct ConstFactory;

    impl RecordFactory for ConstFactory {
        fn parse(&self, _raw: &str) -> Result<Record> {
            Ok(Record::new(vec![(0, 1.)], 0))
        }
    }

    #[test]
    fn default_knows_builtins() {
        let registry = RecordFactoryRegistry::default();
        let ids: Vec<_> = registry.identifiers().collect();
        assert_eq!(ids, [CSV, LIBSVM, TWENTY_NEWSGROUPS]);
    }

    #[test]
    fn unknown_id_lists_known_ones() {
        let registry = RecordFactoryRegistry::default();
        let err = registry.resolve("arff", Schema::new(2, 2)).err().unwrap();

        let MlErr::UnknownRecordFactory { id, known } = err else {
            panic!("unexpected error {err}");
        };
        assert_eq!(id, "arff");
        assert_eq!(known.len(), 3);
    }

    #[test]
    fn custom_factories_resolve() {
        let mut registry = RecordFactoryRegistry::empty();
        assert!(registry.register("const", |_| Box::new(ConstFactory)).is_none());
        assert!(registry.contains("const"));

        let factory = registry.resolve("const", Schema::new(1, 1)).unwrap();
        assert_eq!(factory.parse("anything").unwrap(), Record::new(vec![(0, 1.)], 0));
    }
}
