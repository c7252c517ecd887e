//! Field lookup and snapshot assembly.
//!
//! A [`FieldDirectory`] holds an ordered list of resolvers. Queries dispatch
//! on the key's program; snapshots walk the resolvers in registration order
//! so two snapshots of unchanged state are identical.

use super::{FieldKey, FieldOperation, FieldValue, Program};
use crate::entity_id::Addressable;
use tracing::{debug, warn};

/// An entity whose presence fields can be read.
///
/// [`presence_view`](PresenceSource::presence_view) captures all state the
/// resolvers need under a single lock, so one snapshot never mixes values
/// observed at different times.
pub trait PresenceSource: Addressable + Send + Sync {
    type View;

    fn presence_view(&self) -> Self::View;
}

/// Outcome of resolving one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Value(FieldValue),
    /// The key is known but currently has no value.
    Unset,
    /// The resolver does not recognise the key.
    Unknown,
}

/// Interprets the keys of one program.
pub trait FieldResolver<V>: Send + Sync {
    fn program(&self) -> Program;

    fn name(&self) -> &'static str;

    fn resolve(&self, view: &V, key: &FieldKey) -> Resolution;

    /// Appends every field this resolver currently advertises, in a fixed order.
    fn enumerate(&self, view: &V, out: &mut Vec<FieldOperation>);
}

pub struct FieldDirectory<V> {
    resolvers: Vec<Box<dyn FieldResolver<V>>>,
}

impl<V> Default for FieldDirectory<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FieldDirectory<V> {
    pub fn new() -> Self {
        Self { resolvers: Vec::new() }
    }

    /// Adds a resolver. Registration order is snapshot order.
    pub fn with_resolver<R>(mut self, resolver: R) -> Self
    where
        R: FieldResolver<V> + 'static,
    {
        self.resolvers.push(Box::new(resolver));
        self
    }

    pub fn resolver_names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    /// Looks up one field. Unknown programs and keys yield `None` and a
    /// warning; they never fail.
    pub fn query<S>(&self, entity: &S, key: &FieldKey) -> Option<FieldValue>
    where
        S: PresenceSource<View = V>,
    {
        self.query_view(&entity.presence_view(), key)
    }

    /// Same as [`query`](Self::query) against an already captured view.
    pub fn query_view(&self, view: &V, key: &FieldKey) -> Option<FieldValue> {
        let Some(program) = key.program() else {
            warn!("⚠️ Unknown presence program in query-key {}", key);
            return None;
        };

        let mut program_known = false;
        for resolver in self.resolvers.iter().filter(|r| r.program() == program) {
            program_known = true;
            match resolver.resolve(view, key) {
                Resolution::Value(value) => return Some(value),
                Resolution::Unset => {
                    debug!("Field {} has no value", key);
                    return None;
                }
                Resolution::Unknown => continue,
            }
        }

        if program_known {
            warn!("⚠️ Unknown query-key {}", key);
        } else {
            warn!("⚠️ No resolver registered for program {:?} (key {})", program, key);
        }
        None
    }

    /// Every advertised field, in resolver registration order.
    pub fn snapshot<S>(&self, entity: &S) -> Vec<FieldOperation>
    where
        S: PresenceSource<View = V>,
    {
        self.snapshot_view(&entity.presence_view())
    }

    pub fn snapshot_view(&self, view: &V) -> Vec<FieldOperation> {
        let mut ops = Vec::new();
        for resolver in &self.resolvers {
            resolver.enumerate(view, &mut ops);
        }
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter;

    impl FieldResolver<u32> for Counter {
        fn program(&self) -> Program {
            Program::BNet
        }
        fn name(&self) -> &'static str {
            "counter"
        }
        fn resolve(&self, view: &u32, key: &FieldKey) -> Resolution {
            match (key.group, key.field) {
                (9, 1) => Resolution::Value(FieldValue::Int(i64::from(*view))),
                (9, 2) if *view == 0 => Resolution::Unset,
                (9, 2) => Resolution::Value(FieldValue::Bool(true)),
                _ => Resolution::Unknown,
            }
        }
        fn enumerate(&self, view: &u32, out: &mut Vec<FieldOperation>) {
            out.push(FieldOperation::set(
                FieldKey::new(Program::BNet, 9, 1, 0),
                FieldValue::Int(i64::from(*view)),
            ));
        }
    }

    #[test]
    fn query_dispatches_by_program_and_key() {
        let directory = FieldDirectory::new().with_resolver(Counter);
        let value = directory.query_view(&5, &FieldKey::new(Program::BNet, 9, 1, 0));
        assert_eq!(value, Some(FieldValue::Int(5)));
    }

    #[test]
    fn unknown_keys_and_programs_are_absent() {
        let directory = FieldDirectory::new().with_resolver(Counter);
        assert_eq!(directory.query_view(&5, &FieldKey::new(Program::BNet, 3, 3, 0)), None);
        assert_eq!(directory.query_view(&5, &FieldKey::new(Program::D3, 9, 1, 0)), None);
        let foreign = FieldKey { program: 0x5743, group: 1, field: 1, index: 0 };
        assert_eq!(directory.query_view(&5, &foreign), None);
    }

    #[test]
    fn unset_fields_are_absent() {
        let directory = FieldDirectory::new().with_resolver(Counter);
        assert_eq!(directory.query_view(&0, &FieldKey::new(Program::BNet, 9, 2, 0)), None);
    }
}
