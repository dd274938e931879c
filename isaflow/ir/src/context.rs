//! An IR context. This is the top-level object holding every definition of an
//! architecture specification after lowering.
use crate::{Definition, DefinitionKind};
use isaflow_utils::Id;

/// All definitions of a specification.
#[derive(Default, Debug)]
pub struct Context {
    /// Definitions in the order they were lowered.
    pub definitions: Vec<Definition>,
    /// Extra options provided by the embedding tool.
    /// Interpreted by individual passes
    pub extra_opts: Vec<String>,
}

impl Context {
    pub fn new(definitions: Vec<Definition>) -> Self {
        Self {
            definitions,
            extra_opts: vec![],
        }
    }

    pub fn add(&mut self, def: Definition) {
        self.definitions.push(def)
    }

    pub fn find(&self, name: Id) -> Option<&Definition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    pub fn find_mut(&mut self, name: Id) -> Option<&mut Definition> {
        self.definitions.iter_mut().find(|d| d.name == name)
    }

    /// Definitions of the given kind.
    pub fn definitions_of(
        &self,
        kind: DefinitionKind,
    ) -> impl Iterator<Item = &Definition> {
        self.definitions.iter().filter(move |d| d.kind == kind)
    }
}
