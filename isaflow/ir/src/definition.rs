use crate::{Graph, Kind, Owner, Type};
use isaflow_utils::{GPosIdx, GetName, Id, WithPos};

/// What a [Definition] describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Function,
    Instruction,
    /// A pipeline stage.
    Stage,
}

impl DefinitionKind {
    /// The terminal node the behavior of such a definition must end with.
    pub fn terminal(&self) -> Kind {
        match self {
            DefinitionKind::Function => Kind::Return,
            DefinitionKind::Instruction => Kind::InstrEnd,
            DefinitionKind::Stage => Kind::ProcEnd,
        }
    }
}

impl std::fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefinitionKind::Function => write!(f, "function"),
            DefinitionKind::Instruction => write!(f, "instruction"),
            DefinitionKind::Stage => write!(f, "stage"),
        }
    }
}

/// A declared parameter of a function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: Id,
    pub ty: Type,
}

impl Param {
    pub fn new<S: Into<Id>>(name: S, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A function, instruction or stage together with the graph describing its
/// behavior.
#[derive(Debug)]
pub struct Definition {
    pub name: Id,
    pub kind: DefinitionKind,
    pub params: Vec<Param>,
    /// Declared return type. Only functions have one.
    pub ret: Option<Type>,
    pub pos: GPosIdx,
    /// The behavior graph. Its owner is this definition.
    pub behavior: Graph,
}

impl Definition {
    pub fn new<S: Into<Id>>(
        name: S,
        kind: DefinitionKind,
        params: Vec<Param>,
        ret: Option<Type>,
        mut behavior: Graph,
    ) -> Self {
        let name = name.into();
        behavior.set_owner(Owner {
            name,
            kind,
            pos: GPosIdx::UNKNOWN,
        });
        Self {
            name,
            kind,
            params,
            ret,
            pos: GPosIdx::UNKNOWN,
            behavior,
        }
    }

    pub fn function<S: Into<Id>>(
        name: S,
        params: Vec<Param>,
        ret: Type,
        behavior: Graph,
    ) -> Self {
        Self::new(name, DefinitionKind::Function, params, Some(ret), behavior)
    }

    pub fn instruction<S: Into<Id>>(name: S, behavior: Graph) -> Self {
        Self::new(name, DefinitionKind::Instruction, vec![], None, behavior)
    }

    pub fn stage<S: Into<Id>>(name: S, behavior: Graph) -> Self {
        Self::new(name, DefinitionKind::Stage, vec![], None, behavior)
    }

    /// Attach a source position to the definition and its behavior.
    pub fn with_pos(mut self, pos: GPosIdx) -> Self {
        self.pos = pos;
        self.behavior.set_owner(Owner {
            name: self.name,
            kind: self.kind,
            pos,
        });
        self
    }

    /// Replace the behavior graph, returning the previous one.
    pub fn replace_behavior(&mut self, mut behavior: Graph) -> Graph {
        behavior.set_owner(Owner {
            name: self.name,
            kind: self.kind,
            pos: self.pos,
        });
        std::mem::replace(&mut self.behavior, behavior)
    }

    pub fn find_param(&self, name: Id) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }
}

impl GetName for Definition {
    fn name(&self) -> Id {
        self.name
    }
}

impl WithPos for Definition {
    fn copy_span(&self) -> GPosIdx {
        self.pos
    }
}
