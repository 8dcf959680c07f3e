//! Method-level view of an annotated compilation unit.
//!
//! The host parser lowers source code into this tree: types, their methods
//! with annotation data, and for each method a structured body made only of
//! the shapes that matter for obligation synthesis (calls, branches, loops,
//! nested declarations). Everything else in a method body is dropped by the
//! parser.

use serde::{Deserialize, Serialize};
use shellac_types::{MethodKey, ReqVarDecl, SourceSpan};

/// A statement list, executed in order.
pub type Block = Vec<Stmt>;

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationUnit {
    /// Unit name; scopes diagnostics and completion records.
    pub name: String,
    #[serde(default)]
    pub types: Vec<TypeDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    #[serde(default)]
    pub span: SourceSpan,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub span: SourceSpan,
    /// Requirements this method claims to satisfy.
    #[serde(default)]
    pub satisfies: Vec<String>,
    /// Requirement this method dynamically checks.
    #[serde(default)]
    pub checks: Option<String>,
    /// Method-level variable: the return value, or an instance field when
    /// `is_instance` is set.
    #[serde(default)]
    pub result: Option<ReqVarDecl>,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    #[serde(default)]
    pub req_var: Option<ReqVarDecl>,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: SourceSpan::default(),
            satisfies: Vec::new(),
            checks: None,
            result: None,
            params: Vec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn satisfying<I, S>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.satisfies = requirements.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn checking(mut self, requirement: impl Into<String>) -> Self {
        self.checks = Some(requirement.into());
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, req_var: Option<ReqVarDecl>) -> Self {
        self.params.push(ParamDecl {
            name: name.into(),
            req_var,
        });
        self
    }

    #[must_use]
    pub fn with_result(mut self, decl: ReqVarDecl) -> Self {
        self.result = Some(decl);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Block) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub const fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }

    /// Registry key of this method when declared in `type_name`.
    #[must_use]
    pub fn key(&self, type_name: &str) -> MethodKey {
        MethodKey::new(type_name, &self.name)
    }

    #[must_use]
    pub const fn is_checker(&self) -> bool {
        self.checks.is_some()
    }

    #[must_use]
    pub fn is_satisfier(&self) -> bool {
        !self.satisfies.is_empty()
    }

    /// Every binding name a dispatch of this method would produce.
    #[must_use]
    pub fn bound_variable_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut push_decl = |decl: &ReqVarDecl, primed: bool| {
            names.push(decl.name.clone());
            if primed {
                names.push(decl.primed_name());
            }
            if decl.keeps_history() {
                names.push(decl.history_name());
            }
        };
        for param in &self.params {
            if let Some(decl) = &param.req_var {
                push_decl(decl, decl.is_output || decl.is_instance);
            }
        }
        if let Some(decl) = &self.result {
            push_decl(decl, decl.is_instance);
        }
        names
    }
}

impl CompilationUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_type(mut self, decl: TypeDecl) -> Self {
        self.types.push(decl);
        self
    }

    /// All methods in file order, with their registry keys.
    pub fn methods(&self) -> impl Iterator<Item = (MethodKey, &MethodDecl)> + '_ {
        self.types.iter().flat_map(|ty| {
            ty.methods
                .iter()
                .map(move |method| (method.key(&ty.name), method))
        })
    }
}

impl TypeDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: SourceSpan::default(),
            methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }
}

// ---------------------------------------------------------------------------
// Method bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopKind {
    For,
    While,
    DoWhile,
    ForEach,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stmt", rename_all = "snake_case")]
pub enum Stmt {
    /// Invocation of another method.
    Call {
        callee: MethodKey,
        #[serde(default)]
        span: SourceSpan,
    },
    /// Nested statement block.
    Block {
        #[serde(default)]
        body: Block,
    },
    /// `if (condition) then_branch [else else_branch]`.
    If {
        #[serde(default)]
        span: SourceSpan,
        #[serde(default)]
        condition: Block,
        #[serde(default)]
        then_branch: Block,
        #[serde(default)]
        else_branch: Option<Block>,
    },
    /// `condition ? then_branch : else_branch`.
    Ternary {
        #[serde(default)]
        span: SourceSpan,
        #[serde(default)]
        condition: Block,
        #[serde(default)]
        then_branch: Block,
        #[serde(default)]
        else_branch: Block,
    },
    /// `switch (selector) { case ...: ... }`.
    Switch {
        #[serde(default)]
        span: SourceSpan,
        #[serde(default)]
        selector: Block,
        #[serde(default)]
        cases: Vec<Block>,
    },
    /// Any loop; calls in its header belong to the repeated body.
    Loop {
        kind: LoopKind,
        #[serde(default)]
        span: SourceSpan,
        #[serde(default)]
        body: Block,
    },
    /// A method declared inside another method's body.
    Method(MethodDecl),
}

impl Stmt {
    pub fn call(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self::Call {
            callee: MethodKey::new(type_name, method),
            span: SourceSpan::default(),
        }
    }

    #[must_use]
    pub fn if_then(then_branch: Block) -> Self {
        Self::If {
            span: SourceSpan::default(),
            condition: Vec::new(),
            then_branch,
            else_branch: None,
        }
    }

    #[must_use]
    pub fn if_else(then_branch: Block, else_branch: Block) -> Self {
        Self::If {
            span: SourceSpan::default(),
            condition: Vec::new(),
            then_branch,
            else_branch: Some(else_branch),
        }
    }

    #[must_use]
    pub fn looping(kind: LoopKind, body: Block) -> Self {
        Self::Loop {
            kind,
            span: SourceSpan::default(),
            body,
        }
    }

    /// Anchor for diagnostics about this node.
    #[must_use]
    pub fn span(&self) -> SourceSpan {
        match self {
            Self::Call { span, .. }
            | Self::If { span, .. }
            | Self::Ternary { span, .. }
            | Self::Switch { span, .. }
            | Self::Loop { span, .. } => *span,
            Self::Block { body } => body.first().map_or_else(SourceSpan::default, Self::span),
            Self::Method(decl) => decl.span,
        }
    }
}
