//! A reflective description of instrumentable types.
//!
//! The harness instruments types it has never seen, so every type exposed to
//! scripts is described at runtime by a [`Class`] listing its [`Member`]s.
//! Weaving engines key their call sites by [`MemberId`].

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use derive_more::{Display, IsVariant};

static NEXT_MEMBER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a [`Member`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("member#{_0}")]
pub struct MemberId(u64);

impl MemberId {
    fn generate() -> Self {
        Self(NEXT_MEMBER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Where a class comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IsVariant)]
pub enum ClassKind {
    /// A native type exposed to scripts.
    Host,
    /// A type defined by a script engine (functions, script classes).
    Script,
}

/// What kind of callable a member is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IsVariant)]
pub enum MemberKind {
    Constructor,
    Method,
    StaticMethod,
}

// === Member ===

/// A constructor or a method of a [`Class`].
///
/// `parameters` counts invocation arguments. For instance methods the first
/// argument is the receiver.
#[derive(Clone)]
pub struct Member(Arc<MemberInner>);

struct MemberInner {
    id: MemberId,
    class: Arc<str>,
    name: Arc<str>,
    kind: MemberKind,
    parameters: usize,
}

impl Member {
    /// The identity of the member, unique within the process.
    #[inline]
    pub fn id(&self) -> MemberId {
        self.0.id
    }

    /// The simple name, `<init>` for constructors.
    #[inline]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The name of the declaring class.
    #[inline]
    pub fn declaring_class(&self) -> &str {
        &self.0.class
    }

    /// Whether it is a constructor, an instance or a static method.
    #[inline]
    pub fn kind(&self) -> MemberKind {
        self.0.kind
    }

    /// The number of parameters, the receiver of instance methods included.
    #[inline]
    pub fn parameters(&self) -> usize {
        self.0.parameters
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Member {}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("id", &self.0.id)
            .field("class", &&*self.0.class)
            .field("name", &&*self.0.name)
            .field("kind", &self.0.kind)
            .field("parameters", &self.0.parameters)
            .finish()
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.kind {
            MemberKind::Constructor => write!(f, "{}::<init>/{}", self.0.class, self.0.parameters),
            _ => write!(f, "{}::{}/{}", self.0.class, self.0.name, self.0.parameters),
        }
    }
}

// === Class ===

/// A runtime type descriptor. Classes compare by identity.
#[derive(Clone)]
pub struct Class(Arc<ClassInner>);

struct ClassInner {
    name: Arc<str>,
    kind: ClassKind,
    superclass: Option<Class>,
    members: Vec<Member>,
}

impl Class {
    /// Starts describing a class named `name`.
    pub fn builder(name: impl Into<Arc<str>>) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            kind: ClassKind::Host,
            superclass: None,
            members: Vec::new(),
        }
    }

    /// The fully qualified name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Which runtime the class belongs to.
    #[inline]
    pub fn kind(&self) -> ClassKind {
        self.0.kind
    }

    /// The direct ancestor, if any.
    #[inline]
    pub fn superclass(&self) -> Option<&Class> {
        self.0.superclass.as_ref()
    }

    /// Members declared by this class, in declaration order.
    #[inline]
    pub fn members(&self) -> &[Member] {
        &self.0.members
    }

    /// Constructors declared by this class.
    pub fn constructors(&self) -> impl Iterator<Item = &Member> {
        self.members().iter().filter(|m| m.kind().is_constructor())
    }

    /// Instance methods declared by this class.
    pub fn methods(&self) -> impl Iterator<Item = &Member> {
        self.members().iter().filter(|m| m.kind().is_method())
    }

    /// Static methods declared by this class.
    pub fn static_methods(&self) -> impl Iterator<Item = &Member> {
        self.members().iter().filter(|m| m.kind().is_static_method())
    }

    /// Finds a declared method or static method by name.
    pub fn find_method(&self, name: &str) -> Option<&Member> {
        self.members()
            .iter()
            .find(|m| !m.kind().is_constructor() && m.name() == name)
    }

    /// Iterates over this class and then its ancestors.
    pub fn hierarchy(&self) -> impl Iterator<Item = &Class> {
        std::iter::successors(Some(self), |class| class.superclass())
    }

    /// Returns whether both handles refer to the same class.
    #[inline]
    pub fn ptr_eq(&self, other: &Class) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Class {}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &&*self.0.name)
            .field("kind", &self.0.kind)
            .field("superclass", &self.0.superclass.as_ref().map(|c| c.name()))
            .field("members", &self.0.members.len())
            .finish()
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

// === ClassBuilder ===

/// Builds a [`Class`].
///
/// # Example
/// ```
/// # use grinder_core::{Class, ClassKind};
/// let account = Class::builder("bank::Account")
///     .constructor(1)
///     .method("deposit", 2)
///     .static_method("open", 1)
///     .build();
///
/// assert_eq!(account.kind(), ClassKind::Host);
/// assert_eq!(account.members().len(), 3);
/// ```
#[must_use]
pub struct ClassBuilder {
    name: Arc<str>,
    kind: ClassKind,
    superclass: Option<Class>,
    members: Vec<(Arc<str>, MemberKind, usize)>,
}

impl ClassBuilder {
    /// Sets the runtime of the class, `ClassKind::Host` by default.
    pub fn kind(mut self, kind: ClassKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the direct ancestor.
    pub fn superclass(mut self, superclass: &Class) -> Self {
        self.superclass = Some(superclass.clone());
        self
    }

    /// Adds a constructor.
    pub fn constructor(mut self, parameters: usize) -> Self {
        self.members
            .push(("<init>".into(), MemberKind::Constructor, parameters));
        self
    }

    /// Adds an instance method. `parameters` includes the receiver.
    pub fn method(mut self, name: &str, parameters: usize) -> Self {
        self.members
            .push((name.into(), MemberKind::Method, parameters.max(1)));
        self
    }

    /// Adds a static method.
    pub fn static_method(mut self, name: &str, parameters: usize) -> Self {
        self.members
            .push((name.into(), MemberKind::StaticMethod, parameters));
        self
    }

    /// Builds the class, assigning new identities to its members.
    pub fn build(self) -> Class {
        let members = self
            .members
            .into_iter()
            .map(|(name, kind, parameters)| {
                Member(Arc::new(MemberInner {
                    id: MemberId::generate(),
                    class: self.name.clone(),
                    name,
                    kind,
                    parameters,
                }))
            })
            .collect();

        Class(Arc::new(ClassInner {
            name: self.name,
            kind: self.kind,
            superclass: self.superclass,
            members,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_are_unique() {
        let build = || Class::builder("a::B").method("run", 1).build();
        let (first, second) = (build(), build());

        assert_ne!(first, second);
        assert_ne!(first.members()[0], second.members()[0]);
        assert_eq!(first.members()[0].declaring_class(), "a::B");
    }

    #[test]
    fn hierarchy() {
        let base = Class::builder("a::Base").method("close", 1).build();
        let derived = Class::builder("a::Derived")
            .superclass(&base)
            .method("read", 2)
            .build();

        let names: Vec<_> = derived.hierarchy().map(|c| c.name()).collect();
        assert_eq!(names, ["a::Derived", "a::Base"]);
        assert!(derived.find_method("close").is_none());
        assert!(base.find_method("close").is_some());
    }

    #[test]
    fn instance_methods_have_a_receiver() {
        let class = Class::builder("a::B").method("run", 0).build();
        assert_eq!(class.members()[0].parameters(), 1);
        assert_eq!(class.members()[0].to_string(), "a::B::run/1");
    }
}
