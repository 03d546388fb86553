use std::{any::Any, fmt, sync::Arc};

use crate::class::{Class, ClassKind};

/// A runtime value that can be handed to an instrumenter.
///
/// Objects are shared (`Arc`) and compared by identity, which is how call
/// sites decide whether an invocation concerns a registered target.
#[derive(Clone)]
pub struct Object(Arc<ObjectInner>);

assert_impl_all!(Object: Send, Sync);

struct ObjectInner {
    repr: Repr,
}

enum Repr {
    Null,
    Class(Class),
    Instance {
        class: Class,
        value: Box<dyn Any + Send + Sync>,
    },
    BoundMethod {
        class: Class,
        function: Object,
        receiver: Object,
    },
}

/// A borrowed view of what an [`Object`] is.
#[derive(Debug, Clone, Copy)]
pub enum ObjectKind<'a> {
    Null,
    /// A class literal.
    Class(&'a Class),
    Instance(&'a Class),
    /// A function bound to its receiver.
    BoundMethod {
        function: &'a Object,
        receiver: &'a Object,
    },
}

impl Object {
    /// The null value, never instrumentable.
    pub fn null() -> Self {
        Self::from_repr(Repr::Null)
    }

    /// A class literal, used to instrument constructors and static methods.
    pub fn class_ref(class: &Class) -> Self {
        Self::from_repr(Repr::Class(class.clone()))
    }

    /// A new instance of `class` carrying `value`.
    pub fn instance(class: &Class, value: impl Any + Send + Sync) -> Self {
        Self::from_repr(Repr::Instance {
            class: class.clone(),
            value: Box::new(value),
        })
    }

    /// Binds `function` to `receiver`. The bound method shares the function's
    /// class.
    ///
    /// Returns `None` if `function` is not an instance.
    pub fn bind(function: &Object, receiver: &Object) -> Option<Self> {
        let class = match &function.0.repr {
            Repr::Instance { class, .. } => class.clone(),
            _ => return None,
        };

        Some(Self::from_repr(Repr::BoundMethod {
            class,
            function: function.clone(),
            receiver: receiver.clone(),
        }))
    }

    fn from_repr(repr: Repr) -> Self {
        Self(Arc::new(ObjectInner { repr }))
    }

    /// Returns what the object is.
    pub fn kind(&self) -> ObjectKind<'_> {
        match &self.0.repr {
            Repr::Null => ObjectKind::Null,
            Repr::Class(class) => ObjectKind::Class(class),
            Repr::Instance { class, .. } => ObjectKind::Instance(class),
            Repr::BoundMethod {
                function, receiver, ..
            } => ObjectKind::BoundMethod { function, receiver },
        }
    }

    /// Returns whether the object is the null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self.0.repr, Repr::Null)
    }

    /// The class the object belongs to. For class literals this is the class
    /// itself. `None` for null.
    pub fn class(&self) -> Option<&Class> {
        match &self.0.repr {
            Repr::Null => None,
            Repr::Class(class)
            | Repr::Instance { class, .. }
            | Repr::BoundMethod { class, .. } => Some(class),
        }
    }

    /// The runtime of [`Object::class`].
    pub fn class_kind(&self) -> Option<ClassKind> {
        self.class().map(Class::kind)
    }

    /// Returns the value carried by an instance, if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match &self.0.repr {
            Repr::Instance { value, .. } => value.downcast_ref(),
            _ => None,
        }
    }

    /// Returns whether both handles refer to the same object.
    #[inline]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({self})")
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.repr {
            Repr::Null => f.write_str("null"),
            Repr::Class(class) => write!(f, "class {class}"),
            Repr::Instance { class, .. } => {
                write!(f, "{class}@{:x}", Arc::as_ptr(&self.0) as usize)
            }
            Repr::BoundMethod {
                function, receiver, ..
            } => write!(f, "{function} bound to {receiver}"),
        }
    }
}
