//! binding tree positions to constructible types
//!
//! A [ClassBinder] answers three questions for the resolver:
//! - which class do the children of a container key instantiate as? ([ClassBinder::class_for])
//! - which named constructor builds that class? ([ClassBinder::constructor_for])
//! - build one from these arguments ([ClassBinder::construct])
//!
//! [ClassRegistry] is the table-driven implementation: the host registers its types up front
//! (optionally configured through [BinderConfig]) and passes the registry to the resolver.
use crate::config::BinderConfig;
use crate::value::Value;
use serde::{de::DeserializeOwned, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Name of a constructible type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(String);

impl ClassId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ClassId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Name of a construction entry point of a class
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstructorId(String);

impl ConstructorId {
    pub const DEFAULT: &'static str = "new";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConstructorId {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for ConstructorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConstructorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ConstructorId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

pub trait ClassBinder {
    /// Class of the children of the container at `key`
    fn class_for(&self, key: &str) -> Option<ClassId>;

    fn constructor_for(&self, _class: &ClassId) -> ConstructorId {
        ConstructorId::default()
    }

    fn construct(
        &self,
        class: &ClassId,
        constructor: &ConstructorId,
        args: &Value,
    ) -> Result<Object, ConstructionError>;
}

/// Binder without classes, trees stay plain data
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClasses;

impl ClassBinder for NoClasses {
    fn class_for(&self, _key: &str) -> Option<ClassId> {
        None
    }

    fn construct(
        &self,
        class: &ClassId,
        _constructor: &ConstructorId,
        _args: &Value,
    ) -> Result<Object, ConstructionError> {
        Err(ConstructionError::UnknownClass(class.clone()))
    }
}

/// A constructed object
///
/// The instance itself is type-erased (see [Object::downcast_ref]). Its serialized form is
/// captured at construction time and used whenever a tree containing the object is
/// serialized or compared.
#[derive(Clone)]
pub struct Object {
    class: ClassId,
    instance: Arc<dyn Any + Send + Sync>,
    repr: Arc<Value>,
}

impl Object {
    pub fn new<T>(class: ClassId, instance: T) -> Result<Self, ConstructionError>
    where
        T: Serialize + Send + Sync + 'static,
    {
        let repr = serde_yaml::to_value(&instance)
            .map_err(|err| err.to_string())
            .and_then(|yaml| Value::from_serialized(yaml).map_err(|err| err.to_string()))
            .map_err(|detail| ConstructionError::Representation {
                class: class.clone(),
                detail,
            })?;

        Ok(Self {
            class,
            instance: Arc::new(instance),
            repr: Arc::new(repr),
        })
    }

    pub fn class(&self) -> &ClassId {
        &self.class
    }

    /// Serialized form of the instance
    pub fn repr(&self) -> &Value {
        &self.repr
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.instance.downcast_ref()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.instance.is::<T>()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class)
            .field("repr", &self.repr)
            .finish()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class
            && (Arc::ptr_eq(&self.instance, &other.instance) || self.repr == other.repr)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConstructionError {
    #[error("no class '{0}' registered")]
    UnknownClass(ClassId),
    #[error("class '{class}' has no constructor '{constructor}'")]
    UnknownConstructor {
        class: ClassId,
        constructor: ConstructorId,
    },
    #[error("invalid arguments for '{class}': {source}")]
    InvalidArguments {
        class: ClassId,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("'{class}' rejected its arguments: {reason}")]
    Rejected { class: ClassId, reason: String },
    #[error("unable to represent constructed '{class}': {detail}")]
    Representation { class: ClassId, detail: String },
}

type Constructor =
    Box<dyn Fn(&ClassId, &Value) -> Result<Object, ConstructionError> + Send + Sync>;

/// Explicit table of classes and their constructors
#[derive(Default)]
pub struct ClassRegistry {
    /// container key -> class of its children
    class_map: HashMap<String, ClassId>,
    /// class -> constructor used for it (default: [ConstructorId::DEFAULT])
    class_init: HashMap<ClassId, ConstructorId>,
    constructors: HashMap<(ClassId, ConstructorId), Constructor>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the key and constructor tables of `config`
    ///
    /// Constructors still have to be registered by the host.
    pub fn from_config(config: &BinderConfig) -> Self {
        let mut registry = Self::new();
        for (key, class) in &config.class_map {
            registry.map_key(key.as_str(), class.as_str());
        }
        for (class, constructor) in &config.class_init {
            registry.set_constructor(class.as_str(), constructor.as_str());
        }
        registry
    }

    /// Children of containers named `key` instantiate as `class`
    pub fn map_key(&mut self, key: impl Into<String>, class: impl Into<ClassId>) -> &mut Self {
        self.class_map.insert(key.into(), class.into());
        self
    }

    /// Use `constructor` instead of the default for `class`
    pub fn set_constructor(
        &mut self,
        class: impl Into<ClassId>,
        constructor: impl Into<ConstructorId>,
    ) -> &mut Self {
        self.class_init.insert(class.into(), constructor.into());
        self
    }

    /// Register the default constructor of `class`: deserialize `T` from the arguments
    pub fn register<T>(&mut self, class: impl Into<ClassId>) -> &mut Self
    where
        T: DeserializeOwned + Serialize + Send + Sync + 'static,
    {
        let constructor: Constructor = Box::new(|class: &ClassId, args: &Value| {
            let invalid = |source| ConstructionError::InvalidArguments {
                class: class.clone(),
                source,
            };
            let args = serde_yaml::to_value(args).map_err(invalid)?;
            let instance: T = serde_yaml::from_value(args).map_err(invalid)?;
            Object::new(class.clone(), instance)
        });

        self.constructors
            .insert((class.into(), ConstructorId::default()), constructor);
        self
    }

    /// Register a named constructor of `class`
    pub fn register_with<T, E, F>(
        &mut self,
        class: impl Into<ClassId>,
        constructor: impl Into<ConstructorId>,
        build: F,
    ) -> &mut Self
    where
        T: Serialize + Send + Sync + 'static,
        E: fmt::Display,
        F: Fn(&Value) -> Result<T, E> + Send + Sync + 'static,
    {
        let boxed: Constructor = Box::new(move |class: &ClassId, args: &Value| {
            let instance = build(args).map_err(|err| ConstructionError::Rejected {
                class: class.clone(),
                reason: err.to_string(),
            })?;
            Object::new(class.clone(), instance)
        });

        self.constructors
            .insert((class.into(), constructor.into()), boxed);
        self
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let constructors: Vec<String> = self
            .constructors
            .keys()
            .map(|(class, constructor)| format!("{class}::{constructor}"))
            .collect();

        f.debug_struct("ClassRegistry")
            .field("class_map", &self.class_map)
            .field("class_init", &self.class_init)
            .field("constructors", &constructors)
            .finish()
    }
}

impl ClassBinder for ClassRegistry {
    fn class_for(&self, key: &str) -> Option<ClassId> {
        self.class_map.get(key).cloned()
    }

    fn constructor_for(&self, class: &ClassId) -> ConstructorId {
        self.class_init.get(class).cloned().unwrap_or_default()
    }

    fn construct(
        &self,
        class: &ClassId,
        constructor: &ConstructorId,
        args: &Value,
    ) -> Result<Object, ConstructionError> {
        if let Some(build) = self.constructors.get(&(class.clone(), constructor.clone())) {
            return build(class, args);
        }

        if self.constructors.keys().any(|(known, _)| known == class) {
            return Err(ConstructionError::UnknownConstructor {
                class: class.clone(),
                constructor: constructor.clone(),
            });
        }

        Err(ConstructionError::UnknownClass(class.clone()))
    }
}
