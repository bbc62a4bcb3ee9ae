//! 类型描述符与运行时类型收窄。
//!
//! `TypeDescriptor` 以显式数据描述序列元素的形状，替代反射式的类型内省；
//! [`Typed`] 让值在运行时报告更精确的描述符，编码器据此按“实例判定”规则选择最具体的形状。

use std::borrow::Cow;
use std::fmt;

/// 描述符的结构种类。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// 任意类型，所有值都是它的实例。
    Any,
    /// 字符串、数字、布尔等标量。
    Scalar,
    /// 具名字段组成的对象。
    Object,
    /// 无法表示为 JSON 的不透明句柄（文件描述符、回调等）。
    Opaque,
    /// 有序列表，携带元素类型。
    List(Box<TypeDescriptor>),
    /// 字符串键映射，携带值类型。
    Map(Box<TypeDescriptor>),
}

/// 与具体语言运行时无关的类型描述符。
///
/// # 契约（What）
/// - `name` 用于实例判定与诊断输出；
/// - `supertypes` 列出该类型可被视作的上层类型名，支撑多态负载的收窄；
/// - 容器种类（`List`/`Map`）通过 [`TypeDescriptor::is_container`] 识别，编码器对其启用容器感知写出路径。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    name: Cow<'static, str>,
    kind: TypeKind,
    supertypes: Vec<Cow<'static, str>>,
}

impl TypeDescriptor {
    fn with_kind(name: impl Into<Cow<'static, str>>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            supertypes: Vec::new(),
        }
    }

    /// 任意类型。
    pub fn any() -> Self {
        Self::with_kind("any", TypeKind::Any)
    }

    /// 标量类型。
    pub fn scalar(name: impl Into<Cow<'static, str>>) -> Self {
        Self::with_kind(name, TypeKind::Scalar)
    }

    /// 对象类型。
    pub fn object(name: impl Into<Cow<'static, str>>) -> Self {
        Self::with_kind(name, TypeKind::Object)
    }

    /// 不透明类型，默认序列化能力会拒绝它。
    pub fn opaque(name: impl Into<Cow<'static, str>>) -> Self {
        Self::with_kind(name, TypeKind::Opaque)
    }

    /// 以 `element` 为元素类型的列表。
    pub fn list_of(element: TypeDescriptor) -> Self {
        Self::with_kind("list", TypeKind::List(Box::new(element)))
    }

    /// 以 `value` 为值类型的映射。
    pub fn map_of(value: TypeDescriptor) -> Self {
        Self::with_kind("map", TypeKind::Map(Box::new(value)))
    }

    /// 声明上层类型名。
    pub fn with_supertype(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.supertypes.push(name.into());
        self
    }

    /// 类型名。
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 结构种类。
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// 声明的上层类型名。
    pub fn supertypes(&self) -> &[Cow<'static, str>] {
        &self.supertypes
    }

    /// 是否为列表或映射。
    pub fn is_container(&self) -> bool {
        matches!(self.kind, TypeKind::List(_) | TypeKind::Map(_))
    }

    /// 容器的元素（或值）类型。
    pub fn element_type(&self) -> Option<&TypeDescriptor> {
        match &self.kind {
            TypeKind::List(element) | TypeKind::Map(element) => Some(element),
            _ => None,
        }
    }

    /// 判断运行时类型为 `runtime` 的值是否是本类型的实例。
    ///
    /// # 规则
    /// - `Any` 接受一切；
    /// - 容器仅与同种容器比较，并递归判定元素类型；
    /// - 其余情况比较类型名，或 `runtime` 声明了本类型为上层类型。
    pub fn is_instance(&self, runtime: &TypeDescriptor) -> bool {
        match (&self.kind, &runtime.kind) {
            (TypeKind::Any, _) => true,
            (TypeKind::List(declared), TypeKind::List(actual))
            | (TypeKind::Map(declared), TypeKind::Map(actual)) => declared.is_instance(actual),
            (TypeKind::List(_) | TypeKind::Map(_), _) | (_, TypeKind::List(_) | TypeKind::Map(_)) => {
                false
            }
            _ => runtime.name == self.name || runtime.supertypes.iter().any(|s| *s == self.name),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::List(element) => write!(f, "list<{element}>"),
            TypeKind::Map(value) => write!(f, "map<string, {value}>"),
            _ => f.write_str(&self.name),
        }
    }
}

/// 值在运行时报告自身的类型描述符。
///
/// 默认实现返回 `None`，表示没有比声明类型更精确的信息，编码器将直接使用声明类型。
pub trait Typed {
    /// 运行时类型描述符。
    fn runtime_type(&self) -> Option<TypeDescriptor> {
        None
    }
}

impl Typed for serde_json::Value {
    fn runtime_type(&self) -> Option<TypeDescriptor> {
        use serde_json::Value;

        match self {
            Value::Null => None,
            Value::Bool(_) => Some(TypeDescriptor::scalar("boolean")),
            Value::Number(_) => Some(TypeDescriptor::scalar("number")),
            Value::String(_) => Some(TypeDescriptor::scalar("string")),
            Value::Array(_) => Some(TypeDescriptor::list_of(TypeDescriptor::any())),
            // 无法区分记录与映射，按记录处理；需要映射语义时由声明类型给出。
            Value::Object(_) => Some(TypeDescriptor::object("object")),
        }
    }
}

macro_rules! impl_scalar_typed {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Typed for $ty {
                fn runtime_type(&self) -> Option<TypeDescriptor> {
                    Some(TypeDescriptor::scalar($name))
                }
            }
        )*
    };
}

impl_scalar_typed! {
    bool => "boolean",
    i32 => "number",
    i64 => "number",
    u32 => "number",
    u64 => "number",
    f64 => "number",
    String => "string",
}

impl<T: Typed + ?Sized> Typed for Box<T> {
    fn runtime_type(&self) -> Option<TypeDescriptor> {
        (**self).runtime_type()
    }
}
