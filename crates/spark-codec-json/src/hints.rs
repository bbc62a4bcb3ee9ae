//! 编码提示（hints）与提示构造钩子所需的输入类型。

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::types::TypeDescriptor;

/// 视图选择器在 [`EncodeHints`] 中的键。
pub const JSON_VIEW_HINT: &str = "spark.codec.json.view";

/// 视图选择器：收窄值对外暴露字段的不透明标签。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewSelector(Cow<'static, str>);

impl ViewSelector {
    /// 创建视图标签。
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// 标签名。
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 字符串键到不透明值的提示映射。
///
/// # 契约（What）
/// - 值以 `Arc<dyn Any + Send + Sync>` 保存，克隆映射只增加引用计数；
/// - 键的插入顺序无意义；
/// - 编码器只读取 [`JSON_VIEW_HINT`]，其余键原样保留给其他协作方。
#[derive(Clone, Default)]
pub struct EncodeHints {
    entries: HashMap<Cow<'static, str>, Arc<dyn Any + Send + Sync>>,
}

impl EncodeHints {
    /// 空映射。
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入提示，返回被覆盖的旧值。
    pub fn insert<V>(
        &mut self,
        key: impl Into<Cow<'static, str>>,
        value: V,
    ) -> Option<Arc<dyn Any + Send + Sync>>
    where
        V: Any + Send + Sync,
    {
        self.entries.insert(key.into(), Arc::new(value))
    }

    /// 按键读取并向下转型；类型不符时返回 `None`。
    pub fn get<V: Any>(&self, key: &str) -> Option<&V> {
        self.entries.get(key).and_then(|value| value.downcast_ref::<V>())
    }

    /// 是否包含某个键。
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// 条目数量。
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 链式写入视图选择器。
    pub fn with_view(mut self, view: ViewSelector) -> Self {
        self.insert(JSON_VIEW_HINT, view);
        self
    }

    /// 读取视图选择器。
    pub fn view(&self) -> Option<&ViewSelector> {
        self.get::<ViewSelector>(JSON_VIEW_HINT)
    }
}

impl fmt::Debug for EncodeHints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.entries.keys().map(|k| &**k).collect();
        keys.sort_unstable();
        f.debug_struct("EncodeHints")
            .field("keys", &keys)
            .field("view", &self.view())
            .finish()
    }
}

/// 处理器声明的返回类型，附带可选的视图注解。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotatedType {
    descriptor: TypeDescriptor,
    view: Option<ViewSelector>,
}

impl AnnotatedType {
    /// 无注解的返回类型。
    pub fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            view: None,
        }
    }

    /// 附加视图注解。
    pub fn with_view(mut self, view: ViewSelector) -> Self {
        self.view = Some(view);
        self
    }

    /// 类型描述符。
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// 视图注解。
    pub fn view(&self) -> Option<&ViewSelector> {
        self.view.as_ref()
    }
}

/// 一次请求/响应交换的诊断上下文，供提示钩子记录日志。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExchangeContext {
    request_id: Option<Cow<'static, str>>,
}

impl ExchangeContext {
    /// 空上下文。
    pub fn new() -> Self {
        Self::default()
    }

    /// 附加请求标识。
    pub fn with_request_id(mut self, id: impl Into<Cow<'static, str>>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// 请求标识。
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}
