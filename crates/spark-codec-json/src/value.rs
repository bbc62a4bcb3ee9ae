//! 单值编码：类型解析、写出器选择与字节块分配。

use std::sync::Arc;

use serde::Serialize;

use crate::buffer::{BufferFactory, ByteChunk};
use crate::error::{EncodeError, Result};
use crate::hints::EncodeHints;
use crate::mapper::{JsonMapper, JsonWriter, PrettyPrinter};
use crate::media_type::MediaType;
use crate::types::TypeDescriptor;

/// 把单个值（或一次收集的列表）编码为一个字节块。
///
/// # 逻辑（How）
/// 1. 解析类型：值的运行时类型是声明类型的实例时采用运行时类型，否则采用声明类型；
///    序列化能力不认可解析出的类型时以 [`EncodeError::UnsupportedType`] 失败；
/// 2. 提示中带有视图选择器时取视图作用域写出器，否则取默认写出器；
/// 3. 解析出的类型为容器时以 `for_type` 收窄写出器；
/// 4. 写出器开启缩进且目标格式有专属美化策略（`text/event-stream`）时替换打印策略；
/// 5. 从缓冲工厂分配字节块并写入。
pub struct ValueEncoder<M> {
    mapper: Arc<M>,
}

impl<M> Clone for ValueEncoder<M> {
    fn clone(&self) -> Self {
        Self {
            mapper: Arc::clone(&self.mapper),
        }
    }
}

impl<M: JsonMapper> ValueEncoder<M> {
    /// 共享同一个序列化能力。
    pub fn new(mapper: Arc<M>) -> Self {
        Self { mapper }
    }

    /// 序列化能力。
    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    /// 编码 `value`。
    ///
    /// `runtime_type` 为值自报的运行时类型，`None` 表示没有比 `declared_type` 更精确的信息。
    pub fn encode<V, F>(
        &self,
        value: &V,
        runtime_type: Option<TypeDescriptor>,
        declared_type: &TypeDescriptor,
        media_type: Option<&MediaType>,
        hints: &EncodeHints,
        buffer_factory: &F,
    ) -> Result<ByteChunk>
    where
        V: Serialize + ?Sized,
        F: BufferFactory + ?Sized,
    {
        let resolved = resolve_type(declared_type, runtime_type);
        if !self.mapper.can_serialize(&resolved) {
            return Err(EncodeError::UnsupportedType {
                type_name: resolved.to_string(),
            });
        }

        let mut writer = self.mapper.writer(hints.view());
        if resolved.is_container() {
            writer = writer.for_type(&resolved);
        }
        if writer.indent_output()
            && let Some(printer) = PrettyPrinter::for_format(media_type)
        {
            writer = writer.with_pretty_printer(printer);
        }

        let mut chunk = buffer_factory.allocate_buffer()?;
        writer.write_value(chunk.as_sink(), value)?;
        Ok(chunk)
    }
}

/// 选择编码时使用的类型描述符。
pub fn resolve_type(declared: &TypeDescriptor, runtime: Option<TypeDescriptor>) -> TypeDescriptor {
    match runtime {
        Some(runtime) if declared.is_instance(&runtime) => runtime,
        _ => declared.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::HeapBufferFactory;
    use crate::error::codes;
    use crate::hints::ViewSelector;
    use crate::mapper::SerdeJsonMapper;
    use crate::media_type::{APPLICATION_JSON, TEXT_EVENT_STREAM};
    use serde_json::json;

    struct ExhaustedFactory;

    impl BufferFactory for ExhaustedFactory {
        fn allocate_buffer(&self) -> Result<ByteChunk> {
            Err(EncodeError::allocation("pool exhausted"))
        }
    }

    fn encoder(mapper: SerdeJsonMapper) -> ValueEncoder<SerdeJsonMapper> {
        ValueEncoder::new(Arc::new(mapper))
    }

    #[test]
    fn runtime_type_is_preferred_only_for_instances() {
        let shape = TypeDescriptor::object("shape");
        let circle = TypeDescriptor::object("circle").with_supertype("shape");
        assert_eq!(resolve_type(&shape, Some(circle.clone())), circle);
        assert_eq!(resolve_type(&shape, Some(TypeDescriptor::object("order"))), shape);
        assert_eq!(resolve_type(&shape, None), shape);
    }

    #[test]
    fn compact_value_without_media_type() {
        let chunk = encoder(SerdeJsonMapper::new())
            .encode(
                &json!({"a": 1}),
                None,
                &TypeDescriptor::any(),
                None,
                &EncodeHints::new(),
                &HeapBufferFactory::default(),
            )
            .expect("编码单值");
        assert_eq!(chunk.as_bytes(), br#"{"a":1}"#);
    }

    #[test]
    fn event_stream_printer_requires_indentation() {
        let value = json!({"a": 1, "b": "x"});
        let factory = HeapBufferFactory::default();
        let hints = EncodeHints::new();

        let indented = encoder(SerdeJsonMapper::new().with_indent_output(true))
            .encode(&value, None, &TypeDescriptor::any(), Some(&TEXT_EVENT_STREAM), &hints, &factory)
            .expect("事件流美化输出");
        assert_eq!(
            indented.as_bytes(),
            b"{\ndata:  \"a\" : 1,\ndata:  \"b\" : \"x\"\ndata:}"
        );

        let compact = encoder(SerdeJsonMapper::new())
            .encode(&value, None, &TypeDescriptor::any(), Some(&TEXT_EVENT_STREAM), &hints, &factory)
            .expect("未开启缩进时保持紧凑");
        assert_eq!(compact.as_bytes(), br#"{"a":1,"b":"x"}"#);

        let plain_indent = encoder(SerdeJsonMapper::new().with_indent_output(true))
            .encode(&value, None, &TypeDescriptor::any(), Some(&APPLICATION_JSON), &hints, &factory)
            .expect("普通缩进");
        assert_eq!(plain_indent.as_bytes(), b"{\n  \"a\" : 1,\n  \"b\" : \"x\"\n}");
    }

    #[test]
    fn view_hint_selects_scoped_writer() {
        let summary = ViewSelector::new("summary");
        let chunk = encoder(SerdeJsonMapper::new().register_view(summary.clone(), ["id"]))
            .encode(
                &json!({"id": 1, "secret": 2}),
                None,
                &TypeDescriptor::object("order"),
                None,
                &EncodeHints::new().with_view(summary),
                &HeapBufferFactory::default(),
            )
            .expect("视图编码");
        assert_eq!(chunk.as_bytes(), br#"{"id":1}"#);
    }

    #[test]
    fn unserializable_runtime_subtype_is_rejected() {
        let handle = TypeDescriptor::opaque("handle").with_supertype("shape");
        let err = encoder(SerdeJsonMapper::new())
            .encode(
                &json!({"fd": 3}),
                Some(handle),
                &TypeDescriptor::object("shape"),
                None,
                &EncodeHints::new(),
                &HeapBufferFactory::default(),
            )
            .expect_err("不可序列化的运行时类型应被拒绝");
        assert_eq!(err.code(), codes::UNSUPPORTED_TYPE);
        assert!(err.to_string().contains("handle"));

        let denied = encoder(SerdeJsonMapper::new().deny_type("socket"))
            .encode(
                &json!(1),
                None,
                &TypeDescriptor::object("socket"),
                None,
                &EncodeHints::new(),
                &HeapBufferFactory::default(),
            )
            .expect_err("拒绝名单中的类型应被拒绝");
        assert!(matches!(denied, EncodeError::UnsupportedType { .. }));
    }

    #[test]
    fn allocation_failure_is_reported() {
        let err = encoder(SerdeJsonMapper::new())
            .encode(
                &json!(1),
                None,
                &TypeDescriptor::any(),
                None,
                &EncodeHints::new(),
                &ExhaustedFactory,
            )
            .expect_err("分配失败应上抛");
        assert_eq!(err.code(), codes::ALLOCATION);
    }
}
