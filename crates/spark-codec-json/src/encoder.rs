//! 编码器门面：把协商预检、模式选择与流式组装串成一次调用。
//!
//! # 使用概览
//! 1. 协商阶段以 [`JsonStreamEncoder::can_encode`] 预检；
//! 2. 以 [`JsonStreamEncoder::encode_hints`] 从注解与交换上下文提取提示；
//! 3. 调用 [`JsonStreamEncoder::encode`] 得到字节块流。

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::assembler::{InputSequence, StreamAssembler};
use crate::buffer::BufferFactory;
use crate::config::EncoderSettings;
use crate::error::Result;
use crate::hints::{AnnotatedType, EncodeHints, ExchangeContext};
use crate::mapper::{JsonMapper, SerdeJsonMapper};
use crate::media_type::{JSON_MIME_TYPES, MediaType};
use crate::mode::{self, StreamingMode};
use crate::registry::{StreamingModeRegistry, StreamingSnapshot};
use crate::types::{TypeDescriptor, Typed};
use crate::value::ValueEncoder;

/// 流式 JSON 编码器门面。
///
/// # 契约（What）
/// - 序列化能力与流式类型集合在并发编码之间只读共享；
/// - [`JsonStreamEncoder::encode`] 在调用时即完成模式选择，之后对集合的替换不影响已返回的流；
/// - 返回的流是惰性的：消费者不轮询，上游就不会被拉取。
///
/// # 逻辑（How）
/// `encode` 读取流式类型快照 → [`mode::select_mode`] → 构造 [`StreamAssembler`]，
/// 由组装器逐个调用 [`ValueEncoder`] 产出字节块。
pub struct JsonStreamEncoder<M = SerdeJsonMapper> {
    mapper: Arc<M>,
    streaming: StreamingModeRegistry,
}

impl JsonStreamEncoder<SerdeJsonMapper> {
    /// 默认序列化能力与默认流式类型集合。
    pub fn new() -> Self {
        Self::with_mapper(SerdeJsonMapper::new())
    }

    /// 按配置装配序列化能力与流式类型集合。
    pub fn from_settings(settings: &EncoderSettings) -> Self {
        let encoder = Self::with_mapper(settings.mapper());
        if let Some(media_types) = &settings.streaming_media_types {
            encoder.set_streaming_media_types(media_types.iter().cloned());
        }
        encoder
    }
}

impl Default for JsonStreamEncoder<SerdeJsonMapper> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for JsonStreamEncoder<M> {
    fn clone(&self) -> Self {
        Self {
            mapper: Arc::clone(&self.mapper),
            streaming: self.streaming.clone(),
        }
    }
}

impl<M: JsonMapper> JsonStreamEncoder<M> {
    /// 使用自定义序列化能力。
    pub fn with_mapper(mapper: M) -> Self {
        Self::with_shared_mapper(Arc::new(mapper))
    }

    /// 与其他组件共享同一个序列化能力实例。
    pub fn with_shared_mapper(mapper: Arc<M>) -> Self {
        Self {
            mapper,
            streaming: StreamingModeRegistry::new(),
        }
    }

    /// 序列化能力。
    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    /// 流式类型集合。
    pub fn registry(&self) -> &StreamingModeRegistry {
        &self.streaming
    }

    /// 可编码的输出格式：`application/json` 与 `application/*+json`。
    pub fn encodable_mime_types(&self) -> &'static [MediaType] {
        &JSON_MIME_TYPES
    }

    /// 编码前预检，见 [`mode::can_encode`]。
    pub fn can_encode(&self, element_type: &TypeDescriptor, media_type: Option<&MediaType>) -> bool {
        mode::can_encode(self.mapper.as_ref(), element_type, media_type)
    }

    /// 整体替换流式类型集合。
    pub fn set_streaming_media_types<I>(&self, media_types: I)
    where
        I: IntoIterator<Item = MediaType>,
    {
        self.streaming.set_streaming_media_types(media_types);
    }

    /// 配置入口，缺失的列表被拒绝。
    pub fn try_set_streaming_media_types(&self, media_types: Option<Vec<MediaType>>) -> Result<()> {
        self.streaming.try_set_streaming_media_types(media_types)?;
        Ok(())
    }

    /// 流式类型集合的当前快照。
    pub fn streaming_media_types(&self) -> StreamingSnapshot {
        self.streaming.streaming_media_types()
    }

    /// 由处理器声明的返回类型构造编码提示；视图注解写入 `JSON_VIEW_HINT`。
    pub fn encode_hints(
        &self,
        actual_type: &AnnotatedType,
        element_type: &TypeDescriptor,
        _media_type: Option<&MediaType>,
        exchange: &ExchangeContext,
    ) -> EncodeHints {
        let mut hints = EncodeHints::new();
        if let Some(view) = actual_type.view() {
            debug!(
                request_id = exchange.request_id(),
                element = %element_type,
                view = %view,
                "json view hint applied"
            );
            hints = hints.with_view(view.clone());
        }
        hints
    }

    /// 编码输入序列，返回惰性字节块流。
    ///
    /// # 契约（What）
    /// - 调用方应已通过 [`Self::can_encode`] 预检；此处不再复检；
    /// - 模式在此刻依据流式类型快照选定并固定。
    pub fn encode<T, F>(
        &self,
        input: InputSequence<T>,
        buffer_factory: F,
        element_type: TypeDescriptor,
        media_type: Option<MediaType>,
        hints: EncodeHints,
    ) -> StreamAssembler<T, M, F>
    where
        T: Serialize + Typed,
        F: BufferFactory,
    {
        let snapshot = self.streaming.streaming_media_types();
        let mode: StreamingMode = mode::select_mode(
            input.is_known_single_valued(),
            media_type.as_ref(),
            &snapshot,
        );
        debug!(
            mode = %mode,
            element = %element_type,
            media_type = media_type.as_ref().map(ToString::to_string).as_deref(),
            "json streaming mode selected"
        );
        StreamAssembler::new(
            input,
            mode,
            ValueEncoder::new(Arc::clone(&self.mapper)),
            buffer_factory,
            element_type,
            media_type,
            hints,
        )
    }
}

impl<M> fmt::Debug for JsonStreamEncoder<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonStreamEncoder")
            .field("streaming", &self.streaming)
            .finish_non_exhaustive()
    }
}
