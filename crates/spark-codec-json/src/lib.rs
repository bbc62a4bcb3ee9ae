#![deny(unsafe_code)]
#![warn(missing_docs)]

//! `spark-codec-json` 把惰性产生的值序列编码为惰性产生的 JSON 字节块序列。
//!
//! # 使用概览（How）
//! - 构造 [`JsonStreamEncoder`]（或由 [`EncoderSettings`] 装配），先以 [`JsonStreamEncoder::can_encode`] 预检；
//! - 以 [`InputSequence`] 包装输入：`Single` 表示静态已知单值，`Many` 表示任意数量元素；
//! - [`JsonStreamEncoder::encode`] 返回 [`StreamAssembler`]，它实现 `futures::Stream`，按需拉取上游。
//!
//! # 合约说明（What）
//! - 三种发射策略（[`StreamingMode`]）：
//!   - 单值：恰好一个字节块 `JSON(v)`；
//!   - 换行分隔：每个元素一个字节块 `JSON(v) + "\n"`，逐个交付；
//!   - 数组收集：上游结束后交付一个 `JSON([v0, v1, ...])`。
//! - 触发换行分隔模式的媒体类型集合由 [`StreamingModeRegistry`] 维护，默认仅含 `application/stream+json`；
//! - 目标格式为 `text/event-stream` 且写出器开启缩进时，对象每个内部换行后追加 `data:` 续行前缀；
//! - 错误通过 [`EncodeError`] 表达，并携带 `codec.json.*` 稳定错误码。
//!
//! # 边界
//! 本 crate 只决定何时、以何种形状把值交给序列化器，不负责解码、模式校验或内容协商。

pub mod assembler;
pub mod buffer;
pub mod config;
pub mod encoder;
pub mod error;
pub mod hints;
pub mod mapper;
pub mod media_type;
pub mod mode;
pub mod registry;
pub mod types;
pub mod value;

pub use crate::assembler::{AssemblyPhase, InputSequence, StreamAssembler};
pub use crate::buffer::{BufferFactory, ByteChunk, DEFAULT_BUFFER_CAPACITY, HeapBufferFactory};
pub use crate::config::EncoderSettings;
pub use crate::encoder::JsonStreamEncoder;
pub use crate::error::{EncodeError, Result, codes};
pub use crate::hints::{AnnotatedType, EncodeHints, ExchangeContext, JSON_VIEW_HINT, ViewSelector};
pub use crate::mapper::{JsonMapper, JsonWriter, PrettyPrinter, SerdeJsonMapper, SerdeJsonWriter};
pub use crate::media_type::{
    APPLICATION_JSON, APPLICATION_NDJSON, APPLICATION_STREAM_JSON, APPLICATION_WILDCARD_JSON,
    JSON_MIME_TYPES, MediaType, TEXT_EVENT_STREAM,
};
pub use crate::mode::{StreamingMode, can_encode, select_mode};
pub use crate::registry::{StreamingModeRegistry, StreamingSnapshot};
pub use crate::types::{TypeDescriptor, TypeKind, Typed};
pub use crate::value::ValueEncoder;
