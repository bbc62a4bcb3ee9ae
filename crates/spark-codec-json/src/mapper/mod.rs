//! 序列化能力契约。
//!
//! 编码器本身不实现序列化算法（字段顺序、多态类型标签等），只通过本模块的两个 trait 与序列化器交互：
//!
//! - [`JsonMapper`]：回答“能否序列化某类型”，并按视图产出写出器；
//! - [`JsonWriter`]：可按根类型收窄、可替换美化打印策略，最终把值写入任意 `io::Write`。
//!
//! 默认实现 [`SerdeJsonMapper`] 基于 `serde_json`。

mod json;
mod printer;

pub use json::{SerdeJsonMapper, SerdeJsonWriter};
pub use printer::{LinePrefixFormatter, PrettyPrinter};

use std::io;

use serde::Serialize;

use crate::error::Result;
use crate::hints::ViewSelector;
use crate::types::TypeDescriptor;

/// 序列化器能力。
///
/// # 契约（What）
/// - 实例在配置完成后只读，会被多个并发编码调用共享，因此要求 `Send + Sync + 'static`；
/// - `writer` 每次返回独立的写出器，调用方对其做的收窄与替换不影响映射器本身。
pub trait JsonMapper: Send + Sync + 'static {
    /// 该映射器产出的写出器类型。
    type Writer: JsonWriter;

    /// 能否把 `ty` 描述的值序列化为 JSON。
    fn can_serialize(&self, ty: &TypeDescriptor) -> bool;

    /// 获取写出器；`view` 存在时返回视图作用域内的写出器。
    fn writer(&self, view: Option<&ViewSelector>) -> Self::Writer;
}

/// 单次写出的配置与执行入口。
pub trait JsonWriter: Sized {
    /// 以 `ty` 作为根类型，容器类型据此保留元素类型信息。
    fn for_type(self, ty: &TypeDescriptor) -> Self;

    /// 写出器配置中是否开启了缩进输出。
    fn indent_output(&self) -> bool;

    /// 替换美化打印策略。
    fn with_pretty_printer(self, printer: PrettyPrinter) -> Self;

    /// 把 `value` 写入 `sink`；任何写出失败都以序列化错误返回。
    fn write_value<W, T>(&self, sink: W, value: &T) -> Result<()>
    where
        W: io::Write,
        T: Serialize + ?Sized;
}
