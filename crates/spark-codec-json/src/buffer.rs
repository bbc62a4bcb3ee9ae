//! 字节块与缓冲工厂契约。
//!
//! # 契约（What）
//! - [`ByteChunk`] 是编码结果的最小交付单元，内部持有 `bytes::BytesMut`；
//!   一旦随输出流交付，所有权即转移给消费者，生产方不保留任何句柄；
//! - [`BufferFactory`] 是编码器唯一依赖的分配能力，池化、配额等策略由实现方决定，
//!   分配失败以 [`EncodeError::Allocation`](crate::EncodeError::Allocation) 报告。

use std::fmt;
use std::sync::Arc;

use bytes::buf::Writer;
use bytes::{BufMut, Bytes, BytesMut};

use crate::error::Result;

/// [`HeapBufferFactory`] 默认的初始容量。
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

/// 可追加写入的字节块。
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ByteChunk {
    inner: BytesMut,
}

impl ByteChunk {
    /// 预留 `capacity` 字节的空块。
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: BytesMut::with_capacity(capacity),
        }
    }

    /// 以 `std::io::Write` 形式暴露写入端，写入内容追加在末尾。
    pub fn as_sink(&mut self) -> Writer<&mut BytesMut> {
        (&mut self.inner).writer()
    }

    /// 在末尾追加字节。
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.inner.extend_from_slice(bytes);
    }

    /// 已写入的字节数。
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// 是否尚未写入任何字节。
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// 已写入内容的只读视图。
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// 冻结为不可变的 `Bytes`，可零拷贝地交给传输层。
    pub fn freeze(self) -> Bytes {
        self.inner.freeze()
    }

    /// 取回底层 `BytesMut`。
    pub fn into_inner(self) -> BytesMut {
        self.inner
    }
}

impl AsRef<[u8]> for ByteChunk {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

impl From<BytesMut> for ByteChunk {
    fn from(inner: BytesMut) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for ByteChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteChunk")
            .field("len", &self.inner.len())
            .field("content", &String::from_utf8_lossy(&self.inner))
            .finish()
    }
}

/// 字节块分配能力。
///
/// 实现需满足 `Send + Sync`：同一个工厂可能被多个并发编码调用共享。
pub trait BufferFactory: Send + Sync {
    /// 分配一个空字节块。
    fn allocate_buffer(&self) -> Result<ByteChunk>;
}

impl<F: BufferFactory + ?Sized> BufferFactory for Arc<F> {
    fn allocate_buffer(&self) -> Result<ByteChunk> {
        (**self).allocate_buffer()
    }
}

impl<F: BufferFactory + ?Sized> BufferFactory for &F {
    fn allocate_buffer(&self) -> Result<ByteChunk> {
        (**self).allocate_buffer()
    }
}

/// 直接在堆上分配 `BytesMut` 的缓冲工厂，不做池化。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapBufferFactory {
    initial_capacity: usize,
}

impl HeapBufferFactory {
    /// 使用默认初始容量。
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    /// 指定每个字节块的初始容量；写入超过容量时自动扩容。
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self { initial_capacity }
    }

    /// 每个字节块的初始容量。
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }
}

impl Default for HeapBufferFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferFactory for HeapBufferFactory {
    fn allocate_buffer(&self) -> Result<ByteChunk> {
        Ok(ByteChunk::with_capacity(self.initial_capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sink_and_append_share_the_same_tail() {
        let mut chunk = HeapBufferFactory::with_capacity(4)
            .allocate_buffer()
            .expect("堆分配不应失败");
        chunk
            .as_sink()
            .write_all(b"{\"a\":1}")
            .expect("写入测试数据");
        chunk.append_bytes(b"\n");
        assert_eq!(chunk.as_bytes(), b"{\"a\":1}\n");
        assert_eq!(chunk.len(), 8);
    }

    #[test]
    fn freeze_hands_over_written_bytes() {
        let mut chunk = ByteChunk::default();
        assert!(chunk.is_empty());
        chunk.append_bytes(b"[]");
        let frozen = chunk.freeze();
        assert_eq!(&frozen[..], b"[]");
    }

    #[test]
    fn shared_factory_allocates_independent_chunks() {
        let factory: Arc<dyn BufferFactory> = Arc::new(HeapBufferFactory::default());
        let mut first = factory.allocate_buffer().expect("分配第一个字节块");
        let second = factory.allocate_buffer().expect("分配第二个字节块");
        first.append_bytes(b"x");
        assert!(second.is_empty());
        assert_eq!(HeapBufferFactory::default().initial_capacity(), DEFAULT_BUFFER_CAPACITY);
    }
}
