//! 按选定策略驱动输入序列、产出字节块流。
//!
//! # 契约（What）
//! - [`StreamAssembler`] 实现 `Stream<Item = Result<ByteChunk>>`，惰性拉取上游：
//!   只有消费者轮询时才推进输入序列；
//! - 输出顺序与输入到达顺序一致；换行分隔模式下第 N 个字节块可在第 N+1 个元素到达前交付；
//! - 任何失败都产出恰好一个终止错误，随后流结束，不回退到其他模式；
//! - 丢弃输出流即丢弃上游与尚未编码的收集缓冲，不会再拉取，也不会补发字节块。
//!
//! # 状态机
//! `ModeSelected → {Emitting* → Completed} | Failed`，由 [`StreamAssembler::phase`] 观察。

use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{self, BoxStream, FusedStream, Stream, StreamExt};
use serde::Serialize;
use tracing::{trace, warn};

use crate::buffer::{BufferFactory, ByteChunk};
use crate::error::Result;
use crate::hints::EncodeHints;
use crate::mapper::JsonMapper;
use crate::media_type::MediaType;
use crate::mode::StreamingMode;
use crate::types::{TypeDescriptor, Typed};
use crate::value::ValueEncoder;

/// 待编码的输入序列。
///
/// 单值与多值在类型层面区分：`Single` 即“静态已知恰好一个值”，模式选择据此直接走单值路径。
pub enum InputSequence<T> {
    /// 恰好产出一个值的异步计算。
    Single(BoxFuture<'static, T>),
    /// 任意数量元素的异步序列。
    Many(BoxStream<'static, T>),
}

impl<T: Send + 'static> InputSequence<T> {
    /// 包装单值 future。
    pub fn single<Fut>(value: Fut) -> Self
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        InputSequence::Single(value.boxed())
    }

    /// 包装元素流。
    pub fn many<S>(elements: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        InputSequence::Many(elements.boxed())
    }

    /// 已就绪的单值。
    pub fn from_value(value: T) -> Self {
        Self::single(future::ready(value))
    }

    /// 已就绪的多值序列，不会被视为单值，即使只含一个元素。
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::many(stream::iter(values))
    }
}

impl<T> InputSequence<T> {
    /// 是否静态已知为单值。
    pub fn is_known_single_valued(&self) -> bool {
        matches!(self, InputSequence::Single(_))
    }
}

impl<T> fmt::Debug for InputSequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSequence::Single(_) => f.write_str("InputSequence::Single"),
            InputSequence::Many(_) => f.write_str("InputSequence::Many"),
        }
    }
}

/// 组装器在状态机中的位置。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssemblyPhase {
    /// 模式已选定，尚未交付任何字节块。
    ModeSelected(StreamingMode),
    /// 已交付至少一个字节块，仍可能继续交付。
    Emitting,
    /// 正常结束。
    Completed,
    /// 以错误结束。
    Failed,
}

enum AssemblyState<T> {
    Single(BoxFuture<'static, T>),
    Lines(BoxStream<'static, T>),
    Collecting {
        upstream: BoxStream<'static, T>,
        buffered: Vec<T>,
    },
    Completed,
    Failed,
}

// 与状态分离，便于在持有状态借用时调用编码。
struct EncodingPlan<M, F> {
    encoder: ValueEncoder<M>,
    buffer_factory: F,
    element_type: TypeDescriptor,
    list_type: TypeDescriptor,
    media_type: Option<MediaType>,
    hints: EncodeHints,
}

impl<M: JsonMapper, F: BufferFactory> EncodingPlan<M, F> {
    fn encode_element<T>(&self, value: &T) -> Result<ByteChunk>
    where
        T: Serialize + Typed,
    {
        self.encoder.encode(
            value,
            value.runtime_type(),
            &self.element_type,
            self.media_type.as_ref(),
            &self.hints,
            &self.buffer_factory,
        )
    }

    fn encode_line<T>(&self, value: &T) -> Result<ByteChunk>
    where
        T: Serialize + Typed,
    {
        let mut chunk = self.encode_element(value)?;
        chunk.append_bytes(b"\n");
        Ok(chunk)
    }

    fn encode_list<T: Serialize>(&self, values: &[T]) -> Result<ByteChunk> {
        self.encoder.encode(
            values,
            None,
            &self.list_type,
            self.media_type.as_ref(),
            &self.hints,
            &self.buffer_factory,
        )
    }
}

/// 输出字节块流。
///
/// 由 [`JsonStreamEncoder::encode`](crate::JsonStreamEncoder::encode) 构造。
pub struct StreamAssembler<T, M, F> {
    mode: StreamingMode,
    state: AssemblyState<T>,
    plan: EncodingPlan<M, F>,
    emitted: usize,
}

// 所有字段都不会被结构化固定：上游已装箱，收集缓冲是 `Vec`。
impl<T, M, F> Unpin for StreamAssembler<T, M, F> {}

impl<T, M, F> StreamAssembler<T, M, F>
where
    M: JsonMapper,
    F: BufferFactory,
{
    pub(crate) fn new(
        input: InputSequence<T>,
        mode: StreamingMode,
        encoder: ValueEncoder<M>,
        buffer_factory: F,
        element_type: TypeDescriptor,
        media_type: Option<MediaType>,
        hints: EncodeHints,
    ) -> Self {
        let state = match (mode, input) {
            (_, InputSequence::Single(value)) => AssemblyState::Single(value),
            (StreamingMode::LineDelimited, InputSequence::Many(upstream)) => {
                AssemblyState::Lines(upstream)
            }
            (_, InputSequence::Many(upstream)) => AssemblyState::Collecting {
                upstream,
                buffered: Vec::new(),
            },
        };
        Self {
            mode,
            state,
            plan: EncodingPlan {
                encoder,
                buffer_factory,
                list_type: TypeDescriptor::list_of(element_type.clone()),
                element_type,
                media_type,
                hints,
            },
            emitted: 0,
        }
    }
}

impl<T, M, F> StreamAssembler<T, M, F> {
    /// 本次编码选定的模式。
    pub fn mode(&self) -> StreamingMode {
        self.mode
    }

    /// 已交付的字节块数量。
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// 当前所处阶段。
    pub fn phase(&self) -> AssemblyPhase {
        match self.state {
            AssemblyState::Completed => AssemblyPhase::Completed,
            AssemblyState::Failed => AssemblyPhase::Failed,
            _ if self.emitted > 0 => AssemblyPhase::Emitting,
            _ => AssemblyPhase::ModeSelected(self.mode),
        }
    }
}

impl<T, M, F> Stream for StreamAssembler<T, M, F>
where
    T: Serialize + Typed,
    M: JsonMapper,
    F: BufferFactory,
{
    type Item = Result<ByteChunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let outcome = match &mut this.state {
            AssemblyState::Completed | AssemblyState::Failed => return Poll::Ready(None),
            AssemblyState::Single(pending) => {
                let value = ready!(pending.as_mut().poll(cx));
                this.state = AssemblyState::Completed;
                this.plan.encode_element(&value)
            }
            AssemblyState::Lines(upstream) => match ready!(upstream.poll_next_unpin(cx)) {
                Some(value) => this.plan.encode_line(&value),
                None => {
                    this.state = AssemblyState::Completed;
                    return Poll::Ready(None);
                }
            },
            AssemblyState::Collecting { upstream, buffered } => loop {
                match ready!(upstream.poll_next_unpin(cx)) {
                    Some(value) => buffered.push(value),
                    None => {
                        let values = mem::take(buffered);
                        this.state = AssemblyState::Completed;
                        break this.plan.encode_list(&values);
                    }
                }
            },
        };

        match outcome {
            Ok(chunk) => {
                this.emitted += 1;
                trace!(
                    mode = %this.mode,
                    index = this.emitted - 1,
                    bytes = chunk.len(),
                    "json chunk emitted"
                );
                Poll::Ready(Some(Ok(chunk)))
            }
            Err(error) => {
                this.state = AssemblyState::Failed;
                warn!(
                    mode = %this.mode,
                    code = error.code(),
                    emitted = this.emitted,
                    error = %error,
                    "json encoding aborted"
                );
                Poll::Ready(Some(Err(error)))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.state {
            AssemblyState::Single(_) => (1, Some(1)),
            AssemblyState::Lines(_) => (0, None),
            AssemblyState::Collecting { .. } => (1, Some(1)),
            AssemblyState::Completed | AssemblyState::Failed => (0, Some(0)),
        }
    }
}

impl<T, M, F> FusedStream for StreamAssembler<T, M, F>
where
    T: Serialize + Typed,
    M: JsonMapper,
    F: BufferFactory,
{
    fn is_terminated(&self) -> bool {
        matches!(
            self.state,
            AssemblyState::Completed | AssemblyState::Failed
        )
    }
}

impl<T, M, F> fmt::Debug for StreamAssembler<T, M, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamAssembler")
            .field("mode", &self.mode)
            .field("phase", &self.phase())
            .field("emitted", &self.emitted)
            .finish_non_exhaustive()
    }
}
