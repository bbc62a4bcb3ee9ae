//! 流式媒体类型注册表。
//!
//! 持有触发换行分隔模式的媒体类型集合，读路径无锁且每次读取得到稳定快照。
//!
//! ```
//! use spark_codec_json::{APPLICATION_NDJSON, APPLICATION_STREAM_JSON, StreamingModeRegistry};
//!
//! let registry = StreamingModeRegistry::new();
//! let before = registry.streaming_media_types();
//! registry.set_streaming_media_types([APPLICATION_NDJSON]);
//! assert_eq!(before.as_slice(), &[APPLICATION_STREAM_JSON]);
//! assert_eq!(registry.streaming_media_types().as_slice(), &[APPLICATION_NDJSON]);
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::error::{EncodeError, Result};
use crate::media_type::{APPLICATION_STREAM_JSON, MediaType};

/// 触发换行分隔流式输出的媒体类型集合。
///
/// # 契约（What）
/// - 集合只能整体替换，不支持增量增删；替换对之后的读取立即可见；
/// - 读取得到不可变快照 [`StreamingSnapshot`]，后续替换不会影响已交出的快照，
///   因此一次编码在模式选择时取到的集合在整个请求期间保持稳定；
/// - 克隆得到的实例共享同一存储。
///
/// # 实现（How）
/// - 内部为 `ArcSwap<Vec<MediaType>>`：读路径无锁，写路径构造新列表后原子发布。
#[derive(Clone)]
pub struct StreamingModeRegistry {
    published: Arc<ArcSwap<Vec<MediaType>>>,
}

impl StreamingModeRegistry {
    /// 以默认集合（仅 `application/stream+json`）初始化。
    pub fn new() -> Self {
        Self::with_media_types(vec![APPLICATION_STREAM_JSON])
    }

    /// 以给定集合初始化，顺序与重复项按原样保留。
    pub fn with_media_types(media_types: Vec<MediaType>) -> Self {
        Self {
            published: Arc::new(ArcSwap::from_pointee(media_types)),
        }
    }

    /// 整体替换流式媒体类型集合，返回被替换的旧快照。
    pub fn set_streaming_media_types<I>(&self, media_types: I) -> StreamingSnapshot
    where
        I: IntoIterator<Item = MediaType>,
    {
        let next: Vec<MediaType> = media_types.into_iter().collect();
        debug!(
            media_types = ?next.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "streaming media types replaced"
        );
        StreamingSnapshot(self.published.swap(Arc::new(next)))
    }

    /// 配置入口：缺失的列表在任何编码开始前以配置错误拒绝，现有集合保持不变。
    pub fn try_set_streaming_media_types(
        &self,
        media_types: Option<Vec<MediaType>>,
    ) -> Result<StreamingSnapshot> {
        let media_types = media_types
            .ok_or_else(|| EncodeError::configuration("streaming media types must not be absent"))?;
        Ok(self.set_streaming_media_types(media_types))
    }

    /// 当前集合的不可变快照。
    pub fn streaming_media_types(&self) -> StreamingSnapshot {
        StreamingSnapshot(self.published.load_full())
    }
}

impl Default for StreamingModeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StreamingModeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingModeRegistry")
            .field("media_types", &self.streaming_media_types())
            .finish()
    }
}

/// 流式媒体类型集合的只读快照。
#[derive(Clone, PartialEq, Eq)]
pub struct StreamingSnapshot(Arc<Vec<MediaType>>);

impl StreamingSnapshot {
    /// 以切片形式访问。
    pub fn as_slice(&self) -> &[MediaType] {
        &self.0
    }
}

impl Deref for StreamingSnapshot {
    type Target = [MediaType];

    fn deref(&self) -> &[MediaType] {
        &self.0
    }
}

impl fmt::Debug for StreamingSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(ToString::to_string))
            .finish()
    }
}
