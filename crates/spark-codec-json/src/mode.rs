//! 发射策略的选择。
//!
//! # 契约（What）
//! - [`can_encode`] 是编码前的预检，仅在上游协商阶段调用；组装器信任调用方，不再复检；
//! - [`select_mode`] 是纯函数：给定“是否静态已知单值”、目标媒体类型与流式类型快照，结果唯一确定。

use std::fmt;

use crate::mapper::JsonMapper;
use crate::media_type::{JSON_MIME_TYPES, MediaType};
use crate::types::TypeDescriptor;

/// 一次编码请求采用的发射策略。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamingMode {
    /// 输入静态已知至多一个值，输出恰好一个字节块。
    SingleValue,
    /// 每个元素一个字节块，内容为 `JSON(v)` 加一个换行。
    LineDelimited,
    /// 收集全部元素，上游完成后输出一个 JSON 数组字节块。
    ArrayCollected,
}

impl StreamingMode {
    /// 用于日志字段的稳定名称。
    pub fn as_str(self) -> &'static str {
        match self {
            StreamingMode::SingleValue => "single_value",
            StreamingMode::LineDelimited => "line_delimited",
            StreamingMode::ArrayCollected => "array_collected",
        }
    }
}

impl fmt::Display for StreamingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 预检 `element_type` 能否以 `media_type` 编码。
///
/// 序列化能力认可该类型，且媒体类型缺席或与任一可编码格式兼容时返回 `true`。
pub fn can_encode<M>(
    mapper: &M,
    element_type: &TypeDescriptor,
    media_type: Option<&MediaType>,
) -> bool
where
    M: JsonMapper + ?Sized,
{
    if !mapper.can_serialize(element_type) {
        return false;
    }
    match media_type {
        None => true,
        Some(media_type) => JSON_MIME_TYPES
            .iter()
            .any(|supported| supported.is_compatible_with(media_type)),
    }
}

/// 选择发射策略。
///
/// # 逻辑（How）
/// 1. 静态已知单值的输入总是 [`StreamingMode::SingleValue`]，不看媒体类型；
/// 2. 否则媒体类型与快照中任一条目兼容时为 [`StreamingMode::LineDelimited`]；
/// 3. 其余情况为 [`StreamingMode::ArrayCollected`]。缺席的媒体类型不与任何流式条目兼容。
pub fn select_mode(
    is_known_single_valued: bool,
    media_type: Option<&MediaType>,
    streaming_media_types: &[MediaType],
) -> StreamingMode {
    if is_known_single_valued {
        return StreamingMode::SingleValue;
    }
    let streaming = media_type.is_some_and(|media_type| {
        streaming_media_types
            .iter()
            .any(|candidate| media_type.is_compatible_with(candidate))
    });
    if streaming {
        StreamingMode::LineDelimited
    } else {
        StreamingMode::ArrayCollected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::SerdeJsonMapper;
    use crate::media_type::{
        APPLICATION_JSON, APPLICATION_NDJSON, APPLICATION_STREAM_JSON, TEXT_EVENT_STREAM,
    };

    #[test]
    fn single_valued_input_always_wins() {
        let streaming = [APPLICATION_STREAM_JSON];
        assert_eq!(
            select_mode(true, Some(&APPLICATION_STREAM_JSON), &streaming),
            StreamingMode::SingleValue
        );
        assert_eq!(select_mode(true, None, &[]), StreamingMode::SingleValue);
    }

    #[test]
    fn streaming_membership_picks_line_delimited() {
        let streaming = [APPLICATION_STREAM_JSON, APPLICATION_NDJSON];
        let with_charset = MediaType::parse("application/x-ndjson; charset=utf-8").expect("合法类型");
        assert_eq!(
            select_mode(false, Some(&with_charset), &streaming),
            StreamingMode::LineDelimited
        );
        assert_eq!(
            select_mode(false, Some(&APPLICATION_JSON), &streaming),
            StreamingMode::ArrayCollected
        );
    }

    #[test]
    fn absent_media_type_never_streams() {
        let streaming = [MediaType::parse("*/*").expect("合法类型")];
        assert_eq!(select_mode(false, None, &streaming), StreamingMode::ArrayCollected);
    }

    #[test]
    fn can_encode_checks_type_then_format() {
        let mapper = SerdeJsonMapper::new();
        let order = TypeDescriptor::object("order");
        assert!(can_encode(&mapper, &order, None));
        assert!(can_encode(&mapper, &order, Some(&APPLICATION_JSON)));
        assert!(can_encode(&mapper, &order, Some(&APPLICATION_STREAM_JSON)));
        assert!(!can_encode(&mapper, &order, Some(&TEXT_EVENT_STREAM)));
        assert!(!can_encode(&mapper, &TypeDescriptor::opaque("fd"), None));
    }

    #[test]
    fn mode_names_are_stable() {
        assert_eq!(StreamingMode::LineDelimited.to_string(), "line_delimited");
    }
}
