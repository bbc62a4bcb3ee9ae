//! 媒体类型值与编码器内置的常量。

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{EncodeError, Result};

/// `application/json`。
pub const APPLICATION_JSON: MediaType = MediaType::from_static("application", "json");
/// `application/*+json`，匹配任意 `+json` 结构化后缀类型。
pub const APPLICATION_WILDCARD_JSON: MediaType = MediaType::from_static("application", "*+json");
/// `application/stream+json`，默认唯一的换行分隔流式类型。
pub const APPLICATION_STREAM_JSON: MediaType =
    MediaType::from_static("application", "stream+json");
/// `application/x-ndjson`。
pub const APPLICATION_NDJSON: MediaType = MediaType::from_static("application", "x-ndjson");
/// `text/event-stream`，逐行加 `data:` 前缀的事件流格式。
pub const TEXT_EVENT_STREAM: MediaType = MediaType::from_static("text", "event-stream");

/// 编码器支持输出的固定格式列表。
pub static JSON_MIME_TYPES: [MediaType; 2] = [APPLICATION_JSON, APPLICATION_WILDCARD_JSON];

const WILDCARD: &str = "*";

/// `MediaType` 以 `type/subtype;key=value` 形式描述输出格式。
///
/// # 契约（What）
/// - 主类型与子类型在解析时统一转为小写，参数名同样小写，参数值保持原样；
/// - 兼容性判断（[`MediaType::is_compatible_with`]）忽略参数，支持 `*` 通配与 `*+suffix` 后缀通配；
/// - 常量通过 [`MediaType::from_static`] 构造，不做语法校验，调用方需保证字面量合法。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct MediaType {
    type_: Cow<'static, str>,
    subtype: Cow<'static, str>,
    parameters: Vec<(String, String)>,
}

impl MediaType {
    /// 以静态字面量构造，不带参数。
    pub const fn from_static(type_: &'static str, subtype: &'static str) -> Self {
        Self {
            type_: Cow::Borrowed(type_),
            subtype: Cow::Borrowed(subtype),
            parameters: Vec::new(),
        }
    }

    /// 解析媒体类型文本。
    ///
    /// # 逻辑（How）
    /// 1. 以 `;` 拆分，首段为 `type/subtype`，其余为参数；
    /// 2. 主类型、子类型必须非空且只含 token 字符，`*` 主类型只能搭配 `*` 子类型；
    /// 3. 参数形如 `key=value`，值两侧的双引号会被去除。
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = |reason: &'static str| EncodeError::InvalidMediaType {
            value: value.to_owned(),
            reason,
        };

        let mut segments = value.split(';');
        let full_type = segments.next().map(str::trim).unwrap_or_default();
        if full_type.is_empty() {
            return Err(invalid("media type must not be empty"));
        }

        let full_type = if full_type == WILDCARD {
            "*/*"
        } else {
            full_type
        };
        let (type_, subtype) = full_type
            .split_once('/')
            .ok_or_else(|| invalid("does not contain '/'"))?;
        if type_.is_empty() {
            return Err(invalid("missing type"));
        }
        if subtype.is_empty() {
            return Err(invalid("missing subtype"));
        }
        if !is_token(type_) || !is_token(subtype) {
            return Err(invalid("contains characters outside the token set"));
        }
        if type_ == WILDCARD && subtype != WILDCARD {
            return Err(invalid("wildcard type is legal only in '*/*'"));
        }

        let mut parameters = Vec::new();
        for raw in segments {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let (key, val) = raw
                .split_once('=')
                .ok_or_else(|| invalid("parameter must be of the form key=value"))?;
            let key = key.trim();
            if key.is_empty() || !is_token(key) {
                return Err(invalid("parameter name is not a token"));
            }
            let val = val.trim();
            let val = val
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(val);
            parameters.push((key.to_ascii_lowercase(), val.to_owned()));
        }

        Ok(Self {
            type_: Cow::Owned(type_.to_ascii_lowercase()),
            subtype: Cow::Owned(subtype.to_ascii_lowercase()),
            parameters,
        })
    }

    /// 追加参数，返回新的实例。
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters
            .push((key.into().to_ascii_lowercase(), value.into()));
        self
    }

    /// 主类型。
    pub fn type_(&self) -> &str {
        &self.type_
    }

    /// 子类型。
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// 按名称查询参数值，名称大小写不敏感。
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// 全部参数。
    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    /// 主类型是否为 `*`。
    pub fn is_wildcard_type(&self) -> bool {
        self.type_ == WILDCARD
    }

    /// 子类型是否为 `*` 或 `*+suffix`。
    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == WILDCARD || self.subtype.starts_with("*+")
    }

    /// 结构化语法后缀，例如 `stream+json` 的 `json`。
    pub fn subtype_suffix(&self) -> Option<&str> {
        self.subtype
            .rsplit_once('+')
            .map(|(_, suffix)| suffix)
            .filter(|suffix| !suffix.is_empty())
    }

    /// 判断两个媒体类型是否兼容，关系对称。
    ///
    /// # 契约（What）
    /// - 任一方主类型为 `*` 即兼容；
    /// - 主类型相同且子类型相同即兼容；
    /// - 任一方子类型为 `*` 即兼容；`*+json` 与 `json`、`stream+json`、`*+json` 均兼容；
    /// - 参数不参与判断。
    pub fn is_compatible_with(&self, other: &MediaType) -> bool {
        if self.is_wildcard_type() || other.is_wildcard_type() {
            return true;
        }
        if self.type_ != other.type_ {
            return false;
        }
        if self.subtype == other.subtype {
            return true;
        }
        if !self.is_wildcard_subtype() && !other.is_wildcard_subtype() {
            return false;
        }
        if self.subtype == WILDCARD || other.subtype == WILDCARD {
            return true;
        }

        let this_suffix = self.subtype_suffix();
        let other_suffix = other.subtype_suffix();
        if self.is_wildcard_subtype()
            && let Some(suffix) = this_suffix
        {
            return suffix == other.subtype() || Some(suffix) == other_suffix;
        }
        if other.is_wildcard_subtype()
            && let Some(suffix) = other_suffix
        {
            return suffix == self.subtype() || Some(suffix) == this_suffix;
        }
        false
    }
}

fn is_token(value: &str) -> bool {
    value.bytes().all(|b| {
        b.is_ascii_alphanumeric()
            || matches!(
                b,
                b'!' | b'#'
                    | b'$'
                    | b'%'
                    | b'&'
                    | b'\''
                    | b'*'
                    | b'+'
                    | b'-'
                    | b'.'
                    | b'^'
                    | b'_'
                    | b'`'
                    | b'|'
                    | b'~'
            )
    })
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (key, value) in &self.parameters {
            write!(f, ";{key}={value}")?;
        }
        Ok(())
    }
}

impl FromStr for MediaType {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self> {
        MediaType::parse(s)
    }
}

impl TryFrom<String> for MediaType {
    type Error = EncodeError;

    fn try_from(value: String) -> Result<Self> {
        MediaType::parse(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mt(value: &str) -> MediaType {
        MediaType::parse(value).expect("媒体类型应可解析")
    }

    #[test]
    fn parse_lowercases_and_keeps_parameters() {
        let parsed = mt("Application/JSON; Charset=\"UTF-8\"");
        assert_eq!(parsed.type_(), "application");
        assert_eq!(parsed.subtype(), "json");
        assert_eq!(parsed.parameter("charset"), Some("UTF-8"));
        assert_eq!(parsed.to_string(), "application/json;charset=UTF-8");
    }

    #[test]
    fn parse_rejects_malformed_text() {
        for raw in ["", "json", "/json", "application/", "*/json", "text/plain; charset"] {
            let err = MediaType::parse(raw).expect_err("应拒绝非法媒体类型");
            assert_eq!(err.code(), crate::error::codes::MEDIA_TYPE, "input: {raw:?}");
        }
    }

    #[test]
    fn single_star_expands_to_full_wildcard() {
        let any = mt("*");
        assert!(any.is_wildcard_type());
        assert!(any.is_compatible_with(&TEXT_EVENT_STREAM));
    }

    #[test]
    fn parsed_equals_constant_without_parameters() {
        assert_eq!(mt("application/stream+json"), APPLICATION_STREAM_JSON);
        assert_ne!(mt("application/stream+json;q=1"), APPLICATION_STREAM_JSON);
    }

    #[test]
    fn suffix_wildcard_matches_structured_subtypes() {
        assert!(APPLICATION_WILDCARD_JSON.is_compatible_with(&APPLICATION_JSON));
        assert!(APPLICATION_WILDCARD_JSON.is_compatible_with(&APPLICATION_STREAM_JSON));
        assert!(APPLICATION_STREAM_JSON.is_compatible_with(&APPLICATION_WILDCARD_JSON));
        assert!(!APPLICATION_WILDCARD_JSON.is_compatible_with(&mt("application/xml")));
        assert!(!APPLICATION_WILDCARD_JSON.is_compatible_with(&TEXT_EVENT_STREAM));
    }

    #[test]
    fn parameters_do_not_affect_compatibility() {
        let with_charset = mt("application/stream+json;charset=utf-8");
        assert!(with_charset.is_compatible_with(&APPLICATION_STREAM_JSON));
    }

    #[test]
    fn concrete_types_must_match_exactly() {
        assert!(!APPLICATION_JSON.is_compatible_with(&APPLICATION_STREAM_JSON));
        assert!(!APPLICATION_JSON.is_compatible_with(&TEXT_EVENT_STREAM));
        assert!(mt("text/*").is_compatible_with(&TEXT_EVENT_STREAM));
    }

    #[test]
    fn deserializes_from_string() {
        let parsed: MediaType =
            serde_json::from_str("\"application/x-ndjson\"").expect("应能从字符串反序列化");
        assert_eq!(parsed, APPLICATION_NDJSON);
    }
}
