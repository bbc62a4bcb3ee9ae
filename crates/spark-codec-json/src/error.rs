//! # error 模块说明
//!
//! ## 角色定位
//! - 集中定义编码过程中可能出现的全部错误语义，并为每个变体分配稳定错误码；
//! - 错误码遵循 `<领域>.<语义>` 约定，便于日志与指标按码聚合。
//!
//! ## 传播约定
//! - 核心流程内部不做任何恢复或重试：一旦在发射阶段出现错误，输出序列以该错误终止；
//! - 已经交付给消费者的字节块保持有效，不会被撤回。

use std::borrow::Cow;
use std::error::Error as StdError;

use thiserror::Error;

/// 统一的结果别名，错误类型默认为 [`EncodeError`]。
pub type Result<T, E = EncodeError> = core::result::Result<T, E>;

/// 稳定错误码命名空间。
pub mod codes {
    /// 序列化能力无法处理请求的类型。
    pub const UNSUPPORTED_TYPE: &str = "codec.json.unsupported_type";
    /// 序列化器在写出值时失败。
    pub const SERIALIZATION: &str = "codec.json.serialization";
    /// 缓冲工厂无法分配字节块。
    pub const ALLOCATION: &str = "codec.json.allocation";
    /// 配置输入缺失或非法。
    pub const CONFIGURATION: &str = "codec.json.configuration";
    /// 媒体类型文本无法解析。
    pub const MEDIA_TYPE: &str = "codec.json.media_type";
}

/// 编码器错误域。
///
/// # 契约（What）
/// - 所有变体均满足 `Send + Sync + 'static`，可随输出流跨线程传播；
/// - [`EncodeError::code`] 返回的错误码在版本间保持稳定；
/// - 底层原因通过 [`std::error::Error::source`] 暴露，调用方可逐级追溯。
#[derive(Debug, Error)]
pub enum EncodeError {
    /// 解析出的类型不被序列化能力认可，在分配字节块前报告。正常情况下应由 `can_encode` 在上游排除。
    #[error("type `{type_name}` is not serializable as JSON")]
    UnsupportedType {
        /// 被拒绝类型的显示名。
        type_name: String,
    },

    /// 序列化器写出时失败，`source` 保存底层原因。
    #[error("error while writing the data: {context}")]
    Serialization {
        /// 出错时正在写出的目标描述。
        context: Cow<'static, str>,
        /// 底层原因；视图未注册等内部判定没有原因。
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// 缓冲工厂无法分配字节块。
    #[error("buffer allocation failed: {detail}")]
    Allocation {
        /// 缓冲工厂给出的失败说明。
        detail: Cow<'static, str>,
    },

    /// 配置缺失或非法，在任何编码开始前同步拒绝。
    #[error("invalid encoder configuration: {detail}")]
    Configuration {
        /// 被拒绝的配置项及原因。
        detail: Cow<'static, str>,
        /// TOML 解析错误；取值校验失败时为空。
        #[source]
        source: Option<toml::de::Error>,
    },

    /// 媒体类型文本不满足 `type/subtype` 语法。
    #[error("invalid media type `{value}`: {reason}")]
    InvalidMediaType {
        /// 原始文本。
        value: String,
        /// 语法错误说明。
        reason: &'static str,
    },
}

impl EncodeError {
    /// 包装序列化器返回的底层错误。
    pub fn serialization<E>(context: impl Into<Cow<'static, str>>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        EncodeError::Serialization {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// 构造不携带底层原因的序列化错误，例如视图未注册。
    pub fn serialization_message(context: impl Into<Cow<'static, str>>) -> Self {
        EncodeError::Serialization {
            context: context.into(),
            source: None,
        }
    }

    /// 构造分配失败错误。
    pub fn allocation(detail: impl Into<Cow<'static, str>>) -> Self {
        EncodeError::Allocation {
            detail: detail.into(),
        }
    }

    /// 构造配置错误。
    pub fn configuration(detail: impl Into<Cow<'static, str>>) -> Self {
        EncodeError::Configuration {
            detail: detail.into(),
            source: None,
        }
    }

    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            EncodeError::UnsupportedType { .. } => codes::UNSUPPORTED_TYPE,
            EncodeError::Serialization { .. } => codes::SERIALIZATION,
            EncodeError::Allocation { .. } => codes::ALLOCATION,
            EncodeError::Configuration { .. } => codes::CONFIGURATION,
            EncodeError::InvalidMediaType { .. } => codes::MEDIA_TYPE,
        }
    }
}

impl From<toml::de::Error> for EncodeError {
    fn from(value: toml::de::Error) -> Self {
        EncodeError::Configuration {
            detail: Cow::Borrowed("settings are not valid TOML for the JSON encoder"),
            source: Some(value),
        }
    }
}
