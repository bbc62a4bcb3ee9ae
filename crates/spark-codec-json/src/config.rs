//! 编码器配置。
//!
//! 配置以 TOML 表达，所有字段均可省略：
//!
//! ```toml
//! indent_output = true
//! streaming_media_types = ["application/x-ndjson", "application/stream+json"]
//! initial_buffer_capacity = 1024
//!
//! [views]
//! summary = ["id", "name"]
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::buffer::{DEFAULT_BUFFER_CAPACITY, HeapBufferFactory};
use crate::error::{EncodeError, Result};
use crate::hints::ViewSelector;
use crate::mapper::SerdeJsonMapper;
use crate::media_type::MediaType;

/// 默认编码器的可配置项。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderSettings {
    /// 写出器是否缩进输出；同时决定事件流美化策略能否生效。
    pub indent_output: bool,
    /// 缺省时保留内置流式类型；给出时整体替换，空列表表示禁用换行分隔模式。
    pub streaming_media_types: Option<Vec<MediaType>>,
    /// 默认缓冲工厂为每个字节块预留的容量，必须大于零。
    pub initial_buffer_capacity: usize,
    /// 视图名到暴露字段的映射。
    pub views: BTreeMap<String, Vec<String>>,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            indent_output: false,
            streaming_media_types: None,
            initial_buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            views: BTreeMap::new(),
        }
    }
}

impl EncoderSettings {
    /// 从 TOML 文本解析并校验。
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: EncoderSettings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// 校验取值范围。
    pub fn validate(&self) -> Result<()> {
        if self.initial_buffer_capacity == 0 {
            return Err(EncodeError::configuration(
                "initial_buffer_capacity must be greater than zero",
            ));
        }
        Ok(())
    }

    /// 按配置构造默认序列化能力。
    pub fn mapper(&self) -> SerdeJsonMapper {
        self.views.iter().fold(
            SerdeJsonMapper::new().with_indent_output(self.indent_output),
            |mapper, (view, fields)| {
                mapper.register_view(ViewSelector::new(view.clone()), fields.iter().cloned())
            },
        )
    }

    /// 按配置构造默认缓冲工厂。
    pub fn buffer_factory(&self) -> HeapBufferFactory {
        HeapBufferFactory::with_capacity(self.initial_buffer_capacity)
    }
}
