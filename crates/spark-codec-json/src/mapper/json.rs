//! 基于 `serde_json` 的序列化能力与写出器。

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::printer::{LinePrefixFormatter, PrettyPrinter};
use super::{JsonMapper, JsonWriter};
use crate::error::{EncodeError, Result};
use crate::hints::ViewSelector;
use crate::types::{TypeDescriptor, TypeKind};

/// 基于 `serde_json` 的默认序列化能力。
///
/// # 契约（What）
/// - 不透明类型（[`TypeKind::Opaque`]）与通过 [`SerdeJsonMapper::deny_type`] 拒绝的类型名不可序列化，
///   容器类型按元素类型递归判定；
/// - 视图通过 [`SerdeJsonMapper::register_view`] 声明其暴露的字段名，视图作用域内的写出器
///   先把值转换为 `serde_json::Value`，再递归只保留这些字段；
/// - `indent_output` 决定写出器默认是否缩进，也是格式专属美化策略生效的前提。
#[derive(Clone, Debug, Default)]
pub struct SerdeJsonMapper {
    indent_output: bool,
    views: BTreeMap<ViewSelector, Arc<BTreeSet<String>>>,
    denied: BTreeSet<Cow<'static, str>>,
}

impl SerdeJsonMapper {
    /// 紧凑输出、无视图、无拒绝名单。
    pub fn new() -> Self {
        Self::default()
    }

    /// 开关缩进输出。
    pub fn with_indent_output(mut self, enabled: bool) -> Self {
        self.indent_output = enabled;
        self
    }

    /// 是否缩进输出。
    pub fn indent_output(&self) -> bool {
        self.indent_output
    }

    /// 声明视图暴露的字段；重复声明同一视图会整体替换字段集合。
    pub fn register_view<I, S>(mut self, view: ViewSelector, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields = fields.into_iter().map(Into::into).collect();
        self.views.insert(view, Arc::new(fields));
        self
    }

    /// 把类型名加入拒绝名单。
    pub fn deny_type(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.denied.insert(name.into());
        self
    }
}

impl JsonMapper for SerdeJsonMapper {
    type Writer = SerdeJsonWriter;

    fn can_serialize(&self, ty: &TypeDescriptor) -> bool {
        match ty.kind() {
            TypeKind::Opaque => false,
            TypeKind::List(element) | TypeKind::Map(element) => self.can_serialize(element),
            TypeKind::Any | TypeKind::Scalar | TypeKind::Object => !self.denied.contains(ty.name()),
        }
    }

    fn writer(&self, view: Option<&ViewSelector>) -> SerdeJsonWriter {
        let view = view.map(|selector| ViewScope {
            selector: selector.clone(),
            fields: self.views.get(selector).cloned(),
        });
        SerdeJsonWriter {
            view,
            root_type: None,
            indent_output: self.indent_output,
            printer: if self.indent_output {
                PrettyPrinter::Indented
            } else {
                PrettyPrinter::Compact
            },
        }
    }
}

#[derive(Clone, Debug)]
struct ViewScope {
    selector: ViewSelector,
    // `None`：视图未注册，写出时报错。
    fields: Option<Arc<BTreeSet<String>>>,
}

/// [`SerdeJsonMapper`] 产出的写出器。
#[derive(Clone, Debug)]
pub struct SerdeJsonWriter {
    view: Option<ViewScope>,
    root_type: Option<TypeDescriptor>,
    indent_output: bool,
    printer: PrettyPrinter,
}

impl SerdeJsonWriter {
    /// 当前生效的美化策略。
    pub fn pretty_printer(&self) -> PrettyPrinter {
        self.printer
    }

    /// 通过 [`JsonWriter::for_type`] 设置的根类型。
    pub fn root_type(&self) -> Option<&TypeDescriptor> {
        self.root_type.as_ref()
    }

    fn write_tree<W, T>(&self, mut sink: W, value: &T) -> Result<()>
    where
        W: io::Write,
        T: Serialize + ?Sized,
    {
        let written = match self.printer.line_break() {
            None => serde_json::to_writer(&mut sink, value),
            Some(line_break) => {
                let formatter = LinePrefixFormatter::new(line_break);
                let mut serializer = serde_json::Serializer::with_formatter(&mut sink, formatter);
                value.serialize(&mut serializer)
            }
        };
        written.map_err(|source| EncodeError::serialization(self.describe_target(), source))?;
        sink.flush()
            .map_err(|source| EncodeError::serialization("could not flush the JSON sink", source))
    }

    fn describe_target(&self) -> String {
        match &self.root_type {
            Some(ty) => format!("could not write JSON for `{ty}`"),
            None => "could not write JSON".to_owned(),
        }
    }
}

impl JsonWriter for SerdeJsonWriter {
    fn for_type(mut self, ty: &TypeDescriptor) -> Self {
        self.root_type = Some(ty.clone());
        self
    }

    fn indent_output(&self) -> bool {
        self.indent_output
    }

    fn with_pretty_printer(mut self, printer: PrettyPrinter) -> Self {
        self.printer = printer;
        self
    }

    fn write_value<W, T>(&self, sink: W, value: &T) -> Result<()>
    where
        W: io::Write,
        T: Serialize + ?Sized,
    {
        let Some(scope) = &self.view else {
            return self.write_tree(sink, value);
        };
        let fields = scope.fields.as_deref().ok_or_else(|| {
            EncodeError::serialization_message(format!(
                "view `{}` is not registered on the mapper",
                scope.selector
            ))
        })?;
        let mut tree = serde_json::to_value(value).map_err(|source| {
            EncodeError::serialization("could not convert value for view filtering", source)
        })?;
        match (self.root_type.as_ref().map(TypeDescriptor::kind), &mut tree) {
            // 映射的键是数据而非字段，视图只作用于其值。
            (Some(TypeKind::Map(_)), Value::Object(entries)) => {
                entries
                    .values_mut()
                    .for_each(|entry| retain_view_fields(entry, fields));
            }
            (_, tree) => retain_view_fields(tree, fields),
        }
        self.write_tree(sink, &tree)
    }
}

fn retain_view_fields(value: &mut Value, fields: &BTreeSet<String>) {
    match value {
        Value::Object(entries) => {
            entries.retain(|key, _| fields.contains(key));
            entries
                .values_mut()
                .for_each(|entry| retain_view_fields(entry, fields));
        }
        Value::Array(items) => items
            .iter_mut()
            .for_each(|item| retain_view_fields(item, fields)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_to_string(writer: &SerdeJsonWriter, value: &Value) -> Result<String> {
        let mut out = Vec::new();
        writer.write_value(&mut out, value)?;
        Ok(String::from_utf8(out).expect("输出应为 UTF-8"))
    }

    struct ClosedSink;

    impl io::Write for ClosedSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn compact_by_default_indented_on_request() {
        let value = json!({"a": 1, "b": [true]});
        let compact = SerdeJsonMapper::new().writer(None);
        assert_eq!(
            write_to_string(&compact, &value).expect("紧凑写出"),
            r#"{"a":1,"b":[true]}"#
        );

        let indented = SerdeJsonMapper::new().with_indent_output(true).writer(None);
        assert!(indented.indent_output());
        assert_eq!(indented.pretty_printer(), PrettyPrinter::Indented);
        assert_eq!(
            write_to_string(&indented, &value).expect("缩进写出"),
            "{\n  \"a\" : 1,\n  \"b\" : [ true ]\n}"
        );
    }

    #[test]
    fn view_keeps_only_declared_fields() {
        let summary = ViewSelector::new("summary");
        let mapper = SerdeJsonMapper::new().register_view(summary.clone(), ["id", "items"]);
        let writer = mapper.writer(Some(&summary));
        let value = json!({"id": 7, "secret": "x", "items": [{"id": 1, "price": 3}]});
        assert_eq!(
            write_to_string(&writer, &value).expect("视图写出"),
            r#"{"id":7,"items":[{"id":1}]}"#
        );
    }

    #[test]
    fn view_on_map_root_filters_values_not_keys() {
        let summary = ViewSelector::new("summary");
        let mapper = SerdeJsonMapper::new().register_view(summary.clone(), ["id"]);
        let writer = mapper
            .writer(Some(&summary))
            .for_type(&TypeDescriptor::map_of(TypeDescriptor::object("order")));
        let value = json!({"first": {"id": 1, "secret": true}});
        assert_eq!(
            write_to_string(&writer, &value).expect("映射视图写出"),
            r#"{"first":{"id":1}}"#
        );
    }

    #[test]
    fn unregistered_view_is_a_serialization_failure() {
        let writer = SerdeJsonMapper::new().writer(Some(&ViewSelector::new("internal")));
        let err = write_to_string(&writer, &json!({"a": 1})).expect_err("未注册视图应失败");
        assert_eq!(err.code(), crate::error::codes::SERIALIZATION);
        assert!(err.to_string().contains("internal"));
    }

    #[test]
    fn sink_failure_keeps_cause() {
        use std::error::Error as _;

        let writer = SerdeJsonMapper::new()
            .writer(None)
            .for_type(&TypeDescriptor::list_of(TypeDescriptor::scalar("number")));
        let err = writer
            .write_value(ClosedSink, &json!([1, 2]))
            .expect_err("关闭的写入端应失败");
        assert_eq!(err.code(), crate::error::codes::SERIALIZATION);
        assert!(err.to_string().contains("list<number>"));
        assert!(err.source().is_some());
    }

    #[test]
    fn opaque_and_denied_types_are_rejected() {
        let mapper = SerdeJsonMapper::new().deny_type("socket");
        assert!(!mapper.can_serialize(&TypeDescriptor::opaque("file_handle")));
        assert!(!mapper.can_serialize(&TypeDescriptor::object("socket")));
        assert!(!mapper.can_serialize(&TypeDescriptor::list_of(TypeDescriptor::opaque("fd"))));
        assert!(mapper.can_serialize(&TypeDescriptor::map_of(TypeDescriptor::object("order"))));
        assert!(mapper.can_serialize(&TypeDescriptor::any()));
    }
}
