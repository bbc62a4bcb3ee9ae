//! 美化打印策略与按行前缀缩进的格式化器。

use std::io;

use serde_json::ser::Formatter;

use crate::media_type::{MediaType, TEXT_EVENT_STREAM};

const INDENT: &[u8] = b"  ";
const NEWLINE: &[u8] = b"\n";
const EVENT_STREAM_CONTINUATION: &[u8] = b"\ndata:";

/// 美化打印策略。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PrettyPrinter {
    /// 无多余空白。
    #[default]
    Compact,
    /// 对象按行缩进，换行为 `\n`。
    Indented,
    /// 对象按行缩进，每个换行后紧跟 `data:` 续行前缀，保证多行负载在事件流中仍属于同一个 `data` 字段。
    EventStream,
}

/// 按输出格式覆盖默认美化策略的查找表。
static FORMAT_PRINTERS: [(MediaType, PrettyPrinter); 1] =
    [(TEXT_EVENT_STREAM, PrettyPrinter::EventStream)];

impl PrettyPrinter {
    /// 查找与 `media_type` 兼容的格式专属打印策略；没有专属策略时返回 `None`。
    pub fn for_format(media_type: Option<&MediaType>) -> Option<PrettyPrinter> {
        let media_type = media_type?;
        FORMAT_PRINTERS
            .iter()
            .find(|(format, _)| format.is_compatible_with(media_type))
            .map(|(_, printer)| *printer)
    }

    /// 该策略使用的换行序列；紧凑输出返回 `None`。
    pub fn line_break(self) -> Option<&'static [u8]> {
        match self {
            PrettyPrinter::Compact => None,
            PrettyPrinter::Indented => Some(NEWLINE),
            PrettyPrinter::EventStream => Some(EVENT_STREAM_CONTINUATION),
        }
    }
}

/// 以可配置换行序列缩进对象的 `serde_json` 格式化器。
///
/// # 输出形状
/// - 对象：每个字段独占一行，换行序列后接两个空格乘以嵌套深度，空对象写作 `{ }`；
/// - 数组：元素以 `, ` 分隔并在两端各留一个空格（`[ 1, 2 ]`），不产生换行；
/// - 字段名与值之间写 `" : "`。
///
/// 数组不换行，保证事件流变体里所有物理换行都来自对象缩进，每一处都带 `data:` 前缀。
#[derive(Clone, Debug)]
pub struct LinePrefixFormatter<'a> {
    line_break: &'a [u8],
    current_indent: usize,
    has_value: bool,
}

impl<'a> LinePrefixFormatter<'a> {
    /// 以 `line_break` 作为对象内部的换行序列。
    pub fn new(line_break: &'a [u8]) -> Self {
        Self {
            line_break,
            current_indent: 0,
            has_value: false,
        }
    }

    fn write_line_start<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(self.line_break)?;
        for _ in 0..self.current_indent {
            writer.write_all(INDENT)?;
        }
        Ok(())
    }
}

impl Formatter for LinePrefixFormatter<'_> {
    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b"[")
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b" ]")
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(if first { b" " } else { b", " })
    }

    fn end_array_value<W>(&mut self, _writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.current_indent += 1;
        self.has_value = false;
        writer.write_all(b"{")
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.current_indent = self.current_indent.saturating_sub(1);
        if self.has_value {
            self.write_line_start(writer)?;
        } else {
            writer.write_all(b" ")?;
        }
        writer.write_all(b"}")
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if !first {
            writer.write_all(b",")?;
        }
        self.write_line_start(writer)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b" : ")
    }

    fn end_object_value<W>(&mut self, _writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.has_value = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_type::{APPLICATION_JSON, MediaType};
    use serde::Serialize;
    use serde_json::json;

    fn render(value: &serde_json::Value, line_break: &[u8]) -> String {
        let mut out = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut out, LinePrefixFormatter::new(line_break));
        value.serialize(&mut ser).expect("内存写出不应失败");
        String::from_utf8(out).expect("输出应为 UTF-8")
    }

    #[test]
    fn event_stream_lookup_is_keyed_on_format() {
        assert_eq!(
            PrettyPrinter::for_format(Some(&TEXT_EVENT_STREAM)),
            Some(PrettyPrinter::EventStream)
        );
        let with_charset = MediaType::parse("text/event-stream;charset=utf-8").expect("合法类型");
        assert_eq!(
            PrettyPrinter::for_format(Some(&with_charset)),
            Some(PrettyPrinter::EventStream)
        );
        assert_eq!(PrettyPrinter::for_format(Some(&APPLICATION_JSON)), None);
        assert_eq!(PrettyPrinter::for_format(None), None);
    }

    #[test]
    fn nested_objects_prefix_every_line() {
        let value = json!({"name": "spark", "meta": {"tags": [1, 2]}, "empty": {}});
        let rendered = render(&value, EVENT_STREAM_CONTINUATION);
        assert_eq!(
            rendered,
            "{\ndata:  \"empty\" : { },\ndata:  \"meta\" : {\ndata:    \"tags\" : [ 1, 2 ]\ndata:  },\ndata:  \"name\" : \"spark\"\ndata:}"
        );
    }

    #[test]
    fn arrays_of_objects_keep_indentation_balanced() {
        let value = json!({"a": [{"b": 1}]});
        let rendered = render(&value, NEWLINE);
        assert_eq!(rendered, "{\n  \"a\" : [ {\n    \"b\" : 1\n  } ]\n}");
    }

    #[test]
    fn scalars_and_empty_containers() {
        assert_eq!(render(&json!(7), NEWLINE), "7");
        assert_eq!(render(&json!([]), NEWLINE), "[ ]");
        assert_eq!(render(&json!({}), NEWLINE), "{ }");
    }

    #[test]
    fn compact_has_no_line_break() {
        assert_eq!(PrettyPrinter::Compact.line_break(), None);
        assert_eq!(PrettyPrinter::default(), PrettyPrinter::Compact);
    }
}
