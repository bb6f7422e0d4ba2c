//! # Vars 模块
//!
//! 脚本变量表与 `($name)` 替换引擎。
//!
//! ## 设计原则
//!
//! - 查找与存储都是**精确匹配**，大小写敏感，不做任何折叠
//! - 替换永不报错：查不到的引用原样留在输出里
//! - 扫描器是手写的字节状态机，跨度改写依赖明确的长度差值运算

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

/// 同一行上的最大替换轮数
///
/// 变量值本身可以再引用变量，因此整个扫描-改写在自己的输出上重复执行，
/// 最多 4 轮；超过后即使仍有未解析的嵌套引用也停止（自引用链不会挂死）。
pub const MAX_RESOLVE_PASSES: usize = 4;

/// 脚本变量表
///
/// 全局 name -> 字符串值映射，仅由 `set` 指令写入，
/// 生命周期与一次运行中的故事一致。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableTable {
    vars: HashMap<String, String>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入变量（名字不含 `$` 前缀，精确匹配存储）
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// 读取变量（精确匹配，大小写敏感）
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl FromIterator<(String, String)> for VariableTable {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

/// 对一行脚本做变量替换
///
/// 单轮：从左到右扫描所有 `(` 空白? `$name` 空白? `)` 形式的 token，
/// 生成有序的（跨度，替换值）列表后按长度差值依次改写；
/// 整轮在自己的输出上重复，最多 [`MAX_RESOLVE_PASSES`] 轮。
pub fn resolve(line: &str, table: &VariableTable) -> String {
    let mut current = line.to_string();

    for _ in 0..MAX_RESOLVE_PASSES {
        let spans = scan(&current, table);
        if spans.is_empty() {
            break;
        }
        current = apply(current, spans);
    }

    current
}

/// 扫描一轮，返回从左到右的（字节跨度，替换值）列表
///
/// 表中不存在的名字直接跳过（不进列表，原样保留）。
fn scan(text: &str, table: &VariableTable) -> Vec<(Range<usize>, String)> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'(' {
            i += 1;
            continue;
        }

        let start = i;
        let mut j = i + 1;
        while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
            j += 1;
        }
        if j >= bytes.len() || bytes[j] != b'$' {
            i += 1;
            continue;
        }
        j += 1;

        let name_start = j;
        while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
            j += 1;
        }
        if j == name_start {
            i += 1;
            continue;
        }
        let name = &text[name_start..j];

        while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
            j += 1;
        }
        if j >= bytes.len() || bytes[j] != b')' {
            i += 1;
            continue;
        }
        let end = j + 1;

        if let Some(value) = table.get(name) {
            spans.push((start..end, value.to_string()));
        }
        i = end;
    }

    spans
}

/// 按顺序应用替换
///
/// 改写第 i 个跨度后，其后的所有跨度整体平移
/// `len(replacement) - len(original)`，保证先前的替换不会让后面的失效。
fn apply(mut text: String, spans: Vec<(Range<usize>, String)>) -> String {
    let mut delta: isize = 0;

    for (range, replacement) in spans {
        let start = (range.start as isize + delta) as usize;
        let end = (range.end as isize + delta) as usize;
        delta += replacement.len() as isize - (range.end - range.start) as isize;
        text.replace_range(start..end, &replacement);
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> VariableTable {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_basic_substitution() {
        let t = table(&[("x", "A"), ("y", "BB")]);
        assert_eq!(resolve("(  $x ) and ($y)", &t), "A and BB");
    }

    #[test]
    fn test_unresolved_left_untouched() {
        let t = VariableTable::new();
        assert_eq!(resolve("($z)", &t), "($z)");

        let t = table(&[("x", "A")]);
        assert_eq!(resolve("($x) ($missing)", &t), "A ($missing)");
    }

    #[test]
    fn test_span_shift_with_different_lengths() {
        // 第一个替换比原 token 长，后续跨度必须整体平移
        let t = table(&[("long", "0123456789"), ("s", "!")]);
        assert_eq!(resolve("a($long)b($s)c", &t), "a0123456789b!c");

        // 第一个替换比原 token 短
        let t = table(&[("a", ""), ("b", "B")]);
        assert_eq!(resolve("($a)($b)", &t), "B");
    }

    #[test]
    fn test_nested_reference_resolves_in_later_pass() {
        let t = table(&[("outer", "($inner)"), ("inner", "42")]);
        assert_eq!(resolve("v = ($outer)", &t), "v = 42");
    }

    #[test]
    fn test_self_reference_terminates() {
        // x -> "($x)"：每轮都有替换发生，靠轮数上限终止
        let t = table(&[("x", "($x)")]);
        assert_eq!(resolve("($x)", &t), "($x)");
    }

    #[test]
    fn test_case_sensitive_lookup() {
        let t = table(&[("Name", "Alice")]);
        assert_eq!(resolve("($Name)", &t), "Alice");
        // 精确匹配：大小写不同视为未定义
        assert_eq!(resolve("($name)", &t), "($name)");
    }

    #[test]
    fn test_malformed_tokens_ignored() {
        let t = table(&[("x", "A")]);
        assert_eq!(resolve("($x", &t), "($x");
        assert_eq!(resolve("$x)", &t), "$x)");
        assert_eq!(resolve("()", &t), "()");
        assert_eq!(resolve("($ )", &t), "($ )");
        // 失败的 '(' 不吞掉后面合法的 token
        assert_eq!(resolve("(($x)", &t), "(A");
    }

    #[test]
    fn test_value_containing_parens_not_rescanned_same_pass() {
        // 同一轮内替换值不会被再次扫描；下一轮才会
        let t = table(&[("x", "($y)"), ("y", "Y")]);
        assert_eq!(resolve("($x)", &t), "Y");
    }
}
