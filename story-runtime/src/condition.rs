//! # Condition 模块
//!
//! 条件求值引擎与行跳过判定。
//!
//! ## 设计原则
//!
//! - 求值是**无副作用**的纯函数，不依赖 IO
//! - `is` / `is not` 永远做字面量比较，即使两边都能解析成数字
//! - 排序比较的类型失配静默得 `false`；区间操作数的**格式**错误则向上传播
//!
//! ## 操作符（8 个）
//!
//! `is`, `is not`, `less than`, `less or equal`,
//! `more than`, `more or equal`, `between`, `not between`

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::command::Instruction;

/// 条件求值错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConditionError {
    /// 区间操作数不符合 `"<low> and <high>"` 形式
    #[error("区间格式无效，期望 \"<low> and <high>\"：'{text}'")]
    RangeFormat { text: String },
}

/// 条件操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    Is,
    IsNot,
    LessThan,
    LessOrEqual,
    MoreThan,
    MoreOrEqual,
    Between,
    NotBetween,
}

impl ConditionOp {
    /// 脚本中的操作符写法
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Is => "is",
            Self::IsNot => "is not",
            Self::LessThan => "less than",
            Self::LessOrEqual => "less or equal",
            Self::MoreThan => "more than",
            Self::MoreOrEqual => "more or equal",
            Self::Between => "between",
            Self::NotBetween => "not between",
        }
    }
}

impl FromStr for ConditionOp {
    type Err = ();

    /// 从脚本写法解析（大小写不敏感，内部空白可折叠）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        match normalized.as_str() {
            "is" => Ok(Self::Is),
            "is not" => Ok(Self::IsNot),
            "less than" => Ok(Self::LessThan),
            "less or equal" => Ok(Self::LessOrEqual),
            "more than" => Ok(Self::MoreThan),
            "more or equal" => Ok(Self::MoreOrEqual),
            "between" => Ok(Self::Between),
            "not between" => Ok(Self::NotBetween),
            _ => Err(()),
        }
    }
}

/// 一条可求值的条件
///
/// 每个条件行构造一个实例，除自身求值外不携带状态。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub value1: String,
    pub value2: String,
    pub op: ConditionOp,
}

impl Condition {
    pub fn new(value1: impl Into<String>, value2: impl Into<String>, op: ConditionOp) -> Self {
        Self {
            value1: value1.into(),
            value2: value2.into(),
            op,
        }
    }

    /// 求值
    ///
    /// - `is` / `is not`：字面量比较，永不按数字比较
    /// - 排序比较：两侧都按 f64 解析，任一失败得 `false`（不报错）
    /// - `between` / `not between`：操作数 2 必须是 `"<low> and <high>"`，
    ///   形式不符返回 [`ConditionError::RangeFormat`]；边界含等号
    pub fn evaluate(&self) -> Result<bool, ConditionError> {
        match self.op {
            ConditionOp::Is => Ok(self.value1 == self.value2),
            ConditionOp::IsNot => Ok(self.value1 != self.value2),
            ConditionOp::LessThan => Ok(self.compare_numeric(|a, b| a < b)),
            ConditionOp::LessOrEqual => Ok(self.compare_numeric(|a, b| a <= b)),
            ConditionOp::MoreThan => Ok(self.compare_numeric(|a, b| a > b)),
            ConditionOp::MoreOrEqual => Ok(self.compare_numeric(|a, b| a >= b)),
            ConditionOp::Between => {
                let (low, high) = parse_range(&self.value2)?;
                Ok(match parse_number(&self.value1) {
                    Some(v) => v >= low && v <= high,
                    None => false,
                })
            }
            ConditionOp::NotBetween => {
                let (low, high) = parse_range(&self.value2)?;
                Ok(match parse_number(&self.value1) {
                    Some(v) => v < low || v > high,
                    None => false,
                })
            }
        }
    }

    fn compare_numeric(&self, cmp: impl Fn(f64, f64) -> bool) -> bool {
        match (parse_number(&self.value1), parse_number(&self.value2)) {
            (Some(a), Some(b)) => cmp(a, b),
            _ => false,
        }
    }
}

/// 行跳过判定
///
/// `skip` 是读取器当前跳过段的条件 id。
/// 跳过期间只有结构标记（`or_case` / `case_else` / `case_end`）仍被求值，
/// 其余行一律忽略；`skip` 为 `None` 表示未跳过，所有行照常求值。
pub fn should_evaluate(instruction: &Instruction, skip: Option<&str>) -> bool {
    skip.is_none() || instruction.is_structural_marker()
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse().ok()
}

/// 解析 `"<low> and <high>"` 区间文本
///
/// `and` 大小写不敏感，内部空白可折叠。
fn parse_range(text: &str) -> Result<(f64, f64), ConditionError> {
    let err = || ConditionError::RangeFormat {
        text: text.to_string(),
    };

    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != 3 || !tokens[1].eq_ignore_ascii_case("and") {
        return Err(err());
    }

    let low: f64 = tokens[0].parse().map_err(|_| err())?;
    let high: f64 = tokens[2].parse().map_err(|_| err())?;
    Ok((low, high))
}
