//! # Reader 模块
//!
//! 脚本读取器：按行消费脚本，维护变量表与跳过状态。
//!
//! ## 每行的处理顺序
//!
//! 1. 变量替换（[`crate::vars::resolve`]）
//! 2. 解析/绑定到 [`Instruction`]
//! 3. 跳过判定（[`crate::condition::should_evaluate`]）
//! 4. 条件族与 `set` 指令在读取器内部消化；其余指令交还宿主分发
//!
//! 跳过状态是一个显式字段，每行进入分发前检查一次，不散落在各指令处理器里。
//! 它同时记录跳过的原因：[`SkipState::Searching`] 是条件为假、等待备选分支
//! 接管；[`SkipState::BranchTaken`] 是分支已执行完毕、直到 `case_end` 为止
//! 全部作废。后者之下 `or_case` / `case_else` 不再重新求值。

use serde::{Deserialize, Serialize};

use crate::command::Instruction;
use crate::condition::should_evaluate;
use crate::error::VnResult;
use crate::parser::parse_line;
use crate::vars::{VariableTable, resolve};

/// 跳过状态：为什么在跳过、到哪里为止
///
/// 两种原因的退出规则不同：`Searching` 遇到匹配的 `or_case` / `case_else` /
/// `case_end` 都可能退出；`BranchTaken` 只有匹配的 `case_end` 能退出。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum SkipState {
    /// 条件为假，正在寻找可接管的分支
    Searching { id: String },
    /// 分支已执行完毕，其余备选分支整体跳过
    BranchTaken { id: String },
}

impl SkipState {
    /// 跳过段所属的条件 id
    fn id(&self) -> &str {
        match self {
            Self::Searching { id } | Self::BranchTaken { id } => id,
        }
    }
}

/// 脚本读取器
///
/// 生命周期与一次运行中的故事一致。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptReader {
    lines: Vec<String>,
    cursor: usize,
    vars: VariableTable,
    /// 当前跳过状态（`None` = 未跳过）
    skip: Option<SkipState>,
}

impl ScriptReader {
    pub fn new(source: &str) -> Self {
        Self::with_vars(source, VariableTable::new())
    }

    /// 带宿主提供的初始变量表创建
    pub fn with_vars(source: &str, vars: VariableTable) -> Self {
        Self {
            lines: source.lines().map(str::to_string).collect(),
            cursor: 0,
            vars,
            skip: None,
        }
    }

    pub fn vars(&self) -> &VariableTable {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut VariableTable {
        &mut self.vars
    }

    /// 当前跳过段的条件 id（测试/诊断用）
    pub fn skip_state(&self) -> Option<&str> {
        self.skip.as_ref().map(SkipState::id)
    }

    /// 是否已读完
    pub fn finished(&self) -> bool {
        self.cursor >= self.lines.len()
    }

    /// 取下一条需要宿主分发的指令
    ///
    /// 读完返回 `Ok(None)`。条件求值的格式错误（如非法区间文本）
    /// 会从这里向上传播。
    pub fn next(&mut self) -> VnResult<Option<Instruction>> {
        while self.cursor < self.lines.len() {
            let line_number = self.cursor + 1;
            let raw = self.lines[self.cursor].clone();
            self.cursor += 1;

            let resolved = resolve(&raw, &self.vars);
            let instruction = match parse_line(&resolved, line_number) {
                Ok(Some(instruction)) => instruction,
                Ok(None) => continue,
                // 跳过段内的行整体忽略，解析不了也不报错
                Err(_) if self.skip.is_some() => continue,
                Err(e) => return Err(e.into()),
            };

            if !should_evaluate(&instruction, self.skip_state()) {
                continue;
            }

            match instruction {
                Instruction::Case { id, condition } => {
                    if !condition.evaluate()? {
                        self.skip = Some(SkipState::Searching { id });
                    }
                }
                Instruction::OrCase { id, condition } => match &self.skip {
                    // 分支已执行：备选分支不再求值，保持跳过
                    Some(SkipState::BranchTaken { .. }) => {}
                    // 自己的条件为假进入的搜索段：重新求值，真则接管分支；
                    // 别的条件的搜索段保持跳过
                    Some(SkipState::Searching { id: active }) => {
                        if *active == id && condition.evaluate()? {
                            self.skip = None;
                        }
                    }
                    // 前一分支已执行：从这里起跳到 case_end 为止
                    None => self.skip = Some(SkipState::BranchTaken { id }),
                },
                Instruction::CaseElse { id } => match &self.skip {
                    Some(SkipState::BranchTaken { .. }) => {}
                    Some(SkipState::Searching { id: active }) => {
                        if *active == id {
                            self.skip = None;
                        }
                    }
                    None => self.skip = Some(SkipState::BranchTaken { id }),
                },
                Instruction::CaseEnd { id } => {
                    if self.skip.as_ref().is_some_and(|state| state.id() == id.as_str()) {
                        self.skip = None;
                    }
                }
                Instruction::SetVar { name, value } => {
                    self.vars.set(name, value);
                }
                other => return Ok(Some(other)),
            }
        }

        Ok(None)
    }
}
