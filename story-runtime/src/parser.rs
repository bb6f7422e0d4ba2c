//! # Parser 模块
//!
//! 行解析器：把一行脚本文本绑定到一个 [`Instruction`]。
//!
//! ## 绑定规则
//!
//! - 指令名大小写不敏感；资源名、别名、变量值保持原样
//! - 变体按「指令名 + 参数个数」选择：可省略的尾参数省略时绑定到短变体
//!   （如 `stop hero` / `stop hero left`，`rest` / `rest 2.5`）
//! - 条件族指令（`case` / `or_case`）的参数用 `;` 分隔，
//!   因为区间操作数内部含有空格（`5 and 10`）
//! - 空行与 `//` 注释行不产生指令

use crate::command::{
    Channel, ContentKind, Instruction, Rgb, Seconds, Smoothing, StopEdge, Volume,
};
use crate::condition::Condition;
use crate::error::ParseError;

/// 判断 `line` 是否以 `prefix` 开头（大小写不敏感）
///
/// 按字符比较：行首是多字节字符时不会在字节边界上出错。
fn starts_with_ignore_case(line: &str, prefix: &str) -> bool {
    line.len() >= prefix.len()
        && line
            .chars()
            .zip(prefix.chars())
            .all(|(a, b)| a.eq_ignore_ascii_case(&b))
}

/// 解析一行脚本
///
/// 返回 `Ok(None)` 表示该行不产生指令（空行/注释）。
pub fn parse_line(line: &str, line_number: usize) -> Result<Option<Instruction>, ParseError> {
    let line = line.trim();

    if line.is_empty() || line.starts_with("//") {
        return Ok(None);
    }

    // 参数里可以带空格的指令走前缀分发
    if starts_with_ignore_case(line, "say ") {
        return parse_say(&line[4..], line_number).map(Some);
    }
    if starts_with_ignore_case(line, "set ") {
        return parse_set(&line[4..], line_number).map(Some);
    }
    if starts_with_ignore_case(line, "case_else") {
        return parse_marker(line, "case_else", line_number, |id| Instruction::CaseElse {
            id,
        })
        .map(Some);
    }
    if starts_with_ignore_case(line, "case_end") {
        return parse_marker(line, "case_end", line_number, |id| Instruction::CaseEnd {
            id,
        })
        .map(Some);
    }
    if starts_with_ignore_case(line, "or_case") {
        return parse_case(&line[7..], "or_case", line_number, |id, condition| {
            Instruction::OrCase { id, condition }
        })
        .map(Some);
    }
    if starts_with_ignore_case(line, "case") {
        return parse_case(&line[4..], "case", line_number, |id, condition| {
            Instruction::Case { id, condition }
        })
        .map(Some);
    }

    // 其余指令按空白分词
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let command = tokens[0].to_lowercase();

    match command.as_str() {
        "show" => parse_show(&tokens, line_number).map(Some),
        "hide" => parse_hide(&tokens, line_number).map(Some),
        "clear" => parse_clear(&tokens, line_number).map(Some),
        "move" => parse_move(&tokens, line_number).map(Some),
        "stop" => parse_stop(&tokens, line_number).map(Some),
        "scale" => parse_sprite_tween(&tokens, line_number, |name, row, target| {
            Instruction::ScaleSprite { name, row, target }
        })
        .map(Some),
        "rotate" => parse_sprite_tween(&tokens, line_number, |name, row, degrees| {
            Instruction::RotateSprite { name, row, degrees }
        })
        .map(Some),
        "fade" => parse_sprite_tween(&tokens, line_number, |name, row, opacity| {
            Instruction::FadeSprite { name, row, opacity }
        })
        .map(Some),
        "rest" => parse_rest(&tokens, line_number).map(Some),
        "screen" => parse_screen_fade(&tokens, line_number).map(Some),
        "scene" => match tokens.len() {
            2 => Ok(Some(Instruction::ChangeScene {
                name: tokens[1].to_string(),
            })),
            _ => Err(missing(line_number, "scene", "name")),
        },
        "font" => match tokens.len() {
            2 => Ok(Some(Instruction::SetFont {
                name: tokens[1].to_string(),
            })),
            _ => Err(missing(line_number, "font", "name")),
        },
        "play" => parse_play(&tokens, line_number).map(Some),
        "volume" => parse_volume(&tokens, line_number).map(Some),
        // 不带参数的 say/set 落到这里
        "say" => Err(missing(line_number, "say", "text")),
        "set" => Err(missing(line_number, "set", "value")),
        _ => Err(ParseError::UnknownCommand {
            line: line_number,
            command: tokens[0].to_string(),
        }),
    }
}

fn missing(line: usize, command: &str, param: &str) -> ParseError {
    ParseError::MissingParameter {
        line,
        command: command.to_string(),
        param: param.to_string(),
    }
}

fn parse_i32(token: &str, line: usize, param: &str) -> Result<i32, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidParameter {
        line,
        param: param.to_string(),
        message: format!("'{}' 不是整数", token),
    })
}

fn parse_f32(token: &str, line: usize, param: &str) -> Result<f32, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidParameter {
        line,
        param: param.to_string(),
        message: format!("'{}' 不是数字", token),
    })
}

fn parse_kind(token: &str, line: usize) -> Result<ContentKind, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidParameter {
        line,
        param: "kind".to_string(),
        message: format!("未知资源类别 '{}'", token),
    })
}

/// `show <kind> <name>` / `show <kind> <name> as <alias>`
fn parse_show(tokens: &[&str], line: usize) -> Result<Instruction, ParseError> {
    match tokens {
        [_, kind, name] => Ok(Instruction::ShowSprite {
            kind: parse_kind(kind, line)?,
            name: name.to_string(),
            alias: None,
        }),
        [_, kind, name, keyword, alias] if keyword.eq_ignore_ascii_case("as") => {
            Ok(Instruction::ShowSprite {
                kind: parse_kind(kind, line)?,
                name: name.to_string(),
                alias: Some(alias.to_string()),
            })
        }
        _ => Err(missing(line, "show", "kind/name")),
    }
}

/// `hide <kind> <name>`
fn parse_hide(tokens: &[&str], line: usize) -> Result<Instruction, ParseError> {
    match tokens {
        [_, kind, name] => Ok(Instruction::HideSprite {
            kind: parse_kind(kind, line)?,
            name: name.to_string(),
        }),
        _ => Err(missing(line, "hide", "kind/name")),
    }
}

/// `clear <kind>`
fn parse_clear(tokens: &[&str], line: usize) -> Result<Instruction, ParseError> {
    match tokens {
        [_, kind] => Ok(Instruction::ClearSprites {
            kind: parse_kind(kind, line)?,
        }),
        _ => Err(missing(line, "clear", "kind")),
    }
}

/// `move <name> <x_row> <y_row> <smoothing>`
fn parse_move(tokens: &[&str], line: usize) -> Result<Instruction, ParseError> {
    match tokens {
        [_, name, x_row, y_row, smoothing] => Ok(Instruction::MoveSprite {
            name: name.to_string(),
            x_row: parse_i32(x_row, line, "x_row")?,
            y_row: parse_i32(y_row, line, "y_row")?,
            smoothing: Smoothing::from_keyword(smoothing),
        }),
        _ => Err(missing(line, "move", "name/x_row/y_row/smoothing")),
    }
}

/// `stop <name>` / `stop <name> <edge>` / `stop audio [<channel>]`
///
/// `stop audio` 优先于同名精灵的移动停止。
fn parse_stop(tokens: &[&str], line: usize) -> Result<Instruction, ParseError> {
    if tokens.len() >= 2 && tokens[1].eq_ignore_ascii_case("audio") {
        return match tokens {
            [_, _] => Ok(Instruction::StopAudio { channel: None }),
            [_, _, channel] => Ok(Instruction::StopAudio {
                channel: Some(parse_channel(channel, line)?),
            }),
            _ => Err(missing(line, "stop audio", "channel")),
        };
    }

    match tokens {
        [_, name] => Ok(Instruction::StopMove {
            name: name.to_string(),
            edge: None,
        }),
        [_, name, edge] => Ok(Instruction::StopMove {
            name: name.to_string(),
            edge: Some(StopEdge::from_keyword(edge)),
        }),
        _ => Err(missing(line, "stop", "name")),
    }
}

/// `scale` / `rotate` / `fade` 共用的 `<name> <row> <target>` 形式
fn parse_sprite_tween(
    tokens: &[&str],
    line: usize,
    build: impl FnOnce(String, i32, f32) -> Instruction,
) -> Result<Instruction, ParseError> {
    match tokens {
        [command, name, row, target] => Ok(build(
            name.to_string(),
            parse_i32(row, line, "row")?,
            parse_f32(target, line, command)?,
        )),
        [command, ..] => Err(missing(line, command, "name/row/target")),
        [] => unreachable!(),
    }
}

/// `rest <seconds>` / `rest`（短变体：解除当前暂停）
fn parse_rest(tokens: &[&str], line: usize) -> Result<Instruction, ParseError> {
    match tokens {
        [_] => Ok(Instruction::Rest { seconds: None }),
        [_, seconds] => Ok(Instruction::Rest {
            seconds: Some(Seconds::clamped(parse_f32(seconds, line, "seconds")?)),
        }),
        _ => Err(ParseError::InvalidLine {
            line,
            message: "rest 最多接受一个时长参数".to_string(),
        }),
    }
}

/// `screen fade <color> <in_row> <out_row> <hold>` (+ 可选 `<scene>`)
fn parse_screen_fade(tokens: &[&str], line: usize) -> Result<Instruction, ParseError> {
    if tokens.len() < 2 || !tokens[1].eq_ignore_ascii_case("fade") {
        return Err(ParseError::InvalidLine {
            line,
            message: "screen 后只支持 fade".to_string(),
        });
    }

    match tokens {
        [_, _, color, in_row, out_row, hold, rest @ ..] if rest.len() <= 1 => {
            let color = Rgb::parse(color).ok_or_else(|| ParseError::InvalidParameter {
                line,
                param: "color".to_string(),
                message: format!("无法解析颜色 '{}'", color),
            })?;
            Ok(Instruction::ScreenFade {
                color,
                fade_in_row: parse_i32(in_row, line, "in_row")?,
                fade_out_row: parse_i32(out_row, line, "out_row")?,
                hold: Seconds::clamped(parse_f32(hold, line, "hold")?),
                scene: rest.first().map(|s| s.to_string()),
            })
        }
        _ => Err(missing(line, "screen fade", "color/in_row/out_row/hold")),
    }
}

fn parse_channel(token: &str, line: usize) -> Result<Channel, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidParameter {
        line,
        param: "channel".to_string(),
        message: format!("未知通道 '{}'", token),
    })
}

/// `play music <name> [loop]` / `play <channel> <name>`
fn parse_play(tokens: &[&str], line: usize) -> Result<Instruction, ParseError> {
    if tokens.len() >= 2 && tokens[1].eq_ignore_ascii_case("music") {
        return match tokens {
            [_, _, name] => Ok(Instruction::PlayMusic {
                name: name.to_string(),
                looping: false,
            }),
            [_, _, name, keyword] if keyword.eq_ignore_ascii_case("loop") => {
                Ok(Instruction::PlayMusic {
                    name: name.to_string(),
                    looping: true,
                })
            }
            _ => Err(missing(line, "play music", "name")),
        };
    }

    match tokens {
        [_, channel, name] => {
            let channel = parse_channel(channel, line)?;
            if channel == Channel::Music {
                // 到不了这里（music 走上面的分支），防御性保留
                return Err(ParseError::InvalidLine {
                    line,
                    message: "music 通道请使用 play music".to_string(),
                });
            }
            Ok(Instruction::PlaySound {
                channel,
                name: name.to_string(),
            })
        }
        _ => Err(missing(line, "play", "channel/name")),
    }
}

/// `volume <channel> <v>`
fn parse_volume(tokens: &[&str], line: usize) -> Result<Instruction, ParseError> {
    match tokens {
        [_, channel, v] => Ok(Instruction::SetVolume {
            channel: parse_channel(channel, line)?,
            volume: Volume::clamped(parse_f32(v, line, "volume")?),
        }),
        _ => Err(missing(line, "volume", "channel/volume")),
    }
}

/// `say <speaker>; <text>` / `say <text>`
fn parse_say(tail: &str, line: usize) -> Result<Instruction, ParseError> {
    let tail = tail.trim();
    if tail.is_empty() {
        return Err(missing(line, "say", "text"));
    }

    match tail.split_once(';') {
        Some((speaker, text)) => Ok(Instruction::Say {
            speaker: Some(speaker.trim().to_string()),
            text: text.trim().to_string(),
        }),
        None => Ok(Instruction::Say {
            speaker: None,
            text: tail.to_string(),
        }),
    }
}

/// `set $name <value...>`
fn parse_set(tail: &str, line: usize) -> Result<Instruction, ParseError> {
    let tail = tail.trim();
    let (name, value) = tail
        .split_once(char::is_whitespace)
        .ok_or_else(|| missing(line, "set", "value"))?;

    let name = name
        .strip_prefix('$')
        .ok_or_else(|| ParseError::InvalidParameter {
            line,
            param: "name".to_string(),
            message: format!("变量名必须以 $ 开头：'{}'", name),
        })?;
    if name.is_empty() {
        return Err(missing(line, "set", "name"));
    }

    Ok(Instruction::SetVar {
        name: name.to_string(),
        value: value.trim().to_string(),
    })
}

/// `case <id>; <v1>; <op>; <v2>` 族
fn parse_case(
    tail: &str,
    command: &str,
    line: usize,
    build: impl FnOnce(String, Condition) -> Instruction,
) -> Result<Instruction, ParseError> {
    let fields: Vec<&str> = tail.split(';').map(str::trim).collect();
    if fields.len() != 4 {
        return Err(ParseError::InvalidLine {
            line,
            message: format!("{} 需要 4 个以 ';' 分隔的字段：id; 值1; 操作符; 值2", command),
        });
    }

    let op = fields[2]
        .parse()
        .map_err(|_| ParseError::InvalidParameter {
            line,
            param: "operator".to_string(),
            message: format!("未知操作符 '{}'", fields[2]),
        })?;

    Ok(build(
        fields[0].to_string(),
        Condition::new(fields[1], fields[3], op),
    ))
}

/// `case_else <id>` / `case_end <id>`
fn parse_marker(
    line_text: &str,
    command: &str,
    line: usize,
    build: impl FnOnce(String) -> Instruction,
) -> Result<Instruction, ParseError> {
    let tail = line_text[command.len()..].trim();
    if tail.is_empty() {
        return Err(missing(line, command, "id"));
    }
    Ok(build(tail.to_string()))
}
