//! CQ-code message strings.
//!
//! OneBot v11 carries rich messages as strings with inline codes such as
//! `[CQ:at,qq=10001]` or `[CQ:image,file=a.jpg]`. Literal brackets, commas
//! and ampersands in text are escaped as HTML entities.
//!
//! This module only reads what dispatch needs: the plain text of a message,
//! whether it addresses the bot and which message it replies to.

use regex::Regex;

const CQ_OPEN: &str = "[CQ:";

/// Unescapes OneBot text entities.
pub fn unescape(text: &str) -> String {
    text.replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&#44;", ",")
        .replace("&amp;", "&")
}

/// Escapes text so it survives inside a CQ message string.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('[', "&#91;")
        .replace(']', "&#93;")
}

/// Removes every CQ code and unescapes what is left.
pub fn plain_text(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find(CQ_OPEN) {
        text.push_str(&rest[..start]);
        match rest[start..].find(']') {
            Some(end) => rest = &rest[start + end + 1..],
            None => {
                // Unterminated code, keep it as text.
                rest = &rest[start..];
                break;
            }
        }
    }
    text.push_str(rest);
    unescape(&text)
}

/// A CQ `at` code mentioning `user_id`.
pub fn at(user_id: &str) -> String {
    format!("[CQ:at,qq={user_id}]")
}

/// Reads parameter `key` of `code` if it is a CQ code of type `kind`.
fn code_param<'a>(code: &'a str, kind: &str, key: &str) -> Option<&'a str> {
    let body = code.strip_prefix(CQ_OPEN)?.strip_suffix(']')?;
    let (name, params) = body.split_once(',')?;
    if name != kind {
        return None;
    }
    params
        .split(',')
        .find_map(|param| param.strip_prefix(key)?.strip_prefix('='))
}

/// The user id an `at` code mentions, if `code` is one.
fn at_target(code: &str) -> Option<&str> {
    code_param(code, "at", "qq")
}

/// Splits a leading CQ code off `text`.
fn leading_code(text: &str) -> Option<(&str, &str)> {
    if !text.starts_with(CQ_OPEN) {
        return None;
    }
    let end = text.find(']')? + 1;
    Some(text.split_at(end))
}

/// Splits a trailing CQ code off `text`.
fn trailing_code(text: &str) -> Option<(&str, &str)> {
    if !text.ends_with(']') {
        return None;
    }
    let start = text.rfind(CQ_OPEN)?;
    Some(text.split_at(start))
}

fn strip_leading_at<'a>(text: &'a str, self_id: &str) -> Option<&'a str> {
    let (code, rest) = leading_code(text)?;
    (at_target(code)? == self_id).then_some(rest)
}

/// A message with its `reply` code taken out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Id of the message being replied to.
    pub id: String,
    /// What is left of the message.
    pub rest: String,
}

/// Removes the first `reply` code from `raw`, together with an `at` code
/// right behind it and the whitespace after that.
///
/// Clients put a mention of the quoted author after the reply code, so the
/// `at` is dropped whoever it mentions.
pub fn take_reply(raw: &str) -> Option<Reply> {
    let start = raw.find("[CQ:reply,")?;
    let (code, mut tail) = leading_code(&raw[start..])?;
    let id = code_param(code, "reply", "id")?.to_string();
    if let Some((next, rest)) = leading_code(tail)
        && at_target(next).is_some()
    {
        tail = rest;
    }
    Some(Reply {
        id,
        rest: format!("{}{}", &raw[..start], tail.trim_start()),
    })
}

/// Builds the case-insensitive pattern matching a leading nickname.
///
/// Nicknames are matched literally. Returns `None` when no non-empty
/// nickname is configured.
pub fn nickname_pattern<S: AsRef<str>>(nicknames: &[S]) -> Result<Option<Regex>, regex::Error> {
    let alternatives: Vec<String> = nicknames
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !name.is_empty())
        .map(regex::escape)
        .collect();
    if alternatives.is_empty() {
        return Ok(None);
    }
    Regex::new(&format!(r"(?i)^({})([\s,，]*|$)", alternatives.join("|"))).map(Some)
}

/// A message after checking whether it addresses the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addressed {
    /// The message with the mention or nickname removed.
    pub content: String,
    pub to_me: bool,
}

/// Decides whether `raw` is addressed to the bot `self_id`.
///
/// - private messages always are
/// - a leading `at` of the bot is stripped (twice at most), or else a
///   trailing one
/// - a leading nickname is stripped together with the separators after it
pub fn address(raw: &str, self_id: &str, private: bool, nickname: Option<&Regex>) -> Addressed {
    let mut to_me = private;
    let mut content = raw;

    if !private {
        if let Some(rest) = strip_leading_at(content, self_id) {
            to_me = true;
            content = rest.trim_start();
            if let Some(rest) = strip_leading_at(content, self_id) {
                content = rest.trim_start();
            }
        } else if let Some((head, code)) = trailing_code(content.trim_end())
            && at_target(code) == Some(self_id)
        {
            to_me = true;
            content = head.trim_end();
        }
    }

    let mut content = content.to_string();
    if let Some(nickname) = nickname
        && let Some(found) = nickname.find(&content)
    {
        to_me = true;
        content.replace_range(..found.end(), "");
    }

    Addressed { content, to_me }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_strips_codes() {
        assert_eq!(
            plain_text("[CQ:at,qq=1] hi [CQ:face,id=5]there &#91;x&#93;"),
            " hi there [x]"
        );
        assert_eq!(plain_text("no codes"), "no codes");
        assert_eq!(plain_text("broken [CQ:at"), "broken [CQ:at");
    }

    #[test]
    fn test_escape_round_trip() {
        let text = "a[b]&c";
        assert_eq!(unescape(&escape(text)), text);
    }

    #[test]
    fn test_private_is_to_me() {
        let addressed = address("hello", "10", true, None);
        assert!(addressed.to_me);
        assert_eq!(addressed.content, "hello");
    }

    #[test]
    fn test_leading_at_is_stripped() {
        let addressed = address("[CQ:at,qq=10] /weather", "10", false, None);
        assert!(addressed.to_me);
        assert_eq!(addressed.content, "/weather");

        let twice = address("[CQ:at,qq=10] [CQ:at,qq=10,name=bot] hi", "10", false, None);
        assert_eq!(twice.content, "hi");
    }

    #[test]
    fn test_trailing_at_is_stripped() {
        let addressed = address("ping [CQ:at,qq=10] ", "10", false, None);
        assert!(addressed.to_me);
        assert_eq!(addressed.content, "ping");
    }

    #[test]
    fn test_other_mentions_are_kept() {
        let addressed = address("[CQ:at,qq=99] hi", "10", false, None);
        assert!(!addressed.to_me);
        assert_eq!(addressed.content, "[CQ:at,qq=99] hi");
    }

    #[test]
    fn test_nickname_prefix() {
        let pattern = nickname_pattern(&["Parley", ""]).unwrap();
        let addressed = address("parley, roll a dice", "10", false, pattern.as_ref());
        assert!(addressed.to_me);
        assert_eq!(addressed.content, "roll a dice");

        let missed = address("hey parley", "10", false, pattern.as_ref());
        assert!(!missed.to_me);
    }

    #[test]
    fn test_take_reply_strips_code_and_mention() {
        let reply = take_reply("[CQ:reply,id=55][CQ:at,qq=99] hello").unwrap();
        assert_eq!(reply.id, "55");
        assert_eq!(reply.rest, "hello");

        let inline = take_reply("see [CQ:reply,id=-3]  this").unwrap();
        assert_eq!(inline.id, "-3");
        assert_eq!(inline.rest, "see this");

        assert!(take_reply("[CQ:at,qq=10] hi").is_none());
        assert!(take_reply("[CQ:reply,id=1").is_none());
    }

    #[test]
    fn test_code_param_checks_kind() {
        assert_eq!(code_param("[CQ:at,qq=10,name=x]", "at", "qq"), Some("10"));
        assert_eq!(code_param("[CQ:at,qqq=10]", "at", "qq"), None);
        assert_eq!(code_param("[CQ:reply,id=7]", "at", "id"), None);
    }

    #[test]
    fn test_nickname_pattern_escapes_names() {
        let pattern = nickname_pattern(&["a.b"]).unwrap().unwrap();
        assert!(pattern.is_match("a.b hi"));
        assert!(!pattern.is_match("axb hi"));
        assert!(nickname_pattern::<&str>(&[]).unwrap().is_none());
    }
}
