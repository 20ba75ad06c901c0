//! `#{name}` interpolation used by compile command templates.
//! `##` produces a literal `#`; a `#` not followed by `{` is kept as is.

use std::{borrow::Borrow, collections::HashMap, ffi::OsStr, hash::Hash};

pub type Result = std::result::Result<String, InterpError>;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InterpError {
    #[error("Undefined variable '{0}' at {}", .1+1)]
    UndefinedVar(String, usize),

    #[error("Unclosed brace (found open brace at {})", .0+1)]
    UnclosedBrace(usize),
}

pub fn interp<K, V>(fmt: &str, variables: &HashMap<K, V>) -> Result
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<OsStr>,
{
    let mut res = String::with_capacity(fmt.len() * 2);
    let mut chars = fmt.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '#' {
            res.push(c);
            continue;
        }
        match chars.peek() {
            Some((_, '#')) => {
                chars.next();
                res.push('#');
            }
            Some(&(pos_open_brace, '{')) => {
                chars.next();
                let name_start = pos_open_brace + 1;
                let Some(name_len) = fmt[name_start..].find('}') else {
                    return Err(InterpError::UnclosedBrace(pos_open_brace));
                };
                let name = &fmt[name_start..name_start + name_len];
                let Some(value) = variables.get(name) else {
                    return Err(InterpError::UndefinedVar(name.to_owned(), i + 1));
                };
                res += value.as_ref().to_string_lossy().as_ref();
                // skip the variable name and the closing brace
                for _ in 0..=name.chars().count() {
                    chars.next();
                }
            }
            _ => res.push('#'),
        }
    }
    Ok(res)
}
