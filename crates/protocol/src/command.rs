//! Structured control-channel commands.
//!
//! A [`Command`] is a name plus an ordered list of arguments. Batchable
//! commands carry one [`CmdArg::Group`] per item; the executor is expected
//! to encode groups as its wire format's multi-entry syntax.

use std::fmt;

use crate::constants::CommandName;

/// A single argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Num(u64),
    Str(String),
    Bool(bool),
}

impl ArgValue {
    pub fn as_num(&self) -> Option<u64> {
        match self {
            Self::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
            Self::Bool(b) => f.write_str(if *b { "1" } else { "0" }),
        }
    }
}

impl From<u16> for ArgValue {
    fn from(v: u16) -> Self {
        Self::Num(v.into())
    }
}

impl From<u32> for ArgValue {
    fn from(v: u32) -> Self {
        Self::Num(v.into())
    }
}

impl From<u64> for ArgValue {
    fn from(v: u64) -> Self {
        Self::Num(v)
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// A named argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub key: &'static str,
    pub value: ArgValue,
}

impl Arg {
    pub fn new(key: &'static str, value: impl Into<ArgValue>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// A top-level command argument: either a single key/value pair or a
/// group of pairs describing one item of a batched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmdArg {
    Single(Arg),
    Group(Vec<Arg>),
}

impl From<Arg> for CmdArg {
    fn from(arg: Arg) -> Self {
        Self::Single(arg)
    }
}

/// A control-channel command ready to hand to an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: CommandName,
    pub args: Vec<CmdArg>,
}

impl Command {
    pub fn new(name: CommandName) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    /// Appends single arguments in order.
    pub fn with_args(mut self, args: impl IntoIterator<Item = Arg>) -> Self {
        self.args.extend(args.into_iter().map(CmdArg::Single));
        self
    }

    /// Appends one argument group per item.
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = Vec<Arg>>) -> Self {
        self.args.extend(groups.into_iter().map(CmdArg::Group));
        self
    }

    /// Looks up a single (non-grouped) argument by key.
    pub fn arg(&self, key: &str) -> Option<&ArgValue> {
        self.args.iter().find_map(|a| match a {
            CmdArg::Single(arg) if arg.key == key => Some(&arg.value),
            _ => None,
        })
    }

    /// Iterates over the argument groups in request order.
    pub fn groups(&self) -> impl Iterator<Item = &[Arg]> {
        self.args.iter().filter_map(|a| match a {
            CmdArg::Group(group) => Some(group.as_slice()),
            CmdArg::Single(_) => None,
        })
    }
}

/// Looks up a key inside an argument group.
pub fn group_arg<'a>(group: &'a [Arg], key: &str) -> Option<&'a ArgValue> {
    group.iter().find(|a| a.key == key).map(|a| &a.value)
}
