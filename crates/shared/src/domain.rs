use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CodeError;

/// Logical source of a code inside the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeChannel {
    #[serde(rename = "HTTP")]
    Http,
    Telnet,
    File,
    #[serde(rename = "USB")]
    Usb,
    Aux,
    Trigger,
    Queue,
    #[serde(rename = "LCD")]
    Lcd,
    #[serde(rename = "SBC")]
    Sbc,
    Daemon,
    Aux2,
    AutoPause,
    File2,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeType {
    #[serde(rename = "G", alias = "GCode")]
    GCode,
    #[serde(rename = "M", alias = "MCode")]
    MCode,
    #[serde(rename = "T", alias = "TCode")]
    TCode,
    #[serde(rename = "Q", alias = "Comment")]
    Comment,
}

impl CodeType {
    pub fn letter(self) -> char {
        match self {
            Self::GCode => 'G',
            Self::MCode => 'M',
            Self::TCode => 'T',
            Self::Comment => ';',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MessageType {
    #[default]
    Success,
    Warning,
    Error,
}

/// Reply attached to a code the controller executed on our behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    #[serde(default)]
    pub content: String,
}

bitflags::bitflags! {
    /// Bit set describing where a code came from and how it should be executed.
    ///
    /// On the wire the controller spells these as a comma-separated list of
    /// PascalCase names (`"Asynchronous, IsFromMacro"`) or as the raw number.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CodeFlags: u32 {
        const ASYNCHRONOUS              = 1;
        const IS_PRE_PROCESSED          = 1 << 1;
        const IS_POST_PROCESSED         = 1 << 2;
        const IS_FROM_MACRO             = 1 << 3;
        const IS_NESTED_MACRO           = 1 << 4;
        const IS_FROM_CONFIG            = 1 << 5;
        const IS_FROM_CONFIG_OVERRIDE   = 1 << 6;
        const ENFORCE_ABSOLUTE_POSITION = 1 << 7;
        const IS_PRIORITIZED            = 1 << 8;
        const UNBUFFERED                = 1 << 9;
        const IS_FROM_FIRMWARE          = 1 << 10;
        const IS_LAST_CODE              = 1 << 11;
    }
}

impl Default for CodeFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// `IS_FROM_MACRO` -> `IsFromMacro`
fn wire_name(const_name: &str) -> String {
    let mut name = String::with_capacity(const_name.len());
    for word in const_name.split('_') {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            name.push(first);
            name.extend(chars.map(|c| c.to_ascii_lowercase()));
        }
    }
    name
}

/// `IsFromMacro` -> `IS_FROM_MACRO`
fn const_name(wire_name: &str) -> String {
    let mut name = String::with_capacity(wire_name.len() + 4);
    for (index, c) in wire_name.chars().enumerate() {
        if index > 0 && c.is_ascii_uppercase() {
            name.push('_');
        }
        name.push(c.to_ascii_uppercase());
    }
    name
}

impl FromStr for CodeFlags {
    type Err = CodeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut flags = Self::empty();
        for name in raw.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            if name == "None" {
                continue;
            }
            let flag = Self::from_name(&const_name(name)).ok_or_else(|| CodeError::UnknownFlag {
                name: name.to_string(),
            })?;
            flags.insert(flag);
        }
        Ok(flags)
    }
}

impl fmt::Display for CodeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        for (index, (name, _)) in self.iter_names().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&wire_name(name))?;
        }
        Ok(())
    }
}

impl Serialize for CodeFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Bits without a name only survive as a number.
        if Self::from_bits(self.bits()).is_none() {
            serializer.serialize_u32(self.bits())
        } else {
            serializer.collect_str(self)
        }
    }
}

impl<'de> Deserialize<'de> for CodeFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawFlags {
            Bits(u32),
            Names(String),
        }

        match RawFlags::deserialize(deserializer)? {
            RawFlags::Bits(bits) => Ok(Self::from_bits_retain(bits)),
            RawFlags::Names(names) => names.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// Whole numbers stay integers so an untouched value is sent back as it came.
    Integer(i64),
    Float(f64),
    FloatList(Vec<f64>),
    Text(String),
}

impl ParameterValue {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Half of every numeric component. Text has no half and yields `None`.
    pub fn halved(&self) -> Option<Self> {
        match self {
            Self::Integer(value) => Some(Self::Float(*value as f64 / 2.0)),
            Self::Float(value) => Some(Self::Float(value / 2.0)),
            Self::FloatList(values) => Some(Self::FloatList(
                values.iter().map(|value| value / 2.0).collect(),
            )),
            Self::Text(_) => None,
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Vec<f64>> for ParameterValue {
    fn from(values: Vec<f64>) -> Self {
        Self::FloatList(values)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::FloatList(values) => {
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(":")?;
                    }
                    write!(f, "{value}")?;
                }
                Ok(())
            }
            Self::Text(text) => write!(f, "\"{text}\""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeParameter {
    pub letter: char,
    pub value: ParameterValue,
    /// Per-parameter metadata such as `isString`, passed back untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CodeParameter {
    pub fn new(letter: char, value: impl Into<ParameterValue>) -> Self {
        Self {
            letter,
            value: value.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// One instruction as the controller hands it to an interceptor.
///
/// Fields the filter never looks at are kept in `extra` so that a rewritten
/// code goes back with everything it arrived with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Code {
    pub channel: CodeChannel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_position: Option<u64>,
    #[serde(default)]
    pub flags: CodeFlags,
    #[serde(rename = "type")]
    pub kind: CodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_number: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor_number: Option<i8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<i64>,
    #[serde(default)]
    pub parameters: Vec<CodeParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Code {
    /// A bare G-code on the file channel, mostly useful for building fixtures.
    pub fn gcode(major_number: i32) -> Self {
        Self {
            channel: CodeChannel::File,
            file_position: None,
            flags: CodeFlags::empty(),
            kind: CodeType::GCode,
            major_number: Some(major_number),
            minor_number: None,
            line_number: None,
            parameters: Vec::new(),
            comment: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_parameter(mut self, letter: char, value: impl Into<ParameterValue>) -> Self {
        self.parameters.push(CodeParameter::new(letter, value));
        self
    }

    pub fn with_file_position(mut self, file_position: u64) -> Self {
        self.file_position = Some(file_position);
        self
    }

    pub fn with_flags(mut self, flags: CodeFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn parameter(&self, letter: char) -> Option<&CodeParameter> {
        self.parameters
            .iter()
            .find(|parameter| parameter.letter == letter)
    }

    pub fn has_parameter(&self, letter: char) -> bool {
        self.parameter(letter).is_some()
    }

    pub fn float(&self, letter: char) -> Option<f64> {
        self.parameter(letter)
            .and_then(|parameter| parameter.value.as_float())
    }

    pub fn is_from_macro(&self) -> bool {
        self.flags.contains(CodeFlags::IS_FROM_MACRO)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.letter())?;
        if let Some(major) = self.major_number {
            write!(f, "{major}")?;
            if let Some(minor) = self.minor_number {
                write!(f, ".{minor}")?;
            }
        }
        for parameter in &self.parameters {
            write!(f, " {}{}", parameter.letter, parameter.value)?;
        }
        if let Some(comment) = &self.comment {
            write!(f, " ;{comment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
