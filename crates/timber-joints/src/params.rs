//! Typed joint parameters.
//!
//! A [`ParameterSet`] is derived by a joint definition from member geometry.
//! Each parameter keeps its geometry-derived default alongside the current
//! value; user overrides pin the value while defaults keep tracking geometry.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Length,
    Angle,
    Integer,
    Boolean,
    Enumeration,
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParamType::Length => "length",
            ParamType::Angle => "angle",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Enumeration => "enumeration",
        };
        f.write_str(s)
    }
}

/// A parameter value. Serialized as a bare JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl ParamValue {
    /// Numeric view of integers and numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Integer(i) => Some(*i as f64),
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            ParamValue::Bool(b) => format!("boolean {b}"),
            ParamValue::Integer(i) => format!("integer {i}"),
            ParamValue::Number(n) => format!("number {n}"),
            ParamValue::Text(s) => format!("text {s:?}"),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Integer(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("unknown parameter: {name}")]
    UnknownParameter { name: String },

    #[error("parameter {name} expects a {expected} value, got {found}")]
    TypeMismatch {
        name: String,
        expected: ParamType,
        found: String,
    },

    #[error("{value:?} is not an option of parameter {name}")]
    InvalidOption { name: String, value: String },

    #[error("parameter {name} must be finite")]
    NonFinite { name: String },

    #[error("duplicate parameter: {name}")]
    Duplicate { name: String },

    #[error("failed to encode parameters: {0}")]
    Encode(String),

    #[error("failed to decode parameters: {0}")]
    Decode(String),
}

fn default_group() -> String {
    "General".to_string()
}

/// One named, typed joint parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointParameter {
    pub name: String,
    pub param_type: ParamType,
    pub default_value: ParamValue,
    pub value: ParamValue,
    #[serde(default)]
    pub is_overridden: bool,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub enum_options: Vec<String>,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default)]
    pub description: String,
}

impl JointParameter {
    fn new(name: &str, param_type: ParamType, default: ParamValue) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            value: default.clone(),
            default_value: default,
            is_overridden: false,
            min_value: None,
            max_value: None,
            enum_options: Vec::new(),
            group: default_group(),
            description: String::new(),
        }
    }

    pub fn length(name: &str, default: f64) -> Self {
        Self::new(name, ParamType::Length, ParamValue::Number(default))
    }

    pub fn angle(name: &str, default: f64) -> Self {
        Self::new(name, ParamType::Angle, ParamValue::Number(default))
    }

    pub fn integer(name: &str, default: i64) -> Self {
        Self::new(name, ParamType::Integer, ParamValue::Integer(default))
    }

    pub fn boolean(name: &str, default: bool) -> Self {
        Self::new(name, ParamType::Boolean, ParamValue::Bool(default))
    }

    pub fn enumeration(name: &str, default: &str, options: &[&str]) -> Self {
        let mut p = Self::new(name, ParamType::Enumeration, ParamValue::from(default));
        p.enum_options = options.iter().map(|o| o.to_string()).collect();
        p
    }

    /// Set both bounds and pull the default into range. A maximum below the
    /// minimum is raised to the minimum.
    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max.max(min));
        self.reclamp_default();
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min_value = Some(min);
        if let Some(max) = self.max_value {
            self.max_value = Some(max.max(min));
        }
        self.reclamp_default();
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max_value = Some(self.min_value.map_or(max, |min| max.max(min)));
        self.reclamp_default();
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = group.to_string();
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    fn reclamp_default(&mut self) {
        self.default_value = self.clamp(self.default_value.clone());
        if !self.is_overridden {
            self.value = self.default_value.clone();
        }
    }

    fn clamp_f64(&self, v: f64) -> f64 {
        let mut v = v;
        if let Some(min) = self.min_value {
            v = v.max(min);
        }
        if let Some(max) = self.max_value {
            v = v.min(max);
        }
        v
    }

    /// Clamp a numeric value into the parameter's bounds; other kinds pass
    /// through.
    fn clamp(&self, value: ParamValue) -> ParamValue {
        match value {
            ParamValue::Number(n) => ParamValue::Number(self.clamp_f64(n)),
            ParamValue::Integer(i) => {
                let clamped = self.clamp_f64(i as f64);
                if clamped == i as f64 {
                    ParamValue::Integer(i)
                } else {
                    ParamValue::Integer(clamped.round() as i64)
                }
            }
            other => other,
        }
    }

    /// Check `value` against the parameter type, normalizing compatible
    /// numeric forms.
    fn coerce(&self, value: ParamValue) -> Result<ParamValue, ParamError> {
        let mismatch = |v: &ParamValue| ParamError::TypeMismatch {
            name: self.name.clone(),
            expected: self.param_type,
            found: v.describe(),
        };
        let non_finite = || ParamError::NonFinite {
            name: self.name.clone(),
        };

        match self.param_type {
            ParamType::Length | ParamType::Angle => {
                let n = value.as_f64().ok_or_else(|| mismatch(&value))?;
                if !n.is_finite() {
                    return Err(non_finite());
                }
                Ok(ParamValue::Number(n))
            }
            ParamType::Integer => match value {
                ParamValue::Integer(i) => Ok(ParamValue::Integer(i)),
                ParamValue::Number(n) if !n.is_finite() => Err(non_finite()),
                ParamValue::Number(n) if n.fract() == 0.0 => Ok(ParamValue::Integer(n as i64)),
                other => Err(mismatch(&other)),
            },
            ParamType::Boolean => match value {
                ParamValue::Bool(b) => Ok(ParamValue::Bool(b)),
                other => Err(mismatch(&other)),
            },
            ParamType::Enumeration => match value {
                ParamValue::Text(s) => {
                    if self.enum_options.is_empty() || self.enum_options.contains(&s) {
                        Ok(ParamValue::Text(s))
                    } else {
                        Err(ParamError::InvalidOption {
                            name: self.name.clone(),
                            value: s,
                        })
                    }
                }
                other => Err(mismatch(&other)),
            },
        }
    }
}

/// Ordered, unique-keyed collection of joint parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(into = "Vec<JointParameter>", try_from = "Vec<JointParameter>")]
pub struct ParameterSet {
    params: Vec<JointParameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter, rejecting duplicate names.
    pub fn insert(&mut self, param: JointParameter) -> Result<(), ParamError> {
        if self.contains(&param.name) {
            return Err(ParamError::Duplicate { name: param.name });
        }
        self.params.push(param);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&JointParameter> {
        self.params.iter().find(|p| p.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut JointParameter, ParamError> {
        self.params
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| ParamError::UnknownParameter {
                name: name.to_string(),
            })
    }

    pub fn param(&self, name: &str) -> Result<&JointParameter, ParamError> {
        self.get(name).ok_or_else(|| ParamError::UnknownParameter {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Parameters in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &JointParameter> {
        self.params.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// True when both sets hold exactly the same parameter names.
    pub fn same_keys(&self, other: &ParameterSet) -> bool {
        self.names().collect::<BTreeSet<_>>() == other.names().collect::<BTreeSet<_>>()
    }

    /// Current value of a length, angle or integer parameter.
    pub fn number(&self, name: &str) -> Result<f64, ParamError> {
        let p = self.param(name)?;
        p.value.as_f64().ok_or_else(|| ParamError::TypeMismatch {
            name: name.to_string(),
            expected: p.param_type,
            found: p.value.describe(),
        })
    }

    pub fn integer(&self, name: &str) -> Result<i64, ParamError> {
        let p = self.param(name)?;
        p.value.as_i64().ok_or_else(|| ParamError::TypeMismatch {
            name: name.to_string(),
            expected: ParamType::Integer,
            found: p.value.describe(),
        })
    }

    pub fn flag(&self, name: &str) -> Result<bool, ParamError> {
        let p = self.param(name)?;
        p.value.as_bool().ok_or_else(|| ParamError::TypeMismatch {
            name: name.to_string(),
            expected: ParamType::Boolean,
            found: p.value.describe(),
        })
    }

    pub fn text(&self, name: &str) -> Result<&str, ParamError> {
        let p = self.param(name)?;
        p.value.as_str().ok_or_else(|| ParamError::TypeMismatch {
            name: name.to_string(),
            expected: ParamType::Enumeration,
            found: p.value.describe(),
        })
    }

    pub fn is_overridden(&self, name: &str) -> bool {
        self.get(name).is_some_and(|p| p.is_overridden)
    }

    /// Pin a user value. The value is type-checked and clamped into bounds.
    pub fn set_override(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError> {
        let param = self.get_mut(name)?;
        let value = param.coerce(value)?;
        param.value = param.clamp(value);
        param.is_overridden = true;
        Ok(())
    }

    /// Drop a user value and return to the derived default.
    pub fn clear_override(&mut self, name: &str) -> Result<(), ParamError> {
        let param = self.get_mut(name)?;
        param.value = param.default_value.clone();
        param.is_overridden = false;
        Ok(())
    }

    /// Refresh derived defaults. Overridden values are left untouched;
    /// names not in the set are ignored.
    pub fn update_defaults<'a, I>(&mut self, defaults: I)
    where
        I: IntoIterator<Item = (&'a str, &'a ParamValue)>,
    {
        for (name, default) in defaults {
            if let Ok(param) = self.get_mut(name) {
                param.default_value = default.clone();
                if !param.is_overridden {
                    param.value = default.clone();
                }
            }
        }
    }

    /// Refresh defaults and bounds from a freshly derived set of the same
    /// joint. Overridden values are kept but pulled into the new bounds.
    pub fn refresh_from(&mut self, fresh: &ParameterSet) {
        for derived in &fresh.params {
            let Ok(param) = self.get_mut(&derived.name) else {
                continue;
            };
            param.min_value = derived.min_value;
            param.max_value = derived.max_value;
            param.default_value = derived.default_value.clone();
            param.value = if param.is_overridden {
                param.clamp(param.value.clone())
            } else {
                derived.default_value.clone()
            };
        }
    }

    /// (name, default) pairs in definition order.
    pub fn defaults(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params
            .iter()
            .map(|p| (p.name.as_str(), &p.default_value))
    }

    pub fn to_json(&self) -> Result<String, ParamError> {
        serde_json::to_string(self).map_err(|e| ParamError::Encode(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, ParamError> {
        serde_json::from_str(json).map_err(|e| ParamError::Decode(e.to_string()))
    }
}

impl FromIterator<JointParameter> for ParameterSet {
    /// Later parameters with a repeated name replace the earlier entry in
    /// place.
    fn from_iter<T: IntoIterator<Item = JointParameter>>(iter: T) -> Self {
        let mut set = ParameterSet::new();
        for param in iter {
            match set.params.iter_mut().find(|p| p.name == param.name) {
                Some(existing) => *existing = param,
                None => set.params.push(param),
            }
        }
        set
    }
}

impl From<ParameterSet> for Vec<JointParameter> {
    fn from(set: ParameterSet) -> Self {
        set.params
    }
}

impl TryFrom<Vec<JointParameter>> for ParameterSet {
    type Error = ParamError;

    fn try_from(params: Vec<JointParameter>) -> Result<Self, Self::Error> {
        let mut set = ParameterSet::new();
        for param in params {
            set.insert(param)?;
        }
        Ok(set)
    }
}
