use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use strum::{Display, EnumString, IntoStaticStr};

use crate::Result;

/// Declared type of a recorded value
#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, IntoStaticStr,
    PartialEq, Eq,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Datatype {
    Int,
    Float,
    Str,
    List,
}

/// A measured value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ObservationValue {
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<f64>),
}

impl ObservationValue {
    /// Datatype matching this value
    pub fn datatype(&self) -> Datatype {
        match self {
            Self::Int(_) => Datatype::Int,
            Self::Float(_) => Datatype::Float,
            Self::Text(_) => Datatype::Str,
            Self::List(_) => Datatype::List,
        }
    }

    /// Numeric view of scalar values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) | Self::List(_) => None,
        }
    }
}

/// One recorded trait measurement.
///
/// Field order mirrors the results format consumed downstream and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Observation {
    pub sample: String,
    pub variable: String,
    #[serde(rename = "trait")]
    pub trait_name: String,
    pub method: String,
    pub scale: String,
    pub datatype: Datatype,
    pub value: ObservationValue,
    pub label: String,
}

/// Insertion-ordered store of observations for one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outputs {
    observations: Vec<Observation>,
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation, replacing any earlier value for the same sample and variable
    pub fn add_observation(&mut self, observation: Observation) {
        match self
            .observations
            .iter_mut()
            .find(|o| o.sample == observation.sample && o.variable == observation.variable)
        {
            Some(existing) => *existing = observation,
            None => self.observations.push(observation),
        }
    }

    pub fn get(&self, sample: &str, variable: &str) -> Option<&Observation> {
        self.observations
            .iter()
            .find(|o| o.sample == sample && o.variable == variable)
    }

    /// All observations recorded for one sample, in insertion order
    pub fn observations_for<'a>(&'a self, sample: &'a str) -> impl Iterator<Item = &'a Observation> + 'a {
        self.observations.iter().filter(move |o| o.sample == sample)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn clear(&mut self) {
        self.observations.clear();
    }

    /// Results document grouped as `{"observations": {sample: {variable: {...}}}}`
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut samples = serde_json::Map::new();

        for observation in &self.observations {
            let record = serde_json::json!({
                "trait": observation.trait_name,
                "method": observation.method,
                "scale": observation.scale,
                "datatype": observation.datatype,
                "value": serde_json::to_value(&observation.value)?,
                "label": observation.label,
            });

            let variables = samples
                .entry(observation.sample.clone())
                .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
            if let serde_json::Value::Object(variables) = variables {
                variables.insert(observation.variable.clone(), record);
            }
        }

        Ok(serde_json::json!({ "observations": samples }))
    }

    /// Write the grouped results document to a JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.to_json()?)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(sample: &str, variable: &str, value: ObservationValue) -> Observation {
        Observation {
            sample: sample.to_string(),
            variable: variable.to_string(),
            trait_name: format!("{variable} trait"),
            method: "test".to_string(),
            scale: "pixels".to_string(),
            datatype: Datatype::Float,
            value,
            label: "none".to_string(),
        }
    }

    #[test]
    fn test_add_and_get_observation() {
        let mut outputs = Outputs::new();
        outputs.add_observation(observation("plant", "area", ObservationValue::Float(10.5)));

        let stored = outputs.get("plant", "area").unwrap();
        assert_eq!(stored.value.as_f64(), Some(10.5));
        assert!(outputs.get("plant", "height").is_none());
    }

    #[test]
    fn test_repeated_variable_overwrites() {
        let mut outputs = Outputs::new();
        outputs.add_observation(observation("plant", "area", ObservationValue::Int(1)));
        outputs.add_observation(observation("plant", "width", ObservationValue::Int(2)));
        outputs.add_observation(observation("plant", "area", ObservationValue::Int(3)));

        assert_eq!(outputs.len(), 2);
        let variables: Vec<&str> = outputs.iter().map(|o| o.variable.as_str()).collect();
        assert_eq!(variables, vec!["area", "width"]);
        assert_eq!(outputs.get("plant", "area").unwrap().value, ObservationValue::Int(3));
    }

    #[test]
    fn test_results_document_grouping() {
        let mut outputs = Outputs::new();
        outputs.add_observation(observation("a", "area", ObservationValue::Int(5)));
        outputs.add_observation(observation("b", "area", ObservationValue::Float(2.5)));

        let json = outputs.to_json().unwrap();
        assert_eq!(json["observations"]["a"]["area"]["value"], 5);
        assert_eq!(json["observations"]["b"]["area"]["value"], 2.5);
        assert_eq!(json["observations"]["a"]["area"]["trait"], "area trait");
        assert_eq!(json["observations"]["a"]["area"]["datatype"], "float");
        assert_eq!(outputs.observations_for("a").count(), 1);
    }

    #[test]
    fn test_observation_serializes_trait_field() {
        let obs = observation("a", "height", ObservationValue::List(vec![1.0, 2.0]));
        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["trait"], "height trait");
        assert_eq!(json["value"], serde_json::json!([1.0, 2.0]));
        assert!(obs.value.as_f64().is_none());
    }
}
