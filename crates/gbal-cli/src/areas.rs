//! Area definitions read by `gbal balance` and `gbal net-position`.
//!
//! ```json
//! {
//!   "areas": [
//!     { "name": "FR", "boundary": { "countries": ["FR"] },
//!       "scalable": { "generator": 1 }, "targetNetPosition": 1300.0 },
//!     { "name": "BE", "boundary": { "voltageLevels": ["VL_BE"] }, "static": true,
//!       "scalable": "conformLoads", "targetNetPosition": -1300.0 }
//!   ]
//! }
//! ```

use anyhow::{anyhow, bail, Context, Result};
use gbal_algo::{
    conform_load_scalable, BalanceComputationArea, ControlAreaDescriptor, ControlAreaFactory,
    CountryAreaFactory, GeneratorScalable, LoadScalable, NetworkAreaFactory,
    ProportionalScalable, Scalable, VoltageLevelsAreaFactory,
};
use gbal_core::{Country, GenId, LoadId, Network};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreasConfig {
    pub areas: Vec<AreaConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaConfig {
    pub name: String,
    pub boundary: BoundaryConfig,
    /// Measure from injections, with membership frozen at creation
    #[serde(default, rename = "static")]
    pub is_static: bool,
    pub scalable: ScalableConfig,
    #[serde(default)]
    pub target_net_position: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoundaryConfig {
    Countries(Vec<Country>),
    VoltageLevels(Vec<String>),
    #[serde(rename_all = "camelCase")]
    ControlArea {
        #[serde(default)]
        descriptor: Option<ControlAreaDescriptor>,
        #[serde(default)]
        voltage_levels: Vec<String>,
        #[serde(default)]
        excluded_xnodes: Vec<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalableConfig {
    Generator(usize),
    Load(usize),
    Proportional(Vec<ProportionalEntry>),
    /// Conform loads of the area, weighted by P0
    ConformLoads,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProportionalEntry {
    pub percentage: f64,
    pub scalable: ScalableConfig,
}

impl AreasConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AreasConfig = serde_json::from_str(json).context("parsing areas JSON")?;
        if config.areas.is_empty() {
            bail!("no area defined");
        }
        Ok(config)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading areas {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("loading areas {}", path.display()))
    }

    /// Resolve every area against `network`.
    pub fn build(&self, network: &Network) -> Result<Vec<BalanceComputationArea>> {
        self.areas
            .iter()
            .map(|area| area.build(network).with_context(|| format!("area '{}'", area.name)))
            .collect()
    }
}

impl AreaConfig {
    pub fn factory(&self) -> Result<Arc<dyn NetworkAreaFactory>> {
        let factory: Arc<dyn NetworkAreaFactory> = match &self.boundary {
            BoundaryConfig::Countries(countries) => {
                let factory = CountryAreaFactory::new(countries.iter().cloned())?;
                Arc::new(if self.is_static {
                    factory.as_static()
                } else {
                    factory
                })
            }
            BoundaryConfig::VoltageLevels(ids) => {
                let factory = VoltageLevelsAreaFactory::new(ids.iter().cloned())?;
                Arc::new(if self.is_static {
                    factory.as_static()
                } else {
                    factory
                })
            }
            BoundaryConfig::ControlArea {
                descriptor,
                voltage_levels,
                excluded_xnodes,
            } => {
                if self.is_static {
                    bail!("control areas are measured from tie flows and cannot be static");
                }
                Arc::new(
                    ControlAreaFactory::new(descriptor.clone(), voltage_levels.iter().cloned())?
                        .excluding_xnodes(excluded_xnodes.iter().cloned()),
                )
            }
        };
        Ok(factory)
    }

    pub fn build(&self, network: &Network) -> Result<BalanceComputationArea> {
        if !self.target_net_position.is_finite() {
            bail!("target net position must be finite");
        }
        let factory = self.factory()?;
        let scalable = build_scalable(&self.scalable, factory.as_ref(), network)?;
        Ok(BalanceComputationArea::new(
            self.name.clone(),
            factory,
            scalable,
            self.target_net_position,
        ))
    }
}

fn build_scalable(
    config: &ScalableConfig,
    factory: &dyn NetworkAreaFactory,
    network: &Network,
) -> Result<Arc<dyn Scalable>> {
    let scalable: Arc<dyn Scalable> = match config {
        ScalableConfig::Generator(id) => {
            let id = GenId::new(*id);
            network
                .gen(id)
                .ok_or_else(|| anyhow!("unknown generator {}", id))?;
            Arc::new(GeneratorScalable::new(id))
        }
        ScalableConfig::Load(id) => {
            let id = LoadId::new(*id);
            network
                .load(id)
                .ok_or_else(|| anyhow!("unknown load {}", id))?;
            Arc::new(LoadScalable::new(id))
        }
        ScalableConfig::Proportional(entries) => {
            let percentages = entries.iter().map(|e| e.percentage).collect();
            let scalables = entries
                .iter()
                .map(|e| build_scalable(&e.scalable, factory, network))
                .collect::<Result<Vec<_>>>()?;
            Arc::new(ProportionalScalable::new(percentages, scalables)?)
        }
        ScalableConfig::ConformLoads => {
            let area = factory.create(network)?;
            Arc::new(conform_load_scalable(area.as_ref(), network)?)
        }
    };
    Ok(scalable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbal_algo::test_utils::fr_be_network;

    #[test]
    fn every_boundary_kind_parses() {
        let config = AreasConfig::from_json_str(
            r#"{
                "areas": [
                    { "name": "FR", "boundary": { "countries": ["FR"] },
                      "scalable": { "generator": 1 }, "targetNetPosition": 1300.0 },
                    { "name": "BE", "boundary": { "voltageLevels": ["VL_BE"] }, "static": true,
                      "scalable": { "proportional": [
                          { "percentage": 60.0, "scalable": { "generator": 2 } },
                          { "percentage": 40.0, "scalable": "conformLoads" }
                      ] } },
                    { "name": "CA", "boundary": { "controlArea": {
                          "voltageLevels": ["VL_FR"], "excludedXnodes": ["XFR_ES"] } },
                      "scalable": { "load": 1 } }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.areas.len(), 3);
        assert!(config.areas[1].is_static);
        assert_eq!(config.areas[2].target_net_position, 0.0);

        let areas = config.build(&fr_be_network()).unwrap();
        assert_eq!(areas[0].name(), "FR");
        assert_eq!(areas[0].target_net_position(), 1300.0);
    }

    #[test]
    fn unknown_injections_are_reported_with_the_area() {
        let config = AreasConfig::from_json_str(
            r#"{ "areas": [ { "name": "FR", "boundary": { "countries": ["FR"] },
                              "scalable": { "generator": 42 } } ] }"#,
        )
        .unwrap();
        let err = config.build(&fr_be_network()).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("area 'FR'"));
        assert!(message.contains("Gen#42"));
    }

    #[test]
    fn invalid_definitions_are_rejected() {
        assert!(AreasConfig::from_json_str(r#"{ "areas": [] }"#).is_err());
        assert!(AreasConfig::from_json_str(
            r#"{ "areas": [ { "name": "X", "boundary": { "countries": ["fr"] },
                              "scalable": { "generator": 1 } } ] }"#
        )
        .is_err());

        let config = AreasConfig::from_json_str(
            r#"{ "areas": [ { "name": "CA", "static": true,
                              "boundary": { "controlArea": { "voltageLevels": ["VL_FR"] } },
                              "scalable": { "generator": 1 } } ] }"#,
        )
        .unwrap();
        assert!(config.build(&fr_be_network()).is_err());
    }
}
