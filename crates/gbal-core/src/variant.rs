//! Named state variants.
//!
//! A variant is a full copy of the network state. The working variant lives in
//! [`Network::graph`]; the others are parked and swapped in by
//! [`Network::set_working_variant`]. All variants share the same structure, so
//! node and edge indices stay valid across a switch.

use crate::{Edge, GbalError, GbalResult, Network, Node};
use petgraph::{Graph, Undirected};

/// Name of the variant every network starts with.
pub const INITIAL_VARIANT_ID: &str = "InitialState";

impl Network {
    pub fn working_variant_id(&self) -> &str {
        &self.working_variant
    }

    /// All variant ids, sorted.
    pub fn variant_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.parked_variants.keys().cloned().collect();
        ids.push(self.working_variant.clone());
        ids.sort();
        ids
    }

    pub fn has_variant(&self, id: &str) -> bool {
        id == self.working_variant || self.parked_variants.contains_key(id)
    }

    fn snapshot(&self, id: &str) -> GbalResult<Graph<Node, Edge, Undirected>> {
        if id == self.working_variant {
            return Ok(self.graph.clone());
        }
        self.parked_variants
            .get(id)
            .cloned()
            .ok_or_else(|| unknown_variant(id))
    }

    /// Copy the state of `source` into `target`.
    ///
    /// `target` is created when missing; an existing target is replaced only
    /// when `overwrite` is set.
    pub fn clone_variant(&mut self, source: &str, target: &str, overwrite: bool) -> GbalResult<()> {
        if source == target {
            return Err(GbalError::Variant(format!(
                "cannot clone variant '{}' onto itself",
                source
            )));
        }
        if target.is_empty() {
            return Err(GbalError::Variant("variant id must not be empty".into()));
        }
        if self.has_variant(target) && !overwrite {
            return Err(GbalError::Variant(format!(
                "variant '{}' already exists",
                target
            )));
        }
        let state = self.snapshot(source)?;
        if target == self.working_variant {
            self.graph = state;
        } else {
            self.parked_variants.insert(target.to_string(), state);
        }
        Ok(())
    }

    pub fn set_working_variant(&mut self, id: &str) -> GbalResult<()> {
        if id == self.working_variant {
            return Ok(());
        }
        let incoming = self
            .parked_variants
            .remove(id)
            .ok_or_else(|| unknown_variant(id))?;
        let outgoing = std::mem::replace(&mut self.graph, incoming);
        let previous = std::mem::replace(&mut self.working_variant, id.to_string());
        self.parked_variants.insert(previous, outgoing);
        Ok(())
    }

    /// Remove a parked variant. The working variant cannot be removed.
    pub fn remove_variant(&mut self, id: &str) -> GbalResult<()> {
        if id == self.working_variant {
            return Err(GbalError::Variant(format!(
                "cannot remove working variant '{}'",
                id
            )));
        }
        self.parked_variants
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| unknown_variant(id))
    }

    /// Run `f` with `id` as the working variant, then switch back.
    pub fn with_working_variant<T>(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut Network) -> T,
    ) -> GbalResult<T> {
        let previous = self.working_variant.clone();
        self.set_working_variant(id)?;
        let out = f(self);
        self.set_working_variant(&previous)?;
        Ok(out)
    }
}

fn unknown_variant(id: &str) -> GbalError {
    GbalError::Variant(format!("unknown variant '{}'", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bus, BusId, Gen, GenId, Megawatts};

    fn network() -> Network {
        let mut network = Network::new("variants");
        network.add_bus(Bus::new(BusId::new(1), "B1", "VL1")).unwrap();
        network
            .add_gen(Gen::new(GenId::new(1), "G1".into(), BusId::new(1)).with_target_p(10.0))
            .unwrap();
        network
    }

    fn target_p(network: &Network) -> f64 {
        network.gen(GenId::new(1)).unwrap().active_power.value()
    }

    #[test]
    fn clone_and_switch_keeps_states_independent() {
        let mut network = network();
        network.clone_variant(INITIAL_VARIANT_ID, "copy", false).unwrap();
        network.set_working_variant("copy").unwrap();
        network.gen_mut(GenId::new(1)).unwrap().active_power = Megawatts(25.0);

        network.set_working_variant(INITIAL_VARIANT_ID).unwrap();
        assert_eq!(target_p(&network), 10.0);
        network.set_working_variant("copy").unwrap();
        assert_eq!(target_p(&network), 25.0);
        assert_eq!(network.variant_ids(), vec!["InitialState", "copy"]);
    }

    #[test]
    fn clone_onto_working_variant_replaces_its_state() {
        let mut network = network();
        network.clone_variant(INITIAL_VARIANT_ID, "copy", false).unwrap();
        network
            .with_working_variant("copy", |n| {
                n.gen_mut(GenId::new(1)).unwrap().active_power = Megawatts(40.0);
            })
            .unwrap();
        network.clone_variant("copy", INITIAL_VARIANT_ID, true).unwrap();
        assert_eq!(network.working_variant_id(), INITIAL_VARIANT_ID);
        assert_eq!(target_p(&network), 40.0);
    }

    #[test]
    fn duplicate_without_overwrite_is_rejected() {
        let mut network = network();
        network.clone_variant(INITIAL_VARIANT_ID, "copy", false).unwrap();
        let err = network
            .clone_variant(INITIAL_VARIANT_ID, "copy", false)
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
        network.clone_variant(INITIAL_VARIANT_ID, "copy", true).unwrap();
    }

    #[test]
    fn working_variant_cannot_be_removed() {
        let mut network = network();
        assert!(network.remove_variant(INITIAL_VARIANT_ID).is_err());
        assert!(network.remove_variant("missing").is_err());
        assert!(network.set_working_variant("missing").is_err());
    }

    #[test]
    fn structure_is_frozen_while_variants_exist() {
        let mut network = network();
        network.clone_variant(INITIAL_VARIANT_ID, "copy", false).unwrap();
        assert!(network.add_bus(Bus::new(BusId::new(2), "B2", "VL2")).is_err());
        network.remove_variant("copy").unwrap();
        assert!(network.add_bus(Bus::new(BusId::new(2), "B2", "VL2")).is_ok());
    }
}
