use gbal_core::{GbalResult, Network};

/// Private copy of a variant, checked out for the duration of a run.
///
/// The copy becomes the working variant. `commit` writes it back onto the
/// original variant, `rollback` resets it from the original. When the guard
/// is finished or dropped the caller's working variant is selected again and
/// the copy is removed.
pub struct WorkingCopy<'a> {
    network: &'a mut Network,
    original: String,
    copy: String,
    caller_variant: String,
    released: bool,
}

impl<'a> WorkingCopy<'a> {
    pub fn check_out(network: &'a mut Network, original: &str) -> GbalResult<Self> {
        let caller_variant = network.working_variant_id().to_string();
        let copy = format!("{} COPY", original);
        network.clone_variant(original, &copy, true)?;
        network.set_working_variant(&copy)?;
        tracing::debug!(variant = %original, copy = %copy, "working copy checked out");
        Ok(Self {
            network,
            original: original.to_string(),
            copy,
            caller_variant,
            released: false,
        })
    }

    pub fn network(&self) -> &Network {
        &*self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut *self.network
    }

    pub fn variant_id(&self) -> &str {
        &self.copy
    }

    pub fn commit(&mut self) -> GbalResult<()> {
        self.network.clone_variant(&self.copy, &self.original, true)
    }

    pub fn rollback(&mut self) -> GbalResult<()> {
        self.network.clone_variant(&self.original, &self.copy, true)
    }

    /// Restore the caller's working variant and drop the copy.
    pub fn finish(mut self) -> GbalResult<()> {
        self.release()
    }

    fn release(&mut self) -> GbalResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.network.set_working_variant(&self.caller_variant)?;
        self.network.remove_variant(&self.copy)
    }
}

impl Drop for WorkingCopy<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!(copy = %self.copy, error = %err, "working copy cleanup failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fr_be_network;
    use gbal_core::{GenId, Megawatts, INITIAL_VARIANT_ID};

    fn target(network: &Network) -> f64 {
        network.gen(GenId::new(1)).unwrap().active_power.value()
    }

    fn bump(copy: &mut WorkingCopy<'_>) {
        copy.network_mut().gen_mut(GenId::new(1)).unwrap().active_power = Megawatts(3500.0);
    }

    #[test]
    fn rollback_then_commit() {
        let mut network = fr_be_network();
        let mut copy = WorkingCopy::check_out(&mut network, INITIAL_VARIANT_ID).unwrap();
        assert_eq!(copy.variant_id(), "InitialState COPY");
        bump(&mut copy);
        copy.rollback().unwrap();
        assert_eq!(target(copy.network()), 3000.0);

        bump(&mut copy);
        copy.commit().unwrap();
        copy.finish().unwrap();

        assert_eq!(network.working_variant_id(), INITIAL_VARIANT_ID);
        assert_eq!(network.variant_ids(), vec![INITIAL_VARIANT_ID.to_string()]);
        assert_eq!(target(&network), 3500.0);
    }

    #[test]
    fn dropping_restores_caller_variant() {
        let mut network = fr_be_network();
        network.clone_variant(INITIAL_VARIANT_ID, "study", false).unwrap();
        {
            let mut copy = WorkingCopy::check_out(&mut network, "study").unwrap();
            bump(&mut copy);
        }
        assert_eq!(network.working_variant_id(), INITIAL_VARIANT_ID);
        assert!(!network.has_variant("study COPY"));
        network.set_working_variant("study").unwrap();
        assert_eq!(target(&network), 3000.0);
    }
}
