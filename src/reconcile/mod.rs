//! VLAN reconciliation for a single switch.
//!
//! Brings one device to the state "VLAN exists and every trunk carries it", issuing
//! configuration only for what is missing. Running it twice against the same device
//! issues no configuration the second time.

use crate::device::{CommandChannel, DeviceError, Switch};
use crate::models::{
    AllowedVlans, ReconcileReport, TrunkAction, TrunkResult, VlanAction, VlanEntry, VlanId,
    VlanTarget,
};
use crate::parsers;

fn has_vlan(vlans: &[VlanEntry], id: VlanId) -> bool {
    vlans.iter().any(|v| v.id == id)
}

/// Reconcile `target` on one switch and report what was observed and changed
pub fn reconcile<C: CommandChannel>(
    switch: &mut Switch<C>,
    target: &VlanTarget,
) -> Result<ReconcileReport, DeviceError> {
    let hostname = switch.get_hostname()?;
    let mut transactions = 0;

    // Step 1: VLAN existence
    let vlans = switch.get_vlans()?;
    let vlan = if has_vlan(&vlans, target.id) {
        tracing::debug!("{}: VLAN {} already exists", hostname, target.id);
        VlanAction::AlreadyPresent
    } else {
        tracing::debug!("{}: creating VLAN {} ({})", hostname, target.id, target.name);
        switch.create_vlan(target)?;
        transactions += 1;

        if !has_vlan(&switch.get_vlans()?, target.id) {
            return Err(DeviceError::VlanNotCreated(target.id));
        }
        VlanAction::Created
    };

    // Step 2: trunk propagation
    let interfaces = switch.get_interfaces()?;
    let (trunk_ports, other_ports): (Vec<_>, Vec<_>) =
        interfaces.into_iter().partition(|i| i.mode.is_trunk());

    let mut trunks = Vec::with_capacity(trunk_ports.len());
    for iface in trunk_ports {
        let fragment = switch.get_trunk_allowed(&iface.port)?;
        let allowed = parsers::parse_allowed_vlans(&fragment)?;

        let action = match allowed {
            AllowedVlans::Implicit => TrunkAction::ImplicitAllowAll,
            ref list if list.permits(target.id) => TrunkAction::AlreadyAllowed,
            _ => {
                tracing::debug!(
                    "{}: allowing VLAN {} on trunk {} (was {})",
                    hostname,
                    target.id,
                    iface.port,
                    allowed
                );
                switch.allow_on_trunk(&iface.port, target.id)?;
                transactions += 1;
                TrunkAction::Added
            }
        };
        tracing::debug!("{}: trunk {} -> {:?}", hostname, iface.port, action);

        trunks.push(TrunkResult {
            port: iface.port,
            action,
        });
    }

    Ok(ReconcileReport {
        hostname,
        vlan,
        trunks,
        skipped_ports: other_ports.len(),
        transactions,
    })
}
