//! Events and tuples for opened and closed fault records.

use rt_graph::{FaultState, VehicleFaultRecord, ZoneFaultRecord};

use crate::event::{keys, EventKind, OutboundEvent};
use crate::sink::Tuple;

pub fn zone_off_event(fab: &str, fac_id: &str, r: &ZoneFaultRecord) -> OutboundEvent {
    let event = OutboundEvent::new(EventKind::ZoneOff)
        .with(keys::FAB_ID, fab)
        .with(keys::FAC_ID, fac_id)
        .with(keys::AREA, &r.area)
        .with(keys::MACHINE_ID, &r.alarm_code)
        .with(keys::STATE, r.state.as_str())
        .with(keys::ALARM_CD, &r.error_code)
        .with(keys::ADDR_LST, r.addresses.join(","))
        .with(keys::PORT_LST, r.ports.join(","))
        .with(keys::EVENT_DT, r.opened_at.0);
    match r.recovered_at {
        Some(at) => event.with(keys::RECOVERY_DT, at.0),
        None => event,
    }
}

pub fn zone_off_tuple(fab: &str, r: &ZoneFaultRecord) -> Tuple {
    let tuple = Tuple::new()
        .with("fab_id", fab)
        .with("area", r.area.as_str())
        .with("zone", r.zone.0)
        .with("alarm_code", r.alarm_code.as_str())
        .with("error_code", r.error_code.as_str())
        .with("event_ms", r.opened_at.0)
        .with("addresses", r.addresses.join(","))
        .with("ports", r.ports.join(","))
        .with("state", r.state.as_str());
    recovery(tuple, r.state, r.recovered_at.map(|m| m.0))
}

pub fn vehicle_off_event(fab: &str, fac_id: &str, r: &VehicleFaultRecord) -> OutboundEvent {
    let event = OutboundEvent::new(EventKind::VehicleOff)
        .with(keys::FAB_ID, fab)
        .with(keys::FAC_ID, fac_id)
        .with(keys::AREA, &r.area)
        .with(keys::MACHINE_ID, &r.vehicle_name)
        .with(keys::STATE, r.state.as_str())
        .with(keys::ALARM_CD, &r.error_code)
        .with(keys::VALUE, &r.device_id)
        .with(keys::ADDR_LST, r.addresses.join(","))
        .with(keys::PORT_LST, r.ports.join(","))
        .with(keys::EVENT_DT, r.opened_at.0);
    match r.recovered_at {
        Some(at) => event.with(keys::RECOVERY_DT, at.0),
        None => event,
    }
}

pub fn vehicle_off_tuple(fab: &str, r: &VehicleFaultRecord) -> Tuple {
    let tuple = Tuple::new()
        .with("fab_id", fab)
        .with("area", r.area.as_str())
        .with("vehicle", r.vehicle_name.as_str())
        .with("device_id", r.device_id.as_str())
        .with("error_code", r.error_code.as_str())
        .with("address", r.address)
        .with("next_address", r.next_address)
        .with("event_ms", r.opened_at.0)
        .with("addresses", r.addresses.join(","))
        .with("ports", r.ports.join(","))
        .with("state", r.state.as_str());
    recovery(tuple, r.state, r.recovered_at.map(|m| m.0))
}

fn recovery(tuple: Tuple, state: FaultState, at: Option<u64>) -> Tuple {
    match (state, at) {
        (FaultState::Normal, Some(ms)) => tuple.with("recovery_ms", ms),
        _ => tuple.with("recovery_ms", ""),
    }
}
