//! Display ordering of a technician's work queue.

use std::cmp::Ordering;

use crate::models::journey::{Journey, JourneyStatus, QcStatus};

/// Priority units first, then QC-failed rework, then in-progress before
/// assigned, then oldest assignment. Barcode breaks remaining ties so the
/// order is stable across requests.
pub fn queue_order(a: &Journey, b: &Journey) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| is_rework(b).cmp(&is_rework(a)))
        .then_with(|| stage_rank(a).cmp(&stage_rank(b)))
        .then_with(|| match (a.assigned_at, b.assigned_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.barcode.cmp(&b.barcode))
}

pub fn sort_queue(units: &mut [Journey]) {
    units.sort_by(queue_order);
}

fn is_rework(j: &Journey) -> bool {
    j.qc_status == QcStatus::Failed
}

fn stage_rank(j: &Journey) -> u8 {
    match j.current_status {
        JourneyStatus::InProgress => 0,
        JourneyStatus::Assigned => 1,
        _ => 2,
    }
}
