use crate::model::Status;
use crate::normalize::{filing_status_equivalent, NormalizedValue, ValueKind};

/// The four presence facts for one (employee, field) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presence {
    pub employee_on_a: bool,
    pub employee_on_b: bool,
    pub column_on_a: bool,
    pub column_on_b: bool,
}

/// Presence-only statuses, in priority order. `None` means both values
/// are available and must be compared.
pub fn classify_presence(p: Presence) -> Option<Status> {
    if !p.employee_on_a {
        return Some(Status::EmployeeMissingOnA);
    }
    if !p.employee_on_b {
        return Some(Status::EmployeeMissingOnB);
    }
    if !p.column_on_a {
        return Some(Status::ColumnMissingOnA);
    }
    if !p.column_on_b {
        return Some(Status::ColumnMissingOnB);
    }
    None
}

/// Outcome of comparing two normalized values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: Status,
    /// Comparison value on side A; a blank that took the numeric default shows the default.
    pub value_a: String,
    pub value_b: String,
    pub rule: String,
    /// Classified conservatively; the caller should raise a warning.
    pub ambiguous: bool,
}

/// Compare two normalized values of one kind.
///
/// Blank vs blank matches. A blank on one side takes the kind's default
/// (`0.00`, `0`) and matches when that equals the other side; otherwise it is
/// a missing value on the blank side, never a mismatch.
pub fn compare_values(kind: ValueKind, a: &NormalizedValue, b: &NormalizedValue) -> Verdict {
    let k = kind.label();

    if a.blank && b.blank {
        return verdict(Status::Match, "", "", format!("{k}: both blank"));
    }

    if a.blank || b.blank {
        let default = kind.blank_default();
        let side_a = if a.blank { default } else { Some(a.value.as_str()) };
        let side_b = if b.blank { default } else { Some(b.value.as_str()) };
        if let (Some(va), Some(vb), Some(d)) = (side_a, side_b, default) {
            if va == vb {
                return verdict(Status::Match, va, vb, format!("{k}: blank treated as {d}"));
            }
        }
        let status = if a.blank { Status::ValueMissingOnA } else { Status::ValueMissingOnB };
        return verdict(status, &a.value, &b.value, format!("{k}: one side blank"));
    }

    if a.value == b.value {
        return verdict(Status::Match, &a.value, &b.value, format!("{k}: normalized values equal"));
    }

    if kind == ValueKind::FilingStatus {
        if a.untranslated || b.untranslated {
            let mut v = verdict(
                Status::Mismatch,
                &a.value,
                &b.value,
                format!("{k}: code not found in filing status dictionary"),
            );
            v.ambiguous = true;
            return v;
        }
        if filing_status_equivalent(&a.value, &b.value) {
            return verdict(
                Status::Match,
                &a.value,
                &b.value,
                format!("{k}: substring match (case/punct-insensitive)"),
            );
        }
    }

    verdict(Status::Mismatch, &a.value, &b.value, format!("{k}: values differ"))
}

fn verdict(status: Status, value_a: &str, value_b: &str, rule: String) -> Verdict {
    Verdict {
        status,
        value_a: value_a.to_string(),
        value_b: value_b.to_string(),
        rule,
        ambiguous: false,
    }
}
