use crate::schema::FiscalAggregate;
use crate::utils::format_brl;
use std::collections::BTreeMap;

/// Copies `form`, overwriting every field the aggregate also carries with
/// its pt-BR formatted value. Aggregate fields the form lacks are skipped.
pub fn prefill_form(
    aggregate: &FiscalAggregate,
    form: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut filled = form.clone();
    for (field, value) in aggregate.iter() {
        if let Some(slot) = filled.get_mut(field.key()) {
            *slot = format_brl(value);
        }
    }
    filled
}
