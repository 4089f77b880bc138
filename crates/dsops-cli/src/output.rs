use std::collections::BTreeMap;

use dsops_domain::ResolvedVariable;
use dsops_resolver::PlanResult;

/// Render a plan as aligned `name -> source` lines, sorted by name.
pub fn render_plan(plan: &PlanResult) -> String {
    let mut out = String::new();
    for entry in &plan.variables {
        match &entry.error {
            Some(err) => out.push_str(&format!("{:<24} ! {} ({err})\n", entry.name, entry.source)),
            None => {
                let transform = entry.transform.as_deref().map(|t| format!(" |> {t}")).unwrap_or_default();
                out.push_str(&format!("{:<24} -> {}{transform}\n", entry.name, entry.source));
            }
        }
    }
    out
}

/// Render resolved variables as sorted `KEY=value` lines; errored entries
/// show the error message instead of a value. Never masks — callers that
/// print to an interactive terminal should call [`render_masked`] instead.
pub fn render_resolved(variables: &std::collections::HashMap<String, ResolvedVariable>) -> String {
    let sorted: BTreeMap<&String, &ResolvedVariable> = variables.iter().collect();
    let mut out = String::new();
    for (name, resolved) in sorted {
        match &resolved.error {
            Some(err) => out.push_str(&format!("{name}: ERROR {:?} {}\n", err.kind, err.message)),
            None => out.push_str(&format!("{name}={}\n", resolved.value)),
        }
    }
    out
}

/// Render resolved variables with values masked (§4.D `--print`).
pub fn render_masked(variables: &std::collections::HashMap<String, ResolvedVariable>) -> String {
    let sorted: BTreeMap<&String, &ResolvedVariable> = variables.iter().collect();
    let mut out = String::new();
    for (name, resolved) in sorted {
        out.push_str(&format!("{name}={}\n", dsops_exec::mask(&resolved.value)));
    }
    out
}
