use crate::error::{ToolError, ToolResult};
use crate::types::ScanRequest;

/// Build the `httpx` command line for a request.
///
/// Layout:
/// - `-u <t1,t2,...>` then `-silent`, always
/// - `-p <p1,p2,...>` when ports are given
/// - `-<probe>` for each probe, in order, no dedup
///
/// Targets containing a comma are not rejected; they simply split into
/// several hosts on the other side.
pub fn build_args(req: &ScanRequest) -> ToolResult<Vec<String>> {
    validate(req)?;

    let mut args = vec!["-u".to_string(), req.targets.join(","), "-silent".to_string()];

    if let Some(ports) = req.ports.as_deref().filter(|p| !p.is_empty()) {
        let joined = ports
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(",");
        args.push("-p".to_string());
        args.push(joined);
    }

    if let Some(probes) = req.probes.as_deref() {
        args.extend(probes.iter().map(|probe| format!("-{probe}")));
    }

    Ok(args)
}

fn validate(req: &ScanRequest) -> ToolResult<()> {
    if req.targets.is_empty() {
        return Err(ToolError::Validation(
            "at least one target is required".to_string(),
        ));
    }
    for (idx, target) in req.targets.iter().enumerate() {
        if target.trim().is_empty() {
            return Err(ToolError::Validation(format!("target #{idx} is empty")));
        }
    }

    if let Some(ports) = req.ports.as_deref() {
        if ports.contains(&0) {
            return Err(ToolError::Validation("port out of range: 0".to_string()));
        }
    }

    if let Some(probes) = req.probes.as_deref() {
        for probe in probes {
            validate_probe(probe)?;
        }
    }
    Ok(())
}

/// A probe becomes a flag verbatim, so only flag-shaped names get through.
/// Whether the binary knows the flag is left to the binary.
pub fn validate_probe(probe: &str) -> ToolResult<()> {
    if probe.is_empty() {
        return Err(ToolError::Validation("probe name is empty".to_string()));
    }
    if probe.starts_with('-') {
        return Err(ToolError::Validation(format!(
            "probe {probe:?} must not start with '-'"
        )));
    }
    if let Some(bad) = probe
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(ToolError::Validation(format!(
            "probe {probe:?} contains invalid character {bad:?}"
        )));
    }
    Ok(())
}
