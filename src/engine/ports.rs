//! Port name sanitization and input/output pairing

/// Strip the `" <index>"` suffix RtMidi-style backends append to port names.
///
/// `"Widget 2"` at index 2 becomes `"Widget"`. Names without that exact
/// suffix are returned unchanged.
pub fn sanitize_port_name(name: &str, index: usize) -> &str {
    name.strip_suffix(&format!(" {}", index)).unwrap_or(name)
}

/// Sanitized input port names, de-duplicated, in port order
pub fn available_devices(input_ports: &[String]) -> Vec<String> {
    let mut devices: Vec<String> = Vec::new();
    for (index, name) in input_ports.iter().enumerate() {
        let device = sanitize_port_name(name, index);
        if device.is_empty() || devices.iter().any(|d| d == device) {
            continue;
        }
        devices.push(device.to_string());
    }
    devices
}

/// Find `(input_index, output_index)` for `device`.
///
/// The input port's sanitized name must equal `device`; the output port's
/// name only has to contain it, since output ports are often named
/// differently from their input twin.
pub fn find_port_pair(
    input_ports: &[String],
    output_ports: &[String],
    device: &str,
) -> Option<(usize, usize)> {
    if device.is_empty() {
        return None;
    }

    let input = input_ports
        .iter()
        .enumerate()
        .find(|(index, name)| sanitize_port_name(name, *index) == device)
        .map(|(index, _)| index)?;
    let output = output_ports.iter().position(|name| name.contains(device))?;

    Some((input, output))
}
