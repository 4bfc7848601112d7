const UNITS: [&str; 5] = ["K", "M", "G", "T", "P"];

/// Format a byte count the way `du -h` does: `512B`, `4.0K`, `12M`.
pub fn format_size(bytes: u64) -> String {
  if bytes < 1024 {
    return format!("{bytes}B");
  }

  let mut value = bytes as f64 / 1024.0;
  let mut unit = 0;
  while value >= 1024.0 && unit < UNITS.len() - 1 {
    value /= 1024.0;
    unit += 1;
  }

  if value < 10.0 {
    format!("{:.1}{}", value, UNITS[unit])
  } else {
    format!("{:.0}{}", value, UNITS[unit])
  }
}
