use anyhow::{anyhow, Result};
use std::collections::HashMap;

/// Parse `KEY=VALUE` pairs into job arguments.
///
/// Only the first `=` separates key from value, so `URL=a=b` keeps `a=b`.
pub fn parse_job_args<S: AsRef<str>>(pairs: &[S]) -> Result<HashMap<String, String>> {
    let mut args = HashMap::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Incorrect variable format: {} (expected KEY=VALUE)", pair))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(anyhow!("Missing variable name in: {}", pair));
        }
        args.insert(key.to_string(), value.to_string());
    }
    Ok(args)
}
