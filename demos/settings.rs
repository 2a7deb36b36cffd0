use sovran_keymap::{Key, KeyMap, MapError};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
struct Endpoint {
    host: String,
    port: u16,
}

/// Keys an application agrees on up front
struct SettingKeys {
    primary: Key<Endpoint>,
    replica: Key<Endpoint>,
    timeout_ms: Key<u64>,
    feature_flags: Key<HashMap<String, bool>>,
}

impl SettingKeys {
    fn new() -> Self {
        Self {
            primary: Key::new(),
            replica: Key::new(),
            timeout_ms: Key::new(),
            feature_flags: Key::new(),
        }
    }
}

/// Demonstrates using KeyMap as a typed settings registry
fn main() -> Result<(), MapError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let keys = SettingKeys::new();
    let settings = KeyMap::new();

    load_defaults(&settings, &keys)?;

    // Two keys of the same type never collide
    settings.insert(
        &keys.replica,
        Endpoint {
            host: "db-replica".to_string(),
            port: 5433,
        },
    )?;

    // Flip a flag in place
    settings.with_mut(&keys.feature_flags, |flags| {
        flags.insert("dark_mode".to_string(), true);
    })?;

    // Replacing a value hands back the old one
    let old_timeout = settings.insert(&keys.timeout_ms, 2_500)?;
    println!("Timeout changed from {:?} ms", old_timeout);

    print_settings(&settings, &keys)?;

    // A one-off value can get its key from the map
    let banner = settings.insert_value("maintenance at 02:00".to_string())?;
    println!("\nBanner ({}): {:?}", banner, settings.get(&banner)?);
    println!("Total entries: {}", settings.len()?);

    Ok(())
}

fn load_defaults(settings: &KeyMap, keys: &SettingKeys) -> Result<(), MapError> {
    settings.insert(
        &keys.primary,
        Endpoint {
            host: "db-primary".to_string(),
            port: 5432,
        },
    )?;
    settings.insert(&keys.timeout_ms, 1_000)?;

    let mut flags = HashMap::new();
    flags.insert("dark_mode".to_string(), false);
    flags.insert("beta_search".to_string(), true);
    settings.insert(&keys.feature_flags, flags)?;

    Ok(())
}

fn print_settings(settings: &KeyMap, keys: &SettingKeys) -> Result<(), MapError> {
    println!("\nCurrent settings:");

    for (label, key) in [("primary", &keys.primary), ("replica", &keys.replica)] {
        if let Some(endpoint) = settings.get(key)? {
            println!("  {}: {}:{}", label, endpoint.host, endpoint.port);
        }
    }

    println!("  timeout: {:?} ms", settings.get(&keys.timeout_ms)?);

    settings.with(&keys.feature_flags, |flags| {
        let mut names: Vec<_> = flags.iter().collect();
        names.sort();
        for (name, enabled) in names {
            println!("  flag {}: {}", name, enabled);
        }
    })?;

    Ok(())
}
