use sovran_keymap::{AnyKey, Key, KeyMap, MapError, RawMap, UntypedMap, Value};

/// Code that predates KeyMap and only knows plain untyped maps
fn audit(label: &str, map: &impl UntypedMap) -> Result<(), MapError> {
    println!("{} ({} entries):", label, map.len()?);
    for (key, value) in map.entries()? {
        println!("  {} -> {:?}", key, value);
    }
    Ok(())
}

fn import(map: &mut impl UntypedMap, entries: Vec<(AnyKey, Box<dyn Value>)>) {
    match map.put_all(entries) {
        Ok(()) => println!("import succeeded"),
        Err(e) => println!("import failed: {}", e),
    }
}

/// Demonstrates handing a KeyMap to untyped code through its view
fn main() -> Result<(), MapError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let store = KeyMap::new();
    let user = store.insert_value("alice".to_string())?;
    let visits = Key::<u32>::new();
    store.insert(&visits, 3)?;

    let mut view = store.to_map();
    audit("view", &view)?;

    // A snapshot is a plain map that compares equal to the live view
    let snapshot: RawMap = view.to_hash_map()?;
    println!("snapshot matches view: {}", view == snapshot);

    // The plain map takes anything; the view enforces each key's type
    let bad = vec![(visits.erased().clone(), Box::new("many") as Box<dyn Value>)];
    let mut plain = RawMap::new();
    import(&mut plain, bad.clone());
    import(&mut view, bad);

    // Untyped writes land in the typed store
    view.put(visits.erased().clone(), Box::new(4u32))?;
    println!("visits after untyped write: {:?}", store.get(&visits)?);

    view.remove(user.erased())?;
    println!("user after untyped remove: {:?}", store.get(&user)?);
    println!("snapshot still matches view: {}", view == snapshot);

    audit("final view", &view)?;
    Ok(())
}
