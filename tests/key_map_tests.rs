use sovran_keymap::{AnyKey, Key, KeyMap, MapError, Value};

#[derive(Debug, Clone, PartialEq)]
struct Endpoint {
    host: String,
    port: u16,
}

#[test]
fn test_inferred_keys_round_trip() -> Result<(), MapError> {
    let store = KeyMap::new();

    let alpha = store.insert_value("alpha".to_string())?;
    assert_eq!(store.len()?, 1);

    let endpoint = Endpoint {
        host: "localhost".to_string(),
        port: 5432,
    };
    let db = store.insert_value(endpoint.clone())?;
    assert_eq!(store.len()?, 2);

    assert_eq!(store.get(&alpha)?, Some("alpha".to_string()));
    assert_eq!(store.get(&db)?, Some(endpoint.clone()));

    assert_eq!(store.remove(&alpha)?, Some("alpha".to_string()));
    assert_eq!(store.len()?, 1);
    assert_eq!(store.get(&alpha)?, None);
    assert_eq!(store.get(&db)?, Some(endpoint));

    Ok(())
}

#[test]
fn test_same_type_keys_are_independent() -> Result<(), MapError> {
    let store = KeyMap::new();
    let primary = Key::<Endpoint>::new();
    let replica = Key::<Endpoint>::new();

    store.insert(
        &primary,
        Endpoint {
            host: "db-1".to_string(),
            port: 5432,
        },
    )?;
    assert!(store.contains_key(&primary)?);
    assert!(!store.contains_key(&replica)?);
    assert_eq!(store.get(&replica)?, None);

    Ok(())
}

#[test]
fn test_insert_replaces_and_returns_previous() -> Result<(), MapError> {
    let store = KeyMap::new();
    let key = Key::<Vec<u8>>::new();

    assert_eq!(store.insert(&key, vec![1])?, None);
    let size = store.len()?;
    assert_eq!(store.insert(&key, vec![2])?, Some(vec![1]));
    assert_eq!(store.insert(&key, vec![3])?, Some(vec![2]));
    assert_eq!(store.len()?, size);
    assert_eq!(store.get(&key)?, Some(vec![3]));

    Ok(())
}

#[test]
fn test_unchecked_keys_hold_any_logical_type() -> Result<(), MapError> {
    let store = KeyMap::new();
    let nested = Key::<Vec<Option<(u8, String)>>>::unchecked();

    store.insert(&nested, vec![Some((1, "one".to_string())), None])?;
    assert_eq!(
        store.get(&nested)?,
        Some(vec![Some((1, "one".to_string())), None])
    );

    Ok(())
}

#[test]
fn test_insert_all_from_untyped_entries() -> Result<(), MapError> {
    let name = Key::<String>::new();
    let port = Key::<u16>::new();
    let tags = Key::<Vec<String>>::unchecked();

    let entries: Vec<(AnyKey, Box<dyn Value>)> = vec![
        (name.erased().clone(), Box::new("api".to_string())),
        (port.erased().clone(), Box::new(8080u16)),
        (tags.erased().clone(), Box::new(vec!["edge".to_string()])),
    ];
    let store = KeyMap::with_entries(entries)?;

    assert_eq!(store.get(&name)?, Some("api".to_string()));
    assert_eq!(store.get(&port)?, Some(8080));
    assert_eq!(store.get(&tags)?, Some(vec!["edge".to_string()]));

    Ok(())
}

#[test]
fn test_insert_all_keeps_entries_before_failure() -> Result<(), MapError> {
    let first = Key::<u8>::new();
    let broken = Key::<u8>::new();
    let last = Key::<u8>::new();
    let store = KeyMap::new();

    let result = store.insert_all(vec![
        (first.erased().clone(), Box::new(1u8) as Box<dyn Value>),
        (broken.erased().clone(), Box::new(2u64)),
        (last.erased().clone(), Box::new(3u8)),
    ]);

    match result {
        Err(MapError::TypeMismatch { expected, found, .. }) => {
            assert_eq!(expected, "u8");
            assert_eq!(found, "u64");
        }
        other => panic!("expected a type mismatch, got {:?}", other),
    }
    assert_eq!(store.get(&first)?, Some(1));
    assert!(!store.contains_key(&broken)?);
    assert!(!store.contains_key(&last)?);

    Ok(())
}

#[test]
fn test_remove_and_remove_all() -> Result<(), MapError> {
    let store = KeyMap::new();
    let a = store.insert_value(1u32)?;
    let b = store.insert_value("b".to_string())?;
    let c = store.insert_value(3.0f64)?;
    let unknown = Key::<u32>::new();

    assert_eq!(store.remove(&unknown)?, None);
    assert_eq!(store.len()?, 3);

    store.remove_all(vec![a.erased().clone(), c.erased().clone(), unknown.into_erased()])?;
    assert_eq!(store.len()?, 1);
    assert_eq!(store.get(&a)?, None);
    assert_eq!(store.get(&b)?, Some("b".to_string()));
    assert_eq!(store.get(&c)?, None);

    Ok(())
}

#[test]
fn test_clear_forgets_every_key() -> Result<(), MapError> {
    let store = KeyMap::new();
    let a = store.insert_value(1u8)?;
    let b = store.insert_value('b')?;
    assert!(!store.is_empty()?);

    store.clear()?;
    assert!(store.is_empty()?);
    assert_eq!(store.get(&a)?, None);
    assert_eq!(store.get(&b)?, None);

    // Keys survive the clear and can be reused
    store.insert(&a, 2)?;
    assert_eq!(store.get(&a)?, Some(2));

    Ok(())
}

#[test]
fn test_contains_value_uses_equality() -> Result<(), MapError> {
    let store = KeyMap::new();
    let key = store.insert_value("shared".to_string())?;

    assert!(store.contains_value(&"shared".to_string())?);
    assert!(!store.contains_value(&"other".to_string())?);
    // Same text, different type
    assert!(!store.contains_value(&"shared")?);

    store.remove(&key)?;
    assert!(!store.contains_value(&"shared".to_string())?);

    Ok(())
}

#[test]
fn test_snapshots_resolve_through_get() -> Result<(), MapError> {
    let store = KeyMap::new();
    store.insert_value(1u8)?;
    store.insert_value(1u8)?;
    store.insert_value("x".to_string())?;

    assert_eq!(store.keys()?.len(), 3);
    assert_eq!(store.values()?.len(), 3);

    for (key, value) in store.entries()? {
        let stored = store.get_erased(&key)?.expect("enumerated key should be mapped");
        assert!(stored.dyn_eq(&*value));
    }

    let mut visited = 0;
    store.apply(|key, value| {
        // Shared reads are fine while apply walks the map
        if let Some(key) = key.typed::<u8>() {
            assert_eq!(store.get(&key)?, Some(1));
            assert!(value.is::<u8>());
        }
        visited += 1;
        Ok(())
    })?;
    assert_eq!(visited, 3);

    Ok(())
}

#[test]
fn test_equality_ignores_insertion_order() -> Result<(), MapError> {
    let a = Key::<u8>::new();
    let b = Key::<String>::new();

    let first = KeyMap::new();
    first.insert(&a, 1)?;
    first.insert(&b, "b".to_string())?;

    let second = KeyMap::new();
    second.insert(&b, "b".to_string())?;
    second.insert(&a, 1)?;

    assert_eq!(first, second);

    // Equal content under different keys is a different map
    let third = KeyMap::new();
    third.insert_value(1u8)?;
    third.insert_value("b".to_string())?;
    assert_ne!(first, third);

    Ok(())
}

#[test]
fn test_copy_is_independent() -> Result<(), MapError> {
    let store = KeyMap::new();
    let key = store.insert_value(vec![1, 2, 3])?;

    let copy = KeyMap::copy_of(&store)?;
    assert_eq!(copy, store);

    copy.with_mut(&key, |values| values.push(4))?;
    assert_eq!(store.get(&key)?, Some(vec![1, 2, 3]));
    assert_eq!(copy.get(&key)?, Some(vec![1, 2, 3, 4]));
    assert_ne!(copy, store);

    Ok(())
}
