use super::*;
use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

fn client(id: &str, name: Option<&str>) -> Client {
    Client {
        client_id: ClientId::from(id),
        friendly_name: name.map(str::to_string),
        ..Client::default()
    }
}

fn event(json: &str) -> ServerEvent {
    ServerEvent::from_json(json).expect("event json")
}

#[test]
fn clients_list_replaces_previous_contents() {
    let mut registry = Registry::new();
    registry.apply(ServerEvent::ClientsList {
        clients: vec![client("a", Some("A")), client("b", Some("B"))],
    });
    registry.apply(ServerEvent::ClientDisconnected {
        client_id: Some(ClientId::from("a")),
    });
    let applied = registry.apply(ServerEvent::ClientsList {
        clients: vec![client("c", Some("C"))],
    });

    assert_eq!(applied, Applied::ClientsReplaced { count: 1 });
    let ids: Vec<_> = registry.all_clients().map(|c| c.client_id.clone()).collect();
    assert_eq!(ids, vec![ClientId::from("c")]);
    assert!(registry.client_by_name("A").is_none());
}

#[test]
fn repeated_clients_lists_leave_exactly_the_last_one() {
    let lists = [
        vec![client("a", Some("A"))],
        vec![client("b", None), client("c", Some("C"))],
        vec![],
        vec![client("d", Some("D")), client("a", Some("A2"))],
    ];
    let mut registry = Registry::new();
    for list in lists.iter() {
        registry.apply(ServerEvent::ClientsList {
            clients: list.clone(),
        });
        let mut got: Vec<Client> = registry.all_clients().cloned().collect();
        got.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        let mut expected = list.clone();
        expected.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        assert_eq!(got, expected);
    }
}

#[test]
fn clients_list_skips_entries_without_id() {
    let mut registry = Registry::new();
    registry.apply(ServerEvent::ClientsList {
        clients: vec![client("", Some("Ghost")), client("a", Some("A"))],
    });
    assert_eq!(registry.all_clients().count(), 1);
    assert!(registry.client_by_name("Ghost").is_none());
}

#[test]
fn connect_then_disconnect_keeps_record_and_flags_it() {
    let mut registry = Registry::new();
    let mut connected = client("a", Some("Kitchen Display"));
    connected.layout = Some("cover".into());
    connected.font = Some("inter".into());
    connected.zone_name = Some("Kitchen".into());

    registry.apply(ServerEvent::ClientConnected {
        client: Some(connected.clone()),
    });
    let applied = registry.apply(ServerEvent::ClientDisconnected {
        client_id: Some(ClientId::from("a")),
    });

    assert_eq!(applied, Applied::ClientDisconnected(ClientId::from("a")));
    let stored = registry.client(&ClientId::from("a")).expect("still present");
    assert!(stored.disconnected);
    assert_eq!(
        Client {
            disconnected: false,
            ..stored.clone()
        },
        connected
    );
}

#[test]
fn client_connected_without_id_is_ignored() {
    let mut registry = Registry::new();
    assert_eq!(
        registry.apply(ServerEvent::ClientConnected {
            client: Some(client("", Some("Nameless")))
        }),
        Applied::Ignored
    );
    assert_eq!(
        registry.apply(ServerEvent::ClientConnected { client: None }),
        Applied::Ignored
    );
    assert_eq!(registry.all_clients().count(), 0);
}

#[test]
fn disconnect_for_unknown_client_is_a_no_op() {
    let mut registry = Registry::new();
    registry.apply(ServerEvent::ClientsList {
        clients: vec![client("a", Some("A"))],
    });
    let before = registry.clone();

    assert_eq!(
        registry.apply(ServerEvent::ClientDisconnected {
            client_id: Some(ClientId::from("zzz"))
        }),
        Applied::Ignored
    );
    assert_eq!(
        registry.apply(ServerEvent::ClientDisconnected { client_id: None }),
        Applied::Ignored
    );
    assert_eq!(registry.named_clients(), before.named_clients());
    assert!(!registry.client(&ClientId::from("a")).expect("a").disconnected);
}

#[test]
fn client_updated_replaces_whole_record() {
    let mut registry = Registry::new();
    registry.apply(event(
        r#"{"type":"client_connected","client":{"clientId":"a","layout":"cover","font":"inter"}}"#,
    ));
    registry.apply(event(
        r#"{"type":"client_updated","client":{"clientId":"a","layout":"minimal"}}"#,
    ));

    let stored = registry.client(&ClientId::from("a")).expect("a");
    assert_eq!(stored.layout.as_deref(), Some("minimal"));
    assert!(stored.font.is_none());
}

#[test]
fn client_updated_clears_disconnected_flag() {
    let mut registry = Registry::new();
    registry.apply(ServerEvent::ClientConnected {
        client: Some(client("a", Some("A"))),
    });
    registry.apply(ServerEvent::ClientDisconnected {
        client_id: Some(ClientId::from("a")),
    });
    registry.apply(ServerEvent::ClientUpdated {
        client: Some(client("a", Some("A"))),
    });
    assert!(!registry.client(&ClientId::from("a")).expect("a").disconnected);
}

#[test]
fn named_clients_excludes_unnamed_entries() {
    let mut registry = Registry::new();
    registry.apply(ServerEvent::ClientsList {
        clients: vec![
            client("a", Some("A")),
            client("b", None),
            client("c", Some("")),
            client("d", Some("D")),
        ],
    });
    registry.apply(ServerEvent::ClientConnected {
        client: Some(client("e", None)),
    });

    let names: Vec<_> = registry
        .named_clients()
        .into_iter()
        .map(|c| c.client_id.0)
        .collect();
    assert_eq!(names, vec!["a".to_string(), "d".to_string()]);
    assert!(registry.named_clients().iter().all(Client::is_named));
}

#[test]
fn renamed_client_moves_in_name_index() {
    let mut registry = Registry::new();
    registry.apply(ServerEvent::ClientConnected {
        client: Some(client("a", Some("Old"))),
    });
    registry.apply(ServerEvent::ClientUpdated {
        client: Some(client("a", Some("New"))),
    });

    assert!(registry.client_by_name("Old").is_none());
    assert_eq!(
        registry.client_by_name("New").map(|c| c.client_id.clone()),
        Some(ClientId::from("a"))
    );
}

#[test]
fn duplicate_friendly_names_prefer_live_client() {
    let mut registry = Registry::new();
    registry.apply(ServerEvent::ClientsList {
        clients: vec![client("a", Some("Den")), client("b", Some("Den"))],
    });
    assert_eq!(registry.clients_named("Den").len(), 2);
    assert_eq!(
        registry.client_by_name("Den").map(|c| c.client_id.clone()),
        Some(ClientId::from("a"))
    );

    registry.apply(ServerEvent::ClientDisconnected {
        client_id: Some(ClientId::from("a")),
    });
    assert_eq!(
        registry.client_by_name("Den").map(|c| c.client_id.clone()),
        Some(ClientId::from("b"))
    );
}

#[test]
fn zones_event_replaces_list_and_resolves_display_names() {
    let mut registry = Registry::new();
    registry.apply(event(
        r#"{"type":"zones","zones":[{"id":"z0","displayName":"Office"},{"id":"z9","displayName":"Patio"}]}"#,
    ));
    let applied = registry.apply(event(
        r#"{"type":"zones","zones":[{"id":"z1","displayName":"Kitchen"}]}"#,
    ));

    assert_eq!(applied, Applied::ZonesReplaced { count: 1 });
    assert_eq!(registry.zones().len(), 1);
    assert_eq!(registry.zone_id_for("Kitchen"), Some(&ZoneId::from("z1")));
    assert!(registry.zone_id_for("Office").is_none());
}

#[test]
fn unknown_events_leave_registry_untouched() {
    let mut registry = Registry::new();
    registry.apply(ServerEvent::ClientsList {
        clients: vec![client("a", Some("A"))],
    });
    assert_eq!(registry.apply(ServerEvent::Unknown), Applied::Ignored);
    assert_eq!(registry.named_clients().len(), 1);
}

#[test]
fn scenario_list_then_disconnect_keeps_friendly_name() {
    let registry = SharedRegistry::new();
    registry.apply(event(
        r#"{"type":"clients_list","clients":[{"clientId":"c1","friendlyName":"Living Room","layout":"cover"}]}"#,
    ));
    assert_eq!(registry.clients().len(), 1);

    registry.apply(event(r#"{"type":"client_disconnected","clientId":"c1"}"#));
    let c1 = registry.client(&ClientId::from("c1")).expect("c1");
    assert!(c1.disconnected);
    assert_eq!(c1.name(), Some("Living Room"));
    assert_eq!(c1.layout.as_deref(), Some("cover"));
}

#[test]
fn set_connected_reports_previous_value() {
    let registry = SharedRegistry::new();
    assert!(!registry.set_connected(true));
    assert!(registry.is_connected());
    assert!(registry.set_connected(false));
    assert!(!registry.is_connected());
}

#[test]
fn readers_never_observe_half_written_records() {
    let registry = SharedRegistry::new();
    let stop = Arc::new(AtomicBool::new(false));

    let reader = {
        let registry = registry.clone();
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut reads = 0usize;
            loop {
                if let Some(c) = registry.client(&ClientId::from("a")) {
                    // Every write sets layout and font to the same generation tag.
                    assert_eq!(c.layout, c.font, "torn record observed: {c:?}");
                }
                reads += 1;
                if stop.load(Ordering::Relaxed) {
                    break;
                }
            }
            reads
        })
    };

    for generation in 0..2_000 {
        let tag = format!("gen-{generation}");
        registry.apply(ServerEvent::ClientUpdated {
            client: Some(Client {
                client_id: ClientId::from("a"),
                friendly_name: Some("A".into()),
                layout: Some(tag.clone()),
                font: Some(tag),
                ..Client::default()
            }),
        });
    }
    stop.store(true, Ordering::Relaxed);
    let reads = reader.join().expect("reader thread");
    assert!(reads > 0);
}

#[test]
fn clients_list_with_null_id_entry_still_replaces() {
    let mut registry = Registry::new();
    registry.apply(ServerEvent::ClientsList {
        clients: vec![client("old", Some("Old"))],
    });

    let applied = registry.apply(event(
        r#"{"type":"clients_list","clients":[{"clientId":null,"friendlyName":"Ghost"},{"clientId":"c1","friendlyName":"Den"}]}"#,
    ));

    assert_eq!(applied, Applied::ClientsReplaced { count: 1 });
    assert!(registry.client(&ClientId::from("old")).is_none());
    assert_eq!(
        registry.client_by_name("Den").map(|c| c.client_id.clone()),
        Some(ClientId::from("c1"))
    );
    assert!(registry.client_by_name("Ghost").is_none());
}

#[test]
fn zones_with_nameless_entry_still_replace() {
    let mut registry = Registry::new();
    registry.apply(event(
        r#"{"type":"zones","zones":[{"id":"z9","displayName":"Garage"}]}"#,
    ));

    let applied = registry.apply(event(
        r#"{"type":"zones","zones":[{"id":"z0"},{"id":"z1","displayName":"Kitchen"}]}"#,
    ));

    assert_eq!(applied, Applied::ZonesReplaced { count: 1 });
    assert_eq!(registry.zone_id_for("Kitchen"), Some(&ZoneId::from("z1")));
    assert!(registry.zone_id_for("Garage").is_none());
}
